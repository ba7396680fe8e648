//! Canonical field identifiers that every vendor header resolves to.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Vendor-independent field name
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    TransactionId,
    Timestamp,
    TransactionType,
    StatementAccount,
    CounterpartyAccount,
    Channel,
    Reference,
    Direction,
    Amount,
    BalanceAfter,
    Status,
}

/// How a field's cells are coerced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    /// Id or account-like text; long digit runs are expected here
    Identifier,
    DateTime,
    Numeric,
    Direction,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 11] = [
        CanonicalField::TransactionId,
        CanonicalField::Timestamp,
        CanonicalField::TransactionType,
        CanonicalField::StatementAccount,
        CanonicalField::CounterpartyAccount,
        CanonicalField::Channel,
        CanonicalField::Reference,
        CanonicalField::Direction,
        CanonicalField::Amount,
        CanonicalField::BalanceAfter,
        CanonicalField::Status,
    ];

    pub fn kind(&self) -> FieldKind {
        match self {
            CanonicalField::TransactionId
            | CanonicalField::StatementAccount
            | CanonicalField::CounterpartyAccount
            | CanonicalField::Reference => FieldKind::Identifier,
            CanonicalField::Timestamp => FieldKind::DateTime,
            CanonicalField::Amount | CanonicalField::BalanceAfter => FieldKind::Numeric,
            CanonicalField::Direction => FieldKind::Direction,
            CanonicalField::TransactionType | CanonicalField::Channel | CanonicalField::Status => {
                FieldKind::Text
            }
        }
    }

    /// Stable snake_case name (matches the serde form)
    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalField::TransactionId => "transaction_id",
            CanonicalField::Timestamp => "timestamp",
            CanonicalField::TransactionType => "transaction_type",
            CanonicalField::StatementAccount => "statement_account",
            CanonicalField::CounterpartyAccount => "counterparty_account",
            CanonicalField::Channel => "channel",
            CanonicalField::Reference => "reference",
            CanonicalField::Direction => "direction",
            CanonicalField::Amount => "amount",
            CanonicalField::BalanceAfter => "balance_after",
            CanonicalField::Status => "status",
        }
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_name_matches_as_str() {
        for field in CanonicalField::ALL {
            let json = serde_json::to_string(&field).unwrap();
            assert_eq!(json, format!("\"{}\"", field.as_str()));
        }
    }

    #[test]
    fn test_kinds() {
        assert_eq!(CanonicalField::Amount.kind(), FieldKind::Numeric);
        assert_eq!(CanonicalField::Timestamp.kind(), FieldKind::DateTime);
        assert_eq!(CanonicalField::CounterpartyAccount.kind(), FieldKind::Identifier);
        assert_eq!(CanonicalField::Status.kind(), FieldKind::Text);
    }
}
