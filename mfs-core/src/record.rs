//! Canonical transaction records produced by statement ingestion

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ISO_DATETIME;

/// One normalized statement line, with provenance back to its upload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    /// Unique per parse: provenance plus a random suffix
    pub id: String,
    pub source_file_id: String,
    pub file_name: String,
    /// 1-based row in the original sheet, header row included
    pub row_index: usize,
    pub transaction_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statement_account: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counterparty_account: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance_after: Option<f64>,
}

impl TransactionRecord {
    /// Timestamp only when it was actually parsed
    pub fn parsed_timestamp(&self) -> Option<NaiveDateTime> {
        self.timestamp.as_ref().and_then(Timestamp::parsed)
    }

    pub fn is_debit(&self) -> bool {
        matches!(self.direction, Some(Direction::Debit))
    }

    pub fn is_credit(&self) -> bool {
        matches!(self.direction, Some(Direction::Credit))
    }

    /// Amount signed by direction: debits negative, everything else as-is
    pub fn signed_amount(&self) -> Option<f64> {
        let amount = self.amount?;
        Some(if self.is_debit() { -amount.abs() } else { amount })
    }
}

/// Transaction timestamp: parsed, or the original text when unparseable.
///
/// Serializes as a plain string either way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum Timestamp {
    Parsed(NaiveDateTime),
    Raw(String),
}

impl Timestamp {
    pub fn parsed(&self) -> Option<NaiveDateTime> {
        match self {
            Timestamp::Parsed(dt) => Some(*dt),
            Timestamp::Raw(_) => None,
        }
    }

    pub fn is_parsed(&self) -> bool {
        matches!(self, Timestamp::Parsed(_))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timestamp::Parsed(dt) => write!(f, "{}", dt.format(ISO_DATETIME)),
            Timestamp::Raw(raw) => f.write_str(raw),
        }
    }
}

impl From<Timestamp> for String {
    fn from(ts: Timestamp) -> Self {
        ts.to_string()
    }
}

impl From<String> for Timestamp {
    fn from(s: String) -> Self {
        match NaiveDateTime::parse_from_str(&s, ISO_DATETIME) {
            Ok(dt) => Timestamp::Parsed(dt),
            Err(_) => Timestamp::Raw(s),
        }
    }
}

/// Debit/credit marker; unknown tokens pass through uppercased
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum Direction {
    Credit,
    Debit,
    Other(String),
}

impl Direction {
    pub fn as_str(&self) -> &str {
        match self {
            Direction::Credit => "CREDIT",
            Direction::Debit => "DEBIT",
            Direction::Other(token) => token,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Direction> for String {
    fn from(d: Direction) -> Self {
        d.as_str().to_string()
    }
}

impl From<String> for Direction {
    fn from(s: String) -> Self {
        match s.as_str() {
            "CREDIT" => Direction::Credit,
            "DEBIT" => Direction::Debit,
            _ => Direction::Other(s),
        }
    }
}
