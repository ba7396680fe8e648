//! OCR-derived tabular dumps of printed MFS statements.
//!
//! Labels come out of OCR abbreviated and with stray punctuation, e.g.
//!   Sl No | Date Time | Trx ID | Trx Type | Account | Counterparty |
//!   Channel | Ref | Dr/Cr | Amount (Tk) | Balance (Tk) | Status
//! so the catalog adds the short forms on top of the export synonyms.

use mfs_core::CanonicalField::{self, *};

use super::{mfs_statement, ScoringConfig, StatementFormat};
use crate::catalog::HeaderCatalog;
use crate::datetime::DateOrder;

pub const NAME: &str = "ocr-dump";

pub const DEFAULT_HEADERS: [&str; 12] = [
    "Sl No",
    "Date Time",
    "Trx ID",
    "Trx Type",
    "Account",
    "Counterparty",
    "Channel",
    "Ref",
    "Dr/Cr",
    "Amount (Tk)",
    "Balance (Tk)",
    "Status",
];

const OCR_SYNONYMS: &[(&str, CanonicalField)] = &[
    ("trx no", TransactionId),
    ("trx type", TransactionType),
    ("txn no", TransactionId),
    ("account", StatementAccount),
    ("ref", Reference),
    ("ref no", Reference),
    ("amount (tk)", Amount),
    ("amt", Amount),
    ("balance (tk)", BalanceAfter),
    ("bal", BalanceAfter),
];

pub fn format() -> StatementFormat {
    let entries = mfs_statement::SYNONYMS
        .iter()
        .copied()
        .chain(OCR_SYNONYMS.iter().copied());

    StatementFormat {
        name: NAME.to_string(),
        catalog: HeaderCatalog::new(entries),
        default_headers: DEFAULT_HEADERS.iter().map(|s| s.to_string()).collect(),
        reference_headers: DEFAULT_HEADERS.iter().map(|s| s.to_string()).collect(),
        critical_fields: mfs_statement::critical_fields(),
        scoring: ScoringConfig::default(),
        date_order: DateOrder::DayFirst,
    }
}
