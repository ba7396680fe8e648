//! MFS account statement export (the `TXN_*` spreadsheet layout)
//!
//! Expected sheet, possibly below a few decorative title rows:
//!   SI. | TXN_DATE_TIME | TXN ID | TXN TYPE | STATEMENT_FOR_ACC | TXN_WITH_ACC |
//!   CHANNEL | REFERENCE | TXN_TYPE_DR_CR | TXN_AMT | AVAILABLE_BLC_AFTER_TXN | STATUS

use mfs_core::CanonicalField::{self, *};
use std::collections::BTreeSet;

use super::{ScoringConfig, StatementFormat};
use crate::catalog::HeaderCatalog;
use crate::datetime::DateOrder;

pub const NAME: &str = "mfs-statement";

pub const DEFAULT_HEADERS: [&str; 12] = [
    "SI.",
    "TXN_DATE_TIME",
    "TXN ID",
    "TXN TYPE",
    "STATEMENT_FOR_ACC",
    "TXN_WITH_ACC",
    "CHANNEL",
    "REFERENCE",
    "TXN_TYPE_DR_CR",
    "TXN_AMT",
    "AVAILABLE_BLC_AFTER_TXN",
    "STATUS",
];

pub(crate) const SYNONYMS: &[(&str, CanonicalField)] = &[
    // transaction id
    ("txn id", TransactionId),
    ("txnid", TransactionId),
    ("trx id", TransactionId),
    ("trxid", TransactionId),
    ("transaction id", TransactionId),
    ("transaction no", TransactionId),
    ("transaction number", TransactionId),
    ("লেনদেন আইডি", TransactionId),
    ("লেনদেন নম্বর", TransactionId),
    ("ট্রানজেকশন আইডি", TransactionId),
    // timestamp
    ("txn date time", Timestamp),
    ("txn date", Timestamp),
    ("transaction date", Timestamp),
    ("transaction time", Timestamp),
    ("date time", Timestamp),
    ("date & time", Timestamp),
    ("datetime", Timestamp),
    ("date", Timestamp),
    ("তারিখ ও সময়", Timestamp),
    ("তারিখ", Timestamp),
    // type
    ("txn type", TransactionType),
    ("transaction type", TransactionType),
    ("লেনদেনের ধরন", TransactionType),
    ("লেনদেনের ধরণ", TransactionType),
    // accounts
    ("statement for acc", StatementAccount),
    ("statement for account", StatementAccount),
    ("account no", StatementAccount),
    ("wallet no", StatementAccount),
    ("হিসাব নম্বর", StatementAccount),
    ("txn with acc", CounterpartyAccount),
    ("txn with account", CounterpartyAccount),
    ("counterparty", CounterpartyAccount),
    ("receiver", CounterpartyAccount),
    ("প্রাপক", CounterpartyAccount),
    // channel / reference / status
    ("channel", Channel),
    ("চ্যানেল", Channel),
    ("reference", Reference),
    ("রেফারেন্স", Reference),
    ("status", Status),
    ("অবস্থা", Status),
    ("স্ট্যাটাস", Status),
    // direction
    ("txn type dr cr", Direction),
    ("txn_type_dr_cr", Direction),
    ("dr cr", Direction),
    ("dr/cr", Direction),
    ("debit/credit", Direction),
    ("ডেবিট/ক্রেডিট", Direction),
    // amounts
    ("txn amt", Amount),
    ("txn amount", Amount),
    ("transaction amount", Amount),
    ("amount", Amount),
    ("পরিমাণ", Amount),
    ("টাকার পরিমাণ", Amount),
    ("available blc after txn", BalanceAfter),
    ("available balance after txn", BalanceAfter),
    ("balance after txn", BalanceAfter),
    ("available balance", BalanceAfter),
    ("balance", BalanceAfter),
    ("ব্যালেন্স", BalanceAfter),
    ("অবশিষ্ট ব্যালেন্স", BalanceAfter),
];

pub fn critical_fields() -> BTreeSet<CanonicalField> {
    [TransactionId, Timestamp, Amount, Direction].into_iter().collect()
}

pub fn format() -> StatementFormat {
    StatementFormat {
        name: NAME.to_string(),
        catalog: HeaderCatalog::new(SYNONYMS.iter().copied()),
        default_headers: DEFAULT_HEADERS.iter().map(|s| s.to_string()).collect(),
        reference_headers: DEFAULT_HEADERS.iter().map(|s| s.to_string()).collect(),
        critical_fields: critical_fields(),
        scoring: ScoringConfig::default(),
        date_order: DateOrder::DayFirst,
    }
}
