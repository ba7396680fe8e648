//! Row -> canonical record, behind the retention gate.

use mfs_core::{CanonicalField, CellValue, Direction, Timestamp, TransactionRecord};
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::catalog::HeaderCatalog;
use crate::datetime::DateTimeParser;
use crate::normalize::{normalize_amount, normalize_direction, normalize_text, normalize_timestamp};

/// Column index -> canonical field for one parse
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderMapping {
    columns: Vec<(usize, CanonicalField)>,
}

impl HeaderMapping {
    pub fn from_headers<S: AsRef<str>>(headers: &[S], catalog: &HeaderCatalog) -> Self {
        let columns = headers
            .iter()
            .enumerate()
            .filter_map(|(idx, h)| catalog.resolve(h.as_ref()).map(|f| (idx, f)))
            .collect();
        Self { columns }
    }

    pub fn columns(&self) -> &[(usize, CanonicalField)] {
        &self.columns
    }

    pub fn field_at(&self, column: usize) -> Option<CanonicalField> {
        self.columns
            .iter()
            .find(|(idx, _)| *idx == column)
            .map(|(_, f)| *f)
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Distinct critical fields present in the mapping
    pub fn critical_coverage(&self, critical: &BTreeSet<CanonicalField>) -> usize {
        self.columns
            .iter()
            .map(|(_, f)| *f)
            .filter(|f| critical.contains(f))
            .collect::<BTreeSet<_>>()
            .len()
    }
}

/// Mints record ids from provenance
pub trait IdMinter: Send + Sync {
    fn mint(&self, source_file_id: &str, row_index: usize) -> String;
}

/// `{source}-{row}-{8 hex chars}`; unique across parses of the same file
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomSuffixMinter;

impl IdMinter for RandomSuffixMinter {
    fn mint(&self, source_file_id: &str, row_index: usize) -> String {
        let suffix = Uuid::new_v4().simple().to_string();
        format!("{}-{}-{}", source_file_id, row_index, &suffix[..8])
    }
}

/// Where the rows came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    pub source_file_id: String,
    pub file_name: String,
}

pub struct RecordBuilder<'a> {
    mapping: &'a HeaderMapping,
    provenance: &'a Provenance,
    dates: &'a dyn DateTimeParser,
    ids: &'a dyn IdMinter,
}

/// Fields gathered for one row before the gate is applied
#[derive(Default)]
struct Draft {
    transaction_id: Option<String>,
    transaction_type: Option<String>,
    statement_account: Option<String>,
    counterparty_account: Option<String>,
    channel: Option<String>,
    reference: Option<String>,
    status: Option<String>,
    timestamp: Option<Timestamp>,
    direction: Option<Direction>,
    amount: Option<f64>,
    balance_after: Option<f64>,
}

// A column only fills a field the earlier columns left unset.
fn fill<T>(slot: &mut Option<T>, value: Option<T>) {
    if slot.is_none() {
        *slot = value;
    }
}

impl<'a> RecordBuilder<'a> {
    pub fn new(
        mapping: &'a HeaderMapping,
        provenance: &'a Provenance,
        dates: &'a dyn DateTimeParser,
        ids: &'a dyn IdMinter,
    ) -> Self {
        Self {
            mapping,
            provenance,
            dates,
            ids,
        }
    }

    /// Build the record for 0-based `sheet_row`, or `None` if it fails the
    /// retention gate (needs an id and a parsed timestamp or amount).
    pub fn build(&self, sheet_row: usize, cells: &[CellValue]) -> Option<TransactionRecord> {
        let row_index = sheet_row + 1;
        let id = self.ids.mint(&self.provenance.source_file_id, row_index);

        let mut draft = Draft::default();
        for (column, field) in self.mapping.columns() {
            let Some(cell) = cells.get(*column) else {
                continue;
            };
            match field {
                CanonicalField::TransactionId => fill(&mut draft.transaction_id, normalize_text(cell)),
                CanonicalField::TransactionType => fill(&mut draft.transaction_type, normalize_text(cell)),
                CanonicalField::StatementAccount => fill(&mut draft.statement_account, normalize_text(cell)),
                CanonicalField::CounterpartyAccount => {
                    fill(&mut draft.counterparty_account, normalize_text(cell))
                }
                CanonicalField::Channel => fill(&mut draft.channel, normalize_text(cell)),
                CanonicalField::Reference => fill(&mut draft.reference, normalize_text(cell)),
                CanonicalField::Status => fill(&mut draft.status, normalize_text(cell)),
                CanonicalField::Timestamp => {
                    // a parsed value beats raw text from an earlier column
                    let ts = normalize_timestamp(cell, self.dates);
                    if !draft.timestamp.as_ref().is_some_and(Timestamp::is_parsed) && ts.is_some() {
                        draft.timestamp = ts;
                    }
                }
                CanonicalField::Direction => fill(&mut draft.direction, normalize_direction(cell)),
                CanonicalField::Amount => fill(&mut draft.amount, normalize_amount(cell)),
                CanonicalField::BalanceAfter => fill(&mut draft.balance_after, normalize_amount(cell)),
            }
        }

        let has_time = draft.timestamp.as_ref().is_some_and(Timestamp::is_parsed);
        let has_amount = draft.amount.is_some();
        let transaction_id = draft.transaction_id?;
        if !(has_time || has_amount) {
            return None;
        }

        Some(TransactionRecord {
            id,
            source_file_id: self.provenance.source_file_id.clone(),
            file_name: self.provenance.file_name.clone(),
            row_index,
            transaction_id,
            transaction_type: draft.transaction_type,
            statement_account: draft.statement_account,
            counterparty_account: draft.counterparty_account,
            channel: draft.channel,
            reference: draft.reference,
            status: draft.status,
            timestamp: draft.timestamp,
            direction: draft.direction,
            amount: draft.amount,
            balance_after: draft.balance_after,
        })
    }
}
