use mfs_core::TransactionRecord;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::builder::Provenance;
use crate::locator::FallbackReason;

/// Raw upload handed to the parser
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    /// Source file id, carried into every record's provenance
    pub id: String,
    pub name: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    /// Upload whose id is derived from its name and content, so re-reading
    /// the same file yields the same source id.
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let mut key = Vec::with_capacity(name.len() + 1 + bytes.len());
        key.extend_from_slice(name.as_bytes());
        key.push(0);
        key.extend_from_slice(&bytes);
        let id = Uuid::new_v5(&Uuid::NAMESPACE_OID, &key).to_string();
        Self { id, name, bytes }
    }

    pub fn with_id(id: impl Into<String>, name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            bytes,
        }
    }

    pub fn provenance(&self) -> Provenance {
        Provenance {
            source_file_id: self.id.clone(),
            file_name: self.name.clone(),
        }
    }
}

/// Non-fatal conditions met while parsing one sheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParseWarning {
    /// Default headers were used instead of a detected header row
    LowConfidenceHeaders {
        reason: FallbackReason,
        best_score: Option<f64>,
    },
    /// The sheet's header row names too few critical fields; no records built
    InsufficientCriticalCoverage { found: usize, required: usize },
    /// Workbook had more than one sheet; only the first was read
    ExtraSheetsIgnored { count: usize },
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseWarning::LowConfidenceHeaders { reason, best_score } => {
                let reason = match reason {
                    FallbackReason::NoCandidateRows => "no candidate header rows",
                    FallbackReason::LowConfidence => "header confidence below threshold",
                };
                match best_score {
                    Some(score) => write!(f, "{reason} (best score {score:.2}); using default headers"),
                    None => write!(f, "{reason}; using default headers"),
                }
            }
            ParseWarning::InsufficientCriticalCoverage { found, required } => write!(
                f,
                "header row names {found} critical field(s), {required} required; no records built"
            ),
            ParseWarning::ExtraSheetsIgnored { count } => {
                write!(f, "{count} additional sheet(s) ignored")
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseDiagnostics {
    /// 0-based sheet row used as the header
    pub header_row: usize,
    pub best_score: Option<f64>,
    pub header_fallback: Option<FallbackReason>,
    /// Distinct critical fields named by the sheet's own header row
    pub critical_coverage: usize,
    /// Rows after the header row
    pub data_rows: usize,
    /// Data rows that produced no record
    pub excluded_rows: usize,
    pub warnings: Vec<ParseWarning>,
}

impl ParseDiagnostics {
    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }
}

/// Result of parsing one upload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedStatement {
    pub records: Vec<TransactionRecord>,
    /// Display headers: the identified row, or the format defaults
    pub headers: Vec<String>,
    /// Raw strings of the sheet's header row, when the sheet has one
    pub identified_headers: Option<Vec<String>>,
    pub diagnostics: ParseDiagnostics,
    /// Name of the format the sheet was read with
    pub format: String,
}
