//! Header row detection.
//!
//! Statement exports put a few title/decoration rows above the table, OCR
//! dumps mangle labels, and some sheets have no header at all. Each candidate
//! row near the top is scored against the format's catalog; the best row wins
//! if it clears the confidence threshold, otherwise the format's default
//! header list is used.

use mfs_core::{CanonicalField, CellValue, FieldKind};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::LazyLock;
use tracing::debug;

use crate::datetime::fold_bengali_digits;
use crate::formats::StatementFormat;

static DATE_SHAPED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{1,4}[/.\-]\d{1,2}[/.\-]\d{1,4}(?:[ T].*)?$").expect("date shape regex")
});

static AMOUNT_SHAPED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[-+(]?[৳$]?\s*(?:\d{1,3}(?:,\d{3})+|\d+)\.\d{1,2}\)?$|^[-+(]?[৳$]\s*\d+\)?$")
        .expect("amount shape regex")
});

static SERIAL_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:(?:s[il]|serial)\.?\s*(?:no\.?|#)?|s/n|ক্রমিক\s*(?:নং|নম্বর)?)$")
        .expect("serial label regex")
});

/// Scoring breakdown for one candidate row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowScore {
    pub row: usize,
    pub non_empty: usize,
    pub mapped: usize,
    pub matched_critical: usize,
    pub raw_score: f64,
    /// `raw_score / non_empty`
    pub score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    /// No row near the top had enough non-empty cells to be scored
    NoCandidateRows,
    /// The best row scored below the confidence threshold
    LowConfidence,
}

/// Outcome of header detection
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderDetection {
    /// 0-based sheet row holding the header
    pub header_row: usize,
    /// Header list to use: identified headers, or the format defaults
    pub headers: Vec<String>,
    /// Raw strings of the chosen row; `None` when the sheet has no such row
    pub identified_headers: Option<Vec<String>>,
    pub best_score: Option<f64>,
    pub fallback: Option<FallbackReason>,
}

impl HeaderDetection {
    pub fn is_confident(&self) -> bool {
        self.fallback.is_none()
    }
}

pub struct HeaderLocator<'a> {
    format: &'a StatementFormat,
}

impl<'a> HeaderLocator<'a> {
    pub fn new(format: &'a StatementFormat) -> Self {
        Self { format }
    }

    /// Score one row; `None` when it is blank or too sparse to judge
    pub fn score_row(&self, row: usize, cells: &[CellValue]) -> Option<RowScore> {
        let scoring = &self.format.scoring;
        let non_empty: Vec<&CellValue> = cells.iter().filter(|c| !c.is_blank()).collect();
        if non_empty.len() < scoring.min_non_empty_cells.max(1) {
            return None;
        }

        let mut raw_score = 0.0;
        let mut mapped = 0;
        let mut critical: BTreeSet<CanonicalField> = BTreeSet::new();

        for cell in &non_empty {
            let text = cell.display_text();
            let field = match cell {
                CellValue::Text(_) => self.format.catalog.resolve(&text),
                _ => None,
            };

            if let Some(f) = field {
                mapped += 1;
                raw_score += scoring.mapped_weight;
                if self.format.is_critical(f) {
                    raw_score += scoring.critical_weight;
                    critical.insert(f);
                }
            }
            if self.format.is_reference_header(&text) {
                raw_score += scoring.reference_weight;
            }
            if self.looks_like_data(cell, &text, field) {
                raw_score -= scoring.data_penalty;
            }
        }

        let matched_critical = critical.len();
        if matched_critical < scoring.required_critical() {
            raw_score -= scoring.critical_shortfall_penalty;
        } else {
            raw_score += scoring.critical_bonus_per_field * matched_critical as f64;
        }

        let score = raw_score / non_empty.len() as f64;
        debug!(row, score, mapped, matched_critical, "scored header candidate");

        Some(RowScore {
            row,
            non_empty: non_empty.len(),
            mapped,
            matched_critical,
            raw_score,
            score,
        })
    }

    /// Scores for every judgeable row among the first `scan_rows`
    pub fn score_rows(&self, rows: &[Vec<CellValue>]) -> Vec<RowScore> {
        rows.iter()
            .take(self.format.scoring.scan_rows)
            .enumerate()
            .filter_map(|(idx, cells)| self.score_row(idx, cells))
            .collect()
    }

    pub fn locate(&self, rows: &[Vec<CellValue>]) -> HeaderDetection {
        let mut best: Option<RowScore> = None;
        for candidate in self.score_rows(rows) {
            // strict comparison keeps the earliest row on ties
            if best.as_ref().is_none_or(|b| candidate.score > b.score) {
                best = Some(candidate);
            }
        }

        let threshold = self.format.scoring.confidence_threshold;
        match best {
            Some(b) if b.score >= threshold => {
                let identified = header_strings(&rows[b.row]);
                HeaderDetection {
                    header_row: b.row,
                    headers: identified.clone(),
                    identified_headers: Some(identified),
                    best_score: Some(b.score),
                    fallback: None,
                }
            }
            other => {
                let reason = if other.is_some() {
                    FallbackReason::LowConfidence
                } else {
                    FallbackReason::NoCandidateRows
                };
                let header_row = self.serial_label_row(rows).unwrap_or(0);
                HeaderDetection {
                    header_row,
                    headers: trim_trailing_blank(self.format.default_headers.clone()),
                    identified_headers: rows.get(header_row).map(|r| header_strings(r)),
                    best_score: other.map(|b| b.score),
                    fallback: Some(reason),
                }
            }
        }
    }

    /// First candidate row that opens with a serial-number label such as `SI.`
    fn serial_label_row(&self, rows: &[Vec<CellValue>]) -> Option<usize> {
        rows.iter()
            .take(self.format.scoring.scan_rows)
            .position(|cells| {
                cells
                    .iter()
                    .find(|c| !c.is_blank())
                    .is_some_and(|c| is_serial_label(&c.display_text()))
            })
    }

    fn looks_like_data(&self, cell: &CellValue, text: &str, field: Option<CanonicalField>) -> bool {
        let kind = field.map(|f| f.kind());
        if let CellValue::DateValue(_) = cell {
            return kind != Some(FieldKind::DateTime);
        }

        let folded = fold_bengali_digits(text.trim());
        let long_digits = folded.len() >= self.format.scoring.long_digit_run
            && folded.chars().all(|c| c.is_ascii_digit());
        if long_digits && kind != Some(FieldKind::Identifier) {
            return true;
        }
        if DATE_SHAPED_RE.is_match(&folded) && kind != Some(FieldKind::DateTime) {
            return true;
        }
        AMOUNT_SHAPED_RE.is_match(&folded) && kind != Some(FieldKind::Numeric)
    }
}

pub fn is_serial_label(text: &str) -> bool {
    SERIAL_LABEL_RE.is_match(text.trim())
}

fn header_strings(cells: &[CellValue]) -> Vec<String> {
    trim_trailing_blank(
        cells
            .iter()
            .map(|c| c.display_text().trim().to_string())
            .collect(),
    )
}

fn trim_trailing_blank(mut headers: Vec<String>) -> Vec<String> {
    while headers.last().is_some_and(|h| h.trim().is_empty()) {
        headers.pop();
    }
    headers
}
