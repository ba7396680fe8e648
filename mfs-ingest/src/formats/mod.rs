//! Per-vendor statement formats.
//!
//! A format bundles the synonym catalog, the fallback header list, the
//! reference labels, the critical field set and the scoring knobs. Formats
//! are immutable once built and passed explicitly to the locator and the
//! façade; nothing here is process-wide state.

pub mod mfs_statement;
pub mod ocr_dump;

use mfs_core::{CanonicalField, CellValue};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::debug;

use crate::catalog::HeaderCatalog;
use crate::datetime::DateOrder;
use crate::locator::{HeaderDetection, HeaderLocator};

/// Weights and thresholds for header-row scoring.
///
/// Tuned on sample exports; keep them overridable rather than baked in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Leading rows considered as header candidates
    pub scan_rows: usize,
    pub min_non_empty_cells: usize,
    pub mapped_weight: f64,
    pub critical_weight: f64,
    pub reference_weight: f64,
    pub data_penalty: f64,
    pub critical_shortfall_penalty: f64,
    pub critical_bonus_per_field: f64,
    /// Distinct critical fields a trustworthy header needs (minus one)
    pub critical_minimum: usize,
    pub confidence_threshold: f64,
    /// Digit-only strings at least this long look like data
    pub long_digit_run: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            scan_rows: 10,
            min_non_empty_cells: 3,
            mapped_weight: 1.0,
            critical_weight: 3.0,
            reference_weight: 2.0,
            data_penalty: 3.0,
            critical_shortfall_penalty: 5.0,
            critical_bonus_per_field: 2.0,
            critical_minimum: 3,
            confidence_threshold: 0.9,
            long_digit_run: 6,
        }
    }
}

impl ScoringConfig {
    /// Fewest distinct critical fields before a row or mapping is trusted
    pub fn required_critical(&self) -> usize {
        self.critical_minimum.saturating_sub(1)
    }
}

#[derive(Debug, Clone)]
pub struct StatementFormat {
    pub name: String,
    pub catalog: HeaderCatalog,
    /// Used when no header row is detected with confidence
    pub default_headers: Vec<String>,
    /// Exact labels a vendor is known to print; a strong prior when scoring
    pub reference_headers: Vec<String>,
    pub critical_fields: BTreeSet<CanonicalField>,
    pub scoring: ScoringConfig,
    pub date_order: DateOrder,
}

impl StatementFormat {
    pub fn is_critical(&self, field: CanonicalField) -> bool {
        self.critical_fields.contains(&field)
    }

    pub fn is_reference_header(&self, raw: &str) -> bool {
        let raw = raw.trim();
        !raw.is_empty()
            && self
                .reference_headers
                .iter()
                .any(|h| h.trim().to_lowercase() == raw.to_lowercase())
    }

    pub fn with_scoring(mut self, scoring: ScoringConfig) -> Self {
        self.scoring = scoring;
        self
    }

    pub fn with_date_order(mut self, order: DateOrder) -> Self {
        self.date_order = order;
        self
    }
}

/// Serializable description of a format, as written in config files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatDefinition {
    pub name: String,
    pub synonyms: BTreeMap<CanonicalField, Vec<String>>,
    pub default_headers: Vec<String>,
    #[serde(default)]
    pub reference_headers: Vec<String>,
    pub critical_fields: BTreeSet<CanonicalField>,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub date_order: DateOrder,
}

impl From<FormatDefinition> for StatementFormat {
    fn from(def: FormatDefinition) -> Self {
        let reference_headers = if def.reference_headers.is_empty() {
            def.default_headers.clone()
        } else {
            def.reference_headers
        };
        Self {
            name: def.name,
            catalog: HeaderCatalog::from_synonyms(&def.synonyms),
            default_headers: def.default_headers,
            reference_headers,
            critical_fields: def.critical_fields,
            scoring: def.scoring,
            date_order: def.date_order,
        }
    }
}

impl From<&StatementFormat> for FormatDefinition {
    fn from(format: &StatementFormat) -> Self {
        Self {
            name: format.name.clone(),
            synonyms: format.catalog.clone().into(),
            default_headers: format.default_headers.clone(),
            reference_headers: format.reference_headers.clone(),
            critical_fields: format.critical_fields.clone(),
            scoring: format.scoring.clone(),
            date_order: format.date_order,
        }
    }
}

/// Ordered set of formats; order breaks detection ties.
#[derive(Debug, Clone, Default)]
pub struct FormatRegistry {
    formats: Vec<Arc<StatementFormat>>,
}

impl FormatRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every format shipped with the crate
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.push(mfs_statement::format());
        registry.push(ocr_dump::format());
        registry
    }

    pub fn single(format: StatementFormat) -> Self {
        let mut registry = Self::new();
        registry.push(format);
        registry
    }

    /// Add a format, replacing any existing one with the same name in place
    pub fn push(&mut self, format: StatementFormat) {
        let format = Arc::new(format);
        match self.formats.iter_mut().find(|f| f.name == format.name) {
            Some(slot) => *slot = format,
            None => self.formats.push(format),
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<StatementFormat>> {
        self.formats
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
            .cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<StatementFormat>> {
        self.formats.iter()
    }

    pub fn len(&self) -> usize {
        self.formats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }

    /// Pick the format whose header detection fits `rows` best.
    ///
    /// Confident detections beat fallbacks, then the higher best score wins;
    /// ties keep registry order. `None` only for an empty registry.
    pub fn select(&self, rows: &[Vec<CellValue>]) -> Option<(Arc<StatementFormat>, HeaderDetection)> {
        let rank = |d: &HeaderDetection| (d.is_confident(), d.best_score.unwrap_or(f64::NEG_INFINITY));

        let mut chosen: Option<(Arc<StatementFormat>, HeaderDetection)> = None;
        for format in &self.formats {
            let detection = HeaderLocator::new(format).locate(rows);
            debug!(
                format = %format.name,
                score = ?detection.best_score,
                confident = detection.is_confident(),
                "format candidate"
            );
            if chosen.as_ref().is_none_or(|(_, best)| rank(&detection) > rank(best)) {
                chosen = Some((Arc::clone(format), detection));
            }
        }
        chosen
    }

    /// Rebuild every format with `f` applied (used for config overrides)
    pub fn map_formats(&self, f: impl Fn(StatementFormat) -> StatementFormat) -> Self {
        Self {
            formats: self
                .formats
                .iter()
                .map(|fmt| Arc::new(f(fmt.as_ref().clone())))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry_order() {
        let reg = FormatRegistry::builtin();
        let names: Vec<_> = reg.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec![mfs_statement::NAME, ocr_dump::NAME]);
    }

    #[test]
    fn test_push_replaces_same_name() {
        let mut reg = FormatRegistry::builtin();
        let strict = mfs_statement::format().with_scoring(ScoringConfig {
            confidence_threshold: 2.0,
            ..ScoringConfig::default()
        });
        reg.push(strict);
        assert_eq!(reg.len(), 2);
        let got = reg.get(mfs_statement::NAME).unwrap();
        assert_eq!(got.scoring.confidence_threshold, 2.0);
    }

    #[test]
    fn test_definition_round_trip_keeps_catalog() {
        let original = mfs_statement::format();
        let def = FormatDefinition::from(&original);
        let json = serde_json::to_string(&def).unwrap();
        let back: StatementFormat = serde_json::from_str::<FormatDefinition>(&json).unwrap().into();
        assert_eq!(back.catalog.len(), original.catalog.len());
        assert_eq!(back.catalog.resolve("TXN ID"), Some(CanonicalField::TransactionId));
        assert_eq!(back.default_headers, original.default_headers);
    }

    #[test]
    fn test_scoring_partial_override_uses_defaults() {
        let scoring: ScoringConfig = serde_json::from_str(r#"{"confidence_threshold": 1.5}"#).unwrap();
        assert_eq!(scoring.confidence_threshold, 1.5);
        assert_eq!(scoring.scan_rows, 10);
        assert_eq!(scoring.required_critical(), 2);
    }

    fn text_row(cells: &[&str]) -> Vec<CellValue> {
        cells.iter().map(|c| CellValue::from(*c)).collect()
    }

    #[test]
    fn test_select_prefers_ocr_for_ocr_labels() {
        let rows = vec![
            text_row(&ocr_dump::DEFAULT_HEADERS),
            text_row(&["1", "01/02/2023 10:00", "T1", "Cash Out", "", "", "", "", "DR", "10.00", "5.00", "OK"]),
        ];
        let (format, detection) = FormatRegistry::builtin().select(&rows).unwrap();
        assert_eq!(format.name, ocr_dump::NAME);
        assert!(detection.is_confident());
    }

    #[test]
    fn test_select_export_labels_and_ties() {
        let rows = vec![text_row(&mfs_statement::DEFAULT_HEADERS)];
        let (format, _) = FormatRegistry::builtin().select(&rows).unwrap();
        assert_eq!(format.name, mfs_statement::NAME);

        let (format, detection) = FormatRegistry::builtin().select(&[]).unwrap();
        assert_eq!(format.name, mfs_statement::NAME);
        assert!(!detection.is_confident());
    }

    #[test]
    fn test_select_on_empty_registry() {
        assert!(FormatRegistry::new().select(&[]).is_none());
    }

    #[test]
    fn test_reference_header_is_case_insensitive() {
        let f = mfs_statement::format();
        assert!(f.is_reference_header("txn_amt"));
        assert!(f.is_reference_header(" SI. "));
        assert!(!f.is_reference_header(""));
    }
}
