//! Parser façade: bytes in, canonical records out.
//!
//! One call runs the whole pipeline for an upload: first sheet → format
//! selection → header detection → header mapping → records. Only unreadable
//! input is an error; everything else degrades into diagnostics.

use std::sync::Arc;
use tracing::{info, warn};

use crate::builder::{HeaderMapping, IdMinter, RandomSuffixMinter, RecordBuilder};
use crate::datetime::{DateTimeParser, LenientDateTimeParser};
use crate::error::IngestError;
use crate::formats::{mfs_statement, FormatRegistry, StatementFormat};
use crate::locator::HeaderLocator;
use crate::types::{ParseDiagnostics, ParseWarning, ParsedStatement, Upload};
use crate::workbook::{load_first_sheet, Sheet};

/// Stateless per call; share one instance across threads.
#[derive(Clone)]
pub struct StatementParser {
    registry: Arc<FormatRegistry>,
    /// Overrides the per-format lenient parser when set
    dates: Option<Arc<dyn DateTimeParser>>,
    ids: Arc<dyn IdMinter>,
}

impl StatementParser {
    /// Parser bound to a single format
    pub fn new(format: StatementFormat) -> Self {
        Self::with_registry(FormatRegistry::single(format))
    }

    /// Parser choosing among every format in `registry` per sheet
    pub fn with_registry(registry: FormatRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            dates: None,
            ids: Arc::new(RandomSuffixMinter),
        }
    }

    pub fn builtin() -> Self {
        Self::with_registry(FormatRegistry::builtin())
    }

    pub fn with_id_minter(mut self, ids: Arc<dyn IdMinter>) -> Self {
        self.ids = ids;
        self
    }

    pub fn with_date_parser(mut self, dates: Arc<dyn DateTimeParser>) -> Self {
        self.dates = Some(dates);
        self
    }

    pub fn registry(&self) -> &FormatRegistry {
        &self.registry
    }

    pub fn parse(&self, upload: &Upload) -> Result<ParsedStatement, IngestError> {
        let sheet = load_first_sheet(&upload.name, &upload.bytes)?;
        Ok(self.parse_sheet(upload, &sheet))
    }

    /// Run the pipeline on an already loaded sheet. `upload` supplies
    /// provenance only; its bytes are not read.
    pub fn parse_sheet(&self, upload: &Upload, sheet: &Sheet) -> ParsedStatement {
        let rows = &sheet.rows;
        let (format, detection) = self.registry.select(rows).unwrap_or_else(|| {
            let format = Arc::new(mfs_statement::format());
            let detection = HeaderLocator::new(&format).locate(rows);
            (format, detection)
        });

        let mut warnings = Vec::new();
        if sheet.ignored_sheets > 0 {
            warnings.push(ParseWarning::ExtraSheetsIgnored {
                count: sheet.ignored_sheets,
            });
        }
        if let Some(reason) = detection.fallback {
            warn!(
                file = %upload.name,
                format = %format.name,
                best_score = ?detection.best_score,
                ?reason,
                "no confident header row; using default headers"
            );
            warnings.push(ParseWarning::LowConfidenceHeaders {
                reason,
                best_score: detection.best_score,
            });
        }

        // coverage is judged on what the sheet itself says, not on the defaults
        let own_headers = detection.identified_headers.as_deref().unwrap_or_default();
        let critical_coverage = HeaderMapping::from_headers(own_headers, &format.catalog)
            .critical_coverage(&format.critical_fields);
        let required = format.scoring.required_critical();

        let data_start = detection.header_row + 1;
        let data_rows = rows.len().saturating_sub(data_start);

        let records = if critical_coverage < required {
            warn!(
                file = %upload.name,
                format = %format.name,
                found = critical_coverage,
                required,
                "too few critical headers; no records built"
            );
            warnings.push(ParseWarning::InsufficientCriticalCoverage {
                found: critical_coverage,
                required,
            });
            Vec::new()
        } else {
            let mapping = HeaderMapping::from_headers(&detection.headers, &format.catalog);
            let provenance = upload.provenance();
            let lenient;
            let dates: &dyn DateTimeParser = match &self.dates {
                Some(custom) => custom.as_ref(),
                None => {
                    lenient = LenientDateTimeParser::new(format.date_order);
                    &lenient
                }
            };
            let builder = RecordBuilder::new(&mapping, &provenance, dates, self.ids.as_ref());
            rows.iter()
                .enumerate()
                .skip(data_start)
                .filter_map(|(idx, cells)| builder.build(idx, cells))
                .collect()
        };

        let excluded_rows = data_rows - records.len();
        info!(
            file = %upload.name,
            format = %format.name,
            header_row = detection.header_row,
            records = records.len(),
            excluded = excluded_rows,
            "parsed statement"
        );

        ParsedStatement {
            records,
            headers: detection.headers,
            identified_headers: detection.identified_headers,
            diagnostics: ParseDiagnostics {
                header_row: detection.header_row,
                best_score: detection.best_score,
                header_fallback: detection.fallback,
                critical_coverage,
                data_rows,
                excluded_rows,
                warnings,
            },
            format: format.name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::ocr_dump;
    use crate::locator::FallbackReason;
    use chrono::NaiveDateTime;
    use mfs_core::{CellValue, Direction, Timestamp};

    struct FixedMinter;

    impl IdMinter for FixedMinter {
        fn mint(&self, source_file_id: &str, row_index: usize) -> String {
            format!("{source_file_id}#{row_index}")
        }
    }

    /// Always returns the same instant; proves the override is used
    struct Epoch;

    impl DateTimeParser for Epoch {
        fn parse(&self, _raw: &str) -> Option<NaiveDateTime> {
            chrono::DateTime::from_timestamp(0, 0).map(|dt| dt.naive_utc())
        }
    }

    fn row(cells: &[&str]) -> Vec<CellValue> {
        cells.iter().map(|c| CellValue::from(*c)).collect()
    }

    fn example_data() -> Vec<CellValue> {
        row(&[
            "1",
            "01/02/2023 10:00:00",
            "TXN123",
            "Send Money",
            "01700000000",
            "01800000000",
            "App",
            "ref1",
            "DR",
            "500.00",
            "1500.00",
            "Completed",
        ])
    }

    fn parse_rows(rows: Vec<Vec<CellValue>>) -> ParsedStatement {
        let upload = Upload::with_id("u1", "statement.xlsx", Vec::new());
        StatementParser::builtin()
            .with_id_minter(Arc::new(FixedMinter))
            .parse_sheet(&upload, &Sheet::from_rows("Sheet1", rows))
    }

    #[test]
    fn test_end_to_end_example() {
        let parsed = parse_rows(vec![row(&mfs_statement::DEFAULT_HEADERS), example_data()]);
        assert_eq!(parsed.format, mfs_statement::NAME);
        assert_eq!(parsed.records.len(), 1);
        let rec = &parsed.records[0];
        assert_eq!(rec.id, "u1#2");
        assert_eq!(rec.transaction_id, "TXN123");
        assert_eq!(rec.direction, Some(Direction::Debit));
        assert_eq!(rec.amount, Some(500.0));
        assert_eq!(parsed.diagnostics.header_row, 0);
        assert_eq!(parsed.diagnostics.warning_count(), 0);
        assert_eq!(parsed.headers, mfs_statement::DEFAULT_HEADERS.to_vec());
    }

    #[test]
    fn test_excluded_rows_balance_records() {
        let parsed = parse_rows(vec![
            row(&["Customer Statement"]),
            row(&mfs_statement::DEFAULT_HEADERS),
            example_data(),
            row(&["2", "", "", "", "", "", "", "", "", "", "", ""]),
            row(&[]),
            row(&["3", "garbage", "TXN9", "", "", "", "", "", "CR", "n/a", "", ""]),
        ]);
        let d = &parsed.diagnostics;
        assert_eq!(d.header_row, 1);
        assert_eq!(d.data_rows, 4);
        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.records.len(), d.data_rows - d.excluded_rows);
        assert_eq!(parsed.records[0].row_index, 3);
    }

    #[test]
    fn test_no_critical_headers_gives_empty_records() {
        let parsed = parse_rows(vec![
            row(&["Name", "Note", "Colour"]),
            row(&["a", "b", "c"]),
            row(&["d", "e", "f"]),
        ]);
        assert!(parsed.records.is_empty());
        assert_eq!(parsed.headers, mfs_statement::DEFAULT_HEADERS.to_vec());
        assert_eq!(parsed.diagnostics.critical_coverage, 0);
        assert_eq!(parsed.diagnostics.excluded_rows, 2);
        assert!(parsed.diagnostics.warnings.contains(&ParseWarning::InsufficientCriticalCoverage {
            found: 0,
            required: 2
        }));
        assert_eq!(
            parsed.diagnostics.header_fallback,
            Some(FallbackReason::LowConfidence)
        );
    }

    #[test]
    fn test_empty_sheet() {
        let parsed = parse_rows(Vec::new());
        assert!(parsed.records.is_empty());
        assert_eq!(parsed.identified_headers, None);
        assert_eq!(parsed.diagnostics.data_rows, 0);
        assert_eq!(parsed.diagnostics.header_fallback, Some(FallbackReason::NoCandidateRows));
    }

    #[test]
    fn test_single_format_parser_is_not_reselected() {
        let upload = Upload::with_id("u1", "dump.txt", Vec::new());
        let sheet = Sheet::from_rows("dump", vec![row(&mfs_statement::DEFAULT_HEADERS), example_data()]);
        let parsed = StatementParser::new(ocr_dump::format()).parse_sheet(&upload, &sheet);
        assert_eq!(parsed.format, ocr_dump::NAME);
        assert_eq!(parsed.records.len(), 1);
    }

    #[test]
    fn test_custom_date_parser_overrides_format_default() {
        let upload = Upload::with_id("u1", "s.csv", Vec::new());
        let sheet = Sheet::from_rows("s", vec![row(&mfs_statement::DEFAULT_HEADERS), example_data()]);
        let parsed = StatementParser::builtin()
            .with_date_parser(Arc::new(Epoch))
            .parse_sheet(&upload, &sheet);
        assert_eq!(
            parsed.records[0].timestamp.as_ref().map(Timestamp::to_string).as_deref(),
            Some("1970-01-01T00:00:00")
        );
    }

    #[test]
    fn test_extra_sheets_warning() {
        let upload = Upload::with_id("u1", "s.xlsx", Vec::new());
        let mut sheet = Sheet::from_rows("s", vec![row(&mfs_statement::DEFAULT_HEADERS), example_data()]);
        sheet.ignored_sheets = 2;
        let parsed = StatementParser::builtin().parse_sheet(&upload, &sheet);
        assert_eq!(parsed.diagnostics.warnings, vec![ParseWarning::ExtraSheetsIgnored { count: 2 }]);
        assert_eq!(parsed.records.len(), 1);
    }

    #[test]
    fn test_parse_reads_csv_bytes() {
        let text = "TXN ID,TXN_DATE_TIME,TXN_AMT,TXN_TYPE_DR_CR\nT1,02/01/2023 09:30,\"1,200.00\",CR\n";
        let upload = Upload::new("s.csv", text.as_bytes().to_vec());
        let parsed = StatementParser::builtin().parse(&upload).unwrap();
        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.records[0].amount, Some(1200.0));
        assert_eq!(parsed.records[0].source_file_id, upload.id);
    }

    #[test]
    fn test_parse_propagates_fatal_errors() {
        let upload = Upload::new("s.xlsx", Vec::new());
        assert!(matches!(
            StatementParser::builtin().parse(&upload),
            Err(IngestError::EmptyInput { .. })
        ));
    }
}
