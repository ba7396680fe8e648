//! mfs-ingest: statement ingestion for MFS exports and OCR dumps: header
//! detection, cell normalization and canonical record building.

pub mod builder;
pub mod catalog;
pub mod datetime;
pub mod error;
pub mod formats;
pub mod locator;
pub mod normalize;
pub mod parser;
pub mod types;
pub mod workbook;

pub use builder::{HeaderMapping, IdMinter, Provenance, RandomSuffixMinter, RecordBuilder};
pub use catalog::HeaderCatalog;
pub use datetime::{DateOrder, DateTimeParser, LenientDateTimeParser};
pub use error::IngestError;
pub use formats::{FormatDefinition, FormatRegistry, ScoringConfig, StatementFormat};
pub use locator::{FallbackReason, HeaderDetection, HeaderLocator, RowScore};
pub use parser::StatementParser;
pub use types::{ParseDiagnostics, ParseWarning, ParsedStatement, Upload};
pub use workbook::{load_first_sheet, Sheet};
