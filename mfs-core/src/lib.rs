//! mfs-core: canonical record types shared by the statement ingestion pipeline
//! and its consumers.

pub mod cell;
pub mod field;
pub mod record;

pub use cell::CellValue;
pub use field::{CanonicalField, FieldKind};
pub use record::{Direction, Timestamp, TransactionRecord};

/// ISO-8601 layout used for every canonical timestamp
pub const ISO_DATETIME: &str = "%Y-%m-%dT%H:%M:%S";
