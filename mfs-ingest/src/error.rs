use thiserror::Error;

/// Fatal ingestion failures. Everything else is recovered inside the parse
/// and reported through `ParseDiagnostics`.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("{file}: file is empty")]
    EmptyInput { file: String },

    #[error("{file}: unreadable workbook: {source}")]
    Workbook {
        file: String,
        #[source]
        source: calamine::Error,
    },

    #[error("{file}: workbook has no sheets")]
    NoSheets { file: String },

    #[error("{file}: unreadable text table: {source}")]
    Csv {
        file: String,
        #[source]
        source: csv::Error,
    },
}

impl IngestError {
    pub fn file(&self) -> &str {
        match self {
            IngestError::EmptyInput { file }
            | IngestError::Workbook { file, .. }
            | IngestError::NoSheets { file }
            | IngestError::Csv { file, .. } => file,
        }
    }
}
