use thiserror::Error;

/// Errors surfaced by the ingestion pipeline.
///
/// Only conditions the pipeline cannot recover from end up here. Bad field
/// values and a missing schema validator are logged and degraded instead.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Malformed XML at the byte or structure level
    #[error("{}", format_parse_error(.message, .position))]
    Parse {
        message: String,
        /// Byte offset into the source where the parser stopped, if known
        position: Option<u64>,
    },
    /// The document did not pass schema validation, or the validator failed
    #[error("Validation error: {0}")]
    Validation(String),
    /// A caller-supplied transform rejected an element
    #[error("Transform error: {0}")]
    Transform(String),
    /// Invalid configuration or argument
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// IO operation failed
    #[error("IO error: {0}")]
    Io(String),
    /// Building or writing the tabular output failed
    #[error("Table error: {0}")]
    Table(String),
}

fn format_parse_error(message: &str, position: &Option<u64>) -> String {
    match position {
        Some(pos) => format!("XML parsing error at byte {pos}: {message}"),
        None => format!("XML parsing error: {message}"),
    }
}

impl IngestError {
    /// Builds a parse error anchored at a byte offset.
    pub fn parse_at(message: impl Into<String>, position: u64) -> Self {
        IngestError::Parse {
            message: message.into(),
            position: Some(position),
        }
    }

    /// Returns true for malformed-document errors.
    pub fn is_parse(&self) -> bool {
        matches!(self, IngestError::Parse { .. })
    }
}

impl From<std::io::Error> for IngestError {
    fn from(err: std::io::Error) -> Self {
        IngestError::Io(err.to_string())
    }
}

impl From<quick_xml::Error> for IngestError {
    fn from(err: quick_xml::Error) -> Self {
        IngestError::Parse {
            message: err.to_string(),
            position: None,
        }
    }
}

impl From<polars::error::PolarsError> for IngestError {
    fn from(err: polars::error::PolarsError) -> Self {
        IngestError::Table(err.to_string())
    }
}

impl From<toml::de::Error> for IngestError {
    fn from(err: toml::de::Error) -> Self {
        IngestError::InvalidInput(format!("Failed to parse config: {err}"))
    }
}

pub type IngestResult<T> = Result<T, IngestError>;
