use crate::constants::{DEFAULT_BATCH_SIZE, DEFAULT_ENCODING, DEFAULT_RECORD_TAG};
use crate::errors::{IngestError, IngestResult};
use encoding_rs::Encoding;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Settings for one ingestion run.
///
/// Every field has a concrete default, so a partially filled TOML table
/// deserializes into a usable value. Construct it, call [`IngestConfig::validate`],
/// and treat it as immutable afterwards.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IngestConfig {
    /// Number of records per batch. Bounds the peak number of records held
    /// between the reader and the consumer.
    pub batch_size: usize,
    /// Tag marking one logical record. Namespaced tags are matched in their
    /// expanded `{uri}local` form.
    pub record_tag: String,
    /// Prefix to namespace URI mappings used for `prefix:local` lookups and
    /// prefixed field names.
    pub namespaces: Option<BTreeMap<String, String>>,
    /// Whether to validate the document against `schema_path` before ingesting.
    pub validate_schema: bool,
    /// Path to the XSD used when `validate_schema` is enabled.
    pub schema_path: Option<PathBuf>,
    /// Encoding assumed for documents that declare none. A byte order mark or
    /// the XML declaration takes precedence.
    pub encoding: String,
    /// Trim surrounding whitespace from extracted text.
    pub strip_whitespace: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            record_tag: DEFAULT_RECORD_TAG.to_string(),
            namespaces: None,
            validate_schema: false,
            schema_path: None,
            encoding: DEFAULT_ENCODING.to_string(),
            strip_whitespace: true,
        }
    }
}

impl IngestConfig {
    /// Default configuration for the given record tag.
    pub fn for_tag(record_tag: impl Into<String>) -> Self {
        Self {
            record_tag: record_tag.into(),
            ..Self::default()
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_namespaces(mut self, namespaces: BTreeMap<String, String>) -> Self {
        self.namespaces = Some(namespaces);
        self
    }

    pub fn with_schema(mut self, schema_path: impl Into<PathBuf>) -> Self {
        self.validate_schema = true;
        self.schema_path = Some(schema_path.into());
        self
    }

    pub fn with_strip_whitespace(mut self, strip: bool) -> Self {
        self.strip_whitespace = strip;
        self
    }

    /// Checks the invariants the pipeline relies on.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if `batch_size` is 0, `record_tag` is empty, or
    /// `encoding` is not a supported encoding label.
    pub fn validate(&self) -> IngestResult<()> {
        if self.batch_size == 0 {
            return Err(IngestError::InvalidInput(
                "Batch size must be greater than 0".into(),
            ));
        }
        if self.record_tag.trim().is_empty() {
            return Err(IngestError::InvalidInput(
                "Record tag must not be empty".into(),
            ));
        }
        self.source_encoding()?;
        Ok(())
    }

    /// Resolves `encoding` to a decoder.
    ///
    /// Accepts the WHATWG labels (`utf-8`, `latin1`, `iso-8859-15`,
    /// `windows-1252`, `shift_jis`, ...) of encodings that keep ASCII bytes as
    /// ASCII, which the XML tokenizer relies on. UTF-16 is therefore rejected.
    pub fn source_encoding(&self) -> IngestResult<&'static Encoding> {
        let encoding = Encoding::for_label(self.encoding.trim().as_bytes()).ok_or_else(|| {
            IngestError::InvalidInput(format!("Unknown encoding '{}'", self.encoding))
        })?;
        if !encoding.is_ascii_compatible() {
            return Err(IngestError::InvalidInput(format!(
                "Unsupported encoding '{}': only ASCII-compatible encodings can be parsed",
                self.encoding
            )));
        }
        Ok(encoding)
    }

    /// Resolves a `prefix` against the configured namespaces.
    pub fn namespace_uri(&self, prefix: &str) -> Option<&str> {
        self.namespaces
            .as_ref()
            .and_then(|ns| ns.get(prefix))
            .map(String::as_str)
    }
}

/// An ingest job loaded from a TOML file.
///
/// ```toml
/// input = "data/products.xml"
/// output = "data/products.parquet"
///
/// [ingest]
/// record_tag = "product"
/// batch_size = 500
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IngestJobFile {
    /// XML file or directory of XML files to ingest
    pub input: PathBuf,
    /// Parquet file to write; nothing is written when absent
    pub output: Option<PathBuf>,
    /// Name fields from configured namespaces `prefix:local`
    #[serde(default)]
    pub prefixed_names: bool,
    /// Pipeline settings; every key is optional
    #[serde(default)]
    pub ingest: IngestConfig,
}

impl IngestJobFile {
    /// Loads and validates a job description from a TOML file.
    ///
    /// Unknown keys are rejected so typos are not silently ignored.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be read and `InvalidInput` if the TOML is
    /// malformed, `input` is missing, or the `[ingest]` table fails
    /// [`IngestConfig::validate`].
    pub fn from_toml_file(path: &Path) -> IngestResult<Self> {
        let contents = fs::read_to_string(path)?;
        let job: IngestJobFile = toml::from_str(&contents)?;
        job.ingest.validate()?;
        Ok(job)
    }
}
