use crate::config::IngestConfig;
use crate::errors::{IngestError, IngestResult};
use crate::ingest::batcher::Batches;
use crate::ingest::extractor::{ElementTransformer, PrefixedNames, RecordExtractor};
use crate::ingest::schema::{default_validator, SchemaValidator};
use crate::ingest::source::XmlSource;
use crate::ingest::table::Table;
use crate::ingest::xml_stream::{RecordStream, Token, TreeBuilder, XmlTokens};
use crate::models::{Element, Record};
use encoding_rs::Encoding;
use std::io::BufRead;
use tracing::{info, warn};

/// Streaming reader over an opened [`XmlSource`].
pub type SourceStream<'a> = RecordStream<Box<dyn BufRead + 'a>>;

/// Entry point tying configuration, extraction and validation together.
///
/// ```no_run
/// use xml_ingest::config::IngestConfig;
/// use xml_ingest::ingest::{Ingestor, XmlSource};
/// use std::path::Path;
///
/// # fn main() -> xml_ingest::errors::IngestResult<()> {
/// let ingestor = Ingestor::new(IngestConfig::for_tag("item").with_batch_size(500))?;
/// for batch in ingestor.batches(XmlSource::path(Path::new("data.xml")))? {
///     let batch = batch?;
///     println!("{} records", batch.len());
/// }
/// # Ok(())
/// # }
/// ```
pub struct Ingestor {
    config: IngestConfig,
    extractor: RecordExtractor,
    validator: Option<Box<dyn SchemaValidator + Send + Sync>>,
    /// Decoder for documents that do not declare their encoding
    encoding: &'static Encoding,
}

impl Ingestor {
    /// Creates an ingestor with the default extractor and the validator
    /// compiled into this build.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the configuration fails
    /// [`IngestConfig::validate`].
    pub fn new(config: IngestConfig) -> IngestResult<Self> {
        config.validate()?;
        let encoding = config.source_encoding()?;
        let extractor = RecordExtractor::new(config.strip_whitespace);
        Ok(Self {
            config,
            extractor,
            validator: default_validator(),
            encoding,
        })
    }

    /// Replaces the schema validator.
    pub fn with_validator(mut self, validator: impl SchemaValidator + Send + Sync + 'static) -> Self {
        self.validator = Some(Box::new(validator));
        self
    }

    /// Removes the schema validator; validation then fails open.
    pub fn without_validator(mut self) -> Self {
        self.validator = None;
        self
    }

    /// Names child fields in a configured namespace `prefix:local` instead of
    /// by their bare local name.
    pub fn with_prefixed_names(mut self) -> Self {
        if let Some(namespaces) = &self.config.namespaces {
            self.extractor = RecordExtractor::new(self.config.strip_whitespace)
                .with_strategy(PrefixedNames::new(namespaces));
        }
        self
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Converts one element with the default extractor.
    pub fn extract(&self, element: &Element) -> Record {
        self.extractor.extract(element)
    }

    /// Opens a streaming reader for the configured record tag.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the source cannot be opened.
    pub fn stream<'a>(&self, source: XmlSource<'a>) -> IngestResult<SourceStream<'a>> {
        Ok(RecordStream::new(self.open(source)?, self.config.record_tag.as_str()))
    }

    fn open<'a>(&self, source: XmlSource<'a>) -> IngestResult<Box<dyn BufRead + 'a>> {
        source.open_with_fallback(self.encoding)
    }

    /// Batches of records produced by the default extractor.
    pub fn batches<'a>(
        &'a self,
        source: XmlSource<'a>,
    ) -> IngestResult<Batches<'a, Box<dyn BufRead + 'a>>> {
        self.batches_with(source, |element: &Element| -> IngestResult<Record> {
            Ok(self.extractor.extract(element))
        })
    }

    /// Batches of records produced by a caller-supplied transform.
    pub fn batches_with<'a, T>(
        &self,
        source: XmlSource<'a>,
        transform: T,
    ) -> IngestResult<Batches<'a, Box<dyn BufRead + 'a>>>
    where
        T: ElementTransformer + 'a,
    {
        let stream = self.stream(source)?;
        Ok(Batches::new(stream, self.config.batch_size, Box::new(transform)))
    }

    /// Validates the document against the configured schema.
    ///
    /// Returns `Ok(true)` without reading anything when validation is disabled.
    /// When no validator is available the document is treated as valid and a
    /// warning is logged.
    pub fn validate(&self, source: XmlSource<'_>) -> IngestResult<bool> {
        if !self.config.validate_schema {
            return Ok(true);
        }
        let Some(schema) = self.config.schema_path.as_deref() else {
            warn!("Schema validation enabled but no schema_path configured. Skipping validation.");
            return Ok(true);
        };
        let Some(validator) = self.validator.as_ref() else {
            warn!(
                schema = %schema.display(),
                "Schema validation support is not available. Skipping validation."
            );
            return Ok(true);
        };
        validator.validate(source, schema)
    }

    /// Like [`Ingestor::validate`], but a non-conforming document is an error.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the document does not conform or validation
    /// could not run.
    pub fn ensure_valid(&self, source: XmlSource<'_>) -> IngestResult<()> {
        if self.validate(source)? {
            Ok(())
        } else {
            Err(IngestError::Validation(format!(
                "XML validation failed for {}",
                source.describe()
            )))
        }
    }

    /// Ingests the whole document into a table using the default extractor.
    ///
    /// Validates first when `validate_schema` is enabled. A document without
    /// matching records gives an empty table.
    pub fn assemble(&self, source: XmlSource<'_>) -> IngestResult<Table> {
        self.ensure_valid(source)?;
        let table = Table::from_batches(self.batches(source)?)?;
        info!(source = %source.describe(), records = table.len(), "Ingested total records");
        Ok(table)
    }

    /// Ingests the whole document into a table using a custom transform.
    ///
    /// Errors returned by `transform` abort the ingestion unchanged.
    pub fn assemble_with<'a, T>(&self, source: XmlSource<'a>, transform: T) -> IngestResult<Table>
    where
        T: ElementTransformer + 'a,
    {
        self.ensure_valid(source)?;
        let table = Table::from_batches(self.batches_with(source, transform)?)?;
        info!(source = %source.describe(), records = table.len(), "Ingested total records");
        Ok(table)
    }

    /// Loads the entire document as one element tree.
    ///
    /// Memory grows with document size; meant for small files.
    ///
    /// # Errors
    ///
    /// Returns `Parse` for malformed documents and `Io` if the source cannot
    /// be opened.
    pub fn load_document(&self, source: XmlSource<'_>) -> IngestResult<Element> {
        let mut tokens = XmlTokens::new(self.open(source)?);
        let mut tree = TreeBuilder::default();
        let mut root: Option<Element> = None;

        loop {
            let finished = match tokens.next_token()? {
                Token::Open { element, empty } => tree.start(element, empty),
                Token::Close => tree.end(),
                Token::Text(text) => {
                    tree.text(&text);
                    None
                }
                Token::Eof => break,
            };
            if let Some(element) = finished {
                if let Some(top) = tree.attach(element) {
                    root = Some(top);
                }
            }
        }

        let root = root.ok_or_else(|| IngestError::Parse {
            message: "No root element found".to_string(),
            position: None,
        })?;
        info!(source = %source.describe(), root_tag = %root.tag, "Loaded XML document");
        Ok(root)
    }
}

/// One-call ingestion with default settings for the given record tag.
pub fn quick_table(source: XmlSource<'_>, record_tag: &str) -> IngestResult<Table> {
    Ingestor::new(IngestConfig::for_tag(record_tag))?.assemble(source)
}
