use crate::errors::IngestResult;
use crate::ingest::source::XmlSource;
use std::path::Path;

/// Checks a document against an external schema before ingestion.
///
/// Returns `Ok(false)` when the document does not conform (details are logged
/// by the implementation) and `Err` when validation itself could not run.
pub trait SchemaValidator {
    fn validate(&self, document: XmlSource<'_>, schema: &Path) -> IngestResult<bool>;
}

/// The validator compiled into this build, if any.
///
/// Builds without the `xsd` feature have none; schema validation then fails
/// open with a warning.
pub fn default_validator() -> Option<Box<dyn SchemaValidator + Send + Sync>> {
    #[cfg(feature = "xsd")]
    {
        Some(Box::new(xsd::XsdValidator))
    }
    #[cfg(not(feature = "xsd"))]
    {
        None
    }
}

#[cfg(feature = "xsd")]
pub use xsd::XsdValidator;

#[cfg(feature = "xsd")]
mod xsd {
    use super::SchemaValidator;
    use crate::errors::{IngestError, IngestResult};
    use crate::ingest::source::XmlSource;
    use crate::ingest::xml_stream::{Token, XmlTokens};
    use libxml::error::StructuredError;
    use libxml::parser::Parser;
    use libxml::schemas::{SchemaParserContext, SchemaValidationContext};
    use std::path::Path;
    use tracing::{debug, error};

    /// XSD validation backed by libxml2.
    ///
    /// Enforces everything the schema expresses: where each element may
    /// appear, order, cardinality, required attributes and simple types.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct XsdValidator;

    fn messages(errors: &[StructuredError]) -> Vec<String> {
        errors
            .iter()
            .map(|err| {
                let message = err
                    .message
                    .as_deref()
                    .unwrap_or("unknown error")
                    .trim()
                    .to_string();
                match err.line {
                    Some(line) => format!("line {line}: {message}"),
                    None => message,
                }
            })
            .collect()
    }

    fn utf8_path(path: &Path) -> IngestResult<&str> {
        path.to_str().ok_or_else(|| {
            IngestError::Validation(format!("Path {path:?} is not valid UTF-8"))
        })
    }

    impl XsdValidator {
        fn load_schema(schema: &Path) -> IngestResult<SchemaValidationContext> {
            if !schema.is_file() {
                return Err(IngestError::Validation(format!(
                    "Schema file {schema:?} not found"
                )));
            }
            let mut parser = SchemaParserContext::from_file(utf8_path(schema)?);
            SchemaValidationContext::from_parser(&mut parser).map_err(|errors| {
                IngestError::Validation(format!(
                    "Failed to load schema {schema:?}: {}",
                    messages(&errors).join("; ")
                ))
            })
        }

        /// libxml2 recovers from some malformed input; those documents are
        /// errors here, not failed validations.
        fn check_well_formed(document: XmlSource<'_>) -> IngestResult<()> {
            let mut tokens = XmlTokens::new(document.open()?);
            loop {
                match tokens.next_token() {
                    Ok(Token::Eof) => return Ok(()),
                    Ok(_) => {}
                    Err(e) => {
                        return Err(IngestError::Validation(format!(
                            "Failed to parse {}: {e}",
                            document.describe()
                        )))
                    }
                }
            }
        }
    }

    impl SchemaValidator for XsdValidator {
        fn validate(&self, document: XmlSource<'_>, schema: &Path) -> IngestResult<bool> {
            let mut context = Self::load_schema(schema)?;
            Self::check_well_formed(document)?;

            let parser = Parser::default();
            let parsed = match document {
                XmlSource::File(path) => parser.parse_file(utf8_path(path)?),
                XmlSource::Bytes(content) => parser.parse_string(content),
            }
            .map_err(|e| {
                IngestError::Validation(format!(
                    "Failed to load {} for validation: {e:?}",
                    document.describe()
                ))
            })?;

            match context.validate_document(&parsed) {
                Ok(()) => {
                    debug!(
                        document = %document.describe(),
                        schema = %schema.display(),
                        "XML validation passed"
                    );
                    Ok(true)
                }
                Err(errors) => {
                    for problem in messages(&errors) {
                        error!(
                            document = %document.describe(),
                            schema = %schema.display(),
                            "XML validation failed: {problem}"
                        );
                    }
                    Ok(false)
                }
            }
        }
    }

}
