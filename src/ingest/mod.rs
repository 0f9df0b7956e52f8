//! Streaming XML ingestion.
//!
//! Documents are read with a pull parser, matching elements are turned into
//! [`Record`](crate::models::Record)s one at a time, grouped into batches and
//! optionally gathered into a [`Table`]. Memory stays bounded by the batch
//! size, not by the document size.

mod batcher;
mod coerce;
mod extractor;
mod file_finder;
mod inspect;
mod parquet_writer;
mod pipeline;
mod schema;
mod source;
mod table;
mod xml_stream;

pub use batcher::Batches;
pub use coerce::{classify, coerce, Coerced, FieldType};
pub use extractor::{ElementTransformer, LocalNames, NamespaceStrategy, PrefixedNames, RecordExtractor};
pub use file_finder::find_xml_files;
pub use inspect::{inspect, inspect_or_error};
pub use parquet_writer::write_parquet;
pub use pipeline::{quick_table, Ingestor, SourceStream};
#[cfg(feature = "xsd")]
pub use schema::XsdValidator;
pub use schema::{default_validator, SchemaValidator};
pub use source::XmlSource;
pub use table::Table;
pub use xml_stream::RecordStream;
