//! xml-ingest library
//!
//! Streams large XML documents into flat records without loading the whole
//! document into memory. The `xml-ingest` binary is a thin layer over this
//! crate; implementation and tests live in their modules.
//!
//! ## Overview
//!
//! - [`ingest`] - Streaming reader, record extraction, batching, validation and table output
//! - [`config`] - Ingestion settings and TOML job files
//! - [`models`] - Element tree, field values and records
//! - [`cli`] - Command-line interface for ingesting and inspecting files
//! - [`errors`] - Error types used throughout the crate
//!
//! ## Example Usage
//!
//! ```no_run
//! use xml_ingest::config::IngestConfig;
//! use xml_ingest::errors::IngestResult;
//! use xml_ingest::ingest::{Ingestor, XmlSource};
//! use std::path::Path;
//!
//! # fn example() -> IngestResult<()> {
//! let ingestor = Ingestor::new(IngestConfig::for_tag("product").with_batch_size(500))?;
//! let table = ingestor.assemble(XmlSource::path(Path::new("products.xml")))?;
//! let df = table.to_dataframe()?;
//! println!("{df}");
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;
pub mod ingest;
pub mod models;
pub mod ui;
