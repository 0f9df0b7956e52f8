use crate::config::{IngestConfig, IngestJobFile};
use crate::constants::DEFAULT_BATCH_SIZE;
use crate::errors::{IngestError, IngestResult};
use crate::ingest::{find_xml_files, inspect, write_parquet, Ingestor, Table, XmlSource};
use crate::ui::{create_spinner, format_duration, round_two_decimals};
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

// CLI metadata constants
const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
const APP_AUTHOR: &str = env!("CARGO_PKG_AUTHORS");
const APP_ABOUT: &str = env!("CARGO_PKG_DESCRIPTION");

/// Summary of one ingest run.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestSummary {
    pub files: usize,
    pub records: usize,
    /// Bytes written to the Parquet output, if one was written
    pub output_bytes: Option<u64>,
}

fn build_command() -> Command<'static> {
    Command::new("xml-ingest")
        .version(APP_VERSION)
        .author(APP_AUTHOR)
        .about(APP_ABOUT)
        .subcommand(
            Command::new("ingest")
                .about("Stream records out of an XML file or a directory of XML files")
                .after_help("Example:\n  xml-ingest ingest data/products.xml -t product -b 500 -o products.parquet")
                .arg(
                    Arg::new("input")
                        .help("XML file, or directory searched recursively for .xml files")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("tag")
                        .short('t')
                        .long("tag")
                        .help("Tag of the elements that form one record")
                        .required(true)
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("batch_size")
                        .short('b')
                        .long("batch-size")
                        .help("Records per batch")
                        .value_parser(clap::value_parser!(usize))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .help("Parquet file to write the records to")
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("keep_whitespace")
                        .long("keep-whitespace")
                        .help("Keep surrounding whitespace in extracted text")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("schema")
                        .long("schema")
                        .help("XSD to validate every input against before ingesting")
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Set),
                ),
        )
        .subcommand(
            Command::new("info")
                .about("Summarize the structure of an XML file")
                .arg(
                    Arg::new("input")
                        .help("Path to the XML file")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf)),
                ),
        )
        .subcommand(
            Command::new("toml")
                .about("Run an ingest job described by a TOML file")
                .arg(
                    Arg::new("config")
                        .help("Path to the TOML job file")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf)),
                ),
        )
}

/// Parses command-line arguments and runs the selected subcommand.
///
/// - `ingest`: stream records from a file or directory, optionally into Parquet
/// - `info`: log a structural summary of one file
/// - `toml`: run an ingest job loaded from a TOML file
///
/// Without a subcommand the help text is printed.
pub fn cli() -> IngestResult<()> {
    let cmd = build_command();
    let mut cmd_for_help = cmd.clone();
    let matches = cmd.get_matches();

    match matches.subcommand() {
        Some(("ingest", sub)) => {
            let (input, output, config) = ingest_args(sub)?;
            run_ingest(&input, output.as_deref(), config, false)?;
        }
        Some(("info", sub)) => {
            let input = required_path(sub, "input")?;
            run_info(&input)?;
        }
        Some(("toml", sub)) => {
            let config_path = required_path(sub, "config")?;
            let job = IngestJobFile::from_toml_file(&config_path)?;
            run_ingest(&job.input, job.output.as_deref(), job.ingest, job.prefixed_names)?;
        }
        _ => {
            cmd_for_help
                .print_help()
                .map_err(|e| IngestError::Io(format!("Failed to print help: {e}")))?;
        }
    }

    Ok(())
}

fn required_path(matches: &ArgMatches, name: &str) -> IngestResult<PathBuf> {
    matches
        .get_one::<PathBuf>(name)
        .cloned()
        .ok_or_else(|| IngestError::InvalidInput(format!("Missing required argument '{name}'")))
}

fn ingest_args(sub: &ArgMatches) -> IngestResult<(PathBuf, Option<PathBuf>, IngestConfig)> {
    let input = required_path(sub, "input")?;
    let tag = sub
        .get_one::<String>("tag")
        .ok_or_else(|| IngestError::InvalidInput("Missing required argument 'tag'".into()))?;

    let mut config = IngestConfig::for_tag(tag.as_str())
        .with_batch_size(sub.get_one::<usize>("batch_size").copied().unwrap_or(DEFAULT_BATCH_SIZE))
        .with_strip_whitespace(!sub.get_flag("keep_whitespace"));
    if let Some(schema) = sub.get_one::<PathBuf>("schema") {
        config = config.with_schema(schema.clone());
    }

    Ok((input, sub.get_one::<PathBuf>("output").cloned(), config))
}

/// Ingests every XML file under `input` and optionally writes all records to
/// one Parquet file.
///
/// Files are processed in sorted order, each validated first when the config
/// enables it. Records are only kept in memory when `output` is given.
///
/// # Errors
///
/// Stops at the first file that fails validation or parsing.
pub fn run_ingest(
    input: &Path,
    output: Option<&Path>,
    config: IngestConfig,
    prefixed_names: bool,
) -> IngestResult<IngestSummary> {
    let start = Instant::now();
    let files = find_xml_files(input)?;
    let mut ingestor = Ingestor::new(config)?;
    if prefixed_names {
        ingestor = ingestor.with_prefixed_names();
    }

    info!(
        input = %input.display(),
        files = files.len(),
        record_tag = %ingestor.config().record_tag,
        batch_size = ingestor.config().batch_size,
        "Starting ingestion"
    );

    let mut table = output.map(|_| Table::new());
    let mut records = 0usize;

    for file in &files {
        let source = XmlSource::path(file);
        ingestor.ensure_valid(source)?;

        let spinner = create_spinner(&source.describe())?;
        let mut file_records = 0usize;
        for batch in ingestor.batches(source)? {
            let batch = match batch {
                Ok(batch) => batch,
                Err(err) => {
                    spinner.abandon_with_message("failed");
                    return Err(err);
                }
            };
            file_records += batch.len();
            spinner.set_message(format!("{file_records} records"));
            if let Some(table) = table.as_mut() {
                table.push_batch(batch);
            }
        }
        spinner.finish_and_clear();

        records += file_records;
        info!(file = %file.display(), records = file_records, "File ingested");
    }

    let output_bytes = match (output, table) {
        (Some(path), Some(table)) if !table.is_empty() => Some(write_parquet(&table, path)?),
        (Some(path), _) => {
            warn!(output = %path.display(), "No records matched. Parquet file not written");
            None
        }
        _ => None,
    };

    info!(
        files = files.len(),
        records,
        elapsed = %format_duration(start.elapsed()),
        "Ingestion completed"
    );

    Ok(IngestSummary {
        files: files.len(),
        records,
        output_bytes,
    })
}

fn run_info(input: &Path) -> IngestResult<()> {
    let info = inspect(XmlSource::path(input))?;
    info!(
        file = %input.display(),
        root_tag = %info.root_tag,
        total_elements = info.total_elements,
        unique_tags = info.unique_tags,
        file_size_mb = round_two_decimals(info.file_size_mb),
        "File summary"
    );
    info!(tags = ?info.tags, root_attributes = ?info.root_attributes, "File structure");
    Ok(())
}
