// Ingestion defaults
pub const DEFAULT_BATCH_SIZE: usize = 1000;
pub const DEFAULT_RECORD_TAG: &str = "record";
pub const DEFAULT_ENCODING: &str = "utf-8";

// Text accepted as boolean true (compared case-insensitively)
pub const TRUTHY_VALUES: &[&str] = &["true", "1", "yes", "on"];

// Reader buffer size in bytes
pub const READ_BUFFER_CAPACITY: usize = 8192;

// File extensions picked up when ingesting a directory
pub const XML_EXTENSIONS: &[&str] = &["xml"];
