use crate::errors::IngestResult;
use crate::ingest::source::XmlSource;
use crate::ingest::xml_stream::{Token, XmlTokens};
use crate::models::{FileInfo, FileInfoResult};
use std::collections::BTreeSet;
use tracing::warn;

pub(crate) fn mb_from_bytes(bytes: u64) -> f64 {
    bytes as f64 / 1_048_576.0
}

/// Summarizes the structure of a document in one streaming pass.
///
/// Tags are reported in expanded form (`{uri}local` for namespaced elements).
///
/// # Errors
///
/// Returns `Io` if the source cannot be opened and `Parse` if it is not
/// well-formed.
pub fn inspect(source: XmlSource<'_>) -> IngestResult<FileInfo> {
    let file_size_mb = mb_from_bytes(source.size_bytes()?);
    let mut tokens = XmlTokens::new(source.open()?);

    let mut root: Option<(String, Vec<(String, String)>)> = None;
    let mut total_elements = 0usize;
    let mut tags: BTreeSet<String> = BTreeSet::new();

    loop {
        match tokens.next_token()? {
            Token::Open { element, .. } => {
                total_elements += 1;
                if root.is_none() {
                    root = Some((element.tag.clone(), element.attributes));
                }
                tags.insert(element.tag);
            }
            Token::Eof => break,
            Token::Close | Token::Text(_) => {}
        }
    }

    // The tokenizer rejects documents without a root before reaching Eof
    let (root_tag, root_attributes) = root.unwrap_or_default();

    Ok(FileInfo {
        root_tag,
        total_elements,
        unique_tags: tags.len(),
        tags: tags.into_iter().collect(),
        root_attributes,
        file_size_mb,
    })
}

/// Like [`inspect`], but reports failures as a value instead of an error.
pub fn inspect_or_error(source: XmlSource<'_>) -> FileInfoResult {
    match inspect(source) {
        Ok(info) => FileInfoResult::Info(info),
        Err(err) => {
            warn!(source = %source.describe(), error = %err, "Failed to inspect XML document");
            FileInfoResult::Error(err.to_string())
        }
    }
}
