use crate::errors::{IngestError, IngestResult};
use encoding_rs::{Encoding, UTF_8};
use std::fs::File;
use std::io::{BufRead, BufReader, Cursor, Read};
use std::path::{Path, PathBuf};

/// Where an XML document is read from.
///
/// A source can be opened any number of times; every open returns an
/// independent reader, which is what lets validation and ingestion each make
/// their own pass.
#[derive(Debug, Clone, Copy)]
pub enum XmlSource<'a> {
    File(&'a Path),
    Bytes(&'a [u8]),
}

impl<'a> XmlSource<'a> {
    pub fn path(path: &'a Path) -> Self {
        XmlSource::File(path)
    }

    pub fn bytes(content: &'a [u8]) -> Self {
        XmlSource::Bytes(content)
    }

    /// Opens a fresh buffered reader over the document.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be opened.
    pub fn open(&self) -> IngestResult<Box<dyn BufRead + 'a>> {
        match *self {
            XmlSource::File(path) => {
                let file = File::open(path).map_err(|e| {
                    IngestError::Io(format!("Failed to open XML file {path:?}: {e}"))
                })?;
                Ok(Box::new(BufReader::new(file)))
            }
            XmlSource::Bytes(content) => Ok(Box::new(Cursor::new(content))),
        }
    }

    /// Like [`XmlSource::open`], but a document that names no encoding of its
    /// own (no byte order mark, no `encoding` in its XML declaration) is read as
    /// `fallback`.
    ///
    /// The declaration is added or completed on the fly, so parse positions in
    /// such documents are offset by the inserted bytes.
    pub fn open_with_fallback(
        &self,
        fallback: &'static Encoding,
    ) -> IngestResult<Box<dyn BufRead + 'a>> {
        let mut reader = self.open()?;
        if fallback == UTF_8 {
            return Ok(reader);
        }

        let head = reader.fill_buf().map_err(|e| {
            IngestError::Io(format!("Failed to read {}: {e}", self.describe()))
        })?;
        let Some(prelude) = encoding_prelude(head, fallback.name()) else {
            return Ok(reader);
        };
        reader.consume(prelude.replaced);
        Ok(Box::new(Cursor::new(prelude.bytes).chain(reader)))
    }

    /// Size of the document in bytes.
    pub fn size_bytes(&self) -> IngestResult<u64> {
        match *self {
            XmlSource::File(path) => {
                let metadata = std::fs::metadata(path).map_err(|e| {
                    IngestError::Io(format!("Failed to read metadata for {path:?}: {e}"))
                })?;
                Ok(metadata.len())
            }
            XmlSource::Bytes(content) => Ok(content.len() as u64),
        }
    }

    /// Human-readable label for log fields.
    pub fn describe(&self) -> String {
        match self {
            XmlSource::File(path) => path.display().to_string(),
            XmlSource::Bytes(content) => format!("<{} bytes in memory>", content.len()),
        }
    }
}

impl<'a> From<&'a Path> for XmlSource<'a> {
    fn from(path: &'a Path) -> Self {
        XmlSource::File(path)
    }
}

impl<'a> From<&'a PathBuf> for XmlSource<'a> {
    fn from(path: &'a PathBuf) -> Self {
        XmlSource::File(path.as_path())
    }
}

impl<'a> From<&'a [u8]> for XmlSource<'a> {
    fn from(content: &'a [u8]) -> Self {
        XmlSource::Bytes(content)
    }
}

/// Declaration bytes to read in place of the first `replaced` input bytes.
struct Prelude {
    bytes: Vec<u8>,
    replaced: usize,
}

const BYTE_ORDER_MARKS: [&[u8]; 3] = [b"\xEF\xBB\xBF", b"\xFF\xFE", b"\xFE\xFF"];

fn encoding_prelude(head: &[u8], label: &str) -> Option<Prelude> {
    if BYTE_ORDER_MARKS.iter().any(|bom| head.starts_with(bom)) {
        return None;
    }

    let has_declaration =
        head.starts_with(b"<?xml") && head.get(5).is_some_and(u8::is_ascii_whitespace);
    if !has_declaration {
        return Some(Prelude {
            bytes: format!("<?xml version=\"1.0\" encoding=\"{label}\"?>").into_bytes(),
            replaced: 0,
        });
    }

    // A declaration longer than the buffered head is left alone
    let end = head.windows(2).position(|w| w == b"?>")?;
    let declaration = &head[..end];
    if declaration.windows(8).any(|w| w == b"encoding") {
        return None;
    }
    let mut bytes = declaration.to_vec();
    bytes.extend_from_slice(format!(" encoding=\"{label}\"?>").as_bytes());
    Some(Prelude {
        bytes,
        replaced: end + 2,
    })
}
