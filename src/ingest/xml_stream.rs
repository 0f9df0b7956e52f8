use crate::constants::READ_BUFFER_CAPACITY;
use crate::errors::{IngestError, IngestResult};
use crate::models::Element;
use quick_xml::encoding::Decoder;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::reader::NsReader;
use std::io::BufRead;
use tracing::debug;

/// A parsed unit of the document with namespaces already expanded.
pub(crate) enum Token {
    /// Start tag (or self-closing tag when `empty`), attributes filled in,
    /// no text or children yet
    Open { element: Element, empty: bool },
    Close,
    Text(String),
    Eof,
}

/// Pull tokenizer over quick-xml that also enforces the document-level rules
/// quick-xml leaves to the caller: exactly one root element, no stray text
/// around it, and no unclosed elements at end of input.
pub(crate) struct XmlTokens<R: BufRead> {
    reader: NsReader<R>,
    buf: Vec<u8>,
    depth: usize,
    seen_root: bool,
    root_closed: bool,
}

impl<R: BufRead> XmlTokens<R> {
    pub(crate) fn new(source: R) -> Self {
        let mut reader = NsReader::from_reader(source);
        reader.config_mut().trim_text(false);
        Self {
            reader,
            buf: Vec::with_capacity(READ_BUFFER_CAPACITY),
            depth: 0,
            seen_root: false,
            root_closed: false,
        }
    }

    fn position(&self) -> u64 {
        self.reader.buffer_position() as u64
    }

    fn error(&self, message: impl Into<String>) -> IngestError {
        IngestError::parse_at(message, self.position())
    }

    /// Reads until the next token worth reporting.
    pub(crate) fn next_token(&mut self) -> IngestResult<Token> {
        loop {
            self.buf.clear();
            let event = match self.reader.read_event_into(&mut self.buf) {
                Ok(event) => event,
                Err(err) => {
                    let position = self.reader.error_position() as u64;
                    return Err(IngestError::parse_at(err.to_string(), position));
                }
            };
            let position = self.reader.buffer_position() as u64;

            let token = match event {
                Event::Start(start) => Some(Token::Open {
                    element: open_element(&self.reader, &start)?,
                    empty: false,
                }),
                Event::Empty(start) => Some(Token::Open {
                    element: open_element(&self.reader, &start)?,
                    empty: true,
                }),
                Event::End(_) => Some(Token::Close),
                Event::Text(text) => {
                    let decoded = text.decode().map_err(|e| {
                        IngestError::parse_at(format!("Failed to decode XML text: {e}"), position)
                    })?;
                    Some(Token::Text(decoded.into_owned()))
                }
                Event::CData(cdata) => {
                    let decoded = cdata.decode().map_err(|e| {
                        IngestError::parse_at(format!("Failed to decode CDATA: {e}"), position)
                    })?;
                    Some(Token::Text(decoded.into_owned()))
                }
                Event::GeneralRef(reference) => {
                    let resolved = match reference
                        .resolve_char_ref()
                        .map_err(|e| IngestError::parse_at(e.to_string(), position))?
                    {
                        Some(ch) => ch.to_string(),
                        None => {
                            let name = reference.decode().map_err(|e| {
                                IngestError::parse_at(
                                    format!("Failed to decode entity name: {e}"),
                                    position,
                                )
                            })?;
                            resolve_predefined_entity(&name)
                                .ok_or_else(|| {
                                    IngestError::parse_at(
                                        format!("Unknown entity '&{name};'"),
                                        position,
                                    )
                                })?
                                .to_string()
                        }
                    };
                    Some(Token::Text(resolved))
                }
                Event::Eof => Some(Token::Eof),
                // Declarations, comments, processing instructions, doctype
                _ => None,
            };

            if let Some(token) = token {
                return self.check(token);
            }
        }
    }

    fn check(&mut self, token: Token) -> IngestResult<Token> {
        match &token {
            Token::Open { empty, .. } => {
                if self.depth == 0 {
                    if self.root_closed {
                        return Err(self.error("Junk after document element"));
                    }
                    self.seen_root = true;
                    if *empty {
                        self.root_closed = true;
                    }
                }
                if !*empty {
                    self.depth += 1;
                }
            }
            Token::Close => {
                if self.depth == 0 {
                    return Err(self.error("Unexpected closing tag"));
                }
                self.depth -= 1;
                if self.depth == 0 {
                    self.root_closed = true;
                }
            }
            Token::Text(text) => {
                if self.depth == 0 && !text.trim().is_empty() {
                    return Err(self.error("Text outside the root element"));
                }
            }
            Token::Eof => {
                if self.depth > 0 {
                    return Err(self.error(format!(
                        "Unexpected end of document: {} unclosed element(s)",
                        self.depth
                    )));
                }
                if !self.seen_root {
                    return Err(self.error("No root element found"));
                }
            }
        }
        Ok(token)
    }
}

/// Builds an attribute-only element from a start tag, expanding namespaced
/// names to `{uri}local`.
fn open_element<R>(reader: &NsReader<R>, start: &BytesStart) -> IngestResult<Element> {
    let position = reader.buffer_position() as u64;
    let (resolved, local) = reader.resolve_element(start.name());
    let tag = expand_name(reader.decoder(), resolved, local.as_ref(), position)?;

    let mut element = Element::new(tag);
    for attr in start.attributes() {
        let attr = attr.map_err(|e| IngestError::parse_at(e.to_string(), position))?;
        let key = attr.key.as_ref();
        if key == b"xmlns" || key.starts_with(b"xmlns:") {
            continue;
        }
        let (resolved, local) = reader.resolve_attribute(attr.key);
        let name = expand_name(reader.decoder(), resolved, local.as_ref(), position)?;
        let value = attr
            .decode_and_unescape_value(reader.decoder())
            .map_err(|e| IngestError::parse_at(e.to_string(), position))?;
        element.attributes.push((name, value.into_owned()));
    }
    Ok(element)
}

fn expand_name(
    decoder: Decoder,
    resolved: ResolveResult,
    local: &[u8],
    position: u64,
) -> IngestResult<String> {
    let decode = |bytes: &[u8], what: &str| {
        decoder
            .decode(bytes)
            .map(|name| name.into_owned())
            .map_err(|e| IngestError::parse_at(format!("Failed to decode {what}: {e}"), position))
    };
    let local = decode(local, "name")?;
    match resolved {
        ResolveResult::Bound(ns) => {
            let uri = decode(ns.as_ref(), "namespace")?;
            Ok(format!("{{{uri}}}{local}"))
        }
        ResolveResult::Unbound => Ok(local),
        ResolveResult::Unknown(prefix) => Err(IngestError::parse_at(
            format!(
                "Unbound namespace prefix '{}'",
                String::from_utf8_lossy(&prefix)
            ),
            position,
        )),
    }
}

/// Builds owned element trees from a token sequence.
///
/// Holds the chain of currently open elements. A finished element is either
/// attached to its parent or, when nothing is open, handed back as a root.
#[derive(Debug, Default)]
pub(crate) struct TreeBuilder {
    open: Vec<Element>,
}

impl TreeBuilder {
    pub(crate) fn is_empty(&self) -> bool {
        self.open.is_empty()
    }

    pub(crate) fn reset(&mut self) {
        self.open.clear();
    }

    /// Opens `element`, or returns it right away when it is self-closing.
    pub(crate) fn start(&mut self, element: Element, empty: bool) -> Option<Element> {
        if empty {
            Some(element)
        } else {
            self.open.push(element);
            None
        }
    }

    /// Finishes the innermost open element.
    pub(crate) fn end(&mut self) -> Option<Element> {
        self.open.pop()
    }

    /// Adds `element` to the innermost open element. Returns it back when
    /// there is no parent to take it.
    pub(crate) fn attach(&mut self, element: Element) -> Option<Element> {
        match self.open.last_mut() {
            Some(parent) => {
                parent.children.push(element);
                None
            }
            None => Some(element),
        }
    }

    /// Appends text to the innermost open element. Text after its first child
    /// is tail text and is dropped.
    pub(crate) fn text(&mut self, text: &str) {
        if let Some(top) = self.open.last_mut() {
            if top.children.is_empty() {
                top.text.get_or_insert_with(String::new).push_str(text);
            }
        }
    }
}

/// Incremental reader yielding every element whose tag equals the record tag.
///
/// Elements are yielded when they close, so a record nested inside another
/// record comes out first, and the outer record still holds it as a child.
/// Only the subtree of the outermost open record is kept in memory. The
/// element handed out by [`RecordStream::next_element`] borrows the stream, so
/// it must be fully consumed before the next pull; the next pull drops it.
///
/// Dropping the stream closes the underlying source, so a caller can stop
/// pulling at any point.
pub struct RecordStream<R: BufRead> {
    tokens: XmlTokens<R>,
    record_tag: String,
    /// Subtree of the outermost open record
    tree: TreeBuilder,
    current: Option<Element>,
    records: usize,
    finished: bool,
}

impl<R: BufRead> RecordStream<R> {
    pub fn new(source: R, record_tag: impl Into<String>) -> Self {
        Self {
            tokens: XmlTokens::new(source),
            record_tag: record_tag.into(),
            tree: TreeBuilder::default(),
            current: None,
            records: 0,
            finished: false,
        }
    }

    pub fn record_tag(&self) -> &str {
        &self.record_tag
    }

    /// Number of records yielded so far.
    pub fn records_read(&self) -> usize {
        self.records
    }

    /// Advances to the next record element.
    ///
    /// Returns `Ok(None)` once the document is exhausted. After an error the
    /// stream is finished and keeps returning `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns `IngestError::Parse` for malformed or truncated documents.
    pub fn next_element(&mut self) -> IngestResult<Option<&Element>> {
        self.current = None;
        if self.finished {
            return Ok(None);
        }

        match self.advance() {
            Ok(Some(element)) => {
                self.records += 1;
                let element: &Element = self.current.insert(element);
                Ok(Some(element))
            }
            Ok(None) => {
                self.finished = true;
                debug!(
                    record_tag = %self.record_tag,
                    records = self.records,
                    "Reached end of document"
                );
                Ok(None)
            }
            Err(err) => {
                self.finished = true;
                self.tree.reset();
                Err(err)
            }
        }
    }

    fn advance(&mut self) -> IngestResult<Option<Element>> {
        loop {
            let finished = match self.tokens.next_token()? {
                Token::Open { element, empty } => {
                    if self.tree.is_empty() && element.tag != self.record_tag {
                        continue;
                    }
                    self.tree.start(element, empty)
                }
                Token::Close => self.tree.end(),
                Token::Text(text) => {
                    self.tree.text(&text);
                    None
                }
                Token::Eof => return Ok(None),
            };

            let Some(element) = finished else {
                continue;
            };
            if element.tag == self.record_tag {
                if !self.tree.is_empty() {
                    self.tree.attach(element.clone());
                }
                return Ok(Some(element));
            }
            // Non-record elements only reach here inside an open record
            self.tree.attach(element);
        }
    }
}
