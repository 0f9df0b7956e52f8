use crate::errors::IngestResult;
use crate::models::{local_name, Element, Record};
use std::collections::BTreeMap;

/// Turns one streamed element into a record.
///
/// Implemented by the default [`RecordExtractor`] and by any closure of the
/// form `Fn(&Element) -> IngestResult<Record>`. Errors returned by a transform
/// abort the ingestion and reach the caller unchanged.
pub trait ElementTransformer {
    fn transform(&self, element: &Element) -> IngestResult<Record>;
}

impl<F> ElementTransformer for F
where
    F: Fn(&Element) -> IngestResult<Record>,
{
    fn transform(&self, element: &Element) -> IngestResult<Record> {
        self(element)
    }
}

/// Decides the field name used for a child element.
pub trait NamespaceStrategy {
    fn field_name(&self, tag: &str) -> String;
}

/// Drops the namespace: `{uri}price` and `ns:price` both become `price`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalNames;

impl NamespaceStrategy for LocalNames {
    fn field_name(&self, tag: &str) -> String {
        local_name(tag).to_string()
    }
}

/// Names children in a known namespace `prefix:local`, everything else by its
/// local name.
#[derive(Debug, Clone, Default)]
pub struct PrefixedNames {
    prefixes: BTreeMap<String, String>,
}

impl PrefixedNames {
    /// Builds the strategy from a prefix to URI map.
    pub fn new(namespaces: &BTreeMap<String, String>) -> Self {
        let prefixes = namespaces
            .iter()
            .map(|(prefix, uri)| (uri.clone(), prefix.clone()))
            .collect();
        Self { prefixes }
    }
}

impl NamespaceStrategy for PrefixedNames {
    fn field_name(&self, tag: &str) -> String {
        if let Some(rest) = tag.strip_prefix('{') {
            if let Some((uri, local)) = rest.split_once('}') {
                if let Some(prefix) = self.prefixes.get(uri) {
                    return format!("{prefix}:{local}");
                }
                return local.to_string();
            }
        }
        local_name(tag).to_string()
    }
}

/// Generic element-to-record conversion.
///
/// Attributes are copied as-is. Each direct child contributes its text under
/// the name chosen by the namespace strategy; a repeated child name becomes a
/// list in document order. Grandchildren are ignored.
pub struct RecordExtractor {
    strip_whitespace: bool,
    names: Box<dyn NamespaceStrategy + Send + Sync>,
}

impl RecordExtractor {
    pub fn new(strip_whitespace: bool) -> Self {
        Self {
            strip_whitespace,
            names: Box::new(LocalNames),
        }
    }

    /// Replaces the strategy used to name child fields.
    pub fn with_strategy(mut self, names: impl NamespaceStrategy + Send + Sync + 'static) -> Self {
        self.names = Box::new(names);
        self
    }

    pub fn extract(&self, element: &Element) -> Record {
        let mut record = Record::new();

        for (name, value) in &element.attributes {
            record.insert(name.as_str(), value.as_str());
        }

        for child in &element.children {
            let name = self.names.field_name(&child.tag);
            let text = child.text.as_deref().unwrap_or("");
            let text = if self.strip_whitespace {
                text.trim()
            } else {
                text
            };
            record.append_text(&name, text.to_string());
        }

        record
    }
}

impl Default for RecordExtractor {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ElementTransformer for RecordExtractor {
    fn transform(&self, element: &Element) -> IngestResult<Record> {
        Ok(self.extract(element))
    }
}
