use std::collections::BTreeMap;
use std::fmt;

/// One XML element owned by the pipeline.
///
/// Tags use the expanded form produced by the streaming reader: `local` when
/// the element has no namespace, `{uri}local` when it does.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    pub tag: String,
    /// Attributes in document order. Namespace declarations are not included.
    pub attributes: Vec<(String, String)>,
    /// Text before the first child, `None` if there was none.
    pub text: Option<String>,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    /// Tag with any `{uri}` or `prefix:` part removed.
    pub fn local_name(&self) -> &str {
        local_name(&self.tag)
    }

    /// Value of the attribute `name`, if present.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// First direct child whose expanded tag equals `tag`.
    pub fn child(&self, tag: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.tag == tag)
    }

    /// First direct child matching `path`.
    ///
    /// `path` is either a plain tag, an expanded `{uri}local` tag, or
    /// `prefix:local` where `prefix` is looked up in `namespaces`. An unknown
    /// prefix never matches.
    pub fn find(&self, path: &str, namespaces: Option<&BTreeMap<String, String>>) -> Option<&Element> {
        match path.split_once(':') {
            Some((prefix, local)) if !path.starts_with('{') => {
                let uri = namespaces.and_then(|ns| ns.get(prefix))?;
                let expanded = format!("{{{uri}}}{local}");
                self.child(&expanded)
            }
            _ => self.child(path),
        }
    }

    /// Text of the child matching `path`, or `default` when the child is
    /// missing. A present child without text yields an empty string.
    pub fn find_text<'a>(
        &'a self,
        path: &str,
        namespaces: Option<&BTreeMap<String, String>>,
        default: &'a str,
    ) -> &'a str {
        match self.find(path, namespaces) {
            Some(child) => child.text.as_deref().unwrap_or(""),
            None => default,
        }
    }

    /// Number of elements in this subtree, including `self`.
    pub fn element_count(&self) -> usize {
        1 + self.children.iter().map(Element::element_count).sum::<usize>()
    }
}

/// Strips a `{uri}` or `prefix:` qualifier from a tag.
pub fn local_name(tag: &str) -> &str {
    if let Some(idx) = tag.rfind('}') {
        return &tag[idx + 1..];
    }
    match tag.rfind(':') {
        Some(idx) => &tag[idx + 1..],
        None => tag,
    }
}

/// Value held by one field of a [`Record`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    /// A tag repeated under one parent, in document order
    List(Vec<String>),
    Bool(bool),
    Integer(i64),
    Decimal(f64),
    Null,
}

impl FieldValue {
    /// Text of a scalar text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            FieldValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => write!(f, "{s}"),
            FieldValue::List(items) => write!(f, "[{}]", items.join(", ")),
            FieldValue::Bool(b) => write!(f, "{b}"),
            FieldValue::Integer(i) => write!(f, "{i}"),
            FieldValue::Decimal(d) => write!(f, "{d}"),
            FieldValue::Null => Ok(()),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(value: Vec<String>) -> Self {
        FieldValue::List(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Decimal(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(FieldValue::Null, Into::into)
    }
}

/// One row: field names mapped to values, in first-insertion order.
///
/// Records are small (one entry per attribute or child tag), so lookups scan
/// the backing vector.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, FieldValue)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// Scalar text of `name`; `None` when absent or not a text value.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(FieldValue::as_text)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Sets `name` to `value`, replacing any previous value in place.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(key, _)| *key == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Adds text under `name`, turning a repeated name into a list.
    ///
    /// The first occurrence is stored as a scalar. The second promotes the
    /// field to a two-element list, and later occurrences append.
    pub fn append_text(&mut self, name: &str, text: String) {
        match self.fields.iter_mut().find(|(key, _)| key == name) {
            None => self.fields.push((name.to_string(), FieldValue::Text(text))),
            Some((_, FieldValue::List(items))) => items.push(text),
            Some((_, slot)) => {
                let first = std::mem::replace(slot, FieldValue::Null);
                *slot = FieldValue::List(vec![first.to_string(), text]);
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(key, _)| key.as_str())
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (key, value) in iter {
            record.insert(key, value);
        }
        record
    }
}

impl IntoIterator for Record {
    type Item = (String, FieldValue);
    type IntoIter = std::vec::IntoIter<(String, FieldValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

/// Records grouped by the batcher; at most `batch_size` long and never empty.
pub type Batch = Vec<Record>;

/// Structural summary of an XML document.
#[derive(Debug, Clone, PartialEq)]
pub struct FileInfo {
    pub root_tag: String,
    pub total_elements: usize,
    pub unique_tags: usize,
    /// Distinct expanded tags, sorted
    pub tags: Vec<String>,
    pub root_attributes: Vec<(String, String)>,
    pub file_size_mb: f64,
}

/// Outcome of inspecting a document that may not parse.
#[derive(Debug, Clone, PartialEq)]
pub enum FileInfoResult {
    Info(FileInfo),
    Error(String),
}
