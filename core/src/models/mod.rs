//! Data model shared by the transforms.
//!
//! - [`Row`] - one line of a delimited file
//! - [`Record`] - field name to value, built from one row
//! - [`FieldIndexMap`] - field name to column position
//! - [`ModelStore`] - the persistence collaborator ingestion writes to
//! - [`Attributes`] - read access to persisted records for extraction
//! - [`ExtractField`] - a field to extract, plain or foreign key

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

/// Ordered string cells of one line.
pub type Row = Vec<String>;

// =============================================================================
// Record
// =============================================================================

/// Field name to value mapping handed to a [`ModelStore`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(BTreeMap<String, String>);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(field.into(), value.into())
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn into_inner(self) -> BTreeMap<String, String> {
        self.0
    }

    /// Record as a JSON object of string values.
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.0
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect(),
        )
    }

    /// Deserialize the record into a typed model.
    ///
    /// Every value is a JSON string, so target fields must accept strings
    /// (use `String`, or a deserializer that parses).
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.to_json())
    }
}

impl From<BTreeMap<String, String>> for Record {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

// =============================================================================
// Field Index Map
// =============================================================================

/// Target field name to zero-based source column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldIndexMap(BTreeMap<String, usize>);

impl FieldIndexMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map every header cell to its own position.
    ///
    /// Empty header cells are ignored; a repeated name keeps its first column.
    pub fn from_header(header: &[String]) -> Self {
        let mut map = BTreeMap::new();
        for (index, name) in header.iter().enumerate() {
            let name = name.trim();
            if !name.is_empty() {
                map.entry(name.to_string()).or_insert(index);
            }
        }
        Self(map)
    }

    pub fn insert(&mut self, field: impl Into<String>, index: usize) -> Option<usize> {
        self.0.insert(field.into(), index)
    }

    pub fn get(&self, field: &str) -> Option<usize> {
        self.0.get(field).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Minimum row width that satisfies every mapping.
    pub fn required_width(&self) -> usize {
        self.0.values().map(|i| i + 1).max().unwrap_or(0)
    }
}

impl<K: Into<String>> FromIterator<(K, usize)> for FieldIndexMap {
    fn from_iter<I: IntoIterator<Item = (K, usize)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

// =============================================================================
// Model Store
// =============================================================================

/// Persistence collaborator: builds model instances and saves them.
///
/// Ingestion calls [`build`](ModelStore::build) then [`save`](ModelStore::save)
/// once per accepted row, unless an after-create hook takes over.
pub trait ModelStore {
    type Instance;
    type Error: std::error::Error + Send + Sync + 'static;

    fn build(&self, record: Record) -> Result<Self::Instance, Self::Error>;

    fn save(&mut self, instance: Self::Instance) -> Result<(), Self::Error>;
}

impl<S: ModelStore + ?Sized> ModelStore for &mut S {
    type Instance = S::Instance;
    type Error = S::Error;

    fn build(&self, record: Record) -> Result<Self::Instance, Self::Error> {
        (**self).build(record)
    }

    fn save(&mut self, instance: Self::Instance) -> Result<(), Self::Error> {
        (**self).save(instance)
    }
}

// =============================================================================
// Attributes
// =============================================================================

/// Read access to one persisted record.
///
/// `None` means the value is absent (SQL `NULL`, JSON `null`, or no such
/// attribute); extraction writes it as the text `None`.
pub trait Attributes {
    fn attribute(&self, name: &str) -> Option<String>;
}

impl<T: Attributes + ?Sized> Attributes for &T {
    fn attribute(&self, name: &str) -> Option<String> {
        (**self).attribute(name)
    }
}

impl Attributes for Record {
    fn attribute(&self, name: &str) -> Option<String> {
        self.get(name).map(str::to_string)
    }
}

impl Attributes for BTreeMap<String, String> {
    fn attribute(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

impl<S: BuildHasher> Attributes for HashMap<String, String, S> {
    fn attribute(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

impl Attributes for Map<String, Value> {
    fn attribute(&self, name: &str) -> Option<String> {
        self.get(name).and_then(value_text)
    }
}

impl Attributes for Value {
    fn attribute(&self, name: &str) -> Option<String> {
        self.as_object().and_then(|obj| obj.attribute(name))
    }
}

/// Text form of a JSON scalar; `null` is absent.
fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

// =============================================================================
// Extract Field
// =============================================================================

/// A field named for extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum ExtractField {
    /// Read the attribute of the same name.
    Plain(String),
    /// A relation; read its identifier column `<name>_id`.
    ForeignKey(String),
}

impl ExtractField {
    pub fn new(name: impl Into<String>) -> Self {
        ExtractField::Plain(name.into())
    }

    pub fn foreign_key(name: impl Into<String>) -> Self {
        ExtractField::ForeignKey(name.into())
    }

    /// Attribute (and header) name the field resolves to.
    pub fn column_name(&self) -> String {
        match self {
            ExtractField::Plain(name) => name.clone(),
            ExtractField::ForeignKey(name) => format!("{}_id", name),
        }
    }
}

impl From<&str> for ExtractField {
    fn from(name: &str) -> Self {
        ExtractField::new(name)
    }
}

impl From<String> for ExtractField {
    fn from(name: String) -> Self {
        ExtractField::Plain(name)
    }
}

// =============================================================================
// Test support
// =============================================================================
