//! Schemaless document values.
//!
//! [`Value`] is a closed union mirroring JSON plus the store-native
//! identifier type. Two JSON renderings exist:
//!
//! - [`Value::to_json`] is the wire form: identifiers become plain hex strings.
//! - [`Value::to_extended_json`] is the storage form: identifiers become
//!   `{"$oid": "<hex>"}` so their type survives a round trip.
//!
//! Parsing from JSON recognises the `{"$oid": ...}` form in both directions,
//! client bodies included: a single-key object `{"$oid": "<24 hex>"}` sent by a
//! client is stored as an identifier and comes back as its plain hex string.
//! Any other `$oid` object is kept as an ordinary nested object.
//!
//! Integers keep their exact value: those that fit `i64` become
//! [`Value::Int`], larger unsigned ones [`Value::UInt`]. Only JSON numbers
//! with a fraction or exponent become [`Value::Float`].

use crate::id::DocumentId;
use crate::StoreError;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;

/// Name of the identifier field carried by every stored document.
pub const ID_FIELD: &str = "_id";

const OID_KEY: &str = "$oid";

#[derive(Clone, Debug)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    /// Unsigned integers above `i64::MAX`.
    UInt(u64),
    Float(f64),
    String(String),
    Array(Vec<Value>),
    Object(Document),
    Id(DocumentId),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Value::Object(doc) => Some(doc),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) | Value::UInt(_) | Value::Float(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Id(_) => "identifier",
        }
    }

    /// Interpret the value as an identifier: either a native id or its hex string.
    pub fn as_id(&self) -> Option<DocumentId> {
        match self {
            Value::Id(id) => Some(*id),
            Value::String(s) => DocumentId::parse_str(s).ok(),
            _ => None,
        }
    }

    /// Ordering between comparable values. Numbers compare with numbers,
    /// strings with strings, identifiers with identifiers; anything else is
    /// unordered.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::UInt(a), Value::UInt(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::UInt(b)) => Some((*a as i128).cmp(&(*b as i128))),
            (Value::UInt(a), Value::Int(b)) => Some((*a as i128).cmp(&(*b as i128))),
            (Value::UInt(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
            (Value::Float(a), Value::UInt(b)) => a.partial_cmp(&(*b as f64)),
            (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
            (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Id(a), Value::Id(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Loose truthiness used by operators such as `$exists`.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::UInt(u) => *u != 0,
            Value::Float(f) => *f != 0.0,
            _ => true,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        self.render(false)
    }

    pub fn to_extended_json(&self) -> serde_json::Value {
        self.render(true)
    }

    fn render(&self, extended: bool) -> serde_json::Value {
        use serde_json::Value as Json;

        match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(i) => Json::from(*i),
            Value::UInt(u) => Json::from(*u),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::String(s) => Json::String(s.clone()),
            Value::Array(items) => Json::Array(items.iter().map(|v| v.render(extended)).collect()),
            Value::Object(doc) => Json::Object(doc.render(extended)),
            Value::Id(id) if extended => {
                let mut map = serde_json::Map::with_capacity(1);
                map.insert(OID_KEY.to_string(), Json::String(id.to_hex()));
                Json::Object(map)
            }
            Value::Id(id) => Json::String(id.to_hex()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::UInt(a), Value::UInt(b)) => a == b,
            (Value::Int(i), Value::UInt(u)) | (Value::UInt(u), Value::Int(i)) => {
                *i as i128 == *u as i128
            }
            (Value::Int(i), Value::Float(f)) | (Value::Float(f), Value::Int(i)) => *i as f64 == *f,
            (Value::UInt(u), Value::Float(f)) | (Value::Float(f), Value::UInt(u)) => {
                *u as f64 == *f
            }
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Id(a), Value::Id(b)) => a == b,
            (Value::Id(id), Value::String(s)) | (Value::String(s), Value::Id(id)) => {
                id.to_hex().eq_ignore_ascii_case(s)
            }
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            _ => false,
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value as Json;

        match value {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => match (n.as_i64(), n.as_u64()) {
                (Some(i), _) => Value::Int(i),
                (None, Some(u)) => Value::UInt(u),
                (None, None) => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(s) => Value::String(s),
            Json::Array(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            Json::Object(map) => match extended_id(&map) {
                Some(id) => Value::Id(id),
                None => Value::Object(Document::from_json_map(map)),
            },
        }
    }
}

fn extended_id(map: &serde_json::Map<String, serde_json::Value>) -> Option<DocumentId> {
    if map.len() != 1 {
        return None;
    }
    map.get(OID_KEY)
        .and_then(|v| v.as_str())
        .and_then(|hex| DocumentId::parse_str(hex).ok())
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        i64::try_from(v).map_or(Value::UInt(v), Value::Int)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<DocumentId> for Value {
    fn from(v: DocumentId) -> Self {
        Value::Id(v)
    }
}

impl From<Document> for Value {
    fn from(v: Document) -> Self {
        Value::Object(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Array(v)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}

/// An insertion-ordered mapping from field name to [`Value`].
///
/// Equality ignores field order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Document {
    fields: IndexMap<String, Value>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Insert a field, returning the previous value. Existing keys keep their position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.fields.shift_remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// The document's identifier, if it carries one.
    pub fn id(&self) -> Option<DocumentId> {
        self.get(ID_FIELD).and_then(Value::as_id)
    }

    /// Resolve a dotted path such as `address.city` or `tags.0`.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        if let Some(value) = self.get(path) {
            return Some(value);
        }

        let mut segments = path.split('.');
        let mut current = self.get(segments.next()?)?;
        for segment in segments {
            current = match current {
                Value::Object(doc) => doc.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Key-wise last-write-wins merge: every field of `patch` overwrites the
    /// field of the same name, fields absent from `patch` are untouched.
    pub fn merge(&mut self, patch: Document) {
        for (key, value) in patch.fields {
            self.fields.insert(key, value);
        }
    }

    /// Return the document with `_id` set to `id` as its first field.
    pub fn with_id(mut self, id: DocumentId) -> Self {
        self.fields.shift_remove(ID_FIELD);
        let mut fields = IndexMap::with_capacity(self.fields.len() + 1);
        fields.insert(ID_FIELD.to_string(), Value::Id(id));
        fields.extend(self.fields);
        Self { fields }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(self.render(false))
    }

    pub fn to_extended_json(&self) -> serde_json::Value {
        serde_json::Value::Object(self.render(true))
    }

    fn render(&self, extended: bool) -> serde_json::Map<String, serde_json::Value> {
        self.fields
            .iter()
            .map(|(k, v)| (k.clone(), v.render(extended)))
            .collect()
    }

    pub fn from_json_map(map: serde_json::Map<String, serde_json::Value>) -> Self {
        map.into_iter().map(|(k, v)| (k, Value::from(v))).collect()
    }
}

impl TryFrom<serde_json::Value> for Document {
    type Error = StoreError;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        match value {
            serde_json::Value::Object(map) => Ok(Document::from_json_map(map)),
            other => Err(StoreError::InvalidDocument(format!(
                "expected a JSON object, got {}",
                json_type_name(&other)
            ))),
        }
    }
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

impl FromIterator<(String, Value)> for Document {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Document {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        Document::try_from(raw).map_err(serde::de::Error::custom)
    }
}
