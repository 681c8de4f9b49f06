//! Document-shaped query predicates.
//!
//! A filter is a [`Document`] evaluated against each stored document. Keys
//! are field names or dotted paths; values are either literals (equality) or
//! operator objects whose keys all start with `$`. The empty filter matches
//! everything.

use crate::value::{Document, Value};
use crate::StoreError;
use std::cmp::Ordering;

const LOGICAL_OPERATORS: &[&str] = &["$and", "$or", "$nor"];
const FIELD_OPERATORS: &[&str] = &[
    "$eq", "$ne", "$gt", "$gte", "$lt", "$lte", "$in", "$nin", "$exists",
];

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Filter(Document);

impl Filter {
    /// The filter that selects every document.
    pub fn all() -> Self {
        Self::default()
    }

    /// Validate and wrap a filter document.
    pub fn new(query: Document) -> Result<Self, StoreError> {
        validate(&query)?;
        Ok(Self(query))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_document(&self) -> &Document {
        &self.0
    }

    pub fn matches(&self, doc: &Document) -> bool {
        matches_document(&self.0, doc)
    }
}

impl TryFrom<Document> for Filter {
    type Error = StoreError;

    fn try_from(query: Document) -> Result<Self, Self::Error> {
        Self::new(query)
    }
}

fn validate(query: &Document) -> Result<(), StoreError> {
    for (key, cond) in query.iter() {
        if key.starts_with('$') {
            if !LOGICAL_OPERATORS.contains(&key) {
                return Err(StoreError::InvalidFilter(format!(
                    "unknown top level operator: {key}"
                )));
            }
            let branches = cond.as_array().ok_or_else(|| {
                StoreError::InvalidFilter(format!("{key} must be an array of filters"))
            })?;
            if branches.is_empty() {
                return Err(StoreError::InvalidFilter(format!(
                    "{key} must be a nonempty array"
                )));
            }
            for branch in branches {
                let branch = branch.as_document().ok_or_else(|| {
                    StoreError::InvalidFilter(format!("{key} entries must be objects"))
                })?;
                validate(branch)?;
            }
            continue;
        }

        let Value::Object(ops) = cond else {
            continue;
        };
        let dollar_keys = ops.keys().filter(|k| k.starts_with('$')).count();
        if dollar_keys == 0 {
            continue;
        }
        if dollar_keys != ops.len() {
            return Err(StoreError::InvalidFilter(format!(
                "cannot mix operators and literal fields under '{key}'"
            )));
        }
        for (op, operand) in ops.iter() {
            if !FIELD_OPERATORS.contains(&op) {
                return Err(StoreError::InvalidFilter(format!("unknown operator: {op}")));
            }
            if matches!(op, "$in" | "$nin") && operand.as_array().is_none() {
                return Err(StoreError::InvalidFilter(format!("{op} needs an array")));
            }
        }
    }
    Ok(())
}

fn matches_document(query: &Document, doc: &Document) -> bool {
    query.iter().all(|(key, cond)| match key {
        "$and" => branches(cond).all(|b| matches_document(b, doc)),
        "$or" => branches(cond).any(|b| matches_document(b, doc)),
        "$nor" => !branches(cond).any(|b| matches_document(b, doc)),
        path => matches_field(doc.get_path(path), cond),
    })
}

fn branches(cond: &Value) -> impl Iterator<Item = &Document> {
    cond.as_array()
        .unwrap_or_default()
        .iter()
        .filter_map(Value::as_document)
}

fn operator_object(cond: &Value) -> Option<&Document> {
    match cond {
        Value::Object(ops) if !ops.is_empty() && ops.keys().all(|k| k.starts_with('$')) => {
            Some(ops)
        }
        _ => None,
    }
}

fn matches_field(actual: Option<&Value>, cond: &Value) -> bool {
    match operator_object(cond) {
        Some(ops) => ops.iter().all(|(op, operand)| apply(op, actual, operand)),
        None => equals(actual, cond),
    }
}

fn apply(op: &str, actual: Option<&Value>, operand: &Value) -> bool {
    match op {
        "$eq" => equals(actual, operand),
        "$ne" => !equals(actual, operand),
        "$gt" => ordered(actual, operand, |o| o == Ordering::Greater),
        "$gte" => ordered(actual, operand, |o| o != Ordering::Less),
        "$lt" => ordered(actual, operand, |o| o == Ordering::Less),
        "$lte" => ordered(actual, operand, |o| o != Ordering::Greater),
        "$in" => operand
            .as_array()
            .is_some_and(|candidates| candidates.iter().any(|c| equals(actual, c))),
        "$nin" => !operand
            .as_array()
            .is_some_and(|candidates| candidates.iter().any(|c| equals(actual, c))),
        "$exists" => actual.is_some() == operand.is_truthy(),
        _ => false,
    }
}

/// Equality with array semantics: an array field matches a literal when
/// any element equals it, or when the whole array equals it.
fn equals(actual: Option<&Value>, expected: &Value) -> bool {
    match actual {
        None => expected.is_null(),
        Some(Value::Array(items)) => {
            items.iter().any(|item| item == expected) || actual == Some(expected)
        }
        Some(value) => value == expected,
    }
}

fn ordered(actual: Option<&Value>, operand: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
    match actual {
        None => false,
        Some(Value::Array(items)) => items
            .iter()
            .any(|item| item.compare(operand).is_some_and(&accept)),
        Some(value) => value.compare(operand).is_some_and(accept),
    }
}
