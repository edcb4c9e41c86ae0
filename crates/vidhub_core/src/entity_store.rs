/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! Document-level read primitives that a backing store must provide.

use crate::error::{StoreError, ViewError, ViewResult};
use crate::model::{fields, Collection};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use vidhub_protocol::Identifier;

/// One stored row, plus whatever joins and derived fields a pipeline adds.
pub type Document = serde_json::Map<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Id(Identifier),
    Text(String),
    Bool(bool),
    Int(i64),
}

impl From<Identifier> for FilterValue {
    fn from(v: Identifier) -> Self {
        FilterValue::Id(v)
    }
}

impl From<&str> for FilterValue {
    fn from(v: &str) -> Self {
        FilterValue::Text(v.to_string())
    }
}

impl From<bool> for FilterValue {
    fn from(v: bool) -> Self {
        FilterValue::Bool(v)
    }
}

impl From<i64> for FilterValue {
    fn from(v: i64) -> Self {
        FilterValue::Int(v)
    }
}

/// Predicate over dotted document paths (`owner`, `target.id`).
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    All,
    Eq(String, FilterValue),
    In(String, Vec<FilterValue>),
    /// Case-insensitive substring match.
    ContainsText(String, String),
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

impl Filter {
    pub fn eq(path: &str, value: impl Into<FilterValue>) -> Self {
        Filter::Eq(path.to_string(), value.into())
    }

    pub fn ids(path: &str, ids: &[Identifier]) -> Self {
        Filter::In(path.to_string(), ids.iter().copied().map(FilterValue::Id).collect())
    }

    pub fn contains_text(path: &str, needle: &str) -> Self {
        Filter::ContainsText(path.to_string(), needle.to_string())
    }

    pub fn and(self, other: Filter) -> Self {
        match self {
            Filter::All => other,
            Filter::And(mut all) => {
                all.push(other);
                Filter::And(all)
            }
            f => Filter::And(vec![f, other]),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub path: String,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn asc(path: &str) -> Self {
        Self { path: path.to_string(), direction: SortDirection::Asc }
    }

    pub fn desc(path: &str) -> Self {
        Self { path: path.to_string(), direction: SortDirection::Desc }
    }
}

/// `find` arguments. An empty `sort` means creation time, then id, ascending.
#[derive(Debug, Clone, PartialEq)]
pub struct FindQuery {
    pub filter: Filter,
    pub sort: Vec<SortKey>,
    pub skip: u64,
    pub limit: Option<u64>,
}

impl FindQuery {
    pub fn new(filter: Filter) -> Self {
        Self { filter, sort: Vec::new(), skip: 0, limit: None }
    }

    pub fn by_id(id: Identifier) -> Self {
        Self::new(Filter::eq(fields::ID, id)).window(0, Some(1))
    }

    pub fn sorted(mut self, sort: Vec<SortKey>) -> Self {
        self.sort = sort;
        self
    }

    pub fn window(mut self, skip: u64, limit: Option<u64>) -> Self {
        self.skip = skip;
        self.limit = limit;
        self
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find(&self, collection: Collection, query: &FindQuery) -> Result<Vec<Document>, StoreError>;

    async fn count(&self, collection: Collection, filter: &Filter) -> Result<u64, StoreError>;
}

/// Paths are spliced into store queries, so only `[A-Za-z0-9_.]` is allowed.
pub fn is_valid_path(path: &str) -> bool {
    !path.is_empty()
        && !path.starts_with('.')
        && !path.ends_with('.')
        && !path.contains("..")
        && path.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

pub fn get_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut cur = doc.get(parts.next()?)?;
    for part in parts {
        cur = cur.as_object()?.get(part)?;
    }
    Some(cur)
}

pub fn to_document<T: Serialize>(value: &T) -> Result<Document, StoreError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Malformed(format!(
            "entity serialized to {} instead of an object",
            json_type(&other)
        ))),
    }
}

/// Explicit conversion of a stored string into an [`Identifier`].
pub fn stored_identifier(raw: &str, path: &str) -> ViewResult<Identifier> {
    Identifier::parse(raw).map_err(|_| {
        ViewError::Shape(format!("`{path}` holds a raw string, not an identifier: {raw:?}"))
    })
}

/// Runs `f` on every object of the joined array `field`. Absent arrays are a no-op.
pub fn for_each_joined_mut(
    graph: &mut Document,
    field: &str,
    mut f: impl FnMut(&mut Document) -> ViewResult<()>,
) -> ViewResult<()> {
    match graph.get_mut(field) {
        None | Some(Value::Null) => Ok(()),
        Some(Value::Array(items)) => {
            for item in items {
                match item {
                    Value::Object(doc) => f(doc)?,
                    other => {
                        return Err(ViewError::Shape(format!(
                            "`{field}` holds {} where a document was expected",
                            json_type(other)
                        )))
                    }
                }
            }
            Ok(())
        }
        Some(other) => Err(ViewError::Shape(format!(
            "`{field}` holds {} where an array was expected",
            json_type(other)
        ))),
    }
}

pub fn json_type(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
