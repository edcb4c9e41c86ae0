/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! Derived numbers computed from joined arrays.

use crate::entity_store::{json_type, Document};
use crate::error::{ViewError, ViewResult};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    /// Length of the joined array `of`.
    Count { of: &'static str, into: &'static str },
    /// Integer sum of `field` over the joined array `of`. A fractional value
    /// is a shape error.
    Sum {
        of: &'static str,
        field: &'static str,
        into: &'static str,
    },
    /// Sum of the lengths of the array `inner` on each element of `of`.
    SumOfCounts {
        of: &'static str,
        inner: &'static str,
        into: &'static str,
    },
}

pub fn apply(graph: &mut Document, aggregates: &[Aggregate]) -> ViewResult<()> {
    for agg in aggregates {
        let (into, value) = match *agg {
            Aggregate::Count { of, into } => (into, Value::from(count(graph, of)?)),
            Aggregate::Sum { of, field, into } => (into, Value::from(sum(graph, of, field)?)),
            Aggregate::SumOfCounts { of, inner, into } => {
                (into, Value::from(sum_of_counts(graph, of, inner)?))
            }
        };
        graph.insert(into.to_string(), value);
    }
    Ok(())
}

pub fn apply_all(graphs: &mut [Document], aggregates: &[Aggregate]) -> ViewResult<()> {
    graphs.iter_mut().try_for_each(|g| apply(g, aggregates))
}

pub fn count(graph: &Document, of: &str) -> ViewResult<u64> {
    Ok(joined(graph, of)?.len() as u64)
}

/// Missing or null values add nothing. Whole-valued floats such as `3.0`
/// count; `2.9` is rejected rather than truncated.
pub fn sum(graph: &Document, of: &str, field: &str) -> ViewResult<i64> {
    let mut total: i64 = 0;
    for item in joined(graph, of)? {
        let row = element(item, of)?;
        match row.get(field) {
            None | Some(Value::Null) => {}
            Some(Value::Number(n)) => {
                let v = match n.as_i64() {
                    Some(v) => v,
                    None => match n.as_f64() {
                        Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => f as i64,
                        Some(f) if f.fract() != 0.0 => {
                            return Err(ViewError::Shape(format!("`{of}.{field}` holds the fractional value {f}")))
                        }
                        _ => return Err(ViewError::Shape(format!("`{of}.{field}` is out of range"))),
                    },
                };
                total = total.saturating_add(v);
            }
            Some(other) => {
                return Err(ViewError::Shape(format!(
                    "`{of}.{field}` holds {} where a number was expected",
                    json_type(other)
                )))
            }
        }
    }
    Ok(total)
}

pub fn sum_of_counts(graph: &Document, of: &str, inner: &str) -> ViewResult<u64> {
    let mut total = 0u64;
    for item in joined(graph, of)? {
        total += count(element(item, of)?, inner)?;
    }
    Ok(total)
}

fn joined<'a>(graph: &'a Document, field: &str) -> ViewResult<&'a [Value]> {
    match graph.get(field) {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Array(items)) => Ok(items.as_slice()),
        Some(other) => Err(ViewError::Shape(format!(
            "`{field}` holds {} where an array was expected",
            json_type(other)
        ))),
    }
}

fn element<'a>(item: &'a Value, of: &str) -> ViewResult<&'a Document> {
    item.as_object().ok_or_else(|| {
        ViewError::Shape(format!("`{of}` holds {} where a document was expected", json_type(item)))
    })
}
