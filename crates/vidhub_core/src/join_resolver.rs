/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! Left-outer joins between collections, described as data.
//!
//! Every row gets an array field per [`JoinSpec`], empty when nothing
//! matched. Sibling specs are looked up concurrently; nested specs run
//! against the rows their parent matched, one level deep at most.

use crate::entity_store::{get_path, json_type, stored_identifier, Document};
use crate::error::{ViewError, ViewResult};
use crate::model::{Collection, TargetKind};
use crate::store_adapter::{EntityStore, JoinIndex};
use futures_util::future::{try_join_all, BoxFuture, FutureExt};
use serde_json::Value;
use std::collections::HashSet;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use vidhub_protocol::Identifier;

pub const MAX_JOIN_DEPTH: usize = 2;

#[derive(Debug, Clone)]
pub struct JoinSpec {
    pub from: Collection,
    pub local_key: &'static str,
    pub foreign_key: &'static str,
    pub as_field: &'static str,
    pub kind: Option<TargetKind>,
    pub nested: Vec<JoinSpec>,
}

impl JoinSpec {
    pub fn new(
        from: Collection,
        local_key: &'static str,
        foreign_key: &'static str,
        as_field: &'static str,
    ) -> Self {
        Self {
            from,
            local_key,
            foreign_key,
            as_field,
            kind: None,
            nested: Vec::new(),
        }
    }

    pub fn of_kind(mut self, kind: TargetKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with(mut self, nested: JoinSpec) -> Self {
        self.nested.push(nested);
        self
    }

    pub fn depth(&self) -> usize {
        1 + self.nested.iter().map(JoinSpec::depth).max().unwrap_or(0)
    }
}

pub async fn resolve(
    store: &EntityStore,
    rows: Vec<Document>,
    specs: &[JoinSpec],
    cancel: &CancellationToken,
) -> ViewResult<Vec<Document>> {
    if let Some(spec) = specs.iter().find(|s| s.depth() > MAX_JOIN_DEPTH) {
        return Err(ViewError::Shape(format!(
            "join `{}` nests {} levels, at most {MAX_JOIN_DEPTH} are supported",
            spec.as_field,
            spec.depth()
        )));
    }
    attach(store, rows, specs, cancel).await
}

/// Join keys held by `path`: nothing for a missing or null field, one key for
/// a string, the distinct keys of an array in first-seen order.
pub fn local_keys(row: &Document, path: &str) -> ViewResult<Vec<Identifier>> {
    match get_path(row, path) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(raw)) => Ok(vec![stored_identifier(raw, path)?]),
        Some(Value::Array(items)) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                let Value::String(raw) = item else {
                    return Err(ViewError::Shape(format!(
                        "`{path}` holds {} inside its key array",
                        json_type(item)
                    )));
                };
                let key = stored_identifier(raw, path)?;
                if !out.contains(&key) {
                    out.push(key);
                }
            }
            Ok(out)
        }
        Some(other) => Err(ViewError::Shape(format!(
            "`{path}` holds {} where a join key was expected",
            json_type(other)
        ))),
    }
}

fn attach<'a>(
    store: &'a EntityStore,
    mut rows: Vec<Document>,
    specs: &'a [JoinSpec],
    cancel: &'a CancellationToken,
) -> BoxFuture<'a, ViewResult<Vec<Document>>> {
    async move {
        if specs.is_empty() || rows.is_empty() {
            return Ok(rows);
        }

        let mut keys_per_spec = Vec::with_capacity(specs.len());
        for spec in specs {
            let per_row = rows
                .iter()
                .map(|row| local_keys(row, spec.local_key))
                .collect::<ViewResult<Vec<_>>>()?;
            keys_per_spec.push(per_row);
        }

        let indexes = try_join_all(
            specs
                .iter()
                .zip(&keys_per_spec)
                .map(|(spec, per_row)| lookup(store, spec, per_row, cancel)),
        )
        .await?;

        for ((spec, per_row), index) in specs.iter().zip(&keys_per_spec).zip(&indexes) {
            for (row, keys) in rows.iter_mut().zip(per_row) {
                let matched = keys
                    .iter()
                    .filter_map(|k| index.get(k))
                    .flatten()
                    .cloned()
                    .map(Value::Object)
                    .collect();
                row.insert(spec.as_field.to_string(), Value::Array(matched));
            }
            debug!(from = %spec.from, into = spec.as_field, matched = index.len(), "join attached");
        }
        Ok(rows)
    }
    .boxed()
}

async fn lookup(
    store: &EntityStore,
    spec: &JoinSpec,
    per_row: &[Vec<Identifier>],
    cancel: &CancellationToken,
) -> ViewResult<JoinIndex> {
    let mut seen = HashSet::new();
    let keys: Vec<Identifier> = per_row
        .iter()
        .flatten()
        .copied()
        .filter(|k| seen.insert(*k))
        .collect();
    let mut index = store
        .join(spec.from, spec.foreign_key, &keys, spec.kind, cancel)
        .await?;
    if spec.nested.is_empty() {
        return Ok(index);
    }

    let mut owners = Vec::new();
    let mut matched = Vec::new();
    for key in &keys {
        if let Some(found) = index.remove(key) {
            for row in found {
                owners.push(*key);
                matched.push(row);
            }
        }
    }
    let matched = attach(store, matched, &spec.nested, cancel).await?;
    let mut out = JoinIndex::new();
    for (key, row) in owners.into_iter().zip(matched) {
        out.entry(key).or_default().push(row);
    }
    Ok(out)
}
