/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! Typed, cancellable access to a [`DocumentStore`], shared by every view.

use crate::entity_store::{get_path, json_type, stored_identifier, Document, DocumentStore, Filter, FindQuery};
use crate::error::{StoreError, ViewError, ViewResult};
use crate::model::{fields, Collection, Entity, TargetKind};
use rand::{thread_rng, Rng};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use vidhub_protocol::Identifier;

pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(100);

/// Transient failures get one retry, nothing else does.
const MAX_ATTEMPTS: u32 = 2;

/// Foreign rows grouped by the value of their join key.
pub type JoinIndex = HashMap<Identifier, Vec<Document>>;

#[derive(Clone)]
pub struct EntityStore {
    backend: Arc<dyn DocumentStore>,
    retry_backoff: Duration,
}

impl EntityStore {
    pub fn new(backend: Arc<dyn DocumentStore>) -> Self {
        Self {
            backend,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        }
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    pub async fn find(
        &self,
        collection: Collection,
        query: &FindQuery,
        cancel: &CancellationToken,
    ) -> ViewResult<Vec<Document>> {
        self.call(cancel, "find", collection, || self.backend.find(collection, query))
            .await
    }

    pub async fn count(
        &self,
        collection: Collection,
        filter: &Filter,
        cancel: &CancellationToken,
    ) -> ViewResult<u64> {
        self.call(cancel, "count", collection, || self.backend.count(collection, filter))
            .await
    }

    pub async fn get<T: Entity>(&self, id: &Identifier, cancel: &CancellationToken) -> ViewResult<Option<T>> {
        let rows = self.find(T::COLLECTION, &FindQuery::by_id(*id), cancel).await?;
        rows.into_iter()
            .next()
            .map(|doc| {
                serde_json::from_value(Value::Object(doc)).map_err(|e| {
                    ViewError::Shape(format!("{} {id} does not decode: {e}", T::COLLECTION))
                })
            })
            .transpose()
    }

    /// Fetches every row of `from` whose `foreign_key` is one of `keys`, in a
    /// single lookup. `kind` restricts polymorphic rows to one target kind.
    pub async fn join(
        &self,
        from: Collection,
        foreign_key: &str,
        keys: &[Identifier],
        kind: Option<TargetKind>,
        cancel: &CancellationToken,
    ) -> ViewResult<JoinIndex> {
        let mut index = JoinIndex::new();
        if keys.is_empty() {
            return Ok(index);
        }
        let mut filter = Filter::ids(foreign_key, keys);
        if let Some(kind) = kind {
            filter = filter.and(Filter::eq(fields::TARGET_KIND, kind.as_str()));
        }
        let rows = self.find(from, &FindQuery::new(filter), cancel).await?;
        for row in rows {
            let key = match get_path(&row, foreign_key) {
                Some(Value::String(raw)) => stored_identifier(raw, foreign_key)?,
                Some(other) => {
                    return Err(ViewError::Shape(format!(
                        "{from}.{foreign_key} holds {}",
                        json_type(other)
                    )))
                }
                None => {
                    return Err(ViewError::Shape(format!("{from}.{foreign_key} is missing")))
                }
            };
            index.entry(key).or_default().push(row);
        }
        Ok(index)
    }

    async fn call<T, F, Fut>(
        &self,
        cancel: &CancellationToken,
        op: &'static str,
        collection: Collection,
        run: F,
    ) -> ViewResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let res = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ViewError::Cancelled),
                res = run() => res,
            };
            match res {
                Ok(v) => return Ok(v),
                Err(StoreError::Unavailable(msg)) if attempt < MAX_ATTEMPTS => {
                    warn!(%collection, op, attempt, "store unavailable, retrying: {msg}");
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(ViewError::Cancelled),
                        _ = sleep_with_jitter(self.retry_backoff) => {}
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

async fn sleep_with_jitter(base: Duration) {
    let max_jitter = (base.as_millis() / 2) as u64;
    let jitter_ms: u64 = thread_rng().gen_range(0..=max_jitter);
    tokio::time::sleep(base + Duration::from_millis(jitter_ms)).await;
}
