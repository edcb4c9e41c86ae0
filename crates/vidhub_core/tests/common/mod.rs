/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use vidhub_core::entity_store::{Document, DocumentStore, Filter, FindQuery};
use vidhub_core::model::{Account, Collection, Comment, FollowEdge, MediaItem, Post, Reaction, Target};
use vidhub_core::paginator::Paginator;
use vidhub_core::protocol::ViewParams;
use vidhub_core::sqlite_store::SqliteStore;
use vidhub_core::store_adapter::EntityStore;
use vidhub_core::{Composer, StoreError};

pub struct Fixture {
    _dir: TempDir,
    pub db: SqliteStore,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let db = SqliteStore::open(dir.path().join("vidhub.db")).unwrap();
        Self { _dir: dir, db }
    }

    pub fn composer(&self) -> Composer {
        composer_over(Arc::new(self.db.clone()))
    }

    /// Accounts carry credentials so payload tests can check they never leak.
    pub fn account(&self, username: &str) -> Account {
        let mut a = Account::new(username, &username.to_uppercase(), &format!("{username}@example.com"));
        a.password_hash = Some(format!("argon2-hash-of-{username}"));
        a.refresh_token = Some(format!("refresh-token-of-{username}"));
        self.db.insert(&a).unwrap();
        a
    }

    pub fn media(&self, owner: &Account, title: &str, created_at: i64) -> MediaItem {
        let mut m = MediaItem::new(owner.id, title);
        m.created_at = created_at;
        self.db.insert(&m).unwrap();
        m
    }

    pub fn post(&self, owner: &Account, content: &str, created_at: i64) -> Post {
        let mut p = Post::new(owner.id, content);
        p.created_at = created_at;
        self.db.insert(&p).unwrap();
        p
    }

    pub fn comment(&self, owner: &Account, target: Target, content: &str, created_at: i64) -> Comment {
        let mut c = Comment::new(owner.id, target, content).unwrap();
        c.created_at = created_at;
        self.db.insert(&c).unwrap();
        c
    }

    pub fn like(&self, actor: &Account, target: Target) -> Reaction {
        let r = Reaction::new(actor.id, target);
        self.db.insert(&r).unwrap();
        r
    }

    pub fn like_at(&self, actor: &Account, target: Target, created_at: i64) -> Reaction {
        let mut r = Reaction::new(actor.id, target);
        r.created_at = created_at;
        self.db.insert(&r).unwrap();
        r
    }

    pub fn follow(&self, source: &Account, target: &Account) -> FollowEdge {
        let e = FollowEdge::new(source.id, target.id).unwrap();
        self.db.insert(&e).unwrap();
        e
    }
}

pub fn composer_over(backend: Arc<dyn DocumentStore>) -> Composer {
    let store = EntityStore::new(backend).with_retry_backoff(Duration::ZERO);
    Composer::new(store, Paginator::new(10))
}

pub fn params(v: serde_json::Value) -> ViewParams {
    serde_json::from_value(v).unwrap()
}

#[derive(Clone, Copy)]
pub enum Fault {
    Unavailable,
    Malformed,
}

/// Fails the first `failures` `find` calls, then delegates.
pub struct FaultyStore {
    pub inner: SqliteStore,
    pub fault: Fault,
    pub failures: AtomicUsize,
    pub find_calls: AtomicUsize,
}

impl FaultyStore {
    pub fn new(inner: SqliteStore, fault: Fault, failures: usize) -> Arc<Self> {
        Arc::new(Self {
            inner,
            fault,
            failures: AtomicUsize::new(failures),
            find_calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.find_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentStore for FaultyStore {
    async fn find(&self, collection: Collection, query: &FindQuery) -> Result<Vec<Document>, StoreError> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if remaining.is_ok() {
            return Err(match self.fault {
                Fault::Unavailable => StoreError::Unavailable("database is locked".into()),
                Fault::Malformed => StoreError::Malformed("bad row".into()),
            });
        }
        self.inner.find(collection, query).await
    }

    async fn count(&self, collection: Collection, filter: &Filter) -> Result<u64, StoreError> {
        self.inner.count(collection, filter).await
    }
}

/// Every `find` takes `delay` before delegating.
pub struct SlowStore {
    pub inner: SqliteStore,
    pub delay: Duration,
}

#[async_trait]
impl DocumentStore for SlowStore {
    async fn find(&self, collection: Collection, query: &FindQuery) -> Result<Vec<Document>, StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.find(collection, query).await
    }

    async fn count(&self, collection: Collection, filter: &Filter) -> Result<u64, StoreError> {
        self.inner.count(collection, filter).await
    }
}
