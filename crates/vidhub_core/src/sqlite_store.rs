/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use crate::entity_store::{
    is_valid_path, to_document, Document, DocumentStore, Filter, FilterValue, FindQuery, SortDirection,
};
use crate::error::StoreError;
use crate::model::{fields, Collection, Entity};
use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, Connection};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use vidhub_protocol::Identifier;

/// All collections live in one `documents` table as JSON text. The
/// expression indexes cover every join and filter key the views use.
const SCHEMA: &str = r#"
PRAGMA journal_mode=WAL;
CREATE TABLE IF NOT EXISTS documents (
  collection TEXT NOT NULL,
  id TEXT NOT NULL,
  created_at_ms INTEGER NOT NULL,
  doc TEXT NOT NULL,
  PRIMARY KEY (collection, id)
);
CREATE INDEX IF NOT EXISTS idx_documents_created ON documents(collection, created_at_ms);
CREATE INDEX IF NOT EXISTS idx_documents_owner ON documents(collection, json_extract(doc, '$.owner'));
CREATE INDEX IF NOT EXISTS idx_documents_actor ON documents(collection, json_extract(doc, '$.actor'));
CREATE INDEX IF NOT EXISTS idx_documents_source ON documents(collection, json_extract(doc, '$.source'));
CREATE INDEX IF NOT EXISTS idx_documents_target ON documents(collection, json_extract(doc, '$.target'));
CREATE INDEX IF NOT EXISTS idx_documents_target_id ON documents(collection, json_extract(doc, '$.target.id'));
CREATE INDEX IF NOT EXISTS idx_documents_username ON documents(collection, json_extract(doc, '$.username'));
"#;

const BUSY_TIMEOUT: Duration = Duration::from_millis(250);

#[derive(Clone)]
pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let path = db_path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create db dir: {}", parent.display()))?;
        }
        let conn = Connection::open(&path).with_context(|| format!("open db: {}", path.display()))?;
        conn.execute_batch(SCHEMA).context("init schema")?;
        debug!(path = %path.display(), "document store ready");
        Ok(Self { path })
    }

    pub fn health_check(&self) -> Result<()> {
        let conn = Connection::open(&self.path)?;
        conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
    }

    pub fn insert<T: Entity>(&self, entity: &T) -> Result<()> {
        let doc = to_document(entity)?;
        self.insert_document(T::COLLECTION, &doc)
    }

    /// Upserts a raw document. `_id` must be an identifier and `createdAt` an
    /// integer. Reference fields that parse as identifiers are stored in
    /// canonical lowercase hex; everything else is stored as given.
    pub fn insert_document(&self, collection: Collection, doc: &Document) -> Result<()> {
        let mut doc = doc.clone();
        canonicalize_ids(&mut doc);
        let id = doc
            .get(fields::ID)
            .and_then(Value::as_str)
            .context("document has no string _id")?;
        let id = Identifier::parse(id).context("document _id is not an identifier")?;
        let created_at_ms = doc
            .get(fields::CREATED_AT)
            .and_then(Value::as_i64)
            .context("document has no integer createdAt")?;
        let text = serde_json::to_string(&doc)?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO documents(collection, id, created_at_ms, doc) VALUES (?1, ?2, ?3, ?4)\n             ON CONFLICT(collection, id) DO UPDATE SET created_at_ms=excluded.created_at_ms, doc=excluded.doc",
            params![collection.as_str(), id.to_hex(), created_at_ms, text],
        )?;
        Ok(())
    }

    pub fn delete(&self, collection: Collection, id: &Identifier) -> Result<bool> {
        let conn = self.conn()?;
        let n = conn.execute(
            "DELETE FROM documents WHERE collection=?1 AND id=?2",
            params![collection.as_str(), id.to_hex()],
        )?;
        Ok(n > 0)
    }

    fn conn(&self) -> Result<Connection, StoreError> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(conn)
    }

    fn find_blocking(&self, collection: Collection, query: &FindQuery) -> Result<Vec<Document>, StoreError> {
        let mut params_vec: Vec<SqlValue> = vec![collection.as_str().to_string().into()];
        let predicate = compile_filter(&query.filter, &mut params_vec)?;
        let order = compile_sort(query)?;
        let limit = query.limit.map(|l| l.min(i64::MAX as u64) as i64).unwrap_or(-1);
        params_vec.push(limit.into());
        let limit_idx = params_vec.len();
        params_vec.push((query.skip.min(i64::MAX as u64) as i64).into());
        let offset_idx = params_vec.len();
        let sql = format!(
            "SELECT doc FROM documents WHERE collection = ?1 AND {predicate} ORDER BY {order} LIMIT ?{limit_idx} OFFSET ?{offset_idx}"
        );

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(rusqlite::params_from_iter(params_vec))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let text: String = row.get(0)?;
            match serde_json::from_str::<Value>(&text)? {
                Value::Object(doc) => out.push(doc),
                _ => {
                    return Err(StoreError::Malformed(format!(
                        "{collection} row is not a JSON object"
                    )))
                }
            }
        }
        Ok(out)
    }

    fn count_blocking(&self, collection: Collection, filter: &Filter) -> Result<u64, StoreError> {
        let mut params_vec: Vec<SqlValue> = vec![collection.as_str().to_string().into()];
        let predicate = compile_filter(filter, &mut params_vec)?;
        let sql = format!("SELECT COUNT(*) FROM documents WHERE collection = ?1 AND {predicate}");
        let conn = self.conn()?;
        let n: i64 = conn.query_row(&sql, rusqlite::params_from_iter(params_vec), |r| r.get(0))?;
        Ok(n.max(0) as u64)
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn find(&self, collection: Collection, query: &FindQuery) -> Result<Vec<Document>, StoreError> {
        tokio::task::spawn_blocking({
            let store = self.clone();
            let query = query.clone();
            move || store.find_blocking(collection, &query)
        })
        .await?
    }

    async fn count(&self, collection: Collection, filter: &Filter) -> Result<u64, StoreError> {
        tokio::task::spawn_blocking({
            let store = self.clone();
            let filter = filter.clone();
            move || store.count_blocking(collection, &filter)
        })
        .await?
    }
}

fn column_expr(path: &str) -> Result<String, StoreError> {
    match path {
        fields::ID => Ok("id".to_string()),
        fields::CREATED_AT => Ok("created_at_ms".to_string()),
        p if is_valid_path(p) => Ok(format!("json_extract(doc, '$.{p}')")),
        p => Err(StoreError::Malformed(format!("invalid document path: {p:?}"))),
    }
}

fn push_param(params_vec: &mut Vec<SqlValue>, value: &FilterValue) -> usize {
    let v: SqlValue = match value {
        FilterValue::Id(id) => id.to_hex().into(),
        FilterValue::Text(s) => s.clone().into(),
        FilterValue::Bool(b) => i64::from(*b).into(),
        FilterValue::Int(n) => (*n).into(),
    };
    params_vec.push(v);
    params_vec.len()
}

fn compile_filter(filter: &Filter, params_vec: &mut Vec<SqlValue>) -> Result<String, StoreError> {
    Ok(match filter {
        Filter::All => "1=1".to_string(),
        Filter::Eq(path, value) => {
            let expr = column_expr(path)?;
            let idx = push_param(params_vec, value);
            format!("{expr} = ?{idx}")
        }
        Filter::In(path, values) => {
            if values.is_empty() {
                return Ok("0=1".to_string());
            }
            let expr = column_expr(path)?;
            let slots = values
                .iter()
                .map(|v| format!("?{}", push_param(params_vec, v)))
                .collect::<Vec<_>>()
                .join(", ");
            format!("{expr} IN ({slots})")
        }
        Filter::ContainsText(path, needle) => {
            let expr = column_expr(path)?;
            let pattern = format!("%{}%", escape_like(&needle.to_lowercase()));
            params_vec.push(pattern.into());
            format!("lower(COALESCE({expr}, '')) LIKE ?{} ESCAPE '\\'", params_vec.len())
        }
        Filter::And(all) => {
            if all.is_empty() {
                return Ok("1=1".to_string());
            }
            let parts = all
                .iter()
                .map(|f| compile_filter(f, params_vec))
                .collect::<Result<Vec<_>, _>>()?;
            format!("({})", parts.join(" AND "))
        }
        Filter::Or(any) => {
            if any.is_empty() {
                return Ok("0=1".to_string());
            }
            let parts = any
                .iter()
                .map(|f| compile_filter(f, params_vec))
                .collect::<Result<Vec<_>, _>>()?;
            format!("({})", parts.join(" OR "))
        }
    })
}

fn compile_sort(query: &FindQuery) -> Result<String, StoreError> {
    if query.sort.is_empty() {
        return Ok("created_at_ms ASC, id ASC".to_string());
    }
    let parts = query
        .sort
        .iter()
        .map(|k| {
            let dir = match k.direction {
                SortDirection::Asc => "ASC",
                SortDirection::Desc => "DESC",
            };
            column_expr(&k.path).map(|expr| format!("{expr} {dir}"))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(parts.join(", "))
}

fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Fields holding identifier references. SQL equality on them only matches
/// identifier equality once every spelling is the same.
const ID_FIELDS: &[&str] = &[
    fields::ID,
    fields::OWNER,
    fields::ACTOR,
    fields::SOURCE,
    fields::TARGET,
    fields::TARGET_ID,
    fields::WATCH_HISTORY,
];

fn canonicalize_ids(doc: &mut Document) {
    for path in ID_FIELDS {
        if let Some(v) = path_mut(doc, path) {
            canonicalize_id(v);
        }
    }
}

/// Values that do not parse are left alone; reads reject them as shape errors.
fn canonicalize_id(v: &mut Value) {
    match v {
        Value::String(raw) => {
            if let Ok(id) = Identifier::parse(raw) {
                *raw = id.to_hex();
            }
        }
        Value::Array(items) => items.iter_mut().for_each(canonicalize_id),
        _ => {}
    }
}

fn path_mut<'a>(doc: &'a mut Document, path: &str) -> Option<&'a mut Value> {
    let mut parts = path.split('.');
    let mut cur = doc.get_mut(parts.next()?)?;
    for part in parts {
        cur = cur.as_object_mut()?.get_mut(part)?;
    }
    Some(cur)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity_store::SortKey;
    use crate::model::{Account, MediaItem, Reaction, Target};
    use serde_json::json;

    fn temp_store() -> (tempfile::TempDir, SqliteStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(dir.path().join("docs.db")).unwrap();
        (dir, store)
    }

    fn ids(docs: &[Document]) -> Vec<String> {
        docs.iter().map(|d| d["_id"].as_str().unwrap().to_string()).collect()
    }

    #[test]
    fn compile_rejects_unsafe_paths() {
        let mut p = Vec::new();
        let err = compile_filter(&Filter::eq("owner') --", true), &mut p).unwrap_err();
        assert!(matches!(err, StoreError::Malformed(_)));
    }

    #[test]
    fn compile_maps_reserved_columns() {
        let mut p = Vec::new();
        let sql = compile_filter(
            &Filter::eq(fields::ID, "x").and(Filter::eq(fields::TARGET_KIND, "media")),
            &mut p,
        )
        .unwrap();
        assert_eq!(sql, "(id = ?1 AND json_extract(doc, '$.target.kind') = ?2)");
        assert_eq!(p.len(), 2);
    }

    #[test]
    fn escape_like_escapes_wildcards() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }

    #[tokio::test]
    async fn find_filters_sorts_and_windows() {
        let (_dir, store) = temp_store();
        let owner = Account::new("owner", "Owner", "o@example.com");
        store.insert(&owner).unwrap();
        for (i, title) in ["Rust intro", "Cooking", "Advanced RUST", "Gardening"].iter().enumerate() {
            let mut m = MediaItem::new(owner.id, title);
            m.views = (i as i64) * 10;
            m.created_at = 1_000 + i as i64;
            store.insert(&m).unwrap();
        }

        let filter = Filter::contains_text(fields::TITLE, "rust");
        let found = store
            .find(Collection::MediaItems, &FindQuery::new(filter.clone()).sorted(vec![SortKey::desc(fields::VIEWS)]))
            .await
            .unwrap();
        let titles: Vec<_> = found.iter().map(|d| d["title"].as_str().unwrap()).collect();
        assert_eq!(titles, vec!["Advanced RUST", "Rust intro"]);
        assert_eq!(store.count(Collection::MediaItems, &filter).await.unwrap(), 2);

        let window = store
            .find(Collection::MediaItems, &FindQuery::new(Filter::All).window(1, Some(2)))
            .await
            .unwrap();
        let titles: Vec<_> = window.iter().map(|d| d["title"].as_str().unwrap()).collect();
        assert_eq!(titles, vec!["Cooking", "Advanced RUST"]);
    }

    #[tokio::test]
    async fn booleans_and_nested_paths_match() {
        let (_dir, store) = temp_store();
        let owner = Account::new("owner", "Owner", "o@example.com");
        let mut hidden = MediaItem::new(owner.id, "hidden");
        hidden.is_published = false;
        let shown = MediaItem::new(owner.id, "shown");
        store.insert(&hidden).unwrap();
        store.insert(&shown).unwrap();
        store.insert(&Reaction::new(owner.id, Target::media(shown.id))).unwrap();
        store.insert(&Reaction::new(owner.id, Target::post(shown.id))).unwrap();

        let published = store
            .find(Collection::MediaItems, &FindQuery::new(Filter::eq(fields::IS_PUBLISHED, true)))
            .await
            .unwrap();
        assert_eq!(ids(&published), vec![shown.id.to_hex()]);

        let media_likes = Filter::ids(fields::TARGET_ID, &[shown.id])
            .and(Filter::eq(fields::TARGET_KIND, "media"));
        assert_eq!(store.count(Collection::Reactions, &media_likes).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn raw_documents_round_trip_and_delete() {
        let (_dir, store) = temp_store();
        let id = crate::model::new_identifier();
        let doc = json!({"_id": id.to_hex(), "createdAt": 5, "owner": "alice", "title": "t"});
        store
            .insert_document(Collection::MediaItems, doc.as_object().unwrap())
            .unwrap();
        let got = store
            .find(Collection::MediaItems, &FindQuery::by_id(id))
            .await
            .unwrap();
        assert_eq!(got[0]["owner"], "alice");
        assert!(store.delete(Collection::MediaItems, &id).unwrap());
        assert_eq!(store.count(Collection::MediaItems, &Filter::All).await.unwrap(), 0);

        let bad = json!({"_id": "not-an-id", "createdAt": 5});
        assert!(store.insert_document(Collection::Posts, bad.as_object().unwrap()).is_err());
    }

    #[tokio::test]
    async fn uppercase_references_are_stored_canonically() {
        let (_dir, store) = temp_store();
        let actor = crate::model::new_identifier();
        let media = crate::model::new_identifier();
        let id = crate::model::new_identifier();
        let doc = json!({
            "_id": id.to_hex().to_uppercase(),
            "createdAt": 5,
            "actor": actor.to_hex().to_uppercase(),
            "target": {"kind": "media", "id": format!(" {} ", media.to_hex().to_uppercase())}
        });
        store
            .insert_document(Collection::Reactions, doc.as_object().unwrap())
            .unwrap();

        let by_actor = Filter::eq(fields::ACTOR, actor).and(Filter::ids(fields::TARGET_ID, &[media]));
        let got = store.find(Collection::Reactions, &FindQuery::new(by_actor)).await.unwrap();
        assert_eq!(ids(&got), vec![id.to_hex()]);
        assert_eq!(got[0]["actor"], actor.to_hex());
        assert_eq!(got[0]["target"]["id"], media.to_hex());

        let history = crate::model::new_identifier();
        let account = json!({
            "_id": actor.to_hex(),
            "createdAt": 1,
            "watchHistory": [history.to_hex().to_uppercase(), "not-an-id"]
        });
        store
            .insert_document(Collection::Accounts, account.as_object().unwrap())
            .unwrap();
        let got = store.find(Collection::Accounts, &FindQuery::by_id(actor)).await.unwrap();
        assert_eq!(got[0]["watchHistory"], json!([history.to_hex(), "not-an-id"]));
    }
}
