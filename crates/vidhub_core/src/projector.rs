/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! Turns composed documents into view payloads. Each payload type lists the
//! only fields that may leave the pipeline; everything else in the document
//! (credentials, raw join arrays, internal keys) is dropped here.

use crate::entity_store::{json_type, stored_identifier, Document};
use crate::error::{ViewError, ViewResult};
use crate::model::{derived, fields, joined};
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use vidhub_protocol::{
    ChannelBadge, ChannelProfileView, ChannelVideoView, CommentView, DateParts, Identifier, LikedVideoView,
    MediaSummaryView, OwnerSummary, PostView, VideoCardView, VideoDetailView,
};

pub trait Project: Sized {
    fn project(graph: &Document) -> ViewResult<Self>;
}

pub fn project_many<T: Project>(graphs: &[Document]) -> ViewResult<Vec<T>> {
    graphs.iter().map(T::project).collect()
}

/// Projects every element of the joined array `field`.
pub fn project_joined<T: Project>(graph: &Document, field: &str) -> ViewResult<Vec<T>> {
    match graph.get(field) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items.iter().map(|item| T::project(as_doc(item, field)?)).collect(),
        Some(other) => Err(shape(field, "an array", other)),
    }
}

/// First element of a joined array; `None` when the referenced row is gone.
pub fn first_joined<'a>(graph: &'a Document, field: &str) -> ViewResult<Option<&'a Document>> {
    match graph.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => items.first().map(|item| as_doc(item, field)).transpose(),
        Some(other) => Err(shape(field, "an array", other)),
    }
}

pub fn rfc3339(ms: i64) -> ViewResult<String> {
    timestamp(ms)?
        .format(&Rfc3339)
        .map_err(|e| ViewError::Shape(format!("timestamp {ms} cannot be rendered: {e}")))
}

pub fn date_parts(ms: i64) -> ViewResult<DateParts> {
    let t = timestamp(ms)?;
    Ok(DateParts {
        year: t.year(),
        month: u8::from(t.month()),
        day: t.day(),
    })
}

fn timestamp(ms: i64) -> ViewResult<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(ms) * 1_000_000)
        .map_err(|_| ViewError::Shape(format!("timestamp {ms} is out of range")))
}

fn as_doc<'a>(item: &'a Value, field: &str) -> ViewResult<&'a Document> {
    item.as_object().ok_or_else(|| shape(field, "a document", item))
}

fn shape(field: &str, expected: &str, got: &Value) -> ViewError {
    ViewError::Shape(format!("`{field}` holds {} where {expected} was expected", json_type(got)))
}

fn missing(field: &str) -> ViewError {
    ViewError::Shape(format!("required field `{field}` is missing"))
}

fn id(doc: &Document, field: &str) -> ViewResult<Identifier> {
    match doc.get(field) {
        Some(Value::String(raw)) => stored_identifier(raw, field),
        Some(other) => Err(shape(field, "an identifier", other)),
        None => Err(missing(field)),
    }
}

fn text(doc: &Document, field: &str) -> ViewResult<String> {
    match doc.get(field) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(shape(field, "a string", other)),
        None => Err(missing(field)),
    }
}

fn text_or_empty(doc: &Document, field: &str) -> ViewResult<String> {
    Ok(opt_text(doc, field)?.unwrap_or_default())
}

fn opt_text(doc: &Document, field: &str) -> ViewResult<Option<String>> {
    match doc.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(shape(field, "a string", other)),
    }
}

fn int_or_zero(doc: &Document, field: &str) -> ViewResult<i64> {
    match doc.get(field) {
        None | Some(Value::Null) => Ok(0),
        Some(Value::Number(n)) => Ok(n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)).unwrap_or(0)),
        Some(other) => Err(shape(field, "a number", other)),
    }
}

fn float_or_zero(doc: &Document, field: &str) -> ViewResult<f64> {
    match doc.get(field) {
        None | Some(Value::Null) => Ok(0.0),
        Some(Value::Number(n)) => Ok(n.as_f64().unwrap_or(0.0)),
        Some(other) => Err(shape(field, "a number", other)),
    }
}

fn flag_or(doc: &Document, field: &str, default: bool) -> ViewResult<bool> {
    match doc.get(field) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Bool(b)) => Ok(*b),
        Some(other) => Err(shape(field, "a boolean", other)),
    }
}

fn created_at(doc: &Document) -> ViewResult<i64> {
    match doc.get(fields::CREATED_AT) {
        Some(Value::Number(n)) => n.as_i64().ok_or_else(|| missing(fields::CREATED_AT)),
        Some(other) => Err(shape(fields::CREATED_AT, "a timestamp", other)),
        None => Err(missing(fields::CREATED_AT)),
    }
}

/// Counters and flags written by earlier stages must be there.
fn derived_count(doc: &Document, field: &str) -> ViewResult<u64> {
    doc.get(field)
        .ok_or_else(|| missing(field))?
        .as_u64()
        .ok_or_else(|| ViewError::Shape(format!("derived field `{field}` is not a count")))
}

fn derived_flag(doc: &Document, field: &str) -> ViewResult<bool> {
    doc.get(field)
        .ok_or_else(|| missing(field))?
        .as_bool()
        .ok_or_else(|| ViewError::Shape(format!("derived field `{field}` is not a flag")))
}

fn owner_summary(graph: &Document) -> ViewResult<Option<OwnerSummary>> {
    first_joined(graph, joined::OWNER)?.map(OwnerSummary::project).transpose()
}

impl Project for OwnerSummary {
    fn project(doc: &Document) -> ViewResult<Self> {
        Ok(Self {
            id: id(doc, fields::ID)?,
            display_name: text(doc, fields::DISPLAY_NAME)?,
            avatar_ref: opt_text(doc, fields::AVATAR_REF)?,
        })
    }
}

impl Project for ChannelBadge {
    fn project(doc: &Document) -> ViewResult<Self> {
        Ok(Self {
            id: id(doc, fields::ID)?,
            display_name: text(doc, fields::DISPLAY_NAME)?,
            avatar_ref: opt_text(doc, fields::AVATAR_REF)?,
            subscribers_count: derived_count(doc, derived::SUBSCRIBERS_COUNT)?,
            is_subscribed: derived_flag(doc, derived::IS_SUBSCRIBED)?,
        })
    }
}

impl Project for ChannelProfileView {
    fn project(doc: &Document) -> ViewResult<Self> {
        Ok(Self {
            id: id(doc, fields::ID)?,
            username: text(doc, fields::USERNAME)?,
            display_name: text(doc, fields::DISPLAY_NAME)?,
            avatar_ref: opt_text(doc, fields::AVATAR_REF)?,
            cover_image_ref: opt_text(doc, fields::COVER_IMAGE_REF)?,
            total_subscribers: derived_count(doc, derived::SUBSCRIBERS_COUNT)?,
            total_subscribed_to: derived_count(doc, derived::SUBSCRIBED_TO_COUNT)?,
            is_subscribed: derived_flag(doc, derived::IS_SUBSCRIBED)?,
        })
    }
}

impl Project for MediaSummaryView {
    fn project(doc: &Document) -> ViewResult<Self> {
        Ok(Self {
            id: id(doc, fields::ID)?,
            title: text(doc, fields::TITLE)?,
            description: text_or_empty(doc, fields::DESCRIPTION)?,
            thumbnail_ref: text(doc, fields::THUMBNAIL_REF)?,
            duration_secs: float_or_zero(doc, fields::DURATION_SECS)?,
            views: int_or_zero(doc, fields::VIEWS)?,
            created_at: rfc3339(created_at(doc)?)?,
            owner: owner_summary(doc)?,
        })
    }
}

impl Project for VideoCardView {
    fn project(doc: &Document) -> ViewResult<Self> {
        Ok(Self {
            id: id(doc, fields::ID)?,
            title: text(doc, fields::TITLE)?,
            description: text_or_empty(doc, fields::DESCRIPTION)?,
            thumbnail_ref: text(doc, fields::THUMBNAIL_REF)?,
            duration_secs: float_or_zero(doc, fields::DURATION_SECS)?,
            views: int_or_zero(doc, fields::VIEWS)?,
            created_at: rfc3339(created_at(doc)?)?,
            likes_count: derived_count(doc, derived::LIKES_COUNT)?,
            is_liked: derived_flag(doc, derived::IS_LIKED)?,
            owner: owner_summary(doc)?,
        })
    }
}

impl Project for VideoDetailView {
    fn project(doc: &Document) -> ViewResult<Self> {
        Ok(Self {
            id: id(doc, fields::ID)?,
            title: text(doc, fields::TITLE)?,
            description: text_or_empty(doc, fields::DESCRIPTION)?,
            media_ref: text(doc, fields::MEDIA_REF)?,
            thumbnail_ref: text(doc, fields::THUMBNAIL_REF)?,
            duration_secs: float_or_zero(doc, fields::DURATION_SECS)?,
            views: int_or_zero(doc, fields::VIEWS)?,
            is_published: flag_or(doc, fields::IS_PUBLISHED, false)?,
            created_at: rfc3339(created_at(doc)?)?,
            likes_count: derived_count(doc, derived::LIKES_COUNT)?,
            is_liked: derived_flag(doc, derived::IS_LIKED)?,
            comments_count: derived_count(doc, derived::COMMENTS_COUNT)?,
            owner: first_joined(doc, joined::OWNER)?
                .map(ChannelBadge::project)
                .transpose()?,
        })
    }
}

impl Project for PostView {
    fn project(doc: &Document) -> ViewResult<Self> {
        Ok(Self {
            id: id(doc, fields::ID)?,
            content: text(doc, fields::CONTENT)?,
            created_at: rfc3339(created_at(doc)?)?,
            likes_count: derived_count(doc, derived::LIKES_COUNT)?,
            is_liked: derived_flag(doc, derived::IS_LIKED)?,
            owner: owner_summary(doc)?,
        })
    }
}

impl Project for CommentView {
    fn project(doc: &Document) -> ViewResult<Self> {
        Ok(Self {
            id: id(doc, fields::ID)?,
            content: text(doc, fields::CONTENT)?,
            created_at: rfc3339(created_at(doc)?)?,
            likes_count: derived_count(doc, derived::LIKES_COUNT)?,
            is_liked: derived_flag(doc, derived::IS_LIKED)?,
            owner: owner_summary(doc)?,
        })
    }
}

/// A reaction row with its media joined in. Callers skip rows whose media is gone.
impl Project for LikedVideoView {
    fn project(doc: &Document) -> ViewResult<Self> {
        let media = first_joined(doc, joined::MEDIA)?
            .ok_or_else(|| ViewError::Shape("liked media is missing".into()))?;
        Ok(Self {
            liked_at: rfc3339(created_at(doc)?)?,
            video: MediaSummaryView::project(media)?,
        })
    }
}

impl Project for ChannelVideoView {
    fn project(doc: &Document) -> ViewResult<Self> {
        Ok(Self {
            id: id(doc, fields::ID)?,
            title: text(doc, fields::TITLE)?,
            description: text_or_empty(doc, fields::DESCRIPTION)?,
            media_ref: text(doc, fields::MEDIA_REF)?,
            thumbnail_ref: text(doc, fields::THUMBNAIL_REF)?,
            is_published: flag_or(doc, fields::IS_PUBLISHED, false)?,
            created_at: date_parts(created_at(doc)?)?,
            likes_count: derived_count(doc, derived::LIKES_COUNT)?,
        })
    }
}
