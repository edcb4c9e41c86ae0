/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use crate::error::{ViewError, ViewResult};
use rand::RngCore;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt;
use vidhub_protocol::Identifier;

/// Document field names shared by the store, the joins and the projector.
pub mod fields {
    pub const ID: &str = "_id";
    pub const CREATED_AT: &str = "createdAt";
    pub const OWNER: &str = "owner";
    pub const USERNAME: &str = "username";
    pub const DISPLAY_NAME: &str = "displayName";
    pub const AVATAR_REF: &str = "avatarRef";
    pub const COVER_IMAGE_REF: &str = "coverImageRef";
    pub const WATCH_HISTORY: &str = "watchHistory";
    pub const TITLE: &str = "title";
    pub const DESCRIPTION: &str = "description";
    pub const MEDIA_REF: &str = "mediaRef";
    pub const THUMBNAIL_REF: &str = "thumbnailRef";
    pub const DURATION_SECS: &str = "durationSecs";
    pub const VIEWS: &str = "views";
    pub const IS_PUBLISHED: &str = "isPublished";
    pub const CONTENT: &str = "content";
    pub const ACTOR: &str = "actor";
    pub const SOURCE: &str = "source";
    pub const TARGET: &str = "target";
    pub const TARGET_ID: &str = "target.id";
    pub const TARGET_KIND: &str = "target.kind";
}

/// Arrays the join resolver attaches to a row.
pub mod joined {
    pub const OWNER: &str = "ownerDetails";
    pub const LIKES: &str = "likes";
    pub const SUBSCRIBERS: &str = "subscribers";
    pub const SUBSCRIBED_TO: &str = "subscribedTo";
    pub const COMMENTS: &str = "comments";
    pub const HISTORY: &str = "history";
    pub const MEDIA: &str = "media";
}

/// Fields written by the aggregate and viewer-context stages.
pub mod derived {
    pub const LIKES_COUNT: &str = "likesCount";
    pub const IS_LIKED: &str = "isLiked";
    pub const SUBSCRIBERS_COUNT: &str = "subscribersCount";
    pub const SUBSCRIBED_TO_COUNT: &str = "subscribedToCount";
    pub const IS_SUBSCRIBED: &str = "isSubscribed";
    pub const COMMENTS_COUNT: &str = "commentsCount";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Accounts,
    MediaItems,
    Posts,
    Comments,
    Reactions,
    FollowEdges,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Accounts => "accounts",
            Collection::MediaItems => "media_items",
            Collection::Posts => "posts",
            Collection::Comments => "comments",
            Collection::Reactions => "reactions",
            Collection::FollowEdges => "follow_edges",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed row of one collection.
pub trait Entity: Serialize + DeserializeOwned + Send + 'static {
    const COLLECTION: Collection;

    fn id(&self) -> Identifier;
    fn created_at_ms(&self) -> i64;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Media,
    Post,
    Comment,
}

impl TargetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Media => "media",
            TargetKind::Post => "post",
            TargetKind::Comment => "comment",
        }
    }
}

/// What a comment or reaction points at: exactly one kind, one id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target {
    pub kind: TargetKind,
    pub id: Identifier,
}

impl Target {
    pub fn media(id: Identifier) -> Self {
        Self { kind: TargetKind::Media, id }
    }

    pub fn post(id: Identifier) -> Self {
        Self { kind: TargetKind::Post, id }
    }

    pub fn comment(id: Identifier) -> Self {
        Self { kind: TargetKind::Comment, id }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    #[serde(rename = "_id")]
    pub id: Identifier,
    pub username: String,
    pub display_name: String,
    pub email: String,
    #[serde(default)]
    pub avatar_ref: Option<String>,
    #[serde(default)]
    pub cover_image_ref: Option<String>,
    /// Watched media, oldest first.
    #[serde(default)]
    pub watch_history: Vec<Identifier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub created_at: i64,
}

impl Account {
    pub fn new(username: &str, display_name: &str, email: &str) -> Self {
        Self {
            id: new_identifier(),
            username: username.trim().to_lowercase(),
            display_name: display_name.trim().to_string(),
            email: email.trim().to_lowercase(),
            avatar_ref: None,
            cover_image_ref: None,
            watch_history: Vec::new(),
            password_hash: None,
            refresh_token: None,
            created_at: now_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    #[serde(rename = "_id")]
    pub id: Identifier,
    pub owner: Identifier,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub media_ref: String,
    pub thumbnail_ref: String,
    #[serde(default)]
    pub duration_secs: f64,
    #[serde(default)]
    pub views: i64,
    #[serde(default)]
    pub is_published: bool,
    pub created_at: i64,
}

impl MediaItem {
    pub fn new(owner: Identifier, title: &str) -> Self {
        let id = new_identifier();
        Self {
            id,
            owner,
            title: title.trim().to_string(),
            description: String::new(),
            media_ref: format!("media/{id}"),
            thumbnail_ref: format!("thumbs/{id}"),
            duration_secs: 0.0,
            views: 0,
            is_published: true,
            created_at: now_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(rename = "_id")]
    pub id: Identifier,
    pub owner: Identifier,
    pub content: String,
    pub created_at: i64,
}

impl Post {
    pub fn new(owner: Identifier, content: &str) -> Self {
        Self {
            id: new_identifier(),
            owner,
            content: content.to_string(),
            created_at: now_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(rename = "_id")]
    pub id: Identifier,
    pub owner: Identifier,
    pub target: Target,
    pub content: String,
    pub created_at: i64,
}

impl Comment {
    /// Comments attach to media items and posts only.
    pub fn new(owner: Identifier, target: Target, content: &str) -> ViewResult<Self> {
        if target.kind == TargetKind::Comment {
            return Err(ViewError::Validation(
                "comments can target media items or posts only".into(),
            ));
        }
        Ok(Self {
            id: new_identifier(),
            owner,
            target,
            content: content.to_string(),
            created_at: now_ms(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reaction {
    #[serde(rename = "_id")]
    pub id: Identifier,
    pub actor: Identifier,
    pub target: Target,
    pub created_at: i64,
}

impl Reaction {
    pub fn new(actor: Identifier, target: Target) -> Self {
        Self {
            id: new_identifier(),
            actor,
            target,
            created_at: now_ms(),
        }
    }
}

/// Directed subscription: `source` follows `target`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowEdge {
    #[serde(rename = "_id")]
    pub id: Identifier,
    pub source: Identifier,
    pub target: Identifier,
    pub created_at: i64,
}

impl FollowEdge {
    pub fn new(source: Identifier, target: Identifier) -> ViewResult<Self> {
        if source == target {
            return Err(ViewError::Validation("an account cannot follow itself".into()));
        }
        Ok(Self {
            id: new_identifier(),
            source,
            target,
            created_at: now_ms(),
        })
    }
}

macro_rules! impl_entity {
    ($ty:ty, $collection:expr) => {
        impl Entity for $ty {
            const COLLECTION: Collection = $collection;

            fn id(&self) -> Identifier {
                self.id
            }

            fn created_at_ms(&self) -> i64 {
                self.created_at
            }
        }
    };
}

impl_entity!(Account, Collection::Accounts);
impl_entity!(MediaItem, Collection::MediaItems);
impl_entity!(Post, Collection::Posts);
impl_entity!(Comment, Collection::Comments);
impl_entity!(Reaction, Collection::Reactions);
impl_entity!(FollowEdge, Collection::FollowEdges);

/// Unix seconds (big-endian) followed by 8 random bytes.
pub fn new_identifier() -> Identifier {
    let secs = (now_ms() / 1000) as u32;
    let mut bytes = [0u8; Identifier::LEN];
    bytes[..4].copy_from_slice(&secs.to_be_bytes());
    rand::thread_rng().fill_bytes(&mut bytes[4..]);
    Identifier::from_bytes(bytes)
}

pub(crate) fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
