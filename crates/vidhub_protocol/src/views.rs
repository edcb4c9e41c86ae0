/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! View payloads. Every struct here is the complete allowlist of what its
//! view may emit: the projector fills these fields and nothing else.

use crate::Identifier;
use serde::{Deserialize, Serialize};

/// Owner sub-object embedded in feed items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerSummary {
    pub id: Identifier,
    pub display_name: String,
    pub avatar_ref: Option<String>,
}

/// Owner sub-object on the single-video page, with subscription context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelBadge {
    pub id: Identifier,
    pub display_name: String,
    pub avatar_ref: Option<String>,
    pub subscribers_count: u64,
    pub is_subscribed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelProfileView {
    pub id: Identifier,
    pub username: String,
    pub display_name: String,
    pub avatar_ref: Option<String>,
    pub cover_image_ref: Option<String>,
    pub total_subscribers: u64,
    pub total_subscribed_to: u64,
    pub is_subscribed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaSummaryView {
    pub id: Identifier,
    pub title: String,
    pub description: String,
    pub thumbnail_ref: String,
    pub duration_secs: f64,
    pub views: i64,
    pub created_at: String,
    pub owner: Option<OwnerSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoCardView {
    pub id: Identifier,
    pub title: String,
    pub description: String,
    pub thumbnail_ref: String,
    pub duration_secs: f64,
    pub views: i64,
    pub created_at: String,
    pub likes_count: u64,
    pub is_liked: bool,
    pub owner: Option<OwnerSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoDetailView {
    pub id: Identifier,
    pub title: String,
    pub description: String,
    pub media_ref: String,
    pub thumbnail_ref: String,
    pub duration_secs: f64,
    pub views: i64,
    pub is_published: bool,
    pub created_at: String,
    pub likes_count: u64,
    pub is_liked: bool,
    pub comments_count: u64,
    pub owner: Option<ChannelBadge>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    pub id: Identifier,
    pub content: String,
    pub created_at: String,
    pub likes_count: u64,
    pub is_liked: bool,
    pub owner: Option<OwnerSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: Identifier,
    pub content: String,
    pub created_at: String,
    pub likes_count: u64,
    pub is_liked: bool,
    pub owner: Option<OwnerSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikedVideoView {
    pub liked_at: String,
    pub video: MediaSummaryView,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateParts {
    pub year: i32,
    pub month: u8,
    pub day: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelVideoView {
    pub id: Identifier,
    pub title: String,
    pub description: String,
    pub media_ref: String,
    pub thumbnail_ref: String,
    pub is_published: bool,
    pub created_at: DateParts,
    pub likes_count: u64,
}

/// Dashboard summary. Every counter is always present; an empty channel
/// reports zeros.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelStats {
    pub total_subscribers: u64,
    pub total_videos: u64,
    pub total_views: i64,
    pub total_likes: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub docs: Vec<T>,
    pub total_docs: u64,
    pub limit: u64,
    pub page: u64,
    pub total_pages: u64,
    pub has_prev_page: bool,
    pub has_next_page: bool,
}

/// The `data` payload of a composed view. The caller wraps it in its own
/// transport envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ViewData {
    ChannelProfile(ChannelProfileView),
    WatchHistory(Vec<MediaSummaryView>),
    VideoFeed(Page<VideoCardView>),
    PostFeed(Page<PostView>),
    CommentFeed(Page<CommentView>),
    LikedVideosFeed(Page<LikedVideoView>),
    ChannelDashboard(ChannelStats),
    ChannelVideos(Page<ChannelVideoView>),
    VideoDetail(VideoDetailView),
}
