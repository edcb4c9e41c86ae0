/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

mod views;

pub use views::*;

/// Store-assigned key: 12 bytes, rendered as 24 lowercase hex chars.
///
/// Equality, ordering and hashing use the byte value, so `"AB..."` and
/// `"ab..."` name the same entity. Ascending byte order equals ascending
/// lowercase-hex order.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Identifier([u8; Identifier::LEN]);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidIdentifier(String);

impl fmt::Display for InvalidIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed identifier: {:?}", self.0)
    }
}

impl std::error::Error for InvalidIdentifier {}

impl Identifier {
    pub const LEN: usize = 12;

    pub const fn from_bytes(bytes: [u8; Self::LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; Self::LEN] {
        &self.0
    }

    pub fn parse(raw: &str) -> Result<Self, InvalidIdentifier> {
        let s = raw.trim();
        if s.len() != Self::LEN * 2 {
            return Err(InvalidIdentifier(raw.to_string()));
        }
        let mut out = [0u8; Self::LEN];
        hex::decode_to_slice(s, &mut out).map_err(|_| InvalidIdentifier(raw.to_string()))?;
        Ok(Self(out))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl FromStr for Identifier {
    type Err = InvalidIdentifier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identifier({})", self.to_hex())
    }
}

impl Serialize for Identifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Identifier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Identifier::parse(&raw).map_err(de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewType {
    ChannelProfile,
    WatchHistory,
    VideoFeed,
    PostFeed,
    CommentFeed,
    LikedVideosFeed,
    ChannelDashboard,
    ChannelVideos,
    VideoDetail,
}

impl ViewType {
    pub const ALL: [ViewType; 9] = [
        ViewType::ChannelProfile,
        ViewType::WatchHistory,
        ViewType::VideoFeed,
        ViewType::PostFeed,
        ViewType::CommentFeed,
        ViewType::LikedVideosFeed,
        ViewType::ChannelDashboard,
        ViewType::ChannelVideos,
        ViewType::VideoDetail,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ViewType::ChannelProfile => "channel_profile",
            ViewType::WatchHistory => "watch_history",
            ViewType::VideoFeed => "video_feed",
            ViewType::PostFeed => "post_feed",
            ViewType::CommentFeed => "comment_feed",
            ViewType::LikedVideosFeed => "liked_videos_feed",
            ViewType::ChannelDashboard => "channel_dashboard",
            ViewType::ChannelVideos => "channel_videos",
            ViewType::VideoDetail => "video_detail",
        }
    }
}

impl fmt::Display for ViewType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        ViewType::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown view type: {s}"))
    }
}

/// Raw request parameters as a route handler receives them.
///
/// Identifiers stay strings here; each view parses the ones it needs and
/// rejects malformed values before touching the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ViewParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub sort_by: Option<String>,
    pub sort_type: Option<String>,
    pub username: Option<String>,
    pub channel_id: Option<String>,
    pub owner_id: Option<String>,
    pub media_id: Option<String>,
    pub post_id: Option<String>,
    pub query: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEX: &str = "65a1b2c3d4e5f60718293a4b";

    #[test]
    fn identifier_compares_by_value_not_spelling() {
        let lower = Identifier::parse(HEX).unwrap();
        let upper = Identifier::parse(&HEX.to_uppercase()).unwrap();
        let padded = Identifier::parse(&format!("  {HEX}\n")).unwrap();
        assert_eq!(lower, upper);
        assert_eq!(lower, padded);
        assert_eq!(upper.to_string(), HEX);
    }

    #[test]
    fn identifier_rejects_malformed_input() {
        assert!(Identifier::parse("").is_err());
        assert!(Identifier::parse("alice").is_err());
        assert!(Identifier::parse(&HEX[..22]).is_err());
        assert!(Identifier::parse("zz a1b2c3d4e5f60718293a4b").is_err());
    }

    #[test]
    fn identifier_order_matches_hex_order() {
        let a = Identifier::parse("000000000000000000000001").unwrap();
        let b = Identifier::parse("00000000000000000000000a").unwrap();
        let c = Identifier::parse("0000000000000000000000f0").unwrap();
        assert!(a < b && b < c);
        assert!(a.to_hex() < b.to_hex() && b.to_hex() < c.to_hex());
    }

    #[test]
    fn identifier_serde_validates() {
        let id: Identifier = serde_json::from_str(&format!("\"{}\"", HEX.to_uppercase())).unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), format!("\"{HEX}\""));
        assert!(serde_json::from_str::<Identifier>("\"not-an-id\"").is_err());
        assert!(serde_json::from_str::<Identifier>("42").is_err());
    }

    #[test]
    fn view_type_parses_snake_case_names() {
        for v in ViewType::ALL {
            assert_eq!(v.as_str().parse::<ViewType>().unwrap(), v);
        }
        assert_eq!("VIDEO_FEED".parse::<ViewType>().unwrap(), ViewType::VideoFeed);
        assert!("timeline".parse::<ViewType>().is_err());
    }

    #[test]
    fn view_params_accept_camel_case() {
        let p: ViewParams = serde_json::from_str(
            r#"{"page":2,"limit":5,"sortBy":"views","sortType":"asc","mediaId":"x"}"#,
        )
        .unwrap();
        assert_eq!(p.page, Some(2));
        assert_eq!(p.limit, Some(5));
        assert_eq!(p.sort_by.as_deref(), Some("views"));
        assert_eq!(p.media_id.as_deref(), Some("x"));
        assert_eq!(p.query, None);
    }
}
