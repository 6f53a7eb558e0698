//! Domain records shared by the stores and handlers.
//!
//! Timestamps are stored and exposed as unix seconds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered account.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    /// Primary key.
    pub id: i64,
    /// Unique display name.
    pub username: String,
    /// Unique login email.
    pub email: String,
    /// Argon2 PHC string. Never the plaintext.
    pub password_hash: String,
    /// Registration time.
    pub created_at: i64,
}

/// Public projection of [`User`] (no verifier).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserProfile {
    /// Primary key.
    pub id: i64,
    /// Unique display name.
    pub username: String,
    /// Unique login email.
    pub email: String,
    /// Registration time.
    pub created_at: i64,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            created_at: user.created_at,
        }
    }
}

/// One live authentication grant. At most one exists per user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Owning user.
    pub user_id: i64,
    /// Opaque 256-bit identifier, URL-safe base64.
    pub session_id: String,
    /// Absolute expiry, second granularity.
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Check if the session has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at.timestamp() <= Utc::now().timestamp()
    }
}

/// A post category.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq, Eq)]
pub struct Category {
    /// Primary key.
    pub id: i64,
    /// Unique name.
    pub name: String,
    /// Optional free-text description.
    pub description: Option<String>,
}

/// A forum post.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq, Eq)]
pub struct Post {
    /// Primary key.
    pub id: i64,
    /// Author.
    pub user_id: i64,
    /// Category the post is filed under.
    pub category_id: i64,
    /// Title.
    pub title: String,
    /// Body.
    pub content: String,
    /// Creation time.
    pub created_at: i64,
}

/// A comment on a post.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq, Eq)]
pub struct Comment {
    /// Primary key.
    pub id: i64,
    /// Parent post.
    pub post_id: i64,
    /// Author.
    pub user_id: i64,
    /// Body.
    pub content: String,
    /// Creation time.
    pub created_at: i64,
}

/// What a reaction is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionTarget {
    /// A post.
    Post,
    /// A comment.
    Comment,
}

impl ReactionTarget {
    /// Column value in the `reactions` table.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Comment => "comment",
        }
    }
}

/// Like or dislike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionKind {
    /// Positive reaction.
    Like,
    /// Negative reaction.
    Dislike,
}

impl ReactionKind {
    /// Column value in the `reactions` table.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Dislike => "dislike",
        }
    }

    /// Parse a stored column value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "like" => Some(Self::Like),
            "dislike" => Some(Self::Dislike),
            _ => None,
        }
    }
}

/// Like/dislike totals for one target.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReactionCounts {
    /// Number of likes.
    pub likes: i64,
    /// Number of dislikes.
    pub dislikes: i64,
}

/// Convert stored unix seconds back to a timestamp.
#[must_use]
pub fn from_unix(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
}
