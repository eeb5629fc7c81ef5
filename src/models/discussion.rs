//! Discussion posts and their replies.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A reply attached to a discussion post.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    pub content: String,
    pub author: String,
    pub author_id: String,
    pub timestamp: String,
}

/// A forum post.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Discussion {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub content: String,
    pub author: String,
    pub author_id: String,
    pub votes: i64,
    pub timestamp: String,
    #[serde(default)]
    pub replies: Vec<Reply>,
}

/// Request body for creating a post or a reply.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDiscussionRequest {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub author_id: Option<String>,
}

/// Request body for editing a post.
#[derive(Debug, Clone, Deserialize)]
pub struct EditDiscussionRequest {
    #[serde(default)]
    pub content: Option<String>,
}

/// Confirmation returned after a post is removed.
#[derive(Debug, Serialize)]
pub struct DeletedMessage {
    pub message: String,
}
