//! XRPC request and response bodies
//!
//! Only the fields the tracker reads are modelled; everything else in the
//! responses is ignored by serde.

use serde::{Deserialize, Serialize};

/// Body of `com.atproto.server.createSession`
#[derive(Debug, Serialize)]
pub struct CreateSessionRequest<'a> {
    pub identifier: &'a str,
    pub password: &'a str,
}

/// An authenticated session
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub access_jwt: String,
    #[serde(default)]
    pub refresh_jwt: Option<String>,
    pub handle: String,
    pub did: String,
}

/// Detailed profile returned by `app.bsky.actor.getProfile`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub handle: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub followers_count: Option<u64>,
    pub created_at: Option<String>,
}

/// A single follower entry from `app.bsky.graph.getFollowers`
#[derive(Debug, Clone, Deserialize)]
pub struct FollowerView {
    pub handle: String,
}

/// One page of `app.bsky.graph.getFollowers`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FollowersPage {
    #[serde(default)]
    pub followers: Vec<FollowerView>,
    #[serde(default)]
    pub cursor: Option<String>,
}

impl FollowersPage {
    /// Returns the cursor for the next page, treating an empty cursor as the end
    pub fn next_cursor(&self) -> Option<&str> {
        self.cursor.as_deref().filter(|c| !c.is_empty())
    }
}

/// Error body returned by XRPC endpoints on failure
#[derive(Debug, Default, Deserialize)]
pub struct XrpcErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}
