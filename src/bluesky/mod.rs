//! Bluesky client module
//!
//! This module contains the social-network collaborator used by the crawler:
//! - The `SocialClient` trait the crawler is written against
//! - An XRPC implementation over reqwest (`BlueskyClient`)
//! - Request/response bodies and error classification

mod client;
mod types;

pub use client::{build_http_client, BlueskyClient};
pub use types::{FollowerView, FollowersPage, ProfileView, Session};

use async_trait::async_trait;
use thiserror::Error;

/// Errors returned by the social-network client
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Not authenticated")]
    Unauthorized,

    #[error("API error {status} ({error}): {message}")]
    Api {
        status: u16,
        error: String,
        message: String,
    },

    #[error("Unexpected response body: {0}")]
    Decode(String),
}

/// Read-only queries the crawler needs from the social network
#[async_trait]
pub trait SocialClient: Send + Sync {
    /// Fetches the detailed profile of a handle
    async fn get_profile(&self, handle: &str) -> Result<ProfileView, ClientError>;

    /// Fetches one page of followers of a handle
    ///
    /// # Arguments
    ///
    /// * `handle` - The account whose followers are listed
    /// * `limit` - Maximum number of followers in the page
    /// * `cursor` - Cursor returned by the previous page, `None` for the first
    async fn get_followers(
        &self,
        handle: &str,
        limit: u32,
        cursor: Option<&str>,
    ) -> Result<FollowersPage, ClientError>;
}
