//! Profile and follower fetching
//!
//! This module wraps the social-network client for the crawl loop:
//! - Fetching a single profile and classifying failures
//! - Paging through the complete follower list with a fixed delay
//!
//! Neither function returns an error. Failures are reported through the
//! returned value so the crawl loop can keep going.

use crate::bluesky::{ClientError, SocialClient};
use crate::storage::ProfileRecord;
use chrono::Utc;
use std::time::Duration;

/// Result of a profile fetch
#[derive(Debug)]
pub enum ProfileFetch {
    /// Profile was fetched and converted into a snapshot
    Found(ProfileRecord),

    /// The handle does not resolve to a profile
    NotFound,

    /// The service refused the request because of rate limits
    RateLimited,

    /// The service answered with an error or an unreadable body
    ApiError {
        status: Option<u16>,
        message: String,
    },

    /// The request never completed (connection, timeout, TLS)
    NetworkError(String),
}

impl From<ClientError> for ProfileFetch {
    fn from(error: ClientError) -> Self {
        match error {
            ClientError::NotFound(_) => Self::NotFound,
            ClientError::RateLimited => Self::RateLimited,
            ClientError::Http(e) => Self::NetworkError(e.to_string()),
            ClientError::Unauthorized => Self::ApiError {
                status: Some(401),
                message: "not authenticated".to_string(),
            },
            ClientError::Api {
                status,
                error,
                message,
            } => Self::ApiError {
                status: Some(status),
                message: format!("{}: {}", error, message),
            },
            ClientError::Decode(message) => Self::ApiError {
                status: None,
                message,
            },
        }
    }
}

/// Fetches a profile and turns it into a snapshot stamped with the current time
///
/// Any failure is returned as a non-`Found` variant for the caller to report.
pub async fn fetch_profile<C>(client: &C, handle: &str) -> ProfileFetch
where
    C: SocialClient + ?Sized,
{
    tracing::debug!("Fetching profile for {}", handle);

    match client.get_profile(handle).await {
        Ok(view) => {
            let record = ProfileRecord::from_view(handle, view, Utc::now());
            tracing::debug!(
                "Fetched profile {}: {} followers",
                record.handle,
                record.followers_count
            );
            ProfileFetch::Found(record)
        }
        Err(e) => {
            tracing::debug!("Profile request for {} failed: {}", handle, e);
            ProfileFetch::from(e)
        }
    }
}

/// Collects the handles of every follower of an account, in listing order
///
/// Pages are requested with the given page size until the service stops
/// returning a cursor, sleeping `delay` between requests. If a page request
/// fails, or the service hands back the cursor it was just given, the handles
/// gathered so far are returned.
pub async fn fetch_follower_handles<C>(
    client: &C,
    handle: &str,
    page_size: u32,
    delay: Duration,
) -> Vec<String>
where
    C: SocialClient + ?Sized,
{
    tracing::info!("Fetching followers for {}", handle);

    let mut followers = Vec::new();
    let mut cursor: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let page = match client
            .get_followers(handle, page_size, cursor.as_deref())
            .await
        {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!(
                    "Error fetching followers for {} after {} pages: {}",
                    handle,
                    pages,
                    e
                );
                break;
            }
        };

        pages += 1;
        followers.extend(page.followers.iter().map(|f| f.handle.clone()));

        match page.next_cursor() {
            Some(next) if cursor.as_deref() == Some(next) => {
                tracing::warn!(
                    "Follower listing for {} repeated cursor {}, stopping",
                    handle,
                    next
                );
                break;
            }
            Some(next) => cursor = Some(next.to_string()),
            None => break,
        }

        tracing::debug!("Fetched {} followers so far", followers.len());
        tokio::time::sleep(delay).await;
    }

    tracing::info!(
        "Got {} followers for {} in {} pages",
        followers.len(),
        handle,
        pages
    );
    followers
}
