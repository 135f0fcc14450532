//! XRPC client implementation
//!
//! This module handles all HTTP requests to the Bluesky service, including:
//! - Building HTTP clients with a proper user agent string
//! - Creating a session (login)
//! - Profile and follower queries with bearer authentication
//! - Error classification

use crate::bluesky::types::{
    CreateSessionRequest, FollowersPage, ProfileView, Session, XrpcErrorBody,
};
use crate::bluesky::{ClientError, SocialClient};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::sync::RwLock;

const CREATE_SESSION: &str = "com.atproto.server.createSession";
const REFRESH_SESSION: &str = "com.atproto.server.refreshSession";
const GET_PROFILE: &str = "app.bsky.actor.getProfile";
const GET_FOLLOWERS: &str = "app.bsky.graph.getFollowers";

/// XRPC error name returned once an access token has expired
const EXPIRED_TOKEN: &str = "ExpiredToken";

/// Builds an HTTP client with proper configuration
pub fn build_http_client() -> Result<Client, reqwest::Error> {
    let user_agent = format!(
        "{}/{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );

    Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Client for a Bluesky XRPC service
///
/// Queries carry the session's access token. When the service reports the
/// token as expired, the session is refreshed once and the query retried.
pub struct BlueskyClient {
    http: Client,
    service_url: String,
    session: RwLock<Option<Session>>,
}

impl BlueskyClient {
    /// Creates an unauthenticated client for the given service
    ///
    /// # Arguments
    ///
    /// * `service_url` - Base URL of the service, e.g. `https://bsky.social`
    pub fn new(service_url: &str) -> Result<Self, ClientError> {
        Ok(Self {
            http: build_http_client()?,
            service_url: service_url.trim_end_matches('/').to_string(),
            session: RwLock::new(None),
        })
    }

    /// Creates a session for the given handle and stores its tokens
    pub async fn login(&self, handle: &str, password: &str) -> Result<Session, ClientError> {
        tracing::debug!("Creating session for {}", handle);

        let request = self
            .http
            .post(self.endpoint(CREATE_SESSION))
            .json(&CreateSessionRequest {
                identifier: handle,
                password,
            });

        let session: Session = send(request).await?;
        tracing::info!("Logged in as {} ({})", session.handle, session.did);

        *self.session.write().await = Some(session.clone());
        Ok(session)
    }

    /// Returns a copy of the current session, if logged in
    pub async fn session(&self) -> Option<Session> {
        self.session.read().await.clone()
    }

    /// Exchanges the refresh token for a new session
    ///
    /// Fails with `Unauthorized` when there is no session or the session
    /// carries no refresh token.
    pub async fn refresh_session(&self) -> Result<(), ClientError> {
        let refresh_jwt = self
            .session
            .read()
            .await
            .as_ref()
            .and_then(|s| s.refresh_jwt.clone())
            .ok_or(ClientError::Unauthorized)?;

        tracing::info!("Access token expired, refreshing session");
        let request = self
            .http
            .post(self.endpoint(REFRESH_SESSION))
            .bearer_auth(refresh_jwt);

        let session: Session = send(request).await?;
        tracing::debug!("Session refreshed for {}", session.handle);

        *self.session.write().await = Some(session);
        Ok(())
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/xrpc/{}", self.service_url, method)
    }

    async fn access_token(&self) -> Result<String, ClientError> {
        self.session
            .read()
            .await
            .as_ref()
            .map(|s| s.access_jwt.clone())
            .ok_or(ClientError::Unauthorized)
    }

    /// Runs an authenticated GET query, refreshing the session once if the
    /// access token has expired
    async fn query<T: DeserializeOwned>(
        &self,
        method: &str,
        params: &[(&str, String)],
    ) -> Result<T, ClientError> {
        let token = self.access_token().await?;
        let request = self.http.get(self.endpoint(method)).query(params);

        match send(request.bearer_auth(token)).await {
            Err(e) if is_expired_token(&e) => {
                self.refresh_session().await?;
                let token = self.access_token().await?;
                let retry = self.http.get(self.endpoint(method)).query(params);
                send(retry.bearer_auth(token)).await
            }
            result => result,
        }
    }
}

#[async_trait]
impl SocialClient for BlueskyClient {
    async fn get_profile(&self, handle: &str) -> Result<ProfileView, ClientError> {
        self.query(GET_PROFILE, &[("actor", handle.to_string())])
            .await
    }

    async fn get_followers(
        &self,
        handle: &str,
        limit: u32,
        cursor: Option<&str>,
    ) -> Result<FollowersPage, ClientError> {
        let mut params = vec![("actor", handle.to_string()), ("limit", limit.to_string())];
        if let Some(cursor) = cursor {
            params.push(("cursor", cursor.to_string()));
        }

        self.query(GET_FOLLOWERS, &params).await
    }
}

fn is_expired_token(error: &ClientError) -> bool {
    match error {
        ClientError::Unauthorized => true,
        ClientError::Api { error, .. } => error == EXPIRED_TOKEN,
        _ => false,
    }
}

/// Sends a request and decodes a JSON body, classifying failures
async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ClientError> {
    let response = request.send().await?;
    let status = response.status();

    if !status.is_success() {
        return Err(classify_error(status, response).await);
    }

    let body = response.bytes().await?;
    serde_json::from_slice(&body).map_err(|e| ClientError::Decode(e.to_string()))
}

/// Maps an unsuccessful response to a ClientError
///
/// | Condition | Error |
/// |-----------|-------|
/// | HTTP 401 | Unauthorized |
/// | HTTP 404 | NotFound |
/// | HTTP 429 | RateLimited |
/// | HTTP 400 with a "not found" message | NotFound |
/// | Anything else | Api |
async fn classify_error(status: StatusCode, response: Response) -> ClientError {
    let body: XrpcErrorBody = response.json().await.unwrap_or_default();
    let message = body.message.unwrap_or_default();

    match status {
        StatusCode::UNAUTHORIZED => ClientError::Unauthorized,
        StatusCode::NOT_FOUND => ClientError::NotFound(message),
        StatusCode::TOO_MANY_REQUESTS => ClientError::RateLimited,
        StatusCode::BAD_REQUEST if message.to_ascii_lowercase().contains("not found") => {
            ClientError::NotFound(message)
        }
        _ => ClientError::Api {
            status: status.as_u16(),
            error: body.error.unwrap_or_else(|| "Unknown".to_string()),
            message,
        },
    }
}
