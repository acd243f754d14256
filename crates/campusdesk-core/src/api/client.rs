//! API client for the LMS REST API.
//!
//! Every request carries the access token currently held in the shared
//! `BearerToken` slot; the session manager keeps that slot up to date.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder, Url};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::auth::{AuthBackend, AuthError, AuthResult, Credentials, LoginRejection, TokenPair};
use crate::config::Config;
use crate::models::{
    sort_timetable, Announcement, Comment, Course, NewComment, NewPost, Notification, Post,
    PostDetail, TeacherStats, TimetableEntry, UserProfile, Weekday,
};

use super::{ApiError, BearerToken};

/// Maximum number of retries for rate-limited (429) requests.
/// 3 retries with exponential backoff usually succeeds without excessive delay.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// API client for the LMS backend.
/// Clone is cheap - reqwest::Client and BearerToken are both shared handles.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    bearer: BearerToken,
}

impl ApiClient {
    pub fn new(config: &Config, bearer: BearerToken) -> Result<Self> {
        let client = Client::builder().timeout(config.request_timeout()).build()?;
        let base_url = Url::parse(config.api_base())
            .with_context(|| format!("Invalid API base URL '{}'", config.api_base_url))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("API base URL '{}' cannot hold a path", config.api_base_url);
        }

        Ok(Self {
            client,
            base_url,
            bearer,
        })
    }

    pub fn bearer(&self) -> &BearerToken {
        &self.bearer
    }

    /// Join path segments onto the base. An empty last segment yields a
    /// trailing slash, which some endpoints require.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn auth_headers(&self) -> Result<header::HeaderMap> {
        let mut headers = header::HeaderMap::new();
        if let Some(value) = self.bearer.header_value()? {
            headers.insert(header::AUTHORIZATION, value);
        }
        Ok(headers)
    }

    /// Send a request, backing off and resending while the server answers 429.
    async fn send_with_retry<F>(&self, url: &Url, build: F) -> Result<reqwest::Response>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let response = build()
                .headers(self.auth_headers()?)
                .send()
                .await
                .map_err(ApiError::from)
                .with_context(|| format!("Failed to send request to {}", url))?;

            let status = response.status();
            if status.is_success() {
                return Ok(response);
            }
            if status.as_u16() != 429 {
                let body = response.text().await.unwrap_or_default();
                return Err(ApiError::from_status(status, &body).into());
            }

            retries += 1;
            if retries > MAX_RATE_LIMIT_RETRIES {
                return Err(ApiError::RateLimited.into());
            }
            warn!(url = %url, retry = retries, backoff_ms = backoff_ms, "Rate limited, backing off");
            tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
            backoff_ms *= 2;
        }
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!(url = %url, "GET");
        let response = self
            .send_with_retry(&url, || self.client.get(url.clone()))
            .await?;
        let text = response.text().await.map_err(ApiError::from)?;
        serde_json::from_str(&text)
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))
            .with_context(|| format!("Failed to parse JSON response from {}", url))
    }

    async fn post<T: DeserializeOwned, B: Serialize>(&self, url: Url, body: &B) -> Result<T> {
        debug!(url = %url, "POST");
        let response = self
            .send_with_retry(&url, || self.client.post(url.clone()).json(body))
            .await?;
        let text = response.text().await.map_err(ApiError::from)?;
        serde_json::from_str(&text)
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))
            .with_context(|| format!("Failed to parse JSON response from {}", url))
    }

    /// POST where the response body is not needed.
    async fn post_empty(&self, url: Url) -> Result<()> {
        debug!(url = %url, "POST");
        self.send_with_retry(&url, || self.client.post(url.clone()))
            .await?;
        Ok(())
    }

    // ===== Courses =====

    pub async fn fetch_courses(&self) -> Result<Vec<Course>> {
        self.get(self.url(&["courses"])).await
    }

    pub async fn fetch_teacher_courses(&self, teacher_id: i64) -> Result<Vec<Course>> {
        let mut url = self.url(&["courses"]);
        url.query_pairs_mut()
            .append_pair("teacher", &teacher_id.to_string());
        self.get(url).await
    }

    /// A batch's classes on `day`, in start-time order.
    pub async fn fetch_timetable(&self, batch: &str, day: Weekday) -> Result<Vec<TimetableEntry>> {
        let mut url = self.url(&["courses", "time-table", batch, ""]);
        url.query_pairs_mut()
            .append_pair("day", &day.index().to_string());
        let mut entries: Vec<TimetableEntry> = self.get(url).await?;
        sort_timetable(&mut entries);
        Ok(entries)
    }

    /// The logged-in teacher's classes on `day`.
    pub async fn fetch_teacher_timetable(&self, day: Weekday) -> Result<Vec<TimetableEntry>> {
        let mut url = self.url(&["courses", "time-table", "teacher", ""]);
        url.query_pairs_mut()
            .append_pair("day", &day.index().to_string());
        let mut entries: Vec<TimetableEntry> = self.get(url).await?;
        sort_timetable(&mut entries);
        Ok(entries)
    }

    // ===== Forum =====

    pub async fn fetch_posts(&self) -> Result<Vec<Post>> {
        self.get(self.url(&["forum"])).await
    }

    pub async fn fetch_post(&self, id: i64) -> Result<PostDetail> {
        self.get(self.url(&["forum", &id.to_string()])).await
    }

    pub async fn create_post(&self, post: &NewPost) -> Result<Post> {
        self.post(self.url(&["forum", ""]), post).await
    }

    pub async fn add_comment(&self, post_id: i64, comment: &NewComment) -> Result<Comment> {
        self.post(self.url(&["forum", &post_id.to_string(), "comment"]), comment)
            .await
    }

    // ===== Notifications & announcements =====

    pub async fn fetch_notifications(&self) -> Result<Vec<Notification>> {
        self.get(self.url(&["notifications"])).await
    }

    pub async fn mark_all_notifications_read(&self) -> Result<()> {
        self.post_empty(self.url(&["notifications", "mark-all-read"]))
            .await
    }

    pub async fn fetch_announcements(&self) -> Result<Vec<Announcement>> {
        self.get(self.url(&["announcements", ""])).await
    }

    // ===== People =====

    pub async fn fetch_profile(&self, enrollment_number: &str) -> Result<UserProfile> {
        self.get(self.url(&["users", enrollment_number])).await
    }

    pub async fn fetch_teacher_stats(&self, teacher_id: i64) -> Result<TeacherStats> {
        self.get(self.url(&["teacher-stats", &teacher_id.to_string()]))
            .await
    }

    // ===== Token endpoints =====

    /// POST to a token endpoint without the bearer header and map the
    /// outcome onto the login error taxonomy.
    async fn token_request<B: Serialize>(&self, url: Url, body: &B) -> AuthResult<TokenPair> {
        let response = self
            .client
            .post(url.clone())
            .json(body)
            .send()
            .await
            .map_err(|e| AuthError::NetworkFailure(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AuthError::NetworkFailure(e.to_string()))?;

        if status.is_server_error() {
            warn!(url = %url, status = status.as_u16(), "Token endpoint failed");
            return Err(AuthError::Server(format!("Status {}", status)));
        }
        if !status.is_success() {
            debug!(url = %url, status = status.as_u16(), "Token request rejected");
            return Err(AuthError::InvalidCredentials(LoginRejection::from_body(&text)));
        }

        serde_json::from_str(&text)
            .map_err(|e| AuthError::Server(format!("Unexpected token response: {}", e)))
    }
}

#[async_trait]
impl AuthBackend for ApiClient {
    async fn obtain_tokens(&self, credentials: &Credentials) -> AuthResult<TokenPair> {
        self.token_request(self.url(&["users", "token", ""]), credentials)
            .await
    }

    async fn refresh_tokens(&self, refresh: &str) -> AuthResult<TokenPair> {
        let body = serde_json::json!({ "refresh": refresh });
        self.token_request(self.url(&["users", "token", "refresh", ""]), &body)
            .await
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url.as_str())
            .field("bearer", &self.bearer)
            .finish()
    }
}
