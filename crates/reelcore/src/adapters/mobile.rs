//! Private mobile-API adapter — stories, highlights, posts, profile.
//!
//! These endpoints live on `i.instagram.com` and want the mobile-app
//! user agent plus real session cookies. Callers that require
//! authentication check credentials *before* the request — an
//! unauthenticated call here turns into an uninformative 401 upstream.
//!
//! Empty item lists are expected, non-exceptional states and map to
//! distinct conditions (`NoActiveStories`, `NoHighlights`, `NoPosts`)
//! so the caller can message them differently from a generic not-found.

use crate::adapters::{metadata_client, read_json, IG_APP_ID};
use crate::core::error::RelayError;
use crate::core::monitor::FailureMonitor;
use crate::core::retry::{self, RetryPolicy};
use crate::identity::{CredentialPool, UaClass};
use serde_json::Value;
use std::sync::Arc;

/// Adapter for the private mobile API and the web profile endpoint.
pub struct MobileApiAdapter {
    client: reqwest::Client,
    pool: Arc<CredentialPool>,
    monitor: Arc<dyn FailureMonitor>,
    /// `i.instagram.com` — mobile feed/story/highlights endpoints
    api_base: String,
    /// `www.instagram.com` — web profile lookup
    web_base: String,
}

impl MobileApiAdapter {
    pub fn new(pool: Arc<CredentialPool>, monitor: Arc<dyn FailureMonitor>) -> Self {
        Self {
            client: metadata_client(),
            pool,
            monitor,
            api_base: "https://i.instagram.com".to_string(),
            web_base: "https://www.instagram.com".to_string(),
        }
    }

    /// Point both endpoint families at one host (tests).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base = base_url.into();
        self.api_base = base.clone();
        self.web_base = base;
        self
    }

    /// Cookie required by the story/highlights/posts endpoints.
    fn require_cookie(&self) -> Result<String, RelayError> {
        self.pool
            .pick_cookie()
            .map(str::to_string)
            .ok_or(RelayError::CredentialsMissing)
    }

    async fn get_json(&self, url: String, cookie: Option<String>, ua: UaClass) -> Result<Value, RelayError> {
        let policy = RetryPolicy::default();
        retry::execute(&policy, self.monitor.as_ref(), || {
            let url = url.clone();
            let cookie = cookie.clone();
            async move {
                let mut request = self
                    .client
                    .get(url)
                    .header(reqwest::header::USER_AGENT, self.pool.pick_user_agent(ua))
                    .header("X-IG-App-ID", IG_APP_ID);
                if let Some(ref cookie) = cookie {
                    request = request.header(reqwest::header::COOKIE, cookie.clone());
                }

                let response = request.send().await?;
                let status = response.status();
                if !status.is_success() {
                    return Err(RelayError::HttpStatus(status));
                }
                read_json(response).await
            }
        })
        .await
    }

    /// Resolve a username to its numeric user id.
    pub async fn lookup_user_id(&self, username: &str) -> Result<String, RelayError> {
        let url = format!(
            "{}/api/v1/users/web_profile_info/?username={}",
            self.web_base,
            urlencoding::encode(username)
        );
        let cookie = self.pool.pick_cookie().map(str::to_string);

        let data = match self.get_json(url, cookie, UaClass::Browser).await {
            Ok(data) => data,
            Err(e) if e.status_code() == Some(404) => {
                return Err(RelayError::UserNotFound(username.to_string()))
            }
            Err(e) => return Err(e),
        };

        data.pointer("/data/user/id")
            .and_then(json_id)
            .ok_or_else(|| RelayError::UserNotFound(username.to_string()))
    }

    /// Fetch a single story by its numeric id (`/media/<id>/info/`).
    pub async fn fetch_story(&self, story_id: &str) -> Result<Value, RelayError> {
        let cookie = self.require_cookie()?;
        let url = format!("{}/api/v1/media/{}/info/", self.api_base, story_id);
        let data = self.get_json(url, Some(cookie), UaClass::Mobile).await?;

        let has_items = data
            .get("items")
            .and_then(|v| v.as_array())
            .is_some_and(|items| !items.is_empty());
        if !has_items {
            // Story expired or the account is private
            return Err(RelayError::MediaNotFound);
        }
        Ok(data)
    }

    /// Fetch a user's active story reel.
    pub async fn fetch_user_stories(&self, username: &str) -> Result<Value, RelayError> {
        let cookie = self.require_cookie()?;
        let user_id = self.lookup_user_id(username).await?;
        let url = format!(
            "{}/api/v1/feed/reels_media/?reel_ids={}",
            self.api_base,
            urlencoding::encode(&user_id)
        );
        let data = self.get_json(url, Some(cookie), UaClass::Mobile).await?;

        let reel = data.pointer(&format!("/reels/{}", user_id)).cloned();
        match reel {
            Some(reel)
                if reel
                    .get("items")
                    .and_then(|v| v.as_array())
                    .is_some_and(|items| !items.is_empty()) =>
            {
                Ok(reel)
            }
            _ => Err(RelayError::NoActiveStories(username.to_string())),
        }
    }

    /// Fetch all highlight reels for a user: tray listing first, then all
    /// reel media in one batched request.
    pub async fn fetch_highlights(&self, username: &str) -> Result<Value, RelayError> {
        let cookie = self.require_cookie()?;
        let user_id = self.lookup_user_id(username).await?;

        let tray_url = format!("{}/api/v1/highlights/{}/highlights_tray/", self.api_base, user_id);
        let tray_data = self.get_json(tray_url, Some(cookie.clone()), UaClass::Mobile).await?;

        let reel_ids: Vec<String> = tray_data
            .get("tray")
            .and_then(|v| v.as_array())
            .map(|tray| tray.iter().filter_map(|reel| reel.get("id").and_then(json_id)).collect())
            .unwrap_or_default();
        if reel_ids.is_empty() {
            return Err(RelayError::NoHighlights(username.to_string()));
        }

        let form: Vec<(&str, String)> = reel_ids.iter().map(|id| ("user_ids", id.clone())).collect();
        let policy = RetryPolicy::default();
        let reels_data = retry::execute(&policy, self.monitor.as_ref(), || {
            let form = form.clone();
            let cookie = cookie.clone();
            async move {
                let response = self
                    .client
                    .post(format!("{}/api/v1/feed/reels_media/", self.api_base))
                    .header(reqwest::header::USER_AGENT, self.pool.pick_user_agent(UaClass::Mobile))
                    .header(reqwest::header::COOKIE, cookie)
                    .form(&form)
                    .send()
                    .await?;
                let status = response.status();
                if !status.is_success() {
                    return Err(RelayError::HttpStatus(status));
                }
                read_json(response).await
            }
        })
        .await?;

        let reels = reels_data.get("reels").cloned();
        match reels {
            Some(reels) if reels.as_object().is_some_and(|map| !map.is_empty()) => Ok(reels),
            _ => Err(RelayError::NoHighlights(username.to_string())),
        }
    }

    /// Fetch the user feed (`/feed/user/<id>/`) for recent posts.
    pub async fn fetch_recent_posts(&self, username: &str) -> Result<Value, RelayError> {
        let cookie = self.require_cookie()?;
        let user_id = self.lookup_user_id(username).await?;
        let url = format!("{}/api/v1/feed/user/{}/", self.api_base, user_id);
        let data = self.get_json(url, Some(cookie), UaClass::Mobile).await?;

        let has_items = data
            .get("items")
            .and_then(|v| v.as_array())
            .is_some_and(|items| !items.is_empty());
        if !has_items {
            return Err(RelayError::NoPosts(username.to_string()));
        }
        Ok(data)
    }

    /// Fetch the full profile user node. Cookies are sent when available
    /// but are not required — public profiles resolve without them.
    pub async fn fetch_profile(&self, username: &str) -> Result<Value, RelayError> {
        let url = format!(
            "{}/api/v1/users/web_profile_info/?username={}",
            self.web_base,
            urlencoding::encode(username)
        );
        let cookie = self.pool.pick_cookie().map(str::to_string);

        let data = match self.get_json(url, cookie, UaClass::Browser).await {
            Ok(data) => data,
            Err(e) if e.status_code() == Some(404) => {
                return Err(RelayError::UserNotFound(username.to_string()))
            }
            Err(e) => return Err(e),
        };

        data.pointer("/data/user")
            .filter(|user| !user.is_null())
            .cloned()
            .ok_or_else(|| RelayError::UserNotFound(username.to_string()))
    }
}

/// Upstream ids arrive as strings or numbers — always stringify.
fn json_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
