//! GraphQL post adapter — posts and reels via the internal GraphQL API.
//!
//! POSTs the fixed shortcode-media document (`doc_id` is configurable via
//! `INSTAGRAM_DOC_ID`, it rotates every few weeks) with a CSRF token and
//! session cookie. A 401 is `Unauthorized` and reported to the failure
//! monitor immediately; a response without the media node is
//! `MediaNotFound` — that shape covers deleted, private and unsupported
//! content uniformly.

use crate::adapters::{metadata_client, read_json};
use crate::core::config;
use crate::core::error::RelayError;
use crate::core::monitor::{FailureKind, FailureMonitor, FailureReport};
use crate::core::retry::{self, RetryPolicy};
use crate::identity::{CredentialPool, UaClass};
use std::sync::Arc;

/// Sentinel sent when no CSRF token could be obtained. Upstream will
/// reject it through the normal error path — intentionally a soft
/// failure, not a distinct code path.
const MISSING_TOKEN: &str = "missing-token";

/// Adapter for the GraphQL shortcode-media endpoint.
pub struct GraphqlPostAdapter {
    client: reqwest::Client,
    pool: Arc<CredentialPool>,
    monitor: Arc<dyn FailureMonitor>,
    base_url: String,
    doc_id: String,
}

impl GraphqlPostAdapter {
    pub fn new(pool: Arc<CredentialPool>, monitor: Arc<dyn FailureMonitor>) -> Self {
        Self {
            client: metadata_client(),
            pool,
            monitor,
            base_url: "https://www.instagram.com".to_string(),
            doc_id: config::INSTAGRAM_DOC_ID.clone(),
        }
    }

    /// Point the adapter at a different host (tests).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Obtain a CSRF token for the GraphQL POST.
    ///
    /// Prefers the `csrftoken` field of a configured cookie; otherwise
    /// performs one unauthenticated GET against the platform root and
    /// harvests the token from the session cookie it sets. Falls back to
    /// the `missing-token` sentinel.
    pub async fn csrf_token(&self) -> String {
        if let Some(token) = self.pool.csrf_from_cookies() {
            return token;
        }

        let mut request = self
            .client
            .get(format!("{}/", self.base_url))
            .header(reqwest::header::USER_AGENT, self.pool.pick_user_agent(UaClass::Browser));
        if let Some(cookie) = self.pool.pick_cookie() {
            request = request.header(reqwest::header::COOKIE, cookie.to_string());
        }

        match request.send().await {
            Ok(response) => {
                for value in response.headers().get_all(reqwest::header::SET_COOKIE) {
                    if let Ok(cookie) = value.to_str() {
                        if let Some(token) = cookie
                            .split(';')
                            .next()
                            .and_then(|part| part.trim().strip_prefix("csrftoken="))
                        {
                            if !token.is_empty() {
                                return token.to_string();
                            }
                        }
                    }
                }
                MISSING_TOKEN.to_string()
            }
            Err(e) => {
                log::warn!("CSRF harvest request failed: {}", e);
                MISSING_TOKEN.to_string()
            }
        }
    }

    /// Fetch the raw `xdt_shortcode_media` node for a shortcode.
    pub async fn fetch_post(&self, shortcode: &str) -> Result<serde_json::Value, RelayError> {
        let token = self.csrf_token().await;
        let variables = serde_json::json!({
            "shortcode": shortcode,
            "fetch_tagged_user_count": null,
            "hoisted_comment_id": null,
            "hoisted_reply_id": null,
        })
        .to_string();
        let body = format!(
            "variables={}&doc_id={}",
            urlencoding::encode(&variables),
            self.doc_id
        );

        let policy = RetryPolicy::default();
        retry::execute(&policy, self.monitor.as_ref(), || {
            self.single_request(&token, &body)
        })
        .await
    }

    async fn single_request(&self, token: &str, body: &str) -> Result<serde_json::Value, RelayError> {
        let mut request = self
            .client
            .post(format!("{}/graphql/query", self.base_url))
            .header(reqwest::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header("X-CSRFToken", token.to_string())
            .header(reqwest::header::USER_AGENT, self.pool.pick_user_agent(UaClass::Browser))
            .body(body.to_string());
        if let Some(cookie) = self.pool.pick_cookie() {
            request = request.header(reqwest::header::COOKIE, cookie.to_string());
        }

        let response = request.send().await?;
        let status = response.status();

        if status.as_u16() == 401 {
            let err = RelayError::Unauthorized(
                "session cookies may be invalid or missing".to_string(),
            );
            // Credential rotation is likely needed — alert right away
            self.monitor.report(FailureReport {
                kind: FailureKind::Unauthorized,
                message: err.to_string(),
                attempts: 1,
            });
            return Err(err);
        }
        if !status.is_success() {
            return Err(RelayError::HttpStatus(status));
        }

        let data = read_json(response).await?;
        data.pointer("/data/xdt_shortcode_media")
            .filter(|node| !node.is_null())
            .cloned()
            .ok_or(RelayError::MediaNotFound)
    }
}
