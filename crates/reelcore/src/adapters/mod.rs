//! Upstream adapters — one per upstream surface.
//!
//! Each adapter issues authenticated requests against one family of
//! endpoints and returns either raw platform payloads (Instagram
//! surfaces, normalized by `crate::normalize`) or a finished
//! `MediaResult` (the extraction-service adapter, which owns its own
//! instance fallback).

pub mod cobalt;
pub mod graphql;
pub mod mobile;
pub mod profile;

use crate::core::config;

/// Instagram internal app ID (public, embedded in the web app).
pub(crate) const IG_APP_ID: &str = "936619743392459";

/// HTTP client for metadata calls (GraphQL, lookups, profile pages).
///
/// Timeouts are enforced here, not in the pipeline logic: 15s per
/// metadata call, shared connect timeout.
pub(crate) fn metadata_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(config::http::metadata_timeout())
        .connect_timeout(std::time::Duration::from_secs(config::http::CONNECT_TIMEOUT_SECS))
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
        .expect("metadata HTTP client build should succeed")
}

/// Read a JSON body, mapping parse failures to `MalformedUpstream`.
pub(crate) async fn read_json(response: reqwest::Response) -> Result<serde_json::Value, crate::core::error::RelayError> {
    let text = response.text().await?;
    serde_json::from_str(&text).map_err(|e| {
        crate::core::error::RelayError::MalformedUpstream(format!(
            "non-JSON response ({}): {}",
            e,
            text.chars().take(200).collect::<String>()
        ))
    })
}
