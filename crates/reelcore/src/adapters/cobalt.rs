//! External-platform extraction adapter (Cobalt-style services).
//!
//! Posts the raw URL to one of several equivalent service instances in a
//! fixed priority order. The instances themselves are the redundancy:
//! an instance answering with an error status just means "try the next
//! one" — only exhausting the whole list is terminal.

use crate::adapters::{metadata_client, read_json};
use crate::core::config;
use crate::core::error::RelayError;
use crate::media::MediaResult;
use crate::normalize;

/// Multi-instance extraction-service adapter.
pub struct CobaltAdapter {
    client: reqwest::Client,
    instances: Vec<String>,
}

impl CobaltAdapter {
    /// Build from the `COBALT_INSTANCES` environment configuration.
    pub fn from_env() -> Self {
        Self::new(config::COBALT_INSTANCES.clone())
    }

    pub fn new(instances: Vec<String>) -> Self {
        Self {
            client: metadata_client(),
            instances,
        }
    }

    /// Extract media for an external-platform URL.
    ///
    /// Tries each configured instance in order; returns the first
    /// successfully normalized result, or the last instance's error once
    /// all are exhausted.
    pub async fn fetch(&self, url: &str) -> Result<MediaResult, RelayError> {
        if self.instances.is_empty() {
            return Err(RelayError::DownloadFailed(
                "no extraction-service instances configured".to_string(),
            ));
        }

        let mut last_error = RelayError::MediaNotFound;
        for instance in &self.instances {
            match self.fetch_from_instance(instance, url).await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    log::warn!("Extraction instance {} failed: {}", instance, e);
                    last_error = e;
                }
            }
        }
        Err(last_error)
    }

    async fn fetch_from_instance(&self, instance: &str, url: &str) -> Result<MediaResult, RelayError> {
        let response = self
            .client
            .post(instance)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&serde_json::json!({ "url": url }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RelayError::HttpStatus(status));
        }

        let body = read_json(response).await?;
        if body.get("status").and_then(|v| v.as_str()) == Some("error") {
            let message = body
                .pointer("/error/code")
                .or_else(|| body.pointer("/text"))
                .and_then(|v| v.as_str())
                .unwrap_or("unknown error");
            return Err(RelayError::DownloadFailed(format!(
                "instance {} reported: {}",
                instance, message
            )));
        }

        let label = source_label(instance);
        normalize::extraction(&body, &label)
    }
}

/// Host part of the instance URL, used as the result's source label.
fn source_label(instance: &str) -> String {
    url::Url::parse(instance)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| instance.to_string())
}
