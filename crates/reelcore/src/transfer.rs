//! Buffered re-upload helper for tunnel URLs.
//!
//! Extraction services hand out transient URLs a delivery channel cannot
//! fetch live. This module materializes such content into memory, bounded
//! by a byte cap that is enforced twice: once via a best-effort HEAD
//! probe before the transfer starts, and again during the streamed
//! transfer for servers that do not report a size.

use crate::core::config;
use crate::core::error::RelayError;
use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;

/// Progress callback: `(percent, bytes_loaded, bytes_total)`.
///
/// Invoked at coalesced ~10% steps, not per chunk. Implementations must
/// not panic — the transfer does not guard against unwinding callbacks.
pub type ProgressFn = dyn Fn(u8, u64, Option<u64>) + Send + Sync;

/// Downloads bounded-size content into memory for re-transmission.
pub struct Materializer {
    client: reqwest::Client,
}

impl Default for Materializer {
    fn default() -> Self {
        Self::new()
    }
}

impl Materializer {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(config::http::transfer_timeout())
            .connect_timeout(std::time::Duration::from_secs(config::http::CONNECT_TIMEOUT_SECS))
            .build()
            .expect("transfer HTTP client build should succeed");
        Self { client }
    }

    /// Download `url` into memory, capped at `max_bytes`.
    ///
    /// Fails with `PayloadTooLarge` when the size probe reports content
    /// over the cap (the transfer is never started), and with
    /// `DownloadFailed` on transfer errors or when the cap is exceeded
    /// mid-transfer despite an inconclusive probe.
    pub async fn materialize(
        &self,
        url: &str,
        max_bytes: u64,
        on_progress: Option<&ProgressFn>,
    ) -> Result<Bytes, RelayError> {
        if let Some(size) = self.probe_size(url).await {
            if size > max_bytes {
                return Err(RelayError::PayloadTooLarge {
                    size,
                    limit: max_bytes,
                });
            }
        }

        let response = self.client.get(url).send().await.map_err(|e| {
            RelayError::DownloadFailed(format!("transfer request failed: {}", e))
        })?;
        let status = response.status();
        if !status.is_success() {
            return Err(RelayError::DownloadFailed(format!("transfer HTTP {}", status)));
        }

        let total = response.content_length();
        let mut buffer = BytesMut::new();
        let mut loaded: u64 = 0;
        let mut last_percent: u8 = 0;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| {
                RelayError::DownloadFailed(format!("error reading chunk: {}", e))
            })?;
            loaded += chunk.len() as u64;
            if loaded > max_bytes {
                return Err(RelayError::DownloadFailed(format!(
                    "transfer exceeded {} byte cap",
                    max_bytes
                )));
            }
            buffer.extend_from_slice(&chunk);

            if let Some(callback) = on_progress {
                let percent = total
                    .filter(|t| *t > 0)
                    .map(|t| ((loaded as f64 / t as f64) * 100.0) as u8)
                    .unwrap_or(0);
                if percent >= last_percent.saturating_add(10) || (percent == 100 && last_percent != 100) {
                    last_percent = percent;
                    callback(percent, loaded, total);
                }
            }
        }

        if let Some(callback) = on_progress {
            if last_percent != 100 {
                callback(100, loaded, total.or(Some(loaded)));
            }
        }

        Ok(buffer.freeze())
    }

    /// Best-effort HEAD probe. `None` means inconclusive — the transfer
    /// cap still applies.
    ///
    /// Reads the `Content-Length` header directly: a HEAD response has no
    /// body, so the client's body-based size accessor always reports zero.
    async fn probe_size(&self, url: &str) -> Option<u64> {
        match self.client.head(url).send().await {
            Ok(response) if response.status().is_success() => response
                .headers()
                .get(reqwest::header::CONTENT_LENGTH)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_materialize_small_payload() {
        let server = MockServer::start().await;
        let body = vec![7u8; 2048];
        Mock::given(method("HEAD"))
            .and(path("/v.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
            .mount(&server)
            .await;

        let materializer = Materializer::new();
        let bytes = materializer
            .materialize(&format!("{}/v.mp4", server.uri()), 10_000, None)
            .await
            .unwrap();
        assert_eq!(bytes.len(), 2048);
        assert_eq!(bytes[0], 7);
    }

    #[tokio::test]
    async fn test_probe_rejects_oversized_payload_without_transfer() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/big.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 5000]))
            .mount(&server)
            .await;
        // The full transfer must never start
        Mock::given(method("GET"))
            .and(path("/big.mp4"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let materializer = Materializer::new();
        let err = materializer
            .materialize(&format!("{}/big.mp4", server.uri()), 1000, None)
            .await
            .unwrap_err();
        match err {
            RelayError::PayloadTooLarge { size, limit } => {
                assert_eq!(size, 5000);
                assert_eq!(limit, 1000);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_cap_enforced_mid_transfer_when_probe_inconclusive() {
        let server = MockServer::start().await;
        // HEAD unsupported — probe is inconclusive
        Mock::given(method("HEAD"))
            .and(path("/stream.mp4"))
            .respond_with(ResponseTemplate::new(405))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/stream.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8; 4096]))
            .mount(&server)
            .await;

        let materializer = Materializer::new();
        let err = materializer
            .materialize(&format!("{}/stream.mp4", server.uri()), 1024, None)
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::DownloadFailed(_)));
    }

    #[tokio::test]
    async fn test_transfer_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let materializer = Materializer::new();
        let err = materializer
            .materialize(&format!("{}/gone.mp4", server.uri()), 1024, None)
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::DownloadFailed(_)));
    }

    #[tokio::test]
    async fn test_progress_is_coalesced_and_reaches_completion() {
        let server = MockServer::start().await;
        let body = vec![9u8; 100_000];
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(405))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
            .mount(&server)
            .await;

        let calls = Arc::new(AtomicU32::new(0));
        let last_seen = Arc::new(Mutex::new((0u8, 0u64)));
        let calls_cb = calls.clone();
        let last_cb = last_seen.clone();
        let callback = move |percent: u8, loaded: u64, _total: Option<u64>| {
            calls_cb.fetch_add(1, Ordering::SeqCst);
            *last_cb.lock().unwrap() = (percent, loaded);
        };

        let materializer = Materializer::new();
        let bytes = materializer
            .materialize(&format!("{}/v.mp4", server.uri()), 1_000_000, Some(&callback))
            .await
            .unwrap();

        assert_eq!(bytes.len(), 100_000);
        let (percent, loaded) = *last_seen.lock().unwrap();
        assert_eq!(percent, 100);
        assert_eq!(loaded, 100_000);
        // Coalesced: far fewer callbacks than chunks
        assert!(calls.load(Ordering::SeqCst) <= 12);
    }
}
