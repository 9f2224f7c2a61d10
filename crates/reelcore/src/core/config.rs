use once_cell::sync::Lazy;
use std::env;
use std::time::Duration;

/// Configuration constants for the relay core
/// Instagram session cookies
/// Read from INSTAGRAM_COOKIES environment variable
/// Multiple accounts are supported, separated by `;;;` — one is picked
/// uniformly at random per request
/// Default: empty (story/highlights/posts endpoints will refuse to run)
pub static INSTAGRAM_COOKIES: Lazy<String> =
    Lazy::new(|| env::var("INSTAGRAM_COOKIES").unwrap_or_else(|_| String::new()));

/// Instagram GraphQL document id for the shortcode media query
/// Read from INSTAGRAM_DOC_ID environment variable (rotates every few weeks)
pub static INSTAGRAM_DOC_ID: Lazy<String> =
    Lazy::new(|| env::var("INSTAGRAM_DOC_ID").unwrap_or_else(|_| "9510064595728286".to_string()));

/// Extraction-service (Cobalt-style) instance base URLs, in priority order
/// Read from COBALT_INSTANCES environment variable, comma-separated
/// Instances are tried in the order listed until one succeeds
pub static COBALT_INSTANCES: Lazy<Vec<String>> = Lazy::new(|| {
    env::var("COBALT_INSTANCES")
        .unwrap_or_else(|_| String::new())
        .split(',')
        .map(|s| s.trim().trim_end_matches('/').to_string())
        .filter(|s| !s.is_empty())
        .collect()
});

/// Retry configuration
pub mod retry {
    /// Maximum attempts per upstream call (1 initial + 2 retries)
    pub const MAX_ATTEMPTS: u32 = 3;

    /// Base delay before the first retry (milliseconds); doubles per attempt
    pub const BASE_DELAY_MS: u64 = 1000;

    /// HTTP statuses that indicate a durable problem — never retried
    pub const NON_RETRYABLE_STATUSES: &[u16] = &[401, 403, 404];
}

/// HTTP client configuration
pub mod http {
    use super::Duration;

    /// Timeout for metadata calls (GraphQL, profile, story lookups)
    pub const METADATA_TIMEOUT_SECS: u64 = 15;

    /// Timeout for buffered media transfers
    pub const TRANSFER_TIMEOUT_SECS: u64 = 120;

    /// Connect timeout shared by both client classes
    pub const CONNECT_TIMEOUT_SECS: u64 = 10;

    /// Metadata call timeout duration
    pub fn metadata_timeout() -> Duration {
        Duration::from_secs(METADATA_TIMEOUT_SECS)
    }

    /// Media transfer timeout duration
    pub fn transfer_timeout() -> Duration {
        Duration::from_secs(TRANSFER_TIMEOUT_SECS)
    }
}

/// Buffered re-upload configuration
pub mod transfer {
    /// Default cap for in-memory materialization of tunnel URLs (40 MB —
    /// under the chat platform's bot upload limit)
    pub const MAX_BUFFER_BYTES: u64 = 40 * 1024 * 1024;
}

/// Delivery configuration
pub mod delivery {
    /// Chat platforms cap media groups at 10 items per message
    pub const MAX_GROUP_SIZE: usize = 10;

    /// Recent download links kept per user in the stats document
    pub const HISTORY_LIMIT: usize = 5;
}

/// Admission-control configuration (caller-side, not part of resolution)
pub mod rate_limit {
    use super::Duration;

    /// Requests allowed per user per window
    pub const MAX_REQUESTS: u32 = 3;

    /// Fixed window length (seconds)
    pub const WINDOW_SECONDS: u64 = 60;

    /// Rate limit window duration
    pub fn window() -> Duration {
        Duration::from_secs(WINDOW_SECONDS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_defaults_match_backoff_schedule() {
        // 1s, 2s, 4s — doubling from the base
        assert_eq!(retry::MAX_ATTEMPTS, 3);
        assert_eq!(retry::BASE_DELAY_MS, 1000);
        assert!(retry::NON_RETRYABLE_STATUSES.contains(&401));
        assert!(retry::NON_RETRYABLE_STATUSES.contains(&404));
    }

    #[test]
    fn test_delivery_group_size() {
        assert_eq!(delivery::MAX_GROUP_SIZE, 10);
    }
}
