use thiserror::Error;

/// Centralized error types for the resolution pipeline.
///
/// Every failure the core can produce is a variant of this enum so that
/// callers (bot, web wrapper) can map error kinds to user copy without
/// string matching. The original upstream message is always preserved.
#[derive(Error, Debug)]
pub enum RelayError {
    /// Input string matched no known URL pattern or command.
    #[error("Unrecognized input: {0}")]
    UnrecognizedInput(String),

    /// A username-keyed command was given without a username.
    #[error("Missing username after command")]
    MissingUsername,

    /// A post/reel/tv path tag was present but no shortcode followed it.
    #[error("Failed to obtain shortcode: {0}")]
    ShortcodeParse(String),

    /// A `/stories/` URL without a trailing numeric story id.
    #[error("Invalid story link: {0}")]
    InvalidStoryLink(String),

    /// No session cookies configured for an endpoint that requires them.
    /// Configuration problem, not user-correctable.
    #[error("Session cookies missing — cannot call authenticated endpoint")]
    CredentialsMissing,

    /// Upstream says the user does not exist.
    #[error("Instagram user \"{0}\" does not exist")]
    UserNotFound(String),

    /// Post deleted, private, or unsupported — upstream reports these
    /// uniformly by omitting the media node.
    #[error("Media not found — link may be invalid or the account private")]
    MediaNotFound,

    /// The user exists but has no active stories right now.
    #[error("No active stories found for @{0}")]
    NoActiveStories(String),

    /// The user exists but has no highlight reels.
    #[error("No highlights found for @{0}")]
    NoHighlights(String),

    /// The user exists but has no posts.
    #[error("No posts found for @{0}")]
    NoPosts(String),

    /// Upstream rejected our credentials (HTTP 401). Non-retryable;
    /// cookie rotation is likely needed.
    #[error("Upstream returned 401 Unauthorized: {0}")]
    Unauthorized(String),

    /// Size probe reported content larger than the configured cap.
    #[error("Payload too large: {size} bytes exceeds limit of {limit}")]
    PayloadTooLarge { size: u64, limit: u64 },

    /// Transfer error or mid-transfer cap overflow during materialization.
    #[error("Download failed: {0}")]
    DownloadFailed(String),

    /// Profile HTML contained neither usable meta tags nor JSON-LD.
    #[error("Could not parse profile data from HTML: {0}")]
    ProfileParse(String),

    /// An otherwise-successful upstream response was missing a field we
    /// require. Distinct from `MediaNotFound` — this is contract drift.
    #[error("Malformed upstream response: {0}")]
    MalformedUpstream(String),

    /// Every candidate in a multi-candidate fallback chain failed.
    #[error("All {attempted} methods failed, last error: {last}")]
    AllMethodsFailed {
        attempted: usize,
        #[source]
        last: Box<RelayError>,
    },

    /// HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// HTTP status code errors
    #[error("HTTP request failed with status: {0}")]
    HttpStatus(reqwest::StatusCode),

    /// URL parsing errors
    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),
}

/// Type alias for Result with RelayError
pub type RelayResult<T> = Result<T, RelayError>;

impl RelayError {
    /// HTTP status carried by this error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            RelayError::Http(e) => e.status().map(|s| s.as_u16()),
            RelayError::HttpStatus(s) => Some(s.as_u16()),
            RelayError::Unauthorized(_) => Some(401),
            _ => None,
        }
    }

    /// Whether the retry executor may re-attempt after this error.
    ///
    /// Classification failures, missing credentials and "nothing to
    /// return" outcomes are durable — retrying cannot change them.
    /// Transport errors are retryable unless the policy's non-retryable
    /// status set says otherwise (checked separately via `status_code`).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RelayError::Http(_)
                | RelayError::HttpStatus(_)
                | RelayError::MalformedUpstream(_)
                | RelayError::DownloadFailed(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code_from_http_status() {
        let err = RelayError::HttpStatus(reqwest::StatusCode::NOT_FOUND);
        assert_eq!(err.status_code(), Some(404));
    }

    #[test]
    fn test_unauthorized_maps_to_401() {
        let err = RelayError::Unauthorized("cookies invalid".into());
        assert_eq!(err.status_code(), Some(401));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_classification_errors_not_retryable() {
        assert!(!RelayError::MissingUsername.is_retryable());
        assert!(!RelayError::MediaNotFound.is_retryable());
        assert!(!RelayError::CredentialsMissing.is_retryable());
    }

    #[test]
    fn test_transport_errors_retryable() {
        assert!(RelayError::HttpStatus(reqwest::StatusCode::BAD_GATEWAY).is_retryable());
        assert!(RelayError::MalformedUpstream("missing field".into()).is_retryable());
    }

    #[test]
    fn test_all_methods_failed_preserves_last_error() {
        let err = RelayError::AllMethodsFailed {
            attempted: 3,
            last: Box::new(RelayError::MediaNotFound),
        };
        let msg = err.to_string();
        assert!(msg.contains("All 3 methods failed"));
        assert!(msg.contains("Media not found"));
    }
}
