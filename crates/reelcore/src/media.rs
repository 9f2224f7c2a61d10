//! The uniform media descriptor contract returned by every adapter.
//!
//! Whatever shape the upstream response has — single image, carousel,
//! story reel, extraction-service picker — it is reduced to a
//! `MediaResult` before leaving the core.

/// Kind of a single media item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

/// One downloadable media item.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaItem {
    pub kind: MediaKind,
    /// Direct media URL (highest available resolution)
    pub url: String,
    /// Display-image URL — set only for videos
    pub thumbnail_url: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Tunnel/expiring URL that must be materialized before being handed
    /// to a delivery channel that cannot fetch it live
    pub is_transient: bool,
    pub filename: Option<String>,
}

impl MediaItem {
    /// Plain image item with just a URL.
    pub fn image(url: impl Into<String>) -> Self {
        Self {
            kind: MediaKind::Image,
            url: url.into(),
            thumbnail_url: None,
            width: None,
            height: None,
            is_transient: false,
            filename: None,
        }
    }

    /// Video item with its display-image thumbnail.
    pub fn video(url: impl Into<String>, thumbnail_url: impl Into<String>) -> Self {
        Self {
            kind: MediaKind::Video,
            url: url.into(),
            thumbnail_url: Some(thumbnail_url.into()),
            width: None,
            height: None,
            is_transient: false,
            filename: None,
        }
    }

    #[must_use]
    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    #[must_use]
    pub fn transient(mut self) -> Self {
        self.is_transient = true;
        self
    }

    #[must_use]
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }
}

/// Normalized result of a resolution.
///
/// `items` is never empty on success — an empty list is a not-found
/// failure, not a valid result (the orchestrator enforces this).
#[derive(Debug, Clone, PartialEq)]
pub struct MediaResult {
    pub items: Vec<MediaItem>,
    pub author_handle: Option<String>,
    pub author_display_name: Option<String>,
    /// Full caption text — untruncated and unescaped. Display-side
    /// truncation/escaping is the caller's job via the helpers below.
    pub caption: Option<String>,
    pub source_label: String,
}

impl MediaResult {
    pub fn new(items: Vec<MediaItem>, source_label: impl Into<String>) -> Self {
        Self {
            items,
            author_handle: None,
            author_display_name: None,
            caption: None,
            source_label: source_label.into(),
        }
    }

    #[must_use]
    pub fn with_author(mut self, handle: impl Into<String>, display_name: impl Into<String>) -> Self {
        self.author_handle = Some(handle.into());
        self.author_display_name = Some(display_name.into());
        self
    }

    #[must_use]
    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }
}

/// Escape `<` and `>` for HTML-formatted chat display.
pub fn escape_html(text: &str) -> String {
    text.replace('<', "&lt;").replace('>', "&gt;")
}

/// Bounded single-line caption preview for delivery captions.
///
/// Flattens newlines, escapes HTML, truncates to `max_chars` characters
/// (not bytes) and appends an ellipsis when anything was cut.
pub fn caption_preview(caption: &str, max_chars: usize) -> String {
    let flat: String = caption
        .chars()
        .map(|c| if c == '\n' { ' ' } else { c })
        .take(max_chars)
        .collect();
    let truncated = caption.chars().count() > max_chars;
    let escaped = escape_html(&flat);
    if truncated {
        format!("{}...", escaped)
    } else {
        escaped
    }
}
