//! Delivery dispatch: hand a `MediaResult` to a delivery channel.
//!
//! The channel itself (chat attachment upload, HTTP response) lives
//! outside the core behind the `DeliveryChannel` trait. This module owns
//! the policy around it: single items go out directly, multi-item
//! results are chunked into platform-sized groups, and transient items
//! are materialized through the buffered re-upload helper instead of
//! passing the raw tunnel URL through.

use crate::core::config;
use crate::core::error::RelayError;
use crate::media::{self, MediaItem, MediaResult};
use crate::transfer::Materializer;
use async_trait::async_trait;
use bytes::Bytes;

/// Media handed to a delivery channel: a URL the channel can fetch
/// itself, or pre-downloaded bytes for tunnel content.
#[derive(Debug, Clone)]
pub enum OutboundMedia {
    Link(MediaItem),
    Bytes { item: MediaItem, data: Bytes },
}

impl OutboundMedia {
    pub fn item(&self) -> &MediaItem {
        match self {
            OutboundMedia::Link(item) => item,
            OutboundMedia::Bytes { item, .. } => item,
        }
    }
}

/// A place media can be sent to.
#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    /// Send one item with a caption.
    async fn send_single(&self, media: &OutboundMedia, caption: &str) -> Result<(), RelayError>;

    /// Send a group of up to `config::delivery::MAX_GROUP_SIZE` items.
    async fn send_group(&self, media: &[OutboundMedia], caption: &str) -> Result<(), RelayError>;
}

/// Delivery policy wrapper around a channel.
pub struct Dispatcher {
    materializer: Materializer,
    max_group_size: usize,
    max_buffer_bytes: u64,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            materializer: Materializer::new(),
            max_group_size: config::delivery::MAX_GROUP_SIZE,
            max_buffer_bytes: config::transfer::MAX_BUFFER_BYTES,
        }
    }

    #[must_use]
    pub fn with_limits(mut self, max_group_size: usize, max_buffer_bytes: u64) -> Self {
        self.max_group_size = max_group_size;
        self.max_buffer_bytes = max_buffer_bytes;
        self
    }

    /// Deliver a result through the channel.
    ///
    /// Transient items are downloaded into memory first; everything else
    /// passes through as URLs. Groups are sent sequentially, caption on
    /// the first group only.
    pub async fn deliver(
        &self,
        channel: &dyn DeliveryChannel,
        result: &MediaResult,
    ) -> Result<(), RelayError> {
        let caption = format_caption(result);

        let mut outbound = Vec::with_capacity(result.items.len());
        for item in &result.items {
            if item.is_transient {
                let data = self
                    .materializer
                    .materialize(&item.url, self.max_buffer_bytes, None)
                    .await?;
                outbound.push(OutboundMedia::Bytes {
                    item: item.clone(),
                    data,
                });
            } else {
                outbound.push(OutboundMedia::Link(item.clone()));
            }
        }

        if outbound.len() == 1 {
            return channel.send_single(&outbound[0], &caption).await;
        }

        for (index, chunk) in outbound.chunks(self.max_group_size).enumerate() {
            let chunk_caption = if index == 0 { caption.as_str() } else { "" };
            channel.send_group(chunk, chunk_caption).await?;
        }
        Ok(())
    }
}

/// HTML-formatted delivery caption: author handle plus a bounded,
/// escaped caption preview. The untruncated caption stays available on
/// the `MediaResult` for callers that want full text.
pub fn format_caption(result: &MediaResult) -> String {
    let author = result
        .author_handle
        .as_deref()
        .map(|handle| format!("@{}", handle))
        .unwrap_or_else(|| "Unknown author".to_string());

    let caption = match result.caption.as_deref() {
        Some(text) if !text.is_empty() => media::caption_preview(text, 50),
        _ => "No caption".to_string(),
    };

    format!("👤 <b>Author</b>: {}\n📝 <b>Caption</b>: {}", author, caption)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Default)]
    struct FakeChannel {
        singles: Mutex<Vec<(String, String)>>,
        groups: Mutex<Vec<(usize, String)>>,
    }

    #[async_trait]
    impl DeliveryChannel for FakeChannel {
        async fn send_single(&self, media: &OutboundMedia, caption: &str) -> Result<(), RelayError> {
            self.singles
                .lock()
                .unwrap()
                .push((media.item().url.clone(), caption.to_string()));
            Ok(())
        }

        async fn send_group(&self, media: &[OutboundMedia], caption: &str) -> Result<(), RelayError> {
            self.groups.lock().unwrap().push((media.len(), caption.to_string()));
            Ok(())
        }
    }

    fn result_with_items(count: usize) -> MediaResult {
        let items = (0..count)
            .map(|i| MediaItem::image(format!("https://x/{}.jpg", i)))
            .collect();
        MediaResult::new(items, "test").with_author("someone", "Some One")
    }

    #[tokio::test]
    async fn test_single_item_sent_directly() {
        let channel = FakeChannel::default();
        let dispatcher = Dispatcher::new();

        dispatcher.deliver(&channel, &result_with_items(1)).await.unwrap();

        assert_eq!(channel.singles.lock().unwrap().len(), 1);
        assert!(channel.groups.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_multi_item_chunked_into_groups_of_ten() {
        let channel = FakeChannel::default();
        let dispatcher = Dispatcher::new();

        dispatcher.deliver(&channel, &result_with_items(23)).await.unwrap();

        let groups = channel.groups.lock().unwrap();
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].0, 10);
        assert_eq!(groups[1].0, 10);
        assert_eq!(groups[2].0, 3);
        // Caption on the first group only
        assert!(groups[0].1.contains("@someone"));
        assert!(groups[1].1.is_empty());
    }

    #[tokio::test]
    async fn test_transient_item_is_materialized() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(405))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![5u8; 64]))
            .mount(&server)
            .await;

        let mut item = MediaItem::video(format!("{}/v.mp4", server.uri()), "");
        item.thumbnail_url = None;
        item = item.transient();
        let result = MediaResult::new(vec![item], "cobalt");

        #[derive(Default)]
        struct ByteCheckChannel {
            got_bytes: Mutex<bool>,
        }

        #[async_trait]
        impl DeliveryChannel for ByteCheckChannel {
            async fn send_single(&self, media: &OutboundMedia, _caption: &str) -> Result<(), RelayError> {
                if let OutboundMedia::Bytes { data, .. } = media {
                    assert_eq!(data.len(), 64);
                    *self.got_bytes.lock().unwrap() = true;
                }
                Ok(())
            }
            async fn send_group(&self, _media: &[OutboundMedia], _caption: &str) -> Result<(), RelayError> {
                Ok(())
            }
        }

        let channel = ByteCheckChannel::default();
        Dispatcher::new().deliver(&channel, &result).await.unwrap();
        assert!(*channel.got_bytes.lock().unwrap());
    }

    #[test]
    fn test_format_caption_defaults() {
        let result = MediaResult::new(vec![MediaItem::image("https://x/a.jpg")], "test");
        let caption = format_caption(&result);
        assert!(caption.contains("Unknown author"));
        assert!(caption.contains("No caption"));
    }

    #[test]
    fn test_format_caption_escapes_and_truncates() {
        let result = MediaResult::new(vec![MediaItem::image("https://x/a.jpg")], "test")
            .with_author("someone", "Some One")
            .with_caption(format!("<b>{}", "y".repeat(100)));
        let caption = format_caption(&result);
        assert!(caption.contains("&lt;b&gt;"));
        assert!(caption.ends_with("..."));
    }
}
