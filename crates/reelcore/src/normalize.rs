//! Response normalization: raw upstream payloads → `MediaResult`.
//!
//! Each function handles one payload family. A missing required field on
//! an otherwise-successful payload is `MalformedUpstream` — deliberately
//! distinct from `MediaNotFound`, which adapters raise when upstream
//! reports the content itself as absent.

use crate::core::error::RelayError;
use crate::media::{MediaItem, MediaResult};
use serde_json::Value;

/// Source label attached to every Instagram-derived result.
const INSTAGRAM_LABEL: &str = "instagram";

/// Normalize a GraphQL `xdt_shortcode_media` node (post or reel).
///
/// Sidecar/carousel payloads expand to one item per child, in order.
pub fn post(media: &Value) -> Result<MediaResult, RelayError> {
    let is_sidecar = media
        .get("__typename")
        .and_then(|v| v.as_str())
        .map(|t| t == "XDTGraphSidecar")
        .unwrap_or(false);

    let items = if is_sidecar {
        let edges = media
            .pointer("/edge_sidecar_to_children/edges")
            .and_then(|v| v.as_array())
            .ok_or_else(|| RelayError::MalformedUpstream("sidecar without children edges".into()))?;
        edges
            .iter()
            .map(|edge| {
                let node = edge
                    .get("node")
                    .ok_or_else(|| RelayError::MalformedUpstream("sidecar edge without node".into()))?;
                graphql_node_item(node)
            })
            .collect::<Result<Vec<_>, _>>()?
    } else {
        vec![graphql_node_item(media)?]
    };

    let caption = media
        .pointer("/edge_media_to_caption/edges/0/node/text")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();

    let mut result = MediaResult::new(items, INSTAGRAM_LABEL).with_caption(caption);
    if let Some(username) = media.pointer("/owner/username").and_then(|v| v.as_str()) {
        let full_name = media
            .pointer("/owner/full_name")
            .and_then(|v| v.as_str())
            .unwrap_or(username);
        result = result.with_author(username, full_name);
    }
    Ok(result)
}

/// One GraphQL media node → `MediaItem`.
fn graphql_node_item(node: &Value) -> Result<MediaItem, RelayError> {
    let is_video = node.get("is_video").and_then(|v| v.as_bool()).unwrap_or(false);
    let display_url = node.get("display_url").and_then(|v| v.as_str());

    let mut item = if is_video {
        let video_url = node
            .get("video_url")
            .and_then(|v| v.as_str())
            .ok_or_else(|| RelayError::MalformedUpstream("video node without video_url".into()))?;
        let thumbnail = display_url
            .ok_or_else(|| RelayError::MalformedUpstream("video node without display_url".into()))?;
        MediaItem::video(video_url, thumbnail)
    } else {
        let url = display_url
            .ok_or_else(|| RelayError::MalformedUpstream("image node without display_url".into()))?;
        MediaItem::image(url)
    };

    if let (Some(w), Some(h)) = (
        node.pointer("/dimensions/width").and_then(|v| v.as_u64()),
        node.pointer("/dimensions/height").and_then(|v| v.as_u64()),
    ) {
        item = item.with_dimensions(w as u32, h as u32);
    }
    Ok(item)
}

/// One mobile-API story/feed item (`media_type` 1 = image, 2 = video).
pub fn story_item(item: &Value) -> Result<MediaItem, RelayError> {
    let media_type = item.get("media_type").and_then(|v| v.as_u64()).unwrap_or(1);
    let candidate_url = item
        .pointer("/image_versions2/candidates/0/url")
        .and_then(|v| v.as_str());

    let mut out = if media_type == 2 {
        let video = item
            .pointer("/video_versions/0")
            .ok_or_else(|| RelayError::MalformedUpstream("video item without video_versions".into()))?;
        let url = video
            .get("url")
            .and_then(|v| v.as_str())
            .ok_or_else(|| RelayError::MalformedUpstream("video version without url".into()))?;
        let thumbnail = candidate_url
            .ok_or_else(|| RelayError::MalformedUpstream("video item without image candidates".into()))?;
        let mut built = MediaItem::video(url, thumbnail);
        if let (Some(w), Some(h)) = (
            video.get("width").and_then(|v| v.as_u64()),
            video.get("height").and_then(|v| v.as_u64()),
        ) {
            built = built.with_dimensions(w as u32, h as u32);
        }
        built
    } else {
        let candidate = item
            .pointer("/image_versions2/candidates/0")
            .ok_or_else(|| RelayError::MalformedUpstream("image item without candidates".into()))?;
        let url = candidate
            .get("url")
            .and_then(|v| v.as_str())
            .ok_or_else(|| RelayError::MalformedUpstream("image candidate without url".into()))?;
        let mut built = MediaItem::image(url);
        if let (Some(w), Some(h)) = (
            candidate.get("width").and_then(|v| v.as_u64()),
            candidate.get("height").and_then(|v| v.as_u64()),
        ) {
            built = built.with_dimensions(w as u32, h as u32);
        }
        built
    };

    out.is_transient = false;
    Ok(out)
}

/// Single-story info payload (`/media/<id>/info/`): first item only.
pub fn story(payload: &Value) -> Result<MediaResult, RelayError> {
    let item = payload
        .pointer("/items/0")
        .ok_or_else(|| RelayError::MalformedUpstream("story info without items".into()))?;

    let media = story_item(item)?;
    let caption = item
        .pointer("/caption/text")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();

    let mut result = MediaResult::new(vec![media], INSTAGRAM_LABEL).with_caption(caption);
    if let Some(username) = item.pointer("/user/username").and_then(|v| v.as_str()) {
        let full_name = item
            .pointer("/user/full_name")
            .and_then(|v| v.as_str())
            .unwrap_or(username);
        result = result.with_author(username, full_name);
    }
    Ok(result)
}

/// A user's active story reel (`reels_media` response for one user).
pub fn user_stories(reel: &Value, username: &str) -> Result<MediaResult, RelayError> {
    let items = reel
        .get("items")
        .and_then(|v| v.as_array())
        .ok_or_else(|| RelayError::MalformedUpstream("reel without items".into()))?;

    let media = items.iter().map(story_item).collect::<Result<Vec<_>, _>>()?;

    let handle = reel
        .pointer("/user/username")
        .and_then(|v| v.as_str())
        .unwrap_or(username);
    let full_name = reel
        .pointer("/user/full_name")
        .and_then(|v| v.as_str())
        .unwrap_or(handle);

    Ok(MediaResult::new(media, INSTAGRAM_LABEL)
        .with_author(handle, full_name)
        .with_caption(format!("Current Stories of {}", handle)))
}

/// All reels of a highlights batch (`reels` map keyed by reel id).
pub fn highlight_reels(reels: &Value, username: &str) -> Result<MediaResult, RelayError> {
    let map = reels
        .as_object()
        .ok_or_else(|| RelayError::MalformedUpstream("highlights reels is not an object".into()))?;

    let mut media = Vec::new();
    for reel in map.values() {
        if let Some(items) = reel.get("items").and_then(|v| v.as_array()) {
            for item in items {
                media.push(story_item(item)?);
            }
        }
    }

    Ok(MediaResult::new(media, INSTAGRAM_LABEL)
        .with_author(username, username)
        .with_caption(format!("Highlights from {}", username)))
}

/// Recent posts from the user feed, carousel children expanded in order.
pub fn recent_posts(payload: &Value, username: &str, limit: usize) -> Result<MediaResult, RelayError> {
    let items = payload
        .get("items")
        .and_then(|v| v.as_array())
        .ok_or_else(|| RelayError::MalformedUpstream("feed without items".into()))?;

    let mut media = Vec::new();
    for item in items.iter().take(limit) {
        if let Some(children) = item.get("carousel_media").and_then(|v| v.as_array()) {
            for child in children {
                media.push(story_item(child)?);
            }
        } else {
            media.push(story_item(item)?);
        }
    }

    Ok(MediaResult::new(media, INSTAGRAM_LABEL)
        .with_author(username, username)
        .with_caption(format!("Latest posts from {}", username)))
}

/// Profile info (`web_profile_info` user node) → one-image result with a
/// profile card caption. `picture_only` limits the caption for `/pfp`.
pub fn profile(user: &Value, picture_only: bool) -> Result<MediaResult, RelayError> {
    let username = user
        .get("username")
        .and_then(|v| v.as_str())
        .ok_or_else(|| RelayError::MalformedUpstream("profile without username".into()))?;
    let picture = user
        .get("profile_pic_url_hd")
        .or_else(|| user.get("profile_pic_url"))
        .and_then(|v| v.as_str())
        .ok_or_else(|| RelayError::MalformedUpstream("profile without picture url".into()))?;
    let full_name = user.get("full_name").and_then(|v| v.as_str()).unwrap_or(username);

    let caption = if picture_only {
        format!("Profile picture of @{}", username)
    } else {
        let biography = user.get("biography").and_then(|v| v.as_str()).unwrap_or("");
        let followers = user.pointer("/edge_followed_by/count").and_then(|v| v.as_u64()).unwrap_or(0);
        let following = user.pointer("/edge_follow/count").and_then(|v| v.as_u64()).unwrap_or(0);
        let posts = user
            .pointer("/edge_owner_to_timeline_media/count")
            .and_then(|v| v.as_u64())
            .unwrap_or(0);
        format!(
            "{} (@{})\n{}\n\n{} posts · {} followers · {} following",
            full_name, username, biography, posts, followers, following
        )
    };

    Ok(MediaResult::new(vec![MediaItem::image(picture)], INSTAGRAM_LABEL)
        .with_author(username, full_name)
        .with_caption(caption))
}

/// Extraction-service response → `MediaResult`.
///
/// `redirect`/`tunnel`/`stream` carry a single item; `tunnel` marks it
/// transient. `picker` carries several independently-typed items. An
/// `error` status never reaches this function — the adapter treats it as
/// an instance failure and moves on.
pub fn extraction(body: &Value, source_label: &str) -> Result<MediaResult, RelayError> {
    let status = body
        .get("status")
        .and_then(|v| v.as_str())
        .ok_or_else(|| RelayError::MalformedUpstream("extraction response without status".into()))?;

    match status {
        "redirect" | "tunnel" | "stream" => {
            let url = body
                .get("url")
                .and_then(|v| v.as_str())
                .ok_or_else(|| RelayError::MalformedUpstream("extraction response without url".into()))?;
            let filename = body.get("filename").and_then(|v| v.as_str());

            let mut item = if is_image_filename(filename.unwrap_or(url)) {
                MediaItem::image(url)
            } else {
                // No separate thumbnail from these services
                let mut video = MediaItem::video(url, url);
                video.thumbnail_url = None;
                video
            };
            if status == "tunnel" {
                item = item.transient();
            }
            if let Some(name) = filename {
                item = item.with_filename(name);
            }
            Ok(MediaResult::new(vec![item], source_label))
        }
        "picker" => {
            let picks = body
                .get("picker")
                .and_then(|v| v.as_array())
                .ok_or_else(|| RelayError::MalformedUpstream("picker response without picker array".into()))?;

            let items = picks
                .iter()
                .map(|pick| {
                    let url = pick
                        .get("url")
                        .and_then(|v| v.as_str())
                        .ok_or_else(|| RelayError::MalformedUpstream("picker entry without url".into()))?;
                    let kind = pick.get("type").and_then(|v| v.as_str()).unwrap_or("photo");
                    Ok(match kind {
                        "video" | "gif" => {
                            let mut item = MediaItem::video(url, url);
                            item.thumbnail_url =
                                pick.get("thumb").and_then(|v| v.as_str()).map(String::from);
                            item
                        }
                        _ => MediaItem::image(url),
                    })
                })
                .collect::<Result<Vec<_>, RelayError>>()?;

            Ok(MediaResult::new(items, source_label))
        }
        other => Err(RelayError::MalformedUpstream(format!(
            "unexpected extraction status: {}",
            other
        ))),
    }
}

fn is_image_filename(name: &str) -> bool {
    let lower = name.to_lowercase();
    ["jpg", "jpeg", "png", "webp", "heic"]
        .iter()
        .any(|ext| lower.ends_with(&format!(".{}", ext)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MediaKind;
    use serde_json::json;

    fn image_node(url: &str) -> Value {
        json!({
            "is_video": false,
            "display_url": url,
            "dimensions": {"width": 1080, "height": 1350}
        })
    }

    fn video_node(url: &str, thumb: &str) -> Value {
        json!({
            "is_video": true,
            "video_url": url,
            "display_url": thumb,
            "dimensions": {"width": 720, "height": 1280}
        })
    }

    #[test]
    fn test_single_image_post() {
        let media = json!({
            "__typename": "XDTGraphImage",
            "is_video": false,
            "display_url": "https://x/img.jpg",
            "edge_media_to_caption": {"edges": [{"node": {"text": "hello"}}]},
            "owner": {"username": "someone", "full_name": "Some One"}
        });
        let result = post(&media).unwrap();
        assert_eq!(result.items.len(), 1);
        assert_eq!(result.items[0].kind, MediaKind::Image);
        assert_eq!(result.items[0].url, "https://x/img.jpg");
        assert_eq!(result.caption.as_deref(), Some("hello"));
        assert_eq!(result.author_handle.as_deref(), Some("someone"));
    }

    #[test]
    fn test_sidecar_expands_in_order_with_video_thumbnails() {
        let media = json!({
            "__typename": "XDTGraphSidecar",
            "edge_media_to_caption": {"edges": []},
            "owner": {"username": "mixed", "full_name": "Mixed"},
            "edge_sidecar_to_children": {"edges": [
                {"node": image_node("https://x/1.jpg")},
                {"node": video_node("https://x/2.mp4", "https://x/2.jpg")},
                {"node": image_node("https://x/3.jpg")},
                {"node": video_node("https://x/4.mp4", "https://x/4.jpg")},
            ]}
        });
        let result = post(&media).unwrap();
        assert_eq!(result.items.len(), 4);
        assert_eq!(result.items[0].url, "https://x/1.jpg");
        assert_eq!(result.items[1].url, "https://x/2.mp4");
        assert_eq!(result.items[3].url, "https://x/4.mp4");
        for item in &result.items {
            match item.kind {
                MediaKind::Video => assert!(item.thumbnail_url.as_deref().is_some_and(|t| !t.is_empty())),
                MediaKind::Image => assert!(item.thumbnail_url.is_none()),
            }
        }
        assert_eq!(result.caption.as_deref(), Some(""));
    }

    #[test]
    fn test_video_without_url_is_malformed() {
        let media = json!({
            "is_video": true,
            "display_url": "https://x/t.jpg",
            "edge_media_to_caption": {"edges": []}
        });
        assert!(matches!(post(&media), Err(RelayError::MalformedUpstream(_))));
    }

    #[test]
    fn test_story_item_image() {
        let item = json!({
            "media_type": 1,
            "image_versions2": {"candidates": [{"url": "https://x/s.jpg", "width": 720, "height": 1280}]}
        });
        let media = story_item(&item).unwrap();
        assert_eq!(media.kind, MediaKind::Image);
        assert_eq!(media.width, Some(720));
    }

    #[test]
    fn test_story_item_video_takes_first_version() {
        let item = json!({
            "media_type": 2,
            "video_versions": [
                {"url": "https://x/hi.mp4", "width": 1080, "height": 1920},
                {"url": "https://x/lo.mp4", "width": 480, "height": 854}
            ],
            "image_versions2": {"candidates": [{"url": "https://x/thumb.jpg"}]}
        });
        let media = story_item(&item).unwrap();
        assert_eq!(media.url, "https://x/hi.mp4");
        assert_eq!(media.thumbnail_url.as_deref(), Some("https://x/thumb.jpg"));
        assert_eq!(media.height, Some(1920));
    }

    #[test]
    fn test_user_stories_result() {
        let reel = json!({
            "items": [
                {"media_type": 1, "image_versions2": {"candidates": [{"url": "https://x/a.jpg"}]}},
                {"media_type": 2, "video_versions": [{"url": "https://x/b.mp4"}],
                 "image_versions2": {"candidates": [{"url": "https://x/b.jpg"}]}}
            ],
            "user": {"username": "cristiano", "full_name": "Cristiano Ronaldo"}
        });
        let result = user_stories(&reel, "cristiano").unwrap();
        assert_eq!(result.items.len(), 2);
        assert_eq!(result.caption.as_deref(), Some("Current Stories of cristiano"));
        assert_eq!(result.author_display_name.as_deref(), Some("Cristiano Ronaldo"));
    }

    #[test]
    fn test_recent_posts_expands_carousels_and_honors_limit() {
        let payload = json!({
            "items": [
                {"carousel_media": [
                    {"media_type": 1, "image_versions2": {"candidates": [{"url": "https://x/c1.jpg"}]}},
                    {"media_type": 2, "video_versions": [{"url": "https://x/c2.mp4"}],
                     "image_versions2": {"candidates": [{"url": "https://x/c2.jpg"}]}}
                ]},
                {"media_type": 1, "image_versions2": {"candidates": [{"url": "https://x/p2.jpg"}]}},
                {"media_type": 1, "image_versions2": {"candidates": [{"url": "https://x/p3.jpg"}]}}
            ]
        });
        let result = recent_posts(&payload, "natgeo", 2).unwrap();
        // Two posts taken; the first expands to two carousel children
        assert_eq!(result.items.len(), 3);
        assert_eq!(result.items[0].url, "https://x/c1.jpg");
        assert_eq!(result.items[2].url, "https://x/p2.jpg");
    }

    #[test]
    fn test_profile_card_caption() {
        let user = json!({
            "username": "cristiano",
            "full_name": "Cristiano Ronaldo",
            "biography": "footballer",
            "profile_pic_url_hd": "https://x/pfp_hd.jpg",
            "profile_pic_url": "https://x/pfp.jpg",
            "edge_followed_by": {"count": 600000000},
            "edge_follow": {"count": 500},
            "edge_owner_to_timeline_media": {"count": 3500}
        });
        let result = profile(&user, false).unwrap();
        assert_eq!(result.items[0].url, "https://x/pfp_hd.jpg");
        let caption = result.caption.unwrap();
        assert!(caption.contains("footballer"));
        assert!(caption.contains("600000000 followers"));

        let pfp = profile(&user, true).unwrap();
        assert_eq!(pfp.caption.as_deref(), Some("Profile picture of @cristiano"));
    }

    #[test]
    fn test_extraction_tunnel_is_transient() {
        let body = json!({"status": "tunnel", "url": "https://cdn/v.mp4", "filename": "v.mp4"});
        let result = extraction(&body, "cobalt").unwrap();
        assert_eq!(result.items.len(), 1);
        assert!(result.items[0].is_transient);
        assert_eq!(result.items[0].kind, MediaKind::Video);
        assert_eq!(result.items[0].filename.as_deref(), Some("v.mp4"));
    }

    #[test]
    fn test_extraction_redirect_not_transient() {
        let body = json!({"status": "redirect", "url": "https://cdn/photo.jpg"});
        let result = extraction(&body, "cobalt").unwrap();
        assert!(!result.items[0].is_transient);
        assert_eq!(result.items[0].kind, MediaKind::Image);
    }

    #[test]
    fn test_extraction_picker_types_each_item() {
        let body = json!({"status": "picker", "picker": [
            {"type": "photo", "url": "https://cdn/a.jpg"},
            {"type": "video", "url": "https://cdn/b.mp4", "thumb": "https://cdn/b.jpg"}
        ]});
        let result = extraction(&body, "cobalt").unwrap();
        assert_eq!(result.items.len(), 2);
        assert_eq!(result.items[0].kind, MediaKind::Image);
        assert_eq!(result.items[1].kind, MediaKind::Video);
        assert_eq!(result.items[1].thumbnail_url.as_deref(), Some("https://cdn/b.jpg"));
    }

    #[test]
    fn test_extraction_unknown_status_is_malformed() {
        let body = json!({"status": "mystery"});
        assert!(matches!(
            extraction(&body, "cobalt"),
            Err(RelayError::MalformedUpstream(_))
        ));
    }
}
