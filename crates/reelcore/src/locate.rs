//! Input classification: raw text → typed resource reference.
//!
//! All pattern checks live here in one place; nothing else in the crate
//! sniffs raw input strings. Classification is pure — it never touches
//! the network. Share-link redirect resolution happens in the resolver
//! before this function is called.

use crate::core::error::RelayError;
use std::sync::LazyLock;

/// External platforms handled by the extraction-service adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Tiktok,
    Twitter,
    Facebook,
    Pinterest,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Tiktok => "tiktok",
            Platform::Twitter => "twitter",
            Platform::Facebook => "facebook",
            Platform::Pinterest => "pinterest",
        }
    }
}

/// Domain allow-list for external platforms. Checked against the host
/// part only — a path mentioning "tiktok" must not match.
const PLATFORM_DOMAINS: &[(&str, Platform)] = &[
    ("tiktok.com", Platform::Tiktok),
    ("twitter.com", Platform::Twitter),
    ("x.com", Platform::Twitter),
    ("facebook.com", Platform::Facebook),
    ("fb.watch", Platform::Facebook),
    ("pinterest.com", Platform::Pinterest),
    ("pin.it", Platform::Pinterest),
];

/// Typed reference to an upstream resource.
///
/// Exactly one variant per input; derived purely from the input string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceRef {
    PostOrReel { shortcode: String },
    Story { story_id: String },
    StoryOfUser { username: String },
    Highlights { username: String },
    RecentPosts { username: String, limit: usize },
    Profile { username: String },
    ProfilePicture { username: String },
    ExternalUrl { platform: Platform, url: String },
}

/// Default post count for `/posts <username>`.
const DEFAULT_POSTS_LIMIT: usize = 5;

/// Path tags that precede a shortcode in a post/reel/tv URL.
const POST_TAGS: &[&str] = &["p", "reel", "reels", "tv"];

static STORY_ID_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"/stories/[^/]+/(\d+)").unwrap()
});

static BARE_USERNAME_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"^@[A-Za-z0-9._]+$").unwrap()
});

/// Classify an input string into a `ResourceRef`.
///
/// Priority order: external-platform URL, story link, post/reel/tv link,
/// command token + username, bare `@username` (legacy story shorthand),
/// else `UnrecognizedInput`.
pub fn classify(input: &str) -> Result<ResourceRef, RelayError> {
    let input = input.trim();

    if let Some(platform) = match_external_platform(input) {
        return Ok(ResourceRef::ExternalUrl {
            platform,
            url: input.to_string(),
        });
    }

    if input.contains("/stories/") {
        return match STORY_ID_RE.captures(input).and_then(|c| c.get(1)) {
            Some(id) => Ok(ResourceRef::Story {
                story_id: id.as_str().to_string(),
            }),
            None => Err(RelayError::InvalidStoryLink(input.to_string())),
        };
    }

    if POST_TAGS.iter().any(|tag| input.contains(&format!("/{}/", tag))) {
        return extract_shortcode(input).map(|shortcode| ResourceRef::PostOrReel { shortcode });
    }

    if let Some(resource) = match_command(input)? {
        return Ok(resource);
    }

    // Legacy shorthand: a bare @username asks for that user's stories.
    if BARE_USERNAME_RE.is_match(input) {
        return Ok(ResourceRef::StoryOfUser {
            username: input.trim_start_matches('@').to_string(),
        });
    }

    Err(RelayError::UnrecognizedInput(input.to_string()))
}

/// Host-based allow-list match for external platform URLs.
fn match_external_platform(input: &str) -> Option<Platform> {
    let parsed = url::Url::parse(input).ok()?;
    let host = parsed.host_str()?.to_lowercase();
    PLATFORM_DOMAINS
        .iter()
        .find(|(domain, _)| host == *domain || host.ends_with(&format!(".{}", domain)))
        .map(|(_, platform)| *platform)
}

/// Extract the path segment immediately following a post tag.
fn extract_shortcode(input: &str) -> Result<String, RelayError> {
    let segments: Vec<&str> = input.split('/').collect();
    let tag_index = segments
        .iter()
        .position(|s| POST_TAGS.contains(s))
        .ok_or_else(|| RelayError::ShortcodeParse(input.to_string()))?;

    let shortcode = segments
        .get(tag_index + 1)
        .map(|s| s.split(['?', '#']).next().unwrap_or(""))
        .filter(|s| !s.is_empty())
        .ok_or_else(|| RelayError::ShortcodeParse(input.to_string()))?;

    Ok(shortcode.to_string())
}

/// Match a `<command> <username>` string.
fn match_command(input: &str) -> Result<Option<ResourceRef>, RelayError> {
    const COMMANDS: &[&str] = &["/story", "/highlights", "/posts", "/pfp", "/profile"];

    let Some(command) = COMMANDS.iter().find(|c| {
        input == **c || input.starts_with(&format!("{} ", c))
    }) else {
        return Ok(None);
    };

    let username = input[command.len()..].trim().trim_start_matches('@').to_string();
    if username.is_empty() {
        return Err(RelayError::MissingUsername);
    }

    let resource = match *command {
        "/story" => ResourceRef::StoryOfUser { username },
        "/highlights" => ResourceRef::Highlights { username },
        "/posts" => ResourceRef::RecentPosts {
            username,
            limit: DEFAULT_POSTS_LIMIT,
        },
        "/pfp" => ResourceRef::ProfilePicture { username },
        _ => ResourceRef::Profile { username },
    };
    Ok(Some(resource))
}
