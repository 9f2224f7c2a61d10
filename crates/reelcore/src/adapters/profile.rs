//! HTML profile fallback — scrapes the public profile page.
//!
//! Used only after the API profile adapter fails (API-first; this order
//! matches the majority behavior of the upstream surfaces). Works
//! unauthenticated: parses Open Graph meta tags, with a JSON-LD script
//! block as the secondary path. Fails with `ProfileParse` when neither
//! yields a usable picture URL.

use crate::adapters::metadata_client;
use crate::core::error::RelayError;
use crate::identity::{CredentialPool, UaClass};
use crate::media::{MediaItem, MediaResult};
use std::sync::Arc;
use std::sync::LazyLock;

static OG_DESCRIPTION_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(
        r#"(?i)<meta\s+property="og:description"\s+content="([^"]+)"|<meta\s+content="([^"]+)"\s+property="og:description""#,
    )
    .unwrap()
});

static OG_TITLE_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(
        r#"(?i)<meta\s+property="og:title"\s+content="([^"]+)"|<meta\s+content="([^"]+)"\s+property="og:title""#,
    )
    .unwrap()
});

static OG_IMAGE_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(
        r#"(?i)<meta\s+property="og:image"\s+content="([^"]+)"|<meta\s+content="([^"]+)"\s+property="og:image""#,
    )
    .unwrap()
});

static FOLLOWERS_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"(?i)([\d,.]+[KMB]?)\s*Followers").unwrap()
});

static FOLLOWING_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"(?i)([\d,.]+[KMB]?)\s*Following").unwrap()
});

static POSTS_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"(?i)([\d,.]+[KMB]?)\s*Posts").unwrap()
});

static TITLE_NAME_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"^(.+?)\s*\(@?(\w+)\)").unwrap()
});

static JSON_LD_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r#"(?i)<script\s+type="application/ld\+json"[^>]*>([^<]+)</script>"#).unwrap()
});

/// Profile fields recovered from the public page.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapedProfile {
    pub username: String,
    pub full_name: String,
    pub biography: String,
    pub picture_url: String,
    pub is_private: bool,
    pub is_verified: bool,
    pub followers: u64,
    pub following: u64,
    pub posts_count: u64,
}

impl ScrapedProfile {
    /// Reduce to the uniform media contract.
    pub fn to_media_result(&self, picture_only: bool) -> MediaResult {
        let caption = if picture_only {
            format!("Profile picture of @{}", self.username)
        } else {
            format!(
                "{} (@{})\n{}\n\n{} posts · {} followers · {} following",
                self.full_name, self.username, self.biography, self.posts_count, self.followers, self.following
            )
        };
        MediaResult::new(vec![MediaItem::image(&self.picture_url)], "instagram-html")
            .with_author(&self.username, &self.full_name)
            .with_caption(caption)
    }
}

/// Fallback adapter fetching and parsing the public profile page.
pub struct HtmlProfileAdapter {
    client: reqwest::Client,
    pool: Arc<CredentialPool>,
    base_url: String,
}

impl HtmlProfileAdapter {
    pub fn new(pool: Arc<CredentialPool>) -> Self {
        Self {
            client: metadata_client(),
            pool,
            base_url: "https://www.instagram.com".to_string(),
        }
    }

    /// Point the adapter at a different host (tests).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Fetch and parse the profile page for `username`.
    pub async fn fetch_profile(&self, username: &str) -> Result<ScrapedProfile, RelayError> {
        let response = self
            .client
            .get(format!("{}/{}/", self.base_url, username))
            .header(reqwest::header::USER_AGENT, self.pool.pick_user_agent(UaClass::Browser))
            .header(
                reqwest::header::ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            )
            .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.5")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RelayError::HttpStatus(status));
        }

        let html = response.text().await?;
        parse_profile_html(&html, username)
    }
}

/// Parse profile data out of the page HTML.
///
/// Pattern 1: Open Graph meta tags — the reliable path for public
/// profiles. Pattern 2: a JSON-LD script block. Either way a picture URL
/// is mandatory.
pub fn parse_profile_html(html: &str, username: &str) -> Result<ScrapedProfile, RelayError> {
    if let Some(profile) = parse_from_meta_tags(html, username) {
        return Ok(profile);
    }
    if let Some(profile) = parse_from_json_ld(html, username) {
        return Ok(profile);
    }
    Err(RelayError::ProfileParse(username.to_string()))
}

fn first_capture(re: &regex::Regex, html: &str) -> Option<String> {
    re.captures(html).and_then(|caps| {
        caps.get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str().to_string())
    })
}

fn parse_from_meta_tags(html: &str, username: &str) -> Option<ScrapedProfile> {
    let description = first_capture(&OG_DESCRIPTION_RE, html)?;
    let title = first_capture(&OG_TITLE_RE, html)?;
    let image = first_capture(&OG_IMAGE_RE, html)?;

    let followers = first_capture(&FOLLOWERS_RE, &description).map(|s| parse_count(&s)).unwrap_or(0);
    let following = first_capture(&FOLLOWING_RE, &description).map(|s| parse_count(&s)).unwrap_or(0);
    let posts_count = first_capture(&POSTS_RE, &description).map(|s| parse_count(&s)).unwrap_or(0);

    // Title shape: "Full Name (@username)"
    let (full_name, parsed_username) = TITLE_NAME_RE
        .captures(&title)
        .map(|caps| (caps[1].trim().to_string(), caps[2].to_string()))
        .unwrap_or_else(|| (username.to_string(), username.to_string()));

    // Biography is the description minus the counters prefix
    let biography = description
        .split(" - See Instagram")
        .next()
        .unwrap_or("")
        .splitn(2, "Posts - ")
        .nth(1)
        .unwrap_or("")
        .trim()
        .to_string();

    Some(ScrapedProfile {
        username: parsed_username,
        full_name,
        biography,
        picture_url: image,
        is_private: description.to_lowercase().contains("private"),
        is_verified: title.contains('✓') || html.contains(r#"is_verified":true"#),
        followers,
        following,
        posts_count,
    })
}

fn parse_from_json_ld(html: &str, username: &str) -> Option<ScrapedProfile> {
    let raw = JSON_LD_RE.captures(html)?.get(1)?.as_str();
    let ld: serde_json::Value = serde_json::from_str(raw).ok()?;

    let name = ld.get("name").and_then(|v| v.as_str());
    let alternate = ld.get("alternateName").and_then(|v| v.as_str());
    if name.is_none() && alternate.is_none() {
        return None;
    }

    let picture_url = ld.get("image").and_then(|v| v.as_str())?.to_string();

    let followers = ld
        .pointer("/mainEntityofPage/interactionStatistic")
        .and_then(|v| v.as_array())
        .and_then(|stats| {
            stats.iter().find(|s| {
                s.get("interactionType")
                    .and_then(|t| t.as_str())
                    .is_some_and(|t| t.contains("Follow"))
            })
        })
        .and_then(|s| s.get("userInteractionCount"))
        .and_then(|v| v.as_u64())
        .unwrap_or(0);

    Some(ScrapedProfile {
        username: alternate
            .map(|a| a.trim_start_matches('@').to_string())
            .unwrap_or_else(|| username.to_string()),
        full_name: name.unwrap_or(username).to_string(),
        biography: ld.get("description").and_then(|v| v.as_str()).unwrap_or("").to_string(),
        picture_url,
        is_private: false,
        is_verified: false,
        followers,
        following: 0,
        posts_count: 0,
    })
}

/// Parse a count with an optional `K`/`M`/`B` suffix ("1.5M" → 1500000).
pub fn parse_count(raw: &str) -> u64 {
    let cleaned = raw.replace(',', "");
    let (digits, multiplier) = if let Some(stripped) = cleaned.strip_suffix(['K', 'k']) {
        (stripped, 1_000.0)
    } else if let Some(stripped) = cleaned.strip_suffix(['M', 'm']) {
        (stripped, 1_000_000.0)
    } else if let Some(stripped) = cleaned.strip_suffix(['B', 'b']) {
        (stripped, 1_000_000_000.0)
    } else {
        (cleaned.as_str(), 1.0)
    };
    digits
        .parse::<f64>()
        .map(|n| (n * multiplier).round() as u64)
        .unwrap_or(0)
}
