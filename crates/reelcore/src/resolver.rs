//! Fallback orchestrator — the top-level entry point of the pipeline.
//!
//! `resolve` classifies the input, builds an ordered candidate list of
//! fetch strategies for the resource kind, and runs them until one
//! yields a non-empty `MediaResult`. Adding, removing or reordering
//! upstream methods is a data change here, not a control-flow change.

use crate::adapters::cobalt::CobaltAdapter;
use crate::adapters::graphql::GraphqlPostAdapter;
use crate::adapters::mobile::MobileApiAdapter;
use crate::adapters::profile::HtmlProfileAdapter;
use crate::core::error::RelayError;
use crate::core::monitor::{FailureKind, FailureMonitor, FailureReport};
use crate::identity::{CredentialPool, UaClass};
use crate::locate::{self, ResourceRef};
use crate::media::MediaResult;
use crate::normalize;
use async_trait::async_trait;
use std::sync::Arc;

/// One candidate way of producing a `MediaResult`.
///
/// A strategy owns its request parameters; the orchestrator only decides
/// order and when to stop.
#[async_trait]
pub trait FetchStrategy: Send + Sync {
    fn name(&self) -> &str;
    async fn fetch(&self) -> Result<MediaResult, RelayError>;
}

/// Run candidates in order until one returns a non-empty result.
///
/// An `Ok` with zero items counts as a `MediaNotFound` failure. On
/// success later candidates are never invoked. A single-candidate path
/// propagates its error verbatim; with several candidates the last error
/// is wrapped in `AllMethodsFailed` and reported to the monitor.
pub async fn try_candidates(
    candidates: &[Arc<dyn FetchStrategy>],
    monitor: &dyn FailureMonitor,
) -> Result<MediaResult, RelayError> {
    let mut last_error = RelayError::MediaNotFound;

    for candidate in candidates {
        match candidate.fetch().await {
            Ok(result) if !result.items.is_empty() => return Ok(result),
            Ok(_) => {
                log::warn!("Candidate {} returned an empty result", candidate.name());
                last_error = RelayError::MediaNotFound;
            }
            Err(e) => {
                log::warn!("Candidate {} failed: {}", candidate.name(), e);
                last_error = e;
            }
        }
    }

    if candidates.len() > 1 {
        let err = RelayError::AllMethodsFailed {
            attempted: candidates.len(),
            last: Box::new(last_error),
        };
        monitor.report(FailureReport {
            kind: FailureKind::AllMethodsFailed,
            message: err.to_string(),
            attempts: candidates.len() as u32,
        });
        Err(err)
    } else {
        Err(last_error)
    }
}

/// The resolution pipeline with all its adapters wired in.
///
/// Construct once and share; every `resolve` call is an independent
/// task with no cross-request locking.
pub struct Resolver {
    pool: Arc<CredentialPool>,
    monitor: Arc<dyn FailureMonitor>,
    graphql: Arc<GraphqlPostAdapter>,
    mobile: Arc<MobileApiAdapter>,
    html_profile: Arc<HtmlProfileAdapter>,
    cobalt: Arc<CobaltAdapter>,
    redirect_client: reqwest::Client,
}

impl Resolver {
    /// Production wiring: adapters against the real upstream hosts,
    /// extraction instances from the environment.
    pub fn new(pool: Arc<CredentialPool>, monitor: Arc<dyn FailureMonitor>) -> Self {
        let graphql = Arc::new(GraphqlPostAdapter::new(pool.clone(), monitor.clone()));
        let mobile = Arc::new(MobileApiAdapter::new(pool.clone(), monitor.clone()));
        let html_profile = Arc::new(HtmlProfileAdapter::new(pool.clone()));
        let cobalt = Arc::new(CobaltAdapter::from_env());
        Self::with_components(pool, monitor, graphql, mobile, html_profile, cobalt)
    }

    /// Explicit wiring — used by tests to point adapters at mock hosts.
    pub fn with_components(
        pool: Arc<CredentialPool>,
        monitor: Arc<dyn FailureMonitor>,
        graphql: Arc<GraphqlPostAdapter>,
        mobile: Arc<MobileApiAdapter>,
        html_profile: Arc<HtmlProfileAdapter>,
        cobalt: Arc<CobaltAdapter>,
    ) -> Self {
        let redirect_client = crate::adapters::metadata_client();
        Self {
            pool,
            monitor,
            graphql,
            mobile,
            html_profile,
            cobalt,
            redirect_client,
        }
    }

    /// Resolve raw input to a normalized media result.
    pub async fn resolve(&self, input: &str) -> Result<MediaResult, RelayError> {
        let input = self.resolve_share_redirect(input.trim()).await;
        let resource = locate::classify(&input)?;
        let candidates = self.candidates_for(&resource);

        let result = try_candidates(&candidates, self.monitor.as_ref()).await;
        if let Err(RelayError::MalformedUpstream(ref message)) = result {
            self.monitor.report(FailureReport {
                kind: FailureKind::MalformedResponse,
                message: message.clone(),
                attempts: 1,
            });
        }
        result
    }

    /// Ordered candidate list per resource kind.
    fn candidates_for(&self, resource: &ResourceRef) -> Vec<Arc<dyn FetchStrategy>> {
        match resource {
            ResourceRef::PostOrReel { shortcode } => vec![Arc::new(PostStrategy {
                adapter: self.graphql.clone(),
                shortcode: shortcode.clone(),
            }) as Arc<dyn FetchStrategy>],
            ResourceRef::Story { story_id } => vec![Arc::new(StoryStrategy {
                adapter: self.mobile.clone(),
                story_id: story_id.clone(),
            }) as Arc<dyn FetchStrategy>],
            ResourceRef::StoryOfUser { username } => vec![Arc::new(UserStoriesStrategy {
                adapter: self.mobile.clone(),
                username: username.clone(),
            }) as Arc<dyn FetchStrategy>],
            ResourceRef::Highlights { username } => vec![Arc::new(HighlightsStrategy {
                adapter: self.mobile.clone(),
                username: username.clone(),
            }) as Arc<dyn FetchStrategy>],
            ResourceRef::RecentPosts { username, limit } => vec![Arc::new(RecentPostsStrategy {
                adapter: self.mobile.clone(),
                username: username.clone(),
                limit: *limit,
            }) as Arc<dyn FetchStrategy>],
            ResourceRef::Profile { username } => self.profile_candidates(username, false),
            ResourceRef::ProfilePicture { username } => self.profile_candidates(username, true),
            ResourceRef::ExternalUrl { url, .. } => vec![Arc::new(ExtractionStrategy {
                adapter: self.cobalt.clone(),
                url: url.clone(),
            }) as Arc<dyn FetchStrategy>],
        }
    }

    /// Profile lookups are API-first with the HTML scrape as fallback.
    fn profile_candidates(&self, username: &str, picture_only: bool) -> Vec<Arc<dyn FetchStrategy>> {
        vec![
            Arc::new(ApiProfileStrategy {
                adapter: self.mobile.clone(),
                username: username.to_string(),
                picture_only,
            }) as Arc<dyn FetchStrategy>,
            Arc::new(HtmlProfileStrategy {
                adapter: self.html_profile.clone(),
                username: username.to_string(),
                picture_only,
            }) as Arc<dyn FetchStrategy>,
        ]
    }

    /// Share links redirect to the canonical URL; follow the redirect
    /// with credentials attached before classification. Failure is
    /// non-fatal — the original input is used unchanged.
    async fn resolve_share_redirect(&self, input: &str) -> String {
        if !input.starts_with("http") || !input.contains("share") {
            return input.to_string();
        }

        let mut request = self
            .redirect_client
            .get(input)
            .header(reqwest::header::USER_AGENT, self.pool.pick_user_agent(UaClass::Browser));
        if let Some(cookie) = self.pool.pick_cookie() {
            request = request.header(reqwest::header::COOKIE, cookie.to_string());
        }

        match request.send().await {
            Ok(response) => response.url().to_string(),
            Err(e) => {
                log::warn!("Share redirect resolution failed, using original URL: {}", e);
                input.to_string()
            }
        }
    }
}

struct PostStrategy {
    adapter: Arc<GraphqlPostAdapter>,
    shortcode: String,
}

#[async_trait]
impl FetchStrategy for PostStrategy {
    fn name(&self) -> &str {
        "instagram-graphql"
    }

    async fn fetch(&self) -> Result<MediaResult, RelayError> {
        let node = self.adapter.fetch_post(&self.shortcode).await?;
        normalize::post(&node)
    }
}

struct StoryStrategy {
    adapter: Arc<MobileApiAdapter>,
    story_id: String,
}

#[async_trait]
impl FetchStrategy for StoryStrategy {
    fn name(&self) -> &str {
        "instagram-story"
    }

    async fn fetch(&self) -> Result<MediaResult, RelayError> {
        let payload = self.adapter.fetch_story(&self.story_id).await?;
        normalize::story(&payload)
    }
}

struct UserStoriesStrategy {
    adapter: Arc<MobileApiAdapter>,
    username: String,
}

#[async_trait]
impl FetchStrategy for UserStoriesStrategy {
    fn name(&self) -> &str {
        "instagram-user-stories"
    }

    async fn fetch(&self) -> Result<MediaResult, RelayError> {
        let reel = self.adapter.fetch_user_stories(&self.username).await?;
        normalize::user_stories(&reel, &self.username)
    }
}

struct HighlightsStrategy {
    adapter: Arc<MobileApiAdapter>,
    username: String,
}

#[async_trait]
impl FetchStrategy for HighlightsStrategy {
    fn name(&self) -> &str {
        "instagram-highlights"
    }

    async fn fetch(&self) -> Result<MediaResult, RelayError> {
        let reels = self.adapter.fetch_highlights(&self.username).await?;
        let result = normalize::highlight_reels(&reels, &self.username)?;
        if result.items.is_empty() {
            // Reels exist but every one of them is media-less/inaccessible
            return Err(RelayError::NoHighlights(self.username.clone()));
        }
        Ok(result)
    }
}

struct RecentPostsStrategy {
    adapter: Arc<MobileApiAdapter>,
    username: String,
    limit: usize,
}

#[async_trait]
impl FetchStrategy for RecentPostsStrategy {
    fn name(&self) -> &str {
        "instagram-recent-posts"
    }

    async fn fetch(&self) -> Result<MediaResult, RelayError> {
        let payload = self.adapter.fetch_recent_posts(&self.username).await?;
        normalize::recent_posts(&payload, &self.username, self.limit)
    }
}

struct ApiProfileStrategy {
    adapter: Arc<MobileApiAdapter>,
    username: String,
    picture_only: bool,
}

#[async_trait]
impl FetchStrategy for ApiProfileStrategy {
    fn name(&self) -> &str {
        "instagram-profile-api"
    }

    async fn fetch(&self) -> Result<MediaResult, RelayError> {
        let user = self.adapter.fetch_profile(&self.username).await?;
        normalize::profile(&user, self.picture_only)
    }
}

struct HtmlProfileStrategy {
    adapter: Arc<HtmlProfileAdapter>,
    username: String,
    picture_only: bool,
}

#[async_trait]
impl FetchStrategy for HtmlProfileStrategy {
    fn name(&self) -> &str {
        "instagram-profile-html"
    }

    async fn fetch(&self) -> Result<MediaResult, RelayError> {
        let profile = self.adapter.fetch_profile(&self.username).await?;
        Ok(profile.to_media_result(self.picture_only))
    }
}

struct ExtractionStrategy {
    adapter: Arc<CobaltAdapter>,
    url: String,
}

#[async_trait]
impl FetchStrategy for ExtractionStrategy {
    fn name(&self) -> &str {
        "extraction-service"
    }

    async fn fetch(&self) -> Result<MediaResult, RelayError> {
        self.adapter.fetch(&self.url).await
    }
}
