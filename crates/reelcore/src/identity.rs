//! Rotating user-agent and session-cookie pool for upstream calls.
//!
//! Loaded once at startup and read-only afterwards — rotation is random
//! selection per request, never mutation. Multiple accounts' cookies are
//! configured as one `;;;`-separated string; a cookie is picked uniformly
//! per request with no affinity across requests.

use crate::core::config;

/// Mobile-app user agents, sent to the private mobile API endpoints.
const MOBILE_USER_AGENTS: &[&str] = &[
    "Instagram 219.0.0.12.117 Android (31/12; 320dpi; 720x1280; samsung; SM-G960F; starlte; samsungexynos9810; en_US; 340910260)",
    "Instagram 250.0.0.21.109 Android (30/11; 420dpi; 1080x2340; Xiaomi; Mi 10; umi; qcom; en_US; 400534612)",
    "Instagram 245.0.0.18.110 Android (29/10; 480dpi; 1080x2280; OnePlus; ONEPLUS A6013; OnePlus6T; qcom; en_US; 389773013)",
    "Instagram 236.0.0.20.109 Android (32/12; 440dpi; 1080x2400; Google; Pixel 6; oriole; google; en_US; 378629382)",
    "Instagram 275.0.0.16.92 (iPhone14,5; iOS 16_5; en_US; en; scale=3.00; 1170x2532; 444218278)",
    "Instagram 270.0.0.18.103 (iPhone13,2; iOS 15_6; en_US; en; scale=2.00; 1080x2340; 438414248)",
    "Instagram 268.0.0.18.75 (iPhone12,1; iOS 16_1; en_US; en; scale=2.00; 828x1792; 436380008)",
];

/// Browser user agents, sent to web endpoints (GraphQL, profile page).
const BROWSER_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:109.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:109.0) Gecko/20100101 Firefox/120.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15",
    "Mozilla/5.0 (Linux; Android 13; Pixel 7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Mobile Safari/537.36",
    "Mozilla/5.0 (Linux; Android 12; SM-G998B) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Mobile Safari/537.36",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_1 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 16_6 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.6 Mobile/15E148 Safari/604.1",
];

/// Client class a user agent is picked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UaClass {
    /// Instagram mobile-app UA — story/feed/highlights endpoints
    Mobile,
    /// Desktop/mobile browser UA — GraphQL and profile page
    Browser,
}

/// Read-only pool of session cookies and user-agent strings.
pub struct CredentialPool {
    cookies: Vec<String>,
}

impl CredentialPool {
    /// Build from the `INSTAGRAM_COOKIES` environment configuration.
    pub fn from_env() -> Self {
        Self::from_cookie_string(config::INSTAGRAM_COOKIES.as_str())
    }

    /// Build from an explicit `;;;`-separated cookie string.
    pub fn from_cookie_string(raw: &str) -> Self {
        let cookies = raw
            .split(";;;")
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
        Self { cookies }
    }

    /// Pool with no cookies — unauthenticated endpoints only.
    pub fn empty() -> Self {
        Self { cookies: Vec::new() }
    }

    /// Number of configured cookie accounts.
    pub fn cookie_count(&self) -> usize {
        self.cookies.len()
    }

    /// True when at least one session cookie is configured.
    pub fn has_cookies(&self) -> bool {
        !self.cookies.is_empty()
    }

    /// Pick a session cookie uniformly at random, if any are configured.
    ///
    /// Absence is not an error at this layer — callers that require
    /// authentication must check `has_cookies` and fail with
    /// `CredentialsMissing` before issuing the request.
    pub fn pick_cookie(&self) -> Option<&str> {
        match self.cookies.len() {
            0 => None,
            1 => Some(self.cookies[0].as_str()),
            n => Some(self.cookies[rand::random_range(0..n)].as_str()),
        }
    }

    /// Pick a user agent for the given client class.
    pub fn pick_user_agent(&self, class: UaClass) -> &'static str {
        let pool = match class {
            UaClass::Mobile => MOBILE_USER_AGENTS,
            UaClass::Browser => BROWSER_USER_AGENTS,
        };
        pool[rand::random_range(0..pool.len())]
    }

    /// Extract a CSRF token from any configured cookie's `csrftoken` field.
    pub fn csrf_from_cookies(&self) -> Option<String> {
        for cookie in &self.cookies {
            if let Some(token) = csrf_from_cookie_str(cookie) {
                return Some(token);
            }
        }
        None
    }
}

/// Parse `csrftoken=<value>` out of a cookie header string.
pub fn csrf_from_cookie_str(cookie: &str) -> Option<String> {
    cookie.split(';').find_map(|part| {
        let part = part.trim();
        part.strip_prefix("csrftoken=")
            .filter(|v| !v.is_empty())
            .map(|v| v.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_pool_split_and_trim() {
        let pool = CredentialPool::from_cookie_string("sessionid=a;;; sessionid=b ;;;");
        assert_eq!(pool.cookie_count(), 2);
        assert!(pool.has_cookies());
        let picked = pool.pick_cookie().unwrap();
        assert!(picked == "sessionid=a" || picked == "sessionid=b");
    }

    #[test]
    fn test_empty_pool_yields_no_cookie() {
        let pool = CredentialPool::from_cookie_string("");
        assert!(!pool.has_cookies());
        assert_eq!(pool.pick_cookie(), None);
    }

    #[test]
    fn test_single_cookie_always_picked() {
        let pool = CredentialPool::from_cookie_string("sessionid=only");
        for _ in 0..10 {
            assert_eq!(pool.pick_cookie(), Some("sessionid=only"));
        }
    }

    #[test]
    fn test_mobile_ua_pool_is_app_uas() {
        let pool = CredentialPool::empty();
        for _ in 0..20 {
            assert!(pool.pick_user_agent(UaClass::Mobile).starts_with("Instagram"));
        }
    }

    #[test]
    fn test_browser_ua_pool_is_mozilla() {
        let pool = CredentialPool::empty();
        for _ in 0..20 {
            assert!(pool.pick_user_agent(UaClass::Browser).starts_with("Mozilla/5.0"));
        }
    }

    #[test]
    fn test_csrf_extracted_from_cookie() {
        let pool = CredentialPool::from_cookie_string("sessionid=x; csrftoken=tok123; mid=y");
        assert_eq!(pool.csrf_from_cookies(), Some("tok123".to_string()));
    }

    #[test]
    fn test_csrf_absent() {
        let pool = CredentialPool::from_cookie_string("sessionid=x; mid=y");
        assert_eq!(pool.csrf_from_cookies(), None);
        assert_eq!(csrf_from_cookie_str("csrftoken="), None);
    }
}
