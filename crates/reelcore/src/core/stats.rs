//! Usage statistics: in-memory counters with fire-and-forget persistence.
//!
//! The persistent side is an external key-value document behind the
//! `StatsStore` trait (GET/PUT contract). The cache updates synchronously
//! and dispatches the save without blocking the caller; save failures are
//! logged, never propagated.

use crate::core::config;
use crate::core::error::RelayError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Per-user slice of the stats document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UserStats {
    /// Most-recent download links, newest first, capped at
    /// `config::delivery::HISTORY_LIMIT`
    pub history: VecDeque<String>,
    pub total_downloads: u64,
}

/// The persisted stats document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StatsDocument {
    pub users: HashMap<String, UserStats>,
    pub total_downloads: u64,
}

/// Remote key-value persistence contract for the stats document.
#[async_trait]
pub trait StatsStore: Send + Sync {
    async fn load(&self) -> Result<StatsDocument, RelayError>;
    async fn save(&self, doc: &StatsDocument) -> Result<(), RelayError>;
}

/// In-memory store — test double and single-process default.
#[derive(Default)]
pub struct MemoryStatsStore {
    doc: Mutex<StatsDocument>,
}

impl MemoryStatsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> StatsDocument {
        self.doc.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl StatsStore for MemoryStatsStore {
    async fn load(&self) -> Result<StatsDocument, RelayError> {
        Ok(self.snapshot())
    }

    async fn save(&self, doc: &StatsDocument) -> Result<(), RelayError> {
        *self.doc.lock().unwrap_or_else(|e| e.into_inner()) = doc.clone();
        Ok(())
    }
}

/// Process-wide stats cache.
///
/// The in-memory counter is authoritative for the lifetime of the
/// process; the store is best-effort durability.
pub struct StatsCache {
    store: Arc<dyn StatsStore>,
    state: Mutex<StatsDocument>,
    total: AtomicU64,
}

impl StatsCache {
    /// Load the document from the store, defaulting to empty on failure.
    pub async fn load(store: Arc<dyn StatsStore>) -> Self {
        let doc = match store.load().await {
            Ok(doc) => doc,
            Err(e) => {
                log::warn!("Failed to load stats, starting empty: {}", e);
                StatsDocument::default()
            }
        };
        let total = AtomicU64::new(doc.total_downloads);
        Self {
            store,
            state: Mutex::new(doc),
            total,
        }
    }

    /// Record a completed download for a user.
    ///
    /// Updates the in-memory document synchronously, then dispatches the
    /// persistence call without awaiting it.
    pub fn record_download(&self, user_id: &str, link: &str) {
        let doc = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            let user = state.users.entry(user_id.to_string()).or_default();
            user.history.push_front(link.to_string());
            user.history.truncate(config::delivery::HISTORY_LIMIT);
            user.total_downloads += 1;
            state.total_downloads = self.total.fetch_add(1, Ordering::SeqCst) + 1;
            state.clone()
        };

        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            if let Err(e) = store.save(&doc).await {
                log::warn!("Failed to persist stats: {}", e);
            }
        });
    }

    /// Total downloads recorded process-wide.
    pub fn total_downloads(&self) -> u64 {
        self.total.load(Ordering::SeqCst)
    }

    /// Number of distinct users seen.
    pub fn user_count(&self) -> usize {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).users.len()
    }

    /// Clone of a user's stats, if any.
    pub fn user_stats(&self, user_id: &str) -> Option<UserStats> {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .users
            .get(user_id)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_record_updates_counters_and_history() {
        let store = Arc::new(MemoryStatsStore::new());
        let cache = StatsCache::load(store.clone()).await;

        cache.record_download("42", "https://www.instagram.com/reel/ABC/");
        cache.record_download("42", "https://www.instagram.com/p/DEF/");

        assert_eq!(cache.total_downloads(), 2);
        let user = cache.user_stats("42").unwrap();
        assert_eq!(user.total_downloads, 2);
        // Newest first
        assert_eq!(user.history[0], "https://www.instagram.com/p/DEF/");
    }

    #[tokio::test]
    async fn test_history_capped_at_limit() {
        let store = Arc::new(MemoryStatsStore::new());
        let cache = StatsCache::load(store).await;

        for i in 0..8 {
            cache.record_download("7", &format!("https://x/{}", i));
        }

        let user = cache.user_stats("7").unwrap();
        assert_eq!(user.history.len(), config::delivery::HISTORY_LIMIT);
        assert_eq!(user.history[0], "https://x/7");
        assert_eq!(user.total_downloads, 8);
    }

    #[tokio::test]
    async fn test_load_failure_defaults_to_empty() {
        struct FailingStore;

        #[async_trait]
        impl StatsStore for FailingStore {
            async fn load(&self) -> Result<StatsDocument, RelayError> {
                Err(RelayError::DownloadFailed("store offline".into()))
            }
            async fn save(&self, _doc: &StatsDocument) -> Result<(), RelayError> {
                Err(RelayError::DownloadFailed("store offline".into()))
            }
        }

        let cache = StatsCache::load(Arc::new(FailingStore)).await;
        assert_eq!(cache.total_downloads(), 0);
        // Save failures are swallowed — record still works
        cache.record_download("1", "https://x/a");
        assert_eq!(cache.total_downloads(), 1);
    }

    #[tokio::test]
    async fn test_persistence_round_trip() {
        let store = Arc::new(MemoryStatsStore::new());
        let cache = StatsCache::load(store.clone()).await;
        cache.record_download("9", "https://x/a");

        // The save is fire-and-forget — wait for it to land
        for _ in 0..100 {
            if store.snapshot().total_downloads == 1 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }

        let reloaded = StatsCache::load(store).await;
        assert_eq!(reloaded.total_downloads(), 1);
    }

    #[test]
    fn test_document_serde_layout() {
        let mut doc = StatsDocument::default();
        doc.users.insert(
            "12".into(),
            UserStats {
                history: VecDeque::from(["https://x/a".to_string()]),
                total_downloads: 1,
            },
        );
        doc.total_downloads = 1;

        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["total_downloads"], 1);
        assert_eq!(json["users"]["12"]["history"][0], "https://x/a");

        let back: StatsDocument = serde_json::from_value(json).unwrap();
        assert_eq!(back, doc);
    }
}
