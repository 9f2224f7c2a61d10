//! Reelrelay core — multi-platform media-extraction relay.
//!
//! Takes a social-media post URL or username, derives a canonical
//! resource reference, calls the right upstream surface with rotating
//! credentials and bounded retries, and reduces whatever comes back into
//! one uniform media contract. Delivery surfaces (chat bot, web form)
//! live outside this crate and plug in through the `DeliveryChannel`,
//! `FailureMonitor` and `StatsStore` traits.
//!
//! # Module Structure
//!
//! - `core`: configuration, errors, retry, monitoring, stats, logging
//! - `identity`: rotating user-agent and session-cookie pool
//! - `locate`: input classification into typed resource references
//! - `adapters`: one adapter per upstream surface
//! - `normalize`: raw payloads → the uniform `MediaResult` contract
//! - `resolver`: the fallback orchestrator (top-level entry point)
//! - `transfer`: bounded in-memory materialization of tunnel URLs
//! - `deliver`: chunked dispatch into a delivery channel

pub mod adapters;
pub mod core;
pub mod deliver;
pub mod identity;
pub mod locate;
pub mod media;
pub mod normalize;
pub mod resolver;
pub mod transfer;

// Re-export commonly used types for convenience
pub use crate::core::{RelayError, RelayResult};
pub use identity::CredentialPool;
pub use locate::{classify, ResourceRef};
pub use media::{MediaItem, MediaKind, MediaResult};
pub use resolver::Resolver;
