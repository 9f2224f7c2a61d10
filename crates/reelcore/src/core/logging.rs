//! Logging initialization and startup diagnostics.
//!
//! Call sites log through the `log` facade; this module wires it into a
//! `tracing-subscriber` formatter with env-filter support (`RUST_LOG`).

use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Initialize the tracing subscriber and the `log` bridge.
///
/// Safe to call once at startup; a second call returns an error from the
/// underlying subscriber registration.
pub fn init_logger() -> Result<()> {
    tracing_log::LogTracer::init().map_err(|e| anyhow::anyhow!("Failed to install log bridge: {}", e))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set subscriber: {}", e))?;

    Ok(())
}

/// Logs credential configuration at startup.
///
/// Story, highlights and posts endpoints need session cookies; warn the
/// operator early instead of failing on the first authenticated request.
pub fn log_credentials_configuration(cookie_count: usize) {
    if cookie_count == 0 {
        log::warn!("No Instagram cookies configured (INSTAGRAM_COOKIES empty)");
        log::warn!("Story, highlights and posts lookups will fail with CredentialsMissing");
    } else {
        log::info!("Instagram cookie pool configured: {} account(s)", cookie_count);
    }
}
