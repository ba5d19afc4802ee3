//! OpenAQ outbound adapters.
//!
//! This module provides a thin HTTP implementation of the `PollutantFeed`
//! port and the wiring that builds a feed from [`FeedSettings`].

mod dto;
mod http_source;

use std::sync::Arc;

use tracing::info;

use crate::domain::ports::{DisabledPollutantFeed, PollutantFeed};
use crate::settings::FeedSettings;

pub use http_source::OpenAqHttpSource;

/// Errors raised while building the feed client at startup.
#[derive(Debug, thiserror::Error)]
pub enum FeedInitError {
    #[error("invalid pollutant feed endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
    #[error("failed to build pollutant feed client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Build the feed described by `settings`; a disabled feed never dials out.
///
/// # Errors
///
/// Returns [`FeedInitError`] when the feed is enabled and its endpoint or
/// HTTP client is invalid.
pub fn pollutant_feed(settings: &FeedSettings) -> Result<Arc<dyn PollutantFeed>, FeedInitError> {
    if !settings.enabled() {
        info!("pollutant feed disabled; readings will be synthetic");
        return Ok(Arc::new(DisabledPollutantFeed));
    }
    let source = OpenAqHttpSource::new(settings.endpoint()?, settings.timeout(), settings.radius_m())?;
    Ok(Arc::new(source))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::PollutantFeedError;

    fn settings(enabled: bool, endpoint: &str) -> FeedSettings {
        FeedSettings {
            enabled: Some(enabled),
            endpoint: Some(endpoint.to_owned()),
            timeout_ms: Some(250),
            radius_m: None,
        }
    }

    #[tokio::test]
    async fn disabled_settings_build_the_disabled_feed() {
        let feed = pollutant_feed(&settings(false, "not a url")).expect("disabled feed builds");
        assert_eq!(
            feed.latest(13.08, 80.27).await,
            Err(PollutantFeedError::Disabled)
        );
    }

    #[test]
    fn enabled_settings_reject_bad_endpoints() {
        let error = pollutant_feed(&settings(true, "not a url"))
            .err()
            .expect("endpoint must parse");
        assert!(matches!(error, FeedInitError::Endpoint(_)));
    }
}
