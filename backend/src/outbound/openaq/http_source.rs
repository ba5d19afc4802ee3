//! Reqwest-backed OpenAQ pollutant feed adapter.
//!
//! This adapter owns transport details only: request construction, timeout
//! and HTTP error mapping, and JSON decoding into a domain observation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use tracing::debug;

use super::dto::LatestResponseDto;
use crate::domain::ports::{FeedObservation, PollutantFeed, PollutantFeedError};

const DEFAULT_USER_AGENT: &str = "aqi-backend-feed/0.1";

/// Pollutant feed adapter that queries the OpenAQ `latest` endpoint.
pub struct OpenAqHttpSource {
    client: Client,
    endpoint: Url,
    radius_m: u32,
}

impl OpenAqHttpSource {
    /// Build an adapter using a reqwest client with an explicit request timeout.
    /// ```rust,ignore
    /// let source = OpenAqHttpSource::new(endpoint, Duration::from_secs(5), 10_000)?;
    /// ```
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(endpoint: Url, timeout: Duration, radius_m: u32) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(DEFAULT_USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            endpoint,
            radius_m: radius_m.max(1),
        })
    }
}

#[async_trait]
impl PollutantFeed for OpenAqHttpSource {
    async fn latest(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<Option<FeedObservation>, PollutantFeedError> {
        let url = latest_url(&self.endpoint, latitude, longitude, self.radius_m)?;
        debug!(%url, "querying pollutant feed");
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }
        parse_observation(body.as_ref())
    }
}

fn latest_url(
    endpoint: &Url,
    latitude: f64,
    longitude: f64,
    radius_m: u32,
) -> Result<Url, PollutantFeedError> {
    let mut url = endpoint.clone();
    url.path_segments_mut()
        .map_err(|()| {
            PollutantFeedError::transport(format!("endpoint {endpoint} cannot carry a path"))
        })?
        .pop_if_empty()
        .extend(["v2", "latest"]);
    url.query_pairs_mut()
        .append_pair("coordinates", &format!("{latitude},{longitude}"))
        .append_pair("radius", &radius_m.to_string())
        .append_pair("limit", "1");
    Ok(url)
}

fn parse_observation(body: &[u8]) -> Result<Option<FeedObservation>, PollutantFeedError> {
    let decoded: LatestResponseDto = serde_json::from_slice(body).map_err(|error| {
        PollutantFeedError::decode(format!("invalid OpenAQ JSON payload: {error}"))
    })?;
    Ok(decoded.into_domain_observation())
}

fn map_transport_error(error: reqwest::Error) -> PollutantFeedError {
    if error.is_timeout() {
        PollutantFeedError::timeout(error.to_string())
    } else {
        PollutantFeedError::transport(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> PollutantFeedError {
    let preview = body_preview(body);
    match status {
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            PollutantFeedError::timeout(format!("status {}", status.as_u16()))
        }
        _ => PollutantFeedError::status(status.as_u16(), preview),
    }
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}
