//! HTTP client for the Cloudflare GraphQL Analytics API.
//!
//! Wraps `reqwest` with bearer auth, a short timeout, and typed response
//! deserialization. GraphQL-level errors are surfaced as
//! [`CloudflareError::ApiError`].

use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Client;
use serde_json::json;

use crate::error::CloudflareError;
use crate::types::{BucketSource, GraphQlResponse, VisitBucket, Zone};

const DEFAULT_API_URL: &str = "https://api.cloudflare.com/client/v4/graphql";
const REQUEST_TIMEOUT_SECS: u64 = 10;

const DAILY_QUERY: &str = "\
query($zoneTag: String!, $start: Date!, $end: Date!) { \
  viewer { \
    zones(filter: { zoneTag: $zoneTag }) { \
      httpRequests1dGroups(limit: 10000, filter: { date_geq: $start, date_leq: $end }) { \
        dimensions { date } \
        sum { requests } \
      } \
    } \
  } \
}";

const MINUTE_QUERY: &str = "\
query($zoneTag: String!, $start: DateTime!, $end: DateTime!) { \
  viewer { \
    zones(filter: { zoneTag: $zoneTag }) { \
      httpRequests1mGroups(limit: 10000, filter: { datetime_geq: $start, datetime_leq: $end }) { \
        dimensions { datetimeMinute } \
        sum { requests } \
      } \
    } \
  } \
}";

/// Client for the Cloudflare Analytics GraphQL endpoint.
///
/// Use [`CloudflareClient::new`] for production or
/// [`CloudflareClient::with_api_url`] to point at a mock server in tests.
pub struct CloudflareClient {
    client: Client,
    api_token: String,
    zone_id: String,
    api_url: String,
}

impl CloudflareClient {
    /// Creates a client pointed at the production API.
    ///
    /// # Errors
    ///
    /// Returns [`CloudflareError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(api_token: &str, zone_id: &str) -> Result<Self, CloudflareError> {
        Self::with_api_url(api_token, zone_id, DEFAULT_API_URL)
    }

    /// Creates a client with a custom endpoint URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`CloudflareError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn with_api_url(
        api_token: &str,
        zone_id: &str,
        api_url: &str,
    ) -> Result<Self, CloudflareError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(5))
            .user_agent("codstore/0.1 (analytics-mirror)")
            .build()?;

        Ok(Self {
            client,
            api_token: api_token.to_owned(),
            zone_id: zone_id.to_owned(),
            api_url: api_url.to_owned(),
        })
    }

    #[must_use]
    pub fn zone_id(&self) -> &str {
        &self.zone_id
    }

    /// Fetches per-day request buckets for `[start, end]` (date precision).
    ///
    /// # Errors
    ///
    /// - [`CloudflareError::ApiError`] if the GraphQL response carries errors.
    /// - [`CloudflareError::Http`] on network failure or non-2xx status.
    /// - [`CloudflareError::Deserialize`] if the body has an unexpected shape.
    pub async fn fetch_daily_visits(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<VisitBucket>, CloudflareError> {
        let (start, end) = ordered(start, end);
        let variables = json!({
            "zoneTag": self.zone_id,
            "start": start.format("%Y-%m-%d").to_string(),
            "end": end.format("%Y-%m-%d").to_string(),
        });

        let zone = self.run_query(DAILY_QUERY, variables, "daily visits").await?;

        Ok(zone
            .daily_groups
            .into_iter()
            .filter_map(|group| {
                let date = NaiveDate::parse_from_str(&group.dimensions.date, "%Y-%m-%d").ok()?;
                let bucket_start = date.and_hms_opt(0, 0, 0)?.and_utc();
                Some(VisitBucket {
                    bucket_start,
                    bucket_label: group.dimensions.date,
                    count: group.sum.requests,
                    source: BucketSource::Daily,
                    zone_id: self.zone_id.clone(),
                })
            })
            .collect())
    }

    /// Fetches per-minute request buckets for `[start, end]`.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`CloudflareClient::fetch_daily_visits`].
    pub async fn fetch_minute_visits(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<VisitBucket>, CloudflareError> {
        let (start, end) = ordered(start, end);
        let variables = json!({
            "zoneTag": self.zone_id,
            "start": start.to_rfc3339(),
            "end": end.to_rfc3339(),
        });

        let zone = self
            .run_query(MINUTE_QUERY, variables, "minute visits")
            .await?;

        Ok(zone
            .minute_groups
            .into_iter()
            .filter_map(|group| {
                let bucket_start = group
                    .dimensions
                    .datetime_minute
                    .parse::<DateTime<Utc>>()
                    .ok()?;
                Some(VisitBucket {
                    bucket_start,
                    bucket_label: group.dimensions.datetime_minute,
                    count: group.sum.requests,
                    source: BucketSource::Minute,
                    zone_id: self.zone_id.clone(),
                })
            })
            .collect())
    }

    async fn run_query(
        &self,
        query: &str,
        variables: serde_json::Value,
        context: &str,
    ) -> Result<Zone, CloudflareError> {
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_token)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?
            .error_for_status()?;

        let body: serde_json::Value = response.json().await?;
        let envelope: GraphQlResponse =
            serde_json::from_value(body).map_err(|e| CloudflareError::Deserialize {
                context: context.to_string(),
                source: e,
            })?;

        if !envelope.errors.is_empty() {
            let message = envelope
                .errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join(" | ");
            return Err(CloudflareError::ApiError(message));
        }

        let data = envelope
            .data
            .ok_or_else(|| CloudflareError::ApiError("empty response data".to_string()))?;

        Ok(data.viewer.zones.into_iter().next().unwrap_or_default())
    }
}

fn ordered(a: DateTime<Utc>, b: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordered_swaps_reversed_ranges() {
        let early = "2026-08-01T00:00:00Z".parse::<DateTime<Utc>>().expect("ts");
        let late = "2026-08-20T00:00:00Z".parse::<DateTime<Utc>>().expect("ts");
        assert_eq!(ordered(late, early), (early, late));
        assert_eq!(ordered(early, late), (early, late));
    }
}
