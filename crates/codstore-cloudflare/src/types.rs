use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Granularity of an imported analytics bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketSource {
    Daily,
    Minute,
}

impl BucketSource {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            BucketSource::Daily => "daily",
            BucketSource::Minute => "minute",
        }
    }
}

/// One aggregate request bucket for the zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitBucket {
    pub bucket_start: DateTime<Utc>,
    /// The raw dimension label from the API (`2026-08-01` or an ISO minute).
    pub bucket_label: String,
    pub count: i64,
    pub source: BucketSource,
    pub zone_id: String,
}

// GraphQL envelope types. Only the fields the client reads are modeled.

#[derive(Debug, Deserialize)]
pub(crate) struct GraphQlResponse {
    pub data: Option<ResponseData>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GraphQlError {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResponseData {
    pub viewer: Viewer,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Viewer {
    #[serde(default)]
    pub zones: Vec<Zone>,
}

#[derive(Debug, Deserialize, Default)]
pub(crate) struct Zone {
    #[serde(rename = "httpRequests1dGroups", default)]
    pub daily_groups: Vec<DailyGroup>,
    #[serde(rename = "httpRequests1mGroups", default)]
    pub minute_groups: Vec<MinuteGroup>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DailyGroup {
    pub dimensions: DailyDimensions,
    pub sum: RequestSum,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DailyDimensions {
    pub date: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MinuteGroup {
    pub dimensions: MinuteDimensions,
    pub sum: RequestSum,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MinuteDimensions {
    #[serde(rename = "datetimeMinute")]
    pub datetime_minute: String,
}

#[derive(Debug, Deserialize, Default)]
pub(crate) struct RequestSum {
    #[serde(default)]
    pub requests: i64,
}
