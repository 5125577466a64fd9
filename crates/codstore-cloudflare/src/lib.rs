//! Client for the Cloudflare GraphQL Analytics API.
//!
//! Pulls per-day and per-minute request buckets for a zone, which the server
//! mirrors into the `cloudflare_visits` table and prefers over locally
//! recorded visits.

mod client;
mod error;
mod types;

pub use client::CloudflareClient;
pub use error::CloudflareError;
pub use types::{BucketSource, VisitBucket};
