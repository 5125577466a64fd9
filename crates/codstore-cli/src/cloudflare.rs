//! Cloudflare analytics import, sharing the server's upsert path.

use chrono::{NaiveDate, TimeZone, Utc};
use clap::Args;
use sqlx::PgPool;

use codstore_cloudflare::CloudflareClient;
use codstore_core::AppConfig;
use codstore_db::NewBucket;

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// First day to import (YYYY-MM-DD).
    #[arg(long)]
    pub start_date: NaiveDate,
    /// Last day to import (YYYY-MM-DD), inclusive.
    #[arg(long)]
    pub end_date: NaiveDate,
}

pub async fn run(pool: &PgPool, config: &AppConfig, args: &ImportArgs) -> anyhow::Result<()> {
    let (Some(token), Some(zone_id)) = (
        config.cloudflare_api_token.as_deref(),
        config.cloudflare_zone_id.as_deref(),
    ) else {
        anyhow::bail!("CLOUDFLARE_API_TOKEN and CLOUDFLARE_ZONE_ID must be set for imports");
    };

    let client = CloudflareClient::new(token, zone_id)?;

    let start = Utc.from_utc_datetime(
        &args
            .start_date
            .and_hms_opt(0, 0, 0)
            .unwrap_or_default(),
    );
    let end = Utc.from_utc_datetime(&args.end_date.and_hms_opt(0, 0, 0).unwrap_or_default());

    let buckets: Vec<NewBucket> = client
        .fetch_daily_visits(start, end)
        .await?
        .into_iter()
        .map(|b| NewBucket {
            bucket_start: b.bucket_start,
            bucket_label: b.bucket_label,
            count: b.count,
            source: b.source.as_str().to_owned(),
            zone_id: b.zone_id,
        })
        .collect();

    let imported = codstore_db::upsert_buckets(pool, &buckets).await?;
    tracing::info!(
        imported,
        start = %args.start_date,
        end = %args.end_date,
        "cloudflare daily buckets imported"
    );

    Ok(())
}
