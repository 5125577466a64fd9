//! Dashboard aggregates.
//!
//! Visit totals prefer the Cloudflare mirror: if any daily bucket overlaps
//! the window, the mirror's sums replace the local visit counts for that
//! window, including the sparkline. The decision is made per window, so a
//! current window can read the mirror while its comparison window falls back
//! to local rows.

use std::collections::HashMap;

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use codstore_core::Money;
use codstore_db::{DbError, StatsFilter};

use crate::api::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};
use crate::middleware::RequestId;

use super::{day_end_exclusive, day_start};

const DEFAULT_WINDOW_DAYS: i64 = 7;
const MAX_WINDOW_DAYS: i64 = 365;
const MAX_SPARKLINE_DAYS: i64 = 30;

#[derive(Debug, Deserialize, Default)]
pub struct StatsQuery {
    pub days: Option<i64>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    #[serde(default)]
    pub all: bool,
    #[serde(default)]
    pub include_seed: bool,
}

/// A resolved reporting window. `bounds` of `None` means all time, which
/// disables the previous-period comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StatsWindow {
    bounds: Option<(DateTime<Utc>, DateTime<Utc>)>,
    days: i64,
}

fn resolve_window(now: DateTime<Utc>, query: &StatsQuery) -> StatsWindow {
    if query.all {
        return StatsWindow {
            bounds: None,
            days: MAX_SPARKLINE_DAYS,
        };
    }

    if let (Some(start), Some(end)) = (query.start, query.end) {
        let (start, end) = if start <= end { (start, end) } else { (end, start) };
        return StatsWindow {
            bounds: Some((day_start(start), day_end_exclusive(end))),
            days: (end - start).num_days() + 1,
        };
    }

    let days = query
        .days
        .unwrap_or(DEFAULT_WINDOW_DAYS)
        .clamp(1, MAX_WINDOW_DAYS);
    let from = day_start(now.date_naive()) - Duration::days(days - 1);
    StatsWindow {
        bounds: Some((from, now)),
        days,
    }
}

/// Integer percentage change; a previous period of zero reports 100 when
/// anything happened at all, else 0.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn pct_change(current: i64, previous: i64) -> i64 {
    if previous > 0 {
        (((current - previous) as f64 / previous as f64) * 100.0).round() as i64
    } else if current > 0 {
        100
    } else {
        0
    }
}

/// Orders per hundred visits, one decimal place, 0 when there were no visits.
#[allow(clippy::cast_precision_loss)]
fn conversion_rate(orders: i64, visits: i64) -> f64 {
    if visits <= 0 {
        return 0.0;
    }
    ((orders as f64 / visits as f64) * 1000.0).round() / 10.0
}

/// Zero-filled series of `len` days ending at `end_day`, inclusive.
fn zero_filled(counts: &HashMap<NaiveDate, i64>, end_day: NaiveDate, len: i64) -> Vec<i64> {
    (0..len)
        .map(|offset| {
            let day = end_day - Duration::days(len - 1 - offset);
            counts.get(&day).copied().unwrap_or(0)
        })
        .collect()
}

/// Visit total for a window, preferring the mirror. The bool reports
/// which source was used so the sparkline can match.
async fn visit_total(
    pool: &PgPool,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
    include_seed: bool,
) -> Result<(i64, bool), DbError> {
    let use_mirror = codstore_db::has_daily_between(pool, from, to).await?;
    let total = if use_mirror {
        codstore_db::sum_daily_between(pool, from, to).await?
    } else {
        codstore_db::count_visits_between(pool, from, to, include_seed).await?
    };
    Ok((total, use_mirror))
}

#[derive(Debug, Serialize)]
pub struct VisitsBlock {
    pub total: i64,
    pub change: i64,
    pub source: &'static str,
    pub sparkline: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub struct OrdersBlock {
    pub total: i64,
    pub pending: i64,
    pub change: i64,
    pub sparkline: Vec<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueBlock {
    pub total_minor: i64,
    pub total: String,
    pub change: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowBlock {
    pub days: i64,
    pub all_time: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsData {
    pub visits: VisitsBlock,
    pub orders: OrdersBlock,
    pub revenue: RevenueBlock,
    pub customers: i64,
    pub conversion_rate: f64,
    pub window: WindowBlock,
}

/// `GET /api/admin/stats`
pub async fn get_stats(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<ApiResponse<StatsData>>, ApiError> {
    let now = Utc::now();
    let window = resolve_window(now, &query);
    let include_seed = query.include_seed;
    let (from, to) = window.bounds.map_or((None, None), |(f, t)| (Some(f), Some(t)));

    let (visits, use_mirror) = visit_total(&state.pool, from, to, include_seed)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let aggregates = codstore_db::order_aggregates(
        &state.pool,
        StatsFilter {
            from,
            to,
            include_seed,
        },
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let (visits_change, orders_change, revenue_change) = match window.bounds {
        None => (0, 0, 0),
        Some((from, to)) => {
            let span = to - from;
            let prev_from = from - span;

            let (prev_visits, _) =
                visit_total(&state.pool, Some(prev_from), Some(from), include_seed)
                    .await
                    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
            let prev = codstore_db::order_aggregates(
                &state.pool,
                StatsFilter {
                    from: Some(prev_from),
                    to: Some(from),
                    include_seed,
                },
            )
            .await
            .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

            (
                pct_change(visits, prev_visits),
                pct_change(aggregates.total, prev.total),
                pct_change(aggregates.revenue_minor, prev.revenue_minor),
            )
        }
    };

    // Sparkline: the trailing min(window, 30) calendar days of the window.
    let spark_len = window.days.min(MAX_SPARKLINE_DAYS).max(1);
    let end_day = window
        .bounds
        .map_or_else(|| now.date_naive(), |(_, to)| (to - Duration::seconds(1)).date_naive());
    let spark_from = day_start(end_day) - Duration::days(spark_len - 1);
    let spark_to = day_end_exclusive(end_day);

    let visit_days: HashMap<NaiveDate, i64> = if use_mirror {
        codstore_db::daily_counts_between(&state.pool, spark_from, spark_to)
            .await
            .map_err(|e| map_db_error(req_id.0.clone(), &e))?
            .into_iter()
            .map(|(day, count)| (day.date_naive(), count))
            .collect()
    } else {
        codstore_db::visits_per_day(&state.pool, spark_from, spark_to, include_seed)
            .await
            .map_err(|e| map_db_error(req_id.0.clone(), &e))?
            .into_iter()
            .map(|dc| (dc.day.date_naive(), dc.count))
            .collect()
    };

    let order_days: HashMap<NaiveDate, i64> =
        codstore_db::orders_per_day(&state.pool, spark_from, spark_to, include_seed)
            .await
            .map_err(|e| map_db_error(req_id.0.clone(), &e))?
            .into_iter()
            .map(|dc| (dc.day.date_naive(), dc.count))
            .collect();

    let revenue = Money::from_minor(aggregates.revenue_minor);

    Ok(Json(ApiResponse {
        data: StatsData {
            visits: VisitsBlock {
                total: visits,
                change: visits_change,
                source: if use_mirror { "mirror" } else { "local" },
                sparkline: zero_filled(&visit_days, end_day, spark_len),
            },
            orders: OrdersBlock {
                total: aggregates.total,
                pending: aggregates.pending,
                change: orders_change,
                sparkline: zero_filled(&order_days, end_day, spark_len),
            },
            revenue: RevenueBlock {
                total_minor: revenue.minor(),
                total: revenue.display(),
                change: revenue_change,
            },
            customers: aggregates.unique_customers,
            conversion_rate: conversion_rate(aggregates.total, visits),
            window: WindowBlock {
                days: window.days,
                all_time: window.bounds.is_none(),
            },
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noon() -> DateTime<Utc> {
        "2024-06-15T12:30:00Z".parse().expect("timestamp")
    }

    #[test]
    fn default_window_is_seven_days_ending_now() {
        let window = resolve_window(noon(), &StatsQuery::default());
        let (from, to) = window.bounds.expect("bounded");
        assert_eq!(window.days, 7);
        assert_eq!(from.to_rfc3339(), "2024-06-09T00:00:00+00:00");
        assert_eq!(to, noon());
    }

    #[test]
    fn explicit_range_is_inclusive_of_both_ends() {
        let query = StatsQuery {
            start: NaiveDate::from_ymd_opt(2024, 6, 1),
            end: NaiveDate::from_ymd_opt(2024, 6, 10),
            ..StatsQuery::default()
        };
        let window = resolve_window(noon(), &query);
        assert_eq!(window.days, 10);
        let (from, to) = window.bounds.expect("bounded");
        assert_eq!((to - from).num_days(), 10);
    }

    #[test]
    fn reversed_range_is_swapped() {
        let query = StatsQuery {
            start: NaiveDate::from_ymd_opt(2024, 6, 10),
            end: NaiveDate::from_ymd_opt(2024, 6, 1),
            ..StatsQuery::default()
        };
        let window = resolve_window(noon(), &query);
        assert_eq!(window.days, 10);
    }

    #[test]
    fn all_time_has_no_bounds() {
        let query = StatsQuery {
            all: true,
            days: Some(90),
            ..StatsQuery::default()
        };
        let window = resolve_window(noon(), &query);
        assert!(window.bounds.is_none());
    }

    #[test]
    fn pct_change_handles_zero_previous() {
        assert_eq!(pct_change(50, 0), 100);
        assert_eq!(pct_change(0, 0), 0);
        assert_eq!(pct_change(150, 100), 50);
        assert_eq!(pct_change(50, 100), -50);
        assert_eq!(pct_change(100, 300), -67);
    }

    #[test]
    fn conversion_rate_has_one_decimal_and_zero_guard() {
        assert!((conversion_rate(7, 300) - 2.3).abs() < f64::EPSILON);
        assert!((conversion_rate(1, 3) - 33.3).abs() < f64::EPSILON);
        assert!((conversion_rate(5, 0)).abs() < f64::EPSILON);
    }

    #[test]
    fn sparkline_is_zero_filled_and_ordered() {
        let end = NaiveDate::from_ymd_opt(2024, 6, 15).expect("date");
        let mut counts = HashMap::new();
        counts.insert(end, 4);
        counts.insert(end - Duration::days(2), 9);

        let series = zero_filled(&counts, end, 5);
        assert_eq!(series, vec![0, 0, 9, 0, 4]);
    }

    #[test]
    fn sparkline_length_caps_at_thirty_days() {
        let query = StatsQuery {
            days: Some(90),
            ..StatsQuery::default()
        };
        let window = resolve_window(noon(), &query);
        assert_eq!(window.days.min(MAX_SPARKLINE_DAYS), 30);
    }
}
