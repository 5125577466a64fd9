//! Back-office endpoints, all behind the `X-Admin-Key` middleware.

pub(super) mod cloudflare;
pub(super) mod orders;
pub(super) mod products;
pub(super) mod stats;
pub(super) mod upload;
pub(super) mod visits;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use uuid::Uuid;

/// Accepts ids as a JSON array, a single string, or a JSON-encoded array
/// string (how some dashboard builds submit multi-selects). Unparseable
/// entries are dropped.
pub(super) fn coerce_ids(value: &serde_json::Value) -> Vec<Uuid> {
    match value {
        serde_json::Value::Array(items) => items
            .iter()
            .filter_map(|item| item.as_str())
            .filter_map(|s| Uuid::parse_str(s.trim()).ok())
            .collect(),
        serde_json::Value::String(s) => {
            if let Ok(nested) = serde_json::from_str::<serde_json::Value>(s) {
                if nested.is_array() {
                    return coerce_ids(&nested);
                }
            }
            Uuid::parse_str(s.trim()).into_iter().collect()
        }
        _ => Vec::new(),
    }
}

/// Start of the given calendar day, UTC.
pub(super) fn day_start(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap_or_default())
}

/// Exclusive end bound for a date range: start of the day after `date`.
pub(super) fn day_end_exclusive(date: NaiveDate) -> DateTime<Utc> {
    day_start(date) + chrono::Duration::days(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ID_A: &str = "4f5e9e1e-15ce-43bd-8f7f-2f804d777c9f";
    const ID_B: &str = "9a1c7c4e-3d9b-4f83-9a58-6a1df0dd3c21";

    #[test]
    fn coerce_ids_accepts_arrays() {
        let ids = coerce_ids(&json!([ID_A, ID_B, "not-a-uuid"]));
        assert_eq!(ids.len(), 2);
        assert_eq!(ids[0].to_string(), ID_A);
    }

    #[test]
    fn coerce_ids_accepts_single_string() {
        let ids = coerce_ids(&json!(ID_A));
        assert_eq!(ids.len(), 1);
    }

    #[test]
    fn coerce_ids_accepts_json_encoded_array_string() {
        let encoded = format!("[\"{ID_A}\", \"{ID_B}\"]");
        let ids = coerce_ids(&json!(encoded));
        assert_eq!(ids.len(), 2);
    }

    #[test]
    fn coerce_ids_rejects_other_shapes() {
        assert!(coerce_ids(&json!(42)).is_empty());
        assert!(coerce_ids(&json!({"ids": [ID_A]})).is_empty());
        assert!(coerce_ids(&json!("garbage")).is_empty());
    }

    #[test]
    fn day_bounds_cover_exactly_one_day() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 10).expect("date");
        let from = day_start(date);
        let to = day_end_exclusive(date);
        assert_eq!((to - from).num_days(), 1);
        assert_eq!(from.to_rfc3339(), "2024-05-10T00:00:00+00:00");
    }
}
