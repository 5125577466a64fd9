//! Order lifecycle vocabulary.
//!
//! The set is advisory: any status may follow any other. The API validates
//! membership, not transitions.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid status '{0}', valid statuses: {valid}", valid = OrderStatus::ALL.join(", "))]
pub struct StatusError(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    New,
    Called,
    Pending,
    Processing,
    InDelivery,
    Shipped,
    Delivered,
    Rescheduled,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [&'static str; 9] = [
        "new",
        "called",
        "pending",
        "processing",
        "in_delivery",
        "shipped",
        "delivered",
        "rescheduled",
        "cancelled",
    ];

    /// Statuses counted as "pending" in the dashboard aggregates.
    pub const PENDING_SET: [OrderStatus; 3] =
        [OrderStatus::New, OrderStatus::Pending, OrderStatus::Called];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            OrderStatus::New => "new",
            OrderStatus::Called => "called",
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::InDelivery => "in_delivery",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Rescheduled => "rescheduled",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = StatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(OrderStatus::New),
            "called" => Ok(OrderStatus::Called),
            "pending" => Ok(OrderStatus::Pending),
            "processing" => Ok(OrderStatus::Processing),
            "in_delivery" => Ok(OrderStatus::InDelivery),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "rescheduled" => Ok(OrderStatus::Rescheduled),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(StatusError(other.to_string())),
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn round_trips_every_status() {
        for raw in OrderStatus::ALL {
            let status = OrderStatus::from_str(raw).expect("known status");
            assert_eq!(status.as_str(), raw);
        }
    }

    #[test]
    fn unknown_status_is_rejected() {
        let err = OrderStatus::from_str("shipped!").expect_err("should reject");
        assert_eq!(err, StatusError("shipped!".to_string()));
        let message = err.to_string();
        assert!(message.starts_with("invalid status 'shipped!'"));
        assert!(message.contains("in_delivery, shipped, delivered"));
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&OrderStatus::InDelivery).expect("serialize");
        assert_eq!(json, "\"in_delivery\"");
        let back: OrderStatus = serde_json::from_str("\"rescheduled\"").expect("deserialize");
        assert_eq!(back, OrderStatus::Rescheduled);
    }
}
