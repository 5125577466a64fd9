//! Best-effort outbound adapters for order side effects.
//!
//! Both adapters here are fired after the order response has already been
//! sent: failures are returned as values for the caller to log and discard,
//! never propagated into a request path.

mod error;
mod meta;
mod telegram;

pub use error::NotifyError;
pub use meta::{MetaCapi, PurchaseAck, PurchaseEvent};
pub use telegram::{OrderNotification, SendSummary, TelegramNotifier};
