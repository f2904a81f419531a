//! HTTP event relay implementation.
//!
//! This module defines [`HttpRelay`], which formats producer events, keeps
//! them in a FIFO [`PendingQueue`](crate::PendingQueue), and posts the queue
//! head to a single HTTP endpoint from a dedicated worker thread.
//!
//! # Delivery Semantics
//!
//! - **Success** (any response the HTTP client does not treat as an error):
//!   the head is removed, the retry scheduler returns to idle, and the next
//!   queued payload, if any, is attempted straight away.
//! - **Failure** (4xx/5xx status, connection or timeout errors): the queue is
//!   left untouched and the retry scheduler is armed. While armed it re-attempts
//!   the head every [`RETRY_INTERVAL`], forever.
//! - **Credential failure**: the attempt is abandoned before any request is
//!   made. Neither the queue nor the retry state changes.
//!
//! Delivery is at least once: a payload whose response was lost is sent again.

mod config;
mod handler;
mod retry;
mod transport;
mod worker;

#[cfg(test)]
mod tests;

pub use config::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_REQUEST_TIMEOUT, RelayConfig};
pub use handler::HttpRelay;
pub use retry::{RETRY_INTERVAL, RetryState};
pub use transport::{AUTH_CODE_HEADER, AUTH_ID_HEADER, DeliveryError};
