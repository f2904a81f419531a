//! Reliable HTTP relay for identifier reads and producer errors.
//!
//! Producers hand raw events to an [`HttpRelay`] through the
//! [`DeliveryStrategy`] entry points. Each event is turned into a payload by a
//! [`PayloadFormatter`], queued, and posted to the configured endpoint by a
//! background worker with at-least-once semantics.

pub mod builder;
pub mod credentials;
pub mod file_config;
pub mod formatter;
pub mod http_relay;
pub mod pending_queue;
pub mod strategy;
#[cfg(any(test, feature = "test-util"))]
pub mod test_utils;

pub use builder::{RelayBuildError, RelayBuilder};
pub use credentials::{
    CREDENTIAL_DELIMITER, CredentialError, Credentials, DEFAULT_CREDENTIALS_FILE,
};
pub use formatter::{FormatError, JsonPayloadFormatter, PayloadFormatter, SharedFormatter};
pub use http_relay::{
    AUTH_CODE_HEADER, AUTH_ID_HEADER, DeliveryError, HttpRelay, RETRY_INTERVAL, RelayConfig,
    RetryState,
};
pub use pending_queue::PendingQueue;
pub use strategy::{DeliveryStrategy, RelayError};
