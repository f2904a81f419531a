//! Configuration structures consumed by the relay lifecycle.
//!
//! [`RelayBuilder`](crate::RelayBuilder) validates and constructs these values
//! before passing them to [`HttpRelay`](super::HttpRelay) for runtime use.

use std::{path::PathBuf, time::Duration};

use crate::credentials::DEFAULT_CREDENTIALS_FILE;

use super::retry::RETRY_INTERVAL;

/// Default connection timeout applied when establishing HTTP connections.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default overall timeout for one request/response round trip.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings fixed for the lifetime of an [`HttpRelay`](super::HttpRelay).
///
/// Produced by [`RelayBuilder::build_config`](crate::RelayBuilder::build_config);
/// the retry period cannot be set by callers:
///
/// ```compile_fail
/// use std::time::Duration;
/// use uidrelay::RelayConfig;
///
/// let config = RelayConfig {
///     retry_interval: Duration::from_millis(1),
///     ..Default::default()
/// };
/// ```
#[derive(Clone, Debug)]
pub struct RelayConfig {
    /// Absolute URL receiving every payload.
    pub url: String,
    /// Accept invalid certificates and hostnames for this relay's client.
    pub skip_certificate_validation: bool,
    /// File holding the `id:code` credential record.
    pub credentials_path: PathBuf,
    /// Timeout for establishing connections.
    pub connect_timeout: Duration,
    /// Timeout for a whole round trip.
    pub request_timeout: Duration,
    /// Period of the retry ticker while armed. Always [`RETRY_INTERVAL`]
    /// outside tests.
    pub(crate) retry_interval: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            skip_certificate_validation: false,
            credentials_path: PathBuf::from(DEFAULT_CREDENTIALS_FILE),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            retry_interval: RETRY_INTERVAL,
        }
    }
}

impl RelayConfig {
    /// Period of the retry ticker while armed.
    pub fn retry_interval(&self) -> Duration {
        self.retry_interval
    }
}
