//! Builder for [`HttpRelay`](crate::HttpRelay).
//!
//! Exposes the endpoint URL, certificate policy, credential location, and
//! timeouts. Validation happens in [`RelayBuilder::build`] so misconfiguration
//! is reported before the worker thread starts.

use std::{io, path::PathBuf, time::Duration};

use thiserror::Error;

use crate::{
    formatter::SharedFormatter,
    http_relay::{HttpRelay, RelayConfig},
};

/// Errors that may occur while building a relay.
#[derive(Debug, Error)]
pub enum RelayBuildError {
    /// Invalid user supplied configuration.
    #[error("invalid relay configuration: {0}")]
    InvalidConfig(String),
    /// The TLS connector for the endpoint could not be created.
    #[error("failed to initialise TLS: {0}")]
    Tls(#[from] native_tls::Error),
    /// Underlying I/O error whilst reading configuration.
    #[error(transparent)]
    Io(#[from] io::Error),
}

macro_rules! ensure_positive {
    ($value:expr, $field:expr) => {{
        if $value == 0 {
            Err(RelayBuildError::InvalidConfig(format!(
                "{} must be greater than zero",
                $field
            )))
        } else {
            Ok($value)
        }
    }};
}

macro_rules! option_setter {
    ($(#[$meta:meta])* $fn_name:ident, $field:ident, $ty:ty) => {
        $(#[$meta])*
        pub fn $fn_name(mut self, value: $ty) -> Self {
            self.$field = Some(value);
            self
        }
    };
}

/// Whether `authority` names a host once userinfo and port are removed.
fn has_host(authority: &str) -> bool {
    let host_port = authority
        .rsplit_once('@')
        .map_or(authority, |(_, host_port)| host_port);
    let (host, port) = match host_port.strip_prefix('[') {
        Some(bracketed) => match bracketed.split_once(']') {
            Some((host, rest)) => (host, rest.strip_prefix(':').unwrap_or(rest)),
            None => return false,
        },
        None => host_port
            .split_once(':')
            .unwrap_or((host_port, "")),
    };
    !host.is_empty() && port.chars().all(|c| c.is_ascii_digit())
}

/// Builder for constructing [`HttpRelay`] instances.
#[derive(Clone, Debug, Default)]
pub struct RelayBuilder {
    url: Option<String>,
    skip_certificate_validation: bool,
    credentials_path: Option<PathBuf>,
    connect_timeout_ms: Option<u64>,
    request_timeout_ms: Option<u64>,
    retry_interval: Option<Duration>,
}

impl RelayBuilder {
    /// Create a new builder with no URL configured.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the absolute endpoint URL (required).
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Accept invalid certificates and hostnames for this relay only.
    pub fn with_skip_certificate_validation(mut self, skip: bool) -> Self {
        self.skip_certificate_validation = skip;
        self
    }

    /// Read credentials from `path` instead of the default file.
    pub fn with_credentials_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.credentials_path = Some(path.into());
        self
    }

    option_setter!(
        #[doc = "Set the connect timeout in milliseconds."]
        with_connect_timeout_ms,
        connect_timeout_ms,
        u64
    );
    option_setter!(
        #[doc = "Set the overall request timeout in milliseconds."]
        with_request_timeout_ms,
        request_timeout_ms,
        u64
    );

    /// Shorten the retry period so tests need not wait for the fixed interval.
    #[cfg(any(test, feature = "test-util"))]
    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = Some(interval);
        self
    }

    fn validate(&self) -> Result<(), RelayBuildError> {
        self.validate_url()?;
        self.validate_timeouts()?;
        self.validate_credentials_path()?;
        Ok(())
    }

    fn validate_url(&self) -> Result<(), RelayBuildError> {
        let Some(url) = self.url.as_deref() else {
            return Err(RelayBuildError::InvalidConfig(
                "relay requires a URL".into(),
            ));
        };
        if url.trim().is_empty() {
            return Err(RelayBuildError::InvalidConfig(
                "URL must not be empty".into(),
            ));
        }
        let rest = url
            .strip_prefix("https://")
            .or_else(|| url.strip_prefix("http://"))
            .ok_or_else(|| {
                RelayBuildError::InvalidConfig(format!(
                    "URL must be absolute http:// or https://, got {url}"
                ))
            })?;
        let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
        if url.chars().any(char::is_whitespace) || !has_host(authority) {
            return Err(RelayBuildError::InvalidConfig(format!(
                "URL has no valid host: {url}"
            )));
        }
        Ok(())
    }

    fn validate_timeouts(&self) -> Result<(), RelayBuildError> {
        if let Some(timeout) = self.connect_timeout_ms {
            ensure_positive!(timeout, "connect_timeout_ms")?;
        }
        if let Some(timeout) = self.request_timeout_ms {
            ensure_positive!(timeout, "request_timeout_ms")?;
        }
        if let Some(interval) = self.retry_interval {
            ensure_positive!(interval.as_nanos(), "retry_interval")?;
        }
        Ok(())
    }

    fn validate_credentials_path(&self) -> Result<(), RelayBuildError> {
        match &self.credentials_path {
            Some(path) if path.as_os_str().is_empty() => Err(RelayBuildError::InvalidConfig(
                "credentials_path must not be empty".into(),
            )),
            _ => Ok(()),
        }
    }

    /// Validate the builder and produce the runtime configuration.
    pub fn build_config(&self) -> Result<RelayConfig, RelayBuildError> {
        self.validate()?;

        let defaults = RelayConfig::default();
        Ok(RelayConfig {
            url: self.url.clone().unwrap_or_default(),
            skip_certificate_validation: self.skip_certificate_validation,
            credentials_path: self
                .credentials_path
                .clone()
                .unwrap_or(defaults.credentials_path),
            connect_timeout: self
                .connect_timeout_ms
                .map_or(defaults.connect_timeout, Duration::from_millis),
            request_timeout: self
                .request_timeout_ms
                .map_or(defaults.request_timeout, Duration::from_millis),
            retry_interval: self.retry_interval.unwrap_or(defaults.retry_interval),
        })
    }

    /// Validate the configuration and start the relay.
    pub fn build(&self, formatter: SharedFormatter) -> Result<HttpRelay, RelayBuildError> {
        let config = self.build_config()?;
        Ok(HttpRelay::with_config(config, formatter)?)
    }
}
