//! HTTP transport for a single relay endpoint.
//!
//! Each relay owns one `ureq::Agent` built with its own
//! `native_tls::TlsConnector`, so relaxing certificate checks for one endpoint
//! never affects other clients in the process.

use std::{io, sync::Arc};

use native_tls::TlsConnector;
use thiserror::Error;
use ureq::{Agent, AgentBuilder};

use crate::credentials::Credentials;

use super::config::RelayConfig;

/// Header carrying the credential identifier.
pub const AUTH_ID_HEADER: &str = "FM-Auth-Id";
/// Header carrying the credential code.
pub const AUTH_CODE_HEADER: &str = "FM-Auth-Code";
const CONTENT_TYPE: &str = "application/json";

/// Failure of one round trip.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The endpoint answered with an error status.
    #[error("endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    /// The request could not be sent or the response could not be received.
    #[error("transport error: {0}")]
    Transport(String),
    /// The response arrived but its body could not be read.
    #[error("failed to read response body: {0}")]
    Body(#[from] io::Error),
}

/// Build the TLS connector applying the relay's trust policy.
pub(crate) fn tls_connector(skip_validation: bool) -> Result<TlsConnector, native_tls::Error> {
    let mut builder = TlsConnector::builder();
    if skip_validation {
        builder.danger_accept_invalid_certs(true);
        builder.danger_accept_invalid_hostnames(true);
    }
    builder.build()
}

/// Client posting payloads to the configured endpoint.
pub(crate) struct EndpointClient {
    agent: Agent,
    url: String,
}

impl EndpointClient {
    pub(crate) fn new(config: &RelayConfig) -> Result<Self, native_tls::Error> {
        let connector = tls_connector(config.skip_certificate_validation)?;
        let agent = AgentBuilder::new()
            .timeout_connect(config.connect_timeout)
            .timeout(config.request_timeout)
            .tls_connector(Arc::new(connector))
            .build();
        Ok(Self {
            agent,
            url: config.url.clone(),
        })
    }

    /// Post `payload` and return the response body on success.
    pub(crate) fn post(
        &self,
        payload: &str,
        credentials: &Credentials,
    ) -> Result<String, DeliveryError> {
        let result = self
            .agent
            .post(&self.url)
            .set("Content-Type", CONTENT_TYPE)
            .set(AUTH_ID_HEADER, credentials.id())
            .set(AUTH_CODE_HEADER, credentials.code())
            .send_string(payload);

        match result {
            Ok(response) => Ok(response.into_string()?),
            Err(ureq::Error::Status(status, response)) => Err(DeliveryError::Status {
                status,
                body: response.into_string().unwrap_or_default(),
            }),
            Err(ureq::Error::Transport(err)) => Err(DeliveryError::Transport(err.to_string())),
        }
    }
}
