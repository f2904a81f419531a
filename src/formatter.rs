//! Payload formatting boundary.
//!
//! Provides the [`PayloadFormatter`] trait that turns raw event bytes into the
//! wire payload, a shareable trait-object wrapper, and a JSON formatter that
//! covers the common case.

use std::{fmt, sync::Arc};

use serde::Serialize;
use thiserror::Error;

/// Failure reported by a formatter.
#[derive(Debug, Error)]
#[error("payload formatting failed: {0}")]
pub struct FormatError(String);

impl FormatError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<serde_json::Error> for FormatError {
    fn from(err: serde_json::Error) -> Self {
        Self(err.to_string())
    }
}

/// Trait for turning raw events into wire payloads.
///
/// Implementors must be thread-safe (`Send + Sync`) because the relay may be
/// shared between producer threads.
pub trait PayloadFormatter: Send + Sync {
    /// Format a successfully read identifier.
    fn payload(&self, uid: &[u8]) -> Result<String, FormatError>;

    /// Format an error condition reported by the producer.
    fn payload_for_error(&self, error: &[u8]) -> Result<String, FormatError>;
}

/// Shared formatter trait object held by the relay.
#[derive(Clone)]
pub struct SharedFormatter {
    inner: Arc<dyn PayloadFormatter>,
}

impl SharedFormatter {
    /// Create a shared formatter from an owned formatter implementation.
    pub fn new<F>(formatter: F) -> Self
    where
        F: PayloadFormatter + 'static,
    {
        Self {
            inner: Arc::new(formatter),
        }
    }

    /// Wrap an existing shared formatter trait object.
    pub fn from_arc(inner: Arc<dyn PayloadFormatter>) -> Self {
        Self { inner }
    }

    pub fn payload(&self, uid: &[u8]) -> Result<String, FormatError> {
        self.inner.payload(uid)
    }

    pub fn payload_for_error(&self, error: &[u8]) -> Result<String, FormatError> {
        self.inner.payload_for_error(error)
    }
}

impl fmt::Debug for SharedFormatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedFormatter(<dyn PayloadFormatter>)")
    }
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum JsonEvent<'a> {
    Uid { uid: String },
    Error { message: &'a str },
}

/// Formatter emitting one JSON object per event.
///
/// Identifiers are rendered as lowercase hex; error blobs are decoded as
/// UTF-8 with invalid sequences replaced.
#[derive(Copy, Clone, Debug, Default)]
pub struct JsonPayloadFormatter;

impl PayloadFormatter for JsonPayloadFormatter {
    fn payload(&self, uid: &[u8]) -> Result<String, FormatError> {
        let event = JsonEvent::Uid {
            uid: hex_lower(uid),
        };
        Ok(serde_json::to_string(&event)?)
    }

    fn payload_for_error(&self, error: &[u8]) -> Result<String, FormatError> {
        let message = String::from_utf8_lossy(error);
        let event = JsonEvent::Error { message: &message };
        Ok(serde_json::to_string(&event)?)
    }
}

fn hex_lower(bytes: &[u8]) -> String {
    use std::fmt::Write;

    bytes
        .iter()
        .fold(String::with_capacity(bytes.len() * 2), |mut out, byte| {
            let _ = write!(out, "{byte:02x}");
            out
        })
}
