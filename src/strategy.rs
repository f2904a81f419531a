//! Entry points accepting raw producer events.

use thiserror::Error;

use crate::formatter::FormatError;

/// Errors surfaced to producers when handing over an event.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The formatter rejected the event; nothing was queued.
    #[error(transparent)]
    Format(#[from] FormatError),
    /// The relay was closed and no longer accepts events.
    #[error("relay is closed")]
    Closed,
}

/// Trait implemented by event delivery strategies.
///
/// Implementations are `Send + Sync` so producers on any thread can hand over
/// events. Neither method waits for network I/O.
pub trait DeliveryStrategy: Send + Sync {
    /// Accept a successfully read identifier.
    fn handle_uid_event(&self, uid: &[u8]) -> Result<(), RelayError>;

    /// Accept an error condition reported by the producer.
    fn handle_error_event(&self, error: &[u8]) -> Result<(), RelayError>;
}
