//! Public relay type exported by the crate.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::Duration,
};

use crossbeam_channel::Sender;
use parking_lot::Mutex;

use crate::{
    formatter::SharedFormatter,
    pending_queue::PendingQueue,
    strategy::{DeliveryStrategy, RelayError},
};

use super::{
    config::RelayConfig,
    retry::{RetryFlag, RetryState},
    transport::EndpointClient,
    worker::{RelayCommand, send_with_ack, spawn_worker},
};

/// Relay delivering formatted events to one HTTP endpoint.
///
/// Events are formatted on the caller's thread, queued, and sent by a
/// dedicated worker in arrival order. A failed round trip keeps the payload at
/// the head of the queue and arms a fixed-interval retry; a successful one
/// removes it and disarms the retry.
///
/// Relays are started through [`RelayBuilder::build`](crate::RelayBuilder::build),
/// which validates the configuration first:
///
/// ```compile_fail
/// use uidrelay::{HttpRelay, JsonPayloadFormatter, RelayBuilder, SharedFormatter};
///
/// let mut config = RelayBuilder::new()
///     .with_url("http://localhost/events")
///     .build_config()
///     .unwrap();
/// config.url.clear();
/// let relay = HttpRelay::with_config(config, SharedFormatter::new(JsonPayloadFormatter));
/// ```
pub struct HttpRelay {
    formatter: SharedFormatter,
    queue: Arc<PendingQueue>,
    retry: RetryFlag,
    tx: Option<Sender<RelayCommand>>,
    handle: Mutex<Option<thread::JoinHandle<()>>>,
    shutdown: Arc<AtomicBool>,
    /// Timeout for flush and shutdown acknowledgements.
    ///
    /// Matches the request timeout so a pending round trip can finish before
    /// the caller gives up waiting.
    ack_timeout: Duration,
}

impl HttpRelay {
    /// Construct the relay from a validated configuration.
    ///
    /// Fails only when the TLS connector cannot be created.
    pub(crate) fn with_config(
        config: RelayConfig,
        formatter: SharedFormatter,
    ) -> Result<Self, native_tls::Error> {
        let client = EndpointClient::new(&config)?;
        let queue = Arc::new(PendingQueue::new());
        let shutdown = Arc::new(AtomicBool::new(false));
        let parts = spawn_worker(&config, client, Arc::clone(&queue), Arc::clone(&shutdown));
        Ok(Self {
            formatter,
            queue,
            retry: parts.retry,
            tx: Some(parts.tx),
            handle: Mutex::new(Some(parts.handle)),
            shutdown,
            ack_timeout: config.request_timeout,
        })
    }

    /// Queue an already formatted payload.
    ///
    /// When no retry cycle is armed an immediate attempt is requested from the
    /// worker; otherwise the payload waits behind the outstanding head.
    pub fn enqueue(&self, payload: String) -> Result<(), RelayError> {
        let Some(tx) = self.tx.as_ref() else {
            log::warn!("HttpRelay: dropped payload after shutdown");
            return Err(RelayError::Closed);
        };
        self.queue.push(payload);
        if self.retry.state() == RetryState::Idle && tx.send(RelayCommand::Attempt).is_err() {
            log::warn!("HttpRelay: worker unavailable; payload stays queued");
        }
        Ok(())
    }

    /// Current state of the retry scheduler.
    pub fn retry_state(&self) -> RetryState {
        self.retry.state()
    }

    /// Number of payloads awaiting delivery.
    pub fn pending_len(&self) -> usize {
        self.queue.len()
    }

    /// Payloads awaiting delivery, head first.
    pub fn pending(&self) -> Vec<String> {
        self.queue.snapshot()
    }

    /// Wait until the worker has processed every command issued so far.
    ///
    /// Returns `false` if the relay is closed or the worker did not answer
    /// within the request timeout. This does not wait for pending retries.
    pub fn flush(&self) -> bool {
        let Some(tx) = self.tx.as_ref() else {
            return false;
        };
        send_with_ack(tx, RelayCommand::Flush, self.ack_timeout)
    }

    /// Stop the worker and wait for it to exit.
    ///
    /// Any drain in progress stops before its next round trip; an in-flight
    /// request is bounded by the request timeout. Undelivered payloads are
    /// discarded.
    pub fn close(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(tx) = self.tx.take() {
            send_with_ack(&tx, RelayCommand::Shutdown, self.ack_timeout);
        }
        let Some(handle) = self.handle.lock().take() else {
            return;
        };
        if handle.join().is_err() {
            log::warn!("HttpRelay: worker thread panicked");
        }
    }
}

impl DeliveryStrategy for HttpRelay {
    fn handle_uid_event(&self, uid: &[u8]) -> Result<(), RelayError> {
        let payload = self.formatter.payload(uid)?;
        self.enqueue(payload)
    }

    fn handle_error_event(&self, error: &[u8]) -> Result<(), RelayError> {
        let payload = self.formatter.payload_for_error(error)?;
        self.enqueue(payload)
    }
}

impl Drop for HttpRelay {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for HttpRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRelay")
            .field("pending", &self.queue.len())
            .field("retry", &self.retry.state())
            .field("ack_timeout", &self.ack_timeout)
            .finish()
    }
}
