//! Worker thread driving delivery attempts.
//!
//! The worker is the only execution context that talks to the endpoint, so at
//! most one attempt is ever in flight. It reacts to commands from the relay
//! handle and to ticks from the retry scheduler, whichever arrives first.

use std::{
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use crossbeam_channel::{Receiver, Sender, bounded, select, unbounded};
use log::{debug, info, warn};

use crate::{credentials, pending_queue::PendingQueue};

use super::{
    config::RelayConfig,
    retry::{RetryFlag, RetryScheduler, RetryState},
    transport::EndpointClient,
};

/// Commands processed by the worker thread.
#[derive(Debug)]
pub(crate) enum RelayCommand {
    Attempt,
    Flush(Sender<()>),
    Shutdown(Sender<()>),
}

/// Result of one pass over the queue head.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum AttemptOutcome {
    /// Nothing was queued.
    Empty,
    /// Credentials could not be loaded; nothing was sent.
    Aborted,
    /// The head was delivered and removed.
    Delivered,
    /// The round trip failed; the head stays queued.
    Failed,
}

/// Handles shared between the relay and its worker thread.
pub(crate) struct WorkerParts {
    pub(crate) tx: Sender<RelayCommand>,
    pub(crate) retry: RetryFlag,
    pub(crate) handle: thread::JoinHandle<()>,
}

/// Spawn the worker thread serving `queue`.
pub(crate) fn spawn_worker(
    config: &RelayConfig,
    client: EndpointClient,
    queue: Arc<PendingQueue>,
    shutdown: Arc<AtomicBool>,
) -> WorkerParts {
    let (tx, rx) = unbounded();
    let worker = Worker::new(config, client, queue, shutdown);
    let retry = worker.scheduler.flag();
    let handle = thread::spawn(move || worker.run(rx));
    WorkerParts { tx, retry, handle }
}

pub(crate) struct Worker {
    client: EndpointClient,
    credentials_path: PathBuf,
    queue: Arc<PendingQueue>,
    scheduler: RetryScheduler,
    shutdown: Arc<AtomicBool>,
}

impl Worker {
    pub(crate) fn new(
        config: &RelayConfig,
        client: EndpointClient,
        queue: Arc<PendingQueue>,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            client,
            credentials_path: config.credentials_path.clone(),
            queue,
            scheduler: RetryScheduler::new(config.retry_interval),
            shutdown,
        }
    }

    /// Try to deliver the queue head once.
    ///
    /// The head is only removed after the endpoint accepted it. Credential
    /// failures leave both the queue and the retry state untouched.
    pub(crate) fn attempt(&mut self) -> AttemptOutcome {
        let Some(payload) = self.queue.peek() else {
            return AttemptOutcome::Empty;
        };

        let credentials = match credentials::load(&self.credentials_path) {
            Ok(credentials) => credentials,
            Err(_) => {
                warn!("HttpRelay: send attempt aborted; payload stays queued");
                return AttemptOutcome::Aborted;
            }
        };

        debug!("HttpRelay: sending payload ({} bytes)", payload.len());
        match self.client.post(&payload, &credentials) {
            Ok(body) => {
                self.queue.remove_head();
                self.scheduler.disarm();
                info!("HttpRelay: payload delivered; response: {body}");
                AttemptOutcome::Delivered
            }
            Err(err) => {
                warn!("HttpRelay: delivery failed: {err}");
                self.scheduler.arm();
                AttemptOutcome::Failed
            }
        }
    }

    /// Deliver queued payloads one round trip at a time until the queue is
    /// empty or an attempt does not succeed.
    fn drain(&mut self) {
        while !self.shutdown.load(Ordering::SeqCst) {
            if self.attempt() != AttemptOutcome::Delivered || self.queue.is_empty() {
                break;
            }
        }
    }

    /// Attempts requested by producers only run while idle. Once armed, the
    /// ticker owns the next attempt.
    fn handle_attempt_command(&mut self) {
        if self.scheduler.state() == RetryState::Idle {
            self.drain();
        }
    }

    fn handle_flush_command(&self, ack: Sender<()>) {
        // Ignore send error: if the receiver has dropped, there's nothing to do.
        let _ = ack.send(());
    }

    fn run(mut self, rx: Receiver<RelayCommand>) {
        loop {
            let ticks = self.scheduler.ticks().clone();
            select! {
                recv(rx) -> cmd => match cmd {
                    Ok(RelayCommand::Attempt) => self.handle_attempt_command(),
                    Ok(RelayCommand::Flush(ack)) => self.handle_flush_command(ack),
                    Ok(RelayCommand::Shutdown(ack)) => {
                        self.handle_flush_command(ack);
                        break;
                    }
                    Err(_) => break,
                },
                recv(ticks) -> _ => {
                    debug!("HttpRelay: retry tick");
                    self.drain();
                }
            }
        }
        let abandoned = self.queue.len();
        if abandoned > 0 {
            warn!("HttpRelay: worker stopped with {abandoned} undelivered payloads");
        }
    }
}

/// Sends a command and waits for the worker to acknowledge it.
///
/// The total wait never exceeds `timeout`.
pub(crate) fn send_with_ack(
    tx: &Sender<RelayCommand>,
    command: impl FnOnce(Sender<()>) -> RelayCommand,
    timeout: Duration,
) -> bool {
    let deadline = Instant::now() + timeout;
    let (ack_tx, ack_rx) = bounded(1);
    if tx.send(command(ack_tx)).is_err() {
        return false;
    }
    let remaining = deadline.saturating_duration_since(Instant::now());
    ack_rx.recv_timeout(remaining).is_ok()
}
