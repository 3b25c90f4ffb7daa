//! Supervisor: wires the capturer to the sender and tears both down.
//!
//! # Startup and shutdown order (for beginners)
//!
//! 1. The event queue is created and its consumer handed to the sender, which
//!    starts before the first key is captured. Keys typed while the peripheral
//!    is still being searched for simply wait in the queue.
//! 2. The capture loop runs on the current task, raced against an external
//!    interrupt (Ctrl+C, or SIGTERM/SIGHUP on Unix).
//! 3. Whatever ends first, the sender task is aborted and awaited. There is
//!    no shutdown handshake: queued events that were not sent yet are lost.

use std::future::Future;
use std::time::Duration;

use keyproxy_core::{event_queue, EventQueueConsumer, SenderLiveness};
use keyproxy_sender::SenderError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::capture_keys::{ExitReason, KeyboardCapturer};
use crate::infrastructure::input_capture::InputSource;

/// Handle to a running sender, as returned by `spawn_sender`.
pub type SenderTask = (JoinHandle<Result<(), SenderError>>, SenderLiveness);

/// Why the program is shutting down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownReason {
    /// The capture loop ended on its own.
    Capture(ExitReason),
    /// An external interrupt arrived first.
    Interrupted,
}

/// Owns the lifetime of one capture session.
#[derive(Debug, Clone)]
pub struct Supervisor {
    capture_delay: Duration,
}

impl Supervisor {
    pub fn new(capture_delay: Duration) -> Self {
        Self { capture_delay }
    }

    /// Runs one session until the capture loop ends or `interrupt` resolves.
    ///
    /// `start_sender` receives the consumer end of the event queue and must
    /// start the sender task. The sender is always aborted and awaited before
    /// this returns.
    pub async fn run<S, I>(
        &self,
        input: Box<dyn InputSource>,
        start_sender: S,
        interrupt: I,
    ) -> ShutdownReason
    where
        S: FnOnce(EventQueueConsumer) -> SenderTask,
        I: Future<Output = ()>,
    {
        let (producer, consumer) = event_queue();
        let (handle, liveness) = start_sender(consumer);

        let reason = {
            let mut capturer =
                KeyboardCapturer::new(input, producer, liveness, self.capture_delay);
            tokio::select! {
                reason = capturer.run() => ShutdownReason::Capture(reason),
                () = interrupt => {
                    info!("interrupt received, shutting down");
                    ShutdownReason::Interrupted
                }
            }
        };

        stop_sender(handle).await;
        reason
    }
}

async fn stop_sender(handle: JoinHandle<Result<(), SenderError>>) {
    handle.abort();
    match handle.await {
        Ok(Ok(())) => debug!("sender finished"),
        Ok(Err(e)) => debug!("sender had already stopped: {e}"),
        Err(e) if e.is_cancelled() => debug!("sender task aborted"),
        Err(e) => warn!("sender task panicked: {e}"),
    }
}

/// Resolves on Ctrl+C, and on SIGTERM or SIGHUP on Unix.
pub async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut term = match signal(SignalKind::terminate()) {
            Ok(s) => Some(s),
            Err(e) => {
                warn!("failed to listen for SIGTERM: {e}");
                None
            }
        };
        let mut hup = match signal(SignalKind::hangup()) {
            Ok(s) => Some(s),
            Err(e) => {
                warn!("failed to listen for SIGHUP: {e}");
                None
            }
        };

        tokio::select! {
            _ = ctrl_c() => {}
            _ = recv_or_pending(term.as_mut()) => debug!("SIGTERM received"),
            _ = recv_or_pending(hup.as_mut()) => debug!("SIGHUP received"),
        }
    }

    #[cfg(not(unix))]
    ctrl_c().await;
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
}

#[cfg(unix)]
async fn recv_or_pending(signal: Option<&mut tokio::signal::unix::Signal>) {
    match signal {
        Some(signal) => {
            signal.recv().await;
        }
        None => std::future::pending::<()>().await,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
