//! Live Subscriptions
//!
//! A subscription is a long-lived background task that follows the
//! committed length and pushes every newly visible message into an
//! in-memory queue.
//!
//! ## The Loop
//!
//! ```text
//! ┌─► read checkpoint L
//! │       ↓ L > position?
//! │   stream frames over [position, L)     ← one PageReader per window
//! │       ↓ per frame
//! │   queue at limit? pause ≤ 100 ms ticks ← cooperative back-pressure
//! │       ↓
//! │   enqueue, advance position
//! │       ↓ caught up
//! └── poll every ~1 s                      ← cancellable
//!
//! on storage error: log, back off ≥ 20 s, retry from the top
//! on cancellation: exit promptly from any sleep or poll
//! ```
//!
//! Transient failures are never surfaced to the consumer; the loop owns its
//! retry policy and only cancellation ends it. The queue limit is enforced
//! cooperatively: the producer checks the depth before decoding the next
//! frame, so with the single producer the queue never grows past the limit,
//! but it is the consumer's dequeues that unblock the loop.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use messagevault_core::{format, Message};

use crate::checkpoint::Checkpoint;
use crate::error::Result;
use crate::page_store::PageStore;
use crate::paged_reader::PageReader;

/// Intervals driving the subscription loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionConfig {
    /// Checkpoint polling interval while caught up (default: 1 s)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Backoff after a storage error (default: 20 s)
    #[serde(default = "default_error_backoff_ms")]
    pub error_backoff_ms: u64,

    /// Pause granularity while the queue is at its limit (default: 100 ms)
    #[serde(default = "default_queue_pause_ms")]
    pub queue_pause_ms: u64,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            error_backoff_ms: default_error_backoff_ms(),
            queue_pause_ms: default_queue_pause_ms(),
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    1_000
}

fn default_error_backoff_ms() -> u64 {
    20_000
}

fn default_queue_pause_ms() -> u64 {
    100
}

/// Consumer end of a live subscription.
///
/// Dropping the subscription detaches the background task; it notices on
/// its next enqueue or sleep tick and exits.
pub struct Subscription {
    receiver: mpsc::UnboundedReceiver<Message>,
    depth: Arc<AtomicUsize>,
    handle: JoinHandle<()>,
}

impl Subscription {
    /// Receive the next message. Returns `None` once the task has exited
    /// (after cancellation) and the queue is drained.
    pub async fn recv(&mut self) -> Option<Message> {
        let message = self.receiver.recv().await;
        if message.is_some() {
            self.depth.fetch_sub(1, Ordering::SeqCst);
        }
        message
    }

    /// Non-blocking receive.
    pub fn try_recv(&mut self) -> Option<Message> {
        let message = self.receiver.try_recv().ok();
        if message.is_some() {
            self.depth.fetch_sub(1, Ordering::SeqCst);
        }
        message
    }

    /// Current queue depth.
    pub fn len(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wait for the background task to finish (it finishes only after the
    /// cancellation token fires).
    pub async fn stopped(self) {
        let _ = self.handle.await;
    }
}

/// What one pass over the checkpoint produced.
enum Pump {
    /// Streamed a window of new messages; check again immediately.
    Streamed,
    /// Nothing new; poll after a sleep.
    Idle,
    /// Cancelled or the consumer is gone; exit the loop.
    Stopped,
}

pub(crate) fn spawn(
    store: Arc<dyn PageStore>,
    checkpoint: Arc<dyn Checkpoint>,
    start: u64,
    buffer_size: usize,
    queue_limit: usize,
    cancel: CancellationToken,
    config: SubscriptionConfig,
) -> Subscription {
    let (sender, receiver) = mpsc::unbounded_channel();
    let depth = Arc::new(AtomicUsize::new(0));
    let handle = tokio::spawn(run(
        store,
        checkpoint,
        start,
        buffer_size,
        queue_limit,
        sender,
        depth.clone(),
        cancel,
        config,
    ));
    Subscription {
        receiver,
        depth,
        handle,
    }
}

#[allow(clippy::too_many_arguments)]
async fn run(
    store: Arc<dyn PageStore>,
    checkpoint: Arc<dyn Checkpoint>,
    start: u64,
    buffer_size: usize,
    queue_limit: usize,
    sender: mpsc::UnboundedSender<Message>,
    depth: Arc<AtomicUsize>,
    cancel: CancellationToken,
    config: SubscriptionConfig,
) {
    let poll_interval = Duration::from_millis(config.poll_interval_ms);
    let error_backoff = Duration::from_millis(config.error_backoff_ms);
    let queue_pause = Duration::from_millis(config.queue_pause_ms);

    info!(start, queue_limit, "subscription started");
    let mut position = start;

    loop {
        if cancel.is_cancelled() {
            break;
        }

        let pass = pump(
            &store,
            &checkpoint,
            &mut position,
            buffer_size,
            queue_limit,
            &sender,
            &depth,
            &cancel,
            queue_pause,
        )
        .await;

        match pass {
            Ok(Pump::Streamed) => {}
            Ok(Pump::Idle) => {
                if sleep_cancellable(poll_interval, &cancel).await {
                    break;
                }
            }
            Ok(Pump::Stopped) => break,
            Err(e) => {
                warn!(error = %e, position, "subscription read failed, backing off");
                if sleep_cancellable(error_backoff, &cancel).await {
                    break;
                }
            }
        }
    }

    info!(position, "subscription stopped");
}

/// One pass: if the checkpoint moved past `position`, stream the new window
/// into the queue, pausing whenever the queue is at its limit.
#[allow(clippy::too_many_arguments)]
async fn pump(
    store: &Arc<dyn PageStore>,
    checkpoint: &Arc<dyn Checkpoint>,
    position: &mut u64,
    buffer_size: usize,
    queue_limit: usize,
    sender: &mpsc::UnboundedSender<Message>,
    depth: &AtomicUsize,
    cancel: &CancellationToken,
    queue_pause: Duration,
) -> Result<Pump> {
    let length = checkpoint.read()?;
    if length <= *position {
        return Ok(Pump::Idle);
    }

    debug!(from = *position, till = length, "streaming new messages");
    let mut reader = PageReader::new(store.clone(), *position, length, buffer_size)?;

    while reader.position() < length {
        while depth.load(Ordering::SeqCst) >= queue_limit {
            if sleep_cancellable(queue_pause, cancel).await {
                return Ok(Pump::Stopped);
            }
        }
        if cancel.is_cancelled() {
            return Ok(Pump::Stopped);
        }

        let message = format::read_frame(&mut reader)?;
        *position = reader.position();
        depth.fetch_add(1, Ordering::SeqCst);
        if sender.send(message).is_err() {
            // Consumer dropped the subscription
            return Ok(Pump::Stopped);
        }
    }

    Ok(Pump::Streamed)
}

/// Sleep for `duration`, returning `true` if cancellation fired first.
async fn sleep_cancellable(duration: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => true,
        _ = tokio::time::sleep(duration) => false,
    }
}
