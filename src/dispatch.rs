//! Cross-boundary delivery of drag events to the content context.
//!
//! Content runs on its own thread (standing in for the content process).
//! Events travel over a bounded FIFO queue and content acknowledges each one.
//!
//! ## Guarantees
//!
//! - **Order**: one queue, one consumer, so events arrive in dispatch order.
//! - **Back-pressure**: the input thread waits for the acknowledgement (up to
//!   `ack_timeout`); when the queue is full, enqueueing blocks instead of
//!   reordering.
//! - **Stalls**: an unacknowledged event marks the boundary as stalled. While
//!   stalled, further `dragover` events are withheld. Other event types are
//!   still queued behind the stalled one. A stall never ends the session.
//! - **Teardown**: [`BoundaryHandle::tear_down`] (any thread) bumps the
//!   boundary epoch. Queued events from an older epoch are dropped unseen by
//!   content. Once the teardown is consumed, late acknowledgements for those
//!   events are discarded and never fail a dispatch of the next session.

use crate::constants::{CONTENT_THREAD_NAME, DEFAULT_ACK_TIMEOUT_MS, DEFAULT_DISPATCH_QUEUE_DEPTH, DISPATCH_WARN_MS};
use crate::error::{DndError, DndResult};
use crate::events::{DragEvent, DragEventType};
use crate::perf::LatencyStats;
use crate::profile_scope;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, SyncSender, TryRecvError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, trace, warn};

/// Returned by a [`ContentSink`] whose document no longer exists.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("content context is gone")]
pub struct ContentGone;

/// The content side of the boundary. Runs on the content thread.
pub trait ContentSink: Send + 'static {
    /// Process one event. Returning is the acknowledgement.
    fn deliver(&mut self, event: DragEvent) -> Result<(), ContentGone>;
}

impl<F> ContentSink for F
where
    F: FnMut(DragEvent) -> Result<(), ContentGone> + Send + 'static,
{
    fn deliver(&mut self, event: DragEvent) -> Result<(), ContentGone> {
        self(event)
    }
}

// ============================================================================
// Boundary state
// ============================================================================

struct BoundaryState {
    epoch: AtomicU64,
    teardown_pending: AtomicBool,
}

/// Handle the embedder uses to report content teardown (navigation, close).
#[derive(Clone)]
pub struct BoundaryHandle {
    state: Arc<BoundaryState>,
}

impl BoundaryHandle {
    fn new() -> Self {
        Self {
            state: Arc::new(BoundaryState {
                epoch: AtomicU64::new(0),
                teardown_pending: AtomicBool::new(false),
            }),
        }
    }

    /// Content is gone: drop everything queued and cancel the session.
    pub fn tear_down(&self) {
        let epoch = self.state.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.teardown_pending.store(true, Ordering::SeqCst);
        warn!(epoch, "Content context torn down");
    }

    pub fn epoch(&self) -> u64 {
        self.state.epoch.load(Ordering::SeqCst)
    }

    pub fn is_torn_down(&self) -> bool {
        self.state.teardown_pending.load(Ordering::SeqCst)
    }

    fn take_teardown(&self) -> bool {
        self.state.teardown_pending.swap(false, Ordering::SeqCst)
    }
}

// ============================================================================
// Wire types
// ============================================================================

struct Envelope {
    seq: u64,
    epoch: u64,
    sent_at: Instant,
    event: DragEvent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AckStatus {
    Delivered,
    /// Queued before a teardown, never shown to content
    Dropped,
    /// Content reported itself gone while handling this event
    Gone,
}

struct Ack {
    seq: u64,
    /// Epoch the event was queued in
    epoch: u64,
    sent_at: Instant,
    status: AckStatus,
}

/// What happened to a dispatched event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Content processed and acknowledged it
    Delivered,
    /// Queued, but content did not acknowledge within the timeout
    Pending,
    /// Not sent: a `dragover` while content is stalled
    Withheld,
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Ordered, acknowledged channel from the input thread to content.
pub struct CrossBoundaryDispatcher {
    queue: Option<SyncSender<Envelope>>,
    acks: Receiver<Ack>,
    boundary: BoundaryHandle,
    next_seq: u64,
    /// Newest event still awaiting its acknowledgement
    stalled_on: Option<u64>,
    /// Acks from epochs before this one belong to a consumed teardown
    live_epoch: u64,
    ack_timeout: Duration,
    latency: LatencyStats,
    worker: Option<JoinHandle<()>>,
}

impl CrossBoundaryDispatcher {
    /// Spawn the content thread with default queue depth and timeout.
    pub fn spawn(sink: impl ContentSink) -> std::io::Result<Self> {
        Self::with_config(
            sink,
            DEFAULT_DISPATCH_QUEUE_DEPTH,
            Duration::from_millis(DEFAULT_ACK_TIMEOUT_MS),
        )
    }

    pub fn with_config(sink: impl ContentSink, queue_depth: usize, ack_timeout: Duration) -> std::io::Result<Self> {
        let (queue_tx, queue_rx) = mpsc::sync_channel(queue_depth.max(1));
        let (ack_tx, ack_rx) = mpsc::channel();
        let boundary = BoundaryHandle::new();
        let worker_boundary = boundary.clone();

        let worker = std::thread::Builder::new()
            .name(CONTENT_THREAD_NAME.to_string())
            .spawn(move || run_content_loop(sink, queue_rx, ack_tx, worker_boundary))?;

        Ok(Self {
            queue: Some(queue_tx),
            acks: ack_rx,
            boundary,
            next_seq: 0,
            stalled_on: None,
            live_epoch: 0,
            ack_timeout,
            latency: LatencyStats::new(),
            worker: Some(worker),
        })
    }

    /// Handle for reporting teardown from other threads
    pub fn boundary(&self) -> BoundaryHandle {
        self.boundary.clone()
    }

    pub fn set_ack_timeout(&mut self, timeout: Duration) {
        self.ack_timeout = timeout;
    }

    pub fn latency_stats(&self) -> &LatencyStats {
        &self.latency
    }

    pub fn is_stalled(&self) -> bool {
        self.stalled_on.is_some()
    }

    /// Consume a pending teardown notification.
    ///
    /// Returns true exactly once per teardown. Clears the stall since
    /// everything queued before the teardown is dropped anyway.
    pub fn take_teardown(&mut self) -> bool {
        let torn_down = self.boundary.take_teardown();
        if torn_down {
            self.stalled_on = None;
            self.live_epoch = self.boundary.epoch();
        }
        torn_down
    }

    /// Deliver one event and wait for content to acknowledge it.
    pub fn dispatch(&mut self, event: DragEvent) -> DndResult<Delivery> {
        profile_scope!("dispatch");
        let epoch = self.boundary.epoch();
        self.drain_acks()?;
        if self.boundary.is_torn_down() {
            return Err(DndError::BoundaryTeardown);
        }

        if self.stalled_on.is_some() && event.event_type == DragEventType::DragOver {
            trace!(session = %event.session_id, "Content stalled, withholding dragover");
            return Ok(Delivery::Withheld);
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        let event_type = event.event_type;

        let queue = self.queue.as_ref().ok_or(DndError::DispatcherClosed)?;
        queue
            .send(Envelope {
                seq,
                epoch,
                sent_at: Instant::now(),
                event,
            })
            .map_err(|_| DndError::DispatcherClosed)?;
        trace!(seq, %event_type, "Event queued for content");

        self.wait_for(seq, event_type)
    }

    fn wait_for(&mut self, seq: u64, event_type: DragEventType) -> DndResult<Delivery> {
        let deadline = Instant::now() + self.ack_timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.acks.recv_timeout(remaining) {
                Ok(ack) => {
                    let is_ours = ack.seq == seq;
                    self.handle_ack(ack)?;
                    if is_ours {
                        return Ok(Delivery::Delivered);
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    warn!(seq, %event_type, timeout_ms = self.ack_timeout.as_millis() as u64, "Content did not acknowledge in time");
                    self.stalled_on = Some(seq);
                    return Ok(Delivery::Pending);
                }
                Err(RecvTimeoutError::Disconnected) => return Err(DndError::DispatcherClosed),
            }
        }
    }

    /// Process acknowledgements that already arrived, without blocking.
    fn drain_acks(&mut self) -> DndResult<()> {
        loop {
            match self.acks.try_recv() {
                Ok(ack) => self.handle_ack(ack)?,
                Err(TryRecvError::Empty) => return Ok(()),
                Err(TryRecvError::Disconnected) => return Err(DndError::DispatcherClosed),
            }
        }
    }

    fn handle_ack(&mut self, ack: Ack) -> DndResult<()> {
        if ack.epoch < self.live_epoch {
            trace!(seq = ack.seq, epoch = ack.epoch, status = ?ack.status, "Discarding ack from before teardown");
            return Ok(());
        }
        if self.stalled_on.is_some_and(|stalled| ack.seq >= stalled) {
            debug!(seq = ack.seq, "Content caught up");
            self.stalled_on = None;
        }

        match ack.status {
            AckStatus::Delivered => {
                let elapsed = ack.sent_at.elapsed();
                self.latency.record(elapsed);
                let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
                if elapsed_ms > DISPATCH_WARN_MS {
                    warn!(seq = ack.seq, elapsed_ms, "Slow content acknowledgement");
                }
                Ok(())
            }
            AckStatus::Dropped | AckStatus::Gone => Err(DndError::BoundaryTeardown),
        }
    }

    /// Close the queue and wait for the content thread to finish.
    pub fn shutdown(mut self) {
        self.queue.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for CrossBoundaryDispatcher {
    fn drop(&mut self) {
        self.queue.take();
        // A content thread stuck in a stalled sink is left detached.
        if let Some(worker) = self.worker.take() {
            if worker.is_finished() {
                let _ = worker.join();
            }
        }
    }
}

fn run_content_loop(mut sink: impl ContentSink, queue: Receiver<Envelope>, acks: Sender<Ack>, boundary: BoundaryHandle) {
    for envelope in queue {
        let status = if envelope.epoch != boundary.epoch() {
            trace!(seq = envelope.seq, "Dropping event queued before teardown");
            AckStatus::Dropped
        } else {
            match sink.deliver(envelope.event) {
                Ok(()) => AckStatus::Delivered,
                Err(ContentGone) => {
                    boundary.tear_down();
                    AckStatus::Gone
                }
            }
        };

        let ack = Ack {
            seq: envelope.seq,
            epoch: envelope.epoch,
            sent_at: envelope.sent_at,
            status,
        };
        if acks.send(ack).is_err() {
            break;
        }
    }
    debug!("Content loop finished");
}
