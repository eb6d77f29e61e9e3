//! # Event Bus System
//!
//! Provides an event-driven channel between the cleaner core and its host
//! shells using `tokio::sync::broadcast`.
//!
//! ## Overview
//!
//! The event bus system consists of:
//! - **Event Types**: Strongly-typed enum hierarchies for batch runs and sessions
//! - **EventBus**: Central broadcast channel for publishing events
//! - **EventStream**: Wrapper for consuming events with filtering
//!
//! ```text
//! ┌──────────────────┐   emit    ┌───────────┐  subscribe  ┌────────────────┐
//! │ Batch Orchestrator├─────────>│           ├────────────>│ Progress view  │
//! └──────────────────┘           │ EventBus  │             └────────────────┘
//! ┌──────────────────┐   emit    │           │  subscribe  ┌────────────────┐
//! │ Cleaner Session  ├──────────>│           ├────────────>│ Audit logger   │
//! └──────────────────┘           └───────────┘             └────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{BatchEvent, CoreEvent, EventBus};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(100);
//! let mut subscriber = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::Batch(BatchEvent::Started {
//!         batch_id: "batch-1".to_string(),
//!         total_files: 3,
//!         dry_run: false,
//!     }))
//!     .ok();
//!
//! let event = subscriber.recv().await.unwrap();
//! assert!(matches!(event, CoreEvent::Batch(_)));
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: Subscriber was too slow and missed `n` events.
//!   This is non-fatal; the subscriber can continue receiving new events.
//! - **`RecvError::Closed`**: All senders have been dropped. This indicates shutdown.
//!
//! Publishers ignore the error returned when nobody is subscribed; progress
//! reporting is best-effort and never affects a batch result.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 256;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum published through the event bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Batch processing events
    Batch(BatchEvent),
    /// Upload session events
    Session(SessionEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Batch(e) => e.description(),
            CoreEvent::Session(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Batch(BatchEvent::FileProcessed { failed: true, .. }) => {
                EventSeverity::Warning
            }
            CoreEvent::Batch(BatchEvent::Completed { failed, .. }) if *failed > 0 => {
                EventSeverity::Warning
            }
            CoreEvent::Batch(BatchEvent::Completed { .. }) => EventSeverity::Info,
            CoreEvent::Session(SessionEvent::Cleared { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    /// Debug-level events (verbose)
    Debug,
    /// Informational events
    Info,
    /// Warning events
    Warning,
    /// Error events
    Error,
}

// ============================================================================
// Batch Events
// ============================================================================

/// Events emitted while a batch run is in progress.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum BatchEvent {
    /// A batch run was accepted and its file set resolved.
    Started {
        batch_id: String,
        total_files: usize,
        dry_run: bool,
    },
    /// One file reached a terminal state.
    FileProcessed {
        batch_id: String,
        /// Identifier of the file within the batch (relative path or key)
        file: String,
        /// Terminal state label (`no_lyrics`, `header_free`, `cleaned`, `failed`)
        outcome: String,
        removed_lines: usize,
        failed: bool,
    },
    /// All units finished and the report was aggregated.
    Completed {
        batch_id: String,
        processed: usize,
        cleaned: usize,
        skipped: usize,
        failed: usize,
        total_removed: usize,
        duration_ms: u64,
    },
}

impl BatchEvent {
    pub fn description(&self) -> &str {
        match self {
            BatchEvent::Started { .. } => "Batch run started",
            BatchEvent::FileProcessed { .. } => "File processed",
            BatchEvent::Completed { .. } => "Batch run completed",
        }
    }
}

// ============================================================================
// Session Events
// ============================================================================

/// Events emitted by an upload session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SessionEvent {
    /// An uploaded file was stored and registered.
    FileIngested {
        working_key: String,
        original_name: String,
        has_lyrics: bool,
    },
    /// The session registry and working directories were emptied.
    Cleared { entries_removed: usize },
}

impl SessionEvent {
    pub fn description(&self) -> &str {
        match self {
            SessionEvent::FileIngested { .. } => "File ingested",
            SessionEvent::Cleared { .. } => "Session cleared",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to core events.
///
/// Cloning the bus is cheap; all clones share one channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum number of events to buffer per subscriber.
    ///   When a subscriber falls behind by more than this amount, it will
    ///   receive a `RecvError::Lagged` error.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event.
    /// Returns an error if there are no active subscribers.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber to receive events.
    ///
    /// Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with optional filtering.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let event_bus = EventBus::default();
/// let batch_only = EventStream::new(event_bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Batch(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    /// Creates a new event stream from a receiver.
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Adds a filter function to this stream.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter (if any).
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without blocking.
    ///
    /// Returns `None` if no events are currently available.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
