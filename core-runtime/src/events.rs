//! # Event Bus System
//!
//! Decoupled communication between core modules using `tokio::sync::broadcast`.
//!
//! ## Overview
//!
//! Every state change a host shell could care about flows through one typed
//! channel: authentication transitions, media snapshot replacements, upload
//! progress, and the interaction bracketing that suspends/resumes the
//! carousel animation. Producers fire and forget; any number of subscribers
//! listen independently.
//!
//! ```text
//! ┌──────────────┐    emit     ┌───────────┐
//! │ AuthManager  ├────────────>│           │
//! └──────────────┘             │           │
//! ┌──────────────┐    emit     │ EventBus  │   subscribe   ┌────────────┐
//! │ Coordinators ├────────────>│ (broadcast├──────────────>│ Host shell │
//! └──────────────┘             │  channel) │               └────────────┘
//! ┌──────────────┐    emit     │           │   subscribe   ┌────────────┐
//! │ Synchronizer ├────────────>│           ├──────────────>│ Animator   │
//! └──────────────┘             └───────────┘               │ relay      │
//!                                                          └────────────┘
//! ```
//!
//! ## Error Handling
//!
//! `tokio::sync::broadcast` surfaces two receiver errors:
//!
//! - **`RecvError::Lagged(n)`**: the subscriber missed `n` events. Non-fatal;
//!   keep receiving.
//! - **`RecvError::Closed`**: all senders dropped; treat as shutdown.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

// Re-export commonly used types
pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
///
/// Upload progress is the chattiest producer; one event per chunk boundary
/// fits comfortably in this window for any realistic file.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Authentication-related events
    Auth(AuthEvent),
    /// Media collection events
    Media(MediaEvent),
    /// Upload pipeline events
    Upload(UploadEvent),
    /// Carousel interaction bracketing
    Interaction(InteractionEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Auth(e) => e.description(),
            CoreEvent::Media(e) => e.description(),
            CoreEvent::Upload(e) => e.description(),
            CoreEvent::Interaction(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Auth(AuthEvent::AuthError { .. }) => EventSeverity::Error,
            CoreEvent::Upload(UploadEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Auth(AuthEvent::SignedIn { .. }) => EventSeverity::Info,
            CoreEvent::Media(MediaEvent::SettingsPublished { .. }) => EventSeverity::Info,
            CoreEvent::Upload(UploadEvent::Completed { .. }) => EventSeverity::Info,
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
// Authentication Events
// ============================================================================

/// Events related to operator authentication.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event")]
pub enum AuthEvent {
    /// Sign-in attempt started.
    SigningIn {
        /// E-mail the operator is signing in with.
        email: String,
    },
    /// Operator successfully authenticated.
    SignedIn {
        /// Backend-assigned user identifier.
        user_id: String,
        /// Authenticated e-mail address.
        email: String,
    },
    /// Operator signed out.
    SignedOut {
        /// The user that was signed out.
        user_id: String,
    },
    /// Authentication failed.
    ///
    /// The message is deliberately generic: callers cannot distinguish an
    /// unknown account from a wrong password.
    AuthError {
        /// Human-readable (generic) error message.
        message: String,
    },
}

impl AuthEvent {
    fn description(&self) -> &str {
        match self {
            AuthEvent::SigningIn { .. } => "Sign-in in progress",
            AuthEvent::SignedIn { .. } => "Operator signed in",
            AuthEvent::SignedOut { .. } => "Operator signed out",
            AuthEvent::AuthError { .. } => "Authentication failed",
        }
    }
}

// ============================================================================
// Media Events
// ============================================================================

/// Events related to the remote media collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event")]
pub enum MediaEvent {
    /// A fresh ordered snapshot replaced the canonical list.
    SnapshotApplied {
        /// Number of items in the canonical list.
        item_count: usize,
    },
    /// A drag gesture was committed as a new persisted order.
    Reordered {
        /// The moved media document id.
        id: String,
        /// Index it was dragged from.
        from: usize,
        /// Index it landed on.
        to: usize,
    },
    /// A media item and its blob were removed.
    Deleted {
        /// The removed media document id.
        id: String,
    },
    /// The shared slide duration was published.
    SettingsPublished {
        /// New per-slide dwell time in seconds.
        slide_duration_secs: u32,
    },
}

impl MediaEvent {
    fn description(&self) -> &str {
        match self {
            MediaEvent::SnapshotApplied { .. } => "Media snapshot applied",
            MediaEvent::Reordered { .. } => "Media order committed",
            MediaEvent::Deleted { .. } => "Media item deleted",
            MediaEvent::SettingsPublished { .. } => "Slide duration published",
        }
    }
}

// ============================================================================
// Upload Events
// ============================================================================

/// Events emitted by the upload pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event")]
pub enum UploadEvent {
    /// Transfer started for the given slot.
    Started {
        /// Slot index being filled (always the next empty one).
        slot: usize,
        /// Original file name.
        file_name: String,
    },
    /// Fractional transfer progress.
    Progress {
        /// Progress in `[0, 1]`, reported at chunk boundaries.
        fraction: f64,
    },
    /// Transfer finished and the media record exists.
    Completed {
        /// Backend id of the new media document.
        id: String,
        /// Slot that was filled.
        slot: usize,
    },
    /// Transfer aborted; no record was created.
    Failed {
        /// Human-readable error message.
        message: String,
    },
}

impl UploadEvent {
    fn description(&self) -> &str {
        match self {
            UploadEvent::Started { .. } => "Upload started",
            UploadEvent::Progress { .. } => "Upload progress",
            UploadEvent::Completed { .. } => "Upload completed",
            UploadEvent::Failed { .. } => "Upload failed",
        }
    }
}

// ============================================================================
// Interaction Events
// ============================================================================

/// What kind of user action suspended the carousel.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum InteractionKind {
    Reorder,
    Delete,
    Upload,
}

impl fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InteractionKind::Reorder => "reorder",
            InteractionKind::Delete => "delete",
            InteractionKind::Upload => "upload",
        };
        f.write_str(name)
    }
}

/// Bracketing events around any operation that invalidates carousel
/// positions or visuals.
///
/// `Started` fires the moment the operation begins; `Ended` fires a fixed
/// settle delay after it resolves (successfully or not), so the realtime
/// snapshot triggered by the write lands before animation resumes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event")]
pub enum InteractionEvent {
    /// Carousel must suspend.
    Started {
        /// The triggering operation.
        kind: InteractionKind,
    },
    /// Settle delay elapsed; carousel may resume.
    Ended,
}

impl InteractionEvent {
    fn description(&self) -> &str {
        match self {
            InteractionEvent::Started { .. } => "Interaction started",
            InteractionEvent::Ended => "Interaction ended",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Uses `tokio::sync::broadcast` internally, which provides:
/// - Multiple producers (clone the `EventBus`)
/// - Multiple consumers (each `subscribe()` creates a new receiver)
/// - Non-blocking sends (events are cloned per subscriber)
/// - Lagging detection (slow subscribers get `RecvError::Lagged`)
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an
    /// error when there are none. Producers generally `.ok()` the result:
    /// an unobserved event is not a failure.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber to receive events.
    ///
    /// Each call creates an independent receiver that sees all future
    /// events. Past events are not replayed.
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

/// Type alias for event filter functions.
type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with optional filtering.
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

    /// Adds a filter; only matching events are returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    /// Receives the next event that passes the filter (if any).
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n`
    /// events, `RecvError::Closed` once all senders are gone.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;

            let Some(filter) = &self.filter else {
                return Ok(event);
            };

            if filter(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without blocking.
    ///
    /// Returns `None` if no matching events are currently available.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    let Some(filter) = &self.filter else {
                        return Some(Ok(event));
                    };

                    if filter(&event) {
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
