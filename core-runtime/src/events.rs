//! # Event Bus System
//!
//! Provides an event-driven architecture for the media session core using `tokio::sync::broadcast`.
//! This module enables decoupled communication between core modules through typed events.
//!
//! ## Overview
//!
//! The event bus system consists of:
//! - **Event Types**: Strongly-typed enum hierarchies for different domains
//! - **EventBus**: Central broadcast channel for publishing events
//! - **EventStream**: Wrapper for consuming events with filtering
//! - **Subscription Management**: Multiple subscribers can listen independently
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     emit      ┌───────────┐
//! │ Session Ctrl├──────────────>│           │
//! └─────────────┘               │           │
//!                               │ EventBus  │
//! ┌─────────────┐     emit      │ (broadcast│     subscribe    ┌────────────┐
//! │Queue Changes├──────────────>│  channel) ├─────────────────>│ Subscriber │
//! └─────────────┘               │           │                  └────────────┘
//!                               │           │
//! ┌─────────────┐     emit      │           │     subscribe    ┌────────────┐
//! │Catalog Load ├──────────────>│           ├─────────────────>│ Subscriber │
//! └─────────────┘               └───────────┘                  └────────────┘
//! ```
//!
//! ## Usage
//!
//! ### Creating an Event Bus
//!
//! ```rust
//! use core_runtime::events::EventBus;
//!
//! let event_bus = EventBus::new(100); // Buffer size of 100 events
//! ```
//!
//! ### Publishing Events
//!
//! ```rust
//! use core_runtime::events::{EventBus, CoreEvent, SessionEvent};
//!
//! # let event_bus = EventBus::new(100);
//! let event = CoreEvent::Session(SessionEvent::Activated {
//!     session_id: "session-123".to_string(),
//! });
//!
//! event_bus.emit(event).ok();
//! ```
//!
//! ### Subscribing to Events
//!
//! ```rust
//! use core_runtime::events::{EventBus, CoreEvent};
//! use tokio::sync::broadcast::error::RecvError;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(100);
//! let mut stream = event_bus.subscribe();
//!
//! tokio::spawn(async move {
//!     loop {
//!         match stream.recv().await {
//!             Ok(event) => println!("Received: {:?}", event),
//!             Err(RecvError::Lagged(n)) => {
//!                 eprintln!("Missed {} events", n);
//!             }
//!             Err(RecvError::Closed) => break,
//!         }
//!     }
//! });
//! # }
//! ```
//!
//! ### Filtering Events
//!
//! ```rust
//! use core_runtime::events::{EventBus, CoreEvent, QueueEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(100);
//! let mut stream = event_bus.subscribe();
//!
//! tokio::spawn(async move {
//!     loop {
//!         if let Ok(event) = stream.recv().await {
//!             // Filter for queue events only
//!             if matches!(event, CoreEvent::Queue(_)) {
//!                 println!("Queue event: {:?}", event);
//!             }
//!         }
//!     }
//! });
//! # }
//! ```
//!
//! ## Event Types
//!
//! ### Session Events
//! - `Activated`: Session controller started and accepting commands
//! - `Deactivated`: Session controller shut down
//! - `StateChanged`: Published playback state transitioned
//! - `TrackChanged`: Active queue entry changed
//!
//! ### Queue Events
//! - `Replaced`: A freshly built queue was installed
//! - `EntryAdded`: Single entry appended or inserted
//! - `EntryRemoved`: Entry removed by position or track id
//! - `EntriesSwapped`: Two entries exchanged positions
//! - `ShuffleChanged`: Shuffle flag toggled
//! - `RepeatChanged`: Repeat mode cycled
//! - `Cleared`: Queue emptied
//!
//! ### Catalog Events
//! - `LoadStarted`: Catalog retrieval began
//! - `Ready`: Catalog finished loading
//! - `LoadFailed`: Catalog retrieval failed
//!
//! ### Engine Events
//! - `Switched`: Active playback backend replaced
//! - `Fault`: Engine reported an unrecoverable error
//!
//! ## Error Handling
//!
//! The event bus uses `tokio::sync::broadcast`, which can produce two types of errors:
//!
//! - **`RecvError::Lagged(n)`**: Subscriber was too slow and missed `n` events.
//!   This is non-fatal; the subscriber can continue receiving new events.
//! - **`RecvError::Closed`**: All senders have been dropped. This indicates shutdown.
//!
//! Subscribers should handle `Lagged` gracefully and treat `Closed` as a signal to exit.
//!
//! ## Performance Considerations
//!
//! - **Buffer Size**: Choose an appropriate buffer size based on expected event volume.
//!   Too small causes lagging; too large wastes memory.
//! - **Slow Subscribers**: Slow subscribers receive `Lagged` errors but don't block fast ones.
//! - **Cloning**: Events are cloned for each subscriber. Keep event payloads lightweight.
//! - **Async Overhead**: Event delivery is async but very fast (microseconds).
//!
//! ## Thread Safety
//!
//! The event bus is fully thread-safe (`Send + Sync`). It can be safely shared across
//! async tasks using `Arc`:
//!
//! ```no_run
//! use std::sync::Arc;
//! use core_runtime::events::EventBus;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = Arc::new(EventBus::new(100));
//! let bus_clone = Arc::clone(&event_bus);
//!
//! tokio::spawn(async move {
//!     // Use bus_clone in spawned task
//! });
//! # }
//! ```

use engine_traits::PlaybackState;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

// Re-export commonly used types
pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
///
/// This value balances memory usage with the ability to handle bursts of events.
/// Subscribers that can't keep up will receive `RecvError::Lagged`.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
///
/// This is the main event type published and received through the event bus.
/// It wraps domain-specific event types for different modules.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Session lifecycle and playback status events
    Session(SessionEvent),
    /// Play queue mutation events
    Queue(QueueEvent),
    /// Catalog loading events
    Catalog(CatalogEvent),
    /// Playback engine events
    Engine(EngineEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Session(e) => e.description(),
            CoreEvent::Queue(e) => e.description(),
            CoreEvent::Catalog(e) => e.description(),
            CoreEvent::Engine(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Catalog(CatalogEvent::LoadFailed { .. }) => EventSeverity::Error,
            CoreEvent::Engine(EngineEvent::Fault { .. }) => EventSeverity::Error,
            CoreEvent::Session(SessionEvent::StateChanged {
                state: PlaybackState::Error { .. },
            }) => EventSeverity::Error,
            CoreEvent::Session(SessionEvent::Activated { .. }) => EventSeverity::Info,
            CoreEvent::Session(SessionEvent::Deactivated { .. }) => EventSeverity::Info,
            CoreEvent::Queue(QueueEvent::Replaced { .. }) => EventSeverity::Info,
            CoreEvent::Catalog(CatalogEvent::Ready { .. }) => EventSeverity::Info,
            CoreEvent::Engine(EngineEvent::Switched { .. }) => EventSeverity::Info,
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
// Session Events
// ============================================================================

/// Events related to session lifecycle and published playback status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SessionEvent {
    /// Session controller started and is accepting commands.
    Activated {
        /// The session ID.
        session_id: String,
    },
    /// Session controller shut down and released its engine.
    Deactivated {
        /// The session ID.
        session_id: String,
        /// Why the session ended (e.g., "shutdown requested", "idle timeout").
        reason: String,
    },
    /// The published playback state changed.
    StateChanged {
        /// The new playback state.
        state: PlaybackState,
    },
    /// The active queue entry changed.
    TrackChanged {
        /// The track ID now active.
        track_id: String,
        /// Track title.
        title: String,
        /// Position of the entry in the queue.
        index: usize,
    },
}

impl SessionEvent {
    fn description(&self) -> &str {
        match self {
            SessionEvent::Activated { .. } => "Session activated",
            SessionEvent::Deactivated { .. } => "Session deactivated",
            SessionEvent::StateChanged { .. } => "Playback state changed",
            SessionEvent::TrackChanged { .. } => "Active track changed",
        }
    }
}

// ============================================================================
// Queue Events
// ============================================================================

/// Events related to play queue mutations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum QueueEvent {
    /// A freshly built queue replaced the previous one.
    Replaced {
        /// Display title of the new queue (e.g., album name, "Random mix").
        title: String,
        /// Number of entries in the new queue.
        entries: usize,
    },
    /// A single entry was appended or inserted.
    EntryAdded {
        /// Stable ID assigned to the new entry.
        stable_id: u64,
        /// The track ID of the entry.
        track_id: String,
        /// Whether the entry was inserted right after the current one.
        play_next: bool,
    },
    /// An entry was removed.
    EntryRemoved {
        /// Stable ID of the removed entry.
        stable_id: u64,
    },
    /// Two entries exchanged positions.
    EntriesSwapped {
        /// First position involved in the swap.
        pos_a: usize,
        /// Second position involved in the swap.
        pos_b: usize,
    },
    /// The shuffle flag was toggled.
    ShuffleChanged {
        /// Whether shuffle is now on.
        shuffling: bool,
    },
    /// The repeat mode was cycled or set.
    RepeatChanged {
        /// The new repeat mode ("none", "all", "one").
        mode: String,
    },
    /// The queue was emptied.
    Cleared {
        /// Why the queue was cleared (e.g., "all entries removed").
        reason: String,
    },
}

impl QueueEvent {
    fn description(&self) -> &str {
        match self {
            QueueEvent::Replaced { .. } => "Queue replaced",
            QueueEvent::EntryAdded { .. } => "Queue entry added",
            QueueEvent::EntryRemoved { .. } => "Queue entry removed",
            QueueEvent::EntriesSwapped { .. } => "Queue entries swapped",
            QueueEvent::ShuffleChanged { .. } => "Shuffle mode changed",
            QueueEvent::RepeatChanged { .. } => "Repeat mode changed",
            QueueEvent::Cleared { .. } => "Queue cleared",
        }
    }
}

// ============================================================================
// Catalog Events
// ============================================================================

/// Events related to catalog loading.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum CatalogEvent {
    /// Catalog retrieval began.
    LoadStarted,
    /// Catalog finished loading and is queryable.
    Ready {
        /// Number of tracks in the loaded catalog.
        tracks: usize,
    },
    /// Catalog retrieval failed; a later request will retry.
    LoadFailed {
        /// Human-readable error message.
        message: String,
    },
}

impl CatalogEvent {
    fn description(&self) -> &str {
        match self {
            CatalogEvent::LoadStarted => "Catalog load started",
            CatalogEvent::Ready { .. } => "Catalog ready",
            CatalogEvent::LoadFailed { .. } => "Catalog load failed",
        }
    }
}

// ============================================================================
// Engine Events
// ============================================================================

/// Events related to the playback engine backing the session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum EngineEvent {
    /// The active playback backend was replaced.
    Switched {
        /// Name of the outgoing engine.
        from: String,
        /// Name of the incoming engine.
        to: String,
    },
    /// The engine reported an error signal.
    Fault {
        /// Human-readable error message.
        message: String,
    },
}

impl EngineEvent {
    fn description(&self) -> &str {
        match self {
            EngineEvent::Switched { .. } => "Playback engine switched",
            EngineEvent::Fault { .. } => "Playback engine fault",
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
/// - Non-blocking sends (events are cloned for each subscriber)
/// - Lagging detection (slow subscribers get `RecvError::Lagged`)
///
/// # Example
///
/// ```rust
/// use core_runtime::events::{EventBus, CoreEvent, SessionEvent};
///
/// # #[tokio::main]
/// # async fn main() {
/// let event_bus = EventBus::new(100);
///
/// // Subscribe to events
/// let mut subscriber1 = event_bus.subscribe();
/// let mut subscriber2 = event_bus.subscribe();
///
/// // Emit an event
/// let event = CoreEvent::Session(SessionEvent::Activated {
///     session_id: "session-123".to_string(),
/// });
/// event_bus.emit(event).ok();
///
/// // Both subscribers receive the event
/// # tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;
/// # }
/// ```
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
    ///
    /// # Example
    ///
    /// ```rust
    /// use core_runtime::events::EventBus;
    ///
    /// let event_bus = EventBus::new(100);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Creates a new event bus with the default buffer size.
    ///
    /// # Example
    ///
    /// ```rust
    /// use core_runtime::events::EventBus;
    ///
    /// let event_bus = EventBus::default();
    /// ```
    #[allow(clippy::should_implement_trait)]
    pub fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event.
    /// Returns an error if there are no active subscribers.
    ///
    /// # Example
    ///
    /// ```rust
    /// use core_runtime::events::{EventBus, CoreEvent, CatalogEvent};
    ///
    /// let event_bus = EventBus::new(100);
    /// let event = CoreEvent::Catalog(CatalogEvent::Ready { tracks: 512 });
    ///
    /// match event_bus.emit(event) {
    ///     Ok(n) => println!("Event sent to {} subscribers", n),
    ///     Err(_) => println!("No active subscribers"),
    /// }
    /// ```
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber to receive events.
    ///
    /// Each call creates an independent receiver that will receive all future events.
    /// Past events are not replayed.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use core_runtime::events::EventBus;
    ///
    /// # #[tokio::main]
    /// # async fn main() {
    /// let event_bus = EventBus::new(100);
    /// let mut subscriber = event_bus.subscribe();
    ///
    /// tokio::spawn(async move {
    ///     while let Ok(event) = subscriber.recv().await {
    ///         println!("Received: {:?}", event);
    ///     }
    /// });
    /// # }
    /// ```
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    ///
    /// # Example
    ///
    /// ```rust
    /// use core_runtime::events::EventBus;
    ///
    /// let event_bus = EventBus::new(100);
    /// assert_eq!(event_bus.subscriber_count(), 0);
    ///
    /// let _subscriber = event_bus.subscribe();
    /// assert_eq!(event_bus.subscriber_count(), 1);
    /// ```
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
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

/// A wrapper around `broadcast::Receiver` with additional filtering capabilities.
///
/// This provides a more ergonomic API for consuming events with optional filtering
/// by event type or severity.
///
/// # Example
///
/// ```rust
/// use core_runtime::events::{EventBus, EventStream, CoreEvent};
///
/// # #[tokio::main]
/// # async fn main() {
/// let event_bus = EventBus::new(100);
/// let stream = EventStream::new(event_bus.subscribe());
///
/// // Filter for session events only
/// let mut session_stream = stream.filter(|event| {
///     matches!(event, CoreEvent::Session(_))
/// });
/// # }
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
    ///
    /// Only events that match the filter will be returned by `recv()`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use core_runtime::events::{EventBus, EventStream, CoreEvent};
    ///
    /// let event_bus = EventBus::new(100);
    /// let stream = EventStream::new(event_bus.subscribe());
    ///
    /// let queue_stream = stream.filter(|event| {
    ///     matches!(event, CoreEvent::Queue(_))
    /// });
    /// ```
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    /// Receives the next event that passes the filter (if any).
    ///
    /// This will skip events that don't match the filter and return the next matching event.
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;

            // If no filter, return immediately
            let Some(filter) = &self.filter else {
                return Ok(event);
            };

            // Apply filter
            if filter(&event) {
                return Ok(event);
            }

            // Event didn't match filter, continue to next event
        }
    }

    /// Attempts to receive an event without blocking.
    ///
    /// Returns `None` if no events are currently available.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    // If no filter, return immediately
                    let Some(filter) = &self.filter else {
                        return Some(Ok(event));
                    };

                    // Apply filter
                    if filter(&event) {
                        return Some(Ok(event));
                    }

                    // Event didn't match filter, continue
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

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_event_bus_creation() {
        let bus = EventBus::new(10);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_event_bus_subscription() {
        let bus = EventBus::new(10);
        let _sub1 = bus.subscribe();
        let _sub2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[tokio::test]
    async fn test_event_emission_no_subscribers() {
        let bus = EventBus::new(10);
        let event = CoreEvent::Session(SessionEvent::Deactivated {
            session_id: "test".to_string(),
            reason: "shutdown requested".to_string(),
        });

        // Should error when no subscribers
        assert!(bus.emit(event).is_err());
    }

    #[tokio::test]
    async fn test_event_emission_with_subscribers() {
        let bus = EventBus::new(10);
        let mut sub = bus.subscribe();

        let event = CoreEvent::Session(SessionEvent::Activated {
            session_id: "session-1".to_string(),
        });

        // Emit event
        let result = bus.emit(event.clone());
        assert!(result.is_ok());
        assert_eq!(result.unwrap(), 1);

        // Subscriber should receive it
        let received = sub.recv().await.unwrap();
        assert_eq!(received, event);
    }

    #[tokio::test]
    async fn test_multiple_subscribers_receive_same_event() {
        let bus = EventBus::new(10);
        let mut sub1 = bus.subscribe();
        let mut sub2 = bus.subscribe();

        let event = CoreEvent::Queue(QueueEvent::Replaced {
            title: "Greatest Hits".to_string(),
            entries: 12,
        });

        bus.emit(event.clone()).ok();

        // Both should receive the event
        let received1 = sub1.recv().await.unwrap();
        let received2 = sub2.recv().await.unwrap();

        assert_eq!(received1, event);
        assert_eq!(received2, event);
    }

    #[tokio::test]
    async fn test_event_stream_without_filter() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe());

        let event = CoreEvent::Session(SessionEvent::TrackChanged {
            track_id: "track-1".to_string(),
            title: "Test Track".to_string(),
            index: 0,
        });

        bus.emit(event.clone()).ok();

        let received = stream.recv().await.unwrap();
        assert_eq!(received, event);
    }

    #[tokio::test]
    async fn test_event_stream_with_filter() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe())
            .filter(|event| matches!(event, CoreEvent::Session(_)));

        // Emit non-session event (should be filtered out)
        let queue_event = CoreEvent::Queue(QueueEvent::ShuffleChanged { shuffling: true });
        bus.emit(queue_event).ok();

        // Emit session event (should pass through)
        let session_event = CoreEvent::Session(SessionEvent::StateChanged {
            state: PlaybackState::Playing,
        });
        bus.emit(session_event.clone()).ok();

        // Should only receive the session event
        let received = stream.recv().await.unwrap();
        assert_eq!(received, session_event);
    }

    #[tokio::test]
    async fn test_lagged_subscriber() {
        let bus = EventBus::new(2); // Very small buffer
        let mut sub = bus.subscribe();

        // Emit more events than buffer size
        for i in 0..5 {
            let event = CoreEvent::Queue(QueueEvent::EntryAdded {
                stable_id: i,
                track_id: format!("track-{}", i),
                play_next: false,
            });
            bus.emit(event).ok();
        }

        // First recv should indicate lagging
        let result = sub.recv().await;
        assert!(matches!(result, Err(RecvError::Lagged(_))));
    }

    #[tokio::test]
    async fn test_event_severity() {
        let error_event = CoreEvent::Catalog(CatalogEvent::LoadFailed {
            message: "source offline".to_string(),
        });
        assert_eq!(error_event.severity(), EventSeverity::Error);

        let state_error = CoreEvent::Session(SessionEvent::StateChanged {
            state: PlaybackState::Error {
                message: "decoder died".to_string(),
            },
        });
        assert_eq!(state_error.severity(), EventSeverity::Error);

        let info_event = CoreEvent::Engine(EngineEvent::Switched {
            from: "local".to_string(),
            to: "receiver".to_string(),
        });
        assert_eq!(info_event.severity(), EventSeverity::Info);

        let debug_event = CoreEvent::Queue(QueueEvent::EntriesSwapped { pos_a: 1, pos_b: 3 });
        assert_eq!(debug_event.severity(), EventSeverity::Debug);
    }

    #[tokio::test]
    async fn test_event_description() {
        let event = CoreEvent::Session(SessionEvent::Activated {
            session_id: "session-1".to_string(),
        });
        assert_eq!(event.description(), "Session activated");
    }

    #[tokio::test]
    async fn test_concurrent_publishers() {
        let bus = EventBus::new(100);
        let mut sub = bus.subscribe();

        let bus1 = bus.clone();
        let bus2 = bus.clone();

        // Spawn two concurrent publishers
        let handle1 = tokio::spawn(async move {
            for i in 0..10 {
                let event = CoreEvent::Queue(QueueEvent::EntryAdded {
                    stable_id: i,
                    track_id: format!("track-{}", i),
                    play_next: false,
                });
                bus1.emit(event).ok();
            }
        });

        let handle2 = tokio::spawn(async move {
            for i in 0..10u64 {
                let event = CoreEvent::Session(SessionEvent::TrackChanged {
                    track_id: format!("track-{}", i),
                    title: format!("Track {}", i),
                    index: i as usize,
                });
                bus2.emit(event).ok();
            }
        });

        // Wait for publishers
        handle1.await.ok();
        handle2.await.ok();

        // Should have received 20 events
        let mut count = 0;
        while sub.try_recv().is_ok() {
            count += 1;
        }
        assert_eq!(count, 20);
    }

    #[tokio::test]
    async fn test_event_serialization() {
        let event = CoreEvent::Queue(QueueEvent::RepeatChanged {
            mode: "one".to_string(),
        });

        // Serialize to JSON
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"Queue\""));
        assert!(json.contains("RepeatChanged"));

        // Deserialize back
        let deserialized: CoreEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, event);
    }

    #[tokio::test]
    async fn test_state_payload_serialization() {
        let event = CoreEvent::Session(SessionEvent::StateChanged {
            state: PlaybackState::Error {
                message: "receiver lost".to_string(),
            },
        });

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"state\":\"error\""));
        assert!(json.contains("receiver lost"));

        let deserialized: CoreEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, event);
    }

    #[test]
    fn test_event_cloning() {
        let event = CoreEvent::Catalog(CatalogEvent::Ready { tracks: 42 });

        let cloned = event.clone();
        assert_eq!(event, cloned);
    }

    #[tokio::test]
    async fn test_try_recv_empty() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe());

        // Should return None when no events
        assert!(stream.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_try_recv_with_event() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe());

        let event = CoreEvent::Engine(EngineEvent::Fault {
            message: "output device unplugged".to_string(),
        });

        bus.emit(event.clone()).ok();

        // Give time for event to propagate
        tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;

        // Should receive the event
        let result = stream.try_recv();
        assert!(result.is_some());
        let received = result.unwrap().unwrap();
        assert_eq!(received, event);
    }
}
