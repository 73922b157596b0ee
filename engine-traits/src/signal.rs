//! # Engine Signal Channel
//!
//! Engines report asynchronous status back to their owner through a one-way
//! signal channel. The owner keeps the receiving half and folds incoming
//! signals into its own serialized command stream; the engine holds a
//! cloneable [`SignalSink`] and fires signals from whatever task or thread
//! its playback machinery runs on.
//!
//! The channel is unbounded: signals are small and infrequent, and an engine
//! must never block on a slow consumer mid-playback.

use crate::playback::PlaybackState;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Asynchronous status report from a playback engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "signal", rename_all = "snake_case")]
pub enum EngineSignal {
    /// The current track played to its end.
    Completed,
    /// The engine's playback state changed.
    StateChanged { state: PlaybackState },
    /// The engine hit a fault (decode error, connectivity loss, ...).
    Error { message: String },
    /// The engine resolved or switched its current track. Remote engines
    /// emit this when the receiver side changes tracks on its own.
    TrackLoaded { track_id: String },
}

/// Sending half handed to an engine via [`PlaybackEngine::bind`].
///
/// Cloneable and cheap; safe to fire from any thread. Sending after the
/// receiver is gone is not an error; the signal is dropped and logged at
/// debug level, which covers the engine-switch window where an outgoing
/// engine may still flush a late signal.
///
/// [`PlaybackEngine::bind`]: crate::playback::PlaybackEngine::bind
#[derive(Debug, Clone)]
pub struct SignalSink {
    tx: mpsc::UnboundedSender<EngineSignal>,
}

impl SignalSink {
    /// Fire a signal at the owning controller.
    pub fn send(&self, signal: EngineSignal) {
        if self.tx.send(signal).is_err() {
            tracing::debug!("engine signal dropped, receiver closed");
        }
    }

    /// A sink wired to nothing. Useful as an engine's initial state before
    /// an owner binds it.
    pub fn disconnected() -> Self {
        let (tx, _rx) = mpsc::unbounded_channel();
        Self { tx }
    }
}

/// Receiving half kept by the engine's owner.
#[derive(Debug)]
pub struct SignalStream {
    rx: mpsc::UnboundedReceiver<EngineSignal>,
}

impl SignalStream {
    /// Wait for the next signal. Returns `None` once every associated
    /// [`SignalSink`] has been dropped.
    pub async fn recv(&mut self) -> Option<EngineSignal> {
        self.rx.recv().await
    }
}

/// Create a connected sink/stream pair.
pub fn signal_channel() -> (SignalSink, SignalStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    (SignalSink { tx }, SignalStream { rx })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn signals_arrive_in_order() {
        let (sink, mut stream) = signal_channel();

        sink.send(EngineSignal::StateChanged {
            state: PlaybackState::Playing,
        });
        sink.send(EngineSignal::Completed);

        assert_eq!(
            stream.recv().await,
            Some(EngineSignal::StateChanged {
                state: PlaybackState::Playing
            })
        );
        assert_eq!(stream.recv().await, Some(EngineSignal::Completed));
    }

    #[tokio::test]
    async fn cloned_sinks_share_the_stream() {
        let (sink, mut stream) = signal_channel();
        let other = sink.clone();

        other.send(EngineSignal::Error {
            message: "decode failure".to_string(),
        });

        assert_eq!(
            stream.recv().await,
            Some(EngineSignal::Error {
                message: "decode failure".to_string()
            })
        );
    }

    #[test]
    fn send_after_receiver_dropped_is_silent() {
        let (sink, stream) = signal_channel();
        drop(stream);

        // Must not panic or error.
        sink.send(EngineSignal::Completed);
    }

    #[test]
    fn disconnected_sink_swallows_signals() {
        let sink = SignalSink::disconnected();
        sink.send(EngineSignal::Completed);
    }

    #[test]
    fn signal_serialization_round_trip() {
        let signal = EngineSignal::TrackLoaded {
            track_id: "track-42".to_string(),
        };

        let json = serde_json::to_string(&signal).unwrap();
        assert!(json.contains("track_loaded"));

        let back: EngineSignal = serde_json::from_str(&json).unwrap();
        assert_eq!(back, signal);
    }
}
