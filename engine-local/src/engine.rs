//! # Local Playback Engine
//!
//! Reference [`PlaybackEngine`] backed by the runtime clock instead of an
//! audio pipeline: `play` anchors a simulated timeline at the requested
//! start position and `position_ms` reads it back, while a small watcher
//! task fires [`EngineSignal::Completed`] once the timeline crosses the
//! track duration. Decoding and output are out of scope; this engine
//! exists to drive the session stack end to end and to stand in for real
//! backends in demos.
//!
//! ## Timeline model
//!
//! The position is `played_ms` plus, while playing, the clock time since
//! the last anchor. Pause, stop and seek fold the running span back into
//! `played_ms`, so position survives pauses and stops and feeds the
//! controller's resume path. A request without a known duration plays
//! until told otherwise; it never completes on its own.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use engine_traits::{
    EngineError, EngineSignal, PlaybackEngine, PlaybackMetadata, PlaybackRequest, PlaybackState,
    Result, SignalSink,
};

use crate::config::LocalEngineConfig;

// ============================================================================
// Timeline
// ============================================================================

/// Simulated stream clock. `resumed_at` is set while audio would be
/// rendering; time elapsed since then counts toward the position.
#[derive(Debug, Default)]
struct Timeline {
    played_ms: u64,
    resumed_at: Option<Instant>,
}

impl Timeline {
    fn position_ms(&self) -> u64 {
        let running = self
            .resumed_at
            .map(|anchor| anchor.elapsed().as_millis() as u64)
            .unwrap_or(0);
        self.played_ms + running
    }

    /// Fold the running span into `played_ms` and stop advancing.
    fn freeze(&mut self) {
        self.played_ms = self.position_ms();
        self.resumed_at = None;
    }

    /// Start advancing from the stored position.
    fn run(&mut self) {
        if self.resumed_at.is_none() {
            self.resumed_at = Some(Instant::now());
        }
    }

    /// Move to `position_ms`, keeping the running/frozen mode.
    fn reset_to(&mut self, position_ms: u64) {
        self.played_ms = position_ms;
        if self.resumed_at.is_some() {
            self.resumed_at = Some(Instant::now());
        }
    }
}

// ============================================================================
// Shared engine state
// ============================================================================

/// State shared between the engine facade and its watcher task.
#[derive(Debug)]
struct Shared {
    name: String,
    state: Mutex<PlaybackState>,
    timeline: Mutex<Timeline>,
    loaded: Mutex<Option<PlaybackMetadata>>,
    current_track_id: Mutex<Option<String>>,
    sink: Mutex<SignalSink>,
    watcher: Mutex<Option<CancellationToken>>,
}

impl Shared {
    fn sink(&self) -> SignalSink {
        self.sink.lock().clone()
    }

    /// Move to `next`, firing a `StateChanged` signal unless suppressed.
    /// Re-entering the current state is a silent no-op.
    fn transition(&self, next: PlaybackState, notify: bool) {
        {
            let mut state = self.state.lock();
            if *state == next {
                return;
            }
            debug!(engine = %self.name, from = %*state, to = %next, "Engine state transition");
            *state = next.clone();
        }
        if notify {
            self.sink().send(EngineSignal::StateChanged { state: next });
        }
    }

    fn cancel_watcher(&self) {
        if let Some(token) = self.watcher.lock().take() {
            token.cancel();
        }
    }
}

// ============================================================================
// LocalEngine
// ============================================================================

/// In-process playback backend simulating its timeline on the runtime
/// clock. See the module docs for the timeline model.
#[derive(Debug)]
pub struct LocalEngine {
    config: LocalEngineConfig,
    shared: Arc<Shared>,
}

impl LocalEngine {
    /// Create an engine with the given configuration, rejecting
    /// configurations that fail [`LocalEngineConfig::validate`].
    pub fn new(config: LocalEngineConfig) -> Result<Self> {
        config.validate().map_err(EngineError::Config)?;
        let shared = Arc::new(Shared {
            name: config.name.clone(),
            state: Mutex::new(PlaybackState::Idle),
            timeline: Mutex::new(Timeline::default()),
            loaded: Mutex::new(None),
            current_track_id: Mutex::new(None),
            sink: Mutex::new(SignalSink::disconnected()),
            watcher: Mutex::new(None),
        });
        Ok(Self { config, shared })
    }

    /// Replace the completion watcher with one targeting `duration_ms`.
    ///
    /// The watcher polls the timeline every configured tick, so completion
    /// is reported within one tick of the true end. It freezes the
    /// timeline at the duration before signalling, leaving the engine
    /// awaiting its next instruction.
    fn spawn_watcher(&self, duration_ms: u64) {
        let token = CancellationToken::new();
        if let Some(previous) = self.shared.watcher.lock().replace(token.clone()) {
            previous.cancel();
        }

        let shared = Arc::clone(&self.shared);
        let tick = self.config.progress_tick;
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => return,
                    _ = tokio::time::sleep(tick) => {}
                }
                if !shared.state.lock().is_playing() {
                    continue;
                }
                {
                    let mut timeline = shared.timeline.lock();
                    // A replacement play cancels before it rewrites the
                    // timeline, so an uncancelled token means the timeline
                    // still belongs to this watcher
                    if token.is_cancelled() {
                        return;
                    }
                    if timeline.position_ms() < duration_ms {
                        continue;
                    }
                    timeline.freeze();
                    timeline.played_ms = duration_ms;
                }
                debug!(engine = %shared.name, duration_ms, "Track reached its end");
                shared.sink().send(EngineSignal::Completed);
                return;
            }
        });
    }
}

impl Default for LocalEngine {
    fn default() -> Self {
        Self::new(LocalEngineConfig::default())
            .expect("default LocalEngineConfig must be valid")
    }
}

impl Drop for LocalEngine {
    fn drop(&mut self) {
        self.shared.cancel_watcher();
    }
}

#[async_trait]
impl PlaybackEngine for LocalEngine {
    async fn start(&self) -> Result<()> {
        info!(engine = %self.shared.name, "Local engine started");
        if self.config.autoplay_on_start {
            let loaded = self.shared.loaded.lock().clone();
            if let Some(metadata) = loaded {
                debug!(
                    engine = %self.shared.name,
                    track_id = %metadata.track_id,
                    "Autoplay resuming loaded track"
                );
                self.shared.timeline.lock().run();
                self.shared.transition(PlaybackState::Playing, true);
                if let Some(duration_ms) = metadata.duration_ms {
                    self.spawn_watcher(duration_ms);
                }
            }
        }
        Ok(())
    }

    async fn stop(&self, notify: bool) -> Result<()> {
        self.shared.cancel_watcher();
        self.shared.timeline.lock().freeze();
        self.shared.transition(PlaybackState::Stopped, notify);
        Ok(())
    }

    async fn play(&self, request: PlaybackRequest) -> Result<()> {
        info!(
            engine = %self.shared.name,
            track_id = %request.metadata.track_id,
            title = %request.metadata.title,
            start_ms = request.start_position_ms,
            "Playing track"
        );
        self.shared.cancel_watcher();
        {
            let mut timeline = self.shared.timeline.lock();
            timeline.played_ms = request.start_position_ms;
            timeline.resumed_at = Some(Instant::now());
        }
        let duration_ms = request.metadata.duration_ms;
        *self.shared.loaded.lock() = Some(request.metadata);
        self.shared.transition(PlaybackState::Playing, true);
        match duration_ms {
            Some(duration_ms) => self.spawn_watcher(duration_ms),
            None => debug!(engine = %self.shared.name, "No duration, track will not self-complete"),
        }
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        if !self.is_playing() {
            debug!(engine = %self.shared.name, "Pause ignored, nothing playing");
            return Ok(());
        }
        self.shared.cancel_watcher();
        self.shared.timeline.lock().freeze();
        self.shared.transition(PlaybackState::Paused, true);
        Ok(())
    }

    async fn seek_to(&self, position_ms: u64) -> Result<()> {
        if self.shared.loaded.lock().is_none() {
            return Err(EngineError::OperationFailed(
                "nothing loaded to seek in".to_string(),
            ));
        }
        debug!(engine = %self.shared.name, position_ms, "Seeking");
        self.shared.timeline.lock().reset_to(position_ms);
        Ok(())
    }

    fn name(&self) -> &str {
        &self.shared.name
    }

    fn state(&self) -> PlaybackState {
        self.shared.state.lock().clone()
    }

    fn is_connected(&self) -> bool {
        true
    }

    fn is_playing(&self) -> bool {
        self.shared.state.lock().is_playing()
    }

    fn position_ms(&self) -> u64 {
        self.shared.timeline.lock().position_ms()
    }

    fn set_position_ms(&self, position_ms: u64) {
        self.shared.timeline.lock().reset_to(position_ms);
    }

    fn current_track_id(&self) -> Option<String> {
        self.shared.current_track_id.lock().clone()
    }

    fn set_current_track_id(&self, track_id: Option<String>) {
        *self.shared.current_track_id.lock() = track_id;
    }

    fn bind(&self, sink: SignalSink) {
        *self.shared.sink.lock() = sink;
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use engine_traits::{signal_channel, SignalStream};
    use std::time::Duration;
    use tokio::time::advance;

    fn engine() -> (LocalEngine, SignalStream) {
        engine_with(LocalEngineConfig::default())
    }

    fn engine_with(config: LocalEngineConfig) -> (LocalEngine, SignalStream) {
        let engine = LocalEngine::new(config).unwrap();
        let (sink, stream) = signal_channel();
        engine.bind(sink);
        (engine, stream)
    }

    fn request(track_id: &str, duration_ms: u64) -> PlaybackRequest {
        let mut metadata = PlaybackMetadata::new(track_id, format!("Track {}", track_id));
        if duration_ms > 0 {
            metadata = metadata.with_duration_ms(duration_ms);
        }
        PlaybackRequest::new(metadata)
    }

    #[test]
    fn new_rejects_invalid_config() {
        let err = LocalEngine::new(LocalEngineConfig::default().with_name("  ")).unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));

        let err =
            LocalEngine::new(LocalEngineConfig::default().with_progress_tick(Duration::ZERO))
                .unwrap_err();
        assert!(err.to_string().contains("progress_tick"));
    }

    #[tokio::test]
    async fn starts_idle_and_reports_identity() {
        let (engine, _stream) = engine();

        assert_eq!(engine.name(), "local");
        assert_eq!(engine.state(), PlaybackState::Idle);
        assert!(engine.is_connected());
        assert!(!engine.is_playing());
        assert_eq!(engine.position_ms(), 0);
        assert_eq!(engine.current_track_id(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn play_walks_the_timeline() {
        let (engine, mut stream) = engine();

        engine.play(request("t1", 10_000)).await.unwrap();
        assert_eq!(
            stream.recv().await,
            Some(EngineSignal::StateChanged {
                state: PlaybackState::Playing
            })
        );

        advance(Duration::from_secs(3)).await;
        assert_eq!(engine.position_ms(), 3_000);
        assert!(engine.is_playing());
    }

    #[tokio::test(start_paused = true)]
    async fn completion_fires_at_the_track_end() {
        let (engine, mut stream) = engine();

        engine.play(request("t1", 1_000)).await.unwrap();
        stream.recv().await; // the Playing transition

        advance(Duration::from_millis(1_250)).await;
        assert_eq!(stream.recv().await, Some(EngineSignal::Completed));
        // The watcher froze the timeline at the duration
        assert_eq!(engine.position_ms(), 1_000);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_freezes_position_until_resumed() {
        let (engine, mut stream) = engine();

        engine.play(request("t1", 60_000)).await.unwrap();
        stream.recv().await;
        advance(Duration::from_secs(2)).await;

        engine.pause().await.unwrap();
        assert_eq!(
            stream.recv().await,
            Some(EngineSignal::StateChanged {
                state: PlaybackState::Paused
            })
        );
        advance(Duration::from_secs(5)).await;
        assert_eq!(engine.position_ms(), 2_000);

        // Resume the way the controller does: replay from the held position
        let resume = request("t1", 60_000).with_start_position(engine.position_ms());
        engine.play(resume).await.unwrap();
        stream.recv().await;
        advance(Duration::from_secs(1)).await;
        assert_eq!(engine.position_ms(), 3_000);
    }

    #[tokio::test]
    async fn pause_without_playback_is_a_no_op() {
        let (engine, _stream) = engine();

        engine.pause().await.unwrap();
        assert_eq!(engine.state(), PlaybackState::Idle);

        engine.play(request("t1", 0)).await.unwrap();
        engine.stop(false).await.unwrap();
        engine.pause().await.unwrap();
        assert_eq!(engine.state(), PlaybackState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn seek_moves_the_timeline_and_can_complete() {
        let (engine, mut stream) = engine();

        engine.play(request("t1", 10_000)).await.unwrap();
        stream.recv().await;
        advance(Duration::from_secs(1)).await;

        engine.seek_to(8_000).await.unwrap();
        assert_eq!(engine.position_ms(), 8_000);

        advance(Duration::from_millis(500)).await;
        assert_eq!(engine.position_ms(), 8_500);

        advance(Duration::from_secs(2)).await;
        assert_eq!(stream.recv().await, Some(EngineSignal::Completed));
        assert_eq!(engine.position_ms(), 10_000);
    }

    #[tokio::test]
    async fn seek_with_nothing_loaded_is_refused() {
        let (engine, _stream) = engine();
        assert!(engine.seek_to(5_000).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn silent_stop_keeps_position_and_emits_nothing() {
        let (engine, mut stream) = engine();

        engine.play(request("t1", 60_000)).await.unwrap();
        stream.recv().await;
        advance(Duration::from_secs(4)).await;

        engine.stop(false).await.unwrap();
        assert_eq!(engine.state(), PlaybackState::Stopped);
        assert_eq!(engine.position_ms(), 4_000);

        // The next signal is the replay's Playing transition, proving the
        // stop put nothing on the channel
        engine.play(request("t1", 60_000).with_start_position(4_000)).await.unwrap();
        assert_eq!(
            stream.recv().await,
            Some(EngineSignal::StateChanged {
                state: PlaybackState::Playing
            })
        );
    }

    #[tokio::test]
    async fn notifying_stop_reports_the_transition() {
        let (engine, mut stream) = engine();

        engine.play(request("t1", 0)).await.unwrap();
        stream.recv().await;

        engine.stop(true).await.unwrap();
        assert_eq!(
            stream.recv().await,
            Some(EngineSignal::StateChanged {
                state: PlaybackState::Stopped
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn new_play_replaces_the_completion_watcher() {
        let (engine, mut stream) = engine();

        engine.play(request("short", 1_000)).await.unwrap();
        stream.recv().await;
        advance(Duration::from_millis(300)).await;

        engine.play(request("long", 10_000)).await.unwrap();
        advance(Duration::from_millis(1_500)).await;
        // Past the short track's end, but its watcher is gone
        assert_eq!(engine.position_ms(), 1_500);

        advance(Duration::from_millis(8_500)).await;
        assert_eq!(stream.recv().await, Some(EngineSignal::Completed));
        // Frozen at the long duration, so the short watcher never fired
        assert_eq!(engine.position_ms(), 10_000);
    }

    #[tokio::test(start_paused = true)]
    async fn autoplay_on_start_resumes_loaded_track() {
        let config = LocalEngineConfig::default().with_autoplay_on_start(true);
        let (engine, mut stream) = engine_with(config);

        engine.play(request("t1", 2_000)).await.unwrap();
        stream.recv().await;
        advance(Duration::from_millis(500)).await;
        engine.stop(false).await.unwrap();

        engine.start().await.unwrap();
        assert_eq!(
            stream.recv().await,
            Some(EngineSignal::StateChanged {
                state: PlaybackState::Playing
            })
        );
        advance(Duration::from_millis(1_750)).await;
        assert_eq!(stream.recv().await, Some(EngineSignal::Completed));
        assert_eq!(engine.position_ms(), 2_000);
    }

    #[tokio::test]
    async fn start_without_autoplay_stays_put() {
        let (engine, _stream) = engine();

        engine.play(request("t1", 0)).await.unwrap();
        engine.stop(false).await.unwrap();

        engine.start().await.unwrap();
        assert_eq!(engine.state(), PlaybackState::Stopped);
    }

    #[tokio::test]
    async fn priming_setters_round_trip() {
        let (engine, _stream) = engine();

        engine.set_position_ms(5_000);
        assert_eq!(engine.position_ms(), 5_000);

        engine.set_current_track_id(Some("ALBUM/a1|t1".to_string()));
        assert_eq!(engine.current_track_id(), Some("ALBUM/a1|t1".to_string()));

        engine.set_current_track_id(None);
        assert_eq!(engine.current_track_id(), None);
    }
}
