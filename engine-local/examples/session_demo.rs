//! # Full-Stack Session Demo
//!
//! Wires the whole playback stack together: a static in-memory catalog, a
//! local engine walking a simulated timeline, and the session controller
//! driving both. Tracks are a few seconds long so completions, automatic
//! queue advance and the engine switch all happen while you watch.
//!
//! Run with: `cargo run --example session_demo --package engine-local`

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::time::sleep;

use core_catalog::{
    Album, CatalogData, CatalogProvider, CategoryPath, MediaId, StaticCatalogSource, Track,
};
use core_runtime::events::EventBus;
use core_runtime::logging::{init_logging, LogFormat, LogLevel, LoggingConfig};
use core_session::{SearchFocus, SessionBuilder, SessionConfig, SessionHandle};
use engine_local::{LocalEngine, LocalEngineConfig};

// ============================================================================
// Demo catalog
// ============================================================================

/// A tiny library of short "jingle" tracks so end-of-track behavior shows
/// up within seconds.
fn demo_catalog() -> Arc<CatalogProvider> {
    let albums = vec![
        Album::new("a1", "Morning Loops", "The Daily Grind"),
        Album::new("a2", "Night Drives", "Neon Harbor"),
    ];
    let tracks = vec![
        Track::new("t1", "First Light", "The Daily Grind", "Morning Loops")
            .with_album_id("a1")
            .with_duration_ms(3_000)
            .with_source("file:///music/morning/first-light.ogg"),
        Track::new("t2", "Coffee Ring", "The Daily Grind", "Morning Loops")
            .with_album_id("a1")
            .with_duration_ms(4_000)
            .with_source("file:///music/morning/coffee-ring.ogg"),
        Track::new("t3", "Commute", "The Daily Grind", "Morning Loops")
            .with_album_id("a1")
            .with_duration_ms(3_500)
            .with_source("file:///music/morning/commute.ogg"),
        Track::new("t4", "Sodium Glow", "Neon Harbor", "Night Drives")
            .with_album_id("a2")
            .with_duration_ms(5_000)
            .with_source("file:///music/night/sodium-glow.ogg"),
        Track::new("t5", "Last Exit", "Neon Harbor", "Night Drives")
            .with_album_id("a2")
            .with_duration_ms(4_500)
            .with_source("file:///music/night/last-exit.ogg"),
    ];
    let data = CatalogData::new(albums, tracks);
    Arc::new(CatalogProvider::new(Arc::new(StaticCatalogSource::new(data))))
}

// ============================================================================
// Output helpers
// ============================================================================

async fn show_state(label: &str, handle: &SessionHandle) -> Result<()> {
    let snapshot = handle.current().await?;
    let state = snapshot.state;
    let track = state
        .track
        .as_ref()
        .map(|t| format!("{} by {}", t.title, t.artist))
        .unwrap_or_else(|| "(none)".to_string());
    println!(
        "🎚  {label}: {} | engine={} | track={} | pos={}ms | queue=\"{}\" ({} entries) | shuffle={} repeat={}",
        state.playback,
        state.engine,
        track,
        snapshot.position_ms,
        state.queue_title,
        state.queue.len(),
        state.shuffling,
        state.repeat.as_str(),
    );
    Ok(())
}

async fn show_queue(handle: &SessionHandle) -> Result<()> {
    let queue = handle.queue().await?;
    println!("📋 Queue \"{}\":", queue.title);
    for (index, entry) in queue.entries.iter().enumerate() {
        let marker = if queue.current_index == Some(index) { "▶" } else { " " };
        println!(
            "   {} [{}] #{} {} by {}",
            marker, entry.stable_id, index, entry.track.title, entry.track.artist
        );
    }
    Ok(())
}

// ============================================================================
// Main Demo
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    init_logging(
        LoggingConfig::default()
            .with_format(LogFormat::Compact)
            .with_level(LogLevel::Info)
            .with_target(false),
    )
    .expect("Failed to initialize logging");

    println!("🎵 Media Session Core - Full Stack Demo\n");

    let events = EventBus::new(64);
    let mut event_rx = events.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = event_rx.recv().await {
            println!("   📣 {}", event.description());
        }
    });

    let engine = Arc::new(LocalEngine::new(
        LocalEngineConfig::default().with_progress_tick(Duration::from_millis(100)),
    )?);
    let handle = SessionBuilder::new()
        .with_config(SessionConfig::default())
        .with_catalog(demo_catalog())
        .with_engine(engine)
        .with_events(events)
        .build()
        .await?;

    println!("✅ Session {} started\n", handle.session_id());

    // Play a whole album by its media id
    println!("▶️  Playing the \"Morning Loops\" album...");
    handle.play_from_id(MediaId::browse(CategoryPath::ByAlbum("a1".to_string())), false).await?;
    sleep(Duration::from_millis(800)).await;
    show_state("after play", &handle).await?;

    // Let the first short track run out; the controller advances on its own
    println!("\n⏳ Waiting for the first track to finish by itself...");
    sleep(Duration::from_millis(2_600)).await;
    show_state("after completion", &handle).await?;

    // Manual navigation and a pause
    println!("\n⏭  Skipping ahead, then pausing...");
    handle.skip_to_next().await?;
    sleep(Duration::from_millis(300)).await;
    handle.pause().await?;
    sleep(Duration::from_millis(300)).await;
    show_state("paused", &handle).await?;

    // Resume from the held position, then seek within the track
    println!("\n▶️  Resuming and seeking to 2s...");
    handle.play().await?;
    handle.seek_to(2_000).await?;
    sleep(Duration::from_millis(300)).await;
    show_state("after seek", &handle).await?;

    // Queue editing: one track next, then a whole artist's catalog at the end
    println!("\n➕ Queueing \"Last Exit\" next and all of Neon Harbor after...");
    handle
        .add_to_queue(MediaId::track(CategoryPath::AllTracks, "t5"), true)
        .await?;
    handle
        .add_to_queue(MediaId::browse(CategoryPath::ByArtist("Neon Harbor".to_string())), false)
        .await?;
    sleep(Duration::from_millis(300)).await;
    show_queue(&handle).await?;

    // Flags
    println!("\n🔀 Toggling shuffle and repeat...");
    handle.toggle_shuffle().await?;
    handle.toggle_repeat().await?;
    sleep(Duration::from_millis(300)).await;
    show_state("flags on", &handle).await?;
    handle.toggle_shuffle().await?;

    // Hot-swap the output without losing the position
    println!("\n🔁 Switching to the \"portable\" engine mid-track...");
    let portable = Arc::new(LocalEngine::new(
        LocalEngineConfig::default()
            .with_name("portable")
            .with_progress_tick(Duration::from_millis(100)),
    )?);
    handle.switch_engine(portable).await?;
    sleep(Duration::from_millis(500)).await;
    show_state("after switch", &handle).await?;

    // Voice-search style entry point
    println!("\n🔎 Playing from a title search for \"light\"...");
    handle.play_from_search("light", SearchFocus::Title).await?;
    sleep(Duration::from_millis(500)).await;
    show_state("search result", &handle).await?;

    // Wind down
    println!("\n⏹  Stopping and shutting down...");
    handle.stop().await?;
    sleep(Duration::from_millis(200)).await;
    show_state("stopped", &handle).await?;
    handle.shutdown().await?;
    sleep(Duration::from_millis(200)).await;

    println!("\n🎉 Demo complete");
    Ok(())
}
