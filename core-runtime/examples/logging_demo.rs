//! Logging system demonstration
//!
//! This example shows how to use the logging infrastructure in different modes.
//!
//! Run with:
//! ```bash
//! # Pretty format (default in debug)
//! cargo run --example logging_demo
//!
//! # JSON format
//! cargo run --example logging_demo -- json
//!
//! # Compact format
//! cargo run --example logging_demo -- compact
//!
//! # With custom filter
//! cargo run --example logging_demo -- pretty "core_runtime=trace"
//! ```

use core_runtime::events::{CoreEvent, EventBus, SessionEvent};
use core_runtime::logging::{init_logging, LogFormat, LogLevel, LoggingConfig};
use std::env;
use tracing::{debug, error, info, instrument, span, trace, warn, Level};

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let format = if args.len() > 1 {
        match args[1].as_str() {
            "json" => LogFormat::Json,
            "compact" => LogFormat::Compact,
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Pretty,
        }
    } else {
        LogFormat::default()
    };

    let filter = args.get(2).cloned();

    // Initialize logging
    let mut config = LoggingConfig::default()
        .with_format(format)
        .with_level(LogLevel::Trace)
        .with_spans(true)
        .with_target(true);

    if let Some(f) = filter {
        config = config.with_filter(f);
    }

    init_logging(config).expect("Failed to initialize logging");

    info!("=== Logging System Demo ===");
    info!(format = ?format, "Logging initialized");

    // Demonstrate different log levels
    demo_log_levels();

    // Demonstrate structured logging
    demo_structured_logging();

    // Demonstrate spans for tracing
    demo_spans().await;

    // Demonstrate event bus logging
    demo_event_logging().await;

    // Demonstrate instrumentation
    demo_instrumentation().await;

    info!("=== Demo Complete ===");
}

fn demo_log_levels() {
    let span = span!(Level::INFO, "log_levels");
    let _enter = span.enter();

    trace!("This is a TRACE level log");
    debug!("This is a DEBUG level log");
    info!("This is an INFO level log");
    warn!("This is a WARN level log");
    error!("This is an ERROR level log");
}

fn demo_structured_logging() {
    let span = span!(Level::INFO, "structured_logging");
    let _enter = span.enter();

    info!("Simple message without fields");

    info!(
        track_id = "12345",
        title = "Song Title",
        duration_ms = 245000,
        "Track information"
    );

    info!(
        queue_len = 42,
        current_index = 7,
        shuffling = false,
        "Queue snapshot"
    );
}

async fn demo_spans() {
    let span = span!(Level::INFO, "catalog_load", source = "bundled");
    let _enter = span.enter();

    info!("Starting catalog load");

    {
        let inner_span = span!(Level::DEBUG, "fetch_tracks");
        let _inner = inner_span.enter();

        debug!(count = 150, "Fetched tracks from source");
        tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;
    }

    {
        let inner_span = span!(Level::DEBUG, "build_indexes");
        let _inner = inner_span.enter();

        debug!(albums = 12, artists = 9, "Building catalog indexes");
        tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;
    }

    info!(tracks_loaded = 150, "Catalog load completed");
}

async fn demo_event_logging() {
    let span = span!(Level::INFO, "event_bus");
    let _enter = span.enter();

    let bus = EventBus::new(16);
    let mut subscriber = bus.subscribe();

    let event = CoreEvent::Session(SessionEvent::Activated {
        session_id: "demo-session".to_string(),
    });
    bus.emit(event).ok();

    if let Ok(event) = subscriber.recv().await {
        info!(
            description = event.description(),
            severity = ?event.severity(),
            "Received event"
        );
    }
}

#[instrument]
async fn demo_instrumentation() {
    info!("Instrumented function automatically creates spans");

    let commands = vec!["play", "skip_next", "pause"];
    process_commands(&commands).await;
}

#[instrument(fields(count = commands.len()))]
async fn process_commands(commands: &[&str]) {
    debug!("Processing commands");

    for (idx, command) in commands.iter().enumerate() {
        process_command(idx, command).await;
    }

    info!("All commands processed");
}

#[instrument(fields(seq = idx))]
async fn process_command(idx: usize, command: &str) {
    trace!(command = %command, "Processing individual command");
    tokio::time::sleep(tokio::time::Duration::from_millis(5)).await;
}
