//! Local engine configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Local engine configuration.
///
/// The local engine renders no audio; it walks a simulated timeline on the
/// runtime clock. These knobs control that simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalEngineConfig {
    /// How often the progress watcher re-checks the timeline. Completion
    /// is detected within one tick of the true track end.
    ///
    /// Default: 250 milliseconds.
    #[serde(default = "default_progress_tick")]
    pub progress_tick: Duration,

    /// Resume the loaded track as soon as `start()` is called instead of
    /// waiting for an explicit play instruction. Takes effect only when a
    /// previous play left a track loaded.
    ///
    /// Default: false.
    #[serde(default)]
    pub autoplay_on_start: bool,

    /// Backend label reported in logs, published state and switch events.
    ///
    /// Default: "local".
    #[serde(default = "default_name")]
    pub name: String,
}

impl Default for LocalEngineConfig {
    fn default() -> Self {
        Self {
            progress_tick: default_progress_tick(),
            autoplay_on_start: false,
            name: default_name(),
        }
    }
}

impl LocalEngineConfig {
    /// Set the progress watcher tick
    pub fn with_progress_tick(mut self, tick: Duration) -> Self {
        self.progress_tick = tick;
        self
    }

    /// Set whether `start()` resumes a loaded track by itself
    pub fn with_autoplay_on_start(mut self, autoplay: bool) -> Self {
        self.autoplay_on_start = autoplay;
        self
    }

    /// Set the backend label
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.progress_tick.is_zero() {
            return Err("progress_tick must be greater than zero".to_string());
        }
        if self.name.trim().is_empty() {
            return Err("name cannot be empty".to_string());
        }
        Ok(())
    }
}

// ============================================================================
// Default Functions (for serde)
// ============================================================================

fn default_progress_tick() -> Duration {
    Duration::from_millis(250)
}

fn default_name() -> String {
    "local".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LocalEngineConfig::default();
        assert_eq!(config.progress_tick, Duration::from_millis(250));
        assert!(!config.autoplay_on_start);
        assert_eq!(config.name, "local");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_methods() {
        let config = LocalEngineConfig::default()
            .with_progress_tick(Duration::from_millis(50))
            .with_autoplay_on_start(true)
            .with_name("portable");

        assert_eq!(config.progress_tick, Duration::from_millis(50));
        assert!(config.autoplay_on_start);
        assert_eq!(config.name, "portable");
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let config = LocalEngineConfig::default().with_progress_tick(Duration::ZERO);
        assert!(config.validate().is_err());

        let config = LocalEngineConfig::default().with_name("  ");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_serde_fills_missing_fields() {
        let config: LocalEngineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.name, "local");
        assert!(!config.autoplay_on_start);
    }
}
