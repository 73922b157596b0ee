//! Session configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use core_runtime::events::DEFAULT_EVENT_BUFFER_SIZE;

/// Session controller configuration.
///
/// Controls mailbox sizing, event fan-out and the idle shutdown timer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// How long the session may sit without playing or receiving commands
    /// before it deactivates itself.
    ///
    /// Default: 30 seconds.
    #[serde(default = "default_idle_stop_delay")]
    pub idle_stop_delay: Duration,

    /// Capacity of the command mailbox. Senders wait when it is full, so
    /// commands are never silently dropped.
    ///
    /// Default: 64.
    #[serde(default = "default_mailbox_capacity")]
    pub mailbox_capacity: usize,

    /// Buffer size of the event bus created when none is supplied.
    ///
    /// Default: 100.
    #[serde(default = "default_event_buffer_size")]
    pub event_buffer_size: usize,

    /// Queue title used for queues built by random sampling.
    ///
    /// Default: "Random mix".
    #[serde(default = "default_random_queue_title")]
    pub random_queue_title: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_stop_delay: default_idle_stop_delay(),
            mailbox_capacity: default_mailbox_capacity(),
            event_buffer_size: default_event_buffer_size(),
            random_queue_title: default_random_queue_title(),
        }
    }
}

impl SessionConfig {
    /// Set the idle shutdown delay
    pub fn with_idle_stop_delay(mut self, delay: Duration) -> Self {
        self.idle_stop_delay = delay;
        self
    }

    /// Set the command mailbox capacity
    pub fn with_mailbox_capacity(mut self, capacity: usize) -> Self {
        self.mailbox_capacity = capacity;
        self
    }

    /// Set the event bus buffer size
    pub fn with_event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = size;
        self
    }

    /// Set the title given to randomly sampled queues
    pub fn with_random_queue_title(mut self, title: impl Into<String>) -> Self {
        self.random_queue_title = title.into();
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.idle_stop_delay.is_zero() {
            return Err("idle_stop_delay must be greater than zero".to_string());
        }
        if self.mailbox_capacity == 0 {
            return Err("mailbox_capacity must be > 0".to_string());
        }
        if self.event_buffer_size == 0 {
            return Err("event_buffer_size must be > 0".to_string());
        }
        if self.random_queue_title.trim().is_empty() {
            return Err("random_queue_title cannot be empty".to_string());
        }
        Ok(())
    }
}

// ============================================================================
// Default Functions (for serde)
// ============================================================================

fn default_idle_stop_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_mailbox_capacity() -> usize {
    64
}

fn default_event_buffer_size() -> usize {
    DEFAULT_EVENT_BUFFER_SIZE
}

fn default_random_queue_title() -> String {
    "Random mix".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.idle_stop_delay, Duration::from_secs(30));
        assert_eq!(config.mailbox_capacity, 64);
        assert_eq!(config.event_buffer_size, 100);
        assert_eq!(config.random_queue_title, "Random mix");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_methods() {
        let config = SessionConfig::default()
            .with_idle_stop_delay(Duration::from_secs(5))
            .with_mailbox_capacity(8)
            .with_event_buffer_size(16)
            .with_random_queue_title("Surprise me");

        assert_eq!(config.idle_stop_delay, Duration::from_secs(5));
        assert_eq!(config.mailbox_capacity, 8);
        assert_eq!(config.event_buffer_size, 16);
        assert_eq!(config.random_queue_title, "Surprise me");
    }

    #[test]
    fn test_validation_rejects_zero_values() {
        let config = SessionConfig::default().with_mailbox_capacity(0);
        assert!(config.validate().is_err());

        let config = SessionConfig::default().with_idle_stop_delay(Duration::ZERO);
        assert!(config.validate().is_err());

        let config = SessionConfig::default().with_random_queue_title("   ");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_serde_fills_missing_fields() {
        let config: SessionConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.mailbox_capacity, 64);
        assert_eq!(config.random_queue_title, "Random mix");
    }
}
