use serde::{Deserialize, Serialize};

use crate::timer::TimerSettings;

/// Default capacity of each transaction event channel
pub const DEFAULT_EVENT_CAPACITY: usize = 100;

/// Settings for a [`crate::TransactionManager`].
///
/// Every field has a default, so a partial document deserializes:
///
/// ```
/// use sipline_transaction::TransactionConfig;
///
/// let config: TransactionConfig = serde_json::from_str(r#"{"event_capacity": 16}"#).unwrap();
/// assert_eq!(config.event_capacity, 16);
/// assert_eq!(config.timers.t1.as_millis(), 500);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionConfig {
    pub timers: TimerSettings,
    /// Buffer size of each subscriber's event channel
    pub event_capacity: usize,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            timers: TimerSettings::default(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl TransactionConfig {
    pub fn with_timers(mut self, timers: TimerSettings) -> Self {
        self.timers = timers;
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_config_round_trips_through_json() {
        let config = TransactionConfig::default()
            .with_timers(TimerSettings::from_t1(Duration::from_millis(50)))
            .with_event_capacity(8);

        let json = serde_json::to_string(&config).unwrap();
        let parsed: TransactionConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
        assert_eq!(parsed.timers.transaction_timeout, Duration::from_millis(3200));
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        assert_eq!(TransactionConfig::default().with_event_capacity(0).event_capacity, 1);
    }
}
