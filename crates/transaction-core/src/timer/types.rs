//! Timer names and durations (RFC 3261 Section 17 and Table 4).
//!
//! - **Retransmission timers** resend a request over an unreliable transport (A, E)
//! - **Transaction timeout timers** bound how long a client waits (B, F)
//! - **Wait timers** keep a finished transaction around to absorb
//!   retransmissions (D, K on the client, H, J on the server)

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Round-trip time estimate
pub const T1: Duration = Duration::from_millis(500);
/// Maximum retransmit interval for non-INVITE requests
pub const T2: Duration = Duration::from_secs(4);
/// Maximum time a message can remain in the network
pub const T4: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerType {
    /// INVITE request retransmit
    A,
    /// INVITE transaction timeout
    B,
    /// Wait time for response retransmits (INVITE client)
    D,
    /// Non-INVITE request retransmit
    E,
    /// Non-INVITE transaction timeout
    F,
    /// Wait time for response retransmits (non-INVITE client)
    K,
    /// Lifetime of a completed INVITE server transaction
    H,
    /// Lifetime of a completed non-INVITE server transaction
    J,
}

impl fmt::Display for TimerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TimerType::A => "A",
            TimerType::B => "B",
            TimerType::D => "D",
            TimerType::E => "E",
            TimerType::F => "F",
            TimerType::K => "K",
            TimerType::H => "H",
            TimerType::J => "J",
        };
        f.write_str(name)
    }
}

/// Timer durations.
///
/// The defaults are the RFC 3261 values for UDP. Use [`TimerSettings::from_t1`]
/// to scale every timer from a single T1, which is what tests do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerSettings {
    /// Initial retransmit interval for A and E
    pub t1: Duration,
    /// Cap for the E interval
    pub t2: Duration,
    /// Message lifetime, used for Timer K
    pub t4: Duration,
    /// Timers B and F (64*T1)
    pub transaction_timeout: Duration,
    /// Timer D, at least 32s for UDP
    pub wait_time_d: Duration,
    /// Timer K
    pub wait_time_k: Duration,
    /// Timer H (64*T1)
    pub wait_time_h: Duration,
    /// Timer J (64*T1)
    pub wait_time_j: Duration,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self::from_t1(T1)
    }
}

impl TimerSettings {
    /// Derives every timer from `t1` with the RFC ratios.
    ///
    /// With `t1` = 500ms this yields T2 = 4s, T4 = 5s, B/F/H/J = 32s and D = 32s.
    pub fn from_t1(t1: Duration) -> Self {
        let t4 = t1 * 10;
        Self {
            t1,
            t2: t1 * 8,
            t4,
            transaction_timeout: t1 * 64,
            wait_time_d: t1 * 64,
            wait_time_k: t4,
            wait_time_h: t1 * 64,
            wait_time_j: t1 * 64,
        }
    }

    pub fn with_transaction_timeout(mut self, timeout: Duration) -> Self {
        self.transaction_timeout = timeout;
        self
    }

    pub fn with_wait_time_d(mut self, wait: Duration) -> Self {
        self.wait_time_d = wait;
        self
    }

    pub fn with_wait_time_k(mut self, wait: Duration) -> Self {
        self.wait_time_k = wait;
        self
    }

    pub fn with_server_wait(mut self, wait: Duration) -> Self {
        self.wait_time_h = wait;
        self.wait_time_j = wait;
        self
    }

    /// Next Timer A interval: doubled, no cap
    pub fn next_timer_a(&self, current: Duration) -> Duration {
        current * 2
    }

    /// Next Timer E interval: doubled, capped at T2
    pub fn next_timer_e(&self, current: Duration) -> Duration {
        std::cmp::min(current * 2, self.t2)
    }
}
