// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Reconnect backoff policy.
//
// The supervisor never gives up, so the policy only answers "how long until
// the next attempt". With the default settings every delay is 10 s.

use std::time::Duration;

use posagent_core::config::ReconnectSettings;

/// Backoff schedule for broker reconnects.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectPolicy {
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound for any delay, jitter included.
    pub max_delay: Duration,
    /// Growth factor per consecutive failure. `1.0` gives a fixed delay.
    pub multiplier: f64,
    /// Spread retries of several agents restarted at the same time.
    pub jitter: bool,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::from(&ReconnectSettings::default())
    }
}

impl From<&ReconnectSettings> for ReconnectPolicy {
    fn from(settings: &ReconnectSettings) -> Self {
        let initial_delay = Duration::from_secs(settings.delay_secs);
        Self {
            initial_delay,
            max_delay: Duration::from_secs(settings.max_delay_secs).max(initial_delay),
            multiplier: if settings.multiplier.is_finite() {
                settings.multiplier.max(1.0)
            } else {
                1.0
            },
            jitter: settings.jitter,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before retry number `attempt` (0-indexed).
    ///
    /// delay = min(initial * multiplier^attempt + jitter, max_delay)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base_ms = self.initial_delay.as_millis() as f64;
        let grown_ms = base_ms * self.multiplier.powi(attempt.min(30) as i32);
        let jitter_ms = if self.jitter {
            jitter(self.initial_delay.as_millis() as u64, attempt) as f64
        } else {
            0.0
        };
        let capped_ms = (grown_ms + jitter_ms).min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped_ms as u64)
    }
}

/// Deterministic spread in `[0, base_ms / 2)` derived from the attempt number.
fn jitter(base_ms: u64, attempt: u32) -> u64 {
    let hash = u64::from(attempt.wrapping_add(1)).wrapping_mul(6364136223846793005);
    hash % (base_ms / 2).max(1)
}
