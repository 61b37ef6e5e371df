//! Exponential backoff state for reconnect attempts.
//!
//! A [`Backoff`] is created fresh for every subscription and owned by the
//! reconnection loop. Each call to [`Backoff::next_delay`] returns the delay
//! for the current attempt and moves on to the next one:
//!
//! `delay = min(max_delay, min_delay * factor ^ attempt)`
//!
//! # Example
//!
//! ```rust
//! use eventstreams_client::backoff::Backoff;
//! use eventstreams_client::config::BackoffConfig;
//! use std::time::Duration;
//!
//! let mut backoff = Backoff::new(&BackoffConfig::default());
//! assert_eq!(backoff.next_delay(), Duration::from_millis(100));
//! assert_eq!(backoff.next_delay(), Duration::from_millis(200));
//! assert_eq!(backoff.attempt(), 2);
//!
//! backoff.reset();
//! assert_eq!(backoff.attempt(), 0);
//! ```

use crate::config::BackoffConfig;
use std::time::Duration;

/// Attempt counter plus the delay curve it walks along.
#[derive(Debug, Clone)]
pub struct Backoff {
    min_delay: Duration,
    max_delay: Duration,
    factor: f64,
    attempt: u32,
}

impl Backoff {
    /// Start a new backoff sequence at attempt zero.
    #[must_use]
    pub const fn new(config: &BackoffConfig) -> Self {
        Self {
            min_delay: config.min_delay(),
            max_delay: config.max_delay(),
            factor: config.factor,
            attempt: 0,
        }
    }

    /// Number of delays handed out since the last reset.
    #[must_use]
    pub const fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Start over at attempt zero.
    pub const fn reset(&mut self) {
        self.attempt = 0;
    }

    /// Delay for a given attempt, capped at the configured maximum.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return self.min_delay.min(self.max_delay);
        }

        #[allow(clippy::cast_possible_wrap)]
        let exponent = attempt.min(i32::MAX as u32) as i32;
        #[allow(clippy::cast_precision_loss)]
        let delay_ms = self.min_delay.as_millis() as f64 * self.factor.powi(exponent);

        if !delay_ms.is_finite() || delay_ms >= self.max_delay.as_millis() as f64 {
            return self.max_delay;
        }

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let delay = Duration::from_millis(delay_ms as u64);
        delay.min(self.max_delay)
    }

    /// Delay for the current attempt; advances the attempt counter.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.delay_for_attempt(self.attempt);
        self.attempt = self.attempt.saturating_add(1);
        delay
    }
}
