//! # Retry Sequence
//!
//! Cumulative backoff over the per-attempt delays configured in the
//! policy table. The k-th timeout is the sum over attempts 1..=k of
//! `(delay[i] + response_timeout)` — each retry waits strictly longer
//! than the previous one by construction. When the sequence is exhausted
//! there are no further retries until the sequence is reloaded or reset.

use std::time::Duration;

/// Retry backoff state: the configured schedule plus the attempt cursor.
#[derive(Debug, Clone, Default)]
pub struct RetrySequence {
    /// Base response timeout added to every attempt, seconds.
    timeout_seconds: u32,
    /// Per-attempt delays, seconds.
    seconds_between_retries: Vec<u32>,
    /// Attempts consumed so far.
    index: usize,
}

impl RetrySequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the schedule with freshly loaded values and restart from
    /// attempt zero. Done whenever a new table is applied.
    pub fn reload(&mut self, timeout_seconds: u32, seconds_between_retries: Vec<u32>) {
        self.timeout_seconds = timeout_seconds;
        self.seconds_between_retries = seconds_between_retries;
        self.index = 0;
    }

    /// Restart from attempt zero without touching the schedule.
    pub fn reset(&mut self) {
        self.index = 0;
    }

    /// Consume the next attempt and return its timeout, or `None` when
    /// the sequence is exhausted (no more retries).
    pub fn next_timeout(&mut self) -> Option<Duration> {
        if self.seconds_between_retries.is_empty() || self.index >= self.seconds_between_retries.len()
        {
            return None;
        }

        self.index += 1;

        let seconds: u64 = self.seconds_between_retries[..self.index]
            .iter()
            .map(|delay| u64::from(*delay) + u64::from(self.timeout_seconds))
            .sum();

        Some(Duration::from_secs(seconds))
    }

    /// The base response timeout, seconds.
    pub fn timeout_seconds(&self) -> u32 {
        self.timeout_seconds
    }

    /// The configured per-attempt delays, seconds.
    pub fn delays_seconds(&self) -> Vec<u32> {
        self.seconds_between_retries.clone()
    }
}
