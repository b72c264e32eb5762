//! Bounded retry helper for tick commands that lose an optimistic-lock race.
//! Delay doubles each attempt starting from
//! `retry_base_delay_millis`; callers own the actual sleep (tests can skip
//! it entirely by driving the loop with a no-op clock).

use crate::config::TickRetryConfig;
use crate::error::DomainError;

pub struct RetryPlan {
    attempts_made: u32,
    max_attempts: u32,
    base_delay_millis: u64,
}

impl RetryPlan {
    pub fn new(config: &TickRetryConfig) -> Self {
        Self {
            attempts_made: 0,
            max_attempts: config.max_retry_attempts,
            base_delay_millis: config.retry_base_delay_millis,
        }
    }

    /// Delay in milliseconds to wait before the next attempt, doubling per
    /// prior attempt (`base * 2^attempts_made`).
    pub fn next_delay_millis(&self) -> u64 {
        self.base_delay_millis.saturating_mul(1u64 << self.attempts_made.min(31))
    }

    pub fn attempts_made(&self) -> u32 {
        self.attempts_made
    }

    pub fn exhausted(&self) -> bool {
        self.attempts_made >= self.max_attempts
    }

    pub fn record_attempt(&mut self) {
        self.attempts_made += 1;
    }
}

/// Run `op` until it succeeds, exhausts its retry budget, or fails with a
/// non-retriable error. Retriable failures are retried without the caller
/// needing to special-case `OptimisticLockConflict` at every call site.
pub fn run_with_retry<T>(
    config: &TickRetryConfig,
    mut op: impl FnMut(u32) -> crate::error::Result<T>,
) -> crate::error::Result<T> {
    let mut plan = RetryPlan::new(config);
    loop {
        match op(plan.attempts_made()) {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retriable() && !plan.exhausted() => {
                plan.record_attempt();
                continue;
            }
            Err(err) if err.is_retriable() => {
                return Err(DomainError::OptimisticLockConflict(format!(
                    "exhausted {} retry attempts: {err}",
                    plan.max_attempts
                )));
            }
            Err(err) => return Err(err),
        }
    }
}
