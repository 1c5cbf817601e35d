//! Retry policy for failed tasks and the outer retry used around `enqueue`.
//!
//! The default policy is the one the queue ships with: three attempts in
//! total, one second apart, no growth and no jitter. Linear and exponential
//! growth, a delay cap and jitter are available but must be asked for.

use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize};
use std::future::Future;
use std::time::Duration;

/// Backoff strategy for retry delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// delay = base
    #[default]
    Constant,
    /// delay = base * failed_attempts
    Linear,
    /// delay = base * 2^(failed_attempts - 1)
    Exponential,
}

/// Jitter applied on top of the backoff delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JitterStrategy {
    /// No jitter
    #[default]
    None,
    /// Random from 0 to delay
    Full,
    /// Half fixed, half random
    Equal,
}

/// Decides whether and when a failed attempt is retried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum attempts in total, the first one included. Never below one.
    #[serde(
        default = "default_max_attempts",
        deserialize_with = "deserialize_max_attempts"
    )]
    pub max_attempts: u32,
    /// Base delay between attempts in milliseconds.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Maximum delay cap in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Backoff strategy.
    #[serde(default)]
    pub backoff_strategy: BackoffStrategy,
    /// Jitter strategy.
    #[serde(default)]
    pub jitter_strategy: JitterStrategy,
}

fn default_max_attempts() -> u32 {
    3
}

fn deserialize_max_attempts<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(u32::deserialize(deserializer)?.max(1))
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_strategy: BackoffStrategy::Constant,
            jitter_strategy: JitterStrategy::None,
        }
    }
}

/// Outcome of a retry decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the specified delay.
    Retry(Duration),
    /// No more retries, give up.
    GiveUp,
}

/// Returns true if a task that has made `attempts` Sink calls may make another.
#[must_use]
pub const fn should_retry(attempts: u32, max_attempts: u32) -> bool {
    attempts < max_attempts
}

impl RetryPolicy {
    /// Creates the default policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Coarse policy for the producer boundary: 3 attempts, 5 s apart.
    #[must_use]
    pub fn producer_default() -> Self {
        Self::new().with_base_delay_ms(5000)
    }

    /// Sets the maximum attempts. Values below one are raised to one.
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Sets the base delay.
    #[must_use]
    pub fn with_base_delay_ms(mut self, delay: u64) -> Self {
        self.base_delay_ms = delay;
        self
    }

    /// Sets the maximum delay.
    #[must_use]
    pub fn with_max_delay_ms(mut self, delay: u64) -> Self {
        self.max_delay_ms = delay;
        self
    }

    /// Sets the backoff strategy.
    #[must_use]
    pub fn with_backoff(mut self, strategy: BackoffStrategy) -> Self {
        self.backoff_strategy = strategy;
        self
    }

    /// Sets the jitter strategy.
    #[must_use]
    pub fn with_jitter(mut self, strategy: JitterStrategy) -> Self {
        self.jitter_strategy = strategy;
        self
    }

    /// Attempt limit in effect, never below one.
    #[must_use]
    pub fn attempt_limit(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Returns true if a task with `attempts` failed attempts may try again.
    #[must_use]
    pub fn should_retry(&self, attempts: u32) -> bool {
        should_retry(attempts, self.attempt_limit())
    }

    /// Delay before the next attempt, given `attempts` failures so far.
    #[must_use]
    pub fn delay_for(&self, attempts: u32) -> Duration {
        let base = self.base_delay_ms;
        let max = self.max_delay_ms;
        let failures = u64::from(attempts.max(1));

        let delay = match self.backoff_strategy {
            BackoffStrategy::Constant => base,
            BackoffStrategy::Linear => base.saturating_mul(failures),
            BackoffStrategy::Exponential => {
                let exponent = u32::try_from(failures - 1).unwrap_or(u32::MAX);
                base.saturating_mul(2u64.saturating_pow(exponent))
            }
        }
        .min(max);

        let jittered = match self.jitter_strategy {
            JitterStrategy::None => delay,
            JitterStrategy::Full => {
                if delay == 0 {
                    0
                } else {
                    rand::thread_rng().gen_range(0..=delay)
                }
            }
            JitterStrategy::Equal => {
                let half = delay / 2;
                if half == 0 {
                    delay
                } else {
                    half + rand::thread_rng().gen_range(0..=half)
                }
            }
        };

        Duration::from_millis(jittered)
    }

    /// Makes the retry decision after the `attempts`-th failure.
    #[must_use]
    pub fn decide(&self, attempts: u32) -> RetryDecision {
        if self.should_retry(attempts) {
            RetryDecision::Retry(self.delay_for(attempts))
        } else {
            RetryDecision::GiveUp
        }
    }
}

/// Runs `operation` until it succeeds, `retry_if` refuses the error, or the
/// policy gives up. Returns the last error in the latter two cases.
pub async fn with_retry<T, E, F, Fut, P>(
    policy: &RetryPolicy,
    key: &str,
    retry_if: P,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let mut attempts = 0;

    loop {
        attempts += 1;
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if !retry_if(&e) => return Err(e),
            Err(e) => match policy.decide(attempts) {
                RetryDecision::Retry(delay) => {
                    tracing::debug!(
                        key,
                        attempt = attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %e,
                        "Retrying after error"
                    );
                    tokio::time::sleep(delay).await;
                }
                RetryDecision::GiveUp => return Err(e),
            },
        }
    }
}
