use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Why a page fetch has to be repeated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Network error, non-2xx status or undecodable payload.
    Transport,
    /// Well-formed reply whose `success` flag is not set.
    Unsuccessful,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Backoff {
    #[default]
    Fixed,
    Exponential { max_ms: u64 },
}

/// Cooldown schedule for repeating a failed page fetch on the same cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub transport_cooldown: Duration,
    pub unsuccessful_cooldown: Duration,
    /// `None` retries forever.
    pub max_attempts: Option<u32>,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            transport_cooldown: Duration::from_secs(5),
            unsuccessful_cooldown: Duration::from_secs(1),
            max_attempts: None,
            backoff: Backoff::Fixed,
        }
    }
}

impl RetryPolicy {
    /// Retries immediately without limit.
    pub fn immediate() -> Self {
        Self {
            transport_cooldown: Duration::ZERO,
            unsuccessful_cooldown: Duration::ZERO,
            ..Self::default()
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// True once `attempts` fetches have failed and no further one is allowed.
    pub fn exhausted(&self, attempts: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempts >= max)
    }

    /// Delay before the next attempt. `attempt` counts failures so far, starting at 1.
    pub fn cooldown(&self, kind: FailureKind, attempt: u32) -> Duration {
        let base = match kind {
            FailureKind::Transport => self.transport_cooldown,
            FailureKind::Unsuccessful => self.unsuccessful_cooldown,
        };
        match self.backoff {
            Backoff::Fixed => base,
            Backoff::Exponential { max_ms } => {
                let exponent = attempt.saturating_sub(1).min(20);
                let scaled = (base.as_millis() as u64).saturating_mul(2u64.saturating_pow(exponent));
                Duration::from_millis(scaled.min(max_ms))
            }
        }
    }
}
