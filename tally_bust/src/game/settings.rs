//! Tunable game settings.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr, time::Duration};

use super::{
    constants::{
        DEFAULT_LIMIT_DELTA_BOUND, DEFAULT_MAX_LIMIT, DEFAULT_MAX_TALLY, DEFAULT_MIN_LIMIT,
        INITIAL_HAND_SIZE, RETAINED_DISCARD,
    },
    state_machine::GameError,
};

/// What happens to played Jinx cards.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JinxPolicy {
    /// Played Jinx cards go to the discard pile and come back on reshuffle.
    #[default]
    Recycle,
    /// Played Jinx cards are consumed; a reshuffle mints fresh ones until
    /// every kind is back to its recipe count.
    Replenish,
}

impl fmt::Display for JinxPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JinxPolicy::Recycle => write!(f, "recycle"),
            JinxPolicy::Replenish => write!(f, "replenish"),
        }
    }
}

impl FromStr for JinxPolicy {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "recycle" => Ok(Self::Recycle),
            "replenish" => Ok(Self::Replenish),
            other => Err(GameError::InvalidSettings(format!(
                "unknown jinx policy '{other}'"
            ))),
        }
    }
}

/// Game configuration settings. Every peer of a match must use the same
/// values, since transitions are re-applied locally.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct GameSettings {
    /// Starting limit the tally must stay at or below.
    pub max_tally: i32,
    /// LimitChange can't push the limit below this.
    pub min_limit: i32,
    /// LimitChange can't push the limit above this.
    pub max_limit: i32,
    /// LimitChange deltas are drawn from `[-bound, bound]` minus zero.
    pub limit_delta_bound: i32,
    pub initial_hand_size: usize,
    pub retained_discard: usize,
    pub jinx_policy: JinxPolicy,
    /// How long a barrier waits for acks before the missing peers are
    /// treated as disconnected. `None` waits forever.
    pub barrier_timeout_ms: Option<u64>,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            max_tally: DEFAULT_MAX_TALLY,
            min_limit: DEFAULT_MIN_LIMIT,
            max_limit: DEFAULT_MAX_LIMIT,
            limit_delta_bound: DEFAULT_LIMIT_DELTA_BOUND,
            initial_hand_size: INITIAL_HAND_SIZE,
            retained_discard: RETAINED_DISCARD,
            jinx_policy: JinxPolicy::default(),
            barrier_timeout_ms: None,
        }
    }
}

impl GameSettings {
    #[must_use]
    pub fn barrier_timeout(&self) -> Option<Duration> {
        self.barrier_timeout_ms.map(Duration::from_millis)
    }

    /// # Errors
    ///
    /// Returns [`GameError::InvalidSettings`] when the limits are
    /// inconsistent or the delta bound is not positive.
    pub fn validate(&self) -> Result<(), GameError> {
        if self.min_limit > self.max_limit {
            return Err(GameError::InvalidSettings(format!(
                "min_limit {} exceeds max_limit {}",
                self.min_limit, self.max_limit
            )));
        }
        if !(self.min_limit..=self.max_limit).contains(&self.max_tally) {
            return Err(GameError::InvalidSettings(format!(
                "max_tally {} outside {}..={}",
                self.max_tally, self.min_limit, self.max_limit
            )));
        }
        if self.limit_delta_bound <= 0 {
            return Err(GameError::InvalidSettings(
                "limit_delta_bound must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
