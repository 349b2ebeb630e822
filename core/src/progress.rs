use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A level is cleared once the score reaches `level * TAPS_PER_LEVEL`.
pub const TAPS_PER_LEVEL: i64 = 100;

/// Score and level of a single player.
///
/// This is the shape that travels over the wire (`{"score": 0, "level": 1}`) and the
/// shape both sides run the leveling rule on, so the client display and any server
/// side recomputation can never disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Progress {
    pub score: i32,
    pub level: i32,
}

impl Default for Progress {
    fn default() -> Self {
        Self { score: 0, level: 1 }
    }
}

/// Result of applying one tap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TapOutcome {
    pub progress: Progress,
    pub leveled_up: bool,
}

impl Progress {
    pub fn new(score: i32, level: i32) -> Self {
        Self { score, level }
    }

    /// Score at which the current level is cleared.
    pub fn threshold(&self) -> i64 {
        i64::from(self.level) * TAPS_PER_LEVEL
    }

    /// Applies a single tap.
    ///
    /// The score goes up by one. When it reaches the level threshold the level goes up
    /// and the score starts again from zero.
    pub fn tap(self) -> TapOutcome {
        let score = self.score.saturating_add(1);

        if i64::from(score) >= self.threshold() {
            TapOutcome {
                progress: Progress {
                    score: 0,
                    level: self.level.saturating_add(1),
                },
                leveled_up: true,
            }
        } else {
            TapOutcome {
                progress: Progress { score, ..self },
                leveled_up: false,
            }
        }
    }

    /// Total number of taps needed to get from a fresh start to this state.
    ///
    /// Clearing level `n` costs `n * 100` taps, so reaching `level` costs
    /// `50 * level * (level - 1)` before the current score is added.
    pub fn total_taps(&self) -> i64 {
        let level = i64::from(self.level.max(1));
        (TAPS_PER_LEVEL / 2)
            .saturating_mul(level)
            .saturating_mul(level - 1)
            .saturating_add(i64::from(self.score))
    }

    /// Checks that this state can be produced by the leveling rule at all.
    pub fn check_reachable(&self) -> Result<(), ProgressViolation> {
        if self.score < 0 {
            return Err(ProgressViolation::NegativeScore(self.score));
        }
        if self.level < 1 {
            return Err(ProgressViolation::LevelTooLow(self.level));
        }
        if i64::from(self.score) >= self.threshold() {
            return Err(ProgressViolation::ScoreOutOfRange {
                score: self.score,
                level: self.level,
            });
        }
        Ok(())
    }
}

/// Reasons a submitted progress snapshot gets refused.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProgressViolation {
    #[error("score must not be negative (got {0})")]
    NegativeScore(i32),

    #[error("level must be at least 1 (got {0})")]
    LevelTooLow(i32),

    #[error("score {score} is out of range for level {level}")]
    ScoreOutOfRange { score: i32, level: i32 },

    #[error("progress went backwards ({previous} taps stored, {submitted} submitted)")]
    Regression { previous: i64, submitted: i64 },
}

/// How much the server trusts progress submitted by a client.
///
/// - `Trust` stores whatever arrives.
/// - `Conform` only stores states the leveling rule can produce.
/// - `Monotonic` additionally refuses anything behind what is already stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressPolicy {
    Trust,
    #[default]
    Conform,
    Monotonic,
}

impl ProgressPolicy {
    pub fn validate(
        self,
        previous: Option<Progress>,
        submitted: Progress,
    ) -> Result<(), ProgressViolation> {
        match self {
            ProgressPolicy::Trust => Ok(()),
            ProgressPolicy::Conform => submitted.check_reachable(),
            ProgressPolicy::Monotonic => {
                submitted.check_reachable()?;

                if let Some(previous) = previous {
                    let (previous, submitted) = (previous.total_taps(), submitted.total_taps());
                    if submitted < previous {
                        return Err(ProgressViolation::Regression {
                            previous,
                            submitted,
                        });
                    }
                }
                Ok(())
            }
        }
    }

    /// Whether `validate` needs the stored progress to decide.
    pub fn needs_previous(self) -> bool {
        matches!(self, ProgressPolicy::Monotonic)
    }
}

#[derive(Debug, Error)]
#[error("unknown progress policy `{0}` (expected trust, conform or monotonic)")]
pub struct UnknownPolicy(String);

impl FromStr for ProgressPolicy {
    type Err = UnknownPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trust" => Ok(ProgressPolicy::Trust),
            "conform" => Ok(ProgressPolicy::Conform),
            "monotonic" => Ok(ProgressPolicy::Monotonic),
            _ => Err(UnknownPolicy(s.to_string())),
        }
    }
}

impl fmt::Display for ProgressPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProgressPolicy::Trust => "trust",
            ProgressPolicy::Conform => "conform",
            ProgressPolicy::Monotonic => "monotonic",
        };
        f.write_str(name)
    }
}
