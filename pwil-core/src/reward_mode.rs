//! Reward modes.
use crate::error::PwilError;
use serde::{Deserialize, Serialize};
use std::{convert::TryFrom, fmt, str::FromStr};

/// How a discriminator score is turned into a per-step reward.
///
/// The mode is fixed for the lifetime of a run. In configuration files it is
/// written as one of the lowercase strings `airl`, `raw` or `pwil`; any other
/// string is rejected with [`PwilError::UnknownRewardMode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub enum RewardMode {
    /// `log(s + eps) - log(1 - s + eps)` with `s = sigmoid(d)`.
    Airl,

    /// The discriminator score itself.
    Raw,

    /// Negated Sinkhorn distance between `sigmoid(d)` and `1 - sigmoid(d)`.
    Pwil,
}

impl Default for RewardMode {
    fn default() -> Self {
        Self::Pwil
    }
}

impl RewardMode {
    /// The name used in configuration files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Airl => "airl",
            Self::Raw => "raw",
            Self::Pwil => "pwil",
        }
    }
}

impl FromStr for RewardMode {
    type Err = PwilError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "airl" => Ok(Self::Airl),
            "raw" => Ok(Self::Raw),
            "pwil" => Ok(Self::Pwil),
            _ => Err(PwilError::UnknownRewardMode(s.to_string())),
        }
    }
}

impl TryFrom<String> for RewardMode {
    type Error = PwilError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<RewardMode> for String {
    fn from(mode: RewardMode) -> Self {
        mode.as_str().to_string()
    }
}

impl fmt::Display for RewardMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
