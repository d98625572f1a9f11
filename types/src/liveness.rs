//! Liveness challenge actions.

use crate::TypesError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A physical action the user performs on camera.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LivenessAction {
    Blink,
    Smile,
    TurnLeft,
    TurnRight,
}

impl LivenessAction {
    /// The fixed challenge set; a session is complete once each has passed.
    pub const ALL: [LivenessAction; 4] = [Self::Blink, Self::Smile, Self::TurnLeft, Self::TurnRight];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blink => "blink",
            Self::Smile => "smile",
            Self::TurnLeft => "turn_left",
            Self::TurnRight => "turn_right",
        }
    }

    /// Prompt shown to the user while the action is pending.
    pub fn instruction(&self) -> &'static str {
        match self {
            Self::Blink => "Blink your eyes",
            Self::Smile => "Smile",
            Self::TurnLeft => "Turn your head left",
            Self::TurnRight => "Turn your head right",
        }
    }
}

impl fmt::Display for LivenessAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LivenessAction {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|a| a.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| TypesError::UnknownLivenessAction(s.to_string()))
    }
}

/// Outcome of a single liveness attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckResult {
    Pass,
    Fail,
}

impl CheckResult {
    pub fn from_success(success: bool) -> Self {
        if success {
            Self::Pass
        } else {
            Self::Fail
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }
}
