//! AI coaching: mode selection, context assembly, completion calls and the
//! two AI endpoints.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub mod context;
pub mod gateway;
pub mod handlers;
pub mod prompts;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoachMode {
    General,
    Job,
    Learning,
    Projects,
    Content,
}

impl CoachMode {
    pub const ALL: [CoachMode; 5] = [
        CoachMode::General,
        CoachMode::Job,
        CoachMode::Learning,
        CoachMode::Projects,
        CoachMode::Content,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CoachMode::General => "general",
            CoachMode::Job => "job",
            CoachMode::Learning => "learning",
            CoachMode::Projects => "projects",
            CoachMode::Content => "content",
        }
    }
}

impl fmt::Display for CoachMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMode(pub String);

impl FromStr for CoachMode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CoachMode::ALL
            .into_iter()
            .find(|m| m.as_str() == s.trim())
            .ok_or_else(|| UnknownMode(s.to_string()))
    }
}
