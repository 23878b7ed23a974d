//! AI solving strategies. One is selected at startup from configuration.

mod gemini;
mod prompt;

use std::{fmt, str::FromStr};

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

pub use gemini::GeminiSolver;
pub use prompt::{build_prompt, load_system_prompt};

/// Whether the service solves photographed problems or typed questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverMode {
    Image,
    Chat,
}

impl fmt::Display for SolverMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SolverMode::Image => "image",
            SolverMode::Chat => "chat",
        })
    }
}

impl FromStr for SolverMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "image" => Ok(SolverMode::Image),
            "chat" => Ok(SolverMode::Chat),
            other => Err(format!("expected image or chat, got {other:?}")),
        }
    }
}

#[derive(Debug, Clone)]
pub enum SolveInput {
    Image { body: Bytes, content_type: String },
    Question(String),
}

impl SolveInput {
    pub fn mode(&self) -> SolverMode {
        match self {
            SolveInput::Image { .. } => SolverMode::Image,
            SolveInput::Question(_) => SolverMode::Chat,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SolveRequest {
    /// System instructions already tailored to the student's grade.
    pub prompt: String,
    pub input: SolveInput,
}

#[async_trait]
pub trait Solver: Send + Sync {
    fn mode(&self) -> SolverMode;

    fn model_name(&self) -> &str;

    /// Returns the solution text, or an error if the model produced none.
    async fn solve(&self, request: SolveRequest) -> anyhow::Result<String>;
}

#[cfg(test)]
pub use canned::CannedSolver;
