//! Validated request values for the pipelines.
//!
//! Constructors enforce the field bounds; lengths are counted in characters,
//! not bytes, since topics are usually CJK text.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RequestError;
use crate::plan::Plan;

pub const MAX_TOPIC_CHARS: usize = 100;
pub const MIN_STRUGGLE_CHARS: usize = 5;
pub const MAX_STRUGGLE_CHARS: usize = 200;
pub const MIN_DOCUMENT_CHARS: usize = 100;

/// How detailed the generated plan should be. Only affects prompt wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Quick,
    Deep,
}

impl FromStr for Mode {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "quick" => Ok(Self::Quick),
            "deep" => Ok(Self::Deep),
            other => Err(RequestError::InvalidMode(other.to_string())),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Quick => "quick",
            Self::Deep => "deep",
        })
    }
}

/// A request to generate a plan for a topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub topic: String,
    pub mode: Mode,
}

impl GenerationRequest {
    pub fn new(topic: impl Into<String>, mode: Mode) -> Result<Self, RequestError> {
        let topic = topic.into().trim().to_string();
        check_length("topic", &topic, 1, MAX_TOPIC_CHARS)?;
        Ok(Self { topic, mode })
    }
}

/// A request to rework a plan using learner feedback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefinementRequest {
    pub current_plan: Plan,
    pub insights: Vec<String>,
}

/// A request for a short practice plan targeting one difficulty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemedialRequest {
    pub topic: String,
    pub struggle_point: String,
}

impl RemedialRequest {
    pub fn new(
        topic: impl Into<String>,
        struggle_point: impl Into<String>,
    ) -> Result<Self, RequestError> {
        let topic = topic.into().trim().to_string();
        let struggle_point = struggle_point.into().trim().to_string();
        check_length("topic", &topic, 1, MAX_TOPIC_CHARS)?;
        check_length(
            "struggle_point",
            &struggle_point,
            MIN_STRUGGLE_CHARS,
            MAX_STRUGGLE_CHARS,
        )?;
        Ok(Self {
            topic,
            struggle_point,
        })
    }
}

/// A request to derive a plan from imported document text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRequest {
    pub content: String,
}

impl DocumentRequest {
    pub fn new(content: impl Into<String>) -> Result<Self, RequestError> {
        let content = content.into();
        let actual = content.chars().count();
        if actual < MIN_DOCUMENT_CHARS {
            return Err(RequestError::TooShort {
                field: "content",
                min: MIN_DOCUMENT_CHARS,
                actual,
            });
        }
        Ok(Self { content })
    }
}

/// A request to expand one task of a plan into more detailed guidance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElaborationRequest {
    pub topic: String,
    pub task_description: String,
}

/// A learner question and the context it was asked in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoachQuestion {
    pub question: String,
    #[serde(default)]
    pub context: CoachContext,
}

/// What the learner is currently working on, for coach questions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoachContext {
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub subtasks: Vec<String>,
}

fn check_length(
    field: &'static str,
    value: &str,
    min: usize,
    max: usize,
) -> Result<(), RequestError> {
    let actual = value.chars().count();
    if actual < min || actual > max {
        return Err(RequestError::Length {
            field,
            min,
            max,
            actual,
        });
    }
    Ok(())
}
