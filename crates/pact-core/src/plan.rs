//! The plan document: a title plus ordered tasks, each with subtasks.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValidationError;

/// A structured learning plan.
///
/// A plan handed back by any pipeline satisfies [`Plan::validate`]: at
/// least one task, and every task has at least one subtask.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

/// One task of a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub subtasks: Vec<String>,
}

/// The `{"plan": {...}}` wrapper the model is asked to produce and the HTTP
/// surface returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanEnvelope {
    pub plan: Plan,
}

impl Plan {
    /// Build a plan with a single task.
    pub fn single_task(
        title: impl Into<String>,
        description: impl Into<String>,
        subtasks: Vec<String>,
    ) -> Self {
        Self {
            title: title.into(),
            tasks: vec![Task {
                description: description.into(),
                subtasks,
            }],
        }
    }

    /// Check the structural invariant: tasks non-empty and every task has
    /// subtasks.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.tasks.is_empty() {
            return Err(ValidationError::NoTasks);
        }
        if let Some(index) = self.tasks.iter().position(|t| t.subtasks.is_empty()) {
            return Err(ValidationError::EmptySubtasks { index });
        }
        Ok(())
    }

    /// [`Plan::validate`] plus a non-blank title.
    pub fn validate_titled(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::MissingTitle);
        }
        self.validate()
    }

    /// Interpret an extracted value as a plan.
    ///
    /// Accepts either the `{"plan": {...}}` envelope or a bare
    /// `{"title": ..., "tasks": [...]}` object. The result is not validated.
    pub fn from_value(value: Value) -> Result<Self, ValidationError> {
        let inner = match value {
            Value::Object(mut map) => match map.remove("plan") {
                Some(plan @ Value::Object(_)) => plan,
                Some(other) => {
                    return Err(ValidationError::Shape(format!(
                        "\"plan\" must be an object, got {}",
                        type_name(&other)
                    )));
                }
                None => Value::Object(map),
            },
            other => {
                return Err(ValidationError::Shape(format!(
                    "expected an object, got {}",
                    type_name(&other)
                )));
            }
        };
        serde_json::from_value(inner).map_err(|e| ValidationError::Shape(e.to_string()))
    }

    /// Wrap in the `{"plan": ...}` envelope.
    pub fn into_envelope(self) -> PlanEnvelope {
        PlanEnvelope { plan: self }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
