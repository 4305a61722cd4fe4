//! Plan generation cascade.
//!
//! Stages run strictly in [`Stage::CASCADE`] order. Each returns either a
//! validated plan or the reason it gave up; the first plan wins. When every
//! stage fails the topic still gets [`default_plan`], so generation never
//! fails outward.

use std::fmt;

use crate::error::StageError;
use crate::extract::{extract_plan, extract_steps};
use crate::model::LanguageModel;
use crate::plan::Plan;
use crate::request::{GenerationRequest, Mode};

use super::prompts;

pub const STRUCTURED_TEMPERATURE: f32 = 0.3;
pub const LIST_TEMPERATURE: f32 = 0.5;
pub const PROSE_TEMPERATURE: f32 = 0.7;
pub const PROSE_EXTRACTION_TEMPERATURE: f32 = 0.2;

/// One model-backed strategy of the generation cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Ask directly for the plan JSON.
    Structured,
    /// Ask for a flat list of steps and wrap it in one task.
    ListOnly,
    /// Ask for prose, then ask again to pull a step list out of it.
    TwoStep,
}

impl Stage {
    /// Stages in the order they are attempted.
    pub const CASCADE: [Stage; 3] = [Stage::Structured, Stage::ListOnly, Stage::TwoStep];

    pub fn name(self) -> &'static str {
        match self {
            Self::Structured => "structured",
            Self::ListOnly => "list_only",
            Self::TwoStep => "two_step",
        }
    }

    /// Run this stage once.
    pub async fn run(
        self,
        model: &dyn LanguageModel,
        topic: &str,
        mode: Mode,
    ) -> Result<Plan, StageError> {
        match self {
            Self::Structured => {
                let prompt = prompts::structured_plan(topic, mode);
                let response = model.invoke(&prompt, STRUCTURED_TEMPERATURE).await?;
                extract_plan(&response)
            }
            Self::ListOnly => {
                let response = model
                    .invoke(&prompts::step_list(topic), LIST_TEMPERATURE)
                    .await?;
                let steps = extract_steps(&response)?;
                Ok(Plan::single_task(
                    format!("{topic}（结构重组）"),
                    "此计划为自动结构重组版本，请结合实际调整。",
                    steps,
                ))
            }
            Self::TwoStep => {
                let prose = model
                    .invoke(&prompts::step_prose(topic), PROSE_TEMPERATURE)
                    .await?;
                let response = model
                    .invoke(
                        &prompts::steps_from_prose(topic, &prose),
                        PROSE_EXTRACTION_TEMPERATURE,
                    )
                    .await?;
                let steps = extract_steps(&response)?;
                Ok(Plan::single_task(
                    format!("{topic}（文本提取版）"),
                    "此计划基于文本内容自动整理生成，需结合实际参考。",
                    steps,
                ))
            }
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Generate a plan for the request, degrading through the cascade.
pub async fn generate_plan(model: &dyn LanguageModel, request: &GenerationRequest) -> Plan {
    let topic = request.topic.as_str();
    tracing::info!(topic, mode = %request.mode, "generating learning plan");

    for stage in Stage::CASCADE {
        match stage.run(model, topic, request.mode).await {
            Ok(plan) => {
                tracing::info!(topic, %stage, tasks = plan.tasks.len(), "stage produced a plan");
                return plan;
            }
            Err(StageError::Model(e)) if e.is_fatal() => {
                tracing::error!(topic, %stage, error = %e, "model is unusable; skipping to default plan");
                break;
            }
            Err(e) => {
                tracing::warn!(topic, %stage, error = %e, "stage failed; degrading");
            }
        }
    }

    tracing::error!(topic, "all generation stages failed; using default plan");
    default_plan(topic)
}

/// The terminal fallback: a fixed three-step introduction to the topic.
pub fn default_plan(topic: &str) -> Plan {
    Plan::single_task(
        format!("{topic}（默认基础计划）"),
        "未能提取有效学习计划，提供基础学习框架。",
        vec![
            format!("理解'{topic}'的基本定义。"),
            format!("学习'{topic}'相关的主要概念。"),
            "开展相关主题的基础阅读与实践。".to_string(),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cascade_order_is_fixed() {
        assert_eq!(
            Stage::CASCADE,
            [Stage::Structured, Stage::ListOnly, Stage::TwoStep]
        );
    }

    #[test]
    fn default_plan_is_valid_and_templated() {
        let plan = default_plan("闭包");
        assert_eq!(plan.title, "闭包（默认基础计划）");
        assert_eq!(plan.tasks.len(), 1);
        assert_eq!(plan.tasks[0].subtasks.len(), 3);
        assert!(plan.tasks[0].subtasks[0].contains("闭包"));
        assert!(plan.validate().is_ok());
    }

    #[test]
    fn stage_names_display() {
        assert_eq!(Stage::TwoStep.to_string(), "two_step");
    }
}
