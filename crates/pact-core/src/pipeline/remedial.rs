//! Focused practice plans for a single struggle point.

use crate::error::StageError;
use crate::extract::extract;
use crate::model::LanguageModel;
use crate::plan::Plan;
use crate::request::RemedialRequest;

use super::prompts;

pub const REMEDIAL_TEMPERATURE: f32 = 0.1;

/// Generate a short practice plan. Falls back to
/// [`fallback_remedial_plan`] on any failure.
pub async fn generate_remedial(model: &dyn LanguageModel, request: &RemedialRequest) -> Plan {
    let RemedialRequest {
        topic,
        struggle_point,
    } = request;
    tracing::info!(topic = %topic, struggle_point = %struggle_point, "generating remedial plan");

    match attempt(model, topic, struggle_point).await {
        Ok(plan) => plan,
        Err(e) => {
            tracing::warn!(struggle_point = %struggle_point, error = %e, "remedial generation failed; using fallback");
            fallback_remedial_plan(struggle_point)
        }
    }
}

async fn attempt(
    model: &dyn LanguageModel,
    topic: &str,
    struggle_point: &str,
) -> Result<Plan, StageError> {
    let response = model
        .invoke(
            &prompts::remedial(topic, struggle_point),
            REMEDIAL_TEMPERATURE,
        )
        .await?;
    let plan = Plan::from_value(extract(&response)?.value)?;
    plan.validate_titled()?;
    Ok(plan)
}

/// Deterministic practice plan for `struggle_point`.
pub fn fallback_remedial_plan(struggle_point: &str) -> Plan {
    Plan::single_task(
        format!("强化练习: {struggle_point} (默认)"),
        format!("针对'{struggle_point}'，请复习基本定义和核心概念。"),
        vec![
            format!("重新学习'{struggle_point}'相关定义。"),
            format!("查找至少两个'{struggle_point}'的示例。"),
            format!("尝试用自己的话解释'{struggle_point}'。"),
        ],
    )
}
