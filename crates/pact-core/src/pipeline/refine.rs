//! Plan refinement from learner feedback.

use crate::error::StageError;
use crate::extract::extract_plan;
use crate::model::LanguageModel;
use crate::plan::Plan;

use super::prompts;

/// One attempt per entry, cooling down as attempts fail.
pub const REFINE_TEMPERATURES: [f32; 3] = [0.3, 0.2, 0.1];

/// Rework `current` using `insights`.
///
/// Returns the first adjusted plan that validates. When every attempt fails
/// the input plan comes back unchanged.
pub async fn refine_plan(model: &dyn LanguageModel, current: &Plan, insights: &[String]) -> Plan {
    let base = prompts::refinement(current, insights);
    tracing::info!(
        title = %current.title,
        insights = insights.len(),
        "refining learning plan"
    );

    for (index, temperature) in REFINE_TEMPERATURES.into_iter().enumerate() {
        let attempt = index + 1;
        let prompt = prompts::refinement_attempt(&base, attempt);
        match attempt_refinement(model, &prompt, temperature).await {
            Ok(plan) => {
                tracing::info!(attempt, temperature, "refinement accepted");
                return plan;
            }
            Err(StageError::Model(e)) if e.is_fatal() => {
                tracing::error!(attempt, error = %e, "model is unusable; keeping current plan");
                return current.clone();
            }
            Err(e) => {
                tracing::warn!(attempt, temperature, error = %e, "refinement attempt failed");
            }
        }
    }

    tracing::error!(
        attempts = REFINE_TEMPERATURES.len(),
        "all refinement attempts failed; keeping current plan"
    );
    current.clone()
}

async fn attempt_refinement(
    model: &dyn LanguageModel,
    prompt: &str,
    temperature: f32,
) -> Result<Plan, StageError> {
    let response = model.invoke(prompt, temperature).await?;
    extract_plan(&response)
}
