//! Single-call helpers around a plan: task elaboration, coach answers, and
//! plans derived from imported documents.

use crate::error::DocumentError;
use crate::model::LanguageModel;
use crate::plan::Plan;
use crate::request::{CoachContext, DocumentRequest, GenerationRequest, MAX_TOPIC_CHARS, Mode};

use super::generate::generate_plan;
use super::prompts;

pub const ELABORATE_TEMPERATURE: f32 = 0.4;
pub const COACH_TEMPERATURE: f32 = 0.7;
pub const DOCUMENT_TOPIC_TEMPERATURE: f32 = 0.1;

pub const ELABORATION_APOLOGY: &str = "抱歉，无法提供更详细的说明，请检查任务内容或稍后再试。";
pub const COACH_APOLOGY: &str = "抱歉，当前无法回答您的问题，请稍后再试。";
pub const DOCUMENT_PLAN_DESCRIPTION: &str = "本学习计划基于用户导入文档自动生成。";
const DEFAULT_COACH_TOPIC: &str = "当前主题";

/// Expand one task description into more detailed guidance.
pub async fn elaborate(model: &dyn LanguageModel, topic: &str, task_description: &str) -> String {
    let prompt = prompts::elaboration(topic, task_description);
    match model.invoke(&prompt, ELABORATE_TEMPERATURE).await {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(topic, error = %e, "elaboration failed");
            ELABORATION_APOLOGY.to_string()
        }
    }
}

/// Answer a learner's question in the context of their current subtasks.
pub async fn answer_question(
    model: &dyn LanguageModel,
    question: &str,
    context: &CoachContext,
) -> String {
    let topic = context
        .topic
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(DEFAULT_COACH_TOPIC);
    let prompt = prompts::coach_answer(topic, question, &context.subtasks);
    match model.invoke(&prompt, COACH_TEMPERATURE).await {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(topic, error = %e, "coach answer failed");
            COACH_APOLOGY.to_string()
        }
    }
}

/// Derive a topic from the document, then run a deep generation for it.
pub async fn generate_from_document(
    model: &dyn LanguageModel,
    request: &DocumentRequest,
) -> Result<Plan, DocumentError> {
    let raw = model
        .invoke(
            &prompts::document_topic(&request.content),
            DOCUMENT_TOPIC_TEMPERATURE,
        )
        .await?;
    let topic = clean_topic(&raw);
    if topic.is_empty() {
        return Err(DocumentError::BlankTopic);
    }
    tracing::info!(topic = %topic, "derived topic from document");

    let generation =
        GenerationRequest::new(topic, Mode::Deep).map_err(|_| DocumentError::BlankTopic)?;
    let mut plan = generate_plan(model, &generation).await;
    if let Some(first) = plan.tasks.first_mut() {
        first.description = DOCUMENT_PLAN_DESCRIPTION.to_string();
    }
    Ok(plan)
}

/// Strip quotes and whitespace the model tends to wrap a topic in, and cap
/// its length.
fn clean_topic(raw: &str) -> String {
    raw.trim()
        .trim_matches(|c: char| {
            c.is_whitespace() || matches!(c, '"' | '\'' | '“' | '”' | '「' | '」' | '《' | '》')
        })
        .chars()
        .take(MAX_TOPIC_CHARS)
        .collect()
}
