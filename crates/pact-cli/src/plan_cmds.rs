//! One-shot CLI handlers for the model-backed commands.
//!
//! Implements:
//! - `pact generate <topic> [--mode]`               -- print a generated plan
//! - `pact refine --plan <file> --insight <text>`   -- print a refined plan
//! - `pact remedial <topic> <struggle-point>`       -- print a practice plan
//! - `pact elaborate <topic> <task-description>`    -- print task guidance
//! - `pact ask <question> [--topic] [--subtask]`    -- print a coach answer
//! - `pact from-doc <file>`                         -- print a plan for a document

use std::path::Path;

use anyhow::{Context, Result, bail};

use pact_core::{
    CoachContext, CoachQuestion, DocumentRequest, ElaborationRequest, GenerationRequest, Mode,
    Plan, PlanEngine, RefinementRequest, RemedialRequest,
};

use crate::PlanCommands;

// -----------------------------------------------------------------------
// Public entry point
// -----------------------------------------------------------------------

/// Dispatch a `PlanCommands` variant to the appropriate handler.
pub async fn run_plan_command(command: PlanCommands, engine: &PlanEngine) -> Result<()> {
    match command {
        PlanCommands::Generate { topic, mode } => cmd_generate(engine, &topic, &mode).await,
        PlanCommands::Refine { plan, insight } => cmd_refine(engine, &plan, insight).await,
        PlanCommands::Remedial {
            topic,
            struggle_point,
        } => cmd_remedial(engine, &topic, &struggle_point).await,
        PlanCommands::Elaborate {
            topic,
            task_description,
        } => {
            let request = ElaborationRequest {
                topic,
                task_description,
            };
            println!("{}", engine.elaborate(&request).await);
            Ok(())
        }
        PlanCommands::Ask {
            question,
            topic,
            subtask,
        } => {
            let question = CoachQuestion {
                question,
                context: CoachContext {
                    topic,
                    subtasks: subtask,
                },
            };
            println!("{}", engine.answer(&question).await);
            Ok(())
        }
        PlanCommands::FromDoc { file } => cmd_from_doc(engine, &file).await,
    }
}

// -----------------------------------------------------------------------
// Handlers
// -----------------------------------------------------------------------

async fn cmd_generate(engine: &PlanEngine, topic: &str, mode: &str) -> Result<()> {
    let mode: Mode = mode.parse()?;
    let request = GenerationRequest::new(topic, mode)?;
    let plan = engine.generate(&request).await;
    print_plan(&plan)
}

async fn cmd_refine(engine: &PlanEngine, plan_path: &Path, insights: Vec<String>) -> Result<()> {
    let current_plan = load_plan_file(plan_path)?;
    let request = RefinementRequest {
        current_plan,
        insights,
    };
    let plan = engine.refine(&request).await;
    print_plan(&plan)
}

async fn cmd_remedial(engine: &PlanEngine, topic: &str, struggle_point: &str) -> Result<()> {
    let request = RemedialRequest::new(topic, struggle_point)?;
    let plan = engine.remedial(&request).await;
    print_plan(&plan)
}

async fn cmd_from_doc(engine: &PlanEngine, file: &Path) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read document: {}", file.display()))?;
    let request = DocumentRequest::new(content)?;
    let plan = engine
        .generate_from_document(&request)
        .await
        .context("failed to generate a plan from the document")?;
    print_plan(&plan)
}

// -----------------------------------------------------------------------
// Helpers
// -----------------------------------------------------------------------

/// Read a plan from a JSON file, as an envelope or a bare plan object.
pub fn load_plan_file(path: &Path) -> Result<Plan> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read plan file: {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("plan file is not valid JSON: {}", path.display()))?;
    let plan = Plan::from_value(value)
        .with_context(|| format!("plan file does not hold a plan: {}", path.display()))?;
    if let Err(e) = plan.validate() {
        bail!("plan file {} is incomplete: {e}", path.display());
    }
    Ok(plan)
}

fn print_plan(plan: &Plan) -> Result<()> {
    let json = serde_json::to_string_pretty(&plan.clone().into_envelope())
        .context("failed to serialize plan")?;
    println!("{json}");
    Ok(())
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), contents).unwrap();
        file
    }

    #[test]
    fn load_plan_accepts_envelope_and_bare_plan() {
        let envelope = write_temp(
            r#"{"plan": {"title": "递归", "tasks": [{"description": "d", "subtasks": ["s"]}]}}"#,
        );
        let bare = write_temp(r#"{"title": "递归", "tasks": [{"description": "d", "subtasks": ["s"]}]}"#);

        let a = load_plan_file(envelope.path()).unwrap();
        let b = load_plan_file(bare.path()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.title, "递归");
    }

    #[test]
    fn load_plan_rejects_incomplete_plan() {
        let file = write_temp(r#"{"plan": {"title": "t", "tasks": []}}"#);
        let err = load_plan_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("incomplete"), "{err}");
    }

    #[test]
    fn load_plan_rejects_non_json() {
        let file = write_temp("title = \"toml\"");
        assert!(load_plan_file(file.path()).is_err());
    }

    #[test]
    fn load_plan_reports_missing_file() {
        let err = load_plan_file(Path::new("/nonexistent/plan.json")).unwrap_err();
        assert!(err.to_string().contains("failed to read plan file"));
    }
}
