//! The plan pipelines.
//!
//! Every operation here degrades instead of failing: generation walks the
//! stage cascade down to a default plan, refinement falls back to the input
//! plan, remedial generation to a fixed practice plan, and the text helpers
//! to an apology. Only [`PlanEngine::generate_from_document`] can fail, when
//! no topic can be derived.

pub mod assist;
pub mod generate;
pub mod prompts;
pub mod refine;
pub mod remedial;

use std::sync::Arc;

use crate::error::DocumentError;
use crate::model::LanguageModel;
use crate::plan::Plan;
use crate::request::{
    CoachQuestion, DocumentRequest, ElaborationRequest, GenerationRequest, RefinementRequest,
    RemedialRequest,
};

pub use assist::{answer_question, elaborate, generate_from_document};
pub use generate::{Stage, default_plan, generate_plan};
pub use refine::{REFINE_TEMPERATURES, refine_plan};
pub use remedial::{fallback_remedial_plan, generate_remedial};

/// Shared entry point over one model. Cheap to clone; holds no per-request
/// state.
#[derive(Clone)]
pub struct PlanEngine {
    model: Arc<dyn LanguageModel>,
}

impl std::fmt::Debug for PlanEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlanEngine").finish_non_exhaustive()
    }
}

impl PlanEngine {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &dyn LanguageModel {
        self.model.as_ref()
    }

    pub async fn generate(&self, request: &GenerationRequest) -> Plan {
        generate_plan(self.model(), request).await
    }

    pub async fn refine(&self, request: &RefinementRequest) -> Plan {
        refine_plan(self.model(), &request.current_plan, &request.insights).await
    }

    pub async fn remedial(&self, request: &RemedialRequest) -> Plan {
        generate_remedial(self.model(), request).await
    }

    pub async fn elaborate(&self, request: &ElaborationRequest) -> String {
        elaborate(self.model(), &request.topic, &request.task_description).await
    }

    pub async fn answer(&self, question: &CoachQuestion) -> String {
        answer_question(self.model(), &question.question, &question.context).await
    }

    pub async fn generate_from_document(
        &self,
        request: &DocumentRequest,
    ) -> Result<Plan, DocumentError> {
        generate_from_document(self.model(), request).await
    }
}
