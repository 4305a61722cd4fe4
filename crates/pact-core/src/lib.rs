//! Resilient generation of structured learning plans from a remote
//! text-generation model.
//!
//! The model is unreliable: it may time out, return prose instead of JSON,
//! or produce JSON of the wrong shape. The crate layers three defences:
//!
//! - [`model`]: bounded retries with exponential backoff and an overall
//!   timeout around each call.
//! - [`extract`]: several parsing strategies, strictest first, to recover
//!   structured data from free-form text.
//! - [`pipeline`]: ordered fallback stages ending in a deterministic plan,
//!   so callers always receive a valid [`Plan`].

pub mod error;
pub mod extract;
pub mod model;
pub mod pipeline;
pub mod plan;
pub mod request;
pub mod stream;

pub use error::{
    DocumentError, ExtractionError, ModelError, RequestError, StageError, TransportError,
    ValidationError,
};
pub use model::{LanguageModel, ModelConfig, ModelInvoker};
pub use pipeline::PlanEngine;
pub use plan::{Plan, PlanEnvelope, Task};
pub use request::{
    CoachContext, CoachQuestion, DocumentRequest, ElaborationRequest, GenerationRequest, Mode,
    RefinementRequest, RemedialRequest,
};
