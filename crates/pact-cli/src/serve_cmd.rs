use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderName, StatusCode, header};
use axum::response::IntoResponse;
use axum::response::sse::{Event, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::{Stream, StreamExt};
use serde::Deserialize;
use tower_http::cors::CorsLayer;

use pact_core::stream::{self, DEFAULT_PACE, StreamEvent};
use pact_core::{
    CoachQuestion, DocumentRequest, ElaborationRequest, GenerationRequest, Mode, Plan,
    PlanEngine, RefinementRequest, RemedialRequest, RequestError,
};

const READY_MESSAGE: &str = "智能学习引擎运行中，等待请求。";
const STREAM_NEEDS_POST: &str = "请使用POST方法请求此接口。";

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.into(),
        }
    }

    /// A 500 whose body never carries the underlying error text.
    pub fn internal(public_message: &str, err: &dyn std::error::Error) -> Self {
        tracing::error!(error = %err, "{public_message}");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: public_message.to_string(),
        }
    }
}

impl From<RequestError> for AppError {
    fn from(err: RequestError) -> Self {
        Self::bad_request(err.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(format!("invalid request body: {}", rejection.body_text()))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let body = serde_json::json!({ "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct GenerateBody {
    pub topic: String,
    #[serde(default)]
    pub mode: Mode,
}

#[derive(Debug, Deserialize)]
pub struct AdjustBody {
    /// Plan envelope or bare plan.
    pub current_task: serde_json::Value,
    #[serde(default)]
    pub insights: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct RemedialBody {
    pub topic: String,
    pub struggle_point: String,
}

#[derive(Debug, Deserialize)]
pub struct DocumentBody {
    pub content: String,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

#[derive(Clone)]
struct AppState {
    engine: Arc<PlanEngine>,
    pace: Option<Duration>,
}

pub fn build_router(engine: Arc<PlanEngine>) -> Router {
    build_router_with_pace(engine, Some(DEFAULT_PACE))
}

/// Like [`build_router`], with an explicit delay between stream chunks.
pub fn build_router_with_pace(engine: Arc<PlanEngine>, pace: Option<Duration>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/generate-task", post(generate_task))
        .route(
            "/api/generate-task-stream",
            get(generate_task_stream_get).post(generate_task_stream),
        )
        .route(
            "/api/generate-task-from-document",
            post(generate_task_from_document),
        )
        .route("/api/adjust-task", post(adjust_task))
        .route("/api/initiate-remedial-loop", post(initiate_remedial_loop))
        .route("/api/elaborate-task", post(elaborate_task))
        .route("/api/ask-coach", post(ask_coach))
        .layer(CorsLayer::permissive())
        .with_state(AppState { engine, pace })
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub async fn run_serve(engine: Arc<PlanEngine>, bind: &str, port: u16) -> Result<()> {
    let app = build_router(engine);
    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    tracing::info!("pact serve listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("pact serve shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install Ctrl+C handler; serving until killed");
        std::future::pending::<()>().await;
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

type JsonBody<T> = Result<Json<T>, JsonRejection>;

fn plan_response(plan: &Plan) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "success": true, "plan": plan }))
}

async fn index() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": READY_MESSAGE }))
}

async fn generate_task(
    State(state): State<AppState>,
    body: JsonBody<GenerateBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let Json(body) = body?;
    let request = GenerationRequest::new(body.topic, body.mode)?;
    tracing::info!(topic = %request.topic, mode = %request.mode, "generate-task request");
    let plan = state.engine.generate(&request).await;
    Ok(plan_response(&plan))
}

async fn generate_task_stream_get() -> impl IntoResponse {
    Sse::new(sse_events(stream::message_stream(STREAM_NEEDS_POST)))
}

async fn generate_task_stream(
    State(state): State<AppState>,
    body: JsonBody<GenerateBody>,
) -> Result<impl IntoResponse, AppError> {
    let Json(body) = body?;
    let request = GenerationRequest::new(body.topic, body.mode)?;
    tracing::info!(topic = %request.topic, mode = %request.mode, "generate-task-stream request");

    let AppState { engine, pace } = state;
    let events = futures::stream::once(async move { engine.generate(&request).await })
        .flat_map(move |plan| stream::plan_stream(&plan, pace));

    let headers = [
        (header::CACHE_CONTROL, "no-cache"),
        (HeaderName::from_static("x-accel-buffering"), "no"),
    ];
    Ok((headers, Sse::new(sse_events(events))))
}

fn sse_events(
    events: impl Stream<Item = StreamEvent> + Send + 'static,
) -> impl Stream<Item = Result<Event, Infallible>> + Send + 'static {
    events.map(|event| Ok::<_, Infallible>(Event::default().data(event.data())))
}

async fn generate_task_from_document(
    State(state): State<AppState>,
    body: JsonBody<DocumentBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let Json(body) = body?;
    let request = DocumentRequest::new(body.content)?;
    tracing::info!(chars = request.content.chars().count(), "generate-task-from-document request");
    let plan = state
        .engine
        .generate_from_document(&request)
        .await
        .map_err(|e| AppError::internal("无法基于文档生成学习计划。", &e))?;
    Ok(plan_response(&plan))
}

async fn adjust_task(
    State(state): State<AppState>,
    body: JsonBody<AdjustBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let Json(body) = body?;
    let current_plan = Plan::from_value(body.current_task)
        .map_err(|e| AppError::bad_request(format!("current_task is not a plan: {e}")))?;
    current_plan
        .validate()
        .map_err(|e| AppError::bad_request(format!("current_task is incomplete: {e}")))?;

    let request = RefinementRequest {
        current_plan,
        insights: body.insights,
    };
    let plan = state.engine.refine(&request).await;
    Ok(plan_response(&plan))
}

async fn initiate_remedial_loop(
    State(state): State<AppState>,
    body: JsonBody<RemedialBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let Json(body) = body?;
    let request = RemedialRequest::new(body.topic, body.struggle_point)?;
    tracing::info!(
        topic = %request.topic,
        struggle_point = %request.struggle_point,
        "initiate-remedial-loop request"
    );
    let plan = state.engine.remedial(&request).await;
    Ok(plan_response(&plan))
}

async fn elaborate_task(
    State(state): State<AppState>,
    body: JsonBody<ElaborationRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let Json(request) = body?;
    let elaboration = state.engine.elaborate(&request).await;
    Ok(Json(
        serde_json::json!({ "success": true, "elaboration": elaboration }),
    ))
}

async fn ask_coach(
    State(state): State<AppState>,
    body: JsonBody<CoachQuestion>,
) -> Result<Json<serde_json::Value>, AppError> {
    let Json(question) = body?;
    let answer = state.engine.answer(&question).await;
    Ok(Json(serde_json::json!({ "success": true, "answer": answer })))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
