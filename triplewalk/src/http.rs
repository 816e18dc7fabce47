//! HTTP query endpoint.
//!
//! Walk pipelines arrive as JSON and run against the shared graph:
//!
//! ```text
//! POST /walk  {"vertex": "a", "steps": [{"out": "p1"}, "all_out"], "limit": 10}
//! GET  /stats
//! ```
//!
//! A step is one of `{"out": p}`, `{"in": p}`, `"all_out"`, `"all_in"` or
//! `{"has": {"field": "o", "equals": "i"}}`.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use crate::query::{self, Stepper, steps};
use crate::storage::{Graph, GraphStats, KvEngine};
use crate::types::Triple;

/// Paths returned when a request sets no limit.
pub const DEFAULT_WALK_LIMIT: u64 = 1000;

/// Body of `POST /walk`.
#[derive(Debug, Clone, Deserialize)]
pub struct WalkRequest {
    pub vertex: String,
    pub steps: Vec<Step>,
    pub limit: Option<u64>,
}

/// One declarative pipeline step.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Out(String),
    In(String),
    AllOut,
    AllIn,
    Has(FieldEquals),
}

/// Filter keeping paths whose last triple has `field == equals`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FieldEquals {
    pub field: Field,
    pub equals: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    S,
    P,
    O,
    V,
}

impl Field {
    fn of(self, triple: &Triple) -> &[u8] {
        match self {
            Self::S => &triple.s,
            Self::P => &triple.p,
            Self::O => &triple.o,
            Self::V => &triple.v,
        }
    }
}

impl Step {
    fn into_stepper(self) -> Stepper {
        match self {
            Self::Out(p) => steps::out(p),
            Self::In(p) => steps::inbound(p),
            Self::AllOut => steps::all_out(),
            Self::AllIn => steps::all_in(),
            Self::Has(FieldEquals { field, equals }) => {
                steps::has(move |t| field.of(t) == equals.as_bytes())
            }
        }
    }
}

/// Body of a successful `POST /walk`: each path as `[s, p, o, v]` rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalkResponse {
    pub paths: Vec<Vec<[String; 4]>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Errors reported to HTTP clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

/// Routes for querying `graph`.
#[must_use]
pub fn router<E: KvEngine>(graph: Arc<Graph<E>>) -> Router {
    Router::new()
        .route("/walk", post(walk_handler::<E>))
        .route("/stats", get(stats_handler::<E>))
        .with_state(graph)
}

/// `POST /walk`
pub async fn walk_handler<E: KvEngine>(
    State(graph): State<Arc<Graph<E>>>,
    Json(request): Json<WalkRequest>,
) -> Result<Json<WalkResponse>, ApiError> {
    if request.steps.is_empty() {
        return Err(ApiError::BadRequest("steps must not be empty".to_string()));
    }
    if request.steps.iter().all(|s| matches!(s, Step::Has(_))) {
        return Err(ApiError::BadRequest(
            "steps must include at least one out/in step".to_string(),
        ));
    }

    let limit = request.limit.unwrap_or(DEFAULT_WALK_LIMIT);
    let limit = usize::try_from(limit).unwrap_or(usize::MAX);
    let pipeline: Vec<Stepper> = request.steps.into_iter().map(Step::into_stepper).collect();
    tracing::debug!(
        "walk request from '{}' with {} steps, limit {}",
        request.vertex,
        pipeline.len(),
        limit
    );

    let paths = query::walk(&graph, request.vertex, pipeline)
        .collect_up_to(limit)
        .await;
    Ok(Json(WalkResponse {
        paths: paths.iter().map(query::Path::strings).collect(),
    }))
}

/// `GET /stats`
pub async fn stats_handler<E: KvEngine>(State(graph): State<Arc<Graph<E>>>) -> Json<GraphStats> {
    Json(graph.stats())
}
