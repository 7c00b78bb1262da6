//! HTTP layer (Axum).
//!
//! - `GET /` / `POST /`: the server-rendered form and its submission.
//! - `GET /api/link`, `POST /api/submissions`: the same operations as JSON.
//! - `GET /health`: liveness, also used by uptime pingers.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Html,
    routing::{get, post},
    Form, Json, Router,
};
use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::auth::{now_unix, validate_link};
use crate::error::{AppError, ValidationError};
use crate::models::{
    check_birth_date, Category, CategoryRow, LinkDecision, LinkQuery, Priority, Respondent,
    SubmissionBatch, TargetCategory,
};
use crate::page::{render_form, render_success, FormSubmission, Notice};
use crate::storage::SheetStore;
use crate::submission::build;

/// Shared state for handlers: the sheet connection made at startup and the link secret.
#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn SheetStore>,
    link_secret: Arc<str>,
}

impl AppState {
    pub fn new(store: Arc<dyn SheetStore>, link_secret: &str) -> Self {
        Self {
            store,
            link_secret: Arc::from(link_secret),
        }
    }

    fn check_link(&self, link: &LinkQuery) -> LinkDecision {
        validate_link(link, self.link_secret.as_bytes(), now_unix())
    }
}

/// One vórtice row in a JSON submission; the category comes from its position.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RowInput {
    pub priority: Priority,
    #[serde(default)]
    pub target: TargetCategory,
    #[serde(default)]
    pub justification: String,
}

/// DTO for `POST /api/submissions`. Rows are Consigo, Com o Outro, Com o Todo.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SubmissionRequest {
    #[serde(flatten)]
    pub link: LinkQuery,
    pub full_name: String,
    pub birth_date: NaiveDate,
    #[serde(default)]
    pub contact: String,
    #[serde(default)]
    pub area_or_company: String,
    #[serde(default)]
    pub role: String,
    pub rows: [RowInput; 3],
}

#[derive(Serialize, Deserialize, Debug)]
pub struct SubmissionResponse {
    pub success: bool,
    pub message: String,
    pub submission_id: Uuid,
    pub organization_id: String,
    pub timestamp: String,
    pub rows: usize,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub success: bool,
    pub message: String,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(form_page_handler).post(form_submit_handler))
        .route("/api/link", get(link_handler))
        .route("/api/submissions", post(submission_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Builds the batch and appends it in one call. Nothing is retried.
async fn submit(
    state: &AppState,
    respondent: &Respondent,
    rows: &[CategoryRow; 3],
    now: NaiveDateTime,
) -> Result<(Uuid, SubmissionBatch), AppError> {
    let submission_id = Uuid::new_v4();

    let batch = build(respondent, rows, now).inspect_err(|e| {
        warn!(%submission_id, error = ?e, "Submission rejected");
    })?;

    state.store.append_rows(&batch.rows).await.inspect_err(|e| {
        error!(%submission_id, error = %e, "Append to sheet failed");
    })?;

    info!(
        %submission_id,
        organization_id = %batch.organization_id,
        rows = batch.rows.len(),
        "Submission appended"
    );
    Ok((submission_id, batch))
}

async fn form_page_handler(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> (StatusCode, Html<String>) {
    let link = LinkQuery::from_pairs(params);
    let decision = state.check_link(&link);
    let status = if decision.valid { StatusCode::OK } else { StatusCode::FORBIDDEN };
    let form = FormSubmission::blank(&link);
    (status, Html(render_form(&decision, &form, None, local_now().date())))
}

async fn form_submit_handler(
    State(state): State<AppState>,
    Form(form): Form<FormSubmission>,
) -> (StatusCode, Html<String>) {
    let now = local_now();
    let today = now.date();
    let decision = state.check_link(&form.link());
    if !decision.valid {
        return (StatusCode::FORBIDDEN, Html(render_form(&decision, &form, None, today)));
    }

    let parsed = form.parse(&decision.organization, today).map_err(AppError::from);
    let outcome = match parsed {
        Ok((respondent, rows)) => submit(&state, &respondent, &rows, now).await,
        Err(e) => Err(e),
    };

    match outcome {
        Ok((_, batch)) => (StatusCode::OK, Html(render_success(&batch))),
        Err(e) => {
            let (status, notice) = match &e {
                AppError::Validation(ValidationError::MissingCategory) => {
                    (StatusCode::UNPROCESSABLE_ENTITY, Notice::warning(e.to_string()))
                }
                AppError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, Notice::error(e.to_string())),
                AppError::Store(_) => (StatusCode::BAD_GATEWAY, Notice::error(e.to_string())),
                AppError::LinkInvalid(_) => (StatusCode::FORBIDDEN, Notice::error(e.to_string())),
            };
            (status, Html(render_form(&decision, &form, Some(&notice), today)))
        }
    }
}

async fn link_handler(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Json<LinkDecision> {
    Json(state.check_link(&LinkQuery::from_pairs(params)))
}

async fn submission_handler(
    State(state): State<AppState>,
    Json(payload): Json<SubmissionRequest>,
) -> Result<(StatusCode, Json<SubmissionResponse>), AppError> {
    let decision = state.check_link(&payload.link);
    if !decision.valid {
        return Err(AppError::LinkInvalid(decision.status.message()));
    }

    let now = local_now();
    let respondent = Respondent {
        full_name: payload.full_name,
        birth_date: check_birth_date(payload.birth_date, now.date())?,
        contact: payload.contact,
        area_or_company: payload.area_or_company,
        role: payload.role,
        organization: decision.organization,
    };
    let [first, second, third] = payload.rows;
    let rows = [
        (Category::Consigo, first),
        (Category::ComOOutro, second),
        (Category::ComOTodo, third),
    ]
    .map(|(category, row)| CategoryRow {
        category,
        priority: row.priority,
        target: row.target,
        justification: row.justification,
    });

    let (submission_id, batch) = submit(&state, &respondent, &rows, now).await?;
    Ok((
        StatusCode::CREATED,
        Json(SubmissionResponse {
            success: true,
            message: "Formulário enviado com sucesso!".to_string(),
            submission_id,
            organization_id: batch.organization_id,
            timestamp: batch.timestamp,
            rows: batch.rows.len(),
        }),
    ))
}

/// Health check handler
async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        success: true,
        message: "fractal_form healthy".to_string(),
    })
}
