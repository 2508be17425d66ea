//! HTTP endpoint handlers. These are thin wrappers that forward to core
//! logic. Each handler is instrumented and logs parameters and basic
//! result info. User identity arrives as an `X-User-Id` header that an
//! upstream proxy has already verified; handlers only require its presence.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tracing::{info, instrument};

use crate::challenge::{self, ChallengeError};
use crate::plan::{self, PlanError};
use crate::protocol::*;
use crate::state::AppState;
use crate::stats::plan_stats;
use crate::store::StoreError;

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ErrorOut { error: message.into() })).into_response()
}

fn require_user(headers: &HeaderMap) -> Result<String, Response> {
    headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| error_response(StatusCode::UNAUTHORIZED, "Missing X-User-Id header"))
}

fn challenge_error_response(e: ChallengeError) -> Response {
    error_response(StatusCode::BAD_REQUEST, e.to_string())
}

fn plan_error_response(e: PlanError) -> Response {
    match &e {
        PlanError::MissingGoal => error_response(StatusCode::BAD_REQUEST, e.to_string()),
        PlanError::AiUnavailable => error_response(StatusCode::SERVICE_UNAVAILABLE, e.to_string()),
        PlanError::Generation(_) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Could not generate the plan. Check your API key or try again.",
        ),
        PlanError::Store(inner) => store_error_response_ref(inner),
    }
}

fn store_error_response_ref(e: &StoreError) -> Response {
    match e {
        StoreError::PlanLimit => error_response(StatusCode::BAD_REQUEST, e.to_string()),
        StoreError::UnknownPlan(_) => error_response(StatusCode::NOT_FOUND, e.to_string()),
    }
}

fn store_error_response(e: StoreError) -> Response {
    store_error_response_ref(&e)
}

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse {
    Json(HealthOut { ok: true })
}

#[instrument(level = "info", skip(state, headers), fields(index = q.index.unwrap_or(0)))]
pub async fn http_get_challenge(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(q): Query<ChallengeQuery>,
) -> Response {
    let user = match require_user(&headers) {
        Ok(u) => u,
        Err(r) => return r,
    };
    let index = q.index.unwrap_or(0);
    match challenge::get_or_generate(&state, &user, index).await {
        Ok(outcome) => {
            info!(target: "challenge", %user, index, id = %outcome.challenge.id, origin = outcome.origin.label(), "HTTP challenge served");
            Json(ChallengeOut { challenge: outcome.challenge, origin: outcome.origin, index })
                .into_response()
        }
        Err(e) => challenge_error_response(e),
    }
}

#[instrument(level = "info", skip(state, headers, body), fields(challenge_id = %body.challenge.id, code_len = body.code.len()))]
pub async fn http_submit_code(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<SubmitIn>,
) -> Response {
    let user = match require_user(&headers) {
        Ok(u) => u,
        Err(r) => return r,
    };
    match challenge::submit_code(&state, &user, body.challenge, body.code).await {
        Ok(result) => {
            info!(target: "challenge", %user, success = result.evaluation.success, score = result.evaluation.score, "HTTP submission evaluated");
            Json(SubmitOut { evaluation: result.evaluation, stats: result.stats }).into_response()
        }
        Err(e) => challenge_error_response(e),
    }
}

#[instrument(level = "info", skip(state, headers))]
pub async fn http_get_stats(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(q): Query<StatsQuery>,
) -> Response {
    let user = match require_user(&headers) {
        Ok(u) => u,
        Err(r) => return r,
    };
    let plan_id = match resolve_plan_id(&state, &user, q.plan_id).await {
        Ok(id) => id,
        Err(r) => return r,
    };
    let history = state.store.plan_history(&user, &plan_id).await;
    Json(plan_stats(&history, &plan_id)).into_response()
}

#[instrument(level = "info", skip(state, headers))]
pub async fn http_get_history(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(q): Query<StatsQuery>,
) -> Response {
    let user = match require_user(&headers) {
        Ok(u) => u,
        Err(r) => return r,
    };
    let plan_id = match resolve_plan_id(&state, &user, q.plan_id).await {
        Ok(id) => id,
        Err(r) => return r,
    };
    let entries = state.store.plan_history(&user, &plan_id).await;
    Json(HistoryOut { entries }).into_response()
}

async fn resolve_plan_id(
    state: &AppState,
    user: &str,
    requested: Option<String>,
) -> Result<String, Response> {
    match requested {
        Some(id) => Ok(id),
        None => state
            .store
            .current_plan(user)
            .await
            .map(|p| p.id)
            .ok_or_else(|| error_response(StatusCode::BAD_REQUEST, "no learning plan configured")),
    }
}

#[instrument(level = "info", skip(state, headers, body), fields(goal_len = body.goal.len()))]
pub async fn http_create_plan(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<PlanIn>,
) -> Response {
    let user = match require_user(&headers) {
        Ok(u) => u,
        Err(r) => return r,
    };
    match plan::create_plan(&state, &user, &body.goal, &body.experience).await {
        Ok(saved) => {
            let plans_count = state.store.progress(&user).await.learning_plan.plans.len();
            info!(target: "plan", %user, plan_id = %saved.id, plans_count, "HTTP plan created");
            Json(PlanOut { success: true, plan: saved, plans_count }).into_response()
        }
        Err(e) => plan_error_response(e),
    }
}

#[instrument(level = "info", skip(state, headers, body), fields(plan_id = %body.plan_id))]
pub async fn http_switch_plan(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<SwitchIn>,
) -> Response {
    let user = match require_user(&headers) {
        Ok(u) => u,
        Err(r) => return r,
    };
    match state.store.switch_plan(&user, &body.plan_id).await {
        Ok(plan) => {
            info!(target: "plan", %user, plan_id = %plan.id, "HTTP plan switched");
            Json(SwitchOut { success: true, plan }).into_response()
        }
        Err(e) => store_error_response(e),
    }
}

#[instrument(level = "info", skip(state, headers), fields(%plan_id))]
pub async fn http_delete_plan(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(plan_id): Path<String>,
) -> Response {
    let user = match require_user(&headers) {
        Ok(u) => u,
        Err(r) => return r,
    };
    match state.delete_plan(&user, &plan_id).await {
        Ok(()) => {
            info!(target: "plan", %user, %plan_id, "HTTP plan deleted");
            Json(OkOut { success: true, message: "Plan deleted".into() }).into_response()
        }
        Err(e) => store_error_response(e),
    }
}

#[instrument(level = "info", skip(state, headers))]
pub async fn http_list_plans(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Response {
    let user = match require_user(&headers) {
        Ok(u) => u,
        Err(r) => return r,
    };
    let progress = state.store.progress(&user).await;
    Json(PlansOut {
        plans: progress.learning_plan.plans,
        current_plan: progress.learning_plan.current_plan,
    })
    .into_response()
}

#[instrument(level = "info", skip(state, headers))]
pub async fn http_clear_plans(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Response {
    let user = match require_user(&headers) {
        Ok(u) => u,
        Err(r) => return r,
    };
    state.clear_plans(&user).await;
    info!(target: "plan", %user, "HTTP plans cleared");
    Json(OkOut { success: true, message: "All plans have been deleted".into() }).into_response()
}

#[instrument(level = "info", skip(state))]
pub async fn http_debug_cache(State(state): State<Arc<AppState>>) -> Response {
    Json(state.cache.read().await.stats()).into_response()
}
