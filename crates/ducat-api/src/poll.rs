use axum::Json;
use axum::extract::{Path, State};
use axum::response::IntoResponse;

use ducat_engine::EngineError;
use ducat_engine::poll::{ReportOutcome, VoteOutcome};
use ducat_types::api::{ReportRequest, ReportResponse, UserActionRequest, VoteRequest, VoteResponse};

use crate::error::ApiResult;
use crate::state::{AppState, unix_now};

pub async fn file_report(
    State(state): State<AppState>,
    Json(req): Json<ReportRequest>,
) -> ApiResult<impl IntoResponse> {
    let outcome = state.engine.polls.file_report(
        req.from_id,
        req.to_id,
        req.comment.as_deref(),
        unix_now(),
    )?;
    Ok(Json(match outcome {
        ReportOutcome::Filed { reports, weight } => ReportResponse {
            poll_id: None,
            reports,
            weight,
        },
        ReportOutcome::PollOpened { poll_id } => ReportResponse {
            poll_id: Some(poll_id),
            reports: 0,
            weight: 0,
        },
    }))
}

pub async fn cast_vote(
    State(state): State<AppState>,
    Path(poll_id): Path<i64>,
    Json(req): Json<VoteRequest>,
) -> ApiResult<impl IntoResponse> {
    let outcome = {
        let mut rng = state.rng();
        state
            .engine
            .polls
            .cast_vote(poll_id, req.user_id, req.decision, unix_now(), &mut *rng)?
    };
    Ok(Json(match outcome {
        VoteOutcome::Recorded { .. } => VoteResponse {
            resolved: false,
            expired: false,
            verdict: None,
            severity: None,
        },
        VoteOutcome::Resolved { verdict, severity } => VoteResponse {
            resolved: true,
            expired: false,
            verdict: Some(verdict),
            severity,
        },
        VoteOutcome::Expired => VoteResponse {
            resolved: false,
            expired: true,
            verdict: None,
            severity: None,
        },
    }))
}

pub async fn get_poll(
    State(state): State<AppState>,
    Path(poll_id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let poll = state
        .engine
        .polls
        .get(poll_id)?
        .ok_or_else(|| EngineError::NotFound(format!("poll {poll_id} does not exist")))?;
    Ok(Json(poll))
}

pub async fn purge_reports(
    State(state): State<AppState>,
    Json(req): Json<UserActionRequest>,
) -> ApiResult<impl IntoResponse> {
    state.engine.polls.purge_reports(req.user_id, unix_now())?;
    Ok(Json(serde_json::json!({ "purged": true })))
}
