use axum::Json;
use axum::extract::{Path, State};
use axum::response::IntoResponse;

use ducat_engine::EngineError;
use ducat_engine::users::Recipient;
use ducat_types::api::{
    CasinoRequest, CasinoResponse, EnsureUserRequest, HugRequest, MsgCodeResponse,
    RewardResponse, SetPolicyRequest, SnapshotResponse, TransferRequest, TransferResponse,
};
use ducat_types::models::Currency;

use crate::error::ApiResult;
use crate::state::{AppState, unix_now};

pub async fn ensure_user(
    State(state): State<AppState>,
    Json(req): Json<EnsureUserRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = state.engine.users.ensure(
        req.id,
        req.username.as_deref(),
        req.first_name.as_deref(),
        req.last_name.as_deref(),
        unix_now(),
    )?;
    Ok(Json(user))
}

pub async fn snapshot(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let snapshot = state.engine.snapshot(user_id, unix_now())?;
    Ok(Json(SnapshotResponse {
        user: snapshot.user,
        guild: snapshot.guild,
        bank_total: snapshot.bank_total,
        interest_percent: snapshot.interest_percent,
    }))
}

pub async fn agree_terms(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    state.engine.users.agree_terms(user_id)?;
    Ok(Json(serde_json::json!({ "agreed": true })))
}

pub async fn set_policy(
    State(state): State<AppState>,
    Json(req): Json<SetPolicyRequest>,
) -> ApiResult<impl IntoResponse> {
    state.engine.users.set_policy(req.user_id, req.policy)?;
    Ok(Json(serde_json::json!({ "policy": req.policy })))
}

pub async fn hug(
    State(state): State<AppState>,
    Json(req): Json<HugRequest>,
) -> ApiResult<impl IntoResponse> {
    let reward = state.engine.users.hug(req.from_id, req.to_id, unix_now())?;
    Ok(Json(RewardResponse { reward }))
}

pub async fn chat_reward(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let reward = state.engine.users.chat_reward(user_id, unix_now())?;
    Ok(Json(RewardResponse { reward }))
}

pub async fn transfer(
    State(state): State<AppState>,
    Json(req): Json<TransferRequest>,
) -> ApiResult<impl IntoResponse> {
    let recipient = match (&req.to_id, &req.msg_code) {
        (Some(id), None) => Recipient::Id(*id),
        (None, Some(code)) => Recipient::MsgCode(code.clone()),
        _ => {
            return Err(EngineError::Validation(
                "exactly one of to_id and msg_code is required".into(),
            )
            .into());
        }
    };

    let (transfer_id, fee) = match req.currency {
        Currency::Coins => state.engine.users.send_coins(
            req.from_id,
            &recipient,
            req.amount,
            req.comment.as_deref(),
            unix_now(),
        )?,
        Currency::Crystals => {
            let id = state.engine.users.send_crystals(
                req.from_id,
                &recipient,
                req.amount,
                req.comment.as_deref(),
                unix_now(),
            )?;
            (id, 0)
        }
    };
    Ok(Json(TransferResponse { transfer_id, fee }))
}

pub async fn buy_msg_code(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let code = {
        let mut rng = state.rng();
        state.engine.users.buy_msg_code(user_id, unix_now(), &mut *rng)?
    };
    Ok(Json(MsgCodeResponse { code }))
}

pub async fn casino_play(
    State(state): State<AppState>,
    Json(req): Json<CasinoRequest>,
) -> ApiResult<impl IntoResponse> {
    let payout = {
        let mut rng = state.rng();
        state
            .engine
            .users
            .casino_play(req.user_id, req.mode, req.bet, unix_now(), &mut *rng)?
    };
    Ok(Json(CasinoResponse { payout }))
}
