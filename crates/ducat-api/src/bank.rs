use axum::Json;
use axum::extract::{Path, State};
use axum::response::IntoResponse;

use ducat_engine::bank::{PasswordChange, Relink, Withdrawal};
use ducat_types::api::{
    BankChangePasswordRequest, BankChangePasswordResponse, BankOpenRequest, BankOpenResponse,
    BankPasswordRequest, BankRelinkResponse, BankWithdrawResponse, HackRequest, HackResponse,
    UpgradeResponse,
};

use crate::error::ApiResult;
use crate::state::{AppState, unix_now};

pub async fn open_account(
    State(state): State<AppState>,
    Json(req): Json<BankOpenRequest>,
) -> ApiResult<impl IntoResponse> {
    let (account_id, fee) =
        state
            .engine
            .bank
            .open(req.user_id, req.amount, &req.password, unix_now())?;
    Ok(Json(BankOpenResponse { account_id, fee }))
}

pub async fn withdraw(
    State(state): State<AppState>,
    Json(req): Json<BankPasswordRequest>,
) -> ApiResult<impl IntoResponse> {
    let outcome = state
        .engine
        .bank
        .withdraw(req.user_id, &req.password, unix_now())?;
    Ok(Json(match outcome {
        Withdrawal::Matched { amount, .. } => BankWithdrawResponse {
            matched: true,
            amount: Some(amount),
            miss_fee: None,
        },
        Withdrawal::Miss { fee } => BankWithdrawResponse {
            matched: false,
            amount: None,
            miss_fee: Some(fee),
        },
    }))
}

pub async fn relink(
    State(state): State<AppState>,
    Json(req): Json<BankPasswordRequest>,
) -> ApiResult<impl IntoResponse> {
    let outcome = state
        .engine
        .bank
        .relink(req.user_id, &req.password, unix_now())?;
    Ok(Json(match outcome {
        Relink::Matched { account_id } => BankRelinkResponse {
            matched: true,
            account_id: Some(account_id),
        },
        Relink::Miss => BankRelinkResponse {
            matched: false,
            account_id: None,
        },
    }))
}

pub async fn change_password(
    State(state): State<AppState>,
    Json(req): Json<BankChangePasswordRequest>,
) -> ApiResult<impl IntoResponse> {
    let outcome = state.engine.bank.change_password(
        req.user_id,
        &req.old_password,
        &req.new_password,
        unix_now(),
    )?;
    Ok(Json(match outcome {
        PasswordChange::Matched { .. } => BankChangePasswordResponse {
            matched: true,
            miss_fee: None,
        },
        PasswordChange::Miss { fee } => BankChangePasswordResponse {
            matched: false,
            miss_fee: Some(fee),
        },
    }))
}

pub async fn upgrade_interest(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let (price, level) = state.engine.bank.upgrade_interest(user_id, unix_now())?;
    Ok(Json(UpgradeResponse { price, level }))
}

pub async fn downgrade_interest(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let (refund, level) = state.engine.bank.downgrade_interest(user_id)?;
    Ok(Json(UpgradeResponse {
        price: refund,
        level,
    }))
}

pub async fn upgrade_protection(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let (price, level) = state.engine.bank.upgrade_protection(user_id, unix_now())?;
    Ok(Json(UpgradeResponse { price, level }))
}

pub async fn hack(
    State(state): State<AppState>,
    Json(req): Json<HackRequest>,
) -> ApiResult<impl IntoResponse> {
    let outcome = {
        let mut rng = state.rng();
        state.engine.bank.attempt_hack(
            req.user_id,
            req.account_id,
            &req.guess,
            unix_now(),
            &mut *rng,
        )?
    };
    Ok(Json(HackResponse {
        success: outcome.success,
        cracked: outcome.cracked,
        hints: outcome.hints,
    }))
}
