use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;

use ducat_types::api::{
    DailySweepResponse, ForfeitResponse, LuckyDropResponse, TaxSettlementResponse,
    UserActionRequest,
};

use crate::error::ApiResult;
use crate::state::{AppState, unix_now};

pub async fn settle_daily_fees(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let sweep = state.engine.jobs.settle_daily_fees()?;
    Ok(Json(DailySweepResponse {
        checked: sweep.checked,
        collected: sweep.collected,
        banned: sweep.banned,
    }))
}

pub async fn settle_guild_taxes(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let outcomes = state.engine.jobs.settle_guild_taxes(unix_now())?;
    let outcomes: Vec<TaxSettlementResponse> = outcomes
        .into_iter()
        .map(|o| TaxSettlementResponse {
            guild_id: o.guild_id,
            collected: o.collected,
            fine: o.fine,
            paid: o.paid,
            unpaid: o.unpaid,
            poor: o.poor,
        })
        .collect();
    Ok(Json(outcomes))
}

pub async fn lucky_drop(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let winners = {
        let mut rng = state.rng();
        state.engine.jobs.lucky_drop(&mut *rng)?
    };
    Ok(Json(LuckyDropResponse { winners }))
}

pub async fn forfeit_on_leave(
    State(state): State<AppState>,
    Json(req): Json<UserActionRequest>,
) -> ApiResult<impl IntoResponse> {
    let (to_id, amount) = {
        let mut rng = state.rng();
        state.engine.jobs.forfeit_on_leave(req.user_id, &mut *rng)?
    };
    Ok(Json(ForfeitResponse { to_id, amount }))
}
