use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;

use ducat_types::api::{
    CancelOffersResponse, MarketBookResponse, PlaceOfferRequest, PlaceOfferResponse,
    UserActionRequest,
};
use ducat_types::models::OfferDirection;

use crate::error::ApiResult;
use crate::state::{AppState, unix_now};

pub async fn place_sell(
    State(state): State<AppState>,
    Json(req): Json<PlaceOfferRequest>,
) -> ApiResult<impl IntoResponse> {
    let (offer_id, trades) =
        state
            .engine
            .market
            .place_sell(req.user_id, req.crystals, req.price, unix_now())?;
    Ok(Json(PlaceOfferResponse { offer_id, trades }))
}

pub async fn place_buy(
    State(state): State<AppState>,
    Json(req): Json<PlaceOfferRequest>,
) -> ApiResult<impl IntoResponse> {
    let (offer_id, trades) =
        state
            .engine
            .market
            .place_buy(req.user_id, req.crystals, req.price, unix_now())?;
    Ok(Json(PlaceOfferResponse { offer_id, trades }))
}

pub async fn cancel_sells(
    State(state): State<AppState>,
    Json(req): Json<UserActionRequest>,
) -> ApiResult<impl IntoResponse> {
    let refunded = state.engine.market.cancel(req.user_id, OfferDirection::Sell)?;
    Ok(Json(CancelOffersResponse { refunded }))
}

pub async fn cancel_buys(
    State(state): State<AppState>,
    Json(req): Json<UserActionRequest>,
) -> ApiResult<impl IntoResponse> {
    let refunded = state.engine.market.cancel(req.user_id, OfferDirection::Buy)?;
    Ok(Json(CancelOffersResponse { refunded }))
}

pub async fn book(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let (sells, buys) = state.engine.market.book()?;
    Ok(Json(MarketBookResponse { sells, buys }))
}
