use axum::Json;
use axum::extract::{Path, State};
use axum::response::IntoResponse;

use ducat_engine::EngineError;
use ducat_types::api::{
    CreateGuildRequest, GuildLevelResponse, RenameGuildRequest, SetTaxRequest, UserActionRequest,
};

use crate::error::ApiResult;
use crate::state::{AppState, unix_now};

pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<CreateGuildRequest>,
) -> ApiResult<impl IntoResponse> {
    let guild = state
        .engine
        .guilds
        .create(req.leader_id, &req.name, unix_now())?;
    Ok(Json(guild))
}

pub async fn get(
    State(state): State<AppState>,
    Path(guild_id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let guild = state
        .engine
        .guilds
        .get(guild_id)?
        .ok_or_else(|| EngineError::NotFound(format!("guild {guild_id} does not exist")))?;
    Ok(Json(guild))
}

pub async fn join(
    State(state): State<AppState>,
    Path(guild_id): Path<i64>,
    Json(req): Json<UserActionRequest>,
) -> ApiResult<impl IntoResponse> {
    let guild = state.engine.guilds.join(req.user_id, guild_id, unix_now())?;
    Ok(Json(guild))
}

pub async fn upgrade(
    State(state): State<AppState>,
    Path(guild_id): Path<i64>,
    Json(req): Json<UserActionRequest>,
) -> ApiResult<impl IntoResponse> {
    let (level, _, _) = state.engine.guilds.upgrade(req.user_id, guild_id, unix_now())?;
    Ok(Json(GuildLevelResponse { level }))
}

pub async fn set_tax(
    State(state): State<AppState>,
    Path(guild_id): Path<i64>,
    Json(req): Json<SetTaxRequest>,
) -> ApiResult<impl IntoResponse> {
    state.engine.guilds.set_tax(req.leader_id, guild_id, req.amount)?;
    Ok(Json(serde_json::json!({ "daily_tax": req.amount })))
}

pub async fn rename(
    State(state): State<AppState>,
    Path(guild_id): Path<i64>,
    Json(req): Json<RenameGuildRequest>,
) -> ApiResult<impl IntoResponse> {
    let name = state
        .engine
        .guilds
        .rename(req.leader_id, guild_id, &req.name, unix_now())?;
    Ok(Json(serde_json::json!({ "name": name })))
}

pub async fn exit(
    State(state): State<AppState>,
    Json(req): Json<UserActionRequest>,
) -> ApiResult<impl IntoResponse> {
    state.engine.guilds.exit(req.user_id)?;
    Ok(Json(serde_json::json!({ "left": true })))
}

pub async fn dissolve(
    State(state): State<AppState>,
    Path(guild_id): Path<i64>,
    Json(req): Json<UserActionRequest>,
) -> ApiResult<impl IntoResponse> {
    state.engine.guilds.dissolve(req.user_id, guild_id)?;
    Ok(Json(serde_json::json!({ "dissolved": true })))
}
