use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use ducat_api::state::{AppState, AppStateInner};
use ducat_api::{bank, guild, jobs, market, poll, users};
use ducat_engine::{Engine, EngineConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ducat=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let db_path = std::env::var("DUCAT_DB_PATH").unwrap_or_else(|_| "ducat.db".into());
    let host = std::env::var("DUCAT_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("DUCAT_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;
    let protected_ids: Vec<i64> = std::env::var("DUCAT_PROTECTED_IDS")
        .unwrap_or_default()
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    // Init database and engine
    let db = Arc::new(ducat_db::Database::open(&PathBuf::from(&db_path))?);
    let engine = Engine::new(db, EngineConfig { protected_ids });
    let state: AppState = Arc::new(AppStateInner::new(engine));

    // Routes
    let app = Router::new()
        .route("/users", post(users::ensure_user))
        .route("/users/{user_id}", get(users::snapshot))
        .route("/users/{user_id}/agree", post(users::agree_terms))
        .route("/users/{user_id}/reward", post(users::chat_reward))
        .route("/users/{user_id}/msg-code", post(users::buy_msg_code))
        .route("/users/policy", post(users::set_policy))
        .route("/hugs", post(users::hug))
        .route("/transfers", post(users::transfer))
        .route("/casino", post(users::casino_play))
        .route("/bank/accounts", post(bank::open_account))
        .route("/bank/withdraw", post(bank::withdraw))
        .route("/bank/relink", post(bank::relink))
        .route("/bank/password", post(bank::change_password))
        .route("/bank/hack", post(bank::hack))
        .route("/users/{user_id}/interest/upgrade", post(bank::upgrade_interest))
        .route("/users/{user_id}/interest/downgrade", post(bank::downgrade_interest))
        .route("/users/{user_id}/protection/upgrade", post(bank::upgrade_protection))
        .route("/market/book", get(market::book))
        .route("/market/sell", post(market::place_sell))
        .route("/market/buy", post(market::place_buy))
        .route("/market/sell/cancel", post(market::cancel_sells))
        .route("/market/buy/cancel", post(market::cancel_buys))
        .route("/guilds", post(guild::create))
        .route("/guilds/{guild_id}", get(guild::get))
        .route("/guilds/{guild_id}/join", post(guild::join))
        .route("/guilds/{guild_id}/upgrade", post(guild::upgrade))
        .route("/guilds/{guild_id}/tax", post(guild::set_tax))
        .route("/guilds/{guild_id}/rename", post(guild::rename))
        .route("/guilds/{guild_id}/dissolve", post(guild::dissolve))
        .route("/guilds/exit", post(guild::exit))
        .route("/reports", post(poll::file_report))
        .route("/reports/purge", post(poll::purge_reports))
        .route("/polls/{poll_id}", get(poll::get_poll))
        .route("/polls/{poll_id}/votes", post(poll::cast_vote))
        .route("/jobs/daily-fees", post(jobs::settle_daily_fees))
        .route("/jobs/guild-taxes", post(jobs::settle_guild_taxes))
        .route("/jobs/lucky-drop", post(jobs::lucky_drop))
        .route("/jobs/forfeit", post(jobs::forfeit_on_leave))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Ducat server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
