use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id              INTEGER PRIMARY KEY,
            username        TEXT,
            first_name      TEXT,
            last_name       TEXT,
            balance         INTEGER NOT NULL DEFAULT 0,
            crystals        INTEGER NOT NULL DEFAULT 0,
            guild_id        INTEGER REFERENCES guilds(id),
            policy          INTEGER NOT NULL DEFAULT 1,
            msg_code        TEXT UNIQUE,
            extra_percent   INTEGER NOT NULL DEFAULT 0,
            protect_level   INTEGER NOT NULL DEFAULT 0,
            banned          INTEGER NOT NULL DEFAULT 0,
            muted_until     INTEGER NOT NULL DEFAULT 0,
            agreed          INTEGER,
            reward_at       INTEGER NOT NULL DEFAULT 0,
            created_at      INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_users_guild
            ON users(guild_id);

        CREATE TABLE IF NOT EXISTS guilds (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            leader_id   INTEGER REFERENCES users(id),
            name        TEXT NOT NULL,
            level       INTEGER NOT NULL DEFAULT 1,
            daily_tax   INTEGER NOT NULL DEFAULT 50,
            created_at  INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS bank_accounts (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id     INTEGER NOT NULL REFERENCES users(id),
            password    TEXT NOT NULL,
            principal   INTEGER NOT NULL,
            active      INTEGER NOT NULL DEFAULT 1,
            created_at  INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_bank_accounts_password
            ON bank_accounts(password) WHERE active = 1;
        CREATE INDEX IF NOT EXISTS idx_bank_accounts_user
            ON bank_accounts(user_id);

        CREATE TABLE IF NOT EXISTS market_offers (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id     INTEGER NOT NULL REFERENCES users(id),
            direction   TEXT NOT NULL CHECK (direction IN ('sell', 'buy')),
            crystals    INTEGER NOT NULL,
            price       INTEGER NOT NULL,
            created_at  INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_market_offers_book
            ON market_offers(direction, price) WHERE crystals > 0;

        CREATE TABLE IF NOT EXISTS reports (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            from_id     INTEGER NOT NULL REFERENCES users(id),
            to_id       INTEGER NOT NULL REFERENCES users(id),
            weight      INTEGER NOT NULL,
            comment     TEXT,
            created_at  INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_reports_target
            ON reports(to_id);

        CREATE TABLE IF NOT EXISTS polls (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            to_id       INTEGER NOT NULL REFERENCES users(id),
            stage       INTEGER NOT NULL DEFAULT 1,
            verdict     TEXT,
            severity    TEXT,
            created_at  INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_polls_target
            ON polls(to_id, created_at);

        CREATE TABLE IF NOT EXISTS votes (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            poll_id     INTEGER NOT NULL REFERENCES polls(id),
            user_id     INTEGER NOT NULL REFERENCES users(id),
            stage       INTEGER NOT NULL,
            decision    TEXT NOT NULL,
            weight      INTEGER NOT NULL,
            created_at  INTEGER NOT NULL,
            UNIQUE(poll_id, user_id, stage)
        );

        CREATE TABLE IF NOT EXISTS payments (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id     INTEGER NOT NULL,
            peer_id     INTEGER,
            kind        TEXT NOT NULL,
            amount      INTEGER NOT NULL,
            quantity    INTEGER NOT NULL DEFAULT 1,
            currency    TEXT NOT NULL,
            created_at  INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS transfers (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            from_id     INTEGER NOT NULL,
            to_id       INTEGER NOT NULL,
            amount      INTEGER NOT NULL,
            fee         INTEGER NOT NULL,
            currency    TEXT NOT NULL,
            comment     TEXT,
            created_at  INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS hack_attempts (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id     INTEGER NOT NULL,
            bank_id     INTEGER NOT NULL,
            guess       TEXT NOT NULL,
            success     INTEGER NOT NULL,
            created_at  INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS games (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id     INTEGER NOT NULL,
            mode        TEXT NOT NULL,
            bet         INTEGER NOT NULL,
            payout      INTEGER NOT NULL,
            created_at  INTEGER NOT NULL
        );
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
