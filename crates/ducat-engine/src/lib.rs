//! The economy core: ledger primitives and the subsystems layered on
//! them (bank, market, guilds, dispute polls, the user facade and the
//! scheduled-job effects). Time enters as an explicit unix-seconds
//! parameter and randomness as an injected [`rand::Rng`], so every
//! outcome is reproducible in tests.

pub mod bank;
pub mod config;
pub mod cooldown;
pub mod error;
pub mod guild;
pub mod jobs;
pub mod ledger;
pub mod market;
pub mod poll;
pub mod users;

use std::sync::Arc;

use ducat_db::Database;

pub use config::EngineConfig;
pub use error::{EngineError, Result};

pub struct Engine {
    pub ledger: ledger::Ledger,
    pub bank: bank::Bank,
    pub market: market::Market,
    pub guilds: guild::Guilds,
    pub polls: poll::Polls,
    pub users: users::Users,
    pub jobs: jobs::Jobs,
    pub cooldowns: Arc<cooldown::CooldownStore>,
}

impl Engine {
    pub fn new(db: Arc<Database>, config: EngineConfig) -> Self {
        let cooldowns = Arc::new(cooldown::CooldownStore::new());
        let base = ledger::Ledger::new(db.clone());

        Self {
            bank: bank::Bank::new(db.clone(), base.clone()),
            market: market::Market::new(db.clone(), base.clone()),
            guilds: guild::Guilds::new(db.clone(), base.clone()),
            polls: poll::Polls::new(db.clone(), base.clone(), config.protected_ids.clone()),
            users: users::Users::new(db.clone(), base.clone(), cooldowns.clone()),
            jobs: jobs::Jobs::new(db.clone(), base.clone()),
            ledger: base,
            cooldowns,
        }
    }

    /// One user's full economic position: the profile row, their guild,
    /// the derived value of their open accounts and the interest rate
    /// those accounts accrue at.
    pub fn snapshot(&self, user_id: i64, now: i64) -> Result<Snapshot> {
        let user = self.users.get(user_id)?;
        let guild = match user.guild_id {
            Some(gid) => self.guilds.get(gid)?,
            None => None,
        };
        let bank_total = self.bank.total_value(user_id, now)?;
        let interest_percent = ducat_economy::interest::interest_percent(
            user.extra_percent,
            guild.as_ref().map(|g| g.level).unwrap_or(0),
        );

        Ok(Snapshot {
            user,
            guild,
            bank_total,
            interest_percent,
        })
    }
}

pub struct Snapshot {
    pub user: ducat_types::models::User,
    pub guild: Option<ducat_types::models::Guild>,
    pub bank_total: i64,
    pub interest_percent: i64,
}
