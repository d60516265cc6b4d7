use std::sync::Arc;

use rand::Rng;
use rand::seq::{IndexedRandom, SliceRandom};
use tracing::info;

use ducat_db::Database;
use ducat_economy::{consts, fees};

use crate::error::Result;
use crate::guild::{Guilds, TaxSettlement};
use crate::ledger::Ledger;

/// Scheduled economy maintenance: the daily residence fee, guild taxes,
/// the lucky crystal drop and leave forfeiture. Nothing here schedules
/// itself; the caller decides when a day has passed.
pub struct Jobs {
    db: Arc<Database>,
    ledger: Ledger,
    guilds: Guilds,
}

#[derive(Debug, Default)]
pub struct DailySweep {
    pub checked: i64,
    pub collected: i64,
    pub banned: i64,
}

impl Jobs {
    pub fn new(db: Arc<Database>, ledger: Ledger) -> Self {
        let guilds = Guilds::new(db.clone(), ledger.clone());
        Self { db, ledger, guilds }
    }

    /// Charges every eligible user the daily residence fee. Guild
    /// members below the flat floor are exempt; a guildless user who
    /// cannot cover it is banned instead of charged.
    pub fn settle_daily_fees(&self) -> Result<DailySweep> {
        let mut sweep = DailySweep::default();
        for user in self.db.eligible_users()? {
            sweep.checked += 1;
            let fee = fees::daily_residence_fee(user.balance, user.guild_id.is_some());
            if fee == 0 {
                continue;
            }
            if user.balance >= fee {
                self.ledger.debit(user.id, fee)?;
                sweep.collected += fee;
            } else if user.guild_id.is_none() {
                self.db.set_user_banned(user.id, true)?;
                sweep.banned += 1;
            }
        }

        info!(
            checked = sweep.checked,
            collected = sweep.collected,
            banned = sweep.banned,
            "daily residence fees settled"
        );
        Ok(sweep)
    }

    /// Runs the daily tax for every live guild.
    pub fn settle_guild_taxes(&self, now: i64) -> Result<Vec<TaxSettlement>> {
        let mut outcomes = Vec::new();
        for guild in self.db.active_guilds()? {
            outcomes.push(self.guilds.settle_tax(guild.id, now)?);
        }
        Ok(outcomes)
    }

    /// The periodic crystal giveaway. One run in four hands out nothing
    /// at all; otherwise up to five random users get 1-3 crystals each.
    pub fn lucky_drop<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Vec<(i64, i64)>> {
        if rng.random_range(0..consts::LUCKY_SKIP_ONE_IN) == 0 {
            return Ok(Vec::new());
        }

        let mut ids: Vec<i64> = self.db.eligible_users()?.iter().map(|u| u.id).collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        ids.shuffle(rng);

        let count = rng.random_range(1..=consts::LUCKY_USERS_MAX.min(ids.len() as i64));
        let mut winners = Vec::new();
        for id in ids.into_iter().take(count as usize) {
            let crystals = rng.random_range(1..=consts::LUCKY_CRYSTALS_MAX);
            self.ledger.credit_crystals(id, crystals)?;
            winners.push((id, crystals));
        }

        info!(count = winners.len(), "lucky crystals dropped");
        Ok(winners)
    }

    /// A user who leaves the chat forfeits their coins to one random
    /// remaining eligible user and is banned from re-entry. Returns the
    /// recipient (if any remained) and the amount moved.
    pub fn forfeit_on_leave<R: Rng + ?Sized>(
        &self,
        user_id: i64,
        rng: &mut R,
    ) -> Result<(Option<i64>, i64)> {
        let user = self.ledger.require_user(user_id)?;
        self.db.set_user_banned(user_id, true)?;

        let amount = user.balance.max(0);
        let others: Vec<i64> = self
            .db
            .eligible_users()?
            .iter()
            .map(|u| u.id)
            .filter(|id| *id != user_id)
            .collect();
        let Some(&to_id) = others.choose(rng) else {
            return Ok((None, 0));
        };

        if amount > 0 {
            self.ledger.debit(user_id, amount)?;
            self.ledger.credit(to_id, amount)?;
        }
        info!(user_id, to_id, amount, "leaver's balance forfeited");
        Ok((Some(to_id), amount))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use ducat_types::models::User;

    fn setup(users: i64) -> Jobs {
        let db = Arc::new(Database::open_in_memory().expect("in-memory db"));
        for id in 1..=users {
            db.ensure_user(id, Some(&format!("u{id}")), None, None, 0)
                .unwrap();
            db.set_user_agreed(id, true).unwrap();
        }
        Jobs::new(db.clone(), Ledger::new(db))
    }

    fn user(jobs: &Jobs, id: i64) -> User {
        jobs.db.get_user(id).unwrap().unwrap()
    }

    #[test]
    fn daily_fee_charges_floors_and_bans() {
        let jobs = setup(3);
        // 1: rich, pays 1%. 2: can cover the floor. 3: broke, banned.
        jobs.ledger.credit(1, 50_000).unwrap();
        jobs.ledger.credit(2, 500).unwrap();

        let sweep = jobs.settle_daily_fees().unwrap();
        assert_eq!(sweep.checked, 3);
        assert_eq!(sweep.collected, 610);
        assert_eq!(sweep.banned, 1);
        assert_eq!(user(&jobs, 1).balance, 49_500);
        assert_eq!(user(&jobs, 2).balance, 390);
        assert!(user(&jobs, 3).banned);
    }

    #[test]
    fn guild_members_below_the_floor_are_exempt() {
        let jobs = setup(2);
        jobs.db.ensure_user(10, Some("leader"), None, None, 0).unwrap();
        let guild_id = jobs.db.insert_guild(10, "keep", 50, 0).unwrap();
        jobs.db.set_user_guild(1, Some(guild_id)).unwrap();
        jobs.ledger.credit(1, 500).unwrap();

        let sweep = jobs.settle_daily_fees().unwrap();
        assert_eq!(user(&jobs, 1).balance, 500);
        assert!(!user(&jobs, 1).banned);
        // The guildless peer was broke and got banned.
        assert_eq!(sweep.banned, 1);
    }

    #[test]
    fn lucky_drop_stays_within_bounds() {
        let jobs = setup(8);
        let mut rng = StdRng::seed_from_u64(1);

        let mut skipped = 0;
        for _ in 0..40 {
            let winners = jobs.lucky_drop(&mut rng).unwrap();
            if winners.is_empty() {
                skipped += 1;
                continue;
            }
            assert!(winners.len() <= 5);
            for (_, crystals) in &winners {
                assert!((1..=3).contains(crystals));
            }
        }
        // Roughly a quarter of the runs hand out nothing.
        assert!((2..=20).contains(&skipped), "skips out of band: {skipped}");
    }

    #[test]
    fn leaver_forfeits_to_someone_else() {
        let jobs = setup(3);
        jobs.ledger.credit(1, 700).unwrap();

        let mut rng = StdRng::seed_from_u64(6);
        let (to_id, amount) = jobs.forfeit_on_leave(1, &mut rng).unwrap();
        let to_id = to_id.unwrap();

        assert_ne!(to_id, 1);
        assert_eq!(amount, 700);
        assert_eq!(user(&jobs, 1).balance, 0);
        assert!(user(&jobs, 1).banned);
        assert_eq!(user(&jobs, to_id).balance, 700);
    }

    #[test]
    fn negative_balances_forfeit_nothing() {
        let jobs = setup(2);
        jobs.ledger.debit(1, 300).unwrap();

        let mut rng = StdRng::seed_from_u64(6);
        let (to_id, amount) = jobs.forfeit_on_leave(1, &mut rng).unwrap();
        assert_eq!(amount, 0);
        assert_eq!(user(&jobs, to_id.unwrap()).balance, 0);
        assert_eq!(user(&jobs, 1).balance, -300);
    }
}
