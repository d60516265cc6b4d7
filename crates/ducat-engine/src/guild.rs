use std::sync::Arc;

use tracing::info;

use ducat_db::Database;
use ducat_economy::{consts, password};
use ducat_types::models::{Currency, Guild, PaymentKind, User};

use crate::error::{EngineError, Result};
use crate::ledger::Ledger;

/// Guild lifecycle and the daily tax settlement. A guild lives as long
/// as its leader does; the leader leaves only by dissolving it.
pub struct Guilds {
    db: Arc<Database>,
    ledger: Ledger,
}

/// Outcome of one guild's daily tax run.
#[derive(Debug, Default)]
pub struct TaxSettlement {
    pub guild_id: i64,
    /// Tax coins that actually reached the leader.
    pub collected: i64,
    /// Fine the leader paid for poor members, capped at their balance.
    pub fine: i64,
    pub paid: i64,
    pub unpaid: i64,
    pub poor: i64,
}

impl Guilds {
    pub fn new(db: Arc<Database>, ledger: Ledger) -> Self {
        Self { db, ledger }
    }

    fn require_guild(&self, id: i64) -> Result<Guild> {
        self.db
            .get_guild(id)?
            .ok_or_else(|| EngineError::NotFound(format!("guild {id} does not exist")))
    }

    fn require_leadership(&self, guild_id: i64, user_id: i64) -> Result<Guild> {
        let guild = self.require_guild(guild_id)?;
        if guild.leader_id != Some(user_id) {
            return Err(EngineError::NotAuthorized(
                "only the guild leader may do this".into(),
            ));
        }
        Ok(guild)
    }

    fn validate_name(&self, raw: &str) -> Result<String> {
        let name = raw.trim().to_lowercase();
        if !(consts::GUILD_NAME_MIN_LEN..=consts::GUILD_NAME_MAX_LEN).contains(&name.chars().count())
        {
            return Err(EngineError::Validation(format!(
                "guild names run {} to {} characters",
                consts::GUILD_NAME_MIN_LEN,
                consts::GUILD_NAME_MAX_LEN
            )));
        }
        if !password::is_clean_text(&name, " ") {
            return Err(EngineError::Validation(
                "guild names allow letters, digits and spaces".into(),
            ));
        }
        if self.db.get_active_guild_by_name(&name)?.is_some() {
            return Err(EngineError::Validation(format!(
                "a guild named \"{name}\" already exists"
            )));
        }
        Ok(name)
    }

    pub fn create(&self, leader_id: i64, name: &str, now: i64) -> Result<Guild> {
        let leader = self.ledger.require_user(leader_id)?;
        if leader.guild_id.is_some() {
            return Err(EngineError::Validation(
                "leave your current guild first".into(),
            ));
        }
        let name = self.validate_name(name)?;
        if leader.balance < consts::PRICE_GUILD_CREATE
            || leader.crystals < consts::PRICE_GUILD_CREATE_CRYSTALS
        {
            return Err(EngineError::InsufficientFunds(format!(
                "founding costs {} coins and {} crystals",
                consts::PRICE_GUILD_CREATE,
                consts::PRICE_GUILD_CREATE_CRYSTALS
            )));
        }

        self.ledger.debit(leader_id, consts::PRICE_GUILD_CREATE)?;
        self.ledger
            .debit_crystals(leader_id, consts::PRICE_GUILD_CREATE_CRYSTALS)?;
        self.ledger.record_payment(
            leader_id,
            None,
            PaymentKind::GuildCreate,
            consts::PRICE_GUILD_CREATE,
            1,
            Currency::Coins,
            now,
        )?;
        self.ledger.record_payment(
            leader_id,
            None,
            PaymentKind::GuildCreate,
            consts::PRICE_GUILD_CREATE_CRYSTALS,
            1,
            Currency::Crystals,
            now,
        )?;

        let guild_id = self
            .db
            .insert_guild(leader_id, &name, consts::GUILD_TAX_MIN, now)?;
        self.db.set_user_guild(leader_id, Some(guild_id))?;

        info!(guild_id, leader_id, name, "guild founded");
        self.require_guild(guild_id)
    }

    /// A guild accepts members while its leader is present, it has at
    /// least one member and it sits below its level's cap.
    pub fn can_join(&self, guild: &Guild) -> Result<bool> {
        if guild.leader_id.is_none() {
            return Ok(false);
        }
        let members = self.db.guild_member_count(guild.id)?;
        Ok(members >= 1 && members < consts::guild_member_cap(guild.level))
    }

    pub fn join(&self, user_id: i64, guild_id: i64, now: i64) -> Result<Guild> {
        let user = self.ledger.require_user(user_id)?;
        if user.guild_id.is_some() {
            return Err(EngineError::Validation(
                "leave your current guild first".into(),
            ));
        }
        let guild = self.require_guild(guild_id)?;
        if !self.can_join(&guild)? {
            return Err(EngineError::Validation(
                "that guild is not accepting members".into(),
            ));
        }
        if user.balance < consts::PRICE_GUILD_JOIN {
            return Err(EngineError::InsufficientFunds(format!(
                "joining costs {} coins",
                consts::PRICE_GUILD_JOIN
            )));
        }

        self.ledger.debit(user_id, consts::PRICE_GUILD_JOIN)?;
        self.ledger.record_payment(
            user_id,
            None,
            PaymentKind::GuildJoin,
            consts::PRICE_GUILD_JOIN,
            1,
            Currency::Coins,
            now,
        )?;
        self.db.set_user_guild(user_id, Some(guild_id))?;

        info!(guild_id, user_id, "member joined guild");
        Ok(guild)
    }

    /// Buys the next guild level. Returns (level, coins, crystals) paid.
    pub fn upgrade(&self, leader_id: i64, guild_id: i64, now: i64) -> Result<(i64, i64, i64)> {
        let guild = self.require_leadership(guild_id, leader_id)?;
        let leader = self.ledger.require_user(leader_id)?;

        let next = guild.level + 1;
        let Some((coins, crystals)) = consts::guild_upgrade_price(next) else {
            return Err(EngineError::Validation(format!(
                "guilds cap out at level {}",
                consts::GUILD_LEVEL_MAX
            )));
        };
        if leader.balance < coins || leader.crystals < crystals {
            return Err(EngineError::InsufficientFunds(format!(
                "level {next} costs {coins} coins and {crystals} crystals"
            )));
        }

        self.ledger.debit(leader_id, coins)?;
        self.ledger.debit_crystals(leader_id, crystals)?;
        self.ledger.record_payment(
            leader_id,
            None,
            PaymentKind::GuildUpgrade,
            coins,
            1,
            Currency::Coins,
            now,
        )?;
        self.ledger.record_payment(
            leader_id,
            None,
            PaymentKind::GuildUpgrade,
            crystals,
            1,
            Currency::Crystals,
            now,
        )?;
        self.db.set_guild_level(guild_id, next)?;

        info!(guild_id, level = next, "guild upgraded");
        Ok((next, coins, crystals))
    }

    pub fn set_tax(&self, leader_id: i64, guild_id: i64, amount: i64) -> Result<()> {
        self.require_leadership(guild_id, leader_id)?;
        if amount < consts::GUILD_TAX_MIN {
            return Err(EngineError::Validation(format!(
                "the daily tax is at least {} coins",
                consts::GUILD_TAX_MIN
            )));
        }
        self.db.set_guild_tax(guild_id, amount)?;
        Ok(())
    }

    pub fn rename(&self, leader_id: i64, guild_id: i64, name: &str, now: i64) -> Result<String> {
        self.require_leadership(guild_id, leader_id)?;
        let leader = self.ledger.require_user(leader_id)?;
        let name = self.validate_name(name)?;
        if leader.crystals < consts::PRICE_GUILD_RENAME_CRYSTALS {
            return Err(EngineError::InsufficientFunds(format!(
                "renaming costs {} crystals",
                consts::PRICE_GUILD_RENAME_CRYSTALS
            )));
        }

        self.ledger
            .debit_crystals(leader_id, consts::PRICE_GUILD_RENAME_CRYSTALS)?;
        self.ledger.record_payment(
            leader_id,
            None,
            PaymentKind::GuildRename,
            consts::PRICE_GUILD_RENAME_CRYSTALS,
            1,
            Currency::Crystals,
            now,
        )?;
        self.db.set_guild_name(guild_id, &name)?;
        Ok(name)
    }

    /// Plain members walk out freely. The leader cannot exit: their
    /// only way out is dissolving the guild.
    pub fn exit(&self, user_id: i64) -> Result<()> {
        let user = self.ledger.require_user(user_id)?;
        let Some(guild_id) = user.guild_id else {
            return Err(EngineError::Validation("not in a guild".into()));
        };
        let guild = self.require_guild(guild_id)?;
        if guild.leader_id == Some(user_id) {
            return Err(EngineError::NotAuthorized(
                "the leader must dissolve the guild instead".into(),
            ));
        }
        self.db.set_user_guild(user_id, None)?;
        info!(guild_id, user_id, "member left guild");
        Ok(())
    }

    pub fn dissolve(&self, leader_id: i64, guild_id: i64) -> Result<()> {
        self.require_leadership(guild_id, leader_id)?;
        self.db.dissolve_guild(guild_id)?;
        info!(guild_id, leader_id, "guild dissolved");
        Ok(())
    }

    pub fn get(&self, id: i64) -> Result<Option<Guild>> {
        Ok(self.db.get_guild(id)?)
    }

    /// Runs the daily tax for one guild. Members who can cover the tax
    /// pay it to the leader; members below the poverty line add to the
    /// leader's fine whether or not they paid. Poverty is judged on the
    /// balance *before* the member's own payment.
    pub fn settle_tax(&self, guild_id: i64, now: i64) -> Result<TaxSettlement> {
        let guild = self.require_guild(guild_id)?;
        let Some(leader_id) = guild.leader_id else {
            return Err(EngineError::Validation("guild is dissolved".into()));
        };

        let members: Vec<User> = self.db.guild_members(guild_id)?;
        let mut outcome = TaxSettlement {
            guild_id,
            ..TaxSettlement::default()
        };
        let mut fine_acc = 0i64;

        for member in &members {
            if member.id == leader_id {
                continue;
            }
            if member.balance >= guild.daily_tax {
                self.ledger.debit(member.id, guild.daily_tax)?;
                self.ledger.credit(leader_id, guild.daily_tax)?;
                self.ledger.record_payment(
                    member.id,
                    Some(leader_id),
                    PaymentKind::GuildMemberTax,
                    guild.daily_tax,
                    1,
                    Currency::Coins,
                    now,
                )?;
                outcome.paid += 1;
                outcome.collected += guild.daily_tax;
            } else {
                outcome.unpaid += 1;
            }
            if member.balance < consts::POOR_MEMBER_BALANCE {
                outcome.poor += 1;
                fine_acc += (guild.daily_tax as f64 * consts::POOR_MEMBER_FINE_FACTOR) as i64;
            }
        }

        if fine_acc > 0 {
            // The leader's balance includes the taxes just collected.
            let leader = self.ledger.require_user(leader_id)?;
            outcome.fine = fine_acc.min(leader.balance.max(0));
            if outcome.fine > 0 {
                self.ledger.debit(leader_id, outcome.fine)?;
                self.ledger.record_payment(
                    leader_id,
                    None,
                    PaymentKind::GuildLeaderFine,
                    outcome.fine,
                    1,
                    Currency::Coins,
                    now,
                )?;
            }
        }

        info!(
            guild_id,
            collected = outcome.collected,
            fine = outcome.fine,
            poor = outcome.poor,
            "guild tax settled"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> Guilds {
        let db = Arc::new(Database::open_in_memory().expect("in-memory db"));
        for id in 1..=4 {
            db.ensure_user(id, Some(&format!("u{id}")), None, None, 0)
                .unwrap();
        }
        Guilds::new(db.clone(), Ledger::new(db))
    }

    fn funded_guild(guilds: &Guilds) -> Guild {
        guilds.ledger.credit(1, 20_000).unwrap();
        guilds.ledger.credit_crystals(1, 10).unwrap();
        guilds.create(1, "night watch", 0).unwrap()
    }

    fn user(guilds: &Guilds, id: i64) -> User {
        guilds.db.get_user(id).unwrap().unwrap()
    }

    #[test]
    fn create_charges_both_currencies() {
        let guilds = setup();
        let guild = funded_guild(&guilds);

        assert_eq!(guild.name, "night watch");
        assert_eq!(guild.daily_tax, consts::GUILD_TAX_MIN);
        let leader = user(&guilds, 1);
        assert_eq!(leader.balance, 10_000);
        assert_eq!(leader.crystals, 5);
        assert_eq!(leader.guild_id, Some(guild.id));
    }

    #[test]
    fn names_are_unique_among_live_guilds() {
        let guilds = setup();
        funded_guild(&guilds);

        guilds.ledger.credit(2, 20_000).unwrap();
        guilds.ledger.credit_crystals(2, 10).unwrap();
        let err = guilds.create(2, "  Night Watch ", 0).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));

        let err = guilds.create(2, "ab", 0).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn join_pays_the_entry_price_and_needs_funds() {
        let guilds = setup();
        let guild = funded_guild(&guilds);

        guilds.ledger.credit(2, 600).unwrap();
        guilds.join(2, guild.id, 0).unwrap();
        assert_eq!(user(&guilds, 2).balance, 100);
        assert_eq!(user(&guilds, 2).guild_id, Some(guild.id));

        let err = guilds.join(3, guild.id, 0).unwrap_err();
        assert!(matches!(err, EngineError::InsufficientFunds(_)));
    }

    #[test]
    fn upgrade_is_leader_only_and_priced_per_level() {
        let guilds = setup();
        let guild = funded_guild(&guilds);
        guilds.ledger.credit(1, 40_000).unwrap();
        guilds.ledger.credit_crystals(1, 20).unwrap();

        let err = guilds.upgrade(2, guild.id, 0).unwrap_err();
        assert!(matches!(err, EngineError::NotAuthorized(_)));

        let (level, coins, crystals) = guilds.upgrade(1, guild.id, 0).unwrap();
        assert_eq!((level, coins, crystals), (2, 30_000, 10));
        assert_eq!(guilds.get(guild.id).unwrap().unwrap().level, 2);
    }

    #[test]
    fn leader_cannot_exit_but_members_can() {
        let guilds = setup();
        let guild = funded_guild(&guilds);
        guilds.ledger.credit(2, 500).unwrap();
        guilds.join(2, guild.id, 0).unwrap();

        assert!(matches!(
            guilds.exit(1).unwrap_err(),
            EngineError::NotAuthorized(_)
        ));
        guilds.exit(2).unwrap();
        assert_eq!(user(&guilds, 2).guild_id, None);

        guilds.dissolve(1, guild.id).unwrap();
        assert_eq!(user(&guilds, 1).guild_id, None);
        assert!(guilds.get(guild.id).unwrap().unwrap().leader_id.is_none());
    }

    #[test]
    fn tax_settlement_collects_and_fines() {
        let guilds = setup();
        let guild = funded_guild(&guilds);
        guilds.set_tax(1, guild.id, 100).unwrap();

        // Member 2: rich, pays. Member 3: poor but covers the tax.
        // Member 4: poor and broke.
        for id in 2..=4 {
            guilds.ledger.credit(id, 500).unwrap();
            guilds.join(id, guild.id, 0).unwrap();
        }
        guilds.ledger.credit(2, 5_000).unwrap();
        guilds.ledger.credit(3, 500).unwrap();
        guilds.ledger.debit(4, 950).unwrap();

        let leader_before = user(&guilds, 1).balance;
        let outcome = guilds.settle_tax(guild.id, 1).unwrap();

        assert_eq!(outcome.paid, 2);
        assert_eq!(outcome.unpaid, 1);
        assert_eq!(outcome.collected, 200);
        // Members 3 and 4 sat below 1000 before paying: 2 * trunc(110).
        assert_eq!(outcome.poor, 2);
        assert_eq!(outcome.fine, 220);
        assert_eq!(user(&guilds, 1).balance, leader_before + 200 - 220);
    }

    #[test]
    fn leader_fine_is_capped_at_their_balance() {
        let guilds = setup();
        let guild = funded_guild(&guilds);
        guilds.set_tax(1, guild.id, 100).unwrap();
        guilds.ledger.credit(2, 600).unwrap();
        guilds.join(2, guild.id, 0).unwrap();

        // Drain the leader below the 110 fine; collection happens first.
        guilds.ledger.debit(1, 10_000).unwrap();
        let outcome = guilds.settle_tax(guild.id, 1).unwrap();
        assert_eq!(outcome.collected, 100);
        assert_eq!(outcome.fine, 100);
        assert_eq!(user(&guilds, 1).balance, 0);
    }
}
