use std::sync::Arc;

use rand::Rng;
use tracing::info;

use ducat_db::Database;
use ducat_economy::{consts, fees, odds, password};
use ducat_types::models::{CasinoMode, Currency, PaymentKind, TransferPolicy, User};

use crate::cooldown::CooldownStore;
use crate::error::{EngineError, Result};
use crate::ledger::Ledger;

/// Per-user operations: social rewards, transfers, message codes and
/// the casino.
pub struct Users {
    db: Arc<Database>,
    ledger: Ledger,
    cooldowns: Arc<CooldownStore>,
}

/// Transfer recipient: directly by identity, or anonymously through a
/// purchased message code.
#[derive(Debug, Clone)]
pub enum Recipient {
    Id(i64),
    MsgCode(String),
}

impl Users {
    pub fn new(db: Arc<Database>, ledger: Ledger, cooldowns: Arc<CooldownStore>) -> Self {
        Self {
            db,
            ledger,
            cooldowns,
        }
    }

    /// Upserts the identity row, refreshing display metadata on every
    /// sighting.
    pub fn ensure(
        &self,
        id: i64,
        username: Option<&str>,
        first_name: Option<&str>,
        last_name: Option<&str>,
        now: i64,
    ) -> Result<User> {
        Ok(self.db.ensure_user(id, username, first_name, last_name, now)?)
    }

    pub fn get(&self, id: i64) -> Result<User> {
        self.ledger.require_user(id)
    }

    pub fn agree_terms(&self, user_id: i64) -> Result<()> {
        self.ledger.require_user(user_id)?;
        self.db.set_user_agreed(user_id, true)?;
        Ok(())
    }

    pub fn set_policy(&self, user_id: i64, policy: TransferPolicy) -> Result<()> {
        self.ledger.require_user(user_id)?;
        self.db.set_user_policy(user_id, policy)?;
        Ok(())
    }

    /// A hug pays the *recipient*, scaled by the sender's wealth. Two
    /// in-memory cooldowns apply: hugging at all, and hugging the same
    /// person again.
    pub fn hug(&self, from_id: i64, to_id: i64, now: i64) -> Result<i64> {
        if from_id == to_id {
            return Err(EngineError::Validation("cannot hug yourself".into()));
        }
        let sender = self.ledger.require_user(from_id)?;
        self.ledger.require_user(to_id)?;

        let general = self
            .cooldowns
            .remaining(from_id, "hug", now, consts::COOLDOWN_HUG);
        let same = self.cooldowns.remaining(
            from_id,
            &format!("hug:{to_id}"),
            now,
            consts::COOLDOWN_HUG_SAME,
        );
        let remaining = general.max(same);
        if remaining > 0 {
            return Err(EngineError::Cooldown(remaining));
        }

        let reward = fees::hug_reward(sender.balance);
        self.ledger.credit(to_id, reward)?;
        self.cooldowns.touch(from_id, "hug", now);
        self.cooldowns.touch(from_id, &format!("hug:{to_id}"), now);

        info!(from_id, to_id, reward, "hug delivered");
        Ok(reward)
    }

    /// Chat-activity reward, rate-limited through the persisted
    /// `reward_at` column so it survives restarts.
    pub fn chat_reward(&self, user_id: i64, now: i64) -> Result<i64> {
        let user = self.ledger.require_user(user_id)?;
        let remaining = consts::COOLDOWN_CHAT_REWARD - (now - user.reward_at);
        if remaining > 0 {
            return Err(EngineError::Cooldown(remaining));
        }

        let guild_level = match user.guild_id {
            Some(gid) => self.db.get_guild(gid)?.map(|g| g.level),
            None => None,
        };
        let reward = fees::chat_reward(guild_level);
        self.ledger.credit(user_id, reward)?;
        self.db.set_user_reward_at(user_id, now)?;
        Ok(reward)
    }

    fn resolve_recipient(&self, sender: &User, recipient: &Recipient) -> Result<(User, bool)> {
        let (target, via_code) = match recipient {
            Recipient::Id(id) => (self.ledger.require_user(*id)?, false),
            Recipient::MsgCode(code) => {
                if !password::is_msg_code(code) {
                    return Err(EngineError::Validation("malformed msg code".into()));
                }
                let user = self.db.get_user_by_msg_code(code)?.ok_or_else(|| {
                    EngineError::NotFound("no user holds that msg code".into())
                })?;
                (user, true)
            }
        };

        if target.id == sender.id {
            return Err(EngineError::Validation("cannot transfer to yourself".into()));
        }
        // Group-only recipients accept from guild-mates, or from anyone
        // who went to the trouble of learning their msg code.
        if target.policy == TransferPolicy::GroupOnly
            && !via_code
            && (sender.guild_id.is_none() || sender.guild_id != target.guild_id)
        {
            return Err(EngineError::NotAuthorized(
                "recipient only accepts transfers from their guild".into(),
            ));
        }
        Ok((target, via_code))
    }

    fn validate_transfer(amount: i64, comment: Option<&str>) -> Result<()> {
        if !(1..=consts::MAX_TRANSFER).contains(&amount) {
            return Err(EngineError::Validation(format!(
                "amount must be between 1 and {}",
                consts::MAX_TRANSFER
            )));
        }
        if let Some(comment) = comment {
            if comment.chars().count() > consts::COMMENT_MAX_LEN
                || !password::is_clean_comment(comment)
            {
                return Err(EngineError::Validation(
                    "comment is too long or contains forbidden characters".into(),
                ));
            }
        }
        Ok(())
    }

    /// Coin transfer with the percentage fee. Returns (transfer id, fee).
    pub fn send_coins(
        &self,
        from_id: i64,
        recipient: &Recipient,
        amount: i64,
        comment: Option<&str>,
        now: i64,
    ) -> Result<(i64, i64)> {
        let sender = self.ledger.require_user(from_id)?;
        Self::validate_transfer(amount, comment)?;
        let (target, _) = self.resolve_recipient(&sender, recipient)?;

        let fee = fees::transfer_fee(amount);
        if sender.balance < amount + fee {
            return Err(EngineError::InsufficientFunds(format!(
                "sending {amount} costs {fee} on top"
            )));
        }

        let id = self
            .ledger
            .transfer(from_id, target.id, amount, fee, Currency::Coins, comment, now)?;
        info!(from_id, to_id = target.id, amount, fee, "coins transferred");
        Ok((id, fee))
    }

    /// Crystal transfer. No fee; crystals are scarce enough already.
    pub fn send_crystals(
        &self,
        from_id: i64,
        recipient: &Recipient,
        amount: i64,
        comment: Option<&str>,
        now: i64,
    ) -> Result<i64> {
        let sender = self.ledger.require_user(from_id)?;
        Self::validate_transfer(amount, comment)?;
        let (target, _) = self.resolve_recipient(&sender, recipient)?;

        if sender.crystals < amount {
            return Err(EngineError::InsufficientFunds(format!(
                "not enough crystals to send {amount}"
            )));
        }

        let id = self.ledger.transfer(
            from_id,
            target.id,
            amount,
            0,
            Currency::Crystals,
            comment,
            now,
        )?;
        info!(from_id, to_id = target.id, amount, "crystals transferred");
        Ok(id)
    }

    /// Buys a fresh unique msg code, replacing any previous one.
    pub fn buy_msg_code<R: Rng + ?Sized>(
        &self,
        user_id: i64,
        now: i64,
        rng: &mut R,
    ) -> Result<String> {
        let user = self.ledger.require_user(user_id)?;
        if user.balance < consts::PRICE_MSG_CODE {
            return Err(EngineError::InsufficientFunds(format!(
                "a msg code costs {} coins",
                consts::PRICE_MSG_CODE
            )));
        }

        let used = self.db.msg_codes()?;
        let code = password::generate_msg_code(&used, rng);

        self.ledger.debit(user_id, consts::PRICE_MSG_CODE)?;
        self.ledger.record_payment(
            user_id,
            None,
            PaymentKind::MsgCode,
            consts::PRICE_MSG_CODE,
            1,
            Currency::Coins,
            now,
        )?;
        self.db.set_user_msg_code(user_id, &code)?;

        info!(user_id, "msg code purchased");
        Ok(code)
    }

    /// One casino round: the stake leaves up front, a win returns the
    /// full multiplied stake. Returns the payout (0 on a loss).
    pub fn casino_play<R: Rng + ?Sized>(
        &self,
        user_id: i64,
        mode: CasinoMode,
        bet: i64,
        now: i64,
        rng: &mut R,
    ) -> Result<i64> {
        let user = self.ledger.require_user(user_id)?;
        if bet < consts::MIN_CASINO_BET {
            return Err(EngineError::Validation(format!(
                "the minimum bet is {}",
                consts::MIN_CASINO_BET
            )));
        }
        if user.balance < bet {
            return Err(EngineError::InsufficientFunds(
                "cannot stake more than you hold".into(),
            ));
        }

        self.ledger.debit(user_id, bet)?;
        let payout = odds::casino_payout(mode, bet, rng);
        if payout > 0 {
            self.ledger.credit(user_id, payout)?;
        }
        self.db.insert_game(user_id, mode, bet, payout, now)?;

        info!(user_id, ?mode, bet, payout, "casino round played");
        Ok(payout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn setup() -> Users {
        let db = Arc::new(Database::open_in_memory().expect("in-memory db"));
        for id in 1..=3 {
            db.ensure_user(id, Some(&format!("u{id}")), None, None, 0)
                .unwrap();
        }
        Users::new(db.clone(), Ledger::new(db), Arc::new(CooldownStore::new()))
    }

    fn user(users: &Users, id: i64) -> User {
        users.db.get_user(id).unwrap().unwrap()
    }

    #[test]
    fn hug_pays_the_recipient_and_cools_down() {
        let users = setup();
        users.ledger.credit(1, 30_000).unwrap();

        assert_eq!(users.hug(1, 2, 0).unwrap(), 150);
        assert_eq!(user(&users, 2).balance, 150);
        assert_eq!(user(&users, 1).balance, 30_000);

        // The general cooldown blocks a different target too.
        assert!(matches!(
            users.hug(1, 3, 60).unwrap_err(),
            EngineError::Cooldown(_)
        ));
        // Past the general cooldown the same target is still blocked.
        let after_general = consts::COOLDOWN_HUG + 1;
        assert!(matches!(
            users.hug(1, 2, after_general).unwrap_err(),
            EngineError::Cooldown(_)
        ));
        users.hug(1, 3, after_general).unwrap();
    }

    #[test]
    fn chat_reward_scales_and_rate_limits() {
        let users = setup();

        assert_eq!(users.chat_reward(1, 1_000).unwrap(), 9);
        assert!(matches!(
            users.chat_reward(1, 1_060).unwrap_err(),
            EngineError::Cooldown(60)
        ));
        assert_eq!(users.chat_reward(1, 1_120).unwrap(), 9);
        assert_eq!(user(&users, 1).balance, 18);
    }

    #[test]
    fn coin_transfer_takes_the_fee() {
        let users = setup();
        users.ledger.credit(1, 10_000).unwrap();

        let (id, fee) = users
            .send_coins(1, &Recipient::Id(2), 1_000, Some("for the rent"), 0)
            .unwrap();
        assert!(id > 0);
        assert_eq!(fee, 50);
        assert_eq!(user(&users, 1).balance, 8_950);
        assert_eq!(user(&users, 2).balance, 1_000);
    }

    #[test]
    fn group_only_recipients_reject_strangers() {
        let users = setup();
        users.ledger.credit(1, 10_000).unwrap();
        users.set_policy(2, TransferPolicy::GroupOnly).unwrap();

        assert!(matches!(
            users.send_coins(1, &Recipient::Id(2), 100, None, 0).unwrap_err(),
            EngineError::NotAuthorized(_)
        ));

        // A msg code bypasses the policy.
        users.ledger.credit(2, 100).unwrap();
        let mut rng = StdRng::seed_from_u64(2);
        let code = users.buy_msg_code(2, 0, &mut rng).unwrap();
        users
            .send_coins(1, &Recipient::MsgCode(code), 100, None, 0)
            .unwrap();
        assert_eq!(user(&users, 2).balance, 100);
    }

    #[test]
    fn crystal_transfer_has_no_fee() {
        let users = setup();
        users.ledger.credit_crystals(1, 5).unwrap();

        users
            .send_crystals(1, &Recipient::Id(2), 5, None, 0)
            .unwrap();
        assert_eq!(user(&users, 1).crystals, 0);
        assert_eq!(user(&users, 2).crystals, 5);

        assert!(matches!(
            users
                .send_crystals(1, &Recipient::Id(2), 1, None, 0)
                .unwrap_err(),
            EngineError::InsufficientFunds(_)
        ));
    }

    #[test]
    fn msg_codes_are_unique_and_well_formed() {
        let users = setup();
        users.ledger.credit(1, 200).unwrap();
        users.ledger.credit(2, 200).unwrap();

        let mut rng = StdRng::seed_from_u64(9);
        let first = users.buy_msg_code(1, 0, &mut rng).unwrap();
        let second = users.buy_msg_code(2, 0, &mut rng).unwrap();
        assert!(password::is_msg_code(&first));
        assert_ne!(first.to_lowercase(), second.to_lowercase());
        assert_eq!(user(&users, 1).balance, 100);
    }

    #[test]
    fn casino_settles_the_stake_either_way() {
        let users = setup();
        users.ledger.credit(1, 1_000).unwrap();

        let mut rng = StdRng::seed_from_u64(4);
        let payout = users
            .casino_play(1, CasinoMode::VeryLow, 100, 0, &mut rng)
            .unwrap();
        let expected = if payout > 0 {
            assert_eq!(payout, 200);
            1_100
        } else {
            900
        };
        assert_eq!(user(&users, 1).balance, expected);

        assert!(matches!(
            users
                .casino_play(1, CasinoMode::High, 1, 0, &mut rng)
                .unwrap_err(),
            EngineError::Validation(_)
        ));
    }
}
