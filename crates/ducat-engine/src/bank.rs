use std::sync::Arc;

use rand::Rng;
use tracing::info;

use ducat_db::Database;
use ducat_economy::{consts, fees, interest, odds, password};
use ducat_types::models::{BankAccount, Currency, HintEntry, PaymentKind, User};

use crate::error::{EngineError, Result};
use crate::ledger::Ledger;

/// Password-keyed interest-bearing accounts. Accounts move OPEN -> CLOSED
/// exactly once, on withdrawal; the live value is always derived from
/// the stored principal and opening time. Knowing a password is the only
/// authorization any account operation needs — that is the game, not an
/// oversight.
pub struct Bank {
    db: Arc<Database>,
    ledger: Ledger,
}

/// Result of a withdraw-by-password attempt.
#[derive(Debug)]
pub enum Withdrawal {
    Matched { account_id: i64, amount: i64 },
    /// No active account matched; the probe fee was charged.
    Miss { fee: i64 },
}

#[derive(Debug)]
pub enum Relink {
    Matched { account_id: i64 },
    Miss,
}

#[derive(Debug)]
pub enum PasswordChange {
    Matched { account_id: i64 },
    Miss { fee: i64 },
}

#[derive(Debug)]
pub struct HackOutcome {
    /// Whether the defense roll was beaten. Charged either way.
    pub success: bool,
    /// Whether the guess was exactly the password.
    pub cracked: bool,
    pub hints: Option<Vec<HintEntry>>,
}

impl Bank {
    pub fn new(db: Arc<Database>, ledger: Ledger) -> Self {
        Self { db, ledger }
    }

    /// Interest percent an account accrues: the *owner's* upgrades and
    /// guild determine it, whoever ends up withdrawing.
    fn owner_percent(&self, owner: &User) -> Result<i64> {
        let guild_level = match owner.guild_id {
            Some(gid) => self.db.get_guild(gid)?.map(|g| g.level).unwrap_or(0),
            None => 0,
        };
        Ok(interest::interest_percent(owner.extra_percent, guild_level))
    }

    pub fn open(&self, user_id: i64, amount: i64, pw: &str, now: i64) -> Result<(i64, i64)> {
        let user = self.ledger.require_user(user_id)?;

        if !(consts::MIN_BANK_AMOUNT..=consts::MAX_AMOUNT).contains(&amount) {
            return Err(EngineError::Validation(format!(
                "amount must be between {} and {}",
                consts::MIN_BANK_AMOUNT,
                consts::MAX_AMOUNT
            )));
        }
        let pw = pw.to_lowercase();
        if !password::is_valid_password(&pw) {
            return Err(EngineError::Validation(
                "password must be 1-6 characters of a-z and 0-9".into(),
            ));
        }
        if self.db.open_account_count(user_id)? >= consts::MAX_BANK_ACCOUNTS {
            return Err(EngineError::Validation(format!(
                "at most {} open accounts",
                consts::MAX_BANK_ACCOUNTS
            )));
        }

        let fee = fees::fee(amount, consts::FEE_BANK_OPEN_PERCENT, consts::FEE_BANK_OPEN_MIN);
        if user.balance < amount + fee {
            return Err(EngineError::InsufficientFunds(format!(
                "opening needs {} coins including the fee",
                amount + fee
            )));
        }

        self.ledger.debit(user_id, amount + fee)?;
        let account_id = self.db.insert_account(user_id, &pw, amount, now)?;

        info!(user_id, account_id, amount, fee, "bank account opened");
        Ok((account_id, fee))
    }

    /// Withdraw whichever active account the password matches. A miss
    /// charges the probe fee — economic friction against brute-forcing.
    /// A match closes the account and credits the *caller*, owner or not.
    pub fn withdraw(&self, caller_id: i64, pw: &str, now: i64) -> Result<Withdrawal> {
        let caller = self.ledger.require_user(caller_id)?;
        if caller.balance < consts::FEE_BANK_MISS_MIN {
            return Err(EngineError::InsufficientFunds(
                "not enough coins to cover a miss".into(),
            ));
        }
        if caller.crystals < consts::PRICE_WITHDRAW_CRYSTALS {
            return Err(EngineError::InsufficientFunds(format!(
                "withdrawing costs {} crystal",
                consts::PRICE_WITHDRAW_CRYSTALS
            )));
        }

        let pw = pw.to_lowercase();
        let Some(account) = self.db.get_account_by_password(&pw)? else {
            let fee = fees::fee(
                caller.balance,
                consts::FEE_BANK_MISS_PERCENT,
                consts::FEE_BANK_MISS_MIN,
            );
            self.ledger.debit(caller_id, fee)?;
            return Ok(Withdrawal::Miss { fee });
        };

        let owner = self.ledger.require_user(account.user_id)?;
        let percent = self.owner_percent(&owner)?;
        let amount = interest::bank_value(account.principal, percent, now - account.created_at);

        self.ledger
            .debit_crystals(caller_id, consts::PRICE_WITHDRAW_CRYSTALS)?;
        self.ledger.record_payment(
            caller_id,
            None,
            PaymentKind::BankWithdraw,
            consts::PRICE_WITHDRAW_CRYSTALS,
            1,
            Currency::Crystals,
            now,
        )?;
        self.db.close_account(account.id)?;
        self.ledger.credit(caller_id, amount)?;

        info!(
            caller_id,
            account_id = account.id,
            owner_id = account.user_id,
            amount,
            "bank account withdrawn"
        );
        Ok(Withdrawal::Matched {
            account_id: account.id,
            amount,
        })
    }

    /// Claim a password-guessed account instead of cashing it out.
    pub fn relink(&self, caller_id: i64, pw: &str, now: i64) -> Result<Relink> {
        let caller = self.ledger.require_user(caller_id)?;
        if caller.crystals < consts::PRICE_RELINK_CRYSTALS {
            return Err(EngineError::InsufficientFunds(format!(
                "relinking costs {} crystals",
                consts::PRICE_RELINK_CRYSTALS
            )));
        }
        if self.db.open_account_count(caller_id)? >= consts::MAX_BANK_ACCOUNTS {
            return Err(EngineError::Validation(format!(
                "at most {} open accounts",
                consts::MAX_BANK_ACCOUNTS
            )));
        }

        let Some(account) = self.db.get_account_by_password(&pw.to_lowercase())? else {
            return Ok(Relink::Miss);
        };

        self.ledger
            .debit_crystals(caller_id, consts::PRICE_RELINK_CRYSTALS)?;
        self.ledger.record_payment(
            caller_id,
            None,
            PaymentKind::BankRelink,
            consts::PRICE_RELINK_CRYSTALS,
            1,
            Currency::Crystals,
            now,
        )?;
        self.db.set_account_owner(account.id, caller_id)?;

        info!(caller_id, account_id = account.id, "bank account relinked");
        Ok(Relink::Matched {
            account_id: account.id,
        })
    }

    /// Whoever knows the old password may rotate it — including an owner
    /// preempting someone else's knowledge of it. A wrong old password
    /// costs the coin miss fee.
    pub fn change_password(
        &self,
        caller_id: i64,
        old_pw: &str,
        new_pw: &str,
        now: i64,
    ) -> Result<PasswordChange> {
        let caller = self.ledger.require_user(caller_id)?;
        if caller.crystals < consts::PRICE_CHANGE_PASSWORD_CRYSTALS {
            return Err(EngineError::InsufficientFunds(format!(
                "changing a password costs {} crystals",
                consts::PRICE_CHANGE_PASSWORD_CRYSTALS
            )));
        }
        let new_pw = new_pw.to_lowercase();
        if !password::is_valid_password(&new_pw) {
            return Err(EngineError::Validation(
                "password must be 1-6 characters of a-z and 0-9".into(),
            ));
        }

        let Some(account) = self.db.get_account_by_password(&old_pw.to_lowercase())? else {
            let fee = fees::fee(
                caller.balance,
                consts::FEE_BANK_MISS_PERCENT,
                consts::FEE_BANK_MISS_MIN,
            );
            self.ledger.debit(caller_id, fee)?;
            return Ok(PasswordChange::Miss { fee });
        };

        self.ledger
            .debit_crystals(caller_id, consts::PRICE_CHANGE_PASSWORD_CRYSTALS)?;
        self.db.set_account_password(account.id, &new_pw)?;

        Ok(PasswordChange::Matched {
            account_id: account.id,
        })
    }

    /// Raise extraPercent by one for an exponentially growing crystal
    /// price. Returns (price paid, new extraPercent).
    pub fn upgrade_interest(&self, user_id: i64, now: i64) -> Result<(i64, i64)> {
        let user = self.ledger.require_user(user_id)?;
        let price = interest::bank_upgrade_price(user.extra_percent);
        if user.crystals < price {
            return Err(EngineError::InsufficientFunds(format!(
                "upgrade costs {price} crystals"
            )));
        }

        self.ledger.debit_crystals(user_id, price)?;
        self.ledger.record_payment(
            user_id,
            None,
            PaymentKind::BankUpgrade,
            price,
            1,
            Currency::Crystals,
            now,
        )?;
        self.db.bump_extra_percent(user_id, 1)?;

        Ok((price, user.extra_percent + 1))
    }

    /// Roll extraPercent back by one for a discounted refund. Returns
    /// (refund, new extraPercent).
    pub fn downgrade_interest(&self, user_id: i64) -> Result<(i64, i64)> {
        let user = self.ledger.require_user(user_id)?;
        if user.extra_percent <= 0 {
            return Err(EngineError::Validation("no upgrades to roll back".into()));
        }

        let refund = interest::bank_downgrade_refund(user.extra_percent);
        self.ledger.credit_crystals(user_id, refund)?;
        self.db.bump_extra_percent(user_id, -1)?;

        Ok((refund, user.extra_percent - 1))
    }

    /// Raise protectLevel by one. Monotonic: no downgrade path, and no
    /// further upgrades once the hack chance already sits at its floor.
    pub fn upgrade_protection(&self, user_id: i64, now: i64) -> Result<(i64, i64)> {
        let user = self.ledger.require_user(user_id)?;
        let guild_level = match user.guild_id {
            Some(gid) => self.db.get_guild(gid)?.map(|g| g.level).unwrap_or(0),
            None => 0,
        };
        if odds::hack_success_percent(user.protect_level, guild_level) <= consts::HACK_MIN_PERCENT
        {
            return Err(EngineError::Validation(
                "protection is already at its maximum".into(),
            ));
        }

        let price = interest::protection_upgrade_price(user.protect_level);
        if user.crystals < price {
            return Err(EngineError::InsufficientFunds(format!(
                "upgrade costs {price} crystals"
            )));
        }

        self.ledger.debit_crystals(user_id, price)?;
        self.ledger.record_payment(
            user_id,
            None,
            PaymentKind::Protection,
            price,
            1,
            Currency::Crystals,
            now,
        )?;
        self.db.bump_protect_level(user_id, 1)?;

        Ok((price, user.protect_level + 1))
    }

    /// One paid guess against someone else's account. The crystal price
    /// is charged and the attempt recorded win or lose; only a won
    /// defense roll reveals the per-character hints.
    pub fn attempt_hack<R: Rng + ?Sized>(
        &self,
        attacker_id: i64,
        account_id: i64,
        guess: &str,
        now: i64,
        rng: &mut R,
    ) -> Result<HackOutcome> {
        let attacker = self.ledger.require_user(attacker_id)?;

        let account = self
            .db
            .get_account(account_id)?
            .filter(|a| a.active)
            .ok_or_else(|| EngineError::NotFound(format!("no open account {account_id}")))?;
        if account.user_id == attacker_id {
            return Err(EngineError::Validation(
                "cannot hack your own account".into(),
            ));
        }

        let owner = self.ledger.require_user(account.user_id)?;
        if attacker.guild_id.is_some() && attacker.guild_id == owner.guild_id {
            return Err(EngineError::NotAuthorized(
                "cannot hack a guild-mate's account".into(),
            ));
        }
        if attacker.crystals < consts::PRICE_HACK_CRYSTALS {
            return Err(EngineError::InsufficientFunds(format!(
                "a hack attempt costs {} crystals",
                consts::PRICE_HACK_CRYSTALS
            )));
        }

        let guild_level = match owner.guild_id {
            Some(gid) => self.db.get_guild(gid)?.map(|g| g.level).unwrap_or(0),
            None => 0,
        };
        let success = odds::hack_roll(owner.protect_level, guild_level, rng);

        let guess = guess.to_lowercase();
        self.ledger
            .debit_crystals(attacker_id, consts::PRICE_HACK_CRYSTALS)?;
        self.ledger.record_payment(
            attacker_id,
            None,
            PaymentKind::Hack,
            consts::PRICE_HACK_CRYSTALS,
            1,
            Currency::Crystals,
            now,
        )?;
        self.db
            .insert_hack_attempt(attacker_id, account_id, &guess, success, now)?;

        if !success {
            return Ok(HackOutcome {
                success: false,
                cracked: false,
                hints: None,
            });
        }

        info!(attacker_id, account_id, "hack attempt got through");
        Ok(HackOutcome {
            success: true,
            cracked: account.password == guess,
            hints: Some(password::password_hints(&account.password, &guess)),
        })
    }

    /// Sum of the derived current values of a user's open accounts.
    pub fn total_value(&self, user_id: i64, now: i64) -> Result<i64> {
        let owner = self.ledger.require_user(user_id)?;
        let percent = self.owner_percent(&owner)?;

        let mut total = 0;
        for account in self.db.user_accounts(user_id)? {
            total += interest::bank_value(account.principal, percent, now - account.created_at);
        }
        Ok(total)
    }

    pub fn account(&self, id: i64) -> Result<Option<BankAccount>> {
        Ok(self.db.get_account(id)?)
    }
}
