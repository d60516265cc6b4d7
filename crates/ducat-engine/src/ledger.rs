use std::sync::Arc;

use ducat_db::Database;
use ducat_types::models::{Currency, PaymentKind, User};

use crate::error::{EngineError, Result};

/// Balance and crystal mutation primitives plus the payment audit
/// trail. Debits deliberately tolerate driving a balance negative:
/// fines and taxes apply regardless of funds, and the components that
/// want sufficiency pre-check it themselves.
#[derive(Clone)]
pub struct Ledger {
    db: Arc<Database>,
}

impl Ledger {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn require_user(&self, id: i64) -> Result<User> {
        self.db
            .get_user(id)?
            .ok_or_else(|| EngineError::NotFound(format!("user {id} does not exist")))
    }

    pub fn credit(&self, user_id: i64, amount: i64) -> Result<()> {
        self.db.adjust_balance(user_id, amount)?;
        Ok(())
    }

    pub fn debit(&self, user_id: i64, amount: i64) -> Result<()> {
        self.db.adjust_balance(user_id, -amount)?;
        Ok(())
    }

    pub fn credit_crystals(&self, user_id: i64, amount: i64) -> Result<()> {
        self.db.adjust_crystals(user_id, amount)?;
        Ok(())
    }

    pub fn debit_crystals(&self, user_id: i64, amount: i64) -> Result<()> {
        self.db.adjust_crystals(user_id, -amount)?;
        Ok(())
    }

    pub fn record_payment(
        &self,
        user_id: i64,
        peer_id: Option<i64>,
        kind: PaymentKind,
        amount: i64,
        quantity: i64,
        currency: Currency,
        now: i64,
    ) -> Result<()> {
        debug_assert!(amount > 0, "payments record positive amounts");
        self.db
            .insert_payment(user_id, peer_id, kind, amount, quantity, currency, now)?;
        Ok(())
    }

    /// Moves `amount` and takes `fee` from the sender in one step,
    /// recording the transfer. Sufficiency is the caller's check.
    pub fn transfer(
        &self,
        from_id: i64,
        to_id: i64,
        amount: i64,
        fee: i64,
        currency: Currency,
        comment: Option<&str>,
        now: i64,
    ) -> Result<i64> {
        match currency {
            Currency::Coins => {
                self.db.adjust_balance(from_id, -(amount + fee))?;
                self.db.adjust_balance(to_id, amount)?;
            }
            Currency::Crystals => {
                self.db.adjust_crystals(from_id, -(amount + fee))?;
                self.db.adjust_crystals(to_id, amount)?;
            }
        }

        let id = self
            .db
            .insert_transfer(from_id, to_id, amount, fee, currency, comment, now)?;
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Ledger, Arc<Database>) {
        let db = Arc::new(Database::open_in_memory().expect("in-memory db"));
        db.ensure_user(1, Some("ann"), None, None, 0).unwrap();
        db.ensure_user(2, Some("bob"), None, None, 0).unwrap();
        (Ledger::new(db.clone()), db)
    }

    #[test]
    fn debit_can_go_negative() {
        let (ledger, db) = setup();
        ledger.debit(1, 500).unwrap();
        assert_eq!(db.get_user(1).unwrap().unwrap().balance, -500);
    }

    #[test]
    fn transfer_moves_amount_and_burns_fee() {
        let (ledger, db) = setup();
        ledger.credit(1, 1_000).unwrap();

        let id = ledger
            .transfer(1, 2, 200, 10, Currency::Coins, Some("rent"), 42)
            .unwrap();
        assert!(id > 0);
        assert_eq!(db.get_user(1).unwrap().unwrap().balance, 790);
        assert_eq!(db.get_user(2).unwrap().unwrap().balance, 200);
    }

    #[test]
    fn crystal_transfer_is_separate_from_coins() {
        let (ledger, db) = setup();
        ledger.credit_crystals(1, 5).unwrap();
        ledger
            .transfer(1, 2, 3, 0, Currency::Crystals, None, 42)
            .unwrap();

        let ann = db.get_user(1).unwrap().unwrap();
        let bob = db.get_user(2).unwrap().unwrap();
        assert_eq!(ann.crystals, 2);
        assert_eq!(bob.crystals, 3);
        assert_eq!(ann.balance, 0);
        assert_eq!(bob.balance, 0);
    }
}
