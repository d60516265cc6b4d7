use std::sync::{Arc, Mutex};

use tracing::info;

use ducat_db::Database;
use ducat_economy::consts;
use ducat_types::models::{Currency, MarketOffer, OfferDirection, PaymentKind, Trade};

use crate::error::{EngineError, Result};
use crate::ledger::Ledger;

/// Two-sided crystal order book. Funds are escrowed at placement (the
/// seller's crystals, the buyer's coins at their limit price), so the
/// book itself is always fully collateralized. Trades execute at the
/// seller's listed price; the buyer gets the limit-price difference
/// back from escrow.
pub struct Market {
    db: Arc<Database>,
    ledger: Ledger,
    /// Serializes clearing and cancellation. Matching reads the whole
    /// book and settles both sides; interleaving two passes could fill
    /// the same resting quantity twice.
    clearing: Mutex<()>,
}

impl Market {
    pub fn new(db: Arc<Database>, ledger: Ledger) -> Self {
        Self {
            db,
            ledger,
            clearing: Mutex::new(()),
        }
    }

    fn lock_clearing(&self) -> std::sync::MutexGuard<'_, ()> {
        self.clearing
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn place_sell(
        &self,
        user_id: i64,
        crystals: i64,
        price: i64,
        now: i64,
    ) -> Result<(i64, Vec<Trade>)> {
        let user = self.ledger.require_user(user_id)?;
        validate_offer(crystals, price)?;
        if user.crystals < crystals {
            return Err(EngineError::InsufficientFunds(format!(
                "selling {crystals} crystals needs that many on hand"
            )));
        }

        self.ledger.debit_crystals(user_id, crystals)?;
        let offer_id = self
            .db
            .insert_offer(user_id, OfferDirection::Sell, crystals, price, now)?;
        info!(user_id, offer_id, crystals, price, "sell offer placed");

        let trades = self.clear(now)?;
        Ok((offer_id, trades))
    }

    pub fn place_buy(
        &self,
        user_id: i64,
        crystals: i64,
        price: i64,
        now: i64,
    ) -> Result<(i64, Vec<Trade>)> {
        let user = self.ledger.require_user(user_id)?;
        validate_offer(crystals, price)?;

        let open: i64 = self
            .db
            .user_open_offers(user_id, OfferDirection::Buy)?
            .iter()
            .map(|o| o.crystals)
            .sum();
        if open + crystals > consts::MAX_OPEN_BUY_CRYSTALS {
            return Err(EngineError::Validation(format!(
                "at most {} crystals across open buy offers",
                consts::MAX_OPEN_BUY_CRYSTALS
            )));
        }

        let cost = crystals
            .checked_mul(price)
            .ok_or_else(|| EngineError::Validation("offer cost overflows".into()))?;
        if user.balance < cost {
            return Err(EngineError::InsufficientFunds(format!(
                "buying needs {cost} coins up front"
            )));
        }

        self.ledger.debit(user_id, cost)?;
        let offer_id = self
            .db
            .insert_offer(user_id, OfferDirection::Buy, crystals, price, now)?;
        info!(user_id, offer_id, crystals, price, "buy offer placed");

        let trades = self.clear(now)?;
        Ok((offer_id, trades))
    }

    /// Pulls all of a user's open offers on one side and returns their
    /// escrow: crystals for sells, coins at the limit price for buys.
    /// Returns the total refunded in the offer's escrow currency.
    pub fn cancel(&self, user_id: i64, direction: OfferDirection) -> Result<i64> {
        let _guard = self.lock_clearing();
        self.ledger.require_user(user_id)?;

        let offers = self.db.user_open_offers(user_id, direction)?;
        let mut refunded = 0;
        for offer in &offers {
            match direction {
                OfferDirection::Sell => refunded += offer.crystals,
                OfferDirection::Buy => refunded += offer.crystals * offer.price,
            }
            self.db.set_offer_remaining(offer.id, 0)?;
        }

        if refunded > 0 {
            match direction {
                OfferDirection::Sell => self.ledger.credit_crystals(user_id, refunded)?,
                OfferDirection::Buy => self.ledger.credit(user_id, refunded)?,
            }
            info!(user_id, ?direction, refunded, "open offers cancelled");
        }
        Ok(refunded)
    }

    /// Both sides of the live book, best prices first.
    pub fn book(&self) -> Result<(Vec<MarketOffer>, Vec<MarketOffer>)> {
        let sells = self.db.open_offers(OfferDirection::Sell)?;
        let buys = self.db.open_offers(OfferDirection::Buy)?;
        Ok((sells, buys))
    }

    /// Matches crossing offers until none remain. Highest buys meet
    /// cheapest sells; a user's own offers never cross each other.
    /// Idempotent on a book with no crossing pairs.
    pub fn clear(&self, now: i64) -> Result<Vec<Trade>> {
        let _guard = self.lock_clearing();

        let mut buys = self.db.open_offers(OfferDirection::Buy)?;
        let mut sells = self.db.open_offers(OfferDirection::Sell)?;
        let mut trades = Vec::new();

        for buy in buys.iter_mut() {
            for sell in sells.iter_mut() {
                if buy.crystals == 0 {
                    break;
                }
                if sell.crystals == 0 || sell.user_id == buy.user_id {
                    continue;
                }
                if buy.price < sell.price {
                    // Sells are sorted ascending; nothing further crosses.
                    break;
                }

                let quantity = buy.crystals.min(sell.crystals);
                let refund = (buy.price - sell.price) * quantity;

                self.ledger.credit(sell.user_id, sell.price * quantity)?;
                self.ledger.credit_crystals(buy.user_id, quantity)?;
                if refund > 0 {
                    self.ledger.credit(buy.user_id, refund)?;
                }
                self.ledger.record_payment(
                    buy.user_id,
                    Some(sell.user_id),
                    PaymentKind::Market,
                    sell.price,
                    quantity,
                    Currency::Coins,
                    now,
                )?;

                buy.crystals -= quantity;
                sell.crystals -= quantity;
                self.db.set_offer_remaining(buy.id, buy.crystals)?;
                self.db.set_offer_remaining(sell.id, sell.crystals)?;

                trades.push(Trade {
                    buyer_id: buy.user_id,
                    seller_id: sell.user_id,
                    crystals: quantity,
                    price: sell.price,
                    refund,
                });
            }
        }

        if !trades.is_empty() {
            info!(count = trades.len(), "market cleared");
        }
        Ok(trades)
    }
}

fn validate_offer(crystals: i64, price: i64) -> Result<()> {
    if !(1..=consts::MAX_AMOUNT).contains(&crystals) || !(1..=consts::MAX_AMOUNT).contains(&price)
    {
        return Err(EngineError::Validation(format!(
            "quantity and price must be between 1 and {}",
            consts::MAX_AMOUNT
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ducat_types::models::User;

    fn setup() -> Market {
        let db = Arc::new(Database::open_in_memory().expect("in-memory db"));
        db.ensure_user(1, Some("seller"), None, None, 0).unwrap();
        db.ensure_user(2, Some("buyer"), None, None, 0).unwrap();
        Market::new(db.clone(), Ledger::new(db))
    }

    fn user(market: &Market, id: i64) -> User {
        market.db.get_user(id).unwrap().unwrap()
    }

    #[test]
    fn buy_executes_at_seller_price_with_refund() {
        let market = setup();
        market.ledger.credit_crystals(1, 10).unwrap();
        market.ledger.credit(2, 28).unwrap();

        let (_, trades) = market.place_sell(1, 10, 5, 0).unwrap();
        assert!(trades.is_empty());

        // Buyer bids 4 at 7; fills 4 at the seller's 5, refunding 8.
        let (_, trades) = market.place_buy(2, 4, 7, 1).unwrap();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].crystals, 4);
        assert_eq!(trades[0].price, 5);
        assert_eq!(trades[0].refund, 8);

        let seller = user(&market, 1);
        let buyer = user(&market, 2);
        assert_eq!(seller.balance, 20);
        assert_eq!(seller.crystals, 0);
        assert_eq!(buyer.crystals, 4);
        assert_eq!(buyer.balance, 8);

        // 6 crystals rest on the book.
        let (sells, buys) = market.book().unwrap();
        assert_eq!(sells.len(), 1);
        assert_eq!(sells[0].crystals, 6);
        assert!(buys.is_empty());
    }

    #[test]
    fn clearing_is_idempotent_and_conserving() {
        let market = setup();
        market.ledger.credit_crystals(1, 5).unwrap();
        market.ledger.credit(2, 100).unwrap();

        market.place_sell(1, 5, 10, 0).unwrap();
        market.place_buy(2, 5, 10, 1).unwrap();

        // Everything matched; a second pass finds nothing.
        assert!(market.clear(2).unwrap().is_empty());

        let seller = user(&market, 1);
        let buyer = user(&market, 2);
        assert_eq!(seller.balance + buyer.balance, 100);
        assert_eq!(seller.crystals + buyer.crystals, 5);
        assert_eq!(buyer.crystals, 5);
        assert_eq!(seller.balance, 50);
    }

    #[test]
    fn crossing_starts_from_best_prices() {
        let market = setup();
        market.ledger.credit_crystals(1, 6).unwrap();
        market.ledger.credit(2, 100).unwrap();

        market.place_sell(1, 3, 8, 0).unwrap();
        market.place_sell(1, 3, 4, 1).unwrap();
        let (_, trades) = market.place_buy(2, 4, 6, 2).unwrap();

        // Only the cheap sell crosses; 3 fill at 4, 1 rests.
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].crystals, 3);
        assert_eq!(trades[0].price, 4);

        let (sells, buys) = market.book().unwrap();
        assert_eq!(sells.len(), 1);
        assert_eq!(sells[0].price, 8);
        assert_eq!(buys.len(), 1);
        assert_eq!(buys[0].crystals, 1);
    }

    #[test]
    fn own_offers_never_self_trade() {
        let market = setup();
        market.ledger.credit_crystals(1, 5).unwrap();
        market.ledger.credit(1, 100).unwrap();

        market.place_sell(1, 5, 3, 0).unwrap();
        let (_, trades) = market.place_buy(1, 5, 3, 1).unwrap();
        assert!(trades.is_empty());
    }

    #[test]
    fn cancel_returns_escrow() {
        let market = setup();
        market.ledger.credit_crystals(1, 8).unwrap();
        market.ledger.credit(2, 50).unwrap();

        market.place_sell(1, 8, 100, 0).unwrap();
        market.place_buy(2, 5, 6, 1).unwrap();
        assert_eq!(user(&market, 1).crystals, 0);
        assert_eq!(user(&market, 2).balance, 20);

        assert_eq!(market.cancel(1, OfferDirection::Sell).unwrap(), 8);
        assert_eq!(market.cancel(2, OfferDirection::Buy).unwrap(), 30);
        assert_eq!(user(&market, 1).crystals, 8);
        assert_eq!(user(&market, 2).balance, 50);

        let (sells, buys) = market.book().unwrap();
        assert!(sells.is_empty() && buys.is_empty());
    }

    #[test]
    fn buy_escrow_cap_is_enforced() {
        let market = setup();
        market.ledger.credit(2, 1_000).unwrap();

        market.place_buy(2, 7, 1, 0).unwrap();
        let err = market.place_buy(2, 4, 1, 1).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
        market.place_buy(2, 3, 1, 2).unwrap();
    }
}
