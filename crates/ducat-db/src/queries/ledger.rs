use anyhow::Result;

use crate::Database;
use ducat_types::models::{CasinoMode, Currency, PaymentKind};

impl Database {
    /// Append-only audit row; `quantity` batches per-unit market fills.
    pub fn insert_payment(
        &self,
        user_id: i64,
        peer_id: Option<i64>,
        kind: PaymentKind,
        amount: i64,
        quantity: i64,
        currency: Currency,
        now: i64,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO payments (user_id, peer_id, kind, amount, quantity, currency, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                (
                    user_id,
                    peer_id,
                    kind.as_str(),
                    amount,
                    quantity,
                    currency.as_str(),
                    now,
                ),
            )?;
            Ok(())
        })
    }

    pub fn insert_transfer(
        &self,
        from_id: i64,
        to_id: i64,
        amount: i64,
        fee: i64,
        currency: Currency,
        comment: Option<&str>,
        now: i64,
    ) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO transfers (from_id, to_id, amount, fee, currency, comment, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                (
                    from_id,
                    to_id,
                    amount,
                    fee,
                    currency.as_str(),
                    comment,
                    now,
                ),
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn insert_game(
        &self,
        user_id: i64,
        mode: CasinoMode,
        bet: i64,
        payout: i64,
        now: i64,
    ) -> Result<()> {
        let mode = match mode {
            CasinoMode::VeryLow => "verylow",
            CasinoMode::Low => "low",
            CasinoMode::Middle => "middle",
            CasinoMode::High => "high",
            CasinoMode::VeryHigh => "veryhigh",
        };
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO games (user_id, mode, bet, payout, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                (user_id, mode, bet, payout, now),
            )?;
            Ok(())
        })
    }
}
