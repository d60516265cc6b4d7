use anyhow::Result;
use rusqlite::Connection;

use crate::Database;
use ducat_types::models::{MarketOffer, OfferDirection};

const OFFER_COLUMNS: &str = "id, user_id, direction, crystals, price, created_at";

fn map_offer(row: &rusqlite::Row<'_>) -> rusqlite::Result<MarketOffer> {
    let direction: String = row.get(2)?;
    Ok(MarketOffer {
        id: row.get(0)?,
        user_id: row.get(1)?,
        direction: OfferDirection::from_str(&direction).unwrap_or(OfferDirection::Sell),
        crystals: row.get(3)?,
        price: row.get(4)?,
        created_at: row.get(5)?,
    })
}

impl Database {
    pub fn insert_offer(
        &self,
        user_id: i64,
        direction: OfferDirection,
        crystals: i64,
        price: i64,
        now: i64,
    ) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO market_offers (user_id, direction, crystals, price, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                (user_id, direction.as_str(), crystals, price, now),
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// The live book for one side: sells best-price-first ascending,
    /// buys descending, ties by age.
    pub fn open_offers(&self, direction: OfferDirection) -> Result<Vec<MarketOffer>> {
        self.with_conn(|conn| query_open_offers(conn, direction, None))
    }

    pub fn user_open_offers(
        &self,
        user_id: i64,
        direction: OfferDirection,
    ) -> Result<Vec<MarketOffer>> {
        self.with_conn(|conn| query_open_offers(conn, direction, Some(user_id)))
    }

    pub fn set_offer_remaining(&self, id: i64, crystals: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE market_offers SET crystals = ?2 WHERE id = ?1",
                (id, crystals),
            )?;
            Ok(())
        })
    }
}

fn query_open_offers(
    conn: &Connection,
    direction: OfferDirection,
    user_id: Option<i64>,
) -> Result<Vec<MarketOffer>> {
    let order = match direction {
        OfferDirection::Sell => "price ASC, id ASC",
        OfferDirection::Buy => "price DESC, id ASC",
    };
    let filter = if user_id.is_some() {
        " AND user_id = ?2"
    } else {
        ""
    };
    let sql = format!(
        "SELECT {OFFER_COLUMNS} FROM market_offers
         WHERE direction = ?1 AND crystals > 0{filter}
         ORDER BY {order}"
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = match user_id {
        Some(uid) => stmt
            .query_map((direction.as_str(), uid), map_offer)?
            .collect::<std::result::Result<Vec<_>, _>>()?,
        None => stmt
            .query_map([direction.as_str()], map_offer)?
            .collect::<std::result::Result<Vec<_>, _>>()?,
    };
    Ok(rows)
}
