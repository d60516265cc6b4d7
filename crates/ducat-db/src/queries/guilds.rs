use anyhow::Result;

use crate::Database;
use crate::queries::OptionalExt;
use ducat_types::models::Guild;

const GUILD_COLUMNS: &str = "id, leader_id, name, level, daily_tax, created_at";

fn map_guild(row: &rusqlite::Row<'_>) -> rusqlite::Result<Guild> {
    Ok(Guild {
        id: row.get(0)?,
        leader_id: row.get(1)?,
        name: row.get(2)?,
        level: row.get(3)?,
        daily_tax: row.get(4)?,
        created_at: row.get(5)?,
    })
}

impl Database {
    pub fn insert_guild(&self, leader_id: i64, name: &str, tax: i64, now: i64) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO guilds (leader_id, name, daily_tax, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                (leader_id, name, tax, now),
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_guild(&self, id: i64) -> Result<Option<Guild>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {GUILD_COLUMNS} FROM guilds WHERE id = ?1");
            conn.query_row(&sql, [id], map_guild).optional()
        })
    }

    pub fn get_guild_by_leader(&self, leader_id: i64) -> Result<Option<Guild>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {GUILD_COLUMNS} FROM guilds WHERE leader_id = ?1");
            conn.query_row(&sql, [leader_id], map_guild).optional()
        })
    }

    /// Name uniqueness only applies among live guilds; a dissolved
    /// guild's name can be reused.
    pub fn get_active_guild_by_name(&self, name: &str) -> Result<Option<Guild>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {GUILD_COLUMNS} FROM guilds
                 WHERE name = ?1 AND leader_id IS NOT NULL"
            );
            conn.query_row(&sql, [name], map_guild).optional()
        })
    }

    pub fn active_guilds(&self) -> Result<Vec<Guild>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {GUILD_COLUMNS} FROM guilds WHERE leader_id IS NOT NULL ORDER BY id"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], map_guild)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn set_guild_level(&self, id: i64, level: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("UPDATE guilds SET level = ?2 WHERE id = ?1", (id, level))?;
            Ok(())
        })
    }

    pub fn set_guild_tax(&self, id: i64, amount: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE guilds SET daily_tax = ?2 WHERE id = ?1",
                (id, amount),
            )?;
            Ok(())
        })
    }

    pub fn set_guild_name(&self, id: i64, name: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("UPDATE guilds SET name = ?2 WHERE id = ?1", (id, name))?;
            Ok(())
        })
    }

    /// Dissolution clears the leader and every member's membership in
    /// one transaction; the row itself stays, permanently inert.
    pub fn dissolve_guild(&self, id: i64) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute("UPDATE guilds SET leader_id = NULL WHERE id = ?1", [id])?;
            tx.execute("UPDATE users SET guild_id = NULL WHERE guild_id = ?1", [id])?;
            tx.commit()?;
            Ok(())
        })
    }
}
