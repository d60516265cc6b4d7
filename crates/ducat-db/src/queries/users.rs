use anyhow::{Result, anyhow};
use rusqlite::Connection;

use crate::Database;
use crate::queries::OptionalExt;
use ducat_types::models::{TransferPolicy, User};

const USER_COLUMNS: &str = "id, username, first_name, last_name, balance, crystals, guild_id, \
     policy, msg_code, extra_percent, protect_level, banned, muted_until, agreed, reward_at, \
     created_at";

pub(crate) fn map_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        balance: row.get(4)?,
        crystals: row.get(5)?,
        guild_id: row.get(6)?,
        policy: TransferPolicy::from_i64(row.get(7)?).unwrap_or(TransferPolicy::Open),
        msg_code: row.get(8)?,
        extra_percent: row.get(9)?,
        protect_level: row.get(10)?,
        banned: row.get::<_, i64>(11)? != 0,
        muted_until: row.get(12)?,
        agreed: row.get::<_, Option<i64>>(13)?.map(|v| v != 0),
        reward_at: row.get(14)?,
        created_at: row.get(15)?,
    })
}

impl Database {
    /// Users are created lazily on first interaction; display metadata
    /// is refreshed every time.
    pub fn ensure_user(
        &self,
        id: i64,
        username: Option<&str>,
        first_name: Option<&str>,
        last_name: Option<&str>,
        now: i64,
    ) -> Result<User> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO users (id, created_at) VALUES (?1, ?2)",
                (id, now),
            )?;
            conn.execute(
                "UPDATE users SET username = ?2, first_name = ?3, last_name = ?4 WHERE id = ?1",
                (id, username, first_name, last_name),
            )?;
            query_user(conn, id)?.ok_or_else(|| anyhow!("user {} missing after insert", id))
        })
    }

    pub fn get_user(&self, id: i64) -> Result<Option<User>> {
        self.with_conn(|conn| query_user(conn, id))
    }

    pub fn get_user_by_msg_code(&self, code: &str) -> Result<Option<User>> {
        self.with_conn(|conn| {
            let sql =
                format!("SELECT {USER_COLUMNS} FROM users WHERE msg_code = ?1 COLLATE NOCASE");
            conn.query_row(&sql, [code], map_user).optional()
        })
    }

    /// Every assigned message code, for uniqueness checks at generation.
    pub fn msg_codes(&self) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT msg_code FROM users WHERE msg_code IS NOT NULL")?;
            let rows = stmt
                .query_map([], |row| row.get(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn adjust_balance(&self, id: i64, delta: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET balance = balance + ?2 WHERE id = ?1",
                (id, delta),
            )?;
            Ok(())
        })
    }

    pub fn adjust_crystals(&self, id: i64, delta: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET crystals = crystals + ?2 WHERE id = ?1",
                (id, delta),
            )?;
            Ok(())
        })
    }

    pub fn set_user_guild(&self, id: i64, guild_id: Option<i64>) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET guild_id = ?2 WHERE id = ?1",
                (id, guild_id),
            )?;
            Ok(())
        })
    }

    pub fn set_user_policy(&self, id: i64, policy: TransferPolicy) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET policy = ?2 WHERE id = ?1",
                (id, policy.as_i64()),
            )?;
            Ok(())
        })
    }

    pub fn set_user_msg_code(&self, id: i64, code: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("UPDATE users SET msg_code = ?2 WHERE id = ?1", (id, code))?;
            Ok(())
        })
    }

    pub fn set_user_agreed(&self, id: i64, agreed: bool) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET agreed = ?2 WHERE id = ?1",
                (id, agreed as i64),
            )?;
            Ok(())
        })
    }

    pub fn set_user_banned(&self, id: i64, banned: bool) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET banned = ?2 WHERE id = ?1",
                (id, banned as i64),
            )?;
            Ok(())
        })
    }

    pub fn set_user_muted_until(&self, id: i64, until: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET muted_until = ?2 WHERE id = ?1",
                (id, until),
            )?;
            Ok(())
        })
    }

    pub fn set_user_reward_at(&self, id: i64, at: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("UPDATE users SET reward_at = ?2 WHERE id = ?1", (id, at))?;
            Ok(())
        })
    }

    pub fn bump_extra_percent(&self, id: i64, delta: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET extra_percent = extra_percent + ?2 WHERE id = ?1",
                (id, delta),
            )?;
            Ok(())
        })
    }

    pub fn bump_protect_level(&self, id: i64, delta: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET protect_level = protect_level + ?2 WHERE id = ?1",
                (id, delta),
            )?;
            Ok(())
        })
    }

    /// Everyone who accepted the terms and is not banned.
    pub fn eligible_users(&self) -> Result<Vec<User>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {USER_COLUMNS} FROM users WHERE agreed = 1 AND banned = 0 ORDER BY id"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], map_user)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Population size used for poll quorums; muted users are excluded
    /// since they cannot participate.
    pub fn eligible_count(&self, now: i64) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM users
                 WHERE agreed = 1 AND banned = 0 AND muted_until <= ?1 + 60",
                [now],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    pub fn guild_members(&self, guild_id: i64) -> Result<Vec<User>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE guild_id = ?1 ORDER BY id");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([guild_id], map_user)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn guild_member_count(&self, guild_id: i64) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM users WHERE guild_id = ?1",
                [guild_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    pub fn guild_total_balance(&self, guild_id: i64) -> Result<i64> {
        self.with_conn(|conn| {
            let total = conn.query_row(
                "SELECT COALESCE(SUM(balance), 0) FROM users WHERE guild_id = ?1",
                [guild_id],
                |row| row.get(0),
            )?;
            Ok(total)
        })
    }
}

fn query_user(conn: &Connection, id: i64) -> Result<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
    conn.query_row(&sql, [id], map_user).optional()
}
