use anyhow::Result;
use rusqlite::Connection;

use crate::Database;
use crate::queries::OptionalExt;
use ducat_types::models::BankAccount;

const ACCOUNT_COLUMNS: &str = "id, user_id, password, principal, active, created_at";

fn map_account(row: &rusqlite::Row<'_>) -> rusqlite::Result<BankAccount> {
    Ok(BankAccount {
        id: row.get(0)?,
        user_id: row.get(1)?,
        password: row.get(2)?,
        principal: row.get(3)?,
        active: row.get::<_, i64>(4)? != 0,
        created_at: row.get(5)?,
    })
}

impl Database {
    pub fn insert_account(
        &self,
        user_id: i64,
        password: &str,
        principal: i64,
        now: i64,
    ) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO bank_accounts (user_id, password, principal, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                (user_id, password, principal, now),
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_account(&self, id: i64) -> Result<Option<BankAccount>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM bank_accounts WHERE id = ?1");
            conn.query_row(&sql, [id], map_account).optional()
        })
    }

    /// Oldest active account with this password. Passwords are not
    /// unique across owners; whoever knows one can act on the account it
    /// finds.
    pub fn get_account_by_password(&self, password: &str) -> Result<Option<BankAccount>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {ACCOUNT_COLUMNS} FROM bank_accounts
                 WHERE password = ?1 AND active = 1
                 ORDER BY id LIMIT 1"
            );
            conn.query_row(&sql, [password], map_account).optional()
        })
    }

    pub fn open_account_count(&self, user_id: i64) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM bank_accounts WHERE user_id = ?1 AND active = 1",
                [user_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    pub fn user_accounts(&self, user_id: i64) -> Result<Vec<BankAccount>> {
        self.with_conn(|conn| query_user_accounts(conn, user_id))
    }

    pub fn close_account(&self, id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("UPDATE bank_accounts SET active = 0 WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    pub fn set_account_owner(&self, id: i64, user_id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE bank_accounts SET user_id = ?2 WHERE id = ?1",
                (id, user_id),
            )?;
            Ok(())
        })
    }

    pub fn set_account_password(&self, id: i64, password: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE bank_accounts SET password = ?2 WHERE id = ?1",
                (id, password),
            )?;
            Ok(())
        })
    }

    pub fn insert_hack_attempt(
        &self,
        user_id: i64,
        bank_id: i64,
        guess: &str,
        success: bool,
        now: i64,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO hack_attempts (user_id, bank_id, guess, success, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                (user_id, bank_id, guess, success as i64, now),
            )?;
            Ok(())
        })
    }
}

fn query_user_accounts(conn: &Connection, user_id: i64) -> Result<Vec<BankAccount>> {
    let sql = format!(
        "SELECT {ACCOUNT_COLUMNS} FROM bank_accounts
         WHERE user_id = ?1 AND active = 1
         ORDER BY id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([user_id], map_account)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}
