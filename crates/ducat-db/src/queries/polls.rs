use anyhow::Result;

use crate::Database;
use crate::models::{ReportStats, VoteTally};
use crate::queries::OptionalExt;
use ducat_types::models::{Decision, Poll};

const POLL_COLUMNS: &str = "id, to_id, stage, verdict, severity, created_at";

fn map_poll(row: &rusqlite::Row<'_>) -> rusqlite::Result<Poll> {
    let verdict: Option<String> = row.get(3)?;
    Ok(Poll {
        id: row.get(0)?,
        to_id: row.get(1)?,
        stage: row.get(2)?,
        verdict: verdict.as_deref().and_then(Decision::from_str),
        severity: row.get(4)?,
        created_at: row.get(5)?,
    })
}

impl Database {
    // -- Reports --

    pub fn insert_report(
        &self,
        from_id: i64,
        to_id: i64,
        weight: i64,
        comment: Option<&str>,
        now: i64,
    ) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO reports (from_id, to_id, weight, comment, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                (from_id, to_id, weight, comment, now),
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn report_stats(&self, to_id: i64) -> Result<ReportStats> {
        self.with_conn(|conn| {
            let stats = conn.query_row(
                "SELECT COUNT(*), COALESCE(SUM(weight), 0) FROM reports WHERE to_id = ?1",
                [to_id],
                |row| {
                    Ok(ReportStats {
                        count: row.get(0)?,
                        weight_sum: row.get(1)?,
                    })
                },
            )?;
            Ok(stats)
        })
    }

    pub fn delete_reports(&self, to_id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM reports WHERE to_id = ?1", [to_id])?;
            Ok(())
        })
    }

    pub fn last_report_at(&self, from_id: i64) -> Result<Option<i64>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT created_at FROM reports WHERE from_id = ?1
                 ORDER BY created_at DESC LIMIT 1",
                [from_id],
                |row| row.get(0),
            )
            .optional()
        })
    }

    // -- Polls --

    pub fn insert_poll(&self, to_id: i64, now: i64) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO polls (to_id, created_at) VALUES (?1, ?2)",
                (to_id, now),
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_poll(&self, id: i64) -> Result<Option<Poll>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {POLL_COLUMNS} FROM polls WHERE id = ?1");
            conn.query_row(&sql, [id], map_poll).optional()
        })
    }

    /// Most recent poll ever opened against this user, any stage.
    pub fn last_poll_at(&self, to_id: i64) -> Result<Option<i64>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT created_at FROM polls WHERE to_id = ?1
                 ORDER BY created_at DESC LIMIT 1",
                [to_id],
                |row| row.get(0),
            )
            .optional()
        })
    }

    pub fn finish_poll(
        &self,
        id: i64,
        stage: i64,
        verdict: Option<Decision>,
        severity: Option<&str>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE polls SET stage = ?2, verdict = ?3, severity = ?4 WHERE id = ?1",
                (id, stage, verdict.map(|d| d.as_str()), severity),
            )?;
            Ok(())
        })
    }

    // -- Votes --

    pub fn insert_vote(
        &self,
        poll_id: i64,
        user_id: i64,
        stage: i64,
        decision: Decision,
        weight: i64,
        now: i64,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO votes (poll_id, user_id, stage, decision, weight, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                (poll_id, user_id, stage, decision.as_str(), weight, now),
            )?;
            Ok(())
        })
    }

    pub fn has_voted(&self, poll_id: i64, user_id: i64, stage: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM votes WHERE poll_id = ?1 AND user_id = ?2 AND stage = ?3",
                (poll_id, user_id, stage),
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
    }

    pub fn vote_tallies(&self, poll_id: i64, stage: i64) -> Result<Vec<VoteTally>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT decision, COALESCE(SUM(weight), 0), COUNT(*)
                 FROM votes WHERE poll_id = ?1 AND stage = ?2
                 GROUP BY decision",
            )?;
            let rows = stmt
                .query_map((poll_id, stage), |row| {
                    Ok(VoteTally {
                        decision: row.get(0)?,
                        weight_sum: row.get(1)?,
                        count: row.get(2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}
