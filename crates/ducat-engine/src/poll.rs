use std::sync::{Arc, Mutex};

use rand::Rng;
use rand::seq::SliceRandom;
use tracing::info;

use ducat_db::Database;
use ducat_economy::{consts, fees, password, votes};
use ducat_types::models::{Currency, Decision, POLL_STAGE_FINISHED, PaymentKind, Poll};

use crate::error::{EngineError, Result};
use crate::ledger::Ledger;

/// Community moderation: weighted reports accumulate into a poll, polls
/// resolve into verdicts by weighted vote. Both thresholds scale with
/// the eligible population and with the accused's wealth, so wealth is
/// simultaneously influence and exposure.
pub struct Polls {
    db: Arc<Database>,
    ledger: Ledger,
    /// Reports against these identities carry zero weight.
    protected: Vec<i64>,
    /// Serializes voting and resolution: two concurrent final votes
    /// must not both resolve the same poll.
    resolve_lock: Mutex<()>,
}

#[derive(Debug)]
pub enum ReportOutcome {
    Filed { reports: i64, weight: i64 },
    PollOpened { poll_id: i64 },
}

#[derive(Debug)]
pub enum VoteOutcome {
    Recorded {
        votes: i64,
    },
    Resolved {
        verdict: Decision,
        /// Fine amount or mute-until timestamp, where applicable.
        severity: Option<String>,
    },
    /// The poll sat open past its window and was closed without a verdict.
    Expired,
}

impl Polls {
    pub fn new(db: Arc<Database>, ledger: Ledger, protected: Vec<i64>) -> Self {
        Self {
            db,
            ledger,
            protected,
            resolve_lock: Mutex::new(()),
        }
    }

    fn lock_resolution(&self) -> std::sync::MutexGuard<'_, ()> {
        self.resolve_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Files a report. The reporter is paid for the civic effort whether
    /// or not the report tips the target into a poll.
    pub fn file_report(
        &self,
        from_id: i64,
        to_id: i64,
        comment: Option<&str>,
        now: i64,
    ) -> Result<ReportOutcome> {
        if from_id == to_id {
            return Err(EngineError::Validation("cannot report yourself".into()));
        }
        let reporter = self.ledger.require_user(from_id)?;
        let accused = self.ledger.require_user(to_id)?;
        if reporter.is_muted(now) {
            return Err(EngineError::NotAuthorized("muted users cannot report".into()));
        }
        if reporter.guild_id.is_some() && reporter.guild_id == accused.guild_id {
            return Err(EngineError::Validation(
                "cannot report a guild-mate".into(),
            ));
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

        if let Some(last) = self.db.last_report_at(from_id)? {
            let remaining = consts::COOLDOWN_REPORT - (now - last);
            if remaining > 0 {
                return Err(EngineError::Cooldown(remaining));
            }
        }
        if let Some(last) = self.db.last_poll_at(to_id)? {
            let remaining = consts::COOLDOWN_TARGET_POLL - (now - last);
            if remaining > 0 {
                return Err(EngineError::Cooldown(remaining));
            }
        }

        let weight = if self.protected.contains(&to_id) {
            0
        } else {
            reporter.balance
        };
        self.ledger.credit(from_id, consts::REWARD_REPORT)?;
        self.db.insert_report(from_id, to_id, weight, comment, now)?;

        let stats = self.db.report_stats(to_id)?;
        let quorum = votes::reports_quorum(self.db.eligible_count(now)?);

        // The accused's exposure is their own wealth, or the whole
        // guild's when they have one.
        let mut exposure = accused.balance;
        if let Some(gid) = accused.guild_id {
            exposure = exposure.max(self.db.guild_total_balance(gid)?);
        }

        if stats.count >= quorum
            && stats.weight_sum >= exposure * consts::REPORT_BALANCE_MULTIPLIER
        {
            let poll_id = self.db.insert_poll(to_id, now)?;
            self.db.delete_reports(to_id)?;
            info!(poll_id, to_id, reports = stats.count, "poll opened");
            return Ok(ReportOutcome::PollOpened { poll_id });
        }

        Ok(ReportOutcome::Filed {
            reports: stats.count,
            weight: stats.weight_sum,
        })
    }

    /// Casts one weighted vote; resolves the poll when both quorums are
    /// met, or expires it when its window has lapsed.
    pub fn cast_vote<R: Rng + ?Sized>(
        &self,
        poll_id: i64,
        voter_id: i64,
        decision: Decision,
        now: i64,
        rng: &mut R,
    ) -> Result<VoteOutcome> {
        let _guard = self.lock_resolution();

        let poll = self
            .db
            .get_poll(poll_id)?
            .ok_or_else(|| EngineError::NotFound(format!("poll {poll_id} does not exist")))?;
        if poll.stage == POLL_STAGE_FINISHED {
            return Err(EngineError::Validation("poll already finished".into()));
        }
        if now - poll.created_at >= consts::POLL_WINDOW {
            self.db
                .finish_poll(poll.id, POLL_STAGE_FINISHED, None, None)?;
            info!(poll_id, "poll expired unresolved");
            return Ok(VoteOutcome::Expired);
        }

        if voter_id == poll.to_id {
            return Err(EngineError::NotAuthorized(
                "the accused does not vote".into(),
            ));
        }
        let voter = self.ledger.require_user(voter_id)?;
        if voter.is_muted(now) {
            return Err(EngineError::NotAuthorized("muted users cannot vote".into()));
        }
        if self.db.has_voted(poll_id, voter_id, poll.stage)? {
            return Err(EngineError::Validation("already voted".into()));
        }

        self.db
            .insert_vote(poll_id, voter_id, poll.stage, decision, voter.balance, now)?;

        let tallies = self.db.vote_tallies(poll_id, poll.stage)?;
        let votes_total: i64 = tallies.iter().map(|t| t.count).sum();
        let weight_total: i64 = tallies.iter().map(|t| t.weight_sum).sum();

        let accused = self.ledger.require_user(poll.to_id)?;
        let quorum = votes::votes_quorum(self.db.eligible_count(now)?);
        if votes_total >= quorum
            && weight_total >= accused.balance * consts::VOTES_BALANCE_MULTIPLIER
        {
            return self.resolve(&poll, now, rng);
        }

        Ok(VoteOutcome::Recorded { votes: votes_total })
    }

    fn resolve<R: Rng + ?Sized>(&self, poll: &Poll, now: i64, rng: &mut R) -> Result<VoteOutcome> {
        let raw = self.db.vote_tallies(poll.id, poll.stage)?;
        // Zero-fill so an unvoted decision still sits in the table.
        let tallies: Vec<(Decision, i64)> = Decision::ALL
            .iter()
            .map(|d| {
                let weight = raw
                    .iter()
                    .find(|t| Decision::from_str(&t.decision) == Some(*d))
                    .map(|t| t.weight_sum)
                    .unwrap_or(0);
                (*d, weight)
            })
            .collect();

        let verdict = votes::winning_decision(&tallies, rng);
        let severity = match verdict {
            Decision::Fine => {
                let accused = self.ledger.require_user(poll.to_id)?;
                let percent = votes::fine_percent(rng);
                let amount = votes::fine_amount(accused.balance, percent);
                if amount > 0 {
                    self.ledger.debit(poll.to_id, amount)?;
                    self.redistribute(amount, rng)?;
                }
                Some(amount.to_string())
            }
            Decision::Mute => {
                let until = now + votes::mute_duration_secs(rng);
                self.db.set_user_muted_until(poll.to_id, until)?;
                Some(until.to_string())
            }
            Decision::Ban => {
                self.db.set_user_banned(poll.to_id, true)?;
                None
            }
            Decision::Mercy => None,
        };

        self.db.finish_poll(
            poll.id,
            POLL_STAGE_FINISHED,
            Some(verdict),
            severity.as_deref(),
        )?;
        info!(poll_id = poll.id, verdict = verdict.as_str(), "poll resolved");
        Ok(VoteOutcome::Resolved { verdict, severity })
    }

    /// Hands most of a collected fine back to a random tenth of the
    /// eligible population. The accused is not excluded; the draw is
    /// chat-wide.
    fn redistribute<R: Rng + ?Sized>(&self, amount: i64, rng: &mut R) -> Result<()> {
        let net = amount - fees::fee(amount, consts::REDISTRIBUTION_FEE_PERCENT, 0);
        let mut ids: Vec<i64> = self.db.eligible_users()?.iter().map(|u| u.id).collect();
        if ids.is_empty() || net <= 0 {
            return Ok(());
        }

        ids.shuffle(rng);
        let take = ((ids.len() as f64 * consts::REDISTRIBUTION_USERS_PERCENT / 100.0) as usize)
            .max(1);
        let share = net / take as i64;
        if share <= 0 {
            return Ok(());
        }

        for id in ids.into_iter().take(take) {
            self.ledger.credit(id, share)?;
        }
        Ok(())
    }

    /// Burns crystals to wipe the reports currently standing against a
    /// user before they tip into a poll.
    pub fn purge_reports(&self, user_id: i64, now: i64) -> Result<()> {
        let user = self.ledger.require_user(user_id)?;
        if user.crystals < consts::PRICE_REPORT_PURGE_CRYSTALS {
            return Err(EngineError::InsufficientFunds(format!(
                "purging reports costs {} crystals",
                consts::PRICE_REPORT_PURGE_CRYSTALS
            )));
        }

        self.ledger
            .debit_crystals(user_id, consts::PRICE_REPORT_PURGE_CRYSTALS)?;
        self.ledger.record_payment(
            user_id,
            None,
            PaymentKind::ReportPurge,
            consts::PRICE_REPORT_PURGE_CRYSTALS,
            1,
            Currency::Crystals,
            now,
        )?;
        self.db.delete_reports(user_id)?;
        info!(user_id, "standing reports purged");
        Ok(())
    }

    pub fn get(&self, id: i64) -> Result<Option<Poll>> {
        Ok(self.db.get_poll(id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use ducat_types::models::{POLL_STAGE_OPEN, User};

    const HOUR: i64 = 3_600;

    fn setup(users: i64) -> Polls {
        let db = Arc::new(Database::open_in_memory().expect("in-memory db"));
        for id in 1..=users {
            db.ensure_user(id, Some(&format!("u{id}")), None, None, 0)
                .unwrap();
            db.set_user_agreed(id, true).unwrap();
        }
        Polls::new(db.clone(), Ledger::new(db), vec![])
    }

    fn user(polls: &Polls, id: i64) -> User {
        polls.db.get_user(id).unwrap().unwrap()
    }

    /// Reporters 2..=6 file against user 1, spaced past the cooldown.
    fn open_poll(polls: &Polls) -> i64 {
        for (i, from) in (2..=6).enumerate() {
            let now = i as i64 * HOUR;
            match polls.file_report(from, 1, None, now).unwrap() {
                ReportOutcome::Filed { reports, .. } => assert_eq!(reports, i as i64 + 1),
                ReportOutcome::PollOpened { poll_id } => {
                    assert_eq!(i, 4, "poll opened on the quorum report");
                    return poll_id;
                }
            }
        }
        panic!("five reports never opened a poll");
    }

    #[test]
    fn reports_accumulate_into_a_poll_and_pay_the_reporters() {
        let polls = setup(6);
        let poll_id = open_poll(&polls);

        let poll = polls.get(poll_id).unwrap().unwrap();
        assert_eq!(poll.to_id, 1);
        assert_eq!(poll.stage, POLL_STAGE_OPEN);
        // Each reporter earned the filing reward.
        assert_eq!(user(&polls, 2).balance, 100);

        // The standing reports were consumed by the poll.
        assert_eq!(polls.db.report_stats(1).unwrap().count, 0);
    }

    #[test]
    fn report_guards_hold() {
        let polls = setup(6);

        assert!(matches!(
            polls.file_report(2, 2, None, 0).unwrap_err(),
            EngineError::Validation(_)
        ));

        polls.file_report(2, 1, None, 0).unwrap();
        // Too soon for a second report from the same user.
        assert!(matches!(
            polls.file_report(2, 3, None, 60).unwrap_err(),
            EngineError::Cooldown(_)
        ));

        assert!(matches!(
            polls
                .file_report(3, 1, Some("x".repeat(200).as_str()), 0)
                .unwrap_err(),
            EngineError::Validation(_)
        ));
    }

    #[test]
    fn weight_threshold_scales_with_the_accused() {
        let polls = setup(6);
        // A wealthy accused needs weight, not just headcount: broke
        // reporters never tip 30x of 1000.
        polls.ledger.credit(1, 1_000).unwrap();

        for (i, from) in (2..=6).enumerate() {
            let outcome = polls.file_report(from, 1, None, i as i64 * HOUR).unwrap();
            assert!(matches!(outcome, ReportOutcome::Filed { .. }));
        }
    }

    #[test]
    fn protected_targets_accumulate_zero_weight() {
        let db = Arc::new(Database::open_in_memory().expect("in-memory db"));
        for id in 1..=3 {
            db.ensure_user(id, None, None, None, 0).unwrap();
            db.set_user_agreed(id, true).unwrap();
        }
        let polls = Polls::new(db.clone(), Ledger::new(db), vec![1]);

        polls.ledger.credit(2, 50_000).unwrap();
        polls.file_report(2, 1, None, 0).unwrap();
        assert_eq!(polls.db.report_stats(1).unwrap().weight_sum, 0);
    }

    #[test]
    fn votes_resolve_at_quorum() {
        let polls = setup(12);
        let poll_id = open_poll(&polls);

        let mut rng = StdRng::seed_from_u64(7);
        // Ten voters, all mercy. The accused holds nothing, so weight
        // clears trivially; headcount is the binding quorum.
        let mut resolved = false;
        for voter in 2..=11 {
            polls.ledger.credit(voter, 10).unwrap();
            match polls
                .cast_vote(poll_id, voter, Decision::Mercy, HOUR, &mut rng)
                .unwrap()
            {
                VoteOutcome::Recorded { votes } => assert_eq!(votes, voter - 1),
                VoteOutcome::Resolved { verdict, severity } => {
                    assert_eq!(voter, 11, "resolved on the tenth vote");
                    assert_eq!(verdict, Decision::Mercy);
                    assert!(severity.is_none());
                    resolved = true;
                }
                VoteOutcome::Expired => panic!("poll expired mid-test"),
            }
        }
        assert!(resolved);
        assert_eq!(
            polls.get(poll_id).unwrap().unwrap().stage,
            POLL_STAGE_FINISHED
        );

        // A finished poll takes no further votes.
        assert!(matches!(
            polls
                .cast_vote(poll_id, 12, Decision::Ban, HOUR, &mut rng)
                .unwrap_err(),
            EngineError::Validation(_)
        ));
    }

    #[test]
    fn fine_verdict_takes_and_redistributes() {
        let polls = setup(12);
        let poll_id = open_poll(&polls);
        polls.ledger.credit(1, 1_000).unwrap();

        let mut rng = StdRng::seed_from_u64(3);
        let mut outcome = None;
        for voter in 2..=11 {
            // Heavy voters so the 40x weight quorum clears.
            polls.ledger.credit(voter, 10_000).unwrap();
            outcome = Some(
                polls
                    .cast_vote(poll_id, voter, Decision::Fine, HOUR, &mut rng)
                    .unwrap(),
            );
        }

        let Some(VoteOutcome::Resolved { verdict, severity }) = outcome else {
            panic!("poll did not resolve: {outcome:?}");
        };
        assert_eq!(verdict, Decision::Fine);
        let amount: i64 = severity.unwrap().parse().unwrap();
        assert!((100..990).contains(&amount), "fine out of range: {amount}");

        // One random eligible user got the net share, possibly the
        // accused themselves; the 15% cut is burned either way.
        let net = amount - fees::fee(amount, consts::REDISTRIBUTION_FEE_PERCENT, 0);
        let balance = user(&polls, 1).balance;
        assert!(
            balance == 1_000 - amount || balance == 1_000 - amount + net,
            "unexpected accused balance {balance} for fine {amount}"
        );
    }

    #[test]
    fn duplicate_and_accused_votes_are_rejected() {
        let polls = setup(12);
        let poll_id = open_poll(&polls);
        let mut rng = StdRng::seed_from_u64(1);

        assert!(matches!(
            polls
                .cast_vote(poll_id, 1, Decision::Mercy, HOUR, &mut rng)
                .unwrap_err(),
            EngineError::NotAuthorized(_)
        ));

        polls
            .cast_vote(poll_id, 2, Decision::Mercy, HOUR, &mut rng)
            .unwrap();
        assert!(matches!(
            polls
                .cast_vote(poll_id, 2, Decision::Ban, HOUR, &mut rng)
                .unwrap_err(),
            EngineError::Validation(_)
        ));
    }

    #[test]
    fn polls_expire_past_their_window() {
        let polls = setup(12);
        let poll_id = open_poll(&polls);
        let opened_at = polls.get(poll_id).unwrap().unwrap().created_at;

        let mut rng = StdRng::seed_from_u64(1);
        let outcome = polls
            .cast_vote(
                poll_id,
                2,
                Decision::Mercy,
                opened_at + consts::POLL_WINDOW,
                &mut rng,
            )
            .unwrap();
        assert!(matches!(outcome, VoteOutcome::Expired));

        let poll = polls.get(poll_id).unwrap().unwrap();
        assert_eq!(poll.stage, POLL_STAGE_FINISHED);
        assert!(poll.verdict.is_none());
    }

    #[test]
    fn purge_wipes_standing_reports_for_crystals() {
        let polls = setup(6);
        polls.file_report(2, 1, None, 0).unwrap();
        polls.file_report(3, 1, None, 0).unwrap();

        assert!(matches!(
            polls.purge_reports(1, 0).unwrap_err(),
            EngineError::InsufficientFunds(_)
        ));

        polls.ledger.credit_crystals(1, 10).unwrap();
        polls.purge_reports(1, 0).unwrap();
        assert_eq!(polls.db.report_stats(1).unwrap().count, 0);
        assert_eq!(user(&polls, 1).crystals, 0);
    }
}
