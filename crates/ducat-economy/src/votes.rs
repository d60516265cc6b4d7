use rand::Rng;
use rand::seq::IndexedRandom;

use crate::consts;
use crate::fees::part_of;
use ducat_types::models::Decision;

/// Reports needed before a poll opens against a user.
pub fn reports_quorum(eligible_users: i64) -> i64 {
    part_of(
        eligible_users,
        consts::MIN_REPORTS_PERCENT,
        consts::MIN_REPORTS_COUNT,
    )
}

/// Votes needed before a poll can resolve.
pub fn votes_quorum(eligible_users: i64) -> i64 {
    part_of(
        eligible_users,
        consts::MIN_VOTES_PERCENT,
        consts::MIN_VOTES_COUNT,
    )
}

/// The verdict with the highest weight sum. Ties are broken by a uniform
/// choice among all tied leaders, so the outcome does not depend on the
/// order tallies are supplied in.
pub fn winning_decision<R: Rng + ?Sized>(tallies: &[(Decision, i64)], rng: &mut R) -> Decision {
    let top = tallies.iter().map(|(_, w)| *w).max().unwrap_or(0);
    let leaders: Vec<Decision> = tallies
        .iter()
        .filter(|(_, w)| *w == top)
        .map(|(d, _)| *d)
        .collect();

    *leaders.choose(rng).unwrap_or(&Decision::Mercy)
}

/// Severity of a fine verdict: percent of the accused's balance taken.
pub fn fine_percent<R: Rng + ?Sized>(rng: &mut R) -> i64 {
    (rng.random::<f64>() * (99.0 - 10.0) + 10.0) as i64
}

/// The fine amount for a given balance and rolled percent.
pub fn fine_amount(balance: i64, percent: i64) -> i64 {
    (balance as f64 * percent as f64 / 100.0) as i64
}

/// Severity of a mute verdict: a duration drawn from one of three
/// buckets — 30 min–24 h most of the time, 1–2 days sometimes, 2–3 days
/// rarely (weights 5:2:1) — then placed uniformly within the bucket.
pub fn mute_duration_secs<R: Rng + ?Sized>(rng: &mut R) -> i64 {
    const DAY: i64 = 86_400;
    const BUCKETS: [(i64, i64); 8] = [
        (1_800, DAY),
        (1_800, DAY),
        (1_800, DAY),
        (1_800, DAY),
        (1_800, DAY),
        (DAY, 2 * DAY),
        (DAY, 2 * DAY),
        (2 * DAY, 3 * DAY),
    ];

    let (lo, hi) = *BUCKETS.choose(rng).expect("non-empty");
    (rng.random::<f64>() * (hi - lo) as f64) as i64 + lo
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn quorums_floor_at_the_minimums() {
        assert_eq!(reports_quorum(20), 5);
        assert_eq!(reports_quorum(100), 20);
        assert_eq!(votes_quorum(20), 10);
        assert_eq!(votes_quorum(100), 30);
    }

    #[test]
    fn clear_leader_wins_regardless_of_seed() {
        let tallies = [
            (Decision::Fine, 300),
            (Decision::Mute, 500),
            (Decision::Ban, 100),
            (Decision::Mercy, 0),
        ];
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            assert_eq!(winning_decision(&tallies, &mut rng), Decision::Mute);
        }
    }

    #[test]
    fn ties_pick_only_among_the_leaders() {
        let tallies = [
            (Decision::Fine, 500),
            (Decision::Mute, 500),
            (Decision::Ban, 100),
            (Decision::Mercy, 0),
        ];
        let mut seen_fine = false;
        let mut seen_mute = false;
        for seed in 0..64 {
            let mut rng = StdRng::seed_from_u64(seed);
            match winning_decision(&tallies, &mut rng) {
                Decision::Fine => seen_fine = true,
                Decision::Mute => seen_mute = true,
                other => panic!("non-leader won: {other:?}"),
            }
        }
        assert!(seen_fine && seen_mute);
    }

    #[test]
    fn fine_percent_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..1_000 {
            let p = fine_percent(&mut rng);
            assert!((10..99).contains(&p), "percent out of range: {p}");
        }
    }

    #[test]
    fn fine_amount_truncates() {
        assert_eq!(fine_amount(1_000, 37), 370);
        assert_eq!(fine_amount(999, 10), 99);
        assert_eq!(fine_amount(0, 50), 0);
    }

    #[test]
    fn mute_duration_stays_in_the_envelope() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..1_000 {
            let d = mute_duration_secs(&mut rng);
            assert!((1_800..86_400 * 3).contains(&d), "duration out of range: {d}");
        }
    }
}
