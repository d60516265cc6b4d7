use rand::Rng;

use crate::consts;
use ducat_types::models::CasinoMode;

/// Chance (in whole percent) that a hack attempt gets through the
/// account owner's defenses. The decay truncates at every step, the
/// guild bonus is subtracted after the loop, and the result never drops
/// below the floor. Always recomputed: both inputs can change between
/// attempts.
pub fn hack_success_percent(protect_level: i64, guild_level: i64) -> i64 {
    let mut percent = consts::HACK_BASE_PERCENT;
    for _ in 0..protect_level.max(0) {
        percent = (percent as f64 * consts::HACK_DECAY) as i64;
    }
    percent -= guild_level.max(0);
    percent.max(consts::HACK_MIN_PERCENT)
}

/// One defense roll against [`hack_success_percent`].
pub fn hack_roll<R: Rng + ?Sized>(protect_level: i64, guild_level: i64, rng: &mut R) -> bool {
    let percent = hack_success_percent(protect_level, guild_level);
    rng.random_range(1..=100) <= percent
}

/// (payout multiplier, win percent) per casino tier. Safer tiers trade
/// multiplier for win chance; the top tiers are deliberately
/// negative-expectation.
pub fn casino_tier(mode: CasinoMode) -> (i64, f64) {
    match mode {
        CasinoMode::VeryLow => (2, 40.0),
        CasinoMode::Low => (5, 15.0),
        CasinoMode::Middle => (10, 5.0),
        CasinoMode::High => (50, 1.0),
        CasinoMode::VeryHigh => (100, 0.5),
    }
}

/// One casino round: a single uniform draw in [0, 100); payout is the
/// full multiplied stake on a win, zero otherwise. The stake itself is
/// the caller's business.
pub fn casino_payout<R: Rng + ?Sized>(mode: CasinoMode, bet: i64, rng: &mut R) -> i64 {
    let (multiplier, win_percent) = casino_tier(mode);
    let draw = rng.random::<f64>() * 100.0;
    if draw <= win_percent { multiplier * bet } else { 0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn base_chance_with_no_defenses() {
        assert_eq!(hack_success_percent(0, 0), 50);
    }

    #[test]
    fn decay_truncates_each_step() {
        // 50 -> 46 -> 42 -> 39, not a single 50*0.93^3 = 40.2.
        assert_eq!(hack_success_percent(1, 0), 46);
        assert_eq!(hack_success_percent(2, 0), 42);
        assert_eq!(hack_success_percent(3, 0), 39);
    }

    #[test]
    fn guild_level_subtracts_flat() {
        assert_eq!(hack_success_percent(3, 5), 34);
    }

    #[test]
    fn chance_is_monotone_and_floored() {
        for protect in 0..30 {
            for guild in 0..6 {
                let here = hack_success_percent(protect, guild);
                assert!(here >= 3);
                assert!(hack_success_percent(protect + 1, guild) <= here);
                assert!(hack_success_percent(protect, guild + 1) <= here);
            }
        }
        assert_eq!(hack_success_percent(100, 5), 3);
    }

    #[test]
    fn roll_is_deterministic_under_a_seed() {
        let mut a = StdRng::seed_from_u64(7);
        let mut b = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            assert_eq!(hack_roll(2, 1, &mut a), hack_roll(2, 1, &mut b));
        }
    }

    #[test]
    fn casino_pays_the_full_multiple_or_nothing() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            let payout = casino_payout(CasinoMode::VeryLow, 100, &mut rng);
            assert!(payout == 0 || payout == 200);
        }
    }

    #[test]
    fn casino_win_rate_tracks_the_tier() {
        let mut rng = StdRng::seed_from_u64(9);
        let wins = (0..20_000)
            .filter(|_| casino_payout(CasinoMode::VeryLow, 1, &mut rng) > 0)
            .count();
        // 40% tier; generous tolerance keeps this robust to the seed.
        assert!((6_000..10_000).contains(&wins), "wins={wins}");
    }
}
