use crate::consts;

/// Daily interest percent for a user: base rate plus purchased upgrades
/// plus the guild-level bonus. Recomputed at every read, never stored.
pub fn interest_percent(extra_percent: i64, guild_level: i64) -> i64 {
    consts::BANK_BASE_PERCENT + extra_percent + guild_level
}

/// Derived current value of an account: compound growth of the principal
/// at `percent_per_day`, fractional days included.
pub fn bank_value(principal: i64, percent_per_day: i64, elapsed_secs: i64) -> i64 {
    let days = elapsed_secs.max(0) as f64 / 86_400.0;
    (principal as f64 * (1.0 + percent_per_day as f64 / 100.0).powf(days)) as i64
}

/// Crystal cost of raising `extra_percent` by one from its current value.
pub fn bank_upgrade_price(extra_percent: i64) -> i64 {
    1.4f64.powi((extra_percent + 1) as i32) as i64
}

/// Crystal refund for lowering `extra_percent` by one: the price of the
/// tier being vacated, discounted. Deliberately less than the purchase
/// price so upgrades cannot be flip-flopped for free.
pub fn bank_downgrade_refund(extra_percent: i64) -> i64 {
    let refund = (bank_upgrade_price(extra_percent - 1) as f64 / 1.5) as i64;
    refund.max(1)
}

/// Crystal cost of raising `protect_level` by one.
pub fn protection_upgrade_price(protect_level: i64) -> i64 {
    (1.2f64.powi((protect_level + 1) as i32) * 3.0) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_elapsed_returns_principal_exactly() {
        assert_eq!(bank_value(500, 5, 0), 500);
        assert_eq!(bank_value(4_200_000_000, 8, 0), 4_200_000_000);
    }

    #[test]
    fn value_is_monotone_in_time() {
        let mut prev = 0;
        for hours in 0..100 {
            let v = bank_value(10_000, 5, hours * 3600);
            assert!(v >= prev, "value shrank at {hours}h: {v} < {prev}");
            prev = v;
        }
    }

    #[test]
    fn one_full_day_applies_the_rate() {
        // 10_000 at 5%/day after exactly one day.
        assert_eq!(bank_value(10_000, 5, 86_400), 10_500);
    }

    #[test]
    fn negative_elapsed_clamps() {
        assert_eq!(bank_value(500, 5, -3600), 500);
    }

    #[test]
    fn composed_percent() {
        assert_eq!(interest_percent(0, 0), 5);
        assert_eq!(interest_percent(2, 3), 10);
    }

    #[test]
    fn upgrade_curve_is_strictly_increasing() {
        // Truncation flattens the very first steps of 1.4^n; strict
        // growth holds from the third tier on.
        for extra in 2..20 {
            assert!(bank_upgrade_price(extra + 1) > bank_upgrade_price(extra));
        }
        assert_eq!(bank_upgrade_price(0), 1);
        assert_eq!(bank_upgrade_price(5), 7);
    }

    #[test]
    fn downgrade_never_refunds_more_than_the_climb_cost() {
        for extra in 1..20 {
            let climb_cost = bank_upgrade_price(extra - 1);
            assert!(bank_downgrade_refund(extra) <= climb_cost);
            assert!(bank_downgrade_refund(extra) >= 1);
        }
        assert_eq!(bank_downgrade_refund(5), 3);
    }

    #[test]
    fn protection_curve() {
        assert_eq!(protection_upgrade_price(0), 3);
        assert_eq!(protection_upgrade_price(1), 4);
        for level in 0..20 {
            assert!(protection_upgrade_price(level + 1) >= protection_upgrade_price(level));
        }
    }
}
