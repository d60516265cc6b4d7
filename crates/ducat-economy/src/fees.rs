use crate::consts;

/// Percentage fee with a floor. The float intermediate and truncation
/// toward zero match how the rates were originally tuned.
pub fn fee(amount: i64, percent: f64, min_fee: i64) -> i64 {
    let fee = (amount as f64 / 100.0 * percent) as i64;
    if fee < min_fee { min_fee } else { fee }
}

/// Same formula used for quorums: "percent of a population, at least N".
pub fn part_of(total: i64, percent: f64, min_count: i64) -> i64 {
    fee(total, percent, min_count)
}

/// Daily residence fee. The untruncated percentage is compared against
/// the flat floor: guild members below the floor pay nothing, everyone
/// else below it pays the flat floor.
pub fn daily_residence_fee(balance: i64, in_guild: bool) -> i64 {
    let fee = balance as f64 * consts::FEE_DAILY_PERCENT / 100.0;
    if fee < consts::DAILY_FEE_FLOOR as f64 {
        if in_guild { 0 } else { consts::DAILY_FEE_FLOOR }
    } else {
        fee as i64
    }
}

/// Hug reward, paid to the recipient and scaled by the sender's wealth.
pub fn hug_reward(from_balance: i64) -> i64 {
    let reward = from_balance / 200;
    reward.max(consts::REWARD_HUG_MIN)
}

/// Chat-activity reward, scaled by guild level.
pub fn chat_reward(guild_level: Option<i64>) -> i64 {
    match guild_level {
        Some(level) if level > 0 => consts::REWARD_CHAT * (1 + level),
        _ => consts::REWARD_CHAT,
    }
}

pub fn transfer_fee(amount: i64) -> i64 {
    fee(amount, consts::FEE_TRANSFER_PERCENT, consts::FEE_TRANSFER_MIN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fee_respects_floor() {
        // 1% of 50 truncates to 0, floored to the minimum.
        assert_eq!(fee(50, 1.0, 1), 1);
        assert_eq!(fee(0, 20.0, 50), 50);
        // Above the floor the percentage wins.
        assert_eq!(fee(10_000, 20.0, 50), 2_000);
    }

    #[test]
    fn fee_truncates_toward_zero() {
        // 999 * 0.3% = 2.997 -> 2
        assert_eq!(fee(999, 0.3, 1), 2);
        assert_eq!(fee(333, 0.3, 1), 1);
    }

    #[test]
    fn quorum_floors() {
        // 20 users at 20% = 4, floored to 5.
        assert_eq!(part_of(20, 20.0, 5), 5);
        // 100 users at 20% = 20, floor does not apply.
        assert_eq!(part_of(100, 20.0, 5), 20);
    }

    #[test]
    fn daily_fee_floor_and_exemption() {
        // 1% of 5000 = 50, below the 110 floor.
        assert_eq!(daily_residence_fee(5_000, false), 110);
        assert_eq!(daily_residence_fee(5_000, true), 0);
        // 1% of 50_000 = 500, floor irrelevant either way.
        assert_eq!(daily_residence_fee(50_000, false), 500);
        assert_eq!(daily_residence_fee(50_000, true), 500);
        // The comparison happens before truncation: 110.5 is not below 110.
        assert_eq!(daily_residence_fee(11_050, true), 110);
    }

    #[test]
    fn hug_reward_scales_with_sender() {
        assert_eq!(hug_reward(0), 75);
        assert_eq!(hug_reward(14_999), 75);
        assert_eq!(hug_reward(30_000), 150);
    }

    #[test]
    fn chat_reward_scales_with_guild() {
        assert_eq!(chat_reward(None), 9);
        assert_eq!(chat_reward(Some(0)), 9);
        assert_eq!(chat_reward(Some(3)), 36);
    }
}
