//! Tuning constants of the economy. Coin and crystal amounts are whole
//! integers; percentages may be fractional.

// Rewards.
pub const REWARD_CHAT: i64 = 9;
pub const REWARD_HUG_MIN: i64 = 75;
pub const REWARD_REPORT: i64 = 100;

// Fees (percent).
pub const FEE_BANK_OPEN_PERCENT: f64 = 20.0;
pub const FEE_BANK_MISS_PERCENT: f64 = 0.3;
pub const FEE_TRANSFER_PERCENT: f64 = 5.0;
pub const FEE_DAILY_PERCENT: f64 = 1.0;

// Fee floors.
pub const FEE_BANK_OPEN_MIN: i64 = 50;
pub const FEE_BANK_MISS_MIN: i64 = 1;
pub const FEE_TRANSFER_MIN: i64 = 1;
pub const DAILY_FEE_FLOOR: i64 = 110;

// Interest and odds.
pub const BANK_BASE_PERCENT: i64 = 5;
pub const HACK_BASE_PERCENT: i64 = 50;
pub const HACK_DECAY: f64 = 0.93;
pub const HACK_MIN_PERCENT: i64 = 3;

// Crystal prices.
pub const PRICE_WITHDRAW_CRYSTALS: i64 = 1;
pub const PRICE_RELINK_CRYSTALS: i64 = 3;
pub const PRICE_CHANGE_PASSWORD_CRYSTALS: i64 = 2;
pub const PRICE_HACK_CRYSTALS: i64 = 2;
pub const PRICE_REPORT_PURGE_CRYSTALS: i64 = 10;
pub const PRICE_GUILD_CREATE_CRYSTALS: i64 = 5;
pub const PRICE_GUILD_RENAME_CRYSTALS: i64 = 3;

// Coin prices.
pub const PRICE_MSG_CODE: i64 = 100;
pub const PRICE_GUILD_CREATE: i64 = 10_000;
pub const PRICE_GUILD_JOIN: i64 = 500;
pub const GUILD_TAX_MIN: i64 = 50;

/// Guild upgrade cost per target level: (coins, crystals).
pub const GUILD_UPGRADE_PRICES: [(i64, (i64, i64)); 4] = [
    (2, (30_000, 10)),
    (3, (50_000, 20)),
    (4, (100_000, 30)),
    (5, (150_000, 50)),
];

/// Member cap per guild level.
pub const GUILD_MEMBER_CAPS: [(i64, i64); 5] = [(1, 10), (2, 20), (3, 30), (4, 40), (5, 50)];
pub const GUILD_LEVEL_MAX: i64 = 5;

// Limits.
pub const MAX_BANK_ACCOUNTS: i64 = 10;
pub const MAX_OPEN_BUY_CRYSTALS: i64 = 10;
pub const MAX_AMOUNT: i64 = 4_200_000_000;
pub const MIN_BANK_AMOUNT: i64 = 10;
pub const MAX_TRANSFER: i64 = 9_000_000;
pub const MIN_CASINO_BET: i64 = 2;
pub const PASSWORD_MAX_LEN: usize = 6;
pub const GUILD_NAME_MIN_LEN: usize = 3;
pub const GUILD_NAME_MAX_LEN: usize = 20;
pub const COMMENT_MAX_LEN: usize = 128;

/// Members below this balance add to the leader's daily fine.
pub const POOR_MEMBER_BALANCE: i64 = 1_000;
pub const POOR_MEMBER_FINE_FACTOR: f64 = 1.1;

// Poll thresholds.
pub const MIN_REPORTS_COUNT: i64 = 5;
pub const MIN_REPORTS_PERCENT: f64 = 20.0;
pub const REPORT_BALANCE_MULTIPLIER: i64 = 30;
pub const MIN_VOTES_COUNT: i64 = 10;
pub const MIN_VOTES_PERCENT: f64 = 30.0;
pub const VOTES_BALANCE_MULTIPLIER: i64 = 40;

/// Share of a collected fine redistributed chat-wide, and the cut
/// retained before splitting.
pub const REDISTRIBUTION_USERS_PERCENT: f64 = 10.0;
pub const REDISTRIBUTION_FEE_PERCENT: f64 = 15.0;

// Cooldowns and windows (seconds).
pub const COOLDOWN_HUG: i64 = 3600 * 3;
pub const COOLDOWN_HUG_SAME: i64 = 3600 * 10;
pub const COOLDOWN_CHAT_REWARD: i64 = 120;
pub const COOLDOWN_REPORT: i64 = 45 * 60;
pub const COOLDOWN_TARGET_POLL: i64 = 3600 * 12;
pub const POLL_WINDOW: i64 = 3600 * 12;

// Lucky-crystal drop.
pub const LUCKY_SKIP_ONE_IN: u32 = 4;
pub const LUCKY_USERS_MAX: i64 = 5;
pub const LUCKY_CRYSTALS_MAX: i64 = 3;

pub fn guild_member_cap(level: i64) -> i64 {
    GUILD_MEMBER_CAPS
        .iter()
        .find(|(lvl, _)| *lvl == level)
        .map(|(_, cap)| *cap)
        .unwrap_or(GUILD_MEMBER_CAPS[0].1)
}

pub fn guild_upgrade_price(target_level: i64) -> Option<(i64, i64)> {
    GUILD_UPGRADE_PRICES
        .iter()
        .find(|(lvl, _)| *lvl == target_level)
        .map(|(_, price)| *price)
}
