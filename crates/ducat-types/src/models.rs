use serde::{Deserialize, Serialize};

/// All timestamps in the domain model are unix seconds. The chat layer
/// deals in wall-clock time; everything below the API boundary is i64.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    Coins,
    Crystals,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Coins => "coins",
            Currency::Crystals => "crystals",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "coins" => Some(Currency::Coins),
            "crystals" => Some(Currency::Crystals),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OfferDirection {
    Sell,
    Buy,
}

impl OfferDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            OfferDirection::Sell => "sell",
            OfferDirection::Buy => "buy",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "sell" => Some(OfferDirection::Sell),
            "buy" => Some(OfferDirection::Buy),
            _ => None,
        }
    }
}

/// Who a user accepts coin transfers from. Stored as its integer tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferPolicy {
    Open,
    GroupOnly,
}

impl TransferPolicy {
    pub fn as_i64(&self) -> i64 {
        match self {
            TransferPolicy::Open => 1,
            TransferPolicy::GroupOnly => 2,
        }
    }

    pub fn from_i64(v: i64) -> Option<Self> {
        match v {
            1 => Some(TransferPolicy::Open),
            2 => Some(TransferPolicy::GroupOnly),
            _ => None,
        }
    }
}

/// Verdict options on a dispute poll. Closed set; severity is rolled
/// separately at resolution time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Fine,
    Mute,
    Ban,
    Mercy,
}

impl Decision {
    pub const ALL: [Decision; 4] = [
        Decision::Fine,
        Decision::Mute,
        Decision::Ban,
        Decision::Mercy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Fine => "fine",
            Decision::Mute => "mute",
            Decision::Ban => "ban",
            Decision::Mercy => "mercy",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "fine" => Some(Decision::Fine),
            "mute" => Some(Decision::Mute),
            "ban" => Some(Decision::Ban),
            "mercy" => Some(Decision::Mercy),
            _ => None,
        }
    }
}

/// Category tag on a payment audit row. Write-only: the engine records
/// these but never reads them back for decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentKind {
    Market,
    ReportPurge,
    GuildCreate,
    GuildJoin,
    GuildRename,
    GuildUpgrade,
    GuildMemberTax,
    GuildLeaderFine,
    BankUpgrade,
    Protection,
    Hack,
    MsgCode,
    BankWithdraw,
    BankRelink,
}

impl PaymentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentKind::Market => "market",
            PaymentKind::ReportPurge => "report_purge",
            PaymentKind::GuildCreate => "guild_create",
            PaymentKind::GuildJoin => "guild_join",
            PaymentKind::GuildRename => "guild_rename",
            PaymentKind::GuildUpgrade => "guild_upgrade",
            PaymentKind::GuildMemberTax => "guild_member_tax",
            PaymentKind::GuildLeaderFine => "guild_leader_fine",
            PaymentKind::BankUpgrade => "bank_upgrade",
            PaymentKind::Protection => "protection",
            PaymentKind::Hack => "hack",
            PaymentKind::MsgCode => "msg_code",
            PaymentKind::BankWithdraw => "bank_withdraw",
            PaymentKind::BankRelink => "bank_relink",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CasinoMode {
    VeryLow,
    Low,
    Middle,
    High,
    VeryHigh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub balance: i64,
    pub crystals: i64,
    pub guild_id: Option<i64>,
    pub policy: TransferPolicy,
    pub msg_code: Option<String>,
    pub extra_percent: i64,
    pub protect_level: i64,
    pub banned: bool,
    pub muted_until: i64,
    /// None = never shown the terms, Some(false) = shown but not
    /// accepted, Some(true) = accepted.
    pub agreed: Option<bool>,
    pub reward_at: i64,
    pub created_at: i64,
}

impl User {
    /// A mute only counts while it has more than a minute left to run.
    pub fn is_muted(&self, now: i64) -> bool {
        self.muted_until > now + 60
    }
}

/// Password-gated interest-bearing coin store. The live value is always
/// derived from the principal and opening time, never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankAccount {
    pub id: i64,
    pub user_id: i64,
    pub password: String,
    pub principal: i64,
    pub active: bool,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Guild {
    pub id: i64,
    /// None once the guild has been dissolved; dissolved guilds are
    /// permanently inert.
    pub leader_id: Option<i64>,
    pub name: String,
    pub level: i64,
    pub daily_tax: i64,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketOffer {
    pub id: i64,
    pub user_id: i64,
    pub direction: OfferDirection,
    /// Remaining unfilled quantity; 0 means filled or cancelled.
    pub crystals: i64,
    pub price: i64,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub id: i64,
    pub from_id: i64,
    pub to_id: i64,
    /// Reporter's balance at filing time.
    pub weight: i64,
    pub comment: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Poll {
    pub id: i64,
    pub to_id: i64,
    /// 1 = open, 2 = reserved (no transition creates it), 3 = finished.
    pub stage: i64,
    pub verdict: Option<Decision>,
    /// Serialized severity payload: fine amount or mute-until timestamp.
    pub severity: Option<String>,
    pub created_at: i64,
}

pub const POLL_STAGE_OPEN: i64 = 1;
pub const POLL_STAGE_FINISHED: i64 = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vote {
    pub id: i64,
    pub poll_id: i64,
    pub user_id: i64,
    pub stage: i64,
    pub decision: Decision,
    pub weight: i64,
    pub created_at: i64,
}

/// Per-character feedback on a bank password guess. Never reveals the
/// password itself, only how each guessed character relates to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PasswordHint {
    /// Guessed character is correct at this position.
    Match,
    /// Guess is longer than the password; no counterpart character.
    Extra,
    /// Digit guessed against a letter or vice versa.
    WrongKind,
    /// For digits: the true digit is smaller. For letters: the guess
    /// sits earlier in the alphabet than the true letter. The letter
    /// direction is inverted relative to digits; kept as shipped.
    Down,
    /// The opposite of [`PasswordHint::Down`] per kind.
    Up,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HintEntry {
    pub guessed: char,
    pub hint: PasswordHint,
}

/// One fill produced by a market clearing pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub buyer_id: i64,
    pub seller_id: i64,
    pub crystals: i64,
    /// Execution price — the seller's listed price.
    pub price: i64,
    /// Price improvement returned to the buyer from their escrow.
    pub refund: i64,
}
