use serde::{Deserialize, Serialize};

use crate::models::{
    CasinoMode, Currency, Decision, Guild, HintEntry, MarketOffer, Trade, TransferPolicy, User,
};

// -- Users --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnsureUserRequest {
    pub id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SnapshotResponse {
    pub user: User,
    pub guild: Option<Guild>,
    /// Sum of the derived current values of all open accounts.
    pub bank_total: i64,
    pub interest_percent: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HugRequest {
    pub from_id: i64,
    pub to_id: i64,
}

#[derive(Debug, Serialize)]
pub struct RewardResponse {
    pub reward: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransferRequest {
    pub from_id: i64,
    /// Direct recipient id, or None when addressing by msg code.
    pub to_id: Option<i64>,
    pub msg_code: Option<String>,
    pub amount: i64,
    pub currency: Currency,
    pub comment: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TransferResponse {
    pub transfer_id: i64,
    pub fee: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserActionRequest {
    pub user_id: i64,
}

#[derive(Debug, Serialize)]
pub struct MsgCodeResponse {
    pub code: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetPolicyRequest {
    pub user_id: i64,
    pub policy: TransferPolicy,
}

// -- Bank --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BankOpenRequest {
    pub user_id: i64,
    pub amount: i64,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct BankOpenResponse {
    pub account_id: i64,
    pub fee: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BankPasswordRequest {
    pub user_id: i64,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct BankWithdrawResponse {
    pub matched: bool,
    /// Derived account value credited to the caller on a match.
    pub amount: Option<i64>,
    /// Coin fee charged on a miss.
    pub miss_fee: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct BankRelinkResponse {
    pub matched: bool,
    pub account_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BankChangePasswordRequest {
    pub user_id: i64,
    pub old_password: String,
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct BankChangePasswordResponse {
    pub matched: bool,
    pub miss_fee: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct UpgradeResponse {
    pub price: i64,
    /// New extraPercent or protectLevel depending on the endpoint.
    pub level: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HackRequest {
    pub user_id: i64,
    pub account_id: i64,
    pub guess: String,
}

#[derive(Debug, Serialize)]
pub struct HackResponse {
    /// Whether the defense roll was beaten and hints were produced.
    pub success: bool,
    /// Whether the guess was exactly the password.
    pub cracked: bool,
    pub hints: Option<Vec<HintEntry>>,
}

// -- Market --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlaceOfferRequest {
    pub user_id: i64,
    pub crystals: i64,
    pub price: i64,
}

#[derive(Debug, Serialize)]
pub struct PlaceOfferResponse {
    pub offer_id: i64,
    pub trades: Vec<Trade>,
}

#[derive(Debug, Serialize)]
pub struct CancelOffersResponse {
    pub refunded: i64,
}

#[derive(Debug, Serialize)]
pub struct MarketBookResponse {
    pub sells: Vec<MarketOffer>,
    pub buys: Vec<MarketOffer>,
}

// -- Guilds --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateGuildRequest {
    pub leader_id: i64,
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RenameGuildRequest {
    pub leader_id: i64,
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetTaxRequest {
    pub leader_id: i64,
    pub amount: i64,
}

#[derive(Debug, Serialize)]
pub struct GuildLevelResponse {
    pub level: i64,
}

// -- Reports / polls --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportRequest {
    pub from_id: i64,
    pub to_id: i64,
    pub comment: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReportResponse {
    /// Set when this report crossed the threshold and opened a poll.
    pub poll_id: Option<i64>,
    pub reports: i64,
    pub weight: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VoteRequest {
    pub user_id: i64,
    pub decision: Decision,
}

#[derive(Debug, Serialize)]
pub struct VoteResponse {
    pub resolved: bool,
    pub expired: bool,
    pub verdict: Option<Decision>,
    pub severity: Option<String>,
}

// -- Casino --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CasinoRequest {
    pub user_id: i64,
    pub mode: CasinoMode,
    pub bet: i64,
}

#[derive(Debug, Serialize)]
pub struct CasinoResponse {
    /// 0 on a loss; the stake is taken either way.
    pub payout: i64,
}

// -- Scheduled-job effects --

#[derive(Debug, Serialize)]
pub struct DailySweepResponse {
    pub checked: i64,
    pub collected: i64,
    pub banned: i64,
}

#[derive(Debug, Serialize)]
pub struct TaxSettlementResponse {
    pub guild_id: i64,
    pub collected: i64,
    pub fine: i64,
    pub paid: i64,
    pub unpaid: i64,
    pub poor: i64,
}

#[derive(Debug, Serialize)]
pub struct LuckyDropResponse {
    /// (user id, crystals received); empty when the day was skipped.
    pub winners: Vec<(i64, i64)>,
}

#[derive(Debug, Serialize)]
pub struct ForfeitResponse {
    pub to_id: Option<i64>,
    pub amount: i64,
}
