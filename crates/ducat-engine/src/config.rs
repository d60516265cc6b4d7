/// Deployment-level knobs, as opposed to the economy constants baked
/// into ducat-economy.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Reports filed against these identities carry zero weight, so
    /// they can never accumulate into a poll.
    pub protected_ids: Vec<i64>,
}
