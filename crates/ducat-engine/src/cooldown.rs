use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Last-fired timestamps keyed by (user, action name). Nothing expires
/// on its own: callers decide whether enough time has passed. Lives in
/// memory only; a restart clears all cooldowns.
#[derive(Default)]
pub struct CooldownStore {
    inner: Mutex<HashMap<(i64, String), i64>>,
}

impl CooldownStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> MutexGuard<'_, HashMap<(i64, String), i64>> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn last(&self, user_id: i64, name: &str) -> Option<i64> {
        self.guard().get(&(user_id, name.to_string())).copied()
    }

    pub fn touch(&self, user_id: i64, name: &str, now: i64) {
        self.guard().insert((user_id, name.to_string()), now);
    }

    /// Seconds left before the action fires again; 0 when it is ready.
    pub fn remaining(&self, user_id: i64, name: &str, now: i64, cooldown_secs: i64) -> i64 {
        match self.last(user_id, name) {
            None => 0,
            Some(last) => (cooldown_secs - (now - last)).max(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_fired_is_ready() {
        let store = CooldownStore::new();
        assert_eq!(store.remaining(1, "hug", 1_000, 300), 0);
    }

    #[test]
    fn remaining_counts_down() {
        let store = CooldownStore::new();
        store.touch(1, "hug", 1_000);
        assert_eq!(store.remaining(1, "hug", 1_100, 300), 200);
        assert_eq!(store.remaining(1, "hug", 1_300, 300), 0);
        assert_eq!(store.remaining(1, "hug", 2_000, 300), 0);
    }

    #[test]
    fn keys_are_per_user_and_action() {
        let store = CooldownStore::new();
        store.touch(1, "hug", 1_000);
        assert_eq!(store.remaining(2, "hug", 1_000, 300), 0);
        assert_eq!(store.remaining(1, "hug:2", 1_000, 300), 0);
    }
}
