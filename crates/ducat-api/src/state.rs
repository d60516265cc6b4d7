use std::sync::{Arc, Mutex, MutexGuard};

use rand::SeedableRng;
use rand::rngs::StdRng;

use ducat_engine::Engine;

pub struct AppStateInner {
    pub engine: Engine,
    rng: Mutex<StdRng>,
}

pub type AppState = Arc<AppStateInner>;

impl AppStateInner {
    pub fn new(engine: Engine) -> Self {
        Self {
            engine,
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Deterministic construction for tests.
    pub fn with_rng(engine: Engine, rng: StdRng) -> Self {
        Self {
            engine,
            rng: Mutex::new(rng),
        }
    }

    pub fn rng(&self) -> MutexGuard<'_, StdRng> {
        self.rng
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Wall-clock unix seconds; the single place the HTTP layer touches
/// real time before handing it to the engine.
pub fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}
