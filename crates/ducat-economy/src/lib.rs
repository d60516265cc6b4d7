//! Pure numeric rules of the economy: fees, rewards, compound interest,
//! upgrade price curves, hack and casino odds, password feedback and the
//! poll verdict math. No state, no I/O; everything randomized takes an
//! injected [`rand::Rng`] so outcomes are reproducible under a seed.

pub mod consts;
pub mod fees;
pub mod interest;
pub mod odds;
pub mod password;
pub mod votes;
