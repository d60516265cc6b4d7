//! HTTP facade over the economy engine. Handlers translate JSON
//! requests into engine calls and engine errors into status codes;
//! callers are trusted to identify users honestly, so there is no
//! authentication layer here.

pub mod bank;
pub mod error;
pub mod guild;
pub mod jobs;
pub mod market;
pub mod poll;
pub mod state;
pub mod users;
