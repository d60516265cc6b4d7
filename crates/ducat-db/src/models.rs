//! Aggregate rows produced by grouped queries. Entity rows map straight
//! into the ducat-types domain structs; only shapes without a domain
//! counterpart live here.

pub struct ReportStats {
    pub count: i64,
    pub weight_sum: i64,
}

pub struct VoteTally {
    pub decision: String,
    pub weight_sum: i64,
    pub count: i64,
}
