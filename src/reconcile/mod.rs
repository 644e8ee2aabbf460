pub mod dedup;
pub mod receipts;
pub mod settle;

pub use dedup::{DedupPartition, partition_seen};
pub use receipts::{MatcherConfig, match_receipts};
pub use settle::{SETTLEMENT_EPSILON, compute_balances, settle};
