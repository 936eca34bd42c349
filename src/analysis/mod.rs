//! Higher-level analyses derived from the aggregate: billing windows and
//! subscription quota estimation.

mod blocks;
mod quota;

pub use blocks::{analyze_blocks, BLOCK_HOURS};
pub use quota::{estimate_quota, MAX20X_COST_THRESHOLD, MAX5X_COST_THRESHOLD};
