//! Aggregation layer for usage statistics.

mod stats;

pub use stats::{accumulate, filter_by_model, finalize, merge};
