//! Billing-window (5-hour block) report types.

use chrono::{DateTime, Local};
use serde::Serialize;

use super::usage::TokenUsage;


/// One 5-hour billing window with activity.
#[derive(Debug, Clone, Serialize)]
pub struct BillingBlock {
    pub id: String,
    pub start_time: DateTime<Local>,
    pub end_time: DateTime<Local>,
    pub is_active: bool,
    /// Human-readable time left in the window; only set while active.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_remaining: Option<String>,
    pub models: Vec<String>,
    pub tokens: TokenUsage,
    pub cost_usd: f64,
    pub message_count: u64,
    /// Tokens per minute of observed activity; zero unless active.
    pub burn_rate_per_minute: f64,
    /// End-of-window projections from the burn rate; zero unless active with
    /// a positive burn rate.
    pub projected_total_tokens: u64,
    pub projected_cost: f64,
}


/// Full billing-window analysis for one aggregate.
#[derive(Debug, Clone, Serialize)]
pub struct BlocksReport {
    pub blocks: Vec<BillingBlock>,
    pub summary: TokenUsage,
    pub total_cost: f64,
}
