//! Data model for usage statistics and billing-window reports.

mod blocks;
mod usage;

pub use blocks::{BillingBlock, BlocksReport};
pub use usage::{
    ConversationEntry,
    CostBreakdown,
    MessagePayload,
    ParsedMessage,
    Period,
    ProjectStats,
    SessionInfo,
    SubscriptionQuota,
    TokenUsage,
    UsageMode,
    UsageStats,
    UNKNOWN_MODEL,
};
