//! Heuristic subscription-plan and quota estimation.
//!
//! The log files never state which plan the account is on, so the plan is
//! inferred from the hypothetical pay-per-token cost of the analyzed usage.
//! The estimate is display-only and never feeds back into computed totals.

use chrono::{DateTime, Duration, Utc};

use crate::models::{SubscriptionQuota, UsageMode, UsageStats};


/// Hypothetical cost above which the usage looks like a Max 20x plan.
pub const MAX20X_COST_THRESHOLD: f64 = 150.0;
/// Hypothetical cost above which the usage looks like a Max 5x plan.
pub const MAX5X_COST_THRESHOLD: f64 = 50.0;

const PRO_MESSAGES_PER_WINDOW: u64 = 45;
const MAX5X_MESSAGES_PER_WINDOW: u64 = 225;
const MAX20X_MESSAGES_PER_WINDOW: u64 = 900;

/// Rolling quota window, matching the billing-block length.
const WINDOW_HOURS: i64 = 5;


/// Estimate the subscription plan and current-window usage. Returns `None`
/// when the logs carry metered costs, since quota windows only apply to
/// subscription billing.
pub fn estimate_quota(stats: &UsageStats) -> Option<SubscriptionQuota> {
    if stats.detected_mode != UsageMode::Subscription {
        return None;
    }

    let (plan, messages_per_window) = if stats.estimated_cost.total_cost > MAX20X_COST_THRESHOLD {
        ("Max 20x", MAX20X_MESSAGES_PER_WINDOW)
    } else if stats.estimated_cost.total_cost > MAX5X_COST_THRESHOLD {
        ("Max 5x", MAX5X_MESSAGES_PER_WINDOW)
    } else {
        ("Pro", PRO_MESSAGES_PER_WINDOW)
    };
    // Past the switch point the plan falls back from Opus to Sonnet.
    let model_switch_point = messages_per_window / 5;

    let estimated_used = average_messages_per_window(stats).min(messages_per_window);
    let usage_percentage = if messages_per_window > 0 {
        (estimated_used as f64 / messages_per_window as f64 * 100.0).min(100.0)
    } else {
        0.0
    };
    let current_model = if estimated_used <= model_switch_point {
        "Claude 4 Opus"
    } else {
        "Claude 4 Sonnet"
    };

    Some(SubscriptionQuota {
        plan: plan.to_string(),
        messages_per_window,
        estimated_used,
        estimated_remaining: messages_per_window - estimated_used,
        usage_percentage,
        model_switch_point,
        current_model: current_model.to_string(),
        next_reset: next_reset(stats),
    })
}


/// Messages per rolling window, averaged over the analysis period. Periods
/// shorter than one window count every message against the current window.
fn average_messages_per_window(stats: &UsageStats) -> u64 {
    let period = &stats.analysis_period;
    let (Some(start), Some(end)) = (period.start_time, period.end_time) else {
        return stats.total_messages;
    };

    let hours = (end - start).num_seconds() as f64 / 3600.0;
    if hours <= WINDOW_HOURS as f64 {
        return stats.total_messages;
    }
    (stats.total_messages as f64 * WINDOW_HOURS as f64 / hours).round() as u64
}


/// If the last observed activity is inside the current rolling window, the
/// window resets one window-length after it; otherwise a fresh window would
/// start now.
fn next_reset(stats: &UsageStats) -> Option<DateTime<Utc>> {
    let last = stats.analysis_period.end_time?;
    let now = Utc::now();
    let window = Duration::hours(WINDOW_HOURS);
    if now - last < window {
        Some(last + window)
    } else {
        Some(now + window)
    }
}
