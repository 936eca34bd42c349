//! Billing-window analysis: partitions session activity into fixed 5-hour
//! blocks aligned to local clock boundaries (00/05/10/15/20), with burn-rate
//! projection for the block containing "now".
//!
//! This is a pure function of the aggregate and the supplied wall-clock
//! time; live mode simply re-runs it on every refresh.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Local, LocalResult, TimeZone, Timelike, Utc};

use crate::models::{BillingBlock, BlocksReport, SessionInfo, UsageStats};


pub const BLOCK_HOURS: i64 = 5;


/// Analyze all 5-hour billing windows covered by the aggregate's sessions.
/// Windows with no overlapping session are dropped, except the window
/// containing `now`, which is always retained so a live monitor has a
/// current block to display.
pub fn analyze_blocks(stats: &UsageStats, now: DateTime<Utc>) -> BlocksReport {
    let mut report = BlocksReport {
        blocks: Vec::new(),
        summary: stats.total_tokens,
        total_cost: stats.estimated_cost.total_cost,
    };

    let mut earliest: Option<DateTime<Utc>> = None;
    let mut latest: Option<DateTime<Utc>> = None;
    for session in stats.session_stats.values() {
        for point in [session.start_time, session.end_time].into_iter().flatten() {
            earliest = Some(earliest.map_or(point, |e| e.min(point)));
            latest = Some(latest.map_or(point, |l| l.max(point)));
        }
    }
    let (Some(earliest), Some(latest)) = (earliest, latest) else {
        return report;
    };

    let block_len = Duration::hours(BLOCK_HOURS);
    let mut block_start = align_to_block_boundary(earliest);
    // Step past both the observed data and "now" so the active window is
    // generated even when it holds no activity yet.
    let limit = latest.max(now);

    while block_start.with_timezone(&Utc) <= limit {
        let block_end = block_start + block_len;
        let block = analyze_block(block_start, block_end, stats, now);
        if block.message_count > 0 || block.is_active {
            report.blocks.push(block);
        }
        block_start = block_end;
    }

    report
}


/// Floor a timestamp to the previous 5-hour boundary of its local calendar
/// day (hours 0, 5, 10, 15, 20).
fn align_to_block_boundary(ts: DateTime<Utc>) -> DateTime<Local> {
    let local = ts.with_timezone(&Local);
    let aligned_hour = (local.hour() / BLOCK_HOURS as u32) * BLOCK_HOURS as u32;
    let naive = local
        .date_naive()
        .and_hms_opt(aligned_hour, 0, 0)
        .expect("aligned hour is always valid");

    match Local.from_local_datetime(&naive) {
        LocalResult::Single(t) => t,
        LocalResult::Ambiguous(t, _) => t,
        // The boundary fell in a DST gap; start the window at the raw time.
        LocalResult::None => local,
    }
}


fn analyze_block(
    block_start: DateTime<Local>,
    block_end: DateTime<Local>,
    stats: &UsageStats,
    now: DateTime<Utc>,
) -> BillingBlock {
    let start_utc = block_start.with_timezone(&Utc);
    let end_utc = block_end.with_timezone(&Utc);
    let is_active = start_utc <= now && now < end_utc;

    let mut block = BillingBlock {
        id: block_start.to_rfc3339(),
        start_time: block_start,
        end_time: block_end,
        is_active,
        time_remaining: None,
        models: Vec::new(),
        tokens: Default::default(),
        cost_usd: 0.0,
        message_count: 0,
        burn_rate_per_minute: 0.0,
        projected_total_tokens: 0,
        projected_cost: 0.0,
    };

    if is_active {
        block.time_remaining = Some(format_remaining(end_utc - now));
    }

    let mut models = BTreeSet::new();
    let mut activity = Duration::zero();

    for session in stats.session_stats.values() {
        if !session_overlaps(session, start_utc, end_utc) {
            continue;
        }

        // Full counts are attributed to every overlapped block; only the
        // activity duration is clipped to the window.
        block.message_count += session.message_count;
        block.tokens.add(&session.tokens);
        if let Some(model) = &session.model {
            models.insert(model.clone());
        }

        let session_start = session.start_time.unwrap_or(start_utc).max(start_utc);
        let mut session_end = session
            .end_time
            .or(session.start_time)
            .unwrap_or(start_utc)
            .min(end_utc);
        if session_end <= session_start {
            // A point-like overlap still represents at least a minute of use.
            session_end = session_start + Duration::minutes(1);
        }
        activity += session_end - session_start;
    }

    block.models = models.into_iter().collect();

    let grand_total = stats.total_tokens.total();
    if grand_total > 0 {
        let ratio = block.tokens.total() as f64 / grand_total as f64;
        block.cost_usd = stats.estimated_cost.total_cost * ratio;
    }

    let activity_minutes = activity.num_seconds() as f64 / 60.0;
    if is_active && activity_minutes > 0.0 {
        let rate = block.tokens.total() as f64 / activity_minutes;
        block.burn_rate_per_minute = rate;

        let remaining_minutes = (end_utc - now).num_seconds() as f64 / 60.0;
        if rate > 0.0 && remaining_minutes > 0.0 {
            let projected = block.tokens.total() as f64 + rate * remaining_minutes;
            block.projected_total_tokens = projected as u64;
            if grand_total > 0 {
                block.projected_cost =
                    stats.estimated_cost.total_cost * projected / grand_total as f64;
            }
        }
    }

    block
}


/// A session contributes to a block when its span overlaps [start, end).
/// A session without an end time is treated as a point at its start.
fn session_overlaps(session: &SessionInfo, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
    let Some(session_start) = session.start_time else {
        return false;
    };
    let session_end = session.end_time.unwrap_or(session_start);
    session_start < end && session_end >= start
}


fn format_remaining(remaining: Duration) -> String {
    let minutes = remaining.num_minutes().max(0);
    if minutes >= 60 {
        format!("{}h {}m", minutes / 60, minutes % 60)
    } else {
        format!("{minutes}m")
    }
}
