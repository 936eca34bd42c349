//! Accumulation and merging of usage statistics.
//!
//! `accumulate` folds one decoded entry into an aggregate; `merge` combines
//! two aggregates pairwise-additively. Merge is associative and commutative,
//! so per-file and per-directory aggregates can be folded in any order.

use std::path::Path;

use crate::config::CostMode;
use crate::models::{
    ConversationEntry, Period, ProjectStats, SessionInfo, UsageMode, UsageStats, UNKNOWN_MODEL,
};
use crate::pricing;


/// Fold one entry into the aggregate.
pub fn accumulate(stats: &mut UsageStats, entry: &ConversationEntry) {
    stats.total_messages += 1;

    if !entry.entry_type.is_empty() {
        *stats
            .message_types
            .entry(entry.entry_type.clone())
            .or_insert(0) += 1;
    }

    if entry.message.is_some() {
        stats.parsed_messages += 1;
    }

    // Any record carrying a metered cost marks the whole aggregate as
    // API-billed.
    if entry.cost_usd.is_some() {
        stats.detected_mode = UsageMode::Api;
    }

    if let Some(usage) = entry.extracted_usage.filter(|u| !u.is_empty()) {
        stats.extracted_tokens += 1;
        stats.total_tokens.add(&usage);

        let model = entry.model().unwrap_or(UNKNOWN_MODEL);
        stats
            .model_stats
            .entry(model.to_string())
            .or_default()
            .add(&usage);

        if let Some(date) = entry.date_key() {
            stats.daily_stats.entry(date).or_default().add(&usage);
        }
    }

    if !entry.session_id.is_empty() {
        let session = stats
            .session_stats
            .entry(entry.session_id.clone())
            .or_insert_with(|| SessionInfo {
                id: entry.session_id.clone(),
                project_path: entry.cwd.clone(),
                ..Default::default()
            });

        session.observe(entry.timestamp);
        session.message_count += 1;
        if let Some(usage) = &entry.extracted_usage {
            session.tokens.add(usage);
        }
        if session.model.is_none() {
            session.model = entry.model().map(String::from);
        }
        stats.total_sessions = stats.session_stats.len() as u64;
    }

    if !entry.cwd.is_empty() {
        let key = project_key(&entry.cwd);
        let project = stats
            .project_stats
            .entry(key.clone())
            .or_insert_with(|| ProjectStats {
                name: key,
                path: entry.cwd.clone(),
                ..Default::default()
            });

        if entry.timestamp > project.last_activity {
            project.last_activity = entry.timestamp;
        }
        if let Some(usage) = &entry.extracted_usage {
            project.tokens.add(usage);
        }
        if let Some(cost) = entry.cost_usd {
            project.cost_usd += cost;
        }
    }
}


/// Pairwise-additive union of two aggregates. Colliding session and project
/// keys are combined (union of spans, summed counts), never overwritten.
pub fn merge(target: &mut UsageStats, source: UsageStats) {
    target.total_messages += source.total_messages;
    target.parsed_messages += source.parsed_messages;
    target.extracted_tokens += source.extracted_tokens;
    target.total_tokens.add(&source.total_tokens);

    for (model, usage) in source.model_stats {
        target.model_stats.entry(model).or_default().add(&usage);
    }

    for (date, usage) in source.daily_stats {
        target.daily_stats.entry(date).or_default().add(&usage);
    }

    for (id, session) in source.session_stats {
        match target.session_stats.get_mut(&id) {
            Some(existing) => existing.absorb(&session),
            None => {
                target.session_stats.insert(id, session);
            }
        }
    }
    target.total_sessions = target.session_stats.len() as u64;

    for (key, project) in source.project_stats {
        match target.project_stats.get_mut(&key) {
            Some(existing) => {
                existing.tokens.add(&project.tokens);
                existing.cost_usd += project.cost_usd;
                if project.last_activity > existing.last_activity {
                    existing.last_activity = project.last_activity;
                }
            }
            None => {
                target.project_stats.insert(key, project);
            }
        }
    }

    for (kind, count) in source.message_types {
        *target.message_types.entry(kind).or_insert(0) += count;
    }

    if source.detected_mode == UsageMode::Api {
        target.detected_mode = UsageMode::Api;
    }
}


/// Final pass after all sources are merged: compute the analysis period over
/// all sessions, then the cost breakdown, then (subscription mode only) the
/// quota estimate.
pub fn finalize(stats: &mut UsageStats, cost_mode: CostMode) {
    stats.analysis_period = compute_period(stats);

    let is_estimated = match cost_mode {
        CostMode::Auto => stats.detected_mode == UsageMode::Subscription,
        CostMode::Calculate => false,
        CostMode::Display => true,
    };
    stats.estimated_cost =
        pricing::calculate(&stats.total_tokens, &stats.model_stats, is_estimated);

    stats.subscription_quota = crate::analysis::estimate_quota(stats);
}


/// Keep only model buckets and sessions whose model name contains `needle`
/// (case-insensitive); totals are recomputed from the survivors and all
/// other groupings are zeroed.
pub fn filter_by_model(stats: &UsageStats, needle: &str) -> UsageStats {
    let needle = needle.to_lowercase();
    let mut filtered = UsageStats {
        detected_mode: stats.detected_mode,
        ..Default::default()
    };

    for (model, usage) in &stats.model_stats {
        if model.to_lowercase().contains(&needle) {
            filtered.model_stats.insert(model.clone(), *usage);
            filtered.total_tokens.add(usage);
        }
    }

    for (id, session) in &stats.session_stats {
        let matches = session
            .model
            .as_deref()
            .is_some_and(|m| m.to_lowercase().contains(&needle));
        if matches {
            filtered.session_stats.insert(id.clone(), session.clone());
            filtered.total_messages += session.message_count;
        }
    }
    filtered.total_sessions = filtered.session_stats.len() as u64;

    filtered
}


fn compute_period(stats: &UsageStats) -> Period {
    let mut period = Period::default();
    for session in stats.session_stats.values() {
        if let Some(start) = session.start_time {
            period.start_time = Some(match period.start_time {
                Some(existing) => existing.min(start),
                None => start,
            });
        }
        if let Some(end) = session.end_time {
            period.end_time = Some(match period.end_time {
                Some(existing) => existing.max(end),
                None => end,
            });
        }
    }
    period
}


/// Last path segment of a working directory, used as the project key.
fn project_key(cwd: &str) -> String {
    Path::new(cwd)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| cwd.to_string())
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TokenUsage;
    use chrono::{TimeZone, Utc};

    fn entry(
        kind: &str,
        session: &str,
        model: Option<&str>,
        ts: Option<&str>,
        usage: Option<(u64, u64)>,
    ) -> ConversationEntry {
        ConversationEntry {
            entry_type: kind.to_string(),
            timestamp: ts.and_then(crate::data::parse_timestamp),
            session_id: session.to_string(),
            cwd: "/home/dev/my-project".to_string(),
            cost_usd: None,
            message: Some(crate::models::ParsedMessage {
                role: Some(kind.to_string()),
                content: None,
                model: model.map(String::from),
                usage: None,
            }),
            extracted_usage: usage.map(|(input, output)| TokenUsage {
                input_tokens: input,
                output_tokens: output,
                total_tokens: input + output,
                ..Default::default()
            }),
            raw: serde_json::Map::new(),
        }
    }

    fn sample_stats(session: &str, day: u32) -> UsageStats {
        let mut stats = UsageStats::default();
        let ts = format!("2024-06-{day:02}T10:00:00Z");
        accumulate(
            &mut stats,
            &entry("user", session, Some("m1"), Some(&ts), Some((100, 0))),
        );
        accumulate(
            &mut stats,
            &entry("assistant", session, Some("m1"), Some(&ts), Some((0, 50))),
        );
        stats
    }

    fn assert_same(a: &UsageStats, b: &UsageStats) {
        assert_eq!(a.total_messages, b.total_messages);
        assert_eq!(a.total_sessions, b.total_sessions);
        assert_eq!(a.total_tokens, b.total_tokens);
        assert_eq!(a.model_stats, b.model_stats);
        assert_eq!(a.daily_stats, b.daily_stats);
        assert_eq!(a.message_types, b.message_types);
        assert_eq!(
            a.session_stats.keys().collect::<std::collections::BTreeSet<_>>(),
            b.session_stats.keys().collect::<std::collections::BTreeSet<_>>()
        );
        for (id, session) in &a.session_stats {
            let other = &b.session_stats[id];
            assert_eq!(session.start_time, other.start_time);
            assert_eq!(session.end_time, other.end_time);
            assert_eq!(session.message_count, other.message_count);
            assert_eq!(session.tokens, other.tokens);
        }
    }

    #[test]
    fn test_two_entry_session_scenario() {
        let stats = sample_stats("s1", 1);

        assert_eq!(stats.total_messages, 2);
        assert_eq!(stats.total_sessions, 1);
        assert_eq!(stats.total_tokens.input_tokens, 100);
        assert_eq!(stats.total_tokens.output_tokens, 50);
        assert_eq!(stats.model_stats["m1"].input_tokens, 100);
        assert_eq!(stats.model_stats["m1"].output_tokens, 50);
        assert_eq!(stats.session_stats["s1"].message_count, 2);
        assert_eq!(stats.message_types["user"], 1);
        assert_eq!(stats.message_types["assistant"], 1);
    }

    #[test]
    fn test_entry_without_model_goes_to_unknown_bucket() {
        let mut stats = UsageStats::default();
        accumulate(
            &mut stats,
            &entry("user", "s1", None, Some("2024-06-01T10:00:00Z"), Some((10, 0))),
        );
        assert_eq!(stats.model_stats[UNKNOWN_MODEL].input_tokens, 10);
    }

    #[test]
    fn test_unparsable_timestamp_counts_but_skips_day_bucket() {
        let mut stats = UsageStats::default();
        accumulate(&mut stats, &entry("user", "s1", Some("m1"), None, Some((10, 0))));

        assert_eq!(stats.total_messages, 1);
        assert_eq!(stats.total_tokens.input_tokens, 10);
        assert!(stats.daily_stats.is_empty());
        assert!(stats.session_stats["s1"].start_time.is_none());
    }

    #[test]
    fn test_merge_identity() {
        let mut merged = sample_stats("s1", 1);
        let reference = merged.clone();
        merge(&mut merged, UsageStats::default());
        assert_same(&merged, &reference);
    }

    #[test]
    fn test_merge_associative_and_commutative() {
        let a = || sample_stats("s1", 1);
        let b = || sample_stats("s2", 2);
        let c = || sample_stats("s1", 3);

        // (A + B) + C
        let mut left = a();
        merge(&mut left, b());
        merge(&mut left, c());

        // A + (B + C)
        let mut inner = b();
        merge(&mut inner, c());
        let mut right = a();
        merge(&mut right, inner);

        // (B + A) + C
        let mut swapped = b();
        merge(&mut swapped, a());
        merge(&mut swapped, c());

        assert_same(&left, &right);
        assert_same(&left, &swapped);
        assert_eq!(left.total_sessions, 2);
    }

    #[test]
    fn test_merge_unions_colliding_session_spans() {
        let t = |h, m| Utc.with_ymd_and_hms(2024, 6, 1, h, m, 0).unwrap();

        let mut a = UsageStats::default();
        accumulate(
            &mut a,
            &entry("user", "abc", None, Some("2024-06-01T10:00:00Z"), Some((5, 0))),
        );
        accumulate(
            &mut a,
            &entry("user", "abc", None, Some("2024-06-01T10:30:00Z"), None),
        );

        let mut b = UsageStats::default();
        accumulate(
            &mut b,
            &entry("user", "abc", None, Some("2024-06-01T10:20:00Z"), Some((5, 0))),
        );
        accumulate(
            &mut b,
            &entry("user", "abc", None, Some("2024-06-01T11:00:00Z"), None),
        );

        merge(&mut a, b);
        let session = &a.session_stats["abc"];
        assert_eq!(session.start_time, Some(t(10, 0)));
        assert_eq!(session.end_time, Some(t(11, 0)));
        assert_eq!(session.message_count, 4);
        assert_eq!(session.tokens.input_tokens, 10);
        assert_eq!(a.total_sessions, 1);
    }

    #[test]
    fn test_filter_by_model() {
        let mut stats = sample_stats("s1", 1);
        merge(&mut stats, {
            let mut other = UsageStats::default();
            accumulate(
                &mut other,
                &entry(
                    "assistant",
                    "s2",
                    Some("claude-3-5-haiku-20241022"),
                    Some("2024-06-02T10:00:00Z"),
                    Some((7, 3)),
                ),
            );
            other
        });

        let filtered = filter_by_model(&stats, "haiku");
        assert_eq!(filtered.model_stats.len(), 1);
        assert_eq!(filtered.total_tokens.input_tokens, 7);
        assert_eq!(filtered.total_sessions, 1);
        assert!(filtered.session_stats.contains_key("s2"));
        assert!(filtered.daily_stats.is_empty());
    }

    #[test]
    fn test_finalize_computes_period_and_cost() {
        let mut stats = sample_stats("s1", 1);
        finalize(&mut stats, CostMode::Auto);

        let period = stats.analysis_period;
        assert!(period.start_time.is_some());
        assert!(period.end_time.is_some());
        assert!(period.start_time <= period.end_time);
        assert!(stats.estimated_cost.total_cost > 0.0);
        // Default mode is subscription, so costs are hypothetical.
        assert!(stats.estimated_cost.is_estimated);
        assert!(stats.subscription_quota.is_some());
    }

    #[test]
    fn test_project_key_uses_last_segment() {
        assert_eq!(project_key("/home/dev/my-project"), "my-project");
        assert_eq!(project_key("solo"), "solo");
    }
}
