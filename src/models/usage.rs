//! Core data types for Claude Code usage statistics.

use std::collections::HashMap;

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};


/// Token usage for a single entry or an accumulated bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    #[serde(default, rename = "cache_creation_input_tokens")]
    pub cache_creation_tokens: u64,
    #[serde(default, rename = "cache_read_input_tokens")]
    pub cache_read_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}


impl TokenUsage {
    /// Total tokens: the explicitly set total if present, otherwise
    /// input + output. Cache tokens are billed separately and are never
    /// folded into the total implicitly.
    pub fn total(&self) -> u64 {
        if self.total_tokens > 0 {
            self.total_tokens
        } else {
            self.input_tokens + self.output_tokens
        }
    }

    /// Accumulate another usage into this one.
    pub fn add(&mut self, other: &TokenUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        self.cache_creation_tokens += other.cache_creation_tokens;
        self.cache_read_tokens += other.cache_read_tokens;
        self.total_tokens = self.input_tokens + self.output_tokens;
    }

    /// True when all four base counters are zero.
    pub fn is_empty(&self) -> bool {
        self.input_tokens == 0
            && self.output_tokens == 0
            && self.cache_creation_tokens == 0
            && self.cache_read_tokens == 0
    }
}


/// The `message` field of a log record, which is either a bare string or a
/// structured object. Keeping the two shapes as distinct variants keeps the
/// heuristic-extraction path separate from the structured path.
#[derive(Debug, Clone)]
pub enum MessagePayload {
    Raw(String),
    Structured {
        role: Option<String>,
        content: Option<String>,
        model: Option<String>,
        usage: Option<TokenUsage>,
    },
}


/// Normalized view of a message payload after decoding.
#[derive(Debug, Clone, Default)]
pub struct ParsedMessage {
    pub role: Option<String>,
    pub content: Option<String>,
    pub model: Option<String>,
    pub usage: Option<TokenUsage>,
}


/// One decoded log record. Transient: constructed per line, consumed by the
/// aggregator, then dropped. `raw` retains the full decoded object so unknown
/// fields stay available to heuristics; typed fields always win over `raw`.
#[derive(Debug, Clone)]
pub struct ConversationEntry {
    pub entry_type: String,
    /// `None` when the timestamp was missing or unparsable. Such entries
    /// still count toward message/token totals but are excluded from day
    /// bucketing and period computation.
    pub timestamp: Option<DateTime<Utc>>,
    pub session_id: String,
    pub cwd: String,
    pub cost_usd: Option<f64>,
    pub message: Option<ParsedMessage>,
    pub extracted_usage: Option<TokenUsage>,
    pub raw: serde_json::Map<String, serde_json::Value>,
}


impl ConversationEntry {
    /// Date string in YYYY-MM-DD (local timezone) for day bucketing, or
    /// `None` when the entry has no usable timestamp.
    pub fn date_key(&self) -> Option<String> {
        self.timestamp
            .map(|ts| ts.with_timezone(&Local).format("%Y-%m-%d").to_string())
    }

    /// Model name attributed to this entry, if any.
    pub fn model(&self) -> Option<&str> {
        self.message.as_ref().and_then(|m| m.model.as_deref())
    }
}


/// Per-session record, widened as more entries with the same id are seen.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionInfo {
    pub id: String,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub message_count: u64,
    pub tokens: TokenUsage,
    pub model: Option<String>,
    pub project_path: String,
}


impl SessionInfo {
    /// Widen the session span to cover `ts`. `None` timestamps never narrow
    /// or extend the span.
    pub fn observe(&mut self, ts: Option<DateTime<Utc>>) {
        let Some(ts) = ts else { return };
        self.start_time = Some(match self.start_time {
            Some(start) => start.min(ts),
            None => ts,
        });
        self.end_time = Some(match self.end_time {
            Some(end) => end.max(ts),
            None => ts,
        });
    }

    /// Merge another record for the same session id: union of time spans,
    /// summed counts.
    pub fn absorb(&mut self, other: &SessionInfo) {
        self.observe(other.start_time);
        self.observe(other.end_time);
        self.message_count += other.message_count;
        self.tokens.add(&other.tokens);
        if self.model.is_none() {
            self.model = other.model.clone();
        }
        if self.project_path.is_empty() {
            self.project_path = other.project_path.clone();
        }
    }
}


/// Per-project record, keyed by the last path segment of the working
/// directory observed on entries.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProjectStats {
    pub name: String,
    pub path: String,
    pub tokens: TokenUsage,
    pub cost_usd: f64,
    pub last_activity: Option<DateTime<Utc>>,
}


/// Time span covered by the analyzed data.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct Period {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}


/// Cost breakdown derived from aggregated usage. Recomputed wholesale on
/// every calculation, never patched incrementally.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CostBreakdown {
    pub input_cost: f64,
    pub output_cost: f64,
    pub cache_creation_cost: f64,
    pub cache_read_cost: f64,
    pub total_cost: f64,
    pub currency: String,
    pub model_costs: HashMap<String, f64>,
    /// True when no metered billing actually occurred and the figures are a
    /// hypothetical pay-per-token equivalent.
    pub is_estimated: bool,
}


/// How the logs appear to have been billed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageMode {
    #[default]
    Subscription,
    Api,
}


/// Best-effort estimate of subscription plan and current-window usage.
/// Display only; never feeds back into computed totals.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionQuota {
    pub plan: String,
    pub messages_per_window: u64,
    pub estimated_used: u64,
    pub estimated_remaining: u64,
    pub usage_percentage: f64,
    pub model_switch_point: u64,
    pub current_model: String,
    pub next_reset: Option<DateTime<Utc>>,
}


/// The aggregate built from one or more directories of log files.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UsageStats {
    pub total_sessions: u64,
    pub total_messages: u64,
    pub parsed_messages: u64,
    pub extracted_tokens: u64,
    pub total_tokens: TokenUsage,
    pub model_stats: HashMap<String, TokenUsage>,
    pub daily_stats: HashMap<String, TokenUsage>,
    pub session_stats: HashMap<String, SessionInfo>,
    pub project_stats: HashMap<String, ProjectStats>,
    pub message_types: HashMap<String, u64>,
    pub estimated_cost: CostBreakdown,
    pub analysis_period: Period,
    pub detected_mode: UsageMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_quota: Option<SubscriptionQuota>,
}


/// Sentinel bucket for entries that carry usage but no resolvable model.
pub const UNKNOWN_MODEL: &str = "unknown";


#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_total_without_explicit_total() {
        let usage = TokenUsage {
            input_tokens: 100,
            output_tokens: 50,
            cache_creation_tokens: 200,
            cache_read_tokens: 300,
            total_tokens: 0,
        };
        // Cache tokens are not part of the implicit total.
        assert_eq!(usage.total(), 150);
    }

    #[test]
    fn test_total_with_explicit_total() {
        let usage = TokenUsage {
            input_tokens: 100,
            output_tokens: 50,
            total_tokens: 175,
            ..Default::default()
        };
        assert_eq!(usage.total(), 175);
    }

    #[test]
    fn test_add_updates_total() {
        let mut usage = TokenUsage {
            input_tokens: 10,
            output_tokens: 20,
            ..Default::default()
        };
        usage.add(&TokenUsage {
            input_tokens: 5,
            output_tokens: 5,
            cache_read_tokens: 7,
            ..Default::default()
        });
        assert_eq!(usage.input_tokens, 15);
        assert_eq!(usage.output_tokens, 25);
        assert_eq!(usage.cache_read_tokens, 7);
        assert_eq!(usage.total(), 40);
    }

    #[test]
    fn test_is_empty_ignores_total_field() {
        let usage = TokenUsage {
            total_tokens: 99,
            ..Default::default()
        };
        assert!(usage.is_empty());
        assert!(!TokenUsage { input_tokens: 1, ..Default::default() }.is_empty());
    }

    #[test]
    fn test_session_observe_widens_span() {
        let t1 = Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2024, 1, 15, 11, 30, 0).unwrap();
        let t3 = Utc.with_ymd_and_hms(2024, 1, 15, 9, 45, 0).unwrap();

        let mut session = SessionInfo::default();
        session.observe(Some(t1));
        session.observe(Some(t2));
        session.observe(Some(t3));
        session.observe(None);

        assert_eq!(session.start_time, Some(t3));
        assert_eq!(session.end_time, Some(t2));
    }

    #[test]
    fn test_session_absorb_unions_spans() {
        let t = |h, m| Utc.with_ymd_and_hms(2024, 3, 1, h, m, 0).unwrap();

        let mut a = SessionInfo {
            id: "abc".into(),
            start_time: Some(t(10, 0)),
            end_time: Some(t(10, 30)),
            message_count: 3,
            ..Default::default()
        };
        let b = SessionInfo {
            id: "abc".into(),
            start_time: Some(t(10, 20)),
            end_time: Some(t(11, 0)),
            message_count: 2,
            ..Default::default()
        };

        a.absorb(&b);
        assert_eq!(a.start_time, Some(t(10, 0)));
        assert_eq!(a.end_time, Some(t(11, 0)));
        assert_eq!(a.message_count, 5);
    }
}
