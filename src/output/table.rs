//! Plain-text table rendering with ANSI color.

use std::fmt::Write;

use chrono::{DateTime, Local, Utc};

use crate::models::{BlocksReport, TokenUsage, UsageMode, UsageStats};

use super::{format_currency, format_number, Palette};


/// Render the full usage report.
pub fn render_stats_table(stats: &UsageStats, details: bool, palette: &Palette) -> String {
    let mut out = String::new();
    let _ = write_stats(&mut out, stats, details, palette);
    out
}


/// Render the per-day table.
pub fn render_daily_table(stats: &UsageStats, ascending: bool, palette: &Palette) -> String {
    let mut out = String::new();
    let _ = write_daily(&mut out, stats, ascending, palette);
    out
}


/// Render the billing-block report. `token_limit` adds a usage gauge for the
/// active block with warning banners at 50/75/90%.
pub fn render_blocks_table(
    report: &BlocksReport,
    token_limit: Option<u64>,
    palette: &Palette,
) -> String {
    let mut out = String::new();
    let _ = write_blocks(&mut out, report, token_limit, palette);
    out
}


fn write_stats(
    out: &mut String,
    stats: &UsageStats,
    details: bool,
    palette: &Palette,
) -> std::fmt::Result {
    write_header(out, "Claude Code Usage Statistics", palette)?;

    // Basic info
    writeln!(out, "BASIC INFO")?;
    writeln!(out, "{}", "-".repeat(40))?;
    let (mode_label, mode_color) = match stats.detected_mode {
        UsageMode::Subscription => ("Subscription", palette.green),
        UsageMode::Api => ("API (metered)", palette.yellow),
    };
    writeln!(out, "  Mode:                {mode_color}{mode_label}{}", palette.reset)?;
    writeln!(out, "  Sessions:            {:>15}", format_number(stats.total_sessions))?;
    writeln!(out, "  Messages:            {:>15}", format_number(stats.total_messages))?;
    writeln!(out, "  Parsed Messages:     {:>15}", format_number(stats.parsed_messages))?;
    if let (Some(start), Some(end)) =
        (stats.analysis_period.start_time, stats.analysis_period.end_time)
    {
        writeln!(
            out,
            "  Period:              {} to {}",
            format_local(start),
            format_local(end)
        )?;
        writeln!(out, "  Duration:            {:>15}", format_duration(end - start))?;
    }
    writeln!(out)?;

    // Token usage
    writeln!(out, "TOKEN USAGE")?;
    writeln!(out, "{}", "-".repeat(40))?;
    write_token_lines(out, &stats.total_tokens, palette)?;
    writeln!(out)?;

    // Per-model breakdown
    if !stats.model_stats.is_empty() {
        writeln!(out, "USAGE BY MODEL")?;
        writeln!(out, "{}", "-".repeat(60))?;

        let grand_total = stats.total_tokens.total();
        let mut models: Vec<_> = stats.model_stats.iter().collect();
        models.sort_by(|a, b| b.1.total().cmp(&a.1.total()));

        for (model, usage) in models {
            let percentage = if grand_total > 0 {
                usage.total() as f64 / grand_total as f64 * 100.0
            } else {
                0.0
            };
            let cost = stats.estimated_cost.model_costs.get(model).copied().unwrap_or(0.0);
            writeln!(
                out,
                "  {:30} {:>12} ({:5.1}%) ${:>12}",
                model,
                format_number(usage.total()),
                percentage,
                format_currency(cost)
            )?;
        }
        writeln!(out)?;
    }

    // Cost analysis
    writeln!(out, "COST ANALYSIS")?;
    writeln!(out, "{}", "-".repeat(40))?;
    if stats.estimated_cost.is_estimated {
        writeln!(
            out,
            "  {}Estimated pay-per-token equivalent; subscription usage is not billed this way.{}",
            palette.dim, palette.reset
        )?;
    }
    let cost = &stats.estimated_cost;
    writeln!(out, "  Input Cost:          ${:>14}", format_currency(cost.input_cost))?;
    writeln!(out, "  Output Cost:         ${:>14}", format_currency(cost.output_cost))?;
    writeln!(out, "  Cache Write Cost:    ${:>14}", format_currency(cost.cache_creation_cost))?;
    writeln!(out, "  Cache Read Cost:     ${:>14}", format_currency(cost.cache_read_cost))?;
    writeln!(
        out,
        "  Total Cost:          {}${:>14}{}",
        palette.bold,
        format_currency(cost.total_cost),
        palette.reset
    )?;
    writeln!(out)?;

    // Quota estimate
    if let Some(quota) = &stats.subscription_quota {
        writeln!(out, "SUBSCRIPTION QUOTA (rough estimate)")?;
        writeln!(out, "{}", "-".repeat(40))?;
        writeln!(
            out,
            "  {}Inferred from usage volume; actual plan and limits may differ.{}",
            palette.dim, palette.reset
        )?;
        writeln!(out, "  Plan:                {:>15}", quota.plan)?;
        writeln!(
            out,
            "  Window Usage:        {:>15} ({:.0}% of {})",
            format_number(quota.estimated_used),
            quota.usage_percentage,
            format_number(quota.messages_per_window)
        )?;
        writeln!(out, "  Remaining:           {:>15}", format_number(quota.estimated_remaining))?;
        writeln!(out, "  Current Model:       {:>15}", quota.current_model)?;
        if let Some(reset) = quota.next_reset {
            writeln!(out, "  Next Reset:          {}", format_local(reset))?;
        }
        writeln!(out)?;
    }

    if details {
        write_details(out, stats, palette)?;
    }

    Ok(())
}


fn write_token_lines(out: &mut String, tokens: &TokenUsage, palette: &Palette) -> std::fmt::Result {
    let total = tokens.total();
    let pct = |n: u64| {
        if total > 0 {
            n as f64 / total as f64 * 100.0
        } else {
            0.0
        }
    };
    writeln!(
        out,
        "  Input Tokens:        {:>15} ({:5.1}%)",
        format_number(tokens.input_tokens),
        pct(tokens.input_tokens)
    )?;
    writeln!(
        out,
        "  Output Tokens:       {:>15} ({:5.1}%)",
        format_number(tokens.output_tokens),
        pct(tokens.output_tokens)
    )?;
    if tokens.cache_creation_tokens > 0 {
        writeln!(
            out,
            "  Cache Write Tokens:  {:>15}",
            format_number(tokens.cache_creation_tokens)
        )?;
    }
    if tokens.cache_read_tokens > 0 {
        writeln!(
            out,
            "  Cache Read Tokens:   {:>15}",
            format_number(tokens.cache_read_tokens)
        )?;
    }
    writeln!(
        out,
        "  Total Tokens:        {}{:>15}{}",
        palette.bold,
        format_number(total),
        palette.reset
    )
}


fn write_details(out: &mut String, stats: &UsageStats, palette: &Palette) -> std::fmt::Result {
    if !stats.daily_stats.is_empty() {
        writeln!(out, "DAILY USAGE")?;
        writeln!(out, "{}", "-".repeat(60))?;

        let mut dates: Vec<_> = stats.daily_stats.keys().collect();
        dates.sort();
        for date in dates {
            let usage = &stats.daily_stats[date];
            writeln!(
                out,
                "  {:12} in {:>12}  out {:>12}  total {:>12}",
                date,
                format_number(usage.input_tokens),
                format_number(usage.output_tokens),
                format_number(usage.total())
            )?;
        }
        writeln!(out)?;
    }

    if !stats.project_stats.is_empty() {
        writeln!(out, "PROJECTS")?;
        writeln!(out, "{}", "-".repeat(60))?;

        let mut projects: Vec<_> = stats.project_stats.values().collect();
        projects.sort_by(|a, b| b.tokens.total().cmp(&a.tokens.total()));
        for project in projects {
            let last = project
                .last_activity
                .map(format_local)
                .unwrap_or_else(|| "-".to_string());
            writeln!(
                out,
                "  {:30} {:>12}  last {}",
                project.name,
                format_number(project.tokens.total()),
                last
            )?;
        }
        writeln!(out)?;
    }

    if !stats.session_stats.is_empty() {
        writeln!(out, "TOP SESSIONS")?;
        writeln!(out, "{}", "-".repeat(60))?;

        let mut sessions: Vec<_> = stats.session_stats.values().collect();
        sessions.sort_by(|a, b| b.tokens.total().cmp(&a.tokens.total()));
        for session in sessions.iter().take(10) {
            writeln!(
                out,
                "  {}{:38}{} {:>12} tokens, {:>6} messages",
                palette.cyan,
                session.id,
                palette.reset,
                format_number(session.tokens.total()),
                format_number(session.message_count)
            )?;
        }
        writeln!(out)?;
    }

    Ok(())
}


fn write_daily(
    out: &mut String,
    stats: &UsageStats,
    ascending: bool,
    palette: &Palette,
) -> std::fmt::Result {
    write_header(out, "Daily Usage", palette)?;

    if stats.daily_stats.is_empty() {
        writeln!(out, "No dated usage found.")?;
        return Ok(());
    }

    let mut dates: Vec<_> = stats.daily_stats.keys().collect();
    dates.sort();
    if !ascending {
        dates.reverse();
    }

    writeln!(
        out,
        "  {:12} {:>12} {:>12} {:>12} {:>12} {:>12}",
        "Date", "Input", "Output", "Cache W", "Cache R", "Total"
    )?;
    writeln!(out, "{}", "-".repeat(78))?;

    let mut total = TokenUsage::default();
    for date in dates {
        let usage = &stats.daily_stats[date];
        total.add(usage);
        writeln!(
            out,
            "  {:12} {:>12} {:>12} {:>12} {:>12} {:>12}",
            date,
            format_number(usage.input_tokens),
            format_number(usage.output_tokens),
            format_number(usage.cache_creation_tokens),
            format_number(usage.cache_read_tokens),
            format_number(usage.total())
        )?;
    }

    writeln!(out, "{}", "-".repeat(78))?;
    writeln!(
        out,
        "  {}{:12}{} {:>12} {:>12} {:>12} {:>12} {:>12}",
        palette.bold,
        "Total",
        palette.reset,
        format_number(total.input_tokens),
        format_number(total.output_tokens),
        format_number(total.cache_creation_tokens),
        format_number(total.cache_read_tokens),
        format_number(total.total())
    )
}


fn write_blocks(
    out: &mut String,
    report: &BlocksReport,
    token_limit: Option<u64>,
    palette: &Palette,
) -> std::fmt::Result {
    write_header(out, "5-Hour Billing Blocks", palette)?;

    if report.blocks.is_empty() {
        writeln!(out, "No session activity found.")?;
        return Ok(());
    }

    for block in &report.blocks {
        let marker = if block.is_active {
            format!(" {}[ACTIVE]{}", palette.green, palette.reset)
        } else {
            String::new()
        };
        writeln!(
            out,
            "{}{} - {}{}{}",
            palette.bold,
            block.start_time.format("%Y-%m-%d %H:%M"),
            block.end_time.format("%H:%M"),
            palette.reset,
            marker
        )?;
        writeln!(
            out,
            "  Tokens: {:>12}   Messages: {:>8}   Cost: ${}",
            format_number(block.tokens.total()),
            format_number(block.message_count),
            format_currency(block.cost_usd)
        )?;
        if !block.models.is_empty() {
            writeln!(out, "  Models: {}", block.models.join(", "))?;
        }
        if block.is_active {
            if let Some(remaining) = &block.time_remaining {
                writeln!(out, "  Time Remaining: {remaining}")?;
            }
            if block.burn_rate_per_minute > 0.0 {
                writeln!(
                    out,
                    "  Burn Rate: {:.0} tokens/min   Projected: {} tokens (${})",
                    block.burn_rate_per_minute,
                    format_number(block.projected_total_tokens),
                    format_currency(block.projected_cost)
                )?;
            }
            if let Some(limit) = token_limit {
                write_limit_gauge(out, block.tokens.total(), limit, palette)?;
            }
        }
        writeln!(out)?;
    }

    writeln!(out, "{}", "-".repeat(60))?;
    writeln!(
        out,
        "Blocks: {}   Total Tokens: {}   Total Cost: ${}",
        report.blocks.len(),
        format_number(report.summary.total()),
        format_currency(report.total_cost)
    )
}


fn write_limit_gauge(
    out: &mut String,
    used: u64,
    limit: u64,
    palette: &Palette,
) -> std::fmt::Result {
    if limit == 0 {
        return Ok(());
    }
    let pct = used as f64 / limit as f64 * 100.0;
    writeln!(
        out,
        "  Token Limit: {} / {} ({pct:.1}%)",
        format_number(used),
        format_number(limit)
    )?;
    if pct >= 90.0 {
        writeln!(out, "  {}WARNING: over 90% of the token limit{}", palette.red, palette.reset)?;
    } else if pct >= 75.0 {
        writeln!(out, "  {}WARNING: over 75% of the token limit{}", palette.yellow, palette.reset)?;
    } else if pct >= 50.0 {
        writeln!(out, "  {}Note: over 50% of the token limit{}", palette.yellow, palette.reset)?;
    }
    Ok(())
}


fn write_header(out: &mut String, title: &str, palette: &Palette) -> std::fmt::Result {
    writeln!(out, "\n{}", "=".repeat(60))?;
    writeln!(out, "{}{:^60}{}", palette.bold, title, palette.reset)?;
    writeln!(out, "{}\n", "=".repeat(60))
}


fn format_local(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}


fn format_duration(d: chrono::Duration) -> String {
    let minutes = d.num_minutes().max(0);
    let days = minutes / (24 * 60);
    let hours = (minutes % (24 * 60)) / 60;
    let mins = minutes % 60;
    if days > 0 {
        format!("{days}d {hours}h {mins}m")
    } else if hours > 0 {
        format!("{hours}h {mins}m")
    } else {
        format!("{mins}m")
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CostBreakdown, SessionInfo};

    fn sample_stats() -> UsageStats {
        let mut stats = UsageStats::default();
        stats.total_sessions = 2;
        stats.total_messages = 10;
        stats.total_tokens = TokenUsage {
            input_tokens: 1000,
            output_tokens: 500,
            total_tokens: 1500,
            ..Default::default()
        };
        stats.model_stats.insert(
            "claude-sonnet-4-20250514".to_string(),
            stats.total_tokens,
        );
        stats.daily_stats.insert("2024-06-01".to_string(), stats.total_tokens);
        stats.session_stats.insert(
            "s1".to_string(),
            SessionInfo {
                id: "s1".to_string(),
                tokens: stats.total_tokens,
                message_count: 10,
                ..Default::default()
            },
        );
        stats.estimated_cost = CostBreakdown {
            total_cost: 1.23,
            is_estimated: true,
            ..Default::default()
        };
        stats
    }

    #[test]
    fn test_stats_table_sections() {
        let out = render_stats_table(&sample_stats(), false, &Palette::new(false));
        assert!(out.contains("BASIC INFO"));
        assert!(out.contains("TOKEN USAGE"));
        assert!(out.contains("USAGE BY MODEL"));
        assert!(out.contains("COST ANALYSIS"));
        assert!(out.contains("1,500"));
        // Details sections only appear when requested.
        assert!(!out.contains("DAILY USAGE"));
        assert!(render_stats_table(&sample_stats(), true, &Palette::new(false))
            .contains("DAILY USAGE"));
    }

    #[test]
    fn test_no_color_output_has_no_escapes() {
        let out = render_stats_table(&sample_stats(), true, &Palette::new(false));
        assert!(!out.contains('\x1b'));
    }

    #[test]
    fn test_daily_table_order() {
        let mut stats = sample_stats();
        stats
            .daily_stats
            .insert("2024-06-02".to_string(), TokenUsage::default());

        let desc = render_daily_table(&stats, false, &Palette::new(false));
        let asc = render_daily_table(&stats, true, &Palette::new(false));
        assert!(desc.find("2024-06-02").unwrap() < desc.find("2024-06-01").unwrap());
        assert!(asc.find("2024-06-01").unwrap() < asc.find("2024-06-02").unwrap());
    }

    #[test]
    fn test_empty_blocks_report() {
        let report = BlocksReport {
            blocks: Vec::new(),
            summary: TokenUsage::default(),
            total_cost: 0.0,
        };
        let out = render_blocks_table(&report, None, &Palette::new(false));
        assert!(out.contains("No session activity"));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(chrono::Duration::minutes(5)), "5m");
        assert_eq!(format_duration(chrono::Duration::minutes(125)), "2h 5m");
        assert_eq!(format_duration(chrono::Duration::minutes(1500)), "1d 1h 0m");
    }
}
