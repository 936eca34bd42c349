//! CSV rendering of usage reports.

use std::fmt::Write;

use crate::models::{TokenUsage, UsageStats};


const HEADER: &str =
    "type,name,input_tokens,output_tokens,cache_creation_tokens,cache_read_tokens,total_tokens,cost_usd";


/// Grand-total row, one row per model (largest first), and per-day rows when
/// `details` is set. Day rows carry no cost since costs are only attributed
/// per model.
pub fn render_stats_csv(stats: &UsageStats, details: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{HEADER}");
    let _ = write_row(
        &mut out,
        "total",
        "all",
        &stats.total_tokens,
        Some(stats.estimated_cost.total_cost),
    );

    let mut models: Vec<_> = stats.model_stats.iter().collect();
    models.sort_by(|a, b| b.1.total().cmp(&a.1.total()).then(a.0.cmp(b.0)));
    for (model, usage) in models {
        let cost = stats.estimated_cost.model_costs.get(model).copied();
        let _ = write_row(&mut out, "model", model, usage, cost);
    }

    if details {
        let mut dates: Vec<_> = stats.daily_stats.keys().collect();
        dates.sort();
        for date in dates {
            let _ = write_row(&mut out, "date", date, &stats.daily_stats[date], None);
        }
    }

    out
}


/// Per-day rows only, in the requested date order.
pub fn render_daily_csv(stats: &UsageStats, ascending: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{HEADER}");

    let mut dates: Vec<_> = stats.daily_stats.keys().collect();
    dates.sort();
    if !ascending {
        dates.reverse();
    }
    for date in dates {
        let _ = write_row(&mut out, "date", date, &stats.daily_stats[date], None);
    }

    out
}


fn write_row(
    out: &mut String,
    kind: &str,
    name: &str,
    usage: &TokenUsage,
    cost: Option<f64>,
) -> std::fmt::Result {
    let cost = cost.map(|c| format!("{c:.4}")).unwrap_or_default();
    writeln!(
        out,
        "{kind},{},{},{},{},{},{},{cost}",
        escape(name),
        usage.input_tokens,
        usage.output_tokens,
        usage.cache_creation_tokens,
        usage.cache_read_tokens,
        usage.total()
    )
}


fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
