//! Blocks command - 5-hour billing window analysis and live monitoring.

use anyhow::{bail, Context, Result};
use chrono::{Duration, Local, Utc};

use crate::aggregation;
use crate::analysis::analyze_blocks;
use crate::cli::{CommonArgs, OutputFormat};
use crate::config::DEFAULT_TOKEN_LIMIT;
use crate::models::BlocksReport;
use crate::output::{render_blocks_table, Palette};

use super::{emit, load_stats, to_pretty_json};


pub struct BlockOptions {
    pub live: bool,
    pub token_limit: Option<String>,
    pub refresh_interval: u64,
    pub active: bool,
    pub recent: bool,
}


pub fn run(common: &CommonArgs, options: &BlockOptions, color: bool) -> Result<()> {
    if common.format == OutputFormat::Csv {
        bail!("blocks does not support csv; use table or json");
    }
    let limit = options
        .token_limit
        .as_deref()
        .map(TokenLimit::parse)
        .transpose()?;

    if options.live {
        if common.output.is_some() {
            bail!("--live and --output are mutually exclusive");
        }
        let palette = Palette::new(color);
        loop {
            let report = collect(common, options)?;
            let resolved = limit.as_ref().map(|l| l.resolve(&report));

            // ANSI clear screen + cursor home.
            print!("\x1b[2J\x1b[H");
            println!(
                "{}Last updated: {} (refreshing every {}s, Ctrl+C to quit){}",
                palette.dim,
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                options.refresh_interval.max(1),
                palette.reset
            );
            print!("{}", render_blocks_table(&report, resolved, &palette));

            std::thread::sleep(std::time::Duration::from_secs(options.refresh_interval.max(1)));
        }
    }

    let report = collect(common, options)?;
    let resolved = limit.as_ref().map(|l| l.resolve(&report));
    let rendered = match common.format {
        OutputFormat::Json => to_pretty_json(&report)?,
        _ => render_blocks_table(&report, resolved, &Palette::new(color)),
    };
    emit(&rendered, common.output.as_deref())
}


/// Parse, aggregate, and analyze one pass, then apply the block filters.
fn collect(common: &CommonArgs, options: &BlockOptions) -> Result<BlocksReport> {
    let mut stats = load_stats(common)?;
    aggregation::finalize(&mut stats, common.mode);

    let mut report = analyze_blocks(&stats, Utc::now());
    if options.active {
        report.blocks.retain(|b| b.is_active);
    }
    if options.recent {
        let cutoff = Local::now() - Duration::hours(24);
        report.blocks.retain(|b| b.end_time > cutoff);
    }
    Ok(report)
}


enum TokenLimit {
    Fixed(u64),
    /// Largest block seen in the current data.
    Max,
}


impl TokenLimit {
    fn parse(arg: &str) -> Result<Self> {
        if arg.eq_ignore_ascii_case("max") {
            return Ok(TokenLimit::Max);
        }
        let n = arg
            .parse::<u64>()
            .with_context(|| format!("invalid token limit '{arg}' (expected a number or 'max')"))?;
        Ok(TokenLimit::Fixed(n))
    }

    fn resolve(&self, report: &BlocksReport) -> u64 {
        match self {
            TokenLimit::Fixed(n) => *n,
            TokenLimit::Max => report
                .blocks
                .iter()
                .map(|b| b.tokens.total())
                .max()
                .filter(|&n| n > 0)
                .unwrap_or(DEFAULT_TOKEN_LIMIT),
        }
    }
}
