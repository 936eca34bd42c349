//! Analyze command - full usage report.

use anyhow::Result;

use crate::aggregation;
use crate::cli::{CommonArgs, OutputFormat};
use crate::output::{render_stats_csv, render_stats_table, Palette};

use super::{emit, load_stats, to_pretty_json};


pub fn run(common: &CommonArgs, model: Option<&str>, details: bool, color: bool) -> Result<()> {
    let mut stats = load_stats(common)?;

    if let Some(needle) = model {
        stats = aggregation::filter_by_model(&stats, needle);
    }
    aggregation::finalize(&mut stats, common.mode);

    let rendered = match common.format {
        OutputFormat::Table => render_stats_table(&stats, details, &Palette::new(color)),
        OutputFormat::Json => to_pretty_json(&stats)?,
        OutputFormat::Csv => render_stats_csv(&stats, details),
    };
    emit(&rendered, common.output.as_deref())
}
