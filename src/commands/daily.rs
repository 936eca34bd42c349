//! Daily command - per-calendar-day usage.

use std::collections::BTreeMap;

use anyhow::Result;

use crate::aggregation;
use crate::cli::{CommonArgs, OutputFormat};
use crate::output::{render_daily_csv, render_daily_table, Palette};

use super::{emit, load_stats, to_pretty_json};


pub fn run(common: &CommonArgs, ascending: bool, color: bool) -> Result<()> {
    let mut stats = load_stats(common)?;
    aggregation::finalize(&mut stats, common.mode);

    let rendered = match common.format {
        OutputFormat::Table => render_daily_table(&stats, ascending, &Palette::new(color)),
        OutputFormat::Json => {
            // BTreeMap so the JSON keys come out date-ordered.
            let ordered: BTreeMap<_, _> = stats.daily_stats.iter().collect();
            to_pretty_json(&ordered)?
        }
        OutputFormat::Csv => render_daily_csv(&stats, ascending),
    };
    emit(&rendered, common.output.as_deref())
}
