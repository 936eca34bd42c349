//! Report rendering: table (ANSI), JSON, and CSV.
//!
//! Renderers build a `String` so commands can route the same report to
//! stdout or to `--output FILE`.

mod csv;
mod table;

pub use csv::{render_daily_csv, render_stats_csv};
pub use table::{render_blocks_table, render_daily_table, render_stats_table};


/// ANSI color codes, all empty when color is disabled.
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub bold: &'static str,
    pub dim: &'static str,
    pub red: &'static str,
    pub green: &'static str,
    pub yellow: &'static str,
    pub cyan: &'static str,
    pub reset: &'static str,
}


impl Palette {
    pub fn new(color: bool) -> Self {
        if color {
            Palette {
                bold: "\x1b[1m",
                dim: "\x1b[2m",
                red: "\x1b[31m",
                green: "\x1b[32m",
                yellow: "\x1b[33m",
                cyan: "\x1b[36m",
                reset: "\x1b[0m",
            }
        } else {
            Palette {
                bold: "",
                dim: "",
                red: "",
                green: "",
                yellow: "",
                cyan: "",
                reset: "",
            }
        }
    }
}


/// Format a number with commas.
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();
    let chars: Vec<char> = s.chars().collect();

    for (i, c) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }

    result
}


/// Format currency with 4 decimal places and commas in the integer part.
pub fn format_currency(v: f64) -> String {
    let formatted = format!("{v:.4}");
    let (int_part, frac_part) = formatted.split_once('.').unwrap_or((&formatted, "0000"));
    let grouped = if let Some(digits) = int_part.strip_prefix('-') {
        format!("-{}", format_number(digits.parse().unwrap_or(0)))
    } else {
        format_number(int_part.parse().unwrap_or(0))
    };
    format!("{grouped}.{frac_part}")
}
