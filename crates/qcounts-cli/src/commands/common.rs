//! Shared helpers for CLI commands.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use clap::ValueEnum;
use console::style;

use qcounts_core::CountHistogram;

/// Outcomes shown in the table before the rest are summarised.
const MAX_ROWS: usize = 16;

/// How a histogram is printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

/// Read a text file, with the path in any error.
pub fn read_input(path: &str) -> Result<String> {
    let path_obj = Path::new(path);

    if !path_obj.exists() {
        anyhow::bail!("File not found: {path}");
    }

    fs::read_to_string(path_obj).with_context(|| format!("Failed to read file: {path}"))
}

/// Non-zero outcomes, most frequent first; ties in bitstring order.
pub fn sorted_outcomes(histogram: &CountHistogram) -> Vec<(String, u64)> {
    let mut outcomes: Vec<_> = histogram.iter_nonzero().collect();
    outcomes.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    outcomes
}

/// Print a histogram in the requested format.
pub fn print_histogram(histogram: &CountHistogram, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(histogram)
                .context("JSON serialization failed")?;
            println!("{json}");
        }
        OutputFormat::Table => print_table(histogram),
    }
    Ok(())
}

fn print_table(histogram: &CountHistogram) {
    let total = histogram.total();
    println!(
        "\n{} Counts ({} shots, {} qubits):",
        style("✓").green().bold(),
        total,
        histogram.num_qubits()
    );

    if total == 0 {
        println!("  (no shots recorded)");
        return;
    }

    let sorted = sorted_outcomes(histogram);
    for (bitstring, count) in sorted.iter().take(MAX_ROWS) {
        let prob = *count as f64 / total as f64 * 100.0;
        let bar_len = (prob / 2.0).round() as usize;
        let bar: String = "█".repeat(bar_len);

        println!(
            "  {}: {:>6} ({:>5.2}%) {}",
            style(bitstring).cyan(),
            count,
            prob,
            style(bar).green()
        );
    }

    if sorted.len() > MAX_ROWS {
        println!("  ... and {} more outcomes", sorted.len() - MAX_ROWS);
    }
}
