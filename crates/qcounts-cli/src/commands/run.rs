//! Run command implementation.

use std::time::Duration;

use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use qcounts_adapter_oqc::OqcClient;
use qcounts_core::{BridgeConfig, CircuitJobRequest, JobBridge};

use super::common::{OutputFormat, print_histogram, read_input};

/// Execute the run command.
pub fn execute(
    input: &str,
    shots: u32,
    qubits: u32,
    device: &str,
    extra_config: &str,
    format: OutputFormat,
) -> Result<()> {
    let circuit = read_input(input)?;

    let config = BridgeConfig::from_env();
    let client = OqcClient::from_config(&config)
        .context("Failed to open OQC session. Set OQC_AUTH_TOKEN and OQC_URL.")?;
    let device_label = config.resolve_device(device)?.to_string();
    let bridge = JobBridge::new(client, config)?;

    let request = CircuitJobRequest::new(circuit, shots, qubits)
        .with_device(device)
        .with_extra_config(extra_config);

    // Table output is for humans; keep JSON output clean.
    let spinner = (format == OutputFormat::Table).then(|| {
        println!(
            "{} Running {} on {} ({} shots)",
            style("→").cyan().bold(),
            style(input).green(),
            style(&device_label).yellow(),
            shots
        );
        let spinner = ProgressBar::new_spinner();
        if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")
        {
            spinner.set_style(spinner_style);
        }
        spinner.set_message("Waiting for results...");
        spinner.enable_steady_tick(Duration::from_millis(100));
        spinner
    });

    let outcome = bridge.run(&request);
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    let histogram = outcome?;
    print_histogram(&histogram, format)
}
