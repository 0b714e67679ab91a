//! Decode command implementation.
//!
//! Turns a saved results document (anything with a `cbits` map) into a
//! dense histogram without contacting the service.

use anyhow::{Context, Result};

use qcounts_core::{CountHistogram, TaskResults, decode};

use super::common::{OutputFormat, print_histogram, read_input};

/// Execute the decode command.
pub fn execute(input: &str, qubits: u32, format: OutputFormat) -> Result<()> {
    let json = read_input(input)?;
    let histogram = decode_document(&json, qubits)
        .with_context(|| format!("Failed to decode {input}"))?;
    print_histogram(&histogram, format)
}

fn decode_document(json: &str, qubits: u32) -> Result<CountHistogram> {
    let results = TaskResults::from_json(json)?;
    let cbits = results.cbits()?;
    Ok(decode(&cbits, qubits)?)
}
