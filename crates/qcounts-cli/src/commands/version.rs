//! Version command implementation.

use console::style;

/// Execute the version command.
pub fn execute() {
    let version = env!("CARGO_PKG_VERSION");

    println!(
        "{} {} - dense measurement histograms from cloud QPUs",
        style("qcounts").cyan().bold(),
        style(format!("v{version}")).yellow()
    );
    println!();
    println!("Components:");
    println!("  qcounts-core         Request model, decoder and blocking bridge");
    println!("  qcounts-adapter-oqc  OQC QCaaS client");
    println!("  qcounts-ffi          C ABI (counts / counts_free)");
    println!("  qcounts-cli          Command-line interface");
    println!();
    println!(
        "Repository: {}",
        style("https://github.com/hiq-lab/qcounts").underlined()
    );
    println!("License:    {}", style("Apache-2.0").dim());
}
