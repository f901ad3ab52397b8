//! Version command implementation.

use console::style;

/// Execute the version command.
pub fn execute() {
    let version = env!("CARGO_PKG_VERSION");

    println!(
        "{} {} - density-matrix evolution with noise channels",
        style("densim").cyan().bold(),
        style(format!("v{version}")).yellow()
    );
    println!();
    println!("Components:");
    println!("  densim-ir      Instruction model, gate table and noise models");
    println!("  densim-engine  Chunk-aware density-matrix engine");
    println!("  densim-cli     Command-line interface");
    println!();
    println!("License:    {}", style("Apache-2.0").dim());
}
