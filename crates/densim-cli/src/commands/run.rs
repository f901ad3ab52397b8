//! Run command implementation.

use std::collections::BTreeMap;
use std::fs;

use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::info;

use densim_engine::{DensityMatrixState, ExperimentData, RngEngine};

use super::common::{load_config, load_program};

/// JSON report written by `densim run`.
#[derive(Debug, Serialize)]
struct Report {
    num_qubits: usize,
    shots: usize,
    memory: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    counts: BTreeMap<String, usize>,
    data: ExperimentData,
}

/// Execute the run command.
pub fn execute(
    input: &str,
    config: Option<&str>,
    shots: usize,
    seed: Option<u64>,
    output: Option<&str>,
) -> Result<()> {
    eprintln!(
        "{} Running {} ({} shots)",
        style("→").cyan().bold(),
        style(input).green(),
        shots
    );

    let program = load_program(input)?;
    let ops = program.lowered_ops()?;
    eprintln!(
        "  Loaded: {} qubits, {} instructions",
        program.num_qubits,
        ops.len()
    );

    let mut state = DensityMatrixState::new();
    if let Some(path) = config {
        state.set_config(load_config(path)?)?;
        info!("Loaded engine config from {}", path);
    }
    state.initialize_qreg(program.num_qubits);
    state.initialize_creg(program.num_memory, program.num_registers);

    let mut rng = seed.map_or_else(RngEngine::from_entropy, RngEngine::new);
    let mut data = ExperimentData::new();

    let progress = ProgressBar::new(ops.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar().template("{spinner:.cyan} [{bar:30}] {pos}/{len} {msg}")?,
    );

    // the state is only needed afterwards when sampling
    let final_ops = shots == 0;
    let last = ops.len().saturating_sub(1);
    for (i, op) in ops.iter().enumerate() {
        progress.set_message(op.name.clone());
        state
            .apply_op(op, &mut data, &mut rng, final_ops && i == last)
            .with_context(|| format!("Instruction {i} ('{}') failed", op.name))?;
        progress.inc(1);
    }
    progress.finish_and_clear();

    let mut counts = BTreeMap::new();
    if shots > 0 {
        let qubits: Vec<usize> = (0..program.num_qubits).collect();
        for outcome in state.sample_measure(&qubits, shots, &mut rng)? {
            *counts.entry(format!("{outcome:#x}")).or_insert(0) += 1;
        }
        print_counts(&counts, shots);
    }

    let report = Report {
        num_qubits: program.num_qubits,
        shots,
        memory: state.creg().memory_hex(),
        counts,
        data,
    };
    let json = serde_json::to_string_pretty(&report)?;

    match output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("Failed to write output: {path}"))?;
            eprintln!("{} Results written to {}", style("✓").green().bold(), path);
        }
        None => println!("{json}"),
    }

    Ok(())
}

/// Print sampled counts as a table on stderr.
fn print_counts(counts: &BTreeMap<String, usize>, shots: usize) {
    eprintln!("\n{} Counts ({} shots):", style("✓").green().bold(), shots);

    let mut sorted: Vec<_> = counts.iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

    for (outcome, count) in sorted.iter().take(16) {
        let prob = **count as f64 / shots as f64 * 100.0;
        let bar: String = "█".repeat((prob / 2.0).round() as usize);
        eprintln!(
            "  {}: {:>6} ({:>5.2}%) {}",
            style(outcome).cyan(),
            count,
            prob,
            style(bar).green()
        );
    }

    if sorted.len() > 16 {
        eprintln!("  ... and {} more outcomes", sorted.len() - 16);
    }
}
