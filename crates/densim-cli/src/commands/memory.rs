//! Memory command implementation.

use console::style;
use densim_engine::{DensityMatrix, DensityMatrixState};

/// Execute the memory command.
pub fn execute(qubits: usize) {
    let mb = DensityMatrixState::<DensityMatrix>::required_memory_mb(qubits);
    println!(
        "{} {} qubits: {} MB ({} complex amplitudes)",
        style("→").cyan().bold(),
        qubits,
        style(mb).yellow(),
        amplitude_count(qubits)
    );
}

fn amplitude_count(qubits: usize) -> String {
    u32::try_from(2 * qubits)
        .ok()
        .and_then(|bits| 1u128.checked_shl(bits))
        .map_or_else(|| format!("4^{qubits}"), |n| n.to_string())
}
