//! Error types for the IR crate.

use thiserror::Error;

/// Errors that can occur while building or resolving instructions.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IrError {
    /// Gate name is not part of the supported gate set.
    #[error("invalid gate instruction '{0}'")]
    UnknownGate(String),

    /// Gate requires a different number of qubits.
    #[error("Gate '{gate_name}' requires {expected} qubits, got {got}")]
    QubitCountMismatch {
        /// Name of the gate.
        gate_name: String,
        /// Expected number of qubits.
        expected: usize,
        /// Actual number of qubits provided.
        got: usize,
    },

    /// Matrix does not have the shape required by its qubit list.
    #[error("Matrix for '{name}' must be {expected}x{expected}, got {rows}x{cols}")]
    InvalidMatrix {
        /// Name of the instruction carrying the matrix.
        name: String,
        /// Expected dimension.
        expected: usize,
        /// Actual row count.
        rows: usize,
        /// Actual column count.
        cols: usize,
    },

    /// Noise model cannot be expressed as the requested instruction.
    #[error("Noise model '{0}' has no Kraus representation")]
    NotAChannel(String),
}

/// Result type for IR operations.
pub type IrResult<T> = Result<T, IrError>;
