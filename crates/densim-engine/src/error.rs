//! Error types for the engine crate.

use thiserror::Error;

use densim_ir::IrError;

/// Errors raised while applying instructions to a density matrix.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EngineError {
    /// Instruction type is not supported by the density-matrix engine.
    #[error("DensityMatrix::State::invalid instruction '{0}'")]
    InvalidInstruction(String),

    /// Instruction model error (unknown gate, malformed matrix).
    #[error(transparent)]
    Ir(#[from] IrError),

    /// Initial state does not match the requested register size.
    #[error("initial state does not match qubit number: expected {expected}, got {got}")]
    QubitCountMismatch {
        /// Requested number of qubits.
        expected: usize,
        /// Number of qubits of the supplied state.
        got: usize,
    },

    /// `save_state` on a strict subset of the register.
    #[error("{0} was not applied to all qubits. Only the full state can be saved.")]
    IncompleteSave(String),

    /// Instruction names a qubit beyond the register.
    #[error("'{instruction}' acts on qubit {qubit}, but the register has {num_qubits} qubits")]
    QubitOutOfRange {
        /// Name of the instruction.
        instruction: String,
        /// The offending qubit.
        qubit: usize,
        /// Size of the register.
        num_qubits: usize,
    },

    /// Instruction needs a qubit that is not addressable inside this chunk.
    #[error("'{instruction}' acts on global qubit {qubit}, which is outside this chunk")]
    GlobalQubit {
        /// Name of the instruction.
        instruction: String,
        /// The offending qubit.
        qubit: usize,
    },

    /// Instruction needs the whole register but the state is one chunk.
    #[error("'{0}' requires the full register but the state holds a single chunk")]
    ChunkedState(String),

    /// Instruction is missing a parameter it needs.
    #[error("Invalid {instruction} instruction: missing {what}")]
    MissingParameter {
        /// Name of the instruction.
        instruction: String,
        /// Description of what is missing.
        what: &'static str,
    },

    /// Vector or matrix has the wrong size for its qubits.
    #[error("'{instruction}' expects {expected} elements, got {got}")]
    DimensionMismatch {
        /// Name of the instruction.
        instruction: String,
        /// Expected element count.
        expected: usize,
        /// Actual element count.
        got: usize,
    },

    /// Weights cannot be sampled from.
    #[error("Invalid sampling distribution: {0}")]
    InvalidDistribution(String),

    /// Engine configuration could not be applied.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
