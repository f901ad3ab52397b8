//! Backing storage for a (possibly chunked) vectorized density matrix.
//!
//! The engine is generic over [`DensityMatrixBackend`]; [`DensityMatrix`]
//! is the in-memory CPU implementation.
//!
//! Two qubit conventions are used by the trait:
//! - *density-matrix qubits* `0..n`, where a gate acts as `U ρ U†`;
//! - *superoperator qubits* `0..2n`, where the buffer is treated as a plain
//!   statevector (`q` is the row bit, `q + n` the column bit).
//!
//! Each method documents which of the two it takes.

mod dense;
pub mod indexing;
pub mod pauli;

pub use dense::DensityMatrix;
pub use pauli::PauliMasks;

use ndarray::Array2;
use num_complex::Complex64;

use crate::config::Parallelism;
use crate::error::EngineResult;

/// Storage and kernels for one vectorized density matrix (or one chunk).
pub trait DensityMatrixBackend: Send + Sync {
    /// Number of density-matrix qubits held locally.
    fn num_qubits(&self) -> usize;

    /// Index of this chunk in the global register; 0 when unchunked.
    fn chunk_index(&self) -> u64;

    /// Whether kernels can address qubits outside the local chunk.
    fn support_global_indexing(&self) -> bool {
        false
    }

    /// Install the data-parallel execution policy.
    fn set_parallelism(&mut self, parallelism: Parallelism);

    /// Resize to `num_qubits` qubits; contents are unspecified until the
    /// next `initialize*` call.
    fn set_num_qubits(&mut self, num_qubits: usize);

    /// Reset to |0…0⟩⟨0…0| (all zeros for chunks other than the first).
    fn initialize(&mut self);

    /// Load either a statevector (`2^n` entries, stored as |ψ⟩⟨ψ|) or a
    /// vectorized density matrix (`4^n` entries).
    fn initialize_from_vector(&mut self, vec: &[Complex64]) -> EngineResult<()>;

    /// Load a `2^n x 2^n` density matrix.
    fn initialize_from_matrix(&mut self, mat: &Array2<Complex64>) -> EngineResult<()>;

    /// Real part of the trace of the local block.
    fn trace(&self) -> f64;

    /// Diagonal entry `ρ[index, index]` (density-matrix index).
    fn probability(&self, index: u64) -> f64;

    /// The whole diagonal.
    fn probabilities(&self) -> Vec<f64>;

    /// The vectorized buffer.
    fn data(&self) -> &[Complex64];

    /// Copy of the vectorized buffer.
    fn vector(&self) -> Vec<Complex64> {
        self.data().to_vec()
    }

    /// `ρ ↦ U ρ U†` on density-matrix qubits; `mat` is column-major.
    fn apply_unitary_matrix(&mut self, qubits: &[usize], mat: &[Complex64]);

    /// `ρ ↦ D ρ D†` on density-matrix qubits.
    fn apply_diagonal_unitary_matrix(&mut self, qubits: &[usize], diag: &[Complex64]);

    /// Multiply by a diagonal on superoperator qubits.
    fn apply_diagonal_matrix(&mut self, qubits: &[usize], diag: &[Complex64]);

    /// Apply a `4^k x 4^k` column-major superoperator on density-matrix
    /// qubits.
    fn apply_superop_matrix(&mut self, qubits: &[usize], mat: &[Complex64]);

    /// Pauli X on a density-matrix qubit.
    fn apply_x(&mut self, qubit: usize);

    /// Pauli Y on a density-matrix qubit.
    fn apply_y(&mut self, qubit: usize);

    /// CNOT on density-matrix qubits.
    fn apply_cnot(&mut self, control: usize, target: usize);

    /// Controlled-Y on density-matrix qubits.
    fn apply_cy(&mut self, control: usize, target: usize);

    /// Controlled phase on density-matrix qubits.
    fn apply_cphase(&mut self, q0: usize, q1: usize, phase: Complex64);

    /// SWAP on density-matrix qubits.
    fn apply_swap(&mut self, q0: usize, q1: usize);

    /// Toffoli on density-matrix qubits.
    fn apply_toffoli(&mut self, control0: usize, control1: usize, target: usize);

    /// Multi-controlled X on superoperator qubits; the last qubit is the
    /// target.
    fn apply_mcx(&mut self, qubits: &[usize]);

    /// Multi-controlled Y on superoperator qubits; `conj` applies conj(Y).
    fn apply_mcy(&mut self, qubits: &[usize], conj: bool);

    /// Multiply every entry whose `qubits` bits are all set by `phase`.
    /// An empty list scales the whole buffer.
    fn apply_mcphase(&mut self, qubits: &[usize], phase: Complex64);

    /// Pauli operator on superoperator qubits, scaled by `coeff`.
    fn apply_pauli(&mut self, qubits: &[usize], pauli: &str, coeff: Complex64)
    -> EngineResult<()>;

    /// Reset superoperator on density-matrix qubits.
    fn apply_reset(&mut self, qubits: &[usize]);

    /// Resolve uniform variates in `[0, 1)` against the cumulative diagonal.
    fn sample_measure(&self, rnds: &[f64]) -> Vec<u64>;

    /// `Re Tr(P ρ)` for a Pauli string on density-matrix qubits.
    fn expval_pauli(&self, qubits: &[usize], pauli: &str) -> EngineResult<f64>;

    /// Memory needed for `num_qubits` density-matrix qubits, in MB.
    fn required_memory_mb(num_qubits: usize) -> usize
    where
        Self: Sized,
    {
        // 16 bytes per entry, 4^n entries
        let shift = (2 * num_qubits + 4).saturating_sub(20);
        1usize << shift
    }

    /// Hand out the buffer as a matrix, leaving the store empty.
    fn move_to_matrix(&mut self) -> EngineResult<Array2<Complex64>>;

    /// The buffer as a matrix.
    fn copy_to_matrix(&self) -> Array2<Complex64>;
}
