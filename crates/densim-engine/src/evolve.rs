//! Gate, matrix and channel application on the superoperator.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

use densim_ir::{Gate, IrError, Op};
use ndarray::Array2;
use num_complex::Complex64;

use crate::chunk::{ChunkRoute, block_diagonal, route_gate};
use crate::error::{EngineError, EngineResult};
use crate::linalg::{kraus_superop, tensor, vectorize};
use crate::matrices;
use crate::state::DensityMatrixState;
use crate::store::DensityMatrixBackend;

const ONE: Complex64 = Complex64::new(1.0, 0.0);

/// `exp(i·λ)` for the first parameter; a complex λ also scales the magnitude.
fn phase_param(op: &Op) -> Complex64 {
    op.params
        .first()
        .map_or(ONE, |&lambda| (Complex64::i() * lambda).exp())
}

/// Diagonal of a Pauli gate built only from I and Z factors.
fn pauli_z_diagonal(op: &Op, gate: Gate) -> Option<Vec<Complex64>> {
    if gate != Gate::Pauli {
        return None;
    }
    let pauli = op.string_params.first()?;
    if pauli.len() != op.qubits.len() || !pauli.chars().all(|c| c == 'I' || c == 'Z') {
        return None;
    }
    let z_mask = pauli
        .chars()
        .rev()
        .enumerate()
        .filter(|&(_, c)| c == 'Z')
        .fold(0usize, |mask, (i, _)| mask | (1 << i));
    Some(
        (0..1usize << op.qubits.len())
            .map(|i| if (i & z_mask).count_ones() % 2 == 0 { ONE } else { -ONE })
            .collect(),
    )
}

impl<B: DensityMatrixBackend> DensityMatrixState<B> {
    /// Apply a named gate.
    pub fn apply_gate(&mut self, op: &Op) -> EngineResult<()> {
        let gate = Gate::from_name(&op.name)?;
        if let Some(expected) = gate.num_qubits() {
            if op.qubits.len() != expected {
                return Err(IrError::QubitCountMismatch {
                    gate_name: op.name.clone(),
                    expected,
                    got: op.qubits.len(),
                }
                .into());
            }
        }
        if op.params.len() < gate.num_params() {
            return Err(EngineError::MissingParameter {
                instruction: op.name.clone(),
                what: "gate parameters",
            });
        }

        if self.is_chunked() {
            if let Some(diag) = pauli_z_diagonal(op, gate) {
                return self.apply_diagonal_unitary_matrix(&op.qubits, &diag);
            }
            match route_gate(op, gate, &self.chunk_context())? {
                ChunkRoute::Direct => {}
                ChunkRoute::Skip => return Ok(()),
                ChunkRoute::DensityMatrix(local) => {
                    let gate = Gate::from_name(&local.name)?;
                    return self.apply_gate_direct(&local, gate);
                }
                ChunkRoute::RowSide(local) => return self.apply_gate_one_sided(&local, false),
                ChunkRoute::ColumnSide(local) => return self.apply_gate_one_sided(&local, true),
            }
        }
        self.apply_gate_direct(op, gate)
    }

    fn apply_gate_direct(&mut self, op: &Op, gate: Gate) -> EngineResult<()> {
        let q = &op.qubits;
        let p = |i: usize| op.real_param(i).unwrap_or(0.0);
        match gate {
            Gate::Id => {}
            Gate::X => self.store.apply_x(q[0]),
            Gate::Y => self.store.apply_y(q[0]),
            Gate::Z => self.apply_phase(q[0], -ONE)?,
            Gate::S => self.apply_phase(q[0], Complex64::new(0.0, 1.0))?,
            Gate::Sdg => self.apply_phase(q[0], Complex64::new(0.0, -1.0))?,
            Gate::T => self.apply_phase(q[0], Complex64::from_polar(1.0, FRAC_PI_4))?,
            Gate::Tdg => self.apply_phase(q[0], Complex64::from_polar(1.0, -FRAC_PI_4))?,
            Gate::U1 => self.apply_phase(q[0], phase_param(op))?,
            Gate::H => self.apply_matrix(q, &matrices::h())?,
            Gate::U2 => self.apply_matrix(q, &matrices::u3(FRAC_PI_2, p(0), p(1)))?,
            Gate::U3 => self.apply_matrix(q, &matrices::u3(p(0), p(1), p(2)))?,
            Gate::SX => self.apply_matrix(q, &matrices::sx())?,
            Gate::SXdg => self.apply_matrix(q, &matrices::sxdg())?,
            Gate::R => self.apply_matrix(q, &matrices::r(p(0), p(1)))?,
            Gate::Rx => self.apply_matrix(q, &matrices::rx(p(0)))?,
            Gate::Ry => self.apply_matrix(q, &matrices::ry(p(0)))?,
            Gate::Rxx => self.apply_matrix(q, &matrices::rxx(p(0)))?,
            Gate::Ryy => self.apply_matrix(q, &matrices::ryy(p(0)))?,
            Gate::Rzx => self.apply_matrix(q, &matrices::rzx(p(0)))?,
            Gate::ECR => self.apply_matrix(q, &matrices::ecr())?,
            Gate::Rz => self.apply_diagonal_unitary_matrix(q, &matrices::rz_diag(p(0)))?,
            Gate::Rzz => self.apply_diagonal_unitary_matrix(q, &matrices::rzz_diag(p(0)))?,
            Gate::CX => self.store.apply_cnot(q[0], q[1]),
            Gate::CY => self.store.apply_cy(q[0], q[1]),
            Gate::CZ => self.store.apply_cphase(q[0], q[1], -ONE),
            Gate::CP => self.store.apply_cphase(q[0], q[1], phase_param(op)),
            Gate::Swap => self.store.apply_swap(q[0], q[1]),
            Gate::CCX => self.store.apply_toffoli(q[0], q[1], q[2]),
            Gate::Pauli => self.apply_pauli(op)?,
        }
        Ok(())
    }

    /// Apply a gate left by chunk routing to one side of the density matrix.
    ///
    /// The column side uses local qubits shifted by the chunk width and the
    /// conjugated operator.
    fn apply_gate_one_sided(&mut self, op: &Op, column: bool) -> EngineResult<()> {
        let gate = Gate::from_name(&op.name)?;
        let shift = if column { self.store.num_qubits() } else { 0 };
        let qubits: Vec<usize> = op.qubits.iter().map(|q| q + shift).collect();
        let side = |phase: Complex64| if column { phase.conj() } else { phase };
        match gate {
            Gate::X | Gate::CX | Gate::CCX => self.store.apply_mcx(&qubits),
            Gate::Y | Gate::CY => self.store.apply_mcy(&qubits, column),
            Gate::Z | Gate::CZ => self.store.apply_mcphase(&qubits, -ONE),
            Gate::U1 | Gate::CP => {
                self.store.apply_mcphase(&qubits, side(phase_param(op)));
            }
            other => return Err(EngineError::InvalidInstruction(other.name().to_string())),
        }
        Ok(())
    }

    fn apply_phase(&mut self, qubit: usize, phase: Complex64) -> EngineResult<()> {
        self.apply_diagonal_unitary_matrix(&[qubit], &[ONE, phase])
    }

    /// Multi-qubit Pauli gate: the string is applied to row and column
    /// qubits at once, with a sign per Y factor from conj(Y) = -Y.
    fn apply_pauli(&mut self, op: &Op) -> EngineResult<()> {
        let pauli = op
            .string_params
            .first()
            .ok_or_else(|| EngineError::MissingParameter {
                instruction: op.name.clone(),
                what: "Pauli string",
            })?;
        let shift = self.store.num_qubits();
        let superop_qubits: Vec<usize> = op
            .qubits
            .iter()
            .copied()
            .chain(op.qubits.iter().map(|q| q + shift))
            .collect();
        let num_y = pauli.chars().filter(|&c| c == 'Y').count();
        let coeff = if num_y % 2 == 0 { ONE } else { -ONE };
        self.store
            .apply_pauli(&superop_qubits, &pauli.repeat(2), coeff)
    }

    /// Apply `U ρ U†`; a single-row matrix is taken as a diagonal.
    pub fn apply_matrix(&mut self, qubits: &[usize], mat: &Array2<Complex64>) -> EngineResult<()> {
        let dim = 1usize << qubits.len();
        if mat.nrows() == 1 {
            let diag: Vec<Complex64> = mat.row(0).to_vec();
            return self.apply_diagonal_unitary_matrix(qubits, &diag);
        }
        if mat.dim() != (dim, dim) {
            return Err(EngineError::DimensionMismatch {
                instruction: "matrix".to_string(),
                expected: dim * dim,
                got: mat.len(),
            });
        }
        self.ensure_local("matrix", qubits)?;
        self.store.apply_unitary_matrix(qubits, &vectorize(mat));
        Ok(())
    }

    pub(crate) fn apply_matrix_op(&mut self, op: &Op) -> EngineResult<()> {
        let mat = op.mats.first().ok_or_else(|| EngineError::MissingParameter {
            instruction: op.name.clone(),
            what: "matrix",
        })?;
        self.apply_matrix(&op.qubits, mat)
    }

    /// Apply `D ρ D†` for a diagonal `D`.
    ///
    /// On a chunk, the diagonal is first restricted by the chunk's global
    /// row bits and, separately, its global column bits; the two halves are
    /// then applied together on the local superoperator qubits.
    pub fn apply_diagonal_unitary_matrix(
        &mut self,
        qubits: &[usize],
        diag: &[Complex64],
    ) -> EngineResult<()> {
        let dim = 1usize << qubits.len();
        if diag.len() != dim {
            return Err(EngineError::DimensionMismatch {
                instruction: "diagonal_matrix".to_string(),
                expected: dim,
                got: diag.len(),
            });
        }
        let chunk_qubits = self.store.num_qubits();
        if !self.is_chunked() || qubits.iter().all(|&q| q < chunk_qubits) {
            self.store.apply_diagonal_unitary_matrix(qubits, diag);
            return Ok(());
        }

        let ctx = self.chunk_context();
        let (qubits_in, diag_row) = block_diagonal(ctx.row_bits(), chunk_qubits, qubits, diag);
        let (_, diag_col) = block_diagonal(ctx.column_bits(), chunk_qubits, qubits, diag);
        let diag_col: Vec<Complex64> = diag_col.iter().map(|d| d.conj()).collect();
        let superop_qubits: Vec<usize> = qubits_in
            .iter()
            .copied()
            .chain(qubits_in.iter().map(|q| q + chunk_qubits))
            .collect();
        self.store
            .apply_diagonal_matrix(&superop_qubits, &tensor(&diag_col, &diag_row));
        Ok(())
    }

    pub(crate) fn apply_superop_op(&mut self, op: &Op) -> EngineResult<()> {
        let mat = op.mats.first().ok_or_else(|| EngineError::MissingParameter {
            instruction: op.name.clone(),
            what: "superoperator matrix",
        })?;
        self.apply_superop_matrix(&op.qubits, mat)
    }

    /// Apply a `4^k x 4^k` superoperator acting on `vec(ρ)`.
    pub fn apply_superop_matrix(
        &mut self,
        qubits: &[usize],
        mat: &Array2<Complex64>,
    ) -> EngineResult<()> {
        let vdim = 1usize << (2 * qubits.len());
        if mat.dim() != (vdim, vdim) {
            return Err(EngineError::DimensionMismatch {
                instruction: "superop".to_string(),
                expected: vdim * vdim,
                got: mat.len(),
            });
        }
        self.ensure_local("superop", qubits)?;
        self.store.apply_superop_matrix(qubits, &vectorize(mat));
        Ok(())
    }

    /// Apply the channel `ρ ↦ Σ K ρ K†` as one superoperator.
    pub fn apply_kraus(&mut self, qubits: &[usize], mats: &[Array2<Complex64>]) -> EngineResult<()> {
        if mats.is_empty() {
            return Err(EngineError::MissingParameter {
                instruction: "kraus".to_string(),
                what: "Kraus operators",
            });
        }
        let dim = 1usize << qubits.len();
        if let Some(bad) = mats.iter().find(|m| m.dim() != (dim, dim)) {
            return Err(EngineError::DimensionMismatch {
                instruction: "kraus".to_string(),
                expected: dim * dim,
                got: bad.len(),
            });
        }
        self.apply_superop_matrix(qubits, &kraus_superop(mats))
    }
}
