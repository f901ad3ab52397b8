//! Partial trace.

use ndarray::Array2;
use num_complex::Complex64;
use rayon::prelude::*;

use crate::error::EngineResult;
use crate::linalg::devectorize;
use crate::state::DensityMatrixState;
use crate::store::DensityMatrixBackend;
use crate::store::indexing::{index0, indexes, sorted};

impl<B: DensityMatrixBackend> DensityMatrixState<B> {
    /// Density matrix of `qubits` with every other qubit traced out.
    ///
    /// Bit `j` of the row and column index corresponds to `qubits[j]`. The
    /// full register in ascending order returns the state itself, moved out
    /// when `final_op` is set.
    pub fn reduced_density_matrix(
        &mut self,
        qubits: &[usize],
        final_op: bool,
    ) -> EngineResult<Array2<Complex64>> {
        self.ensure_full_register("save_densmat")?;
        if qubits.is_empty() {
            return Ok(Array2::from_elem(
                (1, 1),
                Complex64::new(self.store.trace(), 0.0),
            ));
        }
        let n = self.num_qubits;
        if qubits.len() == n && qubits.iter().enumerate().all(|(i, &q)| i == q) {
            return if final_op {
                self.store.move_to_matrix()
            } else {
                Ok(self.store.copy_to_matrix())
            };
        }

        let dim = 1usize << qubits.len();
        let vdim = dim * dim;
        let end = 1u64 << (n - qubits.len());
        let shift = end + 1;

        // row qubits followed by the matching column qubits
        let superop_qubits: Vec<usize> = qubits
            .iter()
            .copied()
            .chain(qubits.iter().map(|q| q + n))
            .collect();
        let superop_sorted = sorted(&superop_qubits);
        let offsets = indexes(&superop_qubits, &superop_sorted, 0);
        let bases: Vec<u64> = (0..end)
            .map(|t| index0(&superop_sorted, t * shift))
            .collect();

        let data = self.store.data();
        let entry = |i: usize| -> Complex64 {
            bases
                .iter()
                .map(|&base| data[(base | offsets[i]) as usize])
                .sum()
        };
        let reduced: Vec<Complex64> = if self.parallelism.enabled_for(data.len()) {
            self.parallelism
                .install(|| (0..vdim).into_par_iter().map(entry).collect())
        } else {
            (0..vdim).map(entry).collect()
        };
        Ok(devectorize(&reduced, dim))
    }
}

#[cfg(test)]
mod tests {
    use crate::state::DensityMatrixState;
    use crate::store::DensityMatrixBackend;
    use densim_ir::Op;
    use num_complex::Complex64;

    fn approx_eq(a: Complex64, b: f64) -> bool {
        (a - Complex64::new(b, 0.0)).norm() < 1e-10
    }

    #[test]
    fn test_bell_reduces_to_mixed() {
        let mut state = DensityMatrixState::new();
        state.initialize_qreg(2);
        state.apply_gate(&Op::gate("h", [0], [])).unwrap();
        state.apply_gate(&Op::gate("cx", [0, 1], [])).unwrap();
        for qubit in [0, 1] {
            let rho = state.reduced_density_matrix(&[qubit], false).unwrap();
            assert!(approx_eq(rho[[0, 0]], 0.5));
            assert!(approx_eq(rho[[1, 1]], 0.5));
            assert!(approx_eq(rho[[0, 1]], 0.0));
        }
    }

    #[test]
    fn test_empty_and_full() {
        let mut state = DensityMatrixState::new();
        state.initialize_qreg(2);
        state.apply_gate(&Op::gate("h", [1], [])).unwrap();
        let scalar = state.reduced_density_matrix(&[], false).unwrap();
        assert_eq!(scalar.dim(), (1, 1));
        assert!(approx_eq(scalar[[0, 0]], 1.0));

        let full = state.reduced_density_matrix(&[0, 1], false).unwrap();
        assert_eq!(full, state.store().copy_to_matrix());
    }

    #[test]
    fn test_qubit_order_is_respected() {
        let mut state = DensityMatrixState::new();
        state.initialize_qreg(3);
        state.apply_gate(&Op::gate("x", [2], [])).unwrap();
        state.apply_gate(&Op::gate("h", [1], [])).unwrap();
        // qubits [2, 0]: bit 0 <- qubit 2 (= 1), bit 1 <- qubit 0 (= 0)
        let rho = state.reduced_density_matrix(&[2, 0], false).unwrap();
        assert!(approx_eq(rho[[1, 1]], 1.0));
        let rho = state.reduced_density_matrix(&[1, 2], false).unwrap();
        // qubit 1 in |+⟩, qubit 2 in |1⟩: rows/cols 0b10 and 0b11
        for (r, c) in [(2, 2), (2, 3), (3, 2), (3, 3)] {
            assert!(approx_eq(rho[[r, c]], 0.5));
        }
    }
}
