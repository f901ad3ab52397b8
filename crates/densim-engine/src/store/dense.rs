//! In-memory CPU density matrix.

use ndarray::{Array2, ShapeBuilder};
use num_complex::Complex64;
use rayon::prelude::*;
use tracing::debug;

use super::DensityMatrixBackend;
use super::indexing::{extract_bits, indexes, qubit_mask, sorted};
use super::pauli::PauliMasks;
use crate::config::Parallelism;
use crate::error::{EngineError, EngineResult};
use crate::linalg::{outer_product, reset_superop, tensor};

const ZERO: Complex64 = Complex64::new(0.0, 0.0);
const ONE: Complex64 = Complex64::new(1.0, 0.0);
const I: Complex64 = Complex64::new(0.0, 1.0);

/// A vectorized density matrix held in one contiguous buffer.
///
/// Entry `row + col * 2^n` holds `ρ[row, col]`. When the register is split
/// into chunks the buffer holds one chunk and `chunk_index` locates it.
#[derive(Debug, Clone)]
pub struct DensityMatrix {
    num_qubits: usize,
    chunk_index: u64,
    data: Vec<Complex64>,
    parallelism: Parallelism,
}

impl DensityMatrix {
    /// Create |0…0⟩⟨0…0| on `num_qubits` qubits.
    pub fn new(num_qubits: usize) -> Self {
        let mut dm = Self {
            num_qubits,
            chunk_index: 0,
            data: Vec::new(),
            parallelism: Parallelism::serial(),
        };
        dm.initialize();
        dm
    }

    /// Wrap the buffer of one chunk of a larger register.
    pub fn from_chunk(
        num_qubits: usize,
        chunk_index: u64,
        data: Vec<Complex64>,
    ) -> EngineResult<Self> {
        let expected = 1usize << (2 * num_qubits);
        if data.len() != expected {
            return Err(EngineError::DimensionMismatch {
                instruction: "chunk".to_string(),
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            num_qubits,
            chunk_index,
            data,
            parallelism: Parallelism::serial(),
        })
    }

    /// Row (and column) dimension `2^n`.
    #[inline]
    pub fn dim(&self) -> usize {
        1 << self.num_qubits
    }

    /// Superoperator qubits of `qubits`: row bits followed by column bits.
    fn superop_qubits(&self, qubits: &[usize]) -> Vec<usize> {
        qubits
            .iter()
            .copied()
            .chain(qubits.iter().map(|q| q + self.num_qubits))
            .collect()
    }

    // =========================================================================
    // Statevector kernels over the superoperator qubits
    // =========================================================================

    /// Dense `2^k x 2^k` column-major matrix on superoperator qubits.
    fn apply_matrix_sv(&mut self, qubits: &[usize], mat: &[Complex64]) {
        let dim = 1usize << qubits.len();
        let qubits_sorted = sorted(qubits);
        let blocks = (self.data.len() >> qubits.len()) as u64;
        let mut cache = vec![ZERO; dim];
        for k in 0..blocks {
            let inds = indexes(qubits, &qubits_sorted, k);
            for (slot, &idx) in cache.iter_mut().zip(&inds) {
                *slot = self.data[idx as usize];
                self.data[idx as usize] = ZERO;
            }
            for (i, &idx) in inds.iter().enumerate() {
                let mut acc = ZERO;
                for (j, amp) in cache.iter().enumerate() {
                    acc += mat[i + dim * j] * amp;
                }
                self.data[idx as usize] = acc;
            }
        }
    }

    fn apply_mcswap_sv(&mut self, qubits: &[usize]) {
        let n = qubits.len();
        if n < 2 {
            return;
        }
        let a = 1usize << qubits[n - 2];
        let b = 1usize << qubits[n - 1];
        let ctrl = qubit_mask(&qubits[..n - 2]) as usize;
        for i in 0..self.data.len() {
            if i & ctrl == ctrl && i & a != 0 && i & b == 0 {
                self.data.swap(i, i ^ a ^ b);
            }
        }
    }
}

impl DensityMatrixBackend for DensityMatrix {
    fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    fn chunk_index(&self) -> u64 {
        self.chunk_index
    }

    fn set_parallelism(&mut self, parallelism: Parallelism) {
        self.parallelism = parallelism;
    }

    fn set_num_qubits(&mut self, num_qubits: usize) {
        self.num_qubits = num_qubits;
        self.data = vec![ZERO; 1 << (2 * num_qubits)];
    }

    fn initialize(&mut self) {
        self.data = vec![ZERO; 1 << (2 * self.num_qubits)];
        if self.chunk_index == 0 {
            self.data[0] = ONE;
        }
        debug!(
            "Initialized density matrix: {} qubits, chunk {}",
            self.num_qubits, self.chunk_index
        );
    }

    fn initialize_from_vector(&mut self, vec: &[Complex64]) -> EngineResult<()> {
        let dim = self.dim();
        if vec.len() == dim {
            self.data = outer_product(vec);
        } else if vec.len() == dim * dim {
            self.data = vec.to_vec();
        } else {
            return Err(EngineError::DimensionMismatch {
                instruction: "initialize".to_string(),
                expected: dim * dim,
                got: vec.len(),
            });
        }
        Ok(())
    }

    fn initialize_from_matrix(&mut self, mat: &Array2<Complex64>) -> EngineResult<()> {
        let dim = self.dim();
        if mat.dim() != (dim, dim) {
            return Err(EngineError::DimensionMismatch {
                instruction: "initialize".to_string(),
                expected: dim * dim,
                got: mat.len(),
            });
        }
        self.data = mat.t().iter().copied().collect();
        Ok(())
    }

    fn trace(&self) -> f64 {
        (0..self.dim() as u64).map(|i| self.probability(i)).sum()
    }

    fn probability(&self, index: u64) -> f64 {
        self.data[index as usize * (self.dim() + 1)].re
    }

    fn probabilities(&self) -> Vec<f64> {
        (0..self.dim() as u64).map(|i| self.probability(i)).collect()
    }

    fn data(&self) -> &[Complex64] {
        &self.data
    }

    fn apply_unitary_matrix(&mut self, qubits: &[usize], mat: &[Complex64]) {
        let conj: Vec<_> = mat.iter().map(|z| z.conj()).collect();
        self.apply_matrix_sv(qubits, mat);
        let shifted: Vec<_> = qubits.iter().map(|q| q + self.num_qubits).collect();
        self.apply_matrix_sv(&shifted, &conj);
    }

    fn apply_diagonal_unitary_matrix(&mut self, qubits: &[usize], diag: &[Complex64]) {
        let conj: Vec<_> = diag.iter().map(|z| z.conj()).collect();
        let superop = tensor(&conj, diag);
        let sq = self.superop_qubits(qubits);
        self.apply_diagonal_matrix(&sq, &superop);
    }

    fn apply_diagonal_matrix(&mut self, qubits: &[usize], diag: &[Complex64]) {
        let kernel = |(i, amp): (usize, &mut Complex64)| {
            *amp *= diag[extract_bits(i as u64, qubits)];
        };
        if self.parallelism.enabled_for(self.data.len()) {
            let data = &mut self.data;
            self.parallelism
                .install(|| data.par_iter_mut().enumerate().for_each(kernel));
        } else {
            self.data.iter_mut().enumerate().for_each(kernel);
        }
    }

    fn apply_superop_matrix(&mut self, qubits: &[usize], mat: &[Complex64]) {
        let sq = self.superop_qubits(qubits);
        self.apply_matrix_sv(&sq, mat);
    }

    fn apply_x(&mut self, qubit: usize) {
        self.apply_mcx(&[qubit]);
        self.apply_mcx(&[qubit + self.num_qubits]);
    }

    fn apply_y(&mut self, qubit: usize) {
        self.apply_mcy(&[qubit], false);
        self.apply_mcy(&[qubit + self.num_qubits], true);
    }

    fn apply_cnot(&mut self, control: usize, target: usize) {
        let n = self.num_qubits;
        self.apply_mcx(&[control, target]);
        self.apply_mcx(&[control + n, target + n]);
    }

    fn apply_cy(&mut self, control: usize, target: usize) {
        let n = self.num_qubits;
        self.apply_mcy(&[control, target], false);
        self.apply_mcy(&[control + n, target + n], true);
    }

    fn apply_cphase(&mut self, q0: usize, q1: usize, phase: Complex64) {
        let n = self.num_qubits;
        self.apply_mcphase(&[q0, q1], phase);
        self.apply_mcphase(&[q0 + n, q1 + n], phase.conj());
    }

    fn apply_swap(&mut self, q0: usize, q1: usize) {
        let n = self.num_qubits;
        self.apply_mcswap_sv(&[q0, q1]);
        self.apply_mcswap_sv(&[q0 + n, q1 + n]);
    }

    fn apply_toffoli(&mut self, control0: usize, control1: usize, target: usize) {
        let n = self.num_qubits;
        self.apply_mcx(&[control0, control1, target]);
        self.apply_mcx(&[control0 + n, control1 + n, target + n]);
    }

    fn apply_mcx(&mut self, qubits: &[usize]) {
        let Some((&target, controls)) = qubits.split_last() else {
            return;
        };
        let tmask = 1usize << target;
        let ctrl = qubit_mask(controls) as usize;
        for i in 0..self.data.len() {
            if i & ctrl == ctrl && i & tmask == 0 {
                self.data.swap(i, i | tmask);
            }
        }
    }

    fn apply_mcy(&mut self, qubits: &[usize], conj: bool) {
        let Some((&target, controls)) = qubits.split_last() else {
            return;
        };
        let tmask = 1usize << target;
        let ctrl = qubit_mask(controls) as usize;
        let i_val = if conj { -I } else { I };
        for i in 0..self.data.len() {
            if i & ctrl == ctrl && i & tmask == 0 {
                let j = i | tmask;
                let tmp = self.data[i];
                self.data[i] = -i_val * self.data[j];
                self.data[j] = i_val * tmp;
            }
        }
    }

    fn apply_mcphase(&mut self, qubits: &[usize], phase: Complex64) {
        let mask = qubit_mask(qubits) as usize;
        let kernel = |(i, amp): (usize, &mut Complex64)| {
            if i & mask == mask {
                *amp *= phase;
            }
        };
        if self.parallelism.enabled_for(self.data.len()) {
            let data = &mut self.data;
            self.parallelism
                .install(|| data.par_iter_mut().enumerate().for_each(kernel));
        } else {
            self.data.iter_mut().enumerate().for_each(kernel);
        }
    }

    fn apply_pauli(
        &mut self,
        qubits: &[usize],
        pauli: &str,
        coeff: Complex64,
    ) -> EngineResult<()> {
        let masks = PauliMasks::new(qubits, pauli)?;
        if masks.x == 0 {
            for (i, amp) in self.data.iter_mut().enumerate() {
                *amp *= coeff * masks.phase(i as u64);
            }
            return Ok(());
        }
        // one representative per swapped pair: the highest flipped bit is clear
        let pivot = 1u64 << (63 - masks.x.leading_zeros());
        for i in 0..self.data.len() as u64 {
            if i & pivot == 0 {
                let j = i ^ masks.x;
                let (a, b) = (self.data[i as usize], self.data[j as usize]);
                self.data[j as usize] = coeff * masks.phase(i) * a;
                self.data[i as usize] = coeff * masks.phase(j) * b;
            }
        }
        Ok(())
    }

    fn apply_reset(&mut self, qubits: &[usize]) {
        let superop = reset_superop(qubits.len());
        self.apply_superop_matrix(qubits, &superop);
    }

    fn sample_measure(&self, rnds: &[f64]) -> Vec<u64> {
        let probs = self.probabilities();
        // variates past a drifted total fall on the last possible outcome
        let last = probs
            .iter()
            .rposition(|&p| p > 0.0)
            .unwrap_or(probs.len().saturating_sub(1));
        let mut cumulative = Vec::with_capacity(probs.len());
        let mut acc = 0.0;
        for p in probs {
            acc += p;
            cumulative.push(acc);
        }
        rnds.iter()
            .map(|&r| cumulative.partition_point(|&c| c <= r).min(last) as u64)
            .collect()
    }

    fn expval_pauli(&self, qubits: &[usize], pauli: &str) -> EngineResult<f64> {
        let masks = PauliMasks::new(qubits, pauli)?;
        let dim = self.dim() as u64;
        let term = |s: u64| -> f64 {
            let col = s ^ masks.x;
            (masks.phase(s) * self.data[(s + col * dim) as usize]).re
        };
        let value: f64 = if self.parallelism.enabled_for(dim as usize) {
            self.parallelism
                .install(|| (0..dim).into_par_iter().map(term).sum())
        } else {
            (0..dim).map(term).sum()
        };
        Ok(value)
    }

    fn move_to_matrix(&mut self) -> EngineResult<Array2<Complex64>> {
        let dim = self.dim();
        let data = std::mem::take(&mut self.data);
        let len = data.len();
        Array2::from_shape_vec((dim, dim).f(), data).map_err(|_| EngineError::DimensionMismatch {
            instruction: "save_state".to_string(),
            expected: dim * dim,
            got: len,
        })
    }

    fn copy_to_matrix(&self) -> Array2<Complex64> {
        let dim = self.dim();
        Array2::from_shape_fn((dim, dim), |(r, c)| self.data[r + c * dim])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::vectorize;
    use crate::matrices;
    use std::f64::consts::FRAC_1_SQRT_2;

    fn approx_eq(a: Complex64, b: Complex64) -> bool {
        (a - b).norm() < 1e-10
    }

    fn entry(dm: &DensityMatrix, row: usize, col: usize) -> Complex64 {
        dm.data()[row + col * dm.dim()]
    }

    #[test]
    fn test_initial_state() {
        let dm = DensityMatrix::new(2);
        assert_eq!(dm.data().len(), 16);
        assert!((dm.trace() - 1.0).abs() < 1e-12);
        assert_eq!(dm.probabilities(), vec![1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_chunk_initialization() {
        let mut chunk = DensityMatrix::from_chunk(1, 3, vec![ONE; 4]).unwrap();
        chunk.initialize();
        assert!(chunk.data().iter().all(|z| *z == ZERO));
        assert!(DensityMatrix::from_chunk(1, 0, vec![ONE; 3]).is_err());
    }

    #[test]
    fn test_x_flips_population() {
        let mut dm = DensityMatrix::new(2);
        dm.apply_x(1);
        assert_eq!(dm.probabilities(), vec![0.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_hadamard_coherence() {
        let mut dm = DensityMatrix::new(1);
        dm.apply_unitary_matrix(&[0], &vectorize(&matrices::h()));
        for (r, c) in [(0, 0), (0, 1), (1, 0), (1, 1)] {
            assert!(approx_eq(entry(&dm, r, c), Complex64::new(0.5, 0.0)));
        }
    }

    #[test]
    fn test_y_matches_dense_matrix() {
        let y = ndarray::array![[ZERO, -I], [I, ZERO]];
        let mut a = DensityMatrix::new(2);
        let mut b = DensityMatrix::new(2);
        for dm in [&mut a, &mut b] {
            dm.apply_unitary_matrix(&[0], &vectorize(&matrices::h()));
        }
        a.apply_y(0);
        b.apply_unitary_matrix(&[0], &vectorize(&y));
        for (x, y) in a.data().iter().zip(b.data()) {
            assert!(approx_eq(*x, *y));
        }
    }

    #[test]
    fn test_cphase_is_two_sided() {
        let mut dm = DensityMatrix::new(2);
        let h = vectorize(&matrices::h());
        dm.apply_unitary_matrix(&[0], &h);
        dm.apply_unitary_matrix(&[1], &h);
        dm.apply_cphase(0, 1, -ONE);
        // ρ[3,0] = -1/4 and ρ[0,3] = -1/4; diagonal untouched
        assert!(approx_eq(entry(&dm, 3, 0), Complex64::new(-0.25, 0.0)));
        assert!(approx_eq(entry(&dm, 0, 3), Complex64::new(-0.25, 0.0)));
        assert!(approx_eq(entry(&dm, 3, 3), Complex64::new(0.25, 0.0)));
    }

    #[test]
    fn test_swap_and_toffoli() {
        let mut dm = DensityMatrix::new(3);
        dm.apply_x(0);
        dm.apply_swap(0, 2);
        assert!((dm.probability(0b100) - 1.0).abs() < 1e-12);
        dm.apply_x(1);
        dm.apply_toffoli(2, 1, 0);
        assert!((dm.probability(0b111) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_reset_superop() {
        let mut dm = DensityMatrix::new(1);
        dm.apply_unitary_matrix(&[0], &vectorize(&matrices::h()));
        dm.apply_reset(&[0]);
        assert!(approx_eq(entry(&dm, 0, 0), ONE));
        assert!(approx_eq(entry(&dm, 0, 1), ZERO));
        assert!(approx_eq(entry(&dm, 1, 1), ZERO));
    }

    #[test]
    fn test_sample_measure_cumulative() {
        let mut dm = DensityMatrix::new(1);
        dm.apply_unitary_matrix(&[0], &vectorize(&matrices::h()));
        assert_eq!(dm.sample_measure(&[0.1, 0.49, 0.51, 0.99]), vec![0, 0, 1, 1]);
    }

    #[test]
    fn test_sample_measure_drift_never_hits_impossible_outcome() {
        // diagonal sums to 0.8 and the upper half of the basis is empty
        let mut data = vec![ZERO; 16];
        data[0] = Complex64::new(0.5, 0.0);
        data[5] = Complex64::new(0.3, 0.0);
        let dm = DensityMatrix::from_chunk(2, 0, data).unwrap();
        assert_eq!(dm.sample_measure(&[0.2, 0.6, 0.9, 0.999]), vec![0, 1, 1, 1]);
    }

    #[test]
    fn test_expval_pauli() {
        let mut dm = DensityMatrix::new(2);
        let h = vectorize(&matrices::h());
        dm.apply_unitary_matrix(&[0], &h);
        assert!((dm.expval_pauli(&[0], "X").unwrap() - 1.0).abs() < 1e-10);
        assert!(dm.expval_pauli(&[0], "Z").unwrap().abs() < 1e-10);
        assert!((dm.expval_pauli(&[0, 1], "ZI").unwrap() - 1.0).abs() < 1e-10);

        // |+i⟩ has ⟨Y⟩ = 1
        let mut dm = DensityMatrix::new(1);
        let h = FRAC_1_SQRT_2;
        dm.initialize_from_vector(&[Complex64::new(h, 0.0), Complex64::new(0.0, h)])
            .unwrap();
        assert!((dm.expval_pauli(&[0], "Y").unwrap() - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_move_to_matrix() {
        let mut dm = DensityMatrix::new(1);
        dm.apply_x(0);
        let mat = dm.move_to_matrix().unwrap();
        assert_eq!(mat[[1, 1]], ONE);
        assert!(dm.data().is_empty());
    }

    #[test]
    fn test_required_memory() {
        assert_eq!(DensityMatrix::required_memory_mb(1), 1);
        assert_eq!(DensityMatrix::required_memory_mb(8), 1);
        assert_eq!(DensityMatrix::required_memory_mb(10), 16);
    }
}
