//! Measurement, collapse and reset.

use ndarray::Array2;
use num_complex::Complex64;
use tracing::trace;

use crate::error::EngineResult;
use crate::rng::RngEngine;
use crate::state::DensityMatrixState;
use crate::store::DensityMatrixBackend;
use crate::store::indexing::extract_bits;

impl<B: DensityMatrixBackend> DensityMatrixState<B> {
    /// Outcome probabilities for measuring `qubits`, `qubits[0]` being the
    /// least significant outcome bit.
    pub fn measure_probs(&self, qubits: &[usize]) -> EngineResult<Vec<f64>> {
        self.ensure_full_register("measure")?;
        let diag = self.store.probabilities();
        if qubits.len() == self.num_qubits && qubits.iter().enumerate().all(|(i, &q)| i == q) {
            return Ok(diag);
        }
        let mut probs = vec![0.0; 1 << qubits.len()];
        for (i, p) in diag.into_iter().enumerate() {
            probs[extract_bits(i as u64, qubits)] += p;
        }
        Ok(probs)
    }

    /// Draw an outcome for `qubits`; returns it with its probability.
    pub fn sample_measure_with_prob(
        &self,
        qubits: &[usize],
        rng: &mut RngEngine,
    ) -> EngineResult<(u64, f64)> {
        let probs = self.measure_probs(qubits)?;
        let outcome = rng.rand_int(&probs)?;
        Ok((outcome, probs[outcome as usize]))
    }

    /// Project `qubits` onto `meas_state` (renormalizing by `meas_prob`),
    /// then move them to `final_state`.
    pub fn measure_reset_update(
        &mut self,
        qubits: &[usize],
        final_state: u64,
        meas_state: u64,
        meas_prob: f64,
    ) -> EngineResult<()> {
        let dim = 1usize << qubits.len();
        let (meas, fin) = (meas_state as usize, final_state as usize);
        let mut mdiag = vec![Complex64::new(0.0, 0.0); dim];
        mdiag[meas] = Complex64::new(1.0 / meas_prob.sqrt(), 0.0);
        self.apply_diagonal_unitary_matrix(qubits, &mdiag)?;

        if fin != meas {
            if qubits.len() == 1 {
                self.store.apply_x(qubits[0]);
            } else {
                // permutation exchanging the measured and final basis states
                let mut perm = Array2::<Complex64>::zeros((dim, dim));
                for i in (0..dim).filter(|&i| i != meas && i != fin) {
                    perm[[i, i]] = Complex64::new(1.0, 0.0);
                }
                perm[[fin, meas]] = Complex64::new(1.0, 0.0);
                perm[[meas, fin]] = Complex64::new(1.0, 0.0);
                self.apply_matrix(qubits, &perm)?;
            }
        }
        Ok(())
    }

    /// Measure `qubits`, collapse the state and record the outcome.
    pub fn apply_measure(
        &mut self,
        qubits: &[usize],
        memory: &[usize],
        registers: &[usize],
        rng: &mut RngEngine,
    ) -> EngineResult<()> {
        let (outcome, prob) = self.sample_measure_with_prob(qubits, rng)?;
        trace!("Measured {:?} -> {} (p = {:.6})", qubits, outcome, prob);
        self.measure_reset_update(qubits, outcome, outcome, prob)?;
        self.creg.store_measure(outcome, memory, registers);
        Ok(())
    }

    /// Reset `qubits` to |0⟩ without measuring.
    pub fn apply_reset(&mut self, qubits: &[usize]) -> EngineResult<()> {
        self.ensure_local("reset", qubits)?;
        self.store.apply_reset(qubits);
        Ok(())
    }

    /// Sample `shots` outcomes of `qubits` without changing the state.
    pub fn sample_measure(
        &self,
        qubits: &[usize],
        shots: usize,
        rng: &mut RngEngine,
    ) -> EngineResult<Vec<u64>> {
        self.ensure_full_register("sample_measure")?;
        let rnds: Vec<f64> = (0..shots).map(|_| rng.rand()).collect();
        Ok(self
            .store
            .sample_measure(&rnds)
            .into_iter()
            .map(|sample| extract_bits(sample, qubits) as u64)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use crate::rng::RngEngine;
    use crate::state::DensityMatrixState;
    use crate::store::DensityMatrixBackend;
    use densim_ir::Op;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-10
    }

    #[test]
    fn test_measure_probs_subset() {
        let mut state = DensityMatrixState::new();
        state.initialize_qreg(3);
        state.apply_gate(&Op::gate("x", [2], [])).unwrap();
        state.apply_gate(&Op::gate("h", [0], [])).unwrap();
        let probs = state.measure_probs(&[2, 1]).unwrap();
        assert_eq!(probs.len(), 4);
        assert!(approx_eq(probs[0b01], 1.0));
        let probs = state.measure_probs(&[0]).unwrap();
        assert!(approx_eq(probs[0], 0.5) && approx_eq(probs[1], 0.5));
    }

    #[test]
    fn test_measure_collapses() {
        let mut state = DensityMatrixState::new();
        state.initialize_qreg(2);
        state.initialize_creg(2, 2);
        state.apply_gate(&Op::gate("h", [0], [])).unwrap();
        state.apply_gate(&Op::gate("cx", [0, 1], [])).unwrap();
        let mut rng = RngEngine::new(5);
        state.apply_measure(&[0], &[0], &[0], &mut rng).unwrap();

        let outcome = usize::from(state.creg().memory()[0]);
        let probs = state.measure_probs(&[0, 1]).unwrap();
        let expected = if outcome == 1 { 0b11 } else { 0b00 };
        assert!(approx_eq(probs[expected], 1.0));
        assert!(approx_eq(state.store().trace(), 1.0));
        assert_eq!(state.creg().register()[0], outcome == 1);
    }

    #[test]
    fn test_measure_reset_update_moves_to_final() {
        let mut state = DensityMatrixState::new();
        state.initialize_qreg(2);
        state.apply_gate(&Op::gate("x", [0], [])).unwrap();
        // measured |01⟩ with certainty, move to |10⟩
        state.measure_reset_update(&[0, 1], 0b10, 0b01, 1.0).unwrap();
        assert!(approx_eq(state.store().probability(0b10), 1.0));

        state.measure_reset_update(&[1], 0, 1, 1.0).unwrap();
        assert!(approx_eq(state.store().probability(0), 1.0));
    }

    #[test]
    fn test_reset_clears_mixture() {
        let mut state = DensityMatrixState::new();
        state.initialize_qreg(2);
        state.apply_gate(&Op::gate("h", [1], [])).unwrap();
        state.apply_reset(&[1]).unwrap();
        assert!(approx_eq(state.store().probability(0), 1.0));
        assert!(approx_eq(state.store().trace(), 1.0));
    }

    #[test]
    fn test_sample_measure_does_not_collapse() {
        let mut state = DensityMatrixState::new();
        state.initialize_qreg(2);
        state.apply_gate(&Op::gate("x", [1], [])).unwrap();
        state.apply_gate(&Op::gate("h", [0], [])).unwrap();
        let before = state.store().vector();
        let mut rng = RngEngine::new(9);
        let samples = state.sample_measure(&[1], 50, &mut rng).unwrap();
        assert!(samples.iter().all(|&s| s == 1));
        let samples = state.sample_measure(&[0, 1], 200, &mut rng).unwrap();
        assert!(samples.iter().all(|&s| s == 0b10 || s == 0b11));
        assert!(samples.contains(&0b10) && samples.contains(&0b11));
        assert_eq!(before, state.store().vector());
    }
}
