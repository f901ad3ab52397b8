//! Noise channel models and their instruction forms.
//!
//! Gate-level noise is described by a [`NoiseModel`] and lowered to the
//! instructions the engine executes: quantum channels become `kraus` ops,
//! readout errors become `roerror` ops acting on classical memory.

use ndarray::{Array2, array};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::{IrError, IrResult};
use crate::op::Op;

/// A single-qubit noise channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
#[non_exhaustive]
pub enum NoiseModel {
    /// With probability `p`, replaces the state with the maximally mixed
    /// state.
    Depolarizing {
        /// Error probability (0.0 to 1.0).
        p: f64,
    },

    /// Energy relaxation (T1 decay).
    AmplitudeDamping {
        /// Damping parameter (0.0 to 1.0).
        gamma: f64,
    },

    /// Dephasing without energy loss (T2 decay).
    PhaseDamping {
        /// Dephasing parameter (0.0 to 1.0).
        gamma: f64,
    },

    /// Flips |0⟩ ↔ |1⟩ with probability `p`.
    BitFlip {
        /// Flip probability (0.0 to 1.0).
        p: f64,
    },

    /// Applies Z with probability `p`.
    PhaseFlip {
        /// Flip probability (0.0 to 1.0).
        p: f64,
    },

    /// Measurement reports the wrong outcome with probability `p`.
    ReadoutError {
        /// Misclassification probability (0.0 to 1.0).
        p: f64,
    },
}

impl NoiseModel {
    /// Get a human-readable name for this noise model.
    pub fn name(&self) -> &str {
        match self {
            NoiseModel::Depolarizing { .. } => "depolarizing",
            NoiseModel::AmplitudeDamping { .. } => "amplitude_damping",
            NoiseModel::PhaseDamping { .. } => "phase_damping",
            NoiseModel::BitFlip { .. } => "bit_flip",
            NoiseModel::PhaseFlip { .. } => "phase_flip",
            NoiseModel::ReadoutError { .. } => "readout_error",
        }
    }

    /// Kraus operators of the channel, or `None` for readout errors.
    pub fn kraus_operators(&self) -> Option<Vec<Array2<Complex64>>> {
        let c = |re: f64| Complex64::new(re, 0.0);
        let zero = c(0.0);
        let ops = match *self {
            NoiseModel::Depolarizing { p } => {
                let a = c((1.0 - 0.75 * p).sqrt());
                let b = (p / 4.0).sqrt();
                vec![
                    array![[a, zero], [zero, a]],
                    array![[zero, c(b)], [c(b), zero]],
                    array![
                        [zero, Complex64::new(0.0, -b)],
                        [Complex64::new(0.0, b), zero]
                    ],
                    array![[c(b), zero], [zero, c(-b)]],
                ]
            }
            NoiseModel::AmplitudeDamping { gamma } => vec![
                array![[c(1.0), zero], [zero, c((1.0 - gamma).sqrt())]],
                array![[zero, c(gamma.sqrt())], [zero, zero]],
            ],
            NoiseModel::PhaseDamping { gamma } => vec![
                array![[c(1.0), zero], [zero, c((1.0 - gamma).sqrt())]],
                array![[zero, zero], [zero, c(gamma.sqrt())]],
            ],
            NoiseModel::BitFlip { p } => {
                let a = c((1.0 - p).sqrt());
                let b = c(p.sqrt());
                vec![array![[a, zero], [zero, a]], array![[zero, b], [b, zero]]]
            }
            NoiseModel::PhaseFlip { p } => {
                let a = c((1.0 - p).sqrt());
                let b = p.sqrt();
                vec![
                    array![[a, zero], [zero, a]],
                    array![[c(b), zero], [zero, c(-b)]],
                ]
            }
            NoiseModel::ReadoutError { .. } => return None,
        };
        Some(ops)
    }

    /// Assignment probabilities for a readout error: row `i` is the
    /// distribution of reported values when the true value is `i`.
    pub fn readout_probabilities(&self) -> Option<Vec<Vec<f64>>> {
        match *self {
            NoiseModel::ReadoutError { p } => Some(vec![vec![1.0 - p, p], vec![p, 1.0 - p]]),
            _ => None,
        }
    }

    /// Lower the model to a `kraus` instruction on `qubit`.
    pub fn to_kraus_op(&self, qubit: usize) -> IrResult<Op> {
        let mats = self
            .kraus_operators()
            .ok_or_else(|| IrError::NotAChannel(self.name().to_string()))?;
        Op::kraus([qubit], mats)
    }
}

impl std::fmt::Display for NoiseModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NoiseModel::Depolarizing { p } => write!(f, "depolarizing(p={:.4})", p),
            NoiseModel::AmplitudeDamping { gamma } => {
                write!(f, "amplitude_damping(γ={:.4})", gamma)
            }
            NoiseModel::PhaseDamping { gamma } => write!(f, "phase_damping(γ={:.4})", gamma),
            NoiseModel::BitFlip { p } => write!(f, "bit_flip(p={:.4})", p),
            NoiseModel::PhaseFlip { p } => write!(f, "phase_flip(p={:.4})", p),
            NoiseModel::ReadoutError { p } => write!(f, "readout_error(p={:.4})", p),
        }
    }
}

impl Op {
    /// Lower a noise model acting on `qubit`.
    ///
    /// Readout errors act on classical memory bit `memory`; every other model
    /// becomes a Kraus channel on the qubit.
    pub fn noise(model: &NoiseModel, qubit: usize, memory: usize) -> IrResult<Op> {
        match model.readout_probabilities() {
            Some(probs) => Ok(Op::roerror([memory], probs)),
            None => model.to_kraus_op(qubit),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::op::OpType;

    /// Σ K†K for a set of 2x2 Kraus operators.
    fn completeness(ops: &[Array2<Complex64>]) -> Array2<Complex64> {
        let mut sum = Array2::<Complex64>::zeros((2, 2));
        for k in ops {
            let kdag = k.t().mapv(|z| z.conj());
            sum = sum + kdag.dot(k);
        }
        sum
    }

    #[test]
    fn test_noise_model_names() {
        assert_eq!(NoiseModel::Depolarizing { p: 0.01 }.name(), "depolarizing");
        assert_eq!(
            NoiseModel::AmplitudeDamping { gamma: 0.02 }.name(),
            "amplitude_damping"
        );
        assert_eq!(NoiseModel::ReadoutError { p: 0.05 }.name(), "readout_error");
    }

    #[test]
    fn test_noise_model_display() {
        let m = NoiseModel::Depolarizing { p: 0.03 };
        assert_eq!(format!("{}", m), "depolarizing(p=0.0300)");
    }

    #[test]
    fn test_kraus_sets_are_trace_preserving() {
        let models = [
            NoiseModel::Depolarizing { p: 0.3 },
            NoiseModel::AmplitudeDamping { gamma: 0.2 },
            NoiseModel::PhaseDamping { gamma: 0.7 },
            NoiseModel::BitFlip { p: 0.1 },
            NoiseModel::PhaseFlip { p: 0.4 },
        ];
        for model in &models {
            let ops = model.kraus_operators().unwrap();
            let sum = completeness(&ops);
            for ((i, j), value) in sum.indexed_iter() {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!(
                    (value - Complex64::new(expected, 0.0)).norm() < 1e-12,
                    "{model}: entry ({i},{j}) = {value}"
                );
            }
        }
    }

    #[test]
    fn test_lowering() {
        let op = Op::noise(&NoiseModel::BitFlip { p: 0.1 }, 2, 0).unwrap();
        assert_eq!(op.op_type, OpType::Kraus);
        assert_eq!(op.qubits, vec![2]);
        assert_eq!(op.mats.len(), 2);

        let ro = Op::noise(&NoiseModel::ReadoutError { p: 0.1 }, 2, 5).unwrap();
        assert_eq!(ro.op_type, OpType::Roerror);
        assert_eq!(ro.memory, vec![5]);
        assert_eq!(ro.probs[1], vec![0.1, 0.9]);

        let err = NoiseModel::ReadoutError { p: 0.1 }.to_kraus_op(0);
        assert!(matches!(err, Err(IrError::NotAChannel(_))));
    }
}
