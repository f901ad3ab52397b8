//! Bit-mask form of Pauli strings.

use num_complex::Complex64;

use crate::error::{EngineError, EngineResult};

/// A Pauli string as X/Z bit masks.
///
/// `P |s⟩ = i^{num_y} (-1)^{|s & z|} |s ^ x⟩`, where Y contributes to both
/// masks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PauliMasks {
    /// Bits flipped by X and Y factors.
    pub x: u64,
    /// Bits picking up a sign from Z and Y factors.
    pub z: u64,
    /// Number of Y factors.
    pub num_y: usize,
}

impl PauliMasks {
    /// Parse `pauli` over `qubits`; the last character acts on `qubits[0]`.
    pub fn new(qubits: &[usize], pauli: &str) -> EngineResult<Self> {
        if pauli.len() != qubits.len() {
            return Err(EngineError::DimensionMismatch {
                instruction: format!("pauli '{pauli}'"),
                expected: qubits.len(),
                got: pauli.len(),
            });
        }
        let mut masks = Self {
            x: 0,
            z: 0,
            num_y: 0,
        };
        for (&q, ch) in qubits.iter().zip(pauli.chars().rev()) {
            let bit = 1u64 << q;
            match ch {
                'I' => {}
                'X' => masks.x |= bit,
                'Z' => masks.z |= bit,
                'Y' => {
                    masks.x |= bit;
                    masks.z |= bit;
                    masks.num_y += 1;
                }
                other => {
                    return Err(EngineError::InvalidInstruction(format!(
                        "pauli (invalid character '{other}')"
                    )));
                }
            }
        }
        Ok(masks)
    }

    /// `i^{num_y}`.
    pub fn global_phase(&self) -> Complex64 {
        match self.num_y % 4 {
            0 => Complex64::new(1.0, 0.0),
            1 => Complex64::new(0.0, 1.0),
            2 => Complex64::new(-1.0, 0.0),
            _ => Complex64::new(0.0, -1.0),
        }
    }

    /// Phase picked up by basis state `index`, including the global phase.
    #[inline]
    pub fn phase(&self, index: u64) -> Complex64 {
        if (index & self.z).count_ones() % 2 == 1 {
            -self.global_phase()
        } else {
            self.global_phase()
        }
    }
}
