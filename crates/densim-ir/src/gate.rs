//! Gate variants understood by the density-matrix engine.

use std::sync::LazyLock;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{IrError, IrResult};

/// Gates with known semantics.
///
/// Parameters are not stored on the variant: they travel with the
/// instruction (`Op::params`, `Op::string_params`) and are read when the gate
/// is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gate {
    // Single-qubit Pauli gates
    /// Identity gate (also used for `delay`).
    Id,
    /// Pauli-X gate.
    X,
    /// Pauli-Y gate.
    Y,
    /// Pauli-Z gate.
    Z,

    // Single-qubit Clifford gates
    /// Hadamard gate.
    H,
    /// S gate (sqrt(Z)).
    S,
    /// S-dagger gate.
    Sdg,
    /// T gate (fourth root of Z).
    T,
    /// T-dagger gate.
    Tdg,
    /// sqrt(X) gate.
    SX,
    /// sqrt(X)-dagger gate.
    SXdg,

    // Single-qubit rotation gates
    /// Rotation by θ around the axis cos(φ)X + sin(φ)Y.
    R,
    /// Rotation around X axis.
    Rx,
    /// Rotation around Y axis.
    Ry,
    /// Rotation around Z axis.
    Rz,

    // Waltz gates
    /// Phase gate U1(λ).
    U1,
    /// U2(φ, λ) = U3(π/2, φ, λ).
    U2,
    /// Universal single-qubit gate U3(θ, φ, λ).
    U3,

    // Two-qubit gates
    /// Controlled-X (CNOT) gate.
    CX,
    /// Controlled-Y gate.
    CY,
    /// Controlled-Z gate.
    CZ,
    /// Controlled phase gate.
    CP,
    /// SWAP gate.
    Swap,
    /// XX rotation gate.
    Rxx,
    /// YY rotation gate.
    Ryy,
    /// ZZ rotation gate.
    Rzz,
    /// ZX rotation gate.
    Rzx,
    /// Echoed cross-resonance gate.
    ECR,

    // Three-qubit gates
    /// Toffoli gate (CCX).
    CCX,

    /// Multi-qubit Pauli string, given as `string_params[0]`.
    Pauli,
}

/// Instruction names accepted for each gate, including aliases.
const GATE_NAMES: &[(&str, Gate)] = &[
    ("delay", Gate::Id),
    ("id", Gate::Id),
    ("x", Gate::X),
    ("y", Gate::Y),
    ("z", Gate::Z),
    ("s", Gate::S),
    ("sdg", Gate::Sdg),
    ("h", Gate::H),
    ("t", Gate::T),
    ("tdg", Gate::Tdg),
    ("x90", Gate::SX),
    ("sx", Gate::SX),
    ("sxdg", Gate::SXdg),
    ("r", Gate::R),
    ("rx", Gate::Rx),
    ("ry", Gate::Ry),
    ("rz", Gate::Rz),
    ("p", Gate::U1),
    ("u1", Gate::U1),
    ("u2", Gate::U2),
    ("u3", Gate::U3),
    ("u", Gate::U3),
    ("U", Gate::U3),
    ("CX", Gate::CX),
    ("cx", Gate::CX),
    ("cy", Gate::CY),
    ("cz", Gate::CZ),
    ("cp", Gate::CP),
    ("cu1", Gate::CP),
    ("swap", Gate::Swap),
    ("rxx", Gate::Rxx),
    ("ryy", Gate::Ryy),
    ("rzz", Gate::Rzz),
    ("rzx", Gate::Rzx),
    ("ecr", Gate::ECR),
    ("ccx", Gate::CCX),
    ("pauli", Gate::Pauli),
];

static GATESET: LazyLock<FxHashMap<&'static str, Gate>> =
    LazyLock::new(|| GATE_NAMES.iter().copied().collect());

impl Gate {
    /// Resolve an instruction name to a gate.
    ///
    /// Names are case-sensitive: `U` and `CX` are accepted as aliases, other
    /// upper-case spellings are not.
    pub fn from_name(name: &str) -> IrResult<Self> {
        GATESET
            .get(name)
            .copied()
            .ok_or_else(|| IrError::UnknownGate(name.to_string()))
    }

    /// Check whether a name is part of the gate set.
    pub fn is_supported(name: &str) -> bool {
        GATESET.contains_key(name)
    }

    /// All accepted gate names, aliases included.
    pub fn supported_names() -> impl Iterator<Item = &'static str> {
        GATE_NAMES.iter().map(|(name, _)| *name)
    }

    /// Get the canonical name of this gate.
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            Gate::Id => "id",
            Gate::X => "x",
            Gate::Y => "y",
            Gate::Z => "z",
            Gate::H => "h",
            Gate::S => "s",
            Gate::Sdg => "sdg",
            Gate::T => "t",
            Gate::Tdg => "tdg",
            Gate::SX => "sx",
            Gate::SXdg => "sxdg",
            Gate::R => "r",
            Gate::Rx => "rx",
            Gate::Ry => "ry",
            Gate::Rz => "rz",
            Gate::U1 => "u1",
            Gate::U2 => "u2",
            Gate::U3 => "u3",
            Gate::CX => "cx",
            Gate::CY => "cy",
            Gate::CZ => "cz",
            Gate::CP => "cp",
            Gate::Swap => "swap",
            Gate::Rxx => "rxx",
            Gate::Ryy => "ryy",
            Gate::Rzz => "rzz",
            Gate::Rzx => "rzx",
            Gate::ECR => "ecr",
            Gate::CCX => "ccx",
            Gate::Pauli => "pauli",
        }
    }

    /// Number of qubits the gate acts on, or `None` for the variable-width
    /// Pauli string.
    #[inline]
    pub fn num_qubits(&self) -> Option<usize> {
        match self {
            Gate::Id
            | Gate::X
            | Gate::Y
            | Gate::Z
            | Gate::H
            | Gate::S
            | Gate::Sdg
            | Gate::T
            | Gate::Tdg
            | Gate::SX
            | Gate::SXdg
            | Gate::R
            | Gate::Rx
            | Gate::Ry
            | Gate::Rz
            | Gate::U1
            | Gate::U2
            | Gate::U3 => Some(1),

            Gate::CX
            | Gate::CY
            | Gate::CZ
            | Gate::CP
            | Gate::Swap
            | Gate::Rxx
            | Gate::Ryy
            | Gate::Rzz
            | Gate::Rzx
            | Gate::ECR => Some(2),

            Gate::CCX => Some(3),

            Gate::Pauli => None,
        }
    }

    /// Number of numeric parameters read from `Op::params`.
    pub fn num_params(&self) -> usize {
        match self {
            Gate::Rx | Gate::Ry | Gate::Rz | Gate::U1 | Gate::CP => 1,
            Gate::Rxx | Gate::Ryy | Gate::Rzz | Gate::Rzx => 1,
            Gate::R | Gate::U2 => 2,
            Gate::U3 => 3,
            _ => 0,
        }
    }

    /// Number of leading qubits that act as controls.
    ///
    /// For CZ and CP both qubits are reported: the gate is symmetric, so
    /// either qubit can be treated as the control.
    pub fn num_controls(&self) -> usize {
        match self {
            Gate::CX | Gate::CY => 1,
            Gate::CZ | Gate::CP | Gate::CCX => 2,
            _ => 0,
        }
    }

    /// Check whether this is a controlled gate.
    #[inline]
    pub fn is_controlled(&self) -> bool {
        self.num_controls() > 0
    }

    /// Check whether the gate is diagonal in the computational basis.
    pub fn is_diagonal(&self) -> bool {
        matches!(
            self,
            Gate::Id
                | Gate::Z
                | Gate::S
                | Gate::Sdg
                | Gate::T
                | Gate::Tdg
                | Gate::Rz
                | Gate::U1
                | Gate::CZ
                | Gate::CP
                | Gate::Rzz
        )
    }

    /// The gate left after removing `removed` controls, if it still has a
    /// name in the gate set.
    ///
    /// Used when some controls of a gate are fixed by the chunk a state
    /// lives in.
    pub fn with_fewer_controls(&self, removed: usize) -> Option<Gate> {
        match (self, removed) {
            (_, 0) => Some(*self),
            (Gate::CX, 1) | (Gate::CCX, 2) => Some(Gate::X),
            (Gate::CCX, 1) => Some(Gate::CX),
            (Gate::CY, 1) => Some(Gate::Y),
            (Gate::CZ, 1) => Some(Gate::Z),
            (Gate::CP, 1) => Some(Gate::U1),
            _ => None,
        }
    }
}

impl std::fmt::Display for Gate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
