//! Instructions consumed by the density-matrix engine.

use ndarray::Array2;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::{IrError, IrResult};

/// The kind of an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpType {
    /// A named gate from the gate set.
    Gate,
    /// Measurement into classical memory/registers.
    Measure,
    /// Reset qubits to |0⟩.
    Reset,
    /// Synchronization point.
    Barrier,
    /// Boolean function on the classical register.
    Bfunc,
    /// Location marker for a quantum error.
    QerrorLoc,
    /// Readout error on classical memory.
    Roerror,
    /// Dense unitary matrix (`mats[0]`).
    Matrix,
    /// Diagonal unitary given by `params`.
    DiagonalMatrix,
    /// Kraus channel (`mats`).
    Kraus,
    /// Superoperator matrix (`mats[0]`).
    Superop,
    /// Replace the state by |ψ⟩⟨ψ| of `params`.
    SetStatevec,
    /// Replace the state by `mats[0]`.
    SetDensmat,
    /// Save a Pauli expectation value.
    SaveExpval,
    /// Save a Pauli expectation value and its variance.
    SaveExpvalVar,
    /// Save a (reduced) density matrix.
    SaveDensmat,
    /// Save measurement probabilities.
    SaveProbs,
    /// Save measurement probabilities as a ket map.
    SaveProbsKet,
    /// Save diagonal entries for explicit basis states.
    SaveAmpsSq,
    /// Save the full state.
    SaveState,
    /// Control-flow jump.
    Jump,
    /// Control-flow mark.
    Mark,
    /// Initialize qubits to a statevector.
    Initialize,
    /// Save the statevector.
    SaveStatevec,
    /// Save statevector amplitudes.
    SaveAmps,
    /// Replace the state by a stabilizer tableau.
    SetStabilizer,
}

impl OpType {
    /// Get the instruction name used for this type.
    pub fn name(&self) -> &'static str {
        match self {
            OpType::Gate => "gate",
            OpType::Measure => "measure",
            OpType::Reset => "reset",
            OpType::Barrier => "barrier",
            OpType::Bfunc => "bfunc",
            OpType::QerrorLoc => "qerror_loc",
            OpType::Roerror => "roerror",
            OpType::Matrix => "matrix",
            OpType::DiagonalMatrix => "diagonal_matrix",
            OpType::Kraus => "kraus",
            OpType::Superop => "superop",
            OpType::SetStatevec => "set_statevec",
            OpType::SetDensmat => "set_densmat",
            OpType::SaveExpval => "save_expval",
            OpType::SaveExpvalVar => "save_expval_var",
            OpType::SaveDensmat => "save_densmat",
            OpType::SaveProbs => "save_probs",
            OpType::SaveProbsKet => "save_probs_ket",
            OpType::SaveAmpsSq => "save_amps_sq",
            OpType::SaveState => "save_state",
            OpType::Jump => "jump",
            OpType::Mark => "mark",
            OpType::Initialize => "initialize",
            OpType::SaveStatevec => "save_statevec",
            OpType::SaveAmps => "save_amps",
            OpType::SetStabilizer => "set_stabilizer",
        }
    }

    /// Check if this type emits a result artifact.
    pub fn is_save(&self) -> bool {
        matches!(
            self,
            OpType::SaveExpval
                | OpType::SaveExpvalVar
                | OpType::SaveDensmat
                | OpType::SaveProbs
                | OpType::SaveProbsKet
                | OpType::SaveAmpsSq
                | OpType::SaveState
                | OpType::SaveStatevec
                | OpType::SaveAmps
        )
    }
}

impl std::fmt::Display for OpType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// How a saved artifact is combined across shots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveSubtype {
    /// One value, overwritten by later saves.
    #[default]
    Single,
    /// One value per classical memory state.
    CSingle,
    /// Every saved value, in order.
    List,
    /// Every saved value per classical memory state.
    CList,
    /// Running average across shots.
    Average,
    /// Running average per classical memory state.
    CAverage,
}

impl SaveSubtype {
    /// Check whether results are keyed by classical memory.
    pub fn is_conditional(&self) -> bool {
        matches!(
            self,
            SaveSubtype::CSingle | SaveSubtype::CList | SaveSubtype::CAverage
        )
    }
}

/// Relation used by a boolean function on the classical register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegComparison {
    /// `(reg & mask) == target`
    #[serde(rename = "==")]
    Equal,
    /// `(reg & mask) != target`
    #[serde(rename = "!=")]
    NotEqual,
    /// `(reg & mask) < target`
    #[serde(rename = "<")]
    Less,
    /// `(reg & mask) <= target`
    #[serde(rename = "<=")]
    LessEqual,
    /// `(reg & mask) > target`
    #[serde(rename = ">")]
    Greater,
    /// `(reg & mask) >= target`
    #[serde(rename = ">=")]
    GreaterEqual,
}

impl RegComparison {
    /// Evaluate the relation on an ordering of `(reg & mask)` against `target`.
    pub fn holds(&self, ordering: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering;
        match self {
            RegComparison::Equal => ordering == Ordering::Equal,
            RegComparison::NotEqual => ordering != Ordering::Equal,
            RegComparison::Less => ordering == Ordering::Less,
            RegComparison::LessEqual => ordering != Ordering::Greater,
            RegComparison::Greater => ordering == Ordering::Greater,
            RegComparison::GreaterEqual => ordering != Ordering::Less,
        }
    }
}

/// One weighted Pauli term of an expectation-value instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpvalTerm {
    /// Pauli string; the last character acts on the first qubit.
    pub pauli: String,
    /// Coefficient of the term in the observable.
    pub coeff: f64,
    /// Coefficient of the term in the squared observable.
    #[serde(default)]
    pub sq_coeff: f64,
}

impl ExpvalTerm {
    /// Create a term.
    pub fn new(pauli: impl Into<String>, coeff: f64, sq_coeff: f64) -> Self {
        Self {
            pauli: pauli.into(),
            coeff,
            sq_coeff,
        }
    }
}

/// A single instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Op {
    /// The kind of instruction.
    #[serde(rename = "type")]
    pub op_type: OpType,
    /// Instruction name; the gate name for gates.
    pub name: String,
    /// Target qubits, in gate order.
    #[serde(default)]
    pub qubits: Vec<usize>,
    /// Numeric parameters.
    #[serde(default)]
    pub params: Vec<Complex64>,
    /// Attached matrices.
    #[serde(default)]
    pub mats: Vec<Array2<Complex64>>,
    /// String parameters (save key, Pauli string, bfunc mask/target).
    #[serde(default)]
    pub string_params: Vec<String>,
    /// Integer parameters (basis-state indices).
    #[serde(default)]
    pub int_params: Vec<u64>,
    /// Classical memory bits written by the instruction.
    #[serde(default)]
    pub memory: Vec<usize>,
    /// Classical register bits written by the instruction.
    #[serde(default)]
    pub registers: Vec<usize>,
    /// Register bit that must be set for the instruction to run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditional: Option<usize>,
    /// Relation evaluated by `bfunc`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bfunc: Option<RegComparison>,
    /// Readout assignment probabilities, one row per true memory value.
    #[serde(default)]
    pub probs: Vec<Vec<f64>>,
    /// Pauli terms for expectation values.
    #[serde(default)]
    pub expval_params: Vec<ExpvalTerm>,
    /// How saved data is combined.
    #[serde(default)]
    pub save_type: SaveSubtype,
}

impl Op {
    /// Create an empty instruction of the given type.
    pub fn new(op_type: OpType) -> Self {
        Self {
            op_type,
            name: op_type.name().to_string(),
            qubits: vec![],
            params: vec![],
            mats: vec![],
            string_params: vec![],
            int_params: vec![],
            memory: vec![],
            registers: vec![],
            conditional: None,
            bfunc: None,
            probs: vec![],
            expval_params: vec![],
            save_type: SaveSubtype::default(),
        }
    }

    /// Create a gate instruction with real parameters.
    pub fn gate(
        name: impl Into<String>,
        qubits: impl IntoIterator<Item = usize>,
        params: impl IntoIterator<Item = f64>,
    ) -> Self {
        Self {
            name: name.into(),
            qubits: qubits.into_iter().collect(),
            params: params.into_iter().map(|p| Complex64::new(p, 0.0)).collect(),
            ..Self::new(OpType::Gate)
        }
    }

    /// Create a multi-qubit Pauli gate.
    pub fn pauli(qubits: impl IntoIterator<Item = usize>, pauli: impl Into<String>) -> Self {
        Self {
            name: "pauli".to_string(),
            qubits: qubits.into_iter().collect(),
            string_params: vec![pauli.into()],
            ..Self::new(OpType::Gate)
        }
    }

    /// Create a measurement storing outcome bit `i` in `memory[i]`.
    pub fn measure(
        qubits: impl IntoIterator<Item = usize>,
        memory: impl IntoIterator<Item = usize>,
    ) -> Self {
        Self {
            qubits: qubits.into_iter().collect(),
            memory: memory.into_iter().collect(),
            ..Self::new(OpType::Measure)
        }
    }

    /// Create a reset instruction.
    pub fn reset(qubits: impl IntoIterator<Item = usize>) -> Self {
        Self {
            qubits: qubits.into_iter().collect(),
            ..Self::new(OpType::Reset)
        }
    }

    /// Create a barrier instruction.
    pub fn barrier(qubits: impl IntoIterator<Item = usize>) -> Self {
        Self {
            qubits: qubits.into_iter().collect(),
            ..Self::new(OpType::Barrier)
        }
    }

    /// Create a unitary matrix instruction.
    ///
    /// A `1 x 2^k` matrix is accepted and treated as a diagonal.
    pub fn matrix(
        qubits: impl IntoIterator<Item = usize>,
        mat: Array2<Complex64>,
    ) -> IrResult<Self> {
        let qubits: Vec<_> = qubits.into_iter().collect();
        let dim = 1usize << qubits.len();
        let (rows, cols) = mat.dim();
        if !(cols == dim && (rows == dim || rows == 1)) {
            return Err(IrError::InvalidMatrix {
                name: "matrix".to_string(),
                expected: dim,
                rows,
                cols,
            });
        }
        Ok(Self {
            qubits,
            mats: vec![mat],
            ..Self::new(OpType::Matrix)
        })
    }

    /// Create a diagonal unitary instruction.
    pub fn diagonal_matrix(
        qubits: impl IntoIterator<Item = usize>,
        diag: impl IntoIterator<Item = Complex64>,
    ) -> Self {
        Self {
            qubits: qubits.into_iter().collect(),
            params: diag.into_iter().collect(),
            ..Self::new(OpType::DiagonalMatrix)
        }
    }

    /// Create a Kraus channel instruction.
    pub fn kraus(
        qubits: impl IntoIterator<Item = usize>,
        mats: Vec<Array2<Complex64>>,
    ) -> IrResult<Self> {
        let qubits: Vec<_> = qubits.into_iter().collect();
        let dim = 1usize << qubits.len();
        for mat in &mats {
            check_square(mat, dim, "kraus")?;
        }
        Ok(Self {
            qubits,
            mats,
            ..Self::new(OpType::Kraus)
        })
    }

    /// Create a superoperator instruction from a `4^k x 4^k` matrix.
    pub fn superop(
        qubits: impl IntoIterator<Item = usize>,
        mat: Array2<Complex64>,
    ) -> IrResult<Self> {
        let qubits: Vec<_> = qubits.into_iter().collect();
        check_square(&mat, 1usize << (2 * qubits.len()), "superop")?;
        Ok(Self {
            qubits,
            mats: vec![mat],
            ..Self::new(OpType::Superop)
        })
    }

    /// Create an instruction replacing the state by |ψ⟩⟨ψ|.
    pub fn set_statevec(
        qubits: impl IntoIterator<Item = usize>,
        amplitudes: impl IntoIterator<Item = Complex64>,
    ) -> Self {
        Self {
            qubits: qubits.into_iter().collect(),
            params: amplitudes.into_iter().collect(),
            ..Self::new(OpType::SetStatevec)
        }
    }

    /// Create an instruction replacing the state by a density matrix.
    pub fn set_densmat(qubits: impl IntoIterator<Item = usize>, mat: Array2<Complex64>) -> Self {
        Self {
            qubits: qubits.into_iter().collect(),
            mats: vec![mat],
            ..Self::new(OpType::SetDensmat)
        }
    }

    /// Create a save instruction writing under `key`.
    pub fn save(
        op_type: OpType,
        qubits: impl IntoIterator<Item = usize>,
        key: impl Into<String>,
        save_type: SaveSubtype,
    ) -> Self {
        Self {
            qubits: qubits.into_iter().collect(),
            string_params: vec![key.into()],
            save_type,
            ..Self::new(op_type)
        }
    }

    /// Create a `save_amps_sq` instruction for explicit basis states.
    pub fn save_amps_sq(
        qubits: impl IntoIterator<Item = usize>,
        indices: impl IntoIterator<Item = u64>,
        key: impl Into<String>,
        save_type: SaveSubtype,
    ) -> Self {
        Self {
            int_params: indices.into_iter().collect(),
            ..Self::save(OpType::SaveAmpsSq, qubits, key, save_type)
        }
    }

    /// Create an expectation-value instruction.
    pub fn save_expval(
        qubits: impl IntoIterator<Item = usize>,
        terms: Vec<ExpvalTerm>,
        key: impl Into<String>,
        with_variance: bool,
        save_type: SaveSubtype,
    ) -> Self {
        let op_type = if with_variance {
            OpType::SaveExpvalVar
        } else {
            OpType::SaveExpval
        };
        Self {
            expval_params: terms,
            ..Self::save(op_type, qubits, key, save_type)
        }
    }

    /// Create a boolean function writing its result to register bit `register`.
    ///
    /// `mask` and `target` are hexadecimal strings (`0x..`).
    pub fn bfunc(
        mask: impl Into<String>,
        target: impl Into<String>,
        relation: RegComparison,
        register: usize,
        memory: Option<usize>,
    ) -> Self {
        Self {
            string_params: vec![mask.into(), target.into()],
            bfunc: Some(relation),
            registers: vec![register],
            memory: memory.into_iter().collect(),
            ..Self::new(OpType::Bfunc)
        }
    }

    /// Create a readout-error instruction over classical memory bits.
    pub fn roerror(memory: impl IntoIterator<Item = usize>, probs: Vec<Vec<f64>>) -> Self {
        Self {
            memory: memory.into_iter().collect(),
            probs,
            ..Self::new(OpType::Roerror)
        }
    }

    /// Make the instruction conditional on a register bit.
    #[must_use]
    pub fn with_condition(mut self, register: usize) -> Self {
        self.conditional = Some(register);
        self
    }

    /// Also write outcome bits to classical registers.
    #[must_use]
    pub fn with_registers(mut self, registers: impl IntoIterator<Item = usize>) -> Self {
        self.registers = registers.into_iter().collect();
        self
    }

    /// Save key (`string_params[0]`), if present.
    pub fn key(&self) -> Option<&str> {
        self.string_params.first().map(String::as_str)
    }

    /// Real part of parameter `index`.
    pub fn real_param(&self, index: usize) -> Option<f64> {
        self.params.get(index).map(|p| p.re)
    }
}

fn check_square(mat: &Array2<Complex64>, dim: usize, name: &str) -> IrResult<()> {
    let (rows, cols) = mat.dim();
    if rows != dim || cols != dim {
        return Err(IrError::InvalidMatrix {
            name: name.to_string(),
            expected: dim,
            rows,
            cols,
        });
    }
    Ok(())
}
