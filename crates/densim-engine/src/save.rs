//! Save instructions.

use std::collections::BTreeMap;

use densim_ir::{Op, OpType, SaveSubtype};
use rayon::prelude::*;
use tracing::debug;

use crate::error::{EngineError, EngineResult};
use crate::result::{ResultSink, SavedData};
use crate::state::DensityMatrixState;
use crate::store::DensityMatrixBackend;

fn save_key(op: &Op) -> EngineResult<&str> {
    op.key().ok_or_else(|| EngineError::MissingParameter {
        instruction: op.name.clone(),
        what: "save key",
    })
}

impl<B: DensityMatrixBackend> DensityMatrixState<B> {
    /// Save the full density matrix.
    ///
    /// Single values are promoted to averages so that repeated shots
    /// accumulate the ensemble state.
    pub(crate) fn apply_save_state(
        &mut self,
        op: &Op,
        sink: &mut dyn ResultSink,
        final_op: bool,
    ) -> EngineResult<()> {
        self.ensure_full_register(&op.name)?;
        if op.qubits.len() != self.num_qubits {
            return Err(EngineError::IncompleteSave(op.name.clone()));
        }
        let key = match save_key(op)? {
            "_method_" => "density_matrix",
            key => key,
        };
        let subtype = match op.save_type {
            SaveSubtype::Single => SaveSubtype::Average,
            SaveSubtype::CSingle => SaveSubtype::CAverage,
            other => other,
        };
        let mat = if final_op {
            self.store.move_to_matrix()?
        } else {
            self.store.copy_to_matrix()
        };
        debug!("save_state '{}' (moved: {})", key, final_op);
        sink.save_data(
            &self.creg,
            key,
            SavedData::Matrix(mat),
            OpType::SaveDensmat,
            subtype,
        )
    }

    pub(crate) fn apply_save_densmat(
        &mut self,
        op: &Op,
        sink: &mut dyn ResultSink,
        final_op: bool,
    ) -> EngineResult<()> {
        let key = save_key(op)?;
        let mat = self.reduced_density_matrix(&op.qubits, final_op)?;
        sink.save_data(
            &self.creg,
            key,
            SavedData::Matrix(mat),
            op.op_type,
            op.save_type,
        )
    }

    pub(crate) fn apply_save_probs(&mut self, op: &Op, sink: &mut dyn ResultSink) -> EngineResult<()> {
        let key = save_key(op)?;
        let probs = self.measure_probs(&op.qubits)?;
        let data = if op.op_type == OpType::SaveProbsKet {
            let chop = self.config.chop_threshold;
            SavedData::Ket(
                probs
                    .iter()
                    .enumerate()
                    .filter(|(_, p)| p.abs() >= chop)
                    .map(|(i, &p)| (format!("{i:#x}"), p))
                    .collect::<BTreeMap<_, _>>(),
            )
        } else {
            SavedData::Vector(probs)
        };
        sink.save_data(&self.creg, key, data, op.op_type, op.save_type)
    }

    /// Save `ρ[i, i]` for every full-register basis index `i` in
    /// `int_params`.
    pub(crate) fn apply_save_amps_sq(&mut self, op: &Op, sink: &mut dyn ResultSink) -> EngineResult<()> {
        self.ensure_full_register(&op.name)?;
        let key = save_key(op)?;
        if op.int_params.is_empty() {
            return Err(EngineError::MissingParameter {
                instruction: op.name.clone(),
                what: "basis state indices",
            });
        }
        let dim = 1u64 << self.num_qubits;
        if let Some(&index) = op.int_params.iter().find(|&&i| i >= dim) {
            return Err(EngineError::DimensionMismatch {
                instruction: format!("{} index", op.name),
                expected: dim as usize,
                got: index as usize,
            });
        }
        let store = &self.store;
        let values: Vec<f64> = if self.parallelism.enabled_for(op.int_params.len()) {
            self.parallelism.install(|| {
                op.int_params
                    .par_iter()
                    .map(|&i| store.probability(i))
                    .collect()
            })
        } else {
            op.int_params.iter().map(|&i| store.probability(i)).collect()
        };
        sink.save_data(
            &self.creg,
            key,
            SavedData::Vector(values),
            op.op_type,
            op.save_type,
        )
    }

    /// Save `Σ coeff ⟨P⟩`, and for `save_expval_var` also the variance
    /// `Σ sq_coeff ⟨P⟩ - (Σ coeff ⟨P⟩)²`.
    pub(crate) fn apply_save_expval(&mut self, op: &Op, sink: &mut dyn ResultSink) -> EngineResult<()> {
        self.ensure_full_register(&op.name)?;
        let key = save_key(op)?;
        if op.expval_params.is_empty() {
            return Err(EngineError::MissingParameter {
                instruction: op.name.clone(),
                what: "Pauli terms",
            });
        }
        let mut expval = 0.0;
        let mut sq_expval = 0.0;
        for term in &op.expval_params {
            let value = self.store.expval_pauli(&op.qubits, &term.pauli)?;
            expval += term.coeff * value;
            sq_expval += term.sq_coeff * value;
        }
        let data = if op.op_type == OpType::SaveExpvalVar {
            SavedData::Vector(vec![expval, sq_expval - expval * expval])
        } else {
            SavedData::Scalar(expval)
        };
        debug!("{} '{}' = {:?}", op.op_type, key, data);
        sink.save_data(&self.creg, key, data, op.op_type, op.save_type)
    }
}
