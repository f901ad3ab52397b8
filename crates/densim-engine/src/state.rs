//! Density-matrix state and the instruction dispatcher.

use densim_ir::{Gate, Op, OpType};
use tracing::{debug, trace};

use crate::chunk::ChunkContext;
use crate::config::{EngineConfig, Parallelism};
use crate::creg::ClassicalRegister;
use crate::error::{EngineError, EngineResult};
use crate::result::ResultSink;
use crate::rng::RngEngine;
use crate::store::{DensityMatrix, DensityMatrixBackend};

/// A density matrix (or one chunk of it) together with its classical
/// register, evolved one [`Op`] at a time.
#[derive(Debug, Clone)]
pub struct DensityMatrixState<B: DensityMatrixBackend = DensityMatrix> {
    pub(crate) store: B,
    /// Qubits of the whole register; larger than the store's when chunked.
    pub(crate) num_qubits: usize,
    pub(crate) creg: ClassicalRegister,
    pub(crate) config: EngineConfig,
    pub(crate) parallelism: Parallelism,
}

impl DensityMatrixState<DensityMatrix> {
    /// Create an empty state on the CPU store.
    pub fn new() -> Self {
        Self::with_store(DensityMatrix::new(0))
    }
}

impl Default for DensityMatrixState<DensityMatrix> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: DensityMatrixBackend> DensityMatrixState<B> {
    /// Wrap an existing store holding the whole register.
    pub fn with_store(store: B) -> Self {
        let num_qubits = store.num_qubits();
        Self {
            store,
            num_qubits,
            creg: ClassicalRegister::default(),
            config: EngineConfig::default(),
            parallelism: Parallelism::serial(),
        }
    }

    /// Wrap a store holding one chunk of a `global_qubits`-qubit register.
    pub fn from_chunk(store: B, global_qubits: usize) -> Self {
        Self {
            num_qubits: global_qubits.max(store.num_qubits()),
            ..Self::with_store(store)
        }
    }

    /// Apply a configuration, rebuilding the parallel execution policy.
    pub fn set_config(&mut self, config: EngineConfig) -> EngineResult<()> {
        self.parallelism = Parallelism::from_config(&config)?;
        self.store.set_parallelism(self.parallelism.clone());
        debug!(
            "Engine config: chop={:e}, parallel_threshold={}, threads={}",
            config.chop_threshold, config.parallel_threshold, config.threads
        );
        self.config = config;
        Ok(())
    }

    /// The active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Qubits of the whole register.
    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// The backing store.
    pub fn store(&self) -> &B {
        &self.store
    }

    /// The classical register.
    pub fn creg(&self) -> &ClassicalRegister {
        &self.creg
    }

    /// Mutable access to the classical register.
    pub fn creg_mut(&mut self) -> &mut ClassicalRegister {
        &mut self.creg
    }

    /// Reset the classical register to zeros.
    pub fn initialize_creg(&mut self, num_memory: usize, num_registers: usize) {
        self.creg = ClassicalRegister::new(num_memory, num_registers);
    }

    /// Set the register to |0…0⟩⟨0…0| on `num_qubits` qubits.
    pub fn initialize_qreg(&mut self, num_qubits: usize) {
        self.store.set_num_qubits(num_qubits);
        self.store.set_parallelism(self.parallelism.clone());
        self.store.initialize();
        self.num_qubits = num_qubits;
        debug!("Initialized {}-qubit density matrix", num_qubits);
    }

    /// Replace the register by `store`, which must hold `num_qubits` qubits.
    ///
    /// On mismatch the current state is kept and `store` is dropped.
    pub fn initialize_qreg_with(&mut self, num_qubits: usize, mut store: B) -> EngineResult<()> {
        if store.num_qubits() != num_qubits {
            return Err(EngineError::QubitCountMismatch {
                expected: num_qubits,
                got: store.num_qubits(),
            });
        }
        store.set_parallelism(self.parallelism.clone());
        self.store = store;
        self.num_qubits = num_qubits;
        debug!("Initialized {}-qubit density matrix from store", num_qubits);
        Ok(())
    }

    /// Memory needed for a `num_qubits`-qubit register, in MB.
    pub fn required_memory_mb(num_qubits: usize) -> usize {
        B::required_memory_mb(num_qubits)
    }

    /// Gate names accepted by the gate path.
    pub fn gates() -> impl Iterator<Item = &'static str> {
        Gate::supported_names()
    }

    /// Location of the store within the register.
    pub fn chunk_context(&self) -> ChunkContext {
        ChunkContext::new(
            self.num_qubits,
            self.store.num_qubits(),
            self.store.chunk_index(),
        )
    }

    /// Check whether the store holds only part of the register and cannot
    /// address the rest.
    pub fn is_chunked(&self) -> bool {
        self.num_qubits > self.store.num_qubits() && !self.store.support_global_indexing()
    }

    pub(crate) fn ensure_local(&self, name: &str, qubits: &[usize]) -> EngineResult<()> {
        if !self.is_chunked() {
            return Ok(());
        }
        let local = self.store.num_qubits();
        match qubits.iter().find(|&&q| q >= local) {
            Some(&qubit) => Err(EngineError::GlobalQubit {
                instruction: name.to_string(),
                qubit,
            }),
            None => Ok(()),
        }
    }

    pub(crate) fn ensure_full_register(&self, name: &str) -> EngineResult<()> {
        if self.is_chunked() {
            return Err(EngineError::ChunkedState(name.to_string()));
        }
        Ok(())
    }

    /// Apply one instruction.
    ///
    /// Instructions whose conditional register bit is clear are skipped.
    /// `final_op` allows save instructions to move the state out instead of
    /// copying it.
    pub fn apply_op(
        &mut self,
        op: &Op,
        sink: &mut dyn ResultSink,
        rng: &mut RngEngine,
        final_op: bool,
    ) -> EngineResult<()> {
        if !self.creg.check_conditional(op) {
            trace!("Skipping '{}': condition not met", op.name);
            return Ok(());
        }
        if let Some(&qubit) = op.qubits.iter().find(|&&q| q >= self.num_qubits) {
            return Err(EngineError::QubitOutOfRange {
                instruction: op.name.clone(),
                qubit,
                num_qubits: self.num_qubits,
            });
        }
        trace!("Applying {} '{}' on {:?}", op.op_type, op.name, op.qubits);
        match op.op_type {
            OpType::Barrier | OpType::QerrorLoc | OpType::Mark | OpType::Jump => Ok(()),
            OpType::Reset => self.apply_reset(&op.qubits),
            OpType::Measure => self.apply_measure(&op.qubits, &op.memory, &op.registers, rng),
            OpType::Bfunc => self.creg.apply_bfunc(op),
            OpType::Roerror => self.creg.apply_roerror(op, rng),
            OpType::Gate => self.apply_gate(op),
            OpType::Matrix => self.apply_matrix_op(op),
            OpType::DiagonalMatrix => self.apply_diagonal_unitary_matrix(&op.qubits, &op.params),
            OpType::Superop => self.apply_superop_op(op),
            OpType::Kraus => self.apply_kraus(&op.qubits, &op.mats),
            OpType::SetStatevec => self.set_statevec(op),
            OpType::SetDensmat => self.set_densmat(op),
            OpType::SaveExpval | OpType::SaveExpvalVar => self.apply_save_expval(op, sink),
            OpType::SaveState => self.apply_save_state(op, sink, final_op),
            OpType::SaveDensmat => self.apply_save_densmat(op, sink, final_op),
            OpType::SaveProbs | OpType::SaveProbsKet => self.apply_save_probs(op, sink),
            OpType::SaveAmpsSq => self.apply_save_amps_sq(op, sink),
            OpType::Initialize
            | OpType::SaveStatevec
            | OpType::SaveAmps
            | OpType::SetStabilizer => Err(EngineError::InvalidInstruction(op.name.clone())),
        }
    }

    /// Apply a sequence of instructions; only the last may be treated as
    /// final.
    pub fn apply_ops(
        &mut self,
        ops: &[Op],
        sink: &mut dyn ResultSink,
        rng: &mut RngEngine,
        final_ops: bool,
    ) -> EngineResult<()> {
        let last = ops.len().saturating_sub(1);
        for (i, op) in ops.iter().enumerate() {
            self.apply_op(op, sink, rng, final_ops && i == last)?;
        }
        Ok(())
    }

    fn set_statevec(&mut self, op: &Op) -> EngineResult<()> {
        self.ensure_full_register(&op.name)?;
        if op.qubits.len() != self.num_qubits {
            return Err(EngineError::QubitCountMismatch {
                expected: self.num_qubits,
                got: op.qubits.len(),
            });
        }
        let dim = 1usize << self.num_qubits;
        if op.params.len() != dim {
            return Err(EngineError::DimensionMismatch {
                instruction: op.name.clone(),
                expected: dim,
                got: op.params.len(),
            });
        }
        self.store.initialize_from_vector(&op.params)
    }

    fn set_densmat(&mut self, op: &Op) -> EngineResult<()> {
        self.ensure_full_register(&op.name)?;
        if op.qubits.len() != self.num_qubits {
            return Err(EngineError::QubitCountMismatch {
                expected: self.num_qubits,
                got: op.qubits.len(),
            });
        }
        let mat = op.mats.first().ok_or_else(|| EngineError::MissingParameter {
            instruction: op.name.clone(),
            what: "density matrix",
        })?;
        self.store.initialize_from_matrix(mat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::ExperimentData;

    #[test]
    fn test_initialize_qreg() {
        let mut state = DensityMatrixState::new();
        state.initialize_qreg(3);
        assert_eq!(state.num_qubits(), 3);
        assert!((state.store().trace() - 1.0).abs() < 1e-12);
        assert!(!state.is_chunked());
    }

    #[test]
    fn test_initialize_qreg_with_mismatch_keeps_state() {
        let mut state = DensityMatrixState::new();
        state.initialize_qreg(2);
        let err = state
            .initialize_qreg_with(2, DensityMatrix::new(3))
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::QubitCountMismatch {
                expected: 2,
                got: 3
            }
        ));
        assert_eq!(state.store().num_qubits(), 2);
    }

    #[test]
    fn test_conditional_skips_op() {
        let mut state = DensityMatrixState::new();
        state.initialize_qreg(1);
        state.initialize_creg(0, 1);
        let mut sink = ExperimentData::new();
        let mut rng = RngEngine::new(0);
        state
            .apply_op(&Op::gate("x", [0], []).with_condition(0), &mut sink, &mut rng, false)
            .unwrap();
        assert_eq!(state.store().probability(0), 1.0);
    }

    #[test]
    fn test_marker_ops_are_noops() {
        let mut state = DensityMatrixState::new();
        state.initialize_qreg(1);
        let mut sink = ExperimentData::new();
        let mut rng = RngEngine::new(0);
        for op_type in [OpType::Barrier, OpType::QerrorLoc, OpType::Mark, OpType::Jump] {
            state
                .apply_op(&Op::new(op_type), &mut sink, &mut rng, false)
                .unwrap();
        }
        assert_eq!(state.store().probability(0), 1.0);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_unsupported_op_types() {
        let mut state = DensityMatrixState::new();
        state.initialize_qreg(1);
        let mut sink = ExperimentData::new();
        let mut rng = RngEngine::new(0);
        let err = state
            .apply_op(&Op::new(OpType::SaveStatevec), &mut sink, &mut rng, false)
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidInstruction(ref n) if n == "save_statevec"));
        assert!(err.to_string().contains("invalid instruction"));
    }
}
