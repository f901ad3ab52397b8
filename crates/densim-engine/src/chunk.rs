//! Routing of gates onto one chunk of a partitioned density matrix.
//!
//! A chunk holds `L` of the `N` density-matrix qubits locally. Qubit
//! `q >= L` is global: its row bit is bit `q - L` of the chunk index and its
//! column bit is bit `q - L + (N - L)`. A gate on global qubits is either
//! rewritten onto the local qubits, reduced to a one-sided update, or
//! dropped for this chunk.

use densim_ir::{Gate, Op};
use num_complex::Complex64;
use tracing::trace;

use crate::error::{EngineError, EngineResult};

/// Where a chunk sits in the global register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkContext {
    /// Qubits of the whole register (`N`).
    pub global_qubits: usize,
    /// Qubits held by the chunk (`L`).
    pub chunk_qubits: usize,
    /// Index of the chunk.
    pub chunk_index: u64,
}

impl ChunkContext {
    /// Describe chunk `chunk_index` of an `N`-qubit register split into
    /// `L`-qubit chunks.
    pub fn new(global_qubits: usize, chunk_qubits: usize, chunk_index: u64) -> Self {
        Self {
            global_qubits,
            chunk_qubits,
            chunk_index,
        }
    }

    /// Check whether the register is actually split.
    #[inline]
    pub fn is_chunked(&self) -> bool {
        self.global_qubits > self.chunk_qubits
    }

    /// `N - L`.
    #[inline]
    pub fn num_global(&self) -> usize {
        self.global_qubits.saturating_sub(self.chunk_qubits)
    }

    /// Number of chunks, `4^(N - L)`.
    pub fn num_chunks(&self) -> u64 {
        1 << (2 * self.num_global())
    }

    /// Global row bits of this chunk.
    #[inline]
    pub fn row_bits(&self) -> u64 {
        self.chunk_index & ((1u64 << self.num_global()) - 1)
    }

    /// Global column bits of this chunk.
    #[inline]
    pub fn column_bits(&self) -> u64 {
        self.chunk_index >> self.num_global()
    }

    /// Check whether `qubit` is stored inside the chunk.
    #[inline]
    pub fn is_local(&self, qubit: usize) -> bool {
        qubit < self.chunk_qubits
    }
}

/// How a gate acts on one chunk.
#[derive(Debug, Clone, PartialEq)]
pub enum ChunkRoute {
    /// Every qubit is local; apply the op unchanged.
    Direct,
    /// The gate leaves this chunk untouched.
    Skip,
    /// Apply the rewritten op on both sides (`U ρ U†`).
    DensityMatrix(Op),
    /// Apply the rewritten op to the row index only.
    RowSide(Op),
    /// Apply the conjugated rewritten op to the column index only.
    ColumnSide(Op),
}

/// Decide how `op` (resolved to `gate`) acts on the chunk described by `ctx`.
///
/// Global controls are evaluated against the chunk index and removed from
/// the op. Diagonal gates without controls are left to the diagonal path,
/// which reduces them per chunk, as are Pauli strings made of I and Z only.
/// Any other gate touching a global qubit is an error.
pub fn route_gate(op: &Op, gate: Gate, ctx: &ChunkContext) -> EngineResult<ChunkRoute> {
    if !ctx.is_chunked() || op.qubits.iter().all(|&q| ctx.is_local(q)) {
        return Ok(ChunkRoute::Direct);
    }
    let num_controls = gate.num_controls().min(op.qubits.len());
    if num_controls == 0 {
        if gate.is_diagonal() {
            return Ok(ChunkRoute::Direct);
        }
        return Err(global_qubit_error(op, ctx, &op.qubits));
    }

    let (controls, targets) = op.qubits.split_at(num_controls);
    if targets.iter().any(|&q| !ctx.is_local(q)) {
        return Err(global_qubit_error(op, ctx, targets));
    }

    let mut mask = 0u64;
    let mut removed = 0;
    let mut local = Vec::with_capacity(op.qubits.len());
    for &q in controls {
        if ctx.is_local(q) {
            local.push(q);
        } else {
            mask |= 1 << (q - ctx.chunk_qubits);
            removed += 1;
        }
    }
    local.extend_from_slice(targets);

    let reduced = gate
        .with_fewer_controls(removed)
        .or(match gate {
            Gate::CZ => Some(Gate::Z),
            Gate::CP => Some(Gate::U1),
            _ => None,
        })
        .ok_or_else(|| global_qubit_error(op, ctx, controls))?;
    let local_op = Op {
        name: reduced.name().to_string(),
        qubits: local,
        ..op.clone()
    };

    let row_active = ctx.row_bits() & mask == mask;
    let column_active = ctx.column_bits() & mask == mask;
    trace!(
        "chunk {}: {} mask {:#b} row={} col={} -> {}{:?}",
        ctx.chunk_index, op.name, mask, row_active, column_active, reduced, local_op.qubits
    );

    Ok(match (row_active, column_active) {
        (false, false) => ChunkRoute::Skip,
        // phase · conj(phase) on an empty qubit list is the identity
        (true, true) if local_op.qubits.is_empty() => ChunkRoute::Skip,
        (true, true) => ChunkRoute::DensityMatrix(local_op),
        (true, false) => ChunkRoute::RowSide(local_op),
        (false, true) => ChunkRoute::ColumnSide(local_op),
    })
}

fn global_qubit_error(op: &Op, ctx: &ChunkContext, qubits: &[usize]) -> EngineError {
    let qubit = qubits
        .iter()
        .copied()
        .find(|&q| !ctx.is_local(q))
        .unwrap_or(ctx.chunk_qubits);
    EngineError::GlobalQubit {
        instruction: op.name.clone(),
        qubit,
    }
}

/// Restrict a diagonal on `qubits` to the entries selected by the global
/// bits `global_bits` (bit `q - chunk_qubits` for global qubit `q`).
///
/// Returns the local qubits and their diagonal. When no qubit is local the
/// result is a constant two-entry diagonal on qubit 0.
pub fn block_diagonal(
    global_bits: u64,
    chunk_qubits: usize,
    qubits: &[usize],
    diag: &[Complex64],
) -> (Vec<usize>, Vec<Complex64>) {
    let mut mask_out = 0usize;
    let mut mask_id = 0usize;
    let mut local = Vec::with_capacity(qubits.len());
    for (j, &q) in qubits.iter().enumerate() {
        if q < chunk_qubits {
            local.push(q);
        } else {
            mask_out |= 1 << j;
            if (global_bits >> (q - chunk_qubits)) & 1 == 1 {
                mask_id |= 1 << j;
            }
        }
    }
    let reduced: Vec<Complex64> = diag
        .iter()
        .enumerate()
        .filter(|(i, _)| i & mask_out == mask_id)
        .map(|(_, &d)| d)
        .collect();
    if local.is_empty() {
        let d = reduced.first().copied().unwrap_or(Complex64::new(1.0, 0.0));
        return (vec![0], vec![d, d]);
    }
    (local, reduced)
}

/// Copy chunk `ctx.chunk_index` out of a full vectorized density matrix.
pub fn extract_chunk(full: &[Complex64], ctx: &ChunkContext) -> Vec<Complex64> {
    let l = ctx.chunk_qubits;
    let local_dim = 1usize << l;
    let global_dim = 1usize << ctx.global_qubits;
    let row_base = (ctx.row_bits() as usize) << l;
    let col_base = (ctx.column_bits() as usize) << l;
    let mut out = Vec::with_capacity(local_dim * local_dim);
    for c in 0..local_dim {
        for r in 0..local_dim {
            out.push(full[(r | row_base) + (c | col_base) * global_dim]);
        }
    }
    out
}
