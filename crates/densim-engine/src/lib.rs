//! densim Density-Matrix Engine
//!
//! Evolves the density matrix of an N-qubit register under a stream of
//! [`densim_ir::Op`]s. The matrix is stored vectorized (column-major), so a
//! gate `U` becomes the superoperator `conj(U) ⊗ U` acting on 2N qubits and
//! noise channels are applied exactly, without trajectory sampling.
//!
//! # Example
//!
//! ```rust
//! use densim_engine::{DensityMatrixState, ExperimentData, RngEngine, SavedData};
//! use densim_ir::{NoiseModel, Op, OpType, SaveSubtype};
//!
//! let mut state = DensityMatrixState::new();
//! state.initialize_qreg(1);
//!
//! let ops = vec![
//!     Op::noise(&NoiseModel::BitFlip { p: 0.25 }, 0, 0).unwrap(),
//!     Op::save(OpType::SaveProbs, [0], "probs", SaveSubtype::Single),
//! ];
//! let mut results = ExperimentData::new();
//! let mut rng = RngEngine::new(1);
//! state.apply_ops(&ops, &mut results, &mut rng, true).unwrap();
//!
//! let SavedData::Vector(probs) = &results.single["probs"] else { panic!() };
//! assert!((probs[1] - 0.25).abs() < 1e-12);
//! ```
//!
//! # Chunked registers
//!
//! A register can be split into `4^(N - L)` chunks of `L` local qubits,
//! each evolved by its own [`DensityMatrixState::from_chunk`]. Gates whose
//! controls are global qubits are rerouted per chunk (see [`chunk`]);
//! diagonal gates are restricted to the chunk's block.

pub mod chunk;
pub mod config;
pub mod creg;
pub mod error;
mod evolve;
pub mod linalg;
pub mod matrices;
mod measure;
mod reduce;
pub mod result;
pub mod rng;
mod save;
pub mod state;
pub mod store;

pub use chunk::{ChunkContext, ChunkRoute, route_gate};
pub use config::{EngineConfig, Parallelism};
pub use creg::ClassicalRegister;
pub use error::{EngineError, EngineResult};
pub use result::{ExperimentData, ResultSink, SavedData};
pub use rng::RngEngine;
pub use state::DensityMatrixState;
pub use store::{DensityMatrix, DensityMatrixBackend};
