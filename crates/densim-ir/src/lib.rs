//! densim Instruction Model
//!
//! This crate provides the instruction stream consumed by the densim
//! density-matrix engine: one [`Op`] per quantum operation, the closed
//! [`Gate`] set with its name table, and [`NoiseModel`]s lowered to Kraus or
//! readout-error instructions.
//!
//! # Example: Bell state with bit-flip noise
//!
//! ```rust
//! use densim_ir::{Gate, NoiseModel, Op, OpType, SaveSubtype};
//!
//! let program = vec![
//!     Op::gate("h", [0], []),
//!     Op::gate("cx", [0, 1], []),
//!     Op::noise(&NoiseModel::BitFlip { p: 0.05 }, 1, 1).unwrap(),
//!     Op::save(OpType::SaveProbs, [0, 1], "probs", SaveSubtype::Average),
//! ];
//!
//! assert_eq!(Gate::from_name(&program[1].name).unwrap(), Gate::CX);
//! assert_eq!(program[2].op_type, OpType::Kraus);
//! ```
//!
//! # Supported Gates
//!
//! | Gate | Qubits | Names |
//! |------|--------|-------|
//! | `Id` | 1 | `id`, `delay` |
//! | `X`, `Y`, `Z` | 1 | `x`, `y`, `z` |
//! | `H`, `S`, `Sdg`, `T`, `Tdg` | 1 | `h`, `s`, `sdg`, `t`, `tdg` |
//! | `SX`, `SXdg` | 1 | `sx`, `x90`, `sxdg` |
//! | `R`, `Rx`, `Ry`, `Rz` | 1 | `r`, `rx`, `ry`, `rz` |
//! | `U1`, `U2`, `U3` | 1 | `p`, `u1`, `u2`, `u3`, `u`, `U` |
//! | `CX`, `CY`, `CZ`, `CP` | 2 | `cx`, `CX`, `cy`, `cz`, `cp`, `cu1` |
//! | `Swap`, `ECR` | 2 | `swap`, `ecr` |
//! | `Rxx`, `Ryy`, `Rzz`, `Rzx` | 2 | `rxx`, `ryy`, `rzz`, `rzx` |
//! | `CCX` | 3 | `ccx` |
//! | `Pauli` | n | `pauli` |

pub mod error;
pub mod gate;
pub mod noise;
pub mod op;

pub use error::{IrError, IrResult};
pub use gate::Gate;
pub use noise::NoiseModel;
pub use op::{ExpvalTerm, Op, OpType, RegComparison, SaveSubtype};
