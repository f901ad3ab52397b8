//! CLI command implementations.

pub mod common;
pub mod memory;
pub mod run;
pub mod version;
