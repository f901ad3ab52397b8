//! Shared helpers for CLI commands.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use densim_engine::EngineConfig;
use densim_ir::{NoiseModel, Op, OpType};

/// A program file: register sizes plus the instruction stream.
#[derive(Debug, Deserialize)]
pub struct Program {
    pub num_qubits: usize,
    #[serde(default)]
    pub num_memory: usize,
    #[serde(default)]
    pub num_registers: usize,
    pub ops: Vec<Op>,
    /// Per-qubit noise, inserted after every gate (or measurement, for
    /// readout errors) touching the qubit.
    #[serde(default)]
    pub noise: Vec<NoiseSpec>,
}

/// A noise model attached to one qubit.
#[derive(Debug, Clone, Deserialize)]
pub struct NoiseSpec {
    pub qubit: usize,
    #[serde(flatten)]
    pub model: NoiseModel,
}

impl Program {
    /// Parse a program from JSON and check its qubit indices.
    pub fn from_json(source: &str) -> Result<Self> {
        let program: Program =
            serde_json::from_str(source).context("Invalid program JSON")?;
        program.validate()?;
        Ok(program)
    }

    fn validate(&self) -> Result<()> {
        for (i, op) in self.ops.iter().enumerate() {
            if let Some(&q) = op.qubits.iter().find(|&&q| q >= self.num_qubits) {
                anyhow::bail!(
                    "Instruction {i} ('{}') uses qubit {q}, but the program has {} qubits",
                    op.name,
                    self.num_qubits
                );
            }
        }
        if let Some(spec) = self.noise.iter().find(|s| s.qubit >= self.num_qubits) {
            anyhow::bail!(
                "Noise model {} targets qubit {}, but the program has {} qubits",
                spec.model,
                spec.qubit,
                self.num_qubits
            );
        }
        Ok(())
    }

    /// The instruction stream with noise instructions inserted.
    pub fn lowered_ops(&self) -> Result<Vec<Op>> {
        if self.noise.is_empty() {
            return Ok(self.ops.clone());
        }
        let mut ops = Vec::with_capacity(self.ops.len() * 2);
        for op in &self.ops {
            ops.push(op.clone());
            for (i, &qubit) in op.qubits.iter().enumerate() {
                for spec in self.noise.iter().filter(|s| s.qubit == qubit) {
                    let is_readout = spec.model.readout_probabilities().is_some();
                    let noise = match op.op_type {
                        OpType::Gate if !is_readout => Op::noise(&spec.model, qubit, 0)?,
                        OpType::Measure if is_readout => match op.memory.get(i) {
                            Some(&slot) => Op::noise(&spec.model, qubit, slot)?,
                            None => continue,
                        },
                        _ => continue,
                    };
                    ops.push(match op.conditional {
                        Some(bit) => noise.with_condition(bit),
                        None => noise,
                    });
                }
            }
        }
        Ok(ops)
    }
}

/// Load a program from a JSON file.
pub fn load_program(path: &str) -> Result<Program> {
    if !Path::new(path).exists() {
        anyhow::bail!("File not found: {path}");
    }
    let source =
        fs::read_to_string(path).with_context(|| format!("Failed to read file: {path}"))?;
    Program::from_json(&source).with_context(|| format!("Failed to load program: {path}"))
}

/// Load an engine configuration from a YAML or JSON file.
pub fn load_config(path: &str) -> Result<EngineConfig> {
    let path_obj = Path::new(path);
    let source =
        fs::read_to_string(path).with_context(|| format!("Failed to read config: {path}"))?;

    let ext = path_obj.extension().and_then(|e| e.to_str()).unwrap_or("");

    match ext.to_lowercase().as_str() {
        "yaml" | "yml" => serde_yaml_ng::from_str(&source)
            .with_context(|| format!("Invalid YAML config: {path}")),
        "json" => {
            serde_json::from_str(&source).with_context(|| format!("Invalid JSON config: {path}"))
        }
        other => anyhow::bail!("Unsupported config format '{other}' (expected yaml or json)"),
    }
}
