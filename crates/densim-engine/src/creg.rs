//! Classical memory and register bits.

use std::cmp::Ordering;

use densim_ir::Op;
use tracing::trace;

use crate::error::{EngineError, EngineResult};
use crate::rng::RngEngine;

/// Classical memory (reported per shot) and register (used for
/// conditionals) bits. Bit `i` is stored at index `i`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassicalRegister {
    memory: Vec<bool>,
    register: Vec<bool>,
}

impl ClassicalRegister {
    /// Create a zeroed register.
    pub fn new(num_memory: usize, num_registers: usize) -> Self {
        Self {
            memory: vec![false; num_memory],
            register: vec![false; num_registers],
        }
    }

    /// Memory bits.
    pub fn memory(&self) -> &[bool] {
        &self.memory
    }

    /// Register bits.
    pub fn register(&self) -> &[bool] {
        &self.register
    }

    /// Whether the op's conditional bit (if any) is set.
    pub fn check_conditional(&self, op: &Op) -> bool {
        match op.conditional {
            None => true,
            Some(bit) => self.register.get(bit).copied().unwrap_or(false),
        }
    }

    /// Store a measurement outcome: bit `i` of `outcome` goes to
    /// `memory[i]` and `registers[i]`.
    pub fn store_measure(&mut self, outcome: u64, memory: &[usize], registers: &[usize]) {
        for (i, &slot) in memory.iter().enumerate() {
            set_bit(&mut self.memory, slot, (outcome >> i) & 1 == 1);
        }
        for (i, &slot) in registers.iter().enumerate() {
            set_bit(&mut self.register, slot, (outcome >> i) & 1 == 1);
        }
    }

    /// Evaluate `(register & mask) <relation> target` and store the result
    /// in `registers[0]` (and `memory[0]` when given).
    pub fn apply_bfunc(&mut self, op: &Op) -> EngineResult<()> {
        let missing = |what| EngineError::MissingParameter {
            instruction: op.name.clone(),
            what,
        };
        let [mask, target, ..] = op.string_params.as_slice() else {
            return Err(missing("mask and target"));
        };
        let relation = op.bfunc.ok_or_else(|| missing("relation"))?;
        let &register = op.registers.first().ok_or_else(|| missing("register"))?;

        let mask = parse_hex_bits(mask)
            .ok_or_else(|| EngineError::InvalidInstruction(format!("bfunc mask '{mask}'")))?;
        let target = parse_hex_bits(target)
            .ok_or_else(|| EngineError::InvalidInstruction(format!("bfunc target '{target}'")))?;

        let width = self.register.len().max(mask.len()).max(target.len());
        let masked: Vec<bool> = (0..width)
            .map(|i| bit_at(&self.register, i) && bit_at(&mask, i))
            .collect();
        let outcome = relation.holds(compare_bits(&masked, &target));
        trace!("bfunc {:?} -> {}", relation, outcome);

        set_bit(&mut self.register, register, outcome);
        if let Some(&slot) = op.memory.first() {
            set_bit(&mut self.memory, slot, outcome);
        }
        Ok(())
    }

    /// Replace the value of `op.memory` by a draw from the row of `op.probs`
    /// selected by its current value.
    pub fn apply_roerror(&mut self, op: &Op, rng: &mut RngEngine) -> EngineResult<()> {
        let current = op
            .memory
            .iter()
            .enumerate()
            .fold(0usize, |acc, (i, &slot)| {
                acc | (usize::from(bit_at(&self.memory, slot)) << i)
            });
        let row = op
            .probs
            .get(current)
            .ok_or_else(|| EngineError::DimensionMismatch {
                instruction: op.name.clone(),
                expected: 1 << op.memory.len(),
                got: op.probs.len(),
            })?;
        let reported = rng.rand_int(row)?;
        trace!("roerror {} -> {}", current, reported);
        self.store_measure(reported, &op.memory, &op.registers);
        Ok(())
    }

    /// Memory as a hex string, bit 0 least significant.
    pub fn memory_hex(&self) -> String {
        bits_to_hex(&self.memory)
    }
}

fn bit_at(bits: &[bool], i: usize) -> bool {
    bits.get(i).copied().unwrap_or(false)
}

fn set_bit(bits: &mut Vec<bool>, i: usize, value: bool) {
    if i >= bits.len() {
        bits.resize(i + 1, false);
    }
    bits[i] = value;
}

/// Parse `0x..` into little-endian bits.
fn parse_hex_bits(hex: &str) -> Option<Vec<bool>> {
    let digits = hex
        .strip_prefix("0x")
        .or_else(|| hex.strip_prefix("0X"))
        .unwrap_or(hex);
    if digits.is_empty() {
        return None;
    }
    let mut bits = Vec::with_capacity(4 * digits.len());
    for ch in digits.chars().rev() {
        let nibble = ch.to_digit(16)?;
        bits.extend((0..4).map(|b| (nibble >> b) & 1 == 1));
    }
    Some(bits)
}

/// Compare little-endian bit strings as unsigned integers.
fn compare_bits(a: &[bool], b: &[bool]) -> Ordering {
    let width = a.len().max(b.len());
    (0..width)
        .rev()
        .map(|i| bit_at(a, i).cmp(&bit_at(b, i)))
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
}

fn bits_to_hex(bits: &[bool]) -> String {
    if bits.is_empty() {
        return "0x0".to_string();
    }
    let digits: String = bits
        .chunks(4)
        .rev()
        .map(|nibble| {
            let value = nibble
                .iter()
                .enumerate()
                .fold(0u32, |acc, (i, &b)| acc | (u32::from(b) << i));
            char::from_digit(value, 16).unwrap_or('0')
        })
        .collect();
    let trimmed = digits.trim_start_matches('0');
    if trimmed.is_empty() {
        "0x0".to_string()
    } else {
        format!("0x{trimmed}")
    }
}
