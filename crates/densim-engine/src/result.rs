//! Result sink for saved artifacts.

use std::collections::BTreeMap;

use densim_ir::{OpType, SaveSubtype};
use ndarray::Array2;
use num_complex::Complex64;
use serde::{Serialize, Serializer};
use tracing::debug;

use crate::creg::ClassicalRegister;
use crate::error::{EngineError, EngineResult};

/// One saved artifact.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SavedData {
    /// Expectation value or variance.
    Scalar(f64),
    /// Probabilities or squared amplitudes.
    Vector(Vec<f64>),
    /// Probabilities keyed by hex basis label.
    Ket(BTreeMap<String, f64>),
    /// Density matrix.
    Matrix(Array2<Complex64>),
}

impl SavedData {
    /// Number of stored values.
    pub fn len(&self) -> usize {
        match self {
            SavedData::Scalar(_) => 1,
            SavedData::Vector(v) => v.len(),
            SavedData::Ket(k) => k.len(),
            SavedData::Matrix(m) => m.len(),
        }
    }

    /// Check whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Add `other` element-wise; both sides must have the same shape.
    fn accumulate(&mut self, other: SavedData) -> Result<(), (usize, usize)> {
        match (self, other) {
            (SavedData::Scalar(a), SavedData::Scalar(b)) => *a += b,
            (SavedData::Vector(a), SavedData::Vector(b)) if a.len() == b.len() => {
                a.iter_mut().zip(b).for_each(|(x, y)| *x += y);
            }
            (SavedData::Ket(a), SavedData::Ket(b)) => {
                for (label, p) in b {
                    *a.entry(label).or_insert(0.0) += p;
                }
            }
            (SavedData::Matrix(a), SavedData::Matrix(b)) if a.dim() == b.dim() => *a += &b,
            (a, b) => return Err((a.len(), b.len())),
        }
        Ok(())
    }

    /// Multiply every value by `factor`.
    fn scaled(&self, factor: f64) -> SavedData {
        match self {
            SavedData::Scalar(a) => SavedData::Scalar(a * factor),
            SavedData::Vector(v) => SavedData::Vector(v.iter().map(|x| x * factor).collect()),
            SavedData::Ket(k) => {
                SavedData::Ket(k.iter().map(|(l, p)| (l.clone(), p * factor)).collect())
            }
            SavedData::Matrix(m) => SavedData::Matrix(m * Complex64::new(factor, 0.0)),
        }
    }
}

/// Running sum of an averaged artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct AverageData {
    sum: SavedData,
    count: usize,
}

impl AverageData {
    fn new(data: SavedData) -> Self {
        Self {
            sum: data,
            count: 1,
        }
    }

    /// Number of accumulated samples.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Mean over the accumulated samples.
    pub fn mean(&self) -> SavedData {
        self.sum.scaled(1.0 / self.count as f64)
    }
}

impl Serialize for AverageData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.mean().serialize(serializer)
    }
}

/// Destination of save instructions.
pub trait ResultSink {
    /// Record `data` under `key`, combined according to `subtype`.
    ///
    /// Conditional subtypes key the value additionally by the classical
    /// memory of `creg`.
    fn save_data(
        &mut self,
        creg: &ClassicalRegister,
        key: &str,
        data: SavedData,
        op_type: OpType,
        subtype: SaveSubtype,
    ) -> EngineResult<()>;
}

/// In-memory result sink, serializable for reporting.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExperimentData {
    /// Last value per key.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub single: BTreeMap<String, SavedData>,
    /// All values per key, in save order.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub list: BTreeMap<String, Vec<SavedData>>,
    /// Running average per key.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub average: BTreeMap<String, AverageData>,
    /// Last value per key and memory value.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub c_single: BTreeMap<String, BTreeMap<String, SavedData>>,
    /// All values per key and memory value.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub c_list: BTreeMap<String, BTreeMap<String, Vec<SavedData>>>,
    /// Running average per key and memory value.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub c_average: BTreeMap<String, BTreeMap<String, AverageData>>,
}

impl ExperimentData {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether nothing was saved.
    pub fn is_empty(&self) -> bool {
        self.single.is_empty()
            && self.list.is_empty()
            && self.average.is_empty()
            && self.c_single.is_empty()
            && self.c_list.is_empty()
            && self.c_average.is_empty()
    }
}

fn average_into(
    slot: &mut BTreeMap<String, AverageData>,
    key: &str,
    data: SavedData,
    op_type: OpType,
) -> EngineResult<()> {
    match slot.get_mut(key) {
        Some(avg) => {
            avg.sum
                .accumulate(data)
                .map_err(|(expected, got)| EngineError::DimensionMismatch {
                    instruction: format!("{op_type} '{key}'"),
                    expected,
                    got,
                })?;
            avg.count += 1;
        }
        None => {
            slot.insert(key.to_string(), AverageData::new(data));
        }
    }
    Ok(())
}

impl ResultSink for ExperimentData {
    fn save_data(
        &mut self,
        creg: &ClassicalRegister,
        key: &str,
        data: SavedData,
        op_type: OpType,
        subtype: SaveSubtype,
    ) -> EngineResult<()> {
        debug!("Saving {} '{}' as {:?}", op_type, key, subtype);
        match subtype {
            SaveSubtype::Single => {
                self.single.insert(key.to_string(), data);
            }
            SaveSubtype::List => self.list.entry(key.to_string()).or_default().push(data),
            SaveSubtype::Average => average_into(&mut self.average, key, data, op_type)?,
            SaveSubtype::CSingle => {
                self.c_single
                    .entry(key.to_string())
                    .or_default()
                    .insert(creg.memory_hex(), data);
            }
            SaveSubtype::CList => self
                .c_list
                .entry(key.to_string())
                .or_default()
                .entry(creg.memory_hex())
                .or_default()
                .push(data),
            SaveSubtype::CAverage => {
                let slot = self.c_average.entry(key.to_string()).or_default();
                average_into(slot, &creg.memory_hex(), data, op_type)?;
            }
        }
        Ok(())
    }
}
