//! Running-average meters for training metrics
//!
//! A meter accumulates [`Reading`]s (a loss per step, per-class accuracies,
//! named metrics) and reports a smoothed value. Every reading fed to one meter
//! must have the same shape as the first.

use crate::core::error::{Result, RunxError};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A single observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reading {
    Scalar(f64),
    Vector(Vec<f64>),
    Named(IndexMap<String, f64>),
}

impl Reading {
    /// Human-readable shape, e.g. `vector[3]`
    pub fn shape(&self) -> String {
        match self {
            Reading::Scalar(_) => "scalar".to_string(),
            Reading::Vector(values) => format!("vector[{}]", values.len()),
            Reading::Named(values) => format!(
                "named{{{}}}",
                values.keys().cloned().collect::<Vec<_>>().join(", ")
            ),
        }
    }

    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Reading::Scalar(x) => Some(*x),
            _ => None,
        }
    }

    /// Apply `f` to every component
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Reading {
        match self {
            Reading::Scalar(x) => Reading::Scalar(f(*x)),
            Reading::Vector(values) => Reading::Vector(values.iter().map(|x| f(*x)).collect()),
            Reading::Named(values) => Reading::Named(
                values
                    .iter()
                    .map(|(key, x)| (key.clone(), f(*x)))
                    .collect(),
            ),
        }
    }

    /// Combine component-wise with a reading of the same shape
    pub fn zip_with(&self, other: &Reading, f: impl Fn(f64, f64) -> f64) -> Result<Reading> {
        let mismatch = || RunxError::shape_mismatch(self.shape(), other.shape());

        match (self, other) {
            (Reading::Scalar(a), Reading::Scalar(b)) => Ok(Reading::Scalar(f(*a, *b))),
            (Reading::Vector(a), Reading::Vector(b)) if a.len() == b.len() => Ok(Reading::Vector(
                a.iter().zip(b).map(|(x, y)| f(*x, *y)).collect(),
            )),
            (Reading::Named(a), Reading::Named(b)) if a.len() == b.len() => {
                let mut combined = IndexMap::with_capacity(a.len());
                for (key, x) in a {
                    let y = b.get(key).ok_or_else(mismatch)?;
                    combined.insert(key.clone(), f(*x, *y));
                }
                Ok(Reading::Named(combined))
            },
            _ => Err(mismatch()),
        }
    }
}

impl From<f64> for Reading {
    fn from(value: f64) -> Self {
        Reading::Scalar(value)
    }
}

impl From<Vec<f64>> for Reading {
    fn from(values: Vec<f64>) -> Self {
        Reading::Vector(values)
    }
}

impl From<IndexMap<String, f64>> for Reading {
    fn from(values: IndexMap<String, f64>) -> Self {
        Reading::Named(values)
    }
}

/// Accumulator over a stream of readings
pub trait Meter {
    /// Forget everything seen so far
    fn reset(&mut self);

    /// Record one reading
    fn add(&mut self, reading: Reading) -> Result<()>;

    /// Current smoothed value, `None` before the first reading
    fn value(&self) -> Option<Reading>;

    /// Number of readings since the last reset
    fn count(&self) -> usize;
}

/// Arithmetic mean of every reading since the last reset
#[derive(Debug, Clone, Default)]
pub struct AverageMeter {
    count: usize,
    sum: Option<Reading>,
}

impl AverageMeter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Meter for AverageMeter {
    fn reset(&mut self) {
        self.count = 0;
        self.sum = None;
    }

    fn add(&mut self, reading: Reading) -> Result<()> {
        self.sum = Some(match &self.sum {
            None => reading,
            Some(sum) => sum.zip_with(&reading, |a, b| a + b)?,
        });
        self.count += 1;
        Ok(())
    }

    fn value(&self) -> Option<Reading> {
        let count = self.count as f64;
        self.sum.as_ref().map(|sum| sum.map(|x| x / count))
    }

    fn count(&self) -> usize {
        self.count
    }
}

/// Exponential moving average: `gamma * previous + (1 - gamma) * reading`
#[derive(Debug, Clone)]
pub struct MovingAverageMeter {
    gamma: f64,
    count: usize,
    current: Option<Reading>,
}

impl MovingAverageMeter {
    /// Default smoothing factor
    pub const DEFAULT_GAMMA: f64 = 0.9;

    /// Create a meter with smoothing factor `gamma` in `[0, 1]`
    pub fn new(gamma: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&gamma) {
            return Err(RunxError::invalid_argument(format!(
                "gamma must be within [0, 1], got {}",
                gamma
            )));
        }
        Ok(Self {
            gamma,
            count: 0,
            current: None,
        })
    }

    pub fn gamma(&self) -> f64 {
        self.gamma
    }
}

impl Default for MovingAverageMeter {
    fn default() -> Self {
        Self {
            gamma: Self::DEFAULT_GAMMA,
            count: 0,
            current: None,
        }
    }
}

impl Meter for MovingAverageMeter {
    fn reset(&mut self) {
        self.count = 0;
        self.current = None;
    }

    fn add(&mut self, reading: Reading) -> Result<()> {
        let gamma = self.gamma;
        self.current = Some(match &self.current {
            None => reading,
            Some(previous) => {
                previous.zip_with(&reading, |last, x| gamma * last + (1.0 - gamma) * x)?
            },
        });
        self.count += 1;
        Ok(())
    }

    fn value(&self) -> Option<Reading> {
        self.current.clone()
    }

    fn count(&self) -> usize {
        self.count
    }
}
