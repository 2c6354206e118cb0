//! Result types for misorientation analysis

use serde::{Deserialize, Serialize};

use crate::crystal::Orientation;

/// Misorientation statistics of one grain in one frame
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GrainMisorientation {
    /// 1-based grain id
    pub grain: usize,
    /// Frame index
    pub frame: usize,
    /// Mean element misorientation (degrees)
    pub mean_deg: f64,
    /// Maximum element misorientation (degrees)
    pub max_deg: f64,
    /// Grain average orientation
    pub average: Orientation,
}

/// A (frame, grain) unit of work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitRef {
    pub frame: usize,
    pub grain: usize,
}

/// A unit that failed, its output slots were left at NaN
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitFailure {
    pub frame: usize,
    pub grain: usize,
    pub reason: String,
}

/// Summary of a misorientation run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MisorientationReport {
    /// Frames requested, in processing order
    pub frames: Vec<usize>,
    /// Units in the run (frames x grains)
    pub units_total: usize,
    /// Units evaluated, failed units included
    pub units_completed: usize,
    /// Units whose average orientation hit the iteration cap
    pub non_converged: Vec<UnitRef>,
    /// Units that failed
    pub failures: Vec<UnitFailure>,
    /// Run stopped early through the cancellation flag
    pub cancelled: bool,
}

impl MisorientationReport {
    /// Every unit ran and none failed
    pub fn is_complete(&self) -> bool {
        !self.cancelled && self.failures.is_empty() && self.units_completed == self.units_total
    }

    /// Serialize the report as pretty JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// What the rows of a stored array index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    Element,
    Grain,
    Unknown,
}

impl Cardinality {
    pub fn label(&self) -> &'static str {
        match self {
            Cardinality::Element => "element",
            Cardinality::Grain => "grain",
            Cardinality::Unknown => "unknown",
        }
    }
}

/// Description of an array held by a model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimMetadata {
    pub key: String,
    /// True if column 0 is the initial state
    pub includes_initial: bool,
    /// Number of frame columns
    pub num_frames: usize,
    pub cardinality: Cardinality,
    pub shape: (usize, usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_completeness() {
        let mut report = MisorientationReport {
            frames: vec![0, 1],
            units_total: 4,
            units_completed: 4,
            ..Default::default()
        };
        assert!(report.is_complete());

        report.failures.push(UnitFailure {
            frame: 1,
            grain: 2,
            reason: "Grain 2 has no elements assigned".to_string(),
        });
        assert!(!report.is_complete());
        assert!(report.to_json().unwrap().contains("\"grain\": 2"));
    }
}
