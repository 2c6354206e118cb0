//! Misorientation analysis options and solvers

mod average;
mod misorientation;

pub use average::{average_of, average_orientation, AverageOrientation};
pub use misorientation::{misorientation, misorientation_between, Misorientation, MisorientationStats};

use serde::{Deserialize, Serialize};

use crate::crystal::SymmetryFamily;
use crate::error::MisoriResult;

/// Options for grain misorientation analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MisorientationOptions {
    /// Crystal symmetry applied to every grain
    pub symmetry: SymmetryFamily,
    /// Maximum iterations for the average orientation solver
    pub max_iterations: usize,
    /// Convergence tolerance on `1 - |dot|` between successive averages
    pub tolerance: f64,
    /// Evaluate grains of a frame in parallel
    pub parallel: bool,
    /// Enable per-frame progress logging at info level
    pub log: bool,
}

impl Default for MisorientationOptions {
    fn default() -> Self {
        Self {
            symmetry: SymmetryFamily::Cubic,
            max_iterations: 100,
            tolerance: 1e-12,
            parallel: true,
            log: false,
        }
    }
}

impl MisorientationOptions {
    /// Default options for cubic crystals
    pub fn cubic() -> Self {
        Self::default()
    }

    /// Parse options from JSON, missing fields take their defaults
    pub fn from_json(json: &str) -> MisoriResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set crystal symmetry
    pub fn with_symmetry(mut self, symmetry: SymmetryFamily) -> Self {
        self.symmetry = symmetry;
        self
    }

    /// Set maximum iterations
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iterations = max_iter;
        self
    }

    /// Set convergence tolerance
    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tolerance = tol;
        self
    }

    /// Run grains one after another on the calling thread
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Enable logging
    pub fn with_logging(mut self) -> Self {
        self.log = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let opts = MisorientationOptions::cubic()
            .with_symmetry(SymmetryFamily::Hexagonal)
            .with_max_iter(7)
            .with_tolerance(1e-6)
            .sequential();
        assert_eq!(opts.symmetry, SymmetryFamily::Hexagonal);
        assert_eq!(opts.max_iterations, 7);
        assert_eq!(opts.tolerance, 1e-6);
        assert!(!opts.parallel);
        assert!(!opts.log);
    }

    #[test]
    fn test_from_json_partial() {
        let opts = MisorientationOptions::from_json(r#"{"symmetry": "hexagonal", "max_iterations": 20}"#).unwrap();
        assert_eq!(opts.symmetry, SymmetryFamily::Hexagonal);
        assert_eq!(opts.max_iterations, 20);
        assert!(opts.parallel);
    }

    #[test]
    fn test_from_json_accepts_none_family() {
        let opts = MisorientationOptions::from_json(r#"{"symmetry": "none"}"#).unwrap();
        assert_eq!(opts.symmetry, SymmetryFamily::Triclinic);
        assert_eq!(opts.symmetry, "none".parse().unwrap());
    }

    #[test]
    fn test_from_json_rejects_unknown_family() {
        assert!(MisorientationOptions::from_json(r#"{"symmetry": "quasicrystal"}"#).is_err());
    }
}
