//! Misorientation against a reference orientation

use serde::{Deserialize, Serialize};

use crate::crystal::{symmetric_equivalents, Orientation, SymmetricEquivalents, SymmetryFamily};

/// Misorientation of one element
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Misorientation {
    /// Minimum angle over all symmetric forms (degrees)
    pub angle_deg: f64,
    /// Table index of the form that achieved the minimum
    pub branch: usize,
}

/// Mean and maximum of a set of misorientations
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MisorientationStats {
    pub mean_deg: f64,
    pub max_deg: f64,
}

impl MisorientationStats {
    /// Reduce a set of misorientations. NaN in gives NaN out, an empty set
    /// gives NaN for both.
    pub fn from_misorientations(values: &[Misorientation]) -> Self {
        if values.is_empty() {
            return Self {
                mean_deg: f64::NAN,
                max_deg: f64::NAN,
            };
        }
        let sum: f64 = values.iter().map(|m| m.angle_deg).sum();
        let max = values.iter().map(|m| m.angle_deg).fold(f64::NEG_INFINITY, |acc, a| {
            if a.is_nan() || acc.is_nan() {
                f64::NAN
            } else {
                acc.max(a)
            }
        });
        Self {
            mean_deg: sum / values.len() as f64,
            max_deg: max,
        }
    }
}

fn angle_from_dot(abs_dot: f64) -> f64 {
    2.0 * abs_dot.clamp(-1.0, 1.0).acos().to_degrees()
}

/// Misorientation of each element against `reference`.
///
/// For each element the angle is the minimum over all of its symmetric
/// forms, which is the crystallographic misorientation rather than the
/// angle to whichever form happens to be stored.
pub fn misorientation(equivalents: &[SymmetricEquivalents], reference: &Orientation) -> Vec<Misorientation> {
    equivalents
        .iter()
        .map(|eqvs| {
            let (branch, _, abs_dot) = eqvs.nearest_to(reference);
            Misorientation {
                angle_deg: angle_from_dot(abs_dot),
                branch,
            }
        })
        .collect()
}

/// Disorientation between two orientations under `family` symmetry (degrees)
pub fn misorientation_between(a: &Orientation, b: &Orientation, family: SymmetryFamily) -> f64 {
    let (_, _, abs_dot) = symmetric_equivalents(a, family).nearest_to(b);
    angle_from_dot(abs_dot)
}
