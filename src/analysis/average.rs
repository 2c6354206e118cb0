//! Average orientation of a symmetry-ambiguous set

use log::warn;
use serde::{Deserialize, Serialize};

use super::MisorientationOptions;
use crate::crystal::{symmetric_equivalents, Orientation, SymmetricEquivalents, SymmetryFamily};
use crate::error::{MisoriError, MisoriResult};

/// Result of the average orientation solver
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AverageOrientation {
    /// Average orientation (canonical)
    pub orientation: Orientation,
    /// Refinement passes performed
    pub iterations: usize,
    /// False if the iteration cap was hit or the mean degenerated
    pub converged: bool,
}

/// Average a set of orientations given as their symmetric equivalents.
///
/// The guess starts at the first input's identity form. Each pass picks,
/// for every input, the form nearest the guess (ties to the lowest table
/// index), flips it into the guess' hemisphere and takes the normalized
/// component mean as the next guess. Stops when `1 - |dot|` between passes
/// falls under `options.tolerance` or after `options.max_iterations`.
pub fn average_orientation(
    equivalents: &[SymmetricEquivalents],
    options: &MisorientationOptions,
) -> MisoriResult<AverageOrientation> {
    let first = equivalents.first().ok_or(MisoriError::EmptyInputSet)?;
    let mut guess = first.original();

    if equivalents.len() == 1 {
        return Ok(AverageOrientation {
            orientation: guess,
            iterations: 0,
            converged: true,
        });
    }

    for iteration in 1..=options.max_iterations {
        let mut sum = [0.0; 4];
        for eqvs in equivalents {
            let (_, form, _) = eqvs.nearest_to(&guess);
            let sign = if form.dot(&guess) < 0.0 { -1.0 } else { 1.0 };
            for (acc, c) in sum.iter_mut().zip(form.components()) {
                *acc += sign * c;
            }
        }

        let norm = sum.iter().map(|c| c * c).sum::<f64>().sqrt();
        if norm.is_nan() {
            return Ok(AverageOrientation {
                orientation: Orientation::from_components_unchecked(f64::NAN, f64::NAN, f64::NAN, f64::NAN),
                iterations: iteration,
                converged: false,
            });
        }
        if norm < f64::EPSILON {
            warn!("Average orientation degenerated to zero length after {iteration} iterations");
            return Ok(AverageOrientation {
                orientation: guess,
                iterations: iteration,
                converged: false,
            });
        }

        let next = Orientation::from_components_unchecked(
            sum[0] / norm,
            sum[1] / norm,
            sum[2] / norm,
            sum[3] / norm,
        );
        let change = 1.0 - next.dot(&guess).abs();
        guess = next;

        if change < options.tolerance {
            return Ok(AverageOrientation {
                orientation: guess,
                iterations: iteration,
                converged: true,
            });
        }
    }

    warn!(
        "Average orientation did not converge within {} iterations ({} inputs)",
        options.max_iterations,
        equivalents.len()
    );
    Ok(AverageOrientation {
        orientation: guess,
        iterations: options.max_iterations,
        converged: false,
    })
}

/// Generate equivalents for `orientations` and average them
pub fn average_of(
    orientations: &[Orientation],
    family: SymmetryFamily,
    options: &MisorientationOptions,
) -> MisoriResult<AverageOrientation> {
    let equivalents: Vec<SymmetricEquivalents> = orientations
        .iter()
        .map(|ori| symmetric_equivalents(ori, family))
        .collect();
    average_orientation(&equivalents, options)
}
