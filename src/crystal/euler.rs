//! Euler angle ingestion helpers

use std::f64::consts::FRAC_PI_2;

use nalgebra::DMatrix;

use super::orientation::Orientation;
use crate::error::{MisoriError, MisoriResult};

/// Convert Kocks Euler angles (psi, theta, phi) in degrees to Bunge
/// (phi1, Phi, phi2) in radians.
pub fn kocks_deg_to_bunge_rad(kocks: [f64; 3]) -> [f64; 3] {
    let [psi, theta, phi] = kocks.map(f64::to_radians);
    [psi + FRAC_PI_2, theta, FRAC_PI_2 - phi]
}

/// Build an orientation matrix `[elements, frames]` from per-frame Bunge
/// angles, one `Vec<[phi1, Phi, phi2]>` per frame.
pub fn orientations_from_euler(frames: &[Vec<[f64; 3]>]) -> MisoriResult<DMatrix<Orientation>> {
    let num_frames = frames.len();
    let num_elements = frames.first().map(Vec::len).unwrap_or(0);

    let mut oris = DMatrix::from_element(num_elements, num_frames, Orientation::identity());
    for (f, angles) in frames.iter().enumerate() {
        if angles.len() != num_elements {
            return Err(MisoriError::ShapeMismatch {
                expected: (num_elements, num_frames),
                found: (angles.len(), num_frames),
            });
        }
        for (e, &[phi1, phi, phi2]) in angles.iter().enumerate() {
            if !(phi1.is_finite() && phi.is_finite() && phi2.is_finite()) {
                return Err(MisoriError::InvalidOrientation(format!(
                    "element {e} frame {f} has non-finite Euler angles"
                )));
            }
            oris[(e, f)] = Orientation::from_euler(phi1, phi, phi2);
        }
    }
    Ok(oris)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_kocks_to_bunge() {
        let [phi1, phi, phi2] = kocks_deg_to_bunge_rad([0.0, 45.0, 90.0]);
        assert_relative_eq!(phi1, FRAC_PI_2, epsilon = 1e-12);
        assert_relative_eq!(phi, 45f64.to_radians(), epsilon = 1e-12);
        assert_relative_eq!(phi2, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_orientation_matrix_shape() {
        let frames = vec![
            vec![[0.0, 0.0, 0.0], [0.1, 0.2, 0.3]],
            vec![[0.0, 0.0, 0.0], [0.1, 0.2, 0.4]],
            vec![[0.5, 0.0, 0.0], [0.1, 0.2, 0.5]],
        ];
        let oris = orientations_from_euler(&frames).unwrap();
        assert_eq!(oris.shape(), (2, 3));
        assert_eq!(oris[(0, 0)], Orientation::identity());
        assert_eq!(oris[(1, 2)], Orientation::from_euler(0.1, 0.2, 0.5));
    }

    #[test]
    fn test_ragged_frames_rejected() {
        let frames = vec![vec![[0.0; 3]; 2], vec![[0.0; 3]; 3]];
        assert!(matches!(
            orientations_from_euler(&frames),
            Err(MisoriError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_non_finite_rejected() {
        let frames = vec![vec![[f64::NAN, 0.0, 0.0]]];
        assert!(orientations_from_euler(&frames).is_err());
    }
}
