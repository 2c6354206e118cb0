//! Crystal orientations and symmetry

pub mod euler;
mod orientation;
mod symmetry;

pub use orientation::{Orientation, UNIT_NORM_TOLERANCE};
pub use symmetry::{
    symmetric_equivalents, symmetry_operators, symmetry_operators_for, SymmetricEquivalents,
    SymmetryFamily,
};
