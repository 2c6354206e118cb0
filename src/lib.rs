//! misori - grain misorientation analysis for crystal plasticity FE output
//!
//! Given the element to grain assignment of a mesh and per-frame element
//! orientations, this library computes:
//! - symmetric equivalents of orientations for common crystal families
//! - grain average orientations resolved across symmetry branches
//! - element misorientation to the grain average
//! - grain mean and maximum misorientation for every frame
//!
//! ## Example
//! ```rust
//! use misori::prelude::*;
//! use nalgebra::DMatrix;
//!
//! // 3 elements in grain 1, one element in grain 2, 2 load steps
//! let mut model = PolycrystalModel::new(vec![1, 1, 1, 2], 2, 2).unwrap();
//!
//! let oris = DMatrix::from_fn(4, 3, |e, f| {
//!     Orientation::from_euler(0.01 * (e * f) as f64, 0.5, 0.2)
//! });
//! model.set_orientations(oris).unwrap();
//!
//! let report = model
//!     .calc_misorientation(&FrameSelection::All, &MisorientationOptions::cubic(), &ProgressHandle::new())
//!     .unwrap();
//! assert!(report.is_complete());
//!
//! let grain = model.grain_misorientation(1, 2).unwrap();
//! assert!(grain.mean_deg <= grain.max_deg);
//! ```

pub mod analysis;
pub mod crystal;
pub mod datastore;
pub mod error;
pub mod model;
pub mod progress;
pub mod results;

// Re-export common types
pub mod prelude {
    pub use crate::analysis::{
        average_of, average_orientation, misorientation, misorientation_between, AverageOrientation,
        Misorientation, MisorientationOptions, MisorientationStats,
    };
    pub use crate::crystal::{symmetric_equivalents, symmetry_operators, Orientation, SymmetricEquivalents, SymmetryFamily};
    pub use crate::datastore::{DataStore, Priority, StoredArray};
    pub use crate::error::{MisoriError, MisoriResult};
    pub use crate::model::{FrameSelection, PolycrystalModel};
    pub use crate::progress::{ProgressEvent, ProgressHandle};
    pub use crate::results::{Cardinality, GrainMisorientation, MisorientationReport, SimMetadata};
}
