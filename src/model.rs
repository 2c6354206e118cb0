//! Polycrystal model - grain assignment, simulation arrays and the
//! misorientation driver

use std::sync::{Mutex, PoisonError};

use log::{debug, info, warn};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::analysis::{
    average_orientation, misorientation, AverageOrientation, Misorientation, MisorientationOptions,
    MisorientationStats,
};
use crate::crystal::{euler, symmetric_equivalents, Orientation, SymmetricEquivalents, UNIT_NORM_TOLERANCE};
use crate::datastore::{DataStore, StoredArray};
use crate::error::{MisoriError, MisoriResult};
use crate::progress::{ProgressEvent, ProgressHandle};
use crate::results::{
    Cardinality, GrainMisorientation, MisorientationReport, SimMetadata, UnitFailure, UnitRef,
};

/// Element orientations, `[elements, frames + 1]`
pub const ORI_KEY: &str = "ori";
/// Element misorientation to the grain average (degrees)
pub const MIS_ORI_KEY: &str = "misOri";
/// Grain mean misorientation (degrees)
pub const AV_MIS_ORI_KEY: &str = "avMisOri";
/// Grain maximum misorientation (degrees)
pub const MAX_MIS_ORI_KEY: &str = "maxMisOri";
/// Grain average orientation
pub const AV_ORI_KEY: &str = "avOri";

/// Frames to run a calculation for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameSelection {
    /// Initial state and every load step
    All,
    Single(usize),
    List(Vec<usize>),
}

impl FrameSelection {
    /// Single frame index, negative meaning all frames
    pub fn from_index(index: i64) -> Self {
        if index < 0 {
            FrameSelection::All
        } else {
            FrameSelection::Single(index as usize)
        }
    }
}

impl From<usize> for FrameSelection {
    fn from(frame: usize) -> Self {
        FrameSelection::Single(frame)
    }
}

impl From<Vec<usize>> for FrameSelection {
    fn from(frames: Vec<usize>) -> Self {
        FrameSelection::List(frames)
    }
}

/// Output of one (frame, grain) unit
struct GrainUnit {
    average: AverageOrientation,
    misorientations: Vec<Misorientation>,
    stats: MisorientationStats,
}

fn nan_orientation() -> Orientation {
    Orientation::from_components_unchecked(f64::NAN, f64::NAN, f64::NAN, f64::NAN)
}

fn tags(cardinality: Cardinality, extra: &[(&str, Value)]) -> Vec<(String, Value)> {
    let mut tags = vec![
        ("cardinality".to_string(), json!(cardinality.label())),
        ("includes_initial".to_string(), json!(true)),
    ];
    tags.extend(extra.iter().map(|(k, v)| (k.to_string(), v.clone())));
    tags
}

/// A meshed polycrystal and the simulation arrays attached to it
#[derive(Debug, Clone)]
pub struct PolycrystalModel {
    /// 1-based grain id of each element
    element_grain: Vec<usize>,
    /// Element indices of each grain, indexed by id - 1
    grain_elements: Vec<Vec<usize>>,
    /// Number of load steps (frames excluding the initial state)
    num_frames: usize,
    /// Named simulation arrays
    store: DataStore,
}

impl PolycrystalModel {
    /// Create a model from the element to grain assignment.
    ///
    /// Grain ids are 1-based and must lie in `1..=num_grains`. A grain
    /// without elements is accepted here and reported per unit when a
    /// calculation reaches it.
    pub fn new(element_grain: Vec<usize>, num_grains: usize, num_frames: usize) -> MisoriResult<Self> {
        let mut grain_elements = vec![Vec::new(); num_grains];
        for (element, &grain) in element_grain.iter().enumerate() {
            if grain == 0 || grain > num_grains {
                return Err(MisoriError::InvalidInput(format!(
                    "element {element} has grain id {grain}, expected 1..={num_grains}"
                )));
            }
            grain_elements[grain - 1].push(element);
        }

        let empty = grain_elements.iter().filter(|e| e.is_empty()).count();
        if empty > 0 {
            warn!("{empty} of {num_grains} grains have no elements assigned");
        }

        Ok(Self {
            element_grain,
            grain_elements,
            num_frames,
            store: DataStore::new(),
        })
    }

    /// Create a model taking the grain count from the largest id
    pub fn from_element_grains(element_grain: Vec<usize>, num_frames: usize) -> MisoriResult<Self> {
        let num_grains = element_grain.iter().copied().max().unwrap_or(0);
        Self::new(element_grain, num_grains, num_frames)
    }

    pub fn num_elements(&self) -> usize {
        self.element_grain.len()
    }

    pub fn num_grains(&self) -> usize {
        self.grain_elements.len()
    }

    /// Number of load steps, frame columns are `num_frames + 1`
    pub fn num_frames(&self) -> usize {
        self.num_frames
    }

    pub fn element_grain(&self) -> &[usize] {
        &self.element_grain
    }

    /// Element indices belonging to a grain
    pub fn grain_elements(&self, grain: usize) -> MisoriResult<&[usize]> {
        self.check_grain(grain)?;
        Ok(&self.grain_elements[grain - 1])
    }

    pub fn store(&self) -> &DataStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut DataStore {
        &mut self.store
    }

    fn check_grain(&self, grain: usize) -> MisoriResult<()> {
        if grain == 0 || grain > self.num_grains() {
            return Err(MisoriError::InvalidInput(format!(
                "grain id {grain} outside 1..={}",
                self.num_grains()
            )));
        }
        Ok(())
    }

    fn check_frame(&self, frame: usize) -> MisoriResult<()> {
        if frame > self.num_frames {
            return Err(MisoriError::FrameOutOfRange {
                frame: frame as i64,
                max: self.num_frames,
            });
        }
        Ok(())
    }

    // ========================
    // Ingestion
    // ========================

    /// Attach element orientations shaped `[elements, frames + 1]`.
    ///
    /// Finite quaternions must be unit length. Non-finite entries are
    /// accepted and come out as NaN results.
    pub fn set_orientations(&mut self, orientations: DMatrix<Orientation>) -> MisoriResult<()> {
        let expected = (self.num_elements(), self.num_frames + 1);
        if orientations.shape() != expected {
            return Err(MisoriError::ShapeMismatch {
                expected,
                found: orientations.shape(),
            });
        }

        for frame in 0..orientations.ncols() {
            for element in 0..orientations.nrows() {
                let ori = &orientations[(element, frame)];
                let finite = ori.components().iter().all(|c| c.is_finite());
                if finite && !ori.is_unit(UNIT_NORM_TOLERANCE) {
                    return Err(MisoriError::InvalidOrientation(format!(
                        "element {element} frame {frame} has norm {}",
                        ori.norm()
                    )));
                }
            }
        }

        self.store.insert(
            ORI_KEY,
            StoredArray::Orientation(orientations),
            tags(Cardinality::Element, &[]),
        );
        Ok(())
    }

    /// Attach element orientations from Bunge Euler angles (radians), one
    /// `Vec` of element angles per frame including the initial state
    pub fn set_orientations_from_euler(&mut self, frames: &[Vec<[f64; 3]>]) -> MisoriResult<()> {
        let orientations = euler::orientations_from_euler(frames)?;
        self.set_orientations(orientations)
    }

    /// Resolve a frame selection into sorted, unique, in-range frames
    pub fn validate_frames(&self, frames: &FrameSelection) -> MisoriResult<Vec<usize>> {
        let mut frames = match frames {
            FrameSelection::All => (0..=self.num_frames).collect(),
            FrameSelection::Single(frame) => vec![*frame],
            FrameSelection::List(list) => list.clone(),
        };
        for &frame in &frames {
            self.check_frame(frame)?;
        }
        frames.sort_unstable();
        frames.dedup();
        Ok(frames)
    }

    /// Metadata for a stored array
    pub fn metadata(&self, key: &str) -> MisoriResult<SimMetadata> {
        let entry = self.store.entry(key)?;
        let shape = entry.data.shape();

        let cardinality = match entry.tags.get("cardinality").and_then(Value::as_str) {
            Some("element") => Cardinality::Element,
            Some("grain") => Cardinality::Grain,
            _ if shape.0 == self.num_elements() => Cardinality::Element,
            _ if shape.0 == self.num_grains() => Cardinality::Grain,
            _ => Cardinality::Unknown,
        };

        Ok(SimMetadata {
            key: key.to_string(),
            includes_initial: shape.1 == self.num_frames + 1,
            num_frames: shape.1,
            cardinality,
            shape,
        })
    }

    // ========================
    // Misorientation
    // ========================

    /// Calculate element and grain misorientation for the selected frames.
    ///
    /// Writes `misOri`, `avMisOri`, `maxMisOri` and `avOri` into the store,
    /// replacing earlier results. Slots of frames not selected, of failed
    /// units and of units skipped after cancellation hold NaN.
    pub fn calc_misorientation(
        &mut self,
        frames: &FrameSelection,
        options: &MisorientationOptions,
        progress: &ProgressHandle,
    ) -> MisoriResult<MisorientationReport> {
        let frames = self.validate_frames(frames)?;
        let oris = self.store.get_orientations(ORI_KEY)?;

        let num_cols = self.num_frames + 1;
        let mut mis_ori = DMatrix::from_element(self.num_elements(), num_cols, f64::NAN);
        let mut av_mis_ori = DMatrix::from_element(self.num_grains(), num_cols, f64::NAN);
        let mut max_mis_ori = DMatrix::from_element(self.num_grains(), num_cols, f64::NAN);
        let mut av_ori = DMatrix::from_element(self.num_grains(), num_cols, nan_orientation());

        let mut report = MisorientationReport {
            frames: frames.clone(),
            units_total: frames.len() * self.num_grains(),
            ..Default::default()
        };

        info!(
            "Calculating {} misorientation for {} frames x {} grains",
            options.symmetry,
            frames.len(),
            self.num_grains()
        );

        progress.begin();
        let completed = Mutex::new(0usize);

        for (i, &frame) in frames.iter().enumerate() {
            if progress.is_cancelled() {
                report.cancelled = true;
                break;
            }

            let outcomes = self.evaluate_frame(oris, frame, options, progress, &completed, report.units_total);

            for (grain, outcome) in (1..=self.num_grains()).zip(outcomes) {
                let Some(result) = outcome else {
                    report.cancelled = true;
                    continue;
                };
                report.units_completed += 1;

                match result {
                    Ok(unit) => {
                        for (&element, m) in self.grain_elements[grain - 1].iter().zip(&unit.misorientations) {
                            mis_ori[(element, frame)] = m.angle_deg;
                        }
                        av_mis_ori[(grain - 1, frame)] = unit.stats.mean_deg;
                        max_mis_ori[(grain - 1, frame)] = unit.stats.max_deg;
                        av_ori[(grain - 1, frame)] = unit.average.orientation;
                        if !unit.average.converged {
                            report.non_converged.push(UnitRef { frame, grain });
                        }
                    }
                    Err(err) => {
                        warn!("Skipping grain {grain} in frame {frame}: {err}");
                        report.failures.push(UnitFailure {
                            frame,
                            grain,
                            reason: err.to_string(),
                        });
                    }
                }
            }

            if options.log {
                info!("Frame {} of {} done", i + 1, frames.len());
            } else {
                debug!("Frame {frame} done ({} of {})", i + 1, frames.len());
            }
        }
        report.cancelled |= progress.is_cancelled();
        progress.finish(report.units_completed, report.units_total, report.cancelled);

        if report.cancelled {
            warn!(
                "Misorientation run cancelled after {} of {} units",
                report.units_completed, report.units_total
            );
        }
        if !report.non_converged.is_empty() {
            warn!("{} units did not converge", report.non_converged.len());
        }

        let frame_tag = json!(frames);
        let symmetry_tag = json!(options.symmetry.label());
        let scalar_extra = [
            ("units", json!("degrees")),
            ("frames", frame_tag.clone()),
            ("symmetry", symmetry_tag.clone()),
        ];
        self.store.insert(
            MIS_ORI_KEY,
            StoredArray::Scalar(mis_ori),
            tags(Cardinality::Element, &scalar_extra),
        );
        self.store.insert(
            AV_MIS_ORI_KEY,
            StoredArray::Scalar(av_mis_ori),
            tags(Cardinality::Grain, &scalar_extra),
        );
        self.store.insert(
            MAX_MIS_ORI_KEY,
            StoredArray::Scalar(max_mis_ori),
            tags(Cardinality::Grain, &scalar_extra),
        );
        self.store.insert(
            AV_ORI_KEY,
            StoredArray::Orientation(av_ori),
            tags(
                Cardinality::Grain,
                &[("frames", frame_tag), ("symmetry", symmetry_tag)],
            ),
        );

        info!(
            "Finished misorientation: {} units, {} failed",
            report.units_completed,
            report.failures.len()
        );
        Ok(report)
    }

    /// Evaluate every grain of a frame, returned in grain order. `None`
    /// marks units skipped because the run was cancelled.
    ///
    /// Each unit reports progress as soon as it finishes. In parallel runs
    /// events follow completion order, serialized through `completed`.
    fn evaluate_frame(
        &self,
        oris: &DMatrix<Orientation>,
        frame: usize,
        options: &MisorientationOptions,
        progress: &ProgressHandle,
        completed: &Mutex<usize>,
        total: usize,
    ) -> Vec<Option<MisoriResult<GrainUnit>>> {
        let unit = |grain: usize| {
            if progress.is_cancelled() {
                return None;
            }
            let result = self.evaluate_grain(oris, frame, grain, options);

            let mut done = completed.lock().unwrap_or_else(PoisonError::into_inner);
            *done += 1;
            progress.report(&ProgressEvent {
                frame,
                grain,
                completed: *done,
                total,
                fraction: *done as f64 / total as f64,
            });
            Some(result)
        };

        #[cfg(feature = "parallel")]
        {
            if options.parallel {
                use rayon::prelude::*;
                return (1..=self.num_grains()).into_par_iter().map(unit).collect();
            }
        }

        (1..=self.num_grains()).map(unit).collect()
    }

    fn evaluate_grain(
        &self,
        oris: &DMatrix<Orientation>,
        frame: usize,
        grain: usize,
        options: &MisorientationOptions,
    ) -> MisoriResult<GrainUnit> {
        let elements = &self.grain_elements[grain - 1];
        if elements.is_empty() {
            return Err(MisoriError::EmptyGrain(grain));
        }

        let equivalents: Vec<SymmetricEquivalents> = elements
            .iter()
            .map(|&e| symmetric_equivalents(&oris[(e, frame)], options.symmetry))
            .collect();

        let average = average_orientation(&equivalents, options)?;
        let misorientations = misorientation(&equivalents, &average.orientation);
        let stats = MisorientationStats::from_misorientations(&misorientations);

        Ok(GrainUnit {
            average,
            misorientations,
            stats,
        })
    }

    // ========================
    // Results
    // ========================

    /// Misorientation statistics of a grain in a frame
    pub fn grain_misorientation(&self, grain: usize, frame: usize) -> MisoriResult<GrainMisorientation> {
        self.check_grain(grain)?;
        self.check_frame(frame)?;
        Ok(GrainMisorientation {
            grain,
            frame,
            mean_deg: self.store.get_scalar(AV_MIS_ORI_KEY)?[(grain - 1, frame)],
            max_deg: self.store.get_scalar(MAX_MIS_ORI_KEY)?[(grain - 1, frame)],
            average: self.store.get_orientations(AV_ORI_KEY)?[(grain - 1, frame)],
        })
    }

    /// Misorientation of an element in a frame (degrees)
    pub fn element_misorientation(&self, element: usize, frame: usize) -> MisoriResult<f64> {
        if element >= self.num_elements() {
            return Err(MisoriError::InvalidInput(format!(
                "element {element} outside 0..{}",
                self.num_elements()
            )));
        }
        self.check_frame(frame)?;
        Ok(self.store.get_scalar(MIS_ORI_KEY)?[(element, frame)])
    }

    /// Per-grain mean of scalar element data.
    ///
    /// Empty grains give NaN. With `out_key` the result is also stored,
    /// tagged as grain data.
    pub fn calc_grain_average(&mut self, in_key: &str, out_key: Option<&str>) -> MisoriResult<DMatrix<f64>> {
        if self.metadata(in_key)?.cardinality != Cardinality::Element {
            return Err(MisoriError::InvalidInput(format!("'{in_key}' is not element data")));
        }
        let data = self.store.get_scalar(in_key)?;
        if data.nrows() != self.num_elements() {
            return Err(MisoriError::ShapeMismatch {
                expected: (self.num_elements(), data.ncols()),
                found: data.shape(),
            });
        }

        let mut grain_data = DMatrix::from_element(self.num_grains(), data.ncols(), f64::NAN);
        for (g, elements) in self.grain_elements.iter().enumerate() {
            if elements.is_empty() {
                continue;
            }
            for col in 0..data.ncols() {
                let sum: f64 = elements.iter().map(|&e| data[(e, col)]).sum();
                grain_data[(g, col)] = sum / elements.len() as f64;
            }
        }

        if let Some(out_key) = out_key {
            let includes_initial = self.store.tag(in_key, "includes_initial")?.cloned();
            let mut out_tags = vec![("cardinality".to_string(), json!(Cardinality::Grain.label()))];
            if let Some(flag) = includes_initial {
                out_tags.push(("includes_initial".to_string(), flag));
            }
            self.store
                .insert(out_key, StoredArray::Scalar(grain_data.clone()), out_tags);
        }

        Ok(grain_data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn two_grain_model() -> PolycrystalModel {
        let mut model = PolycrystalModel::new(vec![1, 1, 2, 2, 2], 2, 1).unwrap();
        let oris = DMatrix::from_fn(5, 2, |e, f| Orientation::from_euler(0.1 * (e + f) as f64, 0.2, 0.0));
        model.set_orientations(oris).unwrap();
        model
    }

    #[test]
    fn test_grain_assignment() {
        let model = PolycrystalModel::from_element_grains(vec![2, 1, 2], 0).unwrap();
        assert_eq!(model.num_grains(), 2);
        assert_eq!(model.grain_elements(1).unwrap(), &[1]);
        assert_eq!(model.grain_elements(2).unwrap(), &[0, 2]);
        assert!(model.grain_elements(3).is_err());
    }

    #[test]
    fn test_invalid_grain_ids() {
        assert!(PolycrystalModel::new(vec![1, 0], 1, 0).is_err());
        assert!(PolycrystalModel::new(vec![1, 3], 2, 0).is_err());
    }

    #[test]
    fn test_orientation_shape_checked() {
        let mut model = PolycrystalModel::new(vec![1, 1], 1, 2).unwrap();
        let oris = DMatrix::from_element(2, 2, Orientation::identity());
        assert!(matches!(
            model.set_orientations(oris),
            Err(MisoriError::ShapeMismatch { expected: (2, 3), found: (2, 2) })
        ));
    }

    #[test]
    fn test_non_unit_orientation_rejected() {
        let mut model = PolycrystalModel::new(vec![1], 1, 0).unwrap();
        let bad = Orientation::from_components_unchecked(2.0, 0.0, 0.0, 0.0);
        let oris = DMatrix::from_element(1, 1, bad);
        assert!(matches!(
            model.set_orientations(oris),
            Err(MisoriError::InvalidOrientation(_))
        ));
    }

    #[test]
    fn test_validate_frames() {
        let model = PolycrystalModel::new(vec![1], 1, 3).unwrap();
        assert_eq!(model.validate_frames(&FrameSelection::All).unwrap(), vec![0, 1, 2, 3]);
        assert_eq!(model.validate_frames(&FrameSelection::from_index(-1)).unwrap(), vec![0, 1, 2, 3]);
        assert_eq!(model.validate_frames(&2.into()).unwrap(), vec![2]);
        assert_eq!(model.validate_frames(&vec![3, 1, 3].into()).unwrap(), vec![1, 3]);
        assert!(matches!(
            model.validate_frames(&FrameSelection::Single(4)),
            Err(MisoriError::FrameOutOfRange { frame: 4, max: 3 })
        ));
    }

    #[test]
    fn test_missing_orientations() {
        let mut model = PolycrystalModel::new(vec![1], 1, 0).unwrap();
        let result = model.calc_misorientation(
            &FrameSelection::All,
            &MisorientationOptions::default(),
            &ProgressHandle::new(),
        );
        assert!(matches!(result, Err(MisoriError::KeyNotFound(_))));
    }

    #[test]
    fn test_unselected_frames_are_nan() {
        let mut model = two_grain_model();
        model
            .calc_misorientation(&FrameSelection::Single(1), &MisorientationOptions::default(), &ProgressHandle::new())
            .unwrap();
        assert!(model.element_misorientation(0, 0).unwrap().is_nan());
        assert!(!model.element_misorientation(0, 1).unwrap().is_nan());
        assert!(model.grain_misorientation(1, 0).unwrap().mean_deg.is_nan());
    }

    #[test]
    fn test_metadata() {
        let mut model = two_grain_model();
        model
            .calc_misorientation(&FrameSelection::All, &MisorientationOptions::default(), &ProgressHandle::new())
            .unwrap();

        let meta = model.metadata(MIS_ORI_KEY).unwrap();
        assert_eq!(meta.cardinality, Cardinality::Element);
        assert!(meta.includes_initial);
        assert_eq!(meta.shape, (5, 2));

        let meta = model.metadata(AV_ORI_KEY).unwrap();
        assert_eq!(meta.cardinality, Cardinality::Grain);
        assert_eq!(
            model.store().tag(AV_MIS_ORI_KEY, "units").unwrap(),
            Some(&json!("degrees"))
        );
    }

    #[test]
    fn test_grain_average() {
        let mut model = two_grain_model();
        let data = DMatrix::from_row_slice(5, 2, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0]);
        model.store_mut().insert(
            "strain",
            StoredArray::Scalar(data),
            tags(Cardinality::Element, &[]),
        );

        let avg = model.calc_grain_average("strain", Some("grainStrain")).unwrap();
        assert_relative_eq!(avg[(0, 0)], 2.0);
        assert_relative_eq!(avg[(0, 1)], 3.0);
        assert_relative_eq!(avg[(1, 0)], 7.0);
        assert_relative_eq!(avg[(1, 1)], 8.0);
        assert_eq!(model.metadata("grainStrain").unwrap().cardinality, Cardinality::Grain);

        assert!(model.calc_grain_average("grainStrain", None).is_err());
    }

    #[test]
    fn test_grain_average_checks_rows() {
        let mut model = two_grain_model();
        model.store_mut().insert(
            "strain",
            StoredArray::Scalar(DMatrix::from_element(3, 2, 1.0)),
            tags(Cardinality::Element, &[]),
        );

        assert!(matches!(
            model.calc_grain_average("strain", None),
            Err(MisoriError::ShapeMismatch { expected: (5, 2), found: (3, 2) })
        ));
        assert!(!model.store().contains("grainStrain"));
    }
}
