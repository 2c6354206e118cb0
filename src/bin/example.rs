//! misori example - synthetic polycrystal under increasing lattice rotation

use anyhow::Result;
use nalgebra::DMatrix;

use misori::model::{AV_MIS_ORI_KEY, MAX_MIS_ORI_KEY};
use misori::prelude::*;

fn main() -> Result<()> {
    env_logger::init();

    println!("=== misori example: 4 grains x 25 elements, 5 load steps ===\n");

    let num_grains = 4;
    let per_grain = 25;
    let num_frames = 5;

    // Element e belongs to grain e / per_grain + 1
    let element_grain: Vec<usize> = (0..num_grains * per_grain).map(|e| e / per_grain + 1).collect();
    let mut model = PolycrystalModel::new(element_grain, num_grains, num_frames)?;

    // Each grain starts from its own texture component; elements spread
    // out a little more with every frame. Odd elements are stored through
    // a cubic symmetry operator to exercise the branch resolution.
    let ops = symmetry_operators(SymmetryFamily::Cubic);
    let oris = DMatrix::from_fn(model.num_elements(), num_frames + 1, |e, f| {
        let g = (e / per_grain) as f64;
        let spread = 0.002 * f as f64 * ((e % per_grain) as f64 - 12.0);
        let ori = Orientation::from_euler(0.4 * g + spread, 0.3 + 0.1 * g, 0.2 - spread);
        if e % 2 == 1 {
            ops[e % ops.len()].multiply(&ori)
        } else {
            ori
        }
    });
    model.set_orientations(oris)?;

    let options = MisorientationOptions::cubic().with_logging();
    let progress = ProgressHandle::logging("misorientation calculation");
    let report = model.calc_misorientation(&FrameSelection::All, &options, &progress)?;

    println!("{:>6} {:>6} {:>12} {:>12}", "frame", "grain", "mean (deg)", "max (deg)");
    for frame in 0..=num_frames {
        for grain in 1..=num_grains {
            let g = model.grain_misorientation(grain, frame)?;
            println!("{:>6} {:>6} {:>12.4} {:>12.4}", frame, grain, g.mean_deg, g.max_deg);
        }
    }

    println!("\nStore contents:\n{}", model.store());
    println!(
        "Grain-level arrays: {:?} {:?}",
        model.metadata(AV_MIS_ORI_KEY)?.shape,
        model.metadata(MAX_MIS_ORI_KEY)?.shape
    );
    println!("\nReport:\n{}", report.to_json()?);

    Ok(())
}
