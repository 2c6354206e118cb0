//! Crystal point-group rotations and symmetric equivalents

use std::f64::consts::FRAC_1_SQRT_2;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use super::orientation::Orientation;
use crate::error::{MisoriError, MisoriResult};

/// Crystal family whose proper rotations form the symmetry group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymmetryFamily {
    /// m-3m, 24 rotations
    Cubic,
    /// 6/mmm, 12 rotations
    Hexagonal,
    /// 4/mmm, 8 rotations
    Tetragonal,
    /// mmm, 4 rotations
    Orthorhombic,
    /// No symmetry, identity only
    #[serde(alias = "none")]
    Triclinic,
}

impl SymmetryFamily {
    /// All supported families
    pub const ALL: [SymmetryFamily; 5] = [
        SymmetryFamily::Cubic,
        SymmetryFamily::Hexagonal,
        SymmetryFamily::Tetragonal,
        SymmetryFamily::Orthorhombic,
        SymmetryFamily::Triclinic,
    ];

    /// Label used when parsing and displaying
    pub fn label(&self) -> &'static str {
        match self {
            SymmetryFamily::Cubic => "cubic",
            SymmetryFamily::Hexagonal => "hexagonal",
            SymmetryFamily::Tetragonal => "tetragonal",
            SymmetryFamily::Orthorhombic => "orthorhombic",
            SymmetryFamily::Triclinic => "triclinic",
        }
    }

    /// Number of proper rotations in the group
    pub fn order(&self) -> usize {
        symmetry_operators(*self).len()
    }

    /// Largest disorientation angle possible for the family (degrees)
    pub fn max_misorientation_deg(&self) -> f64 {
        match self {
            SymmetryFamily::Cubic => 62.8,
            SymmetryFamily::Hexagonal => 93.8,
            SymmetryFamily::Tetragonal => 98.4,
            SymmetryFamily::Orthorhombic => 120.0,
            SymmetryFamily::Triclinic => 180.0,
        }
    }
}

impl Default for SymmetryFamily {
    fn default() -> Self {
        Self::Cubic
    }
}

impl fmt::Display for SymmetryFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for SymmetryFamily {
    type Err = MisoriError;

    fn from_str(s: &str) -> MisoriResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cubic" => Ok(SymmetryFamily::Cubic),
            "hexagonal" => Ok(SymmetryFamily::Hexagonal),
            "tetragonal" => Ok(SymmetryFamily::Tetragonal),
            "orthorhombic" => Ok(SymmetryFamily::Orthorhombic),
            "none" | "triclinic" => Ok(SymmetryFamily::Triclinic),
            _ => Err(MisoriError::UnknownSymmetryFamily(s.to_string())),
        }
    }
}

struct SymmetryTables {
    cubic: Vec<Orientation>,
    hexagonal: Vec<Orientation>,
    tetragonal: Vec<Orientation>,
    orthorhombic: Vec<Orientation>,
    triclinic: Vec<Orientation>,
}

static TABLES: OnceLock<SymmetryTables> = OnceLock::new();

fn q(w: f64, x: f64, y: f64, z: f64) -> Orientation {
    Orientation::from_components_unchecked(w, x, y, z)
}

fn cubic_table() -> Vec<Orientation> {
    let r = FRAC_1_SQRT_2;
    vec![
        q(1.0, 0.0, 0.0, 0.0),
        // 90 deg about <100>
        q(r, r, 0.0, 0.0),
        q(r, 0.0, r, 0.0),
        q(r, 0.0, 0.0, r),
        // 180 deg about <100>
        q(0.0, 1.0, 0.0, 0.0),
        q(0.0, 0.0, 1.0, 0.0),
        q(0.0, 0.0, 0.0, 1.0),
        // 270 deg about <100>
        q(r, -r, 0.0, 0.0),
        q(r, 0.0, -r, 0.0),
        q(r, 0.0, 0.0, -r),
        // 120/240 deg about <111>
        q(0.5, 0.5, 0.5, 0.5),
        q(0.5, -0.5, -0.5, -0.5),
        q(0.5, -0.5, 0.5, 0.5),
        q(0.5, 0.5, -0.5, -0.5),
        q(0.5, 0.5, -0.5, 0.5),
        q(0.5, -0.5, 0.5, -0.5),
        q(0.5, 0.5, 0.5, -0.5),
        q(0.5, -0.5, -0.5, 0.5),
        // 180 deg about <110>
        q(0.0, r, r, 0.0),
        q(0.0, r, -r, 0.0),
        q(0.0, r, 0.0, r),
        q(0.0, r, 0.0, -r),
        q(0.0, 0.0, r, r),
        q(0.0, 0.0, r, -r),
    ]
}

fn hexagonal_table() -> Vec<Orientation> {
    // c along z, a1 along x
    let (s30, c30) = 30f64.to_radians().sin_cos();
    let (s60, c60) = 60f64.to_radians().sin_cos();
    vec![
        q(1.0, 0.0, 0.0, 0.0),
        // 60, 120, 180, 240, 300 deg about [0001]
        q(c30, 0.0, 0.0, s30),
        q(c60, 0.0, 0.0, s60),
        q(0.0, 0.0, 0.0, 1.0),
        q(c60, 0.0, 0.0, -s60),
        q(c30, 0.0, 0.0, -s30),
        // 180 deg about in-plane axes every 30 deg
        q(0.0, 1.0, 0.0, 0.0),
        q(0.0, c30, s30, 0.0),
        q(0.0, c60, s60, 0.0),
        q(0.0, 0.0, 1.0, 0.0),
        q(0.0, -c60, s60, 0.0),
        q(0.0, -c30, s30, 0.0),
    ]
}

fn tetragonal_table() -> Vec<Orientation> {
    let r = FRAC_1_SQRT_2;
    vec![
        q(1.0, 0.0, 0.0, 0.0),
        q(r, 0.0, 0.0, r),
        q(0.0, 0.0, 0.0, 1.0),
        q(r, 0.0, 0.0, -r),
        q(0.0, 1.0, 0.0, 0.0),
        q(0.0, 0.0, 1.0, 0.0),
        q(0.0, r, r, 0.0),
        q(0.0, r, -r, 0.0),
    ]
}

fn orthorhombic_table() -> Vec<Orientation> {
    vec![
        q(1.0, 0.0, 0.0, 0.0),
        q(0.0, 1.0, 0.0, 0.0),
        q(0.0, 0.0, 1.0, 0.0),
        q(0.0, 0.0, 0.0, 1.0),
    ]
}

fn tables() -> &'static SymmetryTables {
    TABLES.get_or_init(|| SymmetryTables {
        cubic: cubic_table(),
        hexagonal: hexagonal_table(),
        tetragonal: tetragonal_table(),
        orthorhombic: orthorhombic_table(),
        triclinic: vec![Orientation::identity()],
    })
}

/// Proper rotations of a crystal family, identity first.
///
/// The tables are built once per process and never modified.
pub fn symmetry_operators(family: SymmetryFamily) -> &'static [Orientation] {
    let t = tables();
    match family {
        SymmetryFamily::Cubic => &t.cubic,
        SymmetryFamily::Hexagonal => &t.hexagonal,
        SymmetryFamily::Tetragonal => &t.tetragonal,
        SymmetryFamily::Orthorhombic => &t.orthorhombic,
        SymmetryFamily::Triclinic => &t.triclinic,
    }
}

/// Look up the operator table from a family label
pub fn symmetry_operators_for(label: &str) -> MisoriResult<&'static [Orientation]> {
    Ok(symmetry_operators(label.parse()?))
}

/// All symmetry-equivalent forms of one orientation, in table order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymmetricEquivalents {
    family: SymmetryFamily,
    forms: Vec<Orientation>,
}

impl SymmetricEquivalents {
    /// Forms in symmetry-table order
    pub fn forms(&self) -> &[Orientation] {
        &self.forms
    }

    /// Family that generated the forms
    pub fn family(&self) -> SymmetryFamily {
        self.family
    }

    /// Number of forms (the group order)
    pub fn len(&self) -> usize {
        self.forms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forms.is_empty()
    }

    /// The identity form, i.e. the orientation the set was generated from
    pub fn original(&self) -> Orientation {
        self.forms[0]
    }

    /// Form closest to `reference`: (table index, form, |dot|).
    ///
    /// Exact ties resolve to the lowest table index. NaN forms never win, so
    /// an all-NaN set reports index 0 with a NaN dot.
    pub fn nearest_to(&self, reference: &Orientation) -> (usize, Orientation, f64) {
        let mut best = (0, self.forms[0], self.forms[0].dot(reference).abs());
        for (i, form) in self.forms.iter().enumerate().skip(1) {
            let d = form.dot(reference).abs();
            if d > best.2 || (best.2.is_nan() && !d.is_nan()) {
                best = (i, *form, d);
            }
        }
        best
    }
}

/// Generate `{ S * q : S in table(family) }` in table order.
///
/// Symmetry operators are applied on the left and every form is brought
/// into the w >= 0 half-space.
pub fn symmetric_equivalents(orientation: &Orientation, family: SymmetryFamily) -> SymmetricEquivalents {
    let forms = symmetry_operators(family)
        .iter()
        .map(|sym| sym.multiply(orientation))
        .collect();
    SymmetricEquivalents { family, forms }
}
