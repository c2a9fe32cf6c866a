//! # Billet Geometry
//!
//! Raw stock weight from a billet shape and a material density.
//!
//! All dimensions are entered in millimeters (as on the drawing) and converted
//! to centimeters before the volume is taken, so that volume (cm³) × density
//! (g/cm³) gives grams directly.
//!
//! | Shape | Volume |
//! |-------|--------|
//! | Block, Bar, Plate | l × w × h |
//! | Cylinder, Rod | π r² l |
//! | Tube | π (R² − r²) l |
//! | Cube | s³ |
//! | RectangleTube | (w h − (w − 2t)(h − 2t)) l |
//!
//! Invalid geometry never fails: [`weight_kg`] returns zero so that a form
//! being edited keystroke by keystroke always has a number to show. Use
//! [`BilletShape::validate`] to find out *why* a weight is zero.
//!
//! ## Example
//!
//! ```rust
//! use cost_core::geometry::{weight_kg, BilletShape};
//! use cost_core::units::GramsPerCm3;
//!
//! let block = BilletShape::Block { length_mm: 100.0, width_mm: 50.0, height_mm: 20.0 };
//! let kg = weight_kg(&block, GramsPerCm3(2.7));
//! assert_eq!(kg.0, 0.27);
//! ```

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::errors::{CostError, CostResult};
use crate::units::{Centimeters, CubicCm, GramsPerCm3, Kilograms, Millimeters};

/// Raw stock shape with its dimensions in millimeters.
///
/// ## JSON Example
///
/// ```json
/// { "shape": "Tube", "outer_diameter_mm": 50.0, "inner_diameter_mm": 40.0, "length_mm": 100.0 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape")]
pub enum BilletShape {
    Block {
        length_mm: f64,
        width_mm: f64,
        height_mm: f64,
    },
    Bar {
        length_mm: f64,
        width_mm: f64,
        height_mm: f64,
    },
    Plate {
        length_mm: f64,
        width_mm: f64,
        thickness_mm: f64,
    },
    Cylinder {
        diameter_mm: f64,
        length_mm: f64,
    },
    Rod {
        diameter_mm: f64,
        length_mm: f64,
    },
    Tube {
        outer_diameter_mm: f64,
        inner_diameter_mm: f64,
        length_mm: f64,
    },
    Cube {
        side_mm: f64,
    },
    RectangleTube {
        width_mm: f64,
        height_mm: f64,
        wall_thickness_mm: f64,
        length_mm: f64,
    },
}

impl BilletShape {
    /// Shape name as shown to users
    pub fn name(&self) -> &'static str {
        match self {
            BilletShape::Block { .. } => "Block",
            BilletShape::Bar { .. } => "Bar",
            BilletShape::Plate { .. } => "Plate",
            BilletShape::Cylinder { .. } => "Cylinder",
            BilletShape::Rod { .. } => "Rod",
            BilletShape::Tube { .. } => "Tube",
            BilletShape::Cube { .. } => "Cube",
            BilletShape::RectangleTube { .. } => "RectangleTube",
        }
    }

    /// All linear dimensions with their field names.
    fn dimensions(&self) -> Vec<(&'static str, f64)> {
        match *self {
            BilletShape::Block { length_mm, width_mm, height_mm }
            | BilletShape::Bar { length_mm, width_mm, height_mm } => vec![
                ("length_mm", length_mm),
                ("width_mm", width_mm),
                ("height_mm", height_mm),
            ],
            BilletShape::Plate { length_mm, width_mm, thickness_mm } => vec![
                ("length_mm", length_mm),
                ("width_mm", width_mm),
                ("thickness_mm", thickness_mm),
            ],
            BilletShape::Cylinder { diameter_mm, length_mm }
            | BilletShape::Rod { diameter_mm, length_mm } => {
                vec![("diameter_mm", diameter_mm), ("length_mm", length_mm)]
            }
            BilletShape::Tube { outer_diameter_mm, inner_diameter_mm, length_mm } => vec![
                ("outer_diameter_mm", outer_diameter_mm),
                ("inner_diameter_mm", inner_diameter_mm),
                ("length_mm", length_mm),
            ],
            BilletShape::Cube { side_mm } => vec![("side_mm", side_mm)],
            BilletShape::RectangleTube { width_mm, height_mm, wall_thickness_mm, length_mm } => vec![
                ("width_mm", width_mm),
                ("height_mm", height_mm),
                ("wall_thickness_mm", wall_thickness_mm),
                ("length_mm", length_mm),
            ],
        }
    }

    /// Check the dimension invariants.
    ///
    /// Every dimension must be finite and positive, a tube's bore must be
    /// smaller than its outside diameter, and a rectangle tube's wall must be
    /// thinner than half of each outer side.
    pub fn validate(&self) -> CostResult<()> {
        for (field, value) in self.dimensions() {
            if !value.is_finite() || value <= 0.0 {
                return Err(CostError::invalid_input(
                    field,
                    value.to_string(),
                    "Dimension must be a positive number",
                ));
            }
        }

        match *self {
            BilletShape::Tube { outer_diameter_mm, inner_diameter_mm, .. } => {
                if inner_diameter_mm >= outer_diameter_mm {
                    return Err(CostError::invalid_input(
                        "inner_diameter_mm",
                        inner_diameter_mm.to_string(),
                        format!("Inner diameter must be smaller than outer diameter ({})", outer_diameter_mm),
                    ));
                }
            }
            BilletShape::RectangleTube { width_mm, height_mm, wall_thickness_mm, .. } => {
                let limit = width_mm.min(height_mm) / 2.0;
                if wall_thickness_mm >= limit {
                    return Err(CostError::invalid_input(
                        "wall_thickness_mm",
                        wall_thickness_mm.to_string(),
                        format!("Wall thickness must be less than half of each outer side ({})", limit),
                    ));
                }
            }
            _ => {}
        }

        Ok(())
    }

    /// Billet volume in cm³, or zero when the geometry is invalid.
    pub fn volume_cm3(&self) -> CubicCm {
        if self.validate().is_err() {
            return CubicCm(0.0);
        }

        let cm = |mm: f64| Centimeters::from(Millimeters(mm)).0;

        let volume = match *self {
            BilletShape::Block { length_mm, width_mm, height_mm }
            | BilletShape::Bar { length_mm, width_mm, height_mm } => {
                cm(length_mm) * cm(width_mm) * cm(height_mm)
            }
            BilletShape::Plate { length_mm, width_mm, thickness_mm } => {
                cm(length_mm) * cm(width_mm) * cm(thickness_mm)
            }
            BilletShape::Cylinder { diameter_mm, length_mm }
            | BilletShape::Rod { diameter_mm, length_mm } => {
                let r = cm(diameter_mm) / 2.0;
                PI * r * r * cm(length_mm)
            }
            BilletShape::Tube { outer_diameter_mm, inner_diameter_mm, length_mm } => {
                let outer = cm(outer_diameter_mm) / 2.0;
                let inner = cm(inner_diameter_mm) / 2.0;
                PI * (outer * outer - inner * inner) * cm(length_mm)
            }
            BilletShape::Cube { side_mm } => {
                let s = cm(side_mm);
                s * s * s
            }
            BilletShape::RectangleTube { width_mm, height_mm, wall_thickness_mm, length_mm } => {
                let w = cm(width_mm);
                let h = cm(height_mm);
                let t = cm(wall_thickness_mm);
                (w * h - (w - 2.0 * t) * (h - 2.0 * t)) * cm(length_mm)
            }
        };

        CubicCm(volume)
    }
}

/// Billet weight in kilograms, rounded to 4 decimal places.
///
/// Returns zero for a non-positive (or non-finite) density and for any
/// geometry that fails [`BilletShape::validate`].
pub fn weight_kg(shape: &BilletShape, density: GramsPerCm3) -> Kilograms {
    if !density.0.is_finite() || density.0 <= 0.0 {
        return Kilograms(0.0);
    }
    let kg: Kilograms = (shape.volume_cm3() * density).into();
    Kilograms(round_to(kg.0, 4))
}

/// Round to a fixed number of decimal places.
pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Billet as entered on a job: shape plus an optional density override.
///
/// When `density_g_cm3` is absent the referenced material's catalog density
/// is used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BilletSpec {
    #[serde(flatten)]
    pub shape: BilletShape,

    /// Density override in g/cm³
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub density_g_cm3: Option<f64>,
}

impl BilletSpec {
    pub fn new(shape: BilletShape) -> Self {
        BilletSpec { shape, density_g_cm3: None }
    }

    pub fn with_density(mut self, density_g_cm3: f64) -> Self {
        self.density_g_cm3 = Some(density_g_cm3);
        self
    }

    /// Effective density: the override if present, otherwise the catalog value.
    pub fn density(&self, catalog_density: Option<f64>) -> GramsPerCm3 {
        GramsPerCm3(self.density_g_cm3.or(catalog_density).unwrap_or(0.0))
    }

    /// Raw weight using the override or the catalog density.
    pub fn weight_kg(&self, catalog_density: Option<f64>) -> Kilograms {
        weight_kg(&self.shape, self.density(catalog_density))
    }
}
