//! # Unit Types
//!
//! Type-safe wrappers for the units the costing engine moves between. These
//! are plain f64 newtypes so JSON stays clean (just numbers) while the
//! conversions that matter (mm to cm, g to kg, seconds to minutes to hours)
//! live in one place.
//!
//! ## Metric Units
//!
//! - Length: millimeters (drawing dimensions), centimeters (volume math)
//! - Volume: cubic centimeters
//! - Density: grams per cubic centimeter
//! - Mass: grams, kilograms
//! - Time: seconds (tool changes), minutes (cycle times), hours (machine rates, tool life)
//!
//! ## Example
//!
//! ```rust
//! use cost_core::units::{Centimeters, Hours, Millimeters, Minutes, Seconds};
//!
//! let edge: Centimeters = Millimeters(120.0).into();
//! assert_eq!(edge.0, 12.0);
//!
//! let change: Minutes = Seconds(30.0).into();
//! let hours: Hours = change.into();
//! assert!((hours.0 - 0.5 / 60.0).abs() < 1e-12);
//! ```

use serde::{Deserialize, Serialize};
use std::ops::{Add, Div, Mul, Sub};

// ============================================================================
// Length Units
// ============================================================================

/// Length in millimeters
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Millimeters(pub f64);

/// Length in centimeters
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Centimeters(pub f64);

impl From<Millimeters> for Centimeters {
    fn from(mm: Millimeters) -> Self {
        Centimeters(mm.0 / 10.0)
    }
}

impl From<Centimeters> for Millimeters {
    fn from(cm: Centimeters) -> Self {
        Millimeters(cm.0 * 10.0)
    }
}

// ============================================================================
// Volume, Density and Mass
// ============================================================================

/// Volume in cubic centimeters
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CubicCm(pub f64);

/// Density in grams per cubic centimeter
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GramsPerCm3(pub f64);

/// Mass in grams
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Grams(pub f64);

/// Mass in kilograms
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Kilograms(pub f64);

impl Mul<GramsPerCm3> for CubicCm {
    type Output = Grams;
    fn mul(self, rhs: GramsPerCm3) -> Grams {
        Grams(self.0 * rhs.0)
    }
}

impl From<Grams> for Kilograms {
    fn from(g: Grams) -> Self {
        Kilograms(g.0 / 1000.0)
    }
}

impl From<Kilograms> for Grams {
    fn from(kg: Kilograms) -> Self {
        Grams(kg.0 * 1000.0)
    }
}

// ============================================================================
// Time Units
// ============================================================================

/// Time in seconds
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Seconds(pub f64);

/// Time in minutes
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Minutes(pub f64);

/// Time in hours
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Hours(pub f64);

impl From<Seconds> for Minutes {
    fn from(s: Seconds) -> Self {
        Minutes(s.0 / 60.0)
    }
}

impl From<Minutes> for Hours {
    fn from(min: Minutes) -> Self {
        Hours(min.0 / 60.0)
    }
}

impl From<Hours> for Minutes {
    fn from(h: Hours) -> Self {
        Minutes(h.0 * 60.0)
    }
}

// ============================================================================
// Arithmetic Implementations (macro to reduce boilerplate)
// ============================================================================

macro_rules! impl_arithmetic {
    ($type:ty) => {
        impl Add for $type {
            type Output = Self;
            fn add(self, rhs: Self) -> Self::Output {
                Self(self.0 + rhs.0)
            }
        }

        impl Sub for $type {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self::Output {
                Self(self.0 - rhs.0)
            }
        }

        impl Mul<f64> for $type {
            type Output = Self;
            fn mul(self, rhs: f64) -> Self::Output {
                Self(self.0 * rhs)
            }
        }

        impl Div<f64> for $type {
            type Output = Self;
            fn div(self, rhs: f64) -> Self::Output {
                Self(self.0 / rhs)
            }
        }

        impl $type {
            /// Get the raw f64 value
            pub fn value(self) -> f64 {
                self.0
            }

            /// Create from raw f64 value
            pub fn new(value: f64) -> Self {
                Self(value)
            }
        }
    };
}

impl_arithmetic!(Millimeters);
impl_arithmetic!(Centimeters);
impl_arithmetic!(CubicCm);
impl_arithmetic!(Grams);
impl_arithmetic!(Kilograms);
impl_arithmetic!(Seconds);
impl_arithmetic!(Minutes);
impl_arithmetic!(Hours);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mm_to_cm() {
        let cm: Centimeters = Millimeters(25.0).into();
        assert_eq!(cm.0, 2.5);
    }

    #[test]
    fn test_volume_times_density() {
        let grams = CubicCm(100.0) * GramsPerCm3(2.7);
        let kg: Kilograms = grams.into();
        assert!((kg.0 - 0.27).abs() < 1e-12);
    }

    #[test]
    fn test_time_chain() {
        let min: Minutes = Seconds(90.0).into();
        assert_eq!(min.0, 1.5);
        let h: Hours = Minutes(30.0).into();
        assert_eq!(h.0, 0.5);
        let back: Minutes = Hours(2.0).into();
        assert_eq!(back.0, 120.0);
    }

    #[test]
    fn test_arithmetic() {
        let a = Minutes(10.0);
        let b = Minutes(4.0);
        assert_eq!((a + b).0, 14.0);
        assert_eq!((a - b).0, 6.0);
        assert_eq!((a * 2.0).0, 20.0);
        assert_eq!((a / 2.0).0, 5.0);
    }

    #[test]
    fn test_serialization() {
        let mm = Millimeters(12.5);
        let json = serde_json::to_string(&mm).unwrap();
        assert_eq!(json, "12.5");

        let roundtrip: Millimeters = serde_json::from_str(&json).unwrap();
        assert_eq!(mm, roundtrip);
    }
}
