use derive_more::{Add, AddAssign, Deref, DerefMut, Display, From, Into, Sub, SubAssign, Sum};
use serde::{Deserialize, Serialize};
use std::ops::{Div, Mul};

/// A length in PDF points (1/72 of an inch). All page geometry in this crate
/// is expressed in points.
#[derive(
    Debug,
    Default,
    Copy,
    Clone,
    PartialEq,
    PartialOrd,
    Add,
    AddAssign,
    Sub,
    SubAssign,
    Sum,
    Deref,
    DerefMut,
    From,
    Into,
    Display,
    Serialize,
    Deserialize,
)]
#[display("{_0}pt")]
#[serde(transparent)]
pub struct Pt(pub f32);

impl Pt {
    /// Widen to `f64` for layout arithmetic
    pub fn to_f64(self) -> f64 {
        self.0 as f64
    }

    /// Narrow a layout result back to points
    pub fn from_f64(value: f64) -> Pt {
        Pt(value as f32)
    }
}

impl Mul<f32> for Pt {
    type Output = Pt;

    fn mul(self, rhs: f32) -> Pt {
        Pt(self.0 * rhs)
    }
}

impl Div<f32> for Pt {
    type Output = Pt;

    fn div(self, rhs: f32) -> Pt {
        Pt(self.0 / rhs)
    }
}

impl Div<Pt> for Pt {
    type Output = f32;

    fn div(self, rhs: Pt) -> f32 {
        self.0 / rhs.0
    }
}

/// A length in inches, convertible to [Pt]
#[derive(Debug, Default, Copy, Clone, PartialEq, PartialOrd)]
pub struct In(pub f32);

impl From<In> for Pt {
    fn from(value: In) -> Pt {
        Pt(value.0 * 72.0)
    }
}

/// A length in millimetres, convertible to [Pt]
#[derive(Debug, Default, Copy, Clone, PartialEq, PartialOrd)]
pub struct Mm(pub f32);

impl From<Mm> for Pt {
    fn from(value: Mm) -> Pt {
        Pt(value.0 * 72.0 / 25.4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversions() {
        assert_eq!(Pt::from(In(1.0)), Pt(72.0));
        assert!((Pt::from(Mm(25.4)).0 - 72.0).abs() < 1e-4);
    }

    #[test]
    fn arithmetic() {
        assert_eq!(Pt(10.0) + Pt(5.0), Pt(15.0));
        assert_eq!(Pt(10.0) - Pt(5.0), Pt(5.0));
        assert_eq!(Pt(10.0) * 2.0, Pt(20.0));
        assert_eq!(Pt(10.0) / Pt(4.0), 2.5);
        assert_eq!(format!("{}", Pt(12.5)), "12.5pt");
    }
}
