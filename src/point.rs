//! Point type and the coordinate capability of payloads

use serde::{Deserialize, Serialize};

/// A location in the (mz, retention time) plane
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub mz: f64,
    pub rt: f64,
}

impl Point {
    /// Create a new point
    pub fn new(mz: f64, rt: f64) -> Self {
        Self { mz, rt }
    }

    /// Offset of `other` relative to `self`, as `(d_mz, d_rt)`
    pub fn offset_to(&self, other: &Point) -> (f64, f64) {
        (other.mz - self.mz, other.rt - self.rt)
    }

    /// Whether both coordinates are finite
    pub fn is_finite(&self) -> bool {
        self.mz.is_finite() && self.rt.is_finite()
    }
}

impl From<(f64, f64)> for Point {
    fn from((mz, rt): (f64, f64)) -> Self {
        Self::new(mz, rt)
    }
}

/// Payloads that expose their own coordinates.
///
/// `rt_min` and `rt_max` describe the payload's elution window and default
/// to the single retention time for point-like observations.
pub trait Coordinates {
    fn mz(&self) -> f64;

    fn rt(&self) -> f64;

    fn rt_min(&self) -> f64 {
        self.rt()
    }

    fn rt_max(&self) -> f64 {
        self.rt()
    }

    fn point(&self) -> Point {
        Point::new(self.mz(), self.rt())
    }
}

impl Coordinates for Point {
    fn mz(&self) -> f64 {
        self.mz
    }

    fn rt(&self) -> f64 {
        self.rt
    }
}

impl<C: Coordinates + ?Sized> Coordinates for &C {
    fn mz(&self) -> f64 {
        (**self).mz()
    }

    fn rt(&self) -> f64 {
        (**self).rt()
    }

    fn rt_min(&self) -> f64 {
        (**self).rt_min()
    }

    fn rt_max(&self) -> f64 {
        (**self).rt_max()
    }
}

/// Offset `(d_mz, d_rt)` of `candidate` relative to `query`
pub fn offsets<A: Coordinates, B: Coordinates>(query: &A, candidate: &B) -> (f64, f64) {
    query.point().offset_to(&candidate.point())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_point_offset() {
        let a = Point::new(500.0, 1200.0);
        let b = Point::new(500.002, 1230.0);
        let (d_mz, d_rt) = a.offset_to(&b);
        assert_relative_eq!(d_mz, 0.002, epsilon = 1e-9);
        assert_relative_eq!(d_rt, 30.0, epsilon = 1e-9);
    }

    #[test]
    fn test_point_window_defaults_to_rt() {
        let p = Point::new(1.0, 2.0);
        assert_eq!(p.rt_min(), 2.0);
        assert_eq!(p.rt_max(), 2.0);
        assert_eq!(p.point(), p);
    }

    #[test]
    fn test_offsets_through_references() {
        let a = Point::from((1.0, 2.0));
        let b = Point::from((1.5, 1.0));
        assert_eq!(offsets(&&a, &b), (0.5, -1.0));
    }

    #[test]
    fn test_is_finite() {
        assert!(Point::new(1.0, 2.0).is_finite());
        assert!(!Point::new(f64::NAN, 2.0).is_finite());
    }
}
