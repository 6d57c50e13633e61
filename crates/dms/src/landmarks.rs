//! 68-point facial landmark sets and the regions sliced from them

use std::ops::Range;

use crate::geometry::Point;
use crate::DmsError;

/// Number of points produced by the 68-point landmark model
pub const LANDMARK_COUNT: usize = 68;

/// Landmark index ranges (iBUG 300-W layout)
pub mod indices {
    use std::ops::Range;

    pub const LEFT_EYE: Range<usize> = 36..42;
    pub const RIGHT_EYE: Range<usize> = 42..48;
    /// Outer lip (48..60) followed by inner lip (60..68)
    pub const MOUTH: Range<usize> = 48..68;
}

/// Six points outlining one eye, clockwise from the outer corner
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyeRegion([Point; 6]);

impl EyeRegion {
    pub fn new(points: [Point; 6]) -> Self {
        Self(points)
    }

    pub fn points(&self) -> &[Point; 6] {
        &self.0
    }
}

/// Twenty points outlining the outer and inner lips
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MouthRegion([Point; 20]);

impl MouthRegion {
    pub fn new(points: [Point; 20]) -> Self {
        Self(points)
    }

    pub fn points(&self) -> &[Point; 20] {
        &self.0
    }
}

/// One face's landmarks. Always exactly 68 points in detector order.
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkSet {
    points: Vec<Point>,
}

impl LandmarkSet {
    /// Validate the point count coming from a detector
    pub fn new(points: Vec<Point>) -> Result<Self, DmsError> {
        if points.len() != LANDMARK_COUNT {
            return Err(DmsError::LandmarkCount {
                expected: LANDMARK_COUNT,
                actual: points.len(),
            });
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn left_eye(&self) -> EyeRegion {
        EyeRegion(self.slice(indices::LEFT_EYE))
    }

    pub fn right_eye(&self) -> EyeRegion {
        EyeRegion(self.slice(indices::RIGHT_EYE))
    }

    pub fn mouth(&self) -> MouthRegion {
        MouthRegion(self.slice(indices::MOUTH))
    }

    // Ranges are compile-time constants inside 0..68 and the length is
    // checked in `new`, so indexing cannot go out of bounds.
    fn slice<const N: usize>(&self, range: Range<usize>) -> [Point; N] {
        debug_assert_eq!(range.len(), N);
        std::array::from_fn(|i| self.points[range.start + i])
    }
}

impl TryFrom<Vec<[f32; 2]>> for LandmarkSet {
    type Error = DmsError;

    fn try_from(raw: Vec<[f32; 2]>) -> Result<Self, Self::Error> {
        Self::new(raw.into_iter().map(Point::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered() -> LandmarkSet {
        LandmarkSet::new((0..68).map(|i| Point::new(i as f32, 0.0)).collect()).unwrap()
    }

    #[test]
    fn test_rejects_wrong_point_count() {
        let err = LandmarkSet::new(vec![Point::default(); 5]).unwrap_err();
        assert!(matches!(err, DmsError::LandmarkCount { expected: 68, actual: 5 }));
    }

    #[test]
    fn test_regions_follow_index_layout() {
        let set = numbered();
        assert_eq!(set.left_eye().points()[0].x, 36.0);
        assert_eq!(set.left_eye().points()[5].x, 41.0);
        assert_eq!(set.right_eye().points()[0].x, 42.0);
        assert_eq!(set.mouth().points()[0].x, 48.0);
        assert_eq!(set.mouth().points()[19].x, 67.0);
    }

    #[test]
    fn test_try_from_raw_pairs() {
        let raw: Vec<[f32; 2]> = (0..68).map(|i| [i as f32, 1.0]).collect();
        let set = LandmarkSet::try_from(raw).unwrap();
        assert_eq!(set.points().len(), LANDMARK_COUNT);
        assert_eq!(set.points()[10], Point::new(10.0, 1.0));
    }
}
