use serde::{Deserialize, Serialize};

/// An inclusive range of vertical offsets, in CSS pixels.
///
/// Used both for document scroll offsets (`filterZone`) and for element
/// bounds measured in viewport coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OffsetRange {
    pub start: f64,
    pub end: f64,
}

impl OffsetRange {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Whether `offset` lies within `[start, end]`.
    pub fn contains(&self, offset: f64) -> bool {
        offset >= self.start && offset <= self.end
    }

    /// Whether the two ranges share at least one point.
    pub fn overlaps(&self, other: &OffsetRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    pub fn len(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_is_inclusive() {
        let zone = OffsetRange::new(30.0, 200.0);
        assert!(zone.contains(30.0));
        assert!(zone.contains(200.0));
        assert!(!zone.contains(29.9));
        assert!(!zone.contains(200.1));
    }

    #[test]
    fn overlap_touching_edges() {
        let a = OffsetRange::new(0.0, 10.0);
        assert!(a.overlaps(&OffsetRange::new(10.0, 20.0)));
        assert!(!a.overlaps(&OffsetRange::new(10.5, 20.0)));
        assert!(OffsetRange::new(-5.0, 0.0).overlaps(&a));
    }

    #[test]
    fn inverted_range_is_empty() {
        let r = OffsetRange::new(5.0, 1.0);
        assert!(r.is_empty());
        assert_eq!(r.len(), 0.0);
    }
}
