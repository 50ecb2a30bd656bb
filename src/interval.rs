//! Half-open span arithmetic used by the matcher and the candidate generators.
//!
//! All coordinates are 0-based, half-open (`[start, end)`). A zero-length
//! span (`start == end`) contains no bases and never overlaps anything,
//! including itself, unless it is widened first.

/// A BED region on one chromosome.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Interval {
    pub chrom: String,
    pub start: u64,
    pub end: u64,
}

impl Interval {
    #[inline]
    pub fn new(chrom: impl Into<String>, start: u64, end: u64) -> Self {
        Self {
            chrom: chrom.into(),
            start,
            end,
        }
    }
}

/// Half-open overlap test: `max(a_start, b_start) < min(a_end, b_end)`.
#[inline]
pub fn overlaps(a_start: u64, a_end: u64, b_start: u64, b_end: u64) -> bool {
    a_start.max(b_start) < a_end.min(b_end)
}

/// Expand `[start, end)` by `buffer` on both sides, clamping at 0.
#[inline]
pub fn widen(start: u64, end: u64, buffer: u64) -> (u64, u64) {
    (start.saturating_sub(buffer), end.saturating_add(buffer))
}

/// Reciprocal overlap: intersection length over the length of the union span.
///
/// Returns 0.0 when the spans don't overlap, which also covers zero-length
/// spans (no division by zero).
#[inline]
pub fn reciprocal_overlap(a_start: u64, a_end: u64, b_start: u64, b_end: u64) -> f64 {
    let ovl_start = a_start.max(b_start);
    let ovl_end = a_end.min(b_end);
    if ovl_start >= ovl_end {
        return 0.0;
    }
    let union = a_end.max(b_end) - a_start.min(b_start);
    (ovl_end - ovl_start) as f64 / union as f64
}

/// Signed distance `a - b` between two coordinates.
#[inline]
pub fn signed_distance(a: u64, b: u64) -> i64 {
    a as i64 - b as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlap_is_half_open() {
        assert!(overlaps(100, 200, 150, 250));
        // Adjacent, not overlapping
        assert!(!overlaps(100, 200, 200, 300));
    }

    #[test]
    fn test_zero_length_never_overlaps() {
        assert!(!overlaps(150, 150, 100, 200));
        assert!(!overlaps(150, 150, 150, 150));
        let (start, end) = widen(150, 150, 1);
        assert!(overlaps(start, end, 100, 200));
    }

    #[test]
    fn test_widen_clamps_at_zero() {
        assert_eq!(widen(100, 200, 500), (0, 700));
        assert_eq!(widen(1000, 1100, 500), (500, 1600));
    }

    #[test]
    fn test_reciprocal_overlap() {
        assert!((reciprocal_overlap(1000, 1100, 1005, 1095) - 0.9).abs() < 1e-9);
        assert!((reciprocal_overlap(100, 200, 100, 200) - 1.0).abs() < 1e-9);
        assert_eq!(reciprocal_overlap(100, 200, 200, 300), 0.0);
        assert_eq!(reciprocal_overlap(100, 100, 100, 100), 0.0);
        // 50 shared out of a 150 union
        assert!((reciprocal_overlap(100, 200, 150, 250) - 50.0 / 150.0).abs() < 1e-9);
    }

    #[test]
    fn test_signed_distance() {
        assert_eq!(signed_distance(1000, 1005), -5);
        assert_eq!(signed_distance(1100, 1095), 5);
    }
}
