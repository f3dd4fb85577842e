use serde::Serialize;
use std::fmt;

use crate::error::{Error, Result};

/// Half-open byte range `[begin, end)` of one downloader's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ByteRange {
    pub begin: i64,
    pub end: i64,
}

impl ByteRange {
    pub fn new(begin: i64, end: i64) -> Self {
        ByteRange { begin, end }
    }

    pub fn len(&self) -> i64 {
        self.end - self.begin
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.begin
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{})", self.begin, self.end)
    }
}

/// Ordered, non-overlapping byte ranges. Touching ranges are coalesced on insertion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Segment {
    ranges: Vec<ByteRange>,
}

impl Segment {
    pub fn new() -> Self {
        Segment { ranges: Vec::new() }
    }

    pub fn from_range(begin: i64, end: i64) -> Self {
        let mut segment = Segment::new();
        if end > begin {
            segment.ranges.push(ByteRange::new(begin, end));
        }
        segment
    }

    pub fn ranges(&self) -> &[ByteRange] {
        &self.ranges
    }

    /// Total number of bytes covered.
    pub fn byte_len(&self) -> i64 {
        self.ranges.iter().map(|r| r.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn first_offset(&self) -> Option<i64> {
        self.ranges.first().map(|r| r.begin)
    }

    pub fn end_offset(&self) -> Option<i64> {
        self.ranges.last().map(|r| r.end)
    }

    /// Appends a range behind the current end. A range starting exactly at the current end
    /// extends the last range; an overlapping or out-of-order range is an internal error.
    pub fn push(&mut self, range: ByteRange) -> Result<()> {
        if range.is_empty() {
            return Ok(());
        }

        match self.ranges.last_mut() {
            Some(last) if range.begin < last.end => Err(Error::InvariantViolation(format!("segment range {} overlaps or precedes {}", range, last))),
            Some(last) if range.begin == last.end => {
                last.end = range.end;
                Ok(())
            }
            _ => {
                self.ranges.push(range);
                Ok(())
            }
        }
    }

    /// `true` when the segment is exactly one range.
    pub fn is_contiguous(&self) -> bool {
        self.ranges.len() == 1
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.ranges.iter().map(|r| r.to_string()).collect();
        write!(f, "{}", parts.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_coalesces_touching_ranges() {
        let mut segment = Segment::new();
        segment.push(ByteRange::new(0, 50)).unwrap();
        segment.push(ByteRange::new(50, 80)).unwrap();
        segment.push(ByteRange::new(100, 120)).unwrap();

        assert_eq!(segment.ranges(), &[ByteRange::new(0, 80), ByteRange::new(100, 120)]);
        assert_eq!(segment.byte_len(), 100);
        assert_eq!(segment.to_string(), "[0,80) [100,120)");
    }

    #[test]
    fn test_push_rejects_overlap() {
        let mut segment = Segment::from_range(0, 50);

        let result = segment.push(ByteRange::new(40, 60));

        assert!(matches!(result, Err(Error::InvariantViolation(_))));
        assert_eq!(segment.byte_len(), 50, "Rejected range must leave the segment untouched");
    }

    #[test]
    fn test_empty_range_is_ignored() {
        let mut segment = Segment::new();
        segment.push(ByteRange::new(10, 10)).unwrap();

        assert!(segment.is_empty());
        assert_eq!(segment.first_offset(), None);
    }
}
