//! Byte range planning for chunked transfers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Inclusive byte interval `[start, end]` of a remote resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawRange")]
pub struct ChunkRange {
    start: u64,
    end: u64,
}

/// Unchecked wire form of [`ChunkRange`].
#[derive(Deserialize)]
struct RawRange {
    start: u64,
    end: u64,
}

impl TryFrom<RawRange> for ChunkRange {
    type Error = String;

    fn try_from(raw: RawRange) -> Result<Self, Self::Error> {
        Self::new(raw.start, raw.end)
            .ok_or_else(|| format!("range end {} precedes start {}", raw.end, raw.start))
    }
}

impl ChunkRange {
    /// Creates a range covering `start..=end`.
    ///
    /// Returns `None` when `end < start`.
    #[must_use]
    pub fn new(start: u64, end: u64) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// Range covering a whole resource of `total_size` bytes.
    #[must_use]
    pub fn whole(total_size: u64) -> Option<Self> {
        total_size.checked_sub(1).map(|end| Self { start: 0, end })
    }

    /// First byte offset.
    #[must_use]
    pub fn start(&self) -> u64 {
        self.start
    }

    /// Last byte offset (inclusive).
    #[must_use]
    pub fn end(&self) -> u64 {
        self.end
    }

    /// Number of bytes in the range; never zero.
    #[must_use]
    pub fn length(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Value for the HTTP `Range` request header.
    #[must_use]
    pub fn header_value(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }
}

impl fmt::Display for ChunkRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

/// Partitions `[0, total_size)` into contiguous ranges of `chunk_size` bytes.
///
/// The last range may be shorter. Returns an empty plan when either argument
/// is zero.
#[must_use]
pub fn plan_ranges(total_size: u64, chunk_size: u64) -> Vec<ChunkRange> {
    plan_ranges_from(0, total_size, chunk_size)
}

/// Partitions `[offset, total_size)` the same way as [`plan_ranges`].
///
/// Used when resuming: bytes before `offset` are already on disk.
#[must_use]
pub fn plan_ranges_from(offset: u64, total_size: u64, chunk_size: u64) -> Vec<ChunkRange> {
    if chunk_size == 0 || offset >= total_size {
        return Vec::new();
    }

    let remaining = total_size - offset;
    let capacity = usize::try_from(remaining.div_ceil(chunk_size)).unwrap_or(0);
    let mut ranges = Vec::with_capacity(capacity);
    let mut start = offset;
    while start < total_size {
        let end = start.saturating_add(chunk_size - 1).min(total_size - 1);
        ranges.push(ChunkRange { start, end });
        start = end + 1;
    }
    ranges
}
