//! Error types of the stitcher.
use definitions::Position;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StitchError {
    /// Two adjacent chunks do not share a consistent overlapping window.
    #[error("Can not stitch {first} with {second}")]
    UnstitchableOverlap {
        first: PositionRange,
        second: PositionRange,
    },

    #[error("No chunk to stitch")]
    EmptyInput,

    #[error("{matrices} probability matrices but {positions} position arrays")]
    LengthMismatch { matrices: usize, positions: usize },

    #[error("Chunk {chunk} has {actual} columns, expected {expected}")]
    WidthMismatch {
        chunk: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Chunk {chunk} has {rows} probability rows but {positions} positions")]
    RowCountMismatch {
        chunk: usize,
        rows: usize,
        positions: usize,
    },

    #[error("Positions of chunk {chunk} are not strictly ascending at index {index}")]
    UnsortedPositions { chunk: usize, index: usize },

    #[error("Chunk {chunk} is empty and can not overlap its neighbors")]
    EmptyChunk { chunk: usize },
}

pub type Result<T> = std::result::Result<T, StitchError>;

/// Summary of a position array, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionRange {
    pub first: Option<Position>,
    pub last: Option<Position>,
    pub len: usize,
}

impl PositionRange {
    pub fn of(positions: &[Position]) -> Self {
        Self {
            first: positions.first().copied(),
            last: positions.last().copied(),
            len: positions.len(),
        }
    }
}

impl std::fmt::Display for PositionRange {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match (self.first, self.last) {
            (Some(first), Some(last)) => write!(f, "[{}..{}] ({} positions)", first, last, self.len),
            _ => write!(f, "[] (0 positions)"),
        }
    }
}

pub(crate) fn unstitchable(first: &[Position], second: &[Position]) -> StitchError {
    StitchError::UnstitchableOverlap {
        first: PositionRange::of(first),
        second: PositionRange::of(second),
    }
}
