//! Stitcher -- Combine predictions on overlapping chunks into a consensus sequence.
//!
//! A model applied on sliding windows of a pileup gives, for each window (chunk), a matrix of
//! per-position probabilities over a small alphabet. [decode] turns such a matrix into a
//! string, [overlap] finds where two adjacent chunks should be cut, and [stitch] drives both
//! along a whole series of chunks.
pub mod decode;
pub mod error;
pub mod overlap;
pub mod stitch;
#[macro_use]
extern crate log;

pub use decode::{decode_consensus, ArgmaxDecoder, ConfidenceDecoder, DecodeConsensus};
pub use error::{Result, StitchError};
pub use overlap::overlap_indices;
pub use stitch::{kept_ranges, stitch, stitch_chunks, stitch_regions};
