//! Definitions -- A tiny interface for the chunk-stitching problem.
//! Chunked inference hands us, for each sliding window over a pileup, a matrix of per-position
//! symbol probabilities and the positions those rows correspond to. We pass these around
//! (and interact with other programs) as JSON objects; the top-level message is [ConsensusJob](ConsensusJob)
//! and the answer for each region is a [ConsensusRecord](ConsensusRecord).

use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use std::convert::TryFrom;
use std::ops::Range;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DefinitionError {
    #[error("Invalid alphabet {symbols:?}: {message}")]
    InvalidAlphabet { symbols: String, message: String },

    #[error("Ragged probability matrix: row {row} has {actual} columns, expected {expected}")]
    RaggedMatrix {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Probability matrix has rows but zero columns")]
    ZeroWidth,

    #[error("Probability buffer of length {len} is not a multiple of width {width}")]
    BufferShape { len: usize, width: usize },

    #[error("Chunk has {rows} probability rows but {positions} positions")]
    RowCountMismatch { rows: usize, positions: usize },

    #[error("Chunk positions are not strictly ascending at index {index}")]
    UnsortedPositions { index: usize },
}

/// A coordinate of a predicted symbol.
/// `inserted_position` is 0 for the symbol aligned to the reference base and counts up
/// for each symbol inserted after it. Ordered by reference position, then inserted position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(from = "(i64, i64)", into = "(i64, i64)")]
pub struct Position {
    pub reference_position: i64,
    pub inserted_position: i64,
}

impl Position {
    pub fn new(reference_position: i64, inserted_position: i64) -> Self {
        Self {
            reference_position,
            inserted_position,
        }
    }
}

impl From<(i64, i64)> for Position {
    fn from((reference_position, inserted_position): (i64, i64)) -> Self {
        Self::new(reference_position, inserted_position)
    }
}

impl From<Position> for (i64, i64) {
    fn from(pos: Position) -> Self {
        (pos.reference_position, pos.inserted_position)
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "({}, {})", self.reference_position, self.inserted_position)
    }
}

/// Output channels of the network, in order.
/// The 0-th symbol is the placeholder ("no call"), which never appears in a consensus.
#[derive(Debug, Clone, PartialEq, Eq, Hash, SerializeDisplay, DeserializeFromStr)]
pub struct Alphabet {
    symbols: Vec<u8>,
}

pub const DEFAULT_ALPHABET: &[u8] = b"*ACGT";

impl Default for Alphabet {
    fn default() -> Self {
        Self {
            symbols: DEFAULT_ALPHABET.to_vec(),
        }
    }
}

impl Alphabet {
    pub fn new(symbols: &[u8]) -> Result<Self, DefinitionError> {
        let invalid = |message: &str| DefinitionError::InvalidAlphabet {
            symbols: String::from_utf8_lossy(symbols).to_string(),
            message: message.to_string(),
        };
        if symbols.len() < 2 {
            return Err(invalid("need a placeholder and at least one base"));
        }
        if !symbols.iter().all(|s| s.is_ascii_graphic()) {
            return Err(invalid("symbols should be printable ASCII"));
        }
        for (i, s) in symbols.iter().enumerate() {
            if symbols[..i].contains(s) {
                return Err(invalid("duplicated symbol"));
            }
        }
        Ok(Self {
            symbols: symbols.to_vec(),
        })
    }
    /// Number of symbols, including the placeholder.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
    pub fn placeholder(&self) -> u8 {
        self.symbols[0]
    }
    pub fn is_placeholder(&self, idx: usize) -> bool {
        idx == 0
    }
    pub fn symbol(&self, idx: usize) -> Option<u8> {
        self.symbols.get(idx).copied()
    }
    pub fn symbols(&self) -> &[u8] {
        &self.symbols
    }
    /// Real bases, i.e., every symbol except the placeholder.
    pub fn bases(&self) -> &[u8] {
        &self.symbols[1..]
    }
}

impl std::fmt::Display for Alphabet {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.symbols))
    }
}

impl std::str::FromStr for Alphabet {
    type Err = DefinitionError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.as_bytes())
    }
}

/// N x K matrix of probabilities, row-major.
/// Row i is the distribution over the alphabet at the i-th position of a chunk.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<f64>>", into = "Vec<Vec<f64>>")]
pub struct ProbabilityMatrix {
    width: usize,
    data: Vec<f64>,
}

impl ProbabilityMatrix {
    pub fn empty(width: usize) -> Self {
        Self {
            width,
            data: vec![],
        }
    }
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Result<Self, DefinitionError> {
        let width = rows.first().map(|r| r.as_ref().len()).unwrap_or(0);
        if !rows.is_empty() && width == 0 {
            return Err(DefinitionError::ZeroWidth);
        }
        let mut data = Vec::with_capacity(width * rows.len());
        for (row, probs) in rows.iter().enumerate() {
            let probs = probs.as_ref();
            if probs.len() != width {
                return Err(DefinitionError::RaggedMatrix {
                    row,
                    expected: width,
                    actual: probs.len(),
                });
            }
            data.extend_from_slice(probs);
        }
        Ok(Self { width, data })
    }
    pub fn with_width(width: usize, data: Vec<f64>) -> Result<Self, DefinitionError> {
        match width {
            0 if !data.is_empty() => Err(DefinitionError::ZeroWidth),
            0 => Ok(Self::empty(0)),
            _ if data.len() % width != 0 => Err(DefinitionError::BufferShape {
                len: data.len(),
                width,
            }),
            _ => Ok(Self { width, data }),
        }
    }
    /// Number of rows.
    pub fn len(&self) -> usize {
        self.view().len()
    }
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
    pub fn width(&self) -> usize {
        self.width
    }
    pub fn row(&self, idx: usize) -> &[f64] {
        &self.data[idx * self.width..(idx + 1) * self.width]
    }
    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.view().rows()
    }
    pub fn view(&self) -> MatrixView<'_> {
        MatrixView {
            width: self.width,
            data: &self.data,
        }
    }
    /// Rows in `range`. Panics if the range is out of bounds, as slicing does.
    pub fn slice(&self, range: Range<usize>) -> MatrixView<'_> {
        let (start, end) = (range.start * self.width, range.end * self.width);
        MatrixView {
            width: self.width,
            data: &self.data[start..end],
        }
    }
}

impl TryFrom<Vec<Vec<f64>>> for ProbabilityMatrix {
    type Error = DefinitionError;
    fn try_from(rows: Vec<Vec<f64>>) -> Result<Self, Self::Error> {
        Self::from_rows(rows.as_slice())
    }
}

impl From<ProbabilityMatrix> for Vec<Vec<f64>> {
    fn from(matrix: ProbabilityMatrix) -> Self {
        matrix.rows().map(|r| r.to_vec()).collect()
    }
}

/// Borrowed run of consecutive rows of a [ProbabilityMatrix](ProbabilityMatrix).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatrixView<'a> {
    width: usize,
    data: &'a [f64],
}

impl<'a> MatrixView<'a> {
    pub fn width(&self) -> usize {
        self.width
    }
    pub fn len(&self) -> usize {
        match self.width {
            0 => 0,
            w => self.data.len() / w,
        }
    }
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
    pub fn row(&self, idx: usize) -> &'a [f64] {
        &self.data[idx * self.width..(idx + 1) * self.width]
    }
    pub fn rows(&self) -> std::slice::ChunksExact<'a, f64> {
        // A zero-width view never holds data, so the fallback width yields nothing.
        self.data.chunks_exact(self.width.max(1))
    }
}

/// Positions and probabilities of one inference window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawChunk")]
pub struct Chunk {
    positions: Vec<Position>,
    probs: ProbabilityMatrix,
}

#[derive(Deserialize)]
struct RawChunk {
    positions: Vec<Position>,
    probs: ProbabilityMatrix,
}

impl TryFrom<RawChunk> for Chunk {
    type Error = DefinitionError;
    fn try_from(raw: RawChunk) -> Result<Self, Self::Error> {
        Self::new(raw.positions, raw.probs)
    }
}

impl Chunk {
    pub fn new(positions: Vec<Position>, probs: ProbabilityMatrix) -> Result<Self, DefinitionError> {
        if positions.len() != probs.len() {
            return Err(DefinitionError::RowCountMismatch {
                rows: probs.len(),
                positions: positions.len(),
            });
        }
        if let Some(index) = positions.windows(2).position(|w| w[0] >= w[1]) {
            return Err(DefinitionError::UnsortedPositions { index: index + 1 });
        }
        Ok(Self { positions, probs })
    }
    pub fn positions(&self) -> &[Position] {
        &self.positions
    }
    pub fn probs(&self) -> &ProbabilityMatrix {
        &self.probs
    }
    pub fn len(&self) -> usize {
        self.positions.len()
    }
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
    pub fn into_parts(self) -> (Vec<Position>, ProbabilityMatrix) {
        (self.positions, self.probs)
    }
}

/// Chunks covering one contig (or one window series), in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub name: String,
    pub chunks: Vec<Chunk>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusJob {
    #[serde(default)]
    pub alphabet: Alphabet,
    pub regions: Vec<Region>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusRecord {
    pub name: String,
    /// Consensus sequence, on the real bases of the alphabet.
    pub seq: String,
    /// Probability of each base of `seq`, if it was requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Vec<f64>>,
    /// Phred-scaled qualities, parallel to `seq`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<Vec<u8>>,
}

impl ConsensusRecord {
    pub fn new(name: &str, seq: String) -> Self {
        Self {
            name: name.to_string(),
            seq,
            confidence: None,
            quality: None,
        }
    }
    pub fn seq(&self) -> &[u8] {
        self.seq.as_bytes()
    }
}
