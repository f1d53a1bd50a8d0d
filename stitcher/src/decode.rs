//! Decoding per-position probabilities into a consensus sequence.
use definitions::{Alphabet, MatrixView};

/// Upper bound of Phred quality we report.
pub const MAX_PHRED: u8 = 60;

/// A partial consensus, which can be concatenated in order.
pub trait Consensus: Default {
    fn append(&mut self, other: Self);
    fn len(&self) -> usize;
}

impl Consensus for String {
    fn append(&mut self, other: Self) {
        self.push_str(&other);
    }
    fn len(&self) -> usize {
        String::len(self)
    }
}

/// Sequence with the probability of each called base.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QualifiedSequence {
    pub seq: String,
    /// `confidence[i]` is the probability of `seq[i]`.
    pub confidence: Vec<f64>,
}

impl QualifiedSequence {
    pub fn phred_scores(&self) -> Vec<u8> {
        phred_scores(&self.confidence)
    }
}

impl Consensus for QualifiedSequence {
    fn append(&mut self, other: Self) {
        self.seq.push_str(&other.seq);
        self.confidence.extend(other.confidence);
    }
    fn len(&self) -> usize {
        self.seq.len()
    }
}

/// Decode a run of probability rows into a (partial) consensus.
/// Anything that can do it can be plugged into the stitcher,
/// including a plain closure `Fn(MatrixView) -> String`.
pub trait DecodeConsensus {
    type Output: Consensus;
    fn decode(&self, probs: MatrixView<'_>) -> Self::Output;
    /// The number of columns this decoder understands, if it is fixed.
    fn width(&self) -> Option<usize> {
        None
    }
}

impl<F> DecodeConsensus for F
where
    F: Fn(MatrixView<'_>) -> String,
{
    type Output = String;
    fn decode(&self, probs: MatrixView<'_>) -> String {
        self(probs)
    }
}

/// Index of the largest value. Ties go to the smallest index.
pub fn argmax(row: &[f64]) -> usize {
    let mut best = 0;
    for (idx, &p) in row.iter().enumerate().skip(1) {
        if row[best] < p {
            best = idx;
        }
    }
    best
}

/// Choose the most probable symbol at each row, then drop placeholders.
pub fn decode_consensus(alphabet: &Alphabet, probs: MatrixView<'_>) -> String {
    probs
        .rows()
        .map(argmax)
        .filter(|&idx| !alphabet.is_placeholder(idx))
        .filter_map(|idx| alphabet.symbol(idx))
        .map(char::from)
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct ArgmaxDecoder {
    alphabet: Alphabet,
}

impl ArgmaxDecoder {
    pub fn new(alphabet: Alphabet) -> Self {
        Self { alphabet }
    }
    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }
}

impl DecodeConsensus for ArgmaxDecoder {
    type Output = String;
    fn decode(&self, probs: MatrixView<'_>) -> String {
        decode_consensus(&self.alphabet, probs)
    }
    fn width(&self) -> Option<usize> {
        Some(self.alphabet.len())
    }
}

/// Argmax decoding, keeping the winning probability of each base.
#[derive(Debug, Clone, Default)]
pub struct ConfidenceDecoder {
    alphabet: Alphabet,
}

impl ConfidenceDecoder {
    pub fn new(alphabet: Alphabet) -> Self {
        Self { alphabet }
    }
}

impl DecodeConsensus for ConfidenceDecoder {
    type Output = QualifiedSequence;
    fn decode(&self, probs: MatrixView<'_>) -> QualifiedSequence {
        let mut decoded = QualifiedSequence::default();
        for row in probs.rows() {
            let idx = argmax(row);
            if self.alphabet.is_placeholder(idx) {
                continue;
            }
            if let Some(base) = self.alphabet.symbol(idx) {
                decoded.seq.push(char::from(base));
                decoded.confidence.push(row[idx]);
            }
        }
        decoded
    }
    fn width(&self) -> Option<usize> {
        Some(self.alphabet.len())
    }
}

/// Phred score of a base called with probability `confidence`.
pub fn phred_score(confidence: f64) -> u8 {
    let error = 1f64 - confidence;
    if error <= 0f64 {
        return MAX_PHRED;
    }
    let qv = -10f64 * error.log10();
    qv.round().max(0f64).min(MAX_PHRED as f64) as u8
}

pub fn phred_scores(confidence: &[f64]) -> Vec<u8> {
    confidence.iter().map(|&c| phred_score(c)).collect()
}
