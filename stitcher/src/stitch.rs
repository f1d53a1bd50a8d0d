//! Stitching predictions on overlapping chunks into a contiguous sequence.
//!
//! The chunks are processed in order: the split point between chunk `i-1` and chunk `i`
//! determines where chunk `i` starts contributing, so the loop is inherently sequential.
//! Independent regions, on the other hand, can be stitched in parallel by [stitch_regions](stitch_regions).
use crate::decode::{Consensus, DecodeConsensus};
use crate::error::{unstitchable, Result, StitchError};
use crate::overlap::overlap_indices;
use definitions::{Chunk, Position, ProbabilityMatrix, Region};
use rayon::prelude::*;
use std::borrow::Borrow;
use std::ops::Range;

fn check_inputs<M, P, D>(probs: &[M], positions: &[P], decoder: &D) -> Result<()>
where
    M: Borrow<ProbabilityMatrix>,
    P: AsRef<[Position]>,
    D: DecodeConsensus + ?Sized,
{
    if probs.is_empty() && positions.is_empty() {
        return Err(StitchError::EmptyInput);
    }
    if probs.len() != positions.len() {
        return Err(StitchError::LengthMismatch {
            matrices: probs.len(),
            positions: positions.len(),
        });
    }
    // Empty matrices do not carry any width to disagree with.
    let expected = decoder.width().or_else(|| {
        probs
            .iter()
            .map(|m| m.borrow())
            .find(|m| !m.is_empty())
            .map(|m| m.width())
    });
    let to_overlap = 1 < probs.len();
    for (chunk, (matrix, positions)) in probs.iter().zip(positions.iter()).enumerate() {
        let (matrix, positions) = (matrix.borrow(), positions.as_ref());
        if let Some(expected) = expected {
            if !matrix.is_empty() && matrix.width() != expected {
                return Err(StitchError::WidthMismatch {
                    chunk,
                    expected,
                    actual: matrix.width(),
                });
            }
        }
        if matrix.len() != positions.len() {
            return Err(StitchError::RowCountMismatch {
                chunk,
                rows: matrix.len(),
                positions: positions.len(),
            });
        }
        if let Some(index) = positions.windows(2).position(|w| w[0] >= w[1]) {
            return Err(StitchError::UnsortedPositions {
                chunk,
                index: index + 1,
            });
        }
        if to_overlap && positions.is_empty() {
            return Err(StitchError::EmptyChunk { chunk });
        }
    }
    Ok(())
}

/// The range of rows each chunk contributes to the consensus.
/// Mapping the ranges back to positions visits every position of the union exactly once, in order.
pub fn kept_ranges<P: AsRef<[Position]>>(positions: &[P]) -> Result<Vec<Range<usize>>> {
    let mut ranges = Vec::with_capacity(positions.len());
    let mut start = 0;
    for (idx, pair) in positions.windows(2).enumerate() {
        let (first, second) = (pair[0].as_ref(), pair[1].as_ref());
        let (end, next_start) = overlap_indices(first, second)?;
        if end < start {
            // The next chunk reaches back over the previous split.
            return Err(unstitchable(first, second));
        }
        trace!("STITCH\t{}\t{}\t{}", idx, start, end);
        ranges.push(start..end);
        start = next_start;
    }
    if let Some(last) = positions.last() {
        ranges.push(start..last.as_ref().len());
    }
    Ok(ranges)
}

/// Stitch probabilities on chunks (`probs[i]` is the matrix of the i-th chunk,
/// and `positions[i]` its positions) into a consensus, decoded by `decoder`.
/// All the arguments are checked before stitching, and nothing is returned when any pair can not be stitched.
pub fn stitch<M, P, D>(probs: &[M], positions: &[P], decoder: &D) -> Result<D::Output>
where
    M: Borrow<ProbabilityMatrix>,
    P: AsRef<[Position]>,
    D: DecodeConsensus + ?Sized,
{
    check_inputs(probs, positions, decoder)?;
    if let [matrix] = probs {
        return Ok(decoder.decode(matrix.borrow().view()));
    }
    let ranges = kept_ranges(positions)?;
    let mut consensus = D::Output::default();
    for (matrix, range) in probs.iter().zip(ranges) {
        consensus.append(decoder.decode(matrix.borrow().slice(range)));
    }
    debug!("STITCH\t{}\t{}", probs.len(), consensus.len());
    Ok(consensus)
}

pub fn stitch_chunks<D>(chunks: &[Chunk], decoder: &D) -> Result<D::Output>
where
    D: DecodeConsensus + ?Sized,
{
    let probs: Vec<_> = chunks.iter().map(|c| c.probs()).collect();
    let positions: Vec<_> = chunks.iter().map(|c| c.positions()).collect();
    stitch(&probs, &positions, decoder)
}

/// Stitch each region independently, in parallel. The results are in the same order as `regions`.
pub fn stitch_regions<'a, D>(regions: &'a [Region], decoder: &D) -> Vec<(&'a str, Result<D::Output>)>
where
    D: DecodeConsensus + Sync + ?Sized,
    D::Output: Send,
{
    regions
        .par_iter()
        .map(|region| {
            let result = stitch_chunks(&region.chunks, decoder);
            match result.as_ref() {
                Ok(consensus) => debug!("REGION\t{}\t{}", region.name, consensus.len()),
                Err(why) => warn!("REGION\t{}\t{}", region.name, why),
            }
            (region.name.as_str(), result)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::{decode_consensus, ArgmaxDecoder, ConfidenceDecoder};
    use definitions::{Alphabet, MatrixView};
    use rand::Rng;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;
    fn linear(range: Range<i64>) -> Vec<Position> {
        range.map(|i| Position::new(i, 0)).collect()
    }
    fn to_probs(seq: &[u8]) -> ProbabilityMatrix {
        let alphabet = Alphabet::default();
        let rows: Vec<Vec<f64>> = seq
            .iter()
            .map(|&b| {
                let idx = alphabet.symbols().iter().position(|&s| s == b).unwrap();
                (0..alphabet.len())
                    .map(|i| if i == idx { 0.8 } else { 0.05 })
                    .collect()
            })
            .collect();
        ProbabilityMatrix::from_rows(rows.as_slice()).unwrap()
    }
    #[test]
    fn two_chunks() {
        let probs = vec![to_probs(b"AACG"), to_probs(b"CGTA")];
        let positions = vec![linear(0..4), linear(2..6)];
        let decoder = ArgmaxDecoder::default();
        assert_eq!(kept_ranges(&positions), Ok(vec![0..3, 1..4]));
        assert_eq!(stitch(&probs, &positions, &decoder), Ok("AACGTA".to_string()));
    }
    #[test]
    fn boundary_is_taken_from_each_side() {
        // Chunks disagree on the overlap; the first half comes from the first chunk.
        let probs = vec![to_probs(b"AAAA"), to_probs(b"TTTT")];
        let positions = vec![linear(0..4), linear(2..6)];
        let decoder = ArgmaxDecoder::default();
        assert_eq!(stitch(&probs, &positions, &decoder), Ok("AAATTT".to_string()));
        let positions = vec![linear(0..4), linear(1..5)];
        assert_eq!(stitch(&probs, &positions, &decoder), Ok("AAATT".to_string()));
    }
    #[test]
    fn single_chunk_identity() {
        let alphabet = Alphabet::default();
        let decoder = ArgmaxDecoder::default();
        let probs = to_probs(b"AC*GT*");
        let positions = vec![linear(0..6)];
        let expected = decode_consensus(&alphabet, probs.view());
        assert_eq!(expected, "ACGT");
        assert_eq!(stitch(&[probs.clone()], &positions, &decoder), Ok(expected));
        let empty = ProbabilityMatrix::empty(5);
        let no_positions: Vec<Vec<Position>> = vec![vec![]];
        assert_eq!(stitch(&[empty], &no_positions, &decoder), Ok(String::new()));
    }
    #[test]
    fn three_chunks_with_insertions() {
        let positions = vec![
            vec![(0, 0), (1, 0), (1, 1), (2, 0), (3, 0)],
            vec![(1, 1), (2, 0), (3, 0), (3, 1), (4, 0)],
            vec![(3, 1), (4, 0), (5, 0), (6, 0)],
        ];
        let positions: Vec<Vec<Position>> = positions
            .into_iter()
            .map(|ps| ps.into_iter().map(Position::from).collect())
            .collect();
        let probs = vec![to_probs(b"ACGTA"), to_probs(b"GTAC*"), to_probs(b"C*GG")];
        let decoder = ArgmaxDecoder::default();
        assert_eq!(kept_ranges(&positions), Ok(vec![0..4, 2..4, 1..4]));
        assert_eq!(stitch(&probs, &positions, &decoder), Ok("ACGTACGG".to_string()));
    }
    #[test]
    fn confidence_through_stitch() {
        let probs = vec![to_probs(b"AACG"), to_probs(b"CGTA")];
        let positions = vec![linear(0..4), linear(2..6)];
        let decoded = stitch(&probs, &positions, &ConfidenceDecoder::default()).unwrap();
        assert_eq!(decoded.seq, "AACGTA");
        assert_eq!(decoded.confidence, vec![0.8; 6]);
    }
    #[test]
    fn custom_decoder() {
        fn lower(probs: MatrixView<'_>) -> String {
            decode_consensus(&Alphabet::default(), probs).to_lowercase()
        }
        let probs = vec![to_probs(b"AACG"), to_probs(b"CGTA")];
        let positions = vec![linear(0..4), linear(2..6)];
        assert_eq!(stitch(&probs, &positions, &lower), Ok("aacgta".to_string()));
        let boxed: Box<dyn DecodeConsensus<Output = String>> = Box::new(ArgmaxDecoder::default());
        assert_eq!(stitch(&probs, &positions, boxed.as_ref()), Ok("AACGTA".to_string()));
    }
    #[test]
    fn mismatch_propagates() {
        let probs = vec![to_probs(b"AACG"), to_probs(b"CGTA"), to_probs(b"TAC")];
        let positions = vec![
            linear(0..4),
            linear(2..6),
            vec![Position::new(4, 0), Position::new(4, 1), Position::new(5, 0)],
        ];
        let decoder = ArgmaxDecoder::default();
        match stitch(&probs, &positions, &decoder) {
            Err(StitchError::UnstitchableOverlap { first, second }) => {
                assert_eq!(first.first, Some(Position::new(2, 0)));
                assert_eq!(second.len, 3);
            }
            res => panic!("{:?}", res),
        }
        let detached = vec![linear(0..4), linear(10..14)];
        let probs = vec![to_probs(b"AACG"), to_probs(b"CGTA")];
        assert!(stitch(&probs, &detached, &decoder).is_err());
    }
    #[test]
    fn argument_errors() {
        let decoder = ArgmaxDecoder::default();
        let none: Vec<ProbabilityMatrix> = vec![];
        let no_positions: Vec<Vec<Position>> = vec![];
        assert_eq!(
            stitch(&none, &no_positions, &decoder),
            Err(StitchError::EmptyInput)
        );
        let probs = vec![to_probs(b"AACG"), to_probs(b"CGTA")];
        assert_eq!(
            stitch(&probs, &[linear(0..4)], &decoder),
            Err(StitchError::LengthMismatch {
                matrices: 2,
                positions: 1
            })
        );
        let narrow = ProbabilityMatrix::from_rows(&[[0.1, 0.9], [0.1, 0.9]]).unwrap();
        let positions = vec![linear(0..4), linear(2..4)];
        assert_eq!(
            stitch(&[probs[0].clone(), narrow], &positions, &decoder),
            Err(StitchError::WidthMismatch {
                chunk: 1,
                expected: 5,
                actual: 2
            })
        );
        let positions = vec![linear(0..4), linear(2..5)];
        assert_eq!(
            stitch(&probs, &positions, &decoder),
            Err(StitchError::RowCountMismatch {
                chunk: 1,
                rows: 4,
                positions: 3
            })
        );
        let mut unsorted = linear(2..6);
        unsorted.swap(1, 2);
        let positions = vec![linear(0..4), unsorted];
        assert_eq!(
            stitch(&probs, &positions, &decoder),
            Err(StitchError::UnsortedPositions { chunk: 1, index: 2 })
        );
        let probs = vec![to_probs(b"AACG"), ProbabilityMatrix::empty(5)];
        let positions = vec![linear(0..4), vec![]];
        assert_eq!(
            stitch(&probs, &positions, &decoder),
            Err(StitchError::EmptyChunk { chunk: 1 })
        );
    }
    // Random positions with insertions, cut into overlapping windows.
    fn random_windows<R: Rng>(rng: &mut R, window: usize) -> (Vec<Position>, Vec<Range<usize>>) {
        let universe: Vec<Position> = (0..rng.gen_range(50..300))
            .flat_map(|refr| {
                let insertions = if rng.gen_bool(0.2) {
                    rng.gen_range(1..3)
                } else {
                    0
                };
                (0..=insertions).map(move |ins| Position::new(refr, ins))
            })
            .collect();
        let mut windows = vec![];
        let mut start = 0;
        loop {
            let end = (start + window).min(universe.len());
            windows.push(start..end);
            if end == universe.len() {
                break;
            }
            let overlap = rng.gen_range(1..=window / 2);
            start = end - overlap;
        }
        (universe, windows)
    }
    #[test]
    fn coverage_without_duplication() {
        let mut rng: Xoshiro256PlusPlus = SeedableRng::seed_from_u64(4234);
        for _ in 0..100 {
            let window = rng.gen_range(2..40);
            let (universe, windows) = random_windows(&mut rng, window);
            let positions: Vec<&[Position]> = windows.iter().map(|r| &universe[r.clone()]).collect();
            let ranges = kept_ranges(&positions).unwrap();
            assert_eq!(ranges.len(), positions.len());
            let visited: Vec<Position> = positions
                .iter()
                .zip(ranges)
                .flat_map(|(ps, range)| ps[range].iter().copied())
                .collect();
            assert_eq!(visited, universe);
        }
    }
    #[test]
    fn random_consensus() {
        let alphabet = Alphabet::default();
        let decoder = ArgmaxDecoder::new(alphabet.clone());
        let mut rng: Xoshiro256PlusPlus = SeedableRng::seed_from_u64(24);
        for _ in 0..50 {
            let window = rng.gen_range(4..60);
            let (universe, windows) = random_windows(&mut rng, window);
            let truth: Vec<u8> = universe
                .iter()
                .map(|p| {
                    if 0 < p.inserted_position && rng.gen_bool(0.5) {
                        alphabet.placeholder()
                    } else {
                        alphabet.bases()[rng.gen_range(0..4)]
                    }
                })
                .collect();
            let probs: Vec<_> = windows.iter().map(|r| to_probs(&truth[r.clone()])).collect();
            let positions: Vec<_> = windows.iter().map(|r| universe[r.clone()].to_vec()).collect();
            let expected: String = truth
                .iter()
                .filter(|&&b| b != alphabet.placeholder())
                .map(|&b| char::from(b))
                .collect();
            assert_eq!(stitch(&probs, &positions, &decoder), Ok(expected));
        }
    }
    #[test]
    fn regions_in_parallel() {
        let good = Region {
            name: "contig1".to_string(),
            chunks: vec![
                Chunk::new(linear(0..4), to_probs(b"AACG")).unwrap(),
                Chunk::new(linear(2..6), to_probs(b"CGTA")).unwrap(),
            ],
        };
        let bad = Region {
            name: "contig2".to_string(),
            chunks: vec![
                Chunk::new(linear(0..4), to_probs(b"AACG")).unwrap(),
                Chunk::new(linear(8..12), to_probs(b"CGTA")).unwrap(),
            ],
        };
        let single = Region {
            name: "contig3".to_string(),
            chunks: vec![Chunk::new(linear(0..3), to_probs(b"T*T")).unwrap()],
        };
        let regions = vec![good, bad, single];
        let results = stitch_regions(&regions, &ArgmaxDecoder::default());
        let names: Vec<_> = results.iter().map(|(name, _)| *name).collect();
        assert_eq!(names, vec!["contig1", "contig2", "contig3"]);
        assert_eq!(results[0].1, Ok("AACGTA".to_string()));
        assert!(results[1].1.is_err());
        assert_eq!(results[2].1, Ok("TT".to_string()));
    }
}
