//! Pipelines -- read chunk predictions, stitch every region, and write the consensus.
//!
//! Parameters come either from the command line or from a TOML profile; both end up in [PipelineConfig](PipelineConfig).
use anyhow::{bail, Context};
use definitions::{Alphabet, Chunk, ConsensusJob, ConsensusRecord, Region};
use log::*;
use serde::{Deserialize, Serialize};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use stitcher::decode::phred_scores;
use stitcher::{stitch_regions, ArgmaxDecoder, ConfidenceDecoder};

/// Name of the region when the input is a bare list of chunks.
pub const DEFAULT_REGION_NAME: &str = "consensus";

/// The configuration of the pipeline.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PipelineConfig {
    /// The path to the input JSON.
    input_file: PathBuf,
    /// The path to the output JSON. Stdout if not given.
    #[serde(default)]
    output_file: Option<PathBuf>,
    /// Overrides the alphabet in the input.
    #[serde(default)]
    alphabet: Option<Alphabet>,
    #[serde(default)]
    verbose: usize,
    #[serde(default = "default_threads")]
    threads: usize,
    #[serde(default)]
    with_quality: bool,
}

fn default_threads() -> usize {
    1
}

impl PipelineConfig {
    pub fn new(
        input_file: PathBuf,
        output_file: Option<PathBuf>,
        alphabet: Option<Alphabet>,
        verbose: usize,
        threads: usize,
        with_quality: bool,
    ) -> Self {
        Self {
            input_file,
            output_file,
            alphabet,
            verbose,
            threads,
            with_quality,
        }
    }
    pub fn from_toml(profile: &str) -> anyhow::Result<Self> {
        toml::from_str(profile).context("Failed to parse the profile")
    }
    pub fn from_path<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let mut rdr = std::fs::File::open(path)
            .map(BufReader::new)
            .with_context(|| format!("Can not open {:?}", path))?;
        let mut file = String::new();
        rdr.read_to_string(&mut file)?;
        Self::from_toml(&file)
    }
    pub fn verbose(&self) -> usize {
        self.verbose
    }
    pub fn threads(&self) -> usize {
        self.threads
    }
}

/// Either a complete job or just the chunks of a single region.
#[derive(Deserialize)]
#[serde(untagged)]
enum JobInput {
    Job(ConsensusJob),
    Chunks(Vec<Chunk>),
}

pub fn read_job<R: Read>(rdr: R, alphabet: Option<&Alphabet>) -> anyhow::Result<ConsensusJob> {
    let input: JobInput = serde_json::de::from_reader(rdr).context("Failed to parse the input JSON")?;
    let mut job = match input {
        JobInput::Job(job) => job,
        JobInput::Chunks(chunks) => ConsensusJob {
            alphabet: Alphabet::default(),
            regions: vec![Region {
                name: DEFAULT_REGION_NAME.to_string(),
                chunks,
            }],
        },
    };
    if let Some(alphabet) = alphabet {
        job.alphabet = alphabet.clone();
    }
    Ok(job)
}

/// Stitch all regions. Fails, without any record, if some region can not be stitched.
pub fn consensus_records(job: &ConsensusJob, with_quality: bool) -> anyhow::Result<Vec<ConsensusRecord>> {
    let chunk_num: usize = job.regions.iter().map(|r| r.chunks.len()).sum();
    debug!("STITCH\tRegions\t{}\tChunks\t{}", job.regions.len(), chunk_num);
    let results: Vec<_> = if with_quality {
        let decoder = ConfidenceDecoder::new(job.alphabet.clone());
        stitch_regions(&job.regions, &decoder)
            .into_iter()
            .map(|(name, result)| {
                let record = result.map(|decoded| ConsensusRecord {
                    name: name.to_string(),
                    seq: decoded.seq,
                    quality: Some(phred_scores(&decoded.confidence)),
                    confidence: Some(decoded.confidence),
                });
                (name, record)
            })
            .collect()
    } else {
        let decoder = ArgmaxDecoder::new(job.alphabet.clone());
        stitch_regions(&job.regions, &decoder)
            .into_iter()
            .map(|(name, result)| (name, result.map(|seq| ConsensusRecord::new(name, seq))))
            .collect()
    };
    let mut records = Vec::with_capacity(results.len());
    let mut failed = 0;
    for (name, result) in results {
        match result {
            Ok(record) => records.push(record),
            Err(why) => {
                error!("REGION\t{}\t{}", name, why);
                failed += 1;
            }
        }
    }
    if 0 < failed {
        bail!("{} out of {} regions could not be stitched", failed, job.regions.len());
    }
    Ok(records)
}

pub fn write_records<W: Write>(wtr: W, records: &[ConsensusRecord]) -> anyhow::Result<()> {
    let mut wtr = BufWriter::new(wtr);
    serde_json::ser::to_writer(&mut wtr, records)?;
    writeln!(wtr)?;
    wtr.flush()?;
    Ok(())
}

pub fn run_pipeline(config: &PipelineConfig) -> anyhow::Result<()> {
    let PipelineConfig {
        input_file,
        output_file,
        alphabet,
        with_quality,
        ..
    } = config;
    debug!("Opening {:?}", input_file);
    let rdr = std::fs::File::open(input_file)
        .map(BufReader::new)
        .with_context(|| format!("Can not open {:?}", input_file))?;
    let job = read_job(rdr, alphabet.as_ref())?;
    let records = consensus_records(&job, *with_quality)?;
    let total: usize = records.iter().map(|r| r.seq.len()).sum();
    info!("STITCH\tRecords\t{}\tBasePair\t{}", records.len(), total);
    match output_file {
        Some(path) => {
            let file = std::fs::File::create(path).with_context(|| format!("Can not create {:?}", path))?;
            write_records(file, &records)
        }
        None => write_records(std::io::stdout().lock(), &records),
    }
}
