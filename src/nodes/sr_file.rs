//! sigrok session file source
//!
//! Provides `SrFileSource` - a runtime process node that reads sigrok .sr
//! capture files and outputs a single stream of [`SampleVector`]s carrying
//! the level of every probe per acquired instant.
//!
//! A .sr file is a ZIP archive with a `metadata` member (INI-style key/value
//! lines describing probe count, sample rate and unit size) and one or more
//! logic chunks named `<capturefile>-1`, `<capturefile>-2`, ... Each sample
//! occupies `unitsize` little-endian bytes; probe i lives at bit i.

use crate::runtime::node::{InputPort, OutputPort, ProcessNode, WorkResult};
use crate::runtime::ports::{PortDirection, PortSchema};
use crate::runtime::sample::SampleVector;
use crate::{Result, SrError};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};
use zip::ZipArchive;

/// Number of samples emitted per work() call
const BATCH_SIZE: usize = 4096;

/// Header information from a .sr file
#[derive(Debug, Clone)]
pub struct SrHeader {
    /// Total number of probes/channels
    pub total_probes: usize,
    /// Sample rate as a string (e.g., "1 MHz"), empty if not recorded
    pub samplerate: String,
    /// Sample rate in Hz (0.0 if not recorded)
    pub samplerate_hz: f64,
    /// Sample period in seconds (0.0 if sample rate not recorded)
    pub sample_period: f64,
    /// Bytes per sample in the logic chunks
    pub unitsize: usize,
    /// Base name of the logic chunk members (e.g., "logic-1")
    pub capturefile: String,
    /// Probe names indexed by probe number (0-based)
    pub probe_names: Vec<String>,
}

/// Source node that reads a sigrok .sr capture file and outputs SampleVectors
///
/// This runtime `ProcessNode` (0 inputs, 1 output) walks the logic chunks in
/// order and emits one [`SampleVector`] per acquired sample, with the wired
/// mask covering every probe in the file. Chunks are loaded on demand, one at
/// a time, so memory use stays bounded regardless of capture length.
///
/// # Example
/// ```ignore
/// let source = SrFileSource::new("capture.sr")?;
/// pipeline.add_process("source", source)?;
/// ```
pub struct SrFileSource {
    name: String,
    archive: ZipArchive<File>,
    header: SrHeader,

    // Chunk walking state
    chunk_index: u64,
    chunk: Vec<u8>,
    chunk_offset: usize,
    position: u64,
    wired: u32,

    max_samples: Option<u64>,
    done: bool,
}

impl SrFileSource {
    /// Create a new source from a .sr file path
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let mut archive = ZipArchive::new(file)?;

        let metadata = {
            let mut member = archive.by_name("metadata").map_err(|e| {
                SrError::ParseMetadata(format!("Cannot find metadata member: {}", e))
            })?;
            let mut content = String::new();
            member.read_to_string(&mut content)?;
            content
        };

        let header = Self::parse_metadata(&metadata)?;

        if header.total_probes == 0 || header.total_probes > 32 {
            return Err(SrError::ParseMetadata(format!(
                "Unsupported probe count: {}",
                header.total_probes
            )));
        }

        let wired = if header.total_probes >= 32 {
            u32::MAX
        } else {
            (1u32 << header.total_probes) - 1
        };

        Ok(Self {
            name: "sr_file_source".to_string(),
            archive,
            header,
            chunk_index: 1,
            chunk: Vec::new(),
            chunk_offset: 0,
            position: 0,
            wired,
            max_samples: None,
            done: false,
        })
    }

    /// Parse the `metadata` member of a .sr archive
    fn parse_metadata(content: &str) -> Result<SrHeader> {
        let mut total_probes: Option<usize> = None;
        let mut samplerate: Option<String> = None;
        let mut unitsize: Option<usize> = None;
        let mut capturefile: Option<String> = None;
        let mut probe_names_map: HashMap<usize, String> = HashMap::new();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('[') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            let value = value.trim();

            match key {
                "total probes" => total_probes = value.parse().ok(),
                "samplerate" => samplerate = Some(value.to_string()),
                "unitsize" => unitsize = value.parse().ok(),
                "capturefile" => capturefile = Some(value.to_string()),
                _ => {
                    // Probe names are recorded 1-based: probe1 = RW
                    if let Some(num_str) = key.strip_prefix("probe")
                        && let Ok(probe_num) = num_str.parse::<usize>()
                        && probe_num >= 1
                    {
                        if probe_num > 32 {
                            return Err(SrError::InvalidProbe(probe_num));
                        }
                        probe_names_map.insert(probe_num - 1, value.to_string());
                    }
                }
            }
        }

        let total_probes =
            total_probes.ok_or_else(|| SrError::MissingField("total probes".to_string()))?;
        let unitsize = unitsize.ok_or_else(|| SrError::MissingField("unitsize".to_string()))?;
        let capturefile =
            capturefile.ok_or_else(|| SrError::MissingField("capturefile".to_string()))?;

        if unitsize == 0 || unitsize > 8 {
            return Err(SrError::ParseMetadata(format!(
                "Unsupported unitsize: {}",
                unitsize
            )));
        }

        let samplerate = samplerate.unwrap_or_default();
        let samplerate_hz = Self::parse_sample_rate(&samplerate).unwrap_or(0.0);
        let sample_period = if samplerate_hz > 0.0 {
            1.0 / samplerate_hz
        } else {
            0.0
        };

        let probe_names = (0..total_probes)
            .map(|i| {
                probe_names_map
                    .get(&i)
                    .cloned()
                    .unwrap_or_else(|| format!("Probe{}", i))
            })
            .collect();

        Ok(SrHeader {
            total_probes,
            samplerate,
            samplerate_hz,
            sample_period,
            unitsize,
            capturefile,
            probe_names,
        })
    }

    /// Parse a sample rate string (e.g., "1 MHz") into Hz
    fn parse_sample_rate(samplerate: &str) -> Option<f64> {
        let parts: Vec<&str> = samplerate.split_whitespace().collect();
        if parts.len() >= 2
            && let Ok(value) = parts[0].parse::<f64>()
        {
            let multiplier = match parts[1] {
                "GHz" => 1_000_000_000.0,
                "MHz" => 1_000_000.0,
                "KHz" | "kHz" => 1_000.0,
                "Hz" => 1.0,
                _ => return None,
            };
            return Some(value * multiplier);
        }
        // Bare number of Hz
        samplerate.parse::<f64>().ok()
    }

    /// Get the header information
    pub fn header(&self) -> &SrHeader {
        &self.header
    }

    /// Get the total number of probes
    pub fn total_probes(&self) -> usize {
        self.header.total_probes
    }

    /// Get the sample rate in Hz
    pub fn samplerate_hz(&self) -> f64 {
        self.header.samplerate_hz
    }

    /// Set custom name (builder pattern)
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Limit the number of samples read from the file
    pub fn with_max_samples(mut self, max_samples: Option<u64>) -> Self {
        self.max_samples = max_samples;
        self
    }

    /// Load the next logic chunk. Returns false when the capture is exhausted.
    fn load_next_chunk(&mut self) -> Result<bool> {
        let member_name = format!("{}-{}", self.header.capturefile, self.chunk_index);
        let mut member = match self.archive.by_name(&member_name) {
            Ok(m) => m,
            Err(_) => {
                debug!("No chunk {}, capture exhausted", member_name);
                return Ok(false);
            }
        };

        self.chunk.clear();
        member.read_to_end(&mut self.chunk)?;
        self.chunk_offset = 0;
        self.chunk_index += 1;

        if self.chunk.len() % self.header.unitsize != 0 {
            return Err(SrError::InvalidChunk(self.chunk_index - 1));
        }

        debug!(
            "Loaded chunk {} ({} samples)",
            member_name,
            self.chunk.len() / self.header.unitsize
        );
        Ok(true)
    }

    /// Decode the sample at the current chunk offset, advancing the cursor.
    /// Returns None when the current chunk is consumed.
    fn next_sample(&mut self) -> Option<SampleVector> {
        if let Some(max) = self.max_samples
            && self.position >= max
        {
            return None;
        }

        let unitsize = self.header.unitsize;
        if self.chunk_offset + unitsize > self.chunk.len() {
            return None;
        }

        let mut levels: u32 = 0;
        for (i, byte) in self.chunk[self.chunk_offset..self.chunk_offset + unitsize]
            .iter()
            .enumerate()
            .take(4)
        {
            levels |= (*byte as u32) << (8 * i);
        }

        let sample = SampleVector::new(self.position, levels, self.wired);
        self.chunk_offset += unitsize;
        self.position += 1;
        Some(sample)
    }
}

impl ProcessNode for SrFileSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn should_stop(&self) -> bool {
        self.done
    }

    fn num_inputs(&self) -> usize {
        0 // Source node
    }

    fn num_outputs(&self) -> usize {
        1
    }

    fn output_schema(&self) -> Vec<PortSchema> {
        vec![PortSchema::new::<SampleVector>(
            "samples",
            0,
            PortDirection::Output,
        )]
    }

    fn work(&mut self, _inputs: &[InputPort], outputs: &[OutputPort]) -> WorkResult<usize> {
        use crate::runtime::node::WorkError;

        let output = outputs[0]
            .get::<SampleVector>()
            .ok_or_else(|| WorkError::NodeError("Missing samples output".to_string()))?;

        let mut emitted = 0;
        while emitted < BATCH_SIZE {
            match self.next_sample() {
                Some(sample) => {
                    output.send(sample)?;
                    emitted += 1;
                }
                None => {
                    let at_limit = self.max_samples.is_some_and(|max| self.position >= max);
                    let more = if at_limit {
                        false
                    } else {
                        self.load_next_chunk()
                            .map_err(|e| WorkError::NodeError(e.to_string()))?
                    };
                    if !more {
                        info!("[{}] Capture complete: {} samples", self.name, self.position);
                        output.close();
                        self.done = true;
                        return Err(WorkError::Shutdown);
                    }
                }
            }
        }

        Ok(emitted)
    }
}
