//! Streaming protocol decoders for 8-bit microprocessor bus captures
//!
//! This library turns logic-analyzer captures of 8-bit CPU bus signals into
//! timed, labeled annotations (address spans, memory read/write bytes,
//! instruction text, warnings) using a thread-per-node graph architecture.
//!
//! # Architecture
//!
//! - **SrFileSource**: Streams per-sample pin vectors from sigrok .sr capture
//!   archives with on-demand ZIP chunk reads
//! - **Streaming Nodes**: Thread-per-node execution with crossbeam channels
//! - **Scheduler**: Manages node lifecycle and parallel execution
//! - **Decoders**: MC6809 (clock-qualified) and TMS7000 (strobe-qualified)
//!   bus protocol decoders
//!
//! # Example
//!
//! ```no_run
//! use retrobus::{Mc6809Decoder, Pipeline, PinMap, SrFileSource};
//!
//! let mut pipeline = Pipeline::new();
//! pipeline.add_process("source", SrFileSource::new("capture.sr")?)?;
//! pipeline.add_process("mc6809", Mc6809Decoder::new(PinMap::identity(27)))?;
//! pipeline.connect("source", "samples", "mc6809", "samples")?;
//! // ... add a sink for the annotations and run
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use thiserror::Error;

pub mod nodes;
pub mod runtime;

// Re-export decoder components
pub use nodes::decoders::{
    Annotation, AnnotationWriter, BusValue, Edge, EdgeSpec, Mc6809Decoder, PinMap, SampleStream,
    Tms7000Decoder, reduce_bus,
};

// Re-export data types from runtime
pub use runtime::{PinLevel, SampleVector};

// Re-export the capture source
pub use nodes::SrFileSource;

// Re-export streaming runtime components
pub use runtime::{
    ConnectionError, InputPort, OutputPort, Pipeline, PortDirection, PortSchema, ProcessNode,
    Receiver, Scheduler, Sender, WorkError, WorkResult, register_type,
};

#[derive(Error, Debug)]
pub enum SrError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Metadata parsing error: {0}")]
    ParseMetadata(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid probe number: {0}")]
    InvalidProbe(usize),

    #[error("Invalid chunk number: {0}")]
    InvalidChunk(u64),
}

pub type Result<T> = std::result::Result<T, SrError>;
