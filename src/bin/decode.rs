//! Decode a sigrok .sr capture with one of the bus decoders.
//!
//! Usage:
//!   cargo run --release --bin retrobus-decode -- \
//!       capture.sr --decoder mc6809
//!
//! With an explicit pin assignment (probe index per decoder pin, "-" for
//! pins with no probe behind them):
//!   cargo run --release --bin retrobus-decode -- \
//!       capture.sr --decoder tms7000 \
//!       --pins 0,1,2,3,4,5,6,7,8,9,10,-,-,-,-,-,-,-,-

use clap::{Parser, ValueEnum};
use retrobus::nodes::decoders::{AnnotationDef, mc6809, tms7000};
use retrobus::runtime::{InputPort, OutputPort, Pipeline, ProcessNode, WorkError, WorkResult};
use retrobus::{
    Annotation, Mc6809Decoder, PinMap, PortDirection, PortSchema, SrFileSource, Tms7000Decoder,
};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DecoderKind {
    Mc6809,
    Tms7000,
}

impl DecoderKind {
    fn pin_count(self) -> usize {
        match self {
            DecoderKind::Mc6809 => mc6809::pin::COUNT,
            DecoderKind::Tms7000 => tms7000::pin::COUNT,
        }
    }

    fn annotations(self) -> &'static [AnnotationDef] {
        match self {
            DecoderKind::Mc6809 => Mc6809Decoder::annotations(),
            DecoderKind::Tms7000 => Tms7000Decoder::annotations(),
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to .sr capture file
    file: PathBuf,

    /// Which decoder to run
    #[arg(long, value_enum, default_value = "mc6809")]
    decoder: DecoderKind,

    /// Comma-separated probe index per decoder pin ("-" = unwired).
    /// Defaults to the identity assignment.
    #[arg(long)]
    pins: Option<String>,

    /// Stop after this many samples
    #[arg(long)]
    max_samples: Option<u64>,
}

/// Parse a pin assignment like "0,1,2,-,4" into a PinMap
fn parse_pin_map(spec: &str, pin_count: usize) -> Result<PinMap, String> {
    let mut mapping = Vec::with_capacity(pin_count);
    for (i, field) in spec.split(',').enumerate() {
        let field = field.trim();
        if field == "-" {
            mapping.push(None);
        } else {
            let probe: usize = field
                .parse()
                .map_err(|_| format!("Invalid probe index '{}' for pin {}", field, i))?;
            mapping.push(Some(probe));
        }
    }
    if mapping.len() > pin_count {
        return Err(format!(
            "Pin assignment has {} entries, decoder has {} pins",
            mapping.len(),
            pin_count
        ));
    }
    mapping.resize(pin_count, None);
    Ok(PinMap::new(mapping))
}

/// Sink that prints annotations
struct AnnotationPrinter {
    classes: &'static [AnnotationDef],
    count: usize,
}

impl AnnotationPrinter {
    fn new(classes: &'static [AnnotationDef]) -> Self {
        Self { classes, count: 0 }
    }
}

impl ProcessNode for AnnotationPrinter {
    fn name(&self) -> &str {
        "printer"
    }

    fn num_inputs(&self) -> usize {
        1
    }

    fn num_outputs(&self) -> usize {
        0 // Sink
    }

    fn input_schema(&self) -> Vec<PortSchema> {
        vec![PortSchema::new::<Annotation>(
            "annotations",
            0,
            PortDirection::Input,
        )]
    }

    fn work(&mut self, inputs: &[InputPort], _outputs: &[OutputPort]) -> WorkResult<usize> {
        let mut input_buffer = std::collections::VecDeque::new();
        let mut input = inputs
            .first()
            .and_then(|port| port.get::<Annotation>(&mut input_buffer))
            .ok_or_else(|| WorkError::NodeError("Missing input channel".to_string()))?;

        let ann = input.recv()?;
        self.count += 1;

        let label = self
            .classes
            .get(ann.class)
            .map(|def| def.label)
            .unwrap_or("?");
        println!(
            "{:>10} .. {:>10}  {:<14} {}",
            ann.start_sample, ann.end_sample, label, ann.text
        );

        Ok(1)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let pin_count = args.decoder.pin_count();
    let pin_map = match &args.pins {
        Some(spec) => parse_pin_map(spec, pin_count)?,
        None => PinMap::identity(pin_count),
    };

    let source = SrFileSource::new(&args.file)?.with_max_samples(args.max_samples);
    info!(
        "Capture: {} probes, samplerate {}, unitsize {}",
        source.header().total_probes,
        source.header().samplerate,
        source.header().unitsize
    );

    let mut pipeline = Pipeline::new();
    pipeline.add_process("source", source)?;
    match args.decoder {
        DecoderKind::Mc6809 => {
            pipeline.add_process("decoder", Mc6809Decoder::new(pin_map))?;
        }
        DecoderKind::Tms7000 => {
            pipeline.add_process("decoder", Tms7000Decoder::new(pin_map))?;
        }
    }
    pipeline.add_process("printer", AnnotationPrinter::new(args.decoder.annotations()))?;

    pipeline.connect("source", "samples", "decoder", "samples")?;
    pipeline.connect("decoder", "annotations", "printer", "annotations")?;

    let scheduler = pipeline.build()?;
    scheduler.wait();

    Ok(())
}
