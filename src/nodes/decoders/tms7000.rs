//! Texas Instruments TMS7000 bus decoder (MC mode)
//!
//! Strobe-qualified decoder: no phase enum, just two edge predicates. The
//! low address byte is multiplexed onto the data lines, so an ALE falling
//! edge latches `A8..A15 * 256 + AD0..AD7` as the address, and an EN rising
//! edge reads AD0..AD7 as the data byte, tagged read or write by the RW pin.
//! Both edges may land on the same sample; the address is handled first.

use super::acquire::{EdgeSpec, PinMap, SampleStream};
use super::bus::{BusValue, reduce_bus};
use super::emit::AnnotationWriter;
use super::types::{Annotation, AnnotationDef, AnnotationRow, ChannelDef};
use crate::runtime::node::{InputPort, OutputPort, ProcessNode, WorkError, WorkResult};
use crate::runtime::ports::{PortDirection, PortSchema};
use crate::runtime::sample::SampleVector;
use lazy_static::lazy_static;
use std::collections::VecDeque;

/// Strobe events handled per work() call
const BATCH_SIZE: usize = 4096;

/// Decoder pin indices
pub mod pin {
    pub const RW: usize = 0;
    pub const EN: usize = 1;
    pub const ALE: usize = 2;
    pub const AD0: usize = 3;
    pub const AD7: usize = 10;
    pub const A8: usize = 11;
    pub const A15: usize = 18;

    /// Mandatory channel count
    pub const COUNT: usize = 19;
}

/// Annotation class indices
pub mod ann {
    pub const ADDR: usize = 0;
    pub const MEMRD: usize = 1;
    pub const MEMWR: usize = 2;
}

const ANNOTATIONS: &[AnnotationDef] = &[
    AnnotationDef { id: "address", label: "Address" },
    AnnotationDef { id: "memrd", label: "Memory Read" },
    AnnotationDef { id: "memwr", label: "Memory Write" },
];

const ANNOTATION_ROWS: &[AnnotationRow] = &[
    AnnotationRow { id: "addrbus", label: "Addr.", classes: &[ann::ADDR] },
    AnnotationRow { id: "databus", label: "Data", classes: &[ann::MEMRD, ann::MEMWR] },
];

lazy_static! {
    static ref CHANNELS: Vec<ChannelDef> = {
        let mut defs = vec![
            ChannelDef::new("rw", "RW", "Read/notWrite"),
            ChannelDef::new("en", "EN", "Memory enable strobe"),
            ChannelDef::new("ale", "ALE", "Address latch strobe"),
        ];
        for i in 0..8 {
            defs.push(ChannelDef::new(
                format!("ad{}", i),
                format!("AD{}", i),
                format!("CPU data/addr. line {}", i),
            ));
        }
        for i in 8..16 {
            defs.push(ChannelDef::new(
                format!("a{}", i),
                format!("A{}", i),
                format!("CPU address line {}", i),
            ));
        }
        defs
    };
    static ref OPTIONAL_CHANNELS: Vec<ChannelDef> = {
        let mut defs = vec![
            ChannelDef::new("clk", "CLK", "Internal clockout"),
            ChannelDef::new("rst", "/RESET", "RESET"),
            ChannelDef::new("int1", "/INT1", "Interrupt 1"),
            ChannelDef::new("int3", "/INT3", "Interrupt 3"),
            ChannelDef::new("mc", "MC", "Microcontroller Mode"),
        ];
        for i in 0..8 {
            defs.push(ChannelDef::new(
                format!("ap{}", i),
                format!("AP{}", i),
                format!("CPU A port {}", i),
            ));
        }
        for i in 0..4 {
            defs.push(ChannelDef::new(
                format!("bp{}", i),
                format!("BP{}", i),
                format!("CPU B port {}", i),
            ));
        }
        defs
    };
}

/// TMS7000 decoder as a runtime process node: one SampleVector input
/// ("samples"), one Annotation output ("annotations")
pub struct Tms7000Decoder {
    name: String,
    pin_map: PinMap,
    sample_buffer: VecDeque<SampleVector>,
    last_pins: Option<SampleVector>,

    /// Static qualification of the address branch. When false, an ALE fall
    /// is treated as jitter and the whole event is skipped.
    // TODO: check against the TMS7000 datasheet whether this should key off
    // the live EN level instead of a fixed configuration bit.
    enable_wired: bool,

    prev_addr_sample: u64,
    prev_data_sample: u64,
}

impl Tms7000Decoder {
    pub fn new(pin_map: PinMap) -> Self {
        Self {
            name: "tms7000".to_string(),
            pin_map,
            sample_buffer: VecDeque::new(),
            last_pins: None,
            enable_wired: true,
            prev_addr_sample: 0,
            prev_data_sample: 0,
        }
    }

    /// Set custom name (builder pattern)
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Mark the EN strobe as unwired, disabling address latching
    pub fn with_enable_wired(mut self, enable_wired: bool) -> Self {
        self.enable_wired = enable_wired;
        self
    }

    /// Reinitialize all decode state; callable repeatedly
    pub fn reset(&mut self) {
        self.prev_addr_sample = 0;
        self.prev_data_sample = 0;
        self.sample_buffer.clear();
        self.last_pins = None;
    }

    /// Mandatory channel declarations, indexed per [`pin`]
    pub fn channels() -> &'static [ChannelDef] {
        &CHANNELS
    }

    /// Optional channel declarations
    pub fn optional_channels() -> &'static [ChannelDef] {
        &OPTIONAL_CHANNELS
    }

    /// Annotation class table, indexed per [`ann`]
    pub fn annotations() -> &'static [AnnotationDef] {
        ANNOTATIONS
    }

    /// Display row grouping for annotation classes
    pub fn annotation_rows() -> &'static [AnnotationRow] {
        ANNOTATION_ROWS
    }
}

impl ProcessNode for Tms7000Decoder {
    fn name(&self) -> &str {
        &self.name
    }

    fn num_inputs(&self) -> usize {
        1
    }

    fn num_outputs(&self) -> usize {
        1
    }

    fn input_schema(&self) -> Vec<PortSchema> {
        vec![PortSchema::new::<SampleVector>(
            "samples",
            0,
            PortDirection::Input,
        )]
    }

    fn output_schema(&self) -> Vec<PortSchema> {
        vec![PortSchema::new::<Annotation>(
            "annotations",
            0,
            PortDirection::Output,
        )]
    }

    fn work(&mut self, inputs: &[InputPort], outputs: &[OutputPort]) -> WorkResult<usize> {
        let sender = outputs[0]
            .get::<Annotation>()
            .ok_or_else(|| WorkError::NodeError("Missing annotations output".to_string()))?;
        let writer = AnnotationWriter::new(sender);

        let receiver = inputs[0]
            .get::<SampleVector>(&mut self.sample_buffer)
            .ok_or_else(|| WorkError::NodeError("Missing samples input".to_string()))?;
        let mut stream = SampleStream::new(receiver, &self.pin_map, &mut self.last_pins);

        let specs = [EdgeSpec::falling(pin::ALE), EdgeSpec::rising(pin::EN)];

        let mut processed = 0;
        while processed < BATCH_SIZE {
            let (pins, matches) = stream.wait_any(&specs)?;
            processed += 1;

            if matches.matched(0) {
                if !self.enable_wired {
                    continue;
                }
                let addr = BusValue::word_from(
                    reduce_bus(&pins, pin::A8..=pin::A15),
                    reduce_bus(&pins, pin::AD0..=pin::AD7),
                );
                writer.put(self.prev_addr_sample, pins.index, ann::ADDR, addr.fmt_word())?;
                self.prev_addr_sample = pins.index;
            }
            if matches.matched(1) {
                let data = reduce_bus(&pins, pin::AD0..=pin::AD7);
                let class = if pins.is_high(pin::RW) {
                    ann::MEMRD
                } else {
                    ann::MEMWR
                };
                writer.put(self.prev_data_sample, pins.index, class, data.fmt_byte())?;
                self.prev_data_sample = pins.index;
            }
        }
        Ok(processed)
    }
}
