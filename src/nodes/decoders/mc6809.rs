//! Motorola MC6809 bus decoder
//!
//! Clock-qualified decoder: classifies every sample into an idle, read or
//! write bus phase from the E/Q clock pins, latches address and data values
//! across phase changes, and drives a table-driven instruction sub-machine
//! that produces incidental disassembly. Span discipline: at most one open
//! span per resource class (address, data, disassembly); a new latch closes
//! the previous span at the current sample, so consecutive spans share their
//! boundary.

use super::acquire::{PinMap, SampleStream};
use super::bus::{BusValue, reduce_bus};
use super::emit::AnnotationWriter;
use super::mc6809_ops::{self as ops, AddrMode, OpEntry};
use super::types::{Annotation, AnnotationDef, AnnotationRow, ChannelDef};
use crate::runtime::node::{InputPort, OutputPort, ProcessNode, WorkError, WorkResult};
use crate::runtime::ports::{PortDirection, PortSchema};
use crate::runtime::sample::SampleVector;
use lazy_static::lazy_static;
use std::collections::VecDeque;
use tracing::trace;

/// Samples processed per work() call
const BATCH_SIZE: usize = 4096;

/// Decoder pin indices
pub mod pin {
    pub const RW: usize = 0;
    pub const E: usize = 1;
    pub const Q: usize = 2;
    pub const D0: usize = 3;
    pub const D7: usize = 10;
    pub const A0: usize = 11;
    pub const A15: usize = 26;

    /// Mandatory channel count
    pub const COUNT: usize = 27;
}

/// Annotation class indices
pub mod ann {
    pub const ADDR: usize = 0;
    pub const MEMRD: usize = 1;
    pub const MEMWR: usize = 2;
    pub const INSTR: usize = 3;
    pub const ROP: usize = 4;
    pub const WOP: usize = 5;
    pub const WARN: usize = 6;
}

const ANNOTATIONS: &[AnnotationDef] = &[
    AnnotationDef { id: "addr", label: "Memory address" },
    AnnotationDef { id: "memrd", label: "Byte read from memory" },
    AnnotationDef { id: "memwr", label: "Byte written to memory" },
    AnnotationDef { id: "instr", label: "6809 CPU instruction" },
    AnnotationDef { id: "rop", label: "Value of input operand" },
    AnnotationDef { id: "wop", label: "Value of output operand" },
    AnnotationDef { id: "warning", label: "Warning" },
];

const ANNOTATION_ROWS: &[AnnotationRow] = &[
    AnnotationRow { id: "addrbus", label: "Addr.", classes: &[ann::ADDR] },
    AnnotationRow { id: "databus", label: "Data", classes: &[ann::MEMRD, ann::MEMWR] },
    AnnotationRow { id: "instructions", label: "Instructions", classes: &[ann::INSTR] },
    AnnotationRow { id: "operands", label: "Operands", classes: &[ann::ROP, ann::WOP] },
    AnnotationRow { id: "warnings", label: "Warnings", classes: &[ann::WARN] },
];

lazy_static! {
    static ref CHANNELS: Vec<ChannelDef> = {
        let mut defs = vec![
            ChannelDef::new("rw", "R/W", "Read / not Write"),
            ChannelDef::new("e", "E", "Bus timing / enable clock"),
            ChannelDef::new("q", "Q", "Bus timing / quadrature clock"),
        ];
        for i in 0..8 {
            defs.push(ChannelDef::new(
                format!("d{}", i),
                format!("D{}", i),
                format!("CPU data line {}", i),
            ));
        }
        for i in 0..16 {
            defs.push(ChannelDef::new(
                format!("a{}", i),
                format!("A{}", i),
                format!("CPU address line {}", i),
            ));
        }
        defs
    };
    static ref OPTIONAL_CHANNELS: Vec<ChannelDef> = vec![
        ChannelDef::new("ba", "BA", "Bus enable"),
        ChannelDef::new("bs", "BS", "Bus status"),
        ChannelDef::new("nmi", "/NMI", "not Non-Maskable Interrupt"),
        ChannelDef::new("irq", "/IRQ", "not Interrupt"),
        ChannelDef::new("firq", "/FIRQ", "not Fast Interrupt"),
        ChannelDef::new("dmabrq", "/DMA/BREQ", "not Direct Memory Access / not Bus Request"),
        ChannelDef::new("mrdy", "MRDY", "Memory Ready"),
        ChannelDef::new("rst", "/RESET", "not Reset"),
        ChannelDef::new("halt", "/HALT", "not Halt"),
    ];
}

/// Bus phase classification, recomputed every sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cycle {
    Idle,
    Read,
    Write,
}

impl Cycle {
    fn data_class(self) -> Option<usize> {
        match self {
            Cycle::Read => Some(ann::MEMRD),
            Cycle::Write => Some(ann::MEMWR),
            Cycle::Idle => None,
        }
    }
}

/// Step of the instruction sub-machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpStep {
    /// Waiting for (the next byte of) an opcode
    Fetch,
    /// Collecting operand bytes that are part of the instruction encoding
    Operand,
    /// Collecting the memory bytes the instruction reads/writes
    MemAccess,
    /// Instruction complete; reset deferred to the next cycle end so the
    /// disassembly span closes on a cycle boundary
    Restart,
}

/// What the sub-machine decided about a consumed data byte
struct Consumed {
    /// Reclassify the byte's data span (operand rows)
    data_class: Option<usize>,
    /// The instruction is complete; disassembly text is ready to flush
    completed: bool,
}

impl Consumed {
    fn plain() -> Self {
        Self {
            data_class: None,
            completed: false,
        }
    }
}

/// Instruction sub-machine state: one instruction's accumulated fields
#[derive(Debug)]
struct InstrDecode {
    step: OpStep,
    prefix: u8,
    entry: Option<OpEntry>,
    operand_bytes: Vec<u8>,
    want_operand: u8,
    want_read: u8,
    want_write: u8,
    arg_read: u32,
    arg_write: u32,
}

impl InstrDecode {
    fn new() -> Self {
        Self {
            step: OpStep::Fetch,
            prefix: 0,
            entry: None,
            operand_bytes: Vec::new(),
            want_operand: 0,
            want_read: 0,
            want_write: 0,
            arg_read: 0,
            arg_write: 0,
        }
    }

    fn reset(&mut self) {
        *self = Self::new();
    }

    fn complete(&mut self) -> Consumed {
        self.step = OpStep::Restart;
        Consumed {
            data_class: None,
            completed: true,
        }
    }

    /// Move past the operand phase once all encoding bytes are in
    fn after_operands(&mut self) -> Consumed {
        if self.want_read > 0 || self.want_write > 0 {
            self.step = OpStep::MemAccess;
            Consumed::plain()
        } else {
            self.complete()
        }
    }

    /// Feed one completed memory cycle (its data byte and direction)
    fn consume(&mut self, data: BusValue, cycle: Cycle) -> Consumed {
        match self.step {
            OpStep::Fetch => {
                if cycle == Cycle::Write {
                    // Stack or refresh traffic between instructions
                    return Consumed::plain();
                }
                let Some(byte) = data.known() else {
                    self.entry = None;
                    return self.complete();
                };
                let byte = byte as u8;

                if self.prefix == 0 && (byte == 0x10 || byte == 0x11) {
                    self.prefix = byte;
                    return Consumed::plain();
                }

                match ops::lookup(self.prefix, byte) {
                    Some(entry) => {
                        self.entry = Some(entry);
                        self.want_operand = ops::operand_len(entry.mode);
                        self.want_read = entry.reads;
                        self.want_write = entry.writes;
                        if self.want_operand > 0 {
                            self.step = OpStep::Operand;
                            Consumed::plain()
                        } else {
                            self.after_operands()
                        }
                    }
                    None => {
                        self.entry = None;
                        self.complete()
                    }
                }
            }
            OpStep::Operand => {
                if cycle == Cycle::Write {
                    return Consumed::plain();
                }
                let byte = data.known().unwrap_or(0) as u8;
                let first = self.operand_bytes.is_empty();
                self.operand_bytes.push(byte);
                self.want_operand -= 1;

                // An indexed postbyte may demand further offset bytes
                if first
                    && let Some(entry) = self.entry
                    && entry.mode == AddrMode::Indexed
                {
                    self.want_operand += ops::indexed_extra(byte);
                }

                if self.want_operand == 0 {
                    self.after_operands()
                } else {
                    Consumed::plain()
                }
            }
            OpStep::MemAccess => {
                let byte = data.known().unwrap_or(0);
                let data_class = match cycle {
                    Cycle::Read if self.want_read > 0 => {
                        self.arg_read = (self.arg_read << 8) | byte;
                        self.want_read -= 1;
                        Some(ann::ROP)
                    }
                    Cycle::Write if self.want_write > 0 => {
                        self.arg_write = (self.arg_write << 8) | byte;
                        self.want_write -= 1;
                        Some(ann::WOP)
                    }
                    _ => None,
                };

                if self.want_read == 0 && self.want_write == 0 {
                    let mut outcome = self.complete();
                    outcome.data_class = data_class;
                    outcome
                } else {
                    Consumed {
                        data_class,
                        completed: false,
                    }
                }
            }
            // Reset runs at the next cycle end before any byte is consumed
            OpStep::Restart => Consumed::plain(),
        }
    }

    /// Render the accumulated instruction, `instr_len` cycles after its start
    fn format(&self, instr_len: u32) -> String {
        let Some(entry) = self.entry else {
            return "???".to_string();
        };

        let b = &self.operand_bytes;
        let byte0 = b.first().copied().unwrap_or(0);
        let word = ((byte0 as u16) << 8) | b.get(1).copied().unwrap_or(0) as u16;

        match entry.mode {
            AddrMode::Inherent => entry.mnemonic.to_string(),
            AddrMode::Imm8 => format!("{} #${:02X}", entry.mnemonic, byte0),
            AddrMode::Imm16 => format!("{} #${:04X}", entry.mnemonic, word),
            AddrMode::Direct => format!("{} <${:02X}", entry.mnemonic, byte0),
            AddrMode::Extended => format!("{} ${:04X}", entry.mnemonic, word),
            AddrMode::Rel8 => {
                let j = byte0 as i8 as i32 + instr_len as i32;
                format!("{} *{:+}", entry.mnemonic, j)
            }
            AddrMode::Rel16 => {
                let j = word as i16 as i32 + instr_len as i32;
                format!("{} *{:+}", entry.mnemonic, j)
            }
            AddrMode::Indexed => {
                let extra = match b.len() {
                    2 => b[1] as u16,
                    n if n >= 3 => ((b[1] as u16) << 8) | b[2] as u16,
                    _ => 0,
                };
                format!("{} {}", entry.mnemonic, ops::indexed_text(byte0, extra))
            }
            AddrMode::RegPair => format!("{} {}", entry.mnemonic, ops::reg_pair_text(byte0)),
            AddrMode::RegList => {
                let other = if entry.mnemonic.ends_with('S') { 'U' } else { 'S' };
                format!("{} {}", entry.mnemonic, ops::reg_list_text(byte0, other))
            }
        }
    }
}

/// All mutable decode state, grouped so reset() is auditable
#[derive(Debug)]
struct DecoderState {
    // Per-cycle
    prev_cycle: Cycle,
    bus_data: BusValue,

    // Pending spans, one per resource class
    addr_start: u64,
    pend_addr: Option<BusValue>,
    data_start: u64,
    pend_data: BusValue,
    ann_data: Option<usize>,
    dasm_start: u64,
    dasm_pending: bool,

    // Per-instruction
    instr_len: u32,
    instr: InstrDecode,
}

impl DecoderState {
    fn new() -> Self {
        Self {
            prev_cycle: Cycle::Idle,
            bus_data: BusValue::Unassigned,
            addr_start: 0,
            pend_addr: None,
            data_start: 0,
            pend_data: BusValue::Unassigned,
            ann_data: None,
            dasm_start: 0,
            dasm_pending: false,
            instr_len: 0,
            instr: InstrDecode::new(),
        }
    }

    fn classify(pins: &SampleVector) -> Cycle {
        if pins.is_high(pin::Q) && pins.is_low(pin::E) {
            if pins.is_low(pin::RW) {
                Cycle::Write
            } else {
                Cycle::Read // default to asserted
            }
        } else {
            Cycle::Idle
        }
    }

    fn step(&mut self, pins: &SampleVector, out: &AnnotationWriter) -> WorkResult<()> {
        let cycle = Self::classify(pins);

        if cycle != Cycle::Idle {
            self.bus_data = reduce_bus(pins, pin::D0..=pin::D7);
        }

        if cycle != self.prev_cycle {
            if self.prev_cycle == Cycle::Idle {
                let bus_addr = reduce_bus(pins, pin::A0..=pin::A15);
                self.on_cycle_begin(pins.index, bus_addr, out)?;
            } else if cycle == Cycle::Idle {
                self.on_cycle_end(pins.index, out)?;
            } else {
                self.on_cycle_trans(pins.index, out)?;
            }
        }
        self.prev_cycle = cycle;
        Ok(())
    }

    /// A read or write cycle starts: rotate the address span
    fn on_cycle_begin(
        &mut self,
        now: u64,
        bus_addr: BusValue,
        out: &AnnotationWriter,
    ) -> WorkResult<()> {
        if let Some(addr) = self.pend_addr {
            out.put(self.addr_start, now, ann::ADDR, addr.fmt_word())?;
        }
        self.addr_start = now;
        self.pend_addr = Some(bus_addr);
        Ok(())
    }

    /// The active cycle ends: account for it, feed the instruction
    /// sub-machine, rotate the data span
    fn on_cycle_end(&mut self, now: u64, out: &AnnotationWriter) -> WorkResult<()> {
        self.instr_len += 1;

        if self.dasm_pending {
            let text = self.instr.format(self.instr_len);
            trace!("disasm at {}: {}", self.dasm_start, text);
            out.put(self.dasm_start, now, ann::INSTR, text)?;
            self.dasm_pending = false;
            self.dasm_start = now;
        }
        if self.instr.step == OpStep::Restart {
            self.instr.reset();
            self.instr_len = 0;
            self.dasm_start = now;
        }

        let consumed = self.instr.consume(self.bus_data, self.prev_cycle);
        if consumed.completed {
            self.dasm_pending = true;
        }

        if let Some(class) = self.ann_data {
            out.put(self.data_start, now, class, self.pend_data.fmt_byte())?;
        }
        self.data_start = now;
        self.pend_data = self.bus_data;
        self.ann_data = consumed.data_class.or(self.prev_cycle.data_class());
        Ok(())
    }

    /// Read and write phases touching without an idle sample in between:
    /// warn and drop in-flight spans rather than emit corrupted boundaries
    fn on_cycle_trans(&mut self, now: u64, out: &AnnotationWriter) -> WorkResult<()> {
        out.put(
            now.saturating_sub(1),
            now,
            ann::WARN,
            "Illegal transition between control states".to_string(),
        )?;
        self.pend_addr = None;
        self.ann_data = None;
        self.dasm_pending = false;
        Ok(())
    }
}

/// MC6809 decoder as a runtime process node: one SampleVector input
/// ("samples"), one Annotation output ("annotations")
pub struct Mc6809Decoder {
    name: String,
    pin_map: PinMap,
    sample_buffer: VecDeque<SampleVector>,
    last_pins: Option<SampleVector>,
    state: DecoderState,
}

impl Mc6809Decoder {
    pub fn new(pin_map: PinMap) -> Self {
        Self {
            name: "mc6809".to_string(),
            pin_map,
            sample_buffer: VecDeque::new(),
            last_pins: None,
            state: DecoderState::new(),
        }
    }

    /// Set custom name (builder pattern)
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Reinitialize all decode state; callable repeatedly
    pub fn reset(&mut self) {
        self.state = DecoderState::new();
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

impl ProcessNode for Mc6809Decoder {
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

        let state = &mut self.state;
        let mut processed = 0;
        while processed < BATCH_SIZE {
            let pins = stream.wait()?;
            state.step(&pins, &writer)?;
            processed += 1;
        }
        Ok(processed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::sender::{ChannelMessage, Sender};
    use crossbeam_channel::unbounded;

    const WIRED_ALL: u32 = (1 << pin::COUNT) - 1;

    fn sample(index: u64, rw: u32, e: u32, q: u32, data: u8, addr: u16) -> SampleVector {
        let levels = rw
            | (e << pin::E)
            | (q << pin::Q)
            | ((data as u32) << pin::D0)
            | ((addr as u32) << pin::A0);
        SampleVector::new(index, levels, WIRED_ALL)
    }

    fn idle(index: u64) -> SampleVector {
        // E high, Q low: not a qualified cycle
        sample(index, 1, 1, 0, 0, 0)
    }

    fn read(index: u64, addr: u16, data: u8) -> SampleVector {
        sample(index, 1, 0, 1, data, addr)
    }

    fn write(index: u64, addr: u16, data: u8) -> SampleVector {
        sample(index, 0, 0, 1, data, addr)
    }

    fn run(decoder: &mut Mc6809Decoder, samples: &[SampleVector]) -> Vec<Annotation> {
        let (sample_tx, sample_rx) = unbounded::<ChannelMessage<SampleVector>>();
        for s in samples {
            sample_tx.send(ChannelMessage::Item(*s)).unwrap();
        }
        sample_tx.send(ChannelMessage::EndOfStream).unwrap();

        let (ann_tx, ann_rx) = unbounded::<ChannelMessage<Annotation>>();
        let inputs = vec![InputPort::new(sample_rx)];
        let outputs = vec![OutputPort::new(Sender::new(vec![ann_tx]))];

        loop {
            match decoder.work(&inputs, &outputs) {
                Ok(_) => {}
                Err(WorkError::Shutdown) => break,
                Err(e) => panic!("work failed: {}", e),
            }
        }

        let mut collected = Vec::new();
        while let Ok(ChannelMessage::Item(a)) = ann_rx.try_recv() {
            collected.push(a);
        }
        collected
    }

    fn of_class(anns: &[Annotation], class: usize) -> Vec<Annotation> {
        anns.iter().filter(|a| a.class == class).cloned().collect()
    }

    #[test]
    fn test_phase_coverage() {
        // Idle, read, idle, write, idle, read, idle: address spans and data
        // spans in order, no warnings
        let samples = [
            idle(0),
            read(1, 0x0100, 0xAA),
            idle(2),
            write(3, 0x0200, 0xBB),
            idle(4),
            read(5, 0x0300, 0xCC),
            idle(6),
        ];
        let mut decoder = Mc6809Decoder::new(PinMap::identity(pin::COUNT));
        let anns = run(&mut decoder, &samples);

        assert!(of_class(&anns, ann::WARN).is_empty());

        let addrs = of_class(&anns, ann::ADDR);
        assert_eq!(addrs.len(), 2);
        assert_eq!(
            (addrs[0].start_sample, addrs[0].end_sample, addrs[0].text.as_str()),
            (1, 3, "0100")
        );
        assert_eq!(
            (addrs[1].start_sample, addrs[1].end_sample, addrs[1].text.as_str()),
            (3, 5, "0200")
        );
        // Consecutive address spans share their boundary
        assert_eq!(addrs[0].end_sample, addrs[1].start_sample);

        let reads = of_class(&anns, ann::MEMRD);
        assert_eq!(reads.len(), 1);
        assert_eq!(
            (reads[0].start_sample, reads[0].end_sample, reads[0].text.as_str()),
            (2, 4, "AA")
        );

        let writes = of_class(&anns, ann::MEMWR);
        assert_eq!(writes.len(), 1);
        assert_eq!(
            (writes[0].start_sample, writes[0].end_sample, writes[0].text.as_str()),
            (4, 6, "BB")
        );
    }

    #[test]
    fn test_illegal_transition_warns_and_discards() {
        // Read directly to write without an intervening idle sample
        let samples = [idle(0), read(1, 0x0100, 0xAA), write(2, 0x0100, 0xBB), idle(3)];
        let mut decoder = Mc6809Decoder::new(PinMap::identity(pin::COUNT));
        let anns = run(&mut decoder, &samples);

        let warns = of_class(&anns, ann::WARN);
        assert_eq!(warns.len(), 1);
        assert_eq!((warns[0].start_sample, warns[0].end_sample), (1, 2));
        assert_eq!(warns[0].text, "Illegal transition between control states");

        // The discarded cycle emits neither an address nor a data span
        assert!(of_class(&anns, ann::ADDR).is_empty());
        assert!(of_class(&anns, ann::MEMRD).is_empty());
        assert!(of_class(&anns, ann::MEMWR).is_empty());
    }

    #[test]
    fn test_instruction_decode_immediate_and_inherent() {
        // LDA #$42 then two NOPs, one memory cycle per byte
        let samples = [
            idle(0),
            read(1, 0x1000, 0x86),
            idle(2),
            read(3, 0x1001, 0x42),
            idle(4),
            read(5, 0x1002, 0x12),
            idle(6),
            read(7, 0x1003, 0x12),
            idle(8),
        ];
        let mut decoder = Mc6809Decoder::new(PinMap::identity(pin::COUNT));
        let anns = run(&mut decoder, &samples);

        let instrs = of_class(&anns, ann::INSTR);
        assert_eq!(instrs.len(), 2);
        assert_eq!(instrs[0].text, "LDA #$42");
        assert_eq!((instrs[0].start_sample, instrs[0].end_sample), (0, 6));
        assert_eq!(instrs[1].text, "NOP");
        assert_eq!((instrs[1].start_sample, instrs[1].end_sample), (6, 8));
    }

    #[test]
    fn test_relative_branch_displacement() {
        // BRA with displacement -2: flushed three cycle-ends after the
        // opcode fetch, so the jump renders as *+1
        let samples = [
            idle(0),
            read(1, 0x2000, 0x20),
            idle(2),
            read(3, 0x2001, 0xFE),
            idle(4),
            read(5, 0x2000, 0x20),
            idle(6),
        ];
        let mut decoder = Mc6809Decoder::new(PinMap::identity(pin::COUNT));
        let anns = run(&mut decoder, &samples);

        let instrs = of_class(&anns, ann::INSTR);
        assert_eq!(instrs.len(), 1);
        assert_eq!(instrs[0].text, "BRA *+1");
    }

    #[test]
    fn test_store_reclassifies_write_as_operand() {
        // STA <$80 writes the accumulator: the write cycle lands on the
        // operand row, not the data row
        let samples = [
            idle(0),
            read(1, 0x1000, 0x97),
            idle(2),
            read(3, 0x1001, 0x80),
            idle(4),
            write(5, 0x0080, 0x55),
            idle(6),
            read(7, 0x1002, 0x12),
            idle(8),
        ];
        let mut decoder = Mc6809Decoder::new(PinMap::identity(pin::COUNT));
        let anns = run(&mut decoder, &samples);

        let wops = of_class(&anns, ann::WOP);
        assert_eq!(wops.len(), 1);
        assert_eq!(wops[0].text, "55");
        assert!(of_class(&anns, ann::MEMWR).is_empty());

        let instrs = of_class(&anns, ann::INSTR);
        assert_eq!(instrs.len(), 1);
        assert_eq!(instrs[0].text, "STA <$80");
    }

    #[test]
    fn test_unknown_opcode_renders_placeholder() {
        let samples = [
            idle(0),
            read(1, 0x1000, 0x01),
            idle(2),
            read(3, 0x1001, 0x12),
            idle(4),
        ];
        let mut decoder = Mc6809Decoder::new(PinMap::identity(pin::COUNT));
        let anns = run(&mut decoder, &samples);

        let instrs = of_class(&anns, ann::INSTR);
        assert_eq!(instrs.len(), 1);
        assert_eq!(instrs[0].text, "???");
    }

    #[test]
    fn test_unassigned_address_lines_render_placeholder() {
        // Map everything except the address lines
        let mut mapping: Vec<Option<usize>> = (0..pin::COUNT).map(Some).collect();
        for entry in mapping.iter_mut().skip(pin::A0) {
            *entry = None;
        }
        let samples = [
            idle(0),
            read(1, 0x0100, 0x12),
            idle(2),
            read(3, 0x0101, 0x12),
            idle(4),
        ];
        let mut decoder = Mc6809Decoder::new(PinMap::new(mapping));
        let anns = run(&mut decoder, &samples);

        let addrs = of_class(&anns, ann::ADDR);
        assert_eq!(addrs.len(), 1);
        assert_eq!(addrs[0].text, "????");
    }

    #[test]
    fn test_reset_is_idempotent() {
        let samples = [
            idle(0),
            read(1, 0x1000, 0x86),
            idle(2),
            read(3, 0x1001, 0x42),
            idle(4),
            read(5, 0x1002, 0x12),
            idle(6),
        ];

        let mut decoder = Mc6809Decoder::new(PinMap::identity(pin::COUNT));
        let first = run(&mut decoder, &samples);

        decoder.reset();
        decoder.reset();
        let second = run(&mut decoder, &samples);

        assert_eq!(first, second);
    }

    #[test]
    fn test_metadata_tables() {
        assert_eq!(Mc6809Decoder::channels().len(), pin::COUNT);
        assert_eq!(Mc6809Decoder::channels()[pin::RW].id, "rw");
        assert_eq!(Mc6809Decoder::channels()[pin::D0].id, "d0");
        assert_eq!(Mc6809Decoder::channels()[pin::A15].id, "a15");
        assert_eq!(Mc6809Decoder::optional_channels().len(), 9);
        assert_eq!(Mc6809Decoder::annotations().len(), 7);
        assert_eq!(Mc6809Decoder::annotation_rows().len(), 5);
    }
}
