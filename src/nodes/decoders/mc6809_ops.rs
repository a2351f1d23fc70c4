//! MC6809 opcode knowledge
//!
//! Lookup tables for the instruction sub-machine: mnemonic, addressing mode
//! and memory-operand traffic per opcode, plus the postbyte decoding rules
//! for indexed addressing, register pairs and register lists. The opcode map
//! exploits the 6809's column regularity instead of spelling out 256 rows.

/// Addressing mode of an opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrMode {
    Inherent,
    Imm8,
    Imm16,
    Direct,
    Extended,
    Indexed,
    Rel8,
    Rel16,
    RegPair,
    RegList,
}

/// One decoded opcode: display name, operand encoding and the memory bytes
/// the instruction reads/writes after its operand bytes
#[derive(Debug, Clone, Copy)]
pub struct OpEntry {
    pub mnemonic: &'static str,
    pub mode: AddrMode,
    pub reads: u8,
    pub writes: u8,
}

impl OpEntry {
    const fn new(mnemonic: &'static str, mode: AddrMode, reads: u8, writes: u8) -> Self {
        Self {
            mnemonic,
            mode,
            reads,
            writes,
        }
    }
}

/// Memory read-modify-write group, low nibble of rows $0x/$6x/$7x
const RMW: [Option<&str>; 16] = [
    Some("NEG"),
    None,
    None,
    Some("COM"),
    Some("LSR"),
    None,
    Some("ROR"),
    Some("ASR"),
    Some("ASL"),
    Some("ROL"),
    Some("DEC"),
    None,
    Some("INC"),
    Some("TST"),
    Some("JMP"),
    Some("CLR"),
];

/// Short branches, row $2x; page-1 long variants prepend 'L'
const BRANCHES: [&str; 16] = [
    "BRA", "BRN", "BHI", "BLS", "BCC", "BCS", "BNE", "BEQ", "BVC", "BVS", "BPL", "BMI", "BGE",
    "BLT", "BGT", "BLE",
];

/// Register names by EXG/TFR postbyte nibble
const REG_NAMES: [&str; 16] = [
    "D", "X", "Y", "U", "S", "PC", "?", "?", "A", "B", "CC", "DP", "?", "?", "?", "?",
];

fn rmw_memory(op: u8, mode: AddrMode) -> Option<OpEntry> {
    let mnemonic = RMW[(op & 0x0F) as usize]?;
    let (reads, writes) = match op & 0x0F {
        0x0D => (1, 0), // TST
        0x0E => (0, 0), // JMP
        0x0F => (0, 1), // CLR
        _ => (1, 1),
    };
    Some(OpEntry::new(mnemonic, mode, reads, writes))
}

fn rmw_inherent(op: u8) -> Option<OpEntry> {
    if op & 0x0F == 0x0E {
        return None; // no JMPA/JMPB
    }
    let base = RMW[(op & 0x0F) as usize]?;
    let mnemonic: &'static str = match (base, op & 0xF0) {
        ("NEG", 0x40) => "NEGA",
        ("COM", 0x40) => "COMA",
        ("LSR", 0x40) => "LSRA",
        ("ROR", 0x40) => "RORA",
        ("ASR", 0x40) => "ASRA",
        ("ASL", 0x40) => "ASLA",
        ("ROL", 0x40) => "ROLA",
        ("DEC", 0x40) => "DECA",
        ("INC", 0x40) => "INCA",
        ("TST", 0x40) => "TSTA",
        ("CLR", 0x40) => "CLRA",
        ("NEG", 0x50) => "NEGB",
        ("COM", 0x50) => "COMB",
        ("LSR", 0x50) => "LSRB",
        ("ROR", 0x50) => "RORB",
        ("ASR", 0x50) => "ASRB",
        ("ASL", 0x50) => "ASLB",
        ("ROL", 0x50) => "ROLB",
        ("DEC", 0x50) => "DECB",
        ("INC", 0x50) => "INCB",
        ("TST", 0x50) => "TSTB",
        ("CLR", 0x50) => "CLRB",
        _ => return None,
    };
    Some(OpEntry::new(mnemonic, AddrMode::Inherent, 0, 0))
}

/// Mode for columns $8x-$Fx by bits 5..4
fn alu_mode(op: u8) -> AddrMode {
    match (op >> 4) & 0x03 {
        0 => AddrMode::Imm8, // widened to Imm16 for 16-bit columns by caller
        1 => AddrMode::Direct,
        2 => AddrMode::Indexed,
        _ => AddrMode::Extended,
    }
}

fn alu(op: u8) -> Option<OpEntry> {
    let b_side = op >= 0xC0;
    let mode = alu_mode(op);
    let immediate = mode == AddrMode::Imm8;

    // (mnemonic, operand width in bytes, is_store)
    let (mnemonic, width, store): (&'static str, u8, bool) = match (op & 0x0F, b_side) {
        (0x0, false) => ("SUBA", 1, false),
        (0x0, true) => ("SUBB", 1, false),
        (0x1, false) => ("CMPA", 1, false),
        (0x1, true) => ("CMPB", 1, false),
        (0x2, false) => ("SBCA", 1, false),
        (0x2, true) => ("SBCB", 1, false),
        (0x3, false) => ("SUBD", 2, false),
        (0x3, true) => ("ADDD", 2, false),
        (0x4, false) => ("ANDA", 1, false),
        (0x4, true) => ("ANDB", 1, false),
        (0x5, false) => ("BITA", 1, false),
        (0x5, true) => ("BITB", 1, false),
        (0x6, false) => ("LDA", 1, false),
        (0x6, true) => ("LDB", 1, false),
        (0x7, false) => ("STA", 1, true),
        (0x7, true) => ("STB", 1, true),
        (0x8, false) => ("EORA", 1, false),
        (0x8, true) => ("EORB", 1, false),
        (0x9, false) => ("ADCA", 1, false),
        (0x9, true) => ("ADCB", 1, false),
        (0xA, false) => ("ORA", 1, false),
        (0xA, true) => ("ORB", 1, false),
        (0xB, false) => ("ADDA", 1, false),
        (0xB, true) => ("ADDB", 1, false),
        (0xC, false) => ("CMPX", 2, false),
        (0xC, true) => ("LDD", 2, false),
        (0xD, false) => {
            // $8D is BSR, the rest of the column is JSR
            return Some(if immediate {
                OpEntry::new("BSR", AddrMode::Rel8, 0, 0)
            } else {
                OpEntry::new("JSR", mode, 0, 0)
            });
        }
        (0xD, true) => ("STD", 2, true),
        (0xE, false) => ("LDX", 2, false),
        (0xE, true) => ("LDU", 2, false),
        (0xF, false) => ("STX", 2, true),
        (0xF, true) => ("STU", 2, true),
        _ => return None,
    };

    if immediate {
        if store {
            return None; // store-immediate does not exist
        }
        let mode = if width == 2 {
            AddrMode::Imm16
        } else {
            AddrMode::Imm8
        };
        return Some(OpEntry::new(mnemonic, mode, 0, 0));
    }

    let (reads, writes) = if store { (0, width) } else { (width, 0) };
    Some(OpEntry::new(mnemonic, mode, reads, writes))
}

fn page0(op: u8) -> Option<OpEntry> {
    match op {
        0x00..=0x0F => rmw_memory(op, AddrMode::Direct),
        0x12 => Some(OpEntry::new("NOP", AddrMode::Inherent, 0, 0)),
        0x13 => Some(OpEntry::new("SYNC", AddrMode::Inherent, 0, 0)),
        0x16 => Some(OpEntry::new("LBRA", AddrMode::Rel16, 0, 0)),
        0x17 => Some(OpEntry::new("LBSR", AddrMode::Rel16, 0, 0)),
        0x19 => Some(OpEntry::new("DAA", AddrMode::Inherent, 0, 0)),
        0x1A => Some(OpEntry::new("ORCC", AddrMode::Imm8, 0, 0)),
        0x1C => Some(OpEntry::new("ANDCC", AddrMode::Imm8, 0, 0)),
        0x1D => Some(OpEntry::new("SEX", AddrMode::Inherent, 0, 0)),
        0x1E => Some(OpEntry::new("EXG", AddrMode::RegPair, 0, 0)),
        0x1F => Some(OpEntry::new("TFR", AddrMode::RegPair, 0, 0)),
        0x20..=0x2F => Some(OpEntry::new(
            BRANCHES[(op & 0x0F) as usize],
            AddrMode::Rel8,
            0,
            0,
        )),
        0x30 => Some(OpEntry::new("LEAX", AddrMode::Indexed, 0, 0)),
        0x31 => Some(OpEntry::new("LEAY", AddrMode::Indexed, 0, 0)),
        0x32 => Some(OpEntry::new("LEAS", AddrMode::Indexed, 0, 0)),
        0x33 => Some(OpEntry::new("LEAU", AddrMode::Indexed, 0, 0)),
        0x34 => Some(OpEntry::new("PSHS", AddrMode::RegList, 0, 0)),
        0x35 => Some(OpEntry::new("PULS", AddrMode::RegList, 0, 0)),
        0x36 => Some(OpEntry::new("PSHU", AddrMode::RegList, 0, 0)),
        0x37 => Some(OpEntry::new("PULU", AddrMode::RegList, 0, 0)),
        0x39 => Some(OpEntry::new("RTS", AddrMode::Inherent, 0, 0)),
        0x3A => Some(OpEntry::new("ABX", AddrMode::Inherent, 0, 0)),
        0x3B => Some(OpEntry::new("RTI", AddrMode::Inherent, 0, 0)),
        0x3C => Some(OpEntry::new("CWAI", AddrMode::Imm8, 0, 0)),
        0x3D => Some(OpEntry::new("MUL", AddrMode::Inherent, 0, 0)),
        0x3F => Some(OpEntry::new("SWI", AddrMode::Inherent, 0, 0)),
        0x40..=0x5F => rmw_inherent(op),
        0x60..=0x6F => rmw_memory(op, AddrMode::Indexed),
        0x70..=0x7F => rmw_memory(op, AddrMode::Extended),
        0x80..=0xFF => alu(op),
        _ => None,
    }
}

fn page1(op: u8) -> Option<OpEntry> {
    match op {
        // Long branches; $1021 LBRN .. $102F LBLE ($16 covers LBRA)
        0x21..=0x2F => {
            let long: &'static str = match BRANCHES[(op & 0x0F) as usize] {
                "BRN" => "LBRN",
                "BHI" => "LBHI",
                "BLS" => "LBLS",
                "BCC" => "LBCC",
                "BCS" => "LBCS",
                "BNE" => "LBNE",
                "BEQ" => "LBEQ",
                "BVC" => "LBVC",
                "BVS" => "LBVS",
                "BPL" => "LBPL",
                "BMI" => "LBMI",
                "BGE" => "LBGE",
                "BLT" => "LBLT",
                "BGT" => "LBGT",
                "BLE" => "LBLE",
                _ => return None,
            };
            Some(OpEntry::new(long, AddrMode::Rel16, 0, 0))
        }
        0x3F => Some(OpEntry::new("SWI2", AddrMode::Inherent, 0, 0)),
        0x83 => Some(OpEntry::new("CMPD", AddrMode::Imm16, 0, 0)),
        0x93 => Some(OpEntry::new("CMPD", AddrMode::Direct, 2, 0)),
        0xA3 => Some(OpEntry::new("CMPD", AddrMode::Indexed, 2, 0)),
        0xB3 => Some(OpEntry::new("CMPD", AddrMode::Extended, 2, 0)),
        0x8C => Some(OpEntry::new("CMPY", AddrMode::Imm16, 0, 0)),
        0x9C => Some(OpEntry::new("CMPY", AddrMode::Direct, 2, 0)),
        0xAC => Some(OpEntry::new("CMPY", AddrMode::Indexed, 2, 0)),
        0xBC => Some(OpEntry::new("CMPY", AddrMode::Extended, 2, 0)),
        0x8E => Some(OpEntry::new("LDY", AddrMode::Imm16, 0, 0)),
        0x9E => Some(OpEntry::new("LDY", AddrMode::Direct, 2, 0)),
        0xAE => Some(OpEntry::new("LDY", AddrMode::Indexed, 2, 0)),
        0xBE => Some(OpEntry::new("LDY", AddrMode::Extended, 2, 0)),
        0x9F => Some(OpEntry::new("STY", AddrMode::Direct, 0, 2)),
        0xAF => Some(OpEntry::new("STY", AddrMode::Indexed, 0, 2)),
        0xBF => Some(OpEntry::new("STY", AddrMode::Extended, 0, 2)),
        0xCE => Some(OpEntry::new("LDS", AddrMode::Imm16, 0, 0)),
        0xDE => Some(OpEntry::new("LDS", AddrMode::Direct, 2, 0)),
        0xEE => Some(OpEntry::new("LDS", AddrMode::Indexed, 2, 0)),
        0xFE => Some(OpEntry::new("LDS", AddrMode::Extended, 2, 0)),
        0xDF => Some(OpEntry::new("STS", AddrMode::Direct, 0, 2)),
        0xEF => Some(OpEntry::new("STS", AddrMode::Indexed, 0, 2)),
        0xFF => Some(OpEntry::new("STS", AddrMode::Extended, 0, 2)),
        _ => None,
    }
}

fn page2(op: u8) -> Option<OpEntry> {
    match op {
        0x3F => Some(OpEntry::new("SWI3", AddrMode::Inherent, 0, 0)),
        0x83 => Some(OpEntry::new("CMPU", AddrMode::Imm16, 0, 0)),
        0x93 => Some(OpEntry::new("CMPU", AddrMode::Direct, 2, 0)),
        0xA3 => Some(OpEntry::new("CMPU", AddrMode::Indexed, 2, 0)),
        0xB3 => Some(OpEntry::new("CMPU", AddrMode::Extended, 2, 0)),
        0x8C => Some(OpEntry::new("CMPS", AddrMode::Imm16, 0, 0)),
        0x9C => Some(OpEntry::new("CMPS", AddrMode::Direct, 2, 0)),
        0xAC => Some(OpEntry::new("CMPS", AddrMode::Indexed, 2, 0)),
        0xBC => Some(OpEntry::new("CMPS", AddrMode::Extended, 2, 0)),
        _ => None,
    }
}

/// Look up an opcode under the given prefix byte (0, $10 or $11)
pub fn lookup(prefix: u8, op: u8) -> Option<OpEntry> {
    match prefix {
        0x00 => page0(op),
        0x10 => page1(op),
        0x11 => page2(op),
        _ => None,
    }
}

/// Operand bytes following the opcode, before indexed postbyte extras
pub fn operand_len(mode: AddrMode) -> u8 {
    match mode {
        AddrMode::Inherent => 0,
        AddrMode::Imm8 | AddrMode::Direct | AddrMode::Rel8 => 1,
        AddrMode::Imm16 | AddrMode::Extended | AddrMode::Rel16 => 2,
        AddrMode::Indexed | AddrMode::RegPair | AddrMode::RegList => 1,
    }
}

/// Extra operand bytes demanded by an indexed-mode postbyte
pub fn indexed_extra(postbyte: u8) -> u8 {
    if postbyte & 0x80 == 0 {
        return 0; // 5-bit offset lives in the postbyte
    }
    match postbyte & 0x0F {
        0x08 | 0x0C => 1,
        0x09 | 0x0D | 0x0F => 2,
        _ => 0,
    }
}

/// "src,dst" text for an EXG/TFR postbyte
pub fn reg_pair_text(postbyte: u8) -> String {
    format!(
        "{},{}",
        REG_NAMES[(postbyte >> 4) as usize],
        REG_NAMES[(postbyte & 0x0F) as usize]
    )
}

/// Register list text for PSHS/PULS/PSHU/PULU; `other_stack` is the pointer
/// register named by bit 6 ('U' for the S stack, 'S' for the U stack)
pub fn reg_list_text(postbyte: u8, other_stack: char) -> String {
    let mut regs: Vec<String> = Vec::new();
    if postbyte & 0x80 != 0 {
        regs.push("PC".to_string());
    }
    if postbyte & 0x40 != 0 {
        regs.push(other_stack.to_string());
    }
    if postbyte & 0x20 != 0 {
        regs.push("Y".to_string());
    }
    if postbyte & 0x10 != 0 {
        regs.push("X".to_string());
    }
    if postbyte & 0x08 != 0 {
        regs.push("DP".to_string());
    }
    if postbyte & 0x04 != 0 {
        regs.push("B".to_string());
    }
    if postbyte & 0x02 != 0 {
        regs.push("A".to_string());
    }
    if postbyte & 0x01 != 0 {
        regs.push("CC".to_string());
    }
    regs.join(",")
}

/// Render an indexed-mode postbyte plus its extra operand value
pub fn indexed_text(postbyte: u8, extra: u16) -> String {
    let reg = ["X", "Y", "U", "S"][((postbyte >> 5) & 0x03) as usize];

    if postbyte & 0x80 == 0 {
        // 5-bit signed offset
        let off = ((postbyte & 0x1F) as i8) << 3 >> 3;
        return format!("{},{}", off, reg);
    }

    let body = match postbyte & 0x0F {
        0x00 => format!(",{}+", reg),
        0x01 => format!(",{}++", reg),
        0x02 => format!(",-{}", reg),
        0x03 => format!(",--{}", reg),
        0x04 => format!(",{}", reg),
        0x05 => format!("B,{}", reg),
        0x06 => format!("A,{}", reg),
        0x08 => format!("{},{}", extra as u8 as i8, reg),
        0x09 => format!("{},{}", extra as i16, reg),
        0x0B => format!("D,{}", reg),
        0x0C => format!("{},PCR", extra as u8 as i8),
        0x0D => format!("{},PCR", extra as i16),
        0x0F => format!("${:04X}", extra),
        _ => format!("?,{}", reg),
    };

    if postbyte & 0x10 != 0 {
        format!("[{}]", body)
    } else {
        body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_opcodes() {
        let nop = lookup(0, 0x12).unwrap();
        assert_eq!(nop.mnemonic, "NOP");
        assert_eq!(nop.mode, AddrMode::Inherent);

        let lda = lookup(0, 0x86).unwrap();
        assert_eq!(lda.mnemonic, "LDA");
        assert_eq!(lda.mode, AddrMode::Imm8);

        let sta = lookup(0, 0x97).unwrap();
        assert_eq!(sta.mnemonic, "STA");
        assert_eq!(sta.mode, AddrMode::Direct);
        assert_eq!(sta.writes, 1);
        assert_eq!(sta.reads, 0);

        let ldx = lookup(0, 0x8E).unwrap();
        assert_eq!(ldx.mnemonic, "LDX");
        assert_eq!(ldx.mode, AddrMode::Imm16);

        let bra = lookup(0, 0x20).unwrap();
        assert_eq!(bra.mnemonic, "BRA");
        assert_eq!(bra.mode, AddrMode::Rel8);
    }

    #[test]
    fn test_rmw_traffic() {
        let neg = lookup(0, 0x00).unwrap();
        assert_eq!((neg.mnemonic, neg.reads, neg.writes), ("NEG", 1, 1));

        let tst = lookup(0, 0x6D).unwrap();
        assert_eq!((tst.mnemonic, tst.reads, tst.writes), ("TST", 1, 0));
        assert_eq!(tst.mode, AddrMode::Indexed);

        let clr = lookup(0, 0x7F).unwrap();
        assert_eq!((clr.mnemonic, clr.reads, clr.writes), ("CLR", 0, 1));
        assert_eq!(clr.mode, AddrMode::Extended);
    }

    #[test]
    fn test_prefixed_opcodes() {
        let cmpd = lookup(0x10, 0x83).unwrap();
        assert_eq!(cmpd.mnemonic, "CMPD");
        assert_eq!(cmpd.mode, AddrMode::Imm16);

        let lbne = lookup(0x10, 0x26).unwrap();
        assert_eq!(lbne.mnemonic, "LBNE");
        assert_eq!(lbne.mode, AddrMode::Rel16);

        let cmpu = lookup(0x11, 0x83).unwrap();
        assert_eq!(cmpu.mnemonic, "CMPU");

        let sts = lookup(0x10, 0xFF).unwrap();
        assert_eq!((sts.mnemonic, sts.writes), ("STS", 2));
    }

    #[test]
    fn test_illegal_opcodes() {
        assert!(lookup(0, 0x01).is_none());
        assert!(lookup(0, 0x87).is_none()); // STA immediate
        assert!(lookup(0, 0x4E).is_none());
        assert!(lookup(0x10, 0x12).is_none());
        assert!(lookup(0x11, 0x8E).is_none());
    }

    #[test]
    fn test_indexed_extra_bytes() {
        assert_eq!(indexed_extra(0x00), 0); // 5-bit offset
        assert_eq!(indexed_extra(0x84), 0); // ,R
        assert_eq!(indexed_extra(0x88), 1); // 8-bit offset
        assert_eq!(indexed_extra(0x89), 2); // 16-bit offset
        assert_eq!(indexed_extra(0x8C), 1); // 8-bit PCR
        assert_eq!(indexed_extra(0x9F), 2); // extended indirect
    }

    #[test]
    fn test_indexed_text() {
        assert_eq!(indexed_text(0x84, 0), ",X");
        assert_eq!(indexed_text(0xA0, 0), ",Y+");
        assert_eq!(indexed_text(0xC1, 0), ",U++");
        assert_eq!(indexed_text(0xE3, 0), ",--S");
        assert_eq!(indexed_text(0x88, 0xF0), "-16,X");
        assert_eq!(indexed_text(0x1F, 0), "-1,X"); // 5-bit offset
        assert_eq!(indexed_text(0x0F, 0), "15,X");
        assert_eq!(indexed_text(0x94, 0), "[,X]");
        assert_eq!(indexed_text(0x9F, 0x1234), "[$1234]");
    }

    #[test]
    fn test_reg_pair_and_list() {
        assert_eq!(reg_pair_text(0x12), "X,Y");
        assert_eq!(reg_pair_text(0x8A), "A,CC");
        assert_eq!(reg_list_text(0x86, 'U'), "PC,B,A");
        assert_eq!(reg_list_text(0xFF, 'U'), "PC,U,Y,X,DP,B,A,CC");
        assert_eq!(reg_list_text(0x40, 'S'), "S");
    }
}
