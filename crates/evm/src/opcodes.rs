//! Instruction set.
//!
//! Each opcode is declared once with its base gas tier and how many stack
//! items it pops and pushes. The interpreter checks the stack against this
//! table before executing an instruction.

/// Base cost classes. `Special` instructions are priced entirely by the
/// gas module from their operands and the active schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GasTier {
    Zero,
    Base,
    VeryLow,
    Low,
    Mid,
    High,
    Ext,
    Special,
}

impl GasTier {
    pub fn index(self) -> usize {
        match self {
            GasTier::Zero => 0,
            GasTier::Base => 1,
            GasTier::VeryLow => 2,
            GasTier::Low => 3,
            GasTier::Mid => 4,
            GasTier::High => 5,
            GasTier::Ext => 6,
            GasTier::Special => 7,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstructionInfo {
    pub tier: GasTier,
    pub stack_in: usize,
    pub stack_out: usize,
}

macro_rules! opcodes {
    ($($name:ident = $byte:literal => $tier:ident, $input:literal, $output:literal;)*) => {
        #[allow(non_camel_case_types, clippy::upper_case_acronyms)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum Opcode {
            $($name = $byte,)*
        }

        impl Opcode {
            pub fn from_u8(byte: u8) -> Option<Self> {
                match byte {
                    $($byte => Some(Opcode::$name),)*
                    _ => None,
                }
            }

            pub fn name(&self) -> &'static str {
                match self {
                    $(Opcode::$name => stringify!($name),)*
                }
            }

            pub fn info(&self) -> InstructionInfo {
                match self {
                    $(Opcode::$name => InstructionInfo {
                        tier: GasTier::$tier,
                        stack_in: $input,
                        stack_out: $output,
                    },)*
                }
            }
        }
    };
}

opcodes! {
    STOP = 0x00 => Zero, 0, 0;
    ADD = 0x01 => VeryLow, 2, 1;
    MUL = 0x02 => Low, 2, 1;
    SUB = 0x03 => VeryLow, 2, 1;
    DIV = 0x04 => Low, 2, 1;
    SDIV = 0x05 => Low, 2, 1;
    MOD = 0x06 => Low, 2, 1;
    SMOD = 0x07 => Low, 2, 1;
    ADDMOD = 0x08 => Mid, 3, 1;
    MULMOD = 0x09 => Mid, 3, 1;
    EXP = 0x0a => Special, 2, 1;
    SIGNEXTEND = 0x0b => Low, 2, 1;

    LT = 0x10 => VeryLow, 2, 1;
    GT = 0x11 => VeryLow, 2, 1;
    SLT = 0x12 => VeryLow, 2, 1;
    SGT = 0x13 => VeryLow, 2, 1;
    EQ = 0x14 => VeryLow, 2, 1;
    ISZERO = 0x15 => VeryLow, 1, 1;
    AND = 0x16 => VeryLow, 2, 1;
    OR = 0x17 => VeryLow, 2, 1;
    XOR = 0x18 => VeryLow, 2, 1;
    NOT = 0x19 => VeryLow, 1, 1;
    BYTE = 0x1a => VeryLow, 2, 1;

    SHA3 = 0x20 => Special, 2, 1;

    ADDRESS = 0x30 => Base, 0, 1;
    BALANCE = 0x31 => Special, 1, 1;
    ORIGIN = 0x32 => Base, 0, 1;
    CALLER = 0x33 => Base, 0, 1;
    CALLVALUE = 0x34 => Base, 0, 1;
    CALLDATALOAD = 0x35 => VeryLow, 1, 1;
    CALLDATASIZE = 0x36 => Base, 0, 1;
    CALLDATACOPY = 0x37 => VeryLow, 3, 0;
    CODESIZE = 0x38 => Base, 0, 1;
    CODECOPY = 0x39 => VeryLow, 3, 0;
    GASPRICE = 0x3a => Base, 0, 1;
    EXTCODESIZE = 0x3b => Special, 1, 1;
    EXTCODECOPY = 0x3c => Special, 4, 0;

    BLOCKHASH = 0x40 => Ext, 1, 1;
    COINBASE = 0x41 => Base, 0, 1;
    TIMESTAMP = 0x42 => Base, 0, 1;
    NUMBER = 0x43 => Base, 0, 1;
    DIFFICULTY = 0x44 => Base, 0, 1;
    GASLIMIT = 0x45 => Base, 0, 1;

    POP = 0x50 => Base, 1, 0;
    MLOAD = 0x51 => VeryLow, 1, 1;
    MSTORE = 0x52 => VeryLow, 2, 0;
    MSTORE8 = 0x53 => VeryLow, 2, 0;
    SLOAD = 0x54 => Special, 1, 1;
    SSTORE = 0x55 => Special, 2, 0;
    JUMP = 0x56 => Mid, 1, 0;
    JUMPI = 0x57 => High, 2, 0;
    PC = 0x58 => Base, 0, 1;
    MSIZE = 0x59 => Base, 0, 1;
    GAS = 0x5a => Base, 0, 1;
    JUMPDEST = 0x5b => Special, 0, 0;

    PUSH1 = 0x60 => VeryLow, 0, 1;
    PUSH2 = 0x61 => VeryLow, 0, 1;
    PUSH3 = 0x62 => VeryLow, 0, 1;
    PUSH4 = 0x63 => VeryLow, 0, 1;
    PUSH5 = 0x64 => VeryLow, 0, 1;
    PUSH6 = 0x65 => VeryLow, 0, 1;
    PUSH7 = 0x66 => VeryLow, 0, 1;
    PUSH8 = 0x67 => VeryLow, 0, 1;
    PUSH9 = 0x68 => VeryLow, 0, 1;
    PUSH10 = 0x69 => VeryLow, 0, 1;
    PUSH11 = 0x6a => VeryLow, 0, 1;
    PUSH12 = 0x6b => VeryLow, 0, 1;
    PUSH13 = 0x6c => VeryLow, 0, 1;
    PUSH14 = 0x6d => VeryLow, 0, 1;
    PUSH15 = 0x6e => VeryLow, 0, 1;
    PUSH16 = 0x6f => VeryLow, 0, 1;
    PUSH17 = 0x70 => VeryLow, 0, 1;
    PUSH18 = 0x71 => VeryLow, 0, 1;
    PUSH19 = 0x72 => VeryLow, 0, 1;
    PUSH20 = 0x73 => VeryLow, 0, 1;
    PUSH21 = 0x74 => VeryLow, 0, 1;
    PUSH22 = 0x75 => VeryLow, 0, 1;
    PUSH23 = 0x76 => VeryLow, 0, 1;
    PUSH24 = 0x77 => VeryLow, 0, 1;
    PUSH25 = 0x78 => VeryLow, 0, 1;
    PUSH26 = 0x79 => VeryLow, 0, 1;
    PUSH27 = 0x7a => VeryLow, 0, 1;
    PUSH28 = 0x7b => VeryLow, 0, 1;
    PUSH29 = 0x7c => VeryLow, 0, 1;
    PUSH30 = 0x7d => VeryLow, 0, 1;
    PUSH31 = 0x7e => VeryLow, 0, 1;
    PUSH32 = 0x7f => VeryLow, 0, 1;

    DUP1 = 0x80 => VeryLow, 1, 2;
    DUP2 = 0x81 => VeryLow, 2, 3;
    DUP3 = 0x82 => VeryLow, 3, 4;
    DUP4 = 0x83 => VeryLow, 4, 5;
    DUP5 = 0x84 => VeryLow, 5, 6;
    DUP6 = 0x85 => VeryLow, 6, 7;
    DUP7 = 0x86 => VeryLow, 7, 8;
    DUP8 = 0x87 => VeryLow, 8, 9;
    DUP9 = 0x88 => VeryLow, 9, 10;
    DUP10 = 0x89 => VeryLow, 10, 11;
    DUP11 = 0x8a => VeryLow, 11, 12;
    DUP12 = 0x8b => VeryLow, 12, 13;
    DUP13 = 0x8c => VeryLow, 13, 14;
    DUP14 = 0x8d => VeryLow, 14, 15;
    DUP15 = 0x8e => VeryLow, 15, 16;
    DUP16 = 0x8f => VeryLow, 16, 17;

    SWAP1 = 0x90 => VeryLow, 2, 2;
    SWAP2 = 0x91 => VeryLow, 3, 3;
    SWAP3 = 0x92 => VeryLow, 4, 4;
    SWAP4 = 0x93 => VeryLow, 5, 5;
    SWAP5 = 0x94 => VeryLow, 6, 6;
    SWAP6 = 0x95 => VeryLow, 7, 7;
    SWAP7 = 0x96 => VeryLow, 8, 8;
    SWAP8 = 0x97 => VeryLow, 9, 9;
    SWAP9 = 0x98 => VeryLow, 10, 10;
    SWAP10 = 0x99 => VeryLow, 11, 11;
    SWAP11 = 0x9a => VeryLow, 12, 12;
    SWAP12 = 0x9b => VeryLow, 13, 13;
    SWAP13 = 0x9c => VeryLow, 14, 14;
    SWAP14 = 0x9d => VeryLow, 15, 15;
    SWAP15 = 0x9e => VeryLow, 16, 16;
    SWAP16 = 0x9f => VeryLow, 17, 17;

    LOG0 = 0xa0 => Special, 2, 0;
    LOG1 = 0xa1 => Special, 3, 0;
    LOG2 = 0xa2 => Special, 4, 0;
    LOG3 = 0xa3 => Special, 5, 0;
    LOG4 = 0xa4 => Special, 6, 0;

    CREATE = 0xf0 => Special, 3, 1;
    CALL = 0xf1 => Special, 7, 1;
    CALLCODE = 0xf2 => Special, 7, 1;
    RETURN = 0xf3 => Zero, 2, 0;
    DELEGATECALL = 0xf4 => Special, 6, 1;
    SUICIDE = 0xff => Special, 1, 0;
}

impl Opcode {
    /// Number of immediate bytes following a PUSH, zero otherwise.
    pub fn push_bytes(&self) -> usize {
        let byte = *self as u8;
        if (Opcode::PUSH1 as u8..=Opcode::PUSH32 as u8).contains(&byte) {
            (byte - Opcode::PUSH1 as u8 + 1) as usize
        } else {
            0
        }
    }

    /// DUPn/SWAPn depth, LOGn topic count.
    pub fn position(&self) -> usize {
        let byte = *self as u8;
        match byte {
            0x80..=0x8f => (byte - 0x80 + 1) as usize,
            0x90..=0x9f => (byte - 0x90 + 1) as usize,
            0xa0..=0xa4 => (byte - 0xa0) as usize,
            _ => 0,
        }
    }

    pub fn is_call(&self) -> bool {
        matches!(self, Opcode::CALL | Opcode::CALLCODE | Opcode::DELEGATECALL)
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_known_and_unknown() {
        assert_eq!(Opcode::from_u8(0x01), Some(Opcode::ADD));
        assert_eq!(Opcode::from_u8(0xf4), Some(Opcode::DELEGATECALL));
        assert_eq!(Opcode::from_u8(0xff), Some(Opcode::SUICIDE));
        for byte in [0x0c, 0x1b, 0x3d, 0x46, 0x5c, 0x5f, 0xa5, 0xf5, 0xfa, 0xfd, 0xfe] {
            assert_eq!(Opcode::from_u8(byte), None, "0x{:02x}", byte);
        }
    }

    #[test]
    fn test_every_byte_round_trips() {
        for byte in 0..=u8::MAX {
            if let Some(op) = Opcode::from_u8(byte) {
                assert_eq!(op as u8, byte);
            }
        }
    }

    #[test]
    fn test_push_and_position() {
        assert_eq!(Opcode::PUSH1.push_bytes(), 1);
        assert_eq!(Opcode::PUSH32.push_bytes(), 32);
        assert_eq!(Opcode::ADD.push_bytes(), 0);
        assert_eq!(Opcode::DUP16.position(), 16);
        assert_eq!(Opcode::SWAP1.position(), 1);
        assert_eq!(Opcode::LOG3.position(), 3);
    }

    #[test]
    fn test_stack_shapes() {
        let swap = Opcode::SWAP16.info();
        assert_eq!((swap.stack_in, swap.stack_out), (17, 17));
        let call = Opcode::CALL.info();
        assert_eq!((call.stack_in, call.stack_out), (7, 1));
        assert_eq!(Opcode::DELEGATECALL.info().stack_in, 6);
        assert_eq!(Opcode::JUMPI.info().tier, GasTier::High);
        assert_eq!(Opcode::SHA3.name(), "SHA3");
    }
}
