//! Bytecode decoder module
//! Turns runtime bytecode hex into the opcode mnemonic sequence the
//! pattern detector matches against.
//!
//! Decoding is byte-by-byte and lossy: PUSH operands are not skipped, so
//! operand bytes that happen to map to an opcode show up as that opcode,
//! and bytes with no assigned opcode are dropped. The bytecode pattern
//! weights are tuned against exactly this output.

use std::collections::HashSet;

use crate::models::errors::DecodeError;

/// Ordered opcode mnemonics decoded from one bytecode blob
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpcodeSequence {
    opcodes: Vec<&'static str>,
}

impl OpcodeSequence {
    pub fn len(&self) -> usize {
        self.opcodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.opcodes.is_empty()
    }

    pub fn as_slice(&self) -> &[&'static str] {
        &self.opcodes
    }

    /// Distinct mnemonics present
    pub fn distinct(&self) -> HashSet<&'static str> {
        self.opcodes.iter().copied().collect()
    }

    /// Number of distinct mnemonics
    pub fn diversity(&self) -> usize {
        self.distinct().len()
    }

    /// Occurrences of any of `mnemonics`
    pub fn count_any(&self, mnemonics: &[&str]) -> usize {
        self.opcodes
            .iter()
            .filter(|op| mnemonics.contains(*op))
            .count()
    }

    /// Share of the sequence made up of `mnemonics`; 0 for an empty sequence
    pub fn ratio_of(&self, mnemonics: &[&str]) -> f64 {
        if self.opcodes.is_empty() {
            return 0.0;
        }
        self.count_any(mnemonics) as f64 / self.opcodes.len() as f64
    }
}

/// Decode `0x`-optional hex bytecode into opcodes.
///
/// Fails only on odd-length or non-hex input; any well-formed hex decodes.
pub fn decode(bytecode: &str) -> Result<OpcodeSequence, DecodeError> {
    let digits = bytecode
        .strip_prefix("0x")
        .or_else(|| bytecode.strip_prefix("0X"))
        .unwrap_or(bytecode);

    let bytes = hex::decode(digits).map_err(|e| match e {
        hex::FromHexError::InvalidHexCharacter { c, index } => DecodeError::InvalidHex {
            offset: index,
            found: c,
        },
        hex::FromHexError::OddLength | hex::FromHexError::InvalidStringLength => {
            DecodeError::OddLength {
                digits: digits.len(),
            }
        }
    })?;

    let opcodes = bytes.into_iter().filter_map(mnemonic).collect();
    Ok(OpcodeSequence { opcodes })
}

/// Mnemonic for an opcode byte, `None` for unassigned bytes
pub fn mnemonic(byte: u8) -> Option<&'static str> {
    let name = match byte {
        // Stop and arithmetic
        0x00 => "STOP",
        0x01 => "ADD",
        0x02 => "MUL",
        0x03 => "SUB",
        0x04 => "DIV",
        0x05 => "SDIV",
        0x06 => "MOD",
        0x07 => "SMOD",
        0x08 => "ADDMOD",
        0x09 => "MULMOD",
        0x0a => "EXP",
        0x0b => "SIGNEXTEND",
        // Comparison and bitwise
        0x10 => "LT",
        0x11 => "GT",
        0x12 => "SLT",
        0x13 => "SGT",
        0x14 => "EQ",
        0x15 => "ISZERO",
        0x16 => "AND",
        0x17 => "OR",
        0x18 => "XOR",
        0x19 => "NOT",
        0x1a => "BYTE",
        0x1b => "SHL",
        0x1c => "SHR",
        0x1d => "SAR",
        0x20 => "SHA3",
        // Environment
        0x30 => "ADDRESS",
        0x31 => "BALANCE",
        0x32 => "ORIGIN",
        0x33 => "CALLER",
        0x34 => "CALLVALUE",
        0x35 => "CALLDATALOAD",
        0x36 => "CALLDATASIZE",
        0x37 => "CALLDATACOPY",
        0x38 => "CODESIZE",
        0x39 => "CODECOPY",
        0x3a => "GASPRICE",
        0x3b => "EXTCODESIZE",
        0x3c => "EXTCODECOPY",
        0x3d => "RETURNDATASIZE",
        0x3e => "RETURNDATACOPY",
        0x3f => "EXTCODEHASH",
        // Block
        0x40 => "BLOCKHASH",
        0x41 => "COINBASE",
        0x42 => "TIMESTAMP",
        0x43 => "NUMBER",
        0x44 => "PREVRANDAO",
        0x45 => "GASLIMIT",
        0x46 => "CHAINID",
        0x47 => "SELFBALANCE",
        0x48 => "BASEFEE",
        0x49 => "BLOBHASH",
        0x4a => "BLOBBASEFEE",
        // Stack, memory, storage, flow
        0x50 => "POP",
        0x51 => "MLOAD",
        0x52 => "MSTORE",
        0x53 => "MSTORE8",
        0x54 => "SLOAD",
        0x55 => "SSTORE",
        0x56 => "JUMP",
        0x57 => "JUMPI",
        0x58 => "PC",
        0x59 => "MSIZE",
        0x5a => "GAS",
        0x5b => "JUMPDEST",
        0x5c => "TLOAD",
        0x5d => "TSTORE",
        0x5e => "MCOPY",
        0x5f => "PUSH0",
        0x60..=0x7f => PUSH_MNEMONICS[(byte - 0x60) as usize],
        0x80..=0x8f => DUP_MNEMONICS[(byte - 0x80) as usize],
        0x90..=0x9f => SWAP_MNEMONICS[(byte - 0x90) as usize],
        0xa0 => "LOG0",
        0xa1 => "LOG1",
        0xa2 => "LOG2",
        0xa3 => "LOG3",
        0xa4 => "LOG4",
        // System
        0xf0 => "CREATE",
        0xf1 => "CALL",
        0xf2 => "CALLCODE",
        0xf3 => "RETURN",
        0xf4 => "DELEGATECALL",
        0xf5 => "CREATE2",
        0xfa => "STATICCALL",
        0xfd => "REVERT",
        0xfe => "INVALID",
        0xff => "SELFDESTRUCT",
        _ => return None,
    };
    Some(name)
}

const PUSH_MNEMONICS: [&str; 32] = [
    "PUSH1", "PUSH2", "PUSH3", "PUSH4", "PUSH5", "PUSH6", "PUSH7", "PUSH8", "PUSH9", "PUSH10",
    "PUSH11", "PUSH12", "PUSH13", "PUSH14", "PUSH15", "PUSH16", "PUSH17", "PUSH18", "PUSH19",
    "PUSH20", "PUSH21", "PUSH22", "PUSH23", "PUSH24", "PUSH25", "PUSH26", "PUSH27", "PUSH28",
    "PUSH29", "PUSH30", "PUSH31", "PUSH32",
];

const DUP_MNEMONICS: [&str; 16] = [
    "DUP1", "DUP2", "DUP3", "DUP4", "DUP5", "DUP6", "DUP7", "DUP8", "DUP9", "DUP10", "DUP11",
    "DUP12", "DUP13", "DUP14", "DUP15", "DUP16",
];

const SWAP_MNEMONICS: [&str; 16] = [
    "SWAP1", "SWAP2", "SWAP3", "SWAP4", "SWAP5", "SWAP6", "SWAP7", "SWAP8", "SWAP9", "SWAP10",
    "SWAP11", "SWAP12", "SWAP13", "SWAP14", "SWAP15", "SWAP16",
];
