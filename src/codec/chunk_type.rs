use std::fmt;

use crate::error::{ChunkError, Result};

/// Type code stored in the low nibble of a chunk header byte.
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ChunkType {
    Undef = 0x00,
    UInt8 = 0x01,
    Int8 = 0x02,
    UInt16 = 0x03,
    Int16 = 0x04,
    UInt32 = 0x05,
    Int32 = 0x06,
    UInt64 = 0x07,
    Int64 = 0x08,
    Float32 = 0x09,
    Float64 = 0x0a,
    Utf8 = 0x0b,
    Ref = 0x0c,
    Set = 0x0d,
}

impl ChunkType {
    pub const ALL: [ChunkType; 14] = [
        ChunkType::Undef,
        ChunkType::UInt8,
        ChunkType::Int8,
        ChunkType::UInt16,
        ChunkType::Int16,
        ChunkType::UInt32,
        ChunkType::Int32,
        ChunkType::UInt64,
        ChunkType::Int64,
        ChunkType::Float32,
        ChunkType::Float64,
        ChunkType::Utf8,
        ChunkType::Ref,
        ChunkType::Set,
    ];

    /// Decodes a type code. `offset` is only used for the error report.
    pub fn from_code(code: u8, offset: u64) -> Result<Self> {
        Self::ALL
            .get(code as usize)
            .copied()
            .ok_or(ChunkError::UnknownType { offset, code })
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    /// Fixed byte width of one value. Only the numeric scalars have one.
    pub fn bytes_per_type(self) -> Option<u64> {
        match self {
            ChunkType::UInt8 | ChunkType::Int8 => Some(1),
            ChunkType::UInt16 | ChunkType::Int16 => Some(2),
            ChunkType::UInt32 | ChunkType::Int32 | ChunkType::Float32 => Some(4),
            ChunkType::UInt64 | ChunkType::Int64 | ChunkType::Float64 => Some(8),
            ChunkType::Undef | ChunkType::Utf8 | ChunkType::Ref | ChunkType::Set => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ChunkType::Undef => "undef",
            ChunkType::UInt8 => "uint8",
            ChunkType::Int8 => "int8",
            ChunkType::UInt16 => "uint16",
            ChunkType::Int16 => "int16",
            ChunkType::UInt32 => "uint32",
            ChunkType::Int32 => "int32",
            ChunkType::UInt64 => "uint64",
            ChunkType::Int64 => "int64",
            ChunkType::Float32 => "float32",
            ChunkType::Float64 => "float64",
            ChunkType::Utf8 => "utf8",
            ChunkType::Ref => "ref",
            ChunkType::Set => "set",
        }
    }

    /// Single character label used by the browser.
    pub fn glyph(self) -> char {
        match self {
            ChunkType::Undef => 'X',
            ChunkType::UInt8
            | ChunkType::UInt16
            | ChunkType::UInt32
            | ChunkType::UInt64 => 'I',
            ChunkType::Int8 | ChunkType::Int16 | ChunkType::Int32 | ChunkType::Int64 => 'i',
            ChunkType::Float32 | ChunkType::Float64 => 'f',
            ChunkType::Utf8 => 's',
            ChunkType::Ref => 'R',
            ChunkType::Set => '[',
        }
    }

    pub fn is_set(self) -> bool {
        self == ChunkType::Set
    }
}

impl fmt::Display for ChunkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
