use thiserror::Error;

use crate::codec::chunk_type::ChunkType;

pub type Result<T> = std::result::Result<T, ChunkError>;

#[derive(Error, Debug)]
pub enum ChunkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A header or payload claims more bytes than the buffer holds.
    #[error("out of bounds at offset {offset}: needed {needed} bytes, {available} available")]
    OutOfBounds {
        offset: u64,
        needed: u64,
        available: u64,
    },

    /// The 4-bit width field holds a value that cannot fit a 64-bit length.
    #[error("unsupported length width {width} at offset {offset}")]
    UnsupportedWidth { offset: u64, width: u8 },

    /// A length would need more than 8 length bytes, or an explicit width is too narrow.
    #[error("length {length} does not fit the available length width")]
    WidthOverflow { length: u64 },

    #[error("unknown chunk type code {code} at offset {offset}")]
    UnknownType { offset: u64, code: u8 },

    /// Children of a set do not exactly fill the set's payload.
    #[error("malformed chunk at offset {offset}: {reason}")]
    MalformedChunk { offset: u64, reason: &'static str },

    /// Sets nest deeper than the tree can hold.
    #[error("nesting depth {depth} exceeds the limit of {limit}")]
    NestingTooDeep { depth: usize, limit: usize },

    #[error("invalid UTF-8 payload at offset {offset}")]
    InvalidUtf8 { offset: u64 },

    /// Navigation or insertion went through something that is not a set.
    #[error("node at depth {depth} is not a set")]
    NotASet { depth: usize },

    #[error("index {index} out of range for {len} children")]
    IndexOutOfRange { index: u64, len: u64 },

    #[error("node is already typed as {current}")]
    AlreadyTyped { current: ChunkType },

    #[error("{len} bytes is not a whole number of {chunk_type} values")]
    MisalignedData { chunk_type: ChunkType, len: u64 },

    #[error("path {path:?} could not be resolved")]
    PathNotFound {
        path: Vec<u64>,
        #[source]
        source: Box<ChunkError>,
    },
}
