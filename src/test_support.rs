//! Fixtures shared by the unit and integration tests.

use crate::codec::chunk::encode_header;
use crate::codec::chunk_type::ChunkType;

/// Set holding two one-byte uint32 chunks.
pub const FLAT: [u8; 15] = [
    0x8d, 0x06, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, //
    0x15, 0x01, 0x09, //
    0x15, 0x01, 0x0a,
];

/// Root set of four items: uint32, a set of three (uint32, uint8, int8),
/// uint16 and int8. Every value is one byte long.
pub const NESTED: [u8; 36] = [
    0x8d, 0x1b, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, //
    0x15, 0x01, 0x09, //
    0x8d, 0x09, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, //
    0x15, 0x01, 0x09, //
    0x11, 0x01, 0x08, //
    0x12, 0x01, 0x07, //
    0x13, 0x01, 0x08, //
    0x12, 0x01, 0x07,
];

/// Encodes a leaf chunk with a minimal header.
pub fn leaf(chunk_type: ChunkType, payload: &[u8]) -> Vec<u8> {
    let mut out = encode_header(chunk_type, payload.len() as u64);
    out.extend_from_slice(payload);
    out
}

/// Encodes a set around already encoded children.
pub fn set(children: &[Vec<u8>]) -> Vec<u8> {
    let payload: Vec<u8> = children.concat();
    let mut out = encode_header(ChunkType::Set, payload.len() as u64);
    out.extend(payload);
    out
}

/// A chain of `levels` sets, each the only child of the one above; the
/// innermost set is empty.
pub fn nested_sets(levels: usize) -> Vec<u8> {
    let header = encode_header(ChunkType::Set, 0).len();
    let mut out = Vec::with_capacity(levels * header);
    for level in 0..levels {
        let below = (levels - 1 - level) * header;
        out.extend(encode_header(ChunkType::Set, below as u64));
    }
    out
}
