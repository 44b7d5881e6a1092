use tracing::trace;

use crate::codec::chunk_type::ChunkType;
use crate::error::{ChunkError, Result};

/// Widest length field that still fits a `u64`.
pub const MAX_LENGTH_BYTES: u8 = 8;

/// Sets always reserve the widest length field so that growing them
/// never moves their own header.
pub const SET_LENGTH_BYTES: u8 = 8;

/// Bytes a set header occupies on the wire (header byte + reserved length).
pub const SET_HEADER_SIZE: u64 = 1 + SET_LENGTH_BYTES as u64;

/// A header decoded at some offset of a buffer.
///
/// This is a view: it does not borrow the buffer, it only records where the
/// chunk lives. Set payloads are not decoded; see [`crate::codec::set`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedChunk {
    pub offset: u64,
    pub chunk_type: ChunkType,
    pub nr_length_bytes: u8,
    pub data_length: u64,
}

impl DecodedChunk {
    /// Offset of the first payload byte.
    pub fn data_offset(&self) -> u64 {
        self.offset + 1 + self.nr_length_bytes as u64
    }

    pub fn header_length(&self) -> u64 {
        1 + self.nr_length_bytes as u64
    }

    pub fn total_length(&self) -> u64 {
        total_length(self.nr_length_bytes, self.data_length)
    }

    /// Offset one past the last payload byte.
    pub fn end_offset(&self) -> u64 {
        self.offset.saturating_add(self.total_length())
    }

    /// Borrow the payload from the buffer this chunk was decoded from.
    pub fn payload<'a>(&self, buffer: &'a [u8]) -> Result<&'a [u8]> {
        span(buffer, self.data_offset(), self.data_length)
    }
}

pub fn total_length(nr_length_bytes: u8, data_length: u64) -> u64 {
    (1 + nr_length_bytes as u64).saturating_add(data_length)
}

/// Bounds-checked sub-slice `buffer[offset..offset + len]`.
pub fn span(buffer: &[u8], offset: u64, len: u64) -> Result<&[u8]> {
    let out_of_bounds = || ChunkError::OutOfBounds {
        offset,
        needed: len,
        available: (buffer.len() as u64).saturating_sub(offset),
    };

    let end = offset.checked_add(len).ok_or_else(out_of_bounds)?;
    if end > buffer.len() as u64 {
        return Err(out_of_bounds());
    }

    // both bounds are <= buffer.len(), so they fit in usize
    Ok(&buffer[offset as usize..end as usize])
}

/// Decodes the chunk header found at `offset`.
///
/// Byte 0 carries the type in its low nibble and the number of length bytes
/// in its high nibble. The length bytes follow little-endian.
///
/// # Errors
/// - [`ChunkError::UnsupportedWidth`] if the width nibble is above 8.
/// - [`ChunkError::OutOfBounds`] if the header runs past the end of `buffer`.
/// - [`ChunkError::UnknownType`] for type codes 14 and 15.
pub fn decode(buffer: &[u8], offset: u64) -> Result<DecodedChunk> {
    let head = span(buffer, offset, 1)?[0];

    let nr_length_bytes = head >> 4;
    if nr_length_bytes > MAX_LENGTH_BYTES {
        return Err(ChunkError::UnsupportedWidth {
            offset,
            width: nr_length_bytes,
        });
    }

    let chunk_type = ChunkType::from_code(head & 0x0f, offset)?;

    let length_bytes = span(buffer, offset, 1 + nr_length_bytes as u64)?;
    let data_length = length_bytes[1..]
        .iter()
        .enumerate()
        .fold(0u64, |acc, (i, b)| acc | (*b as u64) << (8 * i));

    let chunk = DecodedChunk {
        offset,
        chunk_type,
        nr_length_bytes,
        data_length,
    };
    trace!(offset, ?chunk_type, nr_length_bytes, data_length, "decoded chunk header");
    Ok(chunk)
}

/// Minimal number of length bytes able to hold `length`.
///
/// Zero still takes one byte.
pub fn nr_length_bytes_for(length: u64) -> u8 {
    if length == 0 {
        return 1;
    }
    let highest_bit = 63 - length.leading_zeros();
    (highest_bit / 8 + 1) as u8
}

/// Encodes a header for a chunk of `chunk_type` carrying `data_length` bytes.
///
/// Sets always get [`SET_LENGTH_BYTES`] length bytes; everything else gets
/// the minimal width.
pub fn encode_header(chunk_type: ChunkType, data_length: u64) -> Vec<u8> {
    let width = if chunk_type.is_set() {
        SET_LENGTH_BYTES
    } else {
        nr_length_bytes_for(data_length)
    };

    let mut buf = Vec::with_capacity(1 + width as usize);
    push_header(&mut buf, chunk_type, data_length, width);
    buf
}

/// Encodes a header with an explicit length width.
///
/// Fails with [`ChunkError::WidthOverflow`] if `width` is above 8 or too
/// narrow for `data_length`.
pub fn encode_header_with_width(chunk_type: ChunkType, data_length: u64, width: u8) -> Result<Vec<u8>> {
    if width > MAX_LENGTH_BYTES || width < nr_length_bytes_for(data_length) {
        return Err(ChunkError::WidthOverflow {
            length: data_length,
        });
    }

    let mut buf = Vec::with_capacity(1 + width as usize);
    push_header(&mut buf, chunk_type, data_length, width);
    Ok(buf)
}

fn push_header(buf: &mut Vec<u8>, chunk_type: ChunkType, data_length: u64, width: u8) {
    buf.push((width << 4) | chunk_type.code());
    buf.extend_from_slice(&data_length.to_le_bytes()[..width as usize]);
}

/// Writes a header into `dest` at `offset` and returns the offset where the
/// payload starts.
pub fn write_header(dest: &mut [u8], offset: u64, chunk_type: ChunkType, data_length: u64) -> Result<u64> {
    let header = encode_header(chunk_type, data_length);
    let len = header.len() as u64;

    // reuse the read-side bounds check before touching the buffer
    span(dest, offset, len)?;
    let start = offset as usize;
    dest[start..start + header.len()].copy_from_slice(&header);

    Ok(offset + len)
}
