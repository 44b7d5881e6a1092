pub mod chunk;
pub mod chunk_type;
pub mod set;

pub use chunk::{
    DecodedChunk, decode, encode_header, encode_header_with_width, nr_length_bytes_for, total_length,
    write_header,
};
pub use chunk_type::ChunkType;
