//! Self-describing binary chunk format: a codec for the packed encoding, an
//! editable in-memory tree, and a planner that keeps a packed buffer
//! consistent when chunks are inserted into it.

pub mod browser;
pub mod codec;
pub mod error;
pub mod helpers;
pub mod resize;
pub mod storage;
pub mod test_support;
pub mod tree;

pub use codec::{ChunkType, DecodedChunk};
pub use error::{ChunkError, Result};
pub use tree::{ChunkNode, ChunkTree};
