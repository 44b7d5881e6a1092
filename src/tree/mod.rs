pub mod chunk_node;
pub mod chunk_tree;

pub use chunk_node::{ChunkNode, NodeBody};
pub use chunk_tree::{ChunkTree, MAX_DEPTH};
