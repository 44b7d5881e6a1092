pub mod file;

pub use file::{ChunkFile, save, save_bytes};
