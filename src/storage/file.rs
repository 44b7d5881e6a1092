use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use tracing::{debug, info};

use crate::codec::chunk;
use crate::error::{ChunkError, Result};
use crate::tree::chunk_tree::ChunkTree;

/// A chunk file mapped read-only into memory.
pub struct ChunkFile {
    path: PathBuf,
    mmap: Mmap,
    total_length: u64,
}

impl ChunkFile {
    /// Maps `path` and checks that it holds at least the whole root chunk.
    ///
    /// Bytes after the root chunk are ignored.
    pub fn open(path: &Path) -> Result<Self> {
        let file = open_chunk_file(path)?;

        // SAFETY: the map is read-only and the file is not modified while
        // mapped by this process
        let mmap = unsafe { Mmap::map(&file)? };

        let root = chunk::decode(&mmap, 0)?;
        let total_length = root.total_length();
        if total_length > mmap.len() as u64 {
            return Err(ChunkError::OutOfBounds {
                offset: 0,
                needed: total_length,
                available: mmap.len() as u64,
            });
        }

        info!(path = %path.display(), total_length, root = %root.chunk_type, "opened chunk file");
        Ok(Self {
            path: path.to_path_buf(),
            mmap,
            total_length,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The root chunk's bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.mmap[..self.total_length as usize]
    }

    pub fn total_length(&self) -> u64 {
        self.total_length
    }

    /// Owned tree, independent of the mapping.
    pub fn build(&self) -> Result<ChunkTree<'static>> {
        ChunkTree::build(self.bytes())
    }

    /// Tree whose leaves view the mapping directly.
    pub fn build_realised(&self) -> Result<ChunkTree<'_>> {
        ChunkTree::build_realised(self.bytes())
    }
}

pub fn open_chunk_file(path: &Path) -> Result<File> {
    Ok(OpenOptions::new().read(true).open(path)?)
}

pub fn create_chunk_file(path: &Path) -> Result<File> {
    Ok(OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?)
}

/// Writes raw chunk bytes to `path`, replacing its contents.
///
/// The bytes go to a sibling file that is then renamed over `path`, so a
/// live [`ChunkFile`] mapping of the old contents stays valid.
pub fn save_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    let staging = staging_path(path);

    let mut file = create_chunk_file(&staging)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    drop(file);

    fs::rename(&staging, path)?;
    debug!(path = %path.display(), bytes = bytes.len(), "saved chunk file");
    Ok(())
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".saving");
    path.with_file_name(name)
}

/// Writes the canonical serialisation of `tree` to `path`.
pub fn save(path: &Path, tree: &ChunkTree<'_>) -> Result<()> {
    save_bytes(path, &tree.to_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::chunk_type::ChunkType;
    use crate::test_support::FLAT;
    use tempfile::tempdir;

    #[test]
    fn open_and_build() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("flat.chunk");
        save_bytes(&path, &FLAT).unwrap();

        let file = ChunkFile::open(&path).unwrap();
        assert_eq!(file.total_length(), 15);
        assert_eq!(file.bytes(), &FLAT);

        let tree = file.build().unwrap();
        assert_eq!(tree.root().nr_children(), 2);

        let realised = file.build_realised().unwrap();
        assert!(realised.select(&[0]).unwrap().is_realised());
    }

    #[test]
    fn trailing_bytes_are_ignored() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("padded.chunk");
        let mut bytes = FLAT.to_vec();
        bytes.extend_from_slice(&[0xde, 0xad]);
        save_bytes(&path, &bytes).unwrap();

        let file = ChunkFile::open(&path).unwrap();
        assert_eq!(file.bytes().len(), 15);
    }

    #[test]
    fn truncated_file_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("short.chunk");
        save_bytes(&path, &FLAT[..10]).unwrap();

        assert!(matches!(
            ChunkFile::open(&path),
            Err(ChunkError::OutOfBounds { needed: 15, available: 10, .. })
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            ChunkFile::open(&dir.path().join("nope")),
            Err(ChunkError::Io(_))
        ));
    }

    #[test]
    fn save_over_mapped_file_keeps_mapping() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("live.chunk");
        save_bytes(&path, &FLAT).unwrap();

        let file = ChunkFile::open(&path).unwrap();
        let tree = file.build_realised().unwrap();
        save_bytes(&path, &[0x8d, 0, 0, 0, 0, 0, 0, 0, 0]).unwrap();

        assert_eq!(tree.to_bytes(), FLAT.to_vec());
        assert_eq!(ChunkFile::open(&path).unwrap().total_length(), 9);
        assert!(!dir.path().join("live.chunk.saving").exists());
    }

    #[test]
    fn save_tree_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("edited.chunk");

        let mut tree = ChunkTree::build(&FLAT).unwrap();
        tree.insert_child(&[], 2).unwrap().set_type(ChunkType::Utf8).unwrap();
        tree.select_mut(&[2]).unwrap().set_data(b"hi".to_vec()).unwrap();
        save(&path, &tree).unwrap();

        let reopened = ChunkFile::open(&path).unwrap().build().unwrap();
        assert_eq!(reopened.to_bytes(), tree.to_bytes());
        assert_eq!(reopened.select(&[2]).unwrap().data(), Some(&b"hi"[..]));
    }
}
