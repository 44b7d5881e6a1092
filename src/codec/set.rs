//! Zero-copy navigation over packed sets.
//!
//! Nothing here allocates per child: children are decoded one header at a
//! time by walking a set's payload, each child's total length giving the
//! offset of the next one.

use crate::codec::chunk::{self, DecodedChunk};
use crate::error::{ChunkError, Result};

/// Iterator over the immediate children of a decoded set.
///
/// Stops after the first error.
pub struct SetChildren<'a> {
    // truncated at the parent's end so a child can never read past it
    bounded: &'a [u8],
    cursor: u64,
    end: u64,
    failed: bool,
}

impl<'a> Iterator for SetChildren<'a> {
    type Item = Result<DecodedChunk>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.cursor >= self.end {
            return None;
        }

        let child = match chunk::decode(self.bounded, self.cursor) {
            Ok(child) => child,
            Err(ChunkError::OutOfBounds { offset, .. }) => {
                self.failed = true;
                return Some(Err(ChunkError::MalformedChunk {
                    offset,
                    reason: "child header overruns parent set",
                }));
            }
            Err(e) => {
                self.failed = true;
                return Some(Err(e));
            }
        };

        if child.end_offset() > self.end {
            self.failed = true;
            return Some(Err(ChunkError::MalformedChunk {
                offset: child.offset,
                reason: "child payload overruns parent set",
            }));
        }

        self.cursor = child.end_offset();
        Some(Ok(child))
    }
}

/// Iterate the children of `parent`, which must be a set whose payload lies
/// inside `buffer`.
pub fn children<'a>(buffer: &'a [u8], parent: &DecodedChunk) -> Result<SetChildren<'a>> {
    if !parent.chunk_type.is_set() {
        return Err(ChunkError::NotASet { depth: 0 });
    }

    parent.payload(buffer)?;
    let end = parent.end_offset();

    Ok(SetChildren {
        bounded: &buffer[..end as usize],
        cursor: parent.data_offset(),
        end,
        failed: false,
    })
}

pub fn set_nr_items(buffer: &[u8], set: &DecodedChunk) -> Result<u64> {
    let mut count = 0;
    for child in children(buffer, set)? {
        child?;
        count += 1;
    }
    Ok(count)
}

/// Byte offset of the `idx`-th child of `set`.
///
/// `idx == nr_items` is allowed and yields the end of the payload, which is
/// where an appended child would start.
pub fn set_item_byte_offset(buffer: &[u8], set: &DecodedChunk, idx: u64) -> Result<u64> {
    let mut count = 0;
    for child in children(buffer, set)? {
        let child = child?;
        if count == idx {
            return Ok(child.offset);
        }
        count += 1;
    }

    if idx == count {
        Ok(set.end_offset())
    } else {
        Err(ChunkError::IndexOutOfRange { index: idx, len: count })
    }
}

pub fn set_get_nth(buffer: &[u8], set: &DecodedChunk, nth: u64) -> Result<DecodedChunk> {
    let mut count = 0;
    for child in children(buffer, set)? {
        let child = child?;
        if count == nth {
            return Ok(child);
        }
        count += 1;
    }
    Err(ChunkError::IndexOutOfRange { index: nth, len: count })
}

/// Decodes every chunk on `path`, root first, target last.
pub fn resolve_path(buffer: &[u8], path: &[u64]) -> Result<Vec<DecodedChunk>> {
    let mut chain = Vec::with_capacity(path.len() + 1);
    let mut current = chunk::decode(buffer, 0)?;
    chain.push(current);

    for (depth, idx) in path.iter().enumerate() {
        current = nth_at_depth(buffer, &current, *idx, depth)?;
        chain.push(current);
    }

    Ok(chain)
}

/// Resolves the slot addressed by a non-empty `path`: the chain of sets
/// leading to it (root first) and the byte offset of the slot. The last
/// index may equal the parent's child count (append position).
pub fn resolve_slot(buffer: &[u8], path: &[u64]) -> Result<(Vec<DecodedChunk>, u64)> {
    let Some((last, parents)) = path.split_last() else {
        return Err(ChunkError::IndexOutOfRange { index: 0, len: 0 });
    };

    let chain = resolve_path(buffer, parents)?;
    let parent = chain[chain.len() - 1];
    if !parent.chunk_type.is_set() {
        return Err(ChunkError::NotASet { depth: parents.len() });
    }

    let offset = set_item_byte_offset(buffer, &parent, *last)?;
    Ok((chain, offset))
}

/// Byte offset of the chunk addressed by `path`. The empty path is the
/// root at offset 0.
pub fn byte_offset(buffer: &[u8], path: &[u64]) -> Result<u64> {
    if path.is_empty() {
        chunk::decode(buffer, 0)?;
        return Ok(0);
    }
    resolve_slot(buffer, path).map(|(_, offset)| offset)
}

fn nth_at_depth(buffer: &[u8], set: &DecodedChunk, idx: u64, depth: usize) -> Result<DecodedChunk> {
    if !set.chunk_type.is_set() {
        return Err(ChunkError::NotASet { depth });
    }
    set_get_nth(buffer, set, idx)
}

/// Visits every chunk depth-first, parents before children, and returns how
/// many were visited.
///
/// Open sets are kept on an explicit stack, so nesting depth is bounded by
/// memory only.
pub fn walk<F>(buffer: &[u8], mut visitor: F) -> Result<u64>
where
    F: FnMut(&DecodedChunk, usize),
{
    let root = chunk::decode(buffer, 0)?;
    root.payload(buffer)?;

    visitor(&root, 0);
    let mut visited = 1;

    let mut open = Vec::new();
    if root.chunk_type.is_set() {
        open.push(children(buffer, &root)?);
    }

    while let Some(siblings) = open.last_mut() {
        let Some(child) = siblings.next() else {
            open.pop();
            continue;
        };

        let child = child?;
        visitor(&child, open.len());
        visited += 1;

        if child.chunk_type.is_set() {
            open.push(children(buffer, &child)?);
        }
    }

    Ok(visited)
}
