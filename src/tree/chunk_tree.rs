use std::borrow::Cow;

use tracing::{debug, trace};

use crate::codec::chunk::{self, DecodedChunk, SET_HEADER_SIZE};
use crate::codec::chunk_type::ChunkType;
use crate::codec::set;
use crate::error::{ChunkError, Result};
use crate::tree::chunk_node::{ChunkNode, NodeBody};

/// Deepest nesting a tree accepts; the root is depth 0.
///
/// Building, sizing and serialising recurse once per level, so deeper
/// input is refused with [`ChunkError::NestingTooDeep`] instead.
pub const MAX_DEPTH: usize = 256;

/// Owned tree of chunk nodes materialised from a packed buffer.
///
/// `'a` is the lifetime of the source buffer. Trees built with
/// [`ChunkTree::build`] copy every payload and are `'static`; trees built with
/// [`ChunkTree::build_realised`] keep leaf payloads as views into the source.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkTree<'a> {
    root: ChunkNode<'a>,
}

impl ChunkTree<'static> {
    /// Materialises `buffer` into a tree that owns copies of every payload.
    ///
    /// # Errors
    /// - [`ChunkError::OutOfBounds`] if a header or the root payload runs past
    ///   the end of `buffer`.
    /// - [`ChunkError::MalformedChunk`] if a set's children do not exactly
    ///   fill its payload.
    /// - [`ChunkError::InvalidUtf8`] for UTF-8 leaves that do not decode.
    /// - [`ChunkError::NestingTooDeep`] for sets nested past [`MAX_DEPTH`].
    pub fn build(buffer: &[u8]) -> Result<Self> {
        let root = build_root(buffer, &|payload| Cow::Owned(payload.to_vec()))?;
        let tree = Self { root };
        debug!(bytes = buffer.len(), size = tree.computed_size(), "built chunk tree");
        Ok(tree)
    }
}

impl<'a> ChunkTree<'a> {
    /// Like [`ChunkTree::build`], but leaves borrow their payload from
    /// `buffer` and are flagged realised.
    pub fn build_realised(buffer: &'a [u8]) -> Result<Self> {
        let root = build_root(buffer, &|payload| Cow::Borrowed(payload))?;
        let tree = Self { root };
        debug!(bytes = buffer.len(), size = tree.computed_size(), "built realised chunk tree");
        Ok(tree)
    }

    pub fn from_root(root: ChunkNode<'a>) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &ChunkNode<'a> {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut ChunkNode<'a> {
        &mut self.root
    }

    /// Walks `path` down from the root. The empty path selects the root.
    pub fn select(&self, path: &[u64]) -> Result<&ChunkNode<'a>> {
        let mut node = &self.root;
        for (depth, index) in path.iter().enumerate() {
            if !node.chunk_type().is_set() {
                return Err(ChunkError::NotASet { depth });
            }
            node = node.child(*index)?;
        }
        Ok(node)
    }

    pub fn select_mut(&mut self, path: &[u64]) -> Result<&mut ChunkNode<'a>> {
        let mut node = &mut self.root;
        for (depth, index) in path.iter().enumerate() {
            if !node.chunk_type().is_set() {
                return Err(ChunkError::NotASet { depth });
            }
            node = node.child_mut(*index)?;
        }
        Ok(node)
    }

    /// Inserts an Undef placeholder into the set at `parent_path` so that it
    /// ends up at index `location`. Only the tree changes.
    pub fn insert_child(&mut self, parent_path: &[u64], location: u64) -> Result<&mut ChunkNode<'a>> {
        let parent = self.select_mut(parent_path)?;
        if !parent.chunk_type().is_set() {
            return Err(ChunkError::NotASet {
                depth: parent_path.len(),
            });
        }

        let depth = parent_path.len() + 1;
        if depth > MAX_DEPTH {
            return Err(ChunkError::NestingTooDeep { depth, limit: MAX_DEPTH });
        }

        debug!(?parent_path, location, "inserting placeholder");
        parent.insert_child(location)
    }

    pub fn set_type(&mut self, path: &[u64], chunk_type: ChunkType) -> Result<()> {
        self.select_mut(path)?.set_type(chunk_type)
    }

    pub fn computed_size(&self) -> u64 {
        self.root.computed_size()
    }

    /// Offset `path` would have in the canonical serialisation of this tree.
    pub fn layout_offset(&self, path: &[u64]) -> Result<u64> {
        let mut node = &self.root;
        let mut offset = 0;

        for (depth, index) in path.iter().enumerate() {
            if !node.chunk_type().is_set() {
                return Err(ChunkError::NotASet { depth });
            }
            let target = node.child(*index)?;

            offset += SET_HEADER_SIZE;
            offset += node
                .children()
                .iter()
                .take(*index as usize)
                .map(ChunkNode::computed_size)
                .sum::<u64>();
            node = target;
        }

        Ok(offset)
    }

    /// Canonical serialisation: sets with 8 length bytes, leaves minimal.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.computed_size() as usize);
        self.root.write_to(&mut out);
        out
    }

    /// Tears the tree down depth-first and returns how many nodes were
    /// released. Uses an explicit stack so deep trees cannot overflow.
    pub fn destroy(self) -> u64 {
        let mut released = 0;
        let mut stack = vec![self.root];

        while let Some(mut node) = stack.pop() {
            stack.extend(node.take_children());
            released += 1;
            // leaf buffers and the emptied children array go with `node`
        }

        debug!(released, "destroyed chunk tree");
        released
    }
}

fn build_root<'b, 'a, F>(buffer: &'b [u8], make_leaf: &F) -> Result<ChunkNode<'a>>
where
    F: Fn(&'b [u8]) -> Cow<'a, [u8]>,
{
    let root = chunk::decode(buffer, 0)?;
    root.payload(buffer)?;
    build_node(buffer, root, 0, make_leaf)
}

fn build_node<'b, 'a, F>(buffer: &'b [u8], chunk: DecodedChunk, depth: usize, make_leaf: &F) -> Result<ChunkNode<'a>>
where
    F: Fn(&'b [u8]) -> Cow<'a, [u8]>,
{
    trace!(offset = chunk.offset, chunk_type = %chunk.chunk_type, depth, "building node");

    if depth > MAX_DEPTH {
        return Err(ChunkError::NestingTooDeep { depth, limit: MAX_DEPTH });
    }

    let body = if chunk.chunk_type.is_set() {
        // count first so the children array is allocated once
        let decoded = set::children(buffer, &chunk)?.collect::<Result<Vec<_>>>()?;

        let mut children = Vec::with_capacity(decoded.len());
        for child in decoded {
            children.push(build_node(buffer, child, depth + 1, make_leaf)?);
        }
        NodeBody::Set(children)
    } else {
        let payload = chunk.payload(buffer)?;
        if chunk.chunk_type == ChunkType::Utf8 && std::str::from_utf8(payload).is_err() {
            return Err(ChunkError::InvalidUtf8 {
                offset: chunk.data_offset(),
            });
        }
        NodeBody::Leaf(make_leaf(payload))
    };

    Ok(ChunkNode::from_source(chunk.chunk_type, chunk.offset, body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{NESTED, nested_sets};

    #[test]
    fn build_counts_children() {
        let tree = ChunkTree::build(&NESTED).unwrap();
        assert_eq!(tree.root().chunk_type(), ChunkType::Set);
        assert_eq!(tree.root().nr_children(), 4);
        assert_eq!(tree.root().data_length(), 27);
        assert!(!tree.root().children()[0].is_realised());
    }

    #[test]
    fn realised_leaves_borrow_source() {
        let tree = ChunkTree::build_realised(&NESTED).unwrap();
        let leaf = tree.select(&[1, 1]).unwrap();
        assert!(leaf.is_realised());
        assert_eq!(leaf.data(), Some(&NESTED[26..27]));
        assert!(!tree.root().is_realised());
    }

    #[test]
    fn select_and_offsets() {
        let tree = ChunkTree::build(&NESTED).unwrap();

        let sub = tree.select(&[1]).unwrap();
        assert_eq!(sub.chunk_type(), ChunkType::Set);
        assert_eq!(sub.nr_children(), 3);

        let leaf = tree.select(&[1, 1]).unwrap();
        assert_eq!(leaf.chunk_type(), ChunkType::UInt8);
        assert_eq!(leaf.source_offset(), Some(24));
        assert_eq!(tree.layout_offset(&[1, 1]).unwrap(), 24);

        assert!(matches!(tree.select(&[2, 2]), Err(ChunkError::NotASet { depth: 1 })));
        assert!(matches!(
            tree.select(&[4]),
            Err(ChunkError::IndexOutOfRange { index: 4, len: 4 })
        ));
    }

    #[test]
    fn computed_size_matches_source() {
        let tree = ChunkTree::build(&NESTED).unwrap();
        assert_eq!(tree.computed_size(), NESTED.len() as u64);
        assert_eq!(tree.to_bytes(), NESTED.to_vec());
    }

    #[test]
    fn insert_keeps_siblings_intact() {
        let mut tree = ChunkTree::build(&NESTED).unwrap();
        let before = tree.select(&[2]).unwrap().clone();

        let node = tree.insert_child(&[], 2).unwrap();
        assert_eq!(node.chunk_type(), ChunkType::Undef);
        assert_eq!(node.source_offset(), None);

        assert_eq!(tree.root().nr_children(), 5);
        assert_eq!(tree.select(&[3]).unwrap(), &before);
        assert_eq!(tree.computed_size(), NESTED.len() as u64 + 2);
    }

    #[test]
    fn insert_through_scalar_is_rejected() {
        let mut tree = ChunkTree::build(&NESTED).unwrap();
        assert!(matches!(tree.insert_child(&[0], 0), Err(ChunkError::NotASet { depth: 1 })));
        assert!(matches!(
            tree.insert_child(&[1], 4),
            Err(ChunkError::IndexOutOfRange { index: 4, len: 3 })
        ));
    }

    #[test]
    fn destroy_releases_every_node() {
        let tree = ChunkTree::build(&NESTED).unwrap();
        assert_eq!(tree.destroy(), 8);
    }

    #[test]
    fn nesting_limit() {
        let at_limit = ChunkTree::build(&nested_sets(MAX_DEPTH + 1)).unwrap();
        assert_eq!(at_limit.destroy(), MAX_DEPTH as u64 + 1);

        assert!(matches!(
            ChunkTree::build(&nested_sets(MAX_DEPTH + 2)),
            Err(ChunkError::NestingTooDeep { depth, limit: MAX_DEPTH }) if depth == MAX_DEPTH + 1
        ));
    }

    #[test]
    fn insert_below_limit_is_refused() {
        let mut tree = ChunkTree::build(&nested_sets(MAX_DEPTH + 1)).unwrap();
        let deepest = vec![0; MAX_DEPTH];
        assert!(matches!(
            tree.insert_child(&deepest, 0),
            Err(ChunkError::NestingTooDeep { .. })
        ));
        tree.insert_child(&deepest[..MAX_DEPTH - 1], 1).unwrap();
    }

    #[test]
    fn truncated_buffer_is_out_of_bounds() {
        assert!(matches!(
            ChunkTree::build(&NESTED[..20]),
            Err(ChunkError::OutOfBounds { .. })
        ));
        assert!(matches!(ChunkTree::build(&[]), Err(ChunkError::OutOfBounds { .. })));
    }

    #[test]
    fn bad_utf8_is_rejected() {
        let buf = [0x1b, 0x02, 0xc3, 0x28];
        assert!(matches!(
            ChunkTree::build(&buf),
            Err(ChunkError::InvalidUtf8 { offset: 2 })
        ));
    }
}
