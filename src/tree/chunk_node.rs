use std::borrow::Cow;

use crate::codec::chunk::{SET_HEADER_SIZE, encode_header, nr_length_bytes_for};
use crate::codec::chunk_type::ChunkType;
use crate::error::{ChunkError, Result};
use crate::helpers::node_flags::NodeFlags;

/// Payload of a node: raw bytes for scalars, owned children for sets.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeBody<'a> {
    /// Borrowed while realised, owned once copied or edited.
    Leaf(Cow<'a, [u8]>),
    Set(Vec<ChunkNode<'a>>),
}

/// One materialised chunk.
///
/// A node borrows from the source buffer for as long as its leaf data is a
/// realised view; every other part of the tree is owned.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkNode<'a> {
    chunk_type: ChunkType,
    flags: NodeFlags,
    source_offset: Option<u64>,
    body: NodeBody<'a>,
}

impl<'a> ChunkNode<'a> {
    /// Fresh untyped placeholder, as produced by `insert_child`.
    pub fn placeholder() -> Self {
        Self {
            chunk_type: ChunkType::Undef,
            flags: NodeFlags::empty(),
            source_offset: None,
            body: NodeBody::Leaf(Cow::Owned(Vec::new())),
        }
    }

    pub(crate) fn from_source(chunk_type: ChunkType, source_offset: u64, body: NodeBody<'a>) -> Self {
        let flags = match &body {
            NodeBody::Leaf(Cow::Borrowed(_)) => NodeFlags::REALISED,
            _ => NodeFlags::empty(),
        };

        Self {
            chunk_type,
            flags,
            source_offset: Some(source_offset),
            body,
        }
    }

    pub fn chunk_type(&self) -> ChunkType {
        self.chunk_type
    }

    pub fn flags(&self) -> NodeFlags {
        self.flags
    }

    pub fn is_realised(&self) -> bool {
        self.flags.contains(NodeFlags::REALISED)
    }

    pub fn is_focused(&self) -> bool {
        self.flags.contains(NodeFlags::FOCUS)
    }

    pub fn set_focus(&mut self, focus: bool) {
        self.flags.set(NodeFlags::FOCUS, focus);
    }

    /// Header offset in the buffer the node was built from. `None` for
    /// nodes inserted after the build.
    pub fn source_offset(&self) -> Option<u64> {
        self.source_offset
    }

    pub fn body(&self) -> &NodeBody<'a> {
        &self.body
    }

    /// Leaf payload; `None` for sets.
    pub fn data(&self) -> Option<&[u8]> {
        match &self.body {
            NodeBody::Leaf(data) => Some(data),
            NodeBody::Set(_) => None,
        }
    }

    /// Children of a set; empty for leaves.
    pub fn children(&self) -> &[ChunkNode<'a>] {
        match &self.body {
            NodeBody::Set(children) => children,
            NodeBody::Leaf(_) => &[],
        }
    }

    pub fn children_mut(&mut self) -> &mut [ChunkNode<'a>] {
        match &mut self.body {
            NodeBody::Set(children) => children,
            NodeBody::Leaf(_) => &mut [],
        }
    }

    pub fn child(&self, index: u64) -> Result<&ChunkNode<'a>> {
        let len = self.nr_children();
        usize::try_from(index)
            .ok()
            .and_then(|i| self.children().get(i))
            .ok_or(ChunkError::IndexOutOfRange { index, len })
    }

    pub fn child_mut(&mut self, index: u64) -> Result<&mut ChunkNode<'a>> {
        let len = self.nr_children();
        usize::try_from(index)
            .ok()
            .and_then(|i| self.children_mut().get_mut(i))
            .ok_or(ChunkError::IndexOutOfRange { index, len })
    }

    /// Payload byte count. For sets this is the serialised size of the
    /// children, so it follows in-memory edits.
    pub fn data_length(&self) -> u64 {
        match &self.body {
            NodeBody::Leaf(data) => data.len() as u64,
            NodeBody::Set(children) => children.iter().map(ChunkNode::computed_size).sum(),
        }
    }

    /// Element count: children for sets, code points for UTF-8, values for
    /// numeric scalars. Undef and ref leaves have no elements.
    pub fn nr_children(&self) -> u64 {
        match &self.body {
            NodeBody::Set(children) => children.len() as u64,
            NodeBody::Leaf(data) => match self.chunk_type {
                // leaf data is validated on entry, so counting lead bytes is exact
                ChunkType::Utf8 => data.iter().filter(|b| (**b & 0xc0) != 0x80).count() as u64,
                ty => ty.bytes_per_type().map_or(0, |width| data.len() as u64 / width),
            },
        }
    }

    /// Inserts an Undef placeholder so that it ends up at `location`.
    ///
    /// Only the in-memory tree changes; no backing buffer is touched. Callers
    /// go through [`ChunkTree::insert_child`](crate::tree::ChunkTree::insert_child),
    /// which enforces the nesting limit.
    pub(crate) fn insert_child(&mut self, location: u64) -> Result<&mut ChunkNode<'a>> {
        let len = self.nr_children();
        let NodeBody::Set(children) = &mut self.body else {
            return Err(ChunkError::NotASet { depth: 0 });
        };

        if location > len {
            return Err(ChunkError::IndexOutOfRange { index: location, len });
        }

        let at = location as usize;
        children.insert(at, ChunkNode::placeholder());
        Ok(&mut children[at])
    }

    /// Types a placeholder. Anything already typed is refused so committed
    /// data is never reinterpreted.
    pub fn set_type(&mut self, chunk_type: ChunkType) -> Result<()> {
        if self.chunk_type != ChunkType::Undef {
            return Err(ChunkError::AlreadyTyped {
                current: self.chunk_type,
            });
        }

        self.chunk_type = chunk_type;
        self.flags.remove(NodeFlags::REALISED);
        self.body = if chunk_type.is_set() {
            NodeBody::Set(Vec::new())
        } else {
            NodeBody::Leaf(Cow::Owned(Vec::new()))
        };
        Ok(())
    }

    /// Replaces a leaf payload with an owned copy of `data`.
    pub fn set_data(&mut self, data: Vec<u8>) -> Result<()> {
        if self.chunk_type.is_set() {
            return Err(ChunkError::NotASet { depth: 0 });
        }

        if let Some(width) = self.chunk_type.bytes_per_type() {
            if data.len() as u64 % width != 0 {
                return Err(ChunkError::MisalignedData {
                    chunk_type: self.chunk_type,
                    len: data.len() as u64,
                });
            }
        }

        if self.chunk_type == ChunkType::Utf8 && std::str::from_utf8(&data).is_err() {
            return Err(ChunkError::InvalidUtf8 {
                offset: self.source_offset.unwrap_or(0),
            });
        }

        self.body = NodeBody::Leaf(Cow::Owned(data));
        self.flags.remove(NodeFlags::REALISED);
        Ok(())
    }

    /// Bytes this node takes when serialised: sets with their reserved
    /// 8-byte length field, leaves with the minimal one.
    pub fn computed_size(&self) -> u64 {
        match &self.body {
            NodeBody::Set(children) => {
                SET_HEADER_SIZE + children.iter().map(ChunkNode::computed_size).sum::<u64>()
            }
            NodeBody::Leaf(data) => {
                let len = data.len() as u64;
                1 + nr_length_bytes_for(len) as u64 + len
            }
        }
    }

    /// Appends the canonical encoding of this node to `out`.
    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&encode_header(self.chunk_type, self.data_length()));
        match &self.body {
            NodeBody::Leaf(data) => out.extend_from_slice(data),
            NodeBody::Set(children) => {
                for child in children {
                    child.write_to(out);
                }
            }
        }
    }

    /// Detaches the children of a set, leaving it empty.
    pub(crate) fn take_children(&mut self) -> Vec<ChunkNode<'a>> {
        match &mut self.body {
            NodeBody::Set(children) => std::mem::take(children),
            NodeBody::Leaf(_) => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(ty: ChunkType, data: &[u8]) -> ChunkNode<'static> {
        let mut node = ChunkNode::placeholder();
        node.set_type(ty).unwrap();
        node.set_data(data.to_vec()).unwrap();
        node
    }

    #[test]
    fn placeholder_is_untyped_and_empty() {
        let node = ChunkNode::placeholder();
        assert_eq!(node.chunk_type(), ChunkType::Undef);
        assert_eq!(node.data_length(), 0);
        assert_eq!(node.nr_children(), 0);
        assert_eq!(node.computed_size(), 2);
        assert!(!node.is_realised());
    }

    #[test]
    fn utf8_counts_code_points() {
        let node = leaf(ChunkType::Utf8, "h\u{e9}llo \u{1f600}".as_bytes());
        assert_eq!(node.data_length(), 11);
        assert_eq!(node.nr_children(), 7);
    }

    #[test]
    fn numeric_counts_values() {
        let node = leaf(ChunkType::UInt16, &[1, 0, 2, 0, 3, 0]);
        assert_eq!(node.nr_children(), 3);
        assert_eq!(node.computed_size(), 8);
    }

    #[test]
    fn set_type_only_once() {
        let mut node = ChunkNode::placeholder();
        node.set_type(ChunkType::Int32).unwrap();
        let err = node.set_type(ChunkType::Utf8).unwrap_err();
        assert!(matches!(err, ChunkError::AlreadyTyped { current: ChunkType::Int32 }));
    }

    #[test]
    fn set_data_checks_alignment_and_utf8() {
        let mut node = ChunkNode::placeholder();
        node.set_type(ChunkType::UInt32).unwrap();
        assert!(matches!(
            node.set_data(vec![1, 2, 3]),
            Err(ChunkError::MisalignedData { len: 3, .. })
        ));

        let mut text = ChunkNode::placeholder();
        text.set_type(ChunkType::Utf8).unwrap();
        assert!(matches!(
            text.set_data(vec![0xff, 0xfe]),
            Err(ChunkError::InvalidUtf8 { .. })
        ));

        let mut set = ChunkNode::placeholder();
        set.set_type(ChunkType::Set).unwrap();
        assert!(matches!(set.set_data(vec![1]), Err(ChunkError::NotASet { .. })));
    }

    #[test]
    fn insert_child_shifts_siblings() {
        let mut set = ChunkNode::placeholder();
        set.set_type(ChunkType::Set).unwrap();
        set.insert_child(0).unwrap().set_type(ChunkType::UInt8).unwrap();
        set.insert_child(1).unwrap().set_type(ChunkType::Int8).unwrap();
        set.insert_child(1).unwrap();

        let types: Vec<ChunkType> = set.children().iter().map(|c| c.chunk_type()).collect();
        assert_eq!(types, vec![ChunkType::UInt8, ChunkType::Undef, ChunkType::Int8]);

        assert!(matches!(
            set.insert_child(5),
            Err(ChunkError::IndexOutOfRange { index: 5, len: 3 })
        ));
    }

    #[test]
    fn insert_into_leaf_is_rejected() {
        let mut node = leaf(ChunkType::UInt8, &[1]);
        assert!(matches!(node.insert_child(0), Err(ChunkError::NotASet { .. })));
    }

    #[test]
    fn serialises_canonically() {
        let mut set = ChunkNode::placeholder();
        set.set_type(ChunkType::Set).unwrap();
        set.insert_child(0).unwrap().set_type(ChunkType::UInt8).unwrap();
        set.child_mut(0).unwrap().set_data(vec![9]).unwrap();

        let mut out = Vec::new();
        set.write_to(&mut out);
        assert_eq!(out, vec![0x8d, 0x03, 0, 0, 0, 0, 0, 0, 0, 0x11, 0x01, 0x09]);
        assert_eq!(set.computed_size(), out.len() as u64);
    }
}
