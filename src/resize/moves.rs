use tracing::trace;

use crate::error::{ChunkError, Result};

/// One physical edit of a packed buffer.
///
/// Open a gap of `insert_width` zero bytes at `offset`, shifting everything
/// from `offset` to the end right, then, if `new_header_bytes` is not empty,
/// overwrite them at `offset`. Offsets refer to the buffer as it was before
/// any move of the same plan was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Move {
    pub offset: u64,
    pub insert_width: u64,
    pub new_header_bytes: Vec<u8>,
}

impl Move {
    /// Raw gap for inserted data.
    pub fn gap(offset: u64, insert_width: u64) -> Self {
        Self {
            offset,
            insert_width,
            new_header_bytes: Vec::new(),
        }
    }

    /// Header rewrite, growing the header by `insert_width` bytes first.
    pub fn rewrite(offset: u64, insert_width: u64, new_header_bytes: Vec<u8>) -> Self {
        Self {
            offset,
            insert_width,
            new_header_bytes,
        }
    }

    pub fn is_header_rewrite(&self) -> bool {
        !self.new_header_bytes.is_empty()
    }
}

/// Applies a plan to `buffer`, rightmost move first.
///
/// The moves are sorted here, so callers may pass them in any order; a plan
/// from [`crate::resize::planner`] already comes in application order.
pub fn apply_moves(buffer: &mut Vec<u8>, moves: &[Move]) -> Result<()> {
    let mut ordered: Vec<&Move> = moves.iter().collect();
    ordered.sort_by(|a, b| b.offset.cmp(&a.offset));

    for mv in ordered {
        let len = buffer.len() as u64;
        if mv.offset > len {
            return Err(ChunkError::OutOfBounds {
                offset: mv.offset,
                needed: 0,
                available: 0,
            });
        }

        let at = mv.offset as usize;
        if mv.insert_width > 0 {
            buffer.splice(at..at, std::iter::repeat_n(0u8, mv.insert_width as usize));
        }

        if mv.is_header_rewrite() {
            let end = at + mv.new_header_bytes.len();
            if end > buffer.len() {
                return Err(ChunkError::OutOfBounds {
                    offset: mv.offset,
                    needed: mv.new_header_bytes.len() as u64,
                    available: (buffer.len() - at) as u64,
                });
            }
            buffer[at..end].copy_from_slice(&mv.new_header_bytes);
        }

        trace!(offset = mv.offset, width = mv.insert_width, rewrite = mv.is_header_rewrite(), "applied move");
    }

    Ok(())
}

/// Where content placed at `original` ends up once `moves` are applied.
///
/// Only moves strictly left of `original` shift it; a gap opened exactly at
/// `original` is the place the content goes.
pub fn shifted_offset(moves: &[Move], original: u64) -> u64 {
    original
        + moves
            .iter()
            .filter(|mv| mv.offset < original)
            .map(|mv| mv.insert_width)
            .sum::<u64>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gap_then_rewrite() {
        let mut buf = vec![0xaa, 0xbb, 0xcc, 0xdd];
        let moves = vec![Move::gap(3, 2), Move::rewrite(0, 1, vec![1, 2, 3])];
        apply_moves(&mut buf, &moves).unwrap();
        assert_eq!(buf, vec![1, 2, 3, 0xcc, 0, 0, 0xdd]);
    }

    #[test]
    fn order_does_not_matter_to_apply() {
        let mut a = vec![1, 2, 3, 4, 5];
        let mut b = a.clone();
        let moves = vec![Move::gap(4, 1), Move::gap(1, 1)];
        let reversed: Vec<Move> = moves.iter().rev().cloned().collect();
        apply_moves(&mut a, &moves).unwrap();
        apply_moves(&mut b, &reversed).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, vec![1, 0, 2, 3, 4, 0, 5]);
    }

    #[test]
    fn move_past_end_is_rejected() {
        let mut buf = vec![1, 2];
        assert!(matches!(
            apply_moves(&mut buf, &[Move::gap(3, 1)]),
            Err(ChunkError::OutOfBounds { offset: 3, .. })
        ));
    }

    #[test]
    fn shifted_by_moves_on_the_left() {
        let moves = vec![Move::gap(10, 4), Move::rewrite(2, 1, vec![0x2d, 0, 1]), Move::rewrite(0, 0, vec![0x8d])];
        assert_eq!(shifted_offset(&moves, 10), 11);
        assert_eq!(shifted_offset(&moves, 12), 17);
        assert_eq!(shifted_offset(&moves, 2), 2);
    }
}
