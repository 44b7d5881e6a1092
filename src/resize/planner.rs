//! Plans the physical edits that keep a packed buffer consistent after a
//! structural insertion.
//!
//! Inserting `n` bytes somewhere inside a set grows the stored length of
//! every chunk on the path above it. A stored length that no longer fits its
//! length field forces that header to widen, which in turn adds bytes to the
//! chunk above it. The planner walks the path bottom-up carrying the total
//! growth, so one pass covers the whole cascade.
//!
//! Every offset in a plan refers to the original buffer. Moves are returned
//! target first, then ancestors from the deepest up, which is strictly
//! decreasing offset order: apply them in the order given.

use tracing::{debug, trace};

use crate::codec::chunk::{self, DecodedChunk, MAX_LENGTH_BYTES, encode_header_with_width, nr_length_bytes_for};
use crate::codec::chunk_type::ChunkType;
use crate::codec::set;
use crate::error::{ChunkError, Result};
use crate::resize::moves::{Move, apply_moves, shifted_offset};
use crate::tree::chunk_tree::MAX_DEPTH;

/// Plans the insertion of `insert_width` bytes (typically one encoded child
/// chunk) as a new element of a set. `path` addresses the slot: all but the
/// last index lead to the set, the last index is where the new element goes
/// and may equal the set's child count to append.
///
/// # Errors
/// - [`ChunkError::PathNotFound`] if the slot cannot be resolved.
/// - [`ChunkError::WidthOverflow`] if an ancestor's length would not fit 8
///   length bytes.
pub fn plan_resize(buffer: &[u8], path: &[u64], insert_width: u64) -> Result<Vec<Move>> {
    let (chain, insertion) = set::resolve_slot(buffer, path).map_err(|e| path_not_found(path, e))?;

    let mut moves = vec![Move::gap(insertion, insert_width)];
    cascade(&chain, insert_width, &mut moves)?;

    debug!(?path, insert_width, moves = moves.len(), "planned insertion");
    Ok(moves)
}

/// Plans `extra` bytes appended to the payload of the chunk at `path`. The
/// chunk's own header joins the cascade.
pub fn plan_grow(buffer: &[u8], path: &[u64], extra: u64) -> Result<Vec<Move>> {
    let chain = set::resolve_path(buffer, path).map_err(|e| path_not_found(path, e))?;
    let target = chain[chain.len() - 1];
    target.payload(buffer).map_err(|e| path_not_found(path, e))?;

    let mut moves = vec![Move::gap(target.end_offset(), extra)];
    cascade(&chain, extra, &mut moves)?;

    debug!(?path, extra, moves = moves.len(), "planned growth");
    Ok(moves)
}

/// Inserts an already encoded chunk into `buffer` as element `path` of its
/// set, widening ancestor headers as needed.
///
/// `encoded` is checked in full first; on any error `buffer` is unchanged.
///
/// # Errors
/// - [`ChunkError::MalformedChunk`], [`ChunkError::InvalidUtf8`] and the
///   decode errors if `encoded` is not one well-formed chunk.
/// - [`ChunkError::NestingTooDeep`] if the result would nest past
///   [`MAX_DEPTH`].
/// - Everything [`plan_resize`] reports.
pub fn insert_chunk(buffer: &mut Vec<u8>, path: &[u64], encoded: &[u8]) -> Result<()> {
    let depth = path.len() + check_encoded(encoded)?;
    if depth > MAX_DEPTH {
        return Err(ChunkError::NestingTooDeep { depth, limit: MAX_DEPTH });
    }

    let (_, insertion) = set::resolve_slot(buffer, path).map_err(|e| path_not_found(path, e))?;
    let moves = plan_resize(buffer, path, encoded.len() as u64)?;
    apply_moves(buffer, &moves)?;

    let at = shifted_offset(&moves, insertion) as usize;
    buffer[at..at + encoded.len()].copy_from_slice(encoded);
    Ok(())
}

/// Checks that `encoded` is exactly one well-formed chunk and returns the
/// depth of its deepest descendant.
fn check_encoded(encoded: &[u8]) -> Result<usize> {
    let header = chunk::decode(encoded, 0)?;
    if header.total_length() != encoded.len() as u64 {
        return Err(ChunkError::MalformedChunk {
            offset: 0,
            reason: "encoded chunk length does not match its header",
        });
    }

    let mut deepest = 0;
    let mut bad_utf8 = None;
    set::walk(encoded, |chunk, depth| {
        deepest = deepest.max(depth);
        if chunk.chunk_type == ChunkType::Utf8 && bad_utf8.is_none() {
            let valid = chunk
                .payload(encoded)
                .is_ok_and(|payload| std::str::from_utf8(payload).is_ok());
            if !valid {
                bad_utf8 = Some(chunk.data_offset());
            }
        }
    })?;

    match bad_utf8 {
        Some(offset) => Err(ChunkError::InvalidUtf8 { offset }),
        None => Ok(deepest),
    }
}

fn cascade(chain: &[DecodedChunk], insert_width: u64, moves: &mut Vec<Move>) -> Result<()> {
    let mut growth = insert_width;

    for chunk in chain.iter().rev() {
        let new_length = chunk
            .data_length
            .checked_add(growth)
            .ok_or(ChunkError::WidthOverflow {
                length: chunk.data_length,
            })?;

        // never narrow a header: sets keep their reserve, minimal ones widen
        let width = chunk.nr_length_bytes.max(nr_length_bytes_for(new_length));
        if width > MAX_LENGTH_BYTES {
            return Err(ChunkError::WidthOverflow { length: new_length });
        }

        let delta = (width - chunk.nr_length_bytes) as u64;
        let header = encode_header_with_width(chunk.chunk_type, new_length, width)?;
        trace!(offset = chunk.offset, new_length, delta, "header rewrite");

        moves.push(Move::rewrite(chunk.offset, delta, header));
        growth += delta;
    }

    Ok(())
}

fn path_not_found(path: &[u64], source: ChunkError) -> ChunkError {
    ChunkError::PathNotFound {
        path: path.to_vec(),
        source: Box::new(source),
    }
}
