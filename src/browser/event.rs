use crate::codec::chunk_type::ChunkType;

/// Discrete input the browser reacts to. Terminal keys are mapped onto
/// these by the front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserEvent {
    Up,
    Down,
    /// Go to the parent set.
    Left,
    /// Descend into the focused set.
    Right,
    /// Insert a placeholder before the focused node.
    Insert,
    /// Insert a placeholder after the last sibling of the focused node.
    Append,
    /// Insert a placeholder as the first child of the focused set.
    InsertInto,
    /// Key pressed while a placeholder waits for its type.
    PickType(char),
    Cancel,
    Save,
    Quit,
}

/// What the front-end has to do after an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowserAction {
    None,
    /// Persist these bytes (canonical serialisation of the tree).
    Save(Vec<u8>),
    Exit,
}

/// Key used to pick each type in type-pick mode.
pub fn type_for_key(key: char) -> Option<ChunkType> {
    let chunk_type = match key {
        '1' => ChunkType::UInt8,
        '2' => ChunkType::Int8,
        '3' => ChunkType::UInt16,
        '4' => ChunkType::Int16,
        '5' => ChunkType::UInt32,
        '6' => ChunkType::Int32,
        '7' => ChunkType::UInt64,
        '8' => ChunkType::Int64,
        'f' => ChunkType::Float32,
        'd' => ChunkType::Float64,
        's' => ChunkType::Utf8,
        'r' => ChunkType::Ref,
        '[' => ChunkType::Set,
        _ => return None,
    };
    Some(chunk_type)
}
