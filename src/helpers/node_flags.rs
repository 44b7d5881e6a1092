use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct NodeFlags: u8 {
        /// Node is under the browser cursor
        const FOCUS    = 0b0000_0001;

        /// Leaf data is a view into the source buffer rather than an owned copy
        const REALISED = 0b0000_0010;
    }
}
