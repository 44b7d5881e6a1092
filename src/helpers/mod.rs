pub mod node_flags;
