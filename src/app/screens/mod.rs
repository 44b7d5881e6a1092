pub mod help_screen;
pub mod tree_screen;
