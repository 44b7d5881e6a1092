pub mod moves;
pub mod planner;

pub use moves::{Move, apply_moves, shifted_offset};
pub use planner::{insert_chunk, plan_grow, plan_resize};
