//! Join stage: equality hash join of a primary table with a lookup table.

mod hash;

pub use hash::HashJoin;

/// Prefix given to lookup columns whose names collide with primary columns.
pub const COLLISION_PREFIX: &str = "right_";
