//! Operational-transform convergence engine.

mod document;
mod op;
mod patch;

pub use document::{Change, Snapshot, TextDocument};
pub use op::{decode_ops, encode_ops, transform, Op};
pub use patch::transform_patch;
