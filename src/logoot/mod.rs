//! Logoot-style CRDT convergence engine.

mod atom;
mod document;
mod id;
mod op;

pub use document::LogootDocument;
pub use id::{gen_pid, Id, Pid};
pub use op::{decode_ops, encode_ops, LogootOp};
