//! Connection-scoped error taxonomy. Per the spec: protocol and apply
//! errors are fatal for the offending connection but never propagate to the
//! hub's dispatch loop; internal invariant violations are a defect and are
//! expressed as panics instead (see `HubInvariantError`'s doc comment).

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ProtocolError {
    #[error("malformed JSON message: {0}")]
    MalformedJson(String),

    #[error("unknown message type: {0}")]
    UnknownMessageType(String),

    #[error("unknown data type: {0}")]
    UnknownDataType(String),

    #[error("malformed op string: {0}")]
    MalformedOp(String),

    #[error("unknown op kind: {0}")]
    UnknownOpKind(String),

    #[error("malformed pid string: {0}")]
    MalformedPid(String),

    #[error("op applied out of bounds")]
    OutOfBounds,

    #[error("Init sent while already initialized")]
    AlreadyInitialized,

    #[error("Update sent before Init")]
    NotInitialized,

    #[error("update not parented off server state")]
    NotParentedOffServerState,

    #[error("more than one ClientInsert in a single update")]
    TooManyClientInserts,

    #[error("Update ClientId does not match the server-assigned id for this connection")]
    ClientIdMismatch,
}

/// Indicates a defect in the server itself (e.g. a pid ordering violation or
/// a patch log whose length disagrees with `last_patch_id`). Per spec §7
/// these are fatal for the whole process; callers should `panic!`/`unreachable!`
/// at the call site rather than try to recover, so this type exists mainly
/// to give such panics a consistent message.
#[derive(Debug, Error)]
#[error("internal invariant violated: {0}")]
pub struct HubInvariantError(pub String);
