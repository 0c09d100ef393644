//! Logoot op grammar: the client-facing `ClientInsert` plus the two
//! server-normalized ops (`Insert`, `Delete`) that `ClientInsert` expands
//! into.

use super::id::Pid;
use crate::error::ProtocolError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogootOp {
    /// A multi-character insertion anchored between two existing atoms (or
    /// document ends, represented by `None`). Only ever sent by a client;
    /// the hub expands it into a run of `Insert`s before broadcasting.
    ClientInsert {
        prev_pid: Option<Pid>,
        next_pid: Option<Pid>,
        value: String,
    },
    Insert { pid: Pid, value: String },
    Delete { pid: Pid },
}

impl LogootOp {
    pub fn encode(&self) -> String {
        match self {
            LogootOp::ClientInsert {
                prev_pid,
                next_pid,
                value,
            } => {
                let prev = prev_pid.as_ref().map(Pid::encode).unwrap_or_default();
                let next = next_pid.as_ref().map(Pid::encode).unwrap_or_default();
                format!("ci,{prev},{next},{value}")
            }
            LogootOp::Insert { pid, value } => format!("i,{},{value}", pid.encode()),
            LogootOp::Delete { pid } => format!("d,{}", pid.encode()),
        }
    }

    pub fn decode(s: &str) -> Result<Self, ProtocolError> {
        let (kind, rest) = s
            .split_once(',')
            .ok_or_else(|| ProtocolError::MalformedOp(s.to_string()))?;
        match kind {
            "ci" => {
                let parts: Vec<&str> = rest.splitn(3, ',').collect();
                if parts.len() < 3 {
                    return Err(ProtocolError::MalformedOp(s.to_string()));
                }
                let prev_pid = if parts[0].is_empty() {
                    None
                } else {
                    Some(Pid::decode(parts[0])?)
                };
                let next_pid = if parts[1].is_empty() {
                    None
                } else {
                    Some(Pid::decode(parts[1])?)
                };
                Ok(LogootOp::ClientInsert {
                    prev_pid,
                    next_pid,
                    value: parts[2].to_string(),
                })
            }
            "i" => {
                let parts: Vec<&str> = rest.splitn(2, ',').collect();
                if parts.len() < 2 {
                    return Err(ProtocolError::MalformedOp(s.to_string()));
                }
                let pid = Pid::decode(parts[0])?;
                Ok(LogootOp::Insert {
                    pid,
                    value: parts[1].to_string(),
                })
            }
            "d" => {
                let pid = Pid::decode(rest)?;
                Ok(LogootOp::Delete { pid })
            }
            other => Err(ProtocolError::UnknownOpKind(other.to_string())),
        }
    }
}

pub fn decode_ops(strs: &[String]) -> Result<Vec<LogootOp>, ProtocolError> {
    strs.iter().map(|s| LogootOp::decode(s)).collect()
}

pub fn encode_ops(ops: &[LogootOp]) -> Vec<String> {
    ops.iter().map(LogootOp::encode).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logoot::id::Id;

    fn pid(pos: u32, agent: u32, seq: u64) -> Pid {
        Pid {
            ids: vec![Id { pos, agent }],
            seq,
        }
    }

    #[test]
    fn client_insert_round_trips_with_both_bounds() {
        let op = LogootOp::ClientInsert {
            prev_pid: Some(pid(10, 1, 0)),
            next_pid: Some(pid(20, 1, 0)),
            value: "hi".to_string(),
        };
        let encoded = op.encode();
        assert_eq!(LogootOp::decode(&encoded).unwrap(), op);
    }

    #[test]
    fn client_insert_round_trips_with_absent_bounds() {
        let op = LogootOp::ClientInsert {
            prev_pid: None,
            next_pid: None,
            value: "hi".to_string(),
        };
        let encoded = op.encode();
        assert_eq!(encoded, "ci,,,hi");
        assert_eq!(LogootOp::decode(&encoded).unwrap(), op);
    }

    #[test]
    fn insert_and_delete_round_trip() {
        let ins = LogootOp::Insert {
            pid: pid(5, 2, 1),
            value: "x".to_string(),
        };
        assert_eq!(LogootOp::decode(&ins.encode()).unwrap(), ins);

        let del = LogootOp::Delete { pid: pid(5, 2, 1) };
        assert_eq!(LogootOp::decode(&del.encode()).unwrap(), del);
    }

    #[test]
    fn value_containing_commas_is_preserved() {
        let op = LogootOp::Insert {
            pid: pid(1, 1, 0),
            value: "a,b,c".to_string(),
        };
        assert_eq!(LogootOp::decode(&op.encode()).unwrap(), op);
    }

    #[test]
    fn unknown_kind_is_protocol_error() {
        assert!(matches!(
            LogootOp::decode("x,1.1~0"),
            Err(ProtocolError::UnknownOpKind(_))
        ));
    }
}
