//! Translates client-relative `ClientInsert`s into pid-based `Insert`s and
//! replays `Insert`/`Delete` against the atom sequence.

use serde::Serialize;

use super::atom::AtomSequence;
use super::id::{gen_pid, Pid};
use super::op::LogootOp;
use crate::error::ProtocolError;

#[derive(Serialize)]
struct AtomWire {
    #[serde(rename = "Pid")]
    pid: String,
    #[serde(rename = "Value")]
    value: String,
}

#[derive(Debug, Default)]
pub struct LogootDocument {
    atoms: AtomSequence,
    next_seq: u64,
}

impl LogootDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        self.atoms.text()
    }

    /// JSON array of `{Pid, Value}` in sequence order, for the `Snapshot`
    /// message's `LogootStr` field.
    pub fn encode_snapshot(&self) -> String {
        let wire: Vec<AtomWire> = self
            .atoms
            .atoms()
            .iter()
            .map(|atom| AtomWire {
                pid: atom.pid.encode(),
                value: atom.value.clone(),
            })
            .collect();
        serde_json::to_string(&wire).expect("atom sequence is always representable as JSON")
    }

    fn next_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    /// Expands and applies one update's ops, returning the server-normalized
    /// op list (with every `ClientInsert` expanded to `Insert`s) for the
    /// resulting `Change` broadcast. All-or-nothing on decode/count errors;
    /// `Insert`/`Delete` themselves never fail (idempotent).
    pub fn apply_update(
        &mut self,
        client_id: u32,
        op_strs: &[String],
    ) -> Result<Vec<LogootOp>, ProtocolError> {
        let ops = super::op::decode_ops(op_strs)?;

        let client_inserts = ops
            .iter()
            .filter(|op| matches!(op, LogootOp::ClientInsert { .. }))
            .count();
        if client_inserts > 1 {
            return Err(ProtocolError::TooManyClientInserts);
        }

        let mut applied = Vec::new();
        for op in ops {
            match op {
                LogootOp::ClientInsert {
                    prev_pid,
                    next_pid,
                    value,
                } => {
                    let mut prev = prev_pid;
                    for ch in value.chars() {
                        let seq = self.next_seq();
                        let pid = gen_pid(client_id, prev.as_ref(), next_pid.as_ref(), seq);
                        self.atoms.insert(pid.clone(), ch.to_string());
                        applied.push(LogootOp::Insert {
                            pid: pid.clone(),
                            value: ch.to_string(),
                        });
                        prev = Some(pid);
                    }
                }
                LogootOp::Insert { pid, value } => {
                    self.atoms.insert(pid.clone(), value.clone());
                    applied.push(LogootOp::Insert { pid, value });
                }
                LogootOp::Delete { pid } => {
                    self.atoms.delete(&pid);
                    applied.push(LogootOp::Delete { pid });
                }
            }
        }

        Ok(applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> String {
        v.to_string()
    }

    #[test]
    fn client_insert_into_empty_document() {
        let mut doc = LogootDocument::new();
        doc.apply_update(1, &[s("ci,,,hi")]).unwrap();
        assert_eq!(doc.text(), "hi");
    }

    #[test]
    fn concurrent_client_inserts_at_same_anchor_both_survive() {
        let mut a = LogootDocument::new();
        let mut b = LogootDocument::new();
        // Both start from an empty document and insert between the same
        // (absent, absent) bounds with different agents.
        let applied_a = a.apply_update(1, &[s("ci,,,aa")]).unwrap();
        let applied_b = b.apply_update(2, &[s("ci,,,bb")]).unwrap();

        // Cross-apply each other's normalized ops; both copies converge.
        let a_ops: Vec<String> = applied_a.iter().map(LogootOp::encode).collect();
        let b_ops: Vec<String> = applied_b.iter().map(LogootOp::encode).collect();
        a.apply_update(2, &b_ops).unwrap();
        b.apply_update(1, &a_ops).unwrap();

        assert_eq!(a.text(), b.text());
        assert_eq!(a.text().len(), 4);
    }

    #[test]
    fn insert_replay_is_idempotent() {
        let mut doc = LogootDocument::new();
        let applied = doc.apply_update(1, &[s("ci,,,x")]).unwrap();
        let ops: Vec<String> = applied.iter().map(LogootOp::encode).collect();
        doc.apply_update(1, &ops).unwrap();
        assert_eq!(doc.text(), "x");
    }

    #[test]
    fn delete_by_pid() {
        let mut doc = LogootDocument::new();
        let applied = doc.apply_update(1, &[s("ci,,,abc")]).unwrap();
        let first_pid = match &applied[0] {
            LogootOp::Insert { pid, .. } => pid.encode(),
            _ => unreachable!(),
        };
        doc.apply_update(1, &[format!("d,{first_pid}")]).unwrap();
        assert_eq!(doc.text(), "bc");
    }

    #[test]
    fn rejects_more_than_one_client_insert_per_update() {
        let mut doc = LogootDocument::new();
        let err = doc
            .apply_update(1, &[s("ci,,,a"), s("ci,,,b")])
            .unwrap_err();
        assert_eq!(err, ProtocolError::TooManyClientInserts);
        assert_eq!(doc.text(), "");
    }

    #[test]
    fn snapshot_round_trips_through_encoding() {
        let mut doc = LogootDocument::new();
        doc.apply_update(1, &[s("ci,,,ab")]).unwrap();
        let encoded = doc.encode_snapshot();
        let parsed: serde_json::Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(parsed.as_array().unwrap().len(), 2);
        assert_eq!(parsed[0]["Value"], "a");
        assert_eq!(parsed[1]["Value"], "b");
    }
}
