//! The OT text document: current string, patch log, and the rebase step
//! that turns a client's `Update` into a server-accepted `Change`.

use super::op::{decode_ops, encode_ops, Op};
use super::patch::transform_patch;
use crate::error::ProtocolError;

#[derive(Debug, Clone)]
struct LoggedPatch {
    client_id: u32,
    ops: Vec<Op>,
}

#[derive(Debug, Default)]
pub struct TextDocument {
    text: String,
    log: Vec<LoggedPatch>,
}

pub struct Snapshot {
    pub text: String,
    pub base_patch_id: u32,
}

pub struct Change {
    pub patch_id: u32,
    pub ops: Vec<Op>,
    pub client_id: u32,
}

impl TextDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_patch_id(&self) -> u32 {
        self.log.len() as u32
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            text: self.text.clone(),
            base_patch_id: self.last_patch_id(),
        }
    }

    /// Decodes, rebases against any patches logged after `base_patch_id`,
    /// applies the rebased ops, and appends to the log. All-or-nothing: any
    /// failure leaves `self` untouched.
    pub fn apply_update(
        &mut self,
        client_id: u32,
        base_patch_id: u32,
        op_strs: &[String],
    ) -> Result<Change, ProtocolError> {
        let mut ops = decode_ops(op_strs)?;

        let base = base_patch_id as usize;
        for logged in self.log.iter().skip(base) {
            if logged.client_id == client_id {
                return Err(ProtocolError::NotParentedOffServerState);
            }
            let (rebased, _) = transform_patch(&ops, &logged.ops);
            ops = rebased;
        }

        let mut text = self.text.clone();
        for op in &ops {
            text = op.apply(&text)?;
        }

        self.text = text;
        self.log.push(LoggedPatch {
            client_id,
            ops: ops.clone(),
        });

        Ok(Change {
            patch_id: self.last_patch_id(),
            ops,
            client_id,
        })
    }

    pub fn change_op_strs(change: &Change) -> Vec<String> {
        encode_ops(&change.ops)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> String {
        v.to_string()
    }

    #[test]
    fn fresh_document_is_empty() {
        let doc = TextDocument::new();
        assert_eq!(doc.snapshot().text, "");
        assert_eq!(doc.snapshot().base_patch_id, 0);
    }

    #[test]
    fn apply_update_appends_to_log_and_text() {
        let mut doc = TextDocument::new();
        let change = doc.apply_update(1, 0, &[s("i,0,foo")]).unwrap();
        assert_eq!(change.patch_id, 1);
        assert_eq!(doc.snapshot().text, "foo");
        assert_eq!(doc.last_patch_id(), 1);
    }

    #[test]
    fn rejects_update_not_parented_off_server_state() {
        let mut doc = TextDocument::new();
        // Client 1 commits an update based on patch 0.
        doc.apply_update(1, 0, &[s("i,0,a")]).unwrap();
        // Client 1 sends a second update still claiming base 0, without
        // having observed its own first patch. This must be rejected.
        let err = doc.apply_update(1, 0, &[s("i,0,b")]).unwrap_err();
        assert_eq!(err, ProtocolError::NotParentedOffServerState);
        // Document state matches only the first update.
        assert_eq!(doc.snapshot().text, "a");
        assert_eq!(doc.last_patch_id(), 1);
    }

    #[test]
    fn scenario_insert_insert_same_position() {
        // Two clients both insert at position 0 on top of the empty string;
        // A serializes first, so B's change rebases against A's patch.
        let mut doc = TextDocument::new();
        doc.apply_update(1, 0, &[s("i,0,ab")]).unwrap();
        let change = doc.apply_update(2, 0, &[s("i,0,xy")]).unwrap();
        assert_eq!(TextDocument::change_op_strs(&change), vec![s("i,2,xy")]);
        assert_eq!(doc.snapshot().text, "abxy");
    }

    #[test]
    fn scenario_insert_delete_overlap() {
        let mut doc = TextDocument::new();
        doc.apply_update(0, 0, &[s("i,0,abcdef")]).unwrap();
        // A deletes "bcd" (indices 1..4).
        doc.apply_update(1, 1, &[s("d,1,3")]).unwrap();
        // B concurrently inserts "X" at 2, based off the same snapshot as A.
        doc.apply_update(2, 1, &[s("i,2,X")]).unwrap();
        assert_eq!(doc.snapshot().text, "aef");
    }

    #[test]
    fn scenario_delete_delete_overlap() {
        let mut doc = TextDocument::new();
        doc.apply_update(0, 0, &[s("i,0,0123456789")]).unwrap();
        doc.apply_update(1, 1, &[s("d,2,4")]).unwrap();
        doc.apply_update(2, 1, &[s("d,3,4")]).unwrap();
        assert_eq!(doc.snapshot().text, "019");
    }

    #[test]
    fn apply_failure_is_atomic() {
        let mut doc = TextDocument::new();
        doc.apply_update(1, 0, &[s("i,0,abc")]).unwrap();
        let before = doc.snapshot().text;
        let result = doc.apply_update(2, 1, &[s("d,10,5")]);
        assert!(result.is_err());
        assert_eq!(doc.snapshot().text, before);
        assert_eq!(doc.last_patch_id(), 1);
    }
}
