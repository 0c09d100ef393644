//! Insert/Delete ops over byte offsets, and the pairwise transform that
//! resolves them against one another.

use crate::error::ProtocolError;

/// A single text edit. Offsets are byte positions into the document string;
/// it is the client's responsibility to keep them on UTF-8 boundaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Insert { pos: u32, value: String },
    Delete { pos: u32, len: u32 },
}

impl Op {
    /// `i,<pos>,<value>` or `d,<pos>,<len>`. `value` may itself contain
    /// commas, so decoding limits the split to 3 fields.
    pub fn encode(&self) -> String {
        match self {
            Op::Insert { pos, value } => format!("i,{pos},{value}"),
            Op::Delete { pos, len } => format!("d,{pos},{len}"),
        }
    }

    pub fn decode(s: &str) -> Result<Self, ProtocolError> {
        let parts: Vec<&str> = s.splitn(3, ',').collect();
        if parts.len() < 3 {
            return Err(ProtocolError::MalformedOp(s.to_string()));
        }
        let pos: u32 = parts[1]
            .parse()
            .map_err(|_| ProtocolError::MalformedOp(s.to_string()))?;
        match parts[0] {
            "i" => Ok(Op::Insert {
                pos,
                value: parts[2].to_string(),
            }),
            "d" => {
                let len: u32 = parts[2]
                    .parse()
                    .map_err(|_| ProtocolError::MalformedOp(s.to_string()))?;
                Ok(Op::Delete { pos, len })
            }
            other => Err(ProtocolError::UnknownOpKind(other.to_string())),
        }
    }

    /// Apply this op to `s`, returning the new string.
    pub fn apply(&self, s: &str) -> Result<String, ProtocolError> {
        match self {
            Op::Insert { pos, value } => {
                let pos = *pos as usize;
                if pos > s.len() || !s.is_char_boundary(pos) {
                    return Err(ProtocolError::OutOfBounds);
                }
                let mut out = String::with_capacity(s.len() + value.len());
                out.push_str(&s[..pos]);
                out.push_str(value);
                out.push_str(&s[pos..]);
                Ok(out)
            }
            Op::Delete { pos, len } => {
                let pos = *pos as usize;
                let end = pos
                    .checked_add(*len as usize)
                    .ok_or(ProtocolError::OutOfBounds)?;
                if end > s.len() || !s.is_char_boundary(pos) || !s.is_char_boundary(end) {
                    return Err(ProtocolError::OutOfBounds);
                }
                let mut out = String::with_capacity(s.len() - (end - pos));
                out.push_str(&s[..pos]);
                out.push_str(&s[end..]);
                Ok(out)
            }
        }
    }
}

pub fn decode_ops(strs: &[String]) -> Result<Vec<Op>, ProtocolError> {
    strs.iter().map(|s| Op::decode(s)).collect()
}

pub fn encode_ops(ops: &[Op]) -> Vec<String> {
    ops.iter().map(Op::encode).collect()
}

/// Resolves an insert against an overlapping delete. Shared by the I,D and
/// D,I cases of `transform` (the latter via a swap).
fn transform_insert_delete(ins: &Op, del: &Op) -> (Op, Op) {
    let (Op::Insert { pos: ipos, value }, Op::Delete { pos: dpos, len }) = (ins, del) else {
        unreachable!("transform_insert_delete requires (Insert, Delete)")
    };
    if *ipos <= *dpos {
        (
            ins.clone(),
            Op::Delete {
                pos: dpos + value.len() as u32,
                len: *len,
            },
        )
    } else if *ipos >= dpos + len {
        (
            Op::Insert {
                pos: ipos - len,
                value: value.clone(),
            },
            del.clone(),
        )
    } else {
        // Insert lands inside the deleted range: it collapses to nothing and
        // the delete grows to also remove the inserted text.
        (
            Op::Insert {
                pos: *dpos,
                value: String::new(),
            },
            Op::Delete {
                pos: *dpos,
                len: len + value.len() as u32,
            },
        )
    }
}

/// Derives the bottom two sides of the OT diamond: `(a, b) -> (a', b')`.
/// `b` wins insert-insert position ties, i.e. `a` is the one that shifts
/// forward when both insert at the same position.
pub fn transform(a: &Op, b: &Op) -> (Op, Op) {
    match (a, b) {
        (Op::Insert { pos: ap, value: av }, Op::Insert { pos: bp, value: bv }) => {
            if *bp <= *ap {
                (
                    Op::Insert {
                        pos: ap + bv.len() as u32,
                        value: av.clone(),
                    },
                    b.clone(),
                )
            } else {
                (
                    a.clone(),
                    Op::Insert {
                        pos: bp + av.len() as u32,
                        value: bv.clone(),
                    },
                )
            }
        }
        (Op::Insert { .. }, Op::Delete { .. }) => transform_insert_delete(a, b),
        (Op::Delete { .. }, Op::Insert { .. }) => {
            let (ins_p, del_p) = transform_insert_delete(b, a);
            (del_p, ins_p)
        }
        (
            Op::Delete {
                pos: ap,
                len: alen,
            },
            Op::Delete {
                pos: bp,
                len: blen,
            },
        ) => {
            let a_end = ap + alen;
            let b_end = bp + blen;
            if a_end <= *bp {
                (a.clone(), Op::Delete { pos: bp - alen, len: *blen })
            } else if b_end <= *ap {
                (Op::Delete { pos: ap - blen, len: *alen }, b.clone())
            } else {
                let pos = (*ap).min(*bp);
                let overlap = a_end.min(b_end) - (*ap).max(*bp);
                (
                    Op::Delete {
                        pos,
                        len: alen - overlap,
                    },
                    Op::Delete {
                        pos,
                        len: blen - overlap,
                    },
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ins(pos: u32, value: &str) -> Op {
        Op::Insert {
            pos,
            value: value.to_string(),
        }
    }

    fn del(pos: u32, len: u32) -> Op {
        Op::Delete { pos, len }
    }

    #[test]
    fn encode_roundtrip() {
        let op = ins(0, "foo");
        assert_eq!(op.encode(), "i,0,foo");
        assert_eq!(Op::decode(&op.encode()).unwrap(), op);

        let op = del(2, 4);
        assert_eq!(op.encode(), "d,2,4");
        assert_eq!(Op::decode(&op.encode()).unwrap(), op);
    }

    #[test]
    fn value_may_contain_commas() {
        let op = ins(3, "a,b,c");
        let encoded = op.encode();
        assert_eq!(Op::decode(&encoded).unwrap(), op);
    }

    #[test]
    fn decode_unknown_kind_is_protocol_error() {
        assert!(matches!(
            Op::decode("x,0,y"),
            Err(ProtocolError::UnknownOpKind(_))
        ));
    }

    #[test]
    fn apply_insert_and_delete() {
        assert_eq!(ins(0, "foo").apply("").unwrap(), "foo");
        assert_eq!(del(1, 1).apply("abc").unwrap(), "ac");
    }

    #[test]
    fn apply_out_of_bounds_rejected() {
        assert!(matches!(ins(10, "x").apply("abc"), Err(ProtocolError::OutOfBounds)));
        assert!(matches!(del(2, 5).apply("abc"), Err(ProtocolError::OutOfBounds)));
    }

    // Table-driven transform cases, mirroring the upstream OT test vectors.
    fn run(a_s: &str, b_s: &str, ap_s: &str, bp_s: &str, and_reverse: bool) {
        let a = Op::decode(a_s).unwrap();
        let b = Op::decode(b_s).unwrap();
        let (ap, bp) = transform(&a, &b);
        assert_eq!(ap.encode(), ap_s);
        assert_eq!(bp.encode(), bp_s);

        if and_reverse {
            let (bp2, ap2) = transform(&b, &a);
            assert_eq!(ap2.encode(), ap_s);
            assert_eq!(bp2.encode(), bp_s);
        }
    }

    #[test]
    fn transform_insert_insert() {
        run("i,1,f", "i,1,foo", "i,4,f", "i,1,foo", false);
        run("i,1,foo", "i,1,f", "i,2,foo", "i,1,f", false);
        run("i,1,foo", "i,1,foo", "i,4,foo", "i,1,foo", false);
        run("i,1,foo", "i,2,foo", "i,1,foo", "i,5,foo", true);
    }

    #[test]
    fn transform_insert_delete() {
        run("i,2,foo", "d,0,1", "i,1,foo", "d,0,1", true);
        run("i,2,foo", "d,1,2", "i,1,", "d,1,5", true);
        run("i,2,foo", "d,2,2", "i,2,foo", "d,5,2", true);
        run("i,2,foo", "d,3,2", "i,2,foo", "d,6,2", true);
    }

    #[test]
    fn transform_delete_delete() {
        run("d,0,1", "d,0,1", "d,0,0", "d,0,0", true);
        run("d,2,2", "d,3,4", "d,2,1", "d,2,3", true);
        run("d,3,2", "d,3,4", "d,3,0", "d,3,2", true);
        run("d,8,2", "d,3,4", "d,4,2", "d,3,4", true);
    }
}
