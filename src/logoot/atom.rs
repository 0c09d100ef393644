//! The ordered atom sequence: the Logoot document's actual storage.

use super::id::Pid;
use crate::error::HubInvariantError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Atom {
    pub pid: Pid,
    pub value: String,
}

/// Atoms sorted by pid, with a `text` mirror kept in sync on every mutation
/// so reads never have to re-concatenate the whole sequence.
#[derive(Debug, Default)]
pub struct AtomSequence {
    atoms: Vec<Atom>,
    text: String,
}

impl AtomSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    fn search(&self, pid: &Pid) -> Result<usize, usize> {
        self.atoms.binary_search_by(|atom| atom.pid.cmp(pid))
    }

    /// Inserts the atom at its sorted position. No-op if an atom with the
    /// same pid and value is already present (idempotent replay); a pid
    /// collision with a *different* value is an internal invariant defect
    /// since pids are meant to be globally unique.
    pub fn insert(&mut self, pid: Pid, value: String) {
        match self.search(&pid) {
            Ok(idx) => {
                if self.atoms[idx].value != value {
                    panic!(
                        "{}",
                        HubInvariantError(format!(
                            "pid {} already holds value {:?}, got conflicting {:?}",
                            pid.encode(),
                            self.atoms[idx].value,
                            value
                        ))
                    );
                }
            }
            Err(idx) => {
                for ch in value.chars() {
                    self.text.insert(self.char_offset(idx), ch);
                }
                self.atoms.insert(idx, Atom { pid, value });
            }
        }
    }

    /// Removes the atom with this pid. No-op if absent (commutative with
    /// reorderings and safe to replay).
    pub fn delete(&mut self, pid: &Pid) {
        if let Ok(idx) = self.search(pid) {
            let removed = self.atoms.remove(idx);
            let start = self.char_offset(idx);
            let end = start + removed.value.chars().count();
            let prefix: String = self.text.chars().take(start).collect();
            let suffix: String = self.text.chars().skip(end).collect();
            self.text = prefix + &suffix;
        }
    }

    fn char_offset(&self, atom_idx: usize) -> usize {
        self.atoms[..atom_idx]
            .iter()
            .map(|a| a.value.chars().count())
            .sum()
    }
}
