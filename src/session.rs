//! Per-connection state machine, per §4.5: `Fresh` until `Init` is
//! processed, `Ready` thereafter.

use crate::protocol::DataType;

#[derive(Debug)]
pub enum Session {
    Fresh,
    Ready { client_id: u32, data_type: DataType },
}

impl Session {
    pub fn client_id(&self) -> Option<u32> {
        match self {
            Session::Fresh => None,
            Session::Ready { client_id, .. } => Some(*client_id),
        }
    }
}
