//! The session hub: owns both convergence engines behind one lock, assigns
//! client ids, and runs the subscribe/unsubscribe/broadcast dispatch loop
//! that fans `Change` messages out to every connected client.

use std::collections::HashMap;

use log::{debug, warn};
use tokio::sync::{mpsc, Mutex};

use crate::error::ProtocolError;
use crate::logoot::LogootDocument;
use crate::ot::TextDocument;
use crate::protocol::{self, DataType, Snapshot};

/// Outbox capacity per client. Exceeding it marks the client for eviction
/// rather than blocking the dispatch loop (see concurrency model: the
/// loop must never stall on one slow reader).
const OUTBOX_CAPACITY: usize = 256;

pub type Outbox = mpsc::Sender<String>;

struct Documents {
    text: TextDocument,
    logoot: LogootDocument,
    next_client_id: u32,
}

enum DispatchMsg {
    Subscribe(u32, Outbox),
    Unsubscribe(u32),
    Broadcast(String),
}

pub struct Hub {
    documents: Mutex<Documents>,
    dispatch_tx: mpsc::UnboundedSender<DispatchMsg>,
}

impl Hub {
    pub fn new() -> Self {
        let (dispatch_tx, dispatch_rx) = mpsc::unbounded_channel();
        tokio::spawn(run_dispatch_loop(dispatch_rx));
        Hub {
            documents: Mutex::new(Documents {
                text: TextDocument::new(),
                logoot: LogootDocument::new(),
                next_client_id: 0,
            }),
            dispatch_tx,
        }
    }

    /// Allocates a client id, builds the appropriate `Snapshot`, and
    /// subscribes `outbox` to future broadcasts, all while holding the
    /// document lock so the assigned id and the snapshot content are
    /// mutually consistent.
    pub async fn process_init(&self, data_type: DataType, outbox: Outbox) -> (u32, String) {
        let mut docs = self.documents.lock().await;
        let client_id = docs.next_client_id;
        docs.next_client_id += 1;

        let snapshot = match data_type {
            DataType::OtText => {
                let snap = docs.text.snapshot();
                Snapshot::new(client_id, snap.base_patch_id, snap.text, String::new())
            }
            DataType::CrdtLogoot => {
                let logoot_str = docs.logoot.encode_snapshot();
                Snapshot::new(client_id, 0, docs.logoot.text().to_string(), logoot_str)
            }
        };

        let _ = self
            .dispatch_tx
            .send(DispatchMsg::Subscribe(client_id, outbox));

        (client_id, protocol::to_json(&snapshot))
    }

    /// Applies an update to the selected document and enqueues the
    /// server-normalized `Change` for broadcast, returning its JSON. The
    /// enqueue happens before the document lock is released, so the order
    /// updates are serialized in (the mutex acquisition order) is exactly
    /// the order they land in the dispatch channel — two concurrent
    /// callers can never have their sends reordered relative to their own
    /// serialization, which a separate post-unlock broadcast call could
    /// not guarantee. This doesn't couple document latency to a slow
    /// client: the dispatch channel is unbounded, so the send here is a
    /// non-blocking enqueue, not delivery; delivery happens later in the
    /// dispatch loop, outside this lock.
    pub async fn process_update(
        &self,
        data_type: DataType,
        client_id: u32,
        base_patch_id: u32,
        op_strs: Vec<String>,
    ) -> Result<String, ProtocolError> {
        let mut docs = self.documents.lock().await;
        let change = match data_type {
            DataType::OtText => {
                let change = docs.text.apply_update(client_id, base_patch_id, &op_strs)?;
                protocol::Change::new(
                    client_id,
                    change.patch_id,
                    TextDocument::change_op_strs(&change),
                )
            }
            DataType::CrdtLogoot => {
                let applied = docs.logoot.apply_update(client_id, &op_strs)?;
                protocol::Change::new(client_id, 0, crate::logoot::encode_ops(&applied))
            }
        };
        let json = protocol::to_json(&change);
        let _ = self.dispatch_tx.send(DispatchMsg::Broadcast(json.clone()));
        drop(docs);
        Ok(json)
    }

    pub fn unsubscribe(&self, client_id: u32) {
        let _ = self.dispatch_tx.send(DispatchMsg::Unsubscribe(client_id));
    }

    pub fn outbox_channel() -> (Outbox, mpsc::Receiver<String>) {
        mpsc::channel(OUTBOX_CAPACITY)
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}

async fn run_dispatch_loop(mut rx: mpsc::UnboundedReceiver<DispatchMsg>) {
    let mut clients: HashMap<u32, Outbox> = HashMap::new();
    while let Some(msg) = rx.recv().await {
        match msg {
            DispatchMsg::Subscribe(id, outbox) => {
                debug!("client {id} subscribed");
                clients.insert(id, outbox);
            }
            DispatchMsg::Unsubscribe(id) => {
                debug!("client {id} unsubscribed");
                clients.remove(&id);
            }
            DispatchMsg::Broadcast(payload) => {
                clients.retain(|id, outbox| match outbox.try_send(payload.clone()) {
                    Ok(()) => true,
                    Err(_) => {
                        warn!("client {id} outbox full or closed, evicting");
                        false
                    }
                });
            }
        }
    }
}
