//! Per-connection reader/writer: parses framed JSON messages, drives the
//! session state machine, and drains the outbox onto the socket.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use log::{info, warn};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;

use crate::error::ProtocolError;
use crate::hub::{Hub, Outbox};
use crate::protocol::{self, DataType};
use crate::session::Session;

pub async fn handle_connection(raw_stream: TcpStream, peer: SocketAddr, hub: Arc<Hub>) {
    let ws = match tokio_tungstenite::accept_async(raw_stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("websocket handshake with {peer} failed: {e}");
            return;
        }
    };

    let (mut writer, mut reader) = ws.split();
    let (outbox_tx, mut outbox_rx) = Hub::outbox_channel();
    // Moved (not cloned) into the hub on `Init` — the hub's dispatch loop
    // must end up holding the *only* copy of this sender, so that dropping
    // it on eviction actually closes `outbox_rx` and this loop notices via
    // `recv() == None`. A clone kept here would leave the channel open
    // forever and the eviction would go silently unnoticed.
    let mut outbox_tx = Some(outbox_tx);
    let mut session = Session::Fresh;

    loop {
        tokio::select! {
            incoming = reader.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        match handle_message(&hub, &mut session, &mut outbox_tx, &text).await {
                            Ok(Some(reply)) => {
                                if writer.send(Message::Text(reply)).await.is_err() {
                                    break;
                                }
                            }
                            Ok(None) => {}
                            Err(e) => {
                                warn!("protocol error from {peer}: {e}");
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {
                        // Binary/ping/pong frames carry no protocol meaning here.
                    }
                    Some(Err(e)) => {
                        warn!("transport error from {peer}: {e}");
                        break;
                    }
                }
            }
            payload = outbox_rx.recv() => {
                match payload {
                    Some(payload) => {
                        if writer.send(Message::Text(payload)).await.is_err() {
                            break;
                        }
                    }
                    // The sender closed: either this connection was never
                    // subscribed, or the dispatch loop evicted it (a full
                    // outbox). Either way there is nothing left to deliver.
                    None => break,
                }
            }
        }
    }

    if let Some(client_id) = session.client_id() {
        hub.unsubscribe(client_id);
    }
    let _ = writer.close().await;
    info!("connection with {peer} closed");
}

async fn handle_message(
    hub: &Hub,
    session: &mut Session,
    outbox_tx: &mut Option<Outbox>,
    raw: &str,
) -> Result<Option<String>, ProtocolError> {
    let msg_type = protocol::peek_type(raw)?;
    let current = match *session {
        Session::Fresh => None,
        Session::Ready { client_id, data_type } => Some((client_id, data_type)),
    };

    match (current, msg_type.as_str()) {
        (None, "Init") => {
            let init = protocol::parse_init(raw)?;
            let data_type = DataType::parse(&init.data_type)?;
            // `Session::Fresh` only reaches this arm once per connection, so
            // the outbox is always still present here; handed to the hub by
            // value, not cloned, so it stays the sole live sender.
            let outbox = outbox_tx
                .take()
                .expect("outbox is consumed exactly once, on the first Init");
            let (client_id, snapshot_json) = hub.process_init(data_type, outbox).await;
            *session = Session::Ready {
                client_id,
                data_type,
            };
            Ok(Some(snapshot_json))
        }
        (None, "Update") => Err(ProtocolError::NotInitialized),
        (Some(_), "Init") => Err(ProtocolError::AlreadyInitialized),
        (Some((client_id, data_type)), "Update") => {
            let update = protocol::parse_update(raw)?;
            if update.client_id != client_id {
                return Err(ProtocolError::ClientIdMismatch);
            }
            // `process_update` enqueues the broadcast itself, before
            // releasing the document lock, so ordering matches
            // serialization order; nothing left to do with the reply here.
            hub.process_update(data_type, client_id, update.base_patch_id, update.op_strs)
                .await?;
            Ok(None)
        }
        (_, other) => Err(ProtocolError::UnknownMessageType(other.to_string())),
    }
}
