//! Wire messages exchanged over the websocket connection. Field names match
//! the Go reference server's struct fields verbatim (PascalCase, no json
//! tags there), since both sides must agree on the exact wire shape.

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// The data-type string carried in `Init`, selecting which convergence
/// engine this connection operates against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    OtText,
    CrdtLogoot,
}

impl DataType {
    pub fn as_str(self) -> &'static str {
        match self {
            DataType::OtText => "ot.Text",
            DataType::CrdtLogoot => "crdt.Logoot",
        }
    }

    pub fn parse(s: &str) -> Result<Self, ProtocolError> {
        match s {
            "ot.Text" => Ok(DataType::OtText),
            "crdt.Logoot" => Ok(DataType::CrdtLogoot),
            other => Err(ProtocolError::UnknownDataType(other.to_string())),
        }
    }
}

/// Used only to sniff the `Type` discriminator before deserializing the full
/// message; mirrors the Go server's two-pass decode.
#[derive(Debug, Deserialize)]
pub struct MsgType {
    #[serde(rename = "Type")]
    pub type_: String,
}

#[derive(Debug, Deserialize)]
pub struct Init {
    #[serde(rename = "Type")]
    pub type_: String,
    #[serde(rename = "DocId")]
    pub doc_id: u32,
    #[serde(rename = "DataType")]
    pub data_type: String,
}

#[derive(Debug, Serialize)]
pub struct Snapshot {
    #[serde(rename = "Type")]
    pub type_: &'static str,
    #[serde(rename = "ClientId")]
    pub client_id: u32,
    #[serde(rename = "BasePatchId")]
    pub base_patch_id: u32,
    #[serde(rename = "Text")]
    pub text: String,
    #[serde(rename = "LogootStr")]
    pub logoot_str: String,
}

#[derive(Debug, Deserialize)]
pub struct Update {
    #[serde(rename = "Type")]
    pub type_: String,
    #[serde(rename = "ClientId")]
    pub client_id: u32,
    #[serde(rename = "BasePatchId")]
    pub base_patch_id: u32,
    #[serde(rename = "OpStrs")]
    pub op_strs: Vec<String>,
}

#[derive(Debug, Serialize, Clone)]
pub struct Change {
    #[serde(rename = "Type")]
    pub type_: &'static str,
    #[serde(rename = "ClientId")]
    pub client_id: u32,
    #[serde(rename = "PatchId")]
    pub patch_id: u32,
    #[serde(rename = "OpStrs")]
    pub op_strs: Vec<String>,
}

impl Snapshot {
    pub fn new(client_id: u32, base_patch_id: u32, text: String, logoot_str: String) -> Self {
        Snapshot {
            type_: "Snapshot",
            client_id,
            base_patch_id,
            text,
            logoot_str,
        }
    }
}

impl Change {
    pub fn new(client_id: u32, patch_id: u32, op_strs: Vec<String>) -> Self {
        Change {
            type_: "Change",
            client_id,
            patch_id,
            op_strs,
        }
    }
}

/// Parses the `Type` field out of a raw message without committing to a
/// full shape, then the caller re-parses into the concrete struct.
pub fn peek_type(raw: &str) -> Result<String, ProtocolError> {
    let mt: MsgType =
        serde_json::from_str(raw).map_err(|e| ProtocolError::MalformedJson(e.to_string()))?;
    Ok(mt.type_)
}

pub fn parse_init(raw: &str) -> Result<Init, ProtocolError> {
    serde_json::from_str(raw).map_err(|e| ProtocolError::MalformedJson(e.to_string()))
}

pub fn parse_update(raw: &str) -> Result<Update, ProtocolError> {
    serde_json::from_str(raw).map_err(|e| ProtocolError::MalformedJson(e.to_string()))
}

pub fn to_json(msg: &impl Serialize) -> String {
    serde_json::to_string(msg).expect("outbound message is always representable as JSON")
}
