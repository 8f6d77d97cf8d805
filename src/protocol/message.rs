// Fri Jan 17 2026 - Alex

use super::ProtocolError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Which side of the channel produced the message. Requests from the host are
/// `server`; replies and unsolicited signals from the injected side are `client`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Client,
    Server,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub id: String,
    pub action: String,
    #[serde(default = "empty_data")]
    pub data: Value,
}

fn empty_data() -> Value {
    Value::Object(Map::new())
}

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

impl Message {
    /// Host-side message with a fresh correlation id. `Null` data becomes `{}`.
    pub fn server(action: impl Into<String>, data: Value) -> Self {
        Self::with_id(MessageKind::Server, new_id(), action, data)
    }

    pub fn client(id: impl Into<String>, action: impl Into<String>, data: Value) -> Self {
        Self::with_id(MessageKind::Client, id, action, data)
    }

    pub fn with_id(kind: MessageKind, id: impl Into<String>, action: impl Into<String>, data: Value) -> Self {
        Self {
            kind,
            id: id.into(),
            action: action.into(),
            data: if data.is_null() { empty_data() } else { data },
        }
    }

    /// Reply carrying this message's id back from the other side.
    pub fn reply(&self, data: Value) -> Self {
        let kind = match self.kind {
            MessageKind::Server => MessageKind::Client,
            MessageKind::Client => MessageKind::Server,
        };
        Self::with_id(kind, self.id.clone(), self.action.clone(), data)
    }

    pub fn is_client(&self) -> bool {
        self.kind == MessageKind::Client
    }

    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self, ProtocolError> {
        let message: Message = serde_json::from_str(text)?;
        if message.action.is_empty() {
            return Err(ProtocolError::MissingField("action"));
        }
        if message.id.is_empty() {
            return Err(ProtocolError::MissingField("id"));
        }
        Ok(message)
    }

    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }
}
