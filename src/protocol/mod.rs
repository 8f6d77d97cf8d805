// Fri Jan 17 2026 - Alex

pub mod correlator;
pub mod message;
pub mod payload;

use crate::bytecode::BytecodeError;
use thiserror::Error;

pub use correlator::{Correlator, Dispatch, Response};
pub use message::{Message, MessageKind};
pub use payload::{bytecode_data, bytecode_from_data, decode_bytecode, encode_bytecode};

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Base64 error: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("Bytecode error: {0}")]
    Bytecode(#[from] BytecodeError),
    #[error("Message is missing field: {0}")]
    MissingField(&'static str),
    #[error("No outstanding request with id {0}")]
    UnknownRequest(String),
    #[error("Request {id} timed out with {received} of {expected} responses")]
    Timeout {
        id: String,
        received: usize,
        expected: usize,
    },
}
