// Fri Jan 17 2026 - Alex

use super::ProtocolError;
use crate::bytecode::ScriptBytecode;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde_json::{json, Value};

pub const BYTECODE_FIELD: &str = "bytecode";

/// Raw bytecode -> container -> base64 text.
pub fn encode_bytecode(raw: &[u8]) -> Result<String, ProtocolError> {
    let container = ScriptBytecode::encode(raw)?;
    Ok(BASE64.encode(container))
}

pub fn decode_bytecode(text: &str) -> Result<Vec<u8>, ProtocolError> {
    let container = BASE64.decode(text.trim())?;
    Ok(ScriptBytecode::decode(&container)?)
}

pub fn bytecode_data(raw: &[u8]) -> Result<Value, ProtocolError> {
    Ok(json!({ BYTECODE_FIELD: encode_bytecode(raw)? }))
}

pub fn bytecode_from_data(data: &Value) -> Result<Vec<u8>, ProtocolError> {
    let text = data
        .get(BYTECODE_FIELD)
        .and_then(Value::as_str)
        .ok_or(ProtocolError::MissingField(BYTECODE_FIELD))?;
    decode_bytecode(text)
}
