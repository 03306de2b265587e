//! Minimal contract ABI handling
//!
//! The contract surface is one string-valued function pair plus one event,
//! so this module encodes and decodes exactly that: a no-argument read call,
//! a single-string update call, and an event whose indexed first topic is
//! the acting account and whose data is the new value. Selectors and the
//! event topic come from configuration; nothing is derived from signatures.

use billboard_core::config::ContractBinding;
use billboard_core::MessageUpdate;
use serde_json::Value;
use thiserror::Error;

/// Word size of the ABI encoding
const WORD: usize = 32;

/// Errors from ABI encoding/decoding and binding validation
#[derive(Error, Debug, PartialEq, Eq)]
pub enum AbiError {
    /// A required binding field is missing from configuration
    #[error("Contract binding is missing '{0}'")]
    Missing(&'static str),

    /// A binding field is not valid hex of the expected width
    #[error("Invalid {what}: expected {expected} hex bytes")]
    BadField { what: &'static str, expected: usize },

    /// Payload is not valid hex
    #[error("Invalid hex payload: {0}")]
    Hex(String),

    /// Payload too short for the offsets it declares
    #[error("Truncated ABI payload")]
    Truncated,

    /// Decoded bytes are not valid UTF-8
    #[error("Value is not valid UTF-8")]
    Utf8,

    /// Event log is missing the expected topics or data
    #[error("Malformed event log: {0}")]
    BadLog(String),
}

/// Validated contract binding ready for call encoding
#[derive(Debug, Clone)]
pub struct Binding {
    /// Contract address, 0x-prefixed
    pub address: String,
    /// Selector of the read function
    pub read_selector: [u8; 4],
    /// Selector of the update function
    pub update_selector: [u8; 4],
    /// Topic identifying the update event, 0x-prefixed
    pub update_topic: String,
}

impl Binding {
    /// Validate the configured binding
    pub fn from_config(config: &ContractBinding) -> Result<Self, AbiError> {
        if config.address.is_empty() {
            return Err(AbiError::Missing("address"));
        }
        if config.update_topic.is_empty() {
            return Err(AbiError::Missing("update_topic"));
        }
        let topic = strip_prefix(&config.update_topic);
        if topic.len() != WORD * 2 || hex::decode(topic).is_err() {
            return Err(AbiError::BadField {
                what: "update_topic",
                expected: WORD,
            });
        }

        Ok(Self {
            address: config.address.clone(),
            read_selector: parse_selector(&config.read_selector, "read_selector")?,
            update_selector: parse_selector(&config.update_selector, "update_selector")?,
            update_topic: format!("0x{topic}"),
        })
    }

    /// Calldata for the no-argument read function
    pub fn read_call(&self) -> String {
        format!("0x{}", hex::encode(self.read_selector))
    }

    /// Calldata for the update function applied to `text`
    pub fn update_call(&self, text: &str) -> String {
        let bytes = text.as_bytes();
        let padded = bytes.len().div_ceil(WORD) * WORD;
        let mut data = Vec::with_capacity(4 + 2 * WORD + padded);
        data.extend_from_slice(&self.update_selector);
        data.extend_from_slice(&word(WORD as u64));
        data.extend_from_slice(&word(bytes.len() as u64));
        data.extend_from_slice(bytes);
        data.resize(4 + 2 * WORD + padded, 0);
        format!("0x{}", hex::encode(data))
    }
}

/// Decode an ABI-encoded single-string return value
pub fn decode_string_return(payload: &str) -> Result<String, AbiError> {
    let raw = hex::decode(strip_prefix(payload)).map_err(|e| AbiError::Hex(e.to_string()))?;
    let offset = read_word(&raw, 0)?;
    let len = read_word(&raw, offset)?;
    let start = offset + WORD;
    let bytes = raw.get(start..start + len).ok_or(AbiError::Truncated)?;
    String::from_utf8(bytes.to_vec()).map_err(|_| AbiError::Utf8)
}

/// Decode an update-event log into its actor and new value
///
/// Expects the acting account in the first indexed topic (a left-padded
/// address word) and the new value as ABI-encoded string data.
pub fn decode_update_log(log: &Value) -> Result<MessageUpdate, AbiError> {
    let topics = log
        .get("topics")
        .and_then(Value::as_array)
        .ok_or_else(|| AbiError::BadLog("no topics".into()))?;
    let actor_topic = topics
        .get(1)
        .and_then(Value::as_str)
        .ok_or_else(|| AbiError::BadLog("no actor topic".into()))?;
    let data = log
        .get("data")
        .and_then(Value::as_str)
        .ok_or_else(|| AbiError::BadLog("no data".into()))?;

    Ok(MessageUpdate {
        actor: topic_to_address(actor_topic)?,
        value: decode_string_return(data)?,
    })
}

/// Extract the address packed into an event topic word
fn topic_to_address(topic: &str) -> Result<String, AbiError> {
    let raw = hex::decode(strip_prefix(topic)).map_err(|e| AbiError::Hex(e.to_string()))?;
    if raw.len() != WORD {
        return Err(AbiError::BadLog(format!(
            "actor topic is {} bytes, expected {WORD}",
            raw.len()
        )));
    }
    Ok(format!("0x{}", hex::encode(&raw[WORD - 20..])))
}

fn parse_selector(field: &str, what: &'static str) -> Result<[u8; 4], AbiError> {
    if field.is_empty() {
        return Err(AbiError::Missing(what));
    }
    let bytes = hex::decode(strip_prefix(field))
        .map_err(|_| AbiError::BadField { what, expected: 4 })?;
    bytes
        .try_into()
        .map_err(|_| AbiError::BadField { what, expected: 4 })
}

fn strip_prefix(hex_str: &str) -> &str {
    hex_str.strip_prefix("0x").unwrap_or(hex_str)
}

fn word(n: u64) -> [u8; WORD] {
    let mut out = [0u8; WORD];
    out[WORD - 8..].copy_from_slice(&n.to_be_bytes());
    out
}

fn read_word(raw: &[u8], at: usize) -> Result<usize, AbiError> {
    let bytes = raw.get(at..at + WORD).ok_or(AbiError::Truncated)?;
    // Offsets and lengths in this contract fit comfortably in a u64 word
    if bytes[..WORD - 8].iter().any(|&b| b != 0) {
        return Err(AbiError::Truncated);
    }
    let mut tail = [0u8; 8];
    tail.copy_from_slice(&bytes[WORD - 8..]);
    Ok(u64::from_be_bytes(tail) as usize)
}
