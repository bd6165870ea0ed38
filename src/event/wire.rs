//! JSON wire envelope: `{"type": ..., "timestamp": ..., "data": {...}}`

use super::{AgentEvent, Event, MessageKind, StateKind, StreamKind, TurnKind};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Invalid event JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Untyped event as it travels between processes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub timestamp: i64,
    #[serde(default)]
    pub data: Value,
    /// Conversation the event belongs to, when multiplexed on one stream
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
}

impl AgentEvent {
    /// Decode a raw event. Never fails: unknown types and malformed payloads
    /// become `StreamKind::Unknown` so the processors can ignore them.
    pub fn from_raw(raw: RawEvent) -> Self {
        let RawEvent {
            event_type,
            timestamp,
            data,
            ..
        } = raw;

        if let Some(kind) = decode::<StreamKind>(&event_type, &data) {
            return AgentEvent::Stream(Event::new(timestamp, kind));
        }
        if let Some(kind) = decode::<MessageKind>(&event_type, &data) {
            return AgentEvent::Message(Event::new(timestamp, kind));
        }
        if let Some(kind) = decode::<StateKind>(&event_type, &data) {
            return AgentEvent::State(Event::new(timestamp, kind));
        }
        if let Some(kind) = decode::<TurnKind>(&event_type, &data) {
            return AgentEvent::Turn(Event::new(timestamp, kind));
        }

        tracing::debug!(event_type = %event_type, "Unrecognized or malformed event");
        AgentEvent::Stream(Event::new(timestamp, StreamKind::Unknown { event_type, data }))
    }

    /// Encode to the wire envelope. `agent_id` is left unset.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::Json` if the payload cannot be serialized.
    pub fn to_raw(&self) -> Result<RawEvent, CodecError> {
        let (event_type, data) = match self {
            AgentEvent::Stream(Event {
                kind: StreamKind::Unknown { event_type, data },
                ..
            }) => (event_type.clone(), data.clone()),
            AgentEvent::Stream(e) => encode(&e.kind)?,
            AgentEvent::Message(e) => encode(&e.kind)?,
            AgentEvent::State(e) => encode(&e.kind)?,
            AgentEvent::Turn(e) => encode(&e.kind)?,
        };
        Ok(RawEvent {
            event_type,
            timestamp: self.timestamp(),
            data,
            agent_id: None,
        })
    }

    /// Parse one wire event.
    ///
    /// # Errors
    ///
    /// Fails only when the text is not an event envelope.
    pub fn from_json(text: &str) -> Result<Self, CodecError> {
        let raw: RawEvent = serde_json::from_str(text)?;
        Ok(Self::from_raw(raw))
    }

    /// # Errors
    ///
    /// See [`AgentEvent::to_raw`].
    pub fn to_json(&self) -> Result<String, CodecError> {
        Ok(serde_json::to_string(&self.to_raw()?)?)
    }
}

fn decode<K: DeserializeOwned>(event_type: &str, data: &Value) -> Option<K> {
    // Payload-less events arrive with `data` missing; the typed kinds expect an object
    let data = if data.is_null() {
        Value::Object(Map::new())
    } else {
        data.clone()
    };
    serde_json::from_value(json!({ "type": event_type, "data": data })).ok()
}

fn encode<K: Serialize>(kind: &K) -> Result<(String, Value), CodecError> {
    let mut value = serde_json::to_value(kind)?;
    let event_type = value
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let data = value.get_mut("data").map_or(Value::Null, Value::take);
    Ok((event_type, data))
}
