//! Wire frames.
//!
//! A frame is one JSON text message: `{ type, channel?, data, timestamp }`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use et_core::error::{EtError, EtResult};

use crate::events::{EventType, TypedEvent};
use crate::identity::Identity;

/// One message exchanged over the realtime connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    #[serde(rename = "type")]
    pub event_type: EventType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,

    #[serde(default = "empty_object")]
    pub data: Value,

    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

fn empty_object() -> Value {
    Value::Object(Default::default())
}

impl Frame {
    /// Build an untargeted frame stamped with the current time.
    pub fn new(event_type: EventType, data: Value) -> Self {
        Self {
            event_type,
            channel: None,
            data,
            timestamp: Utc::now(),
        }
    }

    /// Tag the frame with a channel.
    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    /// Authentication frame carrying the caller's identity.
    pub fn auth(identity: &Identity) -> Self {
        Self::new(
            EventType::Auth,
            json!({
                "userId": identity.user_id,
                "role": identity.role.as_str(),
                "companyId": identity.company_id,
            }),
        )
    }

    pub fn subscribe(channel: impl Into<String>) -> Self {
        Self::new(EventType::Subscribe, empty_object()).with_channel(channel)
    }

    pub fn unsubscribe(channel: impl Into<String>) -> Self {
        Self::new(EventType::Unsubscribe, empty_object()).with_channel(channel)
    }

    pub fn ping() -> Self {
        Self::new(EventType::Ping, empty_object())
    }

    /// Serialize to the JSON text sent on the wire.
    pub fn encode(&self) -> EtResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a JSON text frame.
    pub fn decode(text: &str) -> EtResult<Self> {
        serde_json::from_str(text)
            .map_err(|e| EtError::Serialization(format!("invalid frame: {e}")))
    }

    /// Decode `data` as the payload of a typed event.
    pub fn payload<E: TypedEvent>(&self) -> EtResult<E> {
        serde_json::from_value(self.data.clone()).map_err(|e| {
            EtError::Serialization(format!("invalid {} payload: {e}", E::event_type()))
        })
    }
}
