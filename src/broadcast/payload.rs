//! # Broadcast Payloads
//!
//! Wire shapes for the two value classes carried on the medium, with
//! strict decoding: any value that fails the shape check is discarded
//! by the receiver, never applied.

use serde_json::{json, Value};

use super::errors::{BroadcastError, BroadcastResult};
use crate::store::{ContextId, MutationKind, RecordMeta};

/// Who last claimed leadership, and when
///
/// Serialized as a 2-element array `[contextId, timestampMillis]` under
/// the `leader` key. Mutated only by the current leader (heartbeat) or
/// by a context attempting to become leader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaderRecord {
    /// Claiming context
    pub context_id: ContextId,

    /// Claim time in milliseconds
    pub timestamp_millis: i64,
}

impl LeaderRecord {
    /// Create a claim
    pub fn new(context_id: ContextId, timestamp_millis: i64) -> Self {
        Self {
            context_id,
            timestamp_millis,
        }
    }

    /// Encode to the wire shape
    pub fn to_value(&self) -> Value {
        json!([self.context_id.to_string(), self.timestamp_millis])
    }

    /// Decode from the wire shape, strictly
    pub fn from_value(value: &Value) -> BroadcastResult<Self> {
        let parts = value
            .as_array()
            .ok_or_else(|| BroadcastError::malformed("leader record is not an array"))?;
        if parts.len() != 2 {
            return Err(BroadcastError::malformed(
                "leader record is not a 2-element array",
            ));
        }

        let context_id = parts[0]
            .as_str()
            .and_then(ContextId::parse)
            .ok_or_else(|| BroadcastError::malformed("leader record id is not a context id"))?;
        let timestamp_millis = parts[1]
            .as_i64()
            .ok_or_else(|| BroadcastError::malformed("leader record timestamp is not an integer"))?;

        Ok(Self {
            context_id,
            timestamp_millis,
        })
    }

    /// Whether the claim is within the freshness window
    pub fn is_fresh(&self, now_millis: i64, window_millis: u64) -> bool {
        now_millis - self.timestamp_millis < window_millis as i64
    }
}

/// One replicated log mutation
///
/// Serialized as a 2-element array `[payload, recordMeta]` under the
/// `add`/`clean` key. The kind is carried by the key, not the value.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationEnvelope {
    /// Mutation kind, recovered from the key the value arrived under
    pub kind: MutationKind,

    /// Application payload
    pub payload: Value,

    /// Origin and scope tags
    pub meta: RecordMeta,
}

impl MutationEnvelope {
    /// Create an envelope
    pub fn new(kind: MutationKind, payload: Value, meta: RecordMeta) -> Self {
        Self {
            kind,
            payload,
            meta,
        }
    }

    /// Encode to the wire shape
    pub fn to_value(&self) -> Value {
        let meta = serde_json::to_value(self.meta).unwrap_or(Value::Null);
        json!([self.payload, meta])
    }

    /// Decode from the wire shape, strictly
    pub fn from_value(kind: MutationKind, value: &Value) -> BroadcastResult<Self> {
        let parts = value
            .as_array()
            .ok_or_else(|| BroadcastError::malformed("envelope is not an array"))?;
        if parts.len() != 2 {
            return Err(BroadcastError::malformed(
                "envelope is not a 2-element array",
            ));
        }

        let meta: RecordMeta = serde_json::from_value(parts[1].clone())
            .map_err(|e| BroadcastError::malformed(format!("envelope meta: {e}")))?;

        Ok(Self {
            kind,
            payload: parts[0].clone(),
            meta,
        })
    }
}
