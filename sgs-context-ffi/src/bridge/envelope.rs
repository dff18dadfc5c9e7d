//! Framing for events handed to an `sgs_ctx_subscribe_json` callback.

use serde::Serialize;

use crate::event::EventRecord;

pub const SCHEMA_VERSION: u32 = 1;

/// One forwarded event. `seq` starts at 1 for each subscription and lets the
/// host spot gaps; `timestamp_ms` is wall-clock UTC at forwarding time, not
/// when the engine saw the event. Bump [`SCHEMA_VERSION`] on any incompatible change to
/// [`EventRecord`]'s JSON shape.
#[derive(Debug, Clone, Serialize)]
pub struct EventEnvelope {
    pub version: u32,
    pub seq: u64,
    pub timestamp_ms: i64,
    pub event: EventRecord,
}

impl EventEnvelope {
    pub fn new(seq: u64, event: EventRecord) -> Self {
        Self {
            version: SCHEMA_VERSION,
            seq,
            timestamp_ms: chrono::Utc::now().timestamp_millis(),
            event,
        }
    }
}
