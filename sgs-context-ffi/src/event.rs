//! Context Event → EventRecord conversion with JSON serialization.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Serialize;

use sgs_context::Event;

/// Message payload. Bytes always travel base64-encoded; `text` is filled in
/// when the payload happens to be valid UTF-8.
#[derive(Debug, Clone, Serialize)]
pub struct Payload {
    pub base64: String,
    pub text: Option<String>,
}

impl Payload {
    fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            base64: BASE64.encode(bytes),
            text: std::str::from_utf8(bytes).ok().map(String::from),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChannelMessageData {
    pub connection: u64,
    pub channel: u64,
    /// Sender session id, lowercase hex.
    pub sender: String,
    pub message: Payload,
}

/// Events forwarded to a JSON subscriber.
///
/// Serialized with `#[serde(tag = "type", content = "data")]` so the host can
/// switch on `type` and decode `data` accordingly.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum EventRecord {
    ChannelJoined { connection: u64, channel: u64 },
    ChannelLeft { connection: u64, channel: u64 },
    ChannelMessageReceived(ChannelMessageData),
    Disconnected { connection: u64 },
    LoggedIn { connection: u64, session: u64 },
    LoginFailed { connection: u64, reason: Payload },
    Reconnected { connection: u64 },
    DirectMessageReceived { connection: u64, message: Payload },
}

pub fn convert_event(event: &Event<'_>) -> EventRecord {
    match *event {
        Event::ChannelJoined {
            connection,
            channel,
        } => EventRecord::ChannelJoined {
            connection: connection.0,
            channel: channel.0,
        },
        Event::ChannelLeft {
            connection,
            channel,
        } => EventRecord::ChannelLeft {
            connection: connection.0,
            channel: channel.0,
        },
        Event::ChannelMessageReceived {
            connection,
            channel,
            sender,
            message,
        } => EventRecord::ChannelMessageReceived(ChannelMessageData {
            connection: connection.0,
            channel: channel.0,
            sender: sender.to_hex(),
            message: Payload::from_bytes(message),
        }),
        Event::Disconnected { connection } => EventRecord::Disconnected {
            connection: connection.0,
        },
        Event::LoggedIn {
            connection,
            session,
        } => EventRecord::LoggedIn {
            connection: connection.0,
            session: session.0,
        },
        Event::LoginFailed { connection, reason } => EventRecord::LoginFailed {
            connection: connection.0,
            reason: Payload::from_bytes(reason),
        },
        Event::Reconnected { connection } => EventRecord::Reconnected {
            connection: connection.0,
        },
        Event::DirectMessageReceived {
            connection,
            message,
        } => EventRecord::DirectMessageReceived {
            connection: connection.0,
            message: Payload::from_bytes(message),
        },
    }
}
