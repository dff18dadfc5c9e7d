//! Protocol event kinds and the events the engine dispatches through a context.

use std::fmt;

use serde::Serialize;

use crate::id::{ChannelId, CompactId, ConnectionId, SessionId};

/// The eight protocol events an application can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    ChannelJoined,
    ChannelLeft,
    ChannelMessageReceived,
    Disconnected,
    LoggedIn,
    LoginFailed,
    Reconnected,
    DirectMessageReceived,
}

impl EventKind {
    pub const ALL: [EventKind; 8] = [
        EventKind::ChannelJoined,
        EventKind::ChannelLeft,
        EventKind::ChannelMessageReceived,
        EventKind::Disconnected,
        EventKind::LoggedIn,
        EventKind::LoginFailed,
        EventKind::Reconnected,
        EventKind::DirectMessageReceived,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::ChannelJoined => "channel_joined",
            EventKind::ChannelLeft => "channel_left",
            EventKind::ChannelMessageReceived => "channel_message_received",
            EventKind::Disconnected => "disconnected",
            EventKind::LoggedIn => "logged_in",
            EventKind::LoginFailed => "login_failed",
            EventKind::Reconnected => "reconnected",
            EventKind::DirectMessageReceived => "direct_message_received",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One occurrence of a protocol event, borrowed from the engine for the
/// duration of a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event<'a> {
    /// Client was added to a channel.
    ChannelJoined {
        connection: ConnectionId,
        channel: ChannelId,
    },
    /// Client was removed from a channel.
    ChannelLeft {
        connection: ConnectionId,
        channel: ChannelId,
    },
    /// A message arrived on a channel.
    ChannelMessageReceived {
        connection: ConnectionId,
        channel: ChannelId,
        sender: &'a CompactId,
        message: &'a [u8],
    },
    /// The underlying connection was closed.
    Disconnected { connection: ConnectionId },
    /// Session establishment succeeded.
    LoggedIn {
        connection: ConnectionId,
        session: SessionId,
    },
    /// Session establishment was rejected. `reason` is the server's raw text.
    LoginFailed {
        connection: ConnectionId,
        reason: &'a [u8],
    },
    /// A dropped connection was re-established.
    Reconnected { connection: ConnectionId },
    /// A message arrived outside any channel.
    DirectMessageReceived {
        connection: ConnectionId,
        message: &'a [u8],
    },
}

impl Event<'_> {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::ChannelJoined { .. } => EventKind::ChannelJoined,
            Event::ChannelLeft { .. } => EventKind::ChannelLeft,
            Event::ChannelMessageReceived { .. } => EventKind::ChannelMessageReceived,
            Event::Disconnected { .. } => EventKind::Disconnected,
            Event::LoggedIn { .. } => EventKind::LoggedIn,
            Event::LoginFailed { .. } => EventKind::LoginFailed,
            Event::Reconnected { .. } => EventKind::Reconnected,
            Event::DirectMessageReceived { .. } => EventKind::DirectMessageReceived,
        }
    }

    pub fn connection(&self) -> ConnectionId {
        match *self {
            Event::ChannelJoined { connection, .. }
            | Event::ChannelLeft { connection, .. }
            | Event::ChannelMessageReceived { connection, .. }
            | Event::Disconnected { connection }
            | Event::LoggedIn { connection, .. }
            | Event::LoginFailed { connection, .. }
            | Event::Reconnected { connection }
            | Event::DirectMessageReceived { connection, .. } => connection,
        }
    }
}
