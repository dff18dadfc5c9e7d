//! Opaque identifiers handed to event callbacks.
//!
//! The engine owns the real connection, session and channel objects. Callbacks
//! only ever see these lightweight ids, so the context never holds a reference
//! back into engine state.

use std::fmt;

/// Identifies one connection owned by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

/// Identifies an established session on a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

/// Identifies a channel the client is a member of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(pub u64);

macro_rules! display_as_u64 {
    ($($ty:ident => $prefix:literal),* $(,)?) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, concat!($prefix, "#{}"), self.0)
                }
            }
        )*
    };
}

display_as_u64!(ConnectionId => "conn", SessionId => "session", ChannelId => "channel");

/// Variable-length id the server assigns to a peer session (the sender of a
/// channel message). Compared and hashed by its raw bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct CompactId(Vec<u8>);

impl CompactId {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Lowercase hex rendering, used in logs and JSON envelopes.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl From<&[u8]> for CompactId {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl fmt::Display for CompactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
