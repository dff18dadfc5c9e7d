//! ConnectionContext: addressing, I/O hooks and the callback table for one
//! logical connection.
//!
//! The application builds a context, installs whichever callbacks it cares
//! about and hands the context to the engine. The engine reads the slots when
//! an event occurs (see [`ConnectionContext::dispatch`]); it never writes them.
//!
//! There is no locking here. Setters take `&mut self`, so an embedder that
//! reconfigures a context while an engine thread dispatches from it must wrap
//! it in a mutex. Slots hold `Arc`s so a dispatcher can clone one out and drop
//! the lock before calling it.

use std::fmt;
use std::sync::Arc;

use crate::error::ContextError;
use crate::event::{Event, EventKind};
use crate::id::{ChannelId, CompactId, ConnectionId, SessionId};
use crate::io::IoHooks;

/// Size of the hostname buffer, terminator included. The longest accepted
/// hostname is one byte shorter.
pub const HOSTNAME_CAPACITY: usize = 256;

pub type ChannelJoinedCb = Arc<dyn Fn(ConnectionId, ChannelId) + Send + Sync>;
pub type ChannelLeftCb = Arc<dyn Fn(ConnectionId, ChannelId) + Send + Sync>;
pub type ChannelMessageCb =
    Arc<dyn Fn(ConnectionId, ChannelId, &CompactId, &[u8]) + Send + Sync>;
pub type DisconnectedCb = Arc<dyn Fn(ConnectionId) + Send + Sync>;
pub type LoggedInCb = Arc<dyn Fn(ConnectionId, SessionId) + Send + Sync>;
pub type LoginFailedCb = Arc<dyn Fn(ConnectionId, &[u8]) + Send + Sync>;
pub type ReconnectedCb = Arc<dyn Fn(ConnectionId) + Send + Sync>;
pub type DirectMessageCb = Arc<dyn Fn(ConnectionId, &[u8]) + Send + Sync>;

/// The eight callback slots. Cloning is cheap (one `Arc` bump per installed
/// slot), which lets a dispatcher snapshot the table and release any lock
/// around the context before running application code.
#[derive(Default, Clone)]
pub struct CallbackTable {
    channel_joined: Option<ChannelJoinedCb>,
    channel_left: Option<ChannelLeftCb>,
    channel_message: Option<ChannelMessageCb>,
    disconnected: Option<DisconnectedCb>,
    logged_in: Option<LoggedInCb>,
    login_failed: Option<LoginFailedCb>,
    reconnected: Option<ReconnectedCb>,
    direct_message: Option<DirectMessageCb>,
}

/// Generates the typed setter, getter and closure shorthand for one slot.
macro_rules! callback_slot {
    (
        $kind:ident, $field:ident, $cb:ty,
        $set:ident, $get:ident, $on:ident,
        ($($arg:ty),*)
    ) => {
        #[doc = concat!("Replaces the `", stringify!($kind), "` callback. `None` clears it.")]
        pub fn $set(&mut self, callback: Option<$cb>) {
            tracing::trace!(
                kind = %EventKind::$kind,
                installed = callback.is_some(),
                "callback slot updated"
            );
            self.callbacks.$field = callback;
        }

        pub fn $get(&self) -> Option<&$cb> {
            self.callbacks.$field.as_ref()
        }

        pub fn $on<F>(&mut self, f: F)
        where
            F: Fn($($arg),*) + Send + Sync + 'static,
        {
            self.$set(Some(Arc::new(f)));
        }
    };
}

pub struct ConnectionContext {
    hostname: String,
    port: i32,
    io_hooks: IoHooks,
    callbacks: CallbackTable,
}

impl ConnectionContext {
    /// Builds a context with every callback slot unset.
    ///
    /// The port is kept as given; range checks belong to whoever opens the
    /// socket. Absent I/O hooks are fine and mean the engine skips descriptor
    /// registration.
    pub fn new(hostname: &str, port: i32, io_hooks: IoHooks) -> Result<Self, ContextError> {
        let len = hostname.len();
        if len + 1 > HOSTNAME_CAPACITY {
            return Err(ContextError::CapacityExceeded {
                len,
                capacity: HOSTNAME_CAPACITY,
            });
        }
        if let Some(offset) = hostname.bytes().position(|b| b == 0) {
            return Err(ContextError::InteriorNul { offset });
        }

        let mut owned = String::new();
        owned
            .try_reserve_exact(len)
            .map_err(|_| ContextError::AllocationFailure)?;
        owned.push_str(hostname);

        let ctx = Self {
            hostname: owned,
            port,
            io_hooks,
            callbacks: CallbackTable::default(),
        };
        tracing::debug!(hostname = %ctx.hostname, port, "connection context created");
        Ok(ctx)
    }

    /// Consumes the context. Anything still holding engine-side ids keeps
    /// working; only the callbacks go away with it.
    pub fn destroy(self) {
        drop(self);
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn port(&self) -> i32 {
        self.port
    }

    pub fn io_hooks(&self) -> &IoHooks {
        &self.io_hooks
    }

    callback_slot!(
        ChannelJoined, channel_joined, ChannelJoinedCb,
        set_channel_joined_cb, channel_joined_cb, on_channel_joined,
        (ConnectionId, ChannelId)
    );
    callback_slot!(
        ChannelLeft, channel_left, ChannelLeftCb,
        set_channel_left_cb, channel_left_cb, on_channel_left,
        (ConnectionId, ChannelId)
    );
    callback_slot!(
        ChannelMessageReceived, channel_message, ChannelMessageCb,
        set_channel_message_cb, channel_message_cb, on_channel_message,
        (ConnectionId, ChannelId, &CompactId, &[u8])
    );
    callback_slot!(
        Disconnected, disconnected, DisconnectedCb,
        set_disconnected_cb, disconnected_cb, on_disconnected,
        (ConnectionId)
    );
    callback_slot!(
        LoggedIn, logged_in, LoggedInCb,
        set_logged_in_cb, logged_in_cb, on_logged_in,
        (ConnectionId, SessionId)
    );
    callback_slot!(
        LoginFailed, login_failed, LoginFailedCb,
        set_login_failed_cb, login_failed_cb, on_login_failed,
        (ConnectionId, &[u8])
    );
    callback_slot!(
        Reconnected, reconnected, ReconnectedCb,
        set_reconnected_cb, reconnected_cb, on_reconnected,
        (ConnectionId)
    );
    callback_slot!(
        DirectMessageReceived, direct_message, DirectMessageCb,
        set_direct_message_cb, direct_message_cb, on_direct_message,
        (ConnectionId, &[u8])
    );

    pub fn is_set(&self, kind: EventKind) -> bool {
        self.callbacks.is_set(kind)
    }

    /// Clears a single slot, leaving the other seven alone.
    pub fn clear_callback(&mut self, kind: EventKind) {
        let cbs = &mut self.callbacks;
        match kind {
            EventKind::ChannelJoined => cbs.channel_joined = None,
            EventKind::ChannelLeft => cbs.channel_left = None,
            EventKind::ChannelMessageReceived => cbs.channel_message = None,
            EventKind::Disconnected => cbs.disconnected = None,
            EventKind::LoggedIn => cbs.logged_in = None,
            EventKind::LoginFailed => cbs.login_failed = None,
            EventKind::Reconnected => cbs.reconnected = None,
            EventKind::DirectMessageReceived => cbs.direct_message = None,
        }
        tracing::trace!(%kind, "callback slot cleared");
    }

    /// Resets every slot, e.g. before reusing the context for another
    /// connection attempt.
    pub fn unset_all_callbacks(&mut self) {
        self.callbacks = CallbackTable::default();
        tracing::debug!(hostname = %self.hostname, "all callbacks unset");
    }

    /// Kinds that currently have a callback installed, in [`EventKind::ALL`] order.
    pub fn installed(&self) -> impl Iterator<Item = EventKind> + '_ {
        EventKind::ALL.into_iter().filter(|kind| self.is_set(*kind))
    }

    pub fn callback_table(&self) -> &CallbackTable {
        &self.callbacks
    }

    /// Invokes the callback installed for `event`'s kind, once.
    ///
    /// Returns whether a callback ran. An unset slot is not an error.
    pub fn dispatch(&self, event: &Event<'_>) -> bool {
        self.callbacks.dispatch(event)
    }
}

impl CallbackTable {
    pub fn is_set(&self, kind: EventKind) -> bool {
        match kind {
            EventKind::ChannelJoined => self.channel_joined.is_some(),
            EventKind::ChannelLeft => self.channel_left.is_some(),
            EventKind::ChannelMessageReceived => self.channel_message.is_some(),
            EventKind::Disconnected => self.disconnected.is_some(),
            EventKind::LoggedIn => self.logged_in.is_some(),
            EventKind::LoginFailed => self.login_failed.is_some(),
            EventKind::Reconnected => self.reconnected.is_some(),
            EventKind::DirectMessageReceived => self.direct_message.is_some(),
        }
    }

    pub fn dispatch(&self, event: &Event<'_>) -> bool {
        let fired = match *event {
            Event::ChannelJoined {
                connection,
                channel,
            } => fire(&self.channel_joined, |cb| cb(connection, channel)),
            Event::ChannelLeft {
                connection,
                channel,
            } => fire(&self.channel_left, |cb| cb(connection, channel)),
            Event::ChannelMessageReceived {
                connection,
                channel,
                sender,
                message,
            } => fire(&self.channel_message, |cb| {
                cb(connection, channel, sender, message)
            }),
            Event::Disconnected { connection } => {
                fire(&self.disconnected, |cb| cb(connection))
            }
            Event::LoggedIn {
                connection,
                session,
            } => fire(&self.logged_in, |cb| cb(connection, session)),
            Event::LoginFailed { connection, reason } => {
                fire(&self.login_failed, |cb| cb(connection, reason))
            }
            Event::Reconnected { connection } => fire(&self.reconnected, |cb| cb(connection)),
            Event::DirectMessageReceived {
                connection,
                message,
            } => fire(&self.direct_message, |cb| cb(connection, message)),
        };
        tracing::trace!(
            kind = %event.kind(),
            connection = %event.connection(),
            fired,
            "event dispatched"
        );
        fired
    }
}

fn fire<T>(slot: &Option<T>, call: impl FnOnce(&T)) -> bool {
    match slot {
        Some(cb) => {
            call(cb);
            true
        }
        None => false,
    }
}

impl Drop for ConnectionContext {
    fn drop(&mut self) {
        tracing::debug!(hostname = %self.hostname, port = self.port, "connection context destroyed");
    }
}

impl fmt::Debug for ConnectionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionContext")
            .field("hostname", &self.hostname)
            .field("port", &self.port)
            .field("io_hooks", &self.io_hooks)
            .field("installed", &self.installed().collect::<Vec<_>>())
            .finish()
    }
}
