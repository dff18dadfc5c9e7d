//! C callback signatures and their adapters onto context callbacks.

use std::ffi::{c_char, c_int, c_short, c_void, CString};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use sgs_context::context::{
    ChannelJoinedCb, ChannelLeftCb, ChannelMessageCb, DirectMessageCb, DisconnectedCb,
    LoggedInCb, LoginFailedCb, ReconnectedCb,
};
use sgs_context::id::{ChannelId, CompactId, ConnectionId, SessionId};
use sgs_context::io::RawDescriptor;
use sgs_context::{ConnectionContext, Event, IoHook, Readiness};

use crate::bridge::envelope::EventEnvelope;
use crate::event::convert_event;

/// `reg_fd` / `unreg_fd`: connection, descriptor, poll-style readiness bits.
pub type IoInterestFn = unsafe extern "C" fn(conn: u64, fd: c_int, readiness: c_short);

/// Channel joined / channel left.
pub type ChannelFn = unsafe extern "C" fn(conn: u64, channel: u64, user_data: *mut c_void);

pub type ChannelMessageFn = unsafe extern "C" fn(
    conn: u64,
    channel: u64,
    sender_ptr: *const u8,
    sender_len: usize,
    msg_ptr: *const u8,
    msg_len: usize,
    user_data: *mut c_void,
);

/// Disconnected / reconnected.
pub type ConnectionFn = unsafe extern "C" fn(conn: u64, user_data: *mut c_void);

pub type LoggedInFn = unsafe extern "C" fn(conn: u64, session: u64, user_data: *mut c_void);

/// Login failed (reason bytes) / direct message (message bytes).
pub type BytesFn =
    unsafe extern "C" fn(conn: u64, ptr: *const u8, len: usize, user_data: *mut c_void);

/// JSON subscriber: receives a UTF-8 JSON string (pointer + length) and opaque user data.
pub type JsonEventFn =
    unsafe extern "C" fn(json_ptr: *const c_char, json_len: usize, user_data: *mut c_void);

/// Wraps a C function pointer with its user_data pointer.
///
/// The C side is responsible for keeping user_data valid until the slot is
/// replaced, cleared, or the context is destroyed.
#[derive(Clone, Copy)]
pub struct CallbackSink<F> {
    cb: F,
    user_data: *mut c_void,
}

// Safety: the C consumer guarantees thread-safe access to user_data.
// The callback runs on whichever thread the engine dispatches from.
unsafe impl<F: Send> Send for CallbackSink<F> {}
unsafe impl<F: Sync> Sync for CallbackSink<F> {}

impl<F: Copy> CallbackSink<F> {
    pub fn new(cb: F, user_data: *mut c_void) -> Self {
        Self { cb, user_data }
    }

    fn parts(&self) -> (F, *mut c_void) {
        (self.cb, self.user_data)
    }
}

impl CallbackSink<ChannelFn> {
    pub fn into_channel_joined(self) -> ChannelJoinedCb {
        Arc::new(move |conn: ConnectionId, channel: ChannelId| {
            let (cb, ud) = self.parts();
            unsafe { cb(conn.0, channel.0, ud) }
        })
    }

    pub fn into_channel_left(self) -> ChannelLeftCb {
        Arc::new(move |conn: ConnectionId, channel: ChannelId| {
            let (cb, ud) = self.parts();
            unsafe { cb(conn.0, channel.0, ud) }
        })
    }
}

impl CallbackSink<ChannelMessageFn> {
    pub fn into_channel_message(self) -> ChannelMessageCb {
        Arc::new(
            move |conn: ConnectionId, channel: ChannelId, sender: &CompactId, message: &[u8]| {
                let (cb, ud) = self.parts();
                let sender = sender.as_bytes();
                unsafe {
                    cb(
                        conn.0,
                        channel.0,
                        sender.as_ptr(),
                        sender.len(),
                        message.as_ptr(),
                        message.len(),
                        ud,
                    )
                }
            },
        )
    }
}

impl CallbackSink<ConnectionFn> {
    pub fn into_disconnected(self) -> DisconnectedCb {
        Arc::new(move |conn: ConnectionId| {
            let (cb, ud) = self.parts();
            unsafe { cb(conn.0, ud) }
        })
    }

    pub fn into_reconnected(self) -> ReconnectedCb {
        Arc::new(move |conn: ConnectionId| {
            let (cb, ud) = self.parts();
            unsafe { cb(conn.0, ud) }
        })
    }
}

impl CallbackSink<LoggedInFn> {
    pub fn into_logged_in(self) -> LoggedInCb {
        Arc::new(move |conn: ConnectionId, session: SessionId| {
            let (cb, ud) = self.parts();
            unsafe { cb(conn.0, session.0, ud) }
        })
    }
}

impl CallbackSink<BytesFn> {
    pub fn into_login_failed(self) -> LoginFailedCb {
        Arc::new(move |conn: ConnectionId, reason: &[u8]| {
            let (cb, ud) = self.parts();
            unsafe { cb(conn.0, reason.as_ptr(), reason.len(), ud) }
        })
    }

    pub fn into_direct_message(self) -> DirectMessageCb {
        Arc::new(move |conn: ConnectionId, message: &[u8]| {
            let (cb, ud) = self.parts();
            unsafe { cb(conn.0, message.as_ptr(), message.len(), ud) }
        })
    }
}

impl CallbackSink<JsonEventFn> {
    /// Dispatch a JSON string to the C callback.
    ///
    /// If the string contains interior NUL bytes, the event is silently dropped
    /// (this should never happen with well-formed JSON).
    pub fn dispatch(&self, json: &str) {
        let Ok(cstr) = CString::new(json) else {
            tracing::warn!("event JSON contained interior NUL byte, dropping");
            return;
        };
        let (cb, ud) = self.parts();
        unsafe { cb(cstr.as_ptr(), json.len(), ud) }
    }
}

/// Adapts a C descriptor-interest function into a context I/O hook.
pub fn io_hook(f: IoInterestFn) -> IoHook {
    Arc::new(
        move |conn: ConnectionId, fd: RawDescriptor, readiness: Readiness| unsafe {
            f(conn.0, fd, readiness.bits() as c_short)
        },
    )
}

/// Forwards every event kind to one JSON subscriber, numbering envelopes.
pub struct JsonForwarder {
    sink: CallbackSink<JsonEventFn>,
    seq: AtomicU64,
}

impl JsonForwarder {
    pub fn new(sink: CallbackSink<JsonEventFn>) -> Arc<Self> {
        Arc::new(Self {
            sink,
            seq: AtomicU64::new(0),
        })
    }

    pub fn forward(&self, event: &Event<'_>) {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        let envelope = EventEnvelope::new(seq, convert_event(event));
        match serde_json::to_string(&envelope) {
            Ok(json) => self.sink.dispatch(&json),
            Err(e) => tracing::error!("failed to serialize {} event: {e}", event.kind()),
        }
    }

    /// Installs this forwarder in all eight slots, replacing whatever was there.
    pub fn install(self: &Arc<Self>, ctx: &mut ConnectionContext) {
        let fwd = Arc::clone(self);
        ctx.on_channel_joined(move |connection, channel| {
            fwd.forward(&Event::ChannelJoined {
                connection,
                channel,
            })
        });
        let fwd = Arc::clone(self);
        ctx.on_channel_left(move |connection, channel| {
            fwd.forward(&Event::ChannelLeft {
                connection,
                channel,
            })
        });
        let fwd = Arc::clone(self);
        ctx.on_channel_message(move |connection, channel, sender, message| {
            fwd.forward(&Event::ChannelMessageReceived {
                connection,
                channel,
                sender,
                message,
            })
        });
        let fwd = Arc::clone(self);
        ctx.on_disconnected(move |connection| fwd.forward(&Event::Disconnected { connection }));
        let fwd = Arc::clone(self);
        ctx.on_logged_in(move |connection, session| {
            fwd.forward(&Event::LoggedIn {
                connection,
                session,
            })
        });
        let fwd = Arc::clone(self);
        ctx.on_login_failed(move |connection, reason| {
            fwd.forward(&Event::LoginFailed { connection, reason })
        });
        let fwd = Arc::clone(self);
        ctx.on_reconnected(move |connection| fwd.forward(&Event::Reconnected { connection }));
        let fwd = Arc::clone(self);
        ctx.on_direct_message(move |connection, message| {
            fwd.forward(&Event::DirectMessageReceived {
                connection,
                message,
            })
        });
    }
}
