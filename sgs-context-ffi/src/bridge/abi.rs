//! C ABI exports — the `sgs_ctx_*` surface a C client links against.
//!
//! All functions are `extern "C"` and `#[no_mangle]`.
//! Handles are opaque `u64` IDs into a global `DashMap`; 0 is never a valid handle.

use std::cell::Cell;
use std::ffi::{c_char, c_int, c_void, CStr, CString};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use sgs_context::id::{ChannelId, CompactId, ConnectionId, SessionId};
use sgs_context::{ConnectionContext, Event, EventKind, IoHooks};

use crate::bridge::callback::{
    io_hook, BytesFn, CallbackSink, ChannelFn, ChannelMessageFn, ConnectionFn, IoInterestFn,
    JsonEventFn, JsonForwarder, LoggedInFn,
};
use crate::error::FfiResult;

/// Global handle table. Maps handle IDs → shared context.
static HANDLES: Lazy<DashMap<u64, Arc<Mutex<ConnectionContext>>>> = Lazy::new(DashMap::new);

/// Monotonic handle counter.
static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

thread_local! {
    /// Why the last `sgs_ctx_create` on this thread returned 0.
    static LAST_ERROR: Cell<i32> = const { Cell::new(FfiResult::Ok as i32) };
}

fn set_last_error(code: FfiResult) {
    LAST_ERROR.with(|e| e.set(code as i32));
}

/// Helper: read a C string pointer into a Rust String, returning None on null or invalid UTF-8.
unsafe fn read_c_str(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr) }.to_str().ok().map(String::from)
}

/// Helper: borrow a byte buffer. A null pointer is only accepted with length 0.
unsafe fn read_bytes<'a>(ptr: *const u8, len: usize) -> Option<&'a [u8]> {
    if ptr.is_null() {
        return (len == 0).then_some(&[][..]);
    }
    Some(unsafe { std::slice::from_raw_parts(ptr, len) })
}

fn lookup(handle: u64) -> Option<Arc<Mutex<ConnectionContext>>> {
    HANDLES.get(&handle).map(|entry| Arc::clone(entry.value()))
}

fn with_context(handle: u64, f: impl FnOnce(&mut ConnectionContext)) -> i32 {
    let Some(ctx) = lookup(handle) else {
        return FfiResult::InvalidHandle as i32;
    };
    f(&mut *ctx.lock());
    FfiResult::Ok as i32
}

/// Runs the installed callback without holding the context lock, so the
/// callback may itself reconfigure or destroy the context.
fn dispatch(handle: u64, event: &Event<'_>) -> i32 {
    let Some(ctx) = lookup(handle) else {
        return FfiResult::InvalidHandle as i32;
    };
    let table = ctx.lock().callback_table().clone();
    table.dispatch(event);
    FfiResult::Ok as i32
}

// ─── Create / Destroy ────────────────────────────────────────────────

/// Create a new connection context.
///
/// `reg_fd` and `unreg_fd` may be null when the host does not need explicit
/// descriptor registration. All event callbacks start unset.
///
/// Returns a non-zero handle on success, or 0 on failure; the reason is then
/// available from `sgs_ctx_last_error` on the same thread.
///
/// # Safety
///
/// `hostname` must be a valid, NUL-terminated UTF-8 C string, or null.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sgs_ctx_create(
    hostname: *const c_char,
    port: c_int,
    reg_fd: Option<IoInterestFn>,
    unreg_fd: Option<IoInterestFn>,
) -> u64 {
    let Some(hostname) = (unsafe { read_c_str(hostname) }) else {
        tracing::error!("sgs_ctx_create: null or invalid hostname");
        set_last_error(FfiResult::InvalidArgument);
        return 0;
    };

    let hooks = IoHooks {
        register: reg_fd.map(io_hook),
        unregister: unreg_fd.map(io_hook),
    };
    let ctx = match ConnectionContext::new(&hostname, port, hooks) {
        Ok(ctx) => ctx,
        Err(e) => {
            tracing::error!("sgs_ctx_create: {e}");
            set_last_error(FfiResult::from(&e));
            return 0;
        }
    };

    let id = NEXT_HANDLE.fetch_add(1, Ordering::Relaxed);
    HANDLES.insert(id, Arc::new(Mutex::new(ctx)));
    set_last_error(FfiResult::Ok);
    tracing::debug!("sgs_ctx_create: created handle {id}");
    id
}

/// Result code explaining the most recent `sgs_ctx_create` failure on this thread.
#[unsafe(no_mangle)]
pub extern "C" fn sgs_ctx_last_error() -> i32 {
    LAST_ERROR.with(Cell::get)
}

/// Destroy a context and release its callbacks.
///
/// Safe to call multiple times — second call is a no-op. The engine must not
/// dispatch through the handle afterwards.
#[unsafe(no_mangle)]
pub extern "C" fn sgs_ctx_destroy(handle: u64) {
    if HANDLES.remove(&handle).is_some() {
        tracing::debug!("sgs_ctx_destroy: destroyed handle {handle}");
    }
}

// ─── Callback registration ───────────────────────────────────────────
//
// Each setter replaces the slot's previous callback. A null `cb` clears it.
// `user_data` must stay valid until the slot is replaced, cleared, or the
// context is destroyed.

/// # Safety
///
/// `cb` must be null or a valid function pointer.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sgs_ctx_set_channel_joined_cb(
    handle: u64,
    cb: Option<ChannelFn>,
    user_data: *mut c_void,
) -> i32 {
    with_context(handle, |ctx| {
        ctx.set_channel_joined_cb(cb.map(|f| CallbackSink::new(f, user_data).into_channel_joined()))
    })
}

/// # Safety
///
/// `cb` must be null or a valid function pointer.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sgs_ctx_set_channel_left_cb(
    handle: u64,
    cb: Option<ChannelFn>,
    user_data: *mut c_void,
) -> i32 {
    with_context(handle, |ctx| {
        ctx.set_channel_left_cb(cb.map(|f| CallbackSink::new(f, user_data).into_channel_left()))
    })
}

/// # Safety
///
/// `cb` must be null or a valid function pointer.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sgs_ctx_set_channel_recv_msg_cb(
    handle: u64,
    cb: Option<ChannelMessageFn>,
    user_data: *mut c_void,
) -> i32 {
    with_context(handle, |ctx| {
        ctx.set_channel_message_cb(
            cb.map(|f| CallbackSink::new(f, user_data).into_channel_message()),
        )
    })
}

/// # Safety
///
/// `cb` must be null or a valid function pointer.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sgs_ctx_set_disconnected_cb(
    handle: u64,
    cb: Option<ConnectionFn>,
    user_data: *mut c_void,
) -> i32 {
    with_context(handle, |ctx| {
        ctx.set_disconnected_cb(cb.map(|f| CallbackSink::new(f, user_data).into_disconnected()))
    })
}

/// # Safety
///
/// `cb` must be null or a valid function pointer.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sgs_ctx_set_logged_in_cb(
    handle: u64,
    cb: Option<LoggedInFn>,
    user_data: *mut c_void,
) -> i32 {
    with_context(handle, |ctx| {
        ctx.set_logged_in_cb(cb.map(|f| CallbackSink::new(f, user_data).into_logged_in()))
    })
}

/// # Safety
///
/// `cb` must be null or a valid function pointer.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sgs_ctx_set_login_failed_cb(
    handle: u64,
    cb: Option<BytesFn>,
    user_data: *mut c_void,
) -> i32 {
    with_context(handle, |ctx| {
        ctx.set_login_failed_cb(cb.map(|f| CallbackSink::new(f, user_data).into_login_failed()))
    })
}

/// # Safety
///
/// `cb` must be null or a valid function pointer.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sgs_ctx_set_reconnected_cb(
    handle: u64,
    cb: Option<ConnectionFn>,
    user_data: *mut c_void,
) -> i32 {
    with_context(handle, |ctx| {
        ctx.set_reconnected_cb(cb.map(|f| CallbackSink::new(f, user_data).into_reconnected()))
    })
}

/// # Safety
///
/// `cb` must be null or a valid function pointer.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sgs_ctx_set_recv_msg_cb(
    handle: u64,
    cb: Option<BytesFn>,
    user_data: *mut c_void,
) -> i32 {
    with_context(handle, |ctx| {
        ctx.set_direct_message_cb(
            cb.map(|f| CallbackSink::new(f, user_data).into_direct_message()),
        )
    })
}

/// Clear all eight callback slots.
#[unsafe(no_mangle)]
pub extern "C" fn sgs_ctx_unset_all_cbs(handle: u64) -> i32 {
    with_context(handle, ConnectionContext::unset_all_callbacks)
}

/// Route every event kind to a single JSON callback.
///
/// Installs a forwarder in all eight slots (replacing whatever was there). Each
/// event arrives as a versioned envelope:
///
/// ```json
/// {"version":1,"seq":3,"timestamp_ms":1700000000000,
///  "event":{"type":"logged_in","data":{"connection":1,"session":7}}}
/// ```
///
/// # Safety
///
/// `cb` must be a valid function pointer. `user_data` must remain valid for the
/// lifetime of the subscription.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sgs_ctx_subscribe_json(
    handle: u64,
    cb: JsonEventFn,
    user_data: *mut c_void,
) -> i32 {
    let forwarder = JsonForwarder::new(CallbackSink::new(cb, user_data));
    let result = with_context(handle, |ctx| forwarder.install(ctx));
    if result == FfiResult::Ok as i32 {
        tracing::debug!("sgs_ctx_subscribe_json: forwarder installed for handle {handle}");
    }
    result
}

/// Bit `i` is set when the i-th event kind has a callback, in the order
/// channel joined, channel left, channel message, disconnected, logged in,
/// login failed, reconnected, direct message. Returns -1 for an unknown handle.
#[unsafe(no_mangle)]
pub extern "C" fn sgs_ctx_installed_mask(handle: u64) -> i32 {
    let Some(ctx) = lookup(handle) else {
        return -1;
    };
    let ctx = ctx.lock();
    EventKind::ALL
        .iter()
        .enumerate()
        .filter(|(_, kind)| ctx.is_set(**kind))
        .fold(0, |mask, (i, _)| mask | (1 << i))
}

// ─── Engine-side dispatch ────────────────────────────────────────────
//
// A C engine reports events through these. Unset slots are skipped silently.

#[unsafe(no_mangle)]
pub extern "C" fn sgs_ctx_dispatch_channel_joined(handle: u64, conn: u64, channel: u64) -> i32 {
    dispatch(
        handle,
        &Event::ChannelJoined {
            connection: ConnectionId(conn),
            channel: ChannelId(channel),
        },
    )
}

#[unsafe(no_mangle)]
pub extern "C" fn sgs_ctx_dispatch_channel_left(handle: u64, conn: u64, channel: u64) -> i32 {
    dispatch(
        handle,
        &Event::ChannelLeft {
            connection: ConnectionId(conn),
            channel: ChannelId(channel),
        },
    )
}

/// # Safety
///
/// `sender_ptr`/`msg_ptr` must point to at least `sender_len`/`msg_len`
/// readable bytes, or be null with a zero length.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sgs_ctx_dispatch_channel_message(
    handle: u64,
    conn: u64,
    channel: u64,
    sender_ptr: *const u8,
    sender_len: usize,
    msg_ptr: *const u8,
    msg_len: usize,
) -> i32 {
    let (Some(sender), Some(message)) = (unsafe { read_bytes(sender_ptr, sender_len) }, unsafe {
        read_bytes(msg_ptr, msg_len)
    }) else {
        return FfiResult::InvalidArgument as i32;
    };
    let sender = CompactId::from(sender);
    dispatch(
        handle,
        &Event::ChannelMessageReceived {
            connection: ConnectionId(conn),
            channel: ChannelId(channel),
            sender: &sender,
            message,
        },
    )
}

#[unsafe(no_mangle)]
pub extern "C" fn sgs_ctx_dispatch_disconnected(handle: u64, conn: u64) -> i32 {
    dispatch(
        handle,
        &Event::Disconnected {
            connection: ConnectionId(conn),
        },
    )
}

#[unsafe(no_mangle)]
pub extern "C" fn sgs_ctx_dispatch_logged_in(handle: u64, conn: u64, session: u64) -> i32 {
    dispatch(
        handle,
        &Event::LoggedIn {
            connection: ConnectionId(conn),
            session: SessionId(session),
        },
    )
}

/// # Safety
///
/// `ptr` must point to at least `len` readable bytes, or be null with `len == 0`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sgs_ctx_dispatch_login_failed(
    handle: u64,
    conn: u64,
    ptr: *const u8,
    len: usize,
) -> i32 {
    let Some(reason) = (unsafe { read_bytes(ptr, len) }) else {
        return FfiResult::InvalidArgument as i32;
    };
    dispatch(
        handle,
        &Event::LoginFailed {
            connection: ConnectionId(conn),
            reason,
        },
    )
}

#[unsafe(no_mangle)]
pub extern "C" fn sgs_ctx_dispatch_reconnected(handle: u64, conn: u64) -> i32 {
    dispatch(
        handle,
        &Event::Reconnected {
            connection: ConnectionId(conn),
        },
    )
}

/// # Safety
///
/// `ptr` must point to at least `len` readable bytes, or be null with `len == 0`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sgs_ctx_dispatch_recv_msg(
    handle: u64,
    conn: u64,
    ptr: *const u8,
    len: usize,
) -> i32 {
    let Some(message) = (unsafe { read_bytes(ptr, len) }) else {
        return FfiResult::InvalidArgument as i32;
    };
    dispatch(
        handle,
        &Event::DirectMessageReceived {
            connection: ConnectionId(conn),
            message,
        },
    )
}

// ─── Snapshot ────────────────────────────────────────────────────────

/// Get a JSON snapshot of the context's configuration.
///
/// Returns a heap-allocated C string that must be freed with `sgs_ctx_free_string`.
/// Returns null if the handle is invalid.
///
/// ```json
/// {
///   "hostname": "game.example.com",
///   "port": 1139,
///   "io_hooks": {"register": true, "unregister": true},
///   "installed": ["logged_in", "disconnected"]
/// }
/// ```
#[unsafe(no_mangle)]
pub extern "C" fn sgs_ctx_get_snapshot_json(handle: u64) -> *mut c_char {
    let Some(ctx) = lookup(handle) else {
        return std::ptr::null_mut();
    };

    let snapshot = {
        let ctx = ctx.lock();
        serde_json::json!({
            "hostname": ctx.hostname(),
            "port": ctx.port(),
            "io_hooks": {
                "register": ctx.io_hooks().register.is_some(),
                "unregister": ctx.io_hooks().unregister.is_some(),
            },
            "installed": ctx.installed().collect::<Vec<_>>(),
        })
    };

    match CString::new(snapshot.to_string()) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => std::ptr::null_mut(),
    }
}

/// Free a string previously returned by `sgs_ctx_get_snapshot_json`.
///
/// # Safety
///
/// `ptr` must be null or a pointer previously returned by `sgs_ctx_get_snapshot_json`.
/// Must not be called more than once for the same pointer.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sgs_ctx_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(unsafe { CString::from_raw(ptr) });
    }
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::c_short;
    use std::sync::atomic::{AtomicI32, AtomicUsize};

    fn make_host(host: &str) -> CString {
        CString::new(host).unwrap()
    }

    fn create(host: &str) -> u64 {
        let host = make_host(host);
        unsafe { sgs_ctx_create(host.as_ptr(), 1139, None, None) }
    }

    fn counter_ptr(counter: &AtomicUsize) -> *mut c_void {
        counter as *const AtomicUsize as *mut c_void
    }

    unsafe fn bump(user_data: *mut c_void) {
        let counter = unsafe { &*(user_data as *const AtomicUsize) };
        counter.fetch_add(1, Ordering::SeqCst);
    }

    unsafe extern "C" fn count_channel(_conn: u64, _channel: u64, user_data: *mut c_void) {
        unsafe { bump(user_data) }
    }

    unsafe extern "C" fn count_conn(_conn: u64, user_data: *mut c_void) {
        unsafe { bump(user_data) }
    }

    unsafe extern "C" fn count_session(_conn: u64, _session: u64, user_data: *mut c_void) {
        unsafe { bump(user_data) }
    }

    unsafe extern "C" fn count_bytes(
        _conn: u64,
        _ptr: *const u8,
        _len: usize,
        user_data: *mut c_void,
    ) {
        unsafe { bump(user_data) }
    }

    unsafe extern "C" fn count_channel_msg(
        _conn: u64,
        _channel: u64,
        _sender_ptr: *const u8,
        _sender_len: usize,
        _msg_ptr: *const u8,
        _msg_len: usize,
        user_data: *mut c_void,
    ) {
        unsafe { bump(user_data) }
    }

    unsafe extern "C" fn record_reason(
        _conn: u64,
        ptr: *const u8,
        len: usize,
        user_data: *mut c_void,
    ) {
        let out = unsafe { &*(user_data as *const std::sync::Mutex<Vec<u8>>) };
        let bytes = unsafe { std::slice::from_raw_parts(ptr, len) };
        out.lock().unwrap().extend_from_slice(bytes);
    }

    unsafe extern "C" fn collect_json(ptr: *const c_char, _len: usize, user_data: *mut c_void) {
        let out = unsafe { &*(user_data as *const std::sync::Mutex<Vec<String>>) };
        let json = unsafe { CStr::from_ptr(ptr) }.to_str().unwrap().to_string();
        out.lock().unwrap().push(json);
    }

    static REENTRANT_SETTER: AtomicI32 = AtomicI32::new(-1);
    static REENTRANT_AFTER_DESTROY: AtomicI32 = AtomicI32::new(-1);

    /// `user_data` carries the callback's own handle.
    unsafe extern "C" fn destroy_own_context(_conn: u64, user_data: *mut c_void) {
        let handle = user_data as usize as u64;
        let cleared = unsafe { sgs_ctx_set_disconnected_cb(handle, None, std::ptr::null_mut()) };
        REENTRANT_SETTER.store(cleared, Ordering::SeqCst);
        sgs_ctx_destroy(handle);
        let after = unsafe { sgs_ctx_set_reconnected_cb(handle, None, std::ptr::null_mut()) };
        REENTRANT_AFTER_DESTROY.store(after, Ordering::SeqCst);
    }

    unsafe extern "C" fn noop_io(_conn: u64, _fd: c_int, _readiness: c_short) {}

    fn set_all(handle: u64, counter: &AtomicUsize) {
        let ud = counter_ptr(counter);
        unsafe {
            assert_eq!(sgs_ctx_set_channel_joined_cb(handle, Some(count_channel), ud), 0);
            assert_eq!(sgs_ctx_set_channel_left_cb(handle, Some(count_channel), ud), 0);
            assert_eq!(sgs_ctx_set_channel_recv_msg_cb(handle, Some(count_channel_msg), ud), 0);
            assert_eq!(sgs_ctx_set_disconnected_cb(handle, Some(count_conn), ud), 0);
            assert_eq!(sgs_ctx_set_logged_in_cb(handle, Some(count_session), ud), 0);
            assert_eq!(sgs_ctx_set_login_failed_cb(handle, Some(count_bytes), ud), 0);
            assert_eq!(sgs_ctx_set_reconnected_cb(handle, Some(count_conn), ud), 0);
            assert_eq!(sgs_ctx_set_recv_msg_cb(handle, Some(count_bytes), ud), 0);
        }
    }

    #[test]
    fn test_create_and_destroy() {
        let handle = create("game.example.com");
        assert_ne!(handle, 0);
        assert!(HANDLES.contains_key(&handle));
        assert_eq!(sgs_ctx_installed_mask(handle), 0);

        sgs_ctx_destroy(handle);
        assert!(!HANDLES.contains_key(&handle));
    }

    #[test]
    fn test_create_null_hostname() {
        let handle = unsafe { sgs_ctx_create(std::ptr::null(), 1139, None, None) };
        assert_eq!(handle, 0);
        assert_eq!(sgs_ctx_last_error(), FfiResult::InvalidArgument as i32);
    }

    #[test]
    fn test_hostname_capacity() {
        let fits = "a".repeat(sgs_context::HOSTNAME_CAPACITY - 1);
        let handle = create(&fits);
        assert_ne!(handle, 0);
        assert_eq!(sgs_ctx_last_error(), FfiResult::Ok as i32);
        sgs_ctx_destroy(handle);

        let too_long = "a".repeat(sgs_context::HOSTNAME_CAPACITY);
        assert_eq!(create(&too_long), 0);
        assert_eq!(sgs_ctx_last_error(), FfiResult::CapacityExceeded as i32);
    }

    #[test]
    fn test_double_destroy() {
        let handle = create("game.example.com");
        assert_ne!(handle, 0);

        sgs_ctx_destroy(handle);
        // Second destroy is a no-op
        sgs_ctx_destroy(handle);
    }

    #[test]
    fn test_invalid_handle_returns_error() {
        let result = unsafe { sgs_ctx_set_disconnected_cb(999999, None, std::ptr::null_mut()) };
        assert_eq!(result, FfiResult::InvalidHandle as i32);

        assert_eq!(sgs_ctx_unset_all_cbs(999999), FfiResult::InvalidHandle as i32);
        assert_eq!(
            sgs_ctx_dispatch_reconnected(999999, 1),
            FfiResult::InvalidHandle as i32
        );
        assert_eq!(sgs_ctx_installed_mask(999999), -1);
        assert!(sgs_ctx_get_snapshot_json(999999).is_null());
    }

    #[test]
    fn test_set_all_then_unset_all() {
        let counter = AtomicUsize::new(0);
        let handle = create("game.example.com");
        set_all(handle, &counter);
        assert_eq!(sgs_ctx_installed_mask(handle), 0xff);

        assert_eq!(sgs_ctx_unset_all_cbs(handle), FfiResult::Ok as i32);
        assert_eq!(sgs_ctx_installed_mask(handle), 0);

        assert_eq!(sgs_ctx_dispatch_disconnected(handle, 1), FfiResult::Ok as i32);
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        sgs_ctx_destroy(handle);
    }

    #[test]
    fn test_null_callback_clears_only_its_slot() {
        let counter = AtomicUsize::new(0);
        let handle = create("game.example.com");
        set_all(handle, &counter);

        let result = unsafe { sgs_ctx_set_logged_in_cb(handle, None, std::ptr::null_mut()) };
        assert_eq!(result, FfiResult::Ok as i32);
        // logged_in is bit 4
        assert_eq!(sgs_ctx_installed_mask(handle), 0xff & !(1 << 4));

        sgs_ctx_destroy(handle);
    }

    #[test]
    fn test_dispatch_reaches_installed_callbacks() {
        let counter = AtomicUsize::new(0);
        let handle = create("game.example.com");
        set_all(handle, &counter);

        let sender = [1u8, 2, 3];
        let msg = b"hello";
        assert_eq!(sgs_ctx_dispatch_channel_joined(handle, 1, 2), 0);
        assert_eq!(sgs_ctx_dispatch_channel_left(handle, 1, 2), 0);
        assert_eq!(
            unsafe {
                sgs_ctx_dispatch_channel_message(
                    handle,
                    1,
                    2,
                    sender.as_ptr(),
                    sender.len(),
                    msg.as_ptr(),
                    msg.len(),
                )
            },
            0
        );
        assert_eq!(sgs_ctx_dispatch_disconnected(handle, 1), 0);
        assert_eq!(sgs_ctx_dispatch_logged_in(handle, 1, 9), 0);
        assert_eq!(
            unsafe { sgs_ctx_dispatch_login_failed(handle, 1, msg.as_ptr(), msg.len()) },
            0
        );
        assert_eq!(sgs_ctx_dispatch_reconnected(handle, 1), 0);
        assert_eq!(
            unsafe { sgs_ctx_dispatch_recv_msg(handle, 1, std::ptr::null(), 0) },
            0
        );

        assert_eq!(counter.load(Ordering::SeqCst), 8);
        sgs_ctx_destroy(handle);
    }

    #[test]
    fn test_login_failed_receives_reason_bytes() {
        let reason = std::sync::Mutex::new(Vec::<u8>::new());
        let handle = create("game.example.com");
        let ud = &reason as *const std::sync::Mutex<Vec<u8>> as *mut c_void;
        unsafe { sgs_ctx_set_login_failed_cb(handle, Some(record_reason), ud) };

        let text = b"account locked";
        unsafe { sgs_ctx_dispatch_login_failed(handle, 1, text.as_ptr(), text.len()) };
        assert_eq!(reason.lock().unwrap().as_slice(), text);

        sgs_ctx_destroy(handle);
    }

    #[test]
    fn test_null_bytes_with_length_is_invalid() {
        let handle = create("game.example.com");
        let result = unsafe { sgs_ctx_dispatch_recv_msg(handle, 1, std::ptr::null(), 4) };
        assert_eq!(result, FfiResult::InvalidArgument as i32);
        sgs_ctx_destroy(handle);
    }

    #[test]
    fn test_subscribe_json() {
        let out = std::sync::Mutex::new(Vec::<String>::new());
        let handle = create("game.example.com");
        let ud = &out as *const std::sync::Mutex<Vec<String>> as *mut c_void;

        let result = unsafe { sgs_ctx_subscribe_json(handle, collect_json, ud) };
        assert_eq!(result, FfiResult::Ok as i32);
        assert_eq!(sgs_ctx_installed_mask(handle), 0xff);

        sgs_ctx_dispatch_logged_in(handle, 1, 7);
        sgs_ctx_dispatch_channel_joined(handle, 1, 3);

        let out = out.lock().unwrap();
        assert_eq!(out.len(), 2);
        let first: serde_json::Value = serde_json::from_str(&out[0]).unwrap();
        assert_eq!(first["version"], 1);
        assert_eq!(first["seq"], 1);
        assert_eq!(first["event"]["type"], "logged_in");
        assert_eq!(first["event"]["data"]["session"], 7);
        let second: serde_json::Value = serde_json::from_str(&out[1]).unwrap();
        assert_eq!(second["seq"], 2);
        assert_eq!(second["event"]["type"], "channel_joined");
        drop(out);

        sgs_ctx_destroy(handle);
    }

    #[test]
    fn test_callback_reconfigures_and_destroys_own_context() {
        let handle = create("game.example.com");
        let ud = handle as usize as *mut c_void;
        unsafe { sgs_ctx_set_disconnected_cb(handle, Some(destroy_own_context), ud) };

        // Would deadlock if the context lock were held across the callback.
        assert_eq!(sgs_ctx_dispatch_disconnected(handle, 1), FfiResult::Ok as i32);

        assert_eq!(REENTRANT_SETTER.load(Ordering::SeqCst), FfiResult::Ok as i32);
        assert_eq!(
            REENTRANT_AFTER_DESTROY.load(Ordering::SeqCst),
            FfiResult::InvalidHandle as i32
        );
        assert!(!HANDLES.contains_key(&handle));
        assert_eq!(
            sgs_ctx_dispatch_disconnected(handle, 1),
            FfiResult::InvalidHandle as i32
        );
    }

    #[test]
    fn test_snapshot_json() {
        let counter = AtomicUsize::new(0);
        let host = make_host("localhost");
        let handle = unsafe { sgs_ctx_create(host.as_ptr(), 6000, Some(noop_io), None) };
        assert_ne!(handle, 0);
        unsafe { sgs_ctx_set_reconnected_cb(handle, Some(count_conn), counter_ptr(&counter)) };

        let ptr = sgs_ctx_get_snapshot_json(handle);
        assert!(!ptr.is_null());

        let json_str = unsafe { CStr::from_ptr(ptr) }.to_str().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(json_str).unwrap();
        assert_eq!(parsed["hostname"], "localhost");
        assert_eq!(parsed["port"], 6000);
        assert_eq!(parsed["io_hooks"]["register"], true);
        assert_eq!(parsed["io_hooks"]["unregister"], false);
        assert_eq!(parsed["installed"], serde_json::json!(["reconnected"]));

        unsafe { sgs_ctx_free_string(ptr) };
        sgs_ctx_destroy(handle);
    }

    #[test]
    fn test_free_null_string() {
        // Should not crash
        unsafe { sgs_ctx_free_string(std::ptr::null_mut()) };
    }
}
