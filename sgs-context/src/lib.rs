//! Connection context for SGS protocol clients.
//!
//! A [`ConnectionContext`] carries the server address, the host event-loop
//! hooks and one optional callback per protocol event. The protocol engine
//! reads it to decide what to call when something happens on the wire; the
//! application owns it and is the only one that changes it.
//!
//! ```
//! use sgs_context::{ConnectionContext, Event, IoHooks};
//! use sgs_context::id::{ConnectionId, SessionId};
//!
//! let mut ctx = ConnectionContext::new("game.example.com", 1139, IoHooks::none())?;
//! ctx.on_logged_in(|conn, session| println!("{conn} logged in as {session}"));
//!
//! // Engine side:
//! ctx.dispatch(&Event::LoggedIn { connection: ConnectionId(1), session: SessionId(7) });
//! # Ok::<(), sgs_context::ContextError>(())
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod event;
pub mod id;
pub mod io;

pub use config::ContextConfig;
pub use context::{CallbackTable, ConnectionContext, HOSTNAME_CAPACITY};
pub use error::{ConfigError, ContextError};
pub use event::{Event, EventKind};
pub use io::{IoHook, IoHooks, Readiness};
