//! Host event-loop integration hooks.
//!
//! The engine asks the host to start or stop watching a descriptor through
//! these hooks. The context only carries them; it never invokes them.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::sync::Arc;

use crate::id::ConnectionId;

/// Platform descriptor as the engine sees it (a socket fd on unix).
pub type RawDescriptor = i32;

/// Readiness conditions to watch for, as a small bit set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Readiness(u16);

impl Readiness {
    pub const NONE: Readiness = Readiness(0);
    pub const READABLE: Readiness = Readiness(0x0001);
    pub const WRITABLE: Readiness = Readiness(0x0004);

    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u16 {
        self.0
    }

    pub const fn contains(self, other: Readiness) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Readiness {
    type Output = Readiness;

    fn bitor(self, rhs: Readiness) -> Readiness {
        Readiness(self.0 | rhs.0)
    }
}

impl BitOrAssign for Readiness {
    fn bitor_assign(&mut self, rhs: Readiness) {
        self.0 |= rhs.0;
    }
}

/// `register(connection, descriptor, readiness)` and its `unregister` twin.
pub type IoHook = Arc<dyn Fn(ConnectionId, RawDescriptor, Readiness) + Send + Sync>;

/// The register/unregister pair supplied at construction. Either side may be
/// absent when the host does not need explicit descriptor registration.
#[derive(Clone, Default)]
pub struct IoHooks {
    pub register: Option<IoHook>,
    pub unregister: Option<IoHook>,
}

impl IoHooks {
    /// No hooks: the engine skips descriptor registration entirely.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new<R, U>(register: R, unregister: U) -> Self
    where
        R: Fn(ConnectionId, RawDescriptor, Readiness) + Send + Sync + 'static,
        U: Fn(ConnectionId, RawDescriptor, Readiness) + Send + Sync + 'static,
    {
        Self {
            register: Some(Arc::new(register)),
            unregister: Some(Arc::new(unregister)),
        }
    }

    /// Called by the engine. Returns `false` when no register hook is installed.
    pub fn register_interest(
        &self,
        conn: ConnectionId,
        fd: RawDescriptor,
        readiness: Readiness,
    ) -> bool {
        match &self.register {
            Some(hook) => {
                hook(conn, fd, readiness);
                true
            }
            None => false,
        }
    }

    /// Called by the engine. Returns `false` when no unregister hook is installed.
    pub fn unregister_interest(
        &self,
        conn: ConnectionId,
        fd: RawDescriptor,
        readiness: Readiness,
    ) -> bool {
        match &self.unregister {
            Some(hook) => {
                hook(conn, fd, readiness);
                true
            }
            None => false,
        }
    }

    /// True when both sides point at the same hooks (or are both absent).
    pub fn same_as(&self, other: &IoHooks) -> bool {
        fn same(a: &Option<IoHook>, b: &Option<IoHook>) -> bool {
            match (a, b) {
                (Some(a), Some(b)) => Arc::ptr_eq(a, b),
                (None, None) => true,
                _ => false,
            }
        }
        same(&self.register, &other.register) && same(&self.unregister, &other.unregister)
    }
}

impl fmt::Debug for IoHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IoHooks")
            .field("register", &self.register.is_some())
            .field("unregister", &self.unregister.is_some())
            .finish()
    }
}
