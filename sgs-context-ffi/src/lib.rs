//! C ABI bridge for sgs-context.
//!
//! Exposes the `sgs_ctx_*` functions a C client links against. Contexts live
//! in a global handle table keyed by opaque `u64` handles; callbacks are plain
//! C function pointers paired with a `user_data` pointer.

pub mod bridge;
pub mod error;
pub mod event;
