//! Result codes returned by the `sgs_ctx_*` functions.

use sgs_context::ContextError;

/// Error codes for the C ABI surface.
///
/// Every `sgs_ctx_*` function that returns `i32` uses these values.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiResult {
    /// Success.
    Ok = 0,
    /// The handle does not exist in the global handle table.
    InvalidHandle = 1,
    /// A required argument was null or not valid UTF-8.
    InvalidArgument = 2,
    /// The hostname does not fit the context's hostname buffer.
    CapacityExceeded = 3,
    /// The context could not be allocated.
    AllocationFailure = 4,
}

impl From<&ContextError> for FfiResult {
    fn from(err: &ContextError) -> Self {
        match err {
            ContextError::CapacityExceeded { .. } => FfiResult::CapacityExceeded,
            ContextError::InteriorNul { .. } => FfiResult::InvalidArgument,
            ContextError::AllocationFailure => FfiResult::AllocationFailure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_context_errors() {
        let err = ContextError::CapacityExceeded {
            len: 300,
            capacity: 256,
        };
        assert_eq!(FfiResult::from(&err), FfiResult::CapacityExceeded);
        assert_eq!(
            FfiResult::from(&ContextError::AllocationFailure) as i32,
            4
        );
        assert_eq!(
            FfiResult::from(&ContextError::InteriorNul { offset: 0 }),
            FfiResult::InvalidArgument
        );
    }
}
