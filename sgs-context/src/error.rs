//! Errors surfaced by context construction and config loading.

use std::path::PathBuf;

/// Construction failures. Every other context operation is total.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContextError {
    /// Hostname plus its terminator does not fit the hostname buffer.
    #[error("hostname is {len} bytes, capacity is {capacity} including terminator")]
    CapacityExceeded { len: usize, capacity: usize },
    /// Hostname contains a NUL byte, which a C engine would read as the end
    /// of the string.
    #[error("hostname contains a NUL byte at offset {offset}")]
    InteriorNul { offset: usize },
    /// Storage for the context could not be reserved.
    #[error("could not allocate connection context")]
    AllocationFailure,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("can't read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("bad config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("SGS_PORT is not an integer: {0:?}")]
    InvalidPort(String),
}
