//! Error types for the memory manager
//!
//! This module defines [`MemoryError`], the single error type surfaced by the arena,
//! the type registry and the collector.
//!
//! All memory errors are fatal at this layer: the memory manager never retries or
//! degrades silently. The interpreter decides whether to abort the VM (the default)
//! or, for [`MemoryError::StackOverflow`] only, unwind into a source-level diagnostic.

use crate::memory::value::Address;
use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, MemoryError>;

/// A type lookup key that missed the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKey {
    Name(String),
    Tag(u32),
}

impl std::fmt::Display for TypeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TypeKey::Name(name) => write!(f, "'{}'", name),
            TypeKey::Tag(tag) => write!(f, "tag {}", tag),
        }
    }
}

/// Fatal memory manager errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    /// Heap exhausted even after a collection
    #[error("Out of memory: requested {requested} bytes, {available} bytes available")]
    OutOfMemory { requested: u32, available: u32 },

    /// Stack bump pointer or call depth exceeded its bound
    #[error("Stack overflow: requested {requested} bytes at depth {depth} (limit {limit})")]
    StackOverflow {
        requested: u32,
        depth: usize,
        limit: usize,
    },

    /// Access outside the arena or into never-allocated space
    #[error("Invalid address 0x{address:x} (length {len})")]
    InvalidAddress { address: u32, len: u32 },

    /// Type name or tag lookup miss
    #[error("Unknown type {0}")]
    UnknownType(TypeKey),

    /// Corrupt header, dangling reference or forwarding cycle
    #[error("Heap invariant violated: {message}")]
    InvariantViolation { message: String },
}

impl MemoryError {
    pub(crate) fn invalid(address: Address, len: u32) -> Self {
        MemoryError::InvalidAddress { address, len }
    }

    pub(crate) fn invariant(message: impl Into<String>) -> Self {
        MemoryError::InvariantViolation {
            message: message.into(),
        }
    }

    /// Whether the interpreter may unwind this error into a source diagnostic
    pub fn is_stack_overflow(&self) -> bool {
        matches!(self, MemoryError::StackOverflow { .. })
    }
}
