//! Typed failures for the allocator, collector, and ordered containers.

use thiserror::Error;

/// Recoverable and fatal failure modes of the allocator/collector subsystem.
#[derive(Debug, Error)]
pub enum GcError {
    /// An arena reached its reserved size, or a GC allocator hit its hard
    /// tenured/nursery limit without being able to free space.
    #[error("allocator '{allocator}' exhausted: requested {requested} bytes, {available} available")]
    AllocatorExhausted {
        /// Name of the allocator that failed, for diagnostics.
        allocator: String,
        /// Bytes requested by the failed allocation.
        requested: usize,
        /// Bytes available at the time of failure.
        available: usize,
    },

    /// A contract the implementation is supposed to maintain was observed
    /// to fail. This is always a bug, not a recoverable condition.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// `forward_inplace` encountered a pointer that belongs to neither the
    /// from-space nor the to-space of the generation being scanned.
    #[error("stray reference at address {0:#x}")]
    StrayReference(usize),
}

/// Failures surfaced by the ordered containers (B+-tree, red/black tree).
#[derive(Debug, Error)]
pub enum IndexError {
    /// `at(k)` was called for a key that is not present.
    #[error("lookup miss: key not found")]
    LookupMiss,

    /// An iterator was dereferenced past its sentinel, or used after the
    /// tree it was taken from was mutated.
    #[error("iterator misuse: {0}")]
    IteratorMisuse(String),

    /// The underlying allocator failed while the container needed a new
    /// node.
    #[error(transparent)]
    Allocator(#[from] GcError),
}

/// Failures produced by the tokenizer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("parse error at position {position} (char {offending:?}): {message}")]
pub struct ParseError {
    /// Byte offset within the current token where the error was detected.
    pub position: usize,
    /// The offending character, if any was consumed.
    pub offending: Option<char>,
    /// Human-readable explanation.
    pub message: String,
}
