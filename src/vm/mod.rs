//! Virtual machine context
//!
//! This module provides the pieces the interpreter talks to:
//! - [`machine`]: the [`machine::Vm`] context owning arena, registries and roots
//! - [`memory_ops`]: typed values, strings and slices on top of the arena
//! - [`natives`]: the native operation registry
//! - [`config`] and [`constants`]: region sizes and byte widths
//! - [`errors`]: the fatal [`errors::MemoryError`] kinds
//!
//! # Execution Model
//!
//! Single-threaded and run-to-completion. The only point where interpreted code can
//! observe a collection is an allocation call, which blocks until the pass is done.

pub mod config;
pub mod constants;
pub mod errors;
pub mod machine;
pub mod memory_ops;
pub mod natives;
