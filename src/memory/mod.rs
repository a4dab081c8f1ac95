//! Memory model for the virtual machine
//!
//! This module provides the core memory abstractions:
//! - [`arena`]: the single fixed buffer backing both stack and heap
//! - [`header`]: the 9-byte header in front of every heap object
//! - [`stack`]: call frames and the roots they hold
//! - [`value`]: addresses, regions and tagged scalar values
//!
//! # Addressing
//!
//! Addresses are `u32` offsets into the arena rather than native pointers, so
//! relocating an object is plain data movement:
//! ```text
//! [0, STACK_SIZE)                          stack
//! [STACK_SIZE, STACK_SIZE+INIT_HEAP_SIZE)  heap (first 4 bytes never allocated)
//! [.., +TYPE_POINTER_SIZE)                 trailing type slot
//! ```
//!
//! A heap reference always names the object header; [`header::payload`] gives the
//! first payload byte.

pub mod arena;
pub mod header;
pub mod stack;
pub mod value;
