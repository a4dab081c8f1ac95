//! # Introduction
//!
//! cxvm is the memory manager of a stack/heap virtual machine for a compiled
//! language. A single fixed-size arena backs both the call stack and a
//! garbage-collected heap; a moving mark-then-relocate collector compacts the heap
//! and rewrites every reference to the objects it moves.
//!
//! ## Layers
//!
//! ```text
//! Compiler ─ types, layouts ─▶ Vm ─▶ Arena ◀─ Collector
//!                               │
//!                               ├─ TypeRegistry
//!                               └─ NativeRegistry
//! ```
//!
//! 1. [`memory`]: the arena, object headers, call frames and tagged values.
//! 2. [`types`]: type tags, the type registry and heap object layouts.
//! 3. [`gc`]: the mark-then-relocate collector.
//! 4. [`vm`]: the [`vm::machine::Vm`] context the interpreter calls into, the
//!    native operation registry, constants and errors.
//! 5. [`snapshot`]: read-only heap listings for diagnostics.
//!
//! ## Example
//!
//! ```
//! use cxvm::types::Layout;
//! use cxvm::vm::machine::Vm;
//!
//! let mut vm = Vm::new();
//! let slot = vm.push_frame("main", 4).unwrap();
//! let text = vm.alloc_str("hello").unwrap();
//! vm.write_u32(slot, text).unwrap();
//! vm.track_local(slot, Layout::Leaf).unwrap();
//!
//! vm.collect().unwrap();
//! let text = vm.read_u32(slot).unwrap();
//! assert_eq!(vm.read_str(text).unwrap(), "hello");
//! ```

pub mod gc;
pub mod memory;
pub mod snapshot;
pub mod types;
pub mod vm;

pub use memory::value::{Address, Value};
pub use vm::errors::{MemoryError, Result};
pub use vm::machine::Vm;
