//! The VM context
//!
//! [`Vm`] owns everything one virtual machine instance needs from the memory
//! manager: the arena, the type and native registries, the call stack and the root
//! set. Nothing is global, so independent instances never share state.
//!
//! # Allocation
//!
//! [`Vm::allocate`] bumps the heap free pointer. When the heap is full it runs one
//! collection over the current roots and retries; a second failure is a fatal
//! [`MemoryError::OutOfMemory`]. Any address held outside a registered root is stale
//! after an allocation call.

use super::config::MemoryConfig;
use super::constants::ADDRESS_SIZE;
use super::errors::{MemoryError, Result};
use super::natives::NativeRegistry;
use crate::gc::{self, GcStats};
use crate::memory::arena::Arena;
use crate::memory::header::{payload, write_header};
use crate::memory::stack::{CallStack, Root, StackFrame};
use crate::memory::value::Address;
use crate::types::registry::TypeRegistry;
use crate::types::{Field, Layout, TypeTag};

#[derive(Debug, Clone)]
pub struct Vm {
    pub(crate) arena: Arena,
    types: TypeRegistry,
    natives: NativeRegistry,
    call_stack: CallStack,
    globals: Vec<Root>,
    globals_end: Address,
    /// Roots held for the duration of a multi-step operation
    pub(crate) scratch_roots: Vec<Root>,
    collections: usize,
    total_freed_bytes: u64,
}

impl Vm {
    pub fn new() -> Self {
        Self::with_config(MemoryConfig::default())
    }

    pub fn with_config(config: MemoryConfig) -> Self {
        Vm {
            arena: Arena::new(config.stack_size, config.heap_size),
            types: TypeRegistry::new(),
            natives: NativeRegistry::new(),
            call_stack: CallStack::new(config.max_call_depth),
            globals: Vec::new(),
            globals_end: 0,
            scratch_roots: Vec::new(),
            collections: 0,
            total_freed_bytes: 0,
        }
    }

    // === Heap ===

    /// Allocate an object with a `size`-byte payload, collecting once if needed
    ///
    /// Returns the object address; the payload is zeroed.
    pub fn allocate(&mut self, size: u32) -> Result<Address> {
        let addr = match self.arena.bump(size) {
            Ok(addr) => addr,
            Err(MemoryError::OutOfMemory { .. }) => {
                self.collect()?;
                self.arena.bump(size).inspect_err(|e| {
                    log::warn!("allocation of {} bytes failed after collection: {}", size, e)
                })?
            }
            Err(e) => return Err(e),
        };
        write_header(&mut self.arena, addr, size)?;
        self.arena.write(payload(addr), &vec![0; size as usize])?;
        Ok(addr)
    }

    /// Run a full collection over the current roots
    pub fn collect(&mut self) -> Result<GcStats> {
        let roots = self
            .globals
            .iter()
            .chain(self.call_stack.roots())
            .chain(self.scratch_roots.iter());
        let stats = gc::collect(&mut self.arena, &self.types, roots)?;
        self.collections += 1;
        self.total_freed_bytes += stats.freed_bytes as u64;
        Ok(stats)
    }

    /// Number of completed collections
    pub fn collections(&self) -> usize {
        self.collections
    }

    pub fn total_freed_bytes(&self) -> u64 {
        self.total_freed_bytes
    }

    /// Raw bytes left before the heap is full
    pub fn free_heap_bytes(&self) -> u32 {
        self.arena.free_heap_bytes()
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    // === Raw access ===

    pub fn read(&self, addr: Address, len: u32) -> Result<&[u8]> {
        self.arena.read(addr, len)
    }

    pub fn write(&mut self, addr: Address, bytes: &[u8]) -> Result<()> {
        self.arena.write(addr, bytes)
    }

    pub fn read_u32(&self, addr: Address) -> Result<u32> {
        self.arena.read_u32(addr)
    }

    pub fn write_u32(&mut self, addr: Address, value: u32) -> Result<()> {
        self.arena.write_u32(addr, value)
    }

    // === Stack ===

    pub fn stack_alloc(&mut self, size: u32) -> Result<Address> {
        self.arena.stack_alloc(size)
    }

    /// Release the top `size` stack bytes; frames and globals cannot be released this way
    pub fn stack_free(&mut self, size: u32) -> Result<()> {
        let floor = self
            .call_stack
            .current_frame()
            .map_or(self.globals_end, |frame| frame.base + frame.size);
        let sp = self.arena.stack_pointer();
        if sp.checked_sub(size).map_or(true, |new| new < floor) {
            return Err(MemoryError::invalid(sp.saturating_sub(size), size));
        }
        self.arena.stack_free(size)
    }

    /// Enter a function: reserve its frame on the stack
    ///
    /// Fails with [`MemoryError::StackOverflow`] when the depth limit is reached or the
    /// frame does not fit.
    pub fn push_frame(&mut self, function_name: &str, frame_size: u32) -> Result<Address> {
        if !self.call_stack.has_room() {
            return Err(MemoryError::StackOverflow {
                requested: frame_size,
                depth: self.call_stack.depth(),
                limit: self.call_stack.max_depth(),
            });
        }
        let base = self.arena.stack_alloc(frame_size)?;
        self.call_stack
            .push_frame(StackFrame::new(function_name.to_string(), base, frame_size))?;
        Ok(base)
    }

    /// Leave the current function, releasing its stack bytes and roots
    pub fn pop_frame(&mut self) -> Result<StackFrame> {
        let frame = self
            .call_stack
            .pop_frame()
            .ok_or_else(|| MemoryError::invariant("pop_frame with no active frame"))?;
        self.arena.stack_release_to(frame.base)?;
        Ok(frame)
    }

    /// Register a slot of the current frame as holding a reference
    pub fn track_local(&mut self, slot: Address, layout: Layout) -> Result<()> {
        let frame = self
            .call_stack
            .current_frame_mut()
            .ok_or_else(|| MemoryError::invariant("track_local with no active frame"))?;
        if !frame.contains(slot, ADDRESS_SIZE) {
            return Err(MemoryError::invalid(slot, ADDRESS_SIZE));
        }
        frame.track(Root::new(slot, layout));
        Ok(())
    }

    /// Reserve a global slot below every frame
    ///
    /// With a layout the slot becomes a root. Only allowed before the first frame.
    pub fn declare_global(&mut self, size: u32, layout: Option<Layout>) -> Result<Address> {
        if !self.call_stack.is_empty() {
            return Err(MemoryError::invariant(
                "globals must be declared before any frame is pushed",
            ));
        }
        let addr = self.arena.stack_alloc(size)?;
        self.globals_end = self.arena.stack_pointer();
        if let Some(layout) = layout {
            self.globals.push(Root::new(addr, layout));
        }
        Ok(addr)
    }

    pub fn call_stack(&self) -> &CallStack {
        &self.call_stack
    }

    // === Registries ===

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    pub fn tag_of(&self, name: &str) -> Result<TypeTag> {
        self.types.tag_of(name)
    }

    pub fn name_of(&self, tag: TypeTag) -> Result<&str> {
        self.types.name_of(tag)
    }

    pub fn is_basic(&self, tag: TypeTag) -> bool {
        self.types.is_basic(tag)
    }

    pub fn register_custom(&mut self, name: &str) -> Result<TypeTag> {
        self.types.register_custom(name)
    }

    pub fn register_struct(&mut self, name: &str, fields: Vec<Field>) -> Result<TypeTag> {
        self.types.register_struct(name, fields)
    }

    pub fn natives(&self) -> &NativeRegistry {
        &self.natives
    }

    pub fn is_native(&self, name: &str) -> bool {
        self.natives.is_native(name)
    }
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}
