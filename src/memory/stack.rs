//! Call stack implementation
//!
//! This module provides the frame bookkeeping that sits on top of the arena's stack
//! region:
//! - [`CallStack`]: bounded stack of activations
//! - [`StackFrame`]: one function's activation record
//! - [`Root`]: a slot holding a heap reference, with the layout of its target
//!
//! Frame bytes live in the arena; a frame only remembers where it starts, how large
//! it is, and which of its slots the collector must treat as roots.

use super::value::Address;
use crate::types::Layout;
use crate::vm::errors::{MemoryError, Result};

/// Reachability starting point for the collector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Root {
    /// Stack or global slot holding a 4-byte heap address
    pub slot: Address,
    /// Layout of the object the slot refers to
    pub layout: Layout,
}

impl Root {
    pub fn new(slot: Address, layout: Layout) -> Self {
        Root { slot, layout }
    }
}

/// Stack frame for a function call
#[derive(Debug, Clone)]
pub struct StackFrame {
    pub function_name: String,
    pub base: Address,
    pub size: u32,
    roots: Vec<Root>,
}

impl StackFrame {
    pub fn new(function_name: String, base: Address, size: u32) -> Self {
        StackFrame {
            function_name,
            base,
            size,
            roots: Vec::new(),
        }
    }

    /// Whether `len` bytes at `slot` lie inside this frame
    pub fn contains(&self, slot: Address, len: u32) -> bool {
        slot >= self.base && slot as u64 + len as u64 <= self.base as u64 + self.size as u64
    }

    /// Register a local slot as a root
    pub fn track(&mut self, root: Root) {
        self.roots.push(root);
    }

    pub fn roots(&self) -> &[Root] {
        &self.roots
    }
}

/// The call stack
#[derive(Debug, Clone)]
pub struct CallStack {
    frames: Vec<StackFrame>,
    max_depth: usize,
}

impl CallStack {
    pub fn new(max_depth: usize) -> Self {
        CallStack {
            frames: Vec::new(),
            max_depth,
        }
    }

    /// Push a new stack frame; fails once the depth limit is reached
    pub fn push_frame(&mut self, frame: StackFrame) -> Result<()> {
        if self.frames.len() >= self.max_depth {
            return Err(MemoryError::StackOverflow {
                requested: frame.size,
                depth: self.frames.len(),
                limit: self.max_depth,
            });
        }
        self.frames.push(frame);
        Ok(())
    }

    /// Pop the top stack frame
    pub fn pop_frame(&mut self) -> Option<StackFrame> {
        self.frames.pop()
    }

    /// Whether another frame can be pushed
    pub fn has_room(&self) -> bool {
        self.frames.len() < self.max_depth
    }

    /// Get the current (top) frame
    pub fn current_frame(&self) -> Option<&StackFrame> {
        self.frames.last()
    }

    /// Get a mutable reference to the current frame
    pub fn current_frame_mut(&mut self) -> Option<&mut StackFrame> {
        self.frames.last_mut()
    }

    pub fn frames(&self) -> &[StackFrame] {
        &self.frames
    }

    /// Get the depth of the call stack
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Roots of every active frame, outermost first
    pub fn roots(&self) -> impl Iterator<Item = &Root> {
        self.frames.iter().flat_map(|frame| frame.roots.iter())
    }
}

impl Default for CallStack {
    fn default() -> Self {
        Self::new(crate::vm::constants::CALLSTACK_SIZE)
    }
}
