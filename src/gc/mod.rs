//! Mark-then-relocate garbage collector
//!
//! Single-threaded and stop-the-world. One pass runs these steps:
//!
//! 1. **Walk** the heap from the base to the free pointer, validating every header.
//! 2. **Mark** everything reachable from the roots.
//! 3. **Relocate**: assign each survivor its compacted address, in address order.
//! 4. **Fix-up**: rewrite roots and internal references through forwarding.
//! 5. **Reset**: slide survivors down, clear their headers, move the free pointer.
//!
//! Any inconsistency found mid-pass is a fatal
//! [`MemoryError::InvariantViolation`](crate::vm::errors::MemoryError::InvariantViolation).
//! Identical roots and live sets always compact to identical addresses.

mod compact;
mod mark;
pub(crate) mod trace;

use crate::memory::arena::Arena;
use crate::memory::header::Forwarding;
use crate::memory::stack::Root;
use crate::types::registry::TypeRegistry;
use crate::vm::errors::{MemoryError, Result};

/// Outcome of one collection pass (byte counts include headers)
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GcStats {
    pub live_objects: usize,
    pub live_bytes: u32,
    pub freed_objects: usize,
    pub freed_bytes: u32,
    pub moved_objects: usize,
}

/// Run one full collection over `arena`
pub fn collect<'a, I>(arena: &mut Arena, types: &'a TypeRegistry, roots: I) -> Result<GcStats>
where
    I: IntoIterator<Item = &'a Root>,
{
    let roots: Vec<&Root> = roots.into_iter().collect();
    log::debug!(
        "gc start: {} roots, {} heap bytes in use",
        roots.len(),
        arena.heap_free() - arena.heap_base()
    );

    let objects = trace::walk_heap(arena)?;
    if let Some((addr, _)) = objects
        .iter()
        .find(|(_, h)| h.marked || h.forwarding != Forwarding::Unmoved)
    {
        return Err(MemoryError::invariant(format!(
            "stale collector state in header at 0x{:x}",
            addr
        )));
    }

    let live = mark::mark(arena, types, &roots, &objects)?;

    let mut stats = GcStats::default();
    let live_end = compact::assign_forwarding(arena, &objects, &mut stats)?;
    compact::fix_up(arena, types, &roots, &live, live_end)?;
    compact::slide(arena, &objects)?;
    arena.set_heap_free(live_end);

    log::debug!(
        "gc done: {} live ({} bytes), {} freed ({} bytes), {} moved",
        stats.live_objects,
        stats.live_bytes,
        stats.freed_objects,
        stats.freed_bytes,
        stats.moved_objects
    );
    Ok(stats)
}
