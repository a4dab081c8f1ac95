//! Relocate, fix-up and slide
//!
//! Forwarding addresses are assigned before any byte moves, and references are
//! rewritten before the slide, so an old header is never overwritten while its
//! forwarding address is still needed. Survivors keep their relative address order.

use super::trace::edges;
use super::GcStats;
use crate::memory::arena::Arena;
use crate::memory::header::{read_header, set_forwarding, write_header, Forwarding, ObjectHeader};
use crate::memory::stack::Root;
use crate::memory::value::Address;
use crate::types::registry::TypeRegistry;
use crate::types::Layout;
use crate::vm::errors::{MemoryError, Result};
use rustc_hash::FxHashSet;

/// Assign each marked object its compacted address
///
/// Returns the new end of the live region.
pub(crate) fn assign_forwarding(
    arena: &mut Arena,
    objects: &[(Address, ObjectHeader)],
    stats: &mut GcStats,
) -> Result<Address> {
    let mut cursor = arena.heap_base();
    for &(addr, _) in objects {
        let header = read_header(arena, addr)?;
        if header.marked {
            set_forwarding(arena, addr, Forwarding::MovedTo(cursor))?;
            stats.live_objects += 1;
            stats.live_bytes += header.total_size();
            if cursor != addr {
                stats.moved_objects += 1;
            }
            cursor += header.total_size();
        } else {
            stats.freed_objects += 1;
            stats.freed_bytes += header.total_size();
        }
    }
    Ok(cursor)
}

/// Where the object at `target` is going
fn resolve(arena: &Arena, target: Address, live_end: Address) -> Result<Address> {
    let header = read_header(arena, target)?;
    match header.forwarding {
        Forwarding::MovedTo(new) if !header.marked => Err(MemoryError::invariant(format!(
            "unmarked object at 0x{:x} forwarded to 0x{:x}",
            target, new
        ))),
        Forwarding::MovedTo(new) if new > target || new < arena.heap_base() || new >= live_end => {
            Err(MemoryError::invariant(format!(
                "forwarding cycle: object at 0x{:x} forwarded to 0x{:x}",
                target, new
            )))
        }
        Forwarding::MovedTo(new) => Ok(new),
        Forwarding::Unmoved => Err(MemoryError::invariant(format!(
            "reference to unreached object at 0x{:x}",
            target
        ))),
    }
}

fn rewrite_slot(arena: &mut Arena, slot: Address, live_end: Address) -> Result<()> {
    let target = arena.read_u32(slot)?;
    if arena.is_null(target) {
        return Ok(());
    }
    let new = resolve(arena, target, live_end)?;
    if new != target {
        arena.write_u32(slot, new)?;
    }
    Ok(())
}

/// Rewrite every root and every internal reference of the survivors
pub(crate) fn fix_up(
    arena: &mut Arena,
    types: &TypeRegistry,
    roots: &[&Root],
    live: &[(Address, &Layout)],
    live_end: Address,
) -> Result<()> {
    // A slot registered twice must only be rewritten once
    let mut seen = FxHashSet::default();
    for root in roots {
        if seen.insert(root.slot) {
            rewrite_slot(arena, root.slot, live_end)?;
        }
    }

    for &(addr, layout) in live {
        let header = read_header(arena, addr)?;
        for (slot, _) in edges(arena, types, addr, &header, layout)? {
            rewrite_slot(arena, slot, live_end)?;
        }
    }
    Ok(())
}

/// Move survivors to their forwarding addresses and reset their headers
pub(crate) fn slide(arena: &mut Arena, objects: &[(Address, ObjectHeader)]) -> Result<()> {
    for &(addr, _) in objects {
        let header = read_header(arena, addr)?;
        if !header.marked {
            continue;
        }
        let Forwarding::MovedTo(new) = header.forwarding else {
            return Err(MemoryError::invariant(format!(
                "marked object at 0x{:x} has no forwarding address",
                addr
            )));
        };
        if new != addr {
            log::trace!(
                "moving {} byte object 0x{:x} -> 0x{:x}",
                header.size,
                addr,
                new
            );
            arena.move_bytes(addr, new, header.total_size())?;
        }
        write_header(arena, new, header.size)?;
    }
    Ok(())
}
