//! Heap walking and reference enumeration shared by the mark and fix-up phases

use crate::memory::arena::Arena;
use crate::memory::header::{payload, read_header, ObjectHeader};
use crate::memory::value::Address;
use crate::types::registry::TypeRegistry;
use crate::types::Layout;
use crate::vm::constants::{ADDRESS_SIZE, SLICE_HEADER_SIZE};
use crate::vm::errors::{MemoryError, Result};

/// Every object from the heap base to the free pointer, in address order
///
/// Fails if a header is unreadable or claims a size that runs past the free pointer.
pub(crate) fn walk_heap(arena: &Arena) -> Result<Vec<(Address, ObjectHeader)>> {
    let mut objects = Vec::new();
    let mut cursor = arena.heap_base();
    while cursor < arena.heap_free() {
        let header = read_header(arena, cursor)?;
        let next = cursor
            .checked_add(header.total_size())
            .filter(|&end| end <= arena.heap_free())
            .ok_or_else(|| {
                MemoryError::invariant(format!(
                    "header at 0x{:x} claims {} bytes past the free pointer 0x{:x}",
                    cursor,
                    header.size,
                    arena.heap_free()
                ))
            })?;
        objects.push((cursor, header));
        cursor = next;
    }
    Ok(objects)
}

/// Fail unless `target` is the start of a known object
pub(crate) fn check_object(
    objects: &[(Address, ObjectHeader)],
    target: Address,
    slot: Address,
) -> Result<()> {
    if objects.binary_search_by_key(&target, |o| o.0).is_err() {
        return Err(MemoryError::invariant(format!(
            "slot 0x{:x} refers to 0x{:x}, which is not an object",
            slot, target
        )));
    }
    Ok(())
}

/// Reference slots in the payload of the object at `addr`, each with its target layout
pub(crate) fn edges<'a>(
    arena: &Arena,
    types: &'a TypeRegistry,
    addr: Address,
    header: &ObjectHeader,
    layout: &'a Layout,
) -> Result<Vec<(Address, &'a Layout)>> {
    let body = payload(addr);
    let fits = |offset: u32, len: u32| -> Result<()> {
        if offset as u64 + len as u64 > header.size as u64 {
            return Err(MemoryError::invariant(format!(
                "object at 0x{:x} ({} bytes) too small for reference at offset {}",
                addr, header.size, offset
            )));
        }
        Ok(())
    };

    let edges = match layout {
        Layout::Leaf => Vec::new(),
        Layout::Pointer(inner) => {
            fits(0, ADDRESS_SIZE)?;
            vec![(body, &**inner)]
        }
        Layout::Slice(inner) => {
            fits(0, SLICE_HEADER_SIZE)?;
            let len = arena.read_u32(body)?;
            fits(SLICE_HEADER_SIZE, len.saturating_mul(ADDRESS_SIZE))?;
            (0..len)
                .map(|i| (body + SLICE_HEADER_SIZE + i * ADDRESS_SIZE, &**inner))
                .collect()
        }
        Layout::Struct(tag) => {
            let mut edges = Vec::new();
            for field in types.struct_fields(*tag)? {
                if let Some(target) = &field.reference {
                    fits(field.offset, ADDRESS_SIZE)?;
                    edges.push((body + field.offset, target));
                }
            }
            edges
        }
    };
    Ok(edges)
}
