//! Mark phase
//!
//! Traces from the roots with an explicit work-list, so deep structures cost heap
//! memory rather than native stack. The mark bit is checked before an object's
//! children are pushed, which breaks cycles.

use super::trace::{check_object, edges};
use crate::memory::arena::Arena;
use crate::memory::header::{read_header, set_mark, ObjectHeader};
use crate::memory::stack::Root;
use crate::memory::value::Address;
use crate::types::registry::TypeRegistry;
use crate::types::Layout;
use crate::vm::errors::Result;

/// Mark everything reachable from `roots`
///
/// Returns each marked object with the layout it was reached through, in marking
/// order.
pub(crate) fn mark<'a>(
    arena: &mut Arena,
    types: &'a TypeRegistry,
    roots: &[&'a Root],
    objects: &[(Address, ObjectHeader)],
) -> Result<Vec<(Address, &'a Layout)>> {
    let mut worklist: Vec<(Address, &'a Layout)> = Vec::new();
    for &root in roots {
        let target = arena.read_u32(root.slot)?;
        if arena.is_null(target) {
            continue;
        }
        check_object(objects, target, root.slot)?;
        worklist.push((target, &root.layout));
    }

    let mut live = Vec::new();
    while let Some((addr, layout)) = worklist.pop() {
        let header = read_header(arena, addr)?;
        if header.marked {
            continue;
        }
        set_mark(arena, addr, true)?;
        live.push((addr, layout));

        for (slot, child_layout) in edges(arena, types, addr, &header, layout)? {
            let target = arena.read_u32(slot)?;
            if arena.is_null(target) {
                continue;
            }
            check_object(objects, target, slot)?;
            if !read_header(arena, target)?.marked {
                worklist.push((target, child_layout));
            }
        }
    }
    Ok(live)
}
