// Heap snapshots for diagnostics and tests

use crate::gc::trace::walk_heap;
use crate::memory::value::Address;
use crate::vm::errors::Result;
use crate::vm::machine::Vm;

/// One heap object as seen by a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectInfo {
    pub address: Address,
    /// Payload size (header excluded)
    pub size: u32,
}

/// Read-only picture of the arena at one point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeapSnapshot {
    pub objects: Vec<ObjectInfo>,
    pub heap_free: Address,
    pub stack_pointer: Address,
    pub frame_depth: usize,
}

impl HeapSnapshot {
    /// Bytes occupied by objects, headers included
    pub fn used_bytes(&self, heap_base: Address) -> u32 {
        self.heap_free - heap_base
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Payload sizes in address order
    pub fn sizes(&self) -> Vec<u32> {
        self.objects.iter().map(|o| o.size).collect()
    }

    pub fn object_at(&self, address: Address) -> Option<&ObjectInfo> {
        self.objects.iter().find(|o| o.address == address)
    }
}

impl Vm {
    /// Walk the heap and capture every object currently allocated
    pub fn snapshot(&self) -> Result<HeapSnapshot> {
        let objects = walk_heap(&self.arena)?
            .into_iter()
            .map(|(address, header)| ObjectInfo {
                address,
                size: header.size,
            })
            .collect();
        Ok(HeapSnapshot {
            objects,
            heap_free: self.arena.heap_free(),
            stack_pointer: self.arena.stack_pointer(),
            frame_depth: self.call_stack().depth(),
        })
    }
}
