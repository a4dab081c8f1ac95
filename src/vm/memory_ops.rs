use crate::memory::header::{payload, read_header};
use crate::memory::stack::Root;
use crate::memory::value::{Address, MemoryRegion, Value};
use crate::types::{Layout, TypeTag};
use crate::vm::constants::{
    ADDRESS_SIZE, SLICE_CAPACITY_OFFSET, SLICE_HEADER_SIZE, SLICE_SIZE, STR_HEADER_SIZE,
};
use crate::vm::errors::{MemoryError, Result};
use crate::vm::machine::Vm;

impl Vm {
    /// Read a basic-typed value stored at `addr`
    pub fn read_value(&self, addr: Address, tag: TypeTag) -> Result<Value> {
        let size = self.types().size_of(tag)?;
        Value::from_bytes(tag, self.arena.read(addr, size)?)
    }

    /// Store a value at `addr` using its tag's width
    pub fn write_value(&mut self, addr: Address, value: &Value) -> Result<()> {
        self.arena.write(addr, &value.to_bytes())
    }

    fn object_size(&self, addr: Address) -> Result<u32> {
        if self.arena.is_null(addr) {
            return Err(MemoryError::invalid(addr, 0));
        }
        Ok(read_header(&self.arena, addr)?.size)
    }

    // === Strings ===

    /// Allocate an immutable string object
    pub fn alloc_str(&mut self, text: &str) -> Result<Address> {
        let len = text.len() as u32;
        let addr = self.allocate(STR_HEADER_SIZE + len)?;
        let body = payload(addr);
        self.arena.write_u32(body, len)?;
        self.arena.write(body + STR_HEADER_SIZE, text.as_bytes())?;
        Ok(addr)
    }

    pub fn read_str(&self, addr: Address) -> Result<String> {
        let size = self.object_size(addr)?;
        let body = payload(addr);
        let len = self.arena.read_u32(body)?;
        if STR_HEADER_SIZE as u64 + len as u64 > size as u64 {
            return Err(MemoryError::invalid(body, len));
        }
        let bytes = self.arena.read(body + STR_HEADER_SIZE, len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| MemoryError::invariant(format!("string at 0x{:x} is not UTF-8", addr)))
    }

    // === Slices ===

    /// Allocate an empty slice; `None` capacity means `SLICE_SIZE` elements
    pub fn alloc_slice(&mut self, elem_size: u32, capacity: Option<u32>) -> Result<Address> {
        let capacity = capacity.unwrap_or(SLICE_SIZE);
        let size = capacity
            .checked_mul(elem_size)
            .and_then(|bytes| bytes.checked_add(SLICE_HEADER_SIZE))
            .ok_or(MemoryError::OutOfMemory {
                requested: u32::MAX,
                available: self.free_heap_bytes(),
            })?;
        let addr = self.allocate(size)?;
        self.arena
            .write_u32(payload(addr) + SLICE_CAPACITY_OFFSET, capacity)?;
        Ok(addr)
    }

    fn slice_header(&self, addr: Address) -> Result<(u32, u32)> {
        let size = self.object_size(addr)?;
        if size < SLICE_HEADER_SIZE {
            return Err(MemoryError::invalid(payload(addr), SLICE_HEADER_SIZE));
        }
        let body = payload(addr);
        Ok((
            self.arena.read_u32(body)?,
            self.arena.read_u32(body + SLICE_CAPACITY_OFFSET)?,
        ))
    }

    pub fn slice_len(&self, addr: Address) -> Result<u32> {
        Ok(self.slice_header(addr)?.0)
    }

    pub fn slice_capacity(&self, addr: Address) -> Result<u32> {
        Ok(self.slice_header(addr)?.1)
    }

    fn element_addr(&self, addr: Address, index: u32, elem_size: u32) -> Result<Address> {
        let (len, _) = self.slice_header(addr)?;
        let at = payload(addr) + SLICE_HEADER_SIZE + index.saturating_mul(elem_size);
        if index >= len {
            return Err(MemoryError::invalid(at, elem_size));
        }
        Ok(at)
    }

    pub fn slice_get(&self, addr: Address, index: u32, elem_size: u32) -> Result<&[u8]> {
        let at = self.element_addr(addr, index, elem_size)?;
        self.arena.read(at, elem_size)
    }

    pub fn slice_set(&mut self, addr: Address, index: u32, elem: &[u8]) -> Result<()> {
        let at = self.element_addr(addr, index, elem.len() as u32)?;
        self.arena.write(at, elem)
    }

    /// Append `elem` to the slice held in the stack slot `slot`
    ///
    /// A null slot starts a new slice. When the slice is full it is copied into one
    /// with capacity `max(2 * cap, SLICE_SIZE)`. While that allocation runs the slot,
    /// and for reference slices the new element, are held as roots, so a collection
    /// in between cannot lose them. The slot is updated and the current slice address
    /// returned.
    pub fn slice_append(&mut self, slot: Address, layout: Layout, elem: &[u8]) -> Result<Address> {
        if self.arena.region(slot) != Some(MemoryRegion::Stack) {
            return Err(MemoryError::invalid(slot, ADDRESS_SIZE));
        }
        let mut elem = elem.to_vec();
        let elem_size = elem.len() as u32;
        if matches!(layout, Layout::Slice(_)) && elem_size != ADDRESS_SIZE {
            return Err(MemoryError::invariant(format!(
                "reference slice element must be {} bytes, got {}",
                ADDRESS_SIZE, elem_size
            )));
        }
        let current = self.arena.read_u32(slot)?;
        let (len, cap) = if self.arena.is_null(current) {
            (0, 0)
        } else {
            self.slice_header(current)?
        };

        let target = if len < cap {
            current
        } else {
            let new_cap = cap.saturating_mul(2).max(SLICE_SIZE);
            let pinned = self.scratch_roots.len();
            let elem_slot = match &layout {
                Layout::Slice(inner) => {
                    let tmp = self.arena.stack_alloc(ADDRESS_SIZE)?;
                    self.arena.write(tmp, &elem)?;
                    self.scratch_roots.push(Root::new(tmp, (**inner).clone()));
                    Some(tmp)
                }
                _ => None,
            };
            self.scratch_roots.push(Root::new(slot, layout));
            let grown = self.alloc_slice(elem_size, Some(new_cap));
            self.scratch_roots.truncate(pinned);
            if let Some(tmp) = elem_slot {
                elem = self.arena.read(tmp, ADDRESS_SIZE)?.to_vec();
                self.arena.stack_release_to(tmp)?;
            }
            let grown = grown?;

            let old = self.arena.read_u32(slot)?;
            if !self.arena.is_null(old) {
                let elems = payload(old) + SLICE_HEADER_SIZE;
                self.arena
                    .move_bytes(elems, payload(grown) + SLICE_HEADER_SIZE, len * elem_size)?;
            }
            grown
        };

        let body = payload(target);
        self.arena
            .write(body + SLICE_HEADER_SIZE + len * elem_size, &elem)?;
        self.arena.write_u32(body, len + 1)?;
        self.arena.write_u32(slot, target)?;
        Ok(target)
    }
}
