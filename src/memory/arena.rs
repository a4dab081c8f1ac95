//! Memory arena
//!
//! One contiguous byte buffer partitioned into three regions:
//!
//! ```text
//! 0            stack_size     stack_size+4                 heap_end     +4
//! | stack ...  | null skip    | heap objects ... | free ... | type slot |
//!               ^ NULL_ADDRESS  ^ heap_base        ^ heap_free
//! ```
//!
//! Both the stack and the heap are bump-allocated. The arena never collects on its
//! own: when [`Arena::bump`] fails the owning [`Vm`](crate::vm::machine::Vm) runs the
//! collector and retries.
//!
//! Reads and writes are bounds-checked against the *allocated* part of each region,
//! so touching bytes above the stack pointer or the heap free pointer fails with
//! [`MemoryError::InvalidAddress`].

use super::value::{Address, MemoryRegion};
use crate::vm::constants::{
    NULL_HEAP_ADDRESS, NULL_HEAP_ADDRESS_OFFSET, OBJECT_HEADER_SIZE, TYPE_POINTER_SIZE,
};
use crate::vm::errors::{MemoryError, Result};

#[derive(Debug, Clone)]
pub struct Arena {
    bytes: Vec<u8>,
    stack_size: u32,
    heap_size: u32,
    stack_pointer: Address,
    heap_free: Address,
}

impl Arena {
    /// Create an arena with the given region sizes
    ///
    /// The heap is never smaller than its null skip, so a tiny heap is simply full.
    pub fn new(stack_size: u32, heap_size: u32) -> Self {
        let heap_size = heap_size.max(NULL_HEAP_ADDRESS_OFFSET);
        let total = stack_size as usize + heap_size as usize + TYPE_POINTER_SIZE as usize;
        Arena {
            bytes: vec![0; total],
            stack_size,
            heap_size,
            stack_pointer: 0,
            heap_free: stack_size + NULL_HEAP_ADDRESS_OFFSET,
        }
    }

    /// Total arena size in bytes
    pub fn len(&self) -> u32 {
        self.bytes.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn stack_size(&self) -> u32 {
        self.stack_size
    }

    /// First address an object can occupy
    pub fn heap_base(&self) -> Address {
        self.stack_size + NULL_HEAP_ADDRESS_OFFSET
    }

    /// One past the last heap byte
    pub fn heap_end(&self) -> Address {
        self.stack_size + self.heap_size
    }

    /// Current heap free pointer
    pub fn heap_free(&self) -> Address {
        self.heap_free
    }

    /// Raw bytes left between the free pointer and the end of the heap
    pub fn free_heap_bytes(&self) -> u32 {
        self.heap_end().saturating_sub(self.heap_free)
    }

    pub fn stack_pointer(&self) -> Address {
        self.stack_pointer
    }

    /// Whether a stored reference is one of the two null sentinels
    ///
    /// The stack-side sentinel is the first heap byte, which the null skip keeps
    /// free of objects.
    pub fn is_null(&self, addr: Address) -> bool {
        addr == NULL_HEAP_ADDRESS || addr == self.stack_size
    }

    /// Classify an address, `None` when outside the arena
    pub fn region(&self, addr: Address) -> Option<MemoryRegion> {
        if addr < self.stack_size {
            Some(MemoryRegion::Stack)
        } else if addr < self.heap_end() {
            Some(MemoryRegion::Heap)
        } else if addr < self.len() {
            Some(MemoryRegion::Data)
        } else {
            None
        }
    }

    // === Stack ===

    /// Reserve `size` bytes on the stack, returning the address of the first byte
    pub fn stack_alloc(&mut self, size: u32) -> Result<Address> {
        let addr = self.stack_pointer;
        match addr.checked_add(size) {
            Some(end) if end <= self.stack_size => {
                self.stack_pointer = end;
                self.bytes[addr as usize..end as usize].fill(0);
                Ok(addr)
            }
            _ => Err(MemoryError::StackOverflow {
                requested: size,
                depth: addr as usize,
                limit: self.stack_size as usize,
            }),
        }
    }

    /// Release the top `size` bytes of the stack
    pub fn stack_free(&mut self, size: u32) -> Result<()> {
        self.stack_pointer = self
            .stack_pointer
            .checked_sub(size)
            .ok_or_else(|| MemoryError::invalid(self.stack_pointer, size))?;
        Ok(())
    }

    /// Reset the stack pointer to a previously returned address
    pub fn stack_release_to(&mut self, addr: Address) -> Result<()> {
        if addr > self.stack_pointer {
            return Err(MemoryError::invalid(addr, 0));
        }
        self.stack_pointer = addr;
        Ok(())
    }

    // === Heap ===

    /// Reserve a header plus `size` payload bytes at the free pointer
    ///
    /// Returns the object (header) address. Does not write the header.
    pub fn bump(&mut self, size: u32) -> Result<Address> {
        let addr = self.heap_free;
        let end = size
            .checked_add(OBJECT_HEADER_SIZE)
            .and_then(|total| addr.checked_add(total));
        match end {
            Some(end) if end <= self.heap_end() => {
                self.heap_free = end;
                Ok(addr)
            }
            _ => Err(MemoryError::OutOfMemory {
                requested: size.saturating_add(OBJECT_HEADER_SIZE),
                available: self.free_heap_bytes(),
            }),
        }
    }

    pub(crate) fn set_heap_free(&mut self, addr: Address) {
        debug_assert!(addr >= self.heap_base() && addr <= self.heap_end());
        self.heap_free = addr;
    }

    // === Access ===

    fn check(&self, addr: Address, len: u32) -> Result<std::ops::Range<usize>> {
        let end = addr
            .checked_add(len)
            .ok_or_else(|| MemoryError::invalid(addr, len))?;
        let allocated = match self.region(addr) {
            Some(MemoryRegion::Stack) => end <= self.stack_pointer,
            Some(MemoryRegion::Heap) => addr >= self.heap_base() && end <= self.heap_free,
            Some(MemoryRegion::Data) => end <= self.len(),
            None => false,
        };
        if !allocated {
            return Err(MemoryError::invalid(addr, len));
        }
        Ok(addr as usize..end as usize)
    }

    /// Read `len` bytes starting at `addr`
    pub fn read(&self, addr: Address, len: u32) -> Result<&[u8]> {
        let range = self.check(addr, len)?;
        Ok(&self.bytes[range])
    }

    /// Write `bytes` starting at `addr`
    pub fn write(&mut self, addr: Address, bytes: &[u8]) -> Result<()> {
        let range = self.check(addr, bytes.len() as u32)?;
        self.bytes[range].copy_from_slice(bytes);
        Ok(())
    }

    pub fn read_u32(&self, addr: Address) -> Result<u32> {
        let bytes = self.read(addr, 4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn write_u32(&mut self, addr: Address, value: u32) -> Result<()> {
        self.write(addr, &value.to_le_bytes())
    }

    /// Move `len` bytes from `from` to `to` within the heap (ranges may overlap)
    pub(crate) fn move_bytes(&mut self, from: Address, to: Address, len: u32) -> Result<()> {
        let src = self.check(from, len)?;
        self.check(to, len)?;
        self.bytes.copy_within(src, to as usize);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regions() {
        let arena = Arena::new(64, 128);
        assert_eq!(arena.len(), 64 + 128 + TYPE_POINTER_SIZE);
        assert_eq!(arena.region(0), Some(MemoryRegion::Stack));
        assert_eq!(arena.region(63), Some(MemoryRegion::Stack));
        assert_eq!(arena.region(64), Some(MemoryRegion::Heap));
        assert_eq!(arena.region(191), Some(MemoryRegion::Heap));
        assert_eq!(arena.region(192), Some(MemoryRegion::Data));
        assert_eq!(arena.region(196), None);
    }

    #[test]
    fn test_stack_bump() {
        let mut arena = Arena::new(16, 64);
        assert_eq!(arena.stack_alloc(8).unwrap(), 0);
        assert_eq!(arena.stack_alloc(8).unwrap(), 8);
        assert!(arena.stack_alloc(1).unwrap_err().is_stack_overflow());
        arena.stack_free(8).unwrap();
        assert_eq!(arena.stack_pointer(), 8);
        assert!(arena.stack_free(9).is_err());
    }

    #[test]
    fn test_unallocated_access_is_rejected() {
        let mut arena = Arena::new(16, 64);
        arena.stack_alloc(4).unwrap();
        arena.write_u32(0, 7).unwrap();
        assert_eq!(arena.read_u32(0).unwrap(), 7);
        // Above the stack pointer
        assert!(arena.read(4, 1).is_err());
        // Null skip and unallocated heap
        assert!(arena.read(16, 1).is_err());
        assert!(arena.read(arena.heap_base(), 1).is_err());
        // Trailing slot is always addressable
        arena.write_u32(80, 9).unwrap();
        assert_eq!(arena.read_u32(80).unwrap(), 9);
        assert!(arena.read(81, 4).is_err());
    }

    #[test]
    fn test_tiny_heap_is_full() {
        let mut arena = Arena::new(16, 2);
        assert_eq!(arena.heap_end(), arena.heap_base());
        assert_eq!(arena.free_heap_bytes(), 0);
        assert!(arena.bump(0).is_err());
    }

    #[test]
    fn test_heap_bump_exact_fit() {
        let mut arena = Arena::new(16, 64);
        let payload = arena.free_heap_bytes() - OBJECT_HEADER_SIZE;
        let addr = arena.bump(payload).unwrap();
        assert_eq!(addr, arena.heap_base());
        assert_eq!(arena.free_heap_bytes(), 0);
        assert!(matches!(
            arena.bump(0),
            Err(MemoryError::OutOfMemory { .. })
        ));
    }
}
