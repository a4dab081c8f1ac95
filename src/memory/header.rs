//! Object header codec
//!
//! Every heap object is prefixed by a 9-byte header:
//!
//! ```text
//! +------+----------------+-------------+
//! | mark | forwarding u32 | size u32    |
//! | 1 B  | 4 B (LE)       | 4 B (LE)    |
//! +------+----------------+-------------+
//! ```
//!
//! The size is the payload size and never changes after allocation. Mark and
//! forwarding are owned by the collector.

use super::arena::Arena;
use super::value::Address;
use crate::vm::constants::{MARK_SIZE, NULL_HEAP_ADDRESS, OBJECT_HEADER_SIZE};
use crate::vm::errors::{MemoryError, Result};

const FORWARDING_OFFSET: u32 = MARK_SIZE;
const SIZE_OFFSET: u32 = MARK_SIZE + crate::vm::constants::FORWARDING_ADDRESS_SIZE;

/// Relocation state of an object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Forwarding {
    Unmoved,
    MovedTo(Address),
}

impl Forwarding {
    fn decode(raw: u32) -> Self {
        if raw == NULL_HEAP_ADDRESS {
            Forwarding::Unmoved
        } else {
            Forwarding::MovedTo(raw)
        }
    }

    /// Stored form: `NULL_HEAP_ADDRESS` when unmoved
    pub fn to_raw(self) -> u32 {
        match self {
            Forwarding::Unmoved => NULL_HEAP_ADDRESS,
            Forwarding::MovedTo(addr) => addr,
        }
    }
}

/// Decoded object header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectHeader {
    pub marked: bool,
    pub forwarding: Forwarding,
    pub size: u32,
}

impl ObjectHeader {
    /// Header plus payload
    pub fn total_size(&self) -> u32 {
        OBJECT_HEADER_SIZE + self.size
    }
}

/// Initialize a fresh header: unmarked, unmoved
pub fn write_header(arena: &mut Arena, addr: Address, size: u32) -> Result<()> {
    let mut bytes = [0u8; OBJECT_HEADER_SIZE as usize];
    bytes[FORWARDING_OFFSET as usize..SIZE_OFFSET as usize]
        .copy_from_slice(&NULL_HEAP_ADDRESS.to_le_bytes());
    bytes[SIZE_OFFSET as usize..].copy_from_slice(&size.to_le_bytes());
    arena.write(addr, &bytes)
}

pub fn read_header(arena: &Arena, addr: Address) -> Result<ObjectHeader> {
    let bytes = arena.read(addr, OBJECT_HEADER_SIZE)?;
    let marked = match bytes[0] {
        0 => false,
        1 => true,
        other => {
            return Err(MemoryError::invariant(format!(
                "corrupt mark byte 0x{:02x} in header at 0x{:x}",
                other, addr
            )))
        }
    };
    let word = |at: u32| {
        let at = at as usize;
        u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
    };
    Ok(ObjectHeader {
        marked,
        forwarding: Forwarding::decode(word(FORWARDING_OFFSET)),
        size: word(SIZE_OFFSET),
    })
}

pub(crate) fn set_mark(arena: &mut Arena, addr: Address, marked: bool) -> Result<()> {
    arena.write(addr, &[marked as u8])
}

pub(crate) fn set_forwarding(arena: &mut Arena, addr: Address, forwarding: Forwarding) -> Result<()> {
    arena.write_u32(addr + FORWARDING_OFFSET, forwarding.to_raw())
}

/// First payload byte of the object at `addr`
pub fn payload(addr: Address) -> Address {
    addr + OBJECT_HEADER_SIZE
}
