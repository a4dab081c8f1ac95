//! Runtime value representation
//!
//! This module defines [`Address`], the [`MemoryRegion`] an address falls into, and
//! the [`Value`] enum for basic-typed scalars as they are stored in the arena.
//!
//! # Encoding
//!
//! Values are stored little-endian with the widths reported by
//! [`TypeRegistry::size_of`](crate::types::registry::TypeRegistry::size_of).
//! Strings, affordances and pointers are stored as 4-byte heap addresses; a stored
//! zero decodes to [`Value::Null`].

use crate::types::TypeTag;
use crate::vm::constants::NULL_HEAP_ADDRESS;
use crate::vm::errors::{MemoryError, Result, TypeKey};

/// Arena offset (32-bit)
pub type Address = u32;

/// Which part of the arena an address belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryRegion {
    Stack,
    Heap,
    /// Trailing type-pointer slot
    Data,
}

/// Tagged runtime scalar
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Bool(bool),
    Byte(u8),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    Ui8(u8),
    Ui16(u16),
    Ui32(u32),
    Ui64(u64),
    F32(f32),
    F64(f64),
    Str(Address),
    Aff(Address),
    Pointer(Address),
    Null,
}

impl Value {
    /// The single tag this value carries
    pub fn tag(&self) -> TypeTag {
        match self {
            Value::Bool(_) => TypeTag::BOOL,
            Value::Byte(_) => TypeTag::BYTE,
            Value::I8(_) => TypeTag::I8,
            Value::I16(_) => TypeTag::I16,
            Value::I32(_) => TypeTag::I32,
            Value::I64(_) => TypeTag::I64,
            Value::Ui8(_) => TypeTag::UI8,
            Value::Ui16(_) => TypeTag::UI16,
            Value::Ui32(_) => TypeTag::UI32,
            Value::Ui64(_) => TypeTag::UI64,
            Value::F32(_) => TypeTag::F32,
            Value::F64(_) => TypeTag::F64,
            Value::Str(_) => TypeTag::STR,
            Value::Aff(_) => TypeTag::AFF,
            Value::Pointer(_) | Value::Null => TypeTag::POINTER,
        }
    }

    /// Heap address held by a reference value
    pub fn as_address(&self) -> Option<Address> {
        match self {
            Value::Str(addr) | Value::Aff(addr) | Value::Pointer(addr) => Some(*addr),
            Value::Null => Some(NULL_HEAP_ADDRESS),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Little-endian encoding
    pub fn to_bytes(&self) -> Vec<u8> {
        match *self {
            Value::Bool(b) => vec![b as u8],
            Value::Byte(n) | Value::Ui8(n) => vec![n],
            Value::I8(n) => n.to_le_bytes().to_vec(),
            Value::I16(n) => n.to_le_bytes().to_vec(),
            Value::I32(n) => n.to_le_bytes().to_vec(),
            Value::I64(n) => n.to_le_bytes().to_vec(),
            Value::Ui16(n) => n.to_le_bytes().to_vec(),
            Value::Ui32(n) => n.to_le_bytes().to_vec(),
            Value::Ui64(n) => n.to_le_bytes().to_vec(),
            Value::F32(n) => n.to_le_bytes().to_vec(),
            Value::F64(n) => n.to_le_bytes().to_vec(),
            Value::Str(addr) | Value::Aff(addr) | Value::Pointer(addr) => {
                addr.to_le_bytes().to_vec()
            }
            Value::Null => NULL_HEAP_ADDRESS.to_le_bytes().to_vec(),
        }
    }

    /// Decode a value of the given tag from exactly its encoded width
    pub fn from_bytes(tag: TypeTag, bytes: &[u8]) -> Result<Value> {
        fn arr<const N: usize>(bytes: &[u8]) -> Result<[u8; N]> {
            bytes.try_into().map_err(|_| {
                MemoryError::invariant(format!(
                    "expected {} bytes for value, got {}",
                    N,
                    bytes.len()
                ))
            })
        }

        let value = match tag {
            TypeTag::BOOL => Value::Bool(arr::<1>(bytes)?[0] != 0),
            TypeTag::BYTE => Value::Byte(arr::<1>(bytes)?[0]),
            TypeTag::UI8 => Value::Ui8(arr::<1>(bytes)?[0]),
            TypeTag::I8 => Value::I8(i8::from_le_bytes(arr(bytes)?)),
            TypeTag::I16 => Value::I16(i16::from_le_bytes(arr(bytes)?)),
            TypeTag::I32 => Value::I32(i32::from_le_bytes(arr(bytes)?)),
            TypeTag::I64 => Value::I64(i64::from_le_bytes(arr(bytes)?)),
            TypeTag::UI16 => Value::Ui16(u16::from_le_bytes(arr(bytes)?)),
            TypeTag::UI32 => Value::Ui32(u32::from_le_bytes(arr(bytes)?)),
            TypeTag::UI64 => Value::Ui64(u64::from_le_bytes(arr(bytes)?)),
            TypeTag::F32 => Value::F32(f32::from_le_bytes(arr(bytes)?)),
            TypeTag::F64 => Value::F64(f64::from_le_bytes(arr(bytes)?)),
            TypeTag::STR | TypeTag::AFF | TypeTag::POINTER => {
                let addr = u32::from_le_bytes(arr(bytes)?);
                if addr == NULL_HEAP_ADDRESS {
                    Value::Null
                } else if tag == TypeTag::STR {
                    Value::Str(addr)
                } else if tag == TypeTag::AFF {
                    Value::Aff(addr)
                } else {
                    Value::Pointer(addr)
                }
            }
            other => return Err(MemoryError::UnknownType(TypeKey::Tag(other.0))),
        };
        Ok(value)
    }
}
