//! Type tags and heap object layouts
//!
//! - [`TypeTag`]: small integer identifying a primitive or meta kind
//! - [`Layout`]: which payload words of a heap object hold references
//! - [`registry`]: name ↔ tag mapping plus user-defined structure layouts
//!
//! # Tag Space
//!
//! ```text
//! 0 ..= 13   basic   aff bool byte str f32 f64 i8 i16 i32 i64 ui8 ui16 ui32 ui64
//! 14         threshold
//! 15 ..= 18  meta    und cstm ptr ident
//! 19 ..      custom  allocated by the registry, never reused
//! ```

pub mod registry;

/// Stable integer identifying a primitive or meta type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeTag(pub u32);

impl TypeTag {
    pub const AFF: TypeTag = TypeTag(0);
    pub const BOOL: TypeTag = TypeTag(1);
    pub const BYTE: TypeTag = TypeTag(2);
    pub const STR: TypeTag = TypeTag(3);
    pub const F32: TypeTag = TypeTag(4);
    pub const F64: TypeTag = TypeTag(5);
    pub const I8: TypeTag = TypeTag(6);
    pub const I16: TypeTag = TypeTag(7);
    pub const I32: TypeTag = TypeTag(8);
    pub const I64: TypeTag = TypeTag(9);
    pub const UI8: TypeTag = TypeTag(10);
    pub const UI16: TypeTag = TypeTag(11);
    pub const UI32: TypeTag = TypeTag(12);
    pub const UI64: TypeTag = TypeTag(13);

    /// Tags below this value are basic value types
    pub const THRESHOLD: TypeTag = TypeTag(14);

    pub const UNDEFINED: TypeTag = TypeTag(15);
    pub const CUSTOM: TypeTag = TypeTag(16);
    pub const POINTER: TypeTag = TypeTag(17);
    pub const IDENTIFIER: TypeTag = TypeTag(18);

    /// First tag handed out to user-defined structures
    pub const FIRST_CUSTOM: TypeTag = TypeTag(19);

    pub fn is_basic(self) -> bool {
        self < Self::THRESHOLD
    }

    pub fn is_custom(self) -> bool {
        self >= Self::FIRST_CUSTOM
    }
}

/// Shape of a heap object as seen by the collector
///
/// The object header carries no type information, so every reference the
/// collector follows is paired with the layout of its target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Layout {
    /// No outgoing references (strings, basic slices, affordances, scalar cells)
    Leaf,
    /// Payload is a single reference
    Pointer(Box<Layout>),
    /// Slice whose elements are references
    Slice(Box<Layout>),
    /// User-defined structure, fields resolved through the registry
    Struct(TypeTag),
}

impl Layout {
    pub fn pointer(inner: Layout) -> Self {
        Layout::Pointer(Box::new(inner))
    }

    pub fn slice(inner: Layout) -> Self {
        Layout::Slice(Box::new(inner))
    }
}

/// Field of a user-defined structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub offset: u32,
    pub size: u32,
    /// Layout of the referenced object when this field holds a heap address
    pub reference: Option<Layout>,
}

impl Field {
    /// Inline field with no outgoing reference
    pub fn value(name: &str, offset: u32, size: u32) -> Self {
        Field {
            name: name.to_string(),
            offset,
            size,
            reference: None,
        }
    }

    /// Address-sized field referring to a heap object of the given layout
    pub fn reference(name: &str, offset: u32, target: Layout) -> Self {
        Field {
            name: name.to_string(),
            offset,
            size: crate::vm::constants::ADDRESS_SIZE,
            reference: Some(target),
        }
    }
}
