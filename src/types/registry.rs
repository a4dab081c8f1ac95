//! Type registry
//!
//! Maps type names to stable [`TypeTag`]s and back. The built-in tags are installed
//! by [`TypeRegistry::new`]; custom tags are appended afterwards and never reused.

use super::{Field, TypeTag};
use crate::vm::constants::ADDRESS_SIZE;
use crate::vm::errors::{MemoryError, Result, TypeKey};
use rustc_hash::FxHashMap;

/// Canonical names for the built-in tags
const BUILTIN_NAMES: &[(&str, TypeTag)] = &[
    ("aff", TypeTag::AFF),
    ("bool", TypeTag::BOOL),
    ("byte", TypeTag::BYTE),
    ("str", TypeTag::STR),
    ("f32", TypeTag::F32),
    ("f64", TypeTag::F64),
    ("i8", TypeTag::I8),
    ("i16", TypeTag::I16),
    ("i32", TypeTag::I32),
    ("i64", TypeTag::I64),
    ("ui8", TypeTag::UI8),
    ("ui16", TypeTag::UI16),
    ("ui32", TypeTag::UI32),
    ("ui64", TypeTag::UI64),
    ("und", TypeTag::UNDEFINED),
    ("cstm", TypeTag::CUSTOM),
    ("ptr", TypeTag::POINTER),
    ("ident", TypeTag::IDENTIFIER),
];

/// Extra spellings accepted by `tag_of`
const ALIASES: &[(&str, TypeTag)] = &[("identifier", TypeTag::IDENTIFIER)];

/// A registered user-defined structure
#[derive(Debug, Clone)]
struct StructDef {
    fields: Vec<Field>,
}

/// Name ↔ tag mapping, append-only after start-up
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    codes: FxHashMap<String, TypeTag>,
    names: FxHashMap<TypeTag, String>,
    structs: FxHashMap<TypeTag, StructDef>,
    next_custom: u32,
}

impl TypeRegistry {
    pub fn new() -> Self {
        let mut registry = TypeRegistry {
            codes: FxHashMap::default(),
            names: FxHashMap::default(),
            structs: FxHashMap::default(),
            next_custom: TypeTag::FIRST_CUSTOM.0,
        };
        for &(name, tag) in BUILTIN_NAMES {
            registry.codes.insert(name.to_string(), tag);
            registry.names.insert(tag, name.to_string());
        }
        for &(alias, tag) in ALIASES {
            registry.codes.insert(alias.to_string(), tag);
        }
        registry
    }

    /// Look up the tag for a type name
    pub fn tag_of(&self, name: &str) -> Result<TypeTag> {
        self.codes
            .get(name)
            .copied()
            .ok_or_else(|| MemoryError::UnknownType(TypeKey::Name(name.to_string())))
    }

    /// Look up the canonical name of a tag
    pub fn name_of(&self, tag: TypeTag) -> Result<&str> {
        self.names
            .get(&tag)
            .map(String::as_str)
            .ok_or(MemoryError::UnknownType(TypeKey::Tag(tag.0)))
    }

    pub fn is_basic(&self, tag: TypeTag) -> bool {
        tag.is_basic()
    }

    /// Allocate a tag for a user-defined type
    ///
    /// Registering the same custom name twice returns the original tag.
    pub fn register_custom(&mut self, name: &str) -> Result<TypeTag> {
        if let Some(&tag) = self.codes.get(name) {
            if tag.is_custom() {
                return Ok(tag);
            }
            return Err(MemoryError::invariant(format!(
                "cannot redefine built-in type '{}'",
                name
            )));
        }

        let tag = TypeTag(self.next_custom);
        self.next_custom += 1;
        self.codes.insert(name.to_string(), tag);
        self.names.insert(tag, name.to_string());
        Ok(tag)
    }

    /// Register a user-defined structure together with its field layout
    ///
    /// A layout is fixed once registered: repeating the same fields returns the
    /// existing tag, different fields are an `InvariantViolation`.
    pub fn register_struct(&mut self, name: &str, fields: Vec<Field>) -> Result<TypeTag> {
        check_fields(name, &fields)?;
        let tag = self.register_custom(name)?;
        if let Some(existing) = self.structs.get(&tag) {
            if existing.fields == fields {
                return Ok(tag);
            }
            return Err(MemoryError::invariant(format!(
                "struct '{}' is already registered with a different layout",
                name
            )));
        }
        self.structs.insert(tag, StructDef { fields });
        Ok(tag)
    }

    /// Field layout of a registered structure
    pub fn struct_fields(&self, tag: TypeTag) -> Result<&[Field]> {
        self.structs
            .get(&tag)
            .map(|def| def.fields.as_slice())
            .ok_or(MemoryError::UnknownType(TypeKey::Tag(tag.0)))
    }

    /// Inline byte width of a value of this type
    pub fn size_of(&self, tag: TypeTag) -> Result<u32> {
        let size = match tag {
            TypeTag::BOOL | TypeTag::BYTE | TypeTag::I8 | TypeTag::UI8 => 1,
            TypeTag::I16 | TypeTag::UI16 => 2,
            TypeTag::I32 | TypeTag::UI32 | TypeTag::F32 => 4,
            TypeTag::I64 | TypeTag::UI64 | TypeTag::F64 => 8,
            TypeTag::STR | TypeTag::AFF | TypeTag::POINTER => ADDRESS_SIZE,
            _ => self
                .struct_fields(tag)?
                .iter()
                .map(|f| f.offset + f.size)
                .max()
                .unwrap_or(0),
        };
        Ok(size)
    }

    /// All registered names, aliases included
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.codes.keys().map(String::as_str)
    }

    /// Number of custom tags handed out so far
    pub fn custom_count(&self) -> u32 {
        self.next_custom - TypeTag::FIRST_CUSTOM.0
    }
}

/// Reject fields that overflow the address space or reference slots that overlap
fn check_fields(name: &str, fields: &[Field]) -> Result<()> {
    let mut references: Vec<(u32, u32)> = Vec::new();
    for field in fields {
        let end = field.offset.checked_add(field.size).ok_or_else(|| {
            MemoryError::invariant(format!(
                "field '{}.{}' at offset {} overflows",
                name, field.name, field.offset
            ))
        })?;
        if field.reference.is_none() {
            continue;
        }
        if field.size != ADDRESS_SIZE {
            return Err(MemoryError::invariant(format!(
                "reference field '{}.{}' must be {} bytes",
                name, field.name, ADDRESS_SIZE
            )));
        }
        if references
            .iter()
            .any(|&(start, stop)| field.offset < stop && start < end)
        {
            return Err(MemoryError::invariant(format!(
                "reference field '{}.{}' overlaps another reference",
                name, field.name
            )));
        }
        references.push((field.offset, end));
    }
    Ok(())
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Layout;

    #[test]
    fn test_round_trip_every_name() {
        let mut registry = TypeRegistry::new();
        registry.register_custom("Point").unwrap();
        let names: Vec<String> = registry.names().map(str::to_string).collect();
        for name in names {
            let tag = registry.tag_of(&name).unwrap();
            let canonical = registry.name_of(tag).unwrap();
            assert_eq!(registry.tag_of(canonical).unwrap(), tag, "name {}", name);
        }
    }

    #[test]
    fn test_threshold_split() {
        let registry = TypeRegistry::new();
        assert!(registry.is_basic(registry.tag_of("aff").unwrap()));
        assert!(registry.is_basic(registry.tag_of("ui64").unwrap()));
        assert!(!registry.is_basic(registry.tag_of("und").unwrap()));
        assert!(!registry.is_basic(TypeTag::POINTER));
        assert!(!registry.is_basic(TypeTag::IDENTIFIER));
    }

    #[test]
    fn test_custom_tags_are_monotonic() {
        let mut registry = TypeRegistry::new();
        let a = registry.register_custom("A").unwrap();
        let b = registry.register_custom("B").unwrap();
        assert_eq!(a, TypeTag::FIRST_CUSTOM);
        assert!(b > a);
        assert_eq!(registry.register_custom("A").unwrap(), a);
        assert_eq!(registry.custom_count(), 2);
        assert!(!registry.is_basic(a));
    }

    #[test]
    fn test_builtin_cannot_be_redefined() {
        let mut registry = TypeRegistry::new();
        assert!(matches!(
            registry.register_custom("i32"),
            Err(MemoryError::InvariantViolation { .. })
        ));
    }

    #[test]
    fn test_unknown_lookups() {
        let registry = TypeRegistry::new();
        assert_eq!(
            registry.tag_of("quaternion"),
            Err(MemoryError::UnknownType(TypeKey::Name("quaternion".into())))
        );
        assert_eq!(
            registry.name_of(TypeTag(999)),
            Err(MemoryError::UnknownType(TypeKey::Tag(999)))
        );
    }

    #[test]
    fn test_struct_size() {
        let mut registry = TypeRegistry::new();
        let node = registry
            .register_struct(
                "Node",
                vec![
                    Field::value("value", 0, 8),
                    Field::reference("next", 8, Layout::Struct(TypeTag::FIRST_CUSTOM)),
                ],
            )
            .unwrap();
        assert_eq!(registry.size_of(node).unwrap(), 12);
        assert_eq!(registry.size_of(TypeTag::I16).unwrap(), 2);
        assert_eq!(registry.struct_fields(node).unwrap().len(), 2);
    }

    #[test]
    fn test_struct_layout_is_fixed() {
        let mut registry = TypeRegistry::new();
        let fields = vec![Field::reference("next", 0, Layout::Leaf)];
        let node = registry.register_struct("Node", fields.clone()).unwrap();
        assert_eq!(registry.register_struct("Node", fields).unwrap(), node);

        assert!(matches!(
            registry.register_struct("Node", vec![Field::value("x", 0, 4)]),
            Err(MemoryError::InvariantViolation { .. })
        ));
        let kept = registry.struct_fields(node).unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].reference, Some(Layout::Leaf));
    }

    #[test]
    fn test_bad_fields_are_rejected() {
        let mut registry = TypeRegistry::new();
        assert!(matches!(
            registry.register_struct(
                "Twice",
                vec![
                    Field::reference("a", 0, Layout::Leaf),
                    Field::reference("b", 2, Layout::Leaf),
                ],
            ),
            Err(MemoryError::InvariantViolation { .. })
        ));
        assert!(matches!(
            registry.register_struct("Huge", vec![Field::value("x", u32::MAX, 8)]),
            Err(MemoryError::InvariantViolation { .. })
        ));
        // Rejected layouts never claim a tag
        assert!(registry.tag_of("Twice").is_err());

        let mixed = registry
            .register_struct(
                "Mixed",
                vec![
                    Field::value("len", 0, 4),
                    Field::reference("a", 4, Layout::Leaf),
                    Field::reference("b", 8, Layout::Leaf),
                ],
            )
            .unwrap();
        assert_eq!(registry.size_of(mixed).unwrap(), 12);
    }
}
