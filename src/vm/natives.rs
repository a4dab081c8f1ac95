//! Native operation registry
//!
//! The set of fully-qualified operation names (`type.operation`) that the compiler
//! treats as built-in rather than resolving as user calls. Each name maps to the
//! [`NativeKind`] capability it belongs to. Nothing here executes an operation.
//!
//! Most groups are generated from the type lists below, e.g. every numeric type
//! gets `add`, `sub`, `mul`, `div`.

use rustc_hash::FxHashMap;

/// Basic types and their slice forms, as they prefix native names
pub const BASIC_TYPE_NAMES: [&str; 14] = [
    "bool", "str", "byte", "i32", "i64", "f32", "f64", "[]bool", "[]str", "[]byte", "[]i32",
    "[]i64", "[]f32", "[]f64",
];

const NUMERIC: [&str; 4] = ["i32", "i64", "f32", "f64"];
const INTEGER: [&str; 2] = ["i32", "i64"];
const FLOAT: [&str; 2] = ["f32", "f64"];
const SLICES: [&str; 7] = ["[]bool", "[]byte", "[]str", "[]i32", "[]i64", "[]f32", "[]f64"];
const NUMERIC_SLICES: [&str; 4] = ["[]i32", "[]i64", "[]f32", "[]f64"];
const COMPARABLE: [&str; 6] = ["i32", "i64", "f32", "f64", "str", "byte"];

/// Capability a native operation provides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeKind {
    Arithmetic,
    Bitwise,
    Print,
    Identity,
    Collection,
    Conversion,
    Comparison,
    Input,
    Random,
    Logic,
    Control,
    MetaProgramming,
    Affordance,
    Testing,
    Time,
    Runtime,
    Graphics,
    Window,
    Os,
}

const FIXED: &[(&str, NativeKind)] = &[
    ("identity", NativeKind::Identity),
    ("str.len", NativeKind::Collection),
    ("str.concat", NativeKind::Collection),
    ("[]byte.str", NativeKind::Conversion),
    ("str.[]byte", NativeKind::Conversion),
    ("bool.eq", NativeKind::Comparison),
    ("bool.uneq", NativeKind::Comparison),
    ("str.read", NativeKind::Input),
    ("i32.read", NativeKind::Input),
    ("i32.rand", NativeKind::Random),
    ("i64.rand", NativeKind::Random),
    ("and", NativeKind::Logic),
    ("or", NativeKind::Logic),
    ("not", NativeKind::Logic),
    ("sleep", NativeKind::Control),
    ("halt", NativeKind::Control),
    ("goTo", NativeKind::Control),
    ("baseGoTo", NativeKind::Control),
    ("remExpr", NativeKind::MetaProgramming),
    ("remArg", NativeKind::MetaProgramming),
    ("addExpr", NativeKind::MetaProgramming),
    ("rem.expr", NativeKind::MetaProgramming),
    ("rem.arg", NativeKind::MetaProgramming),
    ("add.expr", NativeKind::MetaProgramming),
    ("evolve", NativeKind::MetaProgramming),
    ("initDef", NativeKind::MetaProgramming),
    ("test.start", NativeKind::Testing),
    ("test.stop", NativeKind::Testing),
    ("test.error", NativeKind::Testing),
    ("time.Unix", NativeKind::Time),
    ("time.UnixMilli", NativeKind::Time),
    ("time.UnixNano", NativeKind::Time),
    ("runtime.LockOSThread", NativeKind::Runtime),
    ("gltext.LoadTrueType", NativeKind::Graphics),
    ("gltext.Printf", NativeKind::Graphics),
];

/// `(prefix, operations, kind)` groups where every operation gets the same prefix
const PREFIXED: &[(&str, &[&str], NativeKind)] = &[
    (
        "aff",
        &["query", "execute", "print", "concat", "len", "index", "name"],
        NativeKind::Affordance,
    ),
    ("test", &BASIC_TYPE_NAMES, NativeKind::Testing),
    (
        "mdim",
        &["append", "read", "write", "len", "make"],
        NativeKind::Collection,
    ),
    (
        "cstm",
        &["append", "read", "write", "len", "make", "serialize", "deserialize"],
        NativeKind::Collection,
    ),
    (
        "gl",
        &[
            "Init", "GetError", "BindAttribLocation", "GetAttribLocation", "CullFace",
            "CreateProgram", "DeleteProgram", "LinkProgram", "Clear", "UseProgram",
            "BindBuffer", "BindVertexArray", "EnableVertexAttribArray", "VertexAttribPointer",
            "DrawArrays", "GenBuffers", "BufferData", "GenVertexArrays", "CreateShader",
            "DetachShader", "DeleteShader", "Strs", "Free", "ShaderSource", "CompileShader",
            "GetShaderiv", "AttachShader", "MatrixMode", "Rotatef", "Translatef",
            "LoadIdentity", "PushMatrix", "PopMatrix", "EnableClientState", "BindTexture",
            "Color3f", "Color4f", "Begin", "End", "Normal3f", "TexCoord2f", "Vertex2f",
            "Vertex3f", "Enable", "ClearColor", "ClearDepth", "DepthFunc", "Lightfv",
            "Frustum", "Disable", "Hint", "NewTexture", "DepthMask", "TexEnvi", "BlendFunc",
            "Ortho", "Viewport", "Scalef", "TexCoord2d",
        ],
        NativeKind::Graphics,
    ),
    (
        "glfw",
        &[
            "Init", "WindowHint", "CreateWindow", "MakeContextCurrent", "ShouldClose",
            "SetShouldClose", "PollEvents", "SwapBuffers", "GetFramebufferSize",
            "SwapInterval", "SetKeyCallback", "GetTime", "SetMouseButtonCallback",
            "SetCursorPosCallback", "GetCursorPos", "SetInputMode", "GetKey",
        ],
        NativeKind::Window,
    ),
    (
        "os",
        &[
            "Create", "Open", "Close", "GetWorkingDirectory", "Write", "WriteFile", "ReadFile",
        ],
        NativeKind::Os,
    ),
];

/// `(types, operations, kind)` groups expanded to every `type.operation` pair
const PER_TYPE: &[(&[&str], &[&str], NativeKind)] = &[
    (&NUMERIC, &["add", "mul", "sub", "div", "abs", "pow"], NativeKind::Arithmetic),
    (&INTEGER, &["mod"], NativeKind::Arithmetic),
    (&FLOAT, &["cos", "sin"], NativeKind::Arithmetic),
    (
        &INTEGER,
        &["bitand", "bitor", "bitxor", "bitclear", "bitshl", "bitshr"],
        NativeKind::Bitwise,
    ),
    (&BASIC_TYPE_NAMES, &["print"], NativeKind::Print),
    (&BASIC_TYPE_NAMES, &["id"], NativeKind::Identity),
    (
        &SLICES,
        &["make", "read", "write", "len", "concat", "append", "copy"],
        NativeKind::Collection,
    ),
    (
        &COMPARABLE,
        &["lt", "gt", "eq", "uneq", "lteq", "gteq"],
        NativeKind::Comparison,
    ),
    (&["byte"], &NUMERIC, NativeKind::Conversion),
    (&NUMERIC, &["byte"], NativeKind::Conversion),
    (&["[]byte"], &NUMERIC_SLICES, NativeKind::Conversion),
    (&NUMERIC_SLICES, &["[]byte"], NativeKind::Conversion),
    (
        &["byte", "bool", "i32", "i64", "f32", "f64"],
        &["str"],
        NativeKind::Conversion,
    ),
];

/// Immutable name → capability map
#[derive(Debug, Clone)]
pub struct NativeRegistry {
    ops: FxHashMap<String, NativeKind>,
}

impl NativeRegistry {
    pub fn new() -> Self {
        let mut ops = FxHashMap::default();

        for &(name, kind) in FIXED {
            ops.insert(name.to_string(), kind);
        }
        for &(prefix, names, kind) in PREFIXED {
            for name in names {
                ops.insert(format!("{}.{}", prefix, name), kind);
            }
        }
        for &(types, names, kind) in PER_TYPE {
            for ty in types {
                for name in names {
                    ops.insert(format!("{}.{}", ty, name), kind);
                }
            }
        }
        // Numeric casts between distinct scalar and slice types
        for group in [&NUMERIC, &NUMERIC_SLICES] {
            for from in group.iter() {
                for to in group.iter().filter(|to| *to != from) {
                    ops.insert(format!("{}.{}", from, to), NativeKind::Conversion);
                }
            }
        }

        NativeRegistry { ops }
    }

    /// Whether `name` is a built-in operation
    pub fn is_native(&self, name: &str) -> bool {
        self.ops.contains_key(name)
    }

    /// Capability of a built-in operation
    pub fn kind(&self, name: &str) -> Option<NativeKind> {
        self.ops.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, NativeKind)> {
        self.ops.iter().map(|(name, kind)| (name.as_str(), *kind))
    }
}

impl Default for NativeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_membership() {
        let natives = NativeRegistry::new();
        assert!(natives.is_native("i32.add"));
        assert!(natives.is_native("[]byte.append"));
        assert!(natives.is_native("glfw.GetKey"));
        assert!(!natives.is_native("i32.frobnicate"));
        assert!(!natives.is_native("byte.byte"));
        assert!(!natives.is_native("i32.i32"));
    }

    #[test]
    fn test_kinds() {
        let natives = NativeRegistry::new();
        assert_eq!(natives.kind("f64.sin"), Some(NativeKind::Arithmetic));
        assert_eq!(natives.kind("i64.bitshr"), Some(NativeKind::Bitwise));
        assert_eq!(natives.kind("[]str.print"), Some(NativeKind::Print));
        assert_eq!(natives.kind("[]f32.id"), Some(NativeKind::Identity));
        assert_eq!(natives.kind("[]i32.[]f64"), Some(NativeKind::Conversion));
        assert_eq!(natives.kind("byte.str"), Some(NativeKind::Conversion));
        assert_eq!(natives.kind("str.gteq"), Some(NativeKind::Comparison));
        assert_eq!(natives.kind("aff.query"), Some(NativeKind::Affordance));
        assert_eq!(natives.kind("test.[]bool"), Some(NativeKind::Testing));
        assert_eq!(natives.kind("os.ReadFile"), Some(NativeKind::Os));
        assert_eq!(natives.kind("i32.read"), Some(NativeKind::Input));
        assert_eq!(natives.kind("nope"), None);
    }

    #[test]
    fn test_no_float_modulo_or_bitwise() {
        let natives = NativeRegistry::new();
        assert!(!natives.is_native("f32.mod"));
        assert!(!natives.is_native("f64.bitand"));
        assert!(!natives.is_native("i32.cos"));
    }
}
