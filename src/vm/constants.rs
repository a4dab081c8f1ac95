// Constants for the virtual machine memory layout

/// Size of the stack region in bytes. Stack addresses are `[0, STACK_SIZE)`.
pub const STACK_SIZE: u32 = 300_000;

/// Size of the heap region in bytes. Heap addresses start right after the stack.
pub const INIT_HEAP_SIZE: u32 = 300_000;

/// Width of the trailing type-pointer slot at the end of the arena
pub const TYPE_POINTER_SIZE: u32 = 4;

/// Total arena size: stack, heap and the trailing slot
pub const MEMORY_SIZE: u32 = STACK_SIZE + INIT_HEAP_SIZE + TYPE_POINTER_SIZE;

/// Stack-side null sentinel. It is the first heap byte, which never holds an object.
pub const NULL_ADDRESS: u32 = STACK_SIZE;

/// Heap-side null sentinel stored in reference slots
pub const NULL_HEAP_ADDRESS: u32 = 0;

/// Bytes skipped at the heap origin so that no object starts at `NULL_ADDRESS`
pub const NULL_HEAP_ADDRESS_OFFSET: u32 = 4;

/// Maximum number of nested call frames
pub const CALLSTACK_SIZE: usize = 100;

/// Default slice capacity (in elements) when a slice grows without a hint
pub const SLICE_SIZE: u32 = 32;

// Object header layout: mark | forwarding | size
pub const MARK_SIZE: u32 = 1;
pub const FORWARDING_ADDRESS_SIZE: u32 = 4;
pub const OBJECT_SIZE: u32 = 4;
pub const OBJECT_HEADER_SIZE: u32 = MARK_SIZE + FORWARDING_ADDRESS_SIZE + OBJECT_SIZE;

/// Length prefix of a string payload
pub const STR_HEADER_SIZE: u32 = 4;

/// Length and capacity prefix of a slice payload
pub const SLICE_HEADER_SIZE: u32 = 8;

/// Offset of the capacity word inside a slice payload (the length comes first)
pub const SLICE_CAPACITY_OFFSET: u32 = 4;

/// Width of a stored address
pub const ADDRESS_SIZE: u32 = 4;

pub const MAX_UINT32: u32 = u32::MAX;
pub const MIN_UINT32: u32 = 0;
pub const MAX_INT32: i32 = i32::MAX;
pub const MIN_INT32: i32 = -MAX_INT32 - 1;
