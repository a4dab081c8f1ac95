use super::constants::{CALLSTACK_SIZE, INIT_HEAP_SIZE, STACK_SIZE};

/// Region sizes for one VM instance, fixed at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryConfig {
    pub stack_size: u32,
    pub heap_size: u32,
    pub max_call_depth: usize,
}

impl MemoryConfig {
    pub fn with_heap_size(mut self, heap_size: u32) -> Self {
        self.heap_size = heap_size;
        self
    }

    pub fn with_stack_size(mut self, stack_size: u32) -> Self {
        self.stack_size = stack_size;
        self
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        MemoryConfig {
            stack_size: STACK_SIZE,
            heap_size: INIT_HEAP_SIZE,
            max_call_depth: CALLSTACK_SIZE,
        }
    }
}
