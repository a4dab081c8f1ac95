// Collector integration tests

use cxvm::memory::header::{payload, read_header, Forwarding};
use cxvm::types::{Field, Layout};
use cxvm::vm::config::MemoryConfig;
use cxvm::vm::constants::OBJECT_HEADER_SIZE;
use cxvm::{MemoryError, Vm};

fn small_vm() -> Vm {
    Vm::with_config(
        MemoryConfig::default()
            .with_stack_size(4096)
            .with_heap_size(2048),
    )
}

/// Allocate an object of `size` bytes filled with `fill` and store it in `slot`
fn alloc_into(vm: &mut Vm, slot: u32, size: u32, fill: u8) -> u32 {
    let addr = vm.allocate(size).expect("allocation failed");
    vm.write(payload(addr), &vec![fill; size as usize]).unwrap();
    vm.write_u32(slot, addr).unwrap();
    addr
}

#[test]
fn test_drop_middle_object_compacts() {
    let mut vm = Vm::new();
    let base = vm.push_frame("main", 12).unwrap();
    let slots = [base, base + 4, base + 8];

    for (slot, (size, fill)) in slots.iter().zip([(100, 0xAA), (200, 0xBB), (300, 0xCC)]) {
        alloc_into(&mut vm, *slot, size, fill);
        vm.track_local(*slot, Layout::Leaf).unwrap();
    }

    // Drop the root to the second object
    vm.write_u32(slots[1], 0).unwrap();
    let stats = vm.collect().unwrap();

    assert_eq!(stats.live_objects, 2);
    assert_eq!(stats.freed_objects, 1);
    assert_eq!(stats.freed_bytes, 200 + OBJECT_HEADER_SIZE);
    assert_eq!(stats.moved_objects, 1);

    let heap_base = vm.arena().heap_base();
    let snapshot = vm.snapshot().unwrap();
    assert_eq!(snapshot.sizes(), vec![100, 300]);
    assert_eq!(
        snapshot.heap_free,
        heap_base + 100 + 300 + 2 * OBJECT_HEADER_SIZE
    );

    // Roots were rewritten to the compacted addresses
    let first = vm.read_u32(slots[0]).unwrap();
    let third = vm.read_u32(slots[2]).unwrap();
    assert_eq!(first, heap_base);
    assert_eq!(third, heap_base + 100 + OBJECT_HEADER_SIZE);

    // Payloads moved intact and headers are clean
    assert!(vm.read(payload(first), 100).unwrap().iter().all(|&b| b == 0xAA));
    assert!(vm.read(payload(third), 300).unwrap().iter().all(|&b| b == 0xCC));
    let header = read_header(vm.arena(), third).unwrap();
    assert!(!header.marked);
    assert_eq!(header.forwarding, Forwarding::Unmoved);
    assert_eq!(header.size, 300);
}

#[test]
fn test_second_collection_moves_nothing() {
    let mut vm = Vm::new();
    let base = vm.push_frame("main", 8).unwrap();
    vm.allocate(64).unwrap();
    alloc_into(&mut vm, base, 32, 1);
    vm.allocate(16).unwrap();
    alloc_into(&mut vm, base + 4, 48, 2);
    vm.track_local(base, Layout::Leaf).unwrap();
    vm.track_local(base + 4, Layout::Leaf).unwrap();

    let first = vm.collect().unwrap();
    assert_eq!(first.moved_objects, 2);
    let before = vm.snapshot().unwrap();

    let second = vm.collect().unwrap();
    assert_eq!(second.moved_objects, 0);
    assert_eq!(second.freed_objects, 0);
    assert_eq!(vm.snapshot().unwrap(), before);
}

#[test]
fn test_unreachable_objects_never_survive() {
    let mut vm = small_vm();
    let base = vm.push_frame("main", 12).unwrap();

    // 3 reachable objects interleaved with 30 unreachable ones; together they
    // would need far more than the 2 KB heap
    for i in 0..33u32 {
        if i % 11 == 0 {
            let slot = base + (i / 11) * 4;
            alloc_into(&mut vm, slot, 100, i as u8);
            vm.track_local(slot, Layout::Leaf).unwrap();
        } else {
            vm.allocate(100).unwrap();
        }
    }
    assert!(vm.collections() >= 1);

    let stats = vm.collect().unwrap();
    assert_eq!(stats.live_objects, 3);
    assert_eq!(vm.snapshot().unwrap().object_count(), 3);

    for k in 0..3u32 {
        let addr = vm.read_u32(base + k * 4).unwrap();
        assert_eq!(read_header(vm.arena(), addr).unwrap().size, 100);
        let fill = (k * 11) as u8;
        assert!(vm.read(payload(addr), 100).unwrap().iter().all(|&b| b == fill));
    }
}

#[test]
fn test_exact_fit_then_one_byte_more() {
    let mut vm = small_vm();
    let remaining = vm.free_heap_bytes() - OBJECT_HEADER_SIZE;
    vm.allocate(remaining).unwrap();
    assert_eq!(vm.free_heap_bytes(), 0);

    let mut vm = small_vm();
    let err = vm.allocate(remaining + 1).unwrap_err();
    assert!(matches!(err, MemoryError::OutOfMemory { .. }));
    assert_eq!(vm.collections(), 1);
}

#[test]
fn test_full_heap_of_live_objects_is_out_of_memory() {
    let mut vm = small_vm();
    let slot = vm.push_frame("main", 4).unwrap();
    let remaining = vm.free_heap_bytes() - OBJECT_HEADER_SIZE;
    alloc_into(&mut vm, slot, remaining, 7);
    vm.track_local(slot, Layout::Leaf).unwrap();

    assert!(matches!(
        vm.allocate(1),
        Err(MemoryError::OutOfMemory { .. })
    ));
    // The live object is untouched
    let addr = vm.read_u32(slot).unwrap();
    assert_eq!(read_header(vm.arena(), addr).unwrap().size, remaining);
}

#[test]
fn test_allocations_never_overlap() {
    let mut vm = Vm::new();
    let mut ranges = Vec::new();
    for size in [1, 9, 0, 64, 3, 1000, 17] {
        let addr = vm.allocate(size).unwrap();
        ranges.push((addr, addr + OBJECT_HEADER_SIZE + size));
    }
    for (i, a) in ranges.iter().enumerate() {
        assert!(a.0 >= vm.arena().heap_base());
        assert!(a.1 <= vm.arena().heap_free());
        for b in &ranges[i + 1..] {
            assert!(a.1 <= b.0 || b.1 <= a.0, "{:?} overlaps {:?}", a, b);
        }
    }
}

#[test]
fn test_linked_list_references_are_rewritten() {
    let mut vm = Vm::new();
    let node = vm.register_custom("Node").unwrap();
    vm.register_struct(
        "Node",
        vec![
            Field::value("value", 0, 8),
            Field::reference("next", 8, Layout::Struct(node)),
        ],
    )
    .unwrap();

    let head_slot = vm.push_frame("main", 4).unwrap();
    vm.track_local(head_slot, Layout::Struct(node)).unwrap();

    // Build 3 -> 2 -> 1 with garbage between every node
    let mut next = 0;
    for value in 1..=3i64 {
        vm.allocate(40).unwrap();
        let addr = vm.allocate(12).unwrap();
        vm.write(payload(addr), &value.to_le_bytes()).unwrap();
        vm.write_u32(payload(addr) + 8, next).unwrap();
        next = addr;
    }
    vm.write_u32(head_slot, next).unwrap();

    let stats = vm.collect().unwrap();
    assert_eq!(stats.live_objects, 3);
    assert_eq!(stats.freed_objects, 3);

    let mut values = Vec::new();
    let mut cursor = vm.read_u32(head_slot).unwrap();
    while cursor != 0 {
        let bytes = vm.read(payload(cursor), 8).unwrap();
        values.push(i64::from_le_bytes(bytes.try_into().unwrap()));
        cursor = vm.read_u32(payload(cursor) + 8).unwrap();
    }
    assert_eq!(values, vec![3, 2, 1]);
}

#[test]
fn test_cycles() {
    let mut vm = Vm::new();
    let pair = vm.register_custom("Pair").unwrap();
    vm.register_struct(
        "Pair",
        vec![Field::reference("other", 0, Layout::Struct(pair))],
    )
    .unwrap();

    let slot = vm.push_frame("main", 4).unwrap();
    vm.track_local(slot, Layout::Struct(pair)).unwrap();

    let make_cycle = |vm: &mut Vm| {
        let a = vm.allocate(4).unwrap();
        let b = vm.allocate(4).unwrap();
        vm.write_u32(payload(a), b).unwrap();
        vm.write_u32(payload(b), a).unwrap();
        a
    };

    // Unreachable cycle is reclaimed
    make_cycle(&mut vm);
    let stats = vm.collect().unwrap();
    assert_eq!(stats.live_objects, 0);
    assert_eq!(stats.freed_objects, 2);

    // Reachable cycle survives and still closes after moving
    vm.allocate(32).unwrap();
    let a = make_cycle(&mut vm);
    vm.write_u32(slot, a).unwrap();
    let stats = vm.collect().unwrap();
    assert_eq!(stats.live_objects, 2);

    let a = vm.read_u32(slot).unwrap();
    let b = vm.read_u32(payload(a)).unwrap();
    assert_eq!(a, vm.arena().heap_base());
    assert_eq!(vm.read_u32(payload(b)).unwrap(), a);
}

#[test]
fn test_pointer_slice_elements_are_traced() {
    let mut vm = Vm::new();
    let slot = vm.push_frame("main", 4).unwrap();
    vm.track_local(slot, Layout::slice(Layout::Leaf)).unwrap();

    vm.allocate(100).unwrap();
    let slice = vm.alloc_slice(4, Some(4)).unwrap();
    vm.write_u32(slot, slice).unwrap();
    for word in ["alpha", "beta", "gamma"] {
        vm.allocate(10).unwrap();
        let text = vm.alloc_str(word).unwrap();
        let slice = vm.read_u32(slot).unwrap();
        vm.slice_append(slot, Layout::slice(Layout::Leaf), &text.to_le_bytes())
            .unwrap();
        assert_eq!(vm.read_u32(slot).unwrap(), slice);
    }

    let stats = vm.collect().unwrap();
    assert_eq!(stats.live_objects, 4);

    let slice = vm.read_u32(slot).unwrap();
    let words: Vec<String> = (0..vm.slice_len(slice).unwrap())
        .map(|i| {
            let elem = vm.slice_get(slice, i, 4).unwrap();
            let text = u32::from_le_bytes(elem.try_into().unwrap());
            vm.read_str(text).unwrap()
        })
        .collect();
    assert_eq!(words, vec!["alpha", "beta", "gamma"]);
}

#[test]
fn test_pointer_cell_target_survives() {
    let mut vm = Vm::new();
    let slot = vm.push_frame("main", 4).unwrap();
    vm.track_local(slot, Layout::pointer(Layout::Leaf)).unwrap();

    vm.allocate(20).unwrap();
    let target = vm.alloc_str("pointee").unwrap();
    vm.allocate(20).unwrap();
    let cell = vm.allocate(4).unwrap();
    vm.write_u32(payload(cell), target).unwrap();
    vm.write_u32(slot, cell).unwrap();

    let stats = vm.collect().unwrap();
    assert_eq!(stats.live_objects, 2);
    let cell = vm.read_u32(slot).unwrap();
    let target = vm.read_u32(payload(cell)).unwrap();
    assert_eq!(vm.read_str(target).unwrap(), "pointee");
}

#[test]
fn test_slice_append_survives_growth_collection() {
    let mut vm = small_vm();
    let slot = vm.push_frame("main", 4).unwrap();
    vm.track_local(slot, Layout::Leaf).unwrap();

    // Garbage ahead of the slice so the slice moves when collected
    vm.allocate(200).unwrap();
    for i in 0..32i32 {
        vm.slice_append(slot, Layout::Leaf, &i.to_le_bytes()).unwrap();
    }
    assert_eq!(vm.slice_capacity(vm.read_u32(slot).unwrap()).unwrap(), 32);

    // Leave too little room for the grown slice (8 + 64 * 4 payload bytes)
    let grown_size = 8 + 64 * 4 + OBJECT_HEADER_SIZE;
    while vm.free_heap_bytes() >= grown_size {
        vm.allocate(50).unwrap();
    }
    assert_eq!(vm.collections(), 0);

    let slice = vm.slice_append(slot, Layout::Leaf, &32i32.to_le_bytes()).unwrap();
    assert_eq!(vm.collections(), 1);
    assert_eq!(vm.read_u32(slot).unwrap(), slice);
    assert_eq!(vm.slice_len(slice).unwrap(), 33);
    assert_eq!(vm.slice_capacity(slice).unwrap(), 64);
    for i in 0..33u32 {
        let elem = vm.slice_get(slice, i, 4).unwrap();
        assert_eq!(i32::from_le_bytes(elem.try_into().unwrap()), i as i32);
    }
}

#[test]
fn test_reference_slice_growth_keeps_new_element() {
    let mut vm = small_vm();
    let slot = vm.push_frame("main", 4).unwrap();
    let strings = Layout::slice(Layout::Leaf);
    vm.track_local(slot, strings.clone()).unwrap();

    vm.allocate(200).unwrap();
    for i in 0..32 {
        let text = vm.alloc_str(&format!("s{:02}", i)).unwrap();
        vm.slice_append(slot, strings.clone(), &text.to_le_bytes())
            .unwrap();
    }
    assert_eq!(vm.slice_capacity(vm.read_u32(slot).unwrap()).unwrap(), 32);

    // After the next string is allocated there is no room for the grown slice
    let string_size = 4 + 3 + OBJECT_HEADER_SIZE;
    let grown_size = 8 + 64 * 4 + OBJECT_HEADER_SIZE;
    while vm.free_heap_bytes() >= grown_size + string_size {
        vm.allocate(0).unwrap();
    }
    let last = vm.alloc_str("s32").unwrap();
    assert!(vm.free_heap_bytes() < grown_size);
    assert_eq!(vm.collections(), 0);

    // `last` is only held by the append call itself
    let slice = vm.slice_append(slot, strings, &last.to_le_bytes()).unwrap();
    assert_eq!(vm.collections(), 1);
    assert_eq!(vm.read_u32(slot).unwrap(), slice);
    assert_eq!(vm.slice_len(slice).unwrap(), 33);
    assert_eq!(vm.slice_capacity(slice).unwrap(), 64);
    for i in 0..33u32 {
        let elem = vm.slice_get(slice, i, 4).unwrap();
        let text = u32::from_le_bytes(elem.try_into().unwrap());
        assert_eq!(vm.read_str(text).unwrap(), format!("s{:02}", i));
    }
}

#[test]
fn test_identical_programs_compact_identically() {
    let run = || {
        let mut vm = Vm::new();
        let base = vm.push_frame("main", 8).unwrap();
        vm.track_local(base, Layout::Leaf).unwrap();
        vm.track_local(base + 4, Layout::Leaf).unwrap();
        for (i, size) in [30, 70, 10, 90, 50].into_iter().enumerate() {
            let addr = vm.allocate(size).unwrap();
            if i % 2 == 1 {
                vm.write_u32(base + (i as u32 / 2) * 4, addr).unwrap();
            }
        }
        vm.collect().unwrap();
        (
            vm.snapshot().unwrap(),
            vm.read_u32(base).unwrap(),
            vm.read_u32(base + 4).unwrap(),
        )
    };
    let first = run();
    assert_eq!(first, run());
    assert_eq!(first.0.sizes(), vec![70, 90]);
}

#[test]
fn test_popped_frame_roots_are_released() {
    let mut vm = Vm::new();
    let outer = vm.push_frame("main", 4).unwrap();
    vm.track_local(outer, Layout::Leaf).unwrap();
    alloc_into(&mut vm, outer, 16, 1);

    let inner = vm.push_frame("helper", 4).unwrap();
    vm.track_local(inner, Layout::Leaf).unwrap();
    alloc_into(&mut vm, inner, 16, 2);
    assert_eq!(vm.collect().unwrap().live_objects, 2);

    vm.pop_frame().unwrap();
    assert_eq!(vm.collect().unwrap().live_objects, 1);
}

#[test]
fn test_global_roots() {
    let mut vm = Vm::new();
    let global = vm.declare_global(4, Some(Layout::Leaf)).unwrap();
    vm.allocate(12).unwrap();
    let text = vm.alloc_str("global").unwrap();
    vm.write_u32(global, text).unwrap();

    vm.push_frame("main", 8).unwrap();
    vm.collect().unwrap();
    vm.pop_frame().unwrap();

    let text = vm.read_u32(global).unwrap();
    assert_eq!(text, vm.arena().heap_base());
    assert_eq!(vm.read_str(text).unwrap(), "global");
}

#[test]
fn test_corrupt_size_is_invariant_violation() {
    let mut vm = Vm::new();
    let slot = vm.push_frame("main", 4).unwrap();
    vm.track_local(slot, Layout::Leaf).unwrap();
    let addr = alloc_into(&mut vm, slot, 8, 0);
    // Size field sits after the mark byte and the forwarding word
    vm.write_u32(addr + 5, u32::MAX).unwrap();

    assert!(matches!(
        vm.collect(),
        Err(MemoryError::InvariantViolation { .. })
    ));
}

#[test]
fn test_stale_mark_is_invariant_violation() {
    let mut vm = Vm::new();
    let addr = vm.allocate(8).unwrap();
    vm.write(addr, &[1]).unwrap();
    assert!(matches!(
        vm.collect(),
        Err(MemoryError::InvariantViolation { .. })
    ));
}

#[test]
fn test_dangling_root_is_invariant_violation() {
    let mut vm = Vm::new();
    let slot = vm.push_frame("main", 4).unwrap();
    vm.track_local(slot, Layout::Leaf).unwrap();
    let addr = vm.allocate(8).unwrap();
    vm.write_u32(slot, addr + 3).unwrap();

    assert!(matches!(
        vm.collect(),
        Err(MemoryError::InvariantViolation { .. })
    ));
}
