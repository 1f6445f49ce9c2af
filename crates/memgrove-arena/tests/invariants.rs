//! Property tests for the allocator's structural invariants, driving
//! randomized sequences of `allocate`/`deallocate` against a single pool.

use memgrove_arena::Registry;
use memgrove_core::AllocPolicy;
use proptest::prelude::*;

#[derive(Clone, Copy, Debug)]
enum Op {
    Allocate(usize),
    DeallocateOldest,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1usize..=40).prop_map(Op::Allocate),
        Just(Op::DeallocateOldest),
    ]
}

fn check_invariants(reg: &Registry, pool: memgrove_core::PoolHandle, total_size: usize) {
    let segments = reg.inspect(pool).unwrap();
    let summary = reg.summary(pool).unwrap();

    // Partition: sizes sum to the pool's total size.
    let sum: usize = segments.iter().map(|s| s.size).sum();
    assert_eq!(sum, total_size);

    // No adjacent free: no two consecutive entries are both free.
    for pair in segments.windows(2) {
        assert!(!(!pair[0].busy && !pair[1].busy), "adjacent free segments were not coalesced");
    }

    // Accounting matches the segment list.
    let alloc_size: usize = segments.iter().filter(|s| s.busy).map(|s| s.size).sum();
    let num_allocs = segments.iter().filter(|s| s.busy).count();
    let num_gaps = segments.iter().filter(|s| !s.busy).count();
    assert_eq!(summary.alloc_size, alloc_size);
    assert_eq!(summary.num_allocs, num_allocs);
    assert_eq!(summary.num_gaps, num_gaps);
    assert_eq!(summary.free_size, total_size - alloc_size);

    // Coalescing completeness: an empty pool is exactly one full-size gap.
    if summary.num_allocs == 0 {
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].size, total_size);
        assert!(!segments[0].busy);
    }
}

proptest! {
    #[test]
    fn invariants_hold_after_every_operation(
        policy_is_first_fit in any::<bool>(),
        ops in proptest::collection::vec(op_strategy(), 1..60),
    ) {
        let total_size = 500;
        let policy = if policy_is_first_fit { AllocPolicy::FirstFit } else { AllocPolicy::BestFit };

        let mut reg = Registry::new();
        reg.init().unwrap();
        let pool = reg.open(total_size, policy).unwrap();
        let mut live = Vec::new();

        for op in ops {
            match op {
                Op::Allocate(n) => {
                    if let Ok(alloc) = reg.allocate(pool, n) {
                        live.push(alloc);
                    }
                }
                Op::DeallocateOldest => {
                    if !live.is_empty() {
                        let alloc = live.remove(0);
                        reg.deallocate(alloc).unwrap();
                    }
                }
            }
            check_invariants(&reg, pool, total_size);
        }
    }
}

proptest! {
    #[test]
    fn allocate_then_deallocate_restores_gap_count(n in 1usize..200) {
        let total_size = 200;
        let mut reg = Registry::new();
        reg.init().unwrap();
        let pool = reg.open(total_size, AllocPolicy::FirstFit).unwrap();

        let before = reg.summary(pool).unwrap();
        let alloc = reg.allocate(pool, n).unwrap();
        reg.deallocate(alloc).unwrap();
        let after = reg.summary(pool).unwrap();

        prop_assert_eq!(before, after);
    }
}
