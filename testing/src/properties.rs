//! Property-based testing utilities using proptest.

use proptest::prelude::*;

/// One step of a random reservation workload.
///
/// Indices pick among a fixed set of seeded products; `line` indices are
/// taken modulo the current line count.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WorkloadStep {
    /// Create a reservation with `(product index, quantity)` lines
    Create(Vec<(usize, u32)>),
    /// Replace the lines of the n-th live reservation
    Edit(usize, Vec<(usize, u32)>),
    /// Confirm the n-th live reservation
    Complete(usize),
    /// Cancel the n-th live reservation
    Cancel(usize),
    /// Delete the n-th live reservation
    Remove(usize),
}

/// Strategy for a non-empty line list over `products` products.
pub fn lines(products: usize) -> impl Strategy<Value = Vec<(usize, u32)>> {
    prop::collection::vec((0..products, 1u32..8), 1..4)
}

/// Strategy for one workload step.
pub fn workload_step(products: usize) -> impl Strategy<Value = WorkloadStep> {
    prop_oneof![
        3 => lines(products).prop_map(WorkloadStep::Create),
        2 => (any::<usize>(), lines(products)).prop_map(|(n, l)| WorkloadStep::Edit(n, l)),
        1 => any::<usize>().prop_map(WorkloadStep::Complete),
        1 => any::<usize>().prop_map(WorkloadStep::Cancel),
        1 => any::<usize>().prop_map(WorkloadStep::Remove),
    ]
}

/// Strategy for a workload of up to `len` steps.
pub fn workload(products: usize, len: usize) -> impl Strategy<Value = Vec<WorkloadStep>> {
    prop::collection::vec(workload_step(products), 1..len)
}
