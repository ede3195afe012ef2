//! Node Registry - Index allocation for parallel arrays.
//!
//! Manages the lifecycle of node indices:
//! - Generational ids so stale handles are inert after release
//! - Free index pool for O(1) reuse
//! - Reset-on-zero: arrays are dropped once the last node is released

use std::cell::{Cell, RefCell};

use super::arrays;
use super::arrays::core as core_arrays;

/// Handle to a live node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    pub fn index(&self) -> usize {
        self.index as usize
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

/// What a node is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// A host element with a tag name.
    Element,
    /// A text node.
    Text,
    /// Invisible marker delimiting a dynamic region.
    Anchor,
    /// A mount container.
    Root,
}

// =============================================================================
// Registry State
// =============================================================================

thread_local! {
    /// Current generation per index. Survives resets.
    static GENERATIONS: RefCell<Vec<u32>> = const { RefCell::new(Vec::new()) };

    /// Pool of freed indices for reuse.
    static FREE_INDICES: RefCell<Vec<u32>> = const { RefCell::new(Vec::new()) };

    /// Next index to allocate if pool is empty.
    static NEXT_INDEX: Cell<u32> = const { Cell::new(0) };

    /// Number of live nodes.
    static ALLOCATED_COUNT: Cell<usize> = const { Cell::new(0) };
}

// =============================================================================
// Index Allocation
// =============================================================================

/// Allocate a node of `kind`.
pub fn allocate_node(kind: NodeKind) -> NodeId {
    let index = FREE_INDICES.with(|free| free.borrow_mut().pop()).unwrap_or_else(|| {
        NEXT_INDEX.with(|next| {
            let index = next.get();
            next.set(index + 1);
            index
        })
    });

    let generation = GENERATIONS.with(|generations| {
        let mut generations = generations.borrow_mut();
        if generations.len() <= index as usize {
            generations.resize(index as usize + 1, 0);
        }
        generations[index as usize]
    });

    arrays::ensure_all_capacity(index as usize);
    core_arrays::set_kind(index as usize, kind);
    ALLOCATED_COUNT.with(|count| count.set(count.get() + 1));

    NodeId { index, generation }
}

/// Release a node back to the pool.
///
/// Detaches it from its parent and recursively releases all children.
pub fn release_node(id: NodeId) {
    if !is_allocated(id) {
        return;
    }

    if let Some(parent) = core_arrays::parent(id.index()) {
        core_arrays::with_children_mut(parent.index(), |children| children.retain(|c| *c != id));
    }
    release_subtree(id);

    // AUTO-CLEANUP: When all nodes are released, reset all arrays to free memory
    if allocated_count() == 0 {
        arrays::reset_all_arrays();
        FREE_INDICES.with(|free| free.borrow_mut().clear());
        NEXT_INDEX.with(|next| next.set(0));
    }
}

fn release_subtree(id: NodeId) {
    // Children first
    for child in core_arrays::children(id.index()) {
        if is_allocated(child) {
            release_subtree(child);
        }
    }

    arrays::clear_all_at_index(id.index());

    GENERATIONS.with(|generations| {
        if let Some(generation) = generations.borrow_mut().get_mut(id.index()) {
            *generation = generation.wrapping_add(1);
        }
    });
    FREE_INDICES.with(|free| free.borrow_mut().push(id.index));
    ALLOCATED_COUNT.with(|count| count.set(count.get().saturating_sub(1)));
}

// =============================================================================
// Lookups
// =============================================================================

/// True while `id` refers to a live node.
pub fn is_allocated(id: NodeId) -> bool {
    let current = GENERATIONS.with(|generations| generations.borrow().get(id.index()).copied());
    current == Some(id.generation) && core_arrays::kind(id.index()).is_some()
}

/// Count of currently allocated nodes.
pub fn allocated_count() -> usize {
    ALLOCATED_COUNT.with(Cell::get)
}

// =============================================================================
// Reset (for testing)
// =============================================================================

/// Reset all registry state (for testing). Generations are kept so ids from
/// before the reset stay inert.
pub fn reset_registry() {
    FREE_INDICES.with(|free| free.borrow_mut().clear());
    NEXT_INDEX.with(|next| next.set(0));
    ALLOCATED_COUNT.with(|count| count.set(0));
    GENERATIONS.with(|generations| {
        for generation in generations.borrow_mut().iter_mut() {
            *generation = generation.wrapping_add(1);
        }
    });
    arrays::reset_all_arrays();
}
