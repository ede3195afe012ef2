//! Parallel arrays holding all live node state.
//!
//! Each array index corresponds to one node; the registry owns allocation.
//! Arrays grow on demand and are reset once the last node is released.
//!
//! # Array Categories
//!
//! - **core**: kind, tag, text, parent, children
//! - **attrs**: attributes, properties, style declarations
//! - **interaction**: event listeners, external markers

pub mod attrs;
pub mod core;
pub mod interaction;

use std::cell::RefCell;

use self::attrs as attr_arrays;
use self::core as core_arrays;
use self::interaction as interaction_arrays;

/// One column of per-node state.
pub struct Column<T> {
    cells: RefCell<Vec<T>>,
}

impl<T: Default> Column<T> {
    pub const fn new() -> Self {
        Self { cells: RefCell::new(Vec::new()) }
    }

    pub fn ensure(&self, index: usize) {
        let mut cells = self.cells.borrow_mut();
        if cells.len() <= index {
            cells.resize_with(index + 1, T::default);
        }
    }

    /// Read a cell. Out-of-range reads see the default value.
    pub fn with<R>(&self, index: usize, f: impl FnOnce(&T) -> R) -> R {
        let cells = self.cells.borrow();
        match cells.get(index) {
            Some(cell) => f(cell),
            None => f(&T::default()),
        }
    }

    pub fn with_mut<R>(&self, index: usize, f: impl FnOnce(&mut T) -> R) -> R {
        self.ensure(index);
        f(&mut self.cells.borrow_mut()[index])
    }

    pub fn set(&self, index: usize, value: T) {
        self.with_mut(index, |cell| *cell = value);
    }

    pub fn clear(&self, index: usize) {
        if let Some(cell) = self.cells.borrow_mut().get_mut(index) {
            *cell = T::default();
        }
    }

    pub fn reset(&self) {
        self.cells.borrow_mut().clear();
    }
}

impl<T: Default + Clone> Column<T> {
    pub fn get(&self, index: usize) -> T {
        self.with(index, T::clone)
    }
}

impl<T: Default> Default for Column<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Ensure all arrays have capacity for the given index.
///
/// Called by registry when allocating.
pub fn ensure_all_capacity(index: usize) {
    core_arrays::ensure_capacity(index);
    attr_arrays::ensure_capacity(index);
    interaction_arrays::ensure_capacity(index);
}

/// Clear all array values at an index.
///
/// Called by registry when releasing.
pub fn clear_all_at_index(index: usize) {
    core_arrays::clear_at_index(index);
    attr_arrays::clear_at_index(index);
    interaction_arrays::clear_at_index(index);
}

/// Reset all parallel arrays to release memory.
///
/// Called automatically when the last node is released.
pub fn reset_all_arrays() {
    core_arrays::reset();
    attr_arrays::reset();
    interaction_arrays::reset();
}
