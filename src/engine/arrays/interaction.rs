//! Interaction arrays: event listeners and external markers.
//!
//! Markers are arbitrary key/value annotations attached by code outside
//! the reconciler (tests, devtools, directives). They live and die with
//! the node, which makes them a direct observation of node identity.

use std::collections::BTreeMap;
use std::rc::Rc;

use super::Column;
use crate::types::{EventHandler, Value};

/// Identity of one registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);

#[derive(Clone)]
pub struct Listener {
    pub id: ListenerId,
    pub event: Rc<str>,
    pub handler: EventHandler,
}

// =============================================================================
// Arrays
// =============================================================================

thread_local! {
    /// Registered listeners in registration order.
    static LISTENERS: Column<Vec<Listener>> = const { Column::new() };

    /// External markers.
    static MARKERS: Column<BTreeMap<Rc<str>, Value>> = const { Column::new() };
}

// =============================================================================
// Capacity Management
// =============================================================================

pub fn ensure_capacity(index: usize) {
    LISTENERS.with(|arr| arr.ensure(index));
    MARKERS.with(|arr| arr.ensure(index));
}

pub fn clear_at_index(index: usize) {
    LISTENERS.with(|arr| arr.clear(index));
    MARKERS.with(|arr| arr.clear(index));
}

pub fn reset() {
    LISTENERS.with(Column::reset);
    MARKERS.with(Column::reset);
}

// =============================================================================
// Listeners
// =============================================================================

pub fn push_listener(index: usize, listener: Listener) {
    LISTENERS.with(|arr| arr.with_mut(index, |list| list.push(listener)));
}

/// Returns whether the listener was registered.
pub fn remove_listener(index: usize, id: ListenerId) -> bool {
    LISTENERS.with(|arr| {
        arr.with_mut(index, |list| {
            let before = list.len();
            list.retain(|l| l.id != id);
            list.len() != before
        })
    })
}

/// Handlers for `event`, cloned so they can run without a borrow held.
pub fn handlers_for(index: usize, event: &str) -> Vec<EventHandler> {
    LISTENERS.with(|arr| {
        arr.with(index, |list| {
            list.iter()
                .filter(|l| &*l.event == event)
                .map(|l| l.handler.clone())
                .collect()
        })
    })
}

pub fn listener_count(index: usize, event: &str) -> usize {
    LISTENERS.with(|arr| arr.with(index, |list| list.iter().filter(|l| &*l.event == event).count()))
}

// =============================================================================
// Markers
// =============================================================================

pub fn marker(index: usize, key: &str) -> Option<Value> {
    MARKERS.with(|arr| arr.with(index, |map| map.get(key).cloned()))
}

pub fn set_marker(index: usize, key: &str, value: Value) {
    MARKERS.with(|arr| {
        arr.with_mut(index, |map| {
            map.insert(key.into(), value);
        })
    });
}
