//! Core arrays: what a node is and where it sits.

use std::rc::Rc;

use super::Column;
use crate::engine::{NodeId, NodeKind};

// =============================================================================
// Arrays
// =============================================================================

thread_local! {
    /// Node kind (`None` for free slots).
    static KIND: Column<Option<NodeKind>> = const { Column::new() };

    /// Element tag name.
    static TAG: Column<Option<Rc<str>>> = const { Column::new() };

    /// Text content of text nodes.
    static TEXT: Column<Rc<str>> = const { Column::new() };

    /// Parent node.
    static PARENT: Column<Option<NodeId>> = const { Column::new() };

    /// Ordered children.
    static CHILDREN: Column<Vec<NodeId>> = const { Column::new() };
}

// =============================================================================
// Capacity Management
// =============================================================================

pub fn ensure_capacity(index: usize) {
    KIND.with(|arr| arr.ensure(index));
    TAG.with(|arr| arr.ensure(index));
    TEXT.with(|arr| arr.ensure(index));
    PARENT.with(|arr| arr.ensure(index));
    CHILDREN.with(|arr| arr.ensure(index));
}

pub fn clear_at_index(index: usize) {
    KIND.with(|arr| arr.clear(index));
    TAG.with(|arr| arr.clear(index));
    TEXT.with(|arr| arr.clear(index));
    PARENT.with(|arr| arr.clear(index));
    CHILDREN.with(|arr| arr.clear(index));
}

pub fn reset() {
    KIND.with(Column::reset);
    TAG.with(Column::reset);
    TEXT.with(Column::reset);
    PARENT.with(Column::reset);
    CHILDREN.with(Column::reset);
}

// =============================================================================
// Accessors
// =============================================================================

pub fn kind(index: usize) -> Option<NodeKind> {
    KIND.with(|arr| arr.get(index))
}

pub fn set_kind(index: usize, kind: NodeKind) {
    KIND.with(|arr| arr.set(index, Some(kind)));
}

pub fn tag(index: usize) -> Option<Rc<str>> {
    TAG.with(|arr| arr.get(index))
}

pub fn set_tag(index: usize, tag: Rc<str>) {
    TAG.with(|arr| arr.set(index, Some(tag)));
}

pub fn text(index: usize) -> Rc<str> {
    TEXT.with(|arr| arr.get(index))
}

/// Returns false when the text was already `text`.
pub fn set_text(index: usize, text: &str) -> bool {
    TEXT.with(|arr| {
        arr.with_mut(index, |cell| {
            if &**cell == text {
                false
            } else {
                *cell = text.into();
                true
            }
        })
    })
}

pub fn parent(index: usize) -> Option<NodeId> {
    PARENT.with(|arr| arr.get(index))
}

pub fn set_parent(index: usize, parent: Option<NodeId>) {
    PARENT.with(|arr| arr.set(index, parent));
}

pub fn children(index: usize) -> Vec<NodeId> {
    CHILDREN.with(|arr| arr.get(index))
}

pub fn with_children_mut<R>(index: usize, f: impl FnOnce(&mut Vec<NodeId>) -> R) -> R {
    CHILDREN.with(|arr| arr.with_mut(index, f))
}
