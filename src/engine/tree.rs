//! Live tree operations.
//!
//! Every write that changes observable host state bumps a per-thread
//! mutation counter. Writes that would leave the node as it is are
//! skipped and not counted.

use std::cell::Cell;
use std::collections::{BTreeMap, HashSet};
use std::fmt::Write as _;
use std::rc::Rc;

use super::arrays::attrs::{self, StyleDecls};
use super::arrays::core as core_arrays;
use super::arrays::interaction::{self, Listener, ListenerId};
use super::registry::{allocate_node, is_allocated, NodeId, NodeKind};
use crate::types::{Event, EventHandler, Value};

thread_local! {
    static MUTATIONS: Cell<u64> = const { Cell::new(0) };
    static NEXT_LISTENER: Cell<u64> = const { Cell::new(0) };
}

fn mutated() {
    MUTATIONS.with(|m| m.set(m.get() + 1));
}

/// Number of host mutations performed on this thread so far.
pub fn mutation_count() -> u64 {
    MUTATIONS.with(Cell::get)
}

// =============================================================================
// Creation
// =============================================================================

pub fn create_element(tag: &str) -> NodeId {
    let id = allocate_node(NodeKind::Element);
    core_arrays::set_tag(id.index(), tag.into());
    mutated();
    id
}

pub fn create_text(text: &str) -> NodeId {
    let id = allocate_node(NodeKind::Text);
    core_arrays::set_text(id.index(), text);
    mutated();
    id
}

pub fn create_anchor() -> NodeId {
    allocate_node(NodeKind::Anchor)
}

pub fn create_root() -> NodeId {
    allocate_node(NodeKind::Root)
}

// =============================================================================
// Queries
// =============================================================================

pub fn kind(id: NodeId) -> Option<NodeKind> {
    is_allocated(id).then(|| core_arrays::kind(id.index())).flatten()
}

pub fn tag(id: NodeId) -> Option<Rc<str>> {
    is_allocated(id).then(|| core_arrays::tag(id.index())).flatten()
}

pub fn text(id: NodeId) -> Option<Rc<str>> {
    (kind(id) == Some(NodeKind::Text)).then(|| core_arrays::text(id.index()))
}

pub fn parent(id: NodeId) -> Option<NodeId> {
    is_allocated(id).then(|| core_arrays::parent(id.index())).flatten()
}

pub fn children(id: NodeId) -> Vec<NodeId> {
    if is_allocated(id) { core_arrays::children(id.index()) } else { Vec::new() }
}

/// Children that render (anchors skipped).
pub fn visible_children(id: NodeId) -> Vec<NodeId> {
    children(id).into_iter().filter(|c| kind(*c) != Some(NodeKind::Anchor)).collect()
}

// =============================================================================
// Structure
// =============================================================================

pub fn append_child(parent: NodeId, child: NodeId) {
    insert_before(parent, child, None);
}

/// Insert `child` before `reference` (or last when `None`), moving it if it
/// is already attached somewhere.
pub fn insert_before(parent: NodeId, child: NodeId, reference: Option<NodeId>) {
    if !is_allocated(parent) || !is_allocated(child) || Some(child) == reference {
        return;
    }
    detach(child);
    core_arrays::with_children_mut(parent.index(), |children| {
        let position = reference
            .and_then(|r| children.iter().position(|c| *c == r))
            .unwrap_or(children.len());
        children.insert(position, child);
    });
    core_arrays::set_parent(child.index(), Some(parent));
    mutated();
}

/// Remove `child` from its parent without releasing it.
pub fn detach(child: NodeId) {
    if let Some(parent) = parent(child) {
        core_arrays::with_children_mut(parent.index(), |children| children.retain(|c| *c != child));
        core_arrays::set_parent(child.index(), None);
        mutated();
    }
}

/// Place `nodes` consecutively right before `before` (or at the end of
/// `parent`), moving only nodes that are not already in place.
///
/// The current child sequence is walked once, back to front, alongside
/// `nodes`; only misplaced nodes pay for a move.
pub fn arrange(parent: NodeId, nodes: &[NodeId], before: Option<NodeId>) {
    if !is_allocated(parent) {
        return;
    }
    let existing = core_arrays::children(parent.index());
    // Index just past the last sibling that may still be in place
    let mut position = match before {
        None => existing.len(),
        Some(reference) => existing.iter().position(|c| *c == reference).unwrap_or(0),
    };
    let mut moved: HashSet<NodeId> = HashSet::new();
    let mut cursor = before;
    for node in nodes.iter().rev() {
        while position > 0 && moved.contains(&existing[position - 1]) {
            position -= 1;
        }
        if position > 0 && existing[position - 1] == *node {
            position -= 1;
        } else {
            tracing::trace!(?node, ?cursor, "move");
            insert_before(parent, *node, cursor);
            moved.insert(*node);
        }
        cursor = Some(*node);
    }
}

pub fn set_text(id: NodeId, text: &str) {
    if kind(id) == Some(NodeKind::Text) && core_arrays::set_text(id.index(), text) {
        mutated();
    }
}

// =============================================================================
// Attributes, properties, style
// =============================================================================

pub fn attribute(id: NodeId, name: &str) -> Option<String> {
    attrs::attribute(id.index(), name).filter(|_| is_allocated(id))
}

/// Set (`Some`) or remove (`None`) an attribute.
pub fn set_attribute(id: NodeId, name: &str, value: Option<String>) {
    if is_allocated(id) && attrs::set_attribute(id.index(), name, value) {
        mutated();
    }
}

pub fn property(id: NodeId, name: &str) -> Value {
    if is_allocated(id) { attrs::property(id.index(), name) } else { Value::Null }
}

pub fn set_property(id: NodeId, name: &str, value: Value) {
    if is_allocated(id) && attrs::set_property(id.index(), name, value) {
        mutated();
    }
}

pub fn styles(id: NodeId) -> StyleDecls {
    if is_allocated(id) { attrs::styles(id.index()) } else { Vec::new() }
}

pub fn style(id: NodeId, property: &str) -> Option<String> {
    styles(id).into_iter().find(|(k, _)| &**k == property).map(|(_, v)| v)
}

pub fn set_styles(id: NodeId, decls: StyleDecls) {
    if is_allocated(id) && attrs::set_styles(id.index(), decls) {
        mutated();
    }
}

// =============================================================================
// Events
// =============================================================================

pub fn add_listener(id: NodeId, event: &str, handler: EventHandler) -> ListenerId {
    let listener_id = NEXT_LISTENER.with(|n| {
        let next = n.get();
        n.set(next + 1);
        ListenerId(next)
    });
    if is_allocated(id) {
        interaction::push_listener(
            id.index(),
            Listener { id: listener_id, event: event.into(), handler },
        );
    }
    listener_id
}

pub fn remove_listener(id: NodeId, listener: ListenerId) -> bool {
    is_allocated(id) && interaction::remove_listener(id.index(), listener)
}

pub fn listener_count(id: NodeId, event: &str) -> usize {
    if is_allocated(id) { interaction::listener_count(id.index(), event) } else { 0 }
}

/// Deliver `event` to every listener registered on its target for its
/// name. Returns how many handlers ran.
pub fn dispatch(event: &Event) -> usize {
    if !is_allocated(event.target) {
        return 0;
    }
    let handlers = interaction::handlers_for(event.target.index(), &event.name);
    for handler in &handlers {
        handler(event);
    }
    handlers.len()
}

/// Simulate a click.
pub fn click(id: NodeId) -> usize {
    dispatch(&Event::new("click", id))
}

/// Simulate typing: set the `value` property, then dispatch `input`.
pub fn input_value(id: NodeId, value: &str) -> usize {
    set_property(id, "value", Value::from(value));
    dispatch(&Event::new("input", id).with_detail(value))
}

/// Simulate toggling a checkbox: set `checked`, then dispatch `change`.
pub fn set_checked(id: NodeId, checked: bool) -> usize {
    set_property(id, "checked", Value::Bool(checked));
    dispatch(&Event::new("change", id).with_detail(checked))
}

// =============================================================================
// Markers
// =============================================================================

pub fn marker(id: NodeId, key: &str) -> Option<Value> {
    if is_allocated(id) { interaction::marker(id.index(), key) } else { None }
}

pub fn set_marker(id: NodeId, key: &str, value: impl Into<Value>) {
    if is_allocated(id) {
        interaction::set_marker(id.index(), key, value.into());
    }
}

// =============================================================================
// Serialization
// =============================================================================

/// HTML-like rendering of `id` and its subtree. Anchors are omitted,
/// attributes are sorted, truthy boolean properties render bare.
pub fn outer_html(id: NodeId) -> String {
    let mut out = String::new();
    write_node(&mut out, id);
    out
}

/// [`outer_html`] of every child, concatenated.
pub fn inner_html(id: NodeId) -> String {
    let mut out = String::new();
    for child in children(id) {
        write_node(&mut out, child);
    }
    out
}

fn write_node(out: &mut String, id: NodeId) {
    match kind(id) {
        None | Some(NodeKind::Anchor) => {}
        Some(NodeKind::Text) => out.push_str(&escape(&core_arrays::text(id.index()), false)),
        Some(NodeKind::Root) => {
            for child in children(id) {
                write_node(out, child);
            }
        }
        Some(NodeKind::Element) => {
            let tag = core_arrays::tag(id.index()).unwrap_or_else(|| "".into());
            out.push('<');
            out.push_str(&tag);
            for (name, value) in serialized_attributes(id) {
                match value {
                    Some(value) => {
                        let _ = write!(out, " {name}=\"{}\"", escape(&value, true));
                    }
                    None => {
                        let _ = write!(out, " {name}");
                    }
                }
            }
            out.push('>');
            for child in children(id) {
                write_node(out, child);
            }
            let _ = write!(out, "</{tag}>");
        }
    }
}

fn serialized_attributes(id: NodeId) -> BTreeMap<String, Option<String>> {
    let mut merged: BTreeMap<String, Option<String>> = attrs::attributes(id.index())
        .into_iter()
        .map(|(k, v)| (k.to_string(), Some(v)))
        .collect();
    for (name, value) in attrs::properties(id.index()) {
        match value {
            Value::Bool(true) => {
                merged.insert(name.to_string(), None);
            }
            Value::Bool(false) | Value::Null => {}
            other => {
                merged.insert(name.to_string(), Some(other.to_string()));
            }
        }
    }
    let decls = attrs::styles(id.index());
    if !decls.is_empty() {
        let style = decls.iter().map(|(k, v)| format!("{k}: {v}")).collect::<Vec<_>>().join("; ");
        merged.insert("style".to_string(), Some(style));
    }
    merged
}

fn escape(text: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            other => out.push(other),
        }
    }
    out
}
