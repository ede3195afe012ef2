//! Property composition - layered property bags and their merged view.
//!
//! A node's effective props come from an ordered list of layers (spread
//! props first, explicit props later). Lookups follow three rules:
//! - Scalar keys: last layer that defines the key wins
//! - `class` / `style`: every layer contributes, in layer order
//! - `use` and `this`: accumulate; `use:<name>`: last layer wins
//!
//! Layers are never mutated by the view; everything is computed on demand.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use super::descriptor::Descriptor;
use crate::engine::NodeId;
use crate::reactive::{Scope, Signal};
use crate::types::{Cleanup, EventHandler, PropValue, RefCallback, Value};

// =============================================================================
// Key conventions
// =============================================================================

pub const CLASS: &str = "class";
pub const STYLE: &str = "style";
pub const USE: &str = "use";
pub const THIS: &str = "this";
pub const USE_PREFIX: &str = "use:";
pub const EVENT_PREFIX: &str = "on:";
pub const BIND_PREFIX: &str = "bind:";

/// True for keys resolved by something other than last-layer-wins.
pub fn is_merged_key(key: &str) -> bool {
    key == CLASS || key == STYLE || key == USE || key == THIS || key.starts_with(USE_PREFIX)
}

// =============================================================================
// Directives
// =============================================================================

/// Directive implementation: `(targets, argument, scope) -> cleanup`.
///
/// Runs untracked with `scope` as owner; effects created inside belong to
/// this invocation and are disposed before the next one.
pub type DirectiveFn = Rc<dyn Fn(&[NodeId], &Value, &Scope) -> Option<Cleanup>>;

/// A directive function paired with its argument.
#[derive(Clone)]
pub struct Directive {
    pub(crate) f: DirectiveFn,
    pub(crate) arg: PropValue<Value>,
}

impl Directive {
    pub fn new(f: impl Fn(&[NodeId], &Value, &Scope) -> Option<Cleanup> + 'static) -> Self {
        Self { f: Rc::new(f), arg: PropValue::Static(Value::Null) }
    }

    /// Share an existing function.
    pub fn from_fn(f: DirectiveFn) -> Self {
        Self { f, arg: PropValue::Static(Value::Null) }
    }

    pub fn with_arg(mut self, arg: impl Into<PropValue<Value>>) -> Self {
        self.arg = arg.into();
        self
    }

    pub fn arg(&self) -> &PropValue<Value> {
        &self.arg
    }

    pub fn same_fn(&self, other: &Directive) -> bool {
        Rc::ptr_eq(&self.f, &other.f)
    }
}

impl PartialEq for Directive {
    fn eq(&self, other: &Self) -> bool {
        self.same_fn(other) && self.arg == other.arg
    }
}

impl fmt::Debug for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Directive").field("arg", &self.arg).finish_non_exhaustive()
    }
}

/// Directives resolved from a stack of layers.
///
/// Bare `use` and `this` accumulate in layer order; named directives are
/// listed once per name, in order of first appearance, with the value from
/// the last layer defining them.
#[derive(Clone, Default)]
pub struct DirectiveSet {
    pub bare: Vec<Directive>,
    pub refs: Vec<RefCallback>,
    pub named: Vec<(Rc<str>, Directive)>,
}

impl DirectiveSet {
    pub fn is_empty(&self) -> bool {
        self.bare.is_empty() && self.refs.is_empty() && self.named.is_empty()
    }

    pub fn named(&self, name: &str) -> Option<&Directive> {
        self.named.iter().find(|(n, _)| &**n == name).map(|(_, d)| d)
    }
}

// =============================================================================
// Prop
// =============================================================================

/// One entry of a property layer.
#[derive(Clone)]
pub enum Prop {
    /// Attribute or property value.
    Value(PropValue<Value>),
    /// `on:<event>` listener.
    Handler(EventHandler),
    /// `bind:<property>` two-way binding.
    Bind(Signal<Value>),
    /// `use` / `use:<name>`.
    Directive(Directive),
    /// `this`.
    Ref(RefCallback),
    /// Opaque value for components; ignored on host elements.
    Any(Rc<dyn Any>),
}

impl Prop {
    pub fn as_value(&self) -> Option<&PropValue<Value>> {
        match self {
            Prop::Value(v) => Some(v),
            _ => None,
        }
    }

    /// True if reading this prop may change over time.
    pub fn is_reactive(&self) -> bool {
        match self {
            Prop::Value(v) => v.is_reactive(),
            Prop::Bind(_) => true,
            Prop::Directive(d) => d.arg.is_reactive(),
            _ => false,
        }
    }
}

/// Values compare structurally, closures and signals by identity.
impl PartialEq for Prop {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Prop::Value(a), Prop::Value(b)) => a == b,
            (Prop::Handler(a), Prop::Handler(b)) => Rc::ptr_eq(a, b),
            (Prop::Bind(a), Prop::Bind(b)) => a.ptr_eq(b),
            (Prop::Directive(a), Prop::Directive(b)) => a == b,
            (Prop::Ref(a), Prop::Ref(b)) => Rc::ptr_eq(a, b),
            (Prop::Any(a), Prop::Any(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Prop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prop::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Prop::Handler(_) => f.write_str("Handler(..)"),
            Prop::Bind(s) => f.debug_tuple("Bind").field(s).finish(),
            Prop::Directive(d) => f.debug_tuple("Directive").field(d).finish(),
            Prop::Ref(_) => f.write_str("Ref(..)"),
            Prop::Any(_) => f.write_str("Any(..)"),
        }
    }
}

impl From<PropValue<Value>> for Prop {
    fn from(v: PropValue<Value>) -> Self {
        Prop::Value(v)
    }
}

impl From<Value> for Prop {
    fn from(v: Value) -> Self {
        Prop::Value(PropValue::Static(v))
    }
}

impl From<&str> for Prop {
    fn from(v: &str) -> Self {
        Prop::Value(PropValue::Static(v.into()))
    }
}

impl From<String> for Prop {
    fn from(v: String) -> Self {
        Prop::Value(PropValue::Static(v.into()))
    }
}

impl From<bool> for Prop {
    fn from(v: bool) -> Self {
        Prop::Value(PropValue::Static(v.into()))
    }
}

impl From<i64> for Prop {
    fn from(v: i64) -> Self {
        Prop::Value(PropValue::Static(v.into()))
    }
}

impl From<i32> for Prop {
    fn from(v: i32) -> Self {
        Prop::Value(PropValue::Static(v.into()))
    }
}

impl From<Signal<Value>> for Prop {
    fn from(v: Signal<Value>) -> Self {
        Prop::Value(PropValue::Signal(v))
    }
}

impl From<Directive> for Prop {
    fn from(v: Directive) -> Self {
        Prop::Directive(v)
    }
}

// =============================================================================
// Layer
// =============================================================================

/// An ordered property bag. Keys are unique within one layer.
#[derive(Clone, Default, PartialEq, Debug)]
pub struct Layer {
    entries: Vec<(Rc<str>, Prop)>,
}

impl Layer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`insert`](Layer::insert).
    pub fn with(mut self, key: &str, prop: impl Into<Prop>) -> Self {
        self.insert(key, prop.into());
        self
    }

    /// Set `key`, replacing an earlier entry for the same key in place.
    pub fn insert(&mut self, key: &str, prop: Prop) {
        match self.entries.iter_mut().find(|(k, _)| &**k == key) {
            Some(entry) => entry.1 = prop,
            None => self.entries.push((key.into(), prop)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Prop> {
        self.entries.iter().find(|(k, _)| &**k == key).map(|(_, p)| p)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &Rc<str>> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Rc<str>, &Prop)> {
        self.entries.iter().map(|(k, p)| (k, p))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One layer of a node's props: fixed, or swapped as a whole by a signal.
#[derive(Clone, Debug)]
pub enum PropertyLayer {
    Static(Rc<Layer>),
    Reactive(Signal<Layer>),
}

impl PropertyLayer {
    pub fn is_reactive(&self) -> bool {
        matches!(self, PropertyLayer::Reactive(_))
    }

    /// Borrow the layer (tracked for reactive layers).
    pub fn with<R>(&self, f: impl FnOnce(&Layer) -> R) -> R {
        match self {
            PropertyLayer::Static(layer) => f(layer),
            PropertyLayer::Reactive(signal) => signal.with(f),
        }
    }
}

impl PartialEq for PropertyLayer {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (PropertyLayer::Static(a), PropertyLayer::Static(b)) => Rc::ptr_eq(a, b) || a == b,
            (PropertyLayer::Reactive(a), PropertyLayer::Reactive(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl From<Layer> for PropertyLayer {
    fn from(layer: Layer) -> Self {
        PropertyLayer::Static(Rc::new(layer))
    }
}

impl From<Signal<Layer>> for PropertyLayer {
    fn from(signal: Signal<Layer>) -> Self {
        PropertyLayer::Reactive(signal)
    }
}

// =============================================================================
// PropertyView
// =============================================================================

/// Read-only merged view over ordered layers.
///
/// Reads through reactive layers and reactive values are tracked, so a view
/// read inside an effect subscribes that effect to exactly what it looked
/// at.
#[derive(Clone, Default)]
pub struct PropertyView {
    layers: Rc<[PropertyLayer]>,
    children: Rc<[Descriptor]>,
}

impl PropertyView {
    pub fn new(layers: impl Into<Rc<[PropertyLayer]>>, children: impl Into<Rc<[Descriptor]>>) -> Self {
        Self { layers: layers.into(), children: children.into() }
    }

    /// View over bare layers, no children.
    pub fn of(layers: Vec<PropertyLayer>) -> Self {
        Self::new(layers, Vec::<Descriptor>::new())
    }

    pub fn layers(&self) -> &[PropertyLayer] {
        &self.layers
    }

    pub fn children(&self) -> &[Descriptor] {
        &self.children
    }

    /// True if any layer is a reactive container.
    pub fn is_reactive(&self) -> bool {
        self.layers.iter().any(PropertyLayer::is_reactive)
    }

    /// Last layer defining `key` wins.
    pub fn get(&self, key: &str) -> Option<Prop> {
        self.layers.iter().rev().find_map(|layer| layer.with(|l| l.get(key).cloned()))
    }

    /// [`get`](PropertyView::get) resolved to a plain value (tracked).
    pub fn value(&self, key: &str) -> Value {
        match self.get(key) {
            Some(Prop::Value(v)) => v.get(),
            Some(Prop::Bind(s)) => s.get(),
            _ => Value::Null,
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.layers.iter().any(|layer| layer.with(|l| l.contains(key)))
    }

    /// Every key across layers, in order of first appearance.
    pub fn keys(&self) -> Vec<Rc<str>> {
        let mut keys: Vec<Rc<str>> = Vec::new();
        for layer in self.layers.iter() {
            layer.with(|l| {
                for key in l.keys() {
                    if !keys.contains(key) {
                        keys.push(key.clone());
                    }
                }
            });
        }
        keys
    }

    /// Every layer's value for `key`, in layer order.
    pub fn all(&self, key: &str) -> Vec<Prop> {
        self.layers.iter().filter_map(|layer| layer.with(|l| l.get(key).cloned())).collect()
    }

    /// Class tokens from every layer, in order, duplicates kept.
    pub fn classes(&self) -> Vec<Rc<str>> {
        let mut tokens = Vec::new();
        for prop in self.all(CLASS) {
            if let Prop::Value(v) = prop {
                collect_class_tokens(&v.get(), &mut tokens);
            }
        }
        tokens
    }

    /// [`classes`](PropertyView::classes) with repeats removed, first
    /// occurrence kept. This is the form written to nodes.
    pub fn class_list(&self) -> Vec<Rc<str>> {
        let mut unique: Vec<Rc<str>> = Vec::new();
        for token in self.classes() {
            if !unique.contains(&token) {
                unique.push(token);
            }
        }
        unique
    }

    /// Style fragments from every layer, in order.
    pub fn styles(&self) -> Vec<Value> {
        self.all(STYLE)
            .into_iter()
            .filter_map(|prop| match prop {
                Prop::Value(v) => Some(v.get()),
                _ => None,
            })
            .filter(|v| !v.is_null())
            .collect()
    }

    /// Style fragments applied in order: later fragments override earlier
    /// declarations of the same property, unrelated ones survive.
    pub fn resolved_style(&self) -> Vec<(Rc<str>, String)> {
        let mut decls: Vec<(Rc<str>, String)> = Vec::new();
        for fragment in self.styles() {
            apply_style_fragment(&fragment, &mut decls);
        }
        decls
    }

    /// Directives, split into accumulating and overriding collections.
    pub fn directives(&self) -> DirectiveSet {
        let mut set = DirectiveSet::default();
        for layer in self.layers.iter() {
            layer.with(|l| {
                for (key, prop) in l.iter() {
                    match (&**key, prop) {
                        (USE, Prop::Directive(d)) => set.bare.push(d.clone()),
                        (THIS, Prop::Ref(r)) => set.refs.push(r.clone()),
                        (k, Prop::Directive(d)) if k.starts_with(USE_PREFIX) => {
                            let name: Rc<str> = k[USE_PREFIX.len()..].into();
                            match set.named.iter_mut().find(|(n, _)| *n == name) {
                                Some(entry) => entry.1 = d.clone(),
                                None => set.named.push((name, d.clone())),
                            }
                        }
                        _ => {}
                    }
                }
            });
        }
        set
    }
}

impl fmt::Debug for PropertyView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyView")
            .field("layers", &self.layers.len())
            .field("children", &self.children.len())
            .finish()
    }
}

/// Compose layers into a view.
pub fn compose(layers: impl IntoIterator<Item = PropertyLayer>) -> PropertyView {
    PropertyView::of(layers.into_iter().collect())
}

fn collect_class_tokens(value: &Value, out: &mut Vec<Rc<str>>) {
    match value {
        Value::Str(s) => out.extend(s.split_whitespace().map(Rc::from)),
        Value::List(items) => {
            for item in items.iter() {
                collect_class_tokens(item, out);
            }
        }
        Value::Map(entries) => {
            for (name, enabled) in entries.iter() {
                if enabled.truthy() {
                    out.extend(name.split_whitespace().map(Rc::from));
                }
            }
        }
        Value::Null | Value::Bool(_) | Value::Int(_) | Value::Float(_) => {}
    }
}

fn apply_style_fragment(fragment: &Value, decls: &mut Vec<(Rc<str>, String)>) {
    match fragment {
        Value::Str(text) => {
            for decl in text.split(';') {
                if let Some((name, value)) = decl.split_once(':') {
                    set_style_decl(decls, name, Some(value.trim().to_string()));
                }
            }
        }
        Value::Map(entries) => {
            for (name, value) in entries.iter() {
                set_style_decl(decls, name, value.to_attribute());
            }
        }
        Value::List(items) => {
            for item in items.iter() {
                apply_style_fragment(item, decls);
            }
        }
        Value::Null | Value::Bool(_) | Value::Int(_) | Value::Float(_) => {}
    }
}

/// `None` removes the declaration. An existing declaration keeps its slot.
fn set_style_decl(decls: &mut Vec<(Rc<str>, String)>, name: &str, value: Option<String>) {
    let name = name.trim();
    if name.is_empty() {
        return;
    }
    let position = decls.iter().position(|(k, _)| &**k == name);
    match (position, value) {
        (Some(i), Some(value)) => decls[i].1 = value,
        (None, Some(value)) => decls.push((name.into(), value)),
        (Some(i), None) => {
            decls.remove(i);
        }
        (None, None) => {}
    }
}
