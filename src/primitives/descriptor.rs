//! Tree description builder.
//!
//! Descriptors are inert: building one allocates no node and reads no
//! signal. Validation (tag names, nested dynamic selectors) is deferred to
//! render time so the builder stays pure.
//!
//! ```ignore
//! let card = el("div")
//!     .spread(base_props)
//!     .class("card")
//!     .on("click", move |_| count.update(|n| *n += 1))
//!     .child(text("hello"))
//!     .build();
//! ```

use std::fmt;
use std::rc::Rc;

use super::control_flow::{BoundaryDescriptor, ListDescriptor, PickDescriptor};
use super::props::{
    Directive, Layer, Prop, PropertyLayer, PropertyView, BIND_PREFIX, CLASS, EVENT_PREFIX, STYLE,
    THIS, USE, USE_PREFIX,
};
use crate::engine::NodeId;
use crate::error::{Error, Result};
use crate::pipeline::Env;
use crate::reactive::Signal;
use crate::types::{Cleanup, Event, PropValue, Value};

// =============================================================================
// Tag
// =============================================================================

/// Component function: flattened props and an environment in, a tree out.
pub type ComponentFn = Rc<dyn Fn(&PropertyView, &Env) -> Result<Descriptor>>;

/// A named component function. Equality is function identity.
#[derive(Clone)]
pub struct Component {
    name: Rc<str>,
    f: ComponentFn,
}

impl Component {
    pub fn new(name: &str, f: impl Fn(&PropertyView, &Env) -> Result<Descriptor> + 'static) -> Self {
        Self { name: name.into(), f: Rc::new(f) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn call(&self, props: &PropertyView, env: &Env) -> Result<Descriptor> {
        (self.f)(props, env)
    }
}

impl PartialEq for Component {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.f, &other.f)
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Component({})", self.name)
    }
}

/// What a descriptor renders as.
#[derive(Clone, PartialEq, Debug)]
pub enum Tag {
    /// Host element by name.
    Host(Rc<str>),
    /// Component invoked at render time.
    Component(Component),
    /// Children spliced into the parent, no wrapper node.
    Fragment,
    /// Selector resolved at render time and again whenever it changes.
    Dynamic(Rc<PropValue<Tag>>),
}

impl Tag {
    pub fn host(name: &str) -> Self {
        Tag::Host(name.into())
    }

    pub fn dynamic(selector: impl Into<PropValue<Tag>>) -> Self {
        Tag::Dynamic(Rc::new(selector.into()))
    }

    /// Kind name used in logs and errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Tag::Host(_) => "host",
            Tag::Component(_) => "component",
            Tag::Fragment => "fragment",
            Tag::Dynamic(_) => "dynamic",
        }
    }
}

impl From<&str> for Tag {
    fn from(name: &str) -> Self {
        Tag::host(name)
    }
}

impl From<Component> for Tag {
    fn from(component: Component) -> Self {
        Tag::Component(component)
    }
}

impl From<Tag> for PropValue<Tag> {
    fn from(tag: Tag) -> Self {
        PropValue::Static(tag)
    }
}

/// Host names must start with an ASCII letter and contain only ASCII
/// alphanumerics, `-`, `_`, `:` or `.`.
pub fn validate_host_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {
            chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.'))
        }
        _ => false,
    };
    if valid { Ok(()) } else { Err(Error::InvalidTag(name.to_string())) }
}

// =============================================================================
// Descriptor
// =============================================================================

/// Thunk producing a descriptor; re-run whenever what it read changes.
pub type ReactiveFn = Rc<dyn Fn() -> Result<Descriptor>>;

/// `tag` + layers + children.
#[derive(Clone, PartialEq, Debug)]
pub struct ElementDescriptor {
    pub tag: Tag,
    pub layers: Vec<PropertyLayer>,
    pub children: Vec<Descriptor>,
}

impl ElementDescriptor {
    /// Merged view over this element's layers and children.
    pub fn view(&self) -> PropertyView {
        PropertyView::new(self.layers.clone(), self.children.clone())
    }
}

/// Inert description of what to render.
#[derive(Clone, Default)]
pub enum Descriptor {
    #[default]
    Empty,
    Text(Rc<str>),
    Element(Rc<ElementDescriptor>),
    Reactive(ReactiveFn),
    List(ListDescriptor),
    Pick(Rc<PickDescriptor>),
    Boundary(Rc<BoundaryDescriptor>),
}

impl Descriptor {
    pub fn text(text: impl Into<Rc<str>>) -> Self {
        Descriptor::Text(text.into())
    }

    pub fn as_element(&self) -> Option<&ElementDescriptor> {
        match self {
            Descriptor::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Descriptor::Empty => "empty",
            Descriptor::Text(_) => "text",
            Descriptor::Element(el) => el.tag.kind(),
            Descriptor::Reactive(_) => "reactive",
            Descriptor::List(_) => "list",
            Descriptor::Pick(_) => "pick",
            Descriptor::Boundary(_) => "boundary",
        }
    }
}

/// Structural equality; closures and sources compare by identity. This is
/// the cache key for component short-circuiting.
impl PartialEq for Descriptor {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Descriptor::Empty, Descriptor::Empty) => true,
            (Descriptor::Text(a), Descriptor::Text(b)) => a == b,
            (Descriptor::Element(a), Descriptor::Element(b)) => Rc::ptr_eq(a, b) || a == b,
            (Descriptor::Reactive(a), Descriptor::Reactive(b)) => Rc::ptr_eq(a, b),
            (Descriptor::List(a), Descriptor::List(b)) => a == b,
            (Descriptor::Pick(a), Descriptor::Pick(b)) => Rc::ptr_eq(a, b),
            (Descriptor::Boundary(a), Descriptor::Boundary(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Descriptor::Empty => f.write_str("Empty"),
            Descriptor::Text(t) => f.debug_tuple("Text").field(t).finish(),
            Descriptor::Element(el) => fmt::Debug::fmt(&**el, f),
            other => write!(f, "{}(..)", other.kind()),
        }
    }
}

impl From<&str> for Descriptor {
    fn from(text: &str) -> Self {
        Descriptor::Text(text.into())
    }
}

impl From<String> for Descriptor {
    fn from(text: String) -> Self {
        Descriptor::Text(text.into())
    }
}

impl From<ElementDescriptor> for Descriptor {
    fn from(el: ElementDescriptor) -> Self {
        Descriptor::Element(Rc::new(el))
    }
}

impl<T: Into<Descriptor>> From<Option<T>> for Descriptor {
    fn from(value: Option<T>) -> Self {
        value.map_or(Descriptor::Empty, Into::into)
    }
}

// =============================================================================
// Builders
// =============================================================================

/// Build an element descriptor from explicit layers.
pub fn h(tag: impl Into<Tag>, layers: Vec<PropertyLayer>, children: Vec<Descriptor>) -> Descriptor {
    Descriptor::Element(Rc::new(ElementDescriptor { tag: tag.into(), layers, children }))
}

/// Static text.
pub fn text(text: impl Into<Rc<str>>) -> Descriptor {
    Descriptor::text(text)
}

/// Children with no wrapper node.
pub fn fragment(children: impl IntoIterator<Item = Descriptor>) -> Descriptor {
    h(Tag::Fragment, Vec::new(), children.into_iter().collect())
}

/// Start an [`ElementBuilder`].
pub fn el(tag: impl Into<Tag>) -> ElementBuilder {
    ElementBuilder::new(tag)
}

/// Fluent descriptor builder.
///
/// Explicit props collect into a pending layer; [`spread`](ElementBuilder::spread)
/// closes it so layer order always matches call order. Setting a key the
/// pending layer already holds also closes it, so repeated `use`/`this`
/// calls accumulate instead of overwriting.
pub struct ElementBuilder {
    tag: Tag,
    layers: Vec<PropertyLayer>,
    pending: Layer,
    children: Vec<Descriptor>,
}

impl ElementBuilder {
    pub fn new(tag: impl Into<Tag>) -> Self {
        Self { tag: tag.into(), layers: Vec::new(), pending: Layer::new(), children: Vec::new() }
    }

    fn flush(&mut self) {
        if !self.pending.is_empty() {
            let layer = std::mem::take(&mut self.pending);
            self.layers.push(layer.into());
        }
    }

    /// Set any prop.
    pub fn prop(mut self, key: &str, prop: impl Into<Prop>) -> Self {
        if self.pending.contains(key) {
            self.flush();
        }
        self.pending.insert(key, prop.into());
        self
    }

    pub fn attr(self, key: &str, value: impl Into<PropValue<Value>>) -> Self {
        self.prop(key, Prop::Value(value.into()))
    }

    pub fn class(self, value: impl Into<PropValue<Value>>) -> Self {
        self.attr(CLASS, value)
    }

    pub fn style(self, value: impl Into<PropValue<Value>>) -> Self {
        self.attr(STYLE, value)
    }

    pub fn on(self, event: &str, handler: impl Fn(&Event) + 'static) -> Self {
        self.prop(&format!("{EVENT_PREFIX}{event}"), Prop::Handler(Rc::new(handler)))
    }

    /// Two-way binding of `property` (`value` or `checked`).
    pub fn bind(self, property: &str, signal: Signal<Value>) -> Self {
        self.prop(&format!("{BIND_PREFIX}{property}"), Prop::Bind(signal))
    }

    /// Bare `use`: accumulates.
    pub fn use_directive(self, directive: Directive) -> Self {
        self.prop(USE, Prop::Directive(directive))
    }

    /// `use:<name>`: last one wins.
    pub fn use_named(self, name: &str, directive: Directive) -> Self {
        self.prop(&format!("{USE_PREFIX}{name}"), Prop::Directive(directive))
    }

    /// Ref callback (`this`): accumulates.
    pub fn this(self, f: impl Fn(NodeId) -> Option<Cleanup> + 'static) -> Self {
        self.prop(THIS, Prop::Ref(Rc::new(f)))
    }

    /// Append a whole layer after everything set so far.
    pub fn spread(mut self, layer: impl Into<PropertyLayer>) -> Self {
        self.flush();
        self.layers.push(layer.into());
        self
    }

    pub fn child(mut self, child: impl Into<Descriptor>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = Descriptor>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn build(mut self) -> Descriptor {
        self.flush();
        Descriptor::Element(Rc::new(ElementDescriptor {
            tag: self.tag,
            layers: self.layers,
            children: self.children,
        }))
    }
}

impl From<ElementBuilder> for Descriptor {
    fn from(builder: ElementBuilder) -> Self {
        builder.build()
    }
}
