//! Mounted content and dynamic regions.
//!
//! A region is a run of sibling nodes that can change over time, delimited
//! by a trailing anchor node. Everything the region creates is owned by its
//! scope; disposing the scope unmounts the content and releases the anchor.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::engine::{self, NodeId};
use crate::error::Result;
use crate::primitives::{
    BoundaryDescriptor, Component, Descriptor, ElementDescriptor, ListDescriptor, ListSource,
    PickDescriptor, ReactiveFn, Tag,
};
use crate::reactive::{Scope, Signal};
use crate::types::PropValue;

use super::boundary::Boundary;
use super::reconciler::{patch, HostMount};

// =============================================================================
// Mounted
// =============================================================================

/// Live counterpart of a descriptor.
#[derive(Default)]
pub(crate) enum Mounted {
    #[default]
    Empty,
    Text { node: NodeId, text: Rc<str> },
    Host(Box<HostMount>),
    Fragment(Vec<Mounted>),
    Region(Rc<Region>),
}

impl Mounted {
    /// Top-level nodes in document order.
    pub(crate) fn nodes(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_nodes(&mut out);
        out
    }

    pub(crate) fn collect_nodes(&self, out: &mut Vec<NodeId>) {
        match self {
            Mounted::Empty => {}
            Mounted::Text { node, .. } => out.push(*node),
            Mounted::Host(host) => out.push(host.node),
            Mounted::Fragment(items) => items.iter().for_each(|item| item.collect_nodes(out)),
            Mounted::Region(region) => region.collect_nodes(out),
        }
    }
}

/// Release everything `mounted` created.
pub(crate) fn unmount(mounted: Mounted) {
    match mounted {
        Mounted::Empty => {}
        Mounted::Text { node, .. } => engine::release_node(node),
        Mounted::Host(host) => HostMount::unmount(*host),
        Mounted::Fragment(items) => items.into_iter().for_each(unmount),
        Mounted::Region(region) => region.dispose(),
    }
}

// =============================================================================
// Region
// =============================================================================

/// What a region was mounted from; decides whether a new descriptor can be
/// applied in place.
pub(crate) enum RegionSource {
    Static,
    Component { component: Component, props: Signal<Rc<ElementDescriptor>> },
    Dynamic { selector: Rc<PropValue<Tag>>, element: Signal<Rc<ElementDescriptor>> },
    Reactive { thunk: Signal<ReactiveFn> },
    List { list: ListDescriptor, adopt: Rc<dyn Fn(&dyn ListSource) -> bool> },
    Pick(Signal<Rc<PickDescriptor>>),
    Boundary(Weak<Boundary>),
}

pub(crate) struct Region {
    pub(crate) label: &'static str,
    anchor: NodeId,
    scope: Scope,
    pub(crate) content: RefCell<Mounted>,
    pub(crate) source: RefCell<RegionSource>,
}

impl Region {
    /// New empty region owned by the current owner.
    pub(crate) fn new(label: &'static str) -> Rc<Self> {
        let region = Rc::new(Self {
            label,
            anchor: engine::create_anchor(),
            scope: Scope::labeled(label),
            content: RefCell::new(Mounted::Empty),
            source: RefCell::new(RegionSource::Static),
        });

        let owned = region.clone();
        region.scope.on_cleanup(move || {
            let content = owned.content.take();
            unmount(content);
            engine::release_node(owned.anchor);
            owned.source.replace(RegionSource::Static);
        });
        region
    }

    pub(crate) fn with_source(self: Rc<Self>, source: RegionSource) -> Rc<Self> {
        self.source.replace(source);
        self
    }

    pub(crate) fn scope(&self) -> Scope {
        self.scope
    }

    pub(crate) fn anchor(&self) -> NodeId {
        self.anchor
    }

    fn collect_nodes(&self, out: &mut Vec<NodeId>) {
        self.content.borrow().collect_nodes(out);
        out.push(self.anchor);
    }

    /// Content nodes, anchor excluded.
    pub(crate) fn content_nodes(&self) -> Vec<NodeId> {
        self.content.borrow().nodes()
    }

    /// Move content nodes into place right before the anchor. No-op while
    /// the region is not attached.
    pub(crate) fn settle(&self) {
        if let Some(parent) = engine::parent(self.anchor) {
            let nodes = self.content_nodes();
            engine::arrange(parent, &nodes, Some(self.anchor));
        }
    }

    /// Reconcile the content against `desc` inside the region scope, then
    /// settle.
    pub(crate) fn replace_content(&self, desc: &Descriptor) -> Result<()> {
        let mut slot = self.content.take();
        let result = self.scope.run(|| patch(&mut slot, desc));
        self.content.replace(slot);
        self.settle();
        result
    }

    /// Swap in already-mounted content, unmounting what was there.
    pub(crate) fn set_content(&self, content: Mounted) {
        let old = self.content.replace(content);
        unmount(old);
        self.settle();
    }

    /// Apply `desc` in place if this region was mounted from a compatible
    /// descriptor. `None` means the caller has to remount.
    pub(crate) fn update(&self, desc: &Descriptor) -> Option<Result<()>> {
        enum Action {
            Keep,
            SetProps(Signal<Rc<ElementDescriptor>>, Rc<ElementDescriptor>),
            SetThunk(Signal<ReactiveFn>, ReactiveFn),
            AdoptList(Rc<dyn Fn(&dyn ListSource) -> bool>, ListDescriptor),
            SetPick(Signal<Rc<PickDescriptor>>, Rc<PickDescriptor>),
            Retarget(Rc<Boundary>, Rc<BoundaryDescriptor>),
        }

        let action = match (&*self.source.borrow(), desc) {
            (RegionSource::Component { component, props }, Descriptor::Element(el)) => match &el.tag {
                Tag::Component(next) if next == component => Action::SetProps(props.clone(), el.clone()),
                _ => return None,
            },
            (RegionSource::Dynamic { selector, element }, Descriptor::Element(el)) => match &el.tag {
                Tag::Dynamic(next) if Rc::ptr_eq(next, selector) || next == selector => {
                    Action::SetProps(element.clone(), el.clone())
                }
                _ => return None,
            },
            (RegionSource::Reactive { thunk }, Descriptor::Reactive(next)) => {
                if thunk.with_untracked(|current| Rc::ptr_eq(current, next)) {
                    Action::Keep
                } else {
                    Action::SetThunk(thunk.clone(), next.clone())
                }
            }
            (RegionSource::List { list, .. }, Descriptor::List(next)) if list == next => Action::Keep,
            (RegionSource::List { adopt, .. }, Descriptor::List(next)) => {
                Action::AdoptList(adopt.clone(), next.clone())
            }
            (RegionSource::Pick(current), Descriptor::Pick(next)) => {
                if current.with_untracked(|current| Rc::ptr_eq(current, next)) {
                    Action::Keep
                } else {
                    Action::SetPick(current.clone(), next.clone())
                }
            }
            (RegionSource::Boundary(boundary), Descriptor::Boundary(next)) => {
                Action::Retarget(boundary.upgrade()?, next.clone())
            }
            _ => return None,
        };

        match action {
            Action::Keep => {}
            // Equal props are a cache hit: the signal stays silent.
            Action::SetProps(signal, el) => signal.set(el),
            Action::SetThunk(signal, thunk) => {
                signal.replace(thunk);
            }
            Action::AdoptList(adopt, next) => {
                if !adopt(&*next.source) {
                    return None;
                }
                if let RegionSource::List { list, .. } = &mut *self.source.borrow_mut() {
                    *list = next;
                }
            }
            Action::SetPick(signal, next) => {
                signal.replace(next);
            }
            Action::Retarget(boundary, next) => return Some(boundary.retarget(next)),
        }
        Some(Ok(()))
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.scope.is_alive()
    }

    pub(crate) fn dispose(&self) {
        tracing::trace!(label = self.label, "dispose region");
        self.scope.dispose();
    }
}
