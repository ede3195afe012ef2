//! Descriptor to live tree: the one place every descriptor kind is
//! dispatched.
//!
//! - `mount` creates detached content under the current owner
//! - `patch` reconciles mounted content against a new descriptor, keeping
//!   node identity wherever the kind (and host tag) is unchanged
//! - Host children are patched positionally; keyed identity comes from
//!   `for_each`

use std::rc::Rc;

use crate::engine::{self, NodeId};
use crate::error::Result;
use crate::primitives::{validate_host_name, Descriptor, ElementDescriptor, Tag};
use crate::reactive::Scope;

use super::attributes::HostProps;
use super::region::{unmount, Mounted};
use super::{boundary, branch, component, list};

// =============================================================================
// Mount
// =============================================================================

/// Mount `desc` as detached content owned by the current owner.
pub(crate) fn mount(desc: &Descriptor) -> Result<Mounted> {
    match desc {
        Descriptor::Empty => Ok(Mounted::Empty),
        Descriptor::Text(text) => {
            Ok(Mounted::Text { node: engine::create_text(text), text: text.clone() })
        }
        Descriptor::Element(el) => match &el.tag {
            Tag::Host(name) => HostMount::mount(name, el).map(|host| Mounted::Host(Box::new(host))),
            Tag::Component(c) => component::mount_component(c, el.clone()),
            Tag::Fragment => {
                if !el.layers.is_empty() {
                    tracing::debug!("props on a fragment are ignored");
                }
                mount_all(&el.children).map(Mounted::Fragment)
            }
            Tag::Dynamic(selector) => component::mount_dynamic(selector.clone(), el.clone()),
        },
        Descriptor::Reactive(thunk) => component::mount_reactive(thunk.clone()),
        Descriptor::List(list) => list::mount_list(list),
        Descriptor::Pick(pick) => branch::mount_pick(pick.clone()),
        Descriptor::Boundary(boundary) => boundary::mount_boundary(boundary.clone()),
    }
}

/// Mount every descriptor; on failure the ones already mounted are released.
fn mount_all(children: &[Descriptor]) -> Result<Vec<Mounted>> {
    let mut mounted = Vec::with_capacity(children.len());
    for child in children {
        match mount(child) {
            Ok(m) => mounted.push(m),
            Err(err) => {
                mounted.into_iter().for_each(unmount);
                return Err(err);
            }
        }
    }
    Ok(mounted)
}

// =============================================================================
// Patch
// =============================================================================

/// Reconcile `slot` against `desc`. Content that cannot be updated in place
/// is replaced: the new content is mounted first, then the old released.
pub(crate) fn patch(slot: &mut Mounted, desc: &Descriptor) -> Result<()> {
    let in_place = match (&mut *slot, desc) {
        (Mounted::Empty, Descriptor::Empty) => Some(Ok(())),
        (Mounted::Text { node, text }, Descriptor::Text(next)) => {
            if text != next {
                engine::set_text(*node, next);
                *text = next.clone();
            }
            Some(Ok(()))
        }
        (Mounted::Host(host), Descriptor::Element(el)) => match &el.tag {
            Tag::Host(name) if *name == host.tag => Some(host.patch(el)),
            _ => None,
        },
        (Mounted::Fragment(items), Descriptor::Element(el)) if matches!(el.tag, Tag::Fragment) => {
            Some(patch_children(items, &el.children))
        }
        (Mounted::Region(region), desc) => region.update(desc),
        _ => None,
    };

    match in_place {
        Some(result) => result,
        None => {
            let fresh = mount(desc)?;
            let old = std::mem::replace(slot, fresh);
            unmount(old);
            Ok(())
        }
    }
}

/// Positional child reconciliation.
fn patch_children(items: &mut Vec<Mounted>, children: &[Descriptor]) -> Result<()> {
    for (i, child) in children.iter().enumerate() {
        match items.get_mut(i) {
            Some(item) => patch(item, child)?,
            None => items.push(mount(child)?),
        }
    }
    while items.len() > children.len() {
        if let Some(extra) = items.pop() {
            unmount(extra);
        }
    }
    Ok(())
}

// =============================================================================
// Host elements
// =============================================================================

/// A mounted host element.
pub(crate) struct HostMount {
    pub(crate) node: NodeId,
    pub(crate) tag: Rc<str>,
    scope: Scope,
    props: Rc<HostProps>,
    children: Vec<Mounted>,
}

impl HostMount {
    fn mount(name: &Rc<str>, el: &ElementDescriptor) -> Result<Self> {
        validate_host_name(name)?;
        let node = engine::create_element(name);
        let scope = Scope::labeled("host");
        let props = HostProps::new(node, scope);

        let result = scope.run(|| -> Result<Vec<Mounted>> {
            let children = mount_all(&el.children)?;
            for child in &children {
                for n in child.nodes() {
                    engine::append_child(node, n);
                }
            }
            props.update(&el.layers, false)?;
            Ok(children)
        });

        match result {
            Ok(children) => {
                tracing::trace!(tag = %name, ?node, "mount host");
                Ok(Self { node, tag: name.clone(), scope, props, children })
            }
            Err(err) => {
                scope.dispose();
                engine::release_node(node);
                Err(err)
            }
        }
    }

    fn patch(&mut self, el: &ElementDescriptor) -> Result<()> {
        let scope = self.scope;
        let children = &mut self.children;
        let props = &self.props;
        let result = scope.run(|| -> Result<()> {
            patch_children(children, &el.children)?;
            props.update(&el.layers, true)
        });

        let mut nodes = Vec::new();
        for child in &self.children {
            child.collect_nodes(&mut nodes);
        }
        engine::arrange(self.node, &nodes, None);
        result
    }

    pub(crate) fn unmount(self) {
        // Child regions and bindings are owned by the host scope; the node
        // release takes the whole subtree with it.
        self.scope.dispose();
        engine::release_node(self.node);
    }
}

// =============================================================================
// Public entry
// =============================================================================

/// Detached live content produced by [`render`].
pub struct Rendered {
    content: Mounted,
}

impl Rendered {
    /// Top-level nodes in order, region anchors included.
    pub fn nodes(&self) -> Vec<NodeId> {
        self.content.nodes()
    }

    /// Attach every node to `parent`.
    pub fn append_to(&self, parent: NodeId) {
        for node in self.nodes() {
            engine::append_child(parent, node);
        }
    }

    /// Release the content and everything it owns.
    pub fn unmount(self) {
        unmount(self.content);
    }
}

/// Turn `desc` into live nodes owned by the current owner.
///
/// Errors from the initial render are returned; failures in later effect
/// runs go to the nearest error handler on the ownership chain.
pub fn render(desc: &Descriptor) -> Result<Rendered> {
    mount(desc).map(|content| Rendered { content })
}

/// [`render`] under `scope`.
pub fn render_in(scope: Scope, desc: &Descriptor) -> Result<Rendered> {
    scope.run(|| render(desc))
}
