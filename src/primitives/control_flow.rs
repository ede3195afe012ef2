//! Control flow - keyed lists, oracle-driven picks, error boundaries.
//!
//! These build descriptors like any other builder; nothing is evaluated
//! until the reconciler mounts them.
//!
//! ```ignore
//! let rows = for_each(
//!     move || todos.get(),
//!     |todo| todo.id,
//!     |todo| el("li").child(reactive(move || text(todo.get().title))).build(),
//! );
//! let body = show(move || loading.get(), || text("loading"), || rows.clone());
//! let safe = try_catch(body, |err, _reset| text(format!("failed: {err}")));
//! ```

use std::any::Any;
use std::fmt::Debug;
use std::hash::Hash;
use std::rc::Rc;

use super::descriptor::{Descriptor, ReactiveFn, Tag};
use crate::error::{Error, Result};
use crate::pipeline::list::{reactive_region, ListRows};
use crate::reactive::{project, signal, Signal};
use crate::types::PropValue;

// =============================================================================
// Keyed lists
// =============================================================================

/// Something the reconciler can open into a live list of item regions.
pub(crate) trait ListSource: Any {
    fn open(&self) -> Result<ListRows>;

    fn as_any(&self) -> &dyn Any;
}

/// Keyed list descriptor. Two lists are the same list only if they share a
/// source.
#[derive(Clone)]
pub struct ListDescriptor {
    pub(crate) source: Rc<dyn ListSource>,
}

impl PartialEq for ListDescriptor {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.source, &other.source)
    }
}

struct KeyedList<T, K> {
    items: Rc<dyn Fn() -> Vec<T>>,
    key: Rc<dyn Fn(&T) -> K>,
    render: Rc<dyn Fn(Signal<T>) -> Descriptor>,
}

impl<T, K> Clone for KeyedList<T, K> {
    fn clone(&self) -> Self {
        Self { items: self.items.clone(), key: self.key.clone(), render: self.render.clone() }
    }
}

impl<T, K> ListSource for KeyedList<T, K>
where
    T: Clone + PartialEq + 'static,
    K: Clone + Eq + Hash + Debug + 'static,
{
    /// The projection reads the closures through `current`, so a list
    /// rebuilt by a re-rendering parent is adopted by swapping them in:
    /// live keys keep their item regions and only new keys use the new
    /// `render`.
    fn open(&self) -> Result<ListRows> {
        let current = signal(self.clone());

        let items = current.clone();
        let key = current.clone();
        let render = current.clone();
        let projection = project(
            move || {
                let items = items.with(|list| list.items.clone());
                items()
            },
            move |item| key.with_untracked(|list| (list.key)(item)),
            move |item, _key| {
                let render = render.with_untracked(|list| list.render.clone());
                let thunk: ReactiveFn = Rc::new(move || Ok(render(item.clone())));
                reactive_region(thunk)
            },
        )?;

        let rows = projection.rows();
        Ok(ListRows {
            rows: Box::new(move || rows.with(|rows| rows.iter().map(|row| (*row.value).clone()).collect())),
            adopt: Box::new(move |next: &dyn ListSource| match next.as_any().downcast_ref::<Self>() {
                Some(list) => {
                    current.replace(list.clone());
                    true
                }
                None => false,
            }),
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Keyed list. `render` runs once per key; later changes to an item reach
/// it through the item signal only.
pub fn for_each<T, K>(
    items: impl Fn() -> Vec<T> + 'static,
    key: impl Fn(&T) -> K + 'static,
    render: impl Fn(Signal<T>) -> Descriptor + 'static,
) -> Descriptor
where
    T: Clone + PartialEq + 'static,
    K: Clone + Eq + Hash + Debug + 'static,
{
    Descriptor::List(ListDescriptor {
        source: Rc::new(KeyedList { items: Rc::new(items), key: Rc::new(key), render: Rc::new(render) }),
    })
}

// =============================================================================
// Pick
// =============================================================================

/// Lazily rendered branch.
pub type BranchFn = Rc<dyn Fn() -> Descriptor>;

/// Given every candidate name, return the ones that should be active.
pub type OracleFn = Rc<dyn Fn(&[Rc<str>]) -> Vec<Rc<str>>>;

/// Named branches selected by an oracle.
pub struct PickDescriptor {
    pub(crate) candidates: Vec<(Rc<str>, BranchFn)>,
    pub(crate) oracle: OracleFn,
}

impl PickDescriptor {
    pub fn candidate_names(&self) -> Vec<Rc<str>> {
        self.candidates.iter().map(|(name, _)| name.clone()).collect()
    }
}

/// Render the candidates the oracle selects, in candidate order. A branch
/// function runs once per activation.
pub fn pick(
    candidates: impl IntoIterator<Item = (&'static str, BranchFn)>,
    oracle: impl Fn(&[Rc<str>]) -> Vec<Rc<str>> + 'static,
) -> Descriptor {
    Descriptor::Pick(Rc::new(PickDescriptor {
        candidates: candidates.into_iter().map(|(name, f)| (Rc::from(name), f)).collect(),
        oracle: Rc::new(oracle),
    }))
}

/// Two-branch pick.
pub fn show(
    when: impl Fn() -> bool + 'static,
    then: impl Fn() -> Descriptor + 'static,
    otherwise: impl Fn() -> Descriptor + 'static,
) -> Descriptor {
    let then: BranchFn = Rc::new(then);
    let otherwise: BranchFn = Rc::new(otherwise);
    pick([("then", then), ("else", otherwise)], move |_| {
        vec![Rc::from(if when() { "then" } else { "else" })]
    })
}

/// Branch helper for [`pick`].
pub fn branch(f: impl Fn() -> Descriptor + 'static) -> BranchFn {
    Rc::new(f)
}

// =============================================================================
// Boundary
// =============================================================================

/// Re-attempts the guarded child.
pub type ResetFn = Rc<dyn Fn()>;

/// Fallback renderer for a caught error.
pub type FallbackFn = Rc<dyn Fn(&Error, ResetFn) -> Descriptor>;

pub struct BoundaryDescriptor {
    pub(crate) child: Descriptor,
    pub(crate) fallback: FallbackFn,
}

/// Render `child`; on any error raised inside it, now or later, render
/// `fallback` in its place.
pub fn try_catch(
    child: impl Into<Descriptor>,
    fallback: impl Fn(&Error, ResetFn) -> Descriptor + 'static,
) -> Descriptor {
    Descriptor::Boundary(Rc::new(BoundaryDescriptor { child: child.into(), fallback: Rc::new(fallback) }))
}

// =============================================================================
// Reactive and dynamic
// =============================================================================

/// A region re-rendered whenever a signal read by `f` changes.
pub fn reactive(f: impl Fn() -> Descriptor + 'static) -> Descriptor {
    Descriptor::Reactive(Rc::new(move || Ok(f())))
}

/// Fallible [`reactive`].
pub fn try_reactive(f: impl Fn() -> Result<Descriptor> + 'static) -> Descriptor {
    Descriptor::Reactive(Rc::new(f))
}

/// Element whose tag comes from `selector`.
pub fn dynamic(selector: impl Into<PropValue<Tag>>) -> super::descriptor::ElementBuilder {
    super::descriptor::el(Tag::dynamic(selector))
}
