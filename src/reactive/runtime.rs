//! Effect ownership tree and scheduler.
//!
//! Every effect and scope is a node in a thread-local generational arena.
//! Parents own their children (strong child lists); children only keep the
//! parent id, which is used to propagate errors and resolve configuration.
//! Nothing is disposed because a handle went out of scope.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use bitflags::bitflags;

use crate::config::{self, Policy, ReactivityConfig};
use crate::error::{Error, Result};
use crate::types::Cleanup;

/// Identity of an effect or scope in the ownership tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EffectId {
    index: u32,
    generation: u32,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub(crate) struct EffectFlags: u8 {
        /// A tracked dependency changed since the last run.
        const DIRTY = 1 << 0;
        /// Sitting in the pending queue.
        const QUEUED = 1 << 1;
        /// Body is executing.
        const RUNNING = 1 << 2;
    }
}

pub(crate) type EffectBody = Rc<RefCell<dyn FnMut() -> Result<()>>>;
pub(crate) type Subscribers = Rc<RefCell<Vec<EffectId>>>;
pub(crate) type ErrorHandler = Rc<dyn Fn(Error)>;

struct EffectNode {
    label: &'static str,
    flags: EffectFlags,
    body: Option<EffectBody>,
    parent: Option<EffectId>,
    children: Vec<EffectId>,
    sources: Vec<Weak<RefCell<Vec<EffectId>>>>,
    cleanups: Vec<Cleanup>,
    on_error: Option<ErrorHandler>,
    config: Option<Rc<ReactivityConfig>>,
    depth: u32,
}

struct Slot {
    generation: u32,
    node: Option<EffectNode>,
}

pub(crate) struct Runtime {
    slots: RefCell<Vec<Slot>>,
    free: RefCell<Vec<u32>>,
    observer: Cell<Option<EffectId>>,
    owner: Cell<Option<EffectId>>,
    pending: RefCell<Vec<EffectId>>,
    batch_depth: Cell<u32>,
    flushing: Cell<bool>,
}

thread_local! {
    static RUNTIME: Runtime = Runtime::new();
}

pub(crate) fn with_runtime<R>(f: impl FnOnce(&Runtime) -> R) -> R {
    RUNTIME.with(f)
}

/// Like [`with_runtime`] but tolerates thread-local teardown.
pub(crate) fn try_with_runtime<R>(f: impl FnOnce(&Runtime) -> R) -> Option<R> {
    RUNTIME.try_with(f).ok()
}

/// Restores observer and owner when dropped.
struct ContextGuard<'a> {
    rt: &'a Runtime,
    observer: Option<EffectId>,
    owner: Option<EffectId>,
}

impl Drop for ContextGuard<'_> {
    fn drop(&mut self) {
        self.rt.observer.set(self.observer);
        self.rt.owner.set(self.owner);
    }
}

struct BatchGuard<'a>(&'a Runtime);

impl Drop for BatchGuard<'_> {
    fn drop(&mut self) {
        let depth = self.0.batch_depth.get().saturating_sub(1);
        self.0.batch_depth.set(depth);
        if depth == 0 && !std::thread::panicking() {
            self.0.flush();
        }
    }
}

impl Runtime {
    fn new() -> Self {
        Self {
            slots: RefCell::new(Vec::new()),
            free: RefCell::new(Vec::new()),
            observer: Cell::new(None),
            owner: Cell::new(None),
            pending: RefCell::new(Vec::new()),
            batch_depth: Cell::new(0),
            flushing: Cell::new(false),
        }
    }

    fn with_node<R>(&self, id: EffectId, f: impl FnOnce(&mut EffectNode) -> R) -> Option<R> {
        let mut slots = self.slots.borrow_mut();
        let slot = slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_mut().map(f)
    }

    // =========================================================================
    // Tree
    // =========================================================================

    /// Create a node owned by the current owner.
    pub(crate) fn create(&self, label: &'static str, body: Option<EffectBody>) -> EffectId {
        let parent = self.owner.get().filter(|p| self.is_alive(*p));
        self.create_with_parent(label, body, parent)
    }

    pub(crate) fn create_with_parent(
        &self,
        label: &'static str,
        body: Option<EffectBody>,
        parent: Option<EffectId>,
    ) -> EffectId {
        let depth = parent
            .and_then(|p| self.with_node(p, |n| n.depth + 1))
            .unwrap_or(0);
        let flags = if body.is_some() {
            EffectFlags::DIRTY
        } else {
            EffectFlags::empty()
        };
        let node = EffectNode {
            label,
            flags,
            body,
            parent,
            children: Vec::new(),
            sources: Vec::new(),
            cleanups: Vec::new(),
            on_error: None,
            config: None,
            depth,
        };

        let id = {
            let mut slots = self.slots.borrow_mut();
            match self.free.borrow_mut().pop() {
                Some(index) => {
                    let slot = &mut slots[index as usize];
                    slot.node = Some(node);
                    EffectId { index, generation: slot.generation }
                }
                None => {
                    let index = slots.len() as u32;
                    slots.push(Slot { generation: 0, node: Some(node) });
                    EffectId { index, generation: 0 }
                }
            }
        };

        if let Some(parent) = parent {
            self.with_node(parent, |n| n.children.push(id));
        }
        id
    }

    pub(crate) fn is_alive(&self, id: EffectId) -> bool {
        self.with_node(id, |_| ()).is_some()
    }

    pub(crate) fn label(&self, id: EffectId) -> &'static str {
        self.with_node(id, |n| n.label).unwrap_or("disposed")
    }

    pub(crate) fn parent(&self, id: EffectId) -> Option<EffectId> {
        self.with_node(id, |n| n.parent).flatten()
    }

    pub(crate) fn child_count(&self, id: EffectId) -> usize {
        self.with_node(id, |n| n.children.len()).unwrap_or(0)
    }

    pub(crate) fn live_count(&self) -> usize {
        self.slots.borrow().iter().filter(|s| s.node.is_some()).count()
    }

    pub(crate) fn owner(&self) -> Option<EffectId> {
        self.owner.get()
    }

    pub(crate) fn observer(&self) -> Option<EffectId> {
        self.observer.get()
    }

    /// Run `f` with the given owner and observer, restoring both afterwards.
    pub(crate) fn run_with<R>(
        &self,
        owner: Option<EffectId>,
        observer: Option<EffectId>,
        f: impl FnOnce() -> R,
    ) -> R {
        let _guard = ContextGuard {
            rt: self,
            observer: self.observer.replace(observer),
            owner: self.owner.replace(owner),
        };
        f()
    }

    pub(crate) fn untrack<R>(&self, f: impl FnOnce() -> R) -> R {
        self.run_with(self.owner.get(), None, f)
    }

    pub(crate) fn add_cleanup(&self, id: EffectId, cleanup: Cleanup) -> bool {
        let mut cleanup = Some(cleanup);
        self.with_node(id, |n| {
            if let Some(c) = cleanup.take() {
                n.cleanups.push(c);
            }
        });
        cleanup.is_none()
    }

    pub(crate) fn set_error_handler(&self, id: EffectId, handler: ErrorHandler) {
        self.with_node(id, |n| n.on_error = Some(handler));
    }

    pub(crate) fn set_config(&self, id: EffectId, config: ReactivityConfig) {
        self.with_node(id, |n| n.config = Some(Rc::new(config)));
    }

    /// Config of the nearest ancestor carrying one, else the thread default.
    pub(crate) fn config_for(&self, id: EffectId) -> ReactivityConfig {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            match self.with_node(current, |n| (n.config.clone(), n.parent)) {
                Some((Some(config), _)) => return (*config).clone(),
                Some((None, parent)) => cursor = parent,
                None => break,
            }
        }
        config::config()
    }

    pub(crate) fn current_config(&self) -> ReactivityConfig {
        match self.owner.get() {
            Some(owner) => self.config_for(owner),
            None => config::config(),
        }
    }

    // =========================================================================
    // Tracking
    // =========================================================================

    pub(crate) fn track(&self, subscribers: &Subscribers) {
        let Some(observer) = self.observer.get() else {
            return;
        };
        {
            let mut subs = subscribers.borrow_mut();
            if subs.contains(&observer) {
                return;
            }
            subs.push(observer);
        }
        self.with_node(observer, |n| n.sources.push(Rc::downgrade(subscribers)));
    }

    pub(crate) fn notify(&self, subscribers: &Subscribers) {
        let ids: Vec<EffectId> = subscribers.borrow().clone();
        if ids.is_empty() {
            return;
        }
        for id in ids {
            self.schedule(id);
        }
        if self.batch_depth.get() == 0 {
            self.flush();
        }
    }

    fn schedule(&self, id: EffectId) {
        let queue = self
            .with_node(id, |n| {
                n.flags.insert(EffectFlags::DIRTY);
                if n.body.is_none() || n.flags.contains(EffectFlags::QUEUED) {
                    false
                } else {
                    n.flags.insert(EffectFlags::QUEUED);
                    true
                }
            })
            .unwrap_or(false);
        if queue {
            self.pending.borrow_mut().push(id);
        }
    }

    // =========================================================================
    // Scheduling
    // =========================================================================

    pub(crate) fn batch<R>(&self, f: impl FnOnce() -> R) -> R {
        self.batch_depth.set(self.batch_depth.get() + 1);
        let _guard = BatchGuard(self);
        f()
    }

    /// Shallowest pending effect first, FIFO within a depth.
    fn next_pending(&self) -> Option<EffectId> {
        let mut pending = self.pending.borrow_mut();
        if pending.is_empty() {
            return None;
        }
        let position = {
            let slots = self.slots.borrow();
            let depth_of = |id: &EffectId| {
                slots
                    .get(id.index as usize)
                    .filter(|s| s.generation == id.generation)
                    .and_then(|s| s.node.as_ref())
                    .map_or(0, |n| n.depth)
            };
            pending
                .iter()
                .enumerate()
                .min_by_key(|(_, id)| depth_of(id))
                .map(|(i, _)| i)
        };
        position.map(|i| pending.remove(i))
    }

    pub(crate) fn flush(&self) {
        if self.flushing.replace(true) {
            return;
        }
        struct Reset<'a>(&'a Cell<bool>);
        impl Drop for Reset<'_> {
            fn drop(&mut self) {
                self.0.set(false);
            }
        }
        let _reset = Reset(&self.flushing);

        let mut runs: HashMap<EffectId, usize> = HashMap::new();
        while let Some(id) = self.next_pending() {
            let ready = self.with_node(id, |n| {
                n.flags.remove(EffectFlags::QUEUED);
                n.flags.contains(EffectFlags::DIRTY)
            });
            if ready != Some(true) {
                continue;
            }

            let count = runs.entry(id).or_insert(0);
            *count += 1;
            if *count > 1 {
                let count = *count;
                let config = self.config_for(id);
                if count > config.max_reaction_depth && config.on_max_reaction_depth != Policy::Off {
                    let effect = self.label(id);
                    self.with_node(id, |n| n.flags.remove(EffectFlags::DIRTY));
                    if config.on_max_reaction_depth == Policy::Warn {
                        tracing::warn!(
                            effect,
                            limit = config.max_reaction_depth,
                            "maximum reaction depth exceeded, skipping run"
                        );
                    } else {
                        self.handle_error(
                            id,
                            Error::MaxReactionDepthExceeded {
                                limit: config.max_reaction_depth,
                                effect,
                            },
                        );
                    }
                    continue;
                }
            }

            if let Err(err) = self.run(id) {
                self.handle_error(id, err.into_reaction());
            }
        }
    }

    /// Re-run an effect body: dispose what the last run created, then run
    /// with this effect as observer and owner.
    pub(crate) fn run(&self, id: EffectId) -> Result<()> {
        let Some(body) = self
            .with_node(id, |n| {
                n.flags.remove(EffectFlags::DIRTY);
                n.body.clone()
            })
            .flatten()
        else {
            return Ok(());
        };

        self.clean(id);
        self.with_node(id, |n| n.flags.insert(EffectFlags::RUNNING));
        tracing::trace!(effect = self.label(id), "run");

        let result = self.run_with(Some(id), Some(id), || match body.try_borrow_mut() {
            Ok(mut f) => (&mut *f)(),
            Err(_) => {
                tracing::warn!(effect = self.label(id), "effect re-entered itself, skipping");
                Ok(())
            }
        });

        self.with_node(id, |n| n.flags.remove(EffectFlags::RUNNING));
        result
    }

    /// Dispose children, run cleanups and drop subscriptions. The node stays
    /// alive.
    fn clean(&self, id: EffectId) {
        let Some((children, cleanups, sources)) = self.with_node(id, |n| {
            (
                std::mem::take(&mut n.children),
                std::mem::take(&mut n.cleanups),
                std::mem::take(&mut n.sources),
            )
        }) else {
            return;
        };

        for child in children.into_iter().rev() {
            self.release(child);
        }

        if !cleanups.is_empty() {
            self.run_with(None, None, || {
                for cleanup in cleanups {
                    if catch_unwind(AssertUnwindSafe(cleanup)).is_err() {
                        tracing::error!(effect = self.label(id), "cleanup panicked, continuing disposal");
                    }
                }
            });
        }

        for source in sources {
            if let Some(subscribers) = source.upgrade() {
                subscribers.borrow_mut().retain(|s| *s != id);
            }
        }
    }

    /// Dispose a node and its subtree, unlinking it from its parent.
    pub(crate) fn dispose(&self, id: EffectId) {
        if let Some(parent) = self.parent(id) {
            self.with_node(parent, |n| n.children.retain(|c| *c != id));
        }
        self.release(id);
    }

    fn release(&self, id: EffectId) {
        if !self.is_alive(id) {
            return;
        }
        self.batch(|| {
            self.clean(id);
            let mut slots = self.slots.borrow_mut();
            if let Some(slot) = slots.get_mut(id.index as usize) {
                if slot.generation == id.generation {
                    slot.node = None;
                    slot.generation = slot.generation.wrapping_add(1);
                    self.free.borrow_mut().push(id.index);
                }
            }
        });
    }

    // =========================================================================
    // Errors
    // =========================================================================

    /// Deliver `error` to the nearest handler on the ownership chain of `from`.
    pub(crate) fn handle_error(&self, from: EffectId, error: Error) {
        let mut cursor = Some(from);
        let mut handler = None;
        while let Some(current) = cursor {
            match self.with_node(current, |n| (n.on_error.clone(), n.parent)) {
                Some((Some(h), _)) => {
                    handler = Some(h);
                    break;
                }
                Some((None, parent)) => cursor = parent,
                None => break,
            }
        }

        match handler {
            Some(handler) => self.run_with(None, None, || handler(error)),
            None => tracing::error!(%error, effect = self.label(from), "unhandled reactive error"),
        }
    }
}
