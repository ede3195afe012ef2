//! Effects, scopes and scheduling helpers.

use std::cell::RefCell;
use std::rc::Rc;

use super::runtime::{try_with_runtime, with_runtime, EffectBody, EffectId};
use crate::config::ReactivityConfig;
use crate::error::{Error, Result};

/// Handle to a running effect.
///
/// Dropping the handle does not stop the effect; it lives until it is
/// disposed explicitly or its owner is disposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EffectHandle {
    id: EffectId,
}

impl EffectHandle {
    pub fn id(&self) -> EffectId {
        self.id
    }

    pub fn is_alive(&self) -> bool {
        with_runtime(|rt| rt.is_alive(self.id))
    }

    pub fn dispose(self) {
        with_runtime(|rt| rt.dispose(self.id));
    }
}

pub(crate) fn create_effect(label: &'static str, body: EffectBody) -> (EffectId, Result<()>) {
    with_runtime(|rt| {
        let id = rt.create(label, Some(body));
        let result = rt.batch(|| rt.run(id));
        (id, result)
    })
}

/// Run `f` now and again whenever a signal it read changes.
pub fn effect(f: impl FnMut() + 'static) -> EffectHandle {
    effect_labeled("effect", f)
}

pub(crate) fn effect_labeled(label: &'static str, mut f: impl FnMut() + 'static) -> EffectHandle {
    let body: EffectBody = Rc::new(RefCell::new(move || -> Result<()> {
        f();
        Ok(())
    }));
    let (id, _) = create_effect(label, body);
    EffectHandle { id }
}

/// Fallible [`effect`]. An error from the first run is returned (and an
/// unowned effect is disposed); errors from later runs go to the nearest
/// error handler on the ownership chain.
pub fn try_effect(f: impl FnMut() -> Result<()> + 'static) -> Result<EffectHandle> {
    try_effect_labeled("effect", f)
}

pub(crate) fn try_effect_labeled(
    label: &'static str,
    f: impl FnMut() -> Result<()> + 'static,
) -> Result<EffectHandle> {
    let body: EffectBody = Rc::new(RefCell::new(f));
    let (id, result) = create_effect(label, body);
    match result {
        Ok(()) => Ok(EffectHandle { id }),
        Err(err) => {
            with_runtime(|rt| {
                if rt.parent(id).is_none() {
                    rt.dispose(id);
                }
            });
            Err(err)
        }
    }
}

/// Register a callback that runs when the current owner re-runs or is
/// disposed.
pub fn on_cleanup(f: impl FnOnce() + 'static) {
    with_runtime(|rt| match rt.owner() {
        Some(owner) => {
            if !rt.add_cleanup(owner, Box::new(f)) {
                tracing::debug!("on_cleanup on a disposed owner, dropped");
            }
        }
        None => tracing::debug!("on_cleanup outside any owner, dropped"),
    });
}

/// Run `f` without recording dependencies.
pub fn untrack<R>(f: impl FnOnce() -> R) -> R {
    with_runtime(|rt| rt.untrack(f))
}

/// Defer effect runs until `f` returns.
pub fn batch<R>(f: impl FnOnce() -> R) -> R {
    with_runtime(|rt| rt.batch(f))
}

/// Run every pending effect now.
pub fn flush_sync() {
    with_runtime(|rt| rt.flush());
}

/// True while an effect is recording dependencies.
pub fn is_tracking() -> bool {
    with_runtime(|rt| rt.observer().is_some())
}

/// Config resolved for the current owner.
pub(crate) fn current_config() -> ReactivityConfig {
    with_runtime(|rt| rt.current_config())
}

/// Number of live effects and scopes on this thread.
pub fn live_effect_count() -> usize {
    with_runtime(|rt| rt.live_count())
}

// =============================================================================
// Scope
// =============================================================================

/// An owner without a body.
///
/// Effects created inside [`Scope::run`] belong to the scope and are
/// disposed with it. Scopes survive re-runs of the effect that created them
/// only if they were created under another scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Scope {
    id: EffectId,
}

impl Scope {
    /// A scope owned by the current owner.
    pub fn new() -> Self {
        Self::labeled("scope")
    }

    pub(crate) fn labeled(label: &'static str) -> Self {
        Self { id: with_runtime(|rt| rt.create(label, None)) }
    }

    /// A scope with no owner. Only explicit disposal ends it.
    pub fn root() -> Self {
        Self::root_labeled("root")
    }

    pub(crate) fn root_labeled(label: &'static str) -> Self {
        Self { id: with_runtime(|rt| rt.create_with_parent(label, None, None)) }
    }

    /// The current owner, if any.
    pub fn current() -> Option<Self> {
        with_runtime(|rt| rt.owner()).map(|id| Self { id })
    }

    pub(crate) fn from_id(id: EffectId) -> Self {
        Self { id }
    }

    pub fn id(&self) -> EffectId {
        self.id
    }

    /// Run `f` with this scope as owner, without tracking.
    pub fn run<R>(&self, f: impl FnOnce() -> R) -> R {
        with_runtime(|rt| rt.run_with(Some(self.id), None, f))
    }

    pub fn on_cleanup(&self, f: impl FnOnce() + 'static) {
        with_runtime(|rt| {
            if !rt.add_cleanup(self.id, Box::new(f)) {
                tracing::debug!("on_cleanup on a disposed scope, dropped");
            }
        });
    }

    /// Catch errors raised by effects owned (transitively) by this scope.
    pub fn on_error(&self, handler: impl Fn(Error) + 'static) {
        with_runtime(|rt| rt.set_error_handler(self.id, Rc::new(handler)));
    }

    /// Attach a config to this scope and everything under it.
    pub fn set_config(&self, config: ReactivityConfig) {
        with_runtime(|rt| rt.set_config(self.id, config));
    }

    /// Config in effect for this scope.
    pub fn config(&self) -> ReactivityConfig {
        with_runtime(|rt| rt.config_for(self.id))
    }

    /// Deliver an error as if an effect in this scope had failed.
    pub fn raise(&self, error: Error) {
        with_runtime(|rt| rt.handle_error(self.id, error));
    }

    pub fn is_alive(&self) -> bool {
        with_runtime(|rt| rt.is_alive(self.id))
    }

    pub fn child_count(&self) -> usize {
        with_runtime(|rt| rt.child_count(self.id))
    }

    pub fn dispose(&self) {
        with_runtime(|rt| rt.dispose(self.id));
    }

    /// [`dispose`](Scope::dispose) that is a no-op during thread teardown.
    pub(crate) fn dispose_quietly(&self) {
        try_with_runtime(|rt| rt.dispose(self.id));
    }
}
