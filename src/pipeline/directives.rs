//! Directive and ref lifecycle for one element or component.
//!
//! Each directive instance is an effect that reads its argument (tracked)
//! and calls the directive untracked. A changed argument re-runs the effect:
//! the previous cleanup runs, then the directive is invoked again. An equal
//! directive on re-render is a cache hit and is left alone.
//!
//! Bare `use` entries are matched positionally, `use:<name>` entries by
//! name. A directive whose argument is unchanged but whose function is a
//! fresh closure is a rebuild with unchanged inputs; the `check_reactivity`
//! policy decides whether that is allowed.

use std::cell::RefCell;
use std::rc::Rc;

use crate::engine::NodeId;
use crate::error::Result;
use crate::primitives::{Directive, DirectiveSet};
use crate::reactive::{effect_labeled, on_cleanup, untrack, EffectHandle, Scope};
use crate::types::RefCallback;

use super::fence;

/// Nodes a directive applies to, resolved when it is invoked.
pub(crate) type Targets = Rc<dyn Fn() -> Vec<NodeId>>;

struct Instance<T> {
    source: T,
    effect: EffectHandle,
}

pub(crate) struct DirectiveBinding {
    owner: Scope,
    targets: Targets,
    bare: RefCell<Vec<Instance<Directive>>>,
    named: RefCell<Vec<(Rc<str>, Instance<Directive>)>>,
    refs: RefCell<Vec<Instance<RefCallback>>>,
}

impl DirectiveBinding {
    pub(crate) fn new(owner: Scope, targets: Targets) -> Self {
        Self {
            owner,
            targets,
            bare: RefCell::new(Vec::new()),
            named: RefCell::new(Vec::new()),
            refs: RefCell::new(Vec::new()),
        }
    }

    /// Reconcile live instances against `set`. Policy checks run before any
    /// instance is touched, so a forbidden rebuild leaves everything as it
    /// was.
    pub(crate) fn update(&self, set: DirectiveSet, patching: bool) -> Result<()> {
        if patching {
            self.check(&set)?;
        }

        // Bare directives, positional
        let old = std::mem::take(&mut *self.bare.borrow_mut());
        let mut old = old.into_iter();
        let mut next = Vec::with_capacity(set.bare.len());
        for directive in set.bare {
            match old.next() {
                Some(instance) if instance.source == directive => next.push(instance),
                Some(instance) => {
                    instance.effect.dispose();
                    next.push(self.instance(directive));
                }
                None => next.push(self.instance(directive)),
            }
        }
        old.for_each(|instance| instance.effect.dispose());
        self.bare.replace(next);

        // Named directives, by name
        let mut old = std::mem::take(&mut *self.named.borrow_mut());
        let mut next = Vec::with_capacity(set.named.len());
        for (name, directive) in set.named {
            let previous = old.iter().position(|(n, _)| *n == name).map(|i| old.remove(i).1);
            match previous {
                Some(instance) if instance.source == directive => next.push((name, instance)),
                Some(instance) => {
                    instance.effect.dispose();
                    next.push((name, self.instance(directive)));
                }
                None => next.push((name, self.instance(directive))),
            }
        }
        old.into_iter().for_each(|(_, instance)| instance.effect.dispose());
        self.named.replace(next);

        // Refs, positional; a different callback is simply replaced
        let old = std::mem::take(&mut *self.refs.borrow_mut());
        let mut old = old.into_iter();
        let mut next = Vec::with_capacity(set.refs.len());
        for callback in set.refs {
            match old.next() {
                Some(instance) if Rc::ptr_eq(&instance.source, &callback) => next.push(instance),
                Some(instance) => {
                    instance.effect.dispose();
                    next.push(self.ref_instance(callback));
                }
                None => next.push(self.ref_instance(callback)),
            }
        }
        old.for_each(|instance| instance.effect.dispose());
        self.refs.replace(next);
        Ok(())
    }

    /// Fail (or warn) for directives that would be re-invoked although
    /// their argument did not change.
    fn check(&self, set: &DirectiveSet) -> Result<()> {
        let bare = self.bare.borrow();
        for (i, (instance, directive)) in bare.iter().zip(&set.bare).enumerate() {
            if instance.source.arg() == directive.arg() && !instance.source.same_fn(directive) {
                fence::enforce(|| format!("directive `use` #{i} re-created with an unchanged argument"))?;
            }
        }
        let named = self.named.borrow();
        for (name, directive) in &set.named {
            let Some((_, instance)) = named.iter().find(|(n, _)| n == name) else { continue };
            if instance.source.arg() == directive.arg() && !instance.source.same_fn(directive) {
                fence::enforce(|| format!("directive `use:{name}` re-created with an unchanged argument"))?;
            }
        }
        Ok(())
    }

    fn instance(&self, directive: Directive) -> Instance<Directive> {
        Instance { source: directive.clone(), effect: self.invoke(directive) }
    }

    fn ref_instance(&self, callback: RefCallback) -> Instance<RefCallback> {
        Instance { source: callback.clone(), effect: self.invoke_ref(callback) }
    }

    fn invoke(&self, directive: Directive) -> EffectHandle {
        let targets = self.targets.clone();
        self.owner.run(|| {
            effect_labeled("directive", move || {
                let arg = directive.arg().get();
                let nodes = untrack(|| targets());
                let Some(scope) = Scope::current() else { return };
                let cleanup = fence::run_lifecycle(|| (directive.f)(&nodes, &arg, &scope));
                if let Some(cleanup) = cleanup {
                    on_cleanup(cleanup);
                }
            })
        })
    }

    fn invoke_ref(&self, callback: RefCallback) -> EffectHandle {
        let targets = self.targets.clone();
        self.owner.run(|| {
            effect_labeled("ref", move || {
                for node in untrack(|| targets()) {
                    if let Some(cleanup) = fence::run_lifecycle(|| callback(node)) {
                        on_cleanup(cleanup);
                    }
                }
            })
        })
    }
}
