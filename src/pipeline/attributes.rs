//! Host element props: attributes, properties, listeners, two-way bindings.
//!
//! Each scalar key keeps the prop it was last applied from. Re-applying an
//! equal prop does nothing, so patching an unchanged element performs no
//! host mutation. Reactive values get one effect per key, owned by the host
//! scope, and write only that key when they change.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use crate::engine::{self, NodeId};
use crate::error::Result;
use crate::primitives::{
    is_merged_key, Prop, PropertyLayer, PropertyView, BIND_PREFIX, CLASS, EVENT_PREFIX, STYLE,
};
use crate::reactive::{on_cleanup, try_effect_labeled, untrack, EffectHandle, Scope, Signal};
use crate::types::{PropValue, Value};

use super::directives::DirectiveBinding;

/// Props written as boolean host properties instead of attributes.
pub const BOOLEAN_PROPERTIES: &[&str] = &[
    "checked",
    "disabled",
    "indeterminate",
    "selected",
    "hidden",
    "readonly",
    "required",
    "multiple",
    "open",
    "autofocus",
];

/// Write one scalar value to a host node.
pub(crate) fn write_value(node: NodeId, key: &str, value: &Value) {
    if BOOLEAN_PROPERTIES.contains(&key) {
        let next = if value.is_null() { Value::Null } else { Value::Bool(value.truthy()) };
        engine::set_property(node, key, next);
    } else if key == "value" {
        engine::set_property(node, key, value.clone());
    } else {
        engine::set_attribute(node, key, value.to_attribute());
    }
}

// =============================================================================
// Bindings
// =============================================================================

/// What is currently applied for one key.
struct Binding {
    prop: Prop,
    scope: Option<Scope>,
}

impl Binding {
    fn teardown(&self) {
        if let Some(scope) = self.scope {
            scope.dispose();
        }
    }
}

/// Merged-key binding (`class`, `style`): remembers its sources.
struct MergedBinding {
    sources: Vec<Prop>,
    scope: Option<Scope>,
}

pub(crate) struct HostProps {
    node: NodeId,
    scope: Scope,
    layers: RefCell<Option<Vec<PropertyLayer>>>,
    layer_effect: Cell<Option<EffectHandle>>,
    applied: RefCell<BTreeMap<Rc<str>, Binding>>,
    class: RefCell<Option<MergedBinding>>,
    style: RefCell<Option<MergedBinding>>,
    directives: DirectiveBinding,
}

impl HostProps {
    pub(crate) fn new(node: NodeId, scope: Scope) -> Rc<Self> {
        Rc::new(Self {
            node,
            scope,
            layers: RefCell::new(None),
            layer_effect: Cell::new(None),
            applied: RefCell::new(BTreeMap::new()),
            class: RefCell::new(None),
            style: RefCell::new(None),
            directives: DirectiveBinding::new(scope, Rc::new(move || vec![node])),
        })
    }

    /// Apply `layers`. Identical layers are a no-op. When any layer is
    /// reactive the whole set is applied from an effect that re-runs when a
    /// layer is swapped.
    pub(crate) fn update(self: &Rc<Self>, layers: &[PropertyLayer], patching: bool) -> Result<()> {
        if self.layers.borrow().as_deref() == Some(layers) {
            return Ok(());
        }
        self.layers.replace(Some(layers.to_vec()));
        if let Some(effect) = self.layer_effect.take() {
            effect.dispose();
        }

        let view = PropertyView::of(layers.to_vec());
        if !view.is_reactive() {
            return self.apply(&view, patching);
        }

        let this = self.clone();
        let mut rerun = patching;
        let handle = self.scope.run(|| {
            try_effect_labeled("layers", move || {
                let result = this.apply(&view, rerun);
                rerun = true;
                result
            })
        })?;
        self.layer_effect.set(Some(handle));
        Ok(())
    }

    fn apply(&self, view: &PropertyView, patching: bool) -> Result<()> {
        let mut seen = BTreeSet::new();
        for key in view.keys() {
            if is_merged_key(&key) {
                continue;
            }
            let Some(prop) = view.get(&key) else { continue };
            seen.insert(key.clone());

            let unchanged = self.applied.borrow().get(&key).is_some_and(|b| b.prop == prop);
            if unchanged {
                continue;
            }
            let old = self.applied.borrow_mut().remove(&key);
            if let Some(old) = old {
                old.teardown();
            }
            let binding = self.bind(&key, prop)?;
            self.applied.borrow_mut().insert(key, binding);
        }

        let stale: Vec<Rc<str>> =
            self.applied.borrow().keys().filter(|k| !seen.contains(*k)).cloned().collect();
        for key in stale {
            let old = self.applied.borrow_mut().remove(&key);
            if let Some(old) = old {
                old.teardown();
                if old.prop.as_value().is_some() {
                    write_value(self.node, &key, &Value::Null);
                }
            }
        }

        self.apply_merged(view, CLASS)?;
        self.apply_merged(view, STYLE)?;
        self.directives.update(view.directives(), patching)
    }

    fn bind(&self, key: &Rc<str>, prop: Prop) -> Result<Binding> {
        let node = self.node;

        if let Some(property) = key.strip_prefix(BIND_PREFIX) {
            let signal = match &prop {
                Prop::Bind(signal) | Prop::Value(PropValue::Signal(signal)) => signal.clone(),
                _ => {
                    tracing::debug!(key = %key, "bind needs a signal, ignored");
                    return Ok(Binding { prop, scope: None });
                }
            };
            let scope = self.scope.run(|| Scope::labeled("bind"));
            if let Err(err) = scope.run(|| two_way(node, property.into(), signal)) {
                scope.dispose();
                return Err(err);
            }
            return Ok(Binding { prop, scope: Some(scope) });
        }

        if let Some(event) = key.strip_prefix(EVENT_PREFIX) {
            let Prop::Handler(handler) = &prop else {
                tracing::debug!(key = %key, "listener needs a handler, ignored");
                return Ok(Binding { prop, scope: None });
            };
            let scope = self.scope.run(|| Scope::labeled("listener"));
            let listener = engine::add_listener(node, event, handler.clone());
            scope.on_cleanup(move || {
                engine::remove_listener(node, listener);
            });
            return Ok(Binding { prop, scope: Some(scope) });
        }

        match &prop {
            Prop::Value(PropValue::Static(value)) => {
                write_value(node, key, value);
                Ok(Binding { prop, scope: None })
            }
            Prop::Value(value) => {
                let scope = self.scope.run(|| Scope::labeled("attribute"));
                let value = value.clone();
                let name = key.clone();
                let created = scope.run(|| {
                    try_effect_labeled("attribute", move || {
                        let next = value.get();
                        untrack(|| write_value(node, &name, &next));
                        Ok(())
                    })
                });
                if let Err(err) = created {
                    scope.dispose();
                    return Err(err);
                }
                Ok(Binding { prop, scope: Some(scope) })
            }
            _ => {
                tracing::debug!(key = %key, "prop has no meaning on a host element, ignored");
                Ok(Binding { prop, scope: None })
            }
        }
    }

    fn apply_merged(&self, view: &PropertyView, key: &'static str) -> Result<()> {
        let slot = if key == CLASS { &self.class } else { &self.style };
        let sources = view.all(key);
        let unchanged = slot.borrow().as_ref().is_some_and(|b| b.sources == sources);
        if unchanged {
            return Ok(());
        }
        let old = slot.take();
        if let Some(MergedBinding { scope: Some(scope), .. }) = old {
            scope.dispose();
        }

        let node = self.node;
        let write = move |view: &PropertyView| {
            if key == CLASS {
                let tokens = view.class_list();
                let value = (!tokens.is_empty()).then(|| tokens.join(" "));
                engine::set_attribute(node, CLASS, value);
            } else {
                engine::set_styles(node, view.resolved_style());
            }
        };

        let scope = if sources.iter().any(Prop::is_reactive) {
            let scope = self.scope.run(|| Scope::labeled(key));
            let view = view.clone();
            let created = scope.run(|| {
                try_effect_labeled(key, move || {
                    write(&view);
                    Ok(())
                })
            });
            if let Err(err) = created {
                scope.dispose();
                return Err(err);
            }
            Some(scope)
        } else {
            write(view);
            None
        };
        slot.replace(Some(MergedBinding { sources, scope }));
        Ok(())
    }
}

// =============================================================================
// Two-way binding
// =============================================================================

/// Direction of the write currently in flight for a two-way binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncState {
    #[default]
    Idle,
    /// A user event is writing into the signal.
    FromUser,
    /// A signal change is writing into the node.
    FromState,
}

/// Keep `property` of `node` and `signal` in sync. The echo of each write is
/// suppressed, so neither side is written twice for one change.
fn two_way(node: NodeId, property: Rc<str>, signal: Signal<Value>) -> Result<()> {
    let event = match &*property {
        "value" => "input",
        _ => "change",
    };
    let state = Rc::new(Cell::new(SyncState::Idle));

    let to_node = state.clone();
    let source = signal.clone();
    let name = property.clone();
    try_effect_labeled("bind", move || {
        let value = source.get();
        if to_node.get() == SyncState::FromUser {
            tracing::debug!(property = %name, "echo of user input suppressed");
            return Ok(());
        }
        to_node.set(SyncState::FromState);
        untrack(|| write_value(node, &name, &value));
        to_node.set(SyncState::Idle);
        Ok(())
    })?;

    let listener = engine::add_listener(
        node,
        event,
        Rc::new(move |_| {
            if state.get() != SyncState::Idle {
                tracing::debug!(property = %property, "echo of state write suppressed");
                return;
            }
            let current = engine::property(node, &property);
            let value = if BOOLEAN_PROPERTIES.contains(&&*property) {
                Value::Bool(current.truthy())
            } else {
                current
            };
            state.set(SyncState::FromUser);
            signal.set(value);
            state.set(SyncState::Idle);
        }),
    );
    on_cleanup(move || {
        engine::remove_listener(node, listener);
    });
    Ok(())
}
