//! Effect-driven regions: components, dynamic tags and reactive thunks.
//!
//! Each of these owns a region whose content is produced by one render
//! effect. The effect tracks whatever the body reads; re-running it patches
//! the region content in place.

use std::cell::RefCell;
use std::rc::Rc;

use crate::engine::{self, NodeKind};
use crate::error::{Error, Result};
use crate::primitives::{Component, Descriptor, ElementDescriptor, ReactiveFn, Tag};
use crate::reactive::{signal, try_effect_labeled, untrack, Scope};
use crate::types::{Cleanup, PropValue};

use super::directives::DirectiveBinding;
use super::fence;
use super::region::{Mounted, Region, RegionSource};

// =============================================================================
// Env
// =============================================================================

/// Per-render environment handed to component functions.
pub struct Env {
    scope: Option<Scope>,
    mount_hooks: RefCell<Vec<Cleanup>>,
}

impl Env {
    pub(crate) fn new() -> Self {
        Self { scope: Scope::current(), mount_hooks: RefCell::new(Vec::new()) }
    }

    /// Owner of everything this render creates. Effects created in the
    /// component body belong to it and are disposed on re-render.
    pub fn scope(&self) -> Option<Scope> {
        self.scope
    }

    /// Run `f` once the rendered content is in place. Runs untracked; call
    /// [`on_cleanup`](crate::reactive::on_cleanup) inside to undo it on
    /// re-render or unmount.
    pub fn on_mount(&self, f: impl FnOnce() + 'static) {
        self.mount_hooks.borrow_mut().push(Box::new(f));
    }

    fn run_mount_hooks(&self) {
        let hooks = std::mem::take(&mut *self.mount_hooks.borrow_mut());
        for hook in hooks {
            fence::run_lifecycle(hook);
        }
    }
}

impl Default for Env {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Components
// =============================================================================

pub(crate) fn mount_component(component: &Component, el: Rc<ElementDescriptor>) -> Result<Mounted> {
    let props = signal(el);
    let region = Region::new("component").with_source(RegionSource::Component {
        component: component.clone(),
        props: props.clone(),
    });

    let weak = Rc::downgrade(&region);
    let directives = DirectiveBinding::new(
        region.scope(),
        Rc::new(move || {
            let nodes = weak.upgrade().map(|r| r.content_nodes()).unwrap_or_default();
            nodes.into_iter().filter(|n| engine::kind(*n) != Some(NodeKind::Anchor)).collect()
        }),
    );

    let r = region.clone();
    let component = component.clone();
    let mut rendered = false;
    let created = region.scope().run(|| {
        try_effect_labeled("component", move || {
            let el = props.get();
            let view = el.view();
            let env = Env::new();
            fence::run_render(component.name(), || {
                let desc = component.call(&view, &env)?;
                r.replace_content(&desc)?;
                env.run_mount_hooks();

                let set = untrack(|| view.directives());
                r.scope().run(|| directives.update(set, rendered))
            })?;
            rendered = true;
            Ok(())
        })
    });

    match created {
        Ok(_) => Ok(Mounted::Region(region)),
        Err(err) => {
            tracing::debug!(component = component_name(&region), %err, "component failed to mount");
            region.dispose();
            Err(err)
        }
    }
}

fn component_name(region: &Region) -> String {
    match &*region.source.borrow() {
        RegionSource::Component { component, .. } => component.name().to_string(),
        _ => region.label.to_string(),
    }
}

// =============================================================================
// Dynamic tags
// =============================================================================

pub(crate) fn mount_dynamic(selector: Rc<PropValue<Tag>>, el: Rc<ElementDescriptor>) -> Result<Mounted> {
    let element = signal(el);
    let region = Region::new("dynamic").with_source(RegionSource::Dynamic {
        selector: selector.clone(),
        element: element.clone(),
    });

    let r = region.clone();
    let created = region.scope().run(|| {
        try_effect_labeled("dynamic", move || {
            let tag = selector.get();
            if let Tag::Dynamic(_) = tag {
                return Err(Error::InvalidTag("dynamic tag resolved to another dynamic tag".into()));
            }
            let el = element.get();
            tracing::trace!(kind = tag.kind(), "dynamic tag resolved");
            let concrete = Descriptor::Element(Rc::new(ElementDescriptor {
                tag,
                layers: el.layers.clone(),
                children: el.children.clone(),
            }));
            r.replace_content(&concrete)
        })
    });

    match created {
        Ok(_) => Ok(Mounted::Region(region)),
        Err(err) => {
            region.dispose();
            Err(err)
        }
    }
}

// =============================================================================
// Reactive thunks
// =============================================================================

pub(crate) fn mount_reactive(thunk: ReactiveFn) -> Result<Mounted> {
    reactive_region(thunk).map(Mounted::Region)
}

/// Region whose content is whatever `thunk` returns, re-rendered when
/// something it read changes.
pub(crate) fn reactive_region(thunk: ReactiveFn) -> Result<Rc<Region>> {
    let current = signal(thunk);
    let region = Region::new("reactive").with_source(RegionSource::Reactive { thunk: current.clone() });

    let r = region.clone();
    let created = region.scope().run(|| {
        try_effect_labeled("reactive", move || {
            let thunk = current.get();
            let desc = thunk()?;
            r.replace_content(&desc)
        })
    });

    match created {
        Ok(_) => Ok(region),
        Err(err) => {
            region.dispose();
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{self, create_root, inner_html, reset_registry, NodeId};
    use crate::pipeline::reconciler::mount;
    use crate::primitives::{el, fragment, reactive, text, Directive, Layer};
    use crate::reactive::{on_cleanup, signal, Signal};
    use crate::types::Value;
    use std::cell::Cell;

    fn attach(scope: Scope, desc: &Descriptor) -> NodeId {
        let root = create_root();
        let mounted = scope.run(|| mount(desc)).expect("mount");
        for n in mounted.nodes() {
            engine::append_child(root, n);
        }
        root
    }

    #[test]
    fn test_component_reads_merged_props() {
        reset_registry();
        let greet = Component::new("Greet", |props, _| {
            Ok(el("p").child(format!("hello {}", props.value("name"))).build())
        });
        let scope = Scope::root();
        let root = attach(
            scope,
            &el(greet).spread(Layer::new().with("name", "a")).attr("name", "b").build(),
        );
        assert_eq!(inner_html(root), "<p>hello b</p>");
        scope.dispose();
    }

    #[test]
    fn test_component_rerenders_on_read_signal_only() {
        reset_registry();
        let count = signal(0);
        let renders = Rc::new(Cell::new(0));
        let (c, r) = (count.clone(), renders.clone());
        let counter = Component::new("Counter", move |_, _| {
            r.set(r.get() + 1);
            Ok(text(format!("{}", c.get())))
        });
        let scope = Scope::root();
        let root = attach(scope, &el(counter).build());
        assert_eq!(inner_html(root), "0");

        count.set(5);
        assert_eq!(inner_html(root), "5");
        assert_eq!(renders.get(), 2);
        scope.dispose();
    }

    #[test]
    fn test_mount_hook_runs_after_content_and_cleans_up() {
        reset_registry();
        let log = Rc::new(RefCell::new(Vec::<String>::new()));
        let l = log.clone();
        let widget = Component::new("Widget", move |_, env| {
            let l = l.clone();
            env.on_mount(move || {
                l.borrow_mut().push("mounted".into());
                let l = l.clone();
                on_cleanup(move || l.borrow_mut().push("cleanup".into()));
            });
            Ok(text("w"))
        });
        let scope = Scope::root();
        attach(scope, &el(widget).build());
        assert_eq!(*log.borrow(), vec!["mounted"]);
        scope.dispose();
        assert_eq!(*log.borrow(), vec!["mounted", "cleanup"]);
    }

    #[test]
    fn test_dynamic_tag_switches_element() {
        reset_registry();
        let tag: Signal<Tag> = signal(Tag::host("h1"));
        let scope = Scope::root();
        let root = attach(
            scope,
            &crate::primitives::dynamic(PropValue::Signal(tag.clone())).attr("id", "t").child("x").build(),
        );
        assert_eq!(inner_html(root), r#"<h1 id="t">x</h1>"#);

        tag.set(Tag::host("h2"));
        assert_eq!(inner_html(root), r#"<h2 id="t">x</h2>"#);
        scope.dispose();
    }

    #[test]
    fn test_nested_dynamic_is_invalid() {
        reset_registry();
        let scope = Scope::root();
        let inner = Tag::dynamic(Tag::host("p"));
        let result = scope.run(|| mount(&crate::primitives::dynamic(inner).build()));
        assert!(matches!(result, Err(Error::InvalidTag(_))));
        scope.dispose();
    }

    #[test]
    fn test_reactive_region_patches_in_place() {
        reset_registry();
        let label = signal(Value::from("a"));
        let l = label.clone();
        let scope = Scope::root();
        let root = attach(scope, &el("div").child(reactive(move || text(l.get().to_string()))).build());
        let div = engine::children(root)[0];
        let text_node = engine::visible_children(div)[0];

        label.set(Value::from("b"));
        assert_eq!(inner_html(root), "<div>b</div>");
        assert_eq!(engine::visible_children(div)[0], text_node);
        scope.dispose();
    }

    #[test]
    fn test_component_directive_targets_skip_anchors() {
        reset_registry();
        let kinds = Rc::new(RefCell::new(Vec::new()));
        let seen = kinds.clone();
        let mark = Directive::new(move |targets, _, _| {
            seen.borrow_mut().extend(targets.iter().filter_map(|n| engine::kind(*n)));
            None
        });
        let card = Component::new("Card", |_, _| {
            Ok(fragment([el("b").build(), text("t"), reactive(|| text("r"))]))
        });
        let scope = Scope::root();
        let root = attach(scope, &el(card).use_directive(mark).build());
        assert_eq!(inner_html(root), "<b></b>tr");
        assert_eq!(*kinds.borrow(), vec![NodeKind::Element, NodeKind::Text, NodeKind::Text]);
        scope.dispose();
    }
}
