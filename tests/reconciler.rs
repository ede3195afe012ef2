//! End-to-end behaviour of the rendering core through the public API.
//!
//! Every test mounts into a fresh root and drives updates through signals
//! and simulated events, observing the live tree only through `engine`.
//!
//! Run with: cargo test --test reconciler

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::{Duration, Instant};

use pounce::engine::{self, mutation_count, reset_registry, NodeId};
use pounce::{
    compose, el, for_each, mount, mount_with, reactive, show, signal, text, try_catch,
    try_reactive, Component, Directive, Error, Layer, MountOptions, Policy, PropertyLayer,
    ReactivityConfig, Value,
};
use proptest::prelude::*;

// =============================================================================
// Helpers
// =============================================================================

fn first_element(container: NodeId) -> NodeId {
    engine::visible_children(container)[0]
}

fn counter() -> (Rc<Cell<usize>>, Rc<Cell<usize>>) {
    let c = Rc::new(Cell::new(0));
    (c.clone(), c)
}

// =============================================================================
// Property composition on host elements
// =============================================================================

#[test]
fn layers_merge_on_host_element() {
    reset_registry();
    let container = engine::create_root();
    let desc = el("div")
        .spread(
            Layer::new()
                .with("class", "base")
                .with("title", "spread")
                .with("style", "color: red; margin: 0"),
        )
        .attr("title", "explicit")
        .class("extra")
        .style("color: blue")
        .build();

    let handle = mount(&desc, container).expect("mount");
    let div = first_element(container);
    assert_eq!(engine::attribute(div, "title").as_deref(), Some("explicit"));
    assert_eq!(engine::attribute(div, "class").as_deref(), Some("base extra"));
    assert_eq!(engine::style(div, "color").as_deref(), Some("blue"));
    assert_eq!(engine::style(div, "margin").as_deref(), Some("0"));
    handle.unmount();
}

#[test]
fn reactive_attribute_touches_only_its_key() {
    reset_registry();
    let container = engine::create_root();
    let title = signal(Value::from("a"));
    let desc = el("div").attr("title", title.clone()).attr("id", "fixed").child("body").build();

    let handle = mount(&desc, container).expect("mount");
    let div = first_element(container);
    let before = mutation_count();
    title.set(Value::from("b"));
    assert_eq!(mutation_count(), before + 1);
    assert_eq!(engine::attribute(div, "title").as_deref(), Some("b"));
    assert_eq!(engine::attribute(div, "id").as_deref(), Some("fixed"));
    handle.unmount();
}

// =============================================================================
// Components
// =============================================================================

#[test]
fn rerender_with_identical_output_mutates_nothing() {
    reset_registry();
    let container = engine::create_root();
    let tick = signal(0);
    let (renders, seen) = counter();
    let t = tick.clone();
    let page = Component::new("Page", move |_, _| {
        seen.set(seen.get() + 1);
        t.get();
        Ok(el("section").attr("id", "s").child(el("p").child("static")).build())
    });

    let handle = mount(&el(page).build(), container).expect("mount");
    let section = first_element(container);
    let before = mutation_count();

    tick.set(1);
    assert_eq!(renders.get(), 2);
    assert_eq!(mutation_count(), before);
    assert_eq!(first_element(container), section);
    handle.unmount();
}

#[test]
fn unchanged_child_props_skip_child_render() {
    reset_registry();
    let container = engine::create_root();
    let tick = signal(0);
    let (child_renders, seen) = counter();
    let child = Component::new("Child", move |props, _| {
        seen.set(seen.get() + 1);
        Ok(text(format!("child {}", props.value("label"))))
    });

    let t = tick.clone();
    let parent = Component::new("Parent", move |_, _| {
        let n = t.get();
        Ok(el("div")
            .child(el(child.clone()).attr("label", "fixed"))
            .child(text(n.to_string()))
            .build())
    });

    let handle = mount(&el(parent).build(), container).expect("mount");
    assert_eq!(handle.html(), "<div>child fixed0</div>");

    tick.set(1);
    assert_eq!(handle.html(), "<div>child fixed1</div>");
    assert_eq!(child_renders.get(), 1);
    handle.unmount();
}

#[test]
fn lifecycle_reads_do_not_rerender_component() {
    reset_registry();
    let container = engine::create_root();
    let incidental = signal(0);
    let (renders, seen) = counter();
    let i = incidental.clone();
    let widget = Component::new("Widget", move |_, env| {
        seen.set(seen.get() + 1);
        let i = i.clone();
        env.on_mount(move || {
            i.get();
        });
        Ok(text("w"))
    });

    let handle = mount(&el(widget).build(), container).expect("mount");
    incidental.set(1);
    incidental.set(2);
    assert_eq!(renders.get(), 1);
    handle.unmount();
}

// =============================================================================
// Directives
// =============================================================================

#[test]
fn directive_cache_hit_on_parent_rerender() {
    reset_registry();
    let container = engine::create_root();
    let log = Rc::new(RefCell::new(Vec::<String>::new()));
    let l = log.clone();
    let focus = Directive::new(move |targets, _, _| {
        l.borrow_mut().push(format!("invoke {}", targets.len()));
        let l = l.clone();
        Some(Box::new(move || l.borrow_mut().push("cleanup".into())))
    });

    let tick = signal(0);
    let t = tick.clone();
    let form = Component::new("Form", move |_, _| {
        t.get();
        Ok(el("input").use_directive(focus.clone()).build())
    });

    let handle = mount(&el(form).build(), container).expect("mount");
    tick.set(1);
    tick.set(2);
    assert_eq!(*log.borrow(), vec!["invoke 1"]);

    handle.unmount();
    assert_eq!(*log.borrow(), vec!["invoke 1", "cleanup"]);
}

#[test]
fn directive_argument_change_runs_cleanup_first() {
    reset_registry();
    let container = engine::create_root();
    let log = Rc::new(RefCell::new(Vec::<String>::new()));
    let l = log.clone();
    let tooltip = Directive::new(move |_, arg, _| {
        l.borrow_mut().push(format!("on {arg}"));
        let l = l.clone();
        let arg = arg.clone();
        Some(Box::new(move || l.borrow_mut().push(format!("off {arg}"))))
    });
    let tip = signal(Value::from("a"));

    let handle = mount(
        &el("span").use_named("tooltip", tooltip.with_arg(tip.clone())).build(),
        container,
    )
    .expect("mount");
    tip.set(Value::from("b"));
    assert_eq!(*log.borrow(), vec!["on a", "off a", "on b"]);
    handle.unmount();
    assert_eq!(log.borrow().last().map(String::as_str), Some("off b"));
}

#[test]
fn fresh_directive_closure_is_forbidden_under_error_policy() {
    reset_registry();
    let container = engine::create_root();
    let tick = signal(0);
    let t = tick.clone();
    let form = Component::new("Form", move |_, _| {
        t.get();
        // A new closure every render, same argument
        Ok(el("input").use_directive(Directive::new(|_, _, _| None).with_arg(1)).build())
    });

    let options = MountOptions::default().with_config(ReactivityConfig::strict());
    let handle = mount_with(&el(form).build(), container, options).expect("mount");
    assert!(!handle.has_errors());

    tick.set(1);
    let errors = handle.take_errors();
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0].root_cause(), Error::ForbiddenRebuild(_)));
    assert!(errors[0].is_policy_violation());
}

#[test]
fn fresh_directive_closure_allowed_when_policy_off() {
    reset_registry();
    let container = engine::create_root();
    let tick = signal(0);
    let (invocations, seen) = counter();
    let t = tick.clone();
    let form = Component::new("Form", move |_, _| {
        t.get();
        let seen = seen.clone();
        let directive = Directive::new(move |_, _, _| {
            seen.set(seen.get() + 1);
            None
        });
        Ok(el("input").use_directive(directive.with_arg(1)).build())
    });

    let config = ReactivityConfig::strict().with_check_reactivity(Policy::Off);
    let handle =
        mount_with(&el(form).build(), container, MountOptions::default().with_config(config))
            .expect("mount");
    tick.set(1);
    assert!(!handle.has_errors());
    assert_eq!(invocations.get(), 2);
    handle.unmount();
}

#[test]
fn ref_callbacks_accumulate_across_layers() {
    reset_registry();
    let container = engine::create_root();
    let seen = Rc::new(RefCell::new(Vec::<&'static str>::new()));
    let (a, b) = (seen.clone(), seen.clone());
    let desc = el("div")
        .this(move |_| {
            a.borrow_mut().push("spread ref");
            None
        })
        .spread(Layer::new())
        .this(move |_| {
            b.borrow_mut().push("explicit ref");
            None
        })
        .build();

    let handle = mount(&desc, container).expect("mount");
    assert_eq!(*seen.borrow(), vec!["spread ref", "explicit ref"]);
    handle.unmount();
}

// =============================================================================
// Dynamic tags
// =============================================================================

#[test]
fn dynamic_tag_keeps_node_until_tag_changes() {
    reset_registry();
    let container = engine::create_root();
    let tag = signal(pounce::Tag::host("h1"));
    let title = signal(Value::from("one"));
    let desc = pounce::dynamic(pounce::PropValue::Signal(tag.clone()))
        .attr("title", title.clone())
        .child("x")
        .build();

    let handle = mount(&desc, container).expect("mount");
    let node = first_element(container);
    engine::set_marker(node, "probe", true);

    title.set(Value::from("two"));
    assert_eq!(first_element(container), node);
    assert_eq!(engine::marker(node, "probe"), Some(Value::Bool(true)));

    tag.set(pounce::Tag::host("h2"));
    let replaced = first_element(container);
    assert_ne!(replaced, node);
    assert_eq!(engine::marker(replaced, "probe"), None);
    assert!(!engine::is_allocated(node));
    assert_eq!(handle.html(), r#"<h2 title="two">x</h2>"#);
    handle.unmount();
}

// =============================================================================
// Keyed lists
// =============================================================================

#[derive(Clone, PartialEq, Debug)]
struct Todo {
    id: u32,
    title: &'static str,
}

#[test]
fn keyed_list_moves_nodes_without_rerendering() {
    reset_registry();
    let container = engine::create_root();
    let todos = signal(vec![
        Todo { id: 1, title: "a" },
        Todo { id: 2, title: "b" },
        Todo { id: 3, title: "c" },
    ]);
    let (renders, seen) = counter();
    let source = todos.clone();
    let list = for_each(
        move || source.get(),
        |t: &Todo| t.id,
        move |todo| {
            seen.set(seen.get() + 1);
            let id = todo.peek().id;
            el("li")
                .this(move |node| {
                    engine::set_marker(node, "id", id);
                    None
                })
                .child(reactive(move || text(todo.get().title)))
                .build()
        },
    );

    let handle = mount(&el("ul").child(list).build(), container).expect("mount");
    let ul = first_element(container);
    assert_eq!(renders.get(), 3);

    todos.update(|v| v.swap(0, 2));
    let ids: Vec<Option<Value>> =
        engine::visible_children(ul).into_iter().map(|li| engine::marker(li, "id")).collect();
    assert_eq!(ids, vec![Some(Value::from(3u32)), Some(Value::from(2u32)), Some(Value::from(1u32))]);
    assert_eq!(handle.html(), "<ul><li>c</li><li>b</li><li>a</li></ul>");
    assert_eq!(renders.get(), 3);

    todos.update(|v| v.insert(1, Todo { id: 9, title: "new" }));
    assert_eq!(renders.get(), 4);
    assert_eq!(handle.html(), "<ul><li>c</li><li>new</li><li>b</li><li>a</li></ul>");
    handle.unmount();
}

#[test]
fn removing_middle_item_keeps_neighbours() {
    reset_registry();
    let container = engine::create_root();
    let todos = signal(vec![
        Todo { id: 1, title: "a" },
        Todo { id: 2, title: "b" },
        Todo { id: 3, title: "c" },
    ]);
    let (renders, seen) = counter();
    let source = todos.clone();
    let list = for_each(
        move || source.get(),
        |t: &Todo| t.id,
        move |todo| {
            seen.set(seen.get() + 1);
            el("li").child(todo.peek().title).build()
        },
    );

    let handle = mount(&el("ul").child(list).build(), container).expect("mount");
    let ul = first_element(container);
    let before = engine::visible_children(ul);

    todos.update(|v| {
        v.remove(1);
    });
    let after = engine::visible_children(ul);
    assert_eq!(after, vec![before[0], before[2]]);
    assert!(!engine::is_allocated(before[1]));
    assert_eq!(renders.get(), 3);
    assert_eq!(handle.html(), "<ul><li>a</li><li>c</li></ul>");
    handle.unmount();
}

#[test]
fn reorder_and_retitle_in_one_update() {
    reset_registry();
    let container = engine::create_root();
    let todos = signal(vec![
        Todo { id: 1, title: "a" },
        Todo { id: 2, title: "b" },
        Todo { id: 3, title: "c" },
    ]);
    let (renders, seen) = counter();
    let (title_runs, runs) = counter();
    let list_node: Rc<Cell<Option<NodeId>>> = Rc::default();
    let first_when_retitled = Rc::new(RefCell::new(Vec::new()));

    let source = todos.clone();
    let (ul_slot, order) = (list_node.clone(), first_when_retitled.clone());
    let list = for_each(
        move || source.get(),
        |t: &Todo| t.id,
        move |todo| {
            seen.set(seen.get() + 1);
            let id = todo.peek().id;
            let (runs, ul_slot, order) = (runs.clone(), ul_slot.clone(), order.clone());
            el("li")
                .this(move |node| {
                    engine::set_marker(node, "id", id);
                    None
                })
                .child(reactive(move || {
                    runs.set(runs.get() + 1);
                    let title = todo.get().title;
                    if title == "C" {
                        let first = ul_slot.get().map(|ul| engine::visible_children(ul)[0]);
                        order.borrow_mut().push(first.and_then(|li| engine::marker(li, "id")));
                    }
                    text(title)
                }))
                .build()
        },
    );

    let handle = mount(&el("ul").child(list).build(), container).expect("mount");
    let ul = first_element(container);
    list_node.set(Some(ul));
    let before = engine::visible_children(ul);
    assert_eq!(title_runs.get(), 3);

    todos.set(vec![
        Todo { id: 3, title: "C" },
        Todo { id: 2, title: "b" },
        Todo { id: 1, title: "a" },
    ]);
    assert_eq!(handle.html(), "<ul><li>C</li><li>b</li><li>a</li></ul>");
    assert_eq!(engine::visible_children(ul), before.iter().rev().copied().collect::<Vec<_>>());
    assert_eq!(renders.get(), 3);
    assert_eq!(title_runs.get(), 4, "only the retitled item re-ran");
    // The moved item was already first when its title effect re-ran
    assert_eq!(*first_when_retitled.borrow(), vec![Some(Value::from(3u32))]);
    handle.unmount();
}

/// Mount a list of `len` todos, then push one more. Returns the host
/// mutations and the best wall time over a few pushes.
fn push_cost(len: u32) -> (u64, Duration) {
    reset_registry();
    let container = engine::create_root();
    let todos = signal((0..len).map(|id| Todo { id, title: "t" }).collect::<Vec<_>>());
    let source = todos.clone();
    let list = for_each(
        move || source.get(),
        |t: &Todo| t.id,
        |todo| el("li").child(todo.peek().title).build(),
    );
    let handle = mount(&el("ul").child(list).build(), container).expect("mount");

    let mut mutations = None;
    let mut best = Duration::MAX;
    for extra in 0..3 {
        let before = mutation_count();
        let started = Instant::now();
        todos.update(|v| v.push(Todo { id: len + extra, title: "new" }));
        best = best.min(started.elapsed());
        mutations.get_or_insert(mutation_count() - before);
    }
    assert_eq!(engine::visible_children(first_element(container)).len(), len as usize + 3);
    handle.unmount();
    (mutations.unwrap_or_default(), best)
}

#[test]
fn list_push_cost_tracks_changed_items() {
    let (small_mutations, small_time) = push_cost(500);
    let (large_mutations, large_time) = push_cost(4000);
    assert_eq!(small_mutations, large_mutations);

    // 8x the items; a per-node sibling scan would make this ~64x
    let floor = small_time.max(Duration::from_micros(200));
    assert!(
        large_time < floor * 24,
        "push into 4000 items took {large_time:?}, into 500 took {small_time:?}"
    );
}

#[derive(Clone, PartialEq, Debug)]
struct Row {
    id: u32,
}

#[test]
fn parent_rerender_keeps_list_branch_and_boundary_content() {
    reset_registry();
    let container = engine::create_root();
    let tick = signal(0);
    let rows = signal(vec![Row { id: 1 }, Row { id: 2 }]);
    let (item_renders, seen_item) = counter();
    let (branch_renders, seen_branch) = counter();
    let (guarded_renders, seen_guarded) = counter();

    let guarded = Component::new("Guarded", move |_, _| {
        seen_guarded.set(seen_guarded.get() + 1);
        Ok(el("em").child("safe").build())
    });
    let (t, source) = (tick.clone(), rows.clone());
    let page = Component::new("Page", move |_, _| {
        let n = t.get();
        let (source, seen_item, seen_branch) = (source.clone(), seen_item.clone(), seen_branch.clone());
        let list = for_each(
            move || source.get(),
            |r: &Row| r.id,
            move |row| {
                seen_item.set(seen_item.get() + 1);
                el("li").child(row.peek().id.to_string()).build()
            },
        );
        let branch = show(
            || true,
            move || {
                seen_branch.set(seen_branch.get() + 1);
                text("shown")
            },
            || text("hidden"),
        );
        Ok(el("div")
            .child(el("ul").child(list))
            .child(branch)
            .child(try_catch(el(guarded.clone()).build(), |_, _| text("failed")))
            .child(text(n.to_string()))
            .build())
    });

    let handle = mount(&el(page).build(), container).expect("mount");
    let div = first_element(container);
    let ul = engine::visible_children(div)[0];
    let items = engine::visible_children(ul);
    let em = engine::visible_children(div)[2];
    assert_eq!(handle.html(), "<div><ul><li>1</li><li>2</li></ul>shown<em>safe</em>0</div>");

    tick.set(1);
    assert_eq!(handle.html(), "<div><ul><li>1</li><li>2</li></ul>shown<em>safe</em>1</div>");
    assert_eq!(engine::visible_children(ul), items);
    assert_eq!(engine::visible_children(div)[2], em);
    assert_eq!(item_renders.get(), 2);
    assert_eq!(branch_renders.get(), 1);
    assert_eq!(guarded_renders.get(), 1);

    // The kept list follows the source the latest render handed it
    rows.update(|v| v.push(Row { id: 3 }));
    assert_eq!(item_renders.get(), 3);
    assert_eq!(engine::visible_children(ul)[..2], items[..]);
    assert_eq!(handle.html(), "<div><ul><li>1</li><li>2</li><li>3</li></ul>shown<em>safe</em>1</div>");
    handle.unmount();
}

// =============================================================================
// Conditional branches
// =============================================================================

#[test]
fn show_renders_each_branch_once_per_activation() {
    reset_registry();
    let container = engine::create_root();
    let open = signal(false);
    let noise = signal(0);
    let (then_renders, seen) = counter();
    let (o, n) = (open.clone(), noise.clone());
    let desc = show(
        move || {
            n.get();
            o.get()
        },
        move || {
            seen.set(seen.get() + 1);
            el("p").child("open").build()
        },
        || text("closed"),
    );

    let handle = mount(&desc, container).expect("mount");
    assert_eq!(handle.html(), "closed");
    open.set(true);
    noise.set(1);
    noise.set(2);
    assert_eq!(handle.html(), "<p>open</p>");
    assert_eq!(then_renders.get(), 1);

    open.set(false);
    open.set(true);
    assert_eq!(then_renders.get(), 2);
    handle.unmount();
}

// =============================================================================
// Error boundaries
// =============================================================================

#[test]
fn boundary_isolates_failure_from_siblings() {
    reset_registry();
    let container = engine::create_root();
    let broken = signal(false);
    let count = signal(0);
    let (b, c) = (broken.clone(), count.clone());

    let guarded = try_catch(
        try_reactive(move || if b.get() { Err(Error::render("boom")) } else { Ok(text("fine")) }),
        |err, _| el("em").child(format!("{}", err.root_cause())).build(),
    );
    let desc = el("div")
        .child(guarded)
        .child(el("span").child(reactive(move || text(c.get().to_string()))))
        .build();

    let handle = mount(&desc, container).expect("mount");
    assert_eq!(handle.html(), "<div>fine<span>0</span></div>");

    broken.set(true);
    assert_eq!(handle.html(), "<div><em>render error: boom</em><span>0</span></div>");
    count.set(7);
    assert_eq!(handle.html(), "<div><em>render error: boom</em><span>7</span></div>");
    assert!(!handle.has_errors());
    handle.unmount();
}

#[test]
fn initial_render_error_is_returned() {
    reset_registry();
    let container = engine::create_root();
    let failing = Component::new("Failing", |_, _| Err(Error::InvalidTag("???".into())));
    let result = mount(&el("main").child(el(failing)).build(), container);
    assert!(matches!(result, Err(Error::InvalidTag(_))));
    assert_eq!(engine::inner_html(container), "");
}

#[test]
fn uncaught_later_error_leaves_siblings_working() {
    reset_registry();
    let container = engine::create_root();
    let broken = signal(false);
    let count = signal(0);
    let (b, c) = (broken.clone(), count.clone());
    let desc = el("div")
        .child(try_reactive(move || if b.get() { Err(Error::render("late")) } else { Ok(text("ok")) }))
        .child(el("span").child(reactive(move || text(c.get().to_string()))))
        .build();

    let handle = mount(&desc, container).expect("mount");
    broken.set(true);
    let errors = handle.take_errors();
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0], Error::Reaction(_)));

    // The failed region keeps what it last committed
    count.set(3);
    assert_eq!(handle.html(), "<div>ok<span>3</span></div>");
    assert!(handle.is_mounted());
    handle.unmount();
}

// =============================================================================
// Reaction depth
// =============================================================================

#[test]
fn self_feeding_attribute_hits_max_depth() {
    reset_registry();
    let container = engine::create_root();
    let value = signal(0i64);
    let v = value.clone();
    let runaway = pounce::PropValue::getter(move || {
        let n = v.get();
        v.set(n + 1);
        Value::from(n)
    });

    let config = ReactivityConfig::strict().with_max_reaction_depth(5);
    let handle = mount_with(
        &el("div").attr("data-n", runaway).build(),
        container,
        MountOptions::default().with_config(config),
    )
    .expect("initial render succeeds");

    let errors = handle.take_errors();
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, Error::MaxReactionDepthExceeded { limit: 5, .. }))
    );
    assert!(value.peek() < 100);
    handle.unmount();
}

// =============================================================================
// Ownership
// =============================================================================

#[test]
fn listeners_survive_when_locals_are_dropped() {
    reset_registry();
    let container = engine::create_root();
    let handle = {
        let clicks = signal(0);
        let (c, shown) = (clicks.clone(), clicks.clone());
        let desc = el("div")
            .child(el("button").on("click", move |_| c.update(|n| *n += 1)).child("+"))
            .child(reactive(move || text(shown.get().to_string())))
            .build();
        mount(&desc, container).expect("mount")
        // `clicks` and `desc` dropped here
    };

    let div = first_element(container);
    let button = engine::visible_children(div)[0];
    engine::click(button);
    engine::click(button);
    assert_eq!(handle.html(), "<div><button>+</button>2</div>");

    let live = pounce::reactive::live_effect_count();
    handle.unmount();
    assert!(pounce::reactive::live_effect_count() < live);
    assert!(!engine::is_allocated(button));
    assert_eq!(engine::allocated_count(), 1);
}

// =============================================================================
// Two-way binding
// =============================================================================

#[test]
fn two_way_binding_round_trip() {
    reset_registry();
    let container = engine::create_root();
    let name = signal(Value::from("ada"));
    let shown = name.clone();
    let desc = el("label")
        .child(el("input").bind("value", name.clone()))
        .child(reactive(move || text(shown.get().to_string())))
        .build();

    let handle = mount(&desc, container).expect("mount");
    let label = first_element(container);
    let input = engine::visible_children(label)[0];
    assert_eq!(engine::property(input, "value"), Value::from("ada"));

    engine::input_value(input, "grace");
    assert_eq!(name.peek(), Value::from("grace"));
    assert_eq!(engine::visible_children(label).len(), 2);
    assert_eq!(engine::text(engine::visible_children(label)[1]).as_deref(), Some("grace"));

    name.set(Value::from("linus"));
    assert_eq!(engine::property(input, "value"), Value::from("linus"));
    handle.unmount();
}

// =============================================================================
// Static content
// =============================================================================

#[test]
fn static_content_renders_identically_twice() {
    reset_registry();
    let build = || {
        el("article")
            .spread(Layer::new().with("class", "card").with("data-id", 7))
            .attr("hidden", false)
            .child(el("h2").child("title"))
            .child(pounce::fragment([text("a"), el("br").build(), text("b")]))
            .build()
    };

    let (first, second) = (engine::create_root(), engine::create_root());
    let a = mount(&build(), first).expect("first");
    let b = mount(&build(), second).expect("second");
    assert_eq!(a.html(), b.html());
    assert_eq!(a.html(), r#"<article class="card" data-id="7"><h2>title</h2>a<br></br>b</article>"#);
}

// =============================================================================
// Composition properties
// =============================================================================

fn static_layer(entries: Vec<(&'static str, i64)>) -> PropertyLayer {
    let mut layer = Layer::new();
    for (key, value) in entries {
        layer.insert(key, value.into());
    }
    layer.into()
}

proptest! {
    #[test]
    fn last_defining_layer_wins(values in prop::collection::vec(prop::option::of(any::<i64>()), 1..8)) {
        let layers: Vec<PropertyLayer> = values
            .iter()
            .map(|v| match v {
                Some(n) => static_layer(vec![("k", *n)]),
                None => static_layer(vec![("other", 0)]),
            })
            .collect();
        let view = compose(layers);
        let expected = values.iter().rev().find_map(|v| *v).map(Value::from).unwrap_or(Value::Null);
        prop_assert_eq!(view.value("k"), expected);
    }

    #[test]
    fn class_tokens_keep_layer_order(
        groups in prop::collection::vec(prop::collection::vec("[a-d]{1,3}", 0..4), 0..6)
    ) {
        let layers: Vec<PropertyLayer> = groups
            .iter()
            .map(|tokens| PropertyLayer::from(Layer::new().with("class", tokens.join(" "))))
            .collect();
        let view = compose(layers);
        let expected: Vec<String> = groups.iter().flatten().cloned().collect();
        let actual: Vec<String> = view.classes().iter().map(|t| t.to_string()).collect();
        prop_assert_eq!(actual, expected);

        let unique = view.class_list();
        for (i, token) in unique.iter().enumerate() {
            prop_assert!(!unique[..i].contains(token));
        }
    }
}
