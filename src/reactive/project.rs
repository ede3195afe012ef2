//! Keyed fine-grained collection transform.
//!
//! `project` is the list primitive the reconciler builds `for_each` on:
//! - New keys: create an item signal and run `map` once in a fresh scope
//! - Existing keys: update the item signal only (no re-map)
//! - Removed keys: dispose the item scope
//! - Row order is republished only when the key sequence changes

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;
use std::rc::Rc;

use super::effect::{try_effect_labeled, Scope};
use super::signal::{signal, Signal};
use crate::error::{Error, Result};

/// One projected item, in source order.
pub struct Row<K, U> {
    pub key: K,
    pub value: Rc<U>,
}

impl<K: Clone, U> Clone for Row<K, U> {
    fn clone(&self) -> Self {
        Self { key: self.key.clone(), value: self.value.clone() }
    }
}

/// Output of [`project`].
pub struct Projection<K, U> {
    rows: Signal<Vec<Row<K, U>>>,
    scope: Scope,
}

impl<K: Clone + 'static, U: 'static> Projection<K, U> {
    /// Reactive row list.
    pub fn rows(&self) -> Signal<Vec<Row<K, U>>> {
        self.rows.clone()
    }

    /// Current keys in order (untracked).
    pub fn keys(&self) -> Vec<K> {
        self.rows.with_untracked(|rows| rows.iter().map(|r| r.key.clone()).collect())
    }

    /// Scope owning every item scope.
    pub fn scope(&self) -> Scope {
        self.scope
    }
}

struct Entry<T, U> {
    item: Signal<T>,
    scope: Scope,
    value: Rc<U>,
}

/// Map a reactive sequence to per-item outputs keyed by `key_fn`.
///
/// `map` runs untracked inside the item's own scope, so effects it creates
/// live exactly as long as the item. Duplicate keys are skipped with a
/// warning. A failing `map` leaves the other items in place; the first
/// error is returned from the initial run or raised to the nearest error
/// handler on later runs.
pub fn project<T, K, U>(
    source: impl Fn() -> Vec<T> + 'static,
    key_fn: impl Fn(&T) -> K + 'static,
    map: impl Fn(Signal<T>, &K) -> Result<U> + 'static,
) -> Result<Projection<K, U>>
where
    T: Clone + PartialEq + 'static,
    K: Clone + Eq + Hash + Debug + 'static,
    U: 'static,
{
    let rows: Signal<Vec<Row<K, U>>> = signal(Vec::new());
    let container = Scope::labeled("project");
    let entries: Rc<RefCell<HashMap<K, Entry<T, U>>>> = Rc::new(RefCell::new(HashMap::new()));

    let rows_effect = rows.clone();
    let entries_dispose = entries.clone();
    container.on_cleanup(move || entries_dispose.borrow_mut().clear());

    let created = container.run(|| {
        try_effect_labeled("project", move || {
            let items = source();
            let mut seen: HashSet<K> = HashSet::with_capacity(items.len());
            let mut order: Vec<K> = Vec::with_capacity(items.len());
            let mut first_error: Option<Error> = None;

            for item in items {
                let key = key_fn(&item);
                if !seen.insert(key.clone()) {
                    tracing::warn!(?key, "duplicate key in projected list, skipping");
                    continue;
                }

                let existing = entries.borrow().get(&key).map(|e| e.item.clone());
                match existing {
                    Some(item_signal) => item_signal.set(item),
                    None => {
                        let item_signal = signal(item);
                        let scope = container.run(|| Scope::labeled("project-item"));
                        match scope.run(|| map(item_signal.clone(), &key)) {
                            Ok(value) => {
                                entries.borrow_mut().insert(
                                    key.clone(),
                                    Entry { item: item_signal, scope, value: Rc::new(value) },
                                );
                            }
                            Err(err) => {
                                scope.dispose();
                                first_error.get_or_insert(err);
                                continue;
                            }
                        }
                    }
                }
                order.push(key);
            }

            let removed: Vec<Entry<T, U>> = {
                let mut map = entries.borrow_mut();
                let gone: Vec<K> = map.keys().filter(|k| !seen.contains(*k)).cloned().collect();
                gone.iter().filter_map(|k| map.remove(k)).collect()
            };
            for entry in removed {
                entry.scope.dispose();
            }

            let next: Vec<Row<K, U>> = {
                let map = entries.borrow();
                order
                    .iter()
                    .filter_map(|k| {
                        map.get(k).map(|e| Row { key: k.clone(), value: e.value.clone() })
                    })
                    .collect()
            };
            let changed = rows_effect.with_untracked(|current| {
                current.len() != next.len()
                    || current.iter().zip(&next).any(|(a, b)| a.key != b.key)
            });
            if changed {
                rows_effect.replace(next);
            }

            match first_error {
                Some(err) => Err(err),
                None => Ok(()),
            }
        })
    });
    if let Err(err) = created {
        container.dispose();
        return Err(err);
    }

    Ok(Projection { rows, scope: container })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::effect;
    use std::cell::Cell;

    #[derive(Clone, PartialEq, Debug)]
    struct Todo {
        id: u32,
        text: &'static str,
    }

    fn todo(id: u32, text: &'static str) -> Todo {
        Todo { id, text }
    }

    #[test]
    fn test_maps_each_key_once() {
        let items = signal(vec!["a", "b"]);
        let maps = Rc::new(Cell::new(0));

        let items_clone = items.clone();
        let maps_clone = maps.clone();
        let projection = project(
            move || items_clone.get(),
            |item| item.to_string(),
            move |_item, key| {
                maps_clone.set(maps_clone.get() + 1);
                Ok(key.to_uppercase())
            },
        )
        .unwrap();

        assert_eq!(projection.keys(), vec!["a", "b"]);
        assert_eq!(maps.get(), 2);

        items.update(|v| v.push("c"));
        assert_eq!(maps.get(), 3, "push maps only the new item");

        items.set(vec!["c", "a", "b"]);
        assert_eq!(maps.get(), 3, "reorder maps nothing");
        assert_eq!(projection.keys(), vec!["c", "a", "b"]);
        projection.scope().dispose();
    }

    #[test]
    fn test_removed_item_scope_disposed() {
        let items = signal(vec![1, 2, 3]);
        let disposed = Rc::new(RefCell::new(Vec::new()));

        let items_clone = items.clone();
        let disposed_clone = disposed.clone();
        let projection = project(
            move || items_clone.get(),
            |n| *n,
            move |_item, key| {
                let log = disposed_clone.clone();
                let key = *key;
                crate::reactive::on_cleanup(move || log.borrow_mut().push(key));
                Ok(())
            },
        )
        .unwrap();

        items.set(vec![1, 3]);
        assert_eq!(*disposed.borrow(), vec![2]);
        assert_eq!(projection.keys(), vec![1, 3]);
    }

    #[test]
    fn test_item_update_reaches_item_signal_only() {
        let items = signal(vec![todo(1, "one"), todo(2, "two")]);
        let seen = Rc::new(RefCell::new(HashMap::new()));
        let row_publishes = Rc::new(Cell::new(0));

        let items_clone = items.clone();
        let seen_clone = seen.clone();
        let projection = project(
            move || items_clone.get(),
            |t| t.id,
            move |item, key| {
                let seen = seen_clone.clone();
                let key = *key;
                effect(move || {
                    let text = item.with(|t| t.text);
                    seen.borrow_mut().insert(key, text);
                });
                Ok(())
            },
        )
        .unwrap();

        let rows = projection.rows();
        let publishes = row_publishes.clone();
        let _watch = effect(move || {
            rows.with(|_| ());
            publishes.set(publishes.get() + 1);
        });

        items.update(|v| v[1].text = "TWO");
        assert_eq!(seen.borrow().get(&2), Some(&"TWO"));
        assert_eq!(seen.borrow().get(&1), Some(&"one"));
        assert_eq!(row_publishes.get(), 1, "same key order does not republish rows");
    }

    #[test]
    fn test_duplicate_keys_skipped() {
        let items = signal(vec!["a", "a", "b"]);
        let items_clone = items.clone();
        let projection =
            project(move || items_clone.get(), |s| s.to_string(), |_, _| Ok(())).unwrap();
        assert_eq!(projection.keys(), vec!["a", "b"]);
    }

    #[test]
    fn test_map_error_keeps_other_items() {
        let items = signal(vec![1, 2, 3]);
        let items_clone = items.clone();
        let result = project(
            move || items_clone.get(),
            |n| *n,
            |_, key| {
                if *key == 2 {
                    Err(Error::render("bad item"))
                } else {
                    Ok(*key)
                }
            },
        );
        assert!(matches!(result, Err(Error::Render(_))));
    }
}
