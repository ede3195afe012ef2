//! Attribute arrays: attributes, DOM-style properties, inline style.
//!
//! Properties hold values that are not plain attribute text: boolean DOM
//! properties (`checked`, `disabled`, ...) and the live `value` of form
//! controls.

use std::collections::BTreeMap;
use std::rc::Rc;

use super::Column;
use crate::types::Value;

/// Ordered `(property, value)` style declarations.
pub type StyleDecls = Vec<(Rc<str>, String)>;

thread_local! {
    static ATTRIBUTES: Column<BTreeMap<Rc<str>, String>> = const { Column::new() };
    static PROPERTIES: Column<BTreeMap<Rc<str>, Value>> = const { Column::new() };
    static STYLES: Column<StyleDecls> = const { Column::new() };
}

pub fn ensure_capacity(index: usize) {
    ATTRIBUTES.with(|arr| arr.ensure(index));
    PROPERTIES.with(|arr| arr.ensure(index));
    STYLES.with(|arr| arr.ensure(index));
}

pub fn clear_at_index(index: usize) {
    ATTRIBUTES.with(|arr| arr.clear(index));
    PROPERTIES.with(|arr| arr.clear(index));
    STYLES.with(|arr| arr.clear(index));
}

pub fn reset() {
    ATTRIBUTES.with(Column::reset);
    PROPERTIES.with(Column::reset);
    STYLES.with(Column::reset);
}

pub fn attribute(index: usize, name: &str) -> Option<String> {
    ATTRIBUTES.with(|arr| arr.with(index, |map| map.get(name).cloned()))
}

pub fn attributes(index: usize) -> BTreeMap<Rc<str>, String> {
    ATTRIBUTES.with(|arr| arr.get(index))
}

/// `None` removes. Returns whether anything changed.
pub fn set_attribute(index: usize, name: &str, value: Option<String>) -> bool {
    ATTRIBUTES.with(|arr| {
        arr.with_mut(index, |map| match value {
            Some(value) => {
                if map.get(name) == Some(&value) {
                    return false;
                }
                map.insert(name.into(), value);
                true
            }
            None => map.remove(name).is_some(),
        })
    })
}

pub fn property(index: usize, name: &str) -> Value {
    PROPERTIES.with(|arr| arr.with(index, |map| map.get(name).cloned().unwrap_or_default()))
}

pub fn properties(index: usize) -> BTreeMap<Rc<str>, Value> {
    PROPERTIES.with(|arr| arr.get(index))
}

/// Returns whether anything changed. `Null` removes.
pub fn set_property(index: usize, name: &str, value: Value) -> bool {
    PROPERTIES.with(|arr| {
        arr.with_mut(index, |map| {
            if value.is_null() {
                return map.remove(name).is_some();
            }
            if map.get(name) == Some(&value) {
                return false;
            }
            map.insert(name.into(), value);
            true
        })
    })
}

pub fn styles(index: usize) -> StyleDecls {
    STYLES.with(|arr| arr.get(index))
}

/// Replace all declarations. Returns whether anything changed.
pub fn set_styles(index: usize, decls: StyleDecls) -> bool {
    STYLES.with(|arr| {
        arr.with_mut(index, |cell| {
            if *cell == decls {
                false
            } else {
                *cell = decls;
                true
            }
        })
    })
}
