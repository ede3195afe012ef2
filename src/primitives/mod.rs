//! Primitives - descriptor builders and property composition.
//!
//! This module provides the inert half of the framework:
//! - [`descriptor`] - Tags, element descriptors and the fluent builder
//! - [`props`] - Property layers and the merged [`PropertyView`]
//! - [`control_flow`] - Keyed lists, picks, boundaries, reactive regions
//!
//! # Reactivity
//!
//! Props can be:
//! - Static values: `.attr("id", "main")`
//! - Signals: `.attr("title", title_signal)` (stays connected!)
//! - Getters: `.attr("title", PropValue::getter(move || compute()))`
//!
//! Pass signals through as-is - don't read them while building:
//!
//! ```ignore
//! // CORRECT - only the title attribute updates when the signal changes
//! el("div").attr("title", title.clone())
//!
//! // WRONG - snapshot of the current value, never updates
//! el("div").attr("title", title.get())
//! ```

pub mod control_flow;
pub mod descriptor;
pub mod props;

pub use control_flow::{
    branch, dynamic, for_each, pick, reactive, show, try_catch, try_reactive, BoundaryDescriptor,
    BranchFn, FallbackFn, ListDescriptor, OracleFn, PickDescriptor, ResetFn,
};
pub use descriptor::{
    el, fragment, h, text, validate_host_name, Component, ComponentFn, Descriptor,
    ElementBuilder, ElementDescriptor, ReactiveFn, Tag,
};
pub use props::{
    compose, is_merged_key, Directive, DirectiveFn, DirectiveSet, Layer, Prop, PropertyLayer,
    PropertyView, BIND_PREFIX, CLASS, EVENT_PREFIX, STYLE, THIS, USE, USE_PREFIX,
};

pub(crate) use control_flow::ListSource;
