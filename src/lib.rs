//! # pounce
//!
//! Fine-grained reactive rendering core.
//!
//! Built on an in-crate signal/effect runtime with an explicit ownership
//! tree: every effect belongs to the effect or scope that created it, and
//! disposing an owner disposes everything below it.
//!
//! ## Architecture
//!
//! pounce uses a parallel arrays architecture for the live tree: nodes are
//! generational indices into columnar arrays rather than objects. The
//! reconciler is the only writer.
//!
//! ```text
//! Descriptor (inert) → reconciler → live nodes
//!        ▲                  │
//!   PropertyView      effects per region / per attribute / per directive
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Core types (Value, PropValue, Event, callbacks)
//! - [`reactive`] - Signals, effects, scopes, keyed projection
//! - [`engine`] - Node registry, parallel arrays, tree operations
//! - [`primitives`] - Descriptor builders, property composition, control flow
//! - [`pipeline`] - Reconciler, directives, rebuild fence, mount API
//! - [`config`] - Reactivity policies
//! - [`error`] - Error taxonomy

pub mod config;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod primitives;
pub mod reactive;
pub mod types;

// Re-export commonly used items
pub use types::*;

pub use config::{Policy, ReactivityConfig};
pub use error::{Error, Result};

pub use engine::{create_root, inner_html, outer_html, NodeId, NodeKind};

pub use reactive::{
    batch, effect, flush_sync, on_cleanup, project, signal, try_effect, untrack, EffectHandle,
    Scope, Signal,
};

pub use primitives::{
    branch, compose, dynamic, el, for_each, fragment, h, pick, reactive, show, text, try_catch,
    try_reactive, Component, Descriptor, Directive, ElementBuilder, Layer, Prop, PropertyLayer,
    PropertyView, Tag,
};

pub use pipeline::{mount, mount_with, render, Env, MountHandle, MountOptions, Rendered};
