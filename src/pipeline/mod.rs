//! Rendering pipeline - descriptors in, live nodes out.
//!
//! # Pipeline Architecture
//!
//! ```text
//! Descriptor ─▶ reconciler::mount ─▶ Mounted (host | text | fragment | region)
//!                                          │
//!                     region effects ──────┘  component / dynamic / reactive
//!                                             list / pick / boundary
//! ```
//!
//! ## Key Design Principles
//!
//! - **One dispatch site**: `reconciler::mount` is the only place that
//!   switches on descriptor kind
//! - **Regions**: anything that changes over time owns an anchor node and a
//!   scope; disposing the scope releases everything inside
//! - **Fine-grained updates**: reactive props, item signals and oracle
//!   changes touch only the nodes that depend on them

pub mod fence;
pub mod mount;

mod attributes;
mod boundary;
mod branch;
mod component;
mod directives;
pub(crate) mod list;
mod reconciler;
mod region;

// Re-exports
pub use attributes::{SyncState, BOOLEAN_PROPERTIES};
pub use component::Env;
pub use fence::{phase, Phase};
pub use mount::{mount, mount_with, MountHandle, MountOptions};
pub use reconciler::{render, render_in, Rendered};
