//! Live tree engine - node registry, parallel arrays and tree operations.
//!
//! The engine manages the core data structures:
//! - Registry: generational index allocation, index reuse
//! - Arrays: parallel columns for node state
//! - Tree: structure edits, attributes, events, serialization
//!
//! # Architecture
//!
//! Nodes are NOT objects. They are indices into parallel arrays:
//!
//! ```text
//! Index 0: Root   (parent=None, children=[1, 3])
//! Index 1: Element(tag=div, parent=0, attrs={class: "card"})
//! Index 2: Text   (parent=1, text="hello")
//! Index 3: Anchor (parent=0)
//! ```
//!
//! The reconciler only ever talks to the tree through the functions
//! re-exported here.

mod registry;
mod tree;
pub mod arrays;

pub use arrays::attrs::StyleDecls;
pub use arrays::interaction::ListenerId;
pub use registry::*;
pub use tree::*;
