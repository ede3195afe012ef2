//! Mount API - attach a descriptor tree to a container node.
//!
//! Every mount gets its own root scope. The root carries the mount's
//! reactivity config and a last-resort error handler: errors no boundary
//! caught are logged through `tracing::error!` and kept on the handle.
//!
//! # Example
//!
//! ```ignore
//! use pounce::{el, engine, mount};
//!
//! let container = engine::create_root();
//! let handle = mount(&el("p").child("hello").build(), container)?;
//! assert_eq!(handle.html(), "<p>hello</p>");
//!
//! // Clean up
//! handle.unmount();
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use crate::config::ReactivityConfig;
use crate::engine::{self, NodeId};
use crate::error::{Error, Result};
use crate::primitives::Descriptor;
use crate::reactive::Scope;

use super::reconciler;
use super::region::{unmount, Mounted};

// =============================================================================
// Options
// =============================================================================

/// Per-mount settings.
#[derive(Debug, Clone, Default)]
pub struct MountOptions {
    /// Overrides the thread default for everything under this mount.
    pub config: Option<ReactivityConfig>,
}

impl MountOptions {
    pub fn with_config(mut self, config: ReactivityConfig) -> Self {
        self.config = Some(config);
        self
    }
}

// =============================================================================
// Mount Handle
// =============================================================================

/// Handle returned by [`mount`]. Dropping it unmounts.
pub struct MountHandle {
    scope: Scope,
    container: NodeId,
    content: Rc<RefCell<Mounted>>,
    errors: Rc<RefCell<Vec<Error>>>,
}

impl MountHandle {
    /// Root scope of this mount.
    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn container(&self) -> NodeId {
        self.container
    }

    /// Top-level nodes this mount placed in the container.
    pub fn nodes(&self) -> Vec<NodeId> {
        self.content.borrow().nodes()
    }

    /// Serialized container content.
    pub fn html(&self) -> String {
        engine::inner_html(self.container)
    }

    /// Errors that reached the root since the last call.
    pub fn take_errors(&self) -> Vec<Error> {
        std::mem::take(&mut *self.errors.borrow_mut())
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.borrow().is_empty()
    }

    pub fn is_mounted(&self) -> bool {
        self.scope.is_alive()
    }

    /// Dispose every effect and release every node this mount created.
    pub fn unmount(self) {
        // Drop does the work
    }
}

impl Drop for MountHandle {
    fn drop(&mut self) {
        if self.scope.is_alive() {
            tracing::debug!(container = ?self.container, "unmount");
        }
        self.scope.dispose_quietly();
    }
}

// =============================================================================
// Mount
// =============================================================================

/// Mount `desc` into `container` with default options.
pub fn mount(desc: &Descriptor, container: NodeId) -> Result<MountHandle> {
    mount_with(desc, container, MountOptions::default())
}

/// Mount `desc` into `container`.
///
/// An error from the initial render is returned and nothing stays behind.
pub fn mount_with(desc: &Descriptor, container: NodeId, options: MountOptions) -> Result<MountHandle> {
    let scope = Scope::root_labeled("mount");
    if let Some(config) = options.config {
        scope.set_config(config);
    }

    let errors: Rc<RefCell<Vec<Error>>> = Rc::default();
    let sink = errors.clone();
    scope.on_error(move |err| {
        tracing::error!(%err, "uncaught error in mounted tree");
        sink.borrow_mut().push(err);
    });

    let content = match scope.run(|| reconciler::mount(desc)) {
        Ok(content) => content,
        Err(err) => {
            tracing::error!(%err, "mount failed");
            scope.dispose();
            return Err(err);
        }
    };
    for node in content.nodes() {
        engine::append_child(container, node);
    }

    let content = Rc::new(RefCell::new(content));
    let owned = content.clone();
    scope.on_cleanup(move || unmount(owned.take()));

    tracing::debug!(?container, nodes = content.borrow().nodes().len(), "mounted");
    Ok(MountHandle { scope, container, content, errors })
}
