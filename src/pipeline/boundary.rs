//! Error boundaries.
//!
//! The guarded child is mounted inside an attempt scope carrying an error
//! handler. A synchronous failure, or any later failure routed up the
//! ownership chain into the attempt scope, replaces the content with the
//! fallback. The fallback gets a reset handle that re-attempts the child.
//! Errors raised while rendering the fallback itself go to the next
//! handler up.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::primitives::{BoundaryDescriptor, ResetFn};
use crate::reactive::{untrack, Scope};

use super::reconciler::{mount, patch};
use super::region::{unmount, Mounted, Region, RegionSource};

pub(crate) struct Boundary {
    region: Rc<Region>,
    guarded: RefCell<Rc<BoundaryDescriptor>>,
    attempt: Cell<Option<Scope>>,
}

impl Boundary {
    /// Take over a boundary rebuilt by a re-rendering parent. Live guarded
    /// content is patched in place; a fallback on screen stays until reset,
    /// which then mounts the new child.
    pub(crate) fn retarget(self: &Rc<Self>, next: Rc<BoundaryDescriptor>) -> Result<()> {
        if Rc::ptr_eq(&self.guarded.borrow(), &next) {
            return Ok(());
        }
        self.guarded.replace(next.clone());

        let Some(attempt) = self.attempt.get() else { return Ok(()) };
        let mut slot = self.region.content.take();
        let result = attempt.run(|| patch(&mut slot, &next.child));
        self.region.content.replace(slot);
        self.region.settle();
        match result {
            Ok(()) => Ok(()),
            Err(err) => {
                tracing::debug!(%err, "boundary caught a patch error");
                show_fallback(self, err)
            }
        }
    }
}

pub(crate) fn mount_boundary(guarded: Rc<BoundaryDescriptor>) -> Result<Mounted> {
    let region = Region::new("boundary");
    let boundary = Rc::new(Boundary {
        region: region.clone(),
        guarded: RefCell::new(guarded),
        attempt: Cell::new(None),
    });
    region.source.replace(RegionSource::Boundary(Rc::downgrade(&boundary)));

    if let Err(err) = attempt(&boundary) {
        region.dispose();
        return Err(err);
    }

    // The region scope keeps the boundary alive; handlers only hold weak
    // references
    region.scope().on_cleanup(move || {
        if let Some(scope) = boundary.attempt.take() {
            scope.dispose();
        }
    });
    Ok(Mounted::Region(region))
}

/// Mount the guarded child in a fresh attempt scope.
fn attempt(boundary: &Rc<Boundary>) -> Result<()> {
    let attempt = boundary.region.scope().run(|| Scope::labeled("attempt"));
    let weak = Rc::downgrade(boundary);
    attempt.on_error(move |err| {
        if let Some(boundary) = weak.upgrade() {
            tracing::debug!(%err, "boundary caught a later error");
            if let Err(err) = show_fallback(&boundary, err) {
                boundary.region.scope().raise(err);
            }
        }
    });

    let guarded = boundary.guarded.borrow().clone();
    match attempt.run(|| mount(&guarded.child)) {
        Ok(content) => {
            swap(boundary, content, Some(attempt));
            Ok(())
        }
        Err(err) => {
            tracing::debug!(%err, "boundary caught a render error");
            attempt.dispose();
            show_fallback(boundary, err)
        }
    }
}

fn show_fallback(boundary: &Rc<Boundary>, err: Error) -> Result<()> {
    let weak = Rc::downgrade(boundary);
    let reset: ResetFn = Rc::new(move || {
        let Some(boundary) = weak.upgrade() else { return };
        if !boundary.region.is_alive() {
            return;
        }
        tracing::debug!("boundary reset");
        if let Err(err) = attempt(&boundary) {
            boundary.region.scope().raise(err);
        }
    });

    let fallback = boundary.guarded.borrow().fallback.clone();
    let desc = untrack(|| fallback(&err, reset));
    let content = boundary.region.scope().run(|| mount(&desc))?;
    swap(boundary, content, None);
    Ok(())
}

/// Replace the region content, then drop the previous attempt.
fn swap(boundary: &Boundary, content: Mounted, attempt: Option<Scope>) {
    let old = boundary.region.content.replace(content);
    unmount(old);
    if let Some(previous) = boundary.attempt.replace(attempt) {
        previous.dispose();
    }
    boundary.region.settle();
}
