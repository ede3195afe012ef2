//! Keyed list regions.
//!
//! Items are projected by key: each key gets one reactive item region,
//! created once and disposed when the key disappears. The list effect only
//! re-orders item regions; item content updates flow through the item
//! signals. The list effect sits above the item effects in the ownership
//! tree, so within one flush moves happen before item content changes.

use std::rc::Rc;

use crate::error::Result;
use crate::primitives::{ListDescriptor, ListSource};
use crate::reactive::{effect_labeled, untrack};

use super::region::{Mounted, Region, RegionSource};

pub(crate) use super::component::reactive_region;

/// Live rows of an opened list source.
pub(crate) struct ListRows {
    pub(crate) rows: Box<dyn Fn() -> Vec<Rc<Region>>>,
    /// Take over the closures of another source of the same shape. False
    /// when `next` cannot be adopted and the list has to be remounted.
    pub(crate) adopt: Box<dyn Fn(&dyn ListSource) -> bool>,
}

pub(crate) fn mount_list(list: &ListDescriptor) -> Result<Mounted> {
    let region = Region::new("list");

    let ListRows { rows, adopt } = match region.scope().run(|| list.source.open()) {
        Ok(rows) => rows,
        Err(err) => {
            region.dispose();
            return Err(err);
        }
    };
    region.source.replace(RegionSource::List { list: list.clone(), adopt: adopt.into() });

    let r = region.clone();
    region.scope().run(|| {
        effect_labeled("list", move || {
            let items = rows();
            tracing::trace!(items = items.len(), "list rows changed");
            // Removed item regions are disposed by the projection
            let content = Mounted::Fragment(items.into_iter().map(Mounted::Region).collect());
            r.content.replace(content);
            untrack(|| r.settle());
        })
    });

    Ok(Mounted::Region(region))
}
