//! Oracle-driven branch selection.
//!
//! The oracle is re-evaluated whenever something it read changes. Only the
//! set of active branches matters: a branch that stays active is left
//! untouched, a newly active branch is rendered once in its own region, and
//! a deactivated branch is disposed.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::Result;
use crate::primitives::{BranchFn, PickDescriptor};
use crate::reactive::{signal, try_effect_labeled};

use super::reconciler::mount;
use super::region::{Mounted, Region, RegionSource};

pub(crate) fn mount_pick(pick: Rc<PickDescriptor>) -> Result<Mounted> {
    let current = signal(pick);
    let region = Region::new("pick").with_source(RegionSource::Pick(current.clone()));
    let active: RefCell<Vec<(Rc<str>, Rc<Region>)>> = RefCell::new(Vec::new());

    let r = region.clone();
    let created = region.scope().run(|| {
        try_effect_labeled("pick", move || {
            // A pick rebuilt by a re-rendering parent lands here; branches
            // that stay active under the new oracle keep their regions
            let pick = current.get();
            let names = pick.candidate_names();
            let chosen = (pick.oracle)(&names);
            for name in &chosen {
                if !names.contains(name) {
                    tracing::warn!(branch = %name, "oracle selected an unknown branch, ignored");
                }
            }
            let selected: Vec<Rc<str>> = names.iter().filter(|n| chosen.contains(n)).cloned().collect();

            let removed: Vec<(Rc<str>, Rc<Region>)> = {
                let mut active = active.borrow_mut();
                let (keep, gone) = std::mem::take(&mut *active)
                    .into_iter()
                    .partition(|(name, _)| selected.contains(name));
                *active = keep;
                gone
            };
            for (name, branch) in removed {
                tracing::trace!(branch = %name, "deactivate");
                branch.dispose();
            }

            let mut next = Vec::with_capacity(selected.len());
            let mut failure = None;
            for name in selected {
                let existing = active.borrow().iter().find(|(n, _)| *n == name).map(|(_, b)| b.clone());
                match existing {
                    Some(branch) => next.push((name, branch)),
                    None => {
                        let Some((_, render)) = pick.candidates.iter().find(|(n, _)| *n == name) else {
                            continue;
                        };
                        tracing::trace!(branch = %name, "activate");
                        match r.scope().run(|| branch_region(render)) {
                            Ok(branch) => next.push((name, branch)),
                            Err(err) => {
                                failure.get_or_insert(err);
                            }
                        }
                    }
                }
            }

            let content = Mounted::Fragment(next.iter().map(|(_, b)| Mounted::Region(b.clone())).collect());
            active.replace(next);
            r.content.replace(content);
            r.settle();

            match failure {
                Some(err) => Err(err),
                None => Ok(()),
            }
        })
    });

    match created {
        Ok(_) => Ok(Mounted::Region(region)),
        Err(err) => {
            region.dispose();
            Err(err)
        }
    }
}

/// Render one branch into its own region. The branch function runs
/// untracked, once.
fn branch_region(render: &BranchFn) -> Result<Rc<Region>> {
    let region = Region::new("branch");
    let desc = render();
    match region.scope().run(|| mount(&desc)) {
        Ok(content) => {
            region.content.replace(content);
            Ok(region)
        }
        Err(err) => {
            region.dispose();
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{self, create_root, inner_html, reset_registry};
    use crate::primitives::{branch, el, pick, show, text};
    use crate::reactive::{signal, Scope};
    use std::cell::Cell;

    #[test]
    fn test_show_toggles() {
        reset_registry();
        let flag = signal(true);
        let f = flag.clone();
        let scope = Scope::root();
        let root = create_root();
        let mounted = scope
            .run(|| mount(&show(move || f.get(), || text("yes"), || text("no"))))
            .expect("mount");
        for n in mounted.nodes() {
            engine::append_child(root, n);
        }
        assert_eq!(inner_html(root), "yes");
        flag.set(false);
        assert_eq!(inner_html(root), "no");
        flag.set(true);
        assert_eq!(inner_html(root), "yes");
        scope.dispose();
    }

    #[test]
    fn test_branch_runs_once_per_activation() {
        reset_registry();
        let selection = signal(vec!["a"]);
        let (a_runs, b_runs) = (Rc::new(Cell::new(0)), Rc::new(Cell::new(0)));
        let (a, b) = (a_runs.clone(), b_runs.clone());
        let s = selection.clone();
        let desc = pick(
            [
                ("a", branch(move || {
                    a.set(a.get() + 1);
                    text("A")
                })),
                ("b", branch(move || {
                    b.set(b.get() + 1);
                    el("i").child("B").build()
                })),
            ],
            move |_| s.get().into_iter().map(Rc::from).collect(),
        );

        let scope = Scope::root();
        let root = create_root();
        let mounted = scope.run(|| mount(&desc)).expect("mount");
        for n in mounted.nodes() {
            engine::append_child(root, n);
        }
        assert_eq!(inner_html(root), "A");

        // Oracle output order does not matter; candidate order does
        selection.set(vec!["b", "a"]);
        assert_eq!(inner_html(root), "A<i>B</i>");
        assert_eq!((a_runs.get(), b_runs.get()), (1, 1));

        selection.set(vec!["b", "unknown"]);
        assert_eq!(inner_html(root), "<i>B</i>");
        selection.set(vec!["a", "b"]);
        assert_eq!((a_runs.get(), b_runs.get()), (2, 1));
        scope.dispose();
    }
}
