//! Rebuild fence.
//!
//! Tracks which phase the reconciler is in and decides what happens when a
//! rebuild the reactivity policy forbids is detected. Lifecycle hooks
//! (directives, refs, mount hooks) always run untracked: a signal they read
//! can never make the surrounding render re-run.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::config::Policy;
use crate::error::{Error, Result};
use crate::reactive::{current_config, untrack};

/// What the reconciler is doing right now.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    /// Rendering a component and reconciling its output.
    Render(Rc<str>),
    /// Inside a directive, ref callback or mount hook.
    Lifecycle,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Idle => f.write_str("idle"),
            Phase::Render(component) => write!(f, "render of `{component}`"),
            Phase::Lifecycle => f.write_str("lifecycle hook"),
        }
    }
}

thread_local! {
    static PHASE: RefCell<Phase> = const { RefCell::new(Phase::Idle) };
}

/// Current phase on this thread.
pub fn phase() -> Phase {
    PHASE.with(|p| p.borrow().clone())
}

struct PhaseGuard(Option<Phase>);

impl Drop for PhaseGuard {
    fn drop(&mut self) {
        if let Some(previous) = self.0.take() {
            PHASE.with(|p| p.replace(previous));
        }
    }
}

fn enter(next: Phase) -> PhaseGuard {
    PhaseGuard(Some(PHASE.with(|p| p.replace(next))))
}

/// Render a component and reconcile what it returned. Rebuilds detected
/// inside are attributed to `component`.
pub(crate) fn run_render<R>(component: &str, f: impl FnOnce() -> R) -> R {
    let _guard = enter(Phase::Render(component.into()));
    tracing::trace!(component, "render");
    f()
}

/// Run a lifecycle hook, untracked.
pub(crate) fn run_lifecycle<R>(f: impl FnOnce() -> R) -> R {
    let _guard = enter(Phase::Lifecycle);
    untrack(f)
}

/// Apply the `check_reactivity` policy to a detected rebuild. `Ok` means
/// the rebuild may go ahead.
pub(crate) fn enforce(describe: impl FnOnce() -> String) -> Result<()> {
    match current_config().check_reactivity {
        Policy::Off => Ok(()),
        Policy::Warn => {
            tracing::warn!(rebuild = %describe(), phase = %phase(), "rebuild with unchanged inputs");
            Ok(())
        }
        Policy::Error => Err(Error::ForbiddenRebuild(format!("{} during {}", describe(), phase()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{with_config, ReactivityConfig};
    use crate::reactive::{is_tracking, signal, effect, Scope};
    use std::cell::Cell;
    use tracing_test::traced_test;

    #[test]
    fn test_phase_restored() {
        assert_eq!(phase(), Phase::Idle);
        run_render("Outer", || {
            assert_eq!(phase(), Phase::Render("Outer".into()));
            run_render("Inner", || assert_eq!(phase().to_string(), "render of `Inner`"));
            run_lifecycle(|| assert_eq!(phase(), Phase::Lifecycle));
            assert_eq!(phase(), Phase::Render("Outer".into()));
        });
        assert_eq!(phase(), Phase::Idle);
    }

    #[test]
    fn test_lifecycle_is_untracked() {
        let scope = Scope::root();
        let source = signal(0);
        let runs = Rc::new(Cell::new(0));
        let (s, r) = (source.clone(), runs.clone());
        scope.run(|| {
            effect(move || {
                r.set(r.get() + 1);
                run_lifecycle(|| {
                    assert!(!is_tracking());
                    s.get()
                });
            })
        });
        source.set(1);
        assert_eq!(runs.get(), 1);
        scope.dispose();
    }

    #[test]
    fn test_enforce_policies() {
        let off = ReactivityConfig::strict().with_check_reactivity(Policy::Off);
        assert!(with_config(off, || enforce(|| "x".into())).is_ok());

        let warn = ReactivityConfig::strict().with_check_reactivity(Policy::Warn);
        assert!(with_config(warn, || enforce(|| "x".into())).is_ok());

        let strict = ReactivityConfig::strict();
        let err = with_config(strict, || run_render("Form", || enforce(|| "directive `focus`".into())));
        assert!(matches!(
            err,
            Err(Error::ForbiddenRebuild(m)) if m == "directive `focus` during render of `Form`"
        ));
    }

    #[test]
    #[traced_test]
    fn test_warn_policy_logs() {
        let warn = ReactivityConfig::strict().with_check_reactivity(Policy::Warn);
        with_config(warn, || run_render("Card", || enforce(|| "directive `tooltip`".into())))
            .expect("warn allows");
        assert!(logs_contain("rebuild with unchanged inputs"));
        assert!(logs_contain("tooltip"));
        assert!(logs_contain("render of `Card`"));
    }
}
