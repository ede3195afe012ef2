//! Reactive substrate.
//!
//! Signals, effects and scopes form an explicit ownership tree: every
//! effect or scope is owned by the effect or scope that was current when it
//! was created, and lives until that owner re-runs or is disposed.
//!
//! ```ignore
//! let count = signal(0);
//! let doubled = count.clone();
//! let scope = Scope::root();
//! scope.run(|| {
//!     effect(move || println!("doubled = {}", doubled.get() * 2));
//! });
//! count.set(2); // prints "doubled = 4"
//! scope.dispose();
//! ```

mod effect;
mod project;
mod runtime;
mod signal;

pub use effect::{
    batch, effect, flush_sync, is_tracking, live_effect_count, on_cleanup, try_effect, untrack,
    EffectHandle, Scope,
};
pub use project::{project, Projection, Row};
pub use runtime::EffectId;
pub use signal::{signal, Signal};

pub(crate) use effect::{current_config, effect_labeled, try_effect_labeled};
