//! Error taxonomy for rendering and reactive updates.
//!
//! Render-time failures (`InvalidTag`, `Render`) travel up through `?` to the
//! nearest boundary. Failures inside a later effect run are wrapped in
//! `Reaction` and routed through the ownership chain instead.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// A descriptor tag that cannot be rendered.
    #[error("invalid tag `{0}`")]
    InvalidTag(String),

    /// Synchronous failure inside a component or attribute computation.
    #[error("render error: {0}")]
    Render(String),

    /// Failure inside an effect that ran after the initial render.
    #[error("reaction error: {0}")]
    Reaction(#[source] Box<Error>),

    /// An effect kept re-triggering itself within a single flush.
    #[error("maximum reaction depth of {limit} exceeded by `{effect}`")]
    MaxReactionDepthExceeded { limit: usize, effect: &'static str },

    /// A rebuild the reactivity policy forbids.
    #[error("forbidden rebuild: {0}")]
    ForbiddenRebuild(String),
}

impl Error {
    /// Shorthand for [`Error::Render`].
    pub fn render(message: impl Into<String>) -> Self {
        Error::Render(message.into())
    }

    /// Wrap a failure from a re-running effect. Policy violations and errors
    /// that are already wrapped pass through untouched.
    pub(crate) fn into_reaction(self) -> Self {
        match self {
            Error::InvalidTag(_) | Error::Render(_) => Error::Reaction(Box::new(self)),
            other => other,
        }
    }

    /// The innermost error, skipping `Reaction` wrappers.
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::Reaction(inner) => inner.root_cause(),
            other => other,
        }
    }

    /// True for errors produced by a reactivity policy rather than user code.
    pub fn is_policy_violation(&self) -> bool {
        matches!(
            self.root_cause(),
            Error::MaxReactionDepthExceeded { .. } | Error::ForbiddenRebuild(_)
        )
    }
}
