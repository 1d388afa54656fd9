//! Error types for routing and handler invocation.

use std::fmt;
use std::panic::Location;

use thiserror::Error;

/// Source location of the handler an error relates to, if known.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Origin(pub Option<&'static Location<'static>>);

impl Origin {
    /// An origin pointing at no particular handler.
    pub const UNKNOWN: Self = Self(None);

    /// Returns the recorded location, if any.
    pub fn location(&self) -> Option<&'static Location<'static>> {
        self.0
    }
}

impl From<&'static Location<'static>> for Origin {
    fn from(location: &'static Location<'static>) -> Self {
        Self(Some(location))
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(location) => write!(f, " (handler defined at {location})"),
            None => Ok(()),
        }
    }
}

/// Errors raised while walking a route tree.
#[derive(Debug, Error)]
pub enum RoutingError {
    /// A substitution rule's regular expression could not be compiled.
    #[error("invalid substitution pattern `{pattern}`: {source}")]
    InvalidSubstitution {
        /// The offending substitution regex.
        pattern: String,
        /// The underlying regex error.
        #[source]
        source: regex::Error,
    },

    /// A registered pattern is not a valid regular expression.
    #[error("invalid pattern `{pattern}`{origin}: {source}")]
    MalformedPattern {
        /// The pattern, after preprocessing.
        pattern: String,
        /// The underlying regex error.
        #[source]
        source: regex::Error,
        /// The handler registered for the pattern.
        origin: Origin,
    },

    /// A pattern defines an unnamed capture group.
    #[error("pattern `{pattern}` defines an unnamed substring capture{origin}")]
    MixedCaptures {
        /// The pattern, after preprocessing.
        pattern: String,
        /// The handler registered for the pattern.
        origin: Origin,
    },

    /// A `..` token was used at the root of a route tree.
    #[error("cannot navigate above the root from `{path}`")]
    NoParent {
        /// Path of the node at which navigation was attempted.
        path: String,
    },
}

/// Errors raised while binding handler parameters.
#[derive(Debug, Error)]
pub enum InvocationError {
    /// A parameter could not be satisfied by name, default or lookup.
    #[error("missing parameter: ${name}{origin}")]
    MissingParameter {
        /// Name of the unsatisfied parameter.
        name: String,
        /// The handler being invoked.
        origin: Origin,
    },
}

/// Any failure of a resolution or execution call.
#[derive(Debug, Error)]
pub enum Error {
    /// Route tree walking failed.
    #[error(transparent)]
    Routing(#[from] RoutingError),

    /// A handler could not be invoked.
    #[error(transparent)]
    Invocation(#[from] InvocationError),
}

/// Result type alias for routing operations.
pub type Result<T> = std::result::Result<T, Error>;
