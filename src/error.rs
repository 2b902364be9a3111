//! Configuration errors surfaced by the resolution engine.

use crate::catalog::FlagName;
use thiserror::Error;

/// Errors that abort a resolution run.
///
/// All variants describe a malformed catalog; resolution over a well-formed
/// catalog is total and cannot fail.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// A catalog entry carries an empty or whitespace-only name.
    #[error("catalog entry #{index} has an empty flag name")]
    EmptyFlagName { index: usize },

    /// The same flag name appears more than once.
    #[error("duplicate flag '{0}' in catalog")]
    DuplicateFlag(FlagName),

    /// Prefix derivation configured with an empty prefix.
    #[error("prefix derivation requires a non-empty prefix")]
    EmptyPrefix,

    /// Table derivation has no entry for a flag that is not overridden.
    #[error("flag '{0}' has no entry in the capability table")]
    MissingTableEntry(FlagName),
}

/// Result type alias for resolution.
pub type Result<T> = std::result::Result<T, ResolveError>;
