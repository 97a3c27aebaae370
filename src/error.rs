//! Configuration failures.
//!
//! Everything in here is raised while the adapter catalog and the trimming
//! options are assembled, i.e. before the first read is touched. Per-read
//! conditions never surface as errors: a probe that does not fit a window is
//! simply "no match", and a fault while processing one read is contained by
//! [`crate::pipeline`].
use thiserror::Error;

/// A problem with the adapters or options supplied for a run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// An adapter was given an empty start or end probe.
    #[error("adapter `{label}` has an empty {end} probe")]
    EmptyProbe { label: String, end: &'static str },

    /// A probe contains a character outside `ACGTN`.
    #[error("adapter `{label}` {end} probe contains invalid base `{base}` at position {pos}")]
    InvalidBase { label: String, end: &'static str, base: char, pos: usize },

    /// Two adapters share the same label.
    #[error("duplicate adapter label `{0}`")]
    DuplicateLabel(String),

    /// The label itself is empty.
    #[error("adapter labels must not be empty")]
    EmptyLabel,

    /// A built-in adapter set was requested that this build does not know.
    #[error("unknown adapter set `{0}`; run `porkchop-trim list-sets` to see valid names")]
    UnknownSet(String),

    /// After selection no adapter is left to search for.
    #[error("no adapters selected")]
    NoAdapters,

    /// An identity or fraction threshold outside `(0, 1]`.
    #[error("{name} must be in (0, 1], got {value}")]
    ThresholdOutOfRange { name: &'static str, value: f64 },

    /// A length or count option that must be positive is zero.
    #[error("{0} must be greater than zero")]
    NonPositive(&'static str),

    /// The length filter can never be satisfied.
    #[error("max length {max} is below min length {min}")]
    LengthRange { min: usize, max: usize },
}
