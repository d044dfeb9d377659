//! Warnings accumulated while loading, parsing, scanning, and resolving
//! documents.
//!
//! Warnings are the crate's diagnostic currency: unlike the structured
//! [`ContextError`](crate::context::ContextError) variants, a warning never
//! aborts analysis — it is attached to whatever feature or document produced
//! it and surfaced in the final summary.

use std::fmt;

use crate::url::CanonicalUrl;

/// A half-open, zero-based byte range into a document's source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct SourceRange {
    /// Start byte offset, inclusive.
    pub start: u32,
    /// End byte offset, exclusive.
    pub end: u32,
}

impl SourceRange {
    /// A zero-length range at offset zero, used for warnings that cannot be
    /// attributed to a specific location (e.g. "unable to analyze").
    pub const EMPTY: Self = Self { start: 0, end: 0 };

    /// Constructs a range from a pair of byte offsets.
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }
}

/// The kind of warning raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// The document's URL could not be loaded.
    UnableToLoad,
    /// The document's bytes could not be parsed.
    ParseFailure,
    /// No scanned document exists for a requested URL.
    UnableToAnalyze,
    /// A superclass, mixin, or behavior reference could not be resolved.
    UnresolvedReference,
    /// A scanner could not determine a feature's name.
    AmbiguousName,
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::UnableToLoad => "unable-to-load",
            Self::ParseFailure => "parse-failure",
            Self::UnableToAnalyze => "unable-to-analyze",
            Self::UnresolvedReference => "unresolved-reference",
            Self::AmbiguousName => "ambiguous-name",
        };
        f.write_str(s)
    }
}

/// A single diagnostic attached to a document or feature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    /// The kind of warning.
    pub kind: WarningKind,
    /// The document the warning applies to.
    pub url: CanonicalUrl,
    /// A human-readable message.
    pub message: String,
    /// The source range the warning applies to, if any.
    pub range: SourceRange,
}

impl Warning {
    /// Constructs a new warning.
    pub fn new(kind: WarningKind, url: CanonicalUrl, message: impl Into<String>) -> Self {
        Self {
            kind,
            url,
            message: message.into(),
            range: SourceRange::EMPTY,
        }
    }

    /// Returns this warning with the given source range attached.
    pub fn with_range(mut self, range: SourceRange) -> Self {
        self.range = range;
        self
    }

    /// Wraps an arbitrary error as a generic parse failure, preserving the
    /// underlying message.
    pub fn wrap_parse_error(url: CanonicalUrl, error: &anyhow::Error) -> Self {
        Self::new(WarningKind::ParseFailure, url, format!("{error:#}"))
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} ({})", self.kind, self.message, self.url)
    }
}

impl std::error::Error for Warning {}
