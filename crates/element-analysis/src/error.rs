//! Structured, matchable errors exposed on the public API.
//!
//! A small set of `thiserror`-derived error enums: most fallible plumbing
//! inside this crate uses `anyhow::Result` (loader/parser failures, wrapped
//! with context), but the handful of outcomes a caller needs to `match` on
//! are named types here.

use thiserror::Error;

use crate::url::CanonicalUrl;

/// Errors [`crate::context::AnalysisContext`] can return from its public
/// operations.
#[derive(Error, Debug)]
pub enum ContextError {
    /// `get_document` was asked for a URL that has no scanned document in
    /// this snapshot.
    #[error("unable to analyze `{0}`: no scanned document in this snapshot")]
    UnableToAnalyze(CanonicalUrl),

    /// A load failure on the root of an `analyze()` request, surfaced as a
    /// top-level error rather than attached to an import feature.
    #[error("failed to load root document `{0}`: {1:#}")]
    RootLoadFailed(CanonicalUrl, #[source] anyhow::Error),

    /// A non-warning-carrying failure propagated out of `analyze`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Distinguishes cooperative cancellation from an ordinary failure at every
/// `analyze` await site: cancellation gets its own sentinel in the error sum
/// rather than being folded into an ordinary failure variant.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("analysis was cancelled")]
pub struct Cancelled;

/// The outcome of an `analyze()` call: either the resulting snapshot, a
/// structured error, or cancellation -- kept as three separate cases (rather
/// than folding cancellation into `ContextError`) so callers can
/// pattern-match cancellation without inspecting an error message.
pub type AnalyzeResult<T> = Result<T, AnalyzeOutcome>;

/// The failure half of [`AnalyzeResult`].
#[derive(Error, Debug)]
pub enum AnalyzeOutcome {
    /// The request was cancelled before it completed.
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
    /// Analysis failed outright.
    #[error(transparent)]
    Failed(#[from] ContextError),
}
