//! Configuration for this crate.
//!
//! An `Arc`-backed, cheaply cloneable wrapper so
//! [`AnalysisContext`](crate::context::AnalysisContext) can hand the same
//! configuration to every fork without re-allocating it.

use std::collections::HashMap;
use std::sync::Arc;

use crate::url::CanonicalUrl;

/// Configuration for the analysis engine.
///
/// Cheaply cloneable: cloning a `Config` bumps a reference count rather than
/// copying its contents, so every forked [`AnalysisContext`](crate::context::AnalysisContext)
/// snapshot can carry the same configuration without re-allocating it.
#[derive(Clone, Debug, Default)]
pub struct Config {
    inner: Arc<ConfigInner>,
}

#[derive(Debug, Default)]
struct ConfigInner {
    /// Privacy fallback for names with no explicit annotation and no
    /// underscore convention match.
    default_private: bool,
    /// Additional import edges spliced into a document's discovered imports
    /// before the dependency graph is populated, as if the document had
    /// declared them itself.
    lazy_edges: HashMap<CanonicalUrl, Vec<CanonicalUrl>>,
}

impl Config {
    /// Constructs a default configuration: `default_private = false`, no
    /// lazy edges.
    pub fn new() -> Self {
        Self::default()
    }

    /// This configuration's default-private fallback.
    pub fn default_private(&self) -> bool {
        self.inner.default_private
    }

    /// Returns a new configuration with `default_private` replaced.
    pub fn with_default_private(&self, default_private: bool) -> Self {
        let mut inner = (*self.inner).clone_fields();
        inner.default_private = default_private;
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Returns a new configuration with `lazy_edges` replaced wholesale.
    pub fn with_lazy_edges(&self, lazy_edges: HashMap<CanonicalUrl, Vec<CanonicalUrl>>) -> Self {
        let mut inner = (*self.inner).clone_fields();
        inner.lazy_edges = lazy_edges;
        Self {
            inner: Arc::new(inner),
        }
    }

    /// The lazy edges configured for `url`, if any (spliced in
    /// before the dependency graph sees `url`'s imports, participating in
    /// cycle detection, `when_ready`, and invalidation identically to a
    /// parsed import).
    pub fn lazy_edges_for(&self, url: &CanonicalUrl) -> &[CanonicalUrl] {
        self.inner
            .lazy_edges
            .get(url)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

impl ConfigInner {
    /// Manual clone helper: `ConfigInner` intentionally doesn't derive
    /// `Clone` so that ordinary `Config` clones stay a cheap `Arc` bump;
    /// only the `with_*` builders need a true field copy.
    fn clone_fields(&self) -> Self {
        Self {
            default_private: self.default_private,
            lazy_edges: self.lazy_edges.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_not_private_by_default() {
        assert!(!Config::new().default_private());
    }

    #[test]
    fn with_default_private_does_not_mutate_the_original() {
        let base = Config::new();
        let private = base.with_default_private(true);
        assert!(!base.default_private());
        assert!(private.default_private());
    }

    #[test]
    fn lazy_edges_round_trip() {
        let a = CanonicalUrl::from_canonical("a.html");
        let b = CanonicalUrl::from_canonical("b.html");
        let config = Config::new().with_lazy_edges(HashMap::from([(a.clone(), vec![b.clone()])]));
        assert_eq!(config.lazy_edges_for(&a), &[b]);
        assert!(config.lazy_edges_for(&CanonicalUrl::from_canonical("c.html")).is_empty());
    }
}
