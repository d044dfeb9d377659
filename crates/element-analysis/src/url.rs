//! Canonical URLs and the loader/resolver interfaces the context consumes.
//!
//! Concrete resolution and loading are external collaborators: this crate
//! only defines the traits the [`AnalysisContext`] calls through, plus a
//! small in-memory implementation useful for tests.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use url::Url;

/// A URL produced by a [`UrlResolver`].
///
/// Two URLs that resolve equal are considered the same document; all cache
/// keys in the engine are `CanonicalUrl`s.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct CanonicalUrl(Arc<str>);

impl CanonicalUrl {
    /// Wraps an already-canonical string.
    ///
    /// Prefer [`UrlResolver::resolve`] for anything that came from user input
    /// or a document reference; this constructor is for resolvers and tests
    /// that already hold a canonical value.
    pub fn from_canonical(s: impl Into<Arc<str>>) -> Self {
        Self(s.into())
    }

    /// Returns the canonical URL as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CanonicalUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Url> for CanonicalUrl {
    fn from(url: Url) -> Self {
        Self(url.as_str().into())
    }
}

/// Resolves a possibly-relative URL reference against a base document, into a
/// [`CanonicalUrl`].
///
/// Unresolvable URLs pass through unchanged and are treated as opaque cache
/// keys.
pub trait UrlResolver: Send + Sync + fmt::Debug {
    /// Returns whether this resolver can resolve the given reference.
    fn can_resolve(&self, reference: &str) -> bool;

    /// Resolves `reference` relative to `base` (the canonical URL of the
    /// importing document), or as an absolute reference if `base` is `None`.
    fn resolve(&self, base: Option<&CanonicalUrl>, reference: &str) -> CanonicalUrl;
}

/// Loads the bytes of a document by canonical URL.
///
/// Failures are reported as `Err`; the context treats any such failure as a
/// load error.
#[async_trait::async_trait]
pub trait Loader: Send + Sync + fmt::Debug {
    /// Returns whether this loader can load the given URL.
    fn can_load(&self, url: &CanonicalUrl) -> bool;

    /// Loads the bytes of the document at `url`.
    async fn load(&self, url: &CanonicalUrl) -> Result<Vec<u8>>;
}

/// A resolver that joins relative references against a base using the
/// standard `url` crate, falling back to treating unparsable references as
/// opaque keys.
#[derive(Debug, Default)]
pub struct StandardUrlResolver;

impl UrlResolver for StandardUrlResolver {
    fn can_resolve(&self, reference: &str) -> bool {
        Url::parse(reference).is_ok() || reference.starts_with('/') || reference.contains('.')
    }

    fn resolve(&self, base: Option<&CanonicalUrl>, reference: &str) -> CanonicalUrl {
        if let Ok(absolute) = Url::parse(reference) {
            return absolute.into();
        }

        match base.and_then(|b| Url::parse(b.as_str()).ok()) {
            Some(base_url) => match base_url.join(reference) {
                Ok(joined) => joined.into(),
                Err(_) => CanonicalUrl::from_canonical(reference.to_string()),
            },
            None => CanonicalUrl::from_canonical(reference.to_string()),
        }
    }
}

/// An in-memory loader over a fixed map of canonical URL to source text, used
/// by tests and by embedders that have already materialized a document set.
#[derive(Debug, Default, Clone)]
pub struct InMemoryLoader {
    documents: Arc<HashMap<CanonicalUrl, Vec<u8>>>,
}

impl InMemoryLoader {
    /// Builds a loader from an iterator of `(url, source)` pairs.
    pub fn new(documents: impl IntoIterator<Item = (CanonicalUrl, String)>) -> Self {
        Self {
            documents: Arc::new(
                documents
                    .into_iter()
                    .map(|(url, source)| (url, source.into_bytes()))
                    .collect(),
            ),
        }
    }
}

#[async_trait::async_trait]
impl Loader for InMemoryLoader {
    fn can_load(&self, url: &CanonicalUrl) -> bool {
        self.documents.contains_key(url)
    }

    async fn load(&self, url: &CanonicalUrl) -> Result<Vec<u8>> {
        self.documents
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no document registered for `{url}`"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_a_relative_reference_against_a_base() {
        let base = CanonicalUrl::from_canonical("file:///pkg/elements/my-element.js");
        let resolved = StandardUrlResolver.resolve(Some(&base), "../behaviors/simple.js");
        assert_eq!(resolved.as_str(), "file:///pkg/behaviors/simple.js");
    }

    #[test]
    fn an_absolute_reference_ignores_the_base() {
        let base = CanonicalUrl::from_canonical("file:///pkg/elements/my-element.js");
        let resolved = StandardUrlResolver.resolve(Some(&base), "https://example.com/x.js");
        assert_eq!(resolved.as_str(), "https://example.com/x.js");
    }

    #[test]
    fn an_unresolvable_reference_passes_through_as_an_opaque_key() {
        let resolved = StandardUrlResolver.resolve(None, "not a url at all");
        assert_eq!(resolved.as_str(), "not a url at all");
    }

    #[tokio::test]
    async fn in_memory_loader_reports_registered_documents_only() {
        let loader = InMemoryLoader::new([(CanonicalUrl::from_canonical("file:///a.js"), "content".to_string())]);
        let known = CanonicalUrl::from_canonical("file:///a.js");
        let unknown = CanonicalUrl::from_canonical("file:///missing.js");

        assert!(loader.can_load(&known));
        assert!(!loader.can_load(&unknown));
        assert_eq!(loader.load(&known).await.unwrap(), b"content");
        assert!(loader.load(&unknown).await.is_err());
    }
}
