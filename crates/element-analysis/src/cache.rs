//! The Analysis Cache: five snapshot-scoped, at-most-once-computed
//! promise tables.
//!
//! Built on `parking_lot`-guarded maps and cheap `Arc` snapshots, with
//! `futures::future::Shared` so `get_or_compute` gives pending-or-complete
//! promise semantics for free: concurrent callers racing the same key join
//! the same in-flight future rather than each starting their own.

use std::collections::HashMap;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::RwLock;

use crate::document::{Document, ScannedDocument};
use crate::graph::DependencyGraph;
use crate::parser::ParsedDocument;
use crate::url::CanonicalUrl;
use crate::warning::Warning;

/// A value produced for one URL, shared between every concurrent caller that
/// asked for it before it completed.
type Entry<V> = Shared<BoxFuture<'static, V>>;

/// One of the cache's five keyed tables: at-most-once memoized
/// computation per canonical URL, scoped to one snapshot.
pub struct PromiseTable<V: Clone + Send + Sync + 'static> {
    entries: RwLock<HashMap<CanonicalUrl, Entry<V>>>,
}

impl<V: Clone + Send + Sync + 'static> Default for PromiseTable<V> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<V: Clone + Send + Sync + 'static> PromiseTable<V> {
    /// Returns the pending-or-complete entry for `url`, computing it with
    /// `producer` if absent. `producer` runs at most once per
    /// (snapshot, URL): constructing the future does no work (futures are
    /// lazy), so inserting it under the write lock and awaiting it
    /// afterwards is race-free without holding the lock across the await.
    pub async fn get_or_compute<F, Fut>(&self, url: CanonicalUrl, producer: F) -> V
    where
    F: FnOnce() -> Fut,
    Fut: Future<Output = V> + Send + 'static,
    {
        let shared = {
            let mut entries = self.entries.write();
            entries
                .entry(url)
                .or_insert_with(|| producer().boxed().shared())
                .clone()
        };
        shared.await
    }

    /// Returns the entry for `url` if one has already been requested,
    /// without computing it.
    pub fn peek(&self, url: &CanonicalUrl) -> Option<Entry<V>> {
        self.entries.read().get(url).cloned()
    }

    /// Inserts an already-computed `value` for `url` if no entry exists yet,
    /// without running it through `producer`. At-most-once still
    /// applies: a concurrent `get_or_compute`/`insert_ready` race keeps
    /// whichever was first).
    pub fn insert_ready(&self, url: CanonicalUrl, value: V) {
        let mut entries = self.entries.write();
        entries
            .entry(url)
            .or_insert_with(|| futures::future::ready(value).boxed().shared());
    }

    /// Every URL this table has an entry for (kept in sync
    /// with the dependency graph's nodes).
    pub fn keys(&self) -> Vec<CanonicalUrl> {
        self.entries.read().keys().cloned().collect()
    }

    /// Builds a new table containing only the entries whose URL is not in
    /// `drop`, without touching `self`.
    fn fork_excluding(&self, drop: &HashSet<CanonicalUrl>) -> Self {
        let entries = self.entries.read();
        let kept = entries
            .iter()
            .filter(|(url, _)| !drop.contains(url))
            .map(|(url, entry)| (url.clone(), entry.clone()))
            .collect();
        Self {
            entries: RwLock::new(kept),
        }
    }
}

/// Parsing result, shared by the parsed and scanned promise tables.
pub type ParseResult = Result<Arc<ParsedDocument>, Warning>;
/// Scanning result (local or transitive).
pub type ScanResult = Result<Arc<ScannedDocument>, Warning>;
/// Resolution result.
pub type ResolveResult = Result<Arc<Document>, Warning>;

/// The snapshot-scoped promise tables (parsed, scanned-local,
/// scanned-transitive, resolved), plus the `failed_docs` terminal-warning
/// record.
#[derive(Default)]
pub struct AnalysisCache {
    /// Parsed documents, keyed by canonical URL.
    pub parsed: PromiseTable<ParseResult>,
    /// Locally scanned documents (no imports followed).
    pub scanned_local: PromiseTable<ScanResult>,
    /// Transitively scanned documents (imports scheduled).
    pub scanned_transitive: PromiseTable<ScanResult>,
    /// Resolved documents.
    pub resolved: PromiseTable<ResolveResult>,
    /// Terminal warnings for URLs that failed outright, surfaced by
    /// `get_document`.
    failed: RwLock<HashMap<CanonicalUrl, Warning>>,
}

impl AnalysisCache {
    /// Constructs an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `url` as terminally failed.
    pub fn record_failure(&self, url: CanonicalUrl, warning: Warning) {
        self.failed.write().insert(url, warning);
    }

    /// Returns `url`'s terminal failure, if recorded.
    pub fn failure(&self, url: &CanonicalUrl) -> Option<Warning> {
        self.failed.read().get(url).cloned()
    }

    /// Builds a new cache with every entry whose URL is in the
    /// reverse-transitive closure of `urls` (computed against `graph`)
    /// dropped, leaving `self` untouched.
    pub fn invalidate(&self, urls: &[CanonicalUrl], graph: &DependencyGraph) -> Self {
        let closure = graph.invalidate(urls);
        tracing::debug!(dropped = closure.len(), "invalidating cache entries");
        let failed = self
            .failed
            .read()
            .iter()
            .filter(|(url, _)| !closure.contains(*url))
            .map(|(url, warning)| (url.clone(), warning.clone()))
            .collect();

        Self {
            parsed: self.parsed.fork_excluding(&closure),
            scanned_local: self.scanned_local.fork_excluding(&closure),
            scanned_transitive: self.scanned_transitive.fork_excluding(&closure),
            resolved: self.resolved.fork_excluding(&closure),
            failed: RwLock::new(failed),
        }
    }

    /// Builds a new, entirely empty cache.
    pub fn cleared() -> Self {
        Self::default()
    }
}
