//! The Analysis Context: the engine's public entry point, owning the
//! cache, the dependency graph, and the registries a concrete embedder wires
//! up (parsers, scanners, loader, resolver).
//!
//! Fork-on-write snapshot model: every mutating-looking operation (`analyze`,
//! `files_changed`, `clear_caches`) returns a *new* [`AnalysisContext`]
//! sharing an `Arc`-backed cache and graph with its parent until something
//! actually diverges, rather than mutating `self` in place.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::cache::AnalysisCache;
use crate::config::Config;
use crate::document::Document;
use crate::error::{AnalyzeOutcome, AnalyzeResult, Cancelled, ContextError};
use crate::feature::{FeatureKind, ScannedFeature};
use crate::graph::DependencyGraph;
use crate::parser::{ParsedDocument, ParserRegistry};
use crate::scanner::{self, ScannerRegistry};
use crate::url::{CanonicalUrl, Loader, UrlResolver};
use crate::warning::{Warning, WarningKind};

/// The in-flight completion handle a context's `in_flight` slot holds: its
/// value is discarded by everyone except the caller that started it, since
/// its only purpose is serializing concurrent `analyze` calls for cache-hit
/// optimization, not correctness.
type InFlight = Shared<BoxFuture<'static, Result<(), Arc<ContextError>>>>;

struct ContextInner {
    generation: u64,
    config: Config,
    parsers: Arc<ParserRegistry>,
    scanners: Arc<ScannerRegistry>,
    loader: Arc<dyn Loader>,
    resolver: Arc<dyn UrlResolver>,
    graph: Arc<DependencyGraph>,
    cache: Arc<AnalysisCache>,
    in_flight: Mutex<Option<InFlight>>,
}

/// The engine's public entry point. Cheaply cloneable: clones share
/// the same `Arc<ContextInner>`, so every clone of a given snapshot observes
/// the same cache and graph.
#[derive(Clone)]
pub struct AnalysisContext {
    inner: Arc<ContextInner>,
}

impl std::fmt::Debug for AnalysisContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisContext")
            .field("generation", &self.inner.generation)
            .finish()
    }
}

impl AnalysisContext {
    /// Constructs a root context with an empty cache and graph.
    pub fn new(
        config: Config,
        parsers: ParserRegistry,
        scanners: ScannerRegistry,
        loader: Arc<dyn Loader>,
        resolver: Arc<dyn UrlResolver>,
    ) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                    generation: 0,
                    config,
                    parsers: Arc::new(parsers),
                    scanners: Arc::new(scanners),
                    loader,
                    resolver,
                    graph: Arc::new(DependencyGraph::new()),
                    cache: Arc::new(AnalysisCache::new()),
                    in_flight: Mutex::new(None),
                }),
        }
    }

    /// Constructs a root context wired up with this crate's default parsers
    /// and scanners.
    pub fn with_defaults(config: Config, loader: Arc<dyn Loader>, resolver: Arc<dyn UrlResolver>) -> Self {
        Self::new(
            config,
            ParserRegistry::with_default_parsers(),
            ScannerRegistry::with_default_scanners(),
            loader,
            resolver,
        )
    }

    /// Resolves `reference` as a top-level URL (no base document).
    pub fn resolve_url(&self, reference: &str) -> CanonicalUrl {
        self.inner.resolver.resolve(None, reference)
    }

    /// Whether this context's resolver can resolve `reference`.
    pub fn can_resolve(&self, reference: &str) -> bool {
        self.inner.resolver.can_resolve(reference)
    }

    /// Whether this context's loader can load `url`.
    pub fn can_load(&self, url: &CanonicalUrl) -> bool {
        self.inner.loader.can_load(url)
    }

    /// Forks sharing the same cache and graph (used by `analyze`, which
    /// never invalidates anything itself -- an empty-invalidation fork).
    fn fork_shared(&self) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                    generation: self.inner.generation + 1,
                    config: self.inner.config.clone(),
                    parsers: self.inner.parsers.clone(),
                    scanners: self.inner.scanners.clone(),
                    loader: self.inner.loader.clone(),
                    resolver: self.inner.resolver.clone(),
                    graph: self.inner.graph.clone(),
                    cache: self.inner.cache.clone(),
                    in_flight: Mutex::new(None),
                }),
        }
    }

    /// Invalidates `urls` (and everything importing them, transitively):
    /// forks into a new context with a copy-on-write cache and a fresh graph,
    /// leaving `self`'s cache and graph untouched.
    pub fn files_changed(&self, urls: impl IntoIterator<Item = CanonicalUrl>) -> Self {
        let urls: Vec<CanonicalUrl> = urls.into_iter().collect();
        tracing::info!(count = urls.len(), generation = self.inner.generation, "invalidating files");
        let cache = Arc::new(self.inner.cache.invalidate(&urls, &self.inner.graph));
        Self {
            inner: Arc::new(ContextInner {
                    generation: self.inner.generation + 1,
                    config: self.inner.config.clone(),
                    parsers: self.inner.parsers.clone(),
                    scanners: self.inner.scanners.clone(),
                    loader: self.inner.loader.clone(),
                    resolver: self.inner.resolver.clone(),
                    graph: Arc::new(DependencyGraph::new()),
                    cache,
                    in_flight: Mutex::new(None),
                }),
        }
    }

    /// Discards every cached result, keeping configuration and registries.
    pub fn clear_caches(&self) -> Self {
        tracing::info!(generation = self.inner.generation, "clearing all caches");
        Self {
            inner: Arc::new(ContextInner {
                    generation: self.inner.generation + 1,
                    config: self.inner.config.clone(),
                    parsers: self.inner.parsers.clone(),
                    scanners: self.inner.scanners.clone(),
                    loader: self.inner.loader.clone(),
                    resolver: self.inner.resolver.clone(),
                    graph: Arc::new(DependencyGraph::new()),
                    cache: Arc::new(AnalysisCache::cleared()),
                    in_flight: Mutex::new(None),
                }),
        }
    }

    /// Analyzes `urls`, scanning and resolving whatever is not already
    /// cached. Returns the new snapshot with those URLs' documents
    /// available via [`AnalysisContext::get_document`].
    ///
    /// `cancel`, if given, is a cooperative cancellation handle: once
    /// triggered, the returned future resolves to
    /// [`AnalyzeOutcome::Cancelled`] rather than waiting for the analysis to
    /// finish. The analysis itself keeps running to completion in the
    /// background so its results remain available to any other holder of the
    /// same in-flight handle.
    pub async fn analyze(
        &self,
        urls: impl IntoIterator<Item = CanonicalUrl>,
        cancel: Option<CancellationToken>,
    ) -> AnalyzeResult<Self> {
        let urls: Vec<CanonicalUrl> = urls.into_iter().collect();
        let span = tracing::info_span!("analyze", count = urls.len(), generation = self.inner.generation);
        use tracing::Instrument as _;
        self.analyze_inner(urls, cancel).instrument(span).await
    }

    async fn analyze_inner(
        &self,
        urls: Vec<CanonicalUrl>,
        cancel: Option<CancellationToken>,
    ) -> AnalyzeResult<Self> {
        tracing::info!("starting analysis");

        // Step 1: await the prior in-flight analysis on this context handle.
        // Purely an optimization -- if it races with this call racing
        // directly against the same cache, there is nothing incorrect about
        // skipping it, only missed cache reuse.
        let prior = self.inner.in_flight.lock().clone();
        if let Some(prior) = prior {
            let _ = prior.await;
        }

        // Step 3: already-cached shortcut.
        if urls.iter().all(|u| self.inner.cache.resolved.peek(u).is_some()) {
            for url in &urls {
                if let Some(entry) = self.inner.cache.resolved.peek(url) {
                    let _ = entry.await;
                }
            }
            tracing::debug!("all requested urls already resolved, skipping analysis");
            return Ok(self.clone());
        }

        // Step 4: fork with empty invalidation, then run the analysis on the
        // fork.
        let fork = self.fork_shared();
        let work_ctx = fork.clone();
        let work_urls = urls.clone();
        let work: BoxFuture<'static, Result<(), Arc<ContextError>>> =
        async move { work_ctx.run_analysis(work_urls).await }.boxed();
        let shared: InFlight = work.shared();
        *fork.inner.in_flight.lock() = Some(shared.clone());

        let result = match cancel {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        tracing::debug!("analysis cancelled");
                        return Err(AnalyzeOutcome::Cancelled(Cancelled));
                    }
                    r = shared.clone() => r,
                }
            }
            None => shared.await,
        };

        match result {
            Ok(()) => {
                tracing::info!("analysis complete");
                Ok(fork)
            }
            Err(e) => Err(AnalyzeOutcome::Failed(ContextError::Other(anyhow::anyhow!(
                            "{e}"
                        )))),
        }
    }

    /// Runs the actual analysis: concurrently scans each requested URL
    /// transitively, then resolves it, recording a terminal failure for
    /// anything that could not be scanned or resolved rather than failing
    /// the whole batch.
    async fn run_analysis(&self, urls: Vec<CanonicalUrl>) -> Result<(), Arc<ContextError>> {
        let outcomes = futures::future::join_all(urls.into_iter().map(|url| {
                    let ctx = self.clone();
                    async move {
                        let result = ctx.scan_transitive(url.clone()).await;
                        (url, result)
                    }
                }))
            .await;

        for (url, result) in outcomes {
            match result {
                Ok(_) => {
                    if let Err(warning) = self.get_document(&url).await {
                        self.inner.cache.record_failure(url, warning);
                    }
                }
                Err(warning) => self.inner.cache.record_failure(url, warning),
            }
        }

        Ok(())
    }

    /// Parses `url`, memoized in the `parsed` table.
    async fn parse(&self, url: CanonicalUrl) -> Result<Arc<ParsedDocument>, Warning> {
        let ctx = self.clone();
        self.inner
            .cache
            .parsed
            .get_or_compute(url.clone(), move || async move { ctx.parse_producer(url).await })
            .await
    }

    async fn parse_producer(&self, url: CanonicalUrl) -> Result<Arc<ParsedDocument>, Warning> {
        let bytes = self
            .inner
            .loader
            .load(&url)
            .await
            .map_err(|e| Warning::new(WarningKind::UnableToLoad, url.clone(), format!("{e:#}")))?;

        let doc_type = crate::ast::DocumentType::from_extension(extension_of(url.as_str()))
            .ok_or_else(|| {
                Warning::new(
                    WarningKind::ParseFailure,
                    url.clone(),
                    "no recognized document type for this URL",
                )
            })?;

        let parser = self.inner.parsers.parser_for(doc_type).ok_or_else(|| {
                Warning::new(
                    WarningKind::ParseFailure,
                    url.clone(),
                    format!("no parser registered for `{doc_type:?}`"),
                )
            })?;

        let parsed = parser.parse(&bytes, &url, None)?;
        Ok(Arc::new(parsed))
    }

    /// Scans `url` locally -- no imports followed -- memoized in the
    /// `scanned_local` table.
    async fn scan_local(&self, url: CanonicalUrl) -> Result<Arc<crate::document::ScannedDocument>, Warning> {
        let ctx = self.clone();
        self.inner
            .cache
            .scanned_local
            .get_or_compute(url.clone(), move || async move { ctx.scan_local_producer(url).await })
            .await
    }

    async fn scan_local_producer(
        &self,
        url: CanonicalUrl,
    ) -> Result<Arc<crate::document::ScannedDocument>, Warning> {
        let parsed = self.parse(url).await?;
        let default_private = self.inner.config.default_private();
        let scanned = scanner::scan_document(parsed, &self.inner.scanners, &self.inner.parsers, None, default_private);
        Ok(Arc::new(scanned))
    }

    /// Scans `url` and schedules its imports, resolving once the transitive
    /// closure rooted at `url` is ready. Memoized in the `scanned_transitive`
    /// table.
    pub(crate) async fn scan_transitive(
        &self,
        url: CanonicalUrl,
    ) -> Result<Arc<crate::document::ScannedDocument>, Warning> {
        let ctx = self.clone();
        self.inner
            .cache
            .scanned_transitive
            .get_or_compute(url.clone(), move || async move { ctx.scan_transitive_producer(url).await })
            .await
    }

    async fn scan_transitive_producer(
        &self,
        url: CanonicalUrl,
    ) -> Result<Arc<crate::document::ScannedDocument>, Warning> {
        let span = tracing::debug_span!("scan_transitive", url = %url);
        use tracing::Instrument as _;
        self.scan_transitive_producer_inner(url).instrument(span).await
    }

    async fn scan_transitive_producer_inner(
        &self,
        url: CanonicalUrl,
    ) -> Result<Arc<crate::document::ScannedDocument>, Warning> {
        tracing::debug!("scanning transitively");
        let local = match self.scan_local(url.clone()).await {
            Ok(doc) => doc,
            Err(warning) => {
                tracing::debug!(%warning, "local scan failed, rejecting document");
                self.inner.graph.reject_document(&url, warning.clone());
                return Err(warning);
            }
        };

        let import_hrefs: Vec<String> = local
            .features_of_kind(FeatureKind::Import)
            .filter_map(|f| match f {
                ScannedFeature::Import(i) => Some(i.href.clone()),
                _ => None,
            })
            .collect();

        let resolved_imports: Vec<CanonicalUrl> = import_hrefs
            .iter()
            .map(|href| self.inner.resolver.resolve(Some(&url), href))
            .collect();

        let mut graph_imports = resolved_imports.clone();
        for lazy in self.inner.config.lazy_edges_for(&url) {
            if !graph_imports.contains(lazy) {
                graph_imports.push(lazy.clone());
            }
        }

        // The node's own readiness is published before its imports are
        // awaited, so cyclic imports terminate: an importer awaiting
        // this node back already sees it ready by the time the cycle closes.
        self.inner.graph.add_document(&url, &graph_imports);
        self.inner.graph.mark_ready(&url);

        let import_results: Vec<Result<Arc<crate::document::ScannedDocument>, Warning>> =
        futures::future::join_all(resolved_imports.iter().cloned().map(|import_url| {
                    let ctx = self.clone();
                    async move { ctx.scan_transitive(import_url).await }
                }))
            .await;

        self.inner.graph.when_ready(&url).await;

        // Attach each import's failure to its Import feature rather than
        // propagating it to this document's own caller.
        let mut features = (*local).features.clone();
        let mut results = import_results.into_iter();
        for feature in features.iter_mut() {
            if let ScannedFeature::Import(import) = feature {
                if let Some(Err(warning)) = results.next() {
                    import.warning = Some(warning);
                }
            }
        }

        Ok(Arc::new(crate::document::ScannedDocument {
                    features,
                    ..(*local).clone()
                }))
    }

    /// Returns `url`'s resolved [`Document`], scanning it transitively
    /// first if it has not been requested yet.
    pub async fn get_document(&self, url: &CanonicalUrl) -> Result<Arc<Document>, Warning> {
        if let Some(entry) = self.inner.cache.resolved.peek(url) {
            return entry.await;
        }

        let mut visiting = HashSet::new();
        self.resolve_document_inner(url.clone(), &mut visiting).await
    }

    /// Recursively resolves `url` and its imports, memoizing completed
    /// results directly into the `resolved` table.
    ///
    /// This deliberately does not go through
    /// [`crate::cache::PromiseTable::get_or_compute`] for the recursive
    /// calls: a cyclic import graph would otherwise have a document's
    /// resolution await a `Shared` future that is itself being driven by the
    /// very call currently polling it, which can never make progress.
    /// Instead, `visiting` breaks the cycle directly: a URL already being
    /// resolved higher up this call chain is treated as contributing no
    /// imports to its cyclic descendant (its own features are still used, so
    /// the cycle does not prevent analysis, only cross-document ancestor
    /// resolution *through* the cyclic edge, which becomes an unresolved
    /// reference instead).
    fn resolve_document_inner<'a>(
        &'a self,
        url: CanonicalUrl,
        visiting: &'a mut HashSet<CanonicalUrl>,
    ) -> BoxFuture<'a, Result<Arc<Document>, Warning>> {
        async move {
            if let Some(entry) = self.inner.cache.resolved.peek(&url) {
                return entry.await;
            }
            if let Some(failure) = self.inner.cache.failure(&url) {
                return Err(failure);
            }
            if !visiting.insert(url.clone()) {
                return Err(Warning::new(
                        WarningKind::UnableToAnalyze,
                        url.clone(),
                        "cyclic document reference",
                    ));
            }

            let scanned = self.scan_transitive(url.clone()).await;
            let result = match scanned {
                Ok(scanned) => {
                    let import_urls: Vec<CanonicalUrl> = scanned
                        .features_of_kind(FeatureKind::Import)
                        .filter_map(|f| match f {
                            ScannedFeature::Import(i) => {
                                Some(self.inner.resolver.resolve(Some(&url), &i.href))
                            }
                            _ => None,
                        })
                        .collect();

                    let mut imports = Vec::with_capacity(import_urls.len());
                    for import_url in import_urls {
                        if let Ok(doc) = self.resolve_document_inner(import_url, visiting).await {
                            imports.push(doc);
                        }
                    }

                    Ok(Arc::new(crate::resolver::resolve(scanned, imports)))
                }
                Err(warning) => Err(warning),
            };

            visiting.remove(&url);

            if let Ok(document) = &result {
                self.inner
                    .cache
                    .resolved
                    .insert_ready(url.clone(), Ok(document.clone()));
            }

            result
        }
            .boxed()
    }

    /// Resolves `url`'s document and emits its summary JSON,
    /// in one call -- the shape most embedders actually want, rather than
    /// making every caller chain [`AnalysisContext::get_document`] with
    /// [`crate::summary::emit`] themselves.
    pub async fn summarize(
        &self,
        url: &CanonicalUrl,
        package_root: &CanonicalUrl,
    ) -> Result<serde_json::Value, ContextError> {
        let document = self
            .get_document(url)
            .await
            .map_err(|warning| ContextError::Other(anyhow::Error::new(warning)))?;
        crate::summary::emit(&document, package_root).map_err(|e| ContextError::Other(e.into()))
    }
}

/// Returns the file extension of `url`'s last path segment (ignoring any
/// query or fragment), or the empty string if it has none.
fn extension_of(url: &str) -> &str {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    let file_name = without_query.rsplit(['/', '\\']).next().unwrap_or(without_query);
    match file_name.rfind('.') {
        Some(idx) => &file_name[idx + 1..],
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::url::{InMemoryLoader, StandardUrlResolver};

    fn context(documents: impl IntoIterator<Item = (&'static str, &'static str)>) -> AnalysisContext {
        let documents = documents
            .into_iter()
            .map(|(url, source)| (CanonicalUrl::from_canonical(url), source.to_string()));
        AnalysisContext::with_defaults(
            Config::new(),
            Arc::new(InMemoryLoader::new(documents)),
            Arc::new(StandardUrlResolver),
        )
    }

    #[tokio::test]
    async fn analyzes_a_single_document_with_no_imports() {
        let ctx = context([("file:///a.js", "class Foo extends HTMLElement {}")]);
        let url = CanonicalUrl::from_canonical("file:///a.js");
        let ctx = ctx.analyze([url.clone()], None).await.expect("analysis succeeds");
        let document = ctx.get_document(&url).await.expect("document resolves");
        assert!(document.find_own_class_like("Foo").is_some());
    }

    #[tokio::test]
    async fn a_root_load_failure_is_surfaced_as_a_failed_document() {
        let ctx = context([]);
        let url = CanonicalUrl::from_canonical("file:///missing.js");
        let ctx = ctx
            .analyze([url.clone()], None)
            .await
            .expect("analyze itself does not fail outright");
        let err = ctx.get_document(&url).await.expect_err("missing document fails");
        assert_eq!(err.kind, WarningKind::UnableToLoad);
    }

    #[tokio::test]
    async fn cyclic_imports_resolve_without_deadlocking() {
        let ctx = context([
                ("file:///a.js", "import './b.js';\nclass A extends HTMLElement {}"),
                ("file:///b.js", "import './a.js';\nclass B extends HTMLElement {}"),
            ]);
        let a = CanonicalUrl::from_canonical("file:///a.js");
        let ctx = ctx.analyze([a.clone()], None).await.expect("analysis succeeds");
        let document = ctx.get_document(&a).await.expect("document resolves despite the cycle");
        assert!(document.find_own_class_like("A").is_some());
    }

    #[tokio::test]
    async fn files_changed_leaves_the_parent_snapshot_untouched() {
        let ctx = context([("file:///a.js", "class Foo extends HTMLElement {}")]);
        let url = CanonicalUrl::from_canonical("file:///a.js");
        let ctx = ctx.analyze([url.clone()], None).await.expect("analysis succeeds");

        let forked = ctx.files_changed([url.clone()]);
        assert!(forked.inner.cache.resolved.peek(&url).is_none());
        assert!(ctx.inner.cache.resolved.peek(&url).is_some());
    }

    #[tokio::test]
    async fn cancelling_one_analyze_call_does_not_affect_a_concurrent_one() {
        let ctx = context([("file:///a.js", "class Foo extends HTMLElement {}")]);
        let url = CanonicalUrl::from_canonical("file:///a.js");

        let token = CancellationToken::new();
        token.cancel();

        let cancelled = ctx.analyze([url.clone()], Some(token)).await;
        assert!(matches!(cancelled, Err(AnalyzeOutcome::Cancelled(_))));

        let ok = ctx.analyze([url.clone()], None).await.expect("uncancelled call still succeeds");
        assert!(ok.get_document(&url).await.is_ok());
    }

    #[test]
    fn extension_of_strips_query_and_path() {
        assert_eq!(extension_of("file:///a/b/c.html?x=1"), "html");
        assert_eq!(extension_of("file:///a/b/c"), "");
    }
}
