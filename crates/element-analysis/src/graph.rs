//! The Dependency Graph: directed edges `file -> imported file`, with
//! cycle-tolerant readiness signaling and reverse-transitive invalidation.
//!
//! `petgraph`-backed node bookkeeping, keyed by [`CanonicalUrl`] rather than
//! a document id, with readiness tracked independently of graph structure
//! via a `tokio::sync::watch` flag per node rather than a oneshot, since
//! multiple independent observers need to await the same node without
//! consuming a one-shot receiver.

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;
use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableDiGraph;
use petgraph::Direction;
use tokio::sync::watch;

use crate::url::CanonicalUrl;
use crate::warning::Warning;

/// Whether a node's transitive readiness resolved to success or carries a
/// terminal warning.
#[derive(Debug, Clone)]
pub enum Readiness {
    /// The node and everything it depends on finished scanning.
    Ready,
    /// The node itself failed (e.g. its parse failed). Its importers still
    /// become ready ("A node's failure does not fail its importers'
    /// readiness").
    Failed(Warning),
}

/// One node's bookkeeping: its outgoing imports and its own ready/failed
/// state, observable via a `watch` channel so any number of callers can await
/// it without racing each other.
struct Node {
    url: CanonicalUrl,
    imports: Vec<CanonicalUrl>,
    state: watch::Sender<Option<Readiness>>,
}

/// The dependency graph: a directed multigraph over canonical
/// URLs. Shared via `Arc` by every fork that has not yet diverged (forks
/// that invalidate get their own graph -- see
/// [`crate::cache::AnalysisCache::invalidate`]).
#[derive(Default)]
pub struct DependencyGraph {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    graph: StableDiGraph<Node, ()>,
    index_of: HashMap<CanonicalUrl, NodeIndex>,
}

impl std::fmt::Debug for DependencyGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("DependencyGraph")
            .field("nodes", &inner.graph.node_count())
            .finish()
    }
}

impl DependencyGraph {
    /// Constructs an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `url`'s outgoing imports. Each import not yet present gets an
    /// unresolved placeholder node so edges can be added before the import
    /// itself is scanned ("schedules imports before awaiting them").
    pub fn add_document(&self, url: &CanonicalUrl, imports: &[CanonicalUrl]) {
        let mut inner = self.inner.write();
        let node_index = Self::index_for(&mut inner, url);
        inner.graph[node_index].imports = imports.to_vec();

        for import in imports {
            let import_index = Self::index_for(&mut inner, import);
            inner.graph.update_edge(node_index, import_index, ());
        }
    }

    /// Marks `url` ready, notifying any observer.
    pub fn mark_ready(&self, url: &CanonicalUrl) {
        let inner = self.inner.read();
        if let Some(&index) = inner.index_of.get(url) {
            tracing::debug!(%url, "node ready");
            inner.graph[index].state.send_replace(Some(Readiness::Ready));
        }
    }

    /// Marks `url` failed with `warning`. Readiness propagates to observers,
    /// but this does not fail `url`'s importers.
    pub fn reject_document(&self, url: &CanonicalUrl, warning: Warning) {
        let inner = self.inner.read();
        if let Some(&index) = inner.index_of.get(url) {
            tracing::debug!(%url, %warning, "node rejected");
            inner.graph[index]
                .state
                .send_replace(Some(Readiness::Failed(warning)));
        }
    }

    /// Resolves once the transitive closure rooted at `url` has completed
    ///. Cycles terminate by treating already-visited nodes as ready
    /// without re-awaiting them.
    pub async fn when_ready(&self, url: &CanonicalUrl) {
        let mut visited = HashSet::new();
        self.when_ready_inner(url, &mut visited).await;
    }

    fn when_ready_inner<'a>(
        &'a self,
        url: &'a CanonicalUrl,
        visited: &'a mut HashSet<CanonicalUrl>,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
                if !visited.insert(url.clone()) {
                    return;
                }

                let (mut receiver, imports) = {
                    let inner = self.inner.read();
                    let Some(&index) = inner.index_of.get(url) else {
                        return;
                    };
                    (inner.graph[index].state.subscribe(), inner.graph[index].imports.clone())
                };

                while receiver.borrow().is_none() {
                    if receiver.changed().await.is_err() {
                        return;
                    }
                }

                for import in &imports {
                    self.when_ready_inner(import, visited).await;
                }
            })
    }

    /// Returns the reverse-transitive closure of `urls`: every URL reachable
    /// by walking *importer* edges backward from any of `urls`, `urls`
    /// themselves included.
    pub fn invalidate(&self, urls: &[CanonicalUrl]) -> HashSet<CanonicalUrl> {
        let inner = self.inner.read();
        let mut closure = HashSet::new();
        let mut stack: Vec<NodeIndex> = urls
            .iter()
            .filter_map(|u| inner.index_of.get(u).copied())
            .collect();

        for url in urls {
            closure.insert(url.clone());
        }

        while let Some(index) = stack.pop() {
            for importer in inner.graph.neighbors_directed(index, Direction::Incoming) {
                let url = inner.graph[importer].url.clone();
                if closure.insert(url) {
                    stack.push(importer);
                }
            }
        }

        tracing::debug!(requested = urls.len(), closure = closure.len(), "computed invalidation closure");
        closure
    }

    /// Returns `url`'s recorded outgoing imports, if the node exists.
    pub fn imports_of(&self, url: &CanonicalUrl) -> Vec<CanonicalUrl> {
        let inner = self.inner.read();
        inner
            .index_of
            .get(url)
            .map(|&index| inner.graph[index].imports.clone())
            .unwrap_or_default()
    }

    /// Every URL this graph has a node for.
    pub fn nodes(&self) -> Vec<CanonicalUrl> {
        let inner = self.inner.read();
        inner.index_of.keys().cloned().collect()
    }

    fn index_for(inner: &mut Inner, url: &CanonicalUrl) -> NodeIndex {
        if let Some(&index) = inner.index_of.get(url) {
            return index;
        }
        let (sender, _) = watch::channel(None);
        let index = inner.graph.add_node(Node {
                url: url.clone(),
                imports: Vec::new(),
                state: sender,
            });
        inner.index_of.insert(url.clone(), index);
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warning::{SourceRange, WarningKind};

    fn url(s: &str) -> CanonicalUrl {
        CanonicalUrl::from_canonical(s)
    }

    #[tokio::test]
    async fn when_ready_waits_for_the_whole_transitive_closure() {
        let graph = DependencyGraph::new();
        let (a, b, c) = (url("file:///a.js"), url("file:///b.js"), url("file:///c.js"));
        graph.add_document(&a, &[b.clone()]);
        graph.add_document(&b, &[c.clone()]);
        graph.add_document(&c, &[]);

        let waiter = {
            let graph = &graph;
            let a = a.clone();
            async move { graph.when_ready(&a).await }
        };

        graph.mark_ready(&c);
        graph.mark_ready(&b);
        graph.mark_ready(&a);

        waiter.await;
    }

    #[tokio::test]
    async fn when_ready_terminates_on_a_dependency_cycle() {
        let graph = DependencyGraph::new();
        let (a, b) = (url("file:///a.js"), url("file:///b.js"));
        graph.add_document(&a, &[b.clone()]);
        graph.add_document(&b, &[a.clone()]);

        graph.mark_ready(&a);
        graph.mark_ready(&b);

        // Must return at all: a naive recursive walk over a cycle without
        // the `visited` guard would recurse forever here.
        graph.when_ready(&a).await;
    }

    #[tokio::test]
    async fn a_failed_import_does_not_block_its_importer() {
        let graph = DependencyGraph::new();
        let (a, b) = (url("file:///a.js"), url("file:///b.js"));
        graph.add_document(&a, &[b.clone()]);
        graph.add_document(&b, &[]);

        graph.reject_document(
            &b,
            Warning::new(WarningKind::UnableToLoad, b.clone(), "missing file").with_range(SourceRange::EMPTY),
        );
        graph.mark_ready(&a);

        graph.when_ready(&a).await;
    }

    #[test]
    fn invalidate_returns_the_reverse_transitive_closure() {
        let graph = DependencyGraph::new();
        let (a, b, c, unrelated) = (
            url("file:///a.js"),
            url("file:///b.js"),
            url("file:///c.js"),
            url("file:///unrelated.js"),
        );
        // a -> b -> c, and an unrelated node with no edges to any of them.
        graph.add_document(&a, &[b.clone()]);
        graph.add_document(&b, &[c.clone()]);
        graph.add_document(&unrelated, &[]);

        let closure = graph.invalidate(&[c.clone()]);

        assert!(closure.contains(&a));
        assert!(closure.contains(&b));
        assert!(closure.contains(&c));
        assert!(!closure.contains(&unrelated));
    }

    #[test]
    fn imports_of_reflects_the_last_add_document_call() {
        let graph = DependencyGraph::new();
        let (a, b, c) = (url("file:///a.js"), url("file:///b.js"), url("file:///c.js"));
        graph.add_document(&a, &[b.clone()]);
        assert_eq!(graph.imports_of(&a), vec![b.clone()]);

        graph.add_document(&a, &[c.clone()]);
        assert_eq!(graph.imports_of(&a), vec![c]);
    }
}
