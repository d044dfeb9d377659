//! The scanned and resolved document shapes.
//!
//! A [`ScannedDocument`] is the output of the scanner pipeline: a flat list
//! of [`ScannedFeature`]s plus whatever warnings scanning raised, still
//! scoped to its own document and unaware of imports. A [`Document`] is what
//! the Feature Resolver produces from one: features grouped by kind,
//! inheritance flattened, and `imports` linked to sibling `Document`s in the
//! same snapshot.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::feature::{FeatureKind, ScannedFeature};
use crate::parser::ParsedDocument;
use crate::url::CanonicalUrl;
use crate::warning::Warning;

/// The `{line, col, filename}` a document's ranges should be read relative
/// to when it is an inline sub-document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationOffset {
    /// Zero-based line of the inline block's start within its outer file.
    pub line: u32,
    /// Zero-based column of the inline block's start within its line.
    pub col: u32,
    /// The outer document's URL.
    pub filename: CanonicalUrl,
}

/// A document after scanning, but before cross-document resolution.
#[derive(Debug, Clone)]
pub struct ScannedDocument {
    /// The document's canonical URL.
    pub url: CanonicalUrl,
    /// The parsed document this was scanned from.
    pub parsed_doc: Arc<ParsedDocument>,
    /// Every feature emitted while scanning this document, including those
    /// contributed by nested inline sub-documents, in scan order.
    pub features: Vec<ScannedFeature>,
    /// Warnings raised while scanning (not loading or parsing).
    pub warnings: Vec<Warning>,
    /// `true` if this document is itself an inline sub-document of another.
    pub is_inline: bool,
    /// Set when `is_inline`: where this document's ranges map back to in the
    /// outer file.
    pub location_offset: Option<LocationOffset>,
}

impl ScannedDocument {
    /// Iterates features of a given kind.
    pub fn features_of_kind(&self, kind: FeatureKind) -> impl Iterator<Item = &ScannedFeature> {
        self.features.iter().filter(move |f| f.kind() == kind)
    }
}

/// A resolved document: scanned features grouped by kind, with inheritance
/// flattened. Created exactly once per (snapshot, URL) pair.
#[derive(Debug, Clone)]
pub struct Document {
    /// The scanned document this was resolved from.
    pub scanned_doc: Arc<ScannedDocument>,
    /// Resolved features, grouped by kind, insertion-ordered within each
    /// kind.
    pub features_by_kind: IndexMap<FeatureKind, Vec<ScannedFeature>>,
    /// Directly imported documents, resolved. Feature queries traverse this
    /// to honor `imported=true`.
    pub imports: Vec<Arc<Document>>,
}

impl Document {
    /// The document's canonical URL.
    pub fn url(&self) -> &CanonicalUrl {
        &self.scanned_doc.url
    }

    /// Returns every own feature of the given kind.
    pub fn features_of_kind(&self, kind: FeatureKind) -> impl Iterator<Item = &ScannedFeature> {
        self.features_by_kind
            .get(&kind)
            .into_iter()
            .flat_map(|v| v.iter())
    }

    /// Returns the own feature with the given kind and id, if present.
    pub fn feature(&self, kind: FeatureKind, id: &str) -> Option<&ScannedFeature> {
        self.features_of_kind(kind).find(|f| f.id() == Some(id))
    }

    /// Returns features of the given kind from this document's imported
    /// closure (`imported=true`), including this document's own.
    ///
    /// `external_packages` controls whether imports crossing a package
    /// boundary (an absolute URL with a different origin) are still
    /// traversed; this crate treats every canonical URL uniformly and always
    /// traverses, matching `external_packages=true` semantics, since package
    /// boundary classification belongs to the URL resolver, an external
    /// collaborator.
    pub fn features_of_kind_transitive(&self, kind: FeatureKind) -> Vec<ScannedFeature> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(doc) = stack.pop() {
            if !seen.insert(doc.url().clone()) {
                continue;
            }
            out.extend(doc.features_of_kind(kind).cloned());
            stack.extend(doc.imports.iter().map(|d| d.as_ref()));
        }
        out
    }
}
