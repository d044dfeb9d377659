//! The Scanner Pipeline: per-document-type visitors that emit
//! [`ScannedFeature`]s from a [`ParsedDocument`]'s AST.
//!
//! Scanning is purely AST-driven — no I/O, no imports followed. The
//! orchestration here (`scan_document`) also handles the recursive inline
//! sub-document walk: an emitted [`crate::feature::InlineDocumentFeature`] is
//! itself parsed and scanned with its own type's scanner set, and its
//! features are concatenated into the parent's flat feature list.

pub mod markup;
pub mod script;

use std::collections::HashMap;
use std::sync::Arc;

use crate::ast::DocumentType;
use crate::document::{LocationOffset, ScannedDocument};
use crate::feature::{FeatureKind, ScannedFeature};
use crate::parser::{InlineInfo, ParsedDocument, ParserRegistry};
use crate::url::CanonicalUrl;
use crate::warning::{Warning, WarningKind};

/// A single scanner: recognizes one family of declarations in one document
/// type's AST.
///
/// Scanners do not mutate the AST and do not perform I/O; a scanner may only
/// read the document handed to it.
pub trait Scanner: Send + Sync + std::fmt::Debug {
    /// Emits the features this scanner recognizes in `document`, in the
    /// order they appear in source. `default_private` is the
    /// [`crate::config::Config`]'s privacy fallback, threaded through for
    /// [`crate::privacy::get_or_infer_privacy`].
    fn scan(&self, document: &ParsedDocument, default_private: bool) -> Vec<ScannedFeature>;
}

/// Scanners registered per document type, run in registration order.
#[derive(Clone, Debug, Default)]
pub struct ScannerRegistry {
    scanners: HashMap<DocumentType, Vec<Arc<dyn Scanner>>>,
}

impl ScannerRegistry {
    /// Constructs an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a scanner to the end of `doc_type`'s registration order.
    pub fn register(&mut self, doc_type: DocumentType, scanner: Arc<dyn Scanner>) -> &mut Self {
        self.scanners.entry(doc_type).or_default().push(scanner);
        self
    }

    /// Returns the scanners registered for `doc_type`, in registration
    /// order.
    pub fn scanners_for(&self, doc_type: DocumentType) -> &[Arc<dyn Scanner>] {
        self.scanners.get(&doc_type).map_or(&[], |v| v.as_slice())
    }

    /// Builds a registry wired up with this crate's default scanners, one
    /// set per recognized document type.
    pub fn with_default_scanners() -> Self {
        let mut registry = Self::new();
        registry
            .register(DocumentType::Markup, Arc::new(markup::ImportScanner))
            .register(DocumentType::Markup, Arc::new(markup::InlineDocumentScanner))
            .register(DocumentType::Markup, Arc::new(markup::ElementReferenceScanner))
            .register(DocumentType::Markup, Arc::new(markup::SlotScanner));
        registry
            .register(DocumentType::Script, Arc::new(script::ClassScanner))
            .register(DocumentType::Script, Arc::new(script::MixinScanner))
            .register(DocumentType::Script, Arc::new(script::BehaviorScanner))
            .register(DocumentType::Script, Arc::new(script::FunctionScanner))
            .register(DocumentType::Script, Arc::new(script::NamespaceScanner));
        registry
    }
}

/// Scans a parsed document into a [`ScannedDocument`], recursing into inline
/// sub-documents.
///
/// `location_offset` is `Some` exactly when `parsed` is itself an inline
/// sub-document being scanned as part of its outer document's scan.
pub fn scan_document(
    parsed: Arc<ParsedDocument>,
    scanners: &ScannerRegistry,
    parsers: &ParserRegistry,
    location_offset: Option<LocationOffset>,
    default_private: bool,
) -> ScannedDocument {
    let doc_type = parsed.document_type();
    let mut features = Vec::new();
    for scanner in scanners.scanners_for(doc_type) {
        features.extend(scanner.scan(&parsed, default_private));
    }

    let mut warnings = Vec::new();
    let mut nested = Vec::new();
    for feature in &features {
        if let ScannedFeature::InlineDocument(inline) = feature {
            match scan_inline_document(inline, &parsed.url, scanners, parsers, default_private) {
                Ok(child) => {
                    warnings.extend(child.warnings);
                    nested.extend(child.features);
                }
                Err(warning) => warnings.push(warning),
            }
        }
    }
    features.extend(nested);

    ScannedDocument {
        url: parsed.url.clone(),
        parsed_doc: parsed,
        features,
        warnings,
        is_inline: location_offset.is_some(),
        location_offset,
    }
}

/// Parses and scans one `InlineDocumentFeature`'s source as a sub-document of
/// `outer_url`.
fn scan_inline_document(
    inline: &crate::feature::InlineDocumentFeature,
    outer_url: &CanonicalUrl,
    scanners: &ScannerRegistry,
    parsers: &ParserRegistry,
    default_private: bool,
) -> Result<ScannedDocument, Warning> {
    let doc_type = DocumentType::from_inline_doc_type(&inline.doc_type).ok_or_else(|| {
            Warning::new(
                WarningKind::UnableToAnalyze,
                outer_url.clone(),
                format!("no parser registered for inline document type `{}`", inline.doc_type),
            )
                .with_range(inline.range)
        })?;

    let parser = parsers.parser_for(doc_type).ok_or_else(|| {
            Warning::new(
                WarningKind::UnableToAnalyze,
                outer_url.clone(),
                format!("no parser registered for inline document type `{}`", inline.doc_type),
            )
                .with_range(inline.range)
        })?;

    let (line, col, filename) = &inline.location_offset;
    let inline_info = InlineInfo {
        line: *line,
        col: *col,
        filename: CanonicalUrl::from_canonical(filename.clone()),
    };

    let parsed = parser.parse(inline.source.as_bytes(), outer_url, Some(inline_info))?;

    let offset = LocationOffset {
        line: *line,
        col: *col,
        filename: CanonicalUrl::from_canonical(filename.clone()),
    };

    Ok(scan_document(
            Arc::new(parsed),
            scanners,
            parsers,
            Some(offset),
            default_private,
        ))
}

/// Shorthand used by scanners that need to re-check whether a set of already
/// emitted features already contains one of the given kind and id, used to
/// implement de-duplication tie-breaks (e.g. "the mixin path wins" over a
/// plain class).
pub(crate) fn contains(features: &[ScannedFeature], kind: FeatureKind, id: &str) -> bool {
    features.iter().any(|f| f.kind() == kind && f.id() == Some(id))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::parser::{MarkupParser, Parser, ScriptParser};

    fn url(s: &str) -> CanonicalUrl {
        CanonicalUrl::from_canonical(s)
    }

    #[test]
    fn with_default_scanners_registers_both_document_types_in_order() {
        let registry = ScannerRegistry::with_default_scanners();
        assert_eq!(registry.scanners_for(DocumentType::Markup).len(), 4);
        assert_eq!(registry.scanners_for(DocumentType::Script).len(), 5);
        assert!(registry.scanners_for(DocumentType::Style).is_empty());
    }

    #[test]
    fn scanning_a_markup_document_recurses_into_its_inline_script() {
        let parsers = ParserRegistry::with_default_parsers();
        let scanners = ScannerRegistry::with_default_scanners();

        let source = br#"<dom-module id="my-element">
 <script>
 /** @polymerMixin */
 const InlineMixin = (base) => class extends base {};
 </script>
</dom-module>"#;
        let parsed = MarkupParser.parse(source, &url("file:///a.html"), None).unwrap();

        let scanned = scan_document(Arc::new(parsed), &scanners, &parsers, None, false);

        assert!(
            scanned.features_of_kind(FeatureKind::Mixin).any(|f| f.id() == Some("InlineMixin")),
            "the inline script's mixin must surface on the outer document's feature list"
        );
        assert!(!scanned.is_inline);
    }

    #[test]
    fn an_inline_document_of_an_unrecognized_type_yields_a_warning_not_a_panic() {
        let parsers = ParserRegistry::with_default_parsers();
        let scanners = ScannerRegistry::with_default_scanners();
        let inline = crate::feature::InlineDocumentFeature {
            doc_type: "coffeescript".to_string(),
            source: String::new(),
            location_offset: (0, 0, "file:///a.html".to_string()),
            range: crate::warning::SourceRange::EMPTY,
        };

        let err = scan_inline_document(&inline, &url("file:///a.html"), &scanners, &parsers, false)
            .expect_err("unrecognized inline doc type is a warning, not a parser lookup panic");
        assert_eq!(err.kind, crate::warning::WarningKind::UnableToAnalyze);
    }

    #[test]
    fn a_standalone_script_is_not_marked_inline() {
        let parsers = ParserRegistry::with_default_parsers();
        let scanners = ScannerRegistry::with_default_scanners();
        let parsed = ScriptParser.parse(b"class Foo extends HTMLElement {}", &url("file:///a.js"), None).unwrap();
        let scanned = scan_document(Arc::new(parsed), &scanners, &parsers, None, false);
        assert!(!scanned.is_inline);
        assert!(scanned.location_offset.is_none());
    }
}
