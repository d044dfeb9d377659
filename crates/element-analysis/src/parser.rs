//! The Parser Registry: maps a document extension to a parser that
//! turns bytes into a [`ParsedDocument`].
//!
//! Concrete parsers are external collaborators — the engine only
//! depends on the [`Parser`] trait. This module nonetheless ships small real
//! parsers (a hand-rolled markup tree builder, an `swc`-backed script parser,
//! and pass-through style/JSON parsers) good enough to drive the scanner
//! pipeline end to end in tests and in embedders that have no parser of
//! their own yet.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context as _;
use swc_common::comments::SingleThreadedComments;
use swc_common::{FileName, SourceMap};
use swc_ecma_parser::lexer::Lexer;
use swc_ecma_parser::{EsSyntax, Parser as SwcParser, StringInput, Syntax};

use crate::ast::{DocumentAst, DocumentType, ScriptDocument};
use crate::markup;
use crate::url::CanonicalUrl;
use crate::warning::Warning;

/// The `{line, col, filename}` offset of an inline sub-document within its
/// enclosing outer document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineInfo {
    /// Zero-based line of the inline block's start within the outer file.
    pub line: u32,
    /// Zero-based column of the inline block's start within its line.
    pub col: u32,
    /// The outer document's URL, used as the `filename` downstream source
    /// ranges are rewritten against.
    pub filename: CanonicalUrl,
}

/// A parsed document: an AST plus enough bookkeeping to map nested source
/// ranges back to the original bytes.
///
/// Immutable after construction.
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    /// The document's canonical URL.
    pub url: CanonicalUrl,
    /// The parsed AST.
    pub ast: DocumentAst,
    /// The original source text.
    pub source_text: Arc<str>,
    /// Set when this parsed document is an inline sub-document.
    pub inline_info: Option<InlineInfo>,
}

impl ParsedDocument {
    /// Returns this document's recognized type.
    pub fn document_type(&self) -> DocumentType {
        self.ast.document_type()
    }
}

/// Parses bytes into a [`ParsedDocument`].
///
/// Parsers are pure: no caching, no I/O. A parser may fail with a
/// warning-carrying [`Warning`]; any other failure is the caller's
/// responsibility to wrap.
pub trait Parser: Send + Sync + std::fmt::Debug {
    /// Parses `bytes` from `url`, optionally as an inline sub-document.
    fn parse(
        &self,
        bytes: &[u8],
        url: &CanonicalUrl,
        inline_info: Option<InlineInfo>,
    ) -> Result<ParsedDocument, Warning>;
}

/// A registry mapping document type to the parser that handles it.
#[derive(Clone, Debug, Default)]
pub struct ParserRegistry {
    parsers: HashMap<DocumentType, Arc<dyn Parser>>,
}

impl ParserRegistry {
    /// Constructs an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the parser for a document type.
    pub fn register(&mut self, doc_type: DocumentType, parser: Arc<dyn Parser>) -> &mut Self {
        self.parsers.insert(doc_type, parser);
        self
    }

    /// Returns the parser registered for `doc_type`, if any.
    pub fn parser_for(&self, doc_type: DocumentType) -> Option<&Arc<dyn Parser>> {
        self.parsers.get(&doc_type)
    }

    /// Builds a registry wired up with this crate's default parsers for all
    /// four recognized document types.
    pub fn with_default_parsers() -> Self {
        let mut registry = Self::new();
        registry
            .register(DocumentType::Markup, Arc::new(MarkupParser))
            .register(DocumentType::Script, Arc::new(ScriptParser))
            .register(DocumentType::Style, Arc::new(StyleParser))
            .register(DocumentType::Json, Arc::new(JsonParser));
        registry
    }
}

/// A small, tolerant markup parser.
///
/// Not a full HTML5 parser, which remains an external collaborator: it
/// recognizes void/normal elements, attributes, and `<script>`/`<style>`
/// bodies, which is what the markup scanners need.
#[derive(Debug, Default)]
pub struct MarkupParser;

impl Parser for MarkupParser {
    fn parse(
        &self,
        bytes: &[u8],
        url: &CanonicalUrl,
        inline_info: Option<InlineInfo>,
    ) -> Result<ParsedDocument, Warning> {
        let source_text = String::from_utf8_lossy(bytes).into_owned();
        let document = markup::parse(&source_text)
            .map_err(|e| Warning::wrap_parse_error(url.clone(), &e))?;

        Ok(ParsedDocument {
                url: url.clone(),
                ast: DocumentAst::Markup(Arc::new(document)),
                source_text: source_text.into(),
                inline_info,
            })
    }
}

/// An `swc`-backed ECMAScript module parser (enriched from the retrieval
/// pack's `swc_ecma_parser` usage).
#[derive(Debug, Default)]
pub struct ScriptParser;

impl Parser for ScriptParser {
    fn parse(
        &self,
        bytes: &[u8],
        url: &CanonicalUrl,
        inline_info: Option<InlineInfo>,
    ) -> Result<ParsedDocument, Warning> {
        let source_text = String::from_utf8_lossy(bytes).into_owned();
        let document = parse_script_source(&source_text, url)
            .map_err(|e| Warning::wrap_parse_error(url.clone(), &e))?;

        Ok(ParsedDocument {
                url: url.clone(),
                ast: DocumentAst::Script(Arc::new(document)),
                source_text: source_text.into(),
                inline_info,
            })
    }
}

/// Parses `source` as a standalone ECMAScript module, collecting comments
/// alongside it for the JSDoc-annotation lookups the scanners rely on.
fn parse_script_source(source: &str, url: &CanonicalUrl) -> anyhow::Result<ScriptDocument> {
    let source_map: swc_common::sync::Lrc<SourceMap> = Default::default();
    let file = source_map.new_source_file(
        FileName::Custom(url.as_str().to_string()).into(),
        source.to_string(),
    );
    let comments = SingleThreadedComments::default();

    let lexer = Lexer::new(
        Syntax::Es(EsSyntax {
                decorators: true,
                ..Default::default()
            }),
        Default::default(),
        StringInput::from(&*file),
        Some(&comments),
    );

    let mut parser = SwcParser::new_from(lexer);
    let module = parser
        .parse_module()
        .map_err(|e| anyhow::anyhow!("{:?}", e.into_kind()))
        .with_context(|| format!("failed to parse script `{url}`"))?;

    let recoverable = parser.take_errors();
    if !recoverable.is_empty() {
        tracing::debug!(
            count = recoverable.len(),
            url = %url,
            "script parse completed with recoverable errors"
        );
    }

    Ok(ScriptDocument { module, comments })
}

/// A pass-through stylesheet parser: stylesheet scanning beyond "this is a
/// standalone style document" is out of scope for this crate.
#[derive(Debug, Default)]
pub struct StyleParser;

impl Parser for StyleParser {
    fn parse(
        &self,
        bytes: &[u8],
        url: &CanonicalUrl,
        inline_info: Option<InlineInfo>,
    ) -> Result<ParsedDocument, Warning> {
        let source_text = String::from_utf8_lossy(bytes).into_owned();
        Ok(ParsedDocument {
                url: url.clone(),
                ast: DocumentAst::Style(Arc::new(source_text.clone())),
                source_text: source_text.into(),
                inline_info,
            })
    }
}

/// A JSON structured-data parser.
#[derive(Debug, Default)]
pub struct JsonParser;

impl Parser for JsonParser {
    fn parse(
        &self,
        bytes: &[u8],
        url: &CanonicalUrl,
        inline_info: Option<InlineInfo>,
    ) -> Result<ParsedDocument, Warning> {
        let source_text = String::from_utf8_lossy(bytes).into_owned();
        let value: serde_json::Value = serde_json::from_str(&source_text).map_err(|e| {
                Warning::wrap_parse_error(url.clone(), &anyhow::anyhow!(e))
            })?;

        Ok(ParsedDocument {
                url: url.clone(),
                ast: DocumentAst::Json(Arc::new(value)),
                source_text: source_text.into(),
                inline_info,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> CanonicalUrl {
        CanonicalUrl::from_canonical(s)
    }

    #[test]
    fn with_default_parsers_covers_all_four_document_types() {
        let registry = ParserRegistry::with_default_parsers();
        assert!(registry.parser_for(DocumentType::Markup).is_some());
        assert!(registry.parser_for(DocumentType::Script).is_some());
        assert!(registry.parser_for(DocumentType::Style).is_some());
        assert!(registry.parser_for(DocumentType::Json).is_some());
    }

    #[test]
    fn registering_twice_for_the_same_type_replaces_the_parser() {
        let mut registry = ParserRegistry::new();
        registry.register(DocumentType::Json, Arc::new(JsonParser));
        registry.register(DocumentType::Json, Arc::new(JsonParser));
        assert_eq!(registry.parsers.len(), 1);
    }

    #[test]
    fn markup_parser_builds_a_markup_ast() {
        let doc = MarkupParser
            .parse(b"<my-el></my-el>", &url("file:///a.html"), None)
            .expect("parses");
        assert_eq!(doc.document_type(), DocumentType::Markup);
        assert!(doc.ast.as_markup().unwrap().elements().any(|e| e.tag_name == "my-el"));
    }

    #[test]
    fn script_parser_rejects_invalid_syntax_with_a_warning() {
        let err = ScriptParser
            .parse(b"class {{{ not valid", &url("file:///a.js"), None)
            .expect_err("invalid script fails to parse");
        assert!(matches!(err.kind, crate::warning::WarningKind::ParseFailure));
    }

    #[test]
    fn script_parser_accepts_a_well_formed_module() {
        let doc = ScriptParser
            .parse(b"class Foo extends HTMLElement {}", &url("file:///a.js"), None)
            .expect("parses");
        assert_eq!(doc.document_type(), DocumentType::Script);
    }

    #[test]
    fn json_parser_rejects_malformed_input() {
        let err = JsonParser
            .parse(b"{not json", &url("file:///a.json"), None)
            .expect_err("malformed json fails");
        assert!(matches!(err.kind, crate::warning::WarningKind::ParseFailure));
    }

    #[test]
    fn json_parser_accepts_well_formed_input() {
        let doc = JsonParser
            .parse(br#"{"a": 1}"#, &url("file:///a.json"), None)
            .expect("parses");
        assert_eq!(doc.ast.document_type(), DocumentType::Json);
    }

    #[test]
    fn style_parser_keeps_source_verbatim() {
        let doc = StyleParser
            .parse(b".a { color: red; }", &url("file:///a.css"), None)
            .expect("parses");
        assert_eq!(&*doc.source_text, ".a { color: red; }");
    }

    #[test]
    fn inline_info_round_trips_through_a_parsed_document() {
        let inline_info = InlineInfo {
            line: 3,
            col: 2,
            filename: url("file:///outer.html"),
        };
        let doc = ScriptParser
            .parse(b"", &url("file:///outer.html"), Some(inline_info.clone()))
            .expect("parses");
        assert_eq!(doc.inline_info, Some(inline_info));
    }
}
