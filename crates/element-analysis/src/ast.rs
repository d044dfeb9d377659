//! AST representations for the document kinds the scanner pipeline
//! recognizes.
//!
//! Concrete parsers live outside this crate; this module only fixes the
//! shape a [`crate::parser::Parser`] implementation must hand back.

use std::sync::Arc;

use swc_common::comments::SingleThreadedComments;
use swc_ecma_ast::Module as ScriptModule;

use crate::markup::MarkupDocument;

/// A parsed ECMAScript module plus the comments stripped out alongside it.
///
/// JSDoc annotations drive most of the scanner's recognition rules (mixin
/// and behavior and namespace annotations, `@memberof`, privacy tags), so
/// the comment map travels with the module rather than being discarded at
/// parse time.
#[derive(Debug)]
pub struct ScriptDocument {
    /// The parsed module.
    pub module: ScriptModule,
    /// Leading/trailing comments keyed by byte position, as collected by the
    /// parser's lexer.
    pub comments: SingleThreadedComments,
}

/// The recognized document type, keyed by extension in the
/// [`crate::parser::ParserRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentType {
    /// A markup document (e.g. `.html`).
    Markup,
    /// A script document (e.g. `.js`).
    Script,
    /// A stylesheet document (e.g. `.css`).
    Style,
    /// A structured data document (e.g. `.json`).
    Json,
}

impl DocumentType {
    /// Maps a file extension to a document type, the way the Parser Registry
    /// does, or `None` for an unrecognized extension.
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension {
            "html" | "htm" => Some(Self::Markup),
            "js" | "mjs" | "cjs" => Some(Self::Script),
            "css" => Some(Self::Style),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// Maps an [`crate::feature::InlineDocumentFeature::doc_type`] tag back
    /// to a document type, the way the inline-document scanner's output is
    /// dispatched back into the scanner pipeline.
    pub fn from_inline_doc_type(doc_type: &str) -> Option<Self> {
        match doc_type {
            "js" | "javascript" => Some(Self::Script),
            "css" => Some(Self::Style),
            "json" => Some(Self::Json),
            "html" => Some(Self::Markup),
            _ => None,
        }
    }
}

/// A parsed AST, tagged with its document type.
#[derive(Debug, Clone)]
pub enum DocumentAst {
    /// A markup tree.
    Markup(Arc<MarkupDocument>),
    /// A parsed ECMAScript module, with its comments.
    Script(Arc<ScriptDocument>),
    /// Stylesheet source, kept opaque: stylesheet scanning is limited to
    /// recognizing it as an inline/standalone document, since only markup
    /// and script carry declarations the scanner pipeline understands.
    Style(Arc<String>),
    /// Structured data, parsed as JSON.
    Json(Arc<serde_json::Value>),
}

impl DocumentAst {
    /// Returns this AST's document type.
    pub fn document_type(&self) -> DocumentType {
        match self {
            Self::Markup(_) => DocumentType::Markup,
            Self::Script(_) => DocumentType::Script,
            Self::Style(_) => DocumentType::Style,
            Self::Json(_) => DocumentType::Json,
        }
    }

    /// Borrows the markup tree, if this is one.
    pub fn as_markup(&self) -> Option<&MarkupDocument> {
        match self {
            Self::Markup(m) => Some(m),
            _ => None,
        }
    }

    /// Borrows the script document, if this is one.
    pub fn as_script(&self) -> Option<&ScriptDocument> {
        match self {
            Self::Script(m) => Some(m),
            _ => None,
        }
    }
}
