//! A minimal markup document tree.
//!
//! A full HTML5-compliant parser is an external collaborator: this
//! module only defines the tree shape the markup scanners walk. A
//! [`crate::parser::Parser`] implementation is expected to build one of these
//! from source bytes; this crate ships a small one (see `parser::markup`)
//! good enough for the scanner fixtures and tests.

use indexmap::IndexMap;

use crate::warning::SourceRange;

/// A single attribute on an [`Element`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkupAttribute {
    /// The attribute name, as written.
    pub name: String,
    /// The attribute value, if any (boolean attributes have none).
    pub value: Option<String>,
    /// The source range of the whole `name="value"` pair.
    pub range: SourceRange,
}

/// An element node in the markup tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// The lower-cased tag name.
    pub tag_name: String,
    /// Attributes in source order, keyed by name for quick lookup.
    pub attributes: IndexMap<String, MarkupAttribute>,
    /// Child nodes.
    pub children: Vec<Node>,
    /// The source range of the open tag (used as the feature's anchor).
    pub range: SourceRange,
    /// Raw text content directly inside the element, if this is a
    /// `<script>`/`<style>` element carrying an inline sub-document. `None`
    /// for ordinary elements whose content is only further markup.
    pub inline_text: Option<String>,
}

impl Element {
    /// Returns the attribute named `name`, if present.
    pub fn attribute(&self, name: &str) -> Option<&MarkupAttribute> {
        self.attributes.get(name)
    }

    /// Returns `true` if the tag name contains a hyphen, i.e. this looks like
    /// a custom element usage.
    pub fn looks_like_custom_element(&self) -> bool {
        self.tag_name.contains('-')
    }

    /// Depth-first iterator over this element and all descendant elements.
    pub fn descendants(&self) -> impl Iterator<Item = &Element> {
        let mut stack: Vec<&Element> = vec![self];
        std::iter::from_fn(move || {
                let next = stack.pop()?;
                for child in next.children.iter().rev() {
                    if let Node::Element(e) = child {
                        stack.push(e);
                    }
                }
                Some(next)
            })
    }
}

/// A node in the markup tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// An element node.
    Element(Element),
    /// A run of text.
    Text(String),
}

/// A parsed markup document: a forest of top-level nodes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MarkupDocument {
    /// Top-level nodes (markup documents need not have a single root).
    pub roots: Vec<Node>,
}

impl MarkupDocument {
    /// Iterates every element in the document, in document order.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.roots.iter().flat_map(|node| match node {
                Node::Element(e) => Box::new(e.descendants()) as Box<dyn Iterator<Item = &Element>>,
                Node::Text(_) => Box::new(std::iter::empty()),
            })
    }
}

/// Tag names whose content is raw text rather than further markup, and whose
/// source is exposed as `Element::inline_text` for the inline-document
/// scanner to pick up.
const RAW_TEXT_TAGS: &[&str] = &["script", "style"];

/// Void elements, which never have a closing tag or children.
const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Parses `source` into a [`MarkupDocument`].
///
/// This is a small, forgiving tokenizer -- not a full HTML5 parser, which
/// remains an external collaborator -- sufficient to drive the import,
/// inline-document, and element-reference scanners.
pub fn parse(source: &str) -> anyhow::Result<MarkupDocument> {
    let mut chars = source.char_indices().peekable();
    let mut stack: Vec<Element> = Vec::new();
    let mut roots: Vec<Node> = Vec::new();
    let mut text_start: Option<usize> = None;

    let flush_text = |text_start: &mut Option<usize>, end: usize, stack: &mut Vec<Element>, roots: &mut Vec<Node>| {
        if let Some(start) = text_start.take() {
            let text = &source[start..end];
            if !text.trim().is_empty() {
                let node = Node::Text(text.to_string());
                match stack.last_mut() {
                    Some(parent) => parent.children.push(node),
                    None => roots.push(node),
                }
            }
        }
    };

    while let Some(&(idx, ch)) = chars.peek() {
        if ch == '<' {
            flush_text(&mut text_start, idx, &mut stack, &mut roots);

            // Raw-text element bodies (script/style) are captured verbatim
            // until their matching close tag.
            if let Some(top) = stack.last() {
                if RAW_TEXT_TAGS.contains(&top.tag_name.as_str()) && top.inline_text.is_none() {
                    let close_tag = format!("</{}", top.tag_name);
                    if let Some(close_pos) = source[idx..].to_lowercase().find(&close_tag) {
                        let body = &source[idx..idx + close_pos];
                        let mut element = stack.pop().expect("checked above");
                        element.inline_text = Some(body.to_string());
                        match stack.last_mut() {
                            Some(parent) => parent.children.push(Node::Element(element)),
                            None => roots.push(Node::Element(element)),
                        }
                        let consumed = idx + close_pos;
                        while let Some(&(i, _)) = chars.peek() {
                            if i >= consumed {
                                break;
                            }
                            chars.next();
                        }
                        continue;
                    }
                }
            }

            if source[idx..].starts_with("</") {
                let end = source[idx..]
                    .find('>')
                    .map(|p| idx + p + 1)
                    .unwrap_or(source.len());
                if let Some(element) = stack.pop() {
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(Node::Element(element)),
                        None => roots.push(Node::Element(element)),
                    }
                }
                advance_to(&mut chars, end);
                text_start = None;
                continue;
            }

            if source[idx..].starts_with("<!--") {
                let end = source[idx..]
                    .find("-->")
                    .map(|p| idx + p + 3)
                    .unwrap_or(source.len());
                advance_to(&mut chars, end);
                text_start = None;
                continue;
            }

            if let Some((element, end)) = parse_open_tag(source, idx) {
                let self_closing = VOID_TAGS.contains(&element.tag_name.as_str())
                || source[idx..end].trim_end_matches('>').ends_with('/');
                if self_closing {
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(Node::Element(element)),
                        None => roots.push(Node::Element(element)),
                    }
                } else {
                    stack.push(element);
                }
                advance_to(&mut chars, end);
                text_start = None;
                continue;
            }
        }

        if text_start.is_none() {
            text_start = Some(idx);
        }
        chars.next();
    }

    flush_text(&mut text_start, source.len(), &mut stack, &mut roots);

    // Any still-open elements are implicitly closed at end of input.
    while let Some(element) = stack.pop() {
        match stack.last_mut() {
            Some(parent) => parent.children.push(Node::Element(element)),
            None => roots.push(Node::Element(element)),
        }
    }

    Ok(MarkupDocument { roots })
}

/// Advances `chars` until its next item starts at or after `target`.
fn advance_to(chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>, target: usize) {
    while let Some(&(i, _)) = chars.peek() {
        if i >= target {
            break;
        }
        chars.next();
    }
}

/// Parses a single `<tag attr="value"...>` starting at byte offset `start`.
///
/// Returns the element (with no children yet) and the exclusive end offset
/// of the tag.
fn parse_open_tag(source: &str, start: usize) -> Option<(Element, usize)> {
    let end = source[start..].find('>').map(|p| start + p + 1)?;
    let inner = &source[start + 1..end - 1];
    let inner = inner.strip_suffix('/').unwrap_or(inner);

    let mut parts = inner.splitn(2, char::is_whitespace);
    let tag_name = parts.next()?.to_lowercase();
    if tag_name.is_empty() || tag_name.starts_with('!') || tag_name.starts_with('?') {
        return None;
    }

    let mut attributes = IndexMap::new();
    if let Some(rest) = parts.next() {
        // Absolute offset of `rest` within `source`.
        let attrs_start = end - 1 - rest.len();
        let mut cursor = 0usize; // offset into `rest`

        loop {
            let remaining = &rest[cursor..];
            let skip = remaining.len() - remaining.trim_start().len();
            cursor += skip;
            if cursor >= rest.len() {
                break;
            }

            let remaining = &rest[cursor..];
            let name_len = remaining
                .find(|c: char| c == '=' || c.is_whitespace())
                .unwrap_or(remaining.len());
            let name = &remaining[..name_len];
            if name.is_empty() {
                break;
            }

            let attr_start = cursor;
            let mut pos = cursor + name_len;
            let mut value = None;

            let after_name = &rest[pos..];
            let name_skip = after_name.len() - after_name.trim_start().len();
            pos += name_skip;

            if rest[pos..].starts_with('=') {
                pos += 1;
                let after_eq = &rest[pos..];
                let eq_skip = after_eq.len() - after_eq.trim_start().len();
                pos += eq_skip;

                let after_eq = &rest[pos..];
                if let Some(quote) = after_eq.chars().next().filter(|c| *c == '"' || *c == '\'') {
                    if let Some(close) = after_eq[1..].find(quote) {
                        value = Some(after_eq[1..1 + close].to_string());
                        pos += 1 + close + 1;
                    } else {
                        pos = rest.len();
                    }
                } else {
                    let word_len = after_eq
                        .find(char::is_whitespace)
                        .unwrap_or(after_eq.len());
                    value = Some(after_eq[..word_len].to_string());
                    pos += word_len;
                }
            }

            attributes.insert(
                name.to_lowercase(),
                MarkupAttribute {
                    name: name.to_lowercase(),
                    value,
                    range: SourceRange::new(
                        (attrs_start + attr_start) as u32,
                        (attrs_start + pos) as u32,
                    ),
                },
            );
            cursor = pos;
        }
    }

    Some((
            Element {
                tag_name,
                attributes,
                children: Vec::new(),
                range: SourceRange::new(start as u32, end as u32),
                inline_text: None,
            },
            end,
        ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_elements_and_attributes() {
        let doc = parse(r#"<dom-module id="my-el"><div class="a b" hidden></div></dom-module>"#)
            .unwrap();

        let dom_module = doc.elements().find(|e| e.tag_name == "dom-module").unwrap();
        assert_eq!(dom_module.attribute("id").unwrap().value.as_deref(), Some("my-el"));
        assert!(dom_module.looks_like_custom_element());

        let div = doc.elements().find(|e| e.tag_name == "div").unwrap();
        assert_eq!(div.attribute("class").unwrap().value.as_deref(), Some("a b"));
        assert_eq!(div.attribute("hidden").unwrap().value, None);
        assert!(!div.looks_like_custom_element());
    }

    #[test]
    fn void_elements_never_open_a_scope() {
        let doc = parse(r#"<div><img src="a.png"><span>text</span></div>"#).unwrap();
        let div = doc.elements().find(|e| e.tag_name == "div").unwrap();
        // If `img` incorrectly opened a scope, `span` would end up nested
        // inside it instead of being `div`'s direct sibling child.
        assert_eq!(div.children.len(), 2);
        assert!(div.attribute("src").is_none());
    }

    #[test]
    fn script_and_style_bodies_are_captured_as_raw_text() {
        let doc = parse("<script>const x = 1 < 2;</script><style>.a { color: red; }</style>").unwrap();

        let script = doc.elements().find(|e| e.tag_name == "script").unwrap();
        assert_eq!(script.inline_text.as_deref(), Some("const x = 1 < 2;"));
        assert!(script.children.is_empty());

        let style = doc.elements().find(|e| e.tag_name == "style").unwrap();
        assert_eq!(style.inline_text.as_deref(), Some(".a { color: red; }"));
    }

    #[test]
    fn descendants_visits_every_nested_element_depth_first() {
        let doc = parse("<a><b><c></c></b><d></d></a>").unwrap();
        let a = doc.elements().find(|e| e.tag_name == "a").unwrap();
        let names: Vec<&str> = a.descendants().map(|e| e.tag_name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn comments_are_skipped_entirely() {
        let doc = parse("<div><!-- a comment with <fake-tag> inside --><span></span></div>").unwrap();
        let div = doc.elements().find(|e| e.tag_name == "div").unwrap();
        assert_eq!(div.children.len(), 1);
        assert!(doc.elements().all(|e| e.tag_name != "fake-tag"));
    }
}
