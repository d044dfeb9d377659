//! The Summary Emitter: walks a resolved [`Document`] and
//! produces a schema-validated JSON surface.
//!
//! The render target is a JSON value checked against an embedded JSON
//! Schema via the `jsonschema` crate; the shape of the problem -- stable
//! traversal order, one render function per feature kind -- is the same
//! one any walk-a-resolved-analysis-and-render step faces.

use std::sync::OnceLock;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Value, json};

use crate::document::Document;
use crate::feature::{
    AttributeMember, ClassLikeFeature, ClassLikeKind, EventMember, FeatureKind, FunctionFeature,
    MethodMember, NamespaceFeature, PropertyMember, ScannedFeature, SlotMember,
};
use crate::privacy::Privacy;
use crate::url::CanonicalUrl;
use crate::warning::SourceRange;

/// The schema version this emitter's output declares ("Summary JSON
/// surface (schema version `1.x.x`)").
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Errors raised while producing a summary ("Schema-validation failure:
/// emitter throws a validation error enumerating all schema mismatches").
#[derive(Debug, thiserror::Error)]
pub enum SummaryError {
    /// The emitted JSON did not match the versioned schema. Every
    /// mismatch found is included, not just the first.
    #[error("summary failed schema validation:\n{}",.0.join("\n"))]
    SchemaValidation(Vec<String>),
}

/// Emits `document`'s resolved analysis as a schema-validated JSON summary
///.
///
/// `package_root` is the base URL primary-file source ranges are made
/// relative to; a member's source range is instead made relative to the
/// *referring* element's own directory when the member was inherited from a
/// document other than the element's own.
pub fn emit(document: &Document, package_root: &CanonicalUrl) -> Result<Value, SummaryError> {
    let value = build(document, package_root);
    validate(&value)?;
    Ok(value)
}

/// Builds the summary JSON value without validating it, for callers (such as
/// this module's own tests) that want to inspect an intentionally-invalid
/// document.
fn build(document: &Document, package_root: &CanonicalUrl) -> Value {
    let mut namespaces = Vec::new();
    let mut elements = Vec::new();
    let mut mixins = Vec::new();
    let mut behaviors = Vec::new();
    let mut classes = Vec::new();
    let mut functions = Vec::new();

    // Namespaces first, in stable dotted-name order, so a parent namespace
    // is always emitted before any of its children ("nested by dotted
    // name").
    let mut namespace_features: Vec<&NamespaceFeature> = document
        .features_of_kind(FeatureKind::Namespace)
        .filter_map(|f| match f {
            ScannedFeature::Namespace(n) => Some(n),
            _ => None,
        })
        .collect();
    namespace_features.sort_by(|a, b| a.name.cmp(&b.name));
    for ns in namespace_features {
        namespaces.push(namespace_json(ns, document.url(), package_root));
    }

    for feature in document.features_of_kind(FeatureKind::Element) {
        if let ScannedFeature::ClassLike(c) = feature {
            elements.push(class_like_json(c, document.url(), package_root));
        }
    }

    for feature in document.features_of_kind(FeatureKind::Mixin) {
        if let ScannedFeature::ClassLike(c) = feature {
            mixins.push(class_like_json(c, document.url(), package_root));
        }
    }

    for feature in document.features_of_kind(FeatureKind::Behavior) {
        if let ScannedFeature::ClassLike(c) = feature {
            behaviors.push(class_like_json(c, document.url(), package_root));
        }
    }

    for feature in document.features_of_kind(FeatureKind::Class) {
        if let ScannedFeature::ClassLike(c) = feature {
            classes.push(class_like_json(c, document.url(), package_root));
        }
    }

    for feature in document.features_of_kind(FeatureKind::Function) {
        if let ScannedFeature::Function(f) = feature {
            functions.push(function_json(f, document.url(), package_root));
        }
    }

    let mut top = serde_json::Map::new();
    top.insert("schema_version".to_string(), json!(SCHEMA_VERSION));
    insert_if_nonempty(&mut top, "namespaces", namespaces);
    insert_if_nonempty(&mut top, "elements", elements);
    insert_if_nonempty(&mut top, "mixins", mixins);
    insert_if_nonempty(&mut top, "classes", classes);
    insert_if_nonempty(&mut top, "functions", functions);

    if !behaviors.is_empty() {
        top.insert(
            "metadata".to_string(),
            json!({ "polymer": { "behaviors": behaviors } }),
        );
    }

    Value::Object(top)
}

fn insert_if_nonempty(map: &mut serde_json::Map<String, Value>, key: &str, values: Vec<Value>) {
    if !values.is_empty() {
        map.insert(key.to_string(), Value::Array(values));
    }
}

fn namespace_json(ns: &NamespaceFeature, doc_url: &CanonicalUrl, package_root: &CanonicalUrl) -> Value {
    json!({
            "name": ns.name,
            "description": ns.description,
            "sourceRange": source_range_json(ns.range, doc_url, package_root, doc_url),
        })
}

fn function_json(f: &FunctionFeature, doc_url: &CanonicalUrl, package_root: &CanonicalUrl) -> Value {
    json!({
            "name": f.name,
            "namespace": f.memberof,
            "description": f.description,
            "privacy": privacy_json(f.privacy),
            "params": f.params.iter().map(|(name, ty)| json!({ "name": name, "type": ty })).collect::<Vec<_>>(),
            "return": f.return_type,
            "sourceRange": source_range_json(f.range, doc_url, package_root, doc_url),
        })
}

/// Renders one element/mixin/behavior/class entry (the same fields
/// apply to every class-like kind, save for `tagname` which only elements
/// carry).
fn class_like_json(c: &ClassLikeFeature, doc_url: &CanonicalUrl, package_root: &CanonicalUrl) -> Value {
    let mut entry = serde_json::Map::new();
    entry.insert("name".to_string(), json!(c.name));
    if c.kind == ClassLikeKind::Element {
        entry.insert("tagname".to_string(), json!(c.tag_name));
    }
    entry.insert("description".to_string(), json!(c.description));
    entry.insert("summary".to_string(), json!(c.summary));
    entry.insert("path".to_string(), json!(relative_to(doc_url, package_root)));
    entry.insert(
        "properties".to_string(),
        json!(
            c.properties
                .iter()
                .map(|p| property_json(p, doc_url, package_root))
                .collect::<Vec<_>>()
        ),
    );
    entry.insert(
        "methods".to_string(),
        json!(
            c.methods
                .iter()
                .map(|m| method_json(m, doc_url, package_root))
                .collect::<Vec<_>>()
        ),
    );
    entry.insert(
        "attributes".to_string(),
        json!(
            c.attributes
                .iter()
                .map(|a| attribute_json(a, doc_url, package_root))
                .collect::<Vec<_>>()
        ),
    );
    entry.insert(
        "events".to_string(),
        json!(
            c.events
                .iter()
                .map(|e| event_json(e, doc_url, package_root))
                .collect::<Vec<_>>()
        ),
    );
    entry.insert(
        "slots".to_string(),
        json!(c.slots.iter().map(slot_json).collect::<Vec<_>>()),
    );
    entry.insert("demos".to_string(), json!(c.demos));
    entry.insert("styling".to_string(), json!(c.styling));
    entry.insert("privacy".to_string(), json!(privacy_json(c.privacy)));
    if let Some(superclass) = &c.superclass {
        entry.insert("superclass".to_string(), json!(superclass));
    }
    if !c.mixins.is_empty() {
        entry.insert("mixins".to_string(), json!(c.mixins));
    }
    entry.insert("metadata".to_string(), json!({}));
    entry.insert(
        "sourceRange".to_string(),
        source_range_json(c.range, doc_url, package_root, doc_url),
    );
    Value::Object(entry)
}

fn property_json(p: &PropertyMember, owner_doc: &CanonicalUrl, package_root: &CanonicalUrl) -> Value {
    let mut entry = serde_json::Map::new();
    entry.insert("name".to_string(), json!(p.name));
    entry.insert("type".to_string(), json!(p.type_));
    entry.insert("defaultValue".to_string(), json!(p.default_value));
    entry.insert("notify".to_string(), json!(p.notify));
    entry.insert("readOnly".to_string(), json!(p.read_only));
    entry.insert("privacy".to_string(), json!(privacy_json(p.privacy)));
    entry.insert("description".to_string(), json!(p.description));
    if let Some(from) = &p.inherited_from {
        entry.insert("inheritedFrom".to_string(), json!(from));
    }
    let member_doc = p.source_url.as_ref().unwrap_or(owner_doc);
    entry.insert(
        "sourceRange".to_string(),
        source_range_json(p.range, member_doc, package_root, owner_doc),
    );
    Value::Object(entry)
}

fn method_json(m: &MethodMember, owner_doc: &CanonicalUrl, package_root: &CanonicalUrl) -> Value {
    let mut entry = serde_json::Map::new();
    entry.insert("name".to_string(), json!(m.name));
    entry.insert(
        "params".to_string(),
        json!(
            m.params
                .iter()
                .map(|(name, ty)| json!({ "name": name, "type": ty }))
                .collect::<Vec<_>>()
        ),
    );
    entry.insert("return".to_string(), json!(m.return_type));
    entry.insert("privacy".to_string(), json!(privacy_json(m.privacy)));
    entry.insert("description".to_string(), json!(m.description));
    if let Some(from) = &m.inherited_from {
        entry.insert("inheritedFrom".to_string(), json!(from));
    }
    let member_doc = m.source_url.as_ref().unwrap_or(owner_doc);
    entry.insert(
        "sourceRange".to_string(),
        source_range_json(m.range, member_doc, package_root, owner_doc),
    );
    Value::Object(entry)
}

fn attribute_json(a: &AttributeMember, owner_doc: &CanonicalUrl, package_root: &CanonicalUrl) -> Value {
    let mut entry = serde_json::Map::new();
    entry.insert("name".to_string(), json!(a.name));
    entry.insert("description".to_string(), json!(a.description));
    if let Some(from) = &a.inherited_from {
        entry.insert("inheritedFrom".to_string(), json!(from));
    }
    let member_doc = a.source_url.as_ref().unwrap_or(owner_doc);
    entry.insert(
        "sourceRange".to_string(),
        source_range_json(a.range, member_doc, package_root, owner_doc),
    );
    Value::Object(entry)
}

fn event_json(e: &EventMember, owner_doc: &CanonicalUrl, package_root: &CanonicalUrl) -> Value {
    let mut entry = serde_json::Map::new();
    entry.insert("name".to_string(), json!(e.name));
    entry.insert("description".to_string(), json!(e.description));
    if let Some(from) = &e.inherited_from {
        entry.insert("inheritedFrom".to_string(), json!(from));
    }
    let member_doc = e.source_url.as_ref().unwrap_or(owner_doc);
    entry.insert(
        "sourceRange".to_string(),
        source_range_json(e.range, member_doc, package_root, owner_doc),
    );
    Value::Object(entry)
}

fn slot_json(s: &SlotMember) -> Value {
    json!({
            "name": s.name,
            "description": s.description,
            "sourceRange": { "start": s.range.start, "end": s.range.end },
        })
}

fn privacy_json(privacy: Privacy) -> &'static str {
    match privacy {
        Privacy::Public => "public",
        Privacy::Protected => "protected",
        Privacy::Private => "private",
    }
}

/// Builds a `sourceRange` object whose `file` is relative to `package_root`
/// when `member_doc == owner_doc` (the feature's primary file), or relative
/// to `owner_doc`'s own directory when the member was inherited from a
/// different document: inherited members carry a `sourceRange.file` made
/// relative to the element's own directory, not the package root.
fn source_range_json(
    range: SourceRange,
    member_doc: &CanonicalUrl,
    package_root: &CanonicalUrl,
    owner_doc: &CanonicalUrl,
) -> Value {
    let file = if member_doc == owner_doc {
        relative_to(owner_doc, package_root)
    } else {
        relative_to_dir(member_doc, owner_doc)
    };

    json!({ "file": file, "start": range.start, "end": range.end })
}

/// Renders `url` relative to `base`'s directory (all but its last path
/// segment), falling back to the absolute URL when the two share no common
/// scheme/host to relativize against.
fn relative_to(url: &CanonicalUrl, base: &CanonicalUrl) -> String {
    relative_to_dir(url, base)
}

fn relative_to_dir(url: &CanonicalUrl, base: &CanonicalUrl) -> String {
    let url_segments: Vec<&str> = url.as_str().split('/').collect();
    let base_segments: Vec<&str> = base.as_str().split('/').collect();

    // Directory of `base`: drop its last segment (the file name).
    let base_dir = if base_segments.len() > 1 {
        &base_segments[..base_segments.len() - 1]
    } else {
        &base_segments[..]
    };

    let common = url_segments
        .iter()
        .zip(base_dir.iter())
        .take_while(|(a, b)| a == b)
        .count();

    if common == 0 {
        return url.as_str().to_string();
    }

    let ups = base_dir.len().saturating_sub(common);
    let mut parts: Vec<String> = std::iter::repeat_n("..".to_string(), ups).collect();
    parts.extend(url_segments[common..].iter().map(|s| s.to_string()));

    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}

/// The embedded JSON Schema the emitter validates its own output against
///. Deliberately permissive on nested member shapes (this crate is
/// not in the business of re-deriving a full upstream schema) but strict on
/// the top-level surface the spec names explicitly.
fn schema() -> &'static Value {
    static SCHEMA: OnceLock<Value> = OnceLock::new();
    SCHEMA.get_or_init(|| {
            json!({
                    "$schema": "http://json-schema.org/draft-07/schema#",
                    "type": "object",
                    "required": ["schema_version"],
                    "properties": {
                        "schema_version": { "type": "string", "pattern": "^1\\." },
                        "elements": { "type": "array", "items": { "$ref": "#/definitions/classLike" } },
                        "mixins": { "type": "array", "items": { "$ref": "#/definitions/classLike" } },
                        "classes": { "type": "array", "items": { "$ref": "#/definitions/classLike" } },
                        "functions": { "type": "array", "items": { "$ref": "#/definitions/function" } },
                        "namespaces": { "type": "array", "items": { "$ref": "#/definitions/namespace" } },
                        "metadata": {
                            "type": "object",
                            "properties": {
                                "polymer": {
                                    "type": "object",
                                    "properties": {
                                        "behaviors": { "type": "array", "items": { "$ref": "#/definitions/classLike" } }
                                    }
                                }
                            }
                        }
                    },
                    "definitions": {
                        "sourceRange": {
                            "type": "object",
                            "required": ["file", "start", "end"],
                            "properties": {
                                "file": { "type": "string" },
                                "start": { "type": "integer", "minimum": 0 },
                                "end": { "type": "integer", "minimum": 0 }
                            }
                        },
                        "namespace": {
                            "type": "object",
                            "required": ["name", "sourceRange"],
                            "properties": {
                                "name": { "type": "string" },
                                "description": { "type": "string" },
                                "sourceRange": { "$ref": "#/definitions/sourceRange" }
                            }
                        },
                        "function": {
                            "type": "object",
                            "required": ["name", "sourceRange"],
                            "properties": {
                                "name": { "type": "string" },
                                "privacy": { "enum": ["public", "protected", "private"] },
                                "sourceRange": { "$ref": "#/definitions/sourceRange" }
                            }
                        },
                        "classLike": {
                            "type": "object",
                            "required": ["name", "path", "properties", "methods", "attributes", "events", "slots", "privacy", "sourceRange"],
                            "properties": {
                                "name": { "type": "string" },
                                "tagname": { "type": ["string", "null"] },
                                "description": { "type": "string" },
                                "summary": { "type": "string" },
                                "path": { "type": "string" },
                                "properties": { "type": "array" },
                                "methods": { "type": "array" },
                                "attributes": { "type": "array" },
                                "events": { "type": "array" },
                                "slots": { "type": "array" },
                                "demos": { "type": "array" },
                                "styling": { "type": "array" },
                                "privacy": { "enum": ["public", "protected", "private"] },
                                "superclass": { "type": "string" },
                                "mixins": { "type": "array", "items": { "type": "string" } },
                                "metadata": { "type": "object" },
                                "sourceRange": { "$ref": "#/definitions/sourceRange" }
                            }
                        }
                    }
                })
        })
}

/// Validates `value` against [`schema`], collecting every mismatch rather
/// than stopping at the first ("enumerating all schema mismatches").
fn validate(value: &Value) -> Result<(), SummaryError> {
    let validator = jsonschema::validator_for(schema())
        .expect("the embedded schema is a valid JSON Schema document");

    let output = validator.apply(value).basic();
    if let jsonschema::BasicOutput::Invalid(errs) = output {
        let messages = errs
            .iter()
            .map(|e| format!("{} (at {})", e.error_description(), e.instance_location()))
            .collect();
        return Err(SummaryError::SchemaValidation(messages));
    }

    Ok(())
}

/// A serde-friendly mirror of the emitted shape, kept only so downstream
/// embedders that prefer a typed view over raw [`Value`] have one available;
/// the canonical output is always produced by [`emit`] and validated against
/// [`schema`].
#[derive(Debug, Serialize)]
pub struct SummaryHeader {
    /// The declared schema version (always [`SCHEMA_VERSION`]).
    pub schema_version: String,
}

impl Default for SummaryHeader {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
        }
    }
}

/// Groups a flat feature list by owning namespace prefix (everything before
/// the last `.` in a dotted name), used by embedders that want to render
/// mixins/classes nested under their namespace rather than as flat arrays
/// ("mixins (recorded under their owning namespace)").
pub fn group_by_namespace<'a>(names: impl IntoIterator<Item = &'a str>) -> IndexMap<String, Vec<&'a str>> {
    let mut groups: IndexMap<String, Vec<&str>> = IndexMap::new();
    for name in names {
        let namespace = match name.rfind('.') {
            Some(idx) => &name[..idx],
            None => "",
        };
        groups.entry(namespace.to_string()).or_default().push(name);
    }
    groups
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::ast::DocumentAst;
    use crate::document::ScannedDocument;
    use crate::parser::ParsedDocument;

    fn doc_url(s: &str) -> CanonicalUrl {
        CanonicalUrl::from_canonical(s.to_string())
    }

    fn resolved_document(url: CanonicalUrl, features: Vec<ScannedFeature>) -> Document {
        let parsed = Arc::new(ParsedDocument {
                url: url.clone(),
                ast: DocumentAst::Json(Arc::new(serde_json::Value::Null)),
                source_text: Arc::from(""),
                inline_info: None,
            });
        let scanned = Arc::new(ScannedDocument {
                url: url.clone(),
                parsed_doc: parsed,
                features,
                warnings: Vec::new(),
                is_inline: false,
                location_offset: None,
            });
        crate::resolver::resolve(scanned, Vec::new())
    }

    #[test]
    fn emits_schema_version_and_validates() {
        let document = resolved_document(doc_url("file:///pkg/my-elem.js"), Vec::new());
        let root = doc_url("file:///pkg/");
        let value = emit(&document, &root).expect("empty document still validates");
        assert_eq!(value["schema_version"], json!(SCHEMA_VERSION));
    }

    #[test]
    fn emits_an_element_with_flattened_members() {
        let mut element = ClassLikeFeature::new(ClassLikeKind::Element, "MyElement", SourceRange::new(0, 10));
        element.tag_name = Some("my-element".to_string());
        element.properties.push(PropertyMember {
                name: "localProperty".to_string(),
                type_: Some("boolean".to_string()),
                default_value: Some("true".to_string()),
                notify: false,
                read_only: false,
                privacy: Privacy::Public,
                description: String::new(),
                inherited_from: None,
                range: SourceRange::new(1, 2),
                source_url: None,
            });

        let document =
        resolved_document(doc_url("file:///pkg/my-element.js"), vec![ScannedFeature::ClassLike(element)]);
        let root = doc_url("file:///pkg/");
        let value = emit(&document, &root).expect("schema-valid");

        let elements = value["elements"].as_array().expect("elements array");
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0]["tagname"], json!("my-element"));
        assert_eq!(elements[0]["properties"][0]["name"], json!("localProperty"));
    }

    #[test]
    fn relative_to_dir_walks_up_and_down_shared_prefixes() {
        let member = doc_url("file:///pkg/behaviors/simple.js");
        let owner = doc_url("file:///pkg/elements/my-element.js");
        assert_eq!(relative_to_dir(&member, &owner), "../behaviors/simple.js");
    }

    #[test]
    fn groups_dotted_names_by_owning_namespace() {
        let groups = group_by_namespace(["MyNamespace.A", "MyNamespace.B", "TopLevel"]);
        assert_eq!(groups.get("MyNamespace").map(Vec::len), Some(2));
        assert_eq!(groups.get("").map(Vec::len), Some(1));
    }
}
