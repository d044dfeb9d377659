//! The Feature Resolver: lifts scanned features into resolved
//! features with the prototype chain (self, superclass, mixins, behaviors)
//! flattened and inherited members tagged.
//!
//! This module operates purely on already-scanned data -- it does no I/O and
//! schedules nothing on the dependency graph. [`crate::context::AnalysisContext`]
//! is responsible for having each import's [`Document`] already resolved
//! before calling [`resolve`] ("every scanned feature's
//! inherited members originate from a Document present in the same
//! snapshot").

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use indexmap::IndexMap;

use crate::document::{Document, ScannedDocument};
use crate::feature::{ClassLikeFeature, ClassLikeKind, FeatureKind, ScannedFeature, SlotMember};
use crate::url::CanonicalUrl;
use crate::warning::{Warning, WarningKind};

/// The four feature kinds with a "has-members" shape that can appear in a
/// prototype chain.
const CLASS_LIKE_KINDS: [FeatureKind; 4] = [
    FeatureKind::Class,
    FeatureKind::Element,
    FeatureKind::Mixin,
    FeatureKind::Behavior,
];

impl Document {
    /// Finds a class-like feature by name among this document's own
    /// (already-resolved) features, searching all four class-like kinds.
    pub fn find_own_class_like(&self, name: &str) -> Option<&ClassLikeFeature> {
        CLASS_LIKE_KINDS.iter().find_map(|kind| {
                self.features_of_kind(*kind)
                    .find_map(|f| f.as_class_like().filter(|c| c.name == name))
            })
    }

    /// Finds a class-like feature by name across this document and its
    /// imported closure ("searched across imported documents").
    pub fn find_class_like_transitive(&self, name: &str) -> Option<&ClassLikeFeature> {
        let mut seen = HashSet::new();
        let mut stack = vec![self];
        while let Some(doc) = stack.pop() {
            if !seen.insert(doc.url().clone()) {
                continue;
            }
            if let Some(found) = doc.find_own_class_like(name) {
                return Some(found);
            }
            stack.extend(doc.imports.iter().map(AsRef::as_ref));
        }
        None
    }

    /// Implements the `get_features({kind, id?, imported?,
    /// external_packages?})` query. `imported` traverses this
    /// document's import closure in addition to its own features;
    /// `external_packages` is accepted for interface parity but has no
    /// effect here, since package-boundary classification is a URL resolver
    /// concern this crate does not model.
    pub fn get_features(
        &self,
        kind: FeatureKind,
        id: Option<&str>,
        imported: bool,
        _external_packages: bool,
    ) -> Vec<ScannedFeature> {
        let features = if imported {
            self.features_of_kind_transitive(kind)
        } else {
            self.features_of_kind(kind).cloned().collect()
        };

        match id {
            Some(id) => features.into_iter().filter(|f| f.id() == Some(id)).collect(),
            None => features,
        }
    }
}

/// Resolves a scanned document into a [`Document`]: groups scanned
/// features by kind and, for every class-like feature, flattens its
/// prototype chain's non-shadowed members onto it.
///
/// `imports` must already be fully resolved `Document`s.
pub fn resolve(scanned: Arc<ScannedDocument>, imports: Vec<Arc<Document>>) -> Document {
    let url = scanned.url.clone();

    let mut features_by_kind: IndexMap<FeatureKind, Vec<ScannedFeature>> = IndexMap::new();
    let mut raw_class_like: HashMap<String, ClassLikeFeature> = HashMap::new();
    for feature in &scanned.features {
        if let ScannedFeature::ClassLike(c) = feature {
            raw_class_like.insert(c.name.clone(), c.clone());
        }
        features_by_kind.entry(feature.kind()).or_default().push(feature.clone());
    }

    attach_slots(&mut raw_class_like, &scanned.features);

    let mut resolved_cache: HashMap<String, ClassLikeFeature> = HashMap::new();
    let mut visiting: HashSet<String> = HashSet::new();
    let names: Vec<String> = raw_class_like.keys().cloned().collect();
    for name in &names {
        resolve_one(name, &url, &raw_class_like, &imports, &mut resolved_cache, &mut visiting);
    }

    for kind in CLASS_LIKE_KINDS {
        if let Some(list) = features_by_kind.get_mut(&kind) {
            for f in list.iter_mut() {
                if let ScannedFeature::ClassLike(c) = f {
                    if let Some(resolved) = resolved_cache.get(&c.name) {
                        *c = resolved.clone();
                    }
                }
            }
        }
    }

    Document {
        scanned_doc: scanned,
        features_by_kind,
        imports,
    }
}

/// Attaches each pending [`ScannedFeature::Slot`] onto the element whose tag
/// name matches its `owner_tag` ("slotted templates"). Slots are
/// not part of the inheritance merge (prototype-chain flattening only
/// touches properties, methods, attributes, and events), so this runs once,
/// before any prototype-chain flattening.
fn attach_slots(raw_class_like: &mut HashMap<String, ClassLikeFeature>, features: &[ScannedFeature]) {
    for feature in features {
        let ScannedFeature::Slot(slot) = feature else { continue };
        let Some(element) = raw_class_like
            .values_mut()
            .find(|c| c.kind == ClassLikeKind::Element && c.tag_name.as_deref() == Some(slot.owner_tag.as_str()))
        else {
            continue;
        };
        element.slots.push(SlotMember {
                name: slot.name.clone(),
                description: slot.description.clone(),
                range: slot.range,
            });
    }
}

/// Resolves (and memoizes) the class-like feature named `name`, recursively
/// resolving its own-document ancestors first so multi-level chains flatten
/// correctly (a grandparent's property must already be flattened onto
/// the parent before the parent is used to resolve the child).
///
/// Returns `None` if `name` does not name an own class-like feature of this
/// document (the caller then falls back to searching imports).
fn resolve_one(
    name: &str,
    url: &CanonicalUrl,
    raw: &HashMap<String, ClassLikeFeature>,
    imports: &[Arc<Document>],
    cache: &mut HashMap<String, ClassLikeFeature>,
    visiting: &mut HashSet<String>,
) -> Option<ClassLikeFeature> {
    if let Some(done) = cache.get(name) {
        return Some(done.clone());
    }

    let mut feature = raw.get(name)?.clone();

    if !visiting.insert(name.to_string()) {
        // Circular inheritance within one document: resolve with whatever
        // this feature already carries rather than looping forever, the
        // same cycle-tolerance the import graph applies at the document
        // level extended to class hierarchies.
        return Some(feature);
    }

    let ancestor_names: Vec<String> = feature
        .ancestor_references()
        .into_iter()
        .map(str::to_string)
        .collect();

    for ancestor_name in ancestor_names {
        let ancestor = match resolve_one(&ancestor_name, url, raw, imports, cache, visiting) {
            Some(ancestor_feature) => Some((ancestor_feature, url.clone())),
            None => find_in_imports(&ancestor_name, imports),
        };

        match ancestor {
            Some((ancestor_feature, origin_url)) => {
                append_inherited(&mut feature, &ancestor_feature, &origin_url);
            }
            None => {
                feature.warnings.push(
                    Warning::new(
                        WarningKind::UnresolvedReference,
                        url.clone(),
                        format!("could not resolve `{ancestor_name}` for `{name}`"),
                    )
                        .with_range(feature.range),
                );
            }
        }
    }

    visiting.remove(name);
    cache.insert(name.to_string(), feature.clone());
    Some(feature)
}

/// Searches `imports`' transitive closure for a class-like feature named
/// `name`. Imports are already-resolved documents, so whatever is found is
/// itself already fully flattened. Returns the feature alongside the URL of
/// the document it was found in, needed to rewrite inherited source ranges
/// relative to the referring element's directory.
fn find_in_imports(name: &str, imports: &[Arc<Document>]) -> Option<(ClassLikeFeature, CanonicalUrl)> {
    let mut seen = HashSet::new();
    let mut stack: Vec<&Document> = imports.iter().map(AsRef::as_ref).collect();
    while let Some(doc) = stack.pop() {
        if !seen.insert(doc.url().clone()) {
            continue;
        }
        if let Some(found) = doc.find_own_class_like(name) {
            return Some((found.clone(), doc.url().clone()));
        }
        stack.extend(doc.imports.iter().map(AsRef::as_ref));
    }
    None
}

/// Appends `ancestor`'s non-shadowed members onto `feature`: a member
/// already present on `feature` by name is never duplicated, and
/// an ancestor member that is itself already inherited keeps its original
/// `inherited_from` (the deepest ancestor that actually declared it), not
/// the immediate one being flattened here. Likewise `source_url` keeps
/// pointing at the document the member was actually declared in, however
/// many levels of flattening it has passed through since.
fn append_inherited(feature: &mut ClassLikeFeature, ancestor: &ClassLikeFeature, origin_url: &CanonicalUrl) {
    let fqn = &ancestor.name;

    macro_rules! merge {
        ($field:ident, $has:expr) => {
            for member in &ancestor.$field {
                if !$has(feature, &member.name) {
                    let mut inherited = member.clone();
                    if inherited.inherited_from.is_none() {
                        inherited.inherited_from = Some(fqn.clone());
                    }
                    if inherited.source_url.is_none() {
                        inherited.source_url = Some(origin_url.clone());
                    }
                    feature.$field.push(inherited);
                }
            }
        };
    }

    fn has_property(f: &ClassLikeFeature, name: &str) -> bool {
        f.properties.iter().any(|m| m.name == name)
    }
    fn has_method(f: &ClassLikeFeature, name: &str) -> bool {
        f.methods.iter().any(|m| m.name == name)
    }
    fn has_attribute(f: &ClassLikeFeature, name: &str) -> bool {
        f.attributes.iter().any(|m| m.name == name)
    }
    fn has_event(f: &ClassLikeFeature, name: &str) -> bool {
        f.events.iter().any(|m| m.name == name)
    }

    merge!(properties, has_property);
    merge!(methods, has_method);
    merge!(attributes, has_attribute);
    merge!(events, has_event);
}
