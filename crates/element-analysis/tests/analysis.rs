//! End-to-end tests driving [`element_analysis::AnalysisContext`] against a
//! real, on-disk document set rather than the in-memory fixtures the unit
//! tests use, exercising the [`element_analysis::url::Loader`] seam the way
//! a real embedder would.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

use element_analysis::url::{CanonicalUrl, Loader, StandardUrlResolver, UrlResolver};
use element_analysis::{AnalysisContext, Config, FeatureKind};

/// Loads documents straight off disk, resolving `file://` URLs back to local
/// paths. Good enough to drive the engine end to end in a test; a real
/// embedder's loader is an external collaborator this crate never ships one
/// of for production use.
#[derive(Debug)]
struct FilesystemLoader;

#[async_trait]
impl Loader for FilesystemLoader {
    fn can_load(&self, url: &CanonicalUrl) -> bool {
        url_to_path(url).is_some()
    }

    async fn load(&self, url: &CanonicalUrl) -> anyhow::Result<Vec<u8>> {
        let path = url_to_path(url).ok_or_else(|| anyhow::anyhow!("not a file:// url: {url}"))?;
        Ok(fs::read(path)?)
    }
}

fn url_to_path(url: &CanonicalUrl) -> Option<std::path::PathBuf> {
    url::Url::parse(url.as_str()).ok()?.to_file_path().ok()
}

fn write(dir: &Path, name: &str, contents: &str) -> CanonicalUrl {
    let path = dir.join(name);
    fs::write(&path, contents).expect("fixture file writes");
    url::Url::from_file_path(&path).expect("absolute path").into()
}

fn context() -> AnalysisContext {
    AnalysisContext::with_defaults(Config::new(), Arc::new(FilesystemLoader), Arc::new(StandardUrlResolver))
}

/// An element whose `behaviors` chain two levels deep, across two
/// `<link rel="import">`-linked documents, surfaces every ancestor's
/// properties, tagging each with the ancestor that actually declared it,
/// plus its own public/protected/private properties.
#[tokio::test]
async fn element_with_chained_behaviors_surfaces_the_full_inheritance_chain() {
    let dir = TempDir::new().expect("tempdir");

    write(
        dir.path(),
        "sub-behavior.html",
        r#"
<script>
/** @polymerBehavior MyNamespace.SubBehavior */
MyNamespace.SubBehavior = {
 properties: {
 deeplyInheritedProperty: {
 type: Array,
 value: function() { return []; },
 notify: true,
 },
 },
};
</script>
"#,
    );

    write(
        dir.path(),
        "simple-behavior.html",
        r#"
<link rel="import" href="sub-behavior.html">
<script>
/** @polymerBehavior MyNamespace.SimpleBehavior */
MyNamespace.SimpleBehavior = {
 behaviors: [MyNamespace.SubBehavior],
 properties: {
 inheritPlease: {
 type: String,
 },
 },
};
</script>
"#,
    );

    let element_url = write(
        dir.path(),
        "my-element.html",
        r#"
<link rel="import" href="simple-behavior.html">
<dom-module id="my-element">
<script>
/**
 * @customElement
 * @polymer
 */
class MyElement extends Polymer.Element {
 static get is() { return 'my-element'; }
 static get properties() {
 return {
 localProperty: { type: Boolean, value: true },
 _protectedProperty: { type: String, value: "do cool stuff with me!" },
 __privateProperty: { type: String },
 };
 }
 static get behaviors() {
 return [MyNamespace.SimpleBehavior];
 }
}
customElements.define('my-element', MyElement);
</script>
</dom-module>
"#,
    );

    let ctx = context();
    let ctx = ctx
        .analyze([element_url.clone()], None)
        .await
        .expect("analysis completes");
    let document = ctx.get_document(&element_url).await.expect("document resolves");

    let element = document
        .find_own_class_like("MyElement")
        .expect("MyElement was scanned as an element");

    let mut property_names: Vec<&str> = element.properties.iter().map(|p| p.name.as_str()).collect();
    property_names.sort_unstable();
    assert_eq!(
        property_names,
        vec![
            "__privateProperty",
            "_protectedProperty",
            "deeplyInheritedProperty",
            "inheritPlease",
            "localProperty",
        ]
    );

    let deeply_inherited = element
        .properties
        .iter()
        .find(|p| p.name == "deeplyInheritedProperty")
        .unwrap();
    assert_eq!(deeply_inherited.inherited_from.as_deref(), Some("MyNamespace.SubBehavior"));

    let inherit_please = element.properties.iter().find(|p| p.name == "inheritPlease").unwrap();
    assert_eq!(inherit_please.inherited_from.as_deref(), Some("MyNamespace.SimpleBehavior"));

    let local = element.properties.iter().find(|p| p.name == "localProperty").unwrap();
    assert_eq!(local.inherited_from, None);
}

/// Confirms the engine follows transitive imports across real files (not
/// just in-memory fixtures) and that `files_changed` invalidation is visible
/// through the same on-disk loader.
#[tokio::test]
async fn files_changed_invalidates_a_document_loaded_from_disk() {
    let dir = TempDir::new().expect("tempdir");
    let url = write(dir.path(), "a.js", "class Foo extends HTMLElement {}");

    let ctx = context();
    let ctx = ctx.analyze([url.clone()], None).await.expect("first analysis");
    let first = ctx.get_document(&url).await.expect("resolves");
    assert!(first.find_own_class_like("Foo").is_some());

    fs::write(dir.path().join("a.js"), "class Bar extends HTMLElement {}").unwrap();

    let forked = ctx.files_changed([url.clone()]);
    let second = forked.get_document(&url).await.expect("resolves again after invalidation");
    assert!(second.find_own_class_like("Bar").is_some());
    assert!(second.find_own_class_like("Foo").is_none());
}

/// Sanity check end to end: a document mixing a plain class, an
/// annotated mixin, and a `customElements.define`-registered element is
/// scanned into exactly the three distinct class-like features, not
/// duplicated as plain classes.
#[tokio::test]
async fn a_mixed_document_scans_into_distinct_class_like_kinds() {
    let dir = TempDir::new().expect("tempdir");
    let url = write(
        dir.path(),
        "mixed.js",
        r#"
class PlainClass {}

/** @polymerMixin */
const AnnotatedMixin = (base) => class extends base {};

class RegisteredElement extends HTMLElement {}
customElements.define('registered-element', RegisteredElement);
"#,
    );

    let ctx = context();
    let ctx = ctx.analyze([url.clone()], None).await.expect("analysis completes");
    let document = ctx.get_document(&url).await.expect("document resolves");

    let classes: Vec<&str> = document
        .features_of_kind(FeatureKind::Class)
        .filter_map(|f| f.as_class_like())
        .map(|c| c.name.as_str())
        .collect();
    assert_eq!(classes, vec!["PlainClass"]);

    assert!(document.find_own_class_like("AnnotatedMixin").is_some());
    assert!(document
            .features_of_kind(FeatureKind::Element)
            .filter_map(|f| f.as_class_like())
            .any(|c| c.tag_name.as_deref() == Some("registered-element")));
}
