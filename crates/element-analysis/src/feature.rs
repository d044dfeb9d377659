//! The scanned-feature data model.
//!
//! A [`ScannedFeature`] is a lightweight, pre-resolution description of a
//! declaration, scoped to the document that defined it. [`FeatureResolver`]
//! (see [`crate::resolver`]) lifts these into resolved features with
//! inheritance materialized.

use crate::jsdoc::JsDoc;
use crate::privacy::Privacy;
use crate::url::CanonicalUrl;
use crate::warning::{SourceRange, Warning};

/// Discriminates the kind of a scanned or resolved feature, used for
/// `get_features({kind,...})` queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FeatureKind {
    /// A recognized import.
    Import,
    /// An inline sub-document (script/style block).
    InlineDocument,
    /// A plain ES class.
    Class,
    /// A plain function.
    Function,
    /// A namespace object literal.
    Namespace,
    /// A custom element declaration.
    Element,
    /// An element mixin.
    Mixin,
    /// A behavior object literal.
    Behavior,
    /// A *use* of a custom element in markup.
    ElementReference,
    /// A named slot declared inside an element's template.
    Slot,
}

/// A documented, published property on a class-like feature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyMember {
    /// The property's name.
    pub name: String,
    /// The declared or inferred type, if known.
    pub type_: Option<String>,
    /// The default value's source text, if any.
    pub default_value: Option<String>,
    /// Whether changes to the property fire a `{attribute}-changed` event.
    pub notify: bool,
    /// Whether the property is read-only from the outside.
    pub read_only: bool,
    /// Visibility.
    pub privacy: Privacy,
    /// A one-line summary, if documented.
    pub description: String,
    /// The fully-qualified name of the ancestor this member came from, if
    /// inherited.
    pub inherited_from: Option<String>,
    /// The source range of the declaration.
    pub range: SourceRange,
    /// The document this member was declared in, set only once the member
    /// has been flattened onto a descendant from a different document
    /// (inherited `sourceRange.file` is relative to the *element's*
    /// directory, not the package root, which requires knowing which file
    /// the member actually lives in). `None` means "the owning feature's own
    /// document".
    pub source_url: Option<CanonicalUrl>,
}

/// A method on a class-like feature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodMember {
    /// The method's name.
    pub name: String,
    /// Parameter `(name, type)` pairs, in declaration order.
    pub params: Vec<(String, Option<String>)>,
    /// The declared return type, if any.
    pub return_type: Option<String>,
    /// Visibility.
    pub privacy: Privacy,
    /// A one-line summary, if documented.
    pub description: String,
    /// The fully-qualified name of the ancestor this member came from, if
    /// inherited.
    pub inherited_from: Option<String>,
    /// The source range of the declaration.
    pub range: SourceRange,
    /// The document this member was declared in, set once flattened onto a
    /// descendant from a different document. `None` means "the
    /// owning feature's own document".
    pub source_url: Option<CanonicalUrl>,
}

/// An observed attribute on a custom element, derived from a published
/// property or declared directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeMember {
    /// The attribute's name.
    pub name: String,
    /// A one-line summary, if documented.
    pub description: String,
    /// The fully-qualified name of the ancestor this member came from, if
    /// inherited.
    pub inherited_from: Option<String>,
    /// The source range of the declaration.
    pub range: SourceRange,
    /// The document this member was declared in, set once flattened onto a
    /// descendant from a different document. `None` means "the
    /// owning feature's own document".
    pub source_url: Option<CanonicalUrl>,
}

/// An event fired by a class-like feature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventMember {
    /// The event's name.
    pub name: String,
    /// A one-line summary, if documented.
    pub description: String,
    /// The fully-qualified name of the ancestor this member came from, if
    /// inherited.
    pub inherited_from: Option<String>,
    /// The source range of the declaration.
    pub range: SourceRange,
    /// The document this member was declared in, set once flattened onto a
    /// descendant from a different document. `None` means "the
    /// owning feature's own document".
    pub source_url: Option<CanonicalUrl>,
}

/// A named slot declared inside an element's template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotMember {
    /// The slot's name (empty string for the default slot).
    pub name: String,
    /// A one-line summary, if documented.
    pub description: String,
    /// The source range of the declaration.
    pub range: SourceRange,
}

/// Discriminates the flavor of a [`ClassLikeFeature`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassLikeKind {
    /// A plain ES class with no framework recognition.
    Class,
    /// A custom element declaration.
    Element,
    /// An element mixin.
    Mixin,
    /// A behavior object literal.
    Behavior,
}

impl From<ClassLikeKind> for FeatureKind {
    fn from(kind: ClassLikeKind) -> Self {
        match kind {
            ClassLikeKind::Class => FeatureKind::Class,
            ClassLikeKind::Element => FeatureKind::Element,
            ClassLikeKind::Mixin => FeatureKind::Mixin,
            ClassLikeKind::Behavior => FeatureKind::Behavior,
        }
    }
}

/// A class, element, mixin, or behavior declaration, scanned but not yet
/// resolved.
///
/// These four variants share a "has-members" shape: a single
/// [`ClassLikeFeature`] type models all of them, discriminated by `kind`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassLikeFeature {
    /// Which of the four class-like flavors this is.
    pub kind: ClassLikeKind,
    /// The feature's name, as bound in its defining scope (may be dotted,
    /// e.g. `Namespace.AlsoAssignment`).
    pub name: String,
    /// The custom element tag name, if this is an [`ClassLikeKind::Element`].
    pub tag_name: Option<String>,
    /// The unresolved name of the superclass being extended, if any.
    pub superclass: Option<String>,
    /// Unresolved mixin application identifiers, in application order.
    pub mixins: Vec<String>,
    /// Unresolved behavior reference identifiers, in declaration order.
    pub behaviors: Vec<String>,
    /// Own (non-inherited) properties.
    pub properties: Vec<PropertyMember>,
    /// Own (non-inherited) methods.
    pub methods: Vec<MethodMember>,
    /// Own (non-inherited) attributes.
    pub attributes: Vec<AttributeMember>,
    /// Own (non-inherited) events.
    pub events: Vec<EventMember>,
    /// Own (non-inherited) slots.
    pub slots: Vec<SlotMember>,
    /// Demo page paths, as declared in JSDoc `@demo` tags.
    pub demos: Vec<String>,
    /// Free-form description text.
    pub description: String,
    /// A one-line summary.
    pub summary: String,
    /// Declared CSS custom properties/mixins available for styling.
    pub styling: Vec<String>,
    /// Visibility.
    pub privacy: Privacy,
    /// Warnings raised while scanning this feature.
    pub warnings: Vec<Warning>,
    /// The source range of the declaration.
    pub range: SourceRange,
}

impl ClassLikeFeature {
    /// Constructs an empty class-like feature of the given kind and name.
    pub fn new(kind: ClassLikeKind, name: impl Into<String>, range: SourceRange) -> Self {
        Self {
            kind,
            name: name.into(),
            tag_name: None,
            superclass: None,
            mixins: Vec::new(),
            behaviors: Vec::new(),
            properties: Vec::new(),
            methods: Vec::new(),
            attributes: Vec::new(),
            events: Vec::new(),
            slots: Vec::new(),
            demos: Vec::new(),
            description: String::new(),
            summary: String::new(),
            styling: Vec::new(),
            privacy: Privacy::Public,
            warnings: Vec::new(),
            range,
        }
    }

    /// The chain of ancestor identifiers this feature references directly:
    /// superclass first, then mixins, then behaviors, matching the
    /// resolver's prototype-chain order.
    pub fn ancestor_references(&self) -> Vec<&str> {
        let mut refs = Vec::new();
        if let Some(superclass) = &self.superclass {
            refs.push(superclass.as_str());
        }
        refs.extend(self.mixins.iter().map(String::as_str));
        refs.extend(self.behaviors.iter().map(String::as_str));
        refs
    }
}

/// A recognized `import` reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportFeature {
    /// The href as written in the source.
    pub href: String,
    /// The warning raised resolving or scanning the import, if any (/// attached here rather than failing the importer).
    pub warning: Option<Warning>,
    /// The source range of the import declaration.
    pub range: SourceRange,
}

/// A script or style block embedded in a markup document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineDocumentFeature {
    /// The inline document's synthetic type (e.g. `"js"`, `"css"`).
    pub doc_type: String,
    /// The raw inline source text.
    pub source: String,
    /// Location offset used to map nested source ranges back to the outer
    /// file (line, column, filename).
    pub location_offset: (u32, u32, String),
    /// The source range of the inline block within the outer document.
    pub range: SourceRange,
}

/// A plain function declaration documented with `@memberof`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionFeature {
    /// The function's name.
    pub name: String,
    /// The namespace it is a member of.
    pub memberof: Option<String>,
    /// Parameter `(name, type)` pairs.
    pub params: Vec<(String, Option<String>)>,
    /// The declared return type, if any.
    pub return_type: Option<String>,
    /// Visibility.
    pub privacy: Privacy,
    /// Free-form description text.
    pub description: String,
    /// The source range of the declaration.
    pub range: SourceRange,
}

/// A namespace object literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceFeature {
    /// The namespace's dotted name.
    pub name: String,
    /// Free-form description text.
    pub description: String,
    /// The source range of the declaration.
    pub range: SourceRange,
}

/// A *use* of a custom element in markup, as opposed to its declaration
///.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementReferenceFeature {
    /// The tag name used.
    pub tag_name: String,
    /// The attributes present on the usage, with per-attribute ranges.
    pub attributes: Vec<AttributeMember>,
    /// The source range of the usage.
    pub range: SourceRange,
}

/// A slot declared inside a `<dom-module>` template, not yet attached to the
/// element that declares it.
///
/// `owner_tag` names the element this slot belongs to (the enclosing
/// `dom-module`'s `id`); [`crate::resolver::resolve`] attaches it onto the
/// matching [`ClassLikeFeature`] of [`ClassLikeKind::Element`] in the same
/// scanned document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotFeature {
    /// The tag name of the element this slot's template belongs to.
    pub owner_tag: String,
    /// The slot's name (empty string for the default slot).
    pub name: String,
    /// A one-line summary, if documented.
    pub description: String,
    /// The source range of the `<slot>` tag.
    pub range: SourceRange,
}

/// A scanned feature: one AST-level declaration recognized by a scanner
///.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScannedFeature {
    /// A recognized import.
    Import(ImportFeature),
    /// An inline sub-document.
    InlineDocument(InlineDocumentFeature),
    /// A class, element, mixin, or behavior declaration.
    ClassLike(ClassLikeFeature),
    /// A plain function.
    Function(FunctionFeature),
    /// A namespace object literal.
    Namespace(NamespaceFeature),
    /// A use of a custom element in markup.
    ElementReference(ElementReferenceFeature),
    /// A slot declared in an element's template, pending attachment.
    Slot(SlotFeature),
}

impl ScannedFeature {
    /// Returns this feature's [`FeatureKind`].
    pub fn kind(&self) -> FeatureKind {
        match self {
            Self::Import(_) => FeatureKind::Import,
            Self::InlineDocument(_) => FeatureKind::InlineDocument,
            Self::ClassLike(c) => c.kind.into(),
            Self::Function(_) => FeatureKind::Function,
            Self::Namespace(_) => FeatureKind::Namespace,
            Self::ElementReference(_) => FeatureKind::ElementReference,
            Self::Slot(_) => FeatureKind::Slot,
        }
    }

    /// Returns the feature's identifier, where one applies (the name for
    /// named declarations, the tag name for element references).
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Import(_) | Self::InlineDocument(_) => None,
            Self::ClassLike(c) => Some(&c.name),
            Self::Function(f) => Some(&f.name),
            Self::Namespace(n) => Some(&n.name),
            Self::ElementReference(e) => Some(&e.tag_name),
            Self::Slot(s) => Some(&s.name),
        }
    }

    /// Returns the feature's source range.
    pub fn range(&self) -> SourceRange {
        match self {
            Self::Import(i) => i.range,
            Self::InlineDocument(i) => i.range,
            Self::ClassLike(c) => c.range,
            Self::Function(f) => f.range,
            Self::Namespace(n) => n.range,
            Self::ElementReference(e) => e.range,
            Self::Slot(s) => s.range,
        }
    }

    /// Borrows the inner [`ClassLikeFeature`], if this is one.
    pub fn as_class_like(&self) -> Option<&ClassLikeFeature> {
        match self {
            Self::ClassLike(c) => Some(c),
            _ => None,
        }
    }

    /// Mutably borrows the inner [`ClassLikeFeature`], if this is one.
    pub fn as_class_like_mut(&mut self) -> Option<&mut ClassLikeFeature> {
        match self {
            Self::ClassLike(c) => Some(c),
            _ => None,
        }
    }
}

/// Attaches JSDoc metadata to a feature that has already been constructed,
/// shared by every scanner.
pub fn apply_common_jsdoc(description: &mut String, summary: &mut String, jsdoc: &JsDoc) {
    if description.is_empty() {
        description.push_str(&jsdoc.description);
    }
    if summary.is_empty() {
        *summary = jsdoc
            .description
            .lines()
            .next()
            .unwrap_or_default()
            .to_string();
    }
}
