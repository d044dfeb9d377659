//! Privacy inference and the property-name/attribute-name conversion rules
//! the scanners and summary emitter share.

use crate::jsdoc::JsDoc;

/// The visibility of a scanned or resolved feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Privacy {
    /// Visible to all consumers.
    Public,
    /// Visible to subclasses and the defining package.
    Protected,
    /// Visible only within the defining document.
    Private,
}

/// Infers a feature's privacy from an explicit JSDoc annotation, falling back
/// to the underscore naming convention, and finally to `default_private`
///.
///
/// Precedence: explicit `@public`/`@private`/`@protected` always wins. Absent
/// an explicit annotation, a name starting with `__` is private, a single
/// leading `_` is protected, and anything else follows `default_private`.
pub fn get_or_infer_privacy(name: &str, jsdoc: Option<&JsDoc>, default_private: bool) -> Privacy {
    if let Some(jsdoc) = jsdoc {
        if jsdoc.has_tag("public") {
            return Privacy::Public;
        }
        if jsdoc.has_tag("private") {
            return Privacy::Private;
        }
        if jsdoc.has_tag("protected") {
            return Privacy::Protected;
        }
    }

    if name.starts_with("__") {
        Privacy::Private
    } else if name.starts_with('_') {
        Privacy::Protected
    } else if default_private {
        Privacy::Private
    } else {
        Privacy::Public
    }
}

/// Converts a property name to its corresponding attribute name.
///
/// Rejects names starting with an upper-case letter (returns `None`);
/// otherwise inserts a `-` before each upper-case letter and lower-cases the
/// whole name, e.g. `myProperty` -> `my-property`.
pub fn property_name_to_attribute_name(property: &str) -> Option<String> {
    let mut chars = property.chars();
    let first = chars.next()?;
    if first.is_uppercase() {
        return None;
    }

    let mut attribute = String::with_capacity(property.len() + 2);
    attribute.push(first);
    for c in chars {
        if c.is_uppercase() {
            attribute.push('-');
            attribute.extend(c.to_lowercase());
        } else {
            attribute.push(c);
        }
    }

    Some(attribute)
}

/// The inverse of [`property_name_to_attribute_name`]: inserts a capital
/// letter after each `-` and removes the dash, e.g. `my-property` ->
/// `myProperty`. Used only to validate the round-trip invariant and
/// by tooling that needs to recover a property name from an attribute name.
pub fn attribute_name_to_property_name(attribute: &str) -> String {
    let mut property = String::with_capacity(attribute.len());
    let mut chars = attribute.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '-' {
            if let Some(next) = chars.next() {
                property.extend(next.to_uppercase());
            }
        } else {
            property.push(c);
        }
    }
    property
}

/// Derives the `{attribute}-changed` event name emitted for a published,
/// notifying property.
pub fn changed_event_name(attribute: &str) -> String {
    format!("{attribute}-changed")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_upper_case_leading_names() {
        assert_eq!(property_name_to_attribute_name("MyProperty"), None);
    }

    #[test]
    fn converts_camel_case() {
        assert_eq!(
            property_name_to_attribute_name("myCoolProperty").as_deref(),
            Some("my-cool-property")
        );
        assert_eq!(
            property_name_to_attribute_name("simple").as_deref(),
            Some("simple")
        );
    }

    #[test]
    fn round_trips_through_the_inverse() {
        for name in ["myProperty", "aBCName", "simple", "deeplyInheritedProperty"] {
            let attribute = property_name_to_attribute_name(name).expect("should convert");
            assert_eq!(attribute_name_to_property_name(&attribute), name);
        }
    }

    #[test]
    fn infers_privacy_from_underscore_convention() {
        assert_eq!(
            get_or_infer_privacy("localProperty", None, false),
            Privacy::Public
        );
        assert_eq!(
            get_or_infer_privacy("_protectedProperty", None, false),
            Privacy::Protected
        );
        assert_eq!(
            get_or_infer_privacy("__privateProperty", None, false),
            Privacy::Private
        );
    }

    #[test]
    fn explicit_jsdoc_annotation_wins() {
        let jsdoc = JsDoc::parse("@private");
        assert_eq!(
            get_or_infer_privacy("publicLookingName", Some(&jsdoc), false),
            Privacy::Private
        );
    }
}
