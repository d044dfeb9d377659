//! JSDoc annotation data consumed by the scanners.
//!
//! The JSDoc micro-parser itself is an external collaborator; this
//! module defines the shape scanners consume (`JsDoc`) and ships a small
//! default parser adequate for the annotation vocabulary the scanners rely
//! on (`@public`/`@private`/`@protected`, `@memberof`, `@param`, `@returns`,
//! `@polymerBehavior`, `@polymerMixin`, `@customElement`, `@demo`).

/// A single `@tag value` annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsDocTag {
    /// The tag name, without the leading `@`.
    pub tag: String,
    /// The remainder of the tag line.
    pub text: String,
}

/// Parsed content of a `/**... */` comment block.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JsDoc {
    /// The free-form description text (everything before the first tag).
    pub description: String,
    /// Tags in source order.
    pub tags: Vec<JsDocTag>,
}

impl JsDoc {
    /// Parses a raw comment body (without the `/**`/`*/` delimiters or
    /// leading ` * ` gutters) into structured tags.
    pub fn parse(raw: &str) -> Self {
        let mut description = String::new();
        let mut tags = Vec::new();

        for line in raw.lines() {
            let line = line.trim().trim_start_matches('*').trim();
            if let Some(rest) = line.strip_prefix('@') {
                let (tag, text) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
                tags.push(JsDocTag {
                        tag: tag.to_string(),
                        text: text.trim().to_string(),
                    });
            } else if tags.is_empty() {
                if !description.is_empty() {
                    description.push('\n');
                }
                description.push_str(line);
            }
        }

        Self {
            description: description.trim().to_string(),
            tags,
        }
    }

    /// Returns the first tag with the given name, if present.
    pub fn tag(&self, name: &str) -> Option<&JsDocTag> {
        self.tags.iter().find(|t| t.tag == name)
    }

    /// Returns `true` if a tag with the given name is present.
    pub fn has_tag(&self, name: &str) -> bool {
        self.tag(name).is_some()
    }

    /// Returns all tags with the given name, in source order.
    pub fn tags_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a JsDocTag> {
        self.tags.iter().filter(move |t| t.tag == name)
    }

    /// Parses `@param {type} name description` tags into an ordered map.
    pub fn params(&self) -> Vec<(String, Option<String>)> {
        self.tags_named("param")
            .filter_map(|t| {
                let mut text = t.text.as_str();
                let mut ty = None;
                if let Some(stripped) = text.strip_prefix('{') {
                    let (inner, rest) = stripped.split_once('}')?;
                    ty = Some(inner.to_string());
                    text = rest.trim();
                }
                let name = text.split_whitespace().next()?.to_string();
                Some((name, ty))
            })
            .collect()
    }

    /// Returns the `@memberof` namespace, if any.
    pub fn memberof(&self) -> Option<&str> {
        self.tag("memberof").map(|t| t.text.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_description_from_tags() {
        let jsdoc = JsDoc::parse(
            "\n * A mixin that does things.\n * @polymerMixin\n * @demo demo/index.html\n ",
        );
        assert_eq!(jsdoc.description, "A mixin that does things.");
        assert!(jsdoc.has_tag("polymerMixin"));
        assert_eq!(jsdoc.tag("demo").unwrap().text, "demo/index.html");
    }

    #[test]
    fn parses_typed_and_untyped_params() {
        let jsdoc = JsDoc::parse("@param {string} name the name\n@param count");
        assert_eq!(
            jsdoc.params(),
            vec![
                ("name".to_string(), Some("string".to_string())),
                ("count".to_string(), None),
            ]
        );
    }

    #[test]
    fn memberof_reads_the_namespace_text() {
        let jsdoc = JsDoc::parse("@memberof MyNamespace");
        assert_eq!(jsdoc.memberof(), Some("MyNamespace"));
    }
}
