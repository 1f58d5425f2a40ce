//! Documentation comment builder.
//!
//! A [`DocBlock`] holds an optional summary line, an optional description
//! and an ordered map of tags. Rendering filters out suppressed tags (at any
//! depth) and lays the rest out as a normalized `/** ... */` block:
//!
//! ```
//! use php_editor::DocBlock;
//!
//! let mut doc = DocBlock::new();
//! doc.set_message("Fetch a user");
//! doc.set_tag("param", vec!["int $id", "bool $fresh"]);
//! doc.set_tag("deprecated", true);
//! doc.set_tag("internal", false);
//!
//! assert_eq!(
//!     doc.render(),
//!     "/**\n * Fetch a user\n *\n * @param int $id\n * @param bool $fresh\n *\n * @deprecated\n */"
//! );
//! ```

use std::fmt;

use indexmap::IndexMap;
use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

const MESSAGE: &str = "message";
const DESCRIPTION: &str = "description";

/// Value of a single tag.
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    /// Never rendered (`false` / `null` in JSON or YAML).
    Suppressed,
    /// Rendered as a bare `@tag` (`true`).
    Flag,
    Scalar(String),
    /// One `@tag` line per item.
    List(Vec<TagValue>),
    /// One `@tag` line per value; keys are not rendered.
    Nested(IndexMap<String, TagValue>),
}

impl TagValue {
    /// Drop suppressed entries recursively. Containers left empty are
    /// suppressed themselves.
    fn filtered(&self) -> Option<TagValue> {
        match self {
            TagValue::Suppressed => None,
            TagValue::Flag | TagValue::Scalar(_) => Some(self.clone()),
            TagValue::List(items) => {
                let items: Vec<_> = items.iter().filter_map(TagValue::filtered).collect();
                (!items.is_empty()).then_some(TagValue::List(items))
            }
            TagValue::Nested(map) => {
                let map: IndexMap<_, _> = map
                    .iter()
                    .filter_map(|(k, v)| v.filtered().map(|v| (k.clone(), v)))
                    .collect();
                (!map.is_empty()).then_some(TagValue::Nested(map))
            }
        }
    }

    fn leaves<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            TagValue::Suppressed | TagValue::Flag => {}
            TagValue::Scalar(text) => out.push(text),
            TagValue::List(items) => items.iter().for_each(|item| item.leaves(out)),
            TagValue::Nested(map) => map.values().for_each(|item| item.leaves(out)),
        }
    }

    /// Leaf texts joined by single spaces.
    pub fn to_text(&self) -> String {
        let mut leaves = Vec::new();
        self.leaves(&mut leaves);
        leaves.join(" ")
    }

    fn line(&self, tag: &str) -> String {
        match self {
            TagValue::Flag => format!("@{tag}"),
            TagValue::Scalar(text) => format!("@{tag} {text}"),
            _ => match self.to_text() {
                text if text.is_empty() => format!("@{tag}"),
                text => format!("@{tag} {text}"),
            },
        }
    }

    fn lines(&self, tag: &str) -> Vec<String> {
        match self {
            TagValue::Suppressed => Vec::new(),
            TagValue::Flag | TagValue::Scalar(_) => vec![self.line(tag)],
            TagValue::List(items) => items.iter().map(|item| item.line(tag)).collect(),
            TagValue::Nested(map) => map.values().map(|item| item.line(tag)).collect(),
        }
    }
}

impl From<&str> for TagValue {
    fn from(value: &str) -> Self {
        TagValue::Scalar(value.to_string())
    }
}

impl From<String> for TagValue {
    fn from(value: String) -> Self {
        TagValue::Scalar(value)
    }
}

impl From<bool> for TagValue {
    fn from(value: bool) -> Self {
        if value {
            TagValue::Flag
        } else {
            TagValue::Suppressed
        }
    }
}

impl<T: Into<TagValue>> From<Vec<T>> for TagValue {
    fn from(items: Vec<T>) -> Self {
        TagValue::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<IndexMap<String, TagValue>> for TagValue {
    fn from(map: IndexMap<String, TagValue>) -> Self {
        TagValue::Nested(map)
    }
}

impl Serialize for TagValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            TagValue::Suppressed => serializer.serialize_bool(false),
            TagValue::Flag => serializer.serialize_bool(true),
            TagValue::Scalar(text) => serializer.serialize_str(text),
            TagValue::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            TagValue::Nested(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (key, value) in map {
                    out.serialize_entry(key, value)?;
                }
                out.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for TagValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(TagValueVisitor)
    }
}

struct TagValueVisitor;

impl<'de> Visitor<'de> for TagValueVisitor {
    type Value = TagValue;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a boolean, string, number, list or map")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<TagValue, E> {
        Ok(v.into())
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<TagValue, E> {
        Ok(TagValue::Scalar(v.to_string()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<TagValue, E> {
        Ok(TagValue::Scalar(v.to_string()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<TagValue, E> {
        Ok(TagValue::Scalar(v.to_string()))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<TagValue, E> {
        Ok(TagValue::Scalar(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<TagValue, E> {
        Ok(TagValue::Scalar(v))
    }

    fn visit_unit<E: de::Error>(self) -> Result<TagValue, E> {
        Ok(TagValue::Suppressed)
    }

    fn visit_none<E: de::Error>(self) -> Result<TagValue, E> {
        Ok(TagValue::Suppressed)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<TagValue, D::Error> {
        TagValue::deserialize(deserializer)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<TagValue, A::Error> {
        let mut items = Vec::new();
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(TagValue::List(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<TagValue, A::Error> {
        let mut map = IndexMap::new();
        while let Some((key, value)) = access.next_entry::<String, TagValue>()? {
            map.insert(key, value);
        }
        Ok(TagValue::Nested(map))
    }
}

/// A documentation comment: summary, description and ordered tags.
///
/// (De)serializes as a single map in which `message` and `description`
/// fill the text slots and every other key is a tag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "IndexMap<String, TagValue>", into = "IndexMap<String, TagValue>")]
pub struct DocBlock {
    message: Option<String>,
    description: Option<String>,
    tags: IndexMap<String, TagValue>,
}

impl DocBlock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(message: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            description: Some(description.into()),
            tags: IndexMap::new(),
        }
    }

    /// Build a block from one map of options, where the `message` and
    /// `description` keys fill the text slots and the rest become tags.
    pub fn from_options(mut options: IndexMap<String, TagValue>) -> Self {
        let message = options.shift_remove(MESSAGE).and_then(text_slot);
        let description = options.shift_remove(DESCRIPTION).and_then(text_slot);
        Self {
            message,
            description,
            tags: options,
        }
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn set_message(&mut self, message: impl Into<String>) -> &mut Self {
        self.message = Some(message.into());
        self
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn set_description(&mut self, description: impl Into<String>) -> &mut Self {
        self.description = Some(description.into());
        self
    }

    pub fn tags(&self) -> &IndexMap<String, TagValue> {
        &self.tags
    }

    pub fn tag(&self, name: &str) -> Option<&TagValue> {
        self.tags.get(name)
    }

    /// Set a tag. Replacing an existing tag keeps its position.
    pub fn set_tag(&mut self, name: impl Into<String>, value: impl Into<TagValue>) -> &mut Self {
        self.tags.insert(name.into(), value.into());
        self
    }

    pub fn remove_tag(&mut self, name: &str) -> Option<TagValue> {
        self.tags.shift_remove(name)
    }

    /// Read any element by key: `message`, `description`, or a tag name.
    pub fn get(&self, key: &str) -> Option<TagValue> {
        match key {
            MESSAGE => self.message.clone().map(TagValue::Scalar),
            DESCRIPTION => self.description.clone().map(TagValue::Scalar),
            _ => self.tags.get(key).cloned(),
        }
    }

    /// Write any element by key: `message`, `description`, or a tag name.
    pub fn set(&mut self, key: &str, value: impl Into<TagValue>) -> &mut Self {
        let value = value.into();
        match key {
            MESSAGE => self.message = text_slot(value),
            DESCRIPTION => self.description = text_slot(value),
            _ => {
                self.tags.insert(key.to_string(), value);
            }
        }
        self
    }

    pub fn render(&self) -> String {
        let mut groups: Vec<Vec<String>> = Vec::new();

        for text in [&self.message, &self.description].into_iter().flatten() {
            if !text.is_empty() {
                groups.push(vec![text.clone()]);
            }
        }

        for (tag, value) in &self.tags {
            let Some(value) = value.filtered() else {
                continue;
            };
            let lines = value.lines(tag);
            if !lines.is_empty() {
                groups.push(lines);
            }
        }

        if groups.is_empty() {
            return "/**\n *\n */".to_string();
        }

        let body = groups
            .iter()
            .map(|group| {
                group
                    .iter()
                    .map(|line| format!(" * {line}"))
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .collect::<Vec<_>>()
            .join("\n *\n");

        format!("/**\n{body}\n */")
    }
}

fn text_slot(value: TagValue) -> Option<String> {
    match value {
        TagValue::Suppressed | TagValue::Flag => None,
        TagValue::Scalar(text) => Some(text),
        other => Some(other.to_text()),
    }
}

impl fmt::Display for DocBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl From<IndexMap<String, TagValue>> for DocBlock {
    fn from(options: IndexMap<String, TagValue>) -> Self {
        DocBlock::from_options(options)
    }
}

impl From<DocBlock> for IndexMap<String, TagValue> {
    fn from(doc: DocBlock) -> Self {
        let mut map = IndexMap::new();
        if let Some(message) = doc.message {
            map.insert(MESSAGE.to_string(), TagValue::Scalar(message));
        }
        if let Some(description) = doc.description {
            map.insert(DESCRIPTION.to_string(), TagValue::Scalar(description));
        }
        map.extend(doc.tags);
        map
    }
}
