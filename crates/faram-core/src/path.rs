//! Colon-delimited field paths.
//!
//! A path such as `"items:2:name"` walks object field names and array
//! positions. The raw segments carry no type: whether `2` is a field name or
//! an array index is decided by the schema at that depth, see [`resolve`].
//!
//! Array positions in paths are indices into the value. Error trees key array
//! children by element key instead, so every resolved [`Step`] also carries
//! the error-tree key for its segment.

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};

use crate::error::FaramError;
use crate::schema::Schema;

/// Separator between path segments.
pub const SEPARATOR: char = ':';

/// An untyped path. The empty string is the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn parse(path: &str) -> Self {
        if path.is_empty() {
            return Self::root();
        }
        Self {
            segments: path.split(SEPARATOR).map(str::to_string).collect(),
        }
    }

    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// The path with its last segment stripped; `None` for the root.
    pub fn parent(&self) -> Option<FieldPath> {
        let (_, init) = self.segments.split_last()?;
        Some(Self {
            segments: init.to_vec(),
        })
    }

    pub fn child(&self, segment: impl Into<String>) -> FieldPath {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self { segments }
    }

    /// This path followed by each ancestor, ending with the root.
    pub fn ancestors(&self) -> impl Iterator<Item = FieldPath> {
        let segments = self.segments.clone();
        (0..=segments.len())
            .rev()
            .map(move |len| FieldPath::from_segments(segments[..len].iter().cloned()))
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, "{SEPARATOR}")?;
            }
            f.write_str(segment)?;
        }
        Ok(())
    }
}

impl FromStr for FieldPath {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<&str> for FieldPath {
    fn from(path: &str) -> Self {
        Self::parse(path)
    }
}

// ---------------------------------------------------------------------------
// Schema-resolved paths
// ---------------------------------------------------------------------------

/// A typed path segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Field(String),
    Index(usize),
}

/// One resolved segment plus its key in the error trees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub segment: PathSegment,
    pub error_key: String,
}

/// A path resolved against a schema and the current value.
#[derive(Debug)]
pub struct Resolved<'s> {
    pub steps: Vec<Step>,
    /// Schema of the node the path ends at.
    pub schema: &'s Schema,
}

impl Resolved<'_> {
    pub fn segments(&self) -> Vec<PathSegment> {
        self.steps.iter().map(|s| s.segment.clone()).collect()
    }

    pub fn error_keys(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.error_key.as_str()).collect()
    }
}

/// Classify each segment of `path` by walking `schema`: object nodes take a
/// field step, array nodes an index step. Variants are chosen from the value
/// currently stored at each depth (`null` when absent).
pub fn resolve<'s>(
    path: &FieldPath,
    schema: &'s Schema,
    value: &Value,
) -> Result<Resolved<'s>, FaramError> {
    let mut steps = Vec::with_capacity(path.segments().len());
    let mut node = schema;
    let mut current = Some(value);

    for raw in path.segments() {
        let here = current.unwrap_or(&Value::Null);
        match node {
            Schema::Leaf(_) => {
                return Err(FaramError::path(
                    path,
                    format!("segment '{raw}' descends below a leaf field"),
                ));
            }
            Schema::Object(object) => {
                let child = object
                    .fields
                    .resolve(here)
                    .and_then(|fields| fields.get(raw))
                    .ok_or_else(|| FaramError::path(path, format!("unknown field '{raw}'")))?;
                steps.push(Step {
                    segment: PathSegment::Field(raw.clone()),
                    error_key: raw.clone(),
                });
                current = here.get(raw.as_str());
                node = child;
            }
            Schema::Array(array) => {
                let index: usize = raw.parse().map_err(|_| {
                    FaramError::path(path, format!("segment '{raw}' is not an array index"))
                })?;
                let element = here.get(index);
                let element_value = element.unwrap_or(&Value::Null);
                let member = array.member.resolve(element_value).ok_or_else(|| {
                    FaramError::path(path, format!("no member schema for element {index}"))
                })?;
                steps.push(Step {
                    segment: PathSegment::Index(index),
                    error_key: array.key_of(element_value, index),
                });
                current = element;
                node = member;
            }
        }
    }

    tracing::trace!(path = %path, depth = steps.len(), "resolved path");
    Ok(Resolved {
        steps,
        schema: node,
    })
}

// ---------------------------------------------------------------------------
// Value access
// ---------------------------------------------------------------------------

/// Read the value at `path`, indexing objects by name and arrays by position.
/// `None` as soon as an intermediate is missing.
pub fn lookup<'v>(value: &'v Value, path: &FieldPath) -> Option<&'v Value> {
    path.segments()
        .iter()
        .try_fold(value, |node, segment| match node {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
}

/// Mutable slot at `segments`, creating missing containers on the way:
/// `{}` for field steps, `[]` for index steps, arrays padded with `null`.
pub fn slot_mut<'v>(value: &'v mut Value, segments: &[PathSegment]) -> Option<&'v mut Value> {
    segments.iter().try_fold(value, |node, segment| match segment {
        PathSegment::Field(name) => {
            if !node.is_object() {
                *node = Value::Object(Map::new());
            }
            let map = node.as_object_mut()?;
            Some(map.entry(name.clone()).or_insert(Value::Null))
        }
        PathSegment::Index(index) => {
            if !node.is_array() {
                *node = Value::Array(Vec::new());
            }
            let items = node.as_array_mut()?;
            if items.len() <= *index {
                items.resize(*index + 1, Value::Null);
            }
            items.get_mut(*index)
        }
    })
}

/// Mutable slot at `segments` without creating anything.
pub fn existing_mut<'v>(value: &'v mut Value, segments: &[PathSegment]) -> Option<&'v mut Value> {
    segments.iter().try_fold(value, |node, segment| match segment {
        PathSegment::Field(name) => node.as_object_mut()?.get_mut(name),
        PathSegment::Index(index) => node.as_array_mut()?.get_mut(*index),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::KeySelector;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn schema() -> Schema {
        Schema::object([(
            "items",
            Schema::array(
                Schema::object([("key", Schema::leaf([])), ("name", Schema::leaf([]))]),
                KeySelector::field("key"),
            ),
        )])
    }

    #[test]
    fn test_parse_and_display() {
        let path = FieldPath::parse("a:b:2:c");
        assert_eq!(path.segments(), ["a", "b", "2", "c"]);
        assert_eq!(path.to_string(), "a:b:2:c");
        assert!(FieldPath::parse("").is_root());
        assert_eq!(FieldPath::root().to_string(), "");
    }

    #[test]
    fn test_ancestors_end_at_root() {
        let ancestors: Vec<String> = FieldPath::parse("a:b:c")
            .ancestors()
            .map(|p| p.to_string())
            .collect();
        assert_eq!(ancestors, ["a:b:c", "a:b", "a", ""]);
        assert_eq!(FieldPath::parse("a").parent(), Some(FieldPath::root()));
        assert_eq!(FieldPath::root().parent(), None);
    }

    #[test]
    fn test_resolve_classifies_segments() {
        let schema = schema();
        let value = json!({ "items": [{ "key": "k0" }, { "key": "k1" }] });
        let resolved = resolve(&FieldPath::parse("items:1:name"), &schema, &value).unwrap();

        assert_eq!(
            resolved.segments(),
            vec![
                PathSegment::Field("items".into()),
                PathSegment::Index(1),
                PathSegment::Field("name".into()),
            ]
        );
        assert_eq!(resolved.error_keys(), ["items", "k1", "name"]);
        assert_eq!(resolved.schema.kind(), "leaf");
    }

    #[test]
    fn test_resolve_rejects_bad_paths() {
        let schema = schema();
        let value = json!({});
        for bad in ["nope", "items:x", "items:0:name:deeper"] {
            let err = resolve(&FieldPath::parse(bad), &schema, &value).unwrap_err();
            assert!(matches!(err, FaramError::PathError { .. }), "{bad}: {err}");
        }
    }

    #[test]
    fn test_slot_mut_creates_containers() {
        let mut value = Value::Null;
        let segments = [
            PathSegment::Field("items".into()),
            PathSegment::Index(2),
            PathSegment::Field("name".into()),
        ];
        *slot_mut(&mut value, &segments).unwrap() = json!("x");
        assert_eq!(value, json!({ "items": [null, null, { "name": "x" }] }));
    }

    #[test]
    fn test_lookup_and_existing_mut() {
        let mut value = json!({ "items": [{ "name": "a" }] });
        assert_eq!(
            lookup(&value, &FieldPath::parse("items:0:name")),
            Some(&json!("a"))
        );
        assert_eq!(lookup(&value, &FieldPath::parse("items:3:name")), None);
        assert_eq!(lookup(&value, &FieldPath::root()), Some(&value.clone()));

        let missing = [PathSegment::Field("other".into())];
        assert!(existing_mut(&mut value, &missing).is_none());
        assert_eq!(value, json!({ "items": [{ "name": "a" }] }));
    }
}
