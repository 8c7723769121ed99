//! Declarative schema documents.
//!
//! Builds a [`Schema`] from JSON so schemas can live in files:
//!
//! | Node   | Document shape                                                   |
//! |--------|------------------------------------------------------------------|
//! | Leaf   | `["required", { "rule": "lengthLessThan", "value": 20 }]`       |
//! | Object | `{ "fields": { "name": <node> } }`                               |
//! | Array  | `{ "member": <node>, "keySelector": "id" }`                      |
//!
//! With `"identifier": "<field>"`, `fields` (or `member`) becomes a map from
//! variant name to fields (or member node); `"default"` is the fallback.
//!
//! Malformed documents fail fast with the JSON Pointer of the offending node.

use std::borrow::Cow;
use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::FaramError;
use crate::rules;
use crate::schema::{ArraySchema, Identifier, KeySelector, ObjectSchema, Rule, Schema, Variants};

/// Deepest nesting a schema document may have.
pub const MAX_DEPTH: usize = 64;

const NODE_KEYS: &[&str] = &["fields", "member", "keySelector", "identifier"];

/// Compile a declarative schema document.
pub fn compile_schema(document: &Value) -> Result<Schema, FaramError> {
    compile_node(document, "#", 0)
}

/// Parse and compile a schema document from a JSON string.
pub fn compile_schema_str(document: &str) -> Result<Schema, FaramError> {
    let value: Value = serde_json::from_str(document)?;
    compile_schema(&value)
}

// ---------------------------------------------------------------------------
// JSON Pointer paths (RFC 6901) for error reporting
// ---------------------------------------------------------------------------

fn escape_pointer_segment(segment: &str) -> Cow<'_, str> {
    if segment.contains('~') || segment.contains('/') {
        Cow::Owned(segment.replace('~', "~0").replace('/', "~1"))
    } else {
        Cow::Borrowed(segment)
    }
}

fn build_path(parent: &str, segments: &[&str]) -> String {
    let mut path = parent.to_string();
    for segment in segments {
        path.push('/');
        path.push_str(&escape_pointer_segment(segment));
    }
    path
}

// ---------------------------------------------------------------------------
// Nodes
// ---------------------------------------------------------------------------

fn compile_node(node: &Value, path: &str, depth: usize) -> Result<Schema, FaramError> {
    if depth > MAX_DEPTH {
        return Err(FaramError::schema(
            path,
            format!("schema nesting exceeds {MAX_DEPTH} levels"),
        ));
    }

    match node {
        Value::Array(rules) => compile_leaf(rules, path),
        Value::Object(obj) => {
            for key in obj.keys().filter(|k| !NODE_KEYS.contains(&k.as_str())) {
                tracing::warn!(path, key = %key, "ignoring unknown schema keyword");
            }
            match (obj.get("fields"), obj.get("member")) {
                (Some(fields), None) => compile_object(obj, fields, path, depth),
                (None, Some(member)) => compile_array(obj, member, path, depth),
                (Some(_), Some(_)) => Err(FaramError::schema(
                    path,
                    "a node cannot declare both `fields` and `member`",
                )),
                (None, None) => Err(FaramError::schema(
                    path,
                    "expected a rule list, `fields` or `member`",
                )),
            }
        }
        other => Err(FaramError::schema(
            path,
            format!("expected a rule list or an object, found {}", type_name(other)),
        )),
    }
}

fn compile_object(
    obj: &Map<String, Value>,
    fields: &Value,
    path: &str,
    depth: usize,
) -> Result<Schema, FaramError> {
    let fields_path = build_path(path, &["fields"]);
    let fields = as_object(fields, &fields_path)?;

    let schema = match identifier(obj, path)? {
        None => ObjectSchema::new(compile_fields(fields, &fields_path, depth)?),
        Some(identifier) => {
            let mut variants = Variants::new(identifier);
            for (name, variant) in fields {
                let variant_path = build_path(&fields_path, &[name.as_str()]);
                let variant_fields = as_object(variant, &variant_path)?;
                variants = variants.variant(
                    name.clone(),
                    compile_fields(variant_fields, &variant_path, depth)?,
                );
            }
            ObjectSchema::with_variants(variants)
        }
    };
    Ok(schema.into())
}

fn compile_fields(
    fields: &Map<String, Value>,
    path: &str,
    depth: usize,
) -> Result<BTreeMap<String, Schema>, FaramError> {
    fields
        .iter()
        .map(|(name, node)| {
            let field_path = build_path(path, &[name.as_str()]);
            Ok((name.clone(), compile_node(node, &field_path, depth + 1)?))
        })
        .collect()
}

fn compile_array(
    obj: &Map<String, Value>,
    member: &Value,
    path: &str,
    depth: usize,
) -> Result<Schema, FaramError> {
    let member_path = build_path(path, &["member"]);
    let key_selector = match obj.get("keySelector") {
        None => KeySelector::index(),
        Some(Value::String(field)) => KeySelector::field(field.clone()),
        Some(other) => {
            return Err(FaramError::schema(
                &build_path(path, &["keySelector"]),
                format!("expected a field name, found {}", type_name(other)),
            ))
        }
    };

    let schema = match identifier(obj, path)? {
        None => ArraySchema::new(
            compile_node(member, &member_path, depth + 1)?,
            key_selector,
        ),
        Some(identifier) => {
            let mut variants = Variants::new(identifier);
            for (name, variant) in as_object(member, &member_path)? {
                let variant_path = build_path(&member_path, &[name.as_str()]);
                variants =
                    variants.variant(name.clone(), compile_node(variant, &variant_path, depth + 1)?);
            }
            ArraySchema::with_variants(variants, key_selector)
        }
    };
    Ok(schema.into())
}

fn identifier(obj: &Map<String, Value>, path: &str) -> Result<Option<Identifier>, FaramError> {
    match obj.get("identifier") {
        None => Ok(None),
        Some(Value::String(field)) => Ok(Some(Identifier::field(field.clone()))),
        Some(other) => Err(FaramError::schema(
            &build_path(path, &["identifier"]),
            format!("expected a field name, found {}", type_name(other)),
        )),
    }
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

fn compile_leaf(specs: &[Value], path: &str) -> Result<Schema, FaramError> {
    let rules = specs
        .iter()
        .enumerate()
        .map(|(i, spec)| {
            let index = i.to_string();
            compile_rule(spec, &build_path(path, &[index.as_str()]))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Schema::Leaf(rules))
}

fn compile_rule(spec: &Value, path: &str) -> Result<Rule, FaramError> {
    let (name, arg, message) = match spec {
        Value::String(name) => (name.as_str(), None, None),
        Value::Object(obj) => {
            let name = obj
                .get("rule")
                .and_then(Value::as_str)
                .ok_or_else(|| FaramError::schema(path, "rule object needs a `rule` name"))?;
            let message = match obj.get("message") {
                None => None,
                Some(Value::String(m)) => Some(m.clone()),
                Some(other) => {
                    return Err(FaramError::schema(
                        path,
                        format!("`message` must be a string, found {}", type_name(other)),
                    ))
                }
            };
            (name, obj.get("value"), message)
        }
        other => {
            return Err(FaramError::schema(
                path,
                format!("expected a rule name or object, found {}", type_name(other)),
            ))
        }
    };

    let rule = match name {
        "required" => rules::required(),
        "number" => rules::number(),
        "integer" => rules::integer(),
        "email" => rules::email(),
        "url" => rules::url(),
        "date" => rules::date(),
        "pattern" => {
            let pattern = arg
                .and_then(Value::as_str)
                .ok_or_else(|| FaramError::schema(path, "`pattern` needs a string `value`"))?;
            rules::pattern(pattern)
                .map_err(|e| FaramError::schema(path, format!("invalid pattern: {e}")))?
        }
        "lengthLessThan" => rules::length_less_than(length_arg(name, arg, path)?),
        "lengthGreaterThan" => rules::length_greater_than(length_arg(name, arg, path)?),
        "lengthEqualTo" => rules::length_equal_to(length_arg(name, arg, path)?),
        "lessThan" => rules::less_than(number_arg(name, arg, path)?),
        "greaterThan" => rules::greater_than(number_arg(name, arg, path)?),
        "lessThanOrEqualTo" => rules::less_than_or_equal_to(number_arg(name, arg, path)?),
        "greaterThanOrEqualTo" => rules::greater_than_or_equal_to(number_arg(name, arg, path)?),
        other => {
            return Err(FaramError::UnknownRule {
                path: path.to_string(),
                rule: other.to_string(),
            })
        }
    };

    Ok(match message {
        Some(message) => rule.with_message(message),
        None => rule,
    })
}

fn length_arg(rule: &str, arg: Option<&Value>, path: &str) -> Result<usize, FaramError> {
    arg.and_then(Value::as_u64)
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| {
            FaramError::schema(path, format!("`{rule}` needs a non-negative integer `value`"))
        })
}

fn number_arg(rule: &str, arg: Option<&Value>, path: &str) -> Result<f64, FaramError> {
    arg.and_then(Value::as_f64)
        .ok_or_else(|| FaramError::schema(path, format!("`{rule}` needs a numeric `value`")))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn as_object<'a>(value: &'a Value, path: &str) -> Result<&'a Map<String, Value>, FaramError> {
    value.as_object().ok_or_else(|| {
        FaramError::schema(path, format!("expected an object, found {}", type_name(value)))
    })
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
