//! Schema model — the node kinds a form schema tree can express.
//!
//! A schema is an explicit tagged union resolved once at construction:
//!
//! | Kind     | Payload                                                      |
//! |----------|--------------------------------------------------------------|
//! | `Leaf`   | ordered [`Rule`]s, first failing rule wins                   |
//! | `Array`  | member schema (or [`Variants`]) + [`KeySelector`]            |
//! | `Object` | field map (or [`Variants`] of field maps)                    |
//!
//! Array and object nodes may carry a [`NodeValidation`] producing
//! cross-field messages stored under `$internal`.
//!
//! Variant selection ("union schemas") runs an [`Identifier`] on the value
//! at that position and looks the result up in a side table. A missing or
//! unknown variant name falls back to [`DEFAULT_VARIANT`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

/// Variant used when the identifier yields nothing or an unknown name.
pub const DEFAULT_VARIANT: &str = "default";

type PredicateFn = dyn Fn(&Value) -> bool + Send + Sync;
type KeyFn = dyn Fn(&Value) -> Option<String> + Send + Sync;
type ValidationFn = dyn Fn(&Value) -> Vec<String> + Send + Sync;

// ---------------------------------------------------------------------------
// Rules and closures
// ---------------------------------------------------------------------------

/// A single leaf rule: a predicate that must hold, and the message reported
/// when it does not.
#[derive(Clone)]
pub struct Rule {
    predicate: Arc<PredicateFn>,
    message: String,
}

impl Rule {
    pub fn new<F>(message: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Arc::new(predicate),
            message: message.into(),
        }
    }

    /// Replace the failure message, keeping the predicate.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// `true` when `value` satisfies the rule.
    pub fn check(&self, value: &Value) -> bool {
        (self.predicate)(value)
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

/// Extracts the stable identity of an array element.
///
/// Elements whose key cannot be extracted are keyed by their position.
#[derive(Clone)]
pub struct KeySelector(Arc<KeyFn>);

impl KeySelector {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Value) -> Option<String> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Key elements by the scalar stored at `field`.
    pub fn field(field: impl Into<String>) -> Self {
        let field = field.into();
        Self::new(move |element| element.get(&field).and_then(scalar_key))
    }

    /// Key elements by their position.
    pub fn index() -> Self {
        Self::new(|_| None)
    }

    pub fn key(&self, element: &Value) -> Option<String> {
        (self.0)(element)
    }
}

impl fmt::Debug for KeySelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("KeySelector(..)")
    }
}

/// Picks the variant name for a value.
#[derive(Clone)]
pub struct Identifier(Arc<KeyFn>);

impl Identifier {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Value) -> Option<String> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Use the string stored at `field` as the variant name.
    pub fn field(field: impl Into<String>) -> Self {
        let field = field.into();
        Self::new(move |value| value.get(&field).and_then(Value::as_str).map(str::to_string))
    }

    pub fn identify(&self, value: &Value) -> Option<String> {
        (self.0)(value)
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Identifier(..)")
    }
}

/// Object/array-level validation producing zero or more messages.
#[derive(Clone)]
pub struct NodeValidation(Arc<ValidationFn>);

impl NodeValidation {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Value) -> Vec<String> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn validate(&self, value: &Value) -> Vec<String> {
        (self.0)(value)
    }
}

impl fmt::Debug for NodeValidation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NodeValidation(..)")
    }
}

/// Render a scalar as an error-tree key. Objects, arrays and `null` have no key.
pub fn scalar_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

// ---------------------------------------------------------------------------
// Variants
// ---------------------------------------------------------------------------

/// Named sub-schemas selected at runtime by an [`Identifier`].
#[derive(Debug, Clone)]
pub struct Variants<T> {
    identifier: Identifier,
    variants: BTreeMap<String, T>,
}

impl<T> Variants<T> {
    pub fn new(identifier: Identifier) -> Self {
        Self {
            identifier,
            variants: BTreeMap::new(),
        }
    }

    /// Register (or replace) the sub-schema for `name`.
    pub fn variant(mut self, name: impl Into<String>, schema: T) -> Self {
        self.variants.insert(name.into(), schema);
        self
    }

    /// Raw variant name reported by the identifier.
    pub fn identify(&self, value: &Value) -> Option<String> {
        self.identifier.identify(value)
    }

    /// Effective sub-schema for `value`, falling back to [`DEFAULT_VARIANT`].
    pub fn resolve(&self, value: &Value) -> Option<&T> {
        let named = self
            .identify(value)
            .and_then(|name| self.variants.get(&name));
        let resolved = named.or_else(|| self.variants.get(DEFAULT_VARIANT));
        if resolved.is_none() {
            tracing::warn!(
                variant = ?self.identify(value),
                "no schema variant matches and no default variant is declared"
            );
        }
        resolved
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.variants.keys().map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// Schema nodes
// ---------------------------------------------------------------------------

/// Member schema of an array.
#[derive(Debug, Clone)]
pub enum Member {
    Single(Box<Schema>),
    Variants(Variants<Schema>),
}

impl Member {
    pub fn resolve(&self, element: &Value) -> Option<&Schema> {
        match self {
            Member::Single(schema) => Some(schema),
            Member::Variants(variants) => variants.resolve(element),
        }
    }

    /// Variant name for `element`; always `None` for a single member schema.
    pub fn variant_name(&self, element: &Value) -> Option<String> {
        match self {
            Member::Single(_) => None,
            Member::Variants(variants) => variants.identify(element),
        }
    }
}

/// Field schemas of an object.
#[derive(Debug, Clone)]
pub enum Fields {
    Fixed(BTreeMap<String, Schema>),
    Variants(Variants<BTreeMap<String, Schema>>),
}

impl Fields {
    pub fn resolve(&self, object: &Value) -> Option<&BTreeMap<String, Schema>> {
        match self {
            Fields::Fixed(fields) => Some(fields),
            Fields::Variants(variants) => variants.resolve(object),
        }
    }

    pub fn variant_name(&self, object: &Value) -> Option<String> {
        match self {
            Fields::Fixed(_) => None,
            Fields::Variants(variants) => variants.identify(object),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ArraySchema {
    pub member: Member,
    pub key_selector: KeySelector,
    pub validation: Option<NodeValidation>,
}

impl ArraySchema {
    pub fn new(member: Schema, key_selector: KeySelector) -> Self {
        Self {
            member: Member::Single(Box::new(member)),
            key_selector,
            validation: None,
        }
    }

    pub fn with_variants(variants: Variants<Schema>, key_selector: KeySelector) -> Self {
        Self {
            member: Member::Variants(variants),
            key_selector,
            validation: None,
        }
    }

    pub fn validation<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> Vec<String> + Send + Sync + 'static,
    {
        self.validation = Some(NodeValidation::new(f));
        self
    }

    /// Error-tree key of the element at `index`.
    pub fn key_of(&self, element: &Value, index: usize) -> String {
        self.key_selector
            .key(element)
            .unwrap_or_else(|| index.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct ObjectSchema {
    pub fields: Fields,
    pub validation: Option<NodeValidation>,
}

impl ObjectSchema {
    pub fn new<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Schema)>,
        K: Into<String>,
    {
        Self {
            fields: Fields::Fixed(fields.into_iter().map(|(k, v)| (k.into(), v)).collect()),
            validation: None,
        }
    }

    pub fn with_variants(variants: Variants<BTreeMap<String, Schema>>) -> Self {
        Self {
            fields: Fields::Variants(variants),
            validation: None,
        }
    }

    pub fn validation<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> Vec<String> + Send + Sync + 'static,
    {
        self.validation = Some(NodeValidation::new(f));
        self
    }
}

/// A schema tree node.
#[derive(Debug, Clone)]
pub enum Schema {
    Leaf(Vec<Rule>),
    Array(ArraySchema),
    Object(ObjectSchema),
}

impl Schema {
    pub fn leaf(rules: impl IntoIterator<Item = Rule>) -> Self {
        Schema::Leaf(rules.into_iter().collect())
    }

    pub fn array(member: Schema, key_selector: KeySelector) -> Self {
        Schema::Array(ArraySchema::new(member, key_selector))
    }

    pub fn object<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Schema)>,
        K: Into<String>,
    {
        Schema::Object(ObjectSchema::new(fields))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Schema::Leaf(_) => "leaf",
            Schema::Array(_) => "array",
            Schema::Object(_) => "object",
        }
    }

    pub fn validation(&self) -> Option<&NodeValidation> {
        match self {
            Schema::Leaf(_) => None,
            Schema::Array(array) => array.validation.as_ref(),
            Schema::Object(object) => object.validation.as_ref(),
        }
    }
}

impl From<ArraySchema> for Schema {
    fn from(schema: ArraySchema) -> Self {
        Schema::Array(schema)
    }
}

impl From<ObjectSchema> for Schema {
    fn from(schema: ObjectSchema) -> Self {
        Schema::Object(schema)
    }
}
