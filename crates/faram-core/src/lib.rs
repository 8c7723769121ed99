//! Schema-driven value accumulation and differential validation for form state.
//!
//! A [`Schema`] describes the shape of a form value (leaves, keyed arrays,
//! objects, and variants picked by a discriminator) together with its
//! validation rules. Four pure functions walk a value alongside its schema:
//!
//! - [`accumulate_values`] — sanitized output value,
//! - [`accumulate_errors`] — full validation pass,
//! - [`accumulate_differential_errors`] — validation of what changed since the
//!   previous pass, reusing cached errors for untouched subtrees,
//! - [`analyze_errors`] — does an error tree hold any message?
//!
//! [`FormHelper`] layers colon-delimited path edits (`"items:0:name"`) and
//! error invalidation on top.
//!
//! # Example
//! ```
//! use faram_core::{accumulate_errors, rules, Schema};
//! use serde_json::json;
//!
//! let schema = Schema::object([
//!     ("id", Schema::leaf([rules::required(), rules::integer()])),
//!     ("name", Schema::leaf([rules::required()])),
//! ]);
//! let errors = accumulate_errors(&json!({ "id": 12 }), &schema);
//! assert_eq!(
//!     serde_json::to_value(errors).unwrap(),
//!     json!({ "name": "Field must not be empty" })
//! );
//! ```

pub mod accumulate;
pub mod analyze;
pub mod compile;
pub mod config;
pub mod error;
pub mod error_tree;
pub mod form;
pub mod path;
pub mod rules;
pub mod schema;

pub use accumulate::{
    accumulate_differential_errors, accumulate_errors, accumulate_form_errors, accumulate_values,
};
pub use analyze::{analyze_errors, analyze_form_errors};
pub use compile::{compile_schema, compile_schema_str};
pub use config::{AccumulateOptions, ErrorRefresh, FormOptions, PushMode};
pub use error::FaramError;
pub use error_tree::{ErrorMap, ErrorNode, FormErrors};
pub use form::{Callbacks, FormHelper, FormListener, FormState, Submission};
pub use path::{FieldPath, PathSegment};
pub use schema::{
    ArraySchema, Identifier, KeySelector, ObjectSchema, Rule, Schema, Variants, DEFAULT_VARIANT,
};
