//! Configuration for value accumulation and form state handling.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Options for [`accumulate_values`](crate::accumulate_values).
///
/// ## Serialization Format
///
/// Fields are serialized in `kebab-case` (`no-falsy-values`, `falsy-value`),
/// matching [`FormOptions`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct AccumulateOptions {
    /// Keep falsy leaves (absent, `null`, `""`) exactly as they are instead of
    /// replacing them with `falsy_value`. Empty containers collapse to `[]`/`{}`.
    pub no_falsy_values: bool,
    /// Replacement for falsy leaves and empty containers. `None` drops them.
    pub falsy_value: Option<Value>,
}

impl AccumulateOptions {
    /// Options used on submit: falsy leaves are kept verbatim.
    pub fn keep_falsy() -> Self {
        Self {
            no_falsy_values: true,
            falsy_value: None,
        }
    }
}

/// How the field-error tree is refreshed after an edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorRefresh {
    /// Drop the stale error at the edited path and wait for the next submit.
    Clear,
    /// Re-validate the changed subtrees, reusing cached errors elsewhere.
    Differential,
}

/// Where [`FormHelper::handle_push`](crate::FormHelper::handle_push) inserts
/// the new placeholder element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PushMode {
    Start,
    #[default]
    End,
}

/// Options for [`FormHelper`](crate::FormHelper).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct FormOptions {
    /// Field-error refresh policy on change/push/pop. Default: `Clear`.
    pub error_refresh: ErrorRefresh,
    /// Accumulation options applied to the submitted value.
    pub submit: AccumulateOptions,
}

impl Default for FormOptions {
    fn default() -> Self {
        Self {
            error_refresh: ErrorRefresh::Clear,
            submit: AccumulateOptions::keep_falsy(),
        }
    }
}
