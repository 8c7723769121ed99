//! Form state facade — path-addressed edits with error invalidation.
//!
//! [`FormState`] is the pure core: every edit returns a new state (or is
//! applied in place through the `apply_*` methods). [`FormHelper`] wraps a
//! state, its schema and an optional [`FormListener`], and notifies the
//! listener after each edit and on submit.
//!
//! A change at `a:b:c` invalidates:
//! - the field error at `a:b:c`,
//! - the node-level messages (`$internal` and form errors) at `a:b:c`, `a:b`,
//!   `a` and the root, since a change can break any ancestor's cross-field
//!   validation.
//!
//! Push and pop invalidate the node-level messages from the root down to the
//! array, and move the cached errors of the surviving elements along with
//! them: an array keyed by position re-keys its element errors, the popped
//! element's errors are dropped, and a pushed placeholder starts without any.
//!
//! With [`ErrorRefresh::Differential`] the field-error tree is instead
//! recomputed from the previous value.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::accumulate::{
    accumulate_differential_errors, accumulate_errors, accumulate_form_errors, accumulate_values,
};
use crate::analyze::{analyze_errors, analyze_form_errors};
use crate::config::{ErrorRefresh, FormOptions, PushMode};
use crate::error::FaramError;
use crate::error_tree::{
    clear_form_errors_along, clear_internal_along, remap_children, remap_form_fields, remove_error,
    ErrorNode, FormErrors,
};
use crate::path::{existing_mut, lookup, resolve, slot_mut, FieldPath, PathSegment, Resolved};
use crate::schema::Schema;

/// Value and error trees of one form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormState {
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_errors: Option<ErrorNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_errors: Option<FormErrors>,
}

/// Outcome of [`FormHelper::submit`].
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    /// Sanitized value, ready to send.
    Success(Value),
    Failure {
        field_errors: Option<ErrorNode>,
        form_errors: Option<FormErrors>,
    },
}

impl FormState {
    pub fn new(value: Value) -> Self {
        Self {
            value,
            ..Self::default()
        }
    }

    pub fn get_value(&self, path: &FieldPath) -> Option<&Value> {
        lookup(&self.value, path)
    }

    /// Field error at `path`; array indices are mapped to element keys.
    pub fn get_field_error(&self, schema: &Schema, path: &FieldPath) -> Option<&ErrorNode> {
        let resolved = resolve(path, schema, &self.value).ok()?;
        self.field_errors.as_ref()?.get(&resolved.error_keys())
    }

    /// Node-level messages at `path` (`fields:a:fields:b:errors` for `a:b`).
    pub fn get_form_error(&self, schema: &Schema, path: &FieldPath) -> Option<&[String]> {
        let resolved = resolve(path, schema, &self.value).ok()?;
        let node = self.form_errors.as_ref()?.get(&resolved.error_keys())?;
        if node.errors.is_empty() {
            None
        } else {
            Some(node.errors.as_slice())
        }
    }

    pub fn change(
        &self,
        schema: &Schema,
        path: &FieldPath,
        value: Value,
        refresh: ErrorRefresh,
    ) -> Result<FormState, FaramError> {
        let mut next = self.clone();
        next.apply_change(schema, path, value, refresh)?;
        Ok(next)
    }

    pub fn push(
        &self,
        schema: &Schema,
        path: &FieldPath,
        mode: PushMode,
        refresh: ErrorRefresh,
    ) -> Result<FormState, FaramError> {
        let mut next = self.clone();
        next.apply_push(schema, path, mode, refresh)?;
        Ok(next)
    }

    pub fn pop(
        &self,
        schema: &Schema,
        path: &FieldPath,
        refresh: ErrorRefresh,
    ) -> Result<FormState, FaramError> {
        let mut next = self.clone();
        next.apply_pop(schema, path, refresh)?;
        Ok(next)
    }

    /// Set the value at `path`, creating missing containers.
    pub fn apply_change(
        &mut self,
        schema: &Schema,
        path: &FieldPath,
        value: Value,
        refresh: ErrorRefresh,
    ) -> Result<(), FaramError> {
        self.edit(schema, path, refresh, None, |_, root, segments| {
            let slot = slot_mut(root, segments)
                .ok_or_else(|| FaramError::path(path, "cannot create value slot"))?;
            *slot = value;
            Ok(())
        })
    }

    /// Insert a `null` placeholder at the start or end of the array at `path`.
    pub fn apply_push(
        &mut self,
        schema: &Schema,
        path: &FieldPath,
        mode: PushMode,
        refresh: ErrorRefresh,
    ) -> Result<(), FaramError> {
        let at = match mode {
            PushMode::Start => 0,
            PushMode::End => lookup(&self.value, path)
                .and_then(Value::as_array)
                .map_or(0, Vec::len),
        };
        self.edit(schema, path, refresh, Some(Shift::Inserted(at)), |target, root, segments| {
            if !matches!(target, Schema::Array(_)) {
                return Err(FaramError::path(
                    path,
                    format!("expected an array field, found a {} field", target.kind()),
                ));
            }
            let slot = slot_mut(root, segments)
                .ok_or_else(|| FaramError::path(path, "cannot create value slot"))?;
            if !slot.is_array() {
                *slot = Value::Array(Vec::new());
            }
            if let Value::Array(items) = slot {
                match mode {
                    PushMode::Start => items.insert(0, Value::Null),
                    PushMode::End => items.push(Value::Null),
                }
            }
            Ok(())
        })
    }

    /// Remove the array element addressed by `path`.
    pub fn apply_pop(
        &mut self,
        schema: &Schema,
        path: &FieldPath,
        refresh: ErrorRefresh,
    ) -> Result<(), FaramError> {
        let Some(PathSegment::Index(at)) = resolve(path, schema, &self.value)?
            .steps
            .last()
            .map(|step| step.segment.clone())
        else {
            return Err(FaramError::path(path, "path does not address an array element"));
        };
        self.edit(schema, path, refresh, Some(Shift::Removed(at)), |_, root, segments| {
            let Some((_, parent)) = segments.split_last() else {
                return Err(FaramError::path(path, "path does not address an array element"));
            };
            let items = existing_mut(root, parent)
                .and_then(Value::as_array_mut)
                .filter(|items| at < items.len())
                .ok_or_else(|| FaramError::path(path, "no element at this index"))?;
            items.remove(at);
            Ok(())
        })
    }

    fn edit<F>(
        &mut self,
        schema: &Schema,
        path: &FieldPath,
        refresh: ErrorRefresh,
        shift: Option<Shift>,
        op: F,
    ) -> Result<(), FaramError>
    where
        F: FnOnce(&Schema, &mut Value, &[PathSegment]) -> Result<(), FaramError>,
    {
        // Error keys are taken before the edit so a popped element still
        // maps to its own key.
        let resolved = resolve(path, schema, &self.value)?;
        let segments = resolved.segments();
        let keys = resolved.error_keys();

        // Push moves the elements of the array at `path`, pop those of its parent.
        let moved = shift.map(|shift| {
            let depth = match shift {
                Shift::Inserted(_) => segments.len(),
                Shift::Removed(_) => segments.len().saturating_sub(1),
            };
            let array_path = FieldPath::from_segments(path.segments()[..depth].iter().cloned());
            let before = element_keys(schema, &array_path, &self.value);
            (shift, depth, array_path, before)
        });

        let previous = match refresh {
            ErrorRefresh::Differential => Some(self.value.clone()),
            ErrorRefresh::Clear => None,
        };
        op(resolved.schema, &mut self.value, &segments)?;

        // Keys of the node whose ancestors lose their node-level messages,
        // and where the moved elements' errors go.
        let (touched, moves) = match moved {
            Some((shift, depth, array_path, before)) => {
                let after = element_keys(schema, &array_path, &self.value);
                (&keys[..depth], Some(shift.moves(&before, &after)))
            }
            None => (&keys[..], None),
        };

        match previous {
            Some(previous) => {
                self.field_errors = accumulate_differential_errors(
                    &previous,
                    &self.value,
                    self.field_errors.as_ref(),
                    schema,
                );
            }
            None => {
                let cleared = match &moves {
                    Some(moves) => remap_children(&mut self.field_errors, touched, moves),
                    None => remove_error(&mut self.field_errors, &keys),
                };
                if cleared | clear_internal_along(&mut self.field_errors, touched) {
                    tracing::debug!(path = %path, "cleared stale field errors");
                }
            }
        }

        if let Some(moves) = &moves {
            remap_form_fields(&mut self.form_errors, touched, moves);
        }
        if clear_form_errors_along(&mut self.form_errors, touched) {
            tracing::debug!(path = %path, "cleared form errors along path");
        }
        Ok(())
    }
}

/// How a push or pop moves the elements of an array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shift {
    Inserted(usize),
    Removed(usize),
}

impl Shift {
    /// New position of the element previously at `index`.
    fn position(self, index: usize) -> Option<usize> {
        match self {
            Shift::Inserted(at) if index >= at => Some(index + 1),
            Shift::Removed(at) if index == at => None,
            Shift::Removed(at) if index > at => Some(index - 1),
            _ => Some(index),
        }
    }

    /// `(old key, new key)` for every element that survives the shift.
    fn moves(self, before: &[String], after: &[String]) -> Vec<(String, String)> {
        before
            .iter()
            .enumerate()
            .filter_map(|(index, from)| {
                let to = after.get(self.position(index)?)?;
                Some((from.clone(), to.clone()))
            })
            .collect()
    }
}

/// Error-tree keys of the elements of the array at `path`, by position.
fn element_keys(schema: &Schema, path: &FieldPath, value: &Value) -> Vec<String> {
    let Ok(Resolved {
        schema: Schema::Array(array),
        ..
    }) = resolve(path, schema, value)
    else {
        return Vec::new();
    };
    lookup(value, path)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .enumerate()
        .map(|(index, element)| array.key_of(element, index))
        .collect()
}

// ---------------------------------------------------------------------------
// Listener
// ---------------------------------------------------------------------------

/// Receives form events. All methods default to no-ops.
pub trait FormListener {
    fn on_change(
        &mut self,
        _value: &Value,
        _field_errors: Option<&ErrorNode>,
        _form_errors: Option<&FormErrors>,
    ) {
    }

    fn on_failure(&mut self, _field_errors: Option<&ErrorNode>, _form_errors: Option<&FormErrors>) {
    }

    fn on_success(&mut self, _value: &Value) {}
}

type ChangeFn = dyn FnMut(&Value, Option<&ErrorNode>, Option<&FormErrors>);
type FailureFn = dyn FnMut(Option<&ErrorNode>, Option<&FormErrors>);
type SuccessFn = dyn FnMut(&Value);

/// Closure-backed [`FormListener`].
#[derive(Default)]
pub struct Callbacks {
    on_change: Option<Box<ChangeFn>>,
    on_failure: Option<Box<FailureFn>>,
    on_success: Option<Box<SuccessFn>>,
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_change<F>(mut self, f: F) -> Self
    where
        F: FnMut(&Value, Option<&ErrorNode>, Option<&FormErrors>) + 'static,
    {
        self.on_change = Some(Box::new(f));
        self
    }

    pub fn on_failure<F>(mut self, f: F) -> Self
    where
        F: FnMut(Option<&ErrorNode>, Option<&FormErrors>) + 'static,
    {
        self.on_failure = Some(Box::new(f));
        self
    }

    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: FnMut(&Value) + 'static,
    {
        self.on_success = Some(Box::new(f));
        self
    }
}

impl FormListener for Callbacks {
    fn on_change(
        &mut self,
        value: &Value,
        field_errors: Option<&ErrorNode>,
        form_errors: Option<&FormErrors>,
    ) {
        if let Some(f) = self.on_change.as_mut() {
            f(value, field_errors, form_errors);
        }
    }

    fn on_failure(&mut self, field_errors: Option<&ErrorNode>, form_errors: Option<&FormErrors>) {
        if let Some(f) = self.on_failure.as_mut() {
            f(field_errors, form_errors);
        }
    }

    fn on_success(&mut self, value: &Value) {
        if let Some(f) = self.on_success.as_mut() {
            f(value);
        }
    }
}

// ---------------------------------------------------------------------------
// FormHelper
// ---------------------------------------------------------------------------

/// Stateful form coordinator. Not shared across threads: every operation takes
/// `&mut self`.
pub struct FormHelper {
    schema: Schema,
    state: FormState,
    options: FormOptions,
    listener: Option<Box<dyn FormListener>>,
}

impl fmt::Debug for FormHelper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormHelper")
            .field("schema", &self.schema)
            .field("state", &self.state)
            .field("options", &self.options)
            .field("listener", &self.listener.is_some())
            .finish()
    }
}

impl FormHelper {
    pub fn new(schema: Schema) -> Self {
        Self::with_options(schema, FormOptions::default())
    }

    pub fn with_options(schema: Schema, options: FormOptions) -> Self {
        Self {
            schema,
            state: FormState::default(),
            options,
            listener: None,
        }
    }

    pub fn set_schema(&mut self, schema: Schema) {
        self.schema = schema;
    }

    pub fn set_value(&mut self, value: Value) {
        self.state.value = value;
    }

    pub fn set_field_errors(&mut self, errors: Option<ErrorNode>) {
        self.state.field_errors = errors;
    }

    pub fn set_form_errors(&mut self, errors: Option<FormErrors>) {
        self.state.form_errors = errors;
    }

    pub fn set_listener(&mut self, listener: impl FormListener + 'static) {
        self.listener = Some(Box::new(listener));
    }

    /// `set_listener` for closure callbacks.
    pub fn set_callbacks(&mut self, callbacks: Callbacks) {
        self.set_listener(callbacks);
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn state(&self) -> &FormState {
        &self.state
    }

    pub fn into_state(self) -> FormState {
        self.state
    }

    pub fn get_value(&self, path: &str) -> Option<&Value> {
        self.state.get_value(&FieldPath::parse(path))
    }

    pub fn get_field_error(&self, path: &str) -> Option<&ErrorNode> {
        self.state
            .get_field_error(&self.schema, &FieldPath::parse(path))
    }

    pub fn get_form_error(&self, path: &str) -> Option<&[String]> {
        self.state
            .get_form_error(&self.schema, &FieldPath::parse(path))
    }

    pub fn handle_change(&mut self, path: &FieldPath, value: Value) -> Result<(), FaramError> {
        let refresh = self.options.error_refresh;
        self.state.apply_change(&self.schema, path, value, refresh)?;
        self.notify_change();
        Ok(())
    }

    pub fn handle_push(&mut self, path: &FieldPath, mode: PushMode) -> Result<(), FaramError> {
        let refresh = self.options.error_refresh;
        self.state.apply_push(&self.schema, path, mode, refresh)?;
        self.notify_change();
        Ok(())
    }

    pub fn handle_pop(&mut self, path: &FieldPath) -> Result<(), FaramError> {
        let refresh = self.options.error_refresh;
        self.state.apply_pop(&self.schema, path, refresh)?;
        self.notify_change();
        Ok(())
    }

    /// Handle that sets the value at `path`.
    pub fn change_callback(
        &self,
        path: &str,
    ) -> impl Fn(&mut FormHelper, Value) -> Result<(), FaramError> {
        let path = FieldPath::parse(path);
        move |form: &mut FormHelper, value| form.handle_change(&path, value)
    }

    /// Handle that pushes a placeholder into the array at `path`.
    pub fn push_callback(
        &self,
        path: &str,
        mode: PushMode,
    ) -> impl Fn(&mut FormHelper) -> Result<(), FaramError> {
        let path = FieldPath::parse(path);
        move |form: &mut FormHelper| form.handle_push(&path, mode)
    }

    /// Handle that removes the array element at `path`.
    pub fn pop_callback(&self, path: &str) -> impl Fn(&mut FormHelper) -> Result<(), FaramError> {
        let path = FieldPath::parse(path);
        move |form: &mut FormHelper| form.handle_pop(&path)
    }

    /// Run full validation. Errors are stored and reported to `on_failure`;
    /// otherwise the sanitized value is reported to `on_success`.
    pub fn submit(&mut self) -> Submission {
        let field_errors = accumulate_errors(&self.state.value, &self.schema);
        let form_errors = accumulate_form_errors(&self.state.value, &self.schema);

        if analyze_errors(field_errors.as_ref()) || analyze_form_errors(form_errors.as_ref()) {
            tracing::debug!("submit failed validation");
            self.state.field_errors = field_errors.clone();
            self.state.form_errors = form_errors.clone();
            if let Some(listener) = self.listener.as_mut() {
                listener.on_failure(field_errors.as_ref(), form_errors.as_ref());
            }
            return Submission::Failure {
                field_errors,
                form_errors,
            };
        }

        self.state.field_errors = None;
        self.state.form_errors = None;
        let value = accumulate_values(Some(&self.state.value), &self.schema, &self.options.submit)
            .unwrap_or(Value::Null);
        tracing::debug!("submit succeeded");
        if let Some(listener) = self.listener.as_mut() {
            listener.on_success(&value);
        }
        Submission::Success(value)
    }

    fn notify_change(&mut self) {
        if let Some(listener) = self.listener.as_mut() {
            listener.on_change(
                &self.state.value,
                self.state.field_errors.as_ref(),
                self.state.form_errors.as_ref(),
            );
        }
    }
}
