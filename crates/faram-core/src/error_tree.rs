//! Sparse error trees.
//!
//! [`ErrorNode`] mirrors the shape of the value tree: a leaf message, or a map
//! of child errors plus node-level messages under the reserved `$internal`
//! key. Array children are keyed by element key, object children by field name.
//!
//! [`FormErrors`] holds node-level validation messages only, in the
//! `{ "errors": [..], "fields": { .. } }` layout used by the form facade.
//!
//! Neither tree ever holds an empty node: empty maps collapse to `None`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Reserved key for node-level messages in an [`ErrorMap`].
pub const INTERNAL_KEY: &str = "$internal";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorNode {
    Message(String),
    Node(ErrorMap),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorMap {
    #[serde(rename = "$internal", default, skip_serializing_if = "Vec::is_empty")]
    pub internal: Vec<String>,
    #[serde(flatten)]
    pub children: BTreeMap<String, ErrorNode>,
}

impl ErrorMap {
    pub fn is_empty(&self) -> bool {
        self.internal.is_empty() && self.children.is_empty()
    }

    /// Store `error` under `key` when present.
    pub fn insert(&mut self, key: impl Into<String>, error: Option<ErrorNode>) {
        if let Some(error) = error {
            self.children.insert(key.into(), error);
        }
    }

    /// `None` when nothing was recorded.
    pub fn into_node(self) -> Option<ErrorNode> {
        if self.is_empty() {
            None
        } else {
            Some(ErrorNode::Node(self))
        }
    }
}

impl ErrorNode {
    pub fn message(message: impl Into<String>) -> Self {
        ErrorNode::Message(message.into())
    }

    pub fn as_message(&self) -> Option<&str> {
        match self {
            ErrorNode::Message(message) => Some(message),
            ErrorNode::Node(_) => None,
        }
    }

    pub fn as_map(&self) -> Option<&ErrorMap> {
        match self {
            ErrorNode::Message(_) => None,
            ErrorNode::Node(map) => Some(map),
        }
    }

    pub fn child(&self, key: &str) -> Option<&ErrorNode> {
        self.as_map().and_then(|map| map.children.get(key))
    }

    /// Node-level messages; empty for leaf messages.
    pub fn internal(&self) -> &[String] {
        self.as_map().map(|map| map.internal.as_slice()).unwrap_or(&[])
    }

    /// Follow `keys` down the tree.
    pub fn get<S: AsRef<str>>(&self, keys: &[S]) -> Option<&ErrorNode> {
        keys.iter()
            .try_fold(self, |node, key| node.child(key.as_ref()))
    }
}

/// Remove the subtree at `keys`, pruning parents left empty.
///
/// Returns `true` when something was removed.
pub fn remove_error<S: AsRef<str>>(tree: &mut Option<ErrorNode>, keys: &[S]) -> bool {
    let Some((first, rest)) = keys.split_first() else {
        return tree.take().is_some();
    };
    let Some(ErrorNode::Node(map)) = tree else {
        return false;
    };

    let key = first.as_ref();
    let mut child = map.children.remove(key);
    let removed = remove_error(&mut child, rest);
    if let Some(child) = child {
        map.children.insert(key.to_string(), child);
    }

    let empty = map.is_empty();
    if empty {
        *tree = None;
    }
    removed
}

/// Clear the `$internal` messages of every node from the root down to `keys`
/// (inclusive), pruning nodes left empty.
///
/// Returns `true` when any message was cleared.
pub fn clear_internal_along<S: AsRef<str>>(tree: &mut Option<ErrorNode>, keys: &[S]) -> bool {
    let Some(ErrorNode::Node(map)) = tree else {
        return false;
    };

    let mut cleared = !map.internal.is_empty();
    map.internal.clear();

    if let Some((first, rest)) = keys.split_first() {
        let key = first.as_ref();
        let mut child = map.children.remove(key);
        cleared |= clear_internal_along(&mut child, rest);
        if let Some(child) = child {
            map.children.insert(key.to_string(), child);
        }
    }

    let empty = map.is_empty();
    if empty {
        *tree = None;
    }
    cleared
}

/// Re-key the children of the node at `keys`. Each `(from, to)` pair moves
/// the child stored under `from` to `to`; children named by no pair are
/// dropped. Node-level messages stay put.
///
/// Returns `true` when any child moved or was dropped.
pub fn remap_children<S: AsRef<str>>(
    tree: &mut Option<ErrorNode>,
    keys: &[S],
    moves: &[(String, String)],
) -> bool {
    let Some(ErrorNode::Node(map)) = tree else {
        return false;
    };

    let changed = match keys.split_first() {
        None => remap(&mut map.children, moves),
        Some((first, rest)) => {
            let key = first.as_ref();
            let mut child = map.children.remove(key);
            let changed = remap_children(&mut child, rest, moves);
            if let Some(child) = child {
                map.children.insert(key.to_string(), child);
            }
            changed
        }
    };

    let empty = map.is_empty();
    if empty {
        *tree = None;
    }
    changed
}

/// [`remap_children`] for the `fields` of a [`FormErrors`] tree.
pub fn remap_form_fields<S: AsRef<str>>(
    tree: &mut Option<FormErrors>,
    keys: &[S],
    moves: &[(String, String)],
) -> bool {
    let Some(node) = tree else {
        return false;
    };

    let changed = match keys.split_first() {
        None => remap(&mut node.fields, moves),
        Some((first, rest)) => {
            let key = first.as_ref();
            let mut child = node.fields.remove(key);
            let changed = remap_form_fields(&mut child, rest, moves);
            if let Some(child) = child {
                node.fields.insert(key.to_string(), child);
            }
            changed
        }
    };

    let empty = node.is_empty();
    if empty {
        *tree = None;
    }
    changed
}

fn remap<T>(children: &mut BTreeMap<String, T>, moves: &[(String, String)]) -> bool {
    let mut previous = std::mem::take(children);
    let mut changed = false;
    for (from, to) in moves {
        if let Some(child) = previous.remove(from) {
            changed |= from != to;
            children.entry(to.clone()).or_insert(child);
        }
    }
    changed || !previous.is_empty()
}

/// Node-level validation messages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormErrors {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, FormErrors>,
}

impl FormErrors {
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.fields.is_empty()
    }

    pub fn into_option(self) -> Option<FormErrors> {
        if self.is_empty() {
            None
        } else {
            Some(self)
        }
    }

    /// Node at `keys`; `a:b` lives at `fields.a.fields.b`.
    pub fn get<S: AsRef<str>>(&self, keys: &[S]) -> Option<&FormErrors> {
        keys.iter()
            .try_fold(self, |node, key| node.fields.get(key.as_ref()))
    }
}

/// Clear the messages of every node from the root down to `keys` (inclusive),
/// pruning nodes left empty.
///
/// Returns `true` when any message was cleared.
pub fn clear_form_errors_along<S: AsRef<str>>(
    tree: &mut Option<FormErrors>,
    keys: &[S],
) -> bool {
    let Some(node) = tree else {
        return false;
    };

    let mut cleared = !node.errors.is_empty();
    node.errors.clear();

    if let Some((first, rest)) = keys.split_first() {
        let key = first.as_ref();
        let mut child = node.fields.remove(key);
        cleared |= clear_form_errors_along(&mut child, rest);
        if let Some(child) = child {
            node.fields.insert(key.to_string(), child);
        }
    }

    let empty = node.is_empty();
    if empty {
        *tree = None;
    }
    cleared
}
