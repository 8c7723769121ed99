//! Error analyzer — does an error tree hold any message at all?

use crate::error_tree::{ErrorNode, FormErrors};

/// `true` when any leaf or `$internal` message in the tree is non-empty.
pub fn analyze_errors(errors: Option<&ErrorNode>) -> bool {
    match errors {
        None => false,
        Some(ErrorNode::Message(message)) => !message.is_empty(),
        Some(ErrorNode::Node(map)) => {
            map.internal.iter().any(|m| !m.is_empty())
                || map.children.values().any(|child| analyze_errors(Some(child)))
        }
    }
}

/// Same reduction over a node-level error tree.
pub fn analyze_form_errors(errors: Option<&FormErrors>) -> bool {
    errors.is_some_and(|node| {
        node.errors.iter().any(|m| !m.is_empty())
            || node.fields.values().any(|child| analyze_form_errors(Some(child)))
    })
}
