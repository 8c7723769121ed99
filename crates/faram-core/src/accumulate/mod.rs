//! Schema-driven accumulators.
//!
//! All accumulators share one traversal shape: match on the schema node,
//! resolve variants via the node's identifier, recurse into elements/fields,
//! and prune empty results. They only borrow their inputs and build fresh
//! output at every level.

mod differential;
mod errors;
mod form_errors;
mod values;

pub use differential::accumulate_differential_errors;
pub use errors::accumulate_errors;
pub use form_errors::accumulate_form_errors;
pub use values::accumulate_values;
