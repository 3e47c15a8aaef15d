//! Shared helpers for the Relay workspace: the in-memory execution history
//! store, identifier generation, and JSON value coercion used by condition
//! evaluation.

pub mod history;
pub mod ids;
pub mod values;

pub use history::{DEFAULT_HISTORY_CAPACITY, ExecutionHistory, InMemoryHistory};
pub use ids::execution_id;
pub use values::{is_empty_value, lookup_field, value_to_string};
