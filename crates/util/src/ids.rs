//! Identifier generation for execution records.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Generate a unique execution identifier.
///
/// Identifiers combine a millisecond timestamp with a process-wide sequence
/// number so they sort chronologically and never collide within a process.
pub fn execution_id() -> String {
    next_id("exec")
}

fn next_id(prefix: &str) -> String {
    let sequence = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("{}-{}-{}", prefix, Utc::now().timestamp_millis(), sequence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn execution_ids_are_prefixed() {
        assert!(execution_id().starts_with("exec-"));
    }

    #[test]
    fn execution_ids_are_unique() {
        let ids: HashSet<String> = (0..100).map(|_| execution_id()).collect();
        assert_eq!(ids.len(), 100);
    }
}
