//! In-memory execution history.
//!
//! The store is a bounded ring buffer of terminal execution records: newest
//! first, oldest evicted past capacity. It lives in process memory only;
//! records are plain serde types, so a host that wants durability can
//! serialize what it reads here.

use std::collections::VecDeque;
use std::sync::Mutex;

use relay_types::Execution;
use tracing::{debug, warn};

/// Number of executions retained by default.
pub const DEFAULT_HISTORY_CAPACITY: usize = 10;

/// Append-only, bounded store of terminal execution records.
pub trait ExecutionHistory: Send + Sync {
    /// Record a terminal execution, evicting the oldest entry past capacity.
    /// Executions that have not reached a terminal status are ignored.
    fn record(&self, execution: Execution);

    /// Stored executions, most recent first.
    fn recent(&self) -> Vec<Execution>;

    /// Number of stored executions.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all stored executions.
    fn clear(&self);
}

/// Ring-buffer history store backed by process memory.
pub struct InMemoryHistory {
    capacity: usize,
    entries: Mutex<VecDeque<Execution>>,
}

impl InMemoryHistory {
    /// Create a store bounded to `capacity` entries (minimum 1).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Mutex::new(VecDeque::new()),
        }
    }

    /// Configured capacity bound.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InMemoryHistory {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }
}

impl ExecutionHistory for InMemoryHistory {
    fn record(&self, execution: Execution) {
        if !execution.status.is_terminal() {
            warn!(execution_id = %execution.id, status = ?execution.status, "ignoring non-terminal execution record");
            return;
        }
        let mut entries = self.entries.lock().expect("history lock poisoned");
        debug!(execution_id = %execution.id, status = ?execution.status, "recording execution");
        entries.push_front(execution);
        while entries.len() > self.capacity {
            if let Some(evicted) = entries.pop_back() {
                debug!(execution_id = %evicted.id, "evicting oldest execution");
            }
        }
    }

    fn recent(&self) -> Vec<Execution> {
        let entries = self.entries.lock().expect("history lock poisoned");
        entries.iter().cloned().collect()
    }

    fn len(&self) -> usize {
        self.entries.lock().expect("history lock poisoned").len()
    }

    fn clear(&self) {
        self.entries.lock().expect("history lock poisoned").clear();
    }
}
