//! Per-filename move locks
//!
//! The locate -> classify -> move sequence is not atomic; two concurrent
//! calls against the same filename could both resolve the old path and one
//! of them would lose the move. Each tool call takes the filename's lock
//! before resolving and holds it until the move lands.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Registry handing out one async mutex per filename
#[derive(Default)]
pub struct MoveLocks {
    inner: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl MoveLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock handle for a filename; the same name always yields the same lock
    pub fn for_name(&self, name: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.inner
            .lock()
            .entry(name.to_string())
            .or_default()
            .clone()
    }
}
