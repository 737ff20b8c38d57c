//! Shared application state for request handlers.

use std::sync::Arc;

use crate::db::HealthStore;

/// Shared application state, cloneable across handlers.
///
/// The database handle is injected at construction. `None` stands for a handle
/// that could not be provided; handlers report it rather than panic.
#[derive(Clone, Default)]
pub struct AppState {
    db: Option<Arc<dyn HealthStore>>,
}

impl AppState {
    /// Creates a new application state around an optional database handle.
    pub fn new(db: Option<Arc<dyn HealthStore>>) -> Self {
        Self { db }
    }

    /// The live database handle, if one is available.
    pub fn db(&self) -> Option<Arc<dyn HealthStore>> {
        self.db.clone()
    }
}
