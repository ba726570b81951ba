//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use progression_core::ports::{CatalogService, MembershipService, ProgressStore};
use progression_core::{BoxScheduler, CurriculumService, SessionManager};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionManager,
    pub curriculum: CurriculumService,
}

impl AppState {
    /// Wires the engine services onto one set of port implementations.
    pub fn new(
        catalog: Arc<dyn CatalogService>,
        members: Arc<dyn MembershipService>,
        store: Arc<dyn ProgressStore>,
        config: &Config,
    ) -> Self {
        let sessions = SessionManager::new(
            catalog.clone(),
            members.clone(),
            store.clone(),
            BoxScheduler::new(config.scheduler_config()),
            config.lifecycle_config(),
        );
        let curriculum = CurriculumService::new(catalog, members, store)
            .with_max_depth(config.prerequisite_max_depth);
        Self { sessions, curriculum }
    }
}
