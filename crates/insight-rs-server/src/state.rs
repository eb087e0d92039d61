//! Shared application state.

use crate::handlers::mock::{DatasetAnchorRecord, InferenceRecord, ProvenanceRecord, ReportRecord};
use crate::mail::MailRelay;
use insight_rs_config::InsightConfig;
use insight_rs_core::{
    Clock, EventSink, IdProvider, RandomSource, WorkflowRegistry, WorkflowServices,
};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// In-memory storage behind the mock REST services. Nothing is persisted.
#[derive(Default)]
pub(crate) struct MockStore {
    pub(crate) dataset_anchors: RwLock<HashMap<String, DatasetAnchorRecord>>,
    pub(crate) provenance: RwLock<HashMap<String, ProvenanceRecord>>,
    pub(crate) inferences: RwLock<HashMap<String, InferenceRecord>>,
    /// Oldest first.
    pub(crate) reports: RwLock<Vec<ReportRecord>>,
}

/// Application state shared across request handlers.
pub struct AppState {
    pub(crate) config: Arc<InsightConfig>,
    pub(crate) registry: WorkflowRegistry,
    pub(crate) random: Arc<dyn RandomSource>,
    pub(crate) ids: Arc<dyn IdProvider>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) mail: Arc<dyn MailRelay>,
    pub(crate) store: MockStore,
}

impl AppState {
    /// Build state whose workflows and mock services share `services`.
    pub fn new(
        config: InsightConfig,
        services: WorkflowServices,
        mail: Arc<dyn MailRelay>,
        event_sink: Option<Arc<dyn EventSink>>,
    ) -> Self {
        let config = Arc::new(config);
        Self {
            registry: WorkflowRegistry::new(config.clone(), services.clone(), event_sink),
            config,
            random: services.random,
            ids: services.ids,
            clock: services.clock,
            mail,
            store: MockStore::default(),
        }
    }

    pub fn config(&self) -> &InsightConfig {
        &self.config
    }

    pub fn registry(&self) -> &WorkflowRegistry {
        &self.registry
    }
}
