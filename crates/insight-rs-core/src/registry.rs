//! In-memory registry of live workflows.

use crate::error::WorkflowError;
use crate::workflow::{Workflow, WorkflowServices};
use insight_rs_config::InsightConfig;
use insight_rs_protocol::{DomainKind, EventSink, WorkflowId, WorkflowSummary};
use log::info;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Workflow storage shared by HTTP handlers and the CLI.
#[derive(Clone)]
pub struct WorkflowRegistry {
    workflows: Arc<RwLock<HashMap<WorkflowId, Arc<Workflow>>>>,
    config: Arc<InsightConfig>,
    services: WorkflowServices,
    event_sink: Option<Arc<dyn EventSink>>,
}

impl WorkflowRegistry {
    pub fn new(
        config: Arc<InsightConfig>,
        services: WorkflowServices,
        event_sink: Option<Arc<dyn EventSink>>,
    ) -> Self {
        Self {
            workflows: Arc::new(RwLock::new(HashMap::new())),
            config,
            services,
            event_sink,
        }
    }

    pub fn config(&self) -> &InsightConfig {
        &self.config
    }

    /// Create and register an idle workflow.
    pub fn create(&self, domain: DomainKind) -> Arc<Workflow> {
        let workflow = Arc::new(Workflow::new(
            domain,
            &self.config,
            self.services.clone(),
            self.event_sink.clone(),
        ));
        self.workflows
            .write()
            .insert(workflow.id(), workflow.clone());
        workflow
    }

    /// Look up a workflow by id.
    pub fn get(&self, workflow_id: WorkflowId) -> Result<Arc<Workflow>, WorkflowError> {
        self.workflows
            .read()
            .get(&workflow_id)
            .cloned()
            .ok_or(WorkflowError::UnknownWorkflow(workflow_id))
    }

    /// Summaries of every workflow, newest first.
    pub fn list(&self) -> Vec<WorkflowSummary> {
        let mut summaries: Vec<WorkflowSummary> = self
            .workflows
            .read()
            .values()
            .map(|workflow| workflow.summary())
            .collect();
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        summaries
    }

    /// Stop and forget a workflow. Returns whether it existed.
    pub fn remove(&self, workflow_id: WorkflowId) -> bool {
        let removed = self.workflows.write().remove(&workflow_id);
        match removed {
            Some(workflow) => {
                workflow.stop_stream();
                info!("removed workflow (workflow_id={})", workflow_id);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.workflows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.workflows.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    fn registry() -> WorkflowRegistry {
        WorkflowRegistry::new(
            Arc::new(InsightConfig::default()),
            WorkflowServices::simulated(),
            None,
        )
    }

    #[test]
    fn create_get_list_remove() {
        let registry = registry();
        let secops = registry.create(DomainKind::SecOps);
        let model = registry.create(DomainKind::Model);
        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.get(secops.id()).expect("get").domain(),
            DomainKind::SecOps
        );

        let listed: Vec<WorkflowId> = registry
            .list()
            .iter()
            .map(|summary| summary.workflow_id)
            .collect();
        assert!(listed.contains(&secops.id()));
        assert!(listed.contains(&model.id()));

        assert!(registry.remove(model.id()));
        assert!(!registry.remove(model.id()));
        assert_eq!(
            registry.get(model.id()).err().unwrap(),
            WorkflowError::UnknownWorkflow(model.id())
        );
    }

    #[test]
    fn unknown_id_is_reported() {
        let id = Uuid::new_v4();
        assert_eq!(
            registry().get(id).err().unwrap(),
            WorkflowError::UnknownWorkflow(id)
        );
    }
}
