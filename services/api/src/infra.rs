use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tender_core::config::DirectoryConfig;
use tender_core::procurement::{MemoryStore, ProcurementError};
use tracing::debug;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// In-memory store with every configured responsible employee registered.
pub(crate) fn seeded_store(directory: &DirectoryConfig) -> Result<MemoryStore, ProcurementError> {
    let store = MemoryStore::default();
    for employee in &directory.responsible {
        let principal =
            store.register_responsible(employee.organization_id, employee.username.clone())?;
        debug!(
            organization_id = %employee.organization_id,
            username = %employee.username,
            principal_id = %principal,
            "responsible employee registered"
        );
    }
    Ok(store)
}
