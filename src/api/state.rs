use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::batch::BatchOrchestrator;
use crate::config::Config;
use crate::observability::Metrics;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub orchestrator: BatchOrchestrator,
    pub metrics: Arc<Metrics>,
    /// Cancelled on shutdown; running batches stop issuing attempts
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(config: Config, orchestrator: BatchOrchestrator) -> Self {
        Self {
            config: Arc::new(config),
            orchestrator,
            metrics: Arc::new(Metrics::new()),
            shutdown: CancellationToken::new(),
        }
    }
}
