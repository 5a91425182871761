use churn_predictor::ChurnService;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Option<Arc<PrometheusHandle>>,
    pub(crate) service: Arc<ChurnService>,
}

impl AppState {
    pub(crate) fn new(service: Arc<ChurnService>) -> Self {
        Self {
            readiness: Arc::new(AtomicBool::new(false)),
            metrics: None,
            service,
        }
    }

    pub(crate) fn with_metrics(mut self, metrics: PrometheusHandle) -> Self {
        self.metrics = Some(Arc::new(metrics));
        self
    }
}
