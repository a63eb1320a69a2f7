use jobguard_classifier::Predictor;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// The loaded model behind the async prediction seam
    pub predictor: Arc<dyn Predictor>,

    /// Prometheus handle for rendering `/metrics`
    pub metrics_handle: Option<PrometheusHandle>,

    /// How long `/predict` waits for a result
    pub timeout: Duration,
}

impl AppState {
    pub fn new(predictor: Arc<dyn Predictor>) -> Self {
        Self {
            predictor,
            metrics_handle: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
