use super::endpoint::Endpoint;
use super::fault_line::FaultLine;
use super::file::Method;
use crate::classifier::Classifier;
use crate::metrics::MetricsSource;
use crate::model_client::ModelBackend;
use crate::repo::RepoBackend;
use std::sync::Arc;

/// Per-tick mutable record shared by all five pipeline stages.
///
/// The external clients, the classifier, and the scheduling parameters
/// survive across ticks; only the scratch fields (`endpoints`, `fault_line`,
/// `slow_methods`) are cleared by [`RunContext::reset`].
pub struct RunContext {
    pub metrics: Arc<dyn MetricsSource>,
    pub repo: Arc<dyn RepoBackend>,
    pub model: Arc<dyn ModelBackend>,
    pub classifier: Arc<dyn Classifier>,

    /// Minimum latency, in milliseconds, for an endpoint to be considered.
    pub threshold_ms: f64,
    /// How often the scheduler re-runs the pipeline, in minutes. Also used
    /// to size the metrics backend's observation window.
    pub tick_interval_minutes: u64,
    /// Bound on the Regenerator's describe/generate/validate retry loop.
    pub max_runs: u32,

    pub endpoints: Option<Vec<Endpoint>>,
    pub fault_line: Option<FaultLine>,
    pub slow_methods: Option<Vec<Arc<Method>>>,
}

impl RunContext {
    pub fn new(
        metrics: Arc<dyn MetricsSource>,
        repo: Arc<dyn RepoBackend>,
        model: Arc<dyn ModelBackend>,
        classifier: Arc<dyn Classifier>,
        threshold_ms: f64,
        tick_interval_minutes: u64,
        max_runs: u32,
    ) -> Self {
        Self {
            metrics,
            repo,
            model,
            classifier,
            threshold_ms,
            tick_interval_minutes,
            max_runs,
            endpoints: None,
            fault_line: None,
            slow_methods: None,
        }
    }

    /// Clears the scratch fields only. Client references and scheduling
    /// parameters survive, by identity, across the reset.
    pub fn reset(&mut self) {
        self.endpoints = None;
        self.fault_line = None;
        self.slow_methods = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::SingleBypassClassifier;
    use crate::metrics::MetricsClient;
    use crate::model_client::ModelClient;
    use crate::repo::RepoClient;

    fn test_ctx() -> RunContext {
        RunContext::new(
            Arc::new(MetricsClient::for_testing()),
            Arc::new(RepoClient::for_testing()),
            Arc::new(ModelClient::for_testing()),
            Arc::new(SingleBypassClassifier),
            500.0,
            10,
            3,
        )
    }

    #[test]
    fn reset_clears_scratch_but_not_clients() {
        let mut ctx = test_ctx();
        ctx.endpoints = Some(vec![Endpoint::new("/login", "pythonRuntimePlatform", 900.0)]);
        let metrics_before = Arc::as_ptr(&ctx.metrics);
        let repo_before = Arc::as_ptr(&ctx.repo);
        let model_before = Arc::as_ptr(&ctx.model);

        ctx.reset();

        assert!(ctx.endpoints.is_none());
        assert!(ctx.fault_line.is_none());
        assert!(ctx.slow_methods.is_none());
        assert_eq!(metrics_before, Arc::as_ptr(&ctx.metrics));
        assert_eq!(repo_before, Arc::as_ptr(&ctx.repo));
        assert_eq!(model_before, Arc::as_ptr(&ctx.model));
    }
}
