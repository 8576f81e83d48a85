/// An externally observed HTTP entry point reported by the metrics backend.
///
/// Created by [`crate::metrics::MetricsClient::fetch`]; immutable thereafter;
/// destroyed at the next `RunContext::reset()`.
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint {
    /// Used for fuzzy matching to a handler's decorator/annotation text.
    pub label: String,
    /// A tag drawn from the supported-technology set; determines language
    /// and parser.
    pub technology: String,
    /// Observed mean latency, milliseconds. Non-negative.
    pub latency: f64,
}

impl Endpoint {
    pub fn new(label: impl Into<String>, technology: impl Into<String>, latency: f64) -> Self {
        Self {
            label: label.into(),
            technology: technology.into(),
            latency,
        }
    }
}
