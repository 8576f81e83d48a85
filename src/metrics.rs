//! EndpointSource: queries the metrics/APM backend for slow HTTP endpoints.
//!
//! The base URL is built from a tenant/unit pair: the backend is IBM
//! Instana's Application Performance Monitoring API.

use crate::error::{AioptimError, Result};
use crate::model::Endpoint;
use crate::technology::all_technologies;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

/// The EndpointSource contract: fetch observed endpoints over a trailing
/// window, then filter by latency threshold and supported technology.
/// Behind a trait so [`crate::pipeline::PipelineRunner`] can be driven
/// against a canned [`MockMetricsSource`] in tests.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    async fn fetch(&self, window_minutes: u64) -> Result<Vec<Endpoint>>;
    fn filter(&self, endpoints: Vec<Endpoint>, threshold_ms: f64) -> Vec<Endpoint>;
}

#[derive(Debug, Deserialize)]
struct EndpointItem {
    endpoint: EndpointDescriptor,
    metrics: EndpointMetrics,
}

#[derive(Debug, Deserialize)]
struct EndpointDescriptor {
    label: String,
    technologies: Vec<String>,
}

/// Keyed by metric name (`"latency.mean"` for this query); each value is a
/// series of `[timestamp, value]` pairs. Only the first point is used — the
/// query's `fillTimeSeries` only matters for exact reproduction of the
/// backend's bucketing, not for the single mean this service reads.
#[derive(Debug, Deserialize)]
struct EndpointMetrics {
    #[serde(rename = "latency.mean")]
    latency_mean: Vec<(i64, f64)>,
}

#[derive(Debug, Deserialize)]
struct EndpointsResponse {
    items: Vec<EndpointItem>,
}

/// Client for the metrics/APM backend, plus the per-tick fetch+filter
/// contract of the EndpointSource stage.
pub struct MetricsClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl MetricsClient {
    pub fn new(tenant: &str, unit: &str, api_key: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: format!("https://{unit}-{tenant}.instana.io/api/application-monitoring"),
            api_key: api_key.into(),
        }
    }

    #[cfg(test)]
    pub fn for_testing() -> Self {
        Self::new("test-tenant", "test-unit", "test-key")
    }
}

#[async_trait]
impl MetricsSource for MetricsClient {
    /// Query every observed endpoint over a `window_minutes`-wide trailing
    /// window. A fresh `timeFrame` is computed on every call — the window
    /// never survives across ticks.
    async fn fetch(&self, window_minutes: u64) -> Result<Vec<Endpoint>> {
        let now_millis = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_err(|e| AioptimError::Other(e.to_string()))?
            .as_millis() as i64;
        let window_millis = (window_minutes as i64) * 60 * 1000;

        let body = json!({
            "applicationBoundaryScope": "ALL",
            "excludeSynthetic": true,
            "entityType": "HTTP",
            "metrics": [{"metric": "latency", "aggregation": "MEAN"}],
            "order": { "by": "latency.mean", "direction": "DESC" },
            "timeFrame": { "to": now_millis, "windowSize": window_millis },
        });

        let url = format!(
            "{}/metrics/endpoints?fillTimeSeries=true",
            self.base_url
        );
        let resp = self
            .http
            .post(&url)
            // The key is passed through verbatim — the operator is expected
            // to have configured it with the `apiToken ` prefix Instana
            // requires, per the `setup` subcommand's help text.
            .header("Authorization", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AioptimError::ConnectionError(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(AioptimError::ConnectionError(format!(
                "metrics backend returned status {}",
                resp.status()
            )));
        }

        let parsed: EndpointsResponse = resp
            .json()
            .await
            .map_err(|e| AioptimError::InvalidResponse(e.to_string()))?;

        Ok(parsed
            .items
            .into_iter()
            .filter(|item| item.endpoint.technologies.len() == 1)
            .filter_map(|item| {
                let latency = item.metrics.latency_mean.first()?.1;
                let technology = item.endpoint.technologies.into_iter().next()?;
                Some(Endpoint::new(item.endpoint.label, technology, latency))
            })
            .collect())
    }

    /// Keep only endpoints at or above `threshold_ms` whose technology tag
    /// is one this service has a parser for.
    fn filter(&self, endpoints: Vec<Endpoint>, threshold_ms: f64) -> Vec<Endpoint> {
        let supported = all_technologies();
        endpoints
            .into_iter()
            .filter(|e| e.latency >= threshold_ms && supported.contains(&e.technology.as_str()))
            .collect()
    }
}

/// Canned [`MetricsSource`] for driving [`crate::pipeline::PipelineRunner`]
/// in tests without a live Instana backend. `fetch` returns the configured
/// endpoints (or the configured error) every call; `filter` delegates to
/// the same threshold/technology logic `MetricsClient` uses, since that
/// logic isn't backend-specific.
#[cfg(test)]
pub struct MockMetricsSource {
    endpoints: Result<Vec<Endpoint>>,
}

#[cfg(test)]
impl MockMetricsSource {
    pub fn new(endpoints: Vec<Endpoint>) -> Self {
        Self {
            endpoints: Ok(endpoints),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            endpoints: Err(AioptimError::ConnectionError(message.to_string())),
        }
    }
}

#[cfg(test)]
#[async_trait]
impl MetricsSource for MockMetricsSource {
    async fn fetch(&self, _window_minutes: u64) -> Result<Vec<Endpoint>> {
        match &self.endpoints {
            Ok(endpoints) => Ok(endpoints.clone()),
            Err(e) => Err(AioptimError::ConnectionError(e.to_string())),
        }
    }

    fn filter(&self, endpoints: Vec<Endpoint>, threshold_ms: f64) -> Vec<Endpoint> {
        let supported = all_technologies();
        endpoints
            .into_iter()
            .filter(|e| e.latency >= threshold_ms && supported.contains(&e.technology.as_str()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_drops_endpoints_below_threshold() {
        let client = MetricsClient::for_testing();
        let endpoints = vec![
            Endpoint::new("/login", "pythonRuntimePlatform", 200.0),
            Endpoint::new("/checkout", "pythonRuntimePlatform", 900.0),
        ];
        let filtered = client.filter(endpoints, 500.0);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].label, "/checkout");
    }

    #[test]
    fn filter_drops_unsupported_technologies() {
        let client = MetricsClient::for_testing();
        let endpoints = vec![Endpoint::new("/login", "dotnetRuntime", 900.0)];
        assert!(client.filter(endpoints, 500.0).is_empty());
    }

    #[test]
    fn endpoints_response_parses_nested_instana_shape() {
        let raw = r#"{
            "items": [
                {
                    "endpoint": { "label": "/checkout", "technologies": ["pythonRuntimePlatform"] },
                    "metrics": { "latency.mean": [[1700000000000, 812.5]] }
                },
                {
                    "endpoint": { "label": "/ambiguous", "technologies": ["pythonRuntimePlatform", "javaRuntime"] },
                    "metrics": { "latency.mean": [[1700000000000, 999.0]] }
                }
            ]
        }"#;
        let parsed: EndpointsResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.items.len(), 2);

        let endpoints: Vec<Endpoint> = parsed
            .items
            .into_iter()
            .filter(|item| item.endpoint.technologies.len() == 1)
            .filter_map(|item| {
                let latency = item.metrics.latency_mean.first()?.1;
                let technology = item.endpoint.technologies.into_iter().next()?;
                Some(Endpoint::new(item.endpoint.label, technology, latency))
            })
            .collect();

        // The multi-technology item is dropped; only the single-tech one survives.
        assert_eq!(endpoints.len(), 1);
        assert_eq!(endpoints[0].label, "/checkout");
        assert_eq!(endpoints[0].latency, 812.5);
    }
}
