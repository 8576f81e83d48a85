//! The concrete five-stage pipeline: EndpointSource, FaultLineExtractor,
//! SlowFilter, Regenerator, Publisher.
//!
//! Sequential, fail-fast execution of a fixed list of stages over a shared
//! [`RunContext`], with a failure aborting only the current tick rather than
//! the whole run (see [`crate::scheduler`]).

use crate::error::Result;
use crate::model::{Endpoint, FaultLine, RunContext};
use crate::parser::{JavaParser, PythonParser, SourceParser};
use crate::regenerator::Regenerator;
use crate::technology::{row_for_technology, Language};
use tracing::{info, warn};

/// Owns the two per-language parsers and the Regenerator; holds no
/// per-tick state itself (that lives in [`RunContext`]).
pub struct PipelineRunner {
    python_parser: PythonParser,
    java_parser: JavaParser,
    regenerator: Regenerator,
}

impl PipelineRunner {
    pub fn new(python_parser: PythonParser, java_parser: JavaParser, regenerator: Regenerator) -> Self {
        Self {
            python_parser,
            java_parser,
            regenerator,
        }
    }

    fn parser_for(&self, language: Language) -> &dyn SourceParser {
        match language {
            Language::Python => &self.python_parser,
            Language::Java => &self.java_parser,
        }
    }

    /// Run one complete tick: EndpointSource, then FaultLineExtractor,
    /// SlowFilter, Regenerator, and Publisher for each discovered endpoint
    /// in turn. A failure at any step is logged and aborts the rest of
    /// this tick; it never propagates out of `run_tick`.
    pub async fn run_tick(&self, ctx: &mut RunContext) {
        if let Err(e) = self.run_tick_inner(ctx).await {
            warn!(error = %e, "tick aborted");
        }
        ctx.reset();
    }

    async fn run_tick_inner(&self, ctx: &mut RunContext) -> Result<()> {
        let endpoints = self.endpoint_source(ctx).await?;
        ctx.endpoints = Some(endpoints.clone());
        info!(count = endpoints.len(), "endpoints discovered");

        for endpoint in &endpoints {
            if let Err(e) = self.process_endpoint(ctx, endpoint).await {
                warn!(endpoint = %endpoint.label, error = %e, "skipping endpoint");
            }
        }
        Ok(())
    }

    /// EndpointSource: query the metrics backend, filter by threshold and
    /// supported technology. A connection failure here aborts the tick.
    async fn endpoint_source(&self, ctx: &RunContext) -> Result<Vec<Endpoint>> {
        let fetched = ctx.metrics.fetch(ctx.tick_interval_minutes).await?;
        Ok(ctx.metrics.filter(fetched, ctx.threshold_ms))
    }

    /// Runs FaultLineExtractor, SlowFilter, Regenerator, and Publisher for
    /// a single endpoint. Scratch fields are overwritten per endpoint; the
    /// caller resets them (along with `endpoints`) once per tick.
    async fn process_endpoint(&self, ctx: &mut RunContext, endpoint: &Endpoint) -> Result<()> {
        let row = row_for_technology(&endpoint.technology)?;
        let parser = self.parser_for(row.language);

        let files = ctx.repo.files_by_language(row.language).await?;
        for file in &files {
            parser.index_methods(file)?;
        }
        parser.extend_by_imports(&files)?;

        let handler = parser.resolve_endpoint(&files, &endpoint.label);
        let fault_line: FaultLine = parser.reachable(handler.as_ref())?;
        ctx.fault_line = Some(fault_line.clone());
        info!(endpoint = %endpoint.label, methods = fault_line.len(), "fault line computed");

        // SlowFilter: bypassed entirely when the fault line has exactly
        // one method — there is nothing to rank.
        let slow_methods: Vec<_> = if fault_line.len() == 1 {
            fault_line.into_iter().collect()
        } else {
            let mut slow = Vec::new();
            for method in fault_line {
                if ctx.classifier.is_slow(&method).await? {
                    slow.push(method);
                }
            }
            slow
        };
        ctx.slow_methods = Some(slow_methods.clone());
        info!(endpoint = %endpoint.label, slow = slow_methods.len(), "slow methods selected");

        // Regenerator precondition: the configured model must be present on
        // the backend before entering the per-method retry loop. Checked
        // here, not at startup, and only when there is anything to
        // regenerate.
        if !slow_methods.is_empty() && !ctx.model.is_model_available().await? {
            return Err(crate::error::AioptimError::ModelUnavailable(
                "configured model is not listed by the model backend".to_string(),
            ));
        }

        for method in &slow_methods {
            self.regenerator.regenerate(method, row.language).await?;

            let Some(owner) = method.owner.upgrade() else {
                continue;
            };
            let rewrite = method.rewrite.read().expect("rewrite lock poisoned").clone();
            if let Some(new_body) = rewrite {
                ctx.repo.publish(&owner.path, &method.body, &new_body).await?;
            }
        }
        Ok(())
    }
}
