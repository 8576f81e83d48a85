//! # aioptim
//!
//! A closed-loop performance remediation service for deployed web
//! applications. On a fixed cadence it:
//!
//! 1. **EndpointSource** ([`metrics`]) — queries a metrics/APM backend for
//!    slow HTTP endpoints.
//! 2. **FaultLineExtractor** ([`parser`]) — fetches the endpoint's source
//!    repository, builds a per-language call graph, and computes the
//!    transitive fault line of methods reachable from the matched handler.
//! 3. **SlowFilter** ([`classifier`]) — classifies fault-line methods as
//!    slow, via a pluggable [`classifier::Classifier`].
//! 4. **Regenerator** ([`regenerator`]) — asks a generative model to
//!    describe, rewrite, and judge each slow method.
//! 5. **Publisher** ([`repo`]) — commits the accepted rewrite to a new
//!    branch on the code host.
//!
//! [`pipeline::PipelineRunner`] wires the five stages together per tick;
//! [`scheduler`] drives the fixed cadence.

pub mod cli;
pub mod classifier;
pub mod config;
pub mod error;
pub mod fuzzy;
pub mod metrics;
pub mod model;
pub mod model_client;
pub mod parser;
pub mod pipeline;
pub mod prompt_template;
pub mod regenerator;
pub mod repo;
pub mod scheduler;
pub mod technology;

pub use error::{AioptimError, Result};
pub use model::{Endpoint, FaultLine, File, Method, RunContext};
pub use pipeline::PipelineRunner;
