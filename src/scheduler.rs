//! Runs the pipeline once immediately, then on a fixed interval forever.
//!
//! The first tick runs synchronously, then `tokio::time::interval` with
//! `MissedTickBehavior::Delay` takes over: it never fires back-to-back to
//! make up for a slow tick.

use crate::model::RunContext;
use crate::pipeline::PipelineRunner;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

pub async fn run(runner: PipelineRunner, mut ctx: RunContext) -> ! {
    let period = Duration::from_secs(ctx.tick_interval_minutes * 60);
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        runner.run_tick(&mut ctx).await;
    }
}
