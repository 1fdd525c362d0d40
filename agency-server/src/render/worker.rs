//! Deferred-render retry worker
//!
//! Periodically drains the persistent render queue. Entries stay queued
//! until a render succeeds; the worker never gives up on an entry, it
//! only bumps the attempt counter.

use std::time::Duration;

use crate::workflow::WorkflowEngine;

pub struct RenderWorker {
    engine: WorkflowEngine,
    interval: Duration,
}

impl RenderWorker {
    pub fn new(engine: WorkflowEngine, interval: Duration) -> Self {
        Self { engine, interval }
    }

    /// Run forever; spawn on the runtime.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match self.engine.retry_pending_renders() {
                Ok((0, 0)) => {}
                Ok((rendered, remaining)) => {
                    tracing::info!(rendered, remaining, "drained deferred render queue");
                }
                Err(e) => {
                    tracing::error!(error = %e, "deferred render pass failed");
                }
            }
        }
    }

    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run())
    }
}
