//! The periodic publish loop.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::generator::Generator;
use crate::publisher::Publisher;

/// Outcome of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub published: u64,
    pub failed: u64,
}

impl RunSummary {
    pub fn attempts(&self) -> u64 {
        self.published + self.failed
    }
}

/// Samples the generator once per period and hands each reading to a
/// publisher, one at a time, until shutdown or an optional limit.
#[derive(Debug)]
pub struct Runner<R> {
    generator: Generator<R>,
    period: Duration,
    limit: Option<u64>,
}

impl<R: Rng + Send> Runner<R> {
    pub fn new(generator: Generator<R>, period: Duration) -> Self {
        Self {
            generator,
            period,
            limit: None,
        }
    }

    /// Stop after this many attempts, successful or not.
    pub fn limit(mut self, limit: Option<u64>) -> Self {
        self.limit = limit;
        self
    }

    /// Run until `shutdown` resolves.
    ///
    /// The first reading goes out immediately. A failed publish is logged and
    /// the reading dropped; the next tick produces a fresh one. An in-flight
    /// publish is allowed to finish before shutdown is observed.
    pub async fn run<P, F>(&mut self, publisher: &P, shutdown: F) -> RunSummary
    where
        P: Publisher + ?Sized,
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        let mut summary = RunSummary::default();
        info!(
            destination = %publisher.description(),
            period = ?self.period,
            "Publishing telemetry"
        );

        loop {
            if self.limit.is_some_and(|limit| summary.attempts() >= limit) {
                debug!(attempts = summary.attempts(), "Reading limit reached");
                break;
            }

            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    debug!("Shutdown requested");
                    break;
                }
                _ = ticker.tick() => {
                    let reading = self.generator.sample();
                    match publisher.publish(&reading).await {
                        Ok(()) => {
                            summary.published += 1;
                            info!(
                                source_id = %reading.source_id,
                                value = reading.value,
                                "Sent telemetry"
                            );
                        }
                        Err(e) => {
                            summary.failed += 1;
                            warn!(
                                source_id = %reading.source_id,
                                error = %e,
                                "Failed to publish reading"
                            );
                        }
                    }
                }
            }
        }

        summary
    }
}
