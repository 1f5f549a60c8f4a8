//! Run metrics: stage timings, token usage and estimated model cost.
//!
//! A single `Metrics` is created per run and shared by `Arc` between the
//! pipeline and the metered model wrapper.

use std::fmt;
use std::future::Future;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use indexmap::IndexMap;
use serde::Serialize;
use tracing::info;

use crate::model::TokenUsage;

/// USD per 1k tokens, `(input, output)`
fn price_per_1k(model: &str) -> Option<(f64, f64)> {
    match model {
        "gpt-4o-mini" => Some((0.00015, 0.0006)),
        "gpt-4o" => Some((0.0025, 0.01)),
        "gpt-4" => Some((0.03, 0.06)),
        _ => None,
    }
}

#[derive(Debug, Default)]
struct Counters {
    stages: IndexMap<String, Duration>,
    tokens_input: u64,
    tokens_output: u64,
    estimated_cost_usd: f64,
}

/// Accumulator for one pipeline run
#[derive(Debug)]
pub struct Metrics {
    started: Instant,
    counters: Mutex<Counters>,
}

/// Snapshot of the metrics at the end of a run
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSummary {
    pub total_time_secs: f64,
    pub stages: IndexMap<String, f64>,
    pub tokens_input: u64,
    pub tokens_output: u64,
    pub total_tokens: u64,
    pub estimated_cost_usd: f64,
    pub timestamp: DateTime<Local>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            counters: Mutex::new(Counters::default()),
        }
    }

    fn with_counters<T>(&self, f: impl FnOnce(&mut Counters) -> T) -> T {
        // counters are plain numbers, a poisoned lock is still readable
        let mut guard = match self.counters.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }

    /// Record how long a stage took. Recording the same stage twice keeps the latest value.
    pub fn record_stage(&self, name: &str, duration: Duration) {
        info!("Stage '{}': {:.2}s", name, duration.as_secs_f64());
        self.with_counters(|c| {
            c.stages.insert(name.to_string(), duration);
        });
    }

    /// Run `fut` and record its wall time under `name`.
    pub async fn time_stage<F, T>(&self, name: &str, fut: F) -> T
    where
        F: Future<Output = T>,
    {
        let start = tokio::time::Instant::now();
        let output = fut.await;
        self.record_stage(name, start.elapsed());
        output
    }

    /// Add token usage for `model` and return the estimated cost of this call.
    ///
    /// Models without a known price count towards the token totals at zero cost.
    pub fn add_tokens(&self, model: &str, usage: &TokenUsage) -> f64 {
        let cost = price_per_1k(model)
            .map(|(input, output)| {
                (usage.prompt as f64 / 1000.0) * input + (usage.completion as f64 / 1000.0) * output
            })
            .unwrap_or(0.0);

        info!(
            "Tokens used - input: {}, output: {}, estimated cost: ${:.6}",
            usage.prompt, usage.completion, cost
        );

        self.with_counters(|c| {
            c.tokens_input += u64::from(usage.prompt);
            c.tokens_output += u64::from(usage.completion);
            c.estimated_cost_usd += cost;
        });
        cost
    }

    pub fn summary(&self) -> MetricsSummary {
        let total_time_secs = self.started.elapsed().as_secs_f64();
        self.with_counters(|c| MetricsSummary {
            total_time_secs,
            stages: c
                .stages
                .iter()
                .map(|(name, d)| (name.clone(), d.as_secs_f64()))
                .collect(),
            tokens_input: c.tokens_input,
            tokens_output: c.tokens_output,
            total_tokens: c.tokens_input + c.tokens_output,
            estimated_cost_usd: c.estimated_cost_usd,
            timestamp: Local::now(),
        })
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", "=".repeat(60))?;
        writeln!(f, "RUN METRICS")?;
        writeln!(f, "{}", "=".repeat(60))?;
        writeln!(f, "Total time: {:.2}s", self.total_time_secs)?;
        writeln!(f, "Stage times:")?;
        for (stage, secs) in &self.stages {
            writeln!(f, "  - {}: {:.2}s", stage, secs)?;
        }
        writeln!(
            f,
            "Tokens used: {} (input {}, output {})",
            self.total_tokens, self.tokens_input, self.tokens_output
        )?;
        writeln!(f, "Estimated cost: ${:.6}", self.estimated_cost_usd)?;
        write!(f, "{}", "=".repeat(60))
    }
}
