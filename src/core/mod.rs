// src/core/mod.rs

// Root of the `core` module: the pure evaluation/aggregation engine plus the
// probe shell that feeds it.

/// Data structures shared across the crate: findings, probe results, and
/// aggregate statistics, with their serialized field names pinned down.
pub mod models;

/// The deterministic header rule set: `(headers, status code)` in, ordered
/// findings out. Pure and side-effect-free.
pub mod rules;

/// The aggregation engine: folds batches of probe results into cross-target
/// statistics and renders the plain-text summary.
pub mod analysis;

/// The effectful fetch layer that probes targets over HTTP and hands the
/// materialized responses to the rule evaluator.
pub mod scanner;
