//! Convergence: plan the transactions that close the gap between the wire
//! graph and on-chain state, submit them, and report the outcome.
//!
//! `planner` resolves adapters and runs the configurators per connection,
//! `executor` signs and submits per chain with `retry` backoff, and
//! `report` renders both as markdown.

pub mod executor;
pub mod planner;
pub mod report;
pub mod retry;
