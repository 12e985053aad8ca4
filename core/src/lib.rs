//! lz-wire core: reconcile cross-chain OApp pathway configuration.
//!
//! A [`graph::ConfigGraph`] describes the desired wiring. The
//! [`convergence::planner::Planner`] reads live state through chain
//! adapters resolved by the [`factory::SdkFactory`] and emits the
//! transactions that close the gap; the
//! [`convergence::executor::TransactionExecutor`] submits them.

pub mod chain;
pub mod configure;
pub mod convergence;
pub mod factory;
pub mod graph;
pub mod inspect;
pub mod settings;
pub mod signer;
pub mod types;
