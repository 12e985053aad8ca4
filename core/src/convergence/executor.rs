//! Transaction executor: submits a plan through a `Signer` with retry.
//!
//! Transactions are grouped by the chain they execute on. Within a group
//! they are submitted one at a time, each confirmed before the next. A
//! permanent failure ends its group: the remaining transactions of that
//! chain are skipped, other chains carry on. Groups run one after another
//! unless parallel execution is enabled.

use std::collections::HashMap;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::convergence::planner::Plan;
use crate::convergence::retry::RetryPolicy;
use crate::signer::{Signer, SubmitError};
use crate::types::point::EndpointId;
use crate::types::transaction::{PlannedTransaction, Receipt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// An earlier transaction on the same chain failed permanently.
    EarlierFailure,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Confirmed(Receipt),
    Failed(SubmitError),
    Skipped(SkipReason),
}

/// Result of one planned transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Position in `Plan::transactions()`.
    pub index: usize,
    pub transaction: PlannedTransaction,
    pub outcome: Outcome,
    /// Submission attempts, 0 when skipped.
    pub attempts: u32,
}

impl ExecutionResult {
    pub fn is_confirmed(&self) -> bool {
        matches!(self.outcome, Outcome::Confirmed(_))
    }
}

/// Counts per outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionSummary {
    pub confirmed: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl ExecutionSummary {
    pub fn of(results: &[ExecutionResult]) -> Self {
        let mut summary = ExecutionSummary::default();
        for r in results {
            match r.outcome {
                Outcome::Confirmed(_) => summary.confirmed += 1,
                Outcome::Failed(_) => summary.failed += 1,
                Outcome::Skipped(_) => summary.skipped += 1,
            }
        }
        summary
    }
}

pub struct TransactionExecutor {
    signer: Arc<dyn Signer>,
    policy: RetryPolicy,
    parallel_chains: bool,
    cancel: CancellationToken,
}

impl TransactionExecutor {
    pub fn new(signer: Arc<dyn Signer>, policy: RetryPolicy) -> Self {
        TransactionExecutor {
            signer,
            policy,
            parallel_chains: false,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_parallel_chains(mut self, parallel: bool) -> Self {
        self.parallel_chains = parallel;
        self
    }

    /// Cancellation is checked before each submission; a submission in
    /// flight runs to completion.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub async fn execute(&self, plan: &Plan) -> Vec<ExecutionResult> {
        let groups = group_by_chain(plan.transactions());
        info!(
            transactions = groups.iter().map(|(_, txs)| txs.len()).sum::<usize>(),
            chains = groups.len(),
            parallel = self.parallel_chains,
            "executing plan"
        );

        let mut results: Vec<ExecutionResult> = if self.parallel_chains {
            futures::future::join_all(groups.into_iter().map(|(eid, txs)| self.run_group(eid, txs)))
                .await
                .into_iter()
                .flatten()
                .collect()
        } else {
            let mut results = Vec::new();
            for (eid, txs) in groups {
                results.extend(self.run_group(eid, txs).await);
            }
            results
        };
        results.sort_by_key(|r| r.index);

        let summary = ExecutionSummary::of(&results);
        info!(
            confirmed = summary.confirmed,
            failed = summary.failed,
            skipped = summary.skipped,
            "execution finished"
        );
        results
    }

    async fn run_group(&self, eid: EndpointId, txs: Vec<(usize, PlannedTransaction)>) -> Vec<ExecutionResult> {
        let mut results = Vec::with_capacity(txs.len());
        let mut halted = false;
        for (index, transaction) in txs {
            let skip = if halted {
                Some(SkipReason::EarlierFailure)
            } else if self.cancel.is_cancelled() {
                Some(SkipReason::Cancelled)
            } else {
                None
            };
            if let Some(reason) = skip {
                debug!(eid, tx = %transaction.description, ?reason, "skipping transaction");
                results.push(ExecutionResult {
                    index,
                    transaction,
                    outcome: Outcome::Skipped(reason),
                    attempts: 0,
                });
                continue;
            }

            let (outcome, attempts) = self.submit(&transaction).await;
            if let Outcome::Failed(e) = &outcome {
                error!(eid, tx = %transaction.description, error = %e, attempts, "transaction failed, halting chain");
                halted = true;
            }
            results.push(ExecutionResult {
                index,
                transaction,
                outcome,
                attempts,
            });
        }
        results
    }

    /// Signs and sends one transaction, retrying transient failures.
    async fn submit(&self, transaction: &PlannedTransaction) -> (Outcome, u32) {
        let mut attempts = 0;
        loop {
            attempts += 1;
            let result = match self.signer.sign(transaction).await {
                Ok(signed) => self.signer.send(signed).await,
                Err(e) => Err(e),
            };
            match result {
                Ok(receipt) => {
                    info!(tx = %transaction.description, hash = %receipt.transaction_hash, "transaction confirmed");
                    return (Outcome::Confirmed(receipt), attempts);
                }
                Err(e) if e.is_transient() && self.policy.should_retry(attempts - 1) => {
                    let delay = self.policy.delay(attempts - 1);
                    warn!(tx = %transaction.description, error = %e, attempt = attempts, ?delay, "transient failure, retrying");
                    tokio::select! {
                        _ = self.cancel.cancelled() => {
                            warn!(tx = %transaction.description, attempts, "cancelled while waiting to retry");
                            return (Outcome::Skipped(SkipReason::Cancelled), attempts);
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                Err(e) => return (Outcome::Failed(e), attempts),
            }
        }
    }
}

/// Groups transactions by eid, keeping first-appearance order of chains
/// and plan order within each chain.
fn group_by_chain(transactions: Vec<&PlannedTransaction>) -> Vec<(EndpointId, Vec<(usize, PlannedTransaction)>)> {
    let mut groups: Vec<(EndpointId, Vec<(usize, PlannedTransaction)>)> = Vec::new();
    let mut slot: HashMap<EndpointId, usize> = HashMap::new();
    for (index, tx) in transactions.into_iter().enumerate() {
        let eid = tx.point.eid;
        let i = *slot.entry(eid).or_insert_with(|| {
            groups.push((eid, Vec::new()));
            groups.len() - 1
        });
        groups[i].1.push((index, tx.clone()));
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::family::ChainFamily;
    use crate::chain::simulated::{Faults, SimulatedNetwork};
    use crate::configure::testing::{arb, eth, state, ARB, ETH, LIB};
    use crate::convergence::planner::Planner;
    use crate::factory::SdkFactory;
    use crate::graph::{ConfigGraph, GraphBuilder};
    use crate::types::config::{EdgeConfig, PeerTarget, RateLimit};
    use crate::types::num::Uint;
    use crate::types::settings::BackoffStrategy;

    fn edge() -> EdgeConfig {
        EdgeConfig {
            send_library: Some(LIB.into()),
            peer: Some(PeerTarget::Counterpart),
            rate_limit: Some(RateLimit {
                capacity: Uint::from(100u64),
                refill_per_second: Uint::from(1u64),
            }),
            ..EdgeConfig::default()
        }
    }

    fn graph() -> ConfigGraph {
        GraphBuilder::new()
            .connect(eth(), arb(), edge())
            .connect(arb(), eth(), edge())
            .build()
            .unwrap()
    }

    async fn plan(network: &SimulatedNetwork) -> Plan {
        let factory = SdkFactory::new().with_builder(ChainFamily::Evm, Arc::new(network.builder()));
        Planner::new(Arc::new(factory)).plan(&graph()).await
    }

    fn executor(network: &SimulatedNetwork, retries: u32) -> TransactionExecutor {
        TransactionExecutor::new(
            Arc::new(network.signer()),
            RetryPolicy::new(retries, BackoffStrategy::Fixed, 10),
        )
    }

    #[test]
    fn grouping_keeps_first_appearance_order() {
        let tx = |eid: u32, d: &str| PlannedTransaction::new(crate::types::point::ChainPoint::new(eid, "0x01"), Default::default(), d);
        let txs = vec![tx(2, "a"), tx(1, "b"), tx(2, "c")];
        let groups = group_by_chain(txs.iter().collect());
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, 2);
        assert_eq!(groups[0].1.iter().map(|(i, _)| *i).collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(groups[1].1[0].0, 1);
    }

    #[tokio::test]
    async fn plan_execute_plan_is_idempotent() {
        let network = SimulatedNetwork::new(state());
        let first = plan(&network).await;
        assert_eq!(first.transactions().len(), 6);

        let results = executor(&network, 0).execute(&first).await;
        assert!(results.iter().all(|r| r.is_confirmed()));

        let second = plan(&network).await;
        assert!(second.is_empty());
        assert!(second.connections.iter().all(|c| c.is_up_to_date()));
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_are_retried() {
        let network = SimulatedNetwork::new(state()).with_faults(Faults::default().transient(ETH, 2));
        let p = plan(&network).await;
        let results = executor(&network, 3).execute(&p).await;
        assert!(results.iter().all(|r| r.is_confirmed()));
        assert_eq!(results[0].attempts, 3);
        assert_eq!(results[1].attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_fail_the_transaction() {
        let network = SimulatedNetwork::new(state()).with_faults(Faults::default().transient(ETH, 5));
        let p = plan(&network).await;
        let results = executor(&network, 1).execute(&p).await;
        assert_eq!(results[0].outcome, Outcome::Failed(SubmitError::Timeout));
        assert_eq!(results[0].attempts, 2);
    }

    #[tokio::test]
    async fn permanent_failure_skips_rest_of_chain_only() {
        let network = SimulatedNetwork::new(state()).with_faults(Faults::default().revert(ETH, "paused"));
        let p = plan(&network).await;
        let results = executor(&network, 3).execute(&p).await;

        let eth_results: Vec<&ExecutionResult> = results.iter().filter(|r| r.transaction.point.eid == ETH).collect();
        assert!(matches!(eth_results[0].outcome, Outcome::Failed(SubmitError::Reverted(_))));
        assert_eq!(eth_results[0].attempts, 1);
        assert!(eth_results[1..]
            .iter()
            .all(|r| r.outcome == Outcome::Skipped(SkipReason::EarlierFailure)));
        assert_eq!(network.submissions(ETH).await, 1);

        assert!(results
            .iter()
            .filter(|r| r.transaction.point.eid == ARB)
            .all(|r| r.is_confirmed()));

        // Only the ETH side is left to do.
        let again = plan(&network).await;
        assert!(again.transactions().iter().all(|t| t.point.eid == ETH));
        assert_eq!(again.transactions().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn parallel_chains_overlap() {
        let network = SimulatedNetwork::new(state()).with_latency(std::time::Duration::from_millis(100));
        let p = plan(&network).await;

        let start = tokio::time::Instant::now();
        let results = executor(&network, 0).with_parallel_chains(true).execute(&p).await;
        let elapsed = start.elapsed();

        assert!(results.iter().all(|r| r.is_confirmed()));
        assert_eq!(results.iter().map(|r| r.index).collect::<Vec<_>>(), (0..6).collect::<Vec<_>>());
        // Three transactions per chain, chains side by side.
        assert!(elapsed < std::time::Duration::from_millis(400), "took {:?}", elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_retry_backoff() {
        let network = SimulatedNetwork::new(state()).with_faults(Faults::default().transient(ETH, 5));
        let p = plan(&network).await;
        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
            canceller.cancel();
        });

        let executor = TransactionExecutor::new(
            Arc::new(network.signer()),
            RetryPolicy::new(3, BackoffStrategy::Fixed, 10_000),
        )
        .with_cancellation(token);
        let start = tokio::time::Instant::now();
        let results = executor.execute(&p).await;

        assert!(start.elapsed() < std::time::Duration::from_secs(10));
        assert_eq!(results[0].outcome, Outcome::Skipped(SkipReason::Cancelled));
        assert_eq!(results[0].attempts, 1);
        assert!(results
            .iter()
            .all(|r| r.outcome == Outcome::Skipped(SkipReason::Cancelled)));
        assert_eq!(network.submissions(ETH).await, 1);
    }

    #[tokio::test]
    async fn cancelled_before_start_skips_everything() {
        let network = SimulatedNetwork::new(state());
        let p = plan(&network).await;
        let token = CancellationToken::new();
        token.cancel();
        let results = executor(&network, 0).with_cancellation(token).execute(&p).await;
        assert!(results
            .iter()
            .all(|r| r.outcome == Outcome::Skipped(SkipReason::Cancelled)));
        assert_eq!(network.submissions(ETH).await, 0);
    }
}
