//! Markdown report of a planning (and optionally execution) run.
//!
//! Every connection appears once: up to date, with its transactions and
//! their outcome, or with the reason it could not be planned.

use std::collections::HashMap;

use super::executor::{ExecutionResult, ExecutionSummary, Outcome, SkipReason};
use super::planner::Plan;
use crate::types::transaction::PlannedTransaction;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxStatus {
    Planned,
    Confirmed(String),
    Failed(String),
    Skipped(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxLine {
    pub description: String,
    pub status: TxStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// The connection vector or contract.
    pub subject: String,
    pub failure: Option<String>,
    pub errors: Vec<String>,
    pub transactions: Vec<TxLine>,
}

impl Section {
    pub fn is_up_to_date(&self) -> bool {
        self.failure.is_none() && self.errors.is_empty() && self.transactions.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WireReport {
    pub connections: Vec<Section>,
    pub contracts: Vec<Section>,
    pub summary: Option<ExecutionSummary>,
}

impl WireReport {
    pub fn from_plan(plan: &Plan) -> WireReport {
        WireReport::build(plan, &HashMap::new(), None)
    }

    pub fn from_execution(plan: &Plan, results: &[ExecutionResult]) -> WireReport {
        let by_index: HashMap<usize, &ExecutionResult> = results.iter().map(|r| (r.index, r)).collect();
        WireReport::build(plan, &by_index, Some(ExecutionSummary::of(results)))
    }

    fn build(
        plan: &Plan,
        results: &HashMap<usize, &ExecutionResult>,
        summary: Option<ExecutionSummary>,
    ) -> WireReport {
        let mut index = 0;
        let mut lines = |txs: &[PlannedTransaction]| -> Vec<TxLine> {
            txs.iter()
                .map(|tx| {
                    let status = results
                        .get(&index)
                        .map(|r| status_of(&r.outcome))
                        .unwrap_or(TxStatus::Planned);
                    index += 1;
                    TxLine {
                        description: tx.description.clone(),
                        status,
                    }
                })
                .collect()
        };

        let connections = plan
            .connections
            .iter()
            .map(|c| Section {
                subject: c.vector.to_string(),
                failure: c.failure.as_ref().map(|f| f.to_string()),
                errors: c
                    .errors
                    .iter()
                    .map(|e| format!("{}: {}", e.concern, e.error))
                    .collect(),
                transactions: lines(&c.transactions),
            })
            .collect();
        let contracts = plan
            .nodes
            .iter()
            .map(|n| Section {
                subject: n.point.to_string(),
                failure: n.failure.as_ref().map(|f| f.to_string()),
                errors: n
                    .errors
                    .iter()
                    .map(|e| format!("{}: {}", e.concern, e.error))
                    .collect(),
                transactions: lines(&n.transactions),
            })
            .collect();

        WireReport {
            connections,
            contracts,
            summary,
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str("# Wiring Report\n\n");

        // --- Summary ---
        let up_to_date = self.connections.iter().filter(|s| s.is_up_to_date()).count();
        let failed = self.connections.iter().filter(|s| s.failure.is_some()).count();
        out.push_str(&format!("- **Connections:** {}\n", self.connections.len()));
        out.push_str(&format!("- **Up to date:** {}\n", up_to_date));
        out.push_str(&format!("- **Failed to plan:** {}\n", failed));
        if let Some(s) = &self.summary {
            out.push_str(&format!(
                "- **Transactions:** {} confirmed, {} failed, {} skipped\n",
                s.confirmed, s.failed, s.skipped
            ));
        }
        out.push('\n');

        // --- Connections ---
        out.push_str("## Connections\n\n");
        if self.connections.is_empty() {
            out.push_str("No connections.\n\n");
        }
        for section in &self.connections {
            render_section(&mut out, section);
        }

        // --- Contracts ---
        if !self.contracts.is_empty() {
            out.push_str("## Contracts\n\n");
            for section in &self.contracts {
                render_section(&mut out, section);
            }
        }
        out
    }
}

fn status_of(outcome: &Outcome) -> TxStatus {
    match outcome {
        Outcome::Confirmed(receipt) => TxStatus::Confirmed(receipt.transaction_hash.clone()),
        Outcome::Failed(e) => TxStatus::Failed(e.to_string()),
        Outcome::Skipped(SkipReason::EarlierFailure) => {
            TxStatus::Skipped("earlier transaction on this chain failed".into())
        }
        Outcome::Skipped(SkipReason::Cancelled) => TxStatus::Skipped("cancelled".into()),
    }
}

fn render_section(out: &mut String, section: &Section) {
    out.push_str(&format!("### {}\n\n", section.subject));
    if let Some(failure) = &section.failure {
        out.push_str(&format!("**Failed:** {}\n\n", failure));
        return;
    }
    if section.is_up_to_date() {
        out.push_str("No changes needed.\n\n");
        return;
    }
    for e in &section.errors {
        out.push_str(&format!("- **Error:** {}\n", e));
    }
    if !section.errors.is_empty() {
        out.push('\n');
    }
    if section.transactions.is_empty() {
        return;
    }
    out.push_str("| # | Transaction | Status |\n");
    out.push_str("|---|-------------|--------|\n");
    for (i, tx) in section.transactions.iter().enumerate() {
        let status = match &tx.status {
            TxStatus::Planned => "planned".to_string(),
            TxStatus::Confirmed(hash) => format!("confirmed `{}`", hash),
            TxStatus::Failed(reason) => format!("failed: {}", reason),
            TxStatus::Skipped(reason) => format!("skipped: {}", reason),
        };
        out.push_str(&format!("| {} | `{}` | {} |\n", i + 1, tx.description, status));
    }
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::family::ChainFamily;
    use crate::chain::simulated::{Faults, SimulatedNetwork};
    use crate::configure::testing::{arb, eth, state, ETH};
    use crate::convergence::executor::TransactionExecutor;
    use crate::convergence::planner::Planner;
    use crate::convergence::retry::RetryPolicy;
    use crate::factory::SdkFactory;
    use crate::graph::{ConfigGraph, GraphBuilder};
    use crate::types::config::{EdgeConfig, NodeConfig, PeerTarget};
    use crate::types::point::ChainPoint;
    use crate::types::settings::BackoffStrategy;
    use std::sync::Arc;

    fn graph() -> ConfigGraph {
        let peer = EdgeConfig {
            peer: Some(PeerTarget::Counterpart),
            ..EdgeConfig::default()
        };
        GraphBuilder::new()
            .connect(eth(), arb(), peer.clone())
            .connect(arb(), eth(), EdgeConfig::default())
            .connect(arb(), ChainPoint::new(30168, "11111111111111111111111111111111"), peer)
            .build()
            .unwrap()
    }

    async fn plan(network: &SimulatedNetwork) -> Plan {
        let factory = SdkFactory::new().with_builder(ChainFamily::Evm, Arc::new(network.builder()));
        Planner::new(Arc::new(factory)).plan(&graph()).await
    }

    #[tokio::test]
    async fn plan_report_lists_every_connection() {
        let network = SimulatedNetwork::new(state());
        let report = WireReport::from_plan(&plan(&network).await);
        assert_eq!(report.connections.len(), 3);
        assert_eq!(report.connections[0].transactions[0].status, TxStatus::Planned);
        assert!(report.connections[1].is_up_to_date());
        assert!(report.connections[2].failure.is_some());

        let text = report.render();
        assert!(text.contains("No changes needed."));
        assert!(text.contains("**Failed:** unsupported chain for eid 30168"));
        assert!(text.contains("| 1 | `setPeer(30110"));
    }

    #[tokio::test]
    async fn execution_report_shows_outcomes() {
        let network = SimulatedNetwork::new(state()).with_faults(Faults::default().revert(ETH, "paused"));
        let p = plan(&network).await;
        let results = TransactionExecutor::new(Arc::new(network.signer()), RetryPolicy::new(0, BackoffStrategy::Fixed, 0))
            .execute(&p)
            .await;
        let report = WireReport::from_execution(&p, &results);
        assert!(matches!(report.connections[0].transactions[0].status, TxStatus::Failed(_)));
        assert_eq!(
            report.summary,
            Some(ExecutionSummary {
                confirmed: 0,
                failed: 1,
                skipped: 0
            })
        );
        assert!(report.render().contains("0 confirmed, 1 failed, 0 skipped"));
    }

    #[tokio::test]
    async fn contract_errors_are_listed() {
        let network = SimulatedNetwork::new(state());
        let graph = GraphBuilder::new()
            .contract(
                eth(),
                NodeConfig {
                    default_fee_bp: Some(20_000),
                    ..NodeConfig::default()
                },
            )
            .build()
            .unwrap();
        let factory = SdkFactory::new().with_builder(ChainFamily::Evm, Arc::new(network.builder()));
        let p = Planner::new(Arc::new(factory)).plan(&graph).await;
        let report = WireReport::from_plan(&p);
        assert_eq!(report.contracts.len(), 1);
        assert!(report
            .render()
            .contains("- **Error:** default_fee_bp: invalid fee_bp: 20000 exceeds 10000"));
    }
}
