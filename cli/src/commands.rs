//! Subcommand handlers over a simulated chain network.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use lz_wire_core::chain::family::{protocol_version, ChainFamily, ProtocolVersion};
use lz_wire_core::chain::simulated::SimulatedNetwork;
use lz_wire_core::chain::state::ChainState;
use lz_wire_core::convergence::executor::{ExecutionSummary, TransactionExecutor};
use lz_wire_core::convergence::planner::{Plan, Planner};
use lz_wire_core::convergence::report::WireReport;
use lz_wire_core::convergence::retry::RetryPolicy;
use lz_wire_core::factory::SdkFactory;
use lz_wire_core::graph::document::WireDocument;
use lz_wire_core::graph::ConfigGraph;
use lz_wire_core::inspect::{self, Inspector};
use lz_wire_core::settings;
use lz_wire_core::types::settings::Settings;

use crate::Inputs;

struct Session {
    graph: ConfigGraph,
    settings: Settings,
    network: SimulatedNetwork,
}

impl Session {
    fn open(inputs: &Inputs) -> Result<Session> {
        let graph = WireDocument::load(&inputs.graph)
            .and_then(WireDocument::into_graph)
            .with_context(|| format!("loading wire graph {}", inputs.graph.display()))?;
        let settings = match &inputs.settings {
            Some(path) => settings::load(path)?,
            None => settings::from_env()?,
        };
        let state = read_state(&inputs.state)?;

        let mut network = SimulatedNetwork::new(state);
        for node in graph.contracts() {
            if protocol_version(node.point.eid) == ProtocolVersion::V1 {
                network = network.with_indexed_libraries(node.point.eid);
            }
        }
        info!(
            contracts = graph.contracts().len(),
            connections = graph.connections().len(),
            "loaded wire graph"
        );
        Ok(Session {
            graph,
            settings,
            network,
        })
    }

    fn factory(&self) -> Arc<SdkFactory> {
        let builder = Arc::new(self.network.builder());
        let factory = SdkFactory::new()
            .with_builder(ChainFamily::Evm, builder.clone())
            .with_builder(ChainFamily::Solana, builder.clone())
            .with_builder(ChainFamily::Aptos, builder);
        Arc::new(factory)
    }

    async fn plan(&self) -> Plan {
        Planner::new(self.factory())
            .with_concurrency(self.settings.read_concurrency)
            .plan(&self.graph)
            .await
    }
}

fn read_state(path: &Path) -> Result<ChainState> {
    let content = std::fs::read_to_string(path).with_context(|| format!("reading chain state {}", path.display()))?;
    let state = serde_json::from_str(&content).with_context(|| format!("parsing chain state {}", path.display()))?;
    Ok(state)
}

fn write_state(path: &Path, state: &ChainState) -> Result<()> {
    let content = serde_json::to_string_pretty(state)?;
    std::fs::write(path, content).with_context(|| format!("writing chain state {}", path.display()))?;
    Ok(())
}

pub async fn plan(inputs: &Inputs) -> Result<()> {
    let session = Session::open(inputs)?;
    let plan = session.plan().await;
    println!("{}", WireReport::from_plan(&plan).render());
    if plan.has_failures() {
        bail!("some connections could not be planned");
    }
    Ok(())
}

pub async fn config_get(inputs: &Inputs) -> Result<()> {
    let session = Session::open(inputs)?;
    let inspections = Inspector::new(session.factory())
        .with_concurrency(session.settings.read_concurrency)
        .inspect(&session.graph)
        .await;
    println!("{}", inspect::render(&inspections));
    if inspections.iter().any(|i| i.config.is_err()) {
        bail!("some pathways could not be read");
    }
    Ok(())
}

pub async fn wire(inputs: &Inputs, parallel: bool, output: &Path) -> Result<()> {
    let session = Session::open(inputs)?;
    let plan = session.plan().await;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, finishing the transaction in flight");
            on_interrupt.cancel();
        }
    });

    let executor = TransactionExecutor::new(
        Arc::new(session.network.signer()),
        RetryPolicy::from(&session.settings.retry),
    )
    .with_parallel_chains(parallel || session.settings.parallel_chains)
    .with_cancellation(cancel);
    let results = executor.execute(&plan).await;

    write_state(output, &session.network.snapshot().await)?;
    println!("{}", WireReport::from_execution(&plan, &results).render());

    let summary = ExecutionSummary::of(&results);
    if summary.failed > 0 || summary.skipped > 0 {
        bail!(
            "{} transaction(s) failed and {} were skipped",
            summary.failed,
            summary.skipped
        );
    }
    if plan.has_failures() {
        bail!("some connections could not be planned");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("lzwire-{}-{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    const GRAPH: &str = r#"
contracts:
  - contract: { eid: 30101, address: "0x00000000000000000000000000000000000000aa", name: EthOFT }
  - contract: { eid: 30110, address: "0x00000000000000000000000000000000000000bb", name: ArbOFT }
connections:
  - from: EthOFT
    to: ArbOFT
    config:
      peer: counterpart
  - from: ArbOFT
    to: EthOFT
    config:
      peer: counterpart
"#;

    fn inputs(dir: &Path) -> Inputs {
        let graph = dir.join("wire.yaml");
        let state = dir.join("state.json");
        std::fs::write(&graph, GRAPH).unwrap();
        write_state(&state, &ChainState::default()).unwrap();
        Inputs {
            graph,
            state,
            settings: None,
        }
    }

    #[tokio::test]
    async fn wire_then_plan_is_clean() {
        let dir = scratch("wire");
        let inputs = inputs(&dir);
        wire(&inputs, false, &inputs.state).await.unwrap();

        let after = read_state(&inputs.state).unwrap();
        assert_eq!(after.contracts.len(), 2);

        let session = Session::open(&inputs).unwrap();
        assert!(session.plan().await.is_empty());
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[tokio::test]
    async fn plan_does_not_touch_state() {
        let dir = scratch("plan");
        let inputs = inputs(&dir);
        plan(&inputs).await.unwrap();
        assert_eq!(read_state(&inputs.state).unwrap(), ChainState::default());
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[tokio::test]
    async fn config_get_reads_every_pathway() {
        let dir = scratch("config");
        let inputs = inputs(&dir);
        config_get(&inputs).await.unwrap();

        let session = Session::open(&inputs).unwrap();
        let inspections = Inspector::new(session.factory()).inspect(&session.graph).await;
        assert_eq!(inspections.len(), 2);
        assert!(inspections.iter().all(|i| i.config.is_ok()));
        std::fs::remove_dir_all(dir).unwrap();
    }
}
