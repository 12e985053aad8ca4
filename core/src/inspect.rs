//! Read-only view of the messaging config every pathway runs with.
//!
//! For each connection the source contract is asked for its libraries,
//! ULN and executor configs in three layers: what the contract set itself
//! (custom), what the endpoint applies when it sets nothing (default), and
//! the one in effect (active).

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{info, instrument, warn};

use crate::chain::{ChainAdapter, ConfigKind, Direction};
use crate::configure::{read_config, shape, ConfigureError};
use crate::convergence::planner::PlanFailure;
use crate::factory::SdkFactory;
use crate::graph::{ConfigGraph, Connection};
use crate::types::config::{ExecutorConfig, UlnConfig};
use crate::types::point::{EndpointId, PathwayVector};

// ---------------------------------------------------------------------------
// Layers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layers<T> {
    pub custom: Option<T>,
    pub default: Option<T>,
    pub active: Option<T>,
}

impl<T: Clone> Layers<T> {
    fn new(custom: Option<T>, default: Option<T>) -> Self {
        let active = custom.clone().or_else(|| default.clone());
        Layers { custom, default, active }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathwayConfig {
    pub send_library: Layers<String>,
    pub receive_library: Layers<String>,
    pub send_uln: Layers<UlnConfig>,
    pub executor: Layers<ExecutorConfig>,
    pub receive_uln: Layers<UlnConfig>,
}

#[derive(Debug, Clone)]
pub struct PathwayInspection {
    pub vector: PathwayVector,
    pub config: Result<PathwayConfig, PlanFailure>,
}

// ---------------------------------------------------------------------------
// Inspector
// ---------------------------------------------------------------------------

pub struct Inspector {
    factory: Arc<SdkFactory>,
    concurrency: usize,
}

impl Inspector {
    pub fn new(factory: Arc<SdkFactory>) -> Self {
        Inspector {
            factory,
            concurrency: 8,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub async fn inspect(&self, graph: &ConfigGraph) -> Vec<PathwayInspection> {
        let inspections: Vec<PathwayInspection> = stream::iter(graph.connections())
            .map(|connection| self.inspect_connection(connection))
            .buffered(self.concurrency)
            .collect()
            .await;
        info!(pathways = inspections.len(), "inspection finished");
        inspections
    }

    #[instrument(skip_all, fields(vector = %connection.vector))]
    async fn inspect_connection(&self, connection: &Connection) -> PathwayInspection {
        let vector = connection.vector.clone();
        let config = match self.factory.resolve(&vector.from).await {
            Ok(adapter) => read_layers(adapter.as_ref(), vector.to.eid)
                .await
                .map_err(PlanFailure::Read),
            Err(e) => {
                warn!(error = %e, "cannot resolve source contract");
                Err(PlanFailure::Resolve(e))
            }
        };
        PathwayInspection { vector, config }
    }
}

async fn read_library(
    adapter: &dyn ChainAdapter,
    direction: Direction,
    remote_eid: EndpointId,
) -> Result<Layers<String>, ConfigureError> {
    let kind = match direction {
        Direction::Send => ConfigKind::SendLibrary,
        Direction::Receive => ConfigKind::ReceiveLibrary,
    };
    let (kind, value) = read_config(adapter, kind, remote_eid).await?;
    let (current, is_default) = shape(&kind, remote_eid, value.into_library(&kind))?;
    let (kind, value) = read_config(adapter, ConfigKind::DefaultLibrary { direction }, remote_eid).await?;
    let (default, _) = shape(&kind, remote_eid, value.into_library(&kind))?;
    Ok(Layers::new((!is_default).then_some(current), Some(default)))
}

async fn read_uln(
    adapter: &dyn ChainAdapter,
    kind: ConfigKind,
    remote_eid: EndpointId,
) -> Result<Option<UlnConfig>, ConfigureError> {
    let (kind, value) = read_config(adapter, kind, remote_eid).await?;
    shape(&kind, remote_eid, value.into_uln(&kind))
}

async fn read_executor(
    adapter: &dyn ChainAdapter,
    kind: ConfigKind,
    remote_eid: EndpointId,
) -> Result<Option<ExecutorConfig>, ConfigureError> {
    let (kind, value) = read_config(adapter, kind, remote_eid).await?;
    shape(&kind, remote_eid, value.into_executor(&kind))
}

/// ULN and executor configs are read against the active library of their
/// direction.
async fn read_layers(adapter: &dyn ChainAdapter, remote_eid: EndpointId) -> Result<PathwayConfig, ConfigureError> {
    let send_library = read_library(adapter, Direction::Send, remote_eid).await?;
    let receive_library = read_library(adapter, Direction::Receive, remote_eid).await?;

    let send = send_library.active.clone().unwrap_or_default();
    let receive = receive_library.active.clone().unwrap_or_default();

    let send_uln = Layers::new(
        read_uln(
            adapter,
            ConfigKind::Uln {
                library: send.clone(),
                direction: Direction::Send,
            },
            remote_eid,
        )
        .await?,
        read_uln(
            adapter,
            ConfigKind::DefaultUln {
                library: send.clone(),
                direction: Direction::Send,
            },
            remote_eid,
        )
        .await?,
    );
    let executor = Layers::new(
        read_executor(adapter, ConfigKind::Executor { library: send.clone() }, remote_eid).await?,
        read_executor(adapter, ConfigKind::DefaultExecutor { library: send }, remote_eid).await?,
    );
    let receive_uln = Layers::new(
        read_uln(
            adapter,
            ConfigKind::Uln {
                library: receive.clone(),
                direction: Direction::Receive,
            },
            remote_eid,
        )
        .await?,
        read_uln(
            adapter,
            ConfigKind::DefaultUln {
                library: receive,
                direction: Direction::Receive,
            },
            remote_eid,
        )
        .await?,
    );

    Ok(PathwayConfig {
        send_library,
        receive_library,
        send_uln,
        executor,
        receive_uln,
    })
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn cell<T>(value: &Option<T>, describe: impl Fn(&T) -> String) -> String {
    match value {
        Some(v) => describe(v),
        None => "-".to_string(),
    }
}

fn describe_uln(uln: &UlnConfig) -> String {
    format!(
        "confirmations {}, required [{}], optional [{}] threshold {}",
        uln.confirmations,
        uln.required_dvns.join(", "),
        uln.optional_dvns.join(", "),
        uln.optional_dvn_threshold
    )
}

fn describe_executor(executor: &ExecutorConfig) -> String {
    format!("{}, max message size {}", executor.executor, executor.max_message_size)
}

fn row<T>(out: &mut String, label: &str, layers: &Layers<T>, describe: impl Fn(&T) -> String) {
    out.push_str(&format!(
        "| {} | {} | {} | {} |\n",
        label,
        cell(&layers.custom, &describe),
        cell(&layers.default, &describe),
        cell(&layers.active, &describe)
    ));
}

pub fn render(inspections: &[PathwayInspection]) -> String {
    let mut out = String::new();
    out.push_str("# Pathway Config\n\n");
    if inspections.is_empty() {
        out.push_str("No connections.\n");
        return out;
    }
    for inspection in inspections {
        out.push_str(&format!("## {}\n\n", inspection.vector));
        let config = match &inspection.config {
            Ok(config) => config,
            Err(failure) => {
                out.push_str(&format!("**Failed:** {}\n\n", failure));
                continue;
            }
        };
        out.push_str("| | Custom | Default | Active |\n");
        out.push_str("|---|--------|---------|--------|\n");
        row(&mut out, "Send library", &config.send_library, |s| s.clone());
        row(&mut out, "Receive library", &config.receive_library, |s| s.clone());
        row(&mut out, "Send ULN", &config.send_uln, describe_uln);
        row(&mut out, "Executor", &config.executor, describe_executor);
        row(&mut out, "Receive ULN", &config.receive_uln, describe_uln);
        out.push('\n');
    }
    out
}
