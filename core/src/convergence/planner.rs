//! Reconciliation planner: diffs desired against on-chain state and emits
//! the transactions needed to converge them.
//!
//! The planner is stateless. Every run reads the chains afresh, so a plan
//! computed after a partial execution contains only what is still drifted.
//! It never signs or submits anything itself.

use std::fmt;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, error, info, instrument, warn};

use crate::configure::{Concern, ConfigureError, ContractConcern, Pathway};
use crate::factory::{ResolveError, SdkFactory};
use crate::graph::{ConfigGraph, Connection, ContractNode};
use crate::types::point::{ChainPoint, PathwayVector};
use crate::types::transaction::PlannedTransaction;

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

/// Why a whole connection (or contract) produced no plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanFailure {
    Resolve(ResolveError),
    Read(ConfigureError),
}

impl fmt::Display for PlanFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanFailure::Resolve(e) => write!(f, "{}", e),
            PlanFailure::Read(e) => write!(f, "{}", e),
        }
    }
}

/// A configurator that failed while its siblings went on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcernFailure {
    pub concern: Concern,
    pub error: ConfigureError,
}

#[derive(Debug, Clone)]
pub struct ConnectionPlan {
    pub vector: PathwayVector,
    pub transactions: Vec<PlannedTransaction>,
    pub errors: Vec<ConcernFailure>,
    pub failure: Option<PlanFailure>,
}

impl ConnectionPlan {
    fn failed(vector: PathwayVector, failure: PlanFailure) -> Self {
        ConnectionPlan {
            vector,
            transactions: Vec::new(),
            errors: Vec::new(),
            failure: Some(failure),
        }
    }

    /// Nothing to do and nothing went wrong.
    pub fn is_up_to_date(&self) -> bool {
        self.transactions.is_empty() && self.errors.is_empty() && self.failure.is_none()
    }
}

/// A contract-level configurator that failed while its siblings went on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractConcernFailure {
    pub concern: ContractConcern,
    pub error: ConfigureError,
}

#[derive(Debug, Clone)]
pub struct NodePlan {
    pub point: ChainPoint,
    pub transactions: Vec<PlannedTransaction>,
    pub errors: Vec<ContractConcernFailure>,
    pub failure: Option<PlanFailure>,
}

impl NodePlan {
    fn failed(point: ChainPoint, failure: PlanFailure) -> Self {
        NodePlan {
            point,
            transactions: Vec::new(),
            errors: Vec::new(),
            failure: Some(failure),
        }
    }
}

/// Output of one planning run, in graph order.
#[derive(Debug, Clone, Default)]
pub struct Plan {
    pub connections: Vec<ConnectionPlan>,
    pub nodes: Vec<NodePlan>,
}

impl Plan {
    /// All transactions: connection transactions in graph order, then
    /// contract-level ones.
    pub fn transactions(&self) -> Vec<&PlannedTransaction> {
        self.connections
            .iter()
            .flat_map(|c| c.transactions.iter())
            .chain(self.nodes.iter().flat_map(|n| n.transactions.iter()))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions().is_empty()
    }

    /// Whether any connection, configurator or contract failed to plan.
    pub fn has_failures(&self) -> bool {
        self.connections
            .iter()
            .any(|c| c.failure.is_some() || !c.errors.is_empty())
            || self
                .nodes
                .iter()
                .any(|n| n.failure.is_some() || !n.errors.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Planner
// ---------------------------------------------------------------------------

pub struct Planner {
    factory: Arc<SdkFactory>,
    concurrency: usize,
}

impl Planner {
    pub fn new(factory: Arc<SdkFactory>) -> Self {
        Planner {
            factory,
            concurrency: 8,
        }
    }

    /// Upper bound on connections diffed at the same time.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub async fn plan(&self, graph: &ConfigGraph) -> Plan {
        let connections: Vec<ConnectionPlan> = stream::iter(graph.connections())
            .map(|connection| self.plan_connection(connection))
            .buffered(self.concurrency)
            .collect()
            .await;

        let nodes: Vec<NodePlan> = stream::iter(graph.contracts())
            .filter(|node| futures::future::ready(!node.config.is_empty()))
            .map(|node| self.plan_node(node))
            .buffered(self.concurrency)
            .collect()
            .await;

        let plan = Plan { connections, nodes };
        info!(
            connections = plan.connections.len(),
            transactions = plan.transactions().len(),
            failures = plan.has_failures(),
            "planning finished"
        );
        plan
    }

    #[instrument(skip_all, fields(vector = %connection.vector))]
    async fn plan_connection(&self, connection: &Connection) -> ConnectionPlan {
        let vector = &connection.vector;
        let from = match self.factory.resolve(&vector.from).await {
            Ok(adapter) => adapter,
            Err(e) => {
                warn!(error = %e, "cannot resolve source contract, skipping connection");
                return ConnectionPlan::failed(vector.clone(), PlanFailure::Resolve(e));
            }
        };
        let to = match self.factory.resolve(&vector.to).await {
            Ok(adapter) => adapter,
            Err(e) => {
                warn!(error = %e, "cannot resolve destination contract, skipping connection");
                return ConnectionPlan::failed(vector.clone(), PlanFailure::Resolve(e));
            }
        };

        let pathway = Pathway {
            from: from.as_ref(),
            to: to.as_ref(),
            vector,
            config: &connection.config,
        };
        let mut transactions = Vec::new();
        let mut errors = Vec::new();
        for concern in Concern::ALL {
            match concern.configure(&pathway).await {
                Ok(txs) => {
                    if !txs.is_empty() {
                        debug!(%concern, count = txs.len(), "planned transactions");
                    }
                    transactions.extend(txs);
                }
                Err(e) if e.is_fatal() => {
                    error!(%concern, error = %e, "read failed, abandoning connection");
                    return ConnectionPlan::failed(vector.clone(), PlanFailure::Read(e));
                }
                Err(e) => {
                    warn!(%concern, error = %e, "configurator failed");
                    errors.push(ConcernFailure { concern, error: e });
                }
            }
        }

        ConnectionPlan {
            vector: vector.clone(),
            transactions,
            errors,
            failure: None,
        }
    }

    #[instrument(skip_all, fields(point = %node.point))]
    async fn plan_node(&self, node: &ContractNode) -> NodePlan {
        let adapter = match self.factory.resolve(&node.point).await {
            Ok(adapter) => adapter,
            Err(e) => {
                warn!(error = %e, "cannot resolve contract");
                return NodePlan::failed(node.point.clone(), PlanFailure::Resolve(e));
            }
        };
        let mut transactions = Vec::new();
        let mut errors = Vec::new();
        for concern in ContractConcern::ALL {
            match concern.configure(adapter.as_ref(), &node.config).await {
                Ok(txs) => transactions.extend(txs),
                Err(e) if e.is_fatal() => {
                    error!(%concern, error = %e, "read failed, abandoning contract");
                    return NodePlan::failed(node.point.clone(), PlanFailure::Read(e));
                }
                Err(e) => {
                    warn!(%concern, error = %e, "contract configurator failed");
                    errors.push(ContractConcernFailure { concern, error: e });
                }
            }
        }
        NodePlan {
            point: node.point.clone(),
            transactions,
            errors,
            failure: None,
        }
    }
}
