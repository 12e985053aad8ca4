//! The desired wiring: contracts and the directional connections between them.

pub mod builder;
pub mod document;

use serde::{Deserialize, Serialize};

use crate::types::config::{EdgeConfig, NodeConfig};
use crate::types::point::{ChainPoint, PathwayVector, PointKey};

pub use builder::{GraphBuilder, GraphError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractNode {
    pub point: ChainPoint,
    #[serde(default)]
    pub config: NodeConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub vector: PathwayVector,
    #[serde(default)]
    pub config: EdgeConfig,
}

/// A validated graph. Every connection endpoint is one of `contracts`.
///
/// Built through `GraphBuilder`; connection order is the declaration order
/// and carries no meaning beyond stable reporting.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConfigGraph {
    contracts: Vec<ContractNode>,
    connections: Vec<Connection>,
}

impl ConfigGraph {
    pub fn contracts(&self) -> &[ContractNode] {
        &self.contracts
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn contract(&self, key: &PointKey) -> Option<&ContractNode> {
        self.contracts.iter().find(|c| &c.point.key() == key)
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty() && self.connections.is_empty()
    }
}
