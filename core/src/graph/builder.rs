//! Graph construction and validation.

use std::collections::HashSet;

use thiserror::Error;
use tracing::debug;

use super::{ConfigGraph, Connection, ContractNode};
use crate::types::config::{EdgeConfig, NodeConfig};
use crate::types::point::{ChainPoint, PathwayVector, PointKey};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("contract {0} is declared more than once")]
    DuplicateContract(PointKey),
    #[error("connection {0} is declared more than once")]
    DuplicateConnection(String),
    #[error("connection {0} starts and ends on the same chain")]
    Loopback(String),
    #[error("contract on eid {0} has an empty address")]
    EmptyAddress(u32),
    #[error("unknown contract reference '{0}'")]
    UnknownContract(String),
    #[error("contract name '{0}' is ambiguous")]
    AmbiguousName(String),
    #[error("cannot parse wire document: {0}")]
    Parse(String),
    #[error("cannot read {path}: {reason}")]
    Read { path: String, reason: String },
}

/// Collects contracts and connections, then validates them into a
/// `ConfigGraph`.
///
/// Connection endpoints that were never declared are added as contracts
/// with an empty `NodeConfig`.
#[derive(Debug, Clone, Default)]
pub struct GraphBuilder {
    contracts: Vec<ContractNode>,
    connections: Vec<Connection>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        GraphBuilder::default()
    }

    pub fn contract(mut self, point: ChainPoint, config: NodeConfig) -> Self {
        self.contracts.push(ContractNode { point, config });
        self
    }

    pub fn connect(mut self, from: ChainPoint, to: ChainPoint, config: EdgeConfig) -> Self {
        self.connections.push(Connection {
            vector: PathwayVector::new(from, to),
            config,
        });
        self
    }

    /// Connects every ordered pair of declared contracts on different chains.
    /// `config` returns the edge config for a pair, or `None` to leave the
    /// pair unconnected.
    pub fn mesh<F>(mut self, config: F) -> Self
    where
        F: Fn(&ChainPoint, &ChainPoint) -> Option<EdgeConfig>,
    {
        let points: Vec<ChainPoint> = self.contracts.iter().map(|c| c.point.clone()).collect();
        for from in &points {
            for to in &points {
                if from.eid == to.eid {
                    continue;
                }
                if let Some(edge) = config(from, to) {
                    self = self.connect(from.clone(), to.clone(), edge);
                }
            }
        }
        self
    }

    pub fn build(self) -> Result<ConfigGraph, GraphError> {
        let mut seen = HashSet::new();
        let mut contracts = Vec::with_capacity(self.contracts.len());
        for node in self.contracts {
            check_address(&node.point)?;
            if !seen.insert(node.point.key()) {
                return Err(GraphError::DuplicateContract(node.point.key()));
            }
            contracts.push(node);
        }

        let mut edges = HashSet::new();
        for conn in &self.connections {
            let vector = &conn.vector;
            if vector.is_loopback() {
                return Err(GraphError::Loopback(vector.to_string()));
            }
            if !edges.insert((vector.from.key(), vector.to.key())) {
                return Err(GraphError::DuplicateConnection(vector.to_string()));
            }
            for point in [&vector.from, &vector.to] {
                check_address(point)?;
                if seen.insert(point.key()) {
                    debug!(contract = %point, "inferring contract from connection");
                    contracts.push(ContractNode {
                        point: point.clone(),
                        config: NodeConfig::default(),
                    });
                }
            }
        }

        Ok(ConfigGraph {
            contracts,
            connections: self.connections,
        })
    }
}

fn check_address(point: &ChainPoint) -> Result<(), GraphError> {
    if point.address.trim().is_empty() {
        return Err(GraphError::EmptyAddress(point.eid));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(eid: u32, addr: &str) -> ChainPoint {
        ChainPoint::new(eid, addr)
    }

    #[test]
    fn endpoints_are_inferred() {
        let graph = GraphBuilder::new()
            .contract(p(30101, "0xaa"), NodeConfig::default())
            .connect(p(30101, "0xAA"), p(30110, "0xbb"), EdgeConfig::default())
            .build()
            .unwrap();
        assert_eq!(graph.contracts().len(), 2);
        assert!(graph.contract(&PointKey::new(30110, "0xbb")).is_some());
    }

    #[test]
    fn loopback_is_rejected() {
        let err = GraphBuilder::new()
            .connect(p(30101, "0xaa"), p(30101, "0xbb"), EdgeConfig::default())
            .build()
            .unwrap_err();
        assert!(matches!(err, GraphError::Loopback(_)));
    }

    #[test]
    fn duplicates_are_rejected() {
        let err = GraphBuilder::new()
            .contract(p(30101, "0xaa"), NodeConfig::default())
            .contract(p(30101, "0xAA"), NodeConfig::default())
            .build()
            .unwrap_err();
        assert!(matches!(err, GraphError::DuplicateContract(_)));

        let err = GraphBuilder::new()
            .connect(p(30101, "0xaa"), p(30110, "0xbb"), EdgeConfig::default())
            .connect(p(30101, "0xaa"), p(30110, "0xbb"), EdgeConfig::default())
            .build()
            .unwrap_err();
        assert!(matches!(err, GraphError::DuplicateConnection(_)));
    }

    #[test]
    fn mesh_connects_every_cross_chain_pair() {
        let graph = GraphBuilder::new()
            .contract(p(30101, "0xaa"), NodeConfig::default())
            .contract(p(30110, "0xbb"), NodeConfig::default())
            .contract(p(30111, "0xcc"), NodeConfig::default())
            .contract(p(30111, "0xdd"), NodeConfig::default())
            .mesh(|_, _| Some(EdgeConfig::default()))
            .build()
            .unwrap();
        // 4 contracts, 12 ordered pairs, minus the two same-chain pairs.
        assert_eq!(graph.connections().len(), 10);
        assert!(graph.connections().iter().all(|c| !c.vector.is_loopback()));
    }

    #[test]
    fn mesh_callback_can_skip_pairs() {
        let graph = GraphBuilder::new()
            .contract(p(30101, "0xaa"), NodeConfig::default())
            .contract(p(30110, "0xbb"), NodeConfig::default())
            .mesh(|from, _| (from.eid == 30101).then(EdgeConfig::default))
            .build()
            .unwrap();
        assert_eq!(graph.connections().len(), 1);
    }
}
