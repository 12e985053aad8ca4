//! Wire documents: the YAML/JSON form of a `ConfigGraph`.
//!
//! ```yaml
//! contracts:
//!   - contract: { eid: 30101, address: "0x...", name: MyOFT }
//!     config: { delegate: "0x..." }
//! connections:
//!   - from: MyOFT                      # by name
//!     to: "30110:0x..."                # or eid:address
//!     config:
//!       send_library: "0x..."
//!       peer: counterpart
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::builder::{GraphBuilder, GraphError};
use super::ConfigGraph;
use crate::types::config::{EdgeConfig, NodeConfig};
use crate::types::point::{ChainPoint, PointKey};

/// A connection endpoint: a full point, an `eid:address` string or the
/// name of a declared contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EndpointRef {
    Point(ChainPoint),
    Reference(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractEntry {
    pub contract: ChainPoint,
    #[serde(default)]
    pub config: NodeConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionEntry {
    pub from: EndpointRef,
    pub to: EndpointRef,
    #[serde(default)]
    pub config: EdgeConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireDocument {
    #[serde(default)]
    pub contracts: Vec<ContractEntry>,
    #[serde(default)]
    pub connections: Vec<ConnectionEntry>,
}

impl WireDocument {
    pub fn from_yaml(content: &str) -> Result<WireDocument, GraphError> {
        serde_yaml::from_str(content).map_err(|e| GraphError::Parse(e.to_string()))
    }

    pub fn from_json(content: &str) -> Result<WireDocument, GraphError> {
        serde_json::from_str(content).map_err(|e| GraphError::Parse(e.to_string()))
    }

    /// Reads a document; `.json` files are parsed as JSON, anything else as YAML.
    pub fn load(path: &Path) -> Result<WireDocument, GraphError> {
        let content = std::fs::read_to_string(path).map_err(|e| GraphError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => WireDocument::from_json(&content),
            _ => WireDocument::from_yaml(&content),
        }
    }

    pub fn into_graph(self) -> Result<ConfigGraph, GraphError> {
        let declared: Vec<ChainPoint> = self.contracts.iter().map(|c| c.contract.clone()).collect();
        let mut builder = GraphBuilder::new();
        for entry in self.contracts {
            builder = builder.contract(entry.contract, entry.config);
        }
        for entry in self.connections {
            let from = resolve(&declared, entry.from)?;
            let to = resolve(&declared, entry.to)?;
            builder = builder.connect(from, to, entry.config);
        }
        builder.build()
    }
}

fn resolve(declared: &[ChainPoint], endpoint: EndpointRef) -> Result<ChainPoint, GraphError> {
    let reference = match endpoint {
        EndpointRef::Point(point) => return Ok(with_declared_name(declared, point)),
        EndpointRef::Reference(reference) => reference,
    };

    let mut named = declared
        .iter()
        .filter(|p| p.contract_name.as_deref() == Some(reference.as_str()));
    if let Some(point) = named.next() {
        if named.next().is_some() {
            return Err(GraphError::AmbiguousName(reference));
        }
        return Ok(point.clone());
    }

    let key: PointKey = reference
        .parse()
        .map_err(|_| GraphError::UnknownContract(reference.clone()))?;
    Ok(with_declared_name(
        declared,
        ChainPoint::new(key.eid, key.address),
    ))
}

/// Picks up the declared name of a contract referenced by coordinates.
fn with_declared_name(declared: &[ChainPoint], point: ChainPoint) -> ChainPoint {
    if point.contract_name.is_some() {
        return point;
    }
    declared
        .iter()
        .find(|d| d.key() == point.key())
        .cloned()
        .unwrap_or(point)
}
