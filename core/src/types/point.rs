//! Contract coordinates: where a deployed OApp lives and which way a pathway points.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Identifier of a logical chain within the messaging system.
pub type EndpointId = u32;

// ---------------------------------------------------------------------------
// ChainPoint
// ---------------------------------------------------------------------------

/// A deployed contract instance on one chain.
///
/// Identity is `(eid, address)`. The contract name is carried for display
/// and for resolving graph references by name; it never takes part in
/// equality or hashing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainPoint {
    pub eid: EndpointId,
    pub address: String,
    #[serde(default, rename = "name", skip_serializing_if = "Option::is_none")]
    pub contract_name: Option<String>,
}

impl ChainPoint {
    pub fn new(eid: EndpointId, address: impl Into<String>) -> Self {
        ChainPoint {
            eid,
            address: address.into(),
            contract_name: None,
        }
    }

    pub fn named(eid: EndpointId, address: impl Into<String>, name: impl Into<String>) -> Self {
        ChainPoint {
            eid,
            address: address.into(),
            contract_name: Some(name.into()),
        }
    }

    pub fn key(&self) -> PointKey {
        PointKey::new(self.eid, &self.address)
    }
}

impl PartialEq for ChainPoint {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for ChainPoint {}

impl std::hash::Hash for ChainPoint {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl fmt::Display for ChainPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.contract_name {
            Some(name) => write!(f, "{} ({}) @ eid {}", name, self.address, self.eid),
            None => write!(f, "{} @ eid {}", self.address, self.eid),
        }
    }
}

// ---------------------------------------------------------------------------
// PointKey
// ---------------------------------------------------------------------------

/// Hashable identity of a `ChainPoint`.
///
/// Hex addresses are compared case-insensitively, so they are lowercased
/// here. Anything else (base58 and friends) is case-sensitive and kept as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PointKey {
    pub eid: EndpointId,
    pub address: String,
}

impl PointKey {
    pub fn new(eid: EndpointId, address: &str) -> Self {
        let address = if address.starts_with("0x") || address.starts_with("0X") {
            address.to_ascii_lowercase()
        } else {
            address.to_string()
        };
        PointKey { eid, address }
    }
}

impl fmt::Display for PointKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.eid, self.address)
    }
}

impl FromStr for PointKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (eid, address) = s
            .split_once(':')
            .ok_or_else(|| format!("expected '<eid>:<address>', got '{}'", s))?;
        let eid = eid
            .trim()
            .parse::<EndpointId>()
            .map_err(|e| format!("invalid eid in '{}': {}", s, e))?;
        if address.trim().is_empty() {
            return Err(format!("missing address in '{}'", s));
        }
        Ok(PointKey::new(eid, address.trim()))
    }
}

// ---------------------------------------------------------------------------
// PathwayVector
// ---------------------------------------------------------------------------

/// A directional pathway. `from` is the chain whose contract gets configured.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathwayVector {
    pub from: ChainPoint,
    pub to: ChainPoint,
}

impl PathwayVector {
    pub fn new(from: ChainPoint, to: ChainPoint) -> Self {
        PathwayVector { from, to }
    }

    pub fn is_loopback(&self) -> bool {
        self.from.eid == self.to.eid
    }
}

impl fmt::Display for PathwayVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} → {}", self.from, self.to)
    }
}
