//! Transactions as they move from the planner through signing to a receipt.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::num::Bytes;
use super::point::ChainPoint;

/// An atomic call on one chain, produced by a configurator.
///
/// Planned transactions are built fresh on every run and are never reused
/// across runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedTransaction {
    pub point: ChainPoint,
    pub payload: Bytes,
    pub description: String,
}

impl PlannedTransaction {
    pub fn new(point: ChainPoint, payload: Bytes, description: impl Into<String>) -> Self {
        PlannedTransaction {
            point,
            payload,
            description: description.into(),
        }
    }
}

impl fmt::Display for PlannedTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on {}", self.description, self.point)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub transaction: PlannedTransaction,
    pub signature: Bytes,
}

/// Confirmation of a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub transaction_hash: String,
    pub point: ChainPoint,
}

impl fmt::Display for Receipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.transaction_hash)
    }
}
