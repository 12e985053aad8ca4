//! Endpoint-id classification: stage, protocol version and chain family.
//!
//! Endpoint ids are laid out in ranges of ten thousand. The range encodes
//! protocol version and stage; `eid % 10_000` is the chain number shared by
//! every stage of the same chain.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::point::EndpointId;

const SOLANA_CHAIN: u32 = 168;
const APTOS_CHAIN: u32 = 108;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainFamily {
    Evm,
    Solana,
    Aptos,
}

impl ChainFamily {
    /// Byte width of a native address on this family.
    pub fn address_width(&self) -> usize {
        match self {
            ChainFamily::Evm => 20,
            ChainFamily::Solana | ChainFamily::Aptos => 32,
        }
    }
}

impl fmt::Display for ChainFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainFamily::Evm => write!(f, "evm"),
            ChainFamily::Solana => write!(f, "solana"),
            ChainFamily::Aptos => write!(f, "aptos"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Mainnet,
    Testnet,
    Sandbox,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProtocolVersion {
    V1,
    V2,
}

/// Everything derivable from an endpoint id alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EidInfo {
    pub eid: EndpointId,
    pub chain: u32,
    pub stage: Stage,
    pub version: ProtocolVersion,
    pub family: ChainFamily,
}

impl fmt::Display for EidInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "eid {} ({} {:?} {:?})",
            self.eid, self.family, self.stage, self.version
        )
    }
}

/// Classifies an endpoint id. Returns `None` for ids outside every known range.
pub fn classify(eid: EndpointId) -> Option<EidInfo> {
    let (version, stage) = match eid / 10_000 {
        0 if eid > 0 => (ProtocolVersion::V1, Stage::Mainnet),
        1 => (ProtocolVersion::V1, Stage::Testnet),
        2 => (ProtocolVersion::V1, Stage::Sandbox),
        3 => (ProtocolVersion::V2, Stage::Mainnet),
        4 => (ProtocolVersion::V2, Stage::Testnet),
        5 => (ProtocolVersion::V2, Stage::Sandbox),
        _ => return None,
    };
    let chain = eid % 10_000;
    if chain == 0 {
        return None;
    }
    let family = match chain {
        SOLANA_CHAIN => ChainFamily::Solana,
        APTOS_CHAIN => ChainFamily::Aptos,
        _ => ChainFamily::Evm,
    };
    Some(EidInfo {
        eid,
        chain,
        stage,
        version,
        family,
    })
}

/// Protocol version of an eid; unknown ids count as v2.
pub fn protocol_version(eid: EndpointId) -> ProtocolVersion {
    classify(eid)
        .map(|info| info.version)
        .unwrap_or(ProtocolVersion::V2)
}
