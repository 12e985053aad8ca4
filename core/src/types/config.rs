//! Desired configuration models.
//!
//! Every field of `EdgeConfig` and `NodeConfig` is an `Option`: `None` means
//! the concern is unmanaged and the planner leaves the chain alone, it never
//! means "clear".

use std::fmt;

use serde::{Deserialize, Serialize};

use super::num::Uint;
use super::options::EnforcedOption;
use crate::chain::address::{normalize_address, AddressError};
use crate::chain::family::ChainFamily;

// ---------------------------------------------------------------------------
// Libraries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiveLibraryConfig {
    pub library: String,
    /// Blocks during which the previous library keeps being accepted.
    #[serde(default)]
    pub grace_period: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiveLibraryTimeout {
    pub library: String,
    pub expiry: u64,
}

// ---------------------------------------------------------------------------
// ULN / executor
// ---------------------------------------------------------------------------

/// Verification settings for one pathway.
///
/// DVN lists are sets. Use `normalized` before comparing two configs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UlnConfig {
    pub confirmations: Uint,
    #[serde(default)]
    pub required_dvns: Vec<String>,
    #[serde(default)]
    pub optional_dvns: Vec<String>,
    #[serde(default)]
    pub optional_dvn_threshold: u8,
}

impl UlnConfig {
    /// Canonical form: addresses normalized for `family`, DVN lists sorted
    /// and deduplicated.
    pub fn normalized(&self, family: ChainFamily) -> Result<UlnConfig, AddressError> {
        Ok(UlnConfig {
            confirmations: self.confirmations,
            required_dvns: normalize_set(family, &self.required_dvns)?,
            optional_dvns: normalize_set(family, &self.optional_dvns)?,
            optional_dvn_threshold: self.optional_dvn_threshold,
        })
    }

    pub fn validate(&self) -> Result<(), String> {
        let optional = self.optional_dvns.len();
        let threshold = self.optional_dvn_threshold as usize;
        if threshold > optional {
            return Err(format!(
                "optional DVN threshold {} exceeds the {} optional DVNs",
                threshold, optional
            ));
        }
        if optional > 0 && threshold == 0 {
            return Err("optional DVNs are set but the threshold is 0".into());
        }
        if self.required_dvns.is_empty() && optional == 0 {
            return Err("at least one required or optional DVN is needed".into());
        }
        Ok(())
    }
}

fn normalize_set(family: ChainFamily, addresses: &[String]) -> Result<Vec<String>, AddressError> {
    let mut out = addresses
        .iter()
        .map(|a| normalize_address(family, a))
        .collect::<Result<Vec<_>, _>>()?;
    out.sort();
    out.dedup();
    Ok(out)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorConfig {
    pub executor: String,
    pub max_message_size: u32,
}

impl ExecutorConfig {
    pub fn normalized(&self, family: ChainFamily) -> Result<ExecutorConfig, AddressError> {
        Ok(ExecutorConfig {
            executor: normalize_address(family, &self.executor)?,
            max_message_size: self.max_message_size,
        })
    }
}

// ---------------------------------------------------------------------------
// Token / legacy settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
    pub capacity: Uint,
    pub refill_per_second: Uint,
}

/// Minimum destination gas for one packet type (v1 applications).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinDstGas {
    pub packet_type: u16,
    pub min_gas: Uint,
}

// ---------------------------------------------------------------------------
// Peer
// ---------------------------------------------------------------------------

/// Desired peer of a pathway.
///
/// `counterpart` in a config document means "the `to` contract of this
/// pathway"; any other string is taken as an explicit address on the
/// remote chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PeerTarget {
    Counterpart,
    Address(String),
}

impl From<String> for PeerTarget {
    fn from(s: String) -> Self {
        if s.trim().eq_ignore_ascii_case("counterpart") {
            PeerTarget::Counterpart
        } else {
            PeerTarget::Address(s.trim().to_string())
        }
    }
}

impl From<PeerTarget> for String {
    fn from(p: PeerTarget) -> Self {
        match p {
            PeerTarget::Counterpart => "counterpart".into(),
            PeerTarget::Address(a) => a,
        }
    }
}

impl fmt::Display for PeerTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeerTarget::Counterpart => write!(f, "counterpart"),
            PeerTarget::Address(a) => write!(f, "{}", a),
        }
    }
}

// ---------------------------------------------------------------------------
// EdgeConfig / NodeConfig
// ---------------------------------------------------------------------------

/// Desired state of one directional pathway.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub send_library: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receive_library: Option<ReceiveLibraryConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receive_library_timeout: Option<ReceiveLibraryTimeout>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executor_config: Option<ExecutorConfig>,
    /// Send-side ULN config, applied to the send library.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uln_config: Option<UlnConfig>,
    /// Receive-side ULN config, applied to the receive library.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receive_uln_config: Option<UlnConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enforced_options: Option<Vec<EnforcedOption>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<RateLimit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer: Option<PeerTarget>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_dst_gas: Option<Vec<MinDstGas>>,
    /// Per-destination fee of v1 OFTs, overriding the contract's default fee.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_bp: Option<FeeBp>,
}

impl EdgeConfig {
    pub fn is_empty(&self) -> bool {
        self == &EdgeConfig::default()
    }
}

/// Desired state of a contract independent of any pathway.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delegate: Option<String>,
    /// Whether callers may pass their own v1 adapter params.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_custom_adapter_params: Option<bool>,
    /// Fee in basis points charged on every destination without its own fee.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_fee_bp: Option<u16>,
}

impl NodeConfig {
    pub fn is_empty(&self) -> bool {
        self == &NodeConfig::default()
    }
}

/// Highest fee a contract accepts, 100%.
pub const MAX_FEE_BP: u16 = 10_000;

/// Fee of one destination. A disabled entry falls back to the default fee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeBp {
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub fee_bp: u16,
}

fn default_true() -> bool {
    true
}
