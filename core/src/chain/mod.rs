//! Chain access.
//!
//! Everything chain-specific is reached through the `ChainAdapter` trait:
//! reading the current configuration of a contract and turning a desired
//! update into a `PlannedTransaction`. One adapter exists per deployed
//! contract; the factory hands them out.

pub mod address;
pub mod family;
pub mod simulated;
pub mod state;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::config::{ExecutorConfig, FeeBp, RateLimit, ReceiveLibraryTimeout, UlnConfig};
use crate::types::num::{Bytes, Bytes32, Uint};
use crate::types::point::{ChainPoint, EndpointId};
use crate::types::transaction::PlannedTransaction;
use address::AddressError;
use family::ChainFamily;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdapterError {
    #[error("rpc call to eid {eid} failed: {message}")]
    Rpc { eid: EndpointId, message: String },
    #[error(transparent)]
    Address(#[from] AddressError),
    #[error("{kind} returned an unexpected value: {found}")]
    UnexpectedValue { kind: String, found: String },
    #[error("{0} is not supported by this contract")]
    Unsupported(String),
    #[error("cannot encode {call}: {reason}")]
    Encode { call: String, reason: String },
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Send,
    Receive,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Send => write!(f, "send"),
            Direction::Receive => write!(f, "receive"),
        }
    }
}

/// A piece of on-chain configuration, scoped to a remote eid where the
/// chain scopes it that way.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConfigKind {
    SendLibrary,
    ReceiveLibrary,
    ReceiveLibraryTimeout,
    Uln { library: String, direction: Direction },
    Executor { library: String },
    Peer,
    /// v1 trusted remote path.
    TrustedRemote,
    EnforcedOptions { msg_type: u16 },
    RateLimit,
    MinDstGas { packet_type: u16 },
    /// v1 per-destination fee.
    FeeBp,
    /// Contract-level; the remote eid is ignored.
    Delegate,
    /// Contract-level.
    UseCustomAdapterParams,
    /// Contract-level.
    DefaultFeeBp,
    /// Endpoint default library towards the remote eid.
    DefaultLibrary { direction: Direction },
    /// Endpoint default ULN config of `library` towards the remote eid.
    DefaultUln { library: String, direction: Direction },
    /// Endpoint default executor config of `library` towards the remote eid.
    DefaultExecutor { library: String },
}

impl fmt::Display for ConfigKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigKind::SendLibrary => write!(f, "send library"),
            ConfigKind::ReceiveLibrary => write!(f, "receive library"),
            ConfigKind::ReceiveLibraryTimeout => write!(f, "receive library timeout"),
            ConfigKind::Uln { library, direction } => write!(f, "{} ULN config of {}", direction, library),
            ConfigKind::Executor { library } => write!(f, "executor config of {}", library),
            ConfigKind::Peer => write!(f, "peer"),
            ConfigKind::TrustedRemote => write!(f, "trusted remote"),
            ConfigKind::EnforcedOptions { msg_type } => write!(f, "enforced options (msg type {})", msg_type),
            ConfigKind::RateLimit => write!(f, "rate limit"),
            ConfigKind::MinDstGas { packet_type } => write!(f, "min dst gas (packet type {})", packet_type),
            ConfigKind::FeeBp => write!(f, "fee bp"),
            ConfigKind::Delegate => write!(f, "delegate"),
            ConfigKind::UseCustomAdapterParams => write!(f, "custom adapter params"),
            ConfigKind::DefaultFeeBp => write!(f, "default fee bp"),
            ConfigKind::DefaultLibrary { direction } => write!(f, "default {} library", direction),
            ConfigKind::DefaultUln { library, direction } => {
                write!(f, "default {} ULN config of {}", direction, library)
            }
            ConfigKind::DefaultExecutor { library } => write!(f, "default executor config of {}", library),
        }
    }
}

/// The current value of a `ConfigKind`, already decoded by the adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValue {
    /// `is_default` is set when the contract has no library of its own and
    /// the endpoint default applies.
    Library { address: String, is_default: bool },
    LibraryTimeout(Option<ReceiveLibraryTimeout>),
    Uln(Option<UlnConfig>),
    Executor(Option<ExecutorConfig>),
    /// Zero means unset.
    Peer(Bytes32),
    Bytes(Bytes),
    RateLimit(Option<RateLimit>),
    Uint(Uint),
    Address(Option<String>),
    Bool(bool),
    /// `None` when the destination has no fee of its own.
    FeeBp(Option<FeeBp>),
}

impl ConfigValue {
    fn mismatch(&self, kind: &ConfigKind) -> AdapterError {
        AdapterError::UnexpectedValue {
            kind: kind.to_string(),
            found: format!("{:?}", self),
        }
    }

    pub fn into_library(self, kind: &ConfigKind) -> Result<(String, bool), AdapterError> {
        match self {
            ConfigValue::Library { address, is_default } => Ok((address, is_default)),
            other => Err(other.mismatch(kind)),
        }
    }

    pub fn into_library_timeout(self, kind: &ConfigKind) -> Result<Option<ReceiveLibraryTimeout>, AdapterError> {
        match self {
            ConfigValue::LibraryTimeout(v) => Ok(v),
            other => Err(other.mismatch(kind)),
        }
    }

    pub fn into_uln(self, kind: &ConfigKind) -> Result<Option<UlnConfig>, AdapterError> {
        match self {
            ConfigValue::Uln(v) => Ok(v),
            other => Err(other.mismatch(kind)),
        }
    }

    pub fn into_executor(self, kind: &ConfigKind) -> Result<Option<ExecutorConfig>, AdapterError> {
        match self {
            ConfigValue::Executor(v) => Ok(v),
            other => Err(other.mismatch(kind)),
        }
    }

    pub fn into_peer(self, kind: &ConfigKind) -> Result<Bytes32, AdapterError> {
        match self {
            ConfigValue::Peer(v) => Ok(v),
            other => Err(other.mismatch(kind)),
        }
    }

    pub fn into_bytes(self, kind: &ConfigKind) -> Result<Bytes, AdapterError> {
        match self {
            ConfigValue::Bytes(v) => Ok(v),
            other => Err(other.mismatch(kind)),
        }
    }

    pub fn into_rate_limit(self, kind: &ConfigKind) -> Result<Option<RateLimit>, AdapterError> {
        match self {
            ConfigValue::RateLimit(v) => Ok(v),
            other => Err(other.mismatch(kind)),
        }
    }

    pub fn into_uint(self, kind: &ConfigKind) -> Result<Uint, AdapterError> {
        match self {
            ConfigValue::Uint(v) => Ok(v),
            other => Err(other.mismatch(kind)),
        }
    }

    pub fn into_address(self, kind: &ConfigKind) -> Result<Option<String>, AdapterError> {
        match self {
            ConfigValue::Address(v) => Ok(v),
            other => Err(other.mismatch(kind)),
        }
    }

    pub fn into_bool(self, kind: &ConfigKind) -> Result<bool, AdapterError> {
        match self {
            ConfigValue::Bool(v) => Ok(v),
            other => Err(other.mismatch(kind)),
        }
    }

    pub fn into_fee_bp(self, kind: &ConfigKind) -> Result<Option<FeeBp>, AdapterError> {
        match self {
            ConfigValue::FeeBp(v) => Ok(v),
            other => Err(other.mismatch(kind)),
        }
    }
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// One entry of a `setConfig` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LibraryParam {
    Executor(ExecutorConfig),
    SendUln(UlnConfig),
    ReceiveUln(UlnConfig),
}

impl LibraryParam {
    fn label(&self) -> &'static str {
        match self {
            LibraryParam::Executor(_) => "executor",
            LibraryParam::SendUln(_) => "send_uln",
            LibraryParam::ReceiveUln(_) => "receive_uln",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnforcedOptionParam {
    pub eid: EndpointId,
    pub msg_type: u16,
    pub options: Bytes,
}

/// A desired change, in chain-neutral form. Adapters encode it into the
/// payload of a `PlannedTransaction`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum ConfigUpdate {
    SendLibrary {
        library: String,
        #[serde(default)]
        index: Option<u64>,
    },
    ReceiveLibrary {
        library: String,
        #[serde(default)]
        index: Option<u64>,
        grace_period: u64,
    },
    ReceiveLibraryTimeout {
        library: String,
        #[serde(default)]
        index: Option<u64>,
        expiry: u64,
    },
    SetConfig {
        library: String,
        params: Vec<LibraryParam>,
    },
    Peer {
        peer: Bytes32,
    },
    TrustedRemote {
        path: Bytes,
    },
    EnforcedOptions {
        options: Vec<EnforcedOptionParam>,
    },
    RateLimit {
        limit: RateLimit,
    },
    MinDstGas {
        packet_type: u16,
        min_gas: Uint,
    },
    Delegate {
        delegate: String,
    },
    UseCustomAdapterParams {
        enabled: bool,
    },
    DefaultFeeBp {
        fee_bp: u16,
    },
    FeeBp {
        enabled: bool,
        fee_bp: u16,
    },
}

impl ConfigUpdate {
    /// Short human-readable form of the call, used as transaction description.
    pub fn describe(&self, remote_eid: EndpointId) -> String {
        match self {
            ConfigUpdate::SendLibrary { library, .. } => {
                format!("setSendLibrary({}, {})", remote_eid, library)
            }
            ConfigUpdate::ReceiveLibrary { library, grace_period, .. } => {
                format!("setReceiveLibrary({}, {}, {})", remote_eid, library, grace_period)
            }
            ConfigUpdate::ReceiveLibraryTimeout { library, expiry, .. } => {
                format!("setReceiveLibraryTimeout({}, {}, {})", remote_eid, library, expiry)
            }
            ConfigUpdate::SetConfig { library, params } => {
                let labels: Vec<&str> = params.iter().map(|p| p.label()).collect();
                format!("setConfig({}, {}, [{}])", library, remote_eid, labels.join(", "))
            }
            ConfigUpdate::Peer { peer } => format!("setPeer({}, {})", remote_eid, peer),
            ConfigUpdate::TrustedRemote { path } => {
                format!("setTrustedRemote({}, {})", remote_eid, path)
            }
            ConfigUpdate::EnforcedOptions { options } => {
                let entries: Vec<String> = options
                    .iter()
                    .map(|o| format!("{}/{}", o.eid, o.msg_type))
                    .collect();
                format!("setEnforcedOptions([{}])", entries.join(", "))
            }
            ConfigUpdate::RateLimit { limit } => format!(
                "setRateLimit({}, {}, {})",
                remote_eid, limit.capacity, limit.refill_per_second
            ),
            ConfigUpdate::MinDstGas { packet_type, min_gas } => {
                format!("setMinDstGas({}, {}, {})", remote_eid, packet_type, min_gas)
            }
            ConfigUpdate::Delegate { delegate } => format!("setDelegate({})", delegate),
            ConfigUpdate::UseCustomAdapterParams { enabled } => {
                format!("setUseCustomAdapterParams({})", enabled)
            }
            ConfigUpdate::DefaultFeeBp { fee_bp } => format!("setDefaultFeeBp({})", fee_bp),
            ConfigUpdate::FeeBp { enabled, fee_bp } => {
                format!("setFeeBp({}, {}, {})", remote_eid, enabled, fee_bp)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// ChainAdapter
// ---------------------------------------------------------------------------

/// Access to one deployed contract.
#[async_trait]
pub trait ChainAdapter: Send + Sync {
    fn point(&self) -> &ChainPoint;

    fn family(&self) -> ChainFamily;

    /// Reads the current value of `kind` for the pathway to `remote_eid`.
    async fn get_config(&self, kind: &ConfigKind, remote_eid: EndpointId) -> Result<ConfigValue, AdapterError>;

    /// Encodes `update` into a transaction on this contract.
    async fn build_transaction(
        &self,
        remote_eid: EndpointId,
        update: &ConfigUpdate,
    ) -> Result<PlannedTransaction, AdapterError>;

    /// Numeric id of a registered message library, `None` when unregistered.
    async fn library_index(&self, library: &str) -> Result<Option<u64>, AdapterError>;

    /// Whether this chain addresses libraries by index rather than address.
    fn uses_library_index(&self) -> bool {
        false
    }

    /// Native-width bytes of an address on this chain.
    fn address_bytes(&self, address: &str) -> Result<Vec<u8>, AdapterError> {
        Ok(address::decode_address(self.family(), address)?)
    }

    /// The 32-byte form other chains store as a peer pointing here.
    fn encode_peer(&self, address: &str) -> Result<Bytes32, AdapterError> {
        Ok(address::peer_bytes(self.family(), address)?)
    }

    /// Canonical form of an address on this chain, used for comparisons.
    fn normalize_address(&self, address: &str) -> Result<String, AdapterError> {
        Ok(address::normalize_address(self.family(), address)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_set_config_lists_params() {
        let update = ConfigUpdate::SetConfig {
            library: "0xlib".into(),
            params: vec![
                LibraryParam::Executor(ExecutorConfig {
                    executor: "0xe".into(),
                    max_message_size: 10000,
                }),
                LibraryParam::SendUln(UlnConfig {
                    confirmations: Uint::from(1u64),
                    required_dvns: vec![],
                    optional_dvns: vec![],
                    optional_dvn_threshold: 0,
                }),
            ],
        };
        assert_eq!(update.describe(30110), "setConfig(0xlib, 30110, [executor, send_uln])");
    }

    #[test]
    fn update_serde_is_tagged() {
        let update = ConfigUpdate::MinDstGas {
            packet_type: 0,
            min_gas: Uint::from(200_000u64),
        };
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json["call"], "min_dst_gas");
        let back: ConfigUpdate = serde_json::from_value(json).unwrap();
        assert_eq!(back, update);
    }

    #[test]
    fn value_accessors_reject_wrong_shape() {
        let err = ConfigValue::Uint(Uint::ZERO)
            .into_peer(&ConfigKind::Peer)
            .unwrap_err();
        assert!(matches!(err, AdapterError::UnexpectedValue { .. }));
        let peer = ConfigValue::Peer(Bytes32::ZERO).into_peer(&ConfigKind::Peer).unwrap();
        assert!(peer.is_zero());
    }

    #[test]
    fn describe_fee_calls() {
        let update = ConfigUpdate::FeeBp {
            enabled: true,
            fee_bp: 50,
        };
        assert_eq!(update.describe(30110), "setFeeBp(30110, true, 50)");
        assert_eq!(
            ConfigUpdate::UseCustomAdapterParams { enabled: true }.describe(30101),
            "setUseCustomAdapterParams(true)"
        );
    }
}
