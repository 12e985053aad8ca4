//! In-memory chain state.
//!
//! A serializable snapshot of everything the configurators read: per
//! endpoint the registered message libraries and their defaults, per
//! contract the pathway settings. `read` answers a `ConfigKind` the way a
//! deployed endpoint would; `apply` performs a `ConfigUpdate` or reverts.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{ConfigKind, ConfigUpdate, ConfigValue, Direction, LibraryParam};
use crate::types::config::{ExecutorConfig, FeeBp, RateLimit, ReceiveLibraryTimeout, UlnConfig, MAX_FEE_BP};
use crate::types::num::{Bytes, Bytes32, Uint};
use crate::types::point::{ChainPoint, EndpointId, PointKey};

/// Zero address reported when neither the contract nor the endpoint has a
/// library configured.
pub const ZERO_LIBRARY: &str = "0x0000000000000000000000000000000000000000";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainState {
    #[serde(default)]
    pub endpoints: BTreeMap<EndpointId, EndpointState>,
    /// Keyed by `PointKey` in its `eid:address` form.
    #[serde(default)]
    pub contracts: BTreeMap<String, ContractState>,
}

/// Protocol-level state of one endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointState {
    /// Registered message libraries; the position is the library index.
    #[serde(default)]
    pub libraries: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_send_library: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_receive_library: Option<String>,
    /// Keyed by library address, lowercased.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub library_defaults: BTreeMap<String, LibraryDefaults>,
}

/// Configs a message library applies to pathways that set none of their own.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryDefaults {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub send_uln: BTreeMap<EndpointId, UlnConfig>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub receive_uln: BTreeMap<EndpointId, UlnConfig>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub executor: BTreeMap<EndpointId, ExecutorConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delegate: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub use_custom_adapter_params: bool,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub default_fee_bp: u16,
    #[serde(default)]
    pub pathways: BTreeMap<EndpointId, PathwayState>,
}

fn is_zero(v: &u16) -> bool {
    *v == 0
}

/// Settings of one contract towards one remote eid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathwayState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub send_library: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receive_library: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receive_library_timeout: Option<ReceiveLibraryTimeout>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub send_uln: BTreeMap<String, UlnConfig>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub receive_uln: BTreeMap<String, UlnConfig>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub executor: BTreeMap<String, ExecutorConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer: Option<Bytes32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trusted_remote: Option<Bytes>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub enforced_options: BTreeMap<u16, Bytes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<RateLimit>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub min_dst_gas: BTreeMap<u16, Uint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_bp: Option<FeeBp>,
}

/// Hex addresses are compared case-insensitively.
fn canonical(address: &str) -> String {
    PointKey::new(0, address.trim()).address
}

impl EndpointState {
    pub fn index_of(&self, library: &str) -> Option<u64> {
        let wanted = canonical(library);
        self.libraries
            .iter()
            .position(|l| canonical(l) == wanted)
            .map(|i| i as u64)
    }

    fn defaults_of(&self, library: &str) -> Option<&LibraryDefaults> {
        self.library_defaults.get(&canonical(library))
    }

    /// Resolves a library reference (by index if given) to a registered address.
    fn registered(&self, library: &str, index: Option<u64>) -> Result<String, String> {
        match index {
            Some(i) => self
                .libraries
                .get(i as usize)
                .cloned()
                .ok_or_else(|| format!("no library registered at index {}", i)),
            None => self
                .index_of(library)
                .map(|_| library.to_string())
                .ok_or_else(|| format!("library {} is not registered", library)),
        }
    }
}

impl ChainState {
    pub fn contract(&self, point: &ChainPoint) -> Option<&ContractState> {
        self.contracts.get(&point.key().to_string())
    }

    pub fn endpoint(&self, eid: EndpointId) -> Option<&EndpointState> {
        self.endpoints.get(&eid)
    }

    pub fn pathway(&self, point: &ChainPoint, remote_eid: EndpointId) -> Option<&PathwayState> {
        self.contract(point).and_then(|c| c.pathways.get(&remote_eid))
    }

    fn pathway_mut(&mut self, point: &ChainPoint, remote_eid: EndpointId) -> &mut PathwayState {
        self.contracts
            .entry(point.key().to_string())
            .or_default()
            .pathways
            .entry(remote_eid)
            .or_default()
    }

    /// Installs the default ULN config `library` applies towards `remote_eid`.
    pub fn set_default_uln(
        &mut self,
        eid: EndpointId,
        library: &str,
        remote_eid: EndpointId,
        direction: Direction,
        config: UlnConfig,
    ) {
        let defaults = self.library_defaults_mut(eid, library);
        match direction {
            Direction::Send => defaults.send_uln.insert(remote_eid, config),
            Direction::Receive => defaults.receive_uln.insert(remote_eid, config),
        };
    }

    pub fn set_default_executor(&mut self, eid: EndpointId, library: &str, remote_eid: EndpointId, config: ExecutorConfig) {
        self.library_defaults_mut(eid, library).executor.insert(remote_eid, config);
    }

    fn library_defaults_mut(&mut self, eid: EndpointId, library: &str) -> &mut LibraryDefaults {
        self.endpoints
            .entry(eid)
            .or_default()
            .library_defaults
            .entry(canonical(library))
            .or_default()
    }

    /// Registers `library` on the endpoint of `eid` and returns its index.
    pub fn register_library(&mut self, eid: EndpointId, library: &str) -> u64 {
        let endpoint = self.endpoints.entry(eid).or_default();
        match endpoint.index_of(library) {
            Some(i) => i,
            None => {
                endpoint.libraries.push(library.to_string());
                (endpoint.libraries.len() - 1) as u64
            }
        }
    }

    /// Answers a read the way the endpoint and contract of `point` would.
    pub fn read(&self, point: &ChainPoint, kind: &ConfigKind, remote_eid: EndpointId) -> ConfigValue {
        let pathway = self.pathway(point, remote_eid);
        let endpoint = self.endpoint(point.eid);
        match kind {
            ConfigKind::SendLibrary => library_value(
                pathway.and_then(|p| p.send_library.clone()),
                endpoint.and_then(|e| e.default_send_library.clone()),
            ),
            ConfigKind::ReceiveLibrary => library_value(
                pathway.and_then(|p| p.receive_library.clone()),
                endpoint.and_then(|e| e.default_receive_library.clone()),
            ),
            ConfigKind::ReceiveLibraryTimeout => {
                ConfigValue::LibraryTimeout(pathway.and_then(|p| p.receive_library_timeout.clone()))
            }
            ConfigKind::Uln { library, direction } => {
                let key = canonical(library);
                ConfigValue::Uln(pathway.and_then(|p| {
                    match direction {
                        Direction::Send => p.send_uln.get(&key),
                        Direction::Receive => p.receive_uln.get(&key),
                    }
                    .cloned()
                }))
            }
            ConfigKind::Executor { library } => {
                let key = canonical(library);
                ConfigValue::Executor(pathway.and_then(|p| p.executor.get(&key).cloned()))
            }
            ConfigKind::Peer => {
                ConfigValue::Peer(pathway.and_then(|p| p.peer).unwrap_or(Bytes32::ZERO))
            }
            ConfigKind::TrustedRemote => {
                ConfigValue::Bytes(pathway.and_then(|p| p.trusted_remote.clone()).unwrap_or_default())
            }
            ConfigKind::EnforcedOptions { msg_type } => ConfigValue::Bytes(
                pathway
                    .and_then(|p| p.enforced_options.get(msg_type).cloned())
                    .unwrap_or_default(),
            ),
            ConfigKind::RateLimit => ConfigValue::RateLimit(pathway.and_then(|p| p.rate_limit)),
            ConfigKind::MinDstGas { packet_type } => ConfigValue::Uint(
                pathway
                    .and_then(|p| p.min_dst_gas.get(packet_type).copied())
                    .unwrap_or(Uint::ZERO),
            ),
            ConfigKind::FeeBp => ConfigValue::FeeBp(pathway.and_then(|p| p.fee_bp)),
            ConfigKind::Delegate => {
                ConfigValue::Address(self.contract(point).and_then(|c| c.delegate.clone()))
            }
            ConfigKind::UseCustomAdapterParams => ConfigValue::Bool(
                self.contract(point)
                    .map(|c| c.use_custom_adapter_params)
                    .unwrap_or(false),
            ),
            ConfigKind::DefaultFeeBp => ConfigValue::Uint(Uint::from(u64::from(
                self.contract(point).map(|c| c.default_fee_bp).unwrap_or(0),
            ))),
            ConfigKind::DefaultLibrary { direction } => library_value(
                None,
                endpoint.and_then(|e| match direction {
                    Direction::Send => e.default_send_library.clone(),
                    Direction::Receive => e.default_receive_library.clone(),
                }),
            ),
            ConfigKind::DefaultUln { library, direction } => ConfigValue::Uln(
                endpoint
                    .and_then(|e| e.defaults_of(library))
                    .and_then(|d| match direction {
                        Direction::Send => d.send_uln.get(&remote_eid),
                        Direction::Receive => d.receive_uln.get(&remote_eid),
                    })
                    .cloned(),
            ),
            ConfigKind::DefaultExecutor { library } => ConfigValue::Executor(
                endpoint
                    .and_then(|e| e.defaults_of(library))
                    .and_then(|d| d.executor.get(&remote_eid))
                    .cloned(),
            ),
        }
    }

    /// Applies `update` on the contract at `point`. On error nothing changes
    /// and the error is the revert reason.
    pub fn apply(&mut self, point: &ChainPoint, remote_eid: EndpointId, update: &ConfigUpdate) -> Result<(), String> {
        let endpoint = self.endpoints.get(&point.eid).cloned().unwrap_or_default();
        match update {
            ConfigUpdate::SendLibrary { library, index } => {
                let library = endpoint.registered(library, *index)?;
                self.pathway_mut(point, remote_eid).send_library = Some(library);
            }
            ConfigUpdate::ReceiveLibrary { library, index, .. } => {
                let library = endpoint.registered(library, *index)?;
                self.pathway_mut(point, remote_eid).receive_library = Some(library);
            }
            ConfigUpdate::ReceiveLibraryTimeout { library, index, expiry } => {
                let library = endpoint.registered(library, *index)?;
                self.pathway_mut(point, remote_eid).receive_library_timeout = Some(ReceiveLibraryTimeout {
                    library,
                    expiry: *expiry,
                });
            }
            ConfigUpdate::SetConfig { library, params } => {
                endpoint.registered(library, None)?;
                for param in params {
                    if let LibraryParam::SendUln(uln) | LibraryParam::ReceiveUln(uln) = param {
                        uln.validate().map_err(|e| format!("invalid ULN config: {}", e))?;
                    }
                }
                let key = canonical(library);
                let pathway = self.pathway_mut(point, remote_eid);
                for param in params {
                    match param {
                        LibraryParam::Executor(cfg) => {
                            pathway.executor.insert(key.clone(), cfg.clone());
                        }
                        LibraryParam::SendUln(cfg) => {
                            pathway.send_uln.insert(key.clone(), cfg.clone());
                        }
                        LibraryParam::ReceiveUln(cfg) => {
                            pathway.receive_uln.insert(key.clone(), cfg.clone());
                        }
                    }
                }
            }
            ConfigUpdate::Peer { peer } => {
                self.pathway_mut(point, remote_eid).peer = Some(*peer);
            }
            ConfigUpdate::TrustedRemote { path } => {
                self.pathway_mut(point, remote_eid).trusted_remote = Some(path.clone());
            }
            ConfigUpdate::EnforcedOptions { options } => {
                for param in options {
                    self.pathway_mut(point, param.eid)
                        .enforced_options
                        .insert(param.msg_type, param.options.clone());
                }
            }
            ConfigUpdate::RateLimit { limit } => {
                self.pathway_mut(point, remote_eid).rate_limit = Some(*limit);
            }
            ConfigUpdate::MinDstGas { packet_type, min_gas } => {
                self.pathway_mut(point, remote_eid)
                    .min_dst_gas
                    .insert(*packet_type, *min_gas);
            }
            ConfigUpdate::Delegate { delegate } => {
                self.contracts
                    .entry(point.key().to_string())
                    .or_default()
                    .delegate = Some(delegate.clone());
            }
            ConfigUpdate::UseCustomAdapterParams { enabled } => {
                self.contracts
                    .entry(point.key().to_string())
                    .or_default()
                    .use_custom_adapter_params = *enabled;
            }
            ConfigUpdate::DefaultFeeBp { fee_bp } => {
                check_fee(*fee_bp)?;
                self.contracts
                    .entry(point.key().to_string())
                    .or_default()
                    .default_fee_bp = *fee_bp;
            }
            ConfigUpdate::FeeBp { enabled, fee_bp } => {
                check_fee(*fee_bp)?;
                self.pathway_mut(point, remote_eid).fee_bp = Some(FeeBp {
                    enabled: *enabled,
                    fee_bp: *fee_bp,
                });
            }
        }
        Ok(())
    }
}

fn check_fee(fee_bp: u16) -> Result<(), String> {
    if fee_bp > MAX_FEE_BP {
        return Err(format!("fee bp {} exceeds {}", fee_bp, MAX_FEE_BP));
    }
    Ok(())
}

fn library_value(own: Option<String>, default: Option<String>) -> ConfigValue {
    match own {
        Some(address) => ConfigValue::Library {
            address,
            is_default: false,
        },
        None => ConfigValue::Library {
            address: default.unwrap_or_else(|| ZERO_LIBRARY.to_string()),
            is_default: true,
        },
    }
}
