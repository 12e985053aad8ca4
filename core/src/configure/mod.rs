//! Configurators: read the current state of one concern, compare it with
//! the desired `EdgeConfig`, and emit transactions for what differs.
//!
//! Every configurator reads before it writes and returns an empty list
//! when the concern is unmanaged or already in place.

pub mod adapter_params;
pub mod delegate;
pub mod enforced;
pub mod fee;
pub mod gas;
pub mod library;
pub mod peer;
pub mod rate_limit;
pub mod uln;

use std::fmt;

use thiserror::Error;
use tracing::warn;

use crate::chain::{AdapterError, ChainAdapter, ConfigKind, ConfigUpdate, ConfigValue};
use crate::types::config::{EdgeConfig, NodeConfig};
use crate::types::point::{EndpointId, PathwayVector};
use crate::types::transaction::PlannedTransaction;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigureError {
    #[error("reading {kind} for eid {remote_eid} failed: {source}")]
    Read {
        kind: String,
        remote_eid: EndpointId,
        #[source]
        source: AdapterError,
    },
    #[error("building {call} failed: {source}")]
    Build {
        call: String,
        #[source]
        source: AdapterError,
    },
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error("library {library} is not registered on eid {eid}")]
    MissingLibraryIndex { library: String, eid: EndpointId },
}

impl ConfigureError {
    /// Read failures leave the connection's current state unknown, so the
    /// whole connection is abandoned. Anything else only affects the
    /// configurator that raised it.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ConfigureError::Read { .. })
    }
}

/// What a configurator works on: both ends of a pathway and its desired config.
#[derive(Clone, Copy)]
pub struct Pathway<'a> {
    pub from: &'a dyn ChainAdapter,
    pub to: &'a dyn ChainAdapter,
    pub vector: &'a PathwayVector,
    pub config: &'a EdgeConfig,
}

impl<'a> Pathway<'a> {
    pub fn remote_eid(&self) -> EndpointId {
        self.vector.to.eid
    }

    pub(crate) async fn read(&self, kind: ConfigKind) -> Result<(ConfigKind, ConfigValue), ConfigureError> {
        read_config(self.from, kind, self.remote_eid()).await
    }

    pub(crate) async fn build(&self, update: ConfigUpdate) -> Result<PlannedTransaction, ConfigureError> {
        build_transaction(self.from, self.remote_eid(), update).await
    }
}

pub(crate) async fn read_config(
    adapter: &dyn ChainAdapter,
    kind: ConfigKind,
    remote_eid: EndpointId,
) -> Result<(ConfigKind, ConfigValue), ConfigureError> {
    match adapter.get_config(&kind, remote_eid).await {
        Ok(value) => Ok((kind, value)),
        Err(source) => {
            warn!(point = %adapter.point(), kind = %kind, remote_eid, error = %source, "config read failed");
            Err(ConfigureError::Read {
                kind: kind.to_string(),
                remote_eid,
                source,
            })
        }
    }
}

pub(crate) async fn build_transaction(
    adapter: &dyn ChainAdapter,
    remote_eid: EndpointId,
    update: ConfigUpdate,
) -> Result<PlannedTransaction, ConfigureError> {
    adapter
        .build_transaction(remote_eid, &update)
        .await
        .map_err(|source| ConfigureError::Build {
            call: update.describe(remote_eid),
            source,
        })
}

/// A value that came back in the wrong shape is a read failure.
pub(crate) fn shape<T>(kind: &ConfigKind, remote_eid: EndpointId, value: Result<T, AdapterError>) -> Result<T, ConfigureError> {
    value.map_err(|source| ConfigureError::Read {
        kind: kind.to_string(),
        remote_eid,
        source,
    })
}

/// Whether two addresses are the same on `adapter`'s chain. Addresses that
/// do not normalize are compared verbatim.
pub(crate) fn same_address(adapter: &dyn ChainAdapter, a: &str, b: &str) -> bool {
    match (adapter.normalize_address(a), adapter.normalize_address(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a.trim() == b.trim(),
    }
}

// ---------------------------------------------------------------------------
// Concern
// ---------------------------------------------------------------------------

/// One configurator, in the order the planner runs them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Concern {
    Peer,
    SendLibrary,
    ReceiveLibrary,
    ReceiveLibraryTimeout,
    SendConfig,
    ReceiveConfig,
    EnforcedOptions,
    RateLimit,
    MinDstGas,
    FeeBp,
}

impl Concern {
    pub const ALL: [Concern; 10] = [
        Concern::Peer,
        Concern::SendLibrary,
        Concern::ReceiveLibrary,
        Concern::ReceiveLibraryTimeout,
        Concern::SendConfig,
        Concern::ReceiveConfig,
        Concern::EnforcedOptions,
        Concern::RateLimit,
        Concern::MinDstGas,
        Concern::FeeBp,
    ];

    pub async fn configure(self, pathway: &Pathway<'_>) -> Result<Vec<PlannedTransaction>, ConfigureError> {
        match self {
            Concern::Peer => peer::configure_peer(pathway).await,
            Concern::SendLibrary => library::configure_send_library(pathway).await,
            Concern::ReceiveLibrary => library::configure_receive_library(pathway).await,
            Concern::ReceiveLibraryTimeout => library::configure_receive_library_timeout(pathway).await,
            Concern::SendConfig => uln::configure_send_config(pathway).await,
            Concern::ReceiveConfig => uln::configure_receive_config(pathway).await,
            Concern::EnforcedOptions => enforced::configure_enforced_options(pathway).await,
            Concern::RateLimit => rate_limit::configure_rate_limit(pathway).await,
            Concern::MinDstGas => gas::configure_min_dst_gas(pathway).await,
            Concern::FeeBp => fee::configure_fee_bp(pathway).await,
        }
    }
}

impl fmt::Display for Concern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Concern::Peer => "peer",
            Concern::SendLibrary => "send_library",
            Concern::ReceiveLibrary => "receive_library",
            Concern::ReceiveLibraryTimeout => "receive_library_timeout",
            Concern::SendConfig => "send_config",
            Concern::ReceiveConfig => "receive_config",
            Concern::EnforcedOptions => "enforced_options",
            Concern::RateLimit => "rate_limit",
            Concern::MinDstGas => "min_dst_gas",
            Concern::FeeBp => "fee_bp",
        };
        write!(f, "{}", s)
    }
}

/// Contract-level settings, planned after every connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContractConcern {
    Delegate,
    CustomAdapterParams,
    DefaultFeeBp,
}

impl ContractConcern {
    pub const ALL: [ContractConcern; 3] = [
        ContractConcern::Delegate,
        ContractConcern::CustomAdapterParams,
        ContractConcern::DefaultFeeBp,
    ];

    pub async fn configure(
        self,
        adapter: &dyn ChainAdapter,
        config: &NodeConfig,
    ) -> Result<Vec<PlannedTransaction>, ConfigureError> {
        match self {
            ContractConcern::Delegate => delegate::configure_delegate(adapter, config).await,
            ContractConcern::CustomAdapterParams => {
                adapter_params::configure_use_custom_adapter_params(adapter, config).await
            }
            ContractConcern::DefaultFeeBp => fee::configure_default_fee_bp(adapter, config).await,
        }
    }
}

impl fmt::Display for ContractConcern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ContractConcern::Delegate => "delegate",
            ContractConcern::CustomAdapterParams => "use_custom_adapter_params",
            ContractConcern::DefaultFeeBp => "default_fee_bp",
        };
        write!(f, "{}", s)
    }
}

// ---------------------------------------------------------------------------
// Test support
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use crate::chain::family::classify;
    use crate::chain::simulated::SimulatedNetwork;
    use crate::chain::state::ChainState;
    use crate::chain::ChainAdapter;
    use crate::factory::AdapterBuilder;
    use crate::signer::Signer;
    use crate::types::config::EdgeConfig;
    use crate::types::point::{ChainPoint, PathwayVector};
    use crate::types::transaction::PlannedTransaction;

    use super::Pathway;

    pub const ETH: u32 = 30101;
    pub const ARB: u32 = 30110;
    pub const ETH_OAPP: &str = "0x00000000000000000000000000000000000000aa";
    pub const ARB_OAPP: &str = "0x00000000000000000000000000000000000000bb";
    pub const LIB: &str = "0x000000000000000000000000000000000000abcd";

    pub fn eth() -> ChainPoint {
        ChainPoint::named(ETH, ETH_OAPP, "EthOFT")
    }

    pub fn arb() -> ChainPoint {
        ChainPoint::named(ARB, ARB_OAPP, "ArbOFT")
    }

    pub async fn adapter(network: &SimulatedNetwork, point: &ChainPoint) -> Arc<dyn ChainAdapter> {
        let info = classify(point.eid).unwrap();
        network.builder().build(point, info).await.ok().unwrap()
    }

    /// A state with `LIB` registered on both test chains.
    pub fn state() -> ChainState {
        let mut state = ChainState::default();
        state.register_library(ETH, LIB);
        state.register_library(ARB, LIB);
        state
    }

    /// Adapters for both ends of the `eth() -> arb()` pathway.
    pub struct Fixture {
        pub network: SimulatedNetwork,
        pub from: Arc<dyn ChainAdapter>,
        pub to: Arc<dyn ChainAdapter>,
        pub vector: PathwayVector,
    }

    impl Fixture {
        pub async fn new(network: SimulatedNetwork) -> Fixture {
            Fixture::between(network, eth(), arb()).await
        }

        pub async fn between(network: SimulatedNetwork, from: ChainPoint, to: ChainPoint) -> Fixture {
            Fixture {
                from: adapter(&network, &from).await,
                to: adapter(&network, &to).await,
                vector: PathwayVector::new(from, to),
                network,
            }
        }

        pub fn pathway<'a>(&'a self, config: &'a EdgeConfig) -> Pathway<'a> {
            Pathway {
                from: self.from.as_ref(),
                to: self.to.as_ref(),
                vector: &self.vector,
                config,
            }
        }

        pub async fn apply(&self, txs: &[PlannedTransaction]) {
            apply(&self.network, txs).await
        }
    }

    pub async fn apply(network: &SimulatedNetwork, txs: &[PlannedTransaction]) {
        let signer = network.signer();
        for tx in txs {
            signer.send(signer.sign(tx).await.unwrap()).await.unwrap();
        }
    }
}
