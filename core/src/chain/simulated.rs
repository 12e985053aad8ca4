//! A simulated chain network.
//!
//! Backs adapters and a signer with one shared `ChainState`, so a plan can
//! be executed locally and re-planned against the result. Faults can be
//! injected per eid or per contract: unreachable chains, failing reads,
//! transient submission failures and reverts.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use super::family::{ChainFamily, EidInfo};
use super::state::ChainState;
use super::{AdapterError, ChainAdapter, ConfigKind, ConfigUpdate, ConfigValue};
use crate::factory::{AdapterBuilder, ResolveError};
use crate::signer::{Signer, SubmitError};
use crate::types::num::Bytes;
use crate::types::point::{ChainPoint, EndpointId, PointKey};
use crate::types::transaction::{PlannedTransaction, Receipt, SignedTransaction};

// ---------------------------------------------------------------------------
// Faults
// ---------------------------------------------------------------------------

/// Injected failures.
#[derive(Debug, Clone, Default)]
pub struct Faults {
    unreachable: HashSet<EndpointId>,
    failing_reads: HashSet<PointKey>,
    transient: HashMap<EndpointId, u32>,
    reverts: HashMap<EndpointId, String>,
}

impl Faults {
    /// Adapters for `eid` cannot be built.
    pub fn unreachable(mut self, eid: EndpointId) -> Self {
        self.unreachable.insert(eid);
        self
    }

    /// Every read on `point` fails.
    pub fn failing_reads(mut self, point: &ChainPoint) -> Self {
        self.failing_reads.insert(point.key());
        self
    }

    /// The next `count` submissions on `eid` time out.
    pub fn transient(mut self, eid: EndpointId, count: u32) -> Self {
        self.transient.insert(eid, count);
        self
    }

    /// Every submission on `eid` reverts with `reason`.
    pub fn revert(mut self, eid: EndpointId, reason: impl Into<String>) -> Self {
        self.reverts.insert(eid, reason.into());
        self
    }
}

/// The payload of a simulated transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulatedCall {
    pub remote_eid: EndpointId,
    pub update: ConfigUpdate,
}

// ---------------------------------------------------------------------------
// SimulatedNetwork
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct SimulatedNetwork {
    state: Arc<RwLock<ChainState>>,
    faults: Arc<Faults>,
    transient_left: Arc<Mutex<HashMap<EndpointId, u32>>>,
    indexed: Arc<HashSet<EndpointId>>,
    builds: Arc<AtomicUsize>,
    submissions: Arc<Mutex<HashMap<EndpointId, usize>>>,
    build_delay: Duration,
    latency: Duration,
}

impl SimulatedNetwork {
    pub fn new(state: ChainState) -> Self {
        SimulatedNetwork {
            state: Arc::new(RwLock::new(state)),
            faults: Arc::new(Faults::default()),
            transient_left: Arc::new(Mutex::new(HashMap::new())),
            indexed: Arc::new(HashSet::new()),
            builds: Arc::new(AtomicUsize::new(0)),
            submissions: Arc::new(Mutex::new(HashMap::new())),
            build_delay: Duration::ZERO,
            latency: Duration::ZERO,
        }
    }

    pub fn with_faults(mut self, faults: Faults) -> Self {
        self.transient_left = Arc::new(Mutex::new(faults.transient.clone()));
        self.faults = Arc::new(faults);
        self
    }

    /// Contracts on `eid` address message libraries by index.
    pub fn with_indexed_libraries(mut self, eid: EndpointId) -> Self {
        Arc::make_mut(&mut self.indexed).insert(eid);
        self
    }

    pub fn with_build_delay(mut self, delay: Duration) -> Self {
        self.build_delay = delay;
        self
    }

    /// Time each submission takes to confirm.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn builder(&self) -> SimulatedAdapterBuilder {
        SimulatedAdapterBuilder {
            network: self.clone(),
        }
    }

    pub fn signer(&self) -> SimulatedSigner {
        SimulatedSigner {
            network: self.clone(),
            sent: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub async fn snapshot(&self) -> ChainState {
        self.state.read().await.clone()
    }

    /// Replaces the state, e.g. to simulate drift introduced out of band.
    pub async fn replace(&self, state: ChainState) {
        *self.state.write().await = state;
    }

    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }

    /// Submission attempts seen on `eid`, failed ones included.
    pub async fn submissions(&self, eid: EndpointId) -> usize {
        self.submissions.lock().await.get(&eid).copied().unwrap_or(0)
    }
}

// ---------------------------------------------------------------------------
// Adapter
// ---------------------------------------------------------------------------

pub struct SimulatedAdapterBuilder {
    network: SimulatedNetwork,
}

#[async_trait]
impl AdapterBuilder for SimulatedAdapterBuilder {
    async fn build(&self, point: &ChainPoint, info: EidInfo) -> Result<Arc<dyn ChainAdapter>, ResolveError> {
        if !self.network.build_delay.is_zero() {
            tokio::time::sleep(self.network.build_delay).await;
        }
        self.network.builds.fetch_add(1, Ordering::SeqCst);
        if self.network.faults.unreachable.contains(&point.eid) {
            return Err(ResolveError::Unreachable {
                point: point.to_string(),
                reason: "connection refused".into(),
            });
        }
        Ok(Arc::new(SimulatedAdapter {
            point: point.clone(),
            family: info.family,
            indexed: self.network.indexed.contains(&point.eid),
            network: self.network.clone(),
        }))
    }
}

pub struct SimulatedAdapter {
    point: ChainPoint,
    family: ChainFamily,
    indexed: bool,
    network: SimulatedNetwork,
}

#[async_trait]
impl ChainAdapter for SimulatedAdapter {
    fn point(&self) -> &ChainPoint {
        &self.point
    }

    fn family(&self) -> ChainFamily {
        self.family
    }

    async fn get_config(&self, kind: &ConfigKind, remote_eid: EndpointId) -> Result<ConfigValue, AdapterError> {
        if self.network.faults.failing_reads.contains(&self.point.key()) {
            return Err(AdapterError::Rpc {
                eid: self.point.eid,
                message: format!("reading {} failed", kind),
            });
        }
        let state = self.network.state.read().await;
        Ok(state.read(&self.point, kind, remote_eid))
    }

    async fn build_transaction(
        &self,
        remote_eid: EndpointId,
        update: &ConfigUpdate,
    ) -> Result<PlannedTransaction, AdapterError> {
        let call = SimulatedCall {
            remote_eid,
            update: update.clone(),
        };
        let payload = serde_json::to_vec(&call).map_err(|e| AdapterError::Encode {
            call: update.describe(remote_eid),
            reason: e.to_string(),
        })?;
        Ok(PlannedTransaction::new(
            self.point.clone(),
            Bytes(payload),
            update.describe(remote_eid),
        ))
    }

    async fn library_index(&self, library: &str) -> Result<Option<u64>, AdapterError> {
        let state = self.network.state.read().await;
        Ok(state.endpoint(self.point.eid).and_then(|e| e.index_of(library)))
    }

    fn uses_library_index(&self) -> bool {
        self.indexed
    }
}

// ---------------------------------------------------------------------------
// Signer
// ---------------------------------------------------------------------------

/// Applies transactions to the network state.
#[derive(Clone)]
pub struct SimulatedSigner {
    network: SimulatedNetwork,
    sent: Arc<AtomicUsize>,
}

#[async_trait]
impl Signer for SimulatedSigner {
    async fn sign(&self, transaction: &PlannedTransaction) -> Result<SignedTransaction, SubmitError> {
        Ok(SignedTransaction {
            transaction: transaction.clone(),
            signature: Bytes(transaction.point.key().to_string().into_bytes()),
        })
    }

    async fn send(&self, signed: SignedTransaction) -> Result<Receipt, SubmitError> {
        let point = signed.transaction.point.clone();
        *self.network.submissions.lock().await.entry(point.eid).or_default() += 1;
        if !self.network.latency.is_zero() {
            tokio::time::sleep(self.network.latency).await;
        }

        {
            let mut left = self.network.transient_left.lock().await;
            if let Some(n) = left.get_mut(&point.eid) {
                if *n > 0 {
                    *n -= 1;
                    return Err(SubmitError::Timeout);
                }
            }
        }
        if let Some(reason) = self.network.faults.reverts.get(&point.eid) {
            return Err(SubmitError::Reverted(reason.clone()));
        }

        let call: SimulatedCall = serde_json::from_slice(signed.transaction.payload.as_slice())
            .map_err(|e| SubmitError::Rejected(format!("undecodable payload: {}", e)))?;
        self.network
            .state
            .write()
            .await
            .apply(&point, call.remote_eid, &call.update)
            .map_err(SubmitError::Reverted)?;

        let n = self.sent.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(point = %point, call = %signed.transaction.description, "simulated transaction confirmed");
        Ok(Receipt {
            transaction_hash: format!("0x{:064x}", n),
            point,
        })
    }
}
