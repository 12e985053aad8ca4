//! Adapter resolution.
//!
//! `SdkFactory::resolve` maps a `ChainPoint` to its `ChainAdapter`. The
//! chain family comes from the eid; a builder registered for that family
//! constructs the adapter. Adapters are memoized per `(eid, address)`:
//! the first caller constructs, concurrent callers wait for that same
//! construction, later callers get the cached instance.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{Mutex, OnceCell};
use tracing::debug;

use crate::chain::family::{classify, ChainFamily, EidInfo};
use crate::chain::ChainAdapter;
use crate::types::point::{ChainPoint, EndpointId, PointKey};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("unsupported chain for eid {eid}: {reason}")]
    UnsupportedChain { eid: EndpointId, reason: String },
    #[error("cannot reach {point}: {reason}")]
    Unreachable { point: String, reason: String },
    #[error("cannot build adapter for {point}: {reason}")]
    Build { point: String, reason: String },
}

/// Constructs adapters for one chain family.
#[async_trait]
pub trait AdapterBuilder: Send + Sync {
    async fn build(&self, point: &ChainPoint, info: EidInfo) -> Result<Arc<dyn ChainAdapter>, ResolveError>;
}

type Slot = Arc<OnceCell<Arc<dyn ChainAdapter>>>;

pub struct SdkFactory {
    builders: HashMap<ChainFamily, Arc<dyn AdapterBuilder>>,
    cache: Mutex<HashMap<PointKey, Slot>>,
}

impl SdkFactory {
    pub fn new() -> Self {
        SdkFactory {
            builders: HashMap::new(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_builder(mut self, family: ChainFamily, builder: Arc<dyn AdapterBuilder>) -> Self {
        self.builders.insert(family, builder);
        self
    }

    pub async fn resolve(&self, point: &ChainPoint) -> Result<Arc<dyn ChainAdapter>, ResolveError> {
        let info = classify(point.eid).ok_or_else(|| ResolveError::UnsupportedChain {
            eid: point.eid,
            reason: "eid is outside every known stage range".into(),
        })?;
        let builder = self
            .builders
            .get(&info.family)
            .cloned()
            .ok_or_else(|| ResolveError::UnsupportedChain {
                eid: point.eid,
                reason: format!("no adapter registered for {} chains", info.family),
            })?;

        let slot = {
            let mut cache = self.cache.lock().await;
            cache.entry(point.key()).or_default().clone()
        };
        let adapter = slot
            .get_or_try_init(|| async {
                debug!(point = %point, family = %info.family, "building chain adapter");
                builder.build(point, info).await
            })
            .await?;
        Ok(adapter.clone())
    }

    /// Number of adapters constructed so far.
    pub async fn cached(&self) -> usize {
        let cache = self.cache.lock().await;
        cache.values().filter(|slot| slot.initialized()).count()
    }
}

impl Default for SdkFactory {
    fn default() -> Self {
        SdkFactory::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::simulated::{Faults, SimulatedNetwork};
    use crate::chain::state::ChainState;

    fn factory(network: &SimulatedNetwork) -> SdkFactory {
        SdkFactory::new().with_builder(ChainFamily::Evm, Arc::new(network.builder()))
    }

    #[tokio::test]
    async fn same_point_resolves_to_same_instance() {
        let network = SimulatedNetwork::new(ChainState::default());
        let f = factory(&network);
        let a = f.resolve(&ChainPoint::new(30101, "0xAA")).await.unwrap();
        let b = f.resolve(&ChainPoint::named(30101, "0xaa", "OFT")).await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(network.builds(), 1);
        assert_eq!(f.cached().await, 1);
    }

    #[tokio::test]
    async fn different_points_get_different_adapters() {
        let network = SimulatedNetwork::new(ChainState::default());
        let f = factory(&network);
        let a = f.resolve(&ChainPoint::new(30101, "0xaa")).await.unwrap();
        let b = f.resolve(&ChainPoint::new(30110, "0xaa")).await.unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(network.builds(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_resolution_builds_once() {
        let network = SimulatedNetwork::new(ChainState::default())
            .with_build_delay(std::time::Duration::from_millis(20));
        let f = Arc::new(factory(&network));
        let mut handles = Vec::new();
        for _ in 0..16 {
            let f = f.clone();
            handles.push(tokio::spawn(async move {
                f.resolve(&ChainPoint::new(30101, "0xaa")).await.unwrap()
            }));
        }
        let first = handles.remove(0).await.unwrap();
        for h in handles {
            assert!(Arc::ptr_eq(&first, &h.await.unwrap()));
        }
        assert_eq!(network.builds(), 1);
    }

    #[tokio::test]
    async fn unknown_eid_is_unsupported() {
        let network = SimulatedNetwork::new(ChainState::default());
        let f = factory(&network);
        let err = f.resolve(&ChainPoint::new(90101, "0xaa")).await.err().unwrap();
        assert!(matches!(err, ResolveError::UnsupportedChain { eid: 90101, .. }));
    }

    #[tokio::test]
    async fn unregistered_family_is_unsupported() {
        let network = SimulatedNetwork::new(ChainState::default());
        let f = factory(&network);
        let err = f
            .resolve(&ChainPoint::new(30168, "11111111111111111111111111111111"))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ResolveError::UnsupportedChain { eid: 30168, .. }));
    }

    #[tokio::test]
    async fn failed_build_is_not_cached() {
        let network = SimulatedNetwork::new(ChainState::default())
            .with_faults(Faults::default().unreachable(30101));
        let f = factory(&network);
        let point = ChainPoint::new(30101, "0xaa");
        assert!(matches!(
            f.resolve(&point).await.err().unwrap(),
            ResolveError::Unreachable { .. }
        ));
        assert_eq!(f.cached().await, 0);
    }
}
