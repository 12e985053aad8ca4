//! Send library, receive library and receive library timeout.
//!
//! A contract that still runs on the endpoint default counts as drifted
//! even when the default is the desired library: the library gets pinned
//! so that a later change of default does not move the pathway.

use tracing::debug;

use super::{same_address, shape, ConfigureError, Pathway};
use crate::chain::{ConfigKind, ConfigUpdate};
use crate::types::transaction::PlannedTransaction;

/// Library index on chains that address libraries by index, `None` elsewhere.
async fn index_for(pathway: &Pathway<'_>, library: &str) -> Result<Option<u64>, ConfigureError> {
    if !pathway.from.uses_library_index() {
        return Ok(None);
    }
    let index = pathway
        .from
        .library_index(library)
        .await
        .map_err(|source| ConfigureError::Read {
            kind: format!("index of library {}", library),
            remote_eid: pathway.remote_eid(),
            source,
        })?;
    index
        .map(Some)
        .ok_or_else(|| ConfigureError::MissingLibraryIndex {
            library: library.to_string(),
            eid: pathway.from.point().eid,
        })
}

pub async fn configure_send_library(pathway: &Pathway<'_>) -> Result<Vec<PlannedTransaction>, ConfigureError> {
    let Some(desired) = pathway.config.send_library.as_deref() else {
        return Ok(vec![]);
    };
    let (kind, value) = pathway.read(ConfigKind::SendLibrary).await?;
    let (current, is_default) = shape(&kind, pathway.remote_eid(), value.into_library(&kind))?;
    if !is_default && same_address(pathway.from, &current, desired) {
        return Ok(vec![]);
    }
    debug!(vector = %pathway.vector, current = %current, is_default, desired, "send library drifted");
    let index = index_for(pathway, desired).await?;
    let tx = pathway
        .build(ConfigUpdate::SendLibrary {
            library: desired.to_string(),
            index,
        })
        .await?;
    Ok(vec![tx])
}

pub async fn configure_receive_library(pathway: &Pathway<'_>) -> Result<Vec<PlannedTransaction>, ConfigureError> {
    let Some(desired) = pathway.config.receive_library.as_ref() else {
        return Ok(vec![]);
    };
    let (kind, value) = pathway.read(ConfigKind::ReceiveLibrary).await?;
    let (current, is_default) = shape(&kind, pathway.remote_eid(), value.into_library(&kind))?;
    if !is_default && same_address(pathway.from, &current, &desired.library) {
        return Ok(vec![]);
    }
    debug!(vector = %pathway.vector, current = %current, is_default, desired = %desired.library, "receive library drifted");
    let index = index_for(pathway, &desired.library).await?;
    let tx = pathway
        .build(ConfigUpdate::ReceiveLibrary {
            library: desired.library.clone(),
            index,
            grace_period: desired.grace_period,
        })
        .await?;
    Ok(vec![tx])
}

pub async fn configure_receive_library_timeout(
    pathway: &Pathway<'_>,
) -> Result<Vec<PlannedTransaction>, ConfigureError> {
    let Some(desired) = pathway.config.receive_library_timeout.as_ref() else {
        return Ok(vec![]);
    };
    let (kind, value) = pathway.read(ConfigKind::ReceiveLibraryTimeout).await?;
    let current = shape(&kind, pathway.remote_eid(), value.into_library_timeout(&kind))?;
    if let Some(current) = current {
        if current.expiry == desired.expiry && same_address(pathway.from, &current.library, &desired.library) {
            return Ok(vec![]);
        }
    }
    let index = index_for(pathway, &desired.library).await?;
    let tx = pathway
        .build(ConfigUpdate::ReceiveLibraryTimeout {
            library: desired.library.clone(),
            index,
            expiry: desired.expiry,
        })
        .await?;
    Ok(vec![tx])
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::chain::simulated::SimulatedNetwork;
    use crate::chain::state::ChainState;
    use crate::types::config::{EdgeConfig, ReceiveLibraryConfig, ReceiveLibraryTimeout};

    fn send_library(address: &str) -> EdgeConfig {
        EdgeConfig {
            send_library: Some(address.into()),
            ..EdgeConfig::default()
        }
    }

    #[tokio::test]
    async fn zero_library_gets_exactly_one_set_send_library() {
        let fx = Fixture::new(SimulatedNetwork::new(state())).await;
        let config = send_library("0x000000000000000000000000000000000000ABCD");

        let txs = configure_send_library(&fx.pathway(&config)).await.unwrap();
        assert_eq!(txs.len(), 1);
        assert!(txs[0].description.starts_with("setSendLibrary(30110"));

        fx.apply(&txs).await;
        assert!(configure_send_library(&fx.pathway(&config)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn default_library_is_pinned() {
        let mut s = state();
        s.endpoints.get_mut(&ETH).unwrap().default_send_library = Some(LIB.into());
        let fx = Fixture::new(SimulatedNetwork::new(s)).await;
        let txs = configure_send_library(&fx.pathway(&send_library(LIB))).await.unwrap();
        assert_eq!(txs.len(), 1);
    }

    #[tokio::test]
    async fn unset_library_is_left_alone() {
        let fx = Fixture::new(SimulatedNetwork::new(state())).await;
        let config = EdgeConfig::default();
        let pathway = fx.pathway(&config);
        assert!(configure_send_library(&pathway).await.unwrap().is_empty());
        assert!(configure_receive_library(&pathway).await.unwrap().is_empty());
        assert!(configure_receive_library_timeout(&pathway).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn indexed_chain_needs_a_registered_library() {
        let network = SimulatedNetwork::new(ChainState::default()).with_indexed_libraries(ETH);
        let fx = Fixture::new(network).await;
        let err = configure_send_library(&fx.pathway(&send_library(LIB)))
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigureError::MissingLibraryIndex { eid: ETH, .. }));
        assert!(!err.is_fatal());
    }

    #[tokio::test]
    async fn indexed_chain_sends_the_index() {
        let fx = Fixture::new(SimulatedNetwork::new(state()).with_indexed_libraries(ETH)).await;
        let config = EdgeConfig {
            receive_library: Some(ReceiveLibraryConfig {
                library: LIB.into(),
                grace_period: 100,
            }),
            ..EdgeConfig::default()
        };
        let txs = configure_receive_library(&fx.pathway(&config)).await.unwrap();
        assert_eq!(txs.len(), 1);
        fx.apply(&txs).await;
        assert!(configure_receive_library(&fx.pathway(&config)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn timeout_compares_library_and_expiry() {
        let fx = Fixture::new(SimulatedNetwork::new(state())).await;
        let mut config = EdgeConfig {
            receive_library_timeout: Some(ReceiveLibraryTimeout {
                library: LIB.into(),
                expiry: 1000,
            }),
            ..EdgeConfig::default()
        };
        let txs = configure_receive_library_timeout(&fx.pathway(&config)).await.unwrap();
        assert_eq!(txs.len(), 1);
        fx.apply(&txs).await;
        assert!(configure_receive_library_timeout(&fx.pathway(&config))
            .await
            .unwrap()
            .is_empty());

        if let Some(t) = config.receive_library_timeout.as_mut() {
            t.expiry = 2000;
        }
        let txs = configure_receive_library_timeout(&fx.pathway(&config)).await.unwrap();
        assert_eq!(txs.len(), 1);
    }
}
