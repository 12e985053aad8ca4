//! Fees of v1 OFTs: a contract-wide default and per-destination overrides.

use tracing::debug;

use super::{build_transaction, read_config, shape, ConfigureError, Pathway};
use crate::chain::{ChainAdapter, ConfigKind, ConfigUpdate};
use crate::types::config::{FeeBp, NodeConfig, MAX_FEE_BP};
use crate::types::num::Uint;
use crate::types::transaction::PlannedTransaction;

fn check_fee(fee_bp: u16) -> Result<(), ConfigureError> {
    if fee_bp > MAX_FEE_BP {
        return Err(ConfigureError::Invalid {
            field: "fee_bp",
            reason: format!("{} exceeds {}", fee_bp, MAX_FEE_BP),
        });
    }
    Ok(())
}

/// An unset destination fee reads as disabled with zero basis points.
pub async fn configure_fee_bp(pathway: &Pathway<'_>) -> Result<Vec<PlannedTransaction>, ConfigureError> {
    let Some(desired) = pathway.config.fee_bp else {
        return Ok(vec![]);
    };
    check_fee(desired.fee_bp)?;
    let (kind, value) = pathway.read(ConfigKind::FeeBp).await?;
    let current = shape(&kind, pathway.remote_eid(), value.into_fee_bp(&kind))?.unwrap_or(FeeBp {
        enabled: false,
        fee_bp: 0,
    });
    if current == desired {
        return Ok(vec![]);
    }
    debug!(vector = %pathway.vector, ?current, ?desired, "fee bp drifted");
    let tx = pathway
        .build(ConfigUpdate::FeeBp {
            enabled: desired.enabled,
            fee_bp: desired.fee_bp,
        })
        .await?;
    Ok(vec![tx])
}

pub async fn configure_default_fee_bp(
    adapter: &dyn ChainAdapter,
    config: &NodeConfig,
) -> Result<Vec<PlannedTransaction>, ConfigureError> {
    let Some(desired) = config.default_fee_bp else {
        return Ok(vec![]);
    };
    check_fee(desired)?;
    let eid = adapter.point().eid;
    let (kind, value) = read_config(adapter, ConfigKind::DefaultFeeBp, eid).await?;
    let current = shape(&kind, eid, value.into_uint(&kind))?;
    if current == Uint::from(u64::from(desired)) {
        return Ok(vec![]);
    }
    debug!(point = %adapter.point(), %current, desired, "default fee bp drifted");
    let tx = build_transaction(adapter, eid, ConfigUpdate::DefaultFeeBp { fee_bp: desired }).await?;
    Ok(vec![tx])
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::chain::simulated::SimulatedNetwork;
    use crate::types::config::EdgeConfig;

    fn fee(enabled: bool, fee_bp: u16) -> EdgeConfig {
        EdgeConfig {
            fee_bp: Some(FeeBp { enabled, fee_bp }),
            ..EdgeConfig::default()
        }
    }

    #[tokio::test]
    async fn destination_fee_is_set_then_stable() {
        let fx = Fixture::new(SimulatedNetwork::new(state())).await;
        let txs = configure_fee_bp(&fx.pathway(&fee(true, 50))).await.unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].description, "setFeeBp(30110, true, 50)");
        fx.apply(&txs).await;
        assert!(configure_fee_bp(&fx.pathway(&fee(true, 50))).await.unwrap().is_empty());
        assert_eq!(configure_fee_bp(&fx.pathway(&fee(false, 50))).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn disabled_zero_fee_matches_unset() {
        let fx = Fixture::new(SimulatedNetwork::new(state())).await;
        assert!(configure_fee_bp(&fx.pathway(&fee(false, 0))).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn fee_above_max_is_invalid() {
        let fx = Fixture::new(SimulatedNetwork::new(state())).await;
        let err = configure_fee_bp(&fx.pathway(&fee(true, MAX_FEE_BP + 1)))
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigureError::Invalid { field: "fee_bp", .. }));
        assert!(!err.is_fatal());
    }

    #[tokio::test]
    async fn default_fee_is_set_once() {
        let network = SimulatedNetwork::new(state());
        let oapp = adapter(&network, &eth()).await;
        let config = NodeConfig {
            default_fee_bp: Some(25),
            ..NodeConfig::default()
        };
        let txs = configure_default_fee_bp(oapp.as_ref(), &config).await.unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].description, "setDefaultFeeBp(25)");
        apply(&network, &txs).await;
        assert!(configure_default_fee_bp(oapp.as_ref(), &config).await.unwrap().is_empty());
    }
}
