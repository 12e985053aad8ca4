//! Contract-level delegate.

use tracing::debug;

use super::{build_transaction, read_config, same_address, shape, ConfigureError};
use crate::chain::{ChainAdapter, ConfigKind, ConfigUpdate};
use crate::types::config::NodeConfig;
use crate::types::transaction::PlannedTransaction;

pub async fn configure_delegate(
    adapter: &dyn ChainAdapter,
    config: &NodeConfig,
) -> Result<Vec<PlannedTransaction>, ConfigureError> {
    let Some(desired) = config.delegate.as_deref() else {
        return Ok(vec![]);
    };
    let eid = adapter.point().eid;
    let (kind, value) = read_config(adapter, ConfigKind::Delegate, eid).await?;
    let current = shape(&kind, eid, value.into_address(&kind))?;
    if let Some(current) = current.as_deref() {
        if same_address(adapter, current, desired) {
            return Ok(vec![]);
        }
    }
    debug!(point = %adapter.point(), current = ?current, desired, "delegate drifted");
    let tx = build_transaction(
        adapter,
        eid,
        ConfigUpdate::Delegate {
            delegate: desired.to_string(),
        },
    )
    .await?;
    Ok(vec![tx])
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::chain::simulated::SimulatedNetwork;

    #[tokio::test]
    async fn delegate_is_set_once() {
        let network = SimulatedNetwork::new(state());
        let oapp = adapter(&network, &eth()).await;
        let config = NodeConfig {
            delegate: Some("0x00000000000000000000000000000000000000DD".into()),
            ..NodeConfig::default()
        };
        let txs = configure_delegate(oapp.as_ref(), &config).await.unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].description, "setDelegate(0x00000000000000000000000000000000000000DD)");
        apply(&network, &txs).await;

        let lower = NodeConfig {
            delegate: Some("0x00000000000000000000000000000000000000dd".into()),
            ..NodeConfig::default()
        };
        assert!(configure_delegate(oapp.as_ref(), &lower).await.unwrap().is_empty());
        assert!(configure_delegate(oapp.as_ref(), &NodeConfig::default())
            .await
            .unwrap()
            .is_empty());
    }
}
