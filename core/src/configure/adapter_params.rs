//! Whether a v1 contract accepts caller-supplied adapter params.

use tracing::debug;

use super::{build_transaction, read_config, shape, ConfigureError};
use crate::chain::{ChainAdapter, ConfigKind, ConfigUpdate};
use crate::types::config::NodeConfig;
use crate::types::transaction::PlannedTransaction;

pub async fn configure_use_custom_adapter_params(
    adapter: &dyn ChainAdapter,
    config: &NodeConfig,
) -> Result<Vec<PlannedTransaction>, ConfigureError> {
    let Some(desired) = config.use_custom_adapter_params else {
        return Ok(vec![]);
    };
    let eid = adapter.point().eid;
    let (kind, value) = read_config(adapter, ConfigKind::UseCustomAdapterParams, eid).await?;
    let current = shape(&kind, eid, value.into_bool(&kind))?;
    if current == desired {
        return Ok(vec![]);
    }
    debug!(point = %adapter.point(), current, desired, "custom adapter params drifted");
    let tx = build_transaction(adapter, eid, ConfigUpdate::UseCustomAdapterParams { enabled: desired }).await?;
    Ok(vec![tx])
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::chain::simulated::SimulatedNetwork;

    fn custom(enabled: bool) -> NodeConfig {
        NodeConfig {
            use_custom_adapter_params: Some(enabled),
            ..NodeConfig::default()
        }
    }

    #[tokio::test]
    async fn disabled_matches_fresh_contract() {
        let network = SimulatedNetwork::new(state());
        let oapp = adapter(&network, &eth()).await;
        assert!(configure_use_custom_adapter_params(oapp.as_ref(), &custom(false))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn enabling_is_planned_once() {
        let network = SimulatedNetwork::new(state());
        let oapp = adapter(&network, &eth()).await;
        let txs = configure_use_custom_adapter_params(oapp.as_ref(), &custom(true))
            .await
            .unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].description, "setUseCustomAdapterParams(true)");
        apply(&network, &txs).await;
        assert!(configure_use_custom_adapter_params(oapp.as_ref(), &custom(true))
            .await
            .unwrap()
            .is_empty());
    }
}
