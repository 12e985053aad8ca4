//! Outbound rate limit of token pathways.

use super::{shape, ConfigureError, Pathway};
use crate::chain::{ConfigKind, ConfigUpdate};
use crate::types::transaction::PlannedTransaction;

/// An absent desired limit leaves the current one untouched; it never clears it.
pub async fn configure_rate_limit(pathway: &Pathway<'_>) -> Result<Vec<PlannedTransaction>, ConfigureError> {
    let Some(desired) = pathway.config.rate_limit else {
        return Ok(vec![]);
    };
    let (kind, value) = pathway.read(ConfigKind::RateLimit).await?;
    let current = shape(&kind, pathway.remote_eid(), value.into_rate_limit(&kind))?;
    if current == Some(desired) {
        return Ok(vec![]);
    }
    let tx = pathway.build(ConfigUpdate::RateLimit { limit: desired }).await?;
    Ok(vec![tx])
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::chain::simulated::SimulatedNetwork;
    use crate::types::config::{EdgeConfig, RateLimit};
    use crate::types::num::Uint;

    fn limit(capacity: u64, refill: u64) -> EdgeConfig {
        EdgeConfig {
            rate_limit: Some(RateLimit {
                capacity: Uint::from(capacity),
                refill_per_second: Uint::from(refill),
            }),
            ..EdgeConfig::default()
        }
    }

    #[tokio::test]
    async fn limit_is_set_then_stable() {
        let fx = Fixture::new(SimulatedNetwork::new(state())).await;
        let txs = configure_rate_limit(&fx.pathway(&limit(1000, 10))).await.unwrap();
        assert_eq!(txs.len(), 1);
        fx.apply(&txs).await;
        assert!(configure_rate_limit(&fx.pathway(&limit(1000, 10))).await.unwrap().is_empty());
        assert_eq!(configure_rate_limit(&fx.pathway(&limit(1000, 11))).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn absent_limit_is_a_no_op() {
        let fx = Fixture::new(SimulatedNetwork::new(state())).await;
        let txs = configure_rate_limit(&fx.pathway(&limit(5, 5))).await.unwrap();
        fx.apply(&txs).await;
        assert!(configure_rate_limit(&fx.pathway(&EdgeConfig::default()))
            .await
            .unwrap()
            .is_empty());
    }
}
