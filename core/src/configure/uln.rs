//! ULN and executor config of the message libraries.
//!
//! The send side carries the executor config and the send ULN config, the
//! receive side the receive ULN config. Each side emits at most one
//! `setConfig` call holding every parameter that differs.

use tracing::debug;

use super::{same_address, shape, ConfigureError, Pathway};
use crate::chain::{ChainAdapter, ConfigKind, ConfigUpdate, Direction, LibraryParam};
use crate::types::config::{ExecutorConfig, UlnConfig};
use crate::types::transaction::PlannedTransaction;

/// The library a config applies to: the desired one if set, otherwise
/// whatever the pathway uses right now.
async fn target_library(
    pathway: &Pathway<'_>,
    desired: Option<&str>,
    kind: ConfigKind,
) -> Result<String, ConfigureError> {
    if let Some(library) = desired {
        return Ok(library.to_string());
    }
    let (kind, value) = pathway.read(kind).await?;
    let (address, _) = shape(&kind, pathway.remote_eid(), value.into_library(&kind))?;
    Ok(address)
}

/// Validated after normalization: duplicate DVNs collapse, and the
/// threshold must still fit what is actually sent.
fn normalize_uln(adapter: &dyn ChainAdapter, config: &UlnConfig) -> Result<UlnConfig, ConfigureError> {
    let invalid = |reason: String| ConfigureError::Invalid {
        field: "uln_config",
        reason,
    };
    let normalized = config
        .normalized(adapter.family())
        .map_err(|e| invalid(e.to_string()))?;
    normalized.validate().map_err(invalid)?;
    Ok(normalized)
}

/// Field-wise comparison. `current` comes from the chain and is normalized
/// leniently: if it does not normalize it cannot equal a valid desired config.
fn uln_matches(adapter: &dyn ChainAdapter, current: Option<&UlnConfig>, desired: &UlnConfig) -> bool {
    let Some(current) = current else {
        return false;
    };
    let Ok(current) = current.normalized(adapter.family()) else {
        return false;
    };
    current.confirmations == desired.confirmations
        && current.required_dvns == desired.required_dvns
        && current.optional_dvns == desired.optional_dvns
        && current.optional_dvn_threshold == desired.optional_dvn_threshold
}

fn executor_matches(adapter: &dyn ChainAdapter, current: Option<&ExecutorConfig>, desired: &ExecutorConfig) -> bool {
    match current {
        Some(current) => {
            current.max_message_size == desired.max_message_size
                && same_address(adapter, &current.executor, &desired.executor)
        }
        None => false,
    }
}

async fn uln_param(
    pathway: &Pathway<'_>,
    library: &str,
    direction: Direction,
    desired: &UlnConfig,
) -> Result<Option<LibraryParam>, ConfigureError> {
    let desired = normalize_uln(pathway.from, desired)?;
    let (kind, value) = pathway
        .read(ConfigKind::Uln {
            library: library.to_string(),
            direction,
        })
        .await?;
    let current = shape(&kind, pathway.remote_eid(), value.into_uln(&kind))?;
    if uln_matches(pathway.from, current.as_ref(), &desired) {
        return Ok(None);
    }
    debug!(vector = %pathway.vector, library, %direction, "ULN config drifted");
    Ok(Some(match direction {
        Direction::Send => LibraryParam::SendUln(desired),
        Direction::Receive => LibraryParam::ReceiveUln(desired),
    }))
}

async fn set_config(
    pathway: &Pathway<'_>,
    library: String,
    params: Vec<LibraryParam>,
) -> Result<Vec<PlannedTransaction>, ConfigureError> {
    if params.is_empty() {
        return Ok(vec![]);
    }
    let tx = pathway.build(ConfigUpdate::SetConfig { library, params }).await?;
    Ok(vec![tx])
}

pub async fn configure_send_config(pathway: &Pathway<'_>) -> Result<Vec<PlannedTransaction>, ConfigureError> {
    let config = pathway.config;
    if config.uln_config.is_none() && config.executor_config.is_none() {
        return Ok(vec![]);
    }
    let library = target_library(pathway, config.send_library.as_deref(), ConfigKind::SendLibrary).await?;
    let mut params = Vec::new();

    if let Some(desired) = &config.executor_config {
        let (kind, value) = pathway
            .read(ConfigKind::Executor {
                library: library.clone(),
            })
            .await?;
        let current = shape(&kind, pathway.remote_eid(), value.into_executor(&kind))?;
        if !executor_matches(pathway.from, current.as_ref(), desired) {
            let desired = desired
                .normalized(pathway.from.family())
                .map_err(|e| ConfigureError::Invalid {
                    field: "executor_config",
                    reason: e.to_string(),
                })?;
            params.push(LibraryParam::Executor(desired));
        }
    }

    if let Some(desired) = &config.uln_config {
        if let Some(param) = uln_param(pathway, &library, Direction::Send, desired).await? {
            params.push(param);
        }
    }

    set_config(pathway, library, params).await
}

pub async fn configure_receive_config(pathway: &Pathway<'_>) -> Result<Vec<PlannedTransaction>, ConfigureError> {
    let config = pathway.config;
    let Some(desired) = &config.receive_uln_config else {
        return Ok(vec![]);
    };
    let desired_library = config.receive_library.as_ref().map(|r| r.library.as_str());
    let library = target_library(pathway, desired_library, ConfigKind::ReceiveLibrary).await?;
    let params = uln_param(pathway, &library, Direction::Receive, desired)
        .await?
        .into_iter()
        .collect();
    set_config(pathway, library, params).await
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::chain::simulated::SimulatedNetwork;
    use crate::types::config::EdgeConfig;
    use crate::types::num::Uint;

    const DVN_A: &str = "0x00000000000000000000000000000000000000a1";
    const DVN_B: &str = "0x00000000000000000000000000000000000000B2";

    fn uln(confirmations: Uint, required: &[&str]) -> UlnConfig {
        UlnConfig {
            confirmations,
            required_dvns: required.iter().map(|s| s.to_string()).collect(),
            optional_dvns: vec![],
            optional_dvn_threshold: 0,
        }
    }

    fn send_config(uln_config: UlnConfig) -> EdgeConfig {
        EdgeConfig {
            send_library: Some(LIB.into()),
            uln_config: Some(uln_config),
            executor_config: Some(ExecutorConfig {
                executor: "0x00000000000000000000000000000000000000e1".into(),
                max_message_size: 10_000,
            }),
            ..EdgeConfig::default()
        }
    }

    #[tokio::test]
    async fn one_set_config_for_both_params() {
        let fx = Fixture::new(SimulatedNetwork::new(state())).await;
        let config = send_config(uln(Uint::from(15u64), &[DVN_A, DVN_B]));
        let txs = configure_send_config(&fx.pathway(&config)).await.unwrap();
        assert_eq!(txs.len(), 1);
        assert!(txs[0].description.contains("[executor, send_uln]"));
        fx.apply(&txs).await;
        assert!(configure_send_config(&fx.pathway(&config)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn dvn_order_does_not_cause_drift() {
        let fx = Fixture::new(SimulatedNetwork::new(state())).await;
        let txs = configure_send_config(&fx.pathway(&send_config(uln(Uint::from(15u64), &[DVN_A, DVN_B]))))
            .await
            .unwrap();
        fx.apply(&txs).await;

        let reordered = send_config(uln(Uint::from(15u64), &[DVN_B, DVN_A]));
        assert!(configure_send_config(&fx.pathway(&reordered)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn confirmations_compare_by_value() {
        let fx = Fixture::new(SimulatedNetwork::new(state())).await;
        let txs = configure_send_config(&fx.pathway(&send_config(uln(Uint::from(15u64), &[DVN_A]))))
            .await
            .unwrap();
        fx.apply(&txs).await;

        for text in ["15", "\"15\"", "\"0xf\""] {
            let confirmations: Uint = serde_json::from_str(text).unwrap();
            let config = send_config(uln(confirmations, &[DVN_A]));
            assert!(
                configure_send_config(&fx.pathway(&config)).await.unwrap().is_empty(),
                "{} should match",
                text
            );
        }

        let config = send_config(uln(Uint::from(20u64), &[DVN_A]));
        let txs = configure_send_config(&fx.pathway(&config)).await.unwrap();
        assert_eq!(txs.len(), 1);
        assert!(txs[0].description.contains("[send_uln]"));
    }

    #[tokio::test]
    async fn invalid_desired_config_is_not_fatal() {
        let fx = Fixture::new(SimulatedNetwork::new(state())).await;
        let mut bad = uln(Uint::from(1u64), &[DVN_A]);
        bad.optional_dvn_threshold = 2;
        let config = EdgeConfig {
            receive_uln_config: Some(bad),
            ..EdgeConfig::default()
        };
        let err = configure_receive_config(&fx.pathway(&config)).await.unwrap_err();
        assert!(matches!(err, ConfigureError::Invalid { field: "uln_config", .. }));
        assert!(!err.is_fatal());
    }

    #[tokio::test]
    async fn duplicate_optional_dvns_count_once_against_threshold() {
        let fx = Fixture::new(SimulatedNetwork::new(state())).await;
        let mut desired = uln(Uint::from(1u64), &[]);
        desired.optional_dvns = vec![DVN_A.into(), DVN_A.to_uppercase().replace("0X", "0x")];
        desired.optional_dvn_threshold = 2;
        let err = configure_send_config(&fx.pathway(&send_config(desired)))
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigureError::Invalid { field: "uln_config", .. }));
        assert!(!err.is_fatal());
    }

    #[tokio::test]
    async fn optional_dvn_order_does_not_cause_drift() {
        let fx = Fixture::new(SimulatedNetwork::new(state())).await;
        let with_optional = |optional: &[&str]| {
            let mut desired = uln(Uint::from(15u64), &[DVN_A]);
            desired.optional_dvns = optional.iter().map(|s| s.to_string()).collect();
            desired.optional_dvn_threshold = 1;
            send_config(desired)
        };
        let txs = configure_send_config(&fx.pathway(&with_optional(&[DVN_A, DVN_B])))
            .await
            .unwrap();
        assert_eq!(txs.len(), 1);
        fx.apply(&txs).await;

        assert!(configure_send_config(&fx.pathway(&with_optional(&[DVN_B, DVN_A])))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn receive_config_targets_current_receive_library() {
        let mut s = state();
        s.endpoints.get_mut(&ETH).unwrap().default_receive_library = Some(LIB.into());
        let fx = Fixture::new(SimulatedNetwork::new(s)).await;
        let config = EdgeConfig {
            receive_uln_config: Some(uln(Uint::from(5u64), &[DVN_A])),
            ..EdgeConfig::default()
        };
        let txs = configure_receive_config(&fx.pathway(&config)).await.unwrap();
        assert_eq!(txs.len(), 1);
        assert!(txs[0].description.starts_with(&format!("setConfig({}", LIB)));
        fx.apply(&txs).await;
        assert!(configure_receive_config(&fx.pathway(&config)).await.unwrap().is_empty());
    }
}
