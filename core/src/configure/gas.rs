//! Minimum destination gas of v1 applications, one call per packet type.

use super::{shape, ConfigureError, Pathway};
use crate::chain::{ConfigKind, ConfigUpdate};
use crate::types::transaction::PlannedTransaction;

pub async fn configure_min_dst_gas(pathway: &Pathway<'_>) -> Result<Vec<PlannedTransaction>, ConfigureError> {
    let Some(entries) = pathway.config.min_dst_gas.as_ref() else {
        return Ok(vec![]);
    };
    let mut txs = Vec::new();
    for entry in entries {
        let (kind, value) = pathway
            .read(ConfigKind::MinDstGas {
                packet_type: entry.packet_type,
            })
            .await?;
        let current = shape(&kind, pathway.remote_eid(), value.into_uint(&kind))?;
        if current == entry.min_gas {
            continue;
        }
        txs.push(
            pathway
                .build(ConfigUpdate::MinDstGas {
                    packet_type: entry.packet_type,
                    min_gas: entry.min_gas,
                })
                .await?,
        );
    }
    Ok(txs)
}
