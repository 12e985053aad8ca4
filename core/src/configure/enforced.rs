//! Enforced options.
//!
//! Desired fragments are grouped per `(remote eid, msg type)` and encoded
//! into one type-3 blob each. Blobs that differ from what the contract
//! stores are written in a single `setEnforcedOptions` call.

use tracing::{debug, warn};

use super::{read_config, shape, ConfigureError, Pathway};
use crate::chain::{ConfigKind, ConfigUpdate, EnforcedOptionParam};
use crate::types::num::Bytes32;
use crate::types::options::{group_options, OptionsBuilder};
use crate::types::point::EndpointId;
use crate::types::transaction::PlannedTransaction;

pub async fn configure_enforced_options(pathway: &Pathway<'_>) -> Result<Vec<PlannedTransaction>, ConfigureError> {
    let Some(entries) = pathway.config.enforced_options.as_ref() else {
        return Ok(vec![]);
    };
    let grouped = group_options(entries, pathway.remote_eid());
    for dup in &grouped.duplicates {
        warn!(
            vector = %pathway.vector,
            remote_eid = dup.remote_eid,
            msg_type = dup.msg_type,
            option = %dup.id,
            "duplicate enforced option, keeping the later entry"
        );
    }

    let mut params = Vec::new();
    for ((remote_eid, msg_type), fragments) in grouped.groups {
        let mut builder = OptionsBuilder::new();
        for fragment in &fragments {
            fragment
                .encode_into(&mut builder, |receiver| encode_receiver(pathway, remote_eid, receiver))
                .map_err(|e| ConfigureError::Invalid {
                    field: "enforced_options",
                    reason: e.to_string(),
                })?;
        }
        let desired = builder.build();

        let (kind, value) = read_config(pathway.from, ConfigKind::EnforcedOptions { msg_type }, remote_eid).await?;
        let current = shape(&kind, remote_eid, value.into_bytes(&kind))?;
        if current == desired {
            continue;
        }
        debug!(vector = %pathway.vector, remote_eid, msg_type, current = %current, desired = %desired, "enforced options drifted");
        params.push(EnforcedOptionParam {
            eid: remote_eid,
            msg_type,
            options: desired,
        });
    }

    if params.is_empty() {
        return Ok(vec![]);
    }
    let tx = pathway.build(ConfigUpdate::EnforcedOptions { options: params }).await?;
    Ok(vec![tx])
}

/// Native drop receivers live on the remote chain. The pathway's `to`
/// adapter knows that chain's address format; other remotes take hex.
fn encode_receiver(pathway: &Pathway<'_>, remote_eid: EndpointId, receiver: &str) -> Result<Bytes32, String> {
    if remote_eid == pathway.to.point().eid {
        pathway.to.encode_peer(receiver).map_err(|e| e.to_string())
    } else {
        receiver.parse::<Bytes32>().map_err(|e| e.to_string())
    }
}
