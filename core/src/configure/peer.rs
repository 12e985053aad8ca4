//! Peers.
//!
//! On v2 endpoints the peer is a 32-byte word per remote eid. On v1
//! endpoints the same relationship is a trusted remote path: the remote
//! address bytes followed by the local address bytes.

use tracing::debug;

use super::{shape, ConfigureError, Pathway};
use crate::chain::family::{protocol_version, ProtocolVersion};
use crate::chain::{ConfigKind, ConfigUpdate};
use crate::types::config::PeerTarget;
use crate::types::num::Bytes;
use crate::types::transaction::PlannedTransaction;

fn invalid(e: impl ToString) -> ConfigureError {
    ConfigureError::Invalid {
        field: "peer",
        reason: e.to_string(),
    }
}

pub async fn configure_peer(pathway: &Pathway<'_>) -> Result<Vec<PlannedTransaction>, ConfigureError> {
    let Some(target) = pathway.config.peer.as_ref() else {
        return Ok(vec![]);
    };
    let remote = match target {
        PeerTarget::Counterpart => pathway.vector.to.address.as_str(),
        PeerTarget::Address(address) => address.as_str(),
    };

    if protocol_version(pathway.from.point().eid) == ProtocolVersion::V1 {
        return configure_trusted_remote(pathway, remote).await;
    }

    let desired = pathway.to.encode_peer(remote).map_err(invalid)?;
    let (kind, value) = pathway.read(ConfigKind::Peer).await?;
    let current = shape(&kind, pathway.remote_eid(), value.into_peer(&kind))?;
    if current == desired {
        return Ok(vec![]);
    }
    debug!(vector = %pathway.vector, current = %current, desired = %desired, "peer drifted");
    let tx = pathway.build(ConfigUpdate::Peer { peer: desired }).await?;
    Ok(vec![tx])
}

async fn configure_trusted_remote(
    pathway: &Pathway<'_>,
    remote: &str,
) -> Result<Vec<PlannedTransaction>, ConfigureError> {
    let mut path = pathway.to.address_bytes(remote).map_err(invalid)?;
    let local = pathway
        .from
        .address_bytes(&pathway.from.point().address)
        .map_err(invalid)?;
    path.extend(local);
    let desired = Bytes(path);

    let (kind, value) = pathway.read(ConfigKind::TrustedRemote).await?;
    let current = shape(&kind, pathway.remote_eid(), value.into_bytes(&kind))?;
    if current == desired {
        return Ok(vec![]);
    }
    debug!(vector = %pathway.vector, current = %current, desired = %desired, "trusted remote drifted");
    let tx = pathway.build(ConfigUpdate::TrustedRemote { path: desired }).await?;
    Ok(vec![tx])
}
