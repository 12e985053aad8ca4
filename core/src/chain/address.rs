//! Address decoding per chain family.
//!
//! EVM addresses are 20-byte hex, Aptos addresses are up to 32-byte hex
//! (short forms like `0x1` are left-padded), Solana addresses are base58
//! public keys. Everything is decoded into raw bytes before comparison.

use std::str::FromStr;

use solana_pubkey::Pubkey;
use thiserror::Error;

use super::family::ChainFamily;
use crate::types::num::{decode_hex, Bytes32};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("'{address}' is not a valid {family} address: {reason}")]
    Invalid {
        family: ChainFamily,
        address: String,
        reason: String,
    },
}

fn invalid(family: ChainFamily, address: &str, reason: impl Into<String>) -> AddressError {
    AddressError::Invalid {
        family,
        address: address.to_string(),
        reason: reason.into(),
    }
}

/// Decodes an address into its native-width bytes.
pub fn decode_address(family: ChainFamily, address: &str) -> Result<Vec<u8>, AddressError> {
    let trimmed = address.trim();
    match family {
        ChainFamily::Evm => {
            let bytes = decode_hex(trimmed).map_err(|e| invalid(family, address, e.to_string()))?;
            if bytes.len() != 20 {
                return Err(invalid(
                    family,
                    address,
                    format!("expected 20 bytes, got {}", bytes.len()),
                ));
            }
            Ok(bytes)
        }
        ChainFamily::Aptos => {
            let bytes = decode_hex(trimmed).map_err(|e| invalid(family, address, e.to_string()))?;
            let word = Bytes32::left_pad(&bytes).map_err(|e| invalid(family, address, e.to_string()))?;
            Ok(word.0.to_vec())
        }
        ChainFamily::Solana => Ok(solana_pubkey(family, address)?.to_bytes().to_vec()),
    }
}

fn solana_pubkey(family: ChainFamily, address: &str) -> Result<Pubkey, AddressError> {
    Pubkey::from_str(address.trim()).map_err(|e| invalid(family, address, e.to_string()))
}

/// Canonical string form used for equality checks on library, DVN and
/// executor addresses.
pub fn normalize_address(family: ChainFamily, address: &str) -> Result<String, AddressError> {
    let bytes = decode_address(family, address)?;
    Ok(match family {
        ChainFamily::Evm | ChainFamily::Aptos => format!("0x{}", hex::encode(bytes)),
        ChainFamily::Solana => solana_pubkey(family, address)?.to_string(),
    })
}

/// The 32-byte peer form of an address: native bytes, left-padded.
pub fn peer_bytes(family: ChainFamily, address: &str) -> Result<Bytes32, AddressError> {
    let bytes = decode_address(family, address)?;
    Bytes32::left_pad(&bytes).map_err(|e| invalid(family, address, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evm_addresses_normalize_case() {
        let a = normalize_address(ChainFamily::Evm, "0xAbCd00000000000000000000000000000000Ef01").unwrap();
        let b = normalize_address(ChainFamily::Evm, "0xabcd00000000000000000000000000000000ef01").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn evm_rejects_wrong_width() {
        assert!(decode_address(ChainFamily::Evm, "0xabcd").is_err());
    }

    #[test]
    fn aptos_short_address_is_padded() {
        let bytes = decode_address(ChainFamily::Aptos, "0x1").unwrap();
        assert_eq!(bytes.len(), 32);
        assert_eq!(bytes[31], 1);
    }

    #[test]
    fn solana_system_program_decodes_to_zero() {
        let bytes = decode_address(ChainFamily::Solana, "11111111111111111111111111111111").unwrap();
        assert_eq!(bytes, vec![0u8; 32]);
    }

    #[test]
    fn solana_rejects_non_base58() {
        assert!(decode_address(ChainFamily::Solana, "0OIl").is_err());
    }

    #[test]
    fn solana_rejects_short_keys() {
        assert!(decode_address(ChainFamily::Solana, "1111").is_err());
    }

    #[test]
    fn solana_normalizes_to_base58() {
        let key = "So11111111111111111111111111111111111111112";
        assert_eq!(normalize_address(ChainFamily::Solana, &format!("  {} ", key)).unwrap(), key);
    }

    #[test]
    fn evm_peer_is_left_padded() {
        let peer = peer_bytes(ChainFamily::Evm, "0x00000000000000000000000000000000000000ff").unwrap();
        assert_eq!(peer.0[31], 0xff);
        assert_eq!(&peer.0[..12], &[0u8; 12]);
    }
}
