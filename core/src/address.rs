//! Algorand address encoding.
//!
//! An address is the RFC 4648 base32 form (no padding) of a 32-byte public
//! key followed by the last four bytes of the key's SHA-512/256 digest.

use data_encoding::BASE32_NOPAD;
use sha2::{Digest, Sha512_256};

pub const PUBLIC_KEY_LEN: usize = 32;
pub const CHECKSUM_LEN: usize = 4;
pub const ADDRESS_LEN: usize = 58;

const APP_ID_PREFIX: &[u8] = b"appID";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("address must be 58 characters, got {0}")]
    Length(usize),
    #[error("address is not valid base32")]
    Encoding,
    #[error("address checksum mismatch")]
    Checksum,
}

fn checksum(public_key: &[u8; PUBLIC_KEY_LEN]) -> [u8; CHECKSUM_LEN] {
    let digest = Sha512_256::digest(public_key);
    let mut out = [0u8; CHECKSUM_LEN];
    out.copy_from_slice(&digest[digest.len() - CHECKSUM_LEN..]);
    out
}

pub fn encode_address(public_key: &[u8; PUBLIC_KEY_LEN]) -> String {
    let mut bytes = Vec::with_capacity(PUBLIC_KEY_LEN + CHECKSUM_LEN);
    bytes.extend_from_slice(public_key);
    bytes.extend_from_slice(&checksum(public_key));
    BASE32_NOPAD.encode(&bytes)
}

pub fn decode_address(address: &str) -> Result<[u8; PUBLIC_KEY_LEN], AddressError> {
    if address.len() != ADDRESS_LEN {
        return Err(AddressError::Length(address.len()));
    }
    let bytes = BASE32_NOPAD
        .decode(address.as_bytes())
        .map_err(|_| AddressError::Encoding)?;
    if bytes.len() != PUBLIC_KEY_LEN + CHECKSUM_LEN {
        return Err(AddressError::Encoding);
    }

    let mut public_key = [0u8; PUBLIC_KEY_LEN];
    public_key.copy_from_slice(&bytes[..PUBLIC_KEY_LEN]);
    if bytes[PUBLIC_KEY_LEN..] != checksum(&public_key) {
        return Err(AddressError::Checksum);
    }
    Ok(public_key)
}

pub fn is_valid_address(address: &str) -> bool {
    decode_address(address).is_ok()
}

/// Escrow address controlled by application `app_id`.
pub fn application_address(app_id: u64) -> String {
    let mut hasher = Sha512_256::new();
    hasher.update(APP_ID_PREFIX);
    hasher.update(app_id.to_be_bytes());
    let public_key: [u8; PUBLIC_KEY_LEN] = hasher.finalize().into();
    encode_address(&public_key)
}
