//! Bech32 address inspection
//!
//! Everything here is offline: addresses are classified from their string
//! form, never by asking the network.
//!
//! A MultiversX address is the `erd` human readable part, the `1` separator,
//! 52 data characters carrying a 32 byte public key and a 6 character
//! checksum. Smart contract public keys start with eight zero bytes.

use thiserror::Error;

pub const HRP: &str = "erd";
pub const ADDRESS_LENGTH: usize = 62;
pub const PUBKEY_LENGTH: usize = 32;

const CHARSET: &[u8; 32] = b"qpzry9x8gf2tvdw0s3jn54khce6mua7l";
const CHECKSUM_LENGTH: usize = 6;
const GENERATORS: [u32; 5] = [
    0x3b6a_57b2,
    0x2650_8e6d,
    0x1ea1_19fa,
    0x3d42_33dd,
    0x2a14_62b3,
];
const CONTRACT_ZERO_PREFIX: usize = 8;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("address '{0}' must start with 'erd1' and be 62 characters long")]
    Format(String),

    #[error("address '{0}' contains a character outside the bech32 alphabet")]
    Charset(String),

    #[error("address '{0}' has an invalid checksum")]
    Checksum(String),
}

/// Fixed-length format check: `erd1` followed by 58 lowercase bech32 characters
pub fn is_valid_address(address: &str) -> bool {
    address.len() == ADDRESS_LENGTH
        && address.starts_with("erd1")
        && address[HRP.len() + 1..]
            .bytes()
            .all(|c| CHARSET.contains(&c))
}

/// Decodes an address into its 32 byte public key, verifying the checksum
pub fn decode_pubkey(address: &str) -> Result<[u8; PUBKEY_LENGTH], AddressError> {
    if address.len() != ADDRESS_LENGTH || !address.starts_with("erd1") {
        return Err(AddressError::Format(address.to_string()));
    }

    let values = address[HRP.len() + 1..]
        .bytes()
        .map(|c| {
            CHARSET
                .iter()
                .position(|&x| x == c)
                .map(|v| v as u8)
                .ok_or_else(|| AddressError::Charset(address.to_string()))
        })
        .collect::<Result<Vec<u8>, _>>()?;

    let mut checked = hrp_expand(HRP);
    checked.extend_from_slice(&values);
    if polymod(&checked) != 1 {
        return Err(AddressError::Checksum(address.to_string()));
    }

    let data = &values[..values.len() - CHECKSUM_LENGTH];
    let bytes = regroup_5_to_8(data);
    bytes
        .try_into()
        .map_err(|_| AddressError::Format(address.to_string()))
}

/// Hex encoding of the public key, as used in ESDTNFTTransfer arguments
pub fn pubkey_hex(address: &str) -> Result<String, AddressError> {
    decode_pubkey(address).map(hex::encode)
}

/// Contract addresses carry eight leading zero bytes in their public key.
/// Anything that does not decode is not classified as a contract.
pub fn is_contract_address(address: &str) -> bool {
    decode_pubkey(address)
        .map(|pk| pk[..CONTRACT_ZERO_PREFIX].iter().all(|b| *b == 0))
        .unwrap_or(false)
}

fn hrp_expand(hrp: &str) -> Vec<u8> {
    let mut out: Vec<u8> = hrp.bytes().map(|c| c >> 5).collect();
    out.push(0);
    out.extend(hrp.bytes().map(|c| c & 31));
    out
}

fn polymod(values: &[u8]) -> u32 {
    let mut chk: u32 = 1;
    for v in values {
        let top = chk >> 25;
        chk = ((chk & 0x01ff_ffff) << 5) ^ u32::from(*v);
        for (i, generator) in GENERATORS.iter().enumerate() {
            if (top >> i) & 1 == 1 {
                chk ^= generator;
            }
        }
    }
    chk
}

/// 5-bit groups to bytes, dropping the trailing padding bits
fn regroup_5_to_8(data: &[u8]) -> Vec<u8> {
    let mut acc: u32 = 0;
    let mut bits = 0u32;
    let mut out = Vec::with_capacity(data.len() * 5 / 8);
    for value in data {
        acc = (acc << 5) | u32::from(*value);
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            out.push((acc >> bits) as u8);
        }
    }
    out
}
