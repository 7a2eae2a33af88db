use std::fmt;
use std::str::FromStr;

use ethereum_types::H160;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const L2_ADDRESS_PREFIX: &str = "hez:";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum AddressError {
    #[error("missing \"{L2_ADDRESS_PREFIX}\" prefix in {0}")]
    MissingPrefix(String),
    #[error("invalid ethereum address in {0}")]
    InvalidEthereumAddress(String),
}

/// Rollup wallet address: an Ethereum address carrying the rollup prefix,
/// e.g. "hez:0xaa942cfcd25ad4d90a62358b0dd84f33b398262a".
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct L2Address(String);

impl L2Address {
    pub fn parse(s: &str) -> Result<Self, AddressError> {
        let hex = s
            .strip_prefix(L2_ADDRESS_PREFIX)
            .ok_or_else(|| AddressError::MissingPrefix(s.to_string()))?;
        if H160::from_str(hex.trim_start_matches("0x")).is_err() {
            return Err(AddressError::InvalidEthereumAddress(s.to_string()));
        }
        Ok(L2Address(s.to_string()))
    }

    pub fn from_ethereum_address(address: H160) -> Self {
        L2Address(format!("{}{:#x}", L2_ADDRESS_PREFIX, address))
    }

    /// The underlying Ethereum address, used for L1 queries.
    pub fn to_ethereum_address(&self) -> Result<H160, AddressError> {
        let hex = self
            .0
            .strip_prefix(L2_ADDRESS_PREFIX)
            .ok_or_else(|| AddressError::MissingPrefix(self.0.clone()))?;
        H160::from_str(hex.trim_start_matches("0x"))
            .map_err(|_| AddressError::InvalidEthereumAddress(self.0.clone()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for L2Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_convert() {
        let addr = L2Address::parse("hez:0xaa942cfcd25ad4d90a62358b0dd84f33b398262a").unwrap();
        let eth = addr.to_ethereum_address().unwrap();
        assert_eq!(L2Address::from_ethereum_address(eth), addr);
    }

    #[test]
    fn reject_unprefixed() {
        let err = L2Address::parse("0xaa942cfcd25ad4d90a62358b0dd84f33b398262a").unwrap_err();
        assert!(matches!(err, AddressError::MissingPrefix(_)));
    }

    #[test]
    fn reject_bad_hex() {
        assert!(matches!(
            L2Address::parse("hez:0xnothex").unwrap_err(),
            AddressError::InvalidEthereumAddress(_)
        ));
    }
}
