//! Wire types for the Ethereum JSON-RPC surface the wallet consumes.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use hez_types::{H160, H256, U256, U64};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EthTransaction {
    pub hash: H256,
    pub from: H160,
    pub value: U256,
    pub gas: U256,
    pub gas_price: Option<U256>,
    /// None while the transaction is still in the mempool.
    pub block_number: Option<U64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EthReceipt {
    pub transaction_hash: H256,
    /// 1 on success, 0 on revert. Missing on pre-Byzantium chains.
    pub status: Option<U64>,
    pub logs: Vec<EthLog>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EthLog {
    pub address: H160,
    pub topics: Vec<H256>,
    pub data: HexBytes,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EthBlock {
    /// Seconds since epoch.
    pub timestamp: U256,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EthBlockWithTransactions {
    pub timestamp: U256,
    pub transactions: Vec<EthTransaction>,
}

/// Byte string carried as 0x-prefixed hex in JSON.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HexBytes(pub Vec<u8>);

impl Serialize for HexBytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(&self.0)))
    }
}

impl<'de> Deserialize<'de> for HexBytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let stripped = s.strip_prefix("0x").unwrap_or(&s);
        hex::decode(stripped)
            .map(HexBytes)
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_pending_transaction() {
        let tx: EthTransaction = serde_json::from_str(
            r#"{
                "hash": "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
                "from": "0xaa942cfcd25ad4d90a62358b0dd84f33b398262a",
                "value": "0x3e8",
                "gas": "0x5208",
                "gasPrice": "0x3b9aca00",
                "blockNumber": null
            }"#,
        )
        .unwrap();
        assert_eq!(tx.value, U256::from(1000u64));
        assert!(tx.block_number.is_none());
    }

    #[test]
    fn hex_bytes_roundtrip() {
        let bytes = HexBytes(vec![0x00, 0xab, 0xcd]);
        let json = serde_json::to_string(&bytes).unwrap();
        assert_eq!(json, "\"0x00abcd\"");
        assert_eq!(serde_json::from_str::<HexBytes>(&json).unwrap(), bytes);
    }
}
