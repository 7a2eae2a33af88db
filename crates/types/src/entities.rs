use ethereum_types::{H160, H256, U256};
use serde::{Deserialize, Serialize};

use crate::{AccountIndex, ChainId, L2Address};

/// A token registered in the rollup contract.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Token {
    pub id: u64,
    pub ethereum_address: H160,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// A user-initiated L1 deposit not yet forged into a rollup batch.
///
/// Identified by its L1 transaction hash until the receipt log is decoded,
/// then additionally by the rollup-assigned `transaction_id`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PendingDeposit {
    pub hash: H256,
    pub transaction_id: Option<String>,
    pub l2_address: L2Address,
    pub chain_id: ChainId,
    pub token: Token,
    pub amount: U256,
    /// Submission time, milliseconds since epoch.
    pub timestamp_ms: u64,
}

/// An instant-withdraw (exit completion) transaction awaiting finality.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PendingWithdraw {
    pub hash: H256,
    pub id: String,
    pub batch_num: u64,
    pub account_index: AccountIndex,
    pub l2_address: L2Address,
    pub chain_id: ChainId,
    pub timestamp_ms: u64,
}

/// A withdrawal subject to the mandatory security delay.
///
/// `timestamp_ms` tracks the mining block's timestamp once known; submission
/// and mining time can diverge.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PendingDelayedWithdraw {
    pub hash: H256,
    pub id: String,
    pub batch_num: u64,
    pub account_index: AccountIndex,
    pub l2_address: L2Address,
    pub chain_id: ChainId,
    /// Always false in the delayed path.
    pub instant: bool,
    pub timestamp_ms: u64,
}

/// Client-side countdown until a delayed withdrawal becomes claimable.
/// Never cross-checked against chain state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TimerWithdraw {
    pub id: String,
    pub l2_address: L2Address,
    pub chain_id: ChainId,
    /// Target completion time, milliseconds since epoch.
    pub expires_at_ms: u64,
}

impl TimerWithdraw {
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at_ms
    }
}

/// Identifier of a delayed-withdraw record: account index concatenated with
/// the batch number. Shared between a withdraw and its linked delayed record.
pub fn withdraw_id(account_index: &str, batch_num: u64) -> String {
    format!("{}{}", account_index, batch_num)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_schema_rejects_unknown_fields() {
        let json = r#"{
            "id": "hez:ETH:25610",
            "l2Address": "hez:0xaa942cfcd25ad4d90a62358b0dd84f33b398262a",
            "chainId": 1,
            "expiresAtMs": 1000,
            "extra": true
        }"#;
        assert!(serde_json::from_str::<TimerWithdraw>(json).is_err());
    }

    #[test]
    fn withdraw_id_concatenates() {
        assert_eq!(withdraw_id("256:ETH:0", 10), "256:ETH:010");
    }

    #[test]
    fn timer_expiry() {
        let timer = TimerWithdraw {
            id: "256:ETH:010".into(),
            l2_address: L2Address::parse("hez:0xaa942cfcd25ad4d90a62358b0dd84f33b398262a")
                .unwrap(),
            chain_id: 1,
            expires_at_ms: 2_000,
        };
        assert!(!timer.is_expired(1_999));
        assert!(timer.is_expired(2_000));
    }
}
