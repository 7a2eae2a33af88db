//! Classification of tracked L1 transactions from provider lookups.
//!
//! The reconciliation passes use these to decide whether a pending entity
//! has reached a terminal failure state.

use std::time::Duration;

use hez_types::{U256, U64};

use crate::json_types::{EthReceipt, EthTransaction};

/// A previously-submitted transaction the provider cannot find is canceled,
/// but only after a grace period has elapsed since submission. Before that
/// it may simply not have propagated yet.
pub fn is_tx_canceled(
    tx: &Option<EthTransaction>,
    submitted_at_ms: u64,
    now_ms: u64,
    grace: Duration,
) -> bool {
    tx.is_none() && now_ms.saturating_sub(submitted_at_ms) >= grace.as_millis() as u64
}

/// Heuristic "this will revert for lack of funds" pre-check: the sender's
/// *current* balance cannot cover value plus worst-case gas. Evaluated even
/// for transactions still pending. Known limitation: several pending
/// transactions competing for the same funds can each be flagged.
pub fn is_tx_expected_to_fail(tx: &EthTransaction, current_balance: U256) -> bool {
    if tx.block_number.is_some() {
        return false;
    }
    let gas_cost = tx.gas.saturating_mul(tx.gas_price.unwrap_or_default());
    current_balance < tx.value.saturating_add(gas_cost)
}

pub fn is_tx_mined(tx: &EthTransaction) -> bool {
    tx.block_number.is_some()
}

pub fn has_tx_been_reverted(receipt: &EthReceipt) -> bool {
    receipt.status == Some(U64::zero())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hez_types::{H160, H256};

    fn pending_tx(value: u64, gas: u64, gas_price: u64) -> EthTransaction {
        EthTransaction {
            hash: H256::repeat_byte(0xaa),
            from: H160::repeat_byte(0x01),
            value: U256::from(value),
            gas: U256::from(gas),
            gas_price: Some(U256::from(gas_price)),
            block_number: None,
        }
    }

    #[test]
    fn canceled_only_after_grace() {
        let grace = Duration::from_secs(120);
        assert!(!is_tx_canceled(&None, 1_000_000, 1_060_000, grace));
        assert!(is_tx_canceled(&None, 1_000_000, 1_120_000, grace));
        assert!(!is_tx_canceled(
            &Some(pending_tx(1, 21_000, 1)),
            1_000_000,
            2_000_000,
            grace
        ));
    }

    #[test]
    fn expected_to_fail_uses_value_plus_gas() {
        let tx = pending_tx(1_000, 21_000, 2);
        // Needs 1_000 + 42_000.
        assert!(is_tx_expected_to_fail(&tx, U256::from(42_999u64)));
        assert!(!is_tx_expected_to_fail(&tx, U256::from(43_000u64)));
    }

    #[test]
    fn mined_tx_never_expected_to_fail() {
        let mut tx = pending_tx(1_000, 21_000, 2);
        tx.block_number = Some(U64::from(10u64));
        assert!(!is_tx_expected_to_fail(&tx, U256::zero()));
        assert!(is_tx_mined(&tx));
    }

    #[test]
    fn reverted_receipt() {
        let receipt = EthReceipt {
            transaction_hash: H256::repeat_byte(0xaa),
            status: Some(U64::zero()),
            logs: vec![],
        };
        assert!(has_tx_been_reverted(&receipt));
        let ok = EthReceipt {
            status: Some(U64::one()),
            ..receipt
        };
        assert!(!has_tx_been_reverted(&ok));
    }
}
