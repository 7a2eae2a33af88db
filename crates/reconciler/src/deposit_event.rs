//! Decoding of the rollup contract's deposit event from L1 receipt logs.

use ethabi::{Event, EventParam, ParamType, RawLog};

use hez_rpc_client::json_types::EthLog;

/// `L1UserTxEvent(uint32 indexed queueIndex, uint8 indexed position, bytes l1UserTx)`
/// emitted by the rollup contract when an L1 user transaction (deposit) is
/// queued for forging.
pub(crate) fn l1_user_tx_event() -> Event {
    Event {
        name: "L1UserTxEvent".into(),
        inputs: vec![
            EventParam {
                name: "queueIndex".into(),
                kind: ParamType::Uint(32),
                indexed: true,
            },
            EventParam {
                name: "position".into(),
                kind: ParamType::Uint(8),
                indexed: true,
            },
            EventParam {
                name: "l1UserTx".into(),
                kind: ParamType::Bytes,
                indexed: false,
            },
        ],
        anonymous: false,
    }
}

/// Scan receipt logs for the deposit event. Logs emitted by other contracts
/// in the same transaction fail to parse and are skipped, not errors.
pub fn find_l1_user_tx_event(logs: &[EthLog]) -> Option<(u64, u8)> {
    let event = l1_user_tx_event();
    logs.iter().find_map(|log| {
        let raw = RawLog {
            topics: log.topics.clone(),
            data: log.data.0.clone(),
        };
        let parsed = event.parse_log(raw).ok()?;
        let queue_index = parsed.params.first()?.value.clone().into_uint()?.as_u64();
        let position = parsed.params.get(1)?.value.clone().into_uint()?.as_u64() as u8;
        Some((queue_index, position))
    })
}

/// Rollup transaction id of an L1 user transaction:
/// `0x00 || toForgeL1TxsNum (8-byte BE) || position (2-byte BE)`.
pub fn l1_user_tx_id(to_forge_l1_txs_num: u64, position: u8) -> String {
    let mut bytes = Vec::with_capacity(11);
    bytes.push(0x00);
    bytes.extend_from_slice(&to_forge_l1_txs_num.to_be_bytes());
    bytes.extend_from_slice(&u16::from(position).to_be_bytes());
    format!("0x{}", hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethabi::Token;
    use hez_rpc_client::json_types::HexBytes;
    use hez_types::{H160, H256};

    fn deposit_log(queue_index: u64, position: u8) -> EthLog {
        EthLog {
            address: H160::repeat_byte(0x11),
            topics: vec![
                l1_user_tx_event().signature(),
                H256::from_low_u64_be(queue_index),
                H256::from_low_u64_be(position as u64),
            ],
            data: HexBytes(ethabi::encode(&[Token::Bytes(vec![0xde, 0xad])])),
        }
    }

    fn foreign_log() -> EthLog {
        EthLog {
            address: H160::repeat_byte(0x22),
            topics: vec![H256::repeat_byte(0x99)],
            data: HexBytes(vec![]),
        }
    }

    #[test]
    fn decodes_event_among_noise() {
        let logs = vec![foreign_log(), deposit_log(5, 3), foreign_log()];
        assert_eq!(find_l1_user_tx_event(&logs), Some((5, 3)));
    }

    #[test]
    fn no_event_in_foreign_logs() {
        assert_eq!(find_l1_user_tx_event(&[foreign_log()]), None);
    }

    #[test]
    fn tx_id_layout() {
        assert_eq!(l1_user_tx_id(5, 3), "0x0000000000000000050003");
        assert_eq!(l1_user_tx_id(0, 0), "0x0000000000000000000000");
    }
}
