use serde::{Deserialize, Serialize};

use crate::AccountIndex;

/// An exit record as reported by the coordinator API.
///
/// `instant_withdraw` and `delayed_withdraw` hold the L1 block number of the
/// finalizing transaction once the money has left the exit tree; they are the
/// finality oracle for pending withdraws. `delayed_withdraw_request` holds
/// the L1 block of a "delayed withdraw requested" transaction, used by the
/// recovery sweep.
///
/// Lenient on unknown fields: the API returns more than we consume.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exit {
    pub batch_num: u64,
    pub account_index: AccountIndex,
    pub instant_withdraw: Option<u64>,
    pub delayed_withdraw: Option<u64>,
    pub delayed_withdraw_request: Option<u64>,
}

/// Transaction-history record; `batch_num` is set once the transaction has
/// been forged into a rollup batch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryTransaction {
    pub id: String,
    pub batch_num: Option<u64>,
}

/// Subset of the coordinator's network state we poll for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoordinatorState {
    pub last_batch_num: Option<u64>,
    pub withdrawal_delay: Option<u64>,
}
