pub mod address;
pub mod coordinator;
pub mod entities;
pub mod task_status;

pub use address::{AddressError, L2Address};
pub use coordinator::{CoordinatorState, Exit, HistoryTransaction};
pub use entities::{
    PendingDelayedWithdraw, PendingDeposit, PendingWithdraw, TimerWithdraw, Token,
};
pub use task_status::TaskStatus;

pub use ethereum_types::{H160, H256, U256, U64};

/// EIP-155 chain identifier.
pub type ChainId = u64;

/// Rollup account index, e.g. "hez:ETH:256".
pub type AccountIndex = String;

/// Pending entities partitioned by chain id, then by wallet address.
pub type PartitionedMap<T> =
    std::collections::BTreeMap<ChainId, std::collections::BTreeMap<L2Address, Vec<T>>>;
