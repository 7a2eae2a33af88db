//! UI-facing mirror of the persistent store.
//!
//! Every mutation the engine applies to the persistent store is repeated
//! here with the same add/update/remove vocabulary; the projector never
//! carries a mutation that is not also persisted. Reads are lock-free
//! snapshots.

use std::sync::Arc;

use arc_swap::ArcSwap;

use hez_store::LocalStore;
use hez_types::{
    ChainId, CoordinatorState, H256, L2Address, PartitionedMap, PendingDelayedWithdraw,
    PendingDeposit, PendingWithdraw, TaskStatus, TimerWithdraw,
};

use crate::engine::PassOutcome;

#[derive(Clone, Debug, Default)]
pub struct ProjectedState {
    pub pending_deposits: PartitionedMap<PendingDeposit>,
    pub pending_withdraws: PartitionedMap<PendingWithdraw>,
    pub pending_delayed_withdraws: PartitionedMap<PendingDelayedWithdraw>,
    pub timer_withdraws: PartitionedMap<TimerWithdraw>,
    pub deposits_check: TaskStatus<PassOutcome>,
    pub withdrawals_check: TaskStatus<PassOutcome>,
    pub delayed_withdrawals_check: TaskStatus<PassOutcome>,
    pub coordinator_state: TaskStatus<CoordinatorState>,
}

pub struct StateProjector {
    state: ArcSwap<ProjectedState>,
}

impl Default for StateProjector {
    fn default() -> Self {
        Self::new()
    }
}

impl StateProjector {
    pub fn new() -> Self {
        StateProjector {
            state: ArcSwap::from_pointee(ProjectedState::default()),
        }
    }

    pub fn snapshot(&self) -> Arc<ProjectedState> {
        self.state.load_full()
    }

    /// Re-seed the in-memory mirror from the system of record, e.g. on
    /// session start after a reload.
    pub fn load_from_store(&self, store: &LocalStore) {
        let pending_deposits = store.get_pending_deposits();
        let pending_withdraws = store.get_pending_withdraws();
        let pending_delayed_withdraws = store.get_pending_delayed_withdraws();
        let timer_withdraws = store.get_timer_withdraws();
        self.update(move |state| {
            state.pending_deposits = pending_deposits.clone();
            state.pending_withdraws = pending_withdraws.clone();
            state.pending_delayed_withdraws = pending_delayed_withdraws.clone();
            state.timer_withdraws = timer_withdraws.clone();
        });
    }

    fn update(&self, f: impl Fn(&mut ProjectedState)) {
        self.state.rcu(|current| {
            let mut next = (**current).clone();
            f(&mut next);
            next
        });
    }

    // Pending deposits

    pub fn add_pending_deposit(
        &self,
        chain_id: ChainId,
        address: &L2Address,
        deposit: PendingDeposit,
    ) {
        let address = address.clone();
        self.update(move |state| {
            push(&mut state.pending_deposits, chain_id, &address, deposit.clone())
        });
    }

    pub fn update_pending_deposit_by_hash(
        &self,
        chain_id: ChainId,
        address: &L2Address,
        hash: H256,
        f: impl Fn(&mut PendingDeposit),
    ) {
        let address = address.clone();
        self.update(move |state| {
            for_each_match(
                &mut state.pending_deposits,
                chain_id,
                &address,
                |deposit| deposit.hash == hash,
                &f,
            )
        });
    }

    pub fn remove_pending_deposit_by_hash(
        &self,
        chain_id: ChainId,
        address: &L2Address,
        hash: H256,
    ) {
        let address = address.clone();
        self.update(move |state| {
            retain(&mut state.pending_deposits, chain_id, &address, |deposit| {
                deposit.hash != hash
            })
        });
    }

    pub fn remove_pending_deposit_by_transaction_id(
        &self,
        chain_id: ChainId,
        address: &L2Address,
        transaction_id: &str,
    ) {
        let address = address.clone();
        let transaction_id = transaction_id.to_string();
        self.update(move |state| {
            retain(&mut state.pending_deposits, chain_id, &address, |deposit| {
                deposit.transaction_id.as_deref() != Some(transaction_id.as_str())
            })
        });
    }

    // Pending withdraws

    pub fn add_pending_withdraw(
        &self,
        chain_id: ChainId,
        address: &L2Address,
        withdraw: PendingWithdraw,
    ) {
        let address = address.clone();
        self.update(move |state| {
            push(&mut state.pending_withdraws, chain_id, &address, withdraw.clone())
        });
    }

    pub fn remove_pending_withdraw_by_hash(
        &self,
        chain_id: ChainId,
        address: &L2Address,
        hash: H256,
    ) {
        let address = address.clone();
        self.update(move |state| {
            retain(&mut state.pending_withdraws, chain_id, &address, |withdraw| {
                withdraw.hash != hash
            })
        });
    }

    // Pending delayed withdraws

    pub fn add_pending_delayed_withdraw(
        &self,
        chain_id: ChainId,
        address: &L2Address,
        withdraw: PendingDelayedWithdraw,
    ) {
        let address = address.clone();
        self.update(move |state| {
            push(
                &mut state.pending_delayed_withdraws,
                chain_id,
                &address,
                withdraw.clone(),
            )
        });
    }

    pub fn update_pending_delayed_withdraw_by_hash(
        &self,
        chain_id: ChainId,
        address: &L2Address,
        hash: H256,
        f: impl Fn(&mut PendingDelayedWithdraw),
    ) {
        let address = address.clone();
        self.update(move |state| {
            for_each_match(
                &mut state.pending_delayed_withdraws,
                chain_id,
                &address,
                |withdraw| withdraw.hash == hash,
                &f,
            )
        });
    }

    pub fn remove_pending_delayed_withdraw_by_hash(
        &self,
        chain_id: ChainId,
        address: &L2Address,
        hash: H256,
    ) {
        let address = address.clone();
        self.update(move |state| {
            retain(
                &mut state.pending_delayed_withdraws,
                chain_id,
                &address,
                |withdraw| withdraw.hash != hash,
            )
        });
    }

    pub fn remove_pending_delayed_withdraw_by_id(
        &self,
        chain_id: ChainId,
        address: &L2Address,
        id: &str,
    ) {
        let address = address.clone();
        let id = id.to_string();
        self.update(move |state| {
            retain(
                &mut state.pending_delayed_withdraws,
                chain_id,
                &address,
                |withdraw| withdraw.id != id,
            )
        });
    }

    // Timer withdraws

    pub fn add_timer_withdraw(&self, chain_id: ChainId, address: &L2Address, timer: TimerWithdraw) {
        let address = address.clone();
        self.update(move |state| {
            push(&mut state.timer_withdraws, chain_id, &address, timer.clone())
        });
    }

    pub fn remove_timer_withdraw_by_id(&self, chain_id: ChainId, address: &L2Address, id: &str) {
        let address = address.clone();
        let id = id.to_string();
        self.update(move |state| {
            retain(&mut state.timer_withdraws, chain_id, &address, |timer| {
                timer.id != id
            })
        });
    }

    // Pass statuses

    pub fn set_deposits_check(&self, status: TaskStatus<PassOutcome>) {
        self.update(move |state| state.deposits_check = status.clone());
    }

    pub fn set_withdrawals_check(&self, status: TaskStatus<PassOutcome>) {
        self.update(move |state| state.withdrawals_check = status.clone());
    }

    pub fn set_delayed_withdrawals_check(&self, status: TaskStatus<PassOutcome>) {
        self.update(move |state| state.delayed_withdrawals_check = status.clone());
    }

    pub fn set_coordinator_state(&self, status: TaskStatus<CoordinatorState>) {
        self.update(move |state| state.coordinator_state = status.clone());
    }
}

fn push<T: Clone>(map: &mut PartitionedMap<T>, chain_id: ChainId, address: &L2Address, entity: T) {
    map.entry(chain_id)
        .or_default()
        .entry(address.clone())
        .or_default()
        .push(entity);
}

fn retain<T>(
    map: &mut PartitionedMap<T>,
    chain_id: ChainId,
    address: &L2Address,
    keep: impl Fn(&T) -> bool,
) {
    if let Some(entries) = map.get_mut(&chain_id).and_then(|m| m.get_mut(address)) {
        entries.retain(keep);
    }
}

fn for_each_match<T>(
    map: &mut PartitionedMap<T>,
    chain_id: ChainId,
    address: &L2Address,
    matches: impl Fn(&T) -> bool,
    f: &impl Fn(&mut T),
) {
    if let Some(entries) = map.get_mut(&chain_id).and_then(|m| m.get_mut(address)) {
        entries.iter_mut().filter(|e| matches(&**e)).for_each(f);
    }
}
