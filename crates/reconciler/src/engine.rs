//! The reconciliation engine.
//!
//! Three independent passes, one per pending-entity kind, cross-reference
//! the persistent store against L1 transaction state and the coordinator's
//! exit-finality oracle. Each pass is idempotent and contains failures per
//! entity: one entity's failed query never aborts its siblings, and an
//! aggregate status is published only after every entity was attempted.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;
use futures::future::join_all;

use hez_config::{constants::CURRENT_STORAGE_VERSION, ReconcilerConfig};
use hez_rpc_client::{classify, CoordinatorApi, CoordinatorError, L1Client};
use hez_store::LocalStore;
use hez_types::{
    entities::withdraw_id, ChainId, Exit, H160, H256, L2Address, PartitionedMap,
    PendingDelayedWithdraw, PendingDeposit, PendingWithdraw, TaskStatus, TimerWithdraw,
};

use crate::deposit_event;
use crate::projector::StateProjector;

/// The wallet session a reconciler instance is scoped to. All store and
/// projector operations target this (chain id, address) partition.
#[derive(Clone, Debug)]
pub struct SessionContext {
    pub chain_id: ChainId,
    pub l2_address: L2Address,
    pub ethereum_address: H160,
}

impl SessionContext {
    pub fn new(chain_id: ChainId, l2_address: L2Address) -> Result<Self> {
        let ethereum_address = l2_address.to_ethereum_address()?;
        Ok(SessionContext {
            chain_id,
            l2_address,
            ethereum_address,
        })
    }
}

/// Aggregate result of one reconciliation pass. `mutated` counts state
/// changes applied (removals, corrections, recovered entries), `failed`
/// counts queries that errored and left their entity untouched.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PassOutcome {
    pub checked: usize,
    pub mutated: usize,
    pub failed: usize,
}

impl PassOutcome {
    pub fn all_failed(&self) -> bool {
        self.checked > 0 && self.failed >= self.checked
    }

    pub fn merge(self, other: PassOutcome) -> PassOutcome {
        PassOutcome {
            checked: self.checked + other.checked,
            mutated: self.mutated + other.mutated,
            failed: self.failed + other.failed,
        }
    }
}

pub struct Reconciler {
    store: LocalStore,
    l1: Arc<dyn L1Client>,
    coordinator: Arc<dyn CoordinatorApi>,
    projector: Arc<StateProjector>,
    session: SessionContext,
    config: ReconcilerConfig,
}

impl Reconciler {
    pub fn new(
        store: LocalStore,
        l1: Arc<dyn L1Client>,
        coordinator: Arc<dyn CoordinatorApi>,
        projector: Arc<StateProjector>,
        session: SessionContext,
        config: ReconcilerConfig,
    ) -> Self {
        Reconciler {
            store,
            l1,
            coordinator,
            projector,
            session,
            config,
        }
    }

    pub fn projector(&self) -> &Arc<StateProjector> {
        &self.projector
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    pub fn poll_interval(&self) -> std::time::Duration {
        self.config.poll_interval()
    }

    /// Session start: migrate stale storage and seed the projector from the
    /// system of record.
    pub fn init(&self) -> Result<()> {
        match self.store.get_storage_version() {
            Some(version) if version == CURRENT_STORAGE_VERSION => {}
            version => {
                log::info!(
                    "storage version {:?} != {}, clearing pending documents",
                    version,
                    CURRENT_STORAGE_VERSION
                );
                self.store.clear_pending_documents()?;
                self.store.set_storage_version(CURRENT_STORAGE_VERSION)?;
            }
        }
        self.projector.load_from_store(&self.store);
        Ok(())
    }

    // User-initiated mutations: persist first, then mirror.

    pub fn add_pending_deposit(&self, deposit: PendingDeposit) -> Result<()> {
        let (chain_id, address) = self.partition_key();
        self.store
            .add_pending_deposit(chain_id, address, deposit.clone())?;
        self.projector.add_pending_deposit(chain_id, address, deposit);
        Ok(())
    }

    pub fn remove_pending_deposit_by_hash(&self, hash: H256) -> Result<()> {
        let (chain_id, address) = self.partition_key();
        self.store
            .remove_pending_deposit_by_hash(chain_id, address, hash)?;
        self.projector
            .remove_pending_deposit_by_hash(chain_id, address, hash);
        Ok(())
    }

    pub fn remove_pending_deposit_by_transaction_id(&self, transaction_id: &str) -> Result<()> {
        let (chain_id, address) = self.partition_key();
        self.store
            .remove_pending_deposit_by_transaction_id(chain_id, address, transaction_id)?;
        self.projector
            .remove_pending_deposit_by_transaction_id(chain_id, address, transaction_id);
        Ok(())
    }

    pub fn add_pending_withdraw(&self, withdraw: PendingWithdraw) -> Result<()> {
        let (chain_id, address) = self.partition_key();
        self.store
            .add_pending_withdraw(chain_id, address, withdraw.clone())?;
        self.projector
            .add_pending_withdraw(chain_id, address, withdraw);
        Ok(())
    }

    pub fn remove_pending_withdraw_by_hash(&self, hash: H256) -> Result<()> {
        let (chain_id, address) = self.partition_key();
        self.store
            .remove_pending_withdraw_by_hash(chain_id, address, hash)?;
        self.projector
            .remove_pending_withdraw_by_hash(chain_id, address, hash);
        Ok(())
    }

    pub fn add_pending_delayed_withdraw(&self, withdraw: PendingDelayedWithdraw) -> Result<()> {
        let (chain_id, address) = self.partition_key();
        self.store
            .add_pending_delayed_withdraw(chain_id, address, withdraw.clone())?;
        self.projector
            .add_pending_delayed_withdraw(chain_id, address, withdraw);
        Ok(())
    }

    pub fn remove_pending_delayed_withdraw_by_hash(&self, hash: H256) -> Result<()> {
        let (chain_id, address) = self.partition_key();
        self.store
            .remove_pending_delayed_withdraw_by_hash(chain_id, address, hash)?;
        self.projector
            .remove_pending_delayed_withdraw_by_hash(chain_id, address, hash);
        Ok(())
    }

    pub fn remove_pending_delayed_withdraw_by_id(&self, id: &str) -> Result<()> {
        let (chain_id, address) = self.partition_key();
        self.store
            .remove_pending_delayed_withdraw_by_id(chain_id, address, id)?;
        self.projector
            .remove_pending_delayed_withdraw_by_id(chain_id, address, id);
        Ok(())
    }

    pub fn add_timer_withdraw(&self, timer: TimerWithdraw) -> Result<()> {
        let (chain_id, address) = self.partition_key();
        self.store
            .add_timer_withdraw(chain_id, address, timer.clone())?;
        self.projector.add_timer_withdraw(chain_id, address, timer);
        Ok(())
    }

    pub fn remove_timer_withdraw_by_id(&self, id: &str) -> Result<()> {
        let (chain_id, address) = self.partition_key();
        self.store
            .remove_timer_withdraw_by_id(chain_id, address, id)?;
        self.projector
            .remove_timer_withdraw_by_id(chain_id, address, id);
        Ok(())
    }

    // Reconciliation passes

    /// Deposit pass: cancel/expected-to-fail checks, receipt inspection,
    /// deposit-event decode, and removal once the coordinator reports the
    /// transaction forged into a batch.
    pub async fn check_pending_deposits(&self) -> PassOutcome {
        let previous = self.projector.snapshot().deposits_check.clone();
        self.projector.set_deposits_check(previous.into_reloading());

        let deposits = self.partition(self.store.get_pending_deposits());
        let mut outcome = PassOutcome {
            checked: deposits.len(),
            ..PassOutcome::default()
        };
        if deposits.is_empty() {
            self.projector
                .set_deposits_check(TaskStatus::Successful(outcome));
            return outcome;
        }

        let balance = match self.l1.get_balance(self.session.ethereum_address).await {
            Ok(balance) => balance,
            Err(err) => {
                log::warn!("balance lookup failed, deposit pass skipped: {:#}", err);
                outcome.failed = outcome.checked;
                self.projector
                    .set_deposits_check(TaskStatus::Failed(format!("{:#}", err)));
                return outcome;
            }
        };

        // Stage 1: provider lookup and terminal-failure checks.
        let now = now_ms();
        let grace = self.config.cancel_grace();
        let lookups = join_all(deposits.iter().map(|d| self.l1.get_transaction(d.hash))).await;
        let mut mined = Vec::new();
        for (deposit, lookup) in deposits.iter().zip(lookups) {
            match lookup {
                Ok(tx) => {
                    let canceled =
                        classify::is_tx_canceled(&tx, deposit.timestamp_ms, now, grace);
                    let underfunded = tx
                        .as_ref()
                        .map_or(false, |tx| classify::is_tx_expected_to_fail(tx, balance));
                    if canceled || underfunded {
                        self.record(
                            &mut outcome,
                            self.remove_pending_deposit_by_hash(deposit.hash),
                        );
                    } else if tx.as_ref().map_or(false, |tx| classify::is_tx_mined(tx)) {
                        mined.push(deposit);
                    }
                }
                Err(err) => {
                    log::warn!("deposit {:#x} lookup failed: {:#}", deposit.hash, err);
                    outcome.failed += 1;
                }
            }
        }

        // Stage 2: receipts. Reverted deposits are removed; successful ones
        // get the deposit event decoded and the rollup tx id attached.
        let receipts = join_all(
            mined
                .iter()
                .map(|d| self.l1.get_transaction_receipt(d.hash)),
        )
        .await;
        let mut history_lookups = Vec::new();
        for (deposit, lookup) in mined.iter().zip(receipts) {
            match lookup {
                Ok(Some(receipt)) => {
                    if classify::has_tx_been_reverted(&receipt) {
                        self.record(
                            &mut outcome,
                            self.remove_pending_deposit_by_hash(deposit.hash),
                        );
                        continue;
                    }
                    if receipt.logs.is_empty() {
                        continue;
                    }
                    let event = match deposit_event::find_l1_user_tx_event(&receipt.logs) {
                        Some(event) => event,
                        None => continue,
                    };
                    let transaction_id = match &deposit.transaction_id {
                        Some(id) => id.clone(),
                        None => {
                            let id = deposit_event::l1_user_tx_id(event.0, event.1);
                            match self.attach_deposit_transaction_id(deposit.hash, &id) {
                                Ok(()) => outcome.mutated += 1,
                                Err(err) => {
                                    log::warn!(
                                        "attach tx id to deposit {:#x} failed: {:#}",
                                        deposit.hash,
                                        err
                                    );
                                    outcome.failed += 1;
                                    continue;
                                }
                            }
                            id
                        }
                    };
                    history_lookups.push(transaction_id);
                }
                Ok(None) => {
                    log::debug!("receipt for deposit {:#x} not available yet", deposit.hash)
                }
                Err(err) => {
                    log::warn!("deposit {:#x} receipt failed: {:#}", deposit.hash, err);
                    outcome.failed += 1;
                }
            }
        }

        // Stage 3: coordinator history. A batch number means the deposit is
        // forged and the pending marker is redundant. Not-found is the
        // normal indexing window, not an error.
        let lookups = join_all(
            history_lookups
                .iter()
                .map(|id| self.coordinator.get_history_transaction(id)),
        )
        .await;
        for (transaction_id, lookup) in history_lookups.iter().zip(lookups) {
            match lookup {
                Ok(history) if history.batch_num.is_some() => {
                    self.record(
                        &mut outcome,
                        self.remove_pending_deposit_by_transaction_id(transaction_id),
                    );
                }
                Ok(_) => {}
                Err(CoordinatorError::NotFound(_)) => {}
                Err(err) => {
                    log::warn!("history lookup {} failed: {:#}", transaction_id, err);
                    outcome.failed += 1;
                }
            }
        }

        self.finish_pass(outcome, |status| self.projector.set_deposits_check(status));
        outcome
    }

    /// Withdraw pass: terminal-failure checks, then the exit-finality
    /// oracle. Either finality flag removes the entity; instant finality
    /// also cascades removal of the linked delayed record.
    pub async fn check_pending_withdrawals(&self) -> PassOutcome {
        let previous = self.projector.snapshot().withdrawals_check.clone();
        self.projector
            .set_withdrawals_check(previous.into_reloading());

        let withdraws = self.partition(self.store.get_pending_withdraws());
        let mut outcome = PassOutcome {
            checked: withdraws.len(),
            ..PassOutcome::default()
        };
        if withdraws.is_empty() {
            self.projector
                .set_withdrawals_check(TaskStatus::Successful(outcome));
            return outcome;
        }

        let balance = match self.l1.get_balance(self.session.ethereum_address).await {
            Ok(balance) => balance,
            Err(err) => {
                log::warn!("balance lookup failed, withdraw pass skipped: {:#}", err);
                outcome.failed = outcome.checked;
                self.projector
                    .set_withdrawals_check(TaskStatus::Failed(format!("{:#}", err)));
                return outcome;
            }
        };

        let now = now_ms();
        let grace = self.config.cancel_grace();
        let lookups = join_all(withdraws.iter().map(|w| self.l1.get_transaction(w.hash))).await;
        let mut removed = HashSet::new();
        let mut mined = Vec::new();
        for (withdraw, lookup) in withdraws.iter().zip(lookups) {
            match lookup {
                Ok(tx) => {
                    let canceled =
                        classify::is_tx_canceled(&tx, withdraw.timestamp_ms, now, grace);
                    let underfunded = tx
                        .as_ref()
                        .map_or(false, |tx| classify::is_tx_expected_to_fail(tx, balance));
                    if canceled || underfunded {
                        removed.insert(withdraw.hash);
                        self.record(
                            &mut outcome,
                            self.remove_pending_withdraw_by_hash(withdraw.hash),
                        );
                    } else if tx.as_ref().map_or(false, |tx| classify::is_tx_mined(tx)) {
                        mined.push(withdraw);
                    }
                }
                Err(err) => {
                    // Left pending; the exit oracle below still gets its say.
                    log::warn!("withdraw {:#x} lookup failed: {:#}", withdraw.hash, err);
                    outcome.failed += 1;
                }
            }
        }

        let receipts = join_all(
            mined
                .iter()
                .map(|w| self.l1.get_transaction_receipt(w.hash)),
        )
        .await;
        for (withdraw, lookup) in mined.iter().zip(receipts) {
            match lookup {
                Ok(Some(receipt)) if classify::has_tx_been_reverted(&receipt) => {
                    removed.insert(withdraw.hash);
                    self.record(
                        &mut outcome,
                        self.remove_pending_withdraw_by_hash(withdraw.hash),
                    );
                }
                Ok(_) => {}
                Err(err) => {
                    log::warn!("withdraw {:#x} receipt failed: {:#}", withdraw.hash, err);
                    outcome.failed += 1;
                }
            }
        }

        // Finality oracle for the survivors. The coordinator's verdict
        // stands regardless of what the chain lookups concluded.
        let survivors: Vec<_> = withdraws
            .iter()
            .filter(|w| !removed.contains(&w.hash))
            .collect();
        let exits = join_all(
            survivors
                .iter()
                .map(|w| self.coordinator.get_exit(w.batch_num, &w.account_index)),
        )
        .await;
        for (withdraw, lookup) in survivors.iter().zip(exits) {
            match lookup {
                Ok(exit)
                    if exit.instant_withdraw.is_some() || exit.delayed_withdraw.is_some() =>
                {
                    self.record(
                        &mut outcome,
                        self.remove_pending_withdraw_by_hash(withdraw.hash),
                    );
                    // The money has left the exit tree; the linked delayed
                    // record sharing this id is obsolete either way.
                    if let Err(err) = self.remove_pending_delayed_withdraw_by_id(&withdraw.id) {
                        log::warn!(
                            "cascade remove delayed withdraw {} failed: {:#}",
                            withdraw.id,
                            err
                        );
                    }
                }
                Ok(_) => {}
                Err(CoordinatorError::NotFound(_)) => {}
                Err(err) => {
                    log::warn!(
                        "exit lookup for withdraw {:#x} failed: {:#}",
                        withdraw.hash,
                        err
                    );
                    outcome.failed += 1;
                }
            }
        }

        self.finish_pass(outcome, |status| {
            self.projector.set_withdrawals_check(status)
        });
        outcome
    }

    /// Delayed-withdraw pass. Before removal checks, stored timestamps are
    /// corrected to the mining block's timestamp; the optimistic
    /// submission-time value can be wrong relative to actual inclusion.
    pub async fn check_pending_delayed_withdrawals(&self) -> PassOutcome {
        let previous = self.projector.snapshot().delayed_withdrawals_check.clone();
        self.projector
            .set_delayed_withdrawals_check(previous.into_reloading());

        let withdraws = self.partition(self.store.get_pending_delayed_withdraws());
        let mut outcome = PassOutcome {
            checked: withdraws.len(),
            ..PassOutcome::default()
        };
        if withdraws.is_empty() {
            self.projector
                .set_delayed_withdrawals_check(TaskStatus::Successful(outcome));
            return outcome;
        }

        let balance = match self.l1.get_balance(self.session.ethereum_address).await {
            Ok(balance) => balance,
            Err(err) => {
                log::warn!(
                    "balance lookup failed, delayed-withdraw pass skipped: {:#}",
                    err
                );
                outcome.failed = outcome.checked;
                self.projector
                    .set_delayed_withdrawals_check(TaskStatus::Failed(format!("{:#}", err)));
                return outcome;
            }
        };

        let now = now_ms();
        let grace = self.config.cancel_grace();
        let lookups = join_all(withdraws.iter().map(|w| self.l1.get_transaction(w.hash))).await;
        let mut removed = HashSet::new();
        let mut mined = Vec::new();
        for (withdraw, lookup) in withdraws.iter().zip(lookups) {
            match lookup {
                Ok(tx) => {
                    let canceled =
                        classify::is_tx_canceled(&tx, withdraw.timestamp_ms, now, grace);
                    let underfunded = tx
                        .as_ref()
                        .map_or(false, |tx| classify::is_tx_expected_to_fail(tx, balance));
                    if canceled || underfunded {
                        removed.insert(withdraw.hash);
                        self.record(
                            &mut outcome,
                            self.remove_pending_delayed_withdraw_by_hash(withdraw.hash),
                        );
                    } else if let Some(block_number) =
                        tx.as_ref().and_then(|tx| tx.block_number)
                    {
                        mined.push((withdraw, block_number.as_u64()));
                    }
                }
                Err(err) => {
                    log::warn!(
                        "delayed withdraw {:#x} lookup failed: {:#}",
                        withdraw.hash,
                        err
                    );
                    outcome.failed += 1;
                }
            }
        }

        // Timestamp correction for mined entities.
        let blocks = join_all(
            mined
                .iter()
                .map(|(_, block_number)| self.l1.get_block(*block_number)),
        )
        .await;
        for ((withdraw, block_number), lookup) in mined.iter().zip(blocks) {
            match lookup {
                Ok(Some(block)) => {
                    let block_timestamp_ms = block.timestamp.as_u64().saturating_mul(1000);
                    if withdraw.timestamp_ms != block_timestamp_ms {
                        match self
                            .correct_delayed_withdraw_timestamp(withdraw.hash, block_timestamp_ms)
                        {
                            Ok(()) => outcome.mutated += 1,
                            Err(err) => {
                                log::warn!(
                                    "timestamp correction for {:#x} failed: {:#}",
                                    withdraw.hash,
                                    err
                                );
                                outcome.failed += 1;
                            }
                        }
                    }
                }
                Ok(None) => log::warn!("block {} not found", block_number),
                Err(err) => {
                    log::warn!("block {} lookup failed: {:#}", block_number, err);
                    outcome.failed += 1;
                }
            }
        }

        let receipts = join_all(
            mined
                .iter()
                .map(|(w, _)| self.l1.get_transaction_receipt(w.hash)),
        )
        .await;
        for ((withdraw, _), lookup) in mined.iter().zip(receipts) {
            match lookup {
                Ok(Some(receipt)) if classify::has_tx_been_reverted(&receipt) => {
                    removed.insert(withdraw.hash);
                    self.record(
                        &mut outcome,
                        self.remove_pending_delayed_withdraw_by_hash(withdraw.hash),
                    );
                }
                Ok(_) => {}
                Err(err) => {
                    log::warn!(
                        "delayed withdraw {:#x} receipt failed: {:#}",
                        withdraw.hash,
                        err
                    );
                    outcome.failed += 1;
                }
            }
        }

        // Delayed finality only; instant finality is the plain withdraw
        // pass's business.
        let survivors: Vec<_> = withdraws
            .iter()
            .filter(|w| !removed.contains(&w.hash))
            .collect();
        let exits = join_all(
            survivors
                .iter()
                .map(|w| self.coordinator.get_exit(w.batch_num, &w.account_index)),
        )
        .await;
        for (withdraw, lookup) in survivors.iter().zip(exits) {
            match lookup {
                Ok(exit) if exit.delayed_withdraw.is_some() => {
                    self.record(
                        &mut outcome,
                        self.remove_pending_delayed_withdraw_by_id(&withdraw.id),
                    );
                }
                Ok(_) => {}
                Err(CoordinatorError::NotFound(_)) => {}
                Err(err) => {
                    log::warn!(
                        "exit lookup for delayed withdraw {} failed: {:#}",
                        withdraw.id,
                        err
                    );
                    outcome.failed += 1;
                }
            }
        }

        self.finish_pass(outcome, |status| {
            self.projector.set_delayed_withdrawals_check(status)
        });
        outcome
    }

    /// Recovery sweep: coordinator exits carrying a "delayed withdraw
    /// requested" block reference but no matching local record are healed by
    /// scanning that block for a transaction from the user's address. Local
    /// storage is a cache; the coordinator plus chain are the truth.
    pub async fn recover_pending_delayed_withdrawals(&self, exits: &[Exit]) -> PassOutcome {
        let local = self.partition(self.store.get_pending_delayed_withdraws());
        let known_batches: HashSet<u64> = local.iter().map(|w| w.batch_num).collect();

        let candidates: Vec<(&Exit, u64)> = exits
            .iter()
            .filter_map(|exit| {
                // A finalized exit must not be resurrected.
                if exit.instant_withdraw.is_some() || exit.delayed_withdraw.is_some() {
                    return None;
                }
                if known_batches.contains(&exit.batch_num) {
                    return None;
                }
                exit.delayed_withdraw_request.map(|block| (exit, block))
            })
            .collect();

        let mut outcome = PassOutcome {
            checked: candidates.len(),
            ..PassOutcome::default()
        };

        let blocks = join_all(
            candidates
                .iter()
                .map(|(_, block)| self.l1.get_block_with_transactions(*block)),
        )
        .await;
        for ((exit, block_number), lookup) in candidates.iter().zip(blocks) {
            match lookup {
                Ok(Some(block)) => {
                    let tx = block
                        .transactions
                        .iter()
                        .find(|tx| tx.from == self.session.ethereum_address);
                    let tx = match tx {
                        Some(tx) => tx,
                        None => continue,
                    };
                    let withdraw = PendingDelayedWithdraw {
                        hash: tx.hash,
                        id: withdraw_id(&exit.account_index, exit.batch_num),
                        batch_num: exit.batch_num,
                        account_index: exit.account_index.clone(),
                        l2_address: self.session.l2_address.clone(),
                        chain_id: self.session.chain_id,
                        instant: false,
                        timestamp_ms: block.timestamp.as_u64().saturating_mul(1000),
                    };
                    self.record(&mut outcome, self.add_pending_delayed_withdraw(withdraw));
                }
                Ok(None) => log::warn!("exit references missing block {}", block_number),
                Err(err) => {
                    log::warn!("block {} lookup failed: {:#}", block_number, err);
                    outcome.failed += 1;
                }
            }
        }

        outcome
    }

    /// One scheduled tick: coordinator health first, then the three entity
    /// passes. The passes operate on disjoint documents and may interleave.
    pub async fn run_scheduled_pass(&self) -> PassOutcome {
        match self.coordinator.get_state().await {
            Ok(state) => {
                self.projector
                    .set_coordinator_state(TaskStatus::Successful(state));
            }
            Err(err) => {
                log::warn!("coordinator unreachable, passes skipped: {:#}", err);
                self.projector
                    .set_coordinator_state(TaskStatus::Failed(format!("{:#}", err)));
                return PassOutcome {
                    checked: 1,
                    mutated: 0,
                    failed: 1,
                };
            }
        }

        let (deposits, withdrawals, delayed) = tokio::join!(
            self.check_pending_deposits(),
            self.check_pending_withdrawals(),
            self.check_pending_delayed_withdrawals(),
        );
        deposits.merge(withdrawals).merge(delayed)
    }

    // Helpers

    fn partition_key(&self) -> (ChainId, &L2Address) {
        (self.session.chain_id, &self.session.l2_address)
    }

    fn partition<T: Clone>(&self, map: PartitionedMap<T>) -> Vec<T> {
        map.get(&self.session.chain_id)
            .and_then(|chain| chain.get(&self.session.l2_address))
            .cloned()
            .unwrap_or_default()
    }

    fn attach_deposit_transaction_id(&self, hash: H256, transaction_id: &str) -> Result<()> {
        let (chain_id, address) = self.partition_key();
        let id = transaction_id.to_string();
        self.store
            .update_pending_deposit_by_hash(chain_id, address, hash, |deposit| {
                deposit.transaction_id = Some(id.clone())
            })?;
        let id = transaction_id.to_string();
        self.projector
            .update_pending_deposit_by_hash(chain_id, address, hash, move |deposit| {
                deposit.transaction_id = Some(id.clone())
            });
        Ok(())
    }

    fn correct_delayed_withdraw_timestamp(&self, hash: H256, timestamp_ms: u64) -> Result<()> {
        let (chain_id, address) = self.partition_key();
        self.store
            .update_pending_delayed_withdraw_by_hash(chain_id, address, hash, |withdraw| {
                withdraw.timestamp_ms = timestamp_ms
            })?;
        self.projector
            .update_pending_delayed_withdraw_by_hash(chain_id, address, hash, move |withdraw| {
                withdraw.timestamp_ms = timestamp_ms
            });
        Ok(())
    }

    fn record(&self, outcome: &mut PassOutcome, result: Result<()>) {
        match result {
            Ok(()) => outcome.mutated += 1,
            Err(err) => {
                log::warn!("pending-entity mutation failed: {:#}", err);
                outcome.failed += 1;
            }
        }
    }

    fn finish_pass(&self, outcome: PassOutcome, set_status: impl Fn(TaskStatus<PassOutcome>)) {
        if outcome.all_failed() {
            set_status(TaskStatus::Failed(format!(
                "all {} entities failed reconciliation",
                outcome.checked
            )));
        } else {
            set_status(TaskStatus::Successful(outcome));
        }
    }
}

pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
