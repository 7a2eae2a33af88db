use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

use hez_types::{
    ChainId, H256, L2Address, PartitionedMap, PendingDelayedWithdraw, PendingDeposit,
    PendingWithdraw, TimerWithdraw,
};

const PENDING_DEPOSITS_KEY: &str = "pending_deposits";
const PENDING_WITHDRAWS_KEY: &str = "pending_withdraws";
const PENDING_DELAYED_WITHDRAWS_KEY: &str = "pending_delayed_withdraws";
const TIMER_WITHDRAWS_KEY: &str = "timer_withdraws";
const STORAGE_VERSION_KEY: &str = "storage_version";

/// Process-local, single-writer persistence medium for pending operations.
///
/// Every write is a whole-document read-modify-write. Reads that fail schema
/// validation degrade to an empty mapping and log the failure; they never
/// fail the caller.
#[derive(Clone, Debug)]
pub struct LocalStore {
    dir: PathBuf,
}

impl LocalStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("create store directory {}", dir.display()))?;
        Ok(LocalStore { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    // Pending deposits

    pub fn get_pending_deposits(&self) -> PartitionedMap<PendingDeposit> {
        self.read_document(PENDING_DEPOSITS_KEY)
    }

    pub fn add_pending_deposit(
        &self,
        chain_id: ChainId,
        address: &L2Address,
        deposit: PendingDeposit,
    ) -> Result<()> {
        self.mutate(PENDING_DEPOSITS_KEY, chain_id, address, |deposits| {
            deposits.push(deposit)
        })
    }

    pub fn update_pending_deposit_by_hash(
        &self,
        chain_id: ChainId,
        address: &L2Address,
        hash: H256,
        f: impl FnMut(&mut PendingDeposit),
    ) -> Result<()> {
        let mut f = f;
        self.mutate(
            PENDING_DEPOSITS_KEY,
            chain_id,
            address,
            |deposits: &mut Vec<PendingDeposit>| {
                deposits
                    .iter_mut()
                    .filter(|deposit| deposit.hash == hash)
                    .for_each(|deposit| f(deposit))
            },
        )
    }

    pub fn remove_pending_deposit_by_hash(
        &self,
        chain_id: ChainId,
        address: &L2Address,
        hash: H256,
    ) -> Result<()> {
        self.mutate(
            PENDING_DEPOSITS_KEY,
            chain_id,
            address,
            |deposits: &mut Vec<PendingDeposit>| deposits.retain(|deposit| deposit.hash != hash),
        )
    }

    pub fn remove_pending_deposit_by_transaction_id(
        &self,
        chain_id: ChainId,
        address: &L2Address,
        transaction_id: &str,
    ) -> Result<()> {
        self.mutate(
            PENDING_DEPOSITS_KEY,
            chain_id,
            address,
            |deposits: &mut Vec<PendingDeposit>| {
                deposits.retain(|deposit| {
                    deposit.transaction_id.as_deref() != Some(transaction_id)
                })
            },
        )
    }

    // Pending withdraws

    pub fn get_pending_withdraws(&self) -> PartitionedMap<PendingWithdraw> {
        self.read_document(PENDING_WITHDRAWS_KEY)
    }

    pub fn add_pending_withdraw(
        &self,
        chain_id: ChainId,
        address: &L2Address,
        withdraw: PendingWithdraw,
    ) -> Result<()> {
        self.mutate(PENDING_WITHDRAWS_KEY, chain_id, address, |withdraws| {
            withdraws.push(withdraw)
        })
    }

    pub fn remove_pending_withdraw_by_hash(
        &self,
        chain_id: ChainId,
        address: &L2Address,
        hash: H256,
    ) -> Result<()> {
        self.mutate(
            PENDING_WITHDRAWS_KEY,
            chain_id,
            address,
            |withdraws: &mut Vec<PendingWithdraw>| {
                withdraws.retain(|withdraw| withdraw.hash != hash)
            },
        )
    }

    // Pending delayed withdraws

    pub fn get_pending_delayed_withdraws(&self) -> PartitionedMap<PendingDelayedWithdraw> {
        self.read_document(PENDING_DELAYED_WITHDRAWS_KEY)
    }

    pub fn add_pending_delayed_withdraw(
        &self,
        chain_id: ChainId,
        address: &L2Address,
        withdraw: PendingDelayedWithdraw,
    ) -> Result<()> {
        self.mutate(
            PENDING_DELAYED_WITHDRAWS_KEY,
            chain_id,
            address,
            |withdraws| withdraws.push(withdraw),
        )
    }

    pub fn update_pending_delayed_withdraw_by_hash(
        &self,
        chain_id: ChainId,
        address: &L2Address,
        hash: H256,
        f: impl FnMut(&mut PendingDelayedWithdraw),
    ) -> Result<()> {
        let mut f = f;
        self.mutate(
            PENDING_DELAYED_WITHDRAWS_KEY,
            chain_id,
            address,
            |withdraws: &mut Vec<PendingDelayedWithdraw>| {
                withdraws
                    .iter_mut()
                    .filter(|withdraw| withdraw.hash == hash)
                    .for_each(|withdraw| f(withdraw))
            },
        )
    }

    pub fn remove_pending_delayed_withdraw_by_hash(
        &self,
        chain_id: ChainId,
        address: &L2Address,
        hash: H256,
    ) -> Result<()> {
        self.mutate(
            PENDING_DELAYED_WITHDRAWS_KEY,
            chain_id,
            address,
            |withdraws: &mut Vec<PendingDelayedWithdraw>| {
                withdraws.retain(|withdraw| withdraw.hash != hash)
            },
        )
    }

    pub fn remove_pending_delayed_withdraw_by_id(
        &self,
        chain_id: ChainId,
        address: &L2Address,
        id: &str,
    ) -> Result<()> {
        self.mutate(
            PENDING_DELAYED_WITHDRAWS_KEY,
            chain_id,
            address,
            |withdraws: &mut Vec<PendingDelayedWithdraw>| {
                withdraws.retain(|withdraw| withdraw.id != id)
            },
        )
    }

    // Timer withdraws

    pub fn get_timer_withdraws(&self) -> PartitionedMap<TimerWithdraw> {
        self.read_document(TIMER_WITHDRAWS_KEY)
    }

    pub fn add_timer_withdraw(
        &self,
        chain_id: ChainId,
        address: &L2Address,
        timer: TimerWithdraw,
    ) -> Result<()> {
        self.mutate(TIMER_WITHDRAWS_KEY, chain_id, address, |timers| {
            timers.push(timer)
        })
    }

    pub fn remove_timer_withdraw_by_id(
        &self,
        chain_id: ChainId,
        address: &L2Address,
        id: &str,
    ) -> Result<()> {
        self.mutate(
            TIMER_WITHDRAWS_KEY,
            chain_id,
            address,
            |timers: &mut Vec<TimerWithdraw>| timers.retain(|timer| timer.id != id),
        )
    }

    // Storage version

    pub fn get_storage_version(&self) -> Option<u32> {
        let path = self.document_path(STORAGE_VERSION_KEY);
        let content = fs::read_to_string(path).ok()?;
        match serde_json::from_str(&content) {
            Ok(version) => Some(version),
            Err(err) => {
                log::error!("an error occurred parsing {}: {}", STORAGE_VERSION_KEY, err);
                None
            }
        }
    }

    pub fn set_storage_version(&self, version: u32) -> Result<()> {
        self.write_document(STORAGE_VERSION_KEY, &version)
    }

    /// Drops every pending-entity document. Used on storage-version bumps;
    /// the recovery sweep re-populates what the coordinator still knows.
    pub fn clear_pending_documents(&self) -> Result<()> {
        for key in [
            PENDING_DEPOSITS_KEY,
            PENDING_WITHDRAWS_KEY,
            PENDING_DELAYED_WITHDRAWS_KEY,
            TIMER_WITHDRAWS_KEY,
        ] {
            let path = self.document_path(key);
            if path.exists() {
                fs::remove_file(&path)
                    .with_context(|| format!("remove document {}", path.display()))?;
            }
        }
        Ok(())
    }

    // Document plumbing

    fn document_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    /// Strict read: a document whose shape does not match the expected
    /// schema is treated as invalid as a whole and replaced by an empty
    /// mapping. The failure is logged, never propagated.
    fn read_document<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        let path = self.document_path(key);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(_) => return T::default(),
        };
        match serde_json::from_str(&content) {
            Ok(document) => document,
            Err(err) => {
                log::error!("an error occurred parsing {}: {}", key, err);
                T::default()
            }
        }
    }

    fn write_document<T: Serialize>(&self, key: &str, document: &T) -> Result<()> {
        let path = self.document_path(key);
        let content = serde_json::to_string(document).context("serialize document")?;
        fs::write(&path, content).with_context(|| format!("write document {}", path.display()))
    }

    /// Read-modify-write of one address partition. The closure sees the
    /// partition's ordered sequence; the whole document is replaced on
    /// return. Single writer, so no cross-call locking discipline.
    fn mutate<T, F>(&self, key: &str, chain_id: ChainId, address: &L2Address, f: F) -> Result<()>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut Vec<T>),
    {
        let mut document: PartitionedMap<T> = self.read_document(key);
        let entries = document
            .entry(chain_id)
            .or_default()
            .entry(address.clone())
            .or_default();
        f(entries);
        self.write_document(key, &document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hez_types::{Token, H160, U256};

    fn test_address() -> L2Address {
        L2Address::parse("hez:0xaa942cfcd25ad4d90a62358b0dd84f33b398262a").unwrap()
    }

    fn other_address() -> L2Address {
        L2Address::parse("hez:0x0000000000000000000000000000000000000001").unwrap()
    }

    fn test_deposit(hash: H256) -> PendingDeposit {
        PendingDeposit {
            hash,
            transaction_id: None,
            l2_address: test_address(),
            chain_id: 1,
            token: Token {
                id: 0,
                ethereum_address: H160::zero(),
                name: "Ether".into(),
                symbol: "ETH".into(),
                decimals: 18,
            },
            amount: U256::from(1_000u64),
            timestamp_ms: 1_650_000_000_000,
        }
    }

    #[test]
    fn add_get_remove_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path()).unwrap();
        let address = test_address();
        let hash = H256::repeat_byte(0xaa);

        store.add_pending_deposit(1, &address, test_deposit(hash)).unwrap();
        let deposits = store.get_pending_deposits();
        assert_eq!(deposits[&1][&address].len(), 1);

        store.remove_pending_deposit_by_hash(1, &address, hash).unwrap();
        let deposits = store.get_pending_deposits();
        assert!(deposits[&1][&address].is_empty());
    }

    #[test]
    fn partition_isolation() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path()).unwrap();
        let a1 = test_address();
        let a2 = other_address();

        store
            .add_pending_deposit(1, &a1, test_deposit(H256::repeat_byte(0x01)))
            .unwrap();
        store
            .add_pending_deposit(5, &a2, test_deposit(H256::repeat_byte(0x02)))
            .unwrap();

        store
            .remove_pending_deposit_by_hash(1, &a1, H256::repeat_byte(0x01))
            .unwrap();

        let deposits = store.get_pending_deposits();
        assert!(deposits[&1][&a1].is_empty());
        assert_eq!(deposits[&5][&a2].len(), 1);
    }

    #[test]
    fn corrupt_document_degrades_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path()).unwrap();

        fs::write(
            dir.path().join("pending_delayed_withdraws.json"),
            r#"{"1337": {"0xUser": "not-an-array"}}"#,
        )
        .unwrap();

        let withdraws = store.get_pending_delayed_withdraws();
        assert!(withdraws.is_empty());
    }

    #[test]
    fn unknown_entity_field_invalidates_whole_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path()).unwrap();

        fs::write(
            dir.path().join("timer_withdraws.json"),
            format!(
                r#"{{"1": {{"{}": [{{"id": "x", "l2Address": "{}", "chainId": 1, "expiresAtMs": 1, "bogus": true}}]}}}}"#,
                test_address(),
                test_address(),
            ),
        )
        .unwrap();

        assert!(store.get_timer_withdraws().is_empty());
    }

    #[test]
    fn update_by_hash_alters_only_match() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path()).unwrap();
        let address = test_address();
        let target = H256::repeat_byte(0x01);
        let bystander = H256::repeat_byte(0x02);

        store.add_pending_deposit(1, &address, test_deposit(target)).unwrap();
        store.add_pending_deposit(1, &address, test_deposit(bystander)).unwrap();

        store
            .update_pending_deposit_by_hash(1, &address, target, |deposit| {
                deposit.transaction_id = Some("0x00aabb".into())
            })
            .unwrap();

        let deposits = store.get_pending_deposits();
        let entries = &deposits[&1][&address];
        let updated = entries.iter().find(|d| d.hash == target).unwrap();
        let untouched = entries.iter().find(|d| d.hash == bystander).unwrap();
        assert_eq!(updated.transaction_id.as_deref(), Some("0x00aabb"));
        assert!(untouched.transaction_id.is_none());
    }

    #[test]
    fn storage_version_roundtrip_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path()).unwrap();
        assert_eq!(store.get_storage_version(), None);

        store.set_storage_version(2).unwrap();
        assert_eq!(store.get_storage_version(), Some(2));

        store
            .add_pending_deposit(1, &test_address(), test_deposit(H256::repeat_byte(0x01)))
            .unwrap();
        store.clear_pending_documents().unwrap();
        assert!(store.get_pending_deposits().is_empty());
        // Version survives a pending-document clear.
        assert_eq!(store.get_storage_version(), Some(2));
    }
}
