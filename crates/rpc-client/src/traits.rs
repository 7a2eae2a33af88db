use anyhow::Result;
use async_trait::async_trait;

use hez_types::{CoordinatorState, Exit, HistoryTransaction, H160, H256, U256};

use crate::error::CoordinatorError;
use crate::json_types::{EthBlock, EthBlockWithTransactions, EthReceipt, EthTransaction};
use crate::{CoordinatorClient, EthClient};

/// The narrow L1 surface the reconciliation engine consumes.
#[async_trait]
pub trait L1Client: Send + Sync {
    async fn get_transaction(&self, hash: H256) -> Result<Option<EthTransaction>>;

    async fn get_transaction_receipt(&self, hash: H256) -> Result<Option<EthReceipt>>;

    async fn get_block(&self, number: u64) -> Result<Option<EthBlock>>;

    async fn get_block_with_transactions(
        &self,
        number: u64,
    ) -> Result<Option<EthBlockWithTransactions>>;

    async fn get_balance(&self, address: H160) -> Result<U256>;
}

#[async_trait]
impl L1Client for EthClient {
    async fn get_transaction(&self, hash: H256) -> Result<Option<EthTransaction>> {
        EthClient::get_transaction(self, hash).await
    }

    async fn get_transaction_receipt(&self, hash: H256) -> Result<Option<EthReceipt>> {
        EthClient::get_transaction_receipt(self, hash).await
    }

    async fn get_block(&self, number: u64) -> Result<Option<EthBlock>> {
        EthClient::get_block(self, number).await
    }

    async fn get_block_with_transactions(
        &self,
        number: u64,
    ) -> Result<Option<EthBlockWithTransactions>> {
        EthClient::get_block_with_transactions(self, number).await
    }

    async fn get_balance(&self, address: H160) -> Result<U256> {
        EthClient::get_balance(self, address).await
    }
}

/// The exit-finality and indexing oracle surface.
#[async_trait]
pub trait CoordinatorApi: Send + Sync {
    async fn get_exit(
        &self,
        batch_num: u64,
        account_index: &str,
    ) -> Result<Exit, CoordinatorError>;

    async fn get_history_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<HistoryTransaction, CoordinatorError>;

    async fn get_state(&self) -> Result<CoordinatorState, CoordinatorError>;
}

#[async_trait]
impl CoordinatorApi for CoordinatorClient {
    async fn get_exit(
        &self,
        batch_num: u64,
        account_index: &str,
    ) -> Result<Exit, CoordinatorError> {
        CoordinatorClient::get_exit(self, batch_num, account_index).await
    }

    async fn get_history_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<HistoryTransaction, CoordinatorError> {
        CoordinatorClient::get_history_transaction(self, transaction_id).await
    }

    async fn get_state(&self) -> Result<CoordinatorState, CoordinatorError> {
        CoordinatorClient::get_state(self).await
    }
}
