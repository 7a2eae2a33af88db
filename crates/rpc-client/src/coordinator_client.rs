use std::time::Duration;

use anyhow::Result;
use serde::de::DeserializeOwned;

use hez_types::{CoordinatorState, Exit, HistoryTransaction};

use crate::error::CoordinatorError;

/// REST client for the rollup coordinator API. Used purely as a finality and
/// indexing oracle; never as a source of L1 transaction status.
#[derive(Clone)]
pub struct CoordinatorClient {
    base_url: String,
    client: reqwest::Client,
}

impl CoordinatorClient {
    pub fn with_url(url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(CoordinatorClient {
            base_url: url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub async fn get_exit(
        &self,
        batch_num: u64,
        account_index: &str,
    ) -> Result<Exit, CoordinatorError> {
        let url = format!("{}/exits/{}/{}", self.base_url, batch_num, account_index);
        self.get_json(&url).await
    }

    pub async fn get_history_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<HistoryTransaction, CoordinatorError> {
        let url = format!("{}/transactions-history/{}", self.base_url, transaction_id);
        self.get_json(&url).await
    }

    pub async fn get_state(&self) -> Result<CoordinatorState, CoordinatorError> {
        let url = format!("{}/state", self.base_url);
        self.get_json(&url).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, CoordinatorError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(CoordinatorError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            return Err(CoordinatorError::UnexpectedStatus {
                url: url.to_string(),
                status,
            });
        }
        Ok(response.json().await?)
    }
}
