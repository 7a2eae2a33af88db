use std::time::Duration;

use anyhow::Result;
use async_jsonrpc_client::{HttpClient, Output, Params as ClientParams, Transport};
use serde::de::DeserializeOwned;
use serde_json::{from_value, json};

use hez_types::{H160, H256, U256};

use crate::error::RPCRequestError;
use crate::json_types::{EthBlock, EthBlockWithTransactions, EthReceipt, EthTransaction};

/// Ethereum JSON-RPC provider client. The wallet's only window into L1
/// transaction status.
#[derive(Clone)]
pub struct EthClient {
    client: HttpClient,
}

impl EthClient {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    pub fn with_url(url: &str, timeout: Duration) -> Result<Self> {
        let client = HttpClient::builder().timeout(timeout).build(url)?;
        Ok(Self::new(client))
    }

    fn client(&self) -> &HttpClient {
        &self.client
    }

    pub async fn get_transaction(&self, hash: H256) -> Result<Option<EthTransaction>> {
        self.request(
            "eth_getTransactionByHash",
            Some(ClientParams::Array(vec![json!(hash)])),
        )
        .await
    }

    pub async fn get_transaction_receipt(&self, hash: H256) -> Result<Option<EthReceipt>> {
        self.request(
            "eth_getTransactionReceipt",
            Some(ClientParams::Array(vec![json!(hash)])),
        )
        .await
    }

    pub async fn get_block(&self, number: u64) -> Result<Option<EthBlock>> {
        self.request(
            "eth_getBlockByNumber",
            Some(ClientParams::Array(vec![
                json!(format!("0x{:x}", number)),
                json!(false),
            ])),
        )
        .await
    }

    pub async fn get_block_with_transactions(
        &self,
        number: u64,
    ) -> Result<Option<EthBlockWithTransactions>> {
        self.request(
            "eth_getBlockByNumber",
            Some(ClientParams::Array(vec![
                json!(format!("0x{:x}", number)),
                json!(true),
            ])),
        )
        .await
    }

    pub async fn get_balance(&self, address: H160) -> Result<U256> {
        self.request(
            "eth_getBalance",
            Some(ClientParams::Array(vec![json!(address), json!("latest")])),
        )
        .await
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Option<ClientParams>,
    ) -> Result<T> {
        let response = self
            .client()
            .request(method, params)
            .await
            .map_err(|err| RPCRequestError::new("eth client", method.to_string(), err))?;
        let response_str = response.to_string();
        match to_result::<T>(response) {
            Ok(r) => Ok(r),
            Err(err) => {
                log::error!(
                    "[eth-client] Failed to parse response, method: {}, response: {}",
                    method,
                    response_str
                );
                Err(err)
            }
        }
    }
}

fn to_result<T: DeserializeOwned>(output: Output) -> Result<T> {
    match output {
        Output::Success(success) => Ok(from_value(success.result)?),
        Output::Failure(failure) => Err(anyhow::anyhow!("JSONRPC error: {}", failure.error)),
    }
}
