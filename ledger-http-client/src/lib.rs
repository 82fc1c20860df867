use crate::models::{
    AccountResponse, NetworkParameters, ScriptBody, SubmitResponse, TransactionBody,
    TransactionResultResponse,
};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use url::Url;

use crate::error::{Error, Result};

pub mod error;
pub mod models;
#[cfg(test)]
pub mod tests;

pub const EMULATOR_URL: &str = "http://127.0.0.1:8888/";
pub const TESTNET_URL: &str = "https://rest-testnet.onflow.org/";

pub struct LedgerHttp {
    parent_url: String,
}

#[async_trait]
pub trait LedgerHttpTrait {
    async fn network_parameters(&self) -> Result<NetworkParameters>;

    async fn account(&self, address: &str) -> Result<AccountResponse>;

    async fn submit_transaction(&self, body: &TransactionBody) -> Result<SubmitResponse>;

    async fn transaction_result(&self, id: &str) -> Result<TransactionResultResponse>;

    async fn execute_script(&self, body: &ScriptBody) -> Result<serde_json::Value>;
}

#[async_trait]
impl LedgerHttpTrait for LedgerHttp {
    async fn network_parameters(&self) -> Result<NetworkParameters> {
        let ext = "./v1/network/parameters";
        self.get_endpoint(ext).await
    }

    async fn account(&self, address: &str) -> Result<AccountResponse> {
        let ext = format!("./v1/accounts/{}", address);
        let params = [("expand", "keys,contracts")];
        self.get_endpoint_with_params(&ext, &params).await
    }

    async fn submit_transaction(&self, body: &TransactionBody) -> Result<SubmitResponse> {
        let ext = "./v1/transactions";
        self.post_endpoint(ext, body).await
    }

    async fn transaction_result(&self, id: &str) -> Result<TransactionResultResponse> {
        let ext = format!("./v1/transaction_results/{}", id);
        self.get_endpoint(&ext).await
    }

    async fn execute_script(&self, body: &ScriptBody) -> Result<serde_json::Value> {
        let ext = "./v1/scripts";
        self.post_endpoint(ext, body).await
    }
}

impl LedgerHttp {
    pub fn new(url: &str) -> Self {
        let parent_url = if url.ends_with('/') {
            url.to_string()
        } else {
            format!("{url}/")
        };
        LedgerHttp { parent_url }
    }

    pub fn parent_url(&self) -> &str {
        &self.parent_url
    }

    pub(crate) fn endpoint_url(&self, ext: &str, params: &[(&str, &str)]) -> Result<Url> {
        let mut url = Url::parse(&self.parent_url)?.join(ext)?;
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }
        Ok(url)
    }

    async fn get_endpoint<T: DeserializeOwned>(&self, ext: &str) -> Result<T> {
        self.get_endpoint_with_params(ext, &[]).await
    }

    async fn get_endpoint_with_params<T: DeserializeOwned>(
        &self,
        ext: &str,
        params: &[(&str, &str)],
    ) -> Result<T> {
        let url = self.endpoint_url(ext, params)?;
        let client = reqwest::Client::new();
        let res = client.get(url).send().await?;
        Self::parse_response(res).await
    }

    async fn post_endpoint<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        ext: &str,
        body: &B,
    ) -> Result<T> {
        let url = self.endpoint_url(ext, &[])?;
        let client = reqwest::Client::new();
        let res = client.post(url).json(body).send().await?;
        Self::parse_response(res).await
    }

    async fn parse_response<T: DeserializeOwned>(res: reqwest::Response) -> Result<T> {
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(Error::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(res.json().await?)
    }
}
