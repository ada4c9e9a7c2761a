use ledger_core::Transaction;
use serde_json::Value;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid node url: {0}")]
    InvalidBaseUrl(String),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Clone)]
pub struct NodeClient {
    http: reqwest::Client,
    base: Url,
}

impl NodeClient {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let base = Url::parse(base_url).map_err(|_| ApiError::InvalidBaseUrl(base_url.to_string()))?;
        Ok(NodeClient { http: reqwest::Client::new(), base })
    }

    fn url(&self, path: &str) -> Url {
        self.base.join(path).expect("path is a valid relative url")
    }

    pub async fn balance(&self, addr: &str) -> Result<Value, ApiError> {
        let resp = self.http.get(self.url(&format!("/balance/{addr}"))).send().await?;
        Ok(resp.json().await?)
    }

    pub async fn history(&self, addr: &str) -> Result<Vec<Transaction>, ApiError> {
        let resp = self.http.get(self.url(&format!("/history/{addr}"))).send().await?;
        Ok(resp.json().await?)
    }

    pub async fn get_tx(&self, hash: &str) -> Result<Value, ApiError> {
        let resp = self.http.get(self.url(&format!("/tx/{hash}"))).send().await?;
        Ok(resp.json().await?)
    }

    pub async fn send_tx(&self, tx: &Transaction) -> Result<Value, ApiError> {
        let resp = self.http.post(self.url("/send_tx")).json(tx).send().await?;
        Ok(resp.json().await?)
    }

    pub async fn reload(&self) -> Result<Value, ApiError> {
        let resp = self.http.get(self.url("/reload")).send().await?;
        Ok(resp.json().await?)
    }

    pub async fn make_block(&self) -> Result<Value, ApiError> {
        let resp = self.http.get(self.url("/make_block")).send().await?;
        Ok(resp.json().await?)
    }
}
