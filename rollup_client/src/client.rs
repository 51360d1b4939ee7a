//! reqwest-based client for the coordinator's HTTP API.

use reqwest::StatusCode;
use serde::Serialize;
use tracing::debug;
use wallet_core::{FinishStatus, Output, Request};

use crate::RollupError;
use crate::dispatch::Rollup;
use crate::wire::{FinishBody, PayloadBody, RollupRequest, VoucherBody};

#[derive(Debug, Clone)]
pub struct RollupClient {
    http: reqwest::Client,
    base_url: String,
}

impl RollupClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B: Serialize>(
        &self,
        endpoint: &'static str,
        body: &B,
    ) -> Result<reqwest::Response, RollupError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        self.http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|source| RollupError::Http { endpoint, source })
    }

    async fn deliver<B: Serialize>(&self, endpoint: &'static str, body: &B) -> Result<(), RollupError> {
        let response = self.post(endpoint, body).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RollupError::UnexpectedStatus {
                endpoint,
                status: status.as_u16(),
            });
        }
        debug!(endpoint, status = status.as_u16(), "output delivered");
        Ok(())
    }
}

impl Rollup for RollupClient {
    async fn finish(&mut self, status: FinishStatus) -> Result<Option<Request>, RollupError> {
        let response = self.post("finish", &FinishBody { status }).await?;
        match response.status() {
            StatusCode::OK => {
                let bytes = response.bytes().await.map_err(|source| RollupError::Http {
                    endpoint: "finish",
                    source,
                })?;
                let body: RollupRequest = serde_json::from_slice(&bytes)?;
                Ok(Some(body.into_request()?))
            }
            StatusCode::ACCEPTED => {
                let text = response.text().await.unwrap_or_default();
                debug!(%text, "no pending rollup request");
                Ok(None)
            }
            other => Err(RollupError::UnexpectedStatus {
                endpoint: "finish",
                status: other.as_u16(),
            }),
        }
    }

    async fn emit(&mut self, output: &Output) -> Result<(), RollupError> {
        match output {
            Output::Notice(notice) => self.deliver("notice", &PayloadBody::from(notice)).await,
            Output::Voucher(voucher) => self.deliver("voucher", &VoucherBody::from(voucher)).await,
            Output::Report(report) => self.deliver("report", &PayloadBody::from(report)).await,
        }
    }
}
