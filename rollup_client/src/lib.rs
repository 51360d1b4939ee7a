//! Rollup client — coordinator HTTP API and the dispatch loop.
//!
//! [`RollupClient`] speaks the coordinator's JSON-over-HTTP protocol;
//! [`Dispatcher`] drives the finish → process → emit cycle against any
//! [`Rollup`] implementation.

pub mod client;
pub mod dispatch;
pub mod wire;

pub use client::RollupClient;
pub use dispatch::{Dispatcher, Rollup};

/// Transport-level failures talking to the coordinator.
#[derive(Debug, thiserror::Error)]
pub enum RollupError {
    #[error("http request to /{endpoint} failed: {source}")]
    Http {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected status {status} from /{endpoint}")]
    UnexpectedStatus { endpoint: &'static str, status: u16 },

    #[error("invalid hex payload: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("invalid request body: {0}")]
    InvalidBody(#[from] serde_json::Error),
}
