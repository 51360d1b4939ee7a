//! Wallet program — ledger and request routing for the rollup backend.
//!
//! The [`Router`] owns the [`Wallet`] ledger and the relayed dApp address.
//! Each coordinator request goes through [`Router::process`], which picks a
//! handler by sender, runs it and collects the outputs to emit.

pub mod deposit;
pub mod inspect;
pub mod ledger;
pub mod relay;
pub mod transfer;
pub mod withdraw;

pub use ledger::Wallet;

use alloy_primitives::Address;
use serde::Serialize;
use tracing::{error, info, warn};
use wallet_core::codec::decode_operation;
use wallet_core::{
    FinishStatus, Metadata, Notice, Operation, Origin, Output, PortalConfig, Request, WalletError,
};

// ---------------------------------------------------------------------------
// Notices
// ---------------------------------------------------------------------------

/// Notice bodies, serialized as JSON with a `type` tag.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WalletEvent {
    EtherDeposit {
        address: String,
        amount: String,
    },
    EtherTransfer {
        from: String,
        to: String,
        amount: String,
    },
    Erc721Deposit {
        address: String,
        erc721: String,
        token_id: String,
    },
    Erc721Transfer {
        from: String,
        to: String,
        erc721: String,
        token_id: String,
    },
}

impl WalletEvent {
    pub fn notice(&self) -> Notice {
        // Only string fields; serialization cannot fail.
        Notice {
            payload: serde_json::to_vec(self).unwrap_or_default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Routing
// ---------------------------------------------------------------------------

/// Result of processing one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub status: FinishStatus,
    pub outputs: Vec<Output>,
}

impl Outcome {
    fn accept(outputs: Vec<Output>) -> Self {
        Self {
            status: FinishStatus::Accept,
            outputs,
        }
    }
}

/// Request router and owner of all cross-request state.
#[derive(Debug)]
pub struct Router {
    wallet: Wallet,
    portals: PortalConfig,
    dapp_address: Option<Address>,
}

impl Router {
    pub fn new(portals: PortalConfig) -> Self {
        Self {
            wallet: Wallet::new(),
            portals,
            dapp_address: None,
        }
    }

    /// Start with a known dApp address instead of waiting for the relay.
    pub fn with_dapp_address(mut self, dapp_address: Address) -> Self {
        self.dapp_address = Some(dapp_address);
        self
    }

    pub fn wallet(&self) -> &Wallet {
        &self.wallet
    }

    pub fn dapp_address(&self) -> Option<Address> {
        self.dapp_address
    }

    /// Process one request.
    ///
    /// Handling errors never reject the request: nothing was mutated, so the
    /// request is accepted and the error is logged.
    pub fn process(&mut self, request: &Request) -> Outcome {
        match request {
            Request::Advance { metadata, payload } => {
                info!(
                    sender = %metadata.msg_sender,
                    input_index = metadata.input_index,
                    block_number = metadata.block_number,
                    payload_len = payload.len(),
                    "advance request"
                );
                match self.advance(metadata, payload) {
                    Ok(outputs) => Outcome::accept(outputs),
                    Err(e) => {
                        log_failure("advance", &e);
                        Outcome::accept(vec![])
                    }
                }
            }
            Request::Inspect { payload } => {
                info!(payload_len = payload.len(), "inspect request");
                match inspect::handle(&self.wallet, payload) {
                    Ok(report) => Outcome::accept(vec![report.into()]),
                    Err(e) => {
                        log_failure("inspect", &e);
                        Outcome::accept(vec![])
                    }
                }
            }
        }
    }

    fn advance(&mut self, metadata: &Metadata, payload: &[u8]) -> Result<Vec<Output>, WalletError> {
        match self.portals.classify(&metadata.msg_sender) {
            Origin::DAppAddressRelay => {
                self.dapp_address = Some(relay::handle(payload)?);
                Ok(vec![])
            }
            Origin::EtherPortal => Ok(vec![deposit::handle_ether(&mut self.wallet, payload)?.into()]),
            Origin::Erc721Portal => {
                Ok(vec![deposit::handle_erc721(&mut self.wallet, payload)?.into()])
            }
            Origin::User => self.operation(payload),
        }
    }

    fn operation(&mut self, payload: &[u8]) -> Result<Vec<Output>, WalletError> {
        match decode_operation(payload)? {
            Operation::Transfer { from, to, asset } => {
                Ok(vec![transfer::handle(&mut self.wallet, from, to, asset)?.into()])
            }
            Operation::Withdraw { from, asset } => Ok(vec![
                withdraw::handle(&mut self.wallet, self.dapp_address, from, asset)?.into(),
            ]),
            Operation::Unrecognized { operation } => {
                Err(WalletError::UnrecognizedOperation(operation))
            }
        }
    }
}

fn log_failure(kind: &str, err: &WalletError) {
    if err.is_internal() {
        error!(error = %err, "{kind} request hit an internal inconsistency");
    } else {
        warn!(error = %err, "{kind} request had no effect");
    }
}
