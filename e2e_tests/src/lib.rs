//! In-memory coordinator for end-to-end tests.
//!
//! [`ScriptedRollup`] answers `/finish` from a queue of JSON bodies and
//! records every JSON body the dispatcher posts, so tests exercise the same
//! wire shapes as the HTTP client. An exhausted script answers `/finish` with
//! a 503, which ends [`drive`].

use std::collections::VecDeque;

use alloy_primitives::{Address, U256};
use rollup_client::wire::{FinishBody, PayloadBody, RollupRequest, VoucherBody, from_hex};
use rollup_client::{Dispatcher, Rollup, RollupError};
use serde_json::Value;
use wallet_core::codec::{
    Erc721Deposit, EtherDeposit, encode_erc721_deposit, encode_ether_deposit, encode_inspect,
    encode_operation,
};
use wallet_core::{BalanceQuery, FinishStatus, Metadata, Operation, Output, PortalConfig, Request};
use wallet_program::Router;

#[derive(Debug, Default)]
pub struct ScriptedRollup {
    script: VecDeque<Option<Value>>,
    finishes: Vec<Value>,
    posted: Vec<(&'static str, Value)>,
}

impl ScriptedRollup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a request, serialized the way the coordinator sends it.
    pub fn push(&mut self, request: &Request) -> &mut Self {
        let body = serde_json::to_value(RollupRequest::from_request(request))
            .unwrap_or(Value::Null);
        self.script.push_back(Some(body));
        self
    }

    /// Queue a raw `/finish` response body.
    pub fn push_raw(&mut self, body: Value) -> &mut Self {
        self.script.push_back(Some(body));
        self
    }

    /// Queue a `202`: nothing pending.
    pub fn push_idle(&mut self) -> &mut Self {
        self.script.push_back(None);
        self
    }

    /// Bodies sent to `/finish`, in order.
    pub fn finishes(&self) -> &[Value] {
        &self.finishes
    }

    /// Bodies posted to `endpoint`, in order.
    pub fn posted(&self, endpoint: &str) -> Vec<&Value> {
        self.posted
            .iter()
            .filter(|(e, _)| *e == endpoint)
            .map(|(_, body)| body)
            .collect()
    }

    /// Decoded `payload` fields posted to `endpoint`.
    pub fn payloads(&self, endpoint: &str) -> Vec<Vec<u8>> {
        self.posted(endpoint)
            .into_iter()
            .filter_map(|body| body["payload"].as_str())
            .filter_map(|hex| from_hex(hex).ok())
            .collect()
    }

    /// Notices parsed back into JSON.
    pub fn notices(&self) -> Vec<Value> {
        self.payloads("notice")
            .iter()
            .filter_map(|payload| serde_json::from_slice(payload).ok())
            .collect()
    }

    /// Reports as UTF-8 text.
    pub fn reports(&self) -> Vec<String> {
        self.payloads("report")
            .into_iter()
            .map(|payload| String::from_utf8_lossy(&payload).into_owned())
            .collect()
    }
}

impl Rollup for ScriptedRollup {
    async fn finish(&mut self, status: FinishStatus) -> Result<Option<Request>, RollupError> {
        self.finishes.push(serde_json::to_value(FinishBody { status })?);
        match self.script.pop_front() {
            Some(Some(body)) => {
                let request: RollupRequest = serde_json::from_value(body)?;
                Ok(Some(request.into_request()?))
            }
            Some(None) => Ok(None),
            None => Err(RollupError::UnexpectedStatus {
                endpoint: "finish",
                status: 503,
            }),
        }
    }

    async fn emit(&mut self, output: &Output) -> Result<(), RollupError> {
        let posted = match output {
            Output::Notice(notice) => ("notice", serde_json::to_value(PayloadBody::from(notice))?),
            Output::Voucher(voucher) => {
                ("voucher", serde_json::to_value(VoucherBody::from(voucher))?)
            }
            Output::Report(report) => ("report", serde_json::to_value(PayloadBody::from(report))?),
        };
        self.posted.push(posted);
        Ok(())
    }
}

/// Run the dispatcher until the script is exhausted.
pub async fn drive(router: Router, rollup: ScriptedRollup) -> Dispatcher<ScriptedRollup> {
    let mut dispatcher = Dispatcher::new(rollup, router);
    while dispatcher.step().await.is_ok() {}
    dispatcher
}

// ---------------------------------------------------------------------------
// Request builders
// ---------------------------------------------------------------------------

pub fn advance(sender: Address, payload: Vec<u8>) -> Request {
    Request::Advance {
        metadata: Metadata::from_sender(sender),
        payload,
    }
}

pub fn ether_deposit(depositor: Address, amount: u64) -> Request {
    advance(
        PortalConfig::default().ether_portal,
        encode_ether_deposit(&EtherDeposit {
            depositor,
            amount: U256::from(amount),
        }),
    )
}

pub fn erc721_deposit(contract: Address, account: Address, token_id: u64) -> Request {
    advance(
        PortalConfig::default().erc721_portal,
        encode_erc721_deposit(&Erc721Deposit {
            contract,
            account,
            token_id: U256::from(token_id),
        }),
    )
}

pub fn relay(dapp: Address) -> Request {
    advance(PortalConfig::default().dapp_address_relay, dapp.to_vec())
}

pub fn user(sender: Address, operation: &Operation) -> Request {
    advance(sender, encode_operation(operation))
}

pub fn inspect(query: &BalanceQuery) -> Request {
    Request::Inspect {
        payload: encode_inspect(query),
    }
}
