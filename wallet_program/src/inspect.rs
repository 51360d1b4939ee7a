//! Handler for inspect (read-only) requests.

use alloy_primitives::{Address, U256};
use serde::Serialize;
use tracing::debug;
use wallet_core::codec::decode_inspect;
use wallet_core::{BalanceQuery, Report, WalletError};

use crate::ledger::Wallet;

#[derive(Debug, Serialize)]
struct Erc721Holdings {
    address: String,
    erc721: String,
    token_ids: Vec<String>,
}

fn ether_report(wallet: &Wallet, account: &Address) -> Report {
    let text = format!(
        "Balance for {} is {} wei",
        account.to_checksum(None),
        wallet.balance_of(account)
    );
    Report {
        payload: text.into_bytes(),
    }
}

fn erc721_report(wallet: &Wallet, account: &Address, contract: &Address) -> Result<Report, WalletError> {
    let holdings = Erc721Holdings {
        address: account.to_checksum(None),
        erc721: contract.to_checksum(None),
        token_ids: wallet
            .erc721_balance_of(account, contract)
            .iter()
            .map(U256::to_string)
            .collect(),
    };
    let payload = serde_json::to_vec(&holdings)
        .map_err(|e| WalletError::InternalConsistency(format!("report encoding failed: {e}")))?;
    Ok(Report { payload })
}

/// Answer a balance query. Takes the wallet by shared reference: inspect
/// can never mutate the ledger.
pub fn handle(wallet: &Wallet, payload: &[u8]) -> Result<Report, WalletError> {
    let query = decode_inspect(payload)?;
    debug!(?query, "balance query");
    match query {
        BalanceQuery::Ether { account } => Ok(ether_report(wallet, &account)),
        BalanceQuery::Erc721 { account, contract } => erc721_report(wallet, &account, &contract),
    }
}
