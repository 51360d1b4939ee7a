//! Handlers for portal deposits.

use tracing::info;
use wallet_core::Notice;
use wallet_core::WalletError;
use wallet_core::codec::{decode_erc721_deposit, decode_ether_deposit};

use crate::WalletEvent;
use crate::ledger::Wallet;

/// Handle a deposit notification from the ether portal.
pub fn handle_ether(wallet: &mut Wallet, payload: &[u8]) -> Result<Notice, WalletError> {
    let deposit = decode_ether_deposit(payload)?;
    wallet.deposit_ether(deposit.depositor, deposit.amount)?;

    info!(
        account = %deposit.depositor,
        amount = %deposit.amount,
        balance = %wallet.balance_of(&deposit.depositor),
        "ether deposited"
    );

    Ok(WalletEvent::EtherDeposit {
        address: deposit.depositor.to_checksum(None),
        amount: deposit.amount.to_string(),
    }
    .notice())
}

/// Handle a deposit notification from the ERC-721 portal.
pub fn handle_erc721(wallet: &mut Wallet, payload: &[u8]) -> Result<Notice, WalletError> {
    let deposit = decode_erc721_deposit(payload)?;
    wallet.deposit_erc721(deposit.account, deposit.contract, deposit.token_id)?;

    info!(
        account = %deposit.account,
        erc721 = %deposit.contract,
        token_id = %deposit.token_id,
        "erc721 deposited"
    );

    Ok(WalletEvent::Erc721Deposit {
        address: deposit.account.to_checksum(None),
        erc721: deposit.contract.to_checksum(None),
        token_id: deposit.token_id.to_string(),
    }
    .notice())
}
