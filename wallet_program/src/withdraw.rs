//! Handler for the `withdraw` operation.

use alloy_primitives::Address;
use tracing::info;
use wallet_core::{Asset, Voucher, WalletError};

use crate::ledger::Wallet;

/// Debit an asset and produce the voucher that releases it on the
/// settlement layer.
///
/// The dApp address must be known before anything is debited; otherwise the
/// asset would leave the ledger with no voucher to claim it.
pub fn handle(
    wallet: &mut Wallet,
    dapp_address: Option<Address>,
    from: Address,
    asset: Asset,
) -> Result<Voucher, WalletError> {
    let dapp = dapp_address.ok_or(WalletError::DAppAddressUnknown)?;
    let withdrawal = wallet.withdraw(from, asset)?;
    let voucher = withdrawal.voucher(dapp);

    info!(
        account = %from,
        asset = ?asset,
        destination = %voucher.destination,
        "withdrawal voucher created"
    );
    Ok(voucher)
}
