//! Handler for the dApp address relay.

use alloy_primitives::Address;
use tracing::info;
use wallet_core::WalletError;
use wallet_core::codec::decode_dapp_address;

/// Decode the application's settlement-layer address. The ledger is not
/// touched; the caller stores the result.
pub fn handle(payload: &[u8]) -> Result<Address, WalletError> {
    let dapp = decode_dapp_address(payload)?;
    info!(dapp = %dapp, "dApp address relayed");
    Ok(dapp)
}
