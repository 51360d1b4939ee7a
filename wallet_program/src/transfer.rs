//! Handler for the `transfer` operation.

use alloy_primitives::Address;
use tracing::info;
use wallet_core::{Asset, Notice, WalletError};

use crate::WalletEvent;
use crate::ledger::Wallet;

/// Move an asset between two ledger accounts and describe the move in a notice.
pub fn handle(
    wallet: &mut Wallet,
    from: Address,
    to: Address,
    asset: Asset,
) -> Result<Notice, WalletError> {
    wallet.transfer(from, to, asset)?;

    let event = match asset {
        Asset::Ether(amount) => {
            info!(
                %from,
                %to,
                %amount,
                from_balance = %wallet.balance_of(&from),
                to_balance = %wallet.balance_of(&to),
                "ether transferred"
            );
            WalletEvent::EtherTransfer {
                from: from.to_checksum(None),
                to: to.to_checksum(None),
                amount: amount.to_string(),
            }
        }
        Asset::Erc721 { contract, token_id } => {
            info!(%from, %to, erc721 = %contract, %token_id, "erc721 transferred");
            WalletEvent::Erc721Transfer {
                from: from.to_checksum(None),
                to: to.to_checksum(None),
                erc721: contract.to_checksum(None),
                token_id: token_id.to_string(),
            }
        }
    };
    Ok(event.notice())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::U256;

    const A: Address = Address::repeat_byte(0x0a);
    const B: Address = Address::repeat_byte(0x0b);
    const X: Address = Address::repeat_byte(0x58);

    #[test]
    fn test_transfer_ether_notice() {
        let mut wallet = Wallet::new();
        wallet.deposit_ether(A, U256::from(100)).unwrap();

        let notice = handle(&mut wallet, A, B, Asset::Ether(U256::from(40))).unwrap();
        assert_eq!(wallet.balance_of(&A), U256::from(60));
        assert_eq!(wallet.balance_of(&B), U256::from(40));

        let event: serde_json::Value = serde_json::from_slice(&notice.payload).unwrap();
        assert_eq!(event["type"], "etherTransfer");
        assert_eq!(event["from"], A.to_checksum(None));
        assert_eq!(event["to"], B.to_checksum(None));
        assert_eq!(event["amount"], "40");
    }

    #[test]
    fn test_transfer_erc721_notice() {
        let mut wallet = Wallet::new();
        wallet.deposit_erc721(A, X, U256::from(3)).unwrap();

        let asset = Asset::Erc721 {
            contract: X,
            token_id: U256::from(3),
        };
        let notice = handle(&mut wallet, A, B, asset).unwrap();
        assert_eq!(wallet.erc721_owners(&X, &U256::from(3)), vec![B]);

        let event: serde_json::Value = serde_json::from_slice(&notice.payload).unwrap();
        assert_eq!(event["type"], "erc721Transfer");
        assert_eq!(event["token_id"], "3");
    }

    #[test]
    fn test_transfer_insufficient() {
        let mut wallet = Wallet::new();
        let err = handle(&mut wallet, A, B, Asset::Ether(U256::from(1))).unwrap_err();
        assert!(matches!(err, WalletError::InsufficientBalance { .. }));
    }
}
