// wallet_core — shared types, errors and payload codec for the rollup wallet.
//
//! This crate contains the request/output model, the user operation enum,
//! per-account balance state and the binary codec used by both the request
//! router and off-chain tooling (CLI, tests).

pub mod codec;

use std::collections::{BTreeMap, BTreeSet};

use alloy_primitives::{Address, U256, address};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Everything that can go wrong while handling a single request.
///
/// All variants except [`WalletError::InternalConsistency`] are ordinary
/// outcomes of user input and are expected in normal operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WalletError {
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("unrecognized operation: {0}")]
    UnrecognizedOperation(String),

    #[error("insufficient balance for {account}: have {available}, need {requested}")]
    InsufficientBalance {
        account: Address,
        available: U256,
        requested: U256,
    },

    #[error("token {token_id} of {contract} is not held by {account}")]
    TokenNotFound {
        account: Address,
        contract: Address,
        token_id: U256,
    },

    #[error("token {token_id} of {contract} is already held by {account}")]
    DuplicateToken {
        account: Address,
        contract: Address,
        token_id: U256,
    },

    #[error("dApp address has not been relayed yet")]
    DAppAddressUnknown,

    #[error("internal consistency violated: {0}")]
    InternalConsistency(String),
}

impl WalletError {
    /// True for errors that indicate a bug rather than bad user input.
    pub fn is_internal(&self) -> bool {
        matches!(self, WalletError::InternalConsistency(_))
    }
}

// ---------------------------------------------------------------------------
// Portal configuration
// ---------------------------------------------------------------------------

/// Ether portal on the local devnet deployment.
pub const DEFAULT_ETHER_PORTAL: Address = address!("Ffdbe43d4c855BF7e0f105c400A50857f53AB044");
/// ERC-721 portal on the local devnet deployment.
pub const DEFAULT_ERC721_PORTAL: Address = address!("237F8DD094C0e47f4236f12b4Fa01d6Dae89fb87");
/// dApp address relay on the local devnet deployment.
pub const DEFAULT_DAPP_ADDRESS_RELAY: Address =
    address!("F5DE34d6BbC0446E2a45719E718efEbaaE179daE");

/// Senders with special meaning to the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortalConfig {
    pub ether_portal: Address,
    pub erc721_portal: Address,
    pub dapp_address_relay: Address,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            ether_portal: DEFAULT_ETHER_PORTAL,
            erc721_portal: DEFAULT_ERC721_PORTAL,
            dapp_address_relay: DEFAULT_DAPP_ADDRESS_RELAY,
        }
    }
}

/// Where an advance request came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    EtherPortal,
    Erc721Portal,
    DAppAddressRelay,
    /// Any other sender; the payload is a user [`Operation`].
    User,
}

impl PortalConfig {
    pub fn classify(&self, sender: &Address) -> Origin {
        if *sender == self.ether_portal {
            Origin::EtherPortal
        } else if *sender == self.erc721_portal {
            Origin::Erc721Portal
        } else if *sender == self.dapp_address_relay {
            Origin::DAppAddressRelay
        } else {
            Origin::User
        }
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Block context attached to an advance request by the coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub msg_sender: Address,
    #[serde(default)]
    pub epoch_index: u64,
    #[serde(default)]
    pub input_index: u64,
    #[serde(default)]
    pub block_number: u64,
    #[serde(default)]
    pub timestamp: u64,
}

impl Metadata {
    pub fn from_sender(msg_sender: Address) -> Self {
        Self {
            msg_sender,
            epoch_index: 0,
            input_index: 0,
            block_number: 0,
            timestamp: 0,
        }
    }
}

/// A request pulled from the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// May mutate the ledger; attributed to `metadata.msg_sender`.
    Advance { metadata: Metadata, payload: Vec<u8> },
    /// Read-only query.
    Inspect { payload: Vec<u8> },
}

/// Terminal status reported to the coordinator on the next `/finish`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FinishStatus {
    #[default]
    Accept,
    Reject,
}

// ---------------------------------------------------------------------------
// Outputs
// ---------------------------------------------------------------------------

/// Informational record; no effect on the settlement layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub payload: Vec<u8>,
}

/// Deferred call executed later on the settlement layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voucher {
    pub destination: Address,
    pub payload: Vec<u8>,
}

/// Answer to an inspect request; never persisted on-chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    Notice(Notice),
    Voucher(Voucher),
    Report(Report),
}

impl From<Notice> for Output {
    fn from(notice: Notice) -> Self {
        Output::Notice(notice)
    }
}

impl From<Voucher> for Output {
    fn from(voucher: Voucher) -> Self {
        Output::Voucher(voucher)
    }
}

impl From<Report> for Output {
    fn from(report: Report) -> Self {
        Output::Report(report)
    }
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// An asset held in the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Asset {
    /// Native currency, in wei.
    Ether(U256),
    /// A single non-fungible token.
    Erc721 { contract: Address, token_id: U256 },
}

/// User operations carried in the payload of a non-portal advance request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Move an asset between two ledger accounts.
    Transfer {
        from: Address,
        to: Address,
        asset: Asset,
    },

    /// Take an asset out of the rollup; produces a voucher.
    Withdraw { from: Address, asset: Asset },

    /// Well-formed record with an operation tag the wallet does not know.
    Unrecognized { operation: String },
}

/// What the inspect endpoint is asked about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceQuery {
    Ether { account: Address },
    Erc721 { account: Address, contract: Address },
}

/// A debited asset on its way to the settlement layer.
///
/// Produced by the ledger on a successful withdrawal and turned into a
/// [`Voucher`] by [`Withdrawal::voucher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Withdrawal {
    pub receiver: Address,
    pub asset: Asset,
}

// ---------------------------------------------------------------------------
// Account state
// ---------------------------------------------------------------------------

/// Holdings of a single account.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Balance {
    ether: U256,
    erc721: BTreeMap<Address, BTreeSet<U256>>,
}

impl Balance {
    pub fn ether(&self) -> U256 {
        self.ether
    }

    /// Token ids held for `contract`, empty if none.
    pub fn erc721(&self, contract: &Address) -> BTreeSet<U256> {
        self.erc721.get(contract).cloned().unwrap_or_default()
    }

    pub fn holds_erc721(&self, contract: &Address, token_id: &U256) -> bool {
        self.erc721
            .get(contract)
            .is_some_and(|ids| ids.contains(token_id))
    }

    /// Credit native currency. Fails only on 256-bit overflow.
    pub fn increase_ether(&mut self, amount: U256) -> Result<(), WalletError> {
        let current = self.ether;
        self.ether = current.checked_add(amount).ok_or_else(|| {
            WalletError::InternalConsistency(format!(
                "ether balance overflow: {current} + {amount}"
            ))
        })?;
        Ok(())
    }

    /// Debit native currency. On failure the balance is left untouched.
    pub fn decrease_ether(&mut self, account: Address, amount: U256) -> Result<(), WalletError> {
        if self.ether < amount {
            return Err(WalletError::InsufficientBalance {
                account,
                available: self.ether,
                requested: amount,
            });
        }
        self.ether -= amount;
        Ok(())
    }

    pub fn add_erc721(
        &mut self,
        account: Address,
        contract: Address,
        token_id: U256,
    ) -> Result<(), WalletError> {
        if !self.erc721.entry(contract).or_default().insert(token_id) {
            return Err(WalletError::DuplicateToken {
                account,
                contract,
                token_id,
            });
        }
        Ok(())
    }

    pub fn remove_erc721(
        &mut self,
        account: Address,
        contract: Address,
        token_id: U256,
    ) -> Result<(), WalletError> {
        let Some(ids) = self.erc721.get_mut(&contract) else {
            return Err(WalletError::TokenNotFound {
                account,
                contract,
                token_id,
            });
        };
        if !ids.remove(&token_id) {
            return Err(WalletError::TokenNotFound {
                account,
                contract,
                token_id,
            });
        }
        if ids.is_empty() {
            self.erc721.remove(&contract);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: Address = Address::repeat_byte(0xa1);
    const NFT: Address = Address::repeat_byte(0x72);

    #[test]
    fn test_decrease_ether_insufficient_leaves_balance() {
        let mut balance = Balance::default();
        balance.increase_ether(U256::from(10)).unwrap();

        let err = balance.decrease_ether(ALICE, U256::from(11)).unwrap_err();
        assert_eq!(
            err,
            WalletError::InsufficientBalance {
                account: ALICE,
                available: U256::from(10),
                requested: U256::from(11),
            }
        );
        assert_eq!(balance.ether(), U256::from(10));

        balance.decrease_ether(ALICE, U256::from(10)).unwrap();
        assert_eq!(balance.ether(), U256::ZERO);
    }

    #[test]
    fn test_increase_ether_overflow_is_internal() {
        let mut balance = Balance::default();
        balance.increase_ether(U256::MAX).unwrap();
        let err = balance.increase_ether(U256::from(1)).unwrap_err();
        assert!(err.is_internal());
        assert_eq!(balance.ether(), U256::MAX);
    }

    #[test]
    fn test_erc721_add_remove() {
        let mut balance = Balance::default();
        balance.add_erc721(ALICE, NFT, U256::from(7)).unwrap();
        assert!(balance.holds_erc721(&NFT, &U256::from(7)));

        let dup = balance.add_erc721(ALICE, NFT, U256::from(7)).unwrap_err();
        assert!(matches!(dup, WalletError::DuplicateToken { .. }));

        balance.remove_erc721(ALICE, NFT, U256::from(7)).unwrap();
        assert!(balance.erc721(&NFT).is_empty());
        assert!(balance.erc721.is_empty());

        let missing = balance.remove_erc721(ALICE, NFT, U256::from(7)).unwrap_err();
        assert!(matches!(missing, WalletError::TokenNotFound { .. }));
    }

    #[test]
    fn test_classify_sender() {
        let portals = PortalConfig::default();
        assert_eq!(portals.classify(&DEFAULT_ETHER_PORTAL), Origin::EtherPortal);
        assert_eq!(portals.classify(&DEFAULT_ERC721_PORTAL), Origin::Erc721Portal);
        assert_eq!(
            portals.classify(&DEFAULT_DAPP_ADDRESS_RELAY),
            Origin::DAppAddressRelay
        );
        assert_eq!(portals.classify(&ALICE), Origin::User);
    }

    #[test]
    fn test_classify_ignores_textual_case() {
        let portals = PortalConfig::default();
        let lower: Address = "0xffdbe43d4c855bf7e0f105c400a50857f53ab044".parse().unwrap();
        let upper: Address = "0xFFDBE43D4C855BF7E0F105C400A50857F53AB044".parse().unwrap();
        assert_eq!(portals.classify(&lower), Origin::EtherPortal);
        assert_eq!(portals.classify(&upper), Origin::EtherPortal);
    }

    #[test]
    fn test_finish_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&FinishStatus::Accept).unwrap(),
            "\"accept\""
        );
        assert_eq!(
            serde_json::to_string(&FinishStatus::Reject).unwrap(),
            "\"reject\""
        );
    }
}
