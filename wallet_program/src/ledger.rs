//! In-memory account ledger.
//!
//! The [`Wallet`] is the only owner of account balances. Every mutating
//! operation validates its preconditions before touching state, so a failed
//! call leaves every account exactly as it was.

use std::collections::{BTreeSet, HashMap};

use alloy_primitives::{Address, U256};
use wallet_core::{Asset, Balance, WalletError, Withdrawal};

#[derive(Debug, Default)]
pub struct Wallet {
    accounts: HashMap<Address, Balance>,
}

impl Wallet {
    pub fn new() -> Self {
        Self::default()
    }

    fn account_mut(&mut self, address: Address) -> &mut Balance {
        self.accounts.entry(address).or_default()
    }

    // -- reads ---------------------------------------------------------------

    /// Ether held by `address`; unknown accounts hold zero.
    pub fn balance_of(&self, address: &Address) -> U256 {
        self.accounts
            .get(address)
            .map(Balance::ether)
            .unwrap_or(U256::ZERO)
    }

    /// Token ids of `contract` held by `address`.
    pub fn erc721_balance_of(&self, address: &Address, contract: &Address) -> BTreeSet<U256> {
        self.accounts
            .get(address)
            .map(|balance| balance.erc721(contract))
            .unwrap_or_default()
    }

    /// Sum of all ether balances.
    pub fn total_ether(&self) -> U256 {
        self.accounts
            .values()
            .fold(U256::ZERO, |acc, balance| acc.saturating_add(balance.ether()))
    }

    fn holds_erc721(&self, address: &Address, contract: &Address, token_id: &U256) -> bool {
        self.accounts
            .get(address)
            .is_some_and(|balance| balance.holds_erc721(contract, token_id))
    }

    /// Accounts currently holding `token_id` of `contract`.
    pub fn erc721_owners(&self, contract: &Address, token_id: &U256) -> Vec<Address> {
        self.accounts
            .iter()
            .filter(|(_, balance)| balance.holds_erc721(contract, token_id))
            .map(|(address, _)| *address)
            .collect()
    }

    // -- ether ---------------------------------------------------------------

    pub fn deposit_ether(&mut self, address: Address, amount: U256) -> Result<(), WalletError> {
        self.account_mut(address).increase_ether(amount)
    }

    pub fn withdraw_ether(
        &mut self,
        address: Address,
        amount: U256,
    ) -> Result<Withdrawal, WalletError> {
        self.account_mut(address).decrease_ether(address, amount)?;
        Ok(Withdrawal {
            receiver: address,
            asset: Asset::Ether(amount),
        })
    }

    /// Move `amount` from `from` to `to`. Both sides change or neither does.
    pub fn transfer_ether(
        &mut self,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), WalletError> {
        let available = self.balance_of(&from);
        if available < amount {
            return Err(WalletError::InsufficientBalance {
                account: from,
                available,
                requested: amount,
            });
        }
        if from == to {
            return Ok(());
        }
        let credited = self.balance_of(&to).checked_add(amount);
        if credited.is_none() {
            return Err(WalletError::InternalConsistency(format!(
                "ether balance overflow crediting {to}"
            )));
        }

        self.account_mut(from).decrease_ether(from, amount)?;
        self.account_mut(to).increase_ether(amount)
    }

    // -- erc721 --------------------------------------------------------------

    /// A token id has at most one owner across all accounts.
    pub fn deposit_erc721(
        &mut self,
        account: Address,
        contract: Address,
        token_id: U256,
    ) -> Result<(), WalletError> {
        if let Some(owner) = self.erc721_owners(&contract, &token_id).into_iter().next() {
            return Err(WalletError::DuplicateToken {
                account: owner,
                contract,
                token_id,
            });
        }
        self.account_mut(account)
            .add_erc721(account, contract, token_id)
    }

    pub fn withdraw_erc721(
        &mut self,
        account: Address,
        contract: Address,
        token_id: U256,
    ) -> Result<Withdrawal, WalletError> {
        self.account_mut(account)
            .remove_erc721(account, contract, token_id)?;
        Ok(Withdrawal {
            receiver: account,
            asset: Asset::Erc721 { contract, token_id },
        })
    }

    /// Remove the token from `from` before adding it to `to`, so it is never
    /// held by two accounts. A recipient that already holds the token means
    /// the ledger is inconsistent; that is reported before anything moves.
    pub fn transfer_erc721(
        &mut self,
        from: Address,
        to: Address,
        contract: Address,
        token_id: U256,
    ) -> Result<(), WalletError> {
        if !self.holds_erc721(&from, &contract, &token_id) {
            return Err(WalletError::TokenNotFound {
                account: from,
                contract,
                token_id,
            });
        }
        if from != to && self.holds_erc721(&to, &contract, &token_id) {
            return Err(WalletError::InternalConsistency(format!(
                "token {token_id} of {contract} held by both {from} and {to}"
            )));
        }

        self.account_mut(from)
            .remove_erc721(from, contract, token_id)?;
        self.account_mut(to)
            .add_erc721(to, contract, token_id)
            .map_err(|e| {
                WalletError::InternalConsistency(format!(
                    "token {token_id} of {contract} lost in transfer {from} -> {to}: {e}"
                ))
            })
    }

    // -- generic -------------------------------------------------------------

    pub fn withdraw(&mut self, from: Address, asset: Asset) -> Result<Withdrawal, WalletError> {
        match asset {
            Asset::Ether(amount) => self.withdraw_ether(from, amount),
            Asset::Erc721 { contract, token_id } => self.withdraw_erc721(from, contract, token_id),
        }
    }

    pub fn transfer(&mut self, from: Address, to: Address, asset: Asset) -> Result<(), WalletError> {
        match asset {
            Asset::Ether(amount) => self.transfer_ether(from, to, amount),
            Asset::Erc721 { contract, token_id } => {
                self.transfer_erc721(from, to, contract, token_id)
            }
        }
    }
}
