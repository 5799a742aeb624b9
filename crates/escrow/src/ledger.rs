//! Asset ledger seam: pulls funds into escrow custody and pushes payouts.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::{Address, Asset};

/// A single outgoing payment from escrow custody.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub asset: Asset,
    pub to: Address,
    pub amount: u128,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("{account} holds {available} of {asset}, needs {needed}")]
    InsufficientBalance {
        asset: Asset,
        account: Address,
        needed: u128,
        available: u128,
    },
    #[error("{account} approved {available} of {asset}, needs {needed}")]
    InsufficientAllowance {
        asset: Asset,
        account: Address,
        needed: u128,
        available: u128,
    },
    #[error("asset {0} is not supported by the ledger")]
    UnsupportedAsset(Asset),
    #[error("transfer rejected: {0}")]
    Rejected(String),
}

/// Balances and transfer primitives backing the escrow.
pub trait Ledger {
    /// Move `amount` of `asset` from `from` into escrow custody. For the
    /// native asset this is the value attached to the call.
    fn transfer_from(&mut self, asset: &Asset, from: Address, amount: u128)
        -> Result<(), LedgerError>;

    /// Pay out of escrow custody. Either every transfer applies or none do.
    fn transfer(&mut self, transfers: &[Transfer]) -> Result<(), LedgerError>;
}

// =============================================================================
// MemoryLedger
// =============================================================================

/// In-memory reference ledger for tests and embedding.
///
/// Token pulls require a prior [`approve`](MemoryLedger::approve); native
/// pulls only require balance.
#[derive(Debug, Clone)]
pub struct MemoryLedger {
    custody: Address,
    balances: HashMap<(Asset, Address), u128>,
    allowances: HashMap<(Asset, Address), u128>,
    reject_pushes: bool,
}

impl MemoryLedger {
    /// A ledger whose escrow funds are held by `custody`.
    pub fn new(custody: Address) -> Self {
        Self {
            custody,
            balances: HashMap::new(),
            allowances: HashMap::new(),
            reject_pushes: false,
        }
    }

    pub fn custody(&self) -> Address {
        self.custody
    }

    pub fn balance(&self, asset: &Asset, account: Address) -> u128 {
        self.balances.get(&(*asset, account)).copied().unwrap_or(0)
    }

    pub fn set_balance(&mut self, asset: &Asset, account: Address, amount: u128) {
        self.balances.insert((*asset, account), amount);
    }

    pub fn mint(&mut self, asset: &Asset, account: Address, amount: u128) {
        let balance = self.balances.entry((*asset, account)).or_default();
        *balance = balance.saturating_add(amount);
    }

    /// Allow the escrow to pull up to `amount` of `asset` from `owner`.
    pub fn approve(&mut self, asset: &Asset, owner: Address, amount: u128) {
        self.allowances.insert((*asset, owner), amount);
    }

    pub fn allowance(&self, asset: &Asset, owner: Address) -> u128 {
        self.allowances.get(&(*asset, owner)).copied().unwrap_or(0)
    }

    /// Make every subsequent [`Ledger::transfer`] fail.
    pub fn reject_pushes(&mut self, reject: bool) {
        self.reject_pushes = reject;
    }

    fn debit(
        balances: &mut HashMap<(Asset, Address), u128>,
        asset: &Asset,
        account: Address,
        amount: u128,
    ) -> Result<(), LedgerError> {
        let available = balances.get(&(*asset, account)).copied().unwrap_or(0);
        let remaining = available
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientBalance {
                asset: *asset,
                account,
                needed: amount,
                available,
            })?;
        balances.insert((*asset, account), remaining);
        Ok(())
    }

    fn credit(
        balances: &mut HashMap<(Asset, Address), u128>,
        asset: &Asset,
        account: Address,
        amount: u128,
    ) -> Result<(), LedgerError> {
        let balance = balances.entry((*asset, account)).or_default();
        *balance = balance
            .checked_add(amount)
            .ok_or_else(|| LedgerError::Rejected(format!("balance overflow for {account}")))?;
        Ok(())
    }
}

impl Ledger for MemoryLedger {
    fn transfer_from(
        &mut self,
        asset: &Asset,
        from: Address,
        amount: u128,
    ) -> Result<(), LedgerError> {
        let allowance = self.allowance(asset, from);
        if matches!(asset, Asset::Token(_)) && allowance < amount {
            return Err(LedgerError::InsufficientAllowance {
                asset: *asset,
                account: from,
                needed: amount,
                available: allowance,
            });
        }

        let mut next = self.balances.clone();
        Self::debit(&mut next, asset, from, amount)?;
        Self::credit(&mut next, asset, self.custody, amount)?;
        self.balances = next;

        if matches!(asset, Asset::Token(_)) {
            self.allowances.insert((*asset, from), allowance - amount);
        }
        Ok(())
    }

    fn transfer(&mut self, transfers: &[Transfer]) -> Result<(), LedgerError> {
        if self.reject_pushes {
            return Err(LedgerError::Rejected("ledger is rejecting pushes".into()));
        }
        let mut next = self.balances.clone();
        for t in transfers {
            Self::debit(&mut next, &t.asset, self.custody, t.amount)?;
            Self::credit(&mut next, &t.asset, t.to, t.amount)?;
        }
        self.balances = next;
        Ok(())
    }
}
