//! Escrow paying rewards in allowlisted fungible tokens.
//!
//! Deposits name an expiry receiver who collects the funds once the claim
//! window closes. Claims retain a protocol fee that accrues per asset and
//! can be withdrawn by the owner.

use std::collections::{BTreeMap, BTreeSet};

use recast_verify::{MessageHash, SignedMessage};

use crate::auth;
use crate::book::RewardBook;
use crate::clock::Clock;
use crate::config::{ConfigError, EscrowConfig};
use crate::error::EscrowError;
use crate::events::{EscrowEvent, EventLog};
use crate::ledger::{Ledger, Transfer};
use crate::registry::{self, IdentityRegistry};
use crate::types::{Address, Asset, Fid, Payout, Recipient, Reward, RewardStatus};

/// Split `amount` into `(net, fee)` with `fee = floor(amount * fee_bps / 10_000)`.
///
/// `fee_bps` above 10 000 is treated as 10 000.
pub fn split_fee(amount: u128, fee_bps: u32) -> (u128, u128) {
    const DENOMINATOR: u128 = 10_000;
    let bps = u128::from(fee_bps).min(DENOMINATOR);
    // Split the product to stay within u128 for any amount.
    let fee = (amount / DENOMINATOR) * bps + (amount % DENOMINATOR) * bps / DENOMINATOR;
    (amount - fee, fee)
}

pub struct TokenEscrow<R, L, C> {
    owner: Address,
    fee_bps: u32,
    registry: R,
    ledger: L,
    clock: C,
    book: RewardBook,
    enabled: BTreeSet<Address>,
    fees: BTreeMap<Address, u128>,
    events: EventLog,
}

impl<R, L, C> TokenEscrow<R, L, C>
where
    R: IdentityRegistry,
    L: Ledger,
    C: Clock,
{
    pub fn new(config: EscrowConfig, registry: R, ledger: L, clock: C) -> Result<Self, ConfigError> {
        config.validate()?;
        tracing::info!(owner = %config.owner, fee_bps = config.fee_bps, "Token escrow created");
        Ok(Self {
            owner: config.owner,
            fee_bps: config.fee_bps,
            registry,
            ledger,
            clock,
            book: RewardBook::new(),
            enabled: BTreeSet::new(),
            fees: BTreeMap::new(),
            events: EventLog::default(),
        })
    }

    // =========================================================================
    // Rewards
    // =========================================================================

    /// Escrow `amount` of `asset`, pulled from `caller`, for whoever recasts
    /// or quotes the signed cast.
    #[allow(clippy::too_many_arguments)]
    pub fn deposit(
        &mut self,
        caller: Address,
        signed: &SignedMessage,
        recipient: Recipient,
        expiry_receiver: Fid,
        asset: Asset,
        amount: u128,
        duration_secs: u64,
    ) -> Result<MessageHash, EscrowError> {
        self.try_deposit(
            caller,
            signed,
            recipient,
            expiry_receiver,
            asset,
            amount,
            duration_secs,
        )
        .inspect_err(|e| tracing::warn!(error = %e, caller = %caller, asset = %asset, "Deposit rejected"))
    }

    #[allow(clippy::too_many_arguments)]
    fn try_deposit(
        &mut self,
        caller: Address,
        signed: &SignedMessage,
        recipient: Recipient,
        expiry_receiver: Fid,
        asset: Asset,
        amount: u128,
        duration_secs: u64,
    ) -> Result<MessageHash, EscrowError> {
        let message = auth::authenticate(signed)?;
        let hash = auth::promoted_cast(&message)?;
        if !self.is_asset_enabled(&asset) {
            return Err(EscrowError::AssetNotEnabled(asset));
        }
        if amount == 0 {
            return Err(EscrowError::ZeroAmount);
        }
        let now = self.clock.now();
        now.checked_add(duration_secs)
            .ok_or(EscrowError::DurationOverflow)?;

        self.ledger.transfer_from(&asset, caller, amount)?;

        let depositor = message.data.fid;
        self.book.insert(
            hash,
            Reward {
                depositor,
                recipient,
                asset,
                amount,
                created_at: now,
                duration: duration_secs,
                expiry_receiver,
                status: RewardStatus::Active,
            },
        );
        self.events.emit(EscrowEvent::RecastRewarded {
            hash,
            depositor,
            recipient,
            asset,
            amount,
            duration: duration_secs,
        });
        tracing::info!(
            hash = %hash,
            depositor,
            recipient = %recipient,
            expiry_receiver,
            asset = %asset,
            amount,
            duration = duration_secs,
            "Token reward deposited"
        );
        Ok(hash)
    }

    /// Pay every unexpired deposit the signed recast or quote qualifies for,
    /// net of the protocol fee. Returns one payout per asset.
    pub fn claim(&mut self, signed: &SignedMessage) -> Result<Vec<Payout>, EscrowError> {
        self.try_claim(signed)
            .inspect_err(|e| tracing::warn!(error = %e, claim = %signed.hash(), "Claim rejected"))
    }

    fn try_claim(&mut self, signed: &SignedMessage) -> Result<Vec<Payout>, EscrowError> {
        let message = auth::authenticate(signed)?;
        let target = auth::claim_target(&message)?;
        let claimant = message.data.fid;
        let payee = registry::resolve(&self.registry, claimant)?;

        let indices = self.book.claimable(&target, claimant, self.clock.now())?;
        let payouts: Vec<Payout> = self
            .book
            .totals(&target, &indices)
            .into_iter()
            .map(|(asset, gross)| {
                let (net, fee) = split_fee(gross, self.fee_bps);
                Payout { asset, net, fee }
            })
            .collect();
        let transfers: Vec<Transfer> = payouts
            .iter()
            .filter(|p| p.net > 0)
            .map(|p| Transfer {
                asset: p.asset,
                to: payee,
                amount: p.net,
            })
            .collect();

        let fees_before = self.fees.clone();
        self.book
            .set_status(&target, &indices, RewardStatus::Claimed);
        for payout in &payouts {
            if let Asset::Token(token) = payout.asset {
                let pool = self.fees.entry(token).or_default();
                *pool = pool.saturating_add(payout.fee);
            }
        }
        if let Err(e) = self.ledger.transfer(&transfers) {
            self.book.set_status(&target, &indices, RewardStatus::Active);
            self.fees = fees_before;
            return Err(e.into());
        }

        for payout in &payouts {
            self.events.emit(EscrowEvent::RewardClaimed {
                claim_hash: message.hash,
                target_hash: target,
                claimant,
                asset: payout.asset,
                amount: payout.net,
            });
            tracing::info!(
                target_hash = %target,
                claimant,
                asset = %payout.asset,
                net = payout.net,
                fee = payout.fee,
                "Token reward claimed"
            );
        }
        Ok(payouts)
    }

    /// Send expired deposits for `recipient` to each deposit's expiry
    /// receiver. Anyone may call this. Returns the transfers made.
    pub fn reclaim_expired(
        &mut self,
        signed: &SignedMessage,
        recipient: Recipient,
    ) -> Result<Vec<Transfer>, EscrowError> {
        self.try_reclaim_expired(signed, recipient).inspect_err(
            |e| tracing::warn!(error = %e, hash = %signed.hash(), "Reclaim rejected"),
        )
    }

    fn try_reclaim_expired(
        &mut self,
        signed: &SignedMessage,
        recipient: Recipient,
    ) -> Result<Vec<Transfer>, EscrowError> {
        let message = auth::authenticate(signed)?;
        let hash = auth::promoted_cast(&message)?;

        let indices = self
            .book
            .reclaimable(&hash, &recipient, self.clock.now())?;
        let totals = self.book.totals_by_receiver(&hash, &indices);
        let mut receivers = Vec::with_capacity(totals.len());
        let mut transfers = Vec::with_capacity(totals.len());
        for ((receiver, asset), amount) in totals {
            let to = registry::resolve(&self.registry, receiver)?;
            receivers.push(receiver);
            transfers.push(Transfer { asset, to, amount });
        }

        self.book.set_status(&hash, &indices, RewardStatus::Reclaimed);
        if let Err(e) = self.ledger.transfer(&transfers) {
            self.book.set_status(&hash, &indices, RewardStatus::Active);
            return Err(e.into());
        }

        for (receiver, transfer) in receivers.into_iter().zip(&transfers) {
            self.events.emit(EscrowEvent::ExpiredRewardClaimed {
                hash,
                receiver,
                asset: transfer.asset,
                amount: transfer.amount,
            });
            tracing::info!(
                hash = %hash,
                receiver,
                asset = %transfer.asset,
                amount = transfer.amount,
                "Expired token reward reclaimed"
            );
        }
        Ok(transfers)
    }

    // =========================================================================
    // Administration
    // =========================================================================

    fn require_owner(&self, caller: Address) -> Result<(), EscrowError> {
        if caller != self.owner {
            tracing::warn!(caller = %caller, owner = %self.owner, "Unauthorized admin call");
            return Err(EscrowError::Unauthorized);
        }
        Ok(())
    }

    /// Add or remove `asset` from the allowlist. Pending deposits in a
    /// disabled asset stay claimable.
    pub fn set_asset_enabled(
        &mut self,
        caller: Address,
        asset: Asset,
        enabled: bool,
    ) -> Result<(), EscrowError> {
        self.require_owner(caller)?;
        let Asset::Token(token) = asset else {
            return Err(EscrowError::UnsupportedAsset);
        };
        if enabled {
            self.enabled.insert(token);
            self.events.emit(EscrowEvent::AssetEnabled { asset: token });
        } else {
            self.enabled.remove(&token);
            self.events.emit(EscrowEvent::AssetDisabled { asset: token });
        }
        tracing::info!(asset = %token, enabled, "Asset allowlist updated");
        Ok(())
    }

    /// Send `amount` of accrued fees in `asset` to `to`.
    pub fn withdraw_fees(
        &mut self,
        caller: Address,
        asset: Asset,
        to: Address,
        amount: u128,
    ) -> Result<(), EscrowError> {
        self.require_owner(caller)?;
        let Asset::Token(token) = asset else {
            return Err(EscrowError::UnsupportedAsset);
        };
        if amount == 0 {
            return Err(EscrowError::ZeroAmount);
        }
        let accrued = self.accrued_fees(&asset);
        let remaining = accrued
            .checked_sub(amount)
            .ok_or(EscrowError::InsufficientFees)?;

        self.fees.insert(token, remaining);
        if let Err(e) = self.ledger.transfer(&[Transfer { asset, to, amount }]) {
            self.fees.insert(token, accrued);
            tracing::warn!(error = %e, asset = %token, "Fee withdrawal failed");
            return Err(e.into());
        }

        self.events.emit(EscrowEvent::FeesWithdrawn {
            asset: token,
            to,
            amount,
        });
        tracing::info!(asset = %token, to = %to, amount, "Fees withdrawn");
        Ok(())
    }

    pub fn transfer_ownership(&mut self, caller: Address, new_owner: Address) -> Result<(), EscrowError> {
        self.require_owner(caller)?;
        let previous = std::mem::replace(&mut self.owner, new_owner);
        self.events.emit(EscrowEvent::OwnershipTransferred {
            previous,
            owner: new_owner,
        });
        tracing::info!(previous = %previous, owner = %new_owner, "Ownership transferred");
        Ok(())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn fee_bps(&self) -> u32 {
        self.fee_bps
    }

    pub fn is_asset_enabled(&self, asset: &Asset) -> bool {
        match asset {
            Asset::Native => false,
            Asset::Token(token) => self.enabled.contains(token),
        }
    }

    pub fn accrued_fees(&self, asset: &Asset) -> u128 {
        match asset {
            Asset::Native => 0,
            Asset::Token(token) => self.fees.get(token).copied().unwrap_or(0),
        }
    }

    pub fn rewards(&self, hash: &MessageHash) -> &[Reward] {
        self.book.rewards(hash)
    }

    pub fn pending_amount(&self, hash: &MessageHash, recipient: &Recipient, asset: &Asset) -> u128 {
        self.book.pending_amount(hash, recipient, asset)
    }

    pub fn events(&self) -> &[EscrowEvent] {
        self.events.events()
    }

    pub fn take_events(&mut self) -> Vec<EscrowEvent> {
        self.events.take()
    }

    pub fn registry_mut(&mut self) -> &mut R {
        &mut self.registry
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut L {
        &mut self.ledger
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case(1_000_000_000_000_000_000, 50, 995_000_000_000_000_000, 5_000_000_000_000_000)]
    #[case(199, 50, 199, 0)]
    #[case(200, 50, 199, 1)]
    #[case(10_000, 0, 10_000, 0)]
    #[case(10_000, 10_000, 0, 10_000)]
    #[case(u128::MAX, 10_000, 0, u128::MAX)]
    fn test_split_fee(#[case] amount: u128, #[case] bps: u32, #[case] net: u128, #[case] fee: u128) {
        assert_eq!(split_fee(amount, bps), (net, fee));
    }

    proptest! {
        #[test]
        fn prop_split_fee_exact(amount in any::<u128>(), bps in 0u32..=10_000) {
            let (net, fee) = split_fee(amount, bps);
            prop_assert_eq!(net + fee, amount);
            // Matches the direct formula whenever it does not overflow.
            if let Some(product) = amount.checked_mul(u128::from(bps)) {
                prop_assert_eq!(fee, product / 10_000);
            }
        }
    }
}
