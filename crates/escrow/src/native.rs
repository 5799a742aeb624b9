//! Escrow paying rewards in the ledger's native value.
//!
//! The depositor attaches value to the deposit call. Claims pay the full
//! amount; once expired, the deposit returns to the author of the promoted
//! cast.

use recast_verify::{MessageHash, SignedMessage};

use crate::auth;
use crate::book::RewardBook;
use crate::clock::Clock;
use crate::error::EscrowError;
use crate::events::{EscrowEvent, EventLog};
use crate::ledger::{Ledger, Transfer};
use crate::registry::{self, IdentityRegistry};
use crate::types::{Address, Asset, Recipient, Reward, RewardStatus};

pub struct NativeEscrow<R, L, C> {
    registry: R,
    ledger: L,
    clock: C,
    book: RewardBook,
    events: EventLog,
}

impl<R, L, C> NativeEscrow<R, L, C>
where
    R: IdentityRegistry,
    L: Ledger,
    C: Clock,
{
    pub fn new(registry: R, ledger: L, clock: C) -> Self {
        Self {
            registry,
            ledger,
            clock,
            book: RewardBook::new(),
            events: EventLog::default(),
        }
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Escrow `attached_value` for whoever recasts or quotes the signed cast.
    ///
    /// Returns the fingerprint the deposit is stored under.
    pub fn deposit(
        &mut self,
        caller: Address,
        signed: &SignedMessage,
        recipient: Recipient,
        duration_secs: u64,
        attached_value: u128,
    ) -> Result<MessageHash, EscrowError> {
        self.try_deposit(caller, signed, recipient, duration_secs, attached_value)
            .inspect_err(|e| tracing::warn!(error = %e, caller = %caller, "Deposit rejected"))
    }

    fn try_deposit(
        &mut self,
        caller: Address,
        signed: &SignedMessage,
        recipient: Recipient,
        duration_secs: u64,
        attached_value: u128,
    ) -> Result<MessageHash, EscrowError> {
        let message = auth::authenticate(signed)?;
        let hash = auth::promoted_cast(&message)?;
        if attached_value == 0 {
            return Err(EscrowError::ZeroAmount);
        }
        let now = self.clock.now();
        now.checked_add(duration_secs)
            .ok_or(EscrowError::DurationOverflow)?;

        self.ledger
            .transfer_from(&Asset::Native, caller, attached_value)?;

        let depositor = message.data.fid;
        self.book.insert(
            hash,
            Reward {
                depositor,
                recipient,
                asset: Asset::Native,
                amount: attached_value,
                created_at: now,
                duration: duration_secs,
                expiry_receiver: depositor,
                status: RewardStatus::Active,
            },
        );
        self.events.emit(EscrowEvent::RecastRewarded {
            hash,
            depositor,
            recipient,
            asset: Asset::Native,
            amount: attached_value,
            duration: duration_secs,
        });
        tracing::info!(
            hash = %hash,
            depositor,
            recipient = %recipient,
            amount = attached_value,
            duration = duration_secs,
            "Native reward deposited"
        );
        Ok(hash)
    }

    /// Pay every unexpired deposit the signed recast or quote qualifies for.
    ///
    /// Returns the amount paid to the claimant's custody address.
    pub fn claim(&mut self, signed: &SignedMessage) -> Result<u128, EscrowError> {
        self.try_claim(signed)
            .inspect_err(|e| tracing::warn!(error = %e, claim = %signed.hash(), "Claim rejected"))
    }

    fn try_claim(&mut self, signed: &SignedMessage) -> Result<u128, EscrowError> {
        let message = auth::authenticate(signed)?;
        let target = auth::claim_target(&message)?;
        let claimant = message.data.fid;
        let payee = registry::resolve(&self.registry, claimant)?;

        let indices = self.book.claimable(&target, claimant, self.clock.now())?;
        let amount = self
            .book
            .totals(&target, &indices)
            .get(&Asset::Native)
            .copied()
            .unwrap_or(0);

        self.book
            .set_status(&target, &indices, RewardStatus::Claimed);
        let pushed = self.ledger.transfer(&[Transfer {
            asset: Asset::Native,
            to: payee,
            amount,
        }]);
        if let Err(e) = pushed {
            self.book.set_status(&target, &indices, RewardStatus::Active);
            return Err(e.into());
        }

        self.events.emit(EscrowEvent::RewardClaimed {
            claim_hash: message.hash,
            target_hash: target,
            claimant,
            asset: Asset::Native,
            amount,
        });
        tracing::info!(
            target_hash = %target,
            claimant,
            deposits = indices.len(),
            amount,
            "Native reward claimed"
        );
        Ok(amount)
    }

    /// Return expired deposits for `recipient` to the author of the signed
    /// cast. Anyone may call this.
    pub fn reclaim_expired(
        &mut self,
        signed: &SignedMessage,
        recipient: Recipient,
    ) -> Result<u128, EscrowError> {
        self.try_reclaim_expired(signed, recipient).inspect_err(
            |e| tracing::warn!(error = %e, hash = %signed.hash(), "Reclaim rejected"),
        )
    }

    fn try_reclaim_expired(
        &mut self,
        signed: &SignedMessage,
        recipient: Recipient,
    ) -> Result<u128, EscrowError> {
        let message = auth::authenticate(signed)?;
        let hash = auth::promoted_cast(&message)?;

        let indices = self
            .book
            .reclaimable(&hash, &recipient, self.clock.now())?;
        let depositor = message.data.fid;
        let payee = registry::resolve(&self.registry, depositor)?;
        let amount = self
            .book
            .totals(&hash, &indices)
            .get(&Asset::Native)
            .copied()
            .unwrap_or(0);

        self.book.set_status(&hash, &indices, RewardStatus::Reclaimed);
        let pushed = self.ledger.transfer(&[Transfer {
            asset: Asset::Native,
            to: payee,
            amount,
        }]);
        if let Err(e) = pushed {
            self.book.set_status(&hash, &indices, RewardStatus::Active);
            return Err(e.into());
        }

        self.events.emit(EscrowEvent::ExpiredRewardClaimed {
            hash,
            receiver: depositor,
            asset: Asset::Native,
            amount,
        });
        tracing::info!(hash = %hash, depositor, amount, "Expired native reward reclaimed");
        Ok(amount)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn rewards(&self, hash: &MessageHash) -> &[Reward] {
        self.book.rewards(hash)
    }

    pub fn pending_amount(&self, hash: &MessageHash, recipient: &Recipient) -> u128 {
        self.book.pending_amount(hash, recipient, &Asset::Native)
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
