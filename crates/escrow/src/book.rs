//! Deposit records keyed by the fingerprint of the promoted cast.
//!
//! Several deposits may share a fingerprint. Claims and reclaims select a
//! subset of them by index; the escrow flips their status before pushing
//! funds and flips it back if the push fails.

use std::collections::{BTreeMap, HashMap};

use recast_verify::MessageHash;

use crate::error::EscrowError;
use crate::types::{Asset, Fid, Recipient, Reward, RewardStatus};

#[derive(Debug, Clone, Default)]
pub struct RewardBook {
    rewards: HashMap<MessageHash, Vec<Reward>>,
}

impl RewardBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, hash: MessageHash, reward: Reward) {
        self.rewards.entry(hash).or_default().push(reward);
    }

    /// Every record ever deposited under `hash`, in deposit order.
    pub fn rewards(&self, hash: &MessageHash) -> &[Reward] {
        self.rewards.get(hash).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Records `claimant` may collect now.
    ///
    /// Among records addressed to `claimant` (or to anyone): active and
    /// unexpired ones are payable. Without any payable record, an expired or
    /// reclaimed match yields [`EscrowError::RewardExpired`]; otherwise
    /// [`EscrowError::NoReward`]. Claimed records are ignored.
    pub fn claimable(
        &self,
        hash: &MessageHash,
        claimant: Fid,
        now: u64,
    ) -> Result<Vec<usize>, EscrowError> {
        let mut payable = Vec::new();
        let mut expired = false;
        for (index, reward) in self.rewards(hash).iter().enumerate() {
            if !reward.recipient.admits(claimant) {
                continue;
            }
            match reward.status {
                RewardStatus::Active if !reward.is_expired(now) => payable.push(index),
                RewardStatus::Active | RewardStatus::Reclaimed => expired = true,
                RewardStatus::Claimed => {}
            }
        }

        if !payable.is_empty() {
            Ok(payable)
        } else if expired {
            Err(EscrowError::RewardExpired)
        } else {
            Err(EscrowError::NoReward)
        }
    }

    /// Active records for exactly `recipient` whose claim window has closed.
    pub fn reclaimable(
        &self,
        hash: &MessageHash,
        recipient: &Recipient,
        now: u64,
    ) -> Result<Vec<usize>, EscrowError> {
        let active: Vec<(usize, &Reward)> = self
            .rewards(hash)
            .iter()
            .enumerate()
            .filter(|(_, r)| r.is_active() && r.recipient == *recipient)
            .collect();
        if active.is_empty() {
            return Err(EscrowError::NoReward);
        }

        let expired: Vec<usize> = active
            .into_iter()
            .filter(|(_, r)| r.is_expired(now))
            .map(|(index, _)| index)
            .collect();
        if expired.is_empty() {
            return Err(EscrowError::RewardNotExpired);
        }
        Ok(expired)
    }

    /// Per-asset totals of the selected records.
    pub fn totals(&self, hash: &MessageHash, indices: &[usize]) -> BTreeMap<Asset, u128> {
        let mut totals = BTreeMap::new();
        for reward in self.selected(hash, indices) {
            let total: &mut u128 = totals.entry(reward.asset).or_default();
            *total = total.saturating_add(reward.amount);
        }
        totals
    }

    /// Per-(expiry receiver, asset) totals of the selected records.
    pub fn totals_by_receiver(
        &self,
        hash: &MessageHash,
        indices: &[usize],
    ) -> BTreeMap<(Fid, Asset), u128> {
        let mut totals = BTreeMap::new();
        for reward in self.selected(hash, indices) {
            let total: &mut u128 = totals
                .entry((reward.expiry_receiver, reward.asset))
                .or_default();
            *total = total.saturating_add(reward.amount);
        }
        totals
    }

    pub fn set_status(&mut self, hash: &MessageHash, indices: &[usize], status: RewardStatus) {
        if let Some(rewards) = self.rewards.get_mut(hash) {
            for &index in indices {
                if let Some(reward) = rewards.get_mut(index) {
                    reward.status = status;
                }
            }
        }
    }

    /// Sum of active deposits for exactly `recipient` in `asset`.
    pub fn pending_amount(&self, hash: &MessageHash, recipient: &Recipient, asset: &Asset) -> u128 {
        self.rewards(hash)
            .iter()
            .filter(|r| r.is_active() && r.recipient == *recipient && r.asset == *asset)
            .fold(0u128, |acc, r| acc.saturating_add(r.amount))
    }

    fn selected<'a>(
        &'a self,
        hash: &MessageHash,
        indices: &'a [usize],
    ) -> impl Iterator<Item = &'a Reward> + 'a {
        let rewards = self.rewards(hash);
        indices.iter().filter_map(move |&index| rewards.get(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const HASH: MessageHash = MessageHash([7; 20]);

    fn reward(recipient: Recipient, created_at: u64, duration: u64) -> Reward {
        Reward {
            depositor: 1,
            recipient,
            asset: Asset::Native,
            amount: 10,
            created_at,
            duration,
            expiry_receiver: 1,
            status: RewardStatus::Active,
        }
    }

    #[test]
    fn test_claimable_collects_matching_records() {
        let mut book = RewardBook::new();
        book.insert(HASH, reward(Recipient::Fid(5), 0, 100));
        book.insert(HASH, reward(Recipient::Fid(6), 0, 100));
        book.insert(HASH, reward(Recipient::Anyone, 0, 100));
        assert_eq!(book.claimable(&HASH, 5, 10), Ok(vec![0, 2]));
        assert_eq!(book.totals(&HASH, &[0, 2]).get(&Asset::Native), Some(&20));
    }

    #[rstest]
    #[case::nothing_deposited(vec![], 5, Err(EscrowError::NoReward))]
    #[case::other_recipient(vec![RewardStatus::Active], 6, Err(EscrowError::NoReward))]
    #[case::expired(vec![RewardStatus::Active], 5, Err(EscrowError::RewardExpired))]
    #[case::reclaimed(vec![RewardStatus::Reclaimed], 5, Err(EscrowError::RewardExpired))]
    #[case::already_claimed(vec![RewardStatus::Claimed], 5, Err(EscrowError::NoReward))]
    fn test_claimable_after_window(
        #[case] statuses: Vec<RewardStatus>,
        #[case] claimant: Fid,
        #[case] expected: Result<Vec<usize>, EscrowError>,
    ) {
        let mut book = RewardBook::new();
        for status in statuses {
            let mut r = reward(Recipient::Fid(5), 0, 100);
            r.status = status;
            book.insert(HASH, r);
        }
        assert_eq!(book.claimable(&HASH, claimant, 100), expected);
    }

    #[test]
    fn test_unexpired_record_wins_over_expired() {
        let mut book = RewardBook::new();
        book.insert(HASH, reward(Recipient::Fid(5), 0, 10));
        book.insert(HASH, reward(Recipient::Fid(5), 0, 1000));
        assert_eq!(book.claimable(&HASH, 5, 50), Ok(vec![1]));
    }

    #[test]
    fn test_reclaimable_selects_expired_subset() {
        let mut book = RewardBook::new();
        book.insert(HASH, reward(Recipient::Fid(5), 0, 10));
        book.insert(HASH, reward(Recipient::Fid(5), 0, 1000));
        book.insert(HASH, reward(Recipient::Anyone, 0, 10));
        assert_eq!(book.reclaimable(&HASH, &Recipient::Fid(5), 50), Ok(vec![0]));
        assert_eq!(book.reclaimable(&HASH, &Recipient::Anyone, 50), Ok(vec![2]));
        assert_eq!(
            book.reclaimable(&HASH, &Recipient::Fid(5), 5),
            Err(EscrowError::RewardNotExpired)
        );
        assert_eq!(
            book.reclaimable(&HASH, &Recipient::Fid(9), 50),
            Err(EscrowError::NoReward)
        );
    }

    #[test]
    fn test_set_status_and_pending() {
        let mut book = RewardBook::new();
        book.insert(HASH, reward(Recipient::Fid(5), 0, 10));
        book.insert(HASH, reward(Recipient::Fid(5), 0, 10));
        assert_eq!(book.pending_amount(&HASH, &Recipient::Fid(5), &Asset::Native), 20);

        book.set_status(&HASH, &[0], RewardStatus::Claimed);
        assert_eq!(book.pending_amount(&HASH, &Recipient::Fid(5), &Asset::Native), 10);
        assert_eq!(book.rewards(&HASH)[0].status, RewardStatus::Claimed);

        book.set_status(&HASH, &[0], RewardStatus::Active);
        assert_eq!(book.pending_amount(&HASH, &Recipient::Fid(5), &Asset::Native), 20);
    }

    #[test]
    fn test_totals_by_receiver() {
        let mut book = RewardBook::new();
        let mut a = reward(Recipient::Fid(5), 0, 10);
        a.expiry_receiver = 8;
        let mut b = reward(Recipient::Fid(5), 0, 10);
        b.expiry_receiver = 9;
        book.insert(HASH, a.clone());
        book.insert(HASH, b);
        book.insert(HASH, a);
        let totals = book.totals_by_receiver(&HASH, &[0, 1, 2]);
        assert_eq!(totals.get(&(8, Asset::Native)), Some(&20));
        assert_eq!(totals.get(&(9, Asset::Native)), Some(&10));
    }
}
