//! Atomic groups.
//!
//! Grouping writes the group id into every member, which changes what gets signed. Groups are
//! therefore always assigned before signing and [`verify`] is what proves it at submit time.

use core::fmt;
use data_encoding::BASE32_NOPAD;

use crate::address;
use crate::signer::SignedTransaction;
use super::{Transaction, TxId};

/// Maximum number of transactions in one group.
pub const MAX_GROUP_SIZE: usize = 16;

/// Domain separator of group ids.
const GROUP_PREFIX: &[u8] = b"TG";

/// Identifier shared by all members of an atomic group.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct GroupId([u8; 32]);

impl GroupId {
    pub(crate) fn from_bytes(bytes: [u8; 32]) -> Self {
        GroupId(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Computes the group id from ordered ids of ungrouped members.
    pub fn compute<'a, I: IntoIterator<Item = &'a TxId>>(ids: I) -> Self {
        let mut preimage = GROUP_PREFIX.to_vec();
        for id in ids {
            preimage.extend_from_slice(id.as_bytes());
        }
        GroupId(address::sha512_256(&[&preimage]))
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&BASE32_NOPAD.encode(&self.0))
    }
}

impl fmt::Debug for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "GroupId({})", self)
    }
}

/// Assigns a shared group id to `transactions`, preserving their order.
pub fn assign_group(mut transactions: Vec<Transaction>) -> Result<Vec<Transaction>, GroupError> {
    check_size(transactions.len())?;
    if let Some(index) = transactions.iter().position(|tx| tx.header.group.is_some()) {
        return Err(GroupError::AlreadyGrouped(index));
    }
    let ids = transactions.iter().map(Transaction::id).collect::<Vec<_>>();
    let group = GroupId::compute(&ids);
    for transaction in &mut transactions {
        transaction.header.group = Some(group);
    }
    Ok(transactions)
}

/// Checks that signed members carry the group id computed over the whole group.
pub fn verify(group: &[SignedTransaction]) -> Result<GroupId, GroupError> {
    check_size(group.len())?;
    let ids = group.iter().map(|signed| signed.transaction().ungrouped_id()).collect::<Vec<_>>();
    let expected = GroupId::compute(&ids);
    for (index, signed) in group.iter().enumerate() {
        match signed.transaction().header().group() {
            Some(group) if *group == expected => (),
            Some(_) => return Err(GroupError::Mismatch(index)),
            None => return Err(GroupError::Missing(index)),
        }
    }
    Ok(expected)
}

fn check_size(size: usize) -> Result<(), GroupError> {
    if size == 0 {
        Err(GroupError::Empty)
    } else if size > MAX_GROUP_SIZE {
        Err(GroupError::TooLarge(size))
    } else {
        Ok(())
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum GroupError {
    Empty,
    TooLarge(usize),
    /// The transaction at this index was grouped already.
    AlreadyGrouped(usize),
    /// The transaction at this index has no group id.
    Missing(usize),
    /// The transaction at this index has a group id that doesn't match the group.
    Mismatch(usize),
}

impl fmt::Display for GroupError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            GroupError::Empty => f.write_str("group is empty"),
            GroupError::TooLarge(size) => write!(f, "group has {} transactions, at most {} are allowed", size, MAX_GROUP_SIZE),
            GroupError::AlreadyGrouped(index) => write!(f, "transaction {} already belongs to a group", index),
            GroupError::Missing(index) => write!(f, "transaction {} has no group id", index),
            GroupError::Mismatch(index) => write!(f, "group id of transaction {} doesn't match the group", index),
        }
    }
}

impl std::error::Error for GroupError {}

#[cfg(test)]
mod tests {
    use crate::address::Address;
    use crate::signer::{sign, Credential};
    use crate::transaction::tests::params;
    use crate::transaction::Builder;
    use super::{assign_group, verify, GroupError, GroupId};

    fn credential() -> Credential {
        Credential::from_seed([9; 32])
    }

    fn fund_and_opt_in() -> Vec<crate::transaction::Transaction> {
        let params = params();
        let builder = Builder::new(&params);
        let sender = credential().address();
        let app_id = 5;
        let asset_id = 17u64;
        vec![
            builder.payment(sender, Address::for_application(app_id), 100_000).unwrap(),
            builder.app_noop(sender, app_id, vec![asset_id.to_be_bytes().to_vec()], vec![asset_id]).unwrap(),
        ]
    }

    #[test]
    fn grouped_then_signed_verifies() {
        let credential = credential();
        let grouped = assign_group(fund_and_opt_in()).unwrap();
        let expected = GroupId::compute(&[fund_and_opt_in()[0].id(), fund_and_opt_in()[1].id()]);
        assert_eq!(grouped[0].header().group(), Some(&expected));
        assert_eq!(grouped[1].header().group(), Some(&expected));
        let signed = grouped.into_iter().map(|tx| sign(tx, &credential).unwrap()).collect::<Vec<_>>();
        assert_eq!(verify(&signed), Ok(expected));
    }

    #[test]
    fn signed_before_grouping_fails() {
        let credential = credential();
        let signed = fund_and_opt_in().into_iter().map(|tx| sign(tx, &credential).unwrap()).collect::<Vec<_>>();
        assert_eq!(verify(&signed), Err(GroupError::Missing(0)));
    }

    #[test]
    fn reordered_group_fails() {
        let credential = credential();
        let mut signed = assign_group(fund_and_opt_in())
            .unwrap()
            .into_iter()
            .map(|tx| sign(tx, &credential).unwrap())
            .collect::<Vec<_>>();
        signed.swap(0, 1);
        assert_eq!(verify(&signed), Err(GroupError::Mismatch(0)));
    }

    #[test]
    fn cannot_group_twice() {
        let grouped = assign_group(fund_and_opt_in()).unwrap();
        assert_eq!(assign_group(grouped), Err(GroupError::AlreadyGrouped(0)));
        assert_eq!(assign_group(Vec::new()), Err(GroupError::Empty));
    }

    #[test]
    fn size_limit() {
        let params = params();
        let builder = Builder::new(&params);
        let sender = credential().address();
        let transactions = (0..17).map(|amount| builder.payment(sender, sender, amount).unwrap()).collect();
        assert_eq!(assign_group(transactions), Err(GroupError::TooLarge(17)));
    }
}
