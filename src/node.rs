//! The remote ledger node.
//!
//! The node is an opaque collaborator, this crate only defines the calls it needs. All calls
//! block the calling thread.

#[cfg(test)]
pub(crate) mod mock;

use core::fmt;

use crate::address::Address;
use crate::signer::SignedTransaction;
use crate::transaction::TxId;

/// Network parameters required to build a transaction.
///
/// They are valid only for a range of rounds so they should be fetched right before use.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SuggestedParams {
    /// Fee per byte, or the total fee if `flat_fee` is set.
    pub fee: u64,
    pub min_fee: u64,
    pub flat_fee: bool,
    pub first_valid: u64,
    pub last_valid: u64,
    pub genesis_id: String,
    pub genesis_hash: [u8; 32],
}

/// What the node knows about a submitted transaction.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct PendingTransaction {
    /// Round in which the transaction was included, zero if it wasn't yet.
    pub confirmed_round: u64,
    /// Reason the transaction was evicted from the pool, empty if it wasn't.
    pub pool_error: String,
    /// Id of the application created by the transaction.
    pub application_index: Option<u64>,
    /// Id of the asset created by the transaction.
    pub asset_index: Option<u64>,
}

impl PendingTransaction {
    pub fn is_confirmed(&self) -> bool {
        self.confirmed_round > 0
    }
}

pub trait Node {
    fn suggested_params(&self) -> Result<SuggestedParams, NodeError>;

    /// Returns the last round the node knows about.
    fn current_round(&self) -> Result<u64, NodeError>;

    /// Sends one transaction or an atomic group.
    fn submit(&self, group: &[SignedTransaction]) -> Result<(), NodeError>;

    fn pending_status(&self, id: &TxId) -> Result<PendingTransaction, NodeError>;

    /// Blocks until the node has seen `round`.
    fn block_until_round(&self, round: u64) -> Result<(), NodeError>;

    /// Returns ids of applications created by `account` that still exist.
    fn created_applications(&self, account: &Address) -> Result<Vec<u64>, NodeError>;
}

impl<'a, N: Node + ?Sized> Node for &'a N {
    fn suggested_params(&self) -> Result<SuggestedParams, NodeError> {
        (**self).suggested_params()
    }

    fn current_round(&self) -> Result<u64, NodeError> {
        (**self).current_round()
    }

    fn submit(&self, group: &[SignedTransaction]) -> Result<(), NodeError> {
        (**self).submit(group)
    }

    fn pending_status(&self, id: &TxId) -> Result<PendingTransaction, NodeError> {
        (**self).pending_status(id)
    }

    fn block_until_round(&self, round: u64) -> Result<(), NodeError> {
        (**self).block_until_round(round)
    }

    fn created_applications(&self, account: &Address) -> Result<Vec<u64>, NodeError> {
        (**self).created_applications(account)
    }
}

/// Failure reported by a node call.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum NodeError {
    /// The node couldn't be reached, retrying may help.
    Unreachable(String),
    /// The node refused the request, the message is the node's own.
    Rejected(String),
}

impl NodeError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, NodeError::Unreachable(_))
    }
}

impl fmt::Display for NodeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            NodeError::Unreachable(message) => write!(f, "node unreachable: {}", message),
            NodeError::Rejected(message) => write!(f, "node rejected the request: {}", message),
        }
    }
}

impl std::error::Error for NodeError {}
