//! Submission of signed transactions.

use core::fmt;
use slog::{debug, info, Logger};

use crate::node::{Node, NodeError};
use crate::signer::SignedTransaction;
use crate::transaction::group::{self, GroupError};
use crate::transaction::TxId;

/// Sends a single transaction or an atomic group to the node.
///
/// The group is checked locally before anything is sent. Returns the id of the first member.
pub fn submit<N: Node + ?Sized>(node: &N, group: &[SignedTransaction], logger: &Logger) -> Result<TxId, Error> {
    let first = group.first().ok_or(Error::EmptyGroup)?;
    let grouped = group.iter().any(|signed| signed.transaction().header().group().is_some());
    if group.len() > 1 || grouped {
        let group_id = group::verify(group)?;
        debug!(logger, "group verified"; "group" => %group_id, "size" => group.len());
    }

    let id = first.id();
    node.submit(group).map_err(|error| {
        info!(logger, "submission failed"; "txid" => %id, "error" => %error);
        Error::from(error)
    })?;
    info!(logger, "transaction submitted"; "txid" => %id, "size" => group.len());
    Ok(id)
}

/// Concatenates the submission encodings of all members.
pub fn encode_group(group: &[SignedTransaction]) -> Vec<u8> {
    let mut out = Vec::new();
    for signed in group {
        signed.serialize(&mut out);
    }
    out
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Error {
    EmptyGroup,
    Group(GroupError),
    /// The node couldn't be reached.
    Unreachable(String),
    /// The node refused the transaction, the message is the node's own.
    Rejected(String),
}

impl Error {
    /// Returns `true` if submitting the same transactions again may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Unreachable(_))
    }
}

impl From<GroupError> for Error {
    fn from(error: GroupError) -> Self {
        Error::Group(error)
    }
}

impl From<NodeError> for Error {
    fn from(error: NodeError) -> Self {
        match error {
            NodeError::Unreachable(message) => Error::Unreachable(message),
            NodeError::Rejected(message) => Error::Rejected(message),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::EmptyGroup => f.write_str("nothing to submit"),
            Error::Group(error) => write!(f, "invalid group: {}", error),
            Error::Unreachable(message) => write!(f, "node unreachable: {}", message),
            Error::Rejected(message) => write!(f, "transaction rejected: {}", message),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Group(error) => Some(error),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use slog::o;
    use crate::address::Address;
    use crate::node::mock::MockNode;
    use crate::node::NodeError;
    use crate::signer::{sign, Credential, SignedTransaction};
    use crate::transaction::group::{assign_group, GroupError};
    use crate::transaction::tests::params;
    use crate::transaction::Builder;
    use super::{encode_group, submit, Error};

    fn logger() -> slog::Logger {
        slog::Logger::root(slog::Discard, o!())
    }

    fn payments(credential: &Credential, count: u64) -> Vec<crate::transaction::Transaction> {
        let params = params();
        let builder = Builder::new(&params);
        (0..count).map(|amount| builder.payment(credential.address(), Address::ZERO, amount).unwrap()).collect()
    }

    fn sign_all(transactions: Vec<crate::transaction::Transaction>, credential: &Credential) -> Vec<SignedTransaction> {
        transactions.into_iter().map(|tx| sign(tx, credential).unwrap()).collect()
    }

    #[test]
    fn single_transaction() {
        let credential = Credential::from_seed([3; 32]);
        let signed = sign_all(payments(&credential, 1), &credential);
        let node = MockNode::new(10);
        assert_eq!(submit(&node, &signed, &logger()), Ok(signed[0].id()));
        assert_eq!(node.submitted.borrow().len(), 1);
    }

    #[test]
    fn group_returns_first_id() {
        let credential = Credential::from_seed([3; 32]);
        let signed = sign_all(assign_group(payments(&credential, 3)).unwrap(), &credential);
        let node = MockNode::new(10);
        assert_eq!(submit(&node, &signed, &logger()), Ok(signed[0].id()));
        assert_eq!(node.submitted.borrow()[0], signed);
    }

    #[test]
    fn ungrouped_batch_is_refused_locally() {
        let credential = Credential::from_seed([3; 32]);
        let signed = sign_all(payments(&credential, 2), &credential);
        let node = MockNode::new(10);
        assert_eq!(submit(&node, &signed, &logger()), Err(Error::Group(GroupError::Missing(0))));
        assert!(node.submitted.borrow().is_empty());
    }

    #[test]
    fn partial_group_is_refused_locally() {
        let credential = Credential::from_seed([3; 32]);
        let signed = sign_all(assign_group(payments(&credential, 2)).unwrap(), &credential);
        let node = MockNode::new(10);
        assert_eq!(submit(&node, &signed[1..], &logger()), Err(Error::Group(GroupError::Mismatch(0))));
        assert_eq!(submit(&node, &[], &logger()), Err(Error::EmptyGroup));
        assert!(node.submitted.borrow().is_empty());
    }

    #[test]
    fn oversized_group_is_refused_locally() {
        let credential = Credential::from_seed([3; 32]);
        let signed = sign_all(payments(&credential, 17), &credential);
        let node = MockNode::new(10);
        assert_eq!(submit(&node, &signed, &logger()), Err(Error::Group(GroupError::TooLarge(17))));
        assert!(node.submitted.borrow().is_empty());

        let signed = sign_all(assign_group(payments(&credential, 16)).unwrap(), &credential);
        assert_eq!(submit(&node, &signed, &logger()), Ok(signed[0].id()));
    }

    #[test]
    fn node_errors() {
        let credential = Credential::from_seed([3; 32]);
        let signed = sign_all(payments(&credential, 1), &credential);
        let node = MockNode::new(10);

        *node.submit_error.borrow_mut() = Some(NodeError::Unreachable("connection refused".to_owned()));
        let error = submit(&node, &signed, &logger()).unwrap_err();
        assert!(error.is_retryable());

        *node.submit_error.borrow_mut() = Some(NodeError::Rejected("overspend".to_owned()));
        let error = submit(&node, &signed, &logger()).unwrap_err();
        assert_eq!(error, Error::Rejected("overspend".to_owned()));
        assert!(!error.is_retryable());
    }

    #[test]
    fn group_encoding_is_concatenation() {
        let credential = Credential::from_seed([4; 32]);
        let signed = sign_all(assign_group(payments(&credential, 2)).unwrap(), &credential);
        let encoded = encode_group(&signed);
        let mut bytes = &*encoded;
        assert_eq!(SignedTransaction::deserialize(&mut bytes).unwrap(), signed[0]);
        assert_eq!(SignedTransaction::deserialize(&mut bytes).unwrap(), signed[1]);
        assert!(bytes.is_empty());
    }
}
