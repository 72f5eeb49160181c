//! Waiting for submitted transactions to be confirmed.
//!
//! The poller counts rounds, not wall time: the node blocks until the next round and the
//! budget is spent one round per unsuccessful status query.

use core::fmt;
use slog::{debug, info, warn, Logger};

use crate::node::{Node, NodeError, PendingTransaction};
use crate::transaction::TxId;

/// Outcome of a finished wait.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Status {
    /// The transaction is on the ledger.
    Confirmed(PendingTransaction),
    /// The node couldn't tell what happened to the transaction.
    ///
    /// The transaction may still get confirmed later.
    Unknown(NodeError),
}

impl Status {
    pub fn confirmed(&self) -> Option<&PendingTransaction> {
        match self {
            Status::Confirmed(status) => Some(status),
            Status::Unknown(_) => None,
        }
    }
}

/// Waits at most `timeout` rounds for the transaction `id` to be confirmed.
pub fn wait_for_confirmation<N: Node + ?Sized>(node: &N, id: &TxId, timeout: u64, logger: &Logger) -> Result<Status, WaitError> {
    let mut current_round = node.current_round()?.saturating_add(1);

    for _ in 0..timeout {
        let status = match node.pending_status(id) {
            Ok(status) => status,
            Err(error) => {
                warn!(logger, "transaction status unavailable"; "txid" => %id, "error" => %error);
                return Ok(Status::Unknown(error));
            },
        };
        if status.is_confirmed() {
            info!(logger, "transaction confirmed"; "txid" => %id, "round" => status.confirmed_round);
            return Ok(Status::Confirmed(status));
        }
        if !status.pool_error.is_empty() {
            info!(logger, "transaction rejected"; "txid" => %id, "reason" => &status.pool_error);
            return Err(WaitError::Rejected(status.pool_error));
        }
        debug!(logger, "waiting for round"; "txid" => %id, "round" => current_round);
        node.block_until_round(current_round)?;
        current_round = current_round.saturating_add(1);
    }

    info!(logger, "transaction not confirmed in time"; "txid" => %id, "rounds" => timeout);
    Err(WaitError::Timeout { rounds: timeout })
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum WaitError {
    /// The pool evicted the transaction, contains the reason given by the node.
    Rejected(String),
    Timeout { rounds: u64 },
    /// Reading or waiting for the round failed.
    Node(NodeError),
}

impl From<NodeError> for WaitError {
    fn from(error: NodeError) -> Self {
        WaitError::Node(error)
    }
}

impl fmt::Display for WaitError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            WaitError::Rejected(reason) => write!(f, "transaction rejected: {}", reason),
            WaitError::Timeout { rounds } => write!(f, "transaction not confirmed after {} rounds", rounds),
            WaitError::Node(error) => write!(f, "failed to follow rounds: {}", error),
        }
    }
}

impl std::error::Error for WaitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WaitError::Node(error) => Some(error),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use slog::o;
    use crate::node::mock::MockNode;
    use crate::node::{NodeError, PendingTransaction};
    use crate::transaction::TxId;
    use super::{wait_for_confirmation, Status, WaitError};

    fn logger() -> slog::Logger {
        slog::Logger::root(slog::Discard, o!())
    }

    fn id() -> TxId {
        TxId::from_bytes([1; 32])
    }

    #[test]
    fn confirmed_on_first_query() {
        let node = MockNode::new(4).then_status(MockNode::confirmed(5));
        let status = wait_for_confirmation(&node, &id(), 10, &logger()).unwrap();
        assert_eq!(status.confirmed().map(|status| status.confirmed_round), Some(5));
        assert!(node.waits.borrow().is_empty());
        assert_eq!(node.status_queries.get(), 1);
    }

    #[test]
    fn confirmed_after_some_rounds() {
        let node = MockNode::new(100)
            .then_status(MockNode::pending())
            .then_status(MockNode::pending())
            .then_status(MockNode::confirmed(102));
        let status = wait_for_confirmation(&node, &id(), 5, &logger()).unwrap();
        assert_eq!(status.confirmed().map(|status| status.confirmed_round), Some(102));
        assert_eq!(*node.waits.borrow(), [101, 102]);
    }

    #[test]
    fn times_out_after_exact_budget() {
        let node = MockNode::new(7).then_status(MockNode::pending());
        let error = wait_for_confirmation(&node, &id(), 3, &logger()).unwrap_err();
        assert_eq!(error, WaitError::Timeout { rounds: 3 });
        assert_eq!(*node.waits.borrow(), [8, 9, 10]);
        assert_eq!(node.status_queries.get(), 3);
        assert!(error.to_string().contains('3'));
    }

    #[test]
    fn zero_timeout_never_queries() {
        let node = MockNode::new(7).then_status(MockNode::confirmed(7));
        assert_eq!(wait_for_confirmation(&node, &id(), 0, &logger()), Err(WaitError::Timeout { rounds: 0 }));
        assert_eq!(node.status_queries.get(), 0);
    }

    #[test]
    fn pool_error_is_rejection() {
        let reason = "TransactionPool.Remember: transaction already in ledger";
        let status = PendingTransaction { pool_error: reason.to_owned(), ..Default::default() };
        let node = MockNode::new(1).then_status(status);
        assert_eq!(wait_for_confirmation(&node, &id(), 5, &logger()), Err(WaitError::Rejected(reason.to_owned())));
        assert!(node.waits.borrow().is_empty());
    }

    #[test]
    fn lookup_failure_is_unknown() {
        let error = NodeError::Unreachable("timed out".to_owned());
        let node = MockNode::new(1)
            .then_status(MockNode::pending())
            .then_lookup_error(error.clone());
        assert_eq!(wait_for_confirmation(&node, &id(), 5, &logger()), Ok(Status::Unknown(error)));
        assert_eq!(*node.waits.borrow(), [2]);
    }

    #[test]
    fn round_failures_are_node_errors() {
        let error = NodeError::Unreachable("connection refused".to_owned());

        let node = MockNode::new(1).then_status(MockNode::confirmed(2));
        *node.round_error.borrow_mut() = Some(error.clone());
        assert_eq!(wait_for_confirmation(&node, &id(), 5, &logger()), Err(WaitError::Node(error.clone())));
        assert_eq!(node.status_queries.get(), 0);

        let node = MockNode::new(1).then_status(MockNode::pending());
        *node.wait_error.borrow_mut() = Some(error.clone());
        assert_eq!(wait_for_confirmation(&node, &id(), 5, &logger()), Err(WaitError::Node(error)));
        assert_eq!(*node.waits.borrow(), [2]);
        assert_eq!(node.status_queries.get(), 1);
    }

    #[test]
    fn last_representable_round() {
        let node = MockNode::new(u64::MAX).then_status(MockNode::pending());
        assert_eq!(wait_for_confirmation(&node, &id(), 5, &logger()), Err(WaitError::Timeout { rounds: 5 }));
        assert_eq!(node.status_queries.get(), 5);
        assert_eq!(*node.waits.borrow(), [u64::MAX; 5]);

        let node = MockNode::new(u64::MAX - 1).then_status(MockNode::confirmed(u64::MAX));
        let status = wait_for_confirmation(&node, &id(), 5, &logger()).unwrap();
        assert_eq!(status.confirmed().map(|status| status.confirmed_round), Some(u64::MAX));
    }

    quickcheck::quickcheck! {
        fn never_confirming_waits_timeout_rounds(round: u32, timeout: u8) -> bool {
            let node = MockNode::new(round.into()).then_status(MockNode::pending());
            let result = wait_for_confirmation(&node, &id(), timeout.into(), &slog::Logger::root(slog::Discard, o!()));
            result == Err(WaitError::Timeout { rounds: timeout.into() })
                && node.waits.borrow().len() == usize::from(timeout)
        }
    }
}
