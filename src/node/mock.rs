//! Scripted node for tests.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use crate::address::Address;
use crate::signer::SignedTransaction;
use crate::transaction::TxId;
use super::{Node, NodeError, PendingTransaction, SuggestedParams};

/// Answers status queries from a script, the last entry repeats once the script runs out.
pub(crate) struct MockNode {
    pub(crate) round: Cell<u64>,
    pub(crate) params: SuggestedParams,
    statuses: RefCell<VecDeque<Result<PendingTransaction, NodeError>>>,
    pub(crate) submit_error: RefCell<Option<NodeError>>,
    pub(crate) round_error: RefCell<Option<NodeError>>,
    pub(crate) wait_error: RefCell<Option<NodeError>>,
    pub(crate) submitted: RefCell<Vec<Vec<SignedTransaction>>>,
    pub(crate) status_queries: Cell<usize>,
    pub(crate) waits: RefCell<Vec<u64>>,
    pub(crate) created_apps: RefCell<Vec<(Address, u64)>>,
}

impl MockNode {
    pub(crate) fn new(round: u64) -> Self {
        MockNode {
            round: Cell::new(round),
            params: crate::transaction::tests::params(),
            statuses: RefCell::new(VecDeque::new()),
            submit_error: RefCell::new(None),
            round_error: RefCell::new(None),
            wait_error: RefCell::new(None),
            submitted: RefCell::new(Vec::new()),
            status_queries: Cell::new(0),
            waits: RefCell::new(Vec::new()),
            created_apps: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn then_status(self, status: PendingTransaction) -> Self {
        self.statuses.borrow_mut().push_back(Ok(status));
        self
    }

    pub(crate) fn then_lookup_error(self, error: NodeError) -> Self {
        self.statuses.borrow_mut().push_back(Err(error));
        self
    }

    pub(crate) fn confirmed(round: u64) -> PendingTransaction {
        PendingTransaction { confirmed_round: round, ..Default::default() }
    }

    pub(crate) fn pending() -> PendingTransaction {
        PendingTransaction::default()
    }
}

impl Node for MockNode {
    fn suggested_params(&self) -> Result<SuggestedParams, NodeError> {
        Ok(self.params.clone())
    }

    fn current_round(&self) -> Result<u64, NodeError> {
        if let Some(error) = self.round_error.borrow().clone() {
            return Err(error);
        }
        Ok(self.round.get())
    }

    fn submit(&self, group: &[SignedTransaction]) -> Result<(), NodeError> {
        if let Some(error) = self.submit_error.borrow().clone() {
            return Err(error);
        }
        self.submitted.borrow_mut().push(group.to_vec());
        Ok(())
    }

    fn pending_status(&self, _id: &TxId) -> Result<PendingTransaction, NodeError> {
        self.status_queries.set(self.status_queries.get() + 1);
        let mut statuses = self.statuses.borrow_mut();
        if statuses.len() > 1 {
            statuses.pop_front().expect("checked above")
        } else {
            statuses.front().cloned().unwrap_or_else(|| Ok(PendingTransaction::default()))
        }
    }

    fn block_until_round(&self, round: u64) -> Result<(), NodeError> {
        self.waits.borrow_mut().push(round);
        if let Some(error) = self.wait_error.borrow().clone() {
            return Err(error);
        }
        self.round.set(self.round.get().max(round.saturating_add(1)));
        Ok(())
    }

    fn created_applications(&self, account: &Address) -> Result<Vec<u64>, NodeError> {
        let apps = self.created_apps.borrow();
        Ok(apps.iter().filter(|(creator, _)| creator == account).map(|(_, app_id)| *app_id).collect())
    }
}
