//! Deployment of applications and assets.
//!
//! These are the workflows behind the deployment scripts: build, sign, submit and wait for the
//! ledger to assign an id.

use core::fmt;
use slog::{info, Logger};

use crate::address::Address;
use crate::artifacts::{ArtifactError, BuildDir};
use crate::compile::CompiledProgram;
use crate::config::Config;
use crate::confirmation::{self, Status, WaitError};
use crate::node::{Node, NodeError, PendingTransaction};
use crate::signer::{self, Credential, SignError, SignedTransaction};
use crate::submit;
use crate::transaction::builder::AppCreate;
use crate::transaction::{AssetParams, BuildError, Builder, StateSchema, TxId};

/// Everything needed to create an application.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct AppPrograms {
    pub approval: CompiledProgram,
    pub clear: CompiledProgram,
    pub global_schema: StateSchema,
    pub local_schema: StateSchema,
}

impl AppPrograms {
    /// Loads programs and schemas stored by a previous build.
    ///
    /// Programs are read from `<approval>.compiled` and `<clear>.compiled`, schemas from files
    /// named `globalSchema` and `localSchema`.
    pub fn load(store: &BuildDir, approval: &str, clear: &str) -> Result<Self, ArtifactError> {
        Ok(AppPrograms {
            approval: store.load_program(approval)?,
            clear: store.load_program(clear)?,
            global_schema: store.load_schema("globalSchema")?,
            local_schema: store.load_schema("localSchema")?,
        })
    }
}

/// Created application.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Deployment {
    pub app_id: u64,
    /// Account controlled by the application.
    pub address: Address,
    pub confirmed_round: u64,
}

/// Submits the group and waits at most `rounds` rounds for it to be confirmed.
pub fn submit_and_confirm<N: Node + ?Sized>(node: &N, group: &[SignedTransaction], rounds: u64, logger: &Logger) -> Result<PendingTransaction, DeployError> {
    let id = submit::submit(node, group, logger)?;
    match confirmation::wait_for_confirmation(node, &id, rounds, logger)? {
        Status::Confirmed(status) => Ok(status),
        Status::Unknown(error) => Err(DeployError::UnknownStatus { id, error }),
    }
}

/// Creates an application from `programs` owned by `credential`.
pub fn deploy_app<N: Node + ?Sized>(node: &N, credential: &Credential, programs: AppPrograms, config: &Config, logger: &Logger) -> Result<Deployment, DeployError> {
    let params = node.suggested_params()?;
    let app = AppCreate {
        approval_program: programs.approval.into_bytes(),
        clear_program: programs.clear.into_bytes(),
        global_schema: programs.global_schema,
        local_schema: programs.local_schema,
        app_args: Vec::new(),
    };
    let transaction = Builder::new(&params)
        .max_fee(config.max_fee)
        .app_create(credential.address(), app)?;
    let signed = signer::sign(transaction, credential)?;
    let status = submit_and_confirm(node, &[signed], config.confirmation_rounds, logger)?;

    let app_id = status.application_index.ok_or(DeployError::MissingAppId)?;
    let address = Address::for_application(app_id);
    info!(logger, "application deployed"; "app_id" => app_id, "address" => %address, "round" => status.confirmed_round);
    Ok(Deployment { app_id, address, confirmed_round: status.confirmed_round })
}

/// Creates an asset managed by `credential` and returns its id.
pub fn create_asset<N: Node + ?Sized>(node: &N, credential: &Credential, asset: AssetParams, config: &Config, logger: &Logger) -> Result<u64, DeployError> {
    let params = node.suggested_params()?;
    let transaction = Builder::new(&params)
        .max_fee(config.max_fee)
        .asset_create(credential.address(), asset)?;
    let signed = signer::sign(transaction, credential)?;
    let status = submit_and_confirm(node, &[signed], config.confirmation_rounds, logger)?;

    let asset_id = status.asset_index.ok_or(DeployError::MissingAssetId)?;
    info!(logger, "asset created"; "asset_id" => asset_id, "round" => status.confirmed_round);
    Ok(asset_id)
}

/// Deletes every application created by `credential` and returns the deleted ids in order.
///
/// Each deletion is confirmed before the next one is built, so an error leaves the remaining
/// applications untouched.
pub fn delete_all_apps<N: Node + ?Sized>(node: &N, credential: &Credential, config: &Config, logger: &Logger) -> Result<Vec<u64>, DeployError> {
    let creator = credential.address();
    let app_ids = node.created_applications(&creator)?;
    let mut deleted = Vec::with_capacity(app_ids.len());
    for app_id in app_ids {
        let params = node.suggested_params()?;
        let transaction = Builder::new(&params)
            .max_fee(config.max_fee)
            .app_delete(creator, app_id)?;
        let signed = signer::sign(transaction, credential)?;
        let status = submit_and_confirm(node, &[signed], config.confirmation_rounds, logger)?;
        info!(logger, "application deleted"; "app_id" => app_id, "round" => status.confirmed_round);
        deleted.push(app_id);
    }
    Ok(deleted)
}

#[derive(Debug)]
pub enum DeployError {
    Node(NodeError),
    Build(BuildError),
    Sign(SignError),
    Submit(submit::Error),
    Wait(WaitError),
    /// The node lost track of the transaction, it may still be confirmed later.
    UnknownStatus { id: TxId, error: NodeError },
    MissingAppId,
    MissingAssetId,
}

impl From<NodeError> for DeployError {
    fn from(error: NodeError) -> Self {
        DeployError::Node(error)
    }
}

impl From<BuildError> for DeployError {
    fn from(error: BuildError) -> Self {
        DeployError::Build(error)
    }
}

impl From<SignError> for DeployError {
    fn from(error: SignError) -> Self {
        DeployError::Sign(error)
    }
}

impl From<submit::Error> for DeployError {
    fn from(error: submit::Error) -> Self {
        DeployError::Submit(error)
    }
}

impl From<WaitError> for DeployError {
    fn from(error: WaitError) -> Self {
        DeployError::Wait(error)
    }
}

impl fmt::Display for DeployError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DeployError::Node(error) => write!(f, "node request failed: {}", error),
            DeployError::Build(error) => write!(f, "failed to build the transaction: {}", error),
            DeployError::Sign(error) => write!(f, "failed to sign the transaction: {}", error),
            DeployError::Submit(error) => write!(f, "failed to submit the transaction: {}", error),
            DeployError::Wait(error) => write!(f, "failed to confirm the transaction: {}", error),
            DeployError::UnknownStatus { id, error } => write!(f, "status of transaction {} is unknown: {}", id, error),
            DeployError::MissingAppId => f.write_str("confirmed transaction didn't create an application"),
            DeployError::MissingAssetId => f.write_str("confirmed transaction didn't create an asset"),
        }
    }
}

impl std::error::Error for DeployError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DeployError::Node(error) => Some(error),
            DeployError::Build(error) => Some(error),
            DeployError::Sign(error) => Some(error),
            DeployError::Submit(error) => Some(error),
            DeployError::Wait(error) => Some(error),
            DeployError::UnknownStatus { error, .. } => Some(error),
            DeployError::MissingAppId | DeployError::MissingAssetId => None,
        }
    }
}
