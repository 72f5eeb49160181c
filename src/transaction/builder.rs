//! Construction of operation records.
//!
//! The builder validates every input before a [`Transaction`] exists, so a malformed record
//! never escapes. Suggested parameters are round-dependent and expire, fetch them from the node
//! right before building.

use core::convert::TryFrom;
use core::fmt;

use crate::address::{Address, AddressError, IntoAddress};
use crate::node::SuggestedParams;
use super::constants::OnComplete;
use super::{ApplicationCall, AssetConfig, AssetTransfer, Header, Kind, Payment, StateSchema, Transaction};

/// Default upper bound on the fee of a single transaction.
pub const DEFAULT_MAX_FEE: u64 = 3000;

/// Bytes added to the encoded length to account for the signature when computing the fee.
pub const SIGNATURE_OVERHEAD: u64 = 75;

pub const MAX_VALIDITY_WINDOW: u64 = 1000;
pub const MAX_NOTE_LEN: usize = 1024;
pub const MAX_APP_ARGS: usize = 16;
pub const MAX_APP_ARGS_TOTAL_LEN: usize = 2048;
pub const MAX_FOREIGN_ASSETS: usize = 8;
pub const MAX_PROGRAM_LEN: usize = 2048;
pub const MAX_UNIT_NAME_LEN: usize = 8;
pub const MAX_ASSET_NAME_LEN: usize = 32;
pub const MAX_URL_LEN: usize = 96;
pub const MAX_DECIMALS: u32 = 19;

/// Parameters of a newly created asset.
///
/// All management roles are assigned to the creator.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct AssetParams {
    pub total: u64,
    pub decimals: u32,
    pub default_frozen: bool,
    pub unit_name: String,
    pub asset_name: String,
    pub url: String,
}

impl AssetParams {
    pub fn new(total: u64) -> Self {
        AssetParams {
            total,
            decimals: 0,
            default_frozen: false,
            unit_name: String::new(),
            asset_name: String::new(),
            url: String::new(),
        }
    }
}

/// Programs and schemas of an application being created.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct AppCreate {
    pub approval_program: Vec<u8>,
    pub clear_program: Vec<u8>,
    pub global_schema: StateSchema,
    pub local_schema: StateSchema,
    pub app_args: Vec<Vec<u8>>,
}

/// Builds transactions using one set of suggested parameters.
pub struct Builder<'a> {
    params: &'a SuggestedParams,
    max_fee: u64,
    note: Vec<u8>,
}

impl<'a> Builder<'a> {
    pub fn new(params: &'a SuggestedParams) -> Self {
        Builder {
            params,
            max_fee: DEFAULT_MAX_FEE,
            note: Vec::new(),
        }
    }

    /// Sets the fee ceiling, building fails if the computed fee exceeds it.
    pub fn max_fee(mut self, max_fee: u64) -> Self {
        self.max_fee = max_fee;
        self
    }

    /// Attaches a note to every transaction built from now on.
    pub fn note(mut self, note: Vec<u8>) -> Self {
        self.note = note;
        self
    }

    pub fn payment(&self, sender: impl IntoAddress, receiver: impl IntoAddress, amount: u64) -> Result<Transaction, BuildError> {
        let sender = sender.into_address()?;
        let receiver = receiver.into_address()?;
        self.finish(sender, Kind::Payment(Payment { receiver, amount, close_remainder_to: None }))
    }

    /// Pays `amount` to `receiver` and the rest of the balance to `close_to`.
    pub fn payment_and_close(&self, sender: impl IntoAddress, receiver: impl IntoAddress, amount: u64, close_to: impl IntoAddress) -> Result<Transaction, BuildError> {
        let sender = sender.into_address()?;
        let receiver = receiver.into_address()?;
        let close_remainder_to = Some(close_to.into_address()?);
        self.finish(sender, Kind::Payment(Payment { receiver, amount, close_remainder_to }))
    }

    pub fn asset_create(&self, creator: impl IntoAddress, params: AssetParams) -> Result<Transaction, BuildError> {
        let creator = creator.into_address()?;
        if params.total == 0 {
            return Err(BuildError::ZeroAssetTotal);
        }
        if params.decimals > MAX_DECIMALS {
            return Err(BuildError::OutOfRange { field: "decimals", value: params.decimals.into(), max: MAX_DECIMALS.into() });
        }
        check_len("unit name", params.unit_name.len(), MAX_UNIT_NAME_LEN)?;
        check_len("asset name", params.asset_name.len(), MAX_ASSET_NAME_LEN)?;
        check_len("url", params.url.len(), MAX_URL_LEN)?;
        let config = AssetConfig {
            total: params.total,
            decimals: params.decimals,
            default_frozen: params.default_frozen,
            unit_name: params.unit_name,
            asset_name: params.asset_name,
            url: params.url,
            manager: Some(creator),
            reserve: Some(creator),
            freeze: Some(creator),
            clawback: Some(creator),
        };
        self.finish(creator, Kind::AssetConfig(config))
    }

    pub fn asset_transfer(&self, sender: impl IntoAddress, receiver: impl IntoAddress, asset_id: u64, amount: u64) -> Result<Transaction, BuildError> {
        let sender = sender.into_address()?;
        let receiver = receiver.into_address()?;
        if asset_id == 0 {
            return Err(BuildError::ZeroId("asset"));
        }
        self.finish(sender, Kind::AssetTransfer(AssetTransfer { asset_id, amount, receiver }))
    }

    /// Opting into an asset is a zero-amount transfer to self.
    pub fn asset_opt_in(&self, account: impl IntoAddress, asset_id: u64) -> Result<Transaction, BuildError> {
        let account = account.into_address()?;
        self.asset_transfer(account, account, asset_id, 0)
    }

    pub fn app_create(&self, creator: impl IntoAddress, app: AppCreate) -> Result<Transaction, BuildError> {
        let creator = creator.into_address()?;
        check_program("approval program", &app.approval_program)?;
        check_program("clear program", &app.clear_program)?;
        let call = ApplicationCall {
            app_id: 0,
            on_complete: OnComplete::NoOp,
            approval_program: app.approval_program,
            clear_program: app.clear_program,
            global_schema: app.global_schema,
            local_schema: app.local_schema,
            app_args: app.app_args,
            foreign_assets: Vec::new(),
        };
        self.application_call(creator, call)
    }

    /// Calls an existing application.
    pub fn app_call(&self, sender: impl IntoAddress, app_id: u64, on_complete: OnComplete, app_args: Vec<Vec<u8>>, foreign_assets: Vec<u64>) -> Result<Transaction, BuildError> {
        let sender = sender.into_address()?;
        if app_id == 0 {
            return Err(BuildError::ZeroId("application"));
        }
        let call = ApplicationCall {
            app_id,
            on_complete,
            approval_program: Vec::new(),
            clear_program: Vec::new(),
            global_schema: StateSchema::default(),
            local_schema: StateSchema::default(),
            app_args,
            foreign_assets,
        };
        self.application_call(sender, call)
    }

    pub fn app_opt_in(&self, sender: impl IntoAddress, app_id: u64) -> Result<Transaction, BuildError> {
        self.app_call(sender, app_id, OnComplete::OptIn, Vec::new(), Vec::new())
    }

    pub fn app_noop(&self, sender: impl IntoAddress, app_id: u64, app_args: Vec<Vec<u8>>, foreign_assets: Vec<u64>) -> Result<Transaction, BuildError> {
        self.app_call(sender, app_id, OnComplete::NoOp, app_args, foreign_assets)
    }

    pub fn app_delete(&self, sender: impl IntoAddress, app_id: u64) -> Result<Transaction, BuildError> {
        self.app_call(sender, app_id, OnComplete::DeleteApplication, Vec::new(), Vec::new())
    }

    fn application_call(&self, sender: Address, call: ApplicationCall) -> Result<Transaction, BuildError> {
        if call.app_args.len() > MAX_APP_ARGS {
            return Err(BuildError::OutOfRange { field: "application args", value: call.app_args.len() as u64, max: MAX_APP_ARGS as u64 });
        }
        let args_len = call.app_args.iter().map(Vec::len).sum::<usize>();
        check_len("application args", args_len, MAX_APP_ARGS_TOTAL_LEN)?;
        if call.foreign_assets.len() > MAX_FOREIGN_ASSETS {
            return Err(BuildError::OutOfRange { field: "foreign assets", value: call.foreign_assets.len() as u64, max: MAX_FOREIGN_ASSETS as u64 });
        }
        self.finish(sender, Kind::ApplicationCall(call))
    }

    fn finish(&self, sender: Address, kind: Kind) -> Result<Transaction, BuildError> {
        let params = self.params;
        if params.last_valid < params.first_valid {
            return Err(BuildError::InvalidValidity { first: params.first_valid, last: params.last_valid });
        }
        if params.last_valid - params.first_valid > MAX_VALIDITY_WINDOW {
            return Err(BuildError::InvalidValidity { first: params.first_valid, last: params.last_valid });
        }
        check_len("note", self.note.len(), MAX_NOTE_LEN)?;
        check_len("genesis id", params.genesis_id.len(), usize::from(u16::MAX))?;

        let mut transaction = Transaction {
            header: Header {
                sender,
                fee: 0,
                first_valid: params.first_valid,
                last_valid: params.last_valid,
                genesis_id: params.genesis_id.clone(),
                genesis_hash: params.genesis_hash,
                note: self.note.clone(),
                group: None,
            },
            kind,
        };

        let fee = if params.flat_fee {
            if params.fee < params.min_fee {
                return Err(BuildError::FeeTooLow { fee: params.fee, min: params.min_fee });
            }
            params.fee
        } else {
            // the fee field has a fixed width so the length doesn't depend on it
            let size = u64::try_from(transaction.encoded_len()).expect("transactions are small") + SIGNATURE_OVERHEAD;
            params.fee
                .checked_mul(size)
                .ok_or(BuildError::FeeTooHigh { fee: u64::MAX, max: self.max_fee })?
                .max(params.min_fee)
        };
        if fee > self.max_fee {
            return Err(BuildError::FeeTooHigh { fee, max: self.max_fee });
        }
        transaction.header.fee = fee;
        Ok(transaction)
    }
}

fn check_len(field: &'static str, len: usize, max: usize) -> Result<(), BuildError> {
    if len > max {
        Err(BuildError::OutOfRange { field, value: len as u64, max: max as u64 })
    } else {
        Ok(())
    }
}

fn check_program(field: &'static str, program: &[u8]) -> Result<(), BuildError> {
    if program.is_empty() {
        return Err(BuildError::EmptyProgram(field));
    }
    check_len(field, program.len(), MAX_PROGRAM_LEN)
}

/// The builder refused to construct a transaction.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum BuildError {
    InvalidAddress(AddressError),
    InvalidValidity { first: u64, last: u64 },
    FeeTooHigh { fee: u64, max: u64 },
    FeeTooLow { fee: u64, min: u64 },
    OutOfRange { field: &'static str, value: u64, max: u64 },
    EmptyProgram(&'static str),
    ZeroId(&'static str),
    ZeroAssetTotal,
}

impl From<AddressError> for BuildError {
    fn from(error: AddressError) -> Self {
        BuildError::InvalidAddress(error)
    }
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BuildError::InvalidAddress(error) => write!(f, "invalid address: {}", error),
            BuildError::InvalidValidity { first, last } => write!(f, "invalid validity window {}..={}", first, last),
            BuildError::FeeTooHigh { fee, max } => write!(f, "fee {} exceeds the maximum {}", fee, max),
            BuildError::FeeTooLow { fee, min } => write!(f, "fee {} is below the minimum {}", fee, min),
            BuildError::OutOfRange { field, value, max } => write!(f, "{} is {} but at most {} is allowed", field, value, max),
            BuildError::EmptyProgram(field) => write!(f, "{} is empty", field),
            BuildError::ZeroId(what) => write!(f, "{} id must not be zero", what),
            BuildError::ZeroAssetTotal => f.write_str("asset total must not be zero"),
        }
    }
}

impl std::error::Error for BuildError {}
