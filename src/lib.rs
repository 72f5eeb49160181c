//! Submit-and-confirm kernel for application ledger nodes.
//!
//! This crate builds operation records, signs them, submits them alone or as atomic groups and
//! waits for them to be confirmed. The node itself is abstracted behind [`node::Node`] so the
//! crate contains no networking.
//!
//! A typical flow is [`transaction::Builder`] -> [`signer::sign`] -> [`submit::submit`] ->
//! [`confirmation::wait_for_confirmation`]. [`deploy`] packs this flow for creating applications
//! and assets.
//!
//! Everything that talks to the node takes an explicit [`slog::Logger`]. Secrets are never
//! logged.

pub mod address;
pub mod encoding;
pub mod transaction;
pub mod signer;
pub mod node;
pub mod submit;
pub mod confirmation;
pub mod compile;
pub mod artifacts;
pub mod config;
pub mod deploy;

pub use address::Address;
pub use transaction::{Transaction, TxId};
