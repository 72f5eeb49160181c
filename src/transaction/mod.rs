//! Operation records.
//!
//! A [`Transaction`] is an immutable description of an intended ledger action. It can only be
//! produced by the [`builder::Builder`] and is consumed by [`crate::signer::sign`]. The only
//! mutation ever performed after building is assigning a group id which happens in
//! [`group::assign_group`] and must precede signing.

pub mod builder;
pub mod constants;
pub mod group;

use core::convert::TryFrom;
use core::fmt;
use data_encoding::BASE32_NOPAD;

use crate::address::{self, Address};
use crate::encoding::{self, EncodingVersion};
use constants::{OnComplete, TxType};
use group::GroupId;

pub use builder::{AssetParams, BuildError, Builder};

/// Domain separator prepended to the encoding before hashing or signing.
pub(crate) const TX_PREFIX: &[u8] = b"TX";

/// Content-derived transaction identifier.
///
/// This is SHA-512/256 of `"TX" || canonical encoding`.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct TxId([u8; 32]);

impl TxId {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        TxId(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&BASE32_NOPAD.encode(&self.0))
    }
}

impl fmt::Debug for TxId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "TxId({})", self)
    }
}

/// Storage allocation of an application.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct StateSchema {
    pub num_uints: u64,
    pub num_byte_slices: u64,
}

impl StateSchema {
    pub fn new(num_uints: u64, num_byte_slices: u64) -> Self {
        StateSchema { num_uints, num_byte_slices }
    }

    pub(crate) fn serialize(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.num_uints.to_be_bytes());
        out.extend_from_slice(&self.num_byte_slices.to_be_bytes());
    }

    pub(crate) fn deserialize(bytes: &mut &[u8]) -> Result<Self, encoding::UnexpectedEnd> {
        let num_uints = encoding::be(bytes)?;
        let num_byte_slices = encoding::be(bytes)?;
        Ok(StateSchema { num_uints, num_byte_slices })
    }
}

/// Fields shared by all transaction kinds.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Header {
    pub(crate) sender: Address,
    pub(crate) fee: u64,
    pub(crate) first_valid: u64,
    pub(crate) last_valid: u64,
    pub(crate) genesis_id: String,
    pub(crate) genesis_hash: [u8; 32],
    pub(crate) note: Vec<u8>,
    pub(crate) group: Option<GroupId>,
}

impl Header {
    pub fn sender(&self) -> &Address {
        &self.sender
    }

    pub fn fee(&self) -> u64 {
        self.fee
    }

    pub fn first_valid(&self) -> u64 {
        self.first_valid
    }

    pub fn last_valid(&self) -> u64 {
        self.last_valid
    }

    pub fn genesis_id(&self) -> &str {
        &self.genesis_id
    }

    pub fn genesis_hash(&self) -> &[u8; 32] {
        &self.genesis_hash
    }

    pub fn note(&self) -> &[u8] {
        &self.note
    }

    pub fn group(&self) -> Option<&GroupId> {
        self.group.as_ref()
    }

    fn serialize(&self, out: &mut Vec<u8>, group: Option<&GroupId>) {
        self.sender.serialize(out);
        out.extend_from_slice(&self.fee.to_be_bytes());
        out.extend_from_slice(&self.first_valid.to_be_bytes());
        out.extend_from_slice(&self.last_valid.to_be_bytes());
        encoding::put_byte_string(out, self.genesis_id.as_bytes());
        out.extend_from_slice(&self.genesis_hash);
        encoding::put_byte_string(out, &self.note);
        encoding::put_optional_array32(out, group.map(GroupId::as_bytes));
    }

    fn deserialize(bytes: &mut &[u8]) -> Result<Self, DecodeError> {
        let sender = Address::deserialize(bytes)?;
        let fee = encoding::be(bytes)?;
        let first_valid = encoding::be(bytes)?;
        let last_valid = encoding::be(bytes)?;
        let genesis_id = encoding::utf8_string(bytes)?;
        let genesis_hash = encoding::array32(bytes)?;
        let note = encoding::byte_string(bytes)?;
        let group = encoding::optional_array32(bytes)?.map(GroupId::from_bytes);

        Ok(Header { sender, fee, first_valid, last_valid, genesis_id, genesis_hash, note, group })
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Payment {
    pub receiver: Address,
    pub amount: u64,
    /// Receives the remaining balance, closing the sender's account.
    pub close_remainder_to: Option<Address>,
}

/// Creation of a new asset.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct AssetConfig {
    pub total: u64,
    pub decimals: u32,
    pub default_frozen: bool,
    pub unit_name: String,
    pub asset_name: String,
    pub url: String,
    pub manager: Option<Address>,
    pub reserve: Option<Address>,
    pub freeze: Option<Address>,
    pub clawback: Option<Address>,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct AssetTransfer {
    pub asset_id: u64,
    pub amount: u64,
    pub receiver: Address,
}

/// Call of an application, or its creation when `app_id` is zero.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ApplicationCall {
    pub app_id: u64,
    pub on_complete: OnComplete,
    pub approval_program: Vec<u8>,
    pub clear_program: Vec<u8>,
    pub global_schema: StateSchema,
    pub local_schema: StateSchema,
    pub app_args: Vec<Vec<u8>>,
    pub foreign_assets: Vec<u64>,
}

/// Kind-specific payload of a transaction.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Kind {
    Payment(Payment),
    AssetConfig(AssetConfig),
    AssetTransfer(AssetTransfer),
    ApplicationCall(ApplicationCall),
}

impl Kind {
    pub fn tx_type(&self) -> TxType {
        match self {
            Kind::Payment(_) => TxType::Payment,
            Kind::AssetConfig(_) => TxType::AssetConfig,
            Kind::AssetTransfer(_) => TxType::AssetTransfer,
            Kind::ApplicationCall(_) => TxType::ApplicationCall,
        }
    }

    fn serialize(&self, out: &mut Vec<u8>) {
        match self {
            Kind::Payment(payment) => {
                payment.receiver.serialize(out);
                out.extend_from_slice(&payment.amount.to_be_bytes());
                encoding::put_optional_array32(out, payment.close_remainder_to.as_ref().map(Address::as_bytes));
            },
            Kind::AssetConfig(config) => {
                out.extend_from_slice(&config.total.to_be_bytes());
                out.extend_from_slice(&config.decimals.to_be_bytes());
                out.push(config.default_frozen as u8);
                encoding::put_byte_string(out, config.unit_name.as_bytes());
                encoding::put_byte_string(out, config.asset_name.as_bytes());
                encoding::put_byte_string(out, config.url.as_bytes());
                for role in &[config.manager, config.reserve, config.freeze, config.clawback] {
                    encoding::put_optional_array32(out, role.as_ref().map(Address::as_bytes));
                }
            },
            Kind::AssetTransfer(transfer) => {
                out.extend_from_slice(&transfer.asset_id.to_be_bytes());
                out.extend_from_slice(&transfer.amount.to_be_bytes());
                transfer.receiver.serialize(out);
            },
            Kind::ApplicationCall(call) => {
                out.extend_from_slice(&call.app_id.to_be_bytes());
                out.push(call.on_complete as u8);
                encoding::put_byte_string(out, &call.approval_program);
                encoding::put_byte_string(out, &call.clear_program);
                call.global_schema.serialize(out);
                call.local_schema.serialize(out);
                // counts are bounded by the builder
                out.push(call.app_args.len() as u8);
                for arg in &call.app_args {
                    encoding::put_byte_string(out, arg);
                }
                out.push(call.foreign_assets.len() as u8);
                for asset in &call.foreign_assets {
                    out.extend_from_slice(&asset.to_be_bytes());
                }
            },
        }
    }

    fn deserialize(tx_type: TxType, bytes: &mut &[u8]) -> Result<Self, DecodeError> {
        match tx_type {
            TxType::Payment => {
                let receiver = Address::deserialize(bytes)?;
                let amount = encoding::be(bytes)?;
                let close_remainder_to = encoding::optional_array32(bytes)?.map(Address::from_bytes);
                Ok(Kind::Payment(Payment { receiver, amount, close_remainder_to }))
            },
            TxType::AssetConfig => {
                let total = encoding::be(bytes)?;
                let decimals = encoding::be(bytes)?;
                let default_frozen = match encoding::be::<u8>(bytes)? {
                    0 => false,
                    1 => true,
                    flag => return Err(DecodeError::InvalidFlag(flag)),
                };
                let unit_name = encoding::utf8_string(bytes)?;
                let asset_name = encoding::utf8_string(bytes)?;
                let url = encoding::utf8_string(bytes)?;
                let mut roles = [None; 4];
                for role in &mut roles {
                    *role = encoding::optional_array32(bytes)?.map(Address::from_bytes);
                }
                let [manager, reserve, freeze, clawback] = roles;
                Ok(Kind::AssetConfig(AssetConfig { total, decimals, default_frozen, unit_name, asset_name, url, manager, reserve, freeze, clawback }))
            },
            TxType::AssetTransfer => {
                let asset_id = encoding::be(bytes)?;
                let amount = encoding::be(bytes)?;
                let receiver = Address::deserialize(bytes)?;
                Ok(Kind::AssetTransfer(AssetTransfer { asset_id, amount, receiver }))
            },
            TxType::ApplicationCall => {
                let app_id = encoding::be(bytes)?;
                let on_complete = encoding::be::<u8>(bytes)?;
                let on_complete = OnComplete::try_from(on_complete).map_err(|error| DecodeError::UnknownOnComplete(error.0))?;
                let approval_program = encoding::byte_string(bytes)?;
                let clear_program = encoding::byte_string(bytes)?;
                let global_schema = StateSchema::deserialize(bytes)?;
                let local_schema = StateSchema::deserialize(bytes)?;
                let arg_count = encoding::be::<u8>(bytes)?;
                let app_args = (0..arg_count)
                    .map(|_| encoding::byte_string(bytes))
                    .collect::<Result<Vec<_>, _>>()?;
                let asset_count = encoding::be::<u8>(bytes)?;
                let foreign_assets = (0..asset_count)
                    .map(|_| encoding::be::<u64>(bytes))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Kind::ApplicationCall(ApplicationCall {
                    app_id,
                    on_complete,
                    approval_program,
                    clear_program,
                    global_schema,
                    local_schema,
                    app_args,
                    foreign_assets,
                }))
            },
        }
    }
}

/// Unsigned operation record.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Transaction {
    pub(crate) header: Header,
    pub(crate) kind: Kind,
}

impl Transaction {
    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn kind(&self) -> &Kind {
        &self.kind
    }

    pub fn sender(&self) -> &Address {
        &self.header.sender
    }

    /// Writes the canonical encoding.
    pub fn serialize(&self, out: &mut Vec<u8>) {
        self.serialize_with_group(out, self.header.group.as_ref());
    }

    fn serialize_with_group(&self, out: &mut Vec<u8>, group: Option<&GroupId>) {
        EncodingVersion::CURRENT.serialize(out);
        out.push(self.kind.tx_type() as u8);
        self.header.serialize(out, group);
        self.kind.serialize(out);
    }

    pub fn deserialize(bytes: &mut &[u8]) -> Result<Self, DecodeError> {
        let _version = EncodingVersion::deserialize(bytes)?;
        let tx_type = encoding::be::<u8>(bytes)?;
        let tx_type = TxType::try_from(tx_type).map_err(|error| DecodeError::UnknownType(error.0))?;
        let header = Header::deserialize(bytes)?;
        let kind = Kind::deserialize(tx_type, bytes)?;
        Ok(Transaction { header, kind })
    }

    /// Returns the bytes a signature commits to.
    pub fn signing_message(&self) -> Vec<u8> {
        let mut message = TX_PREFIX.to_vec();
        self.serialize(&mut message);
        message
    }

    pub fn id(&self) -> TxId {
        TxId(address::sha512_256(&[&self.signing_message()]))
    }

    /// The id this transaction had before it was assigned to a group.
    pub(crate) fn ungrouped_id(&self) -> TxId {
        let mut message = TX_PREFIX.to_vec();
        self.serialize_with_group(&mut message, None);
        TxId(address::sha512_256(&[&message]))
    }

    pub(crate) fn encoded_len(&self) -> usize {
        let mut buf = Vec::new();
        self.serialize(&mut buf);
        buf.len()
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum DecodeError {
    UnexpectedEnd,
    UnsupportedVersion(u8),
    UnknownType(u8),
    UnknownOnComplete(u8),
    InvalidFlag(u8),
    InvalidString,
    InvalidSignature,
}

impl From<encoding::UnexpectedEnd> for DecodeError {
    fn from(_: encoding::UnexpectedEnd) -> Self {
        DecodeError::UnexpectedEnd
    }
}

impl From<encoding::VersionDeserError> for DecodeError {
    fn from(error: encoding::VersionDeserError) -> Self {
        match error {
            encoding::VersionDeserError::UnexpectedEnd => DecodeError::UnexpectedEnd,
            encoding::VersionDeserError::UnsupportedVersion(version) => DecodeError::UnsupportedVersion(version),
        }
    }
}

impl From<encoding::InvalidString> for DecodeError {
    fn from(error: encoding::InvalidString) -> Self {
        match error {
            encoding::InvalidString::UnexpectedEnd => DecodeError::UnexpectedEnd,
            encoding::InvalidString::NotUtf8 => DecodeError::InvalidString,
        }
    }
}

impl From<encoding::InvalidFlag> for DecodeError {
    fn from(error: encoding::InvalidFlag) -> Self {
        match error {
            encoding::InvalidFlag::UnexpectedEnd => DecodeError::UnexpectedEnd,
            encoding::InvalidFlag::Value(flag) => DecodeError::InvalidFlag(flag),
        }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DecodeError::UnexpectedEnd => f.write_str("unexpected end of transaction bytes"),
            DecodeError::UnsupportedVersion(version) => write!(f, "unsupported encoding version {}", version),
            DecodeError::UnknownType(tx_type) => write!(f, "unknown transaction type {}", tx_type),
            DecodeError::UnknownOnComplete(code) => write!(f, "unknown on-complete action {}", code),
            DecodeError::InvalidFlag(flag) => write!(f, "invalid flag byte {}", flag),
            DecodeError::InvalidString => f.write_str("string field is not UTF-8"),
            DecodeError::InvalidSignature => f.write_str("signature doesn't verify"),
        }
    }
}

impl std::error::Error for DecodeError {}

#[cfg(test)]
pub(crate) mod tests {
    use crate::address::Address;
    use crate::node::SuggestedParams;
    use super::constants::OnComplete;
    use super::{Builder, Kind, StateSchema, Transaction};

    pub(crate) fn params() -> SuggestedParams {
        SuggestedParams {
            fee: 0,
            min_fee: 1000,
            flat_fee: false,
            first_valid: 1000,
            last_valid: 2000,
            genesis_id: "testnet-v1.0".to_owned(),
            genesis_hash: [7; 32],
        }
    }

    fn app_call() -> Transaction {
        Builder::new(&params())
            .note(b"garbage can".to_vec())
            .app_noop(Address::from_bytes([1; 32]), 42, vec![7u64.to_be_bytes().to_vec()], vec![7])
            .unwrap()
    }

    #[test]
    fn decodes_application_call() {
        let tx = app_call();
        let mut bytes = Vec::new();
        tx.serialize(&mut bytes);
        let mut cursor = &*bytes;
        let decoded = Transaction::deserialize(&mut cursor).unwrap();
        assert!(cursor.is_empty());
        assert_eq!(decoded, tx);
        match decoded.kind() {
            Kind::ApplicationCall(call) => {
                assert_eq!(call.on_complete, OnComplete::NoOp);
                assert_eq!(call.foreign_assets, [7]);
                assert_eq!(call.global_schema, StateSchema::default());
            },
            other => panic!("unexpected kind {:?}", other),
        }
    }

    #[test]
    fn id_depends_on_content() {
        let tx = app_call();
        let other = Builder::new(&params())
            .app_noop(Address::from_bytes([1; 32]), 43, Vec::new(), Vec::new())
            .unwrap();
        assert_eq!(tx.id(), tx.clone().id());
        assert_ne!(tx.id(), other.id());
        assert_eq!(tx.id(), tx.ungrouped_id());
        assert_eq!(tx.id().to_string().len(), 52);
    }

    #[test]
    fn rejects_unknown_type() {
        let mut bytes = Vec::new();
        app_call().serialize(&mut bytes);
        bytes[1] = 9;
        assert_eq!(Transaction::deserialize(&mut &*bytes), Err(super::DecodeError::UnknownType(9)));
    }

    quickcheck::quickcheck! {
        fn garbage_doesnt_panic(modify: Vec<(usize, u8)>, truncate: usize) -> bool {
            let mut bytes = Vec::new();
            app_call().serialize(&mut bytes);
            for (pos, byte) in modify {
                let pos = pos % bytes.len();
                bytes[pos] = byte;
            }
            bytes.truncate(truncate % (bytes.len() + 1));
            let _ = Transaction::deserialize(&mut &*bytes);
            true
        }
    }
}
