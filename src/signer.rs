//! Signing of operation records.
//!
//! Signing is delegated to `ed25519-dalek`. The signing key lives inside [`Credential`] which
//! wipes it when dropped and never prints it.

use core::convert::TryInto;
use core::fmt;
use ed25519_dalek::{Signer as _, SigningKey, Verifier as _, VerifyingKey};
use rand::{CryptoRng, RngCore};
use zeroize::Zeroizing;

use crate::address::Address;
use crate::encoding;
use crate::transaction::{DecodeError, Transaction, TxId};

/// Private signing key controlling an account.
pub struct Credential {
    key: SigningKey,
}

impl Credential {
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Credential { key: SigningKey::generate(rng) }
    }

    pub fn from_seed(seed: [u8; 32]) -> Self {
        let seed = Zeroizing::new(seed);
        Credential { key: SigningKey::from_bytes(&seed) }
    }

    /// Parses the base64 form of `seed || public key` used by node tooling.
    pub fn from_base64(encoded: &str) -> Result<Self, CredentialError> {
        let decoded = Zeroizing::new(base64::decode(encoded.trim()).map_err(|_| CredentialError::InvalidEncoding)?);
        if decoded.len() != 64 {
            return Err(CredentialError::InvalidLength(decoded.len()));
        }
        let seed: Zeroizing<[u8; 32]> = Zeroizing::new(decoded[..32].try_into().expect("length checked above"));
        let credential = Credential { key: SigningKey::from_bytes(&seed) };
        if credential.key.verifying_key().as_bytes()[..] != decoded[32..] {
            return Err(CredentialError::PublicKeyMismatch);
        }
        Ok(credential)
    }

    pub fn address(&self) -> Address {
        Address::from_bytes(self.key.verifying_key().to_bytes())
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Credential")
            .field("address", &self.address())
            .finish()
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum CredentialError {
    InvalidEncoding,
    InvalidLength(usize),
    PublicKeyMismatch,
}

impl fmt::Display for CredentialError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CredentialError::InvalidEncoding => f.write_str("credential is not valid base64"),
            CredentialError::InvalidLength(len) => write!(f, "credential has {} bytes, expected 64", len),
            CredentialError::PublicKeyMismatch => f.write_str("public key doesn't belong to the private key"),
        }
    }
}

impl std::error::Error for CredentialError {}

/// Transaction together with the signature of its sender.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SignedTransaction {
    transaction: Transaction,
    signature: [u8; 64],
    id: TxId,
}

impl SignedTransaction {
    pub fn transaction(&self) -> &Transaction {
        &self.transaction
    }

    pub fn signature(&self) -> &[u8; 64] {
        &self.signature
    }

    pub fn id(&self) -> TxId {
        self.id
    }

    /// Writes the submission encoding.
    pub fn serialize(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.signature);
        self.transaction.serialize(out);
    }

    /// Reads the submission encoding and checks the signature.
    pub fn deserialize(bytes: &mut &[u8]) -> Result<Self, DecodeError> {
        let signature = encoding::array64(bytes)?;
        let transaction = Transaction::deserialize(bytes)?;
        let signed = SignedTransaction { id: transaction.id(), transaction, signature };
        if !signed.verify() {
            return Err(DecodeError::InvalidSignature);
        }
        Ok(signed)
    }

    /// Checks that the signature was made by the sender.
    pub fn verify(&self) -> bool {
        let key = match VerifyingKey::from_bytes(self.transaction.sender().as_bytes()) {
            Ok(key) => key,
            Err(_) => return false,
        };
        let signature = ed25519_dalek::Signature::from_bytes(&self.signature);
        key.verify(&self.transaction.signing_message(), &signature).is_ok()
    }
}

/// Signs `transaction`, consuming it.
///
/// Deterministic: the same transaction and credential always produce the same bytes.
pub fn sign(transaction: Transaction, credential: &Credential) -> Result<SignedTransaction, SignError> {
    let signer = credential.address();
    if *transaction.sender() != signer {
        return Err(SignError::SenderMismatch { sender: *transaction.sender(), signer });
    }
    let signature = credential.key.sign(&transaction.signing_message()).to_bytes();
    let id = transaction.id();
    Ok(SignedTransaction { transaction, signature, id })
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum SignError {
    SenderMismatch { sender: Address, signer: Address },
}

impl fmt::Display for SignError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SignError::SenderMismatch { sender, signer } => write!(f, "transaction is sent by {} but the credential belongs to {}", sender, signer),
        }
    }
}

impl std::error::Error for SignError {}
