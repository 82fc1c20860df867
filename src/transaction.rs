use crate::{account::Account, address::Address, values::Value};
use thiserror::Error;

pub mod encoding;


/// Gas limit used when none is configured
pub const DEFAULT_GAS_LIMIT: u64 = 9999;

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("Failed to encode transaction: {0}")]
    Encoding(String),
}

#[allow(missing_docs)]
pub type TransactionResult<T> = Result<T, TransactionError>;

/// Unit of work being assembled, before any signature is attached.
///
/// The proposer is also the payer and the only authorizer until told otherwise. Setting a
/// payer or a proposer adds that account to the authorizers, since it has to co-sign. The
/// payer is kept last so that it signs the envelope.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnsignedTransaction {
    code: Vec<u8>,
    arguments: Vec<Value>,
    proposer: Account,
    payer: Account,
    authorizers: Vec<Account>,
    gas_limit: u64,
}

impl UnsignedTransaction {
    /// Transaction running `code`, proposed, paid and authorized by `proposer`
    pub fn new(code: Vec<u8>, proposer: Account) -> Self {
        UnsignedTransaction {
            code,
            arguments: Vec::new(),
            payer: proposer.clone(),
            authorizers: vec![proposer.clone()],
            proposer,
            gas_limit: DEFAULT_GAS_LIMIT,
        }
    }

    /// Make `payer` pay. The payer is moved to the end of the authorizers so that it is the
    /// one signing the envelope.
    pub fn with_payer(mut self, payer: Account) -> Self {
        self.authorizers.retain(|a| a != &payer);
        self.authorizers.push(payer.clone());
        self.payer = payer;
        self
    }

    /// Make `proposer` propose. Added to the authorizers, ahead of the payer, if not already
    /// one.
    pub fn with_proposer(mut self, proposer: Account) -> Self {
        if !self.authorizers.contains(&proposer) {
            let at = self
                .authorizers
                .iter()
                .position(|a| a == &self.payer)
                .unwrap_or(self.authorizers.len());
            self.authorizers.insert(at, proposer.clone());
        }
        self.proposer = proposer;
        self
    }

    /// Replace the authorizers. The list is taken as given, in order, and must still hold the
    /// proposer and the payer by the time it is signed.
    pub fn with_authorizers(mut self, authorizers: Vec<Account>) -> Self {
        self.authorizers = authorizers;
        self
    }

    #[allow(missing_docs)]
    pub fn add_authorizer(mut self, authorizer: Account) -> Self {
        self.authorizers.push(authorizer);
        self
    }

    /// Replace the arguments
    pub fn with_arguments(mut self, arguments: Vec<Value>) -> Self {
        self.arguments = arguments;
        self
    }

    #[allow(missing_docs)]
    pub fn add_argument<V: Into<Value>>(mut self, argument: V) -> Self {
        self.arguments.push(argument.into());
        self
    }

    #[allow(missing_docs)]
    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = gas_limit;
        self
    }

    #[allow(missing_docs)]
    pub fn code(&self) -> &[u8] {
        &self.code
    }

    #[allow(missing_docs)]
    pub fn arguments(&self) -> &[Value] {
        &self.arguments
    }

    #[allow(missing_docs)]
    pub fn proposer(&self) -> &Account {
        &self.proposer
    }

    #[allow(missing_docs)]
    pub fn payer(&self) -> &Account {
        &self.payer
    }

    #[allow(missing_docs)]
    pub fn authorizers(&self) -> &[Account] {
        &self.authorizers
    }

    #[allow(missing_docs)]
    pub fn gas_limit(&self) -> u64 {
        self.gas_limit
    }

    /// Canonical payload bytes
    pub fn payload(&self) -> TransactionResult<Vec<u8>> {
        encoding::encode_payload(self)
    }

    /// Canonical envelope bytes for the given proposer sequence number
    pub fn envelope(&self, sequence_number: u64) -> TransactionResult<Vec<u8>> {
        encoding::encode_envelope(self, sequence_number)
    }
}

/// Which canonical encoding a signature covers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SignatureScope {
    #[allow(missing_docs)]
    Payload,
    #[allow(missing_docs)]
    Envelope,
}

/// One signature attached to a transaction
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionSignature {
    /// Signing account
    pub address: Address,
    /// Key on the signing account
    pub key_index: u32,
    /// Raw `r || s` signature
    pub signature: Vec<u8>,
    #[allow(missing_docs)]
    pub scope: SignatureScope,
}

/// Fully signed transaction, ready to be submitted once
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedTransaction {
    transaction: UnsignedTransaction,
    sequence_number: u64,
    payload: Vec<u8>,
    envelope: Vec<u8>,
    signatures: Vec<TransactionSignature>,
}

impl SignedTransaction {
    pub(crate) fn new(
        transaction: UnsignedTransaction,
        sequence_number: u64,
        payload: Vec<u8>,
        envelope: Vec<u8>,
        signatures: Vec<TransactionSignature>,
    ) -> Self {
        SignedTransaction {
            transaction,
            sequence_number,
            payload,
            envelope,
            signatures,
        }
    }

    /// The transaction that was signed
    pub fn transaction(&self) -> &UnsignedTransaction {
        &self.transaction
    }

    /// Proposer sequence number the envelope was built with
    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    #[allow(missing_docs)]
    pub fn payload_bytes(&self) -> &[u8] {
        &self.payload
    }

    #[allow(missing_docs)]
    pub fn envelope_bytes(&self) -> &[u8] {
        &self.envelope
    }

    /// All signatures, in the order they were computed
    pub fn signatures(&self) -> &[TransactionSignature] {
        &self.signatures
    }

    /// Signatures over the payload only
    pub fn payload_signatures(&self) -> impl Iterator<Item = &TransactionSignature> {
        self.signatures
            .iter()
            .filter(|s| s.scope == SignatureScope::Payload)
    }

    /// Signatures over the envelope
    pub fn envelope_signatures(&self) -> impl Iterator<Item = &TransactionSignature> {
        self.signatures
            .iter()
            .filter(|s| s.scope == SignatureScope::Envelope)
    }

    /// Hex transaction id, derived from the envelope and the signatures
    pub fn id(&self) -> TransactionResult<String> {
        encoding::transaction_id(&self.envelope, &self.signatures)
    }
}
