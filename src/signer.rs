//! Multi-party signing of an [`UnsignedTransaction`].
//!
//! Authorizers are visited from the last to the first. The last authorizer signs the envelope
//! and everybody else signs the payload. Every signer is resolved before the first signature
//! is computed, and any failure aborts the whole operation, so a partially signed
//! transaction is never produced.

use crate::{
    account::Account,
    address::Address,
    keys::{HashAlgorithm, KeyError, SignatureAlgorithm, Signer, TRANSACTION_DOMAIN_TAG},
    transaction::{
        SignatureScope, SignedTransaction, TransactionError, TransactionSignature,
        UnsignedTransaction,
    },
};
use thiserror::Error;
use tracing::debug;


#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum SigningError {
    #[error("Transaction has no authorizers")]
    EmptyAuthorizers,
    #[error("Transaction has no proposer")]
    NoProposer,
    #[error("Proposer {0} is not among the authorizers")]
    ProposerNotAuthorizer(Address),
    #[error("Payer {0} is not among the authorizers")]
    PayerNotAuthorizer(Address),
    #[error("Account {0} has no key to sign with")]
    Unqualified(Address),
    #[error("Could not sign for account {address}: {source}")]
    Key { address: Address, source: KeyError },
    #[error("Could not encode transaction for signing: {0}")]
    Encoding(#[from] TransactionError),
}

#[allow(missing_docs)]
pub type SigningResult<T> = Result<T, SigningError>;

/// Finds the [`Signer`] for an account
pub trait SignerResolver: Send + Sync {
    /// Signer for `account`, or why there is none
    fn resolve(&self, account: &Account) -> SigningResult<Box<dyn Signer>>;
}

/// Resolves signers from the keys carried by the accounts themselves, falling back to the
/// session algorithms for keys that do not declare their own
#[derive(Clone, Copy, Debug, Default)]
pub struct KeyResolver {
    signature_algorithm: SignatureAlgorithm,
    hash_algorithm: HashAlgorithm,
}

impl KeyResolver {
    #[allow(missing_docs)]
    pub fn new(signature_algorithm: SignatureAlgorithm, hash_algorithm: HashAlgorithm) -> Self {
        KeyResolver {
            signature_algorithm,
            hash_algorithm,
        }
    }
}

impl SignerResolver for KeyResolver {
    fn resolve(&self, account: &Account) -> SigningResult<Box<dyn Signer>> {
        let key = account
            .key()
            .ok_or_else(|| SigningError::Unqualified(account.address()))?;
        let signer = key
            .signer(self.signature_algorithm, self.hash_algorithm)
            .map_err(|source| SigningError::Key {
                address: account.address(),
                source,
            })?;
        Ok(Box::new(signer))
    }
}

/// Reject transactions that cannot be signed at all, before touching any key
pub fn check_authorizers(tx: &UnsignedTransaction) -> SigningResult<()> {
    let authorizers = tx.authorizers();
    if authorizers.is_empty() {
        return Err(SigningError::EmptyAuthorizers);
    }
    if !authorizers.contains(tx.proposer()) {
        return Err(SigningError::ProposerNotAuthorizer(tx.proposer().address()));
    }
    if !authorizers.contains(tx.payer()) {
        return Err(SigningError::PayerNotAuthorizer(tx.payer().address()));
    }
    Ok(())
}

/// Sign `tx` for the given proposer sequence number
pub fn sign_at_sequence<R: SignerResolver + ?Sized>(
    tx: UnsignedTransaction,
    sequence_number: u64,
    resolver: &R,
) -> SigningResult<SignedTransaction> {
    check_authorizers(&tx)?;
    let signers = tx
        .authorizers()
        .iter()
        .map(|account| {
            let signer = resolver.resolve(account)?;
            Ok((account.address(), account.key_index(), signer))
        })
        .collect::<SigningResult<Vec<_>>>()?;

    let payload = tx.payload()?;
    let envelope = tx.envelope(sequence_number)?;
    let envelope_position = signers.len() - 1;

    let mut signatures = Vec::with_capacity(signers.len());
    for (position, (address, key_index, signer)) in signers.iter().enumerate().rev() {
        let (scope, message) = if position == envelope_position {
            (SignatureScope::Envelope, &envelope)
        } else {
            (SignatureScope::Payload, &payload)
        };
        debug!(%address, key_index, ?scope, "signing transaction");
        let signature = signer
            .sign(TRANSACTION_DOMAIN_TAG, message)
            .map_err(|source| SigningError::Key {
                address: *address,
                source,
            })?;
        signatures.push(TransactionSignature {
            address: *address,
            key_index: *key_index,
            signature,
            scope,
        });
    }

    Ok(SignedTransaction::new(
        tx,
        sequence_number,
        payload,
        envelope,
        signatures,
    ))
}
