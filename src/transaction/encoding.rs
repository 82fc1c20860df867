//! Canonical CBOR encodings of the payload, the envelope and the transaction id.
//!
//! Payload: `[code, [arguments], proposer, proposer key index, [authorizers], gas limit]`
//! Envelope: `[payload, payer, sequence number]`
//! Id: `sha3_256([envelope, [[address, key index, signature, scope]]])`

use super::{
    SignatureScope, TransactionError, TransactionResult, TransactionSignature,
    UnsignedTransaction,
};
use minicbor::{encode, Encoder};
use sha3::{Digest, Sha3_256};
use std::convert::Infallible;

fn encoding_error(e: encode::Error<Infallible>) -> TransactionError {
    TransactionError::Encoding(e.to_string())
}

fn payload_into(
    e: &mut Encoder<Vec<u8>>,
    tx: &UnsignedTransaction,
) -> Result<(), encode::Error<Infallible>> {
    e.array(6)?;
    e.bytes(tx.code())?;
    e.array(tx.arguments().len() as u64)?;
    for argument in tx.arguments() {
        argument.encode(e)?;
    }
    e.bytes(tx.proposer().address().as_bytes())?
        .u32(tx.proposer().key_index())?;
    e.array(tx.authorizers().len() as u64)?;
    for authorizer in tx.authorizers() {
        e.bytes(authorizer.address().as_bytes())?;
    }
    e.u64(tx.gas_limit())?;
    Ok(())
}

/// Bytes every non-envelope authorizer signs
pub fn encode_payload(tx: &UnsignedTransaction) -> TransactionResult<Vec<u8>> {
    let mut e = Encoder::new(Vec::new());
    payload_into(&mut e, tx).map_err(encoding_error)?;
    Ok(e.into_writer())
}

/// Bytes the last authorizer signs
pub fn encode_envelope(
    tx: &UnsignedTransaction,
    sequence_number: u64,
) -> TransactionResult<Vec<u8>> {
    let mut e = Encoder::new(Vec::new());
    e.array(3).map_err(encoding_error)?;
    payload_into(&mut e, tx).map_err(encoding_error)?;
    e.bytes(tx.payer().address().as_bytes())
        .and_then(|e| e.u64(sequence_number))
        .map_err(encoding_error)?;
    Ok(e.into_writer())
}

fn scope_tag(scope: SignatureScope) -> u8 {
    match scope {
        SignatureScope::Payload => 0,
        SignatureScope::Envelope => 1,
    }
}

fn id_preimage_into(
    e: &mut Encoder<Vec<u8>>,
    envelope: &[u8],
    signatures: &[TransactionSignature],
) -> Result<(), encode::Error<Infallible>> {
    e.array(2)?.bytes(envelope)?.array(signatures.len() as u64)?;
    for sig in signatures {
        e.array(4)?
            .bytes(sig.address.as_bytes())?
            .u32(sig.key_index)?
            .bytes(&sig.signature)?
            .u8(scope_tag(sig.scope))?;
    }
    Ok(())
}

/// Hex encoded SHA3-256 over the envelope and the signatures
pub fn transaction_id(
    envelope: &[u8],
    signatures: &[TransactionSignature],
) -> TransactionResult<String> {
    let mut e = Encoder::new(Vec::new());
    id_preimage_into(&mut e, envelope, signatures).map_err(encoding_error)?;
    Ok(hex::encode(Sha3_256::digest(e.into_writer())))
}
