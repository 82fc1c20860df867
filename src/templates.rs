//! Code of the transactions and scripts the client sends on its own behalf.
//!
//! The embedded ledger recognises these by the hash of their text, so they must not be
//! reformatted.

/// Creates an account funded by the signer.
/// Arguments: public key hex, signature algorithm name, hash algorithm name.
pub const TX_CREATE_ACCOUNT: &str = r#"
transaction(publicKey: String, signatureAlgorithm: String, hashAlgorithm: String) {
    prepare(signer: AuthAccount) {
        let account = AuthAccount(payer: signer)
        account.keys.add(
            publicKey: PublicKey(
                publicKey: publicKey.decodeHex(),
                signatureAlgorithm: SignatureAlgorithm.fromName(signatureAlgorithm)
            ),
            hashAlgorithm: HashAlgorithm.fromName(hashAlgorithm),
            weight: 1000.0
        )
    }
}"#;

/// Deploys a contract to the signer. Arguments: name, code hex.
pub const TX_CONTRACT_DEPLOY: &str = r#"
transaction(name: String, code: String) {
    prepare(signer: AuthAccount) {
        signer.contracts.add(name: name, code: code.decodeHex())
    }
}"#;

/// Replaces a contract deployed to the signer. Arguments: name, code hex.
pub const TX_CONTRACT_UPDATE: &str = r#"
transaction(name: String, code: String) {
    prepare(signer: AuthAccount) {
        signer.contracts.update__experimental(name: name, code: code.decodeHex())
    }
}"#;

/// Removes a contract from the signer. Arguments: name.
pub const TX_CONTRACT_REMOVE: &str = r#"
transaction(name: String) {
    prepare(signer: AuthAccount) {
        signer.contracts.remove(name: name)
    }
}"#;

/// Whether `name` is deployed at `address`. Arguments: address, name.
pub const SC_CONTRACT_CHECK: &str = r#"
pub fun main(address: Address, name: String): Bool {
    return getAccount(address).contracts.get(name: name) != nil
}"#;

/// Names of the contracts deployed at `address`. Arguments: address.
pub const SC_CONTRACT_NAMES: &str = r#"
pub fun main(address: Address): [String] {
    return getAccount(address).contracts.names
}"#;
