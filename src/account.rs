use crate::{
    address::Address,
    keys::{HashAlgorithm, InMemorySigner, KeyResult, PrivateKey, SignatureAlgorithm},
};
use secrecy::{ExposeSecret, Secret};
use std::{fmt, sync::Arc};

/// Signing key attached to an [`Account`].
///
/// Algorithms left unset fall back to the session defaults when a signer is resolved.
#[derive(Clone)]
pub struct AccountKey {
    private_key: Arc<Secret<String>>,
    index: u32,
    signature_algorithm: Option<SignatureAlgorithm>,
    hash_algorithm: Option<HashAlgorithm>,
}

impl AccountKey {
    /// Key at index 0 with default algorithms
    pub fn new(private_key_hex: &str) -> Self {
        AccountKey {
            private_key: Arc::new(Secret::new(private_key_hex.to_string())),
            index: 0,
            signature_algorithm: None,
            hash_algorithm: None,
        }
    }

    #[allow(missing_docs)]
    pub fn with_index(mut self, index: u32) -> Self {
        self.index = index;
        self
    }

    #[allow(missing_docs)]
    pub fn with_signature_algorithm(mut self, algorithm: SignatureAlgorithm) -> Self {
        self.signature_algorithm = Some(algorithm);
        self
    }

    #[allow(missing_docs)]
    pub fn with_hash_algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.hash_algorithm = Some(algorithm);
        self
    }

    /// Key index on the account
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Declared curve, if any
    pub fn signature_algorithm(&self) -> Option<SignatureAlgorithm> {
        self.signature_algorithm
    }

    /// Declared hash, if any
    pub fn hash_algorithm(&self) -> Option<HashAlgorithm> {
        self.hash_algorithm
    }

    /// Decode the private key, using `default_algorithm` if none is declared
    pub fn private_key(&self, default_algorithm: SignatureAlgorithm) -> KeyResult<PrivateKey> {
        let algorithm = self.signature_algorithm.unwrap_or(default_algorithm);
        PrivateKey::from_hex(algorithm, self.private_key.expose_secret())
    }

    /// Build an in-memory signer for this key
    pub fn signer(
        &self,
        default_signature: SignatureAlgorithm,
        default_hash: HashAlgorithm,
    ) -> KeyResult<InMemorySigner> {
        let key = self.private_key(default_signature)?;
        let hash = self.hash_algorithm.unwrap_or(default_hash);
        Ok(InMemorySigner::new(key, hash))
    }
}

impl fmt::Debug for AccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountKey")
            .field("private_key", &"<redacted>")
            .field("index", &self.index)
            .field("signature_algorithm", &self.signature_algorithm)
            .field("hash_algorithm", &self.hash_algorithm)
            .finish()
    }
}

/// A ledger account as known to the client: an address and, optionally, a key that can sign
/// for it. Accounts without a key are "unqualified": they can be the subject of a transaction
/// but cannot authorize one.
#[derive(Clone, Debug)]
pub struct Account {
    address: Address,
    key: Option<AccountKey>,
}

impl Account {
    /// Account that can sign
    pub fn new(address: Address, key: AccountKey) -> Self {
        Account {
            address,
            key: Some(key),
        }
    }

    /// Account without a private key
    pub fn new_unqualified(address: Address) -> Self {
        Account { address, key: None }
    }

    /// Getter for the address
    pub fn address(&self) -> Address {
        self.address
    }

    /// Getter for the key, if there is one
    pub fn key(&self) -> Option<&AccountKey> {
        self.key.as_ref()
    }

    /// Index of the key used for signing, defaulting to the first key
    pub fn key_index(&self) -> u32 {
        self.key.as_ref().map(|k| k.index()).unwrap_or_default()
    }

    /// Whether this account has a key to sign with
    pub fn is_qualified(&self) -> bool {
        self.key.is_some()
    }
}

impl PartialEq for Account {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address && self.key_index() == other.key_index()
    }
}

impl Eq for Account {}

/// Addresses of the given accounts, order preserved
pub fn addresses_from_accounts(accounts: &[Account]) -> Vec<Address> {
    accounts.iter().map(Account::address).collect()
}
