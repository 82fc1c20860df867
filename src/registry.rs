//! Account, contract and network registry, read from `galley.json`.
//!
//! The registry is a read-only snapshot. Every lookup that can miss returns an explicit
//! [`RegistryError`] naming what was asked for.

use crate::{
    account::{Account, AccountKey},
    address::{prepend_hex_prefix, sequence_index, Address, AddressError},
    keys::{HashAlgorithm, KeyError, SignatureAlgorithm},
};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fmt,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tokio::fs;

#[cfg(test)]
mod tests;

/// File name of the registry inside the configured root
pub const REGISTRY_FILE: &str = "galley.json";
/// Account name reserved for the network's service account
pub const SERVICE_ACCOUNT_NAME: &str = "svc";

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Could not read registry at {path:?}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Could not parse registry: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Network {0:?} is not configured")]
    NetworkNotFound(String),
    #[error("Account {name:?} is not configured for network {network:?}")]
    AccountNotFound { network: String, name: String },
    #[error("Contract {0:?} is not configured")]
    ContractNotFound(String),
    #[error("Account {account:?} has an invalid address: {source}")]
    InvalidAddress {
        account: String,
        source: AddressError,
    },
    #[error("Account {account:?} has an invalid key: {source}")]
    InvalidKey { account: String, source: KeyError },
}

#[allow(missing_docs)]
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Private key of a registry account, in either the short or the advanced form
#[derive(Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyEntry {
    /// Just the hex private key; index 0 and session default algorithms
    Hex(String),
    /// Fully specified key
    Advanced {
        /// Hex private key
        #[serde(rename = "privateKey")]
        private_key: String,
        /// Key index on the account
        #[serde(default)]
        index: u32,
        /// Overrides the session signature algorithm
        #[serde(
            rename = "signatureAlgorithm",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        signature_algorithm: Option<String>,
        /// Overrides the session hash algorithm
        #[serde(
            rename = "hashAlgorithm",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        hash_algorithm: Option<String>,
    },
}

impl fmt::Debug for KeyEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyEntry::Hex(_) => write!(f, "KeyEntry::Hex(<redacted>)"),
            KeyEntry::Advanced {
                index,
                signature_algorithm,
                hash_algorithm,
                ..
            } => f
                .debug_struct("KeyEntry::Advanced")
                .field("private_key", &"<redacted>")
                .field("index", index)
                .field("signature_algorithm", signature_algorithm)
                .field("hash_algorithm", hash_algorithm)
                .finish(),
        }
    }
}

impl KeyEntry {
    fn to_account_key(&self) -> Result<AccountKey, KeyError> {
        match self {
            KeyEntry::Hex(hex) => Ok(AccountKey::new(hex)),
            KeyEntry::Advanced {
                private_key,
                index,
                signature_algorithm,
                hash_algorithm,
            } => {
                let mut key = AccountKey::new(private_key).with_index(*index);
                if let Some(name) = signature_algorithm {
                    key = key.with_signature_algorithm(name.parse::<SignatureAlgorithm>()?);
                }
                if let Some(name) = hash_algorithm {
                    key = key.with_hash_algorithm(name.parse::<HashAlgorithm>()?);
                }
                Ok(key)
            }
        }
    }
}

#[allow(missing_docs)]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AccountEntry {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<KeyEntry>,
}

impl AccountEntry {
    /// Entry with a short-form key, or none for an unqualified account
    pub fn new(address: Address, private_key_hex: Option<&str>) -> Self {
        AccountEntry {
            address: address.to_string(),
            key: private_key_hex.map(|k| KeyEntry::Hex(k.to_string())),
        }
    }
}

#[allow(missing_docs)]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ContractEntry {
    pub source: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub aliases: BTreeMap<String, String>,
}

/// Where a contract lives on one network
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContractLocation {
    /// Source path, relative to the registry root
    pub source: String,
    /// Address string for the network, if the contract has an alias or a deployment there
    pub address: Option<String>,
}

/// In-memory view of `galley.json`
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Registry {
    #[serde(default)]
    networks: BTreeMap<String, String>,
    #[serde(default)]
    accounts: BTreeMap<String, AccountEntry>,
    #[serde(default)]
    contracts: BTreeMap<String, ContractEntry>,
    #[serde(default)]
    deployments: BTreeMap<String, BTreeMap<String, Vec<String>>>,
}

impl Registry {
    /// Parse a registry from JSON text
    pub fn from_json(json: &str) -> RegistryResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse the registry file at `path`
    pub async fn load(path: &Path) -> RegistryResult<Self> {
        let contents =
            fs::read_to_string(path)
                .await
                .map_err(|source| RegistryError::FileRead {
                    path: path.to_path_buf(),
                    source,
                })?;
        Self::from_json(&contents)
    }

    /// Serialize back to pretty JSON
    pub fn to_json(&self) -> RegistryResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    #[allow(missing_docs)]
    pub fn with_network(mut self, name: &str, host: &str) -> Self {
        self.networks.insert(name.to_string(), host.to_string());
        self
    }

    /// Add `<network>-<name>`
    pub fn with_account(mut self, network: &str, name: &str, entry: AccountEntry) -> Self {
        self.accounts.insert(qualified_name(network, name), entry);
        self
    }

    #[allow(missing_docs)]
    pub fn with_contract(mut self, name: &str, source: &str, aliases: &[(&str, &str)]) -> Self {
        let entry = ContractEntry {
            source: source.to_string(),
            aliases: aliases
                .iter()
                .map(|(network, address)| (network.to_string(), address.to_string()))
                .collect(),
        };
        self.contracts.insert(name.to_string(), entry);
        self
    }

    /// Deploy `contracts` to the account `name` on `network`, in the given order
    pub fn with_deployment(mut self, network: &str, name: &str, contracts: &[&str]) -> Self {
        self.deployments
            .entry(network.to_string())
            .or_default()
            .insert(
                qualified_name(network, name),
                contracts.iter().map(|c| c.to_string()).collect(),
            );
        self
    }

    /// Host of the access node for `name`
    pub fn network(&self, name: &str) -> RegistryResult<&str> {
        self.networks
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| RegistryError::NetworkNotFound(name.to_string()))
    }

    /// Names of all configured networks
    pub fn networks(&self) -> Vec<String> {
        self.networks.keys().cloned().collect()
    }

    /// Look up an account by its short name (`alice`) or full key (`emulator-alice`)
    pub fn account_by_name(&self, network: &str, name: &str) -> RegistryResult<Account> {
        let (key, entry) = self.account_entry(network, name)?;
        account_from_entry(key, entry)
    }

    /// The `<network>-svc` account
    pub fn service_account(&self, network: &str) -> RegistryResult<Account> {
        self.account_by_name(network, SERVICE_ACCOUNT_NAME)
    }

    /// All accounts of a network, by short name
    pub fn accounts_for_network(&self, network: &str) -> RegistryResult<BTreeMap<String, Account>> {
        self.network_entries(network)
            .map(|(short, key, entry)| Ok((short.to_string(), account_from_entry(key, entry)?)))
            .collect()
    }

    /// Accounts of a network in the order the embedded ledger creates addresses, ties and
    /// addresses outside the sequence broken by name
    pub fn accounts_sorted(&self, network: &str) -> RegistryResult<Vec<(String, Account)>> {
        let mut accounts: Vec<(String, Account)> =
            self.accounts_for_network(network)?.into_iter().collect();
        accounts.sort_by(|(a_name, a), (b_name, b)| {
            let a_index = sequence_index(&a.address()).unwrap_or(u64::MAX);
            let b_index = sequence_index(&b.address()).unwrap_or(u64::MAX);
            a_index.cmp(&b_index).then_with(|| a_name.cmp(b_name))
        });
        Ok(accounts)
    }

    #[allow(missing_docs)]
    pub fn contract(&self, name: &str) -> RegistryResult<&ContractEntry> {
        self.contracts
            .get(name)
            .ok_or_else(|| RegistryError::ContractNotFound(name.to_string()))
    }

    /// Every configured contract with its address on `network`. The explicit alias wins over
    /// the address of the deploying account.
    pub fn contracts_for_network(
        &self,
        network: &str,
    ) -> RegistryResult<BTreeMap<String, ContractLocation>> {
        let mut deployed_at = BTreeMap::new();
        if let Some(deployments) = self.deployments.get(network) {
            for (account, contracts) in deployments {
                let (_, entry) = self.account_entry(network, account)?;
                for contract in contracts {
                    deployed_at.insert(contract.clone(), prepend_hex_prefix(&entry.address));
                }
            }
        }
        let locations = self
            .contracts
            .iter()
            .map(|(name, entry)| {
                let address = entry
                    .aliases
                    .get(network)
                    .map(|alias| prepend_hex_prefix(alias))
                    .or_else(|| deployed_at.get(name).cloned());
                let location = ContractLocation {
                    source: entry.source.clone(),
                    address,
                };
                (name.clone(), location)
            })
            .collect();
        Ok(locations)
    }

    /// Contract names deployed to account `name` on `network`, in declared order. Deployment
    /// keys may use the short or the full account name. Empty if the account deploys nothing.
    pub fn deployments_for_account(&self, network: &str, name: &str) -> RegistryResult<Vec<String>> {
        let (full, _) = self.account_entry(network, name)?;
        let contracts = self
            .deployments
            .get(network)
            .into_iter()
            .flatten()
            .filter(|(account, _)| qualified_name(network, account) == full)
            .flat_map(|(_, contracts)| contracts.iter().cloned())
            .collect();
        Ok(contracts)
    }

    fn account_entry(&self, network: &str, name: &str) -> RegistryResult<(&str, &AccountEntry)> {
        let full = qualified_name(network, name);
        self.accounts
            .get_key_value(&full)
            .map(|(key, entry)| (key.as_str(), entry))
            .ok_or_else(|| RegistryError::AccountNotFound {
                network: network.to_string(),
                name: name.to_string(),
            })
    }

    fn network_entries<'a>(
        &'a self,
        network: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a str, &'a AccountEntry)> + 'a {
        let prefix = format!("{network}-");
        self.accounts.iter().filter_map(move |(key, entry)| {
            key.strip_prefix(&prefix)
                .map(|short| (short, key.as_str(), entry))
        })
    }
}

fn qualified_name(network: &str, name: &str) -> String {
    if name.starts_with(&format!("{network}-")) {
        name.to_string()
    } else {
        format!("{network}-{name}")
    }
}

fn account_from_entry(name: &str, entry: &AccountEntry) -> RegistryResult<Account> {
    let address =
        Address::from_hex(&entry.address).map_err(|source| RegistryError::InvalidAddress {
            account: name.to_string(),
            source,
        })?;
    match &entry.key {
        Some(key) => {
            let key = key
                .to_account_key()
                .map_err(|source| RegistryError::InvalidKey {
                    account: name.to_string(),
                    source,
                })?;
            Ok(Account::new(address, key))
        }
        None => Ok(Account::new_unqualified(address)),
    }
}
