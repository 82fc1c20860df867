use crate::{
    address::Address,
    error::{Error, Result},
    keys::{HashAlgorithm, SignatureAlgorithm},
    transaction::{SignedTransaction, TransactionError},
    values::Value,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, error};
use thiserror::Error;

pub mod embedded;
/// Gateway to a live access node over its REST API
pub mod remote;

pub use embedded::EmbeddedGateway;
pub use remote::RemoteGateway;

/// Transport to a ledger: either the embedded in-process one or a remote access node.
///
/// On-chain rejections are not errors at this level. [`Gateway::submit_signed`] reports them
/// as a [`TransactionResult`] with [`TransactionStatus::Rejected`]; a [`GatewayError`] means the
/// ledger could not be reached or did not answer sensibly.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Check the ledger is reachable, returning its chain id
    async fn ping(&self) -> GatewayResult<String>;

    /// Submit a signed transaction and wait until it is sealed or rejected
    async fn submit_signed(&self, tx: &SignedTransaction) -> GatewayResult<TransactionResult>;

    /// Run read-only code
    async fn execute_query(&self, code: &[u8], arguments: &[Value]) -> GatewayResult<Value>;

    /// Keys, sequence numbers and contracts of an account
    async fn account_info(&self, address: &Address) -> GatewayResult<AccountInfo>;
}

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Internal ledger state is unavailable: {0}")]
    Mutex(String),
    #[error("Account {0} does not exist")]
    AccountNotFound(Address),
    #[error("Account {address} has no key with index {index}")]
    KeyNotFound { address: Address, index: u32 },
    #[error("Query failed: {0}")]
    Query(String),
    #[error("Transaction {id} was not sealed after {attempts} attempts")]
    Timeout { id: String, attempts: u32 },
    #[error("Ledger answered with something unexpected: {0}")]
    InvalidResponse(String),
    #[error("Could not reach the ledger: {0:?}")]
    Transport(Box<dyn error::Error + Send + Sync>),
    #[error("Could not encode transaction: {0}")]
    Encoding(#[from] TransactionError),
}

#[allow(missing_docs)]
pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// Final state of a submitted transaction
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionStatus {
    /// Executed and committed
    Sealed,
    /// Refused or failed during execution; nothing but the proposer sequence number changed
    Rejected,
}

/// Something a transaction emitted while executing
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    #[allow(missing_docs)]
    pub name: String,
    #[allow(missing_docs)]
    pub fields: BTreeMap<String, Value>,
}

impl Event {
    #[allow(missing_docs)]
    pub fn new(name: &str, fields: Vec<(&str, Value)>) -> Self {
        Event {
            name: name.to_string(),
            fields: fields
                .into_iter()
                .map(|(key, value)| (key.to_string(), value))
                .collect(),
        }
    }

    #[allow(missing_docs)]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

/// What the ledger reported for a submitted transaction
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionResult {
    #[allow(missing_docs)]
    pub id: String,
    #[allow(missing_docs)]
    pub status: TransactionStatus,
    #[allow(missing_docs)]
    pub events: Vec<Event>,
    /// Ledger error detail, for rejected transactions
    pub error: Option<String>,
}

impl TransactionResult {
    #[allow(missing_docs)]
    pub fn is_sealed(&self) -> bool {
        self.status == TransactionStatus::Sealed
    }

    /// Events with the given name, in emission order
    pub fn events_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Event> + 'a {
        self.events.iter().filter(move |e| e.name == name)
    }

    /// Turn a rejection into [`Error::Rejected`], for callers that want `?`
    pub fn into_sealed(self) -> Result<Self> {
        match self.status {
            TransactionStatus::Sealed => Ok(self),
            TransactionStatus::Rejected => Err(Error::Rejected {
                id: self.id,
                detail: self.error.unwrap_or_default(),
            }),
        }
    }
}

/// One key registered on an account
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountKeyInfo {
    #[allow(missing_docs)]
    pub index: u32,
    /// 64 byte uncompressed point, hex
    pub public_key: String,
    #[allow(missing_docs)]
    pub signature_algorithm: SignatureAlgorithm,
    #[allow(missing_docs)]
    pub hash_algorithm: HashAlgorithm,
    /// Next sequence number expected from this key as proposer
    pub sequence_number: u64,
}

/// On-chain state of an account, as far as the client cares
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    #[allow(missing_docs)]
    pub address: Address,
    #[allow(missing_docs)]
    pub keys: Vec<AccountKeyInfo>,
    /// Contract name to code
    pub contracts: BTreeMap<String, Vec<u8>>,
}

impl AccountInfo {
    #[allow(missing_docs)]
    pub fn key(&self, index: u32) -> GatewayResult<&AccountKeyInfo> {
        self.keys
            .iter()
            .find(|k| k.index == index)
            .ok_or(GatewayError::KeyNotFound {
                address: self.address,
                index,
            })
    }
}

/// The gateway a session was bootstrapped with
pub enum SessionGateway {
    #[allow(missing_docs)]
    Embedded(EmbeddedGateway),
    #[allow(missing_docs)]
    Remote(RemoteGateway),
}

impl SessionGateway {
    /// The embedded ledger, when running in ephemeral mode
    pub fn embedded(&self) -> Option<&EmbeddedGateway> {
        match self {
            SessionGateway::Embedded(inner) => Some(inner),
            SessionGateway::Remote(_) => None,
        }
    }
}

#[async_trait]
impl Gateway for SessionGateway {
    async fn ping(&self) -> GatewayResult<String> {
        match self {
            SessionGateway::Embedded(inner) => inner.ping().await,
            SessionGateway::Remote(inner) => inner.ping().await,
        }
    }

    async fn submit_signed(&self, tx: &SignedTransaction) -> GatewayResult<TransactionResult> {
        match self {
            SessionGateway::Embedded(inner) => inner.submit_signed(tx).await,
            SessionGateway::Remote(inner) => inner.submit_signed(tx).await,
        }
    }

    async fn execute_query(&self, code: &[u8], arguments: &[Value]) -> GatewayResult<Value> {
        match self {
            SessionGateway::Embedded(inner) => inner.execute_query(code, arguments).await,
            SessionGateway::Remote(inner) => inner.execute_query(code, arguments).await,
        }
    }

    async fn account_info(&self, address: &Address) -> GatewayResult<AccountInfo> {
        match self {
            SessionGateway::Embedded(inner) => inner.account_info(address).await,
            SessionGateway::Remote(inner) => inner.account_info(address).await,
        }
    }
}
