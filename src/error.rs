use thiserror::Error;

use crate::bootstrap::BootstrapError;
use crate::gateway::GatewayError;
use crate::keys::KeyError;
use crate::registry::RegistryError;
use crate::signer::SigningError;
use crate::source::SourceError;
use crate::transaction::TransactionError;
use crate::values::ValueError;

#[allow(missing_docs)]
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum Error {
    #[error("Registry Error: {0}")]
    Registry(#[from] RegistryError),
    #[error("Source Error: {0}")]
    Source(#[from] SourceError),
    #[error("Transaction Error: {0}")]
    Transaction(#[from] TransactionError),
    #[error("Signing Error: {0}")]
    Signing(#[from] SigningError),
    #[error("Gateway Error: {0}")]
    Gateway(#[from] GatewayError),
    #[error("Key Error: {0}")]
    Key(#[from] KeyError),
    #[error("Value Error: {0}")]
    Value(#[from] ValueError),
    #[error("Bootstrap Error: {0}")]
    Bootstrap(#[from] BootstrapError),
    #[error("Transaction {id} was rejected: {detail}")]
    Rejected { id: String, detail: String },
    #[error("Transaction {id} did not emit {event}")]
    MissingEvent { id: String, event: String },
    #[error("Ledger answered {0:?} where {1} was expected")]
    UnexpectedValue(crate::values::Value, &'static str),
    #[error("Programs can only be registered on the embedded ledger")]
    NotEmbedded,
}
