#![warn(missing_docs)]

//! Galley: build, sign and submit smart contract transactions, against a disposable
//! in-process ledger or a live network.
//!
//! ```no_run
//! # async fn run() -> galley::error::Result<()> {
//! let session = galley::ClientBuilder::from_env().await?.start().await?;
//! let result = session
//!     .actor("alice")?
//!     .new_transaction_from_str("import Token from 0xToken\ntransaction {}")
//!     .sign_and_send()
//!     .await?
//!     .into_sealed()?;
//! println!("{}", result.id);
//! # Ok(())
//! # }
//! ```

/// Accounts and the keys they sign with
pub mod account;
/// Ledger addresses
pub mod address;
/// Startup of a [`ClientSession`] from configuration
pub mod bootstrap;
/// Crate-wide error type
pub mod error;
/// Transports to the ledger
pub mod gateway;
pub mod imports;
/// Keys, signing and verification
pub mod keys;
pub mod registry;
/// Bootstrapped client and its builders
pub mod session;
pub mod signer;
/// Reading contract and transaction sources
pub mod source;
pub mod templates;
/// Unsigned and signed transactions and their canonical encoding
pub mod transaction;
/// Typed arguments and results
pub mod values;

pub use account::{Account, AccountKey};
pub use address::Address;
pub use bootstrap::{BootstrapError, ClientBuilder};
pub use error::{Error, Result};
pub use gateway::{Gateway, TransactionResult, TransactionStatus};
pub use imports::{ImportResolver, ResolvedSource};
pub use registry::Registry;
pub use session::{Actor, ClientSession, Query, Transaction};
pub use signer::sign_at_sequence;
pub use transaction::UnsignedTransaction;
pub use values::Value;
