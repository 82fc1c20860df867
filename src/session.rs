//! The bootstrapped client: a network, a gateway and a registry snapshot, plus the builders
//! the rest of an application talks to.

use crate::{
    account::{Account, AccountKey},
    address::Address,
    error::{Error, Result},
    gateway::{
        embedded::{programs::ACCOUNT_CREATED_EVENT, ScriptHandler, TransactionHandler},
        Gateway, SessionGateway, TransactionResult,
    },
    imports::ImportResolver,
    keys::{HashAlgorithm, PrivateKey, SignatureAlgorithm},
    registry::{Registry, RegistryError, SERVICE_ACCOUNT_NAME},
    signer::{check_authorizers, sign_at_sequence, KeyResolver, SigningError},
    source::{read_source, rooted},
    templates,
    transaction::{self, UnsignedTransaction},
    values::Value,
};
use secrecy::ExposeSecret;
use std::{
    collections::BTreeMap,
    fmt,
    path::{Path, PathBuf},
};
use tracing::{debug, info};

#[cfg(test)]
mod tests;

/// Everything a bootstrapped client needs. Read-only once built, so it can be shared across
/// tasks behind a plain reference or an `Arc`.
pub struct ClientSession {
    pub(crate) network: String,
    pub(crate) root: PathBuf,
    pub(crate) registry: Registry,
    pub(crate) gateway: SessionGateway,
    pub(crate) resolver: ImportResolver,
    pub(crate) service: Option<Account>,
    pub(crate) gas_limit: u64,
    pub(crate) signature_algorithm: SignatureAlgorithm,
    pub(crate) hash_algorithm: HashAlgorithm,
}

impl fmt::Debug for ClientSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSession")
            .field("network", &self.network)
            .field("root", &self.root)
            .field("embedded", &self.is_embedded())
            .field("gas_limit", &self.gas_limit)
            .finish()
    }
}

impl ClientSession {
    /// Registry network the session targets
    pub fn network(&self) -> &str {
        &self.network
    }

    /// Whether the session runs against the in-process ledger
    pub fn is_embedded(&self) -> bool {
        self.gateway.embedded().is_some()
    }

    #[allow(missing_docs)]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    #[allow(missing_docs)]
    pub fn gateway(&self) -> &SessionGateway {
        &self.gateway
    }

    /// Directory relative source paths are read from
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[allow(missing_docs)]
    pub fn gas_limit(&self) -> u64 {
        self.gas_limit
    }

    #[allow(missing_docs)]
    pub fn signature_algorithm(&self) -> SignatureAlgorithm {
        self.signature_algorithm
    }

    #[allow(missing_docs)]
    pub fn hash_algorithm(&self) -> HashAlgorithm {
        self.hash_algorithm
    }

    /// Account paying for account creation on this network
    pub fn service_account(&self) -> Result<Account> {
        self.service.clone().ok_or_else(|| {
            RegistryError::AccountNotFound {
                network: self.network.clone(),
                name: SERVICE_ACCOUNT_NAME.to_string(),
            }
            .into()
        })
    }

    /// Registry account by short or full name. `svc` is the session's service account.
    pub fn account(&self, name: &str) -> Result<Account> {
        if name == SERVICE_ACCOUNT_NAME {
            return self.service_account();
        }
        Ok(self.registry.account_by_name(&self.network, name)?)
    }

    /// Registry accounts of the network, by short name
    pub fn accounts(&self) -> Result<BTreeMap<String, Account>> {
        Ok(self.registry.accounts_for_network(&self.network)?)
    }

    /// Short names of the network's accounts in provisioning order
    pub fn account_names(&self) -> Result<Vec<String>> {
        Ok(self
            .registry
            .accounts_sorted(&self.network)?
            .into_iter()
            .map(|(name, _)| name)
            .collect())
    }

    /// Account bound to this session
    pub fn actor(&self, name: &str) -> Result<Actor<'_>> {
        Ok(Actor {
            session: self,
            account: self.account(name)?,
        })
    }

    /// Wrap an account obtained elsewhere, e.g. from [`ClientSession::create_account`]
    pub fn actor_for(&self, account: Account) -> Actor<'_> {
        Actor {
            session: self,
            account,
        }
    }

    /// Address of a contract on this network
    pub fn contract_address(&self, name: &str) -> Option<&str> {
        self.resolver.address_of(name)
    }

    #[allow(missing_docs)]
    pub fn resolver(&self) -> &ImportResolver {
        &self.resolver
    }

    /// Resolve imports in `text` for this network
    pub fn resolve(&self, text: &str) -> String {
        self.resolver.resolve(text)
    }

    /// Read a source file relative to the root and resolve its imports
    pub async fn source_from_file(&self, path: &Path) -> Result<String> {
        let text = read_source(&rooted(&self.root, path)).await?;
        Ok(self.resolve(&text))
    }

    /// Transaction from raw code, used verbatim
    pub fn new_transaction(&self, code: Vec<u8>) -> Transaction<'_> {
        Transaction::new(self, code)
    }

    /// Transaction from source text, imports resolved
    pub fn new_transaction_from_str(&self, code: &str) -> Transaction<'_> {
        self.new_transaction(self.resolve(code).into_bytes())
    }

    /// Transaction from a source file, imports resolved
    pub async fn new_transaction_from_file(&self, path: &Path) -> Result<Transaction<'_>> {
        let code = self.source_from_file(path).await?;
        Ok(self.new_transaction(code.into_bytes()))
    }

    /// Query from raw code, used verbatim
    pub fn new_query(&self, code: Vec<u8>) -> Query<'_> {
        Query {
            session: self,
            code,
            arguments: Vec::new(),
        }
    }

    /// Query from source text, imports resolved
    pub fn new_query_from_str(&self, code: &str) -> Query<'_> {
        self.new_query(self.resolve(code).into_bytes())
    }

    /// Query from a source file, imports resolved
    pub async fn new_query_from_file(&self, path: &Path) -> Result<Query<'_>> {
        let code = self.source_from_file(path).await?;
        Ok(self.new_query(code.into_bytes()))
    }

    /// Create an account holding `key`, paid for by the service account
    pub async fn create_account(&self, key: AccountKey) -> Result<Account> {
        let public_key = key.private_key(self.signature_algorithm)?.public_key();
        let hash_algorithm = key.hash_algorithm().unwrap_or(self.hash_algorithm);
        let result = self
            .new_transaction(templates::TX_CREATE_ACCOUNT.as_bytes().to_vec())
            .signer(self.service_account()?)
            .argument(public_key.to_hex())
            .argument(public_key.algorithm().name())
            .argument(hash_algorithm.name())
            .sign_and_send()
            .await?
            .into_sealed()?;
        let address = result
            .events_named(ACCOUNT_CREATED_EVENT)
            .find_map(|event| event.field("address").and_then(Value::as_address))
            .ok_or_else(|| Error::MissingEvent {
                id: result.id.clone(),
                event: ACCOUNT_CREATED_EVENT.to_string(),
            })?;
        info!(%address, "Created account");
        Ok(Account::new(address, key))
    }

    /// Create an account with a fresh random key
    pub async fn create_disposable_account(&self) -> Result<Account> {
        let private_key = PrivateKey::generate(self.signature_algorithm)?;
        let key = AccountKey::new(private_key.to_hex().expose_secret())
            .with_signature_algorithm(self.signature_algorithm)
            .with_hash_algorithm(self.hash_algorithm);
        self.create_account(key).await
    }

    /// Deploy `code` as contract `name` to `account`, resolving its imports first
    pub async fn deploy_contract(
        &self,
        account: &Account,
        name: &str,
        code: &str,
    ) -> Result<TransactionResult> {
        let result = self
            .contract_transaction(templates::TX_CONTRACT_DEPLOY, account, name, Some(code))
            .await?;
        info!(contract = name, address = %account.address(), "Deployed contract");
        Ok(result)
    }

    /// Replace contract `name` on `account`
    pub async fn update_contract(
        &self,
        account: &Account,
        name: &str,
        code: &str,
    ) -> Result<TransactionResult> {
        self.contract_transaction(templates::TX_CONTRACT_UPDATE, account, name, Some(code))
            .await
    }

    /// Remove contract `name` from `account`
    pub async fn remove_contract(&self, account: &Account, name: &str) -> Result<TransactionResult> {
        self.contract_transaction(templates::TX_CONTRACT_REMOVE, account, name, None)
            .await
    }

    async fn contract_transaction(
        &self,
        template: &str,
        account: &Account,
        name: &str,
        code: Option<&str>,
    ) -> Result<TransactionResult> {
        let mut tx = self
            .new_transaction(template.as_bytes().to_vec())
            .signer(account.clone())
            .argument(name);
        if let Some(code) = code {
            tx = tx.argument(hex::encode(self.resolve(code)));
        }
        tx.sign_and_send().await?.into_sealed()
    }

    /// Whether `address` holds a contract called `name`
    pub async fn contract_exists(&self, address: &Address, name: &str) -> Result<bool> {
        let value = self
            .new_query(templates::SC_CONTRACT_CHECK.as_bytes().to_vec())
            .argument(*address)
            .argument(name)
            .execute()
            .await?;
        value
            .as_bool()
            .ok_or(Error::UnexpectedValue(value, "a Bool"))
    }

    /// Teach the embedded ledger what a transaction does
    pub fn register_transaction(&self, code: &str, handler: TransactionHandler) -> Result<()> {
        let ledger = self.gateway.embedded().ok_or(Error::NotEmbedded)?;
        ledger.register_transaction(self.resolve(code).as_bytes(), handler)?;
        Ok(())
    }

    /// Teach the embedded ledger what a script returns
    pub fn register_script(&self, code: &str, handler: ScriptHandler) -> Result<()> {
        let ledger = self.gateway.embedded().ok_or(Error::NotEmbedded)?;
        ledger.register_script(self.resolve(code).as_bytes(), handler)?;
        Ok(())
    }

    fn key_resolver(&self) -> KeyResolver {
        KeyResolver::new(self.signature_algorithm, self.hash_algorithm)
    }
}

/// Transaction under construction.
///
/// [`Transaction::signer`] makes one account proposer, payer and sole authorizer. The other
/// role setters refine that, with the semantics of [`UnsignedTransaction`].
pub struct Transaction<'a> {
    session: &'a ClientSession,
    code: Vec<u8>,
    proposer: Option<Account>,
    payer: Option<Account>,
    authorizers: Option<Vec<Account>>,
    arguments: Vec<Value>,
    gas_limit: u64,
}

impl<'a> Transaction<'a> {
    fn new(session: &'a ClientSession, code: Vec<u8>) -> Self {
        Transaction {
            session,
            code,
            proposer: None,
            payer: None,
            authorizers: None,
            arguments: Vec::new(),
            gas_limit: session.gas_limit,
        }
    }

    /// Propose, pay for and authorize with one account. A later [`Transaction::payer`] or
    /// [`Transaction::proposer`] only takes over that one role.
    pub fn signer(mut self, account: Account) -> Self {
        self.proposer = Some(account.clone());
        self.payer = Some(account);
        self
    }

    /// Propose only. Unless a payer is set, the proposer pays too.
    pub fn proposer(mut self, account: Account) -> Self {
        self.proposer = Some(account);
        self
    }

    /// Pay for the transaction, signing its envelope
    pub fn payer(mut self, account: Account) -> Self {
        self.payer = Some(account);
        self
    }

    /// Replace the authorizer list
    pub fn authorizers(mut self, accounts: Vec<Account>) -> Self {
        self.authorizers = Some(accounts);
        self
    }

    #[allow(missing_docs)]
    pub fn argument<V: Into<Value>>(mut self, value: V) -> Self {
        self.arguments.push(value.into());
        self
    }

    /// Replace the arguments
    pub fn arguments(mut self, values: Vec<Value>) -> Self {
        self.arguments = values;
        self
    }

    #[allow(missing_docs)]
    pub fn gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = gas_limit;
        self
    }

    /// The transaction as it will be signed
    pub fn build(self) -> Result<UnsignedTransaction> {
        let proposer = self.proposer.ok_or(SigningError::NoProposer)?;
        let mut tx = UnsignedTransaction::new(self.code, proposer)
            .with_arguments(self.arguments)
            .with_gas_limit(self.gas_limit);
        if let Some(authorizers) = self.authorizers {
            tx = tx.with_authorizers(authorizers);
        }
        if let Some(payer) = self.payer {
            tx = tx.with_payer(payer);
        }
        Ok(tx)
    }

    /// Sign with every authorizer, using the proposer's current sequence number
    pub async fn sign(self) -> Result<SignedTransaction<'a>> {
        let session = self.session;
        let tx = self.build()?;
        check_authorizers(&tx)?;
        if let Some(unqualified) = tx.authorizers().iter().find(|a| !a.is_qualified()) {
            return Err(SigningError::Unqualified(unqualified.address()).into());
        }
        let proposer = tx.proposer();
        let sequence_number = session
            .gateway
            .account_info(&proposer.address())
            .await?
            .key(proposer.key_index())?
            .sequence_number;
        let inner = sign_at_sequence(tx, sequence_number, &session.key_resolver())?;
        Ok(SignedTransaction { session, inner })
    }

    /// [`Transaction::sign`] then [`SignedTransaction::send`]
    pub async fn sign_and_send(self) -> Result<TransactionResult> {
        self.sign().await?.send().await
    }
}

/// A signed transaction bound to the session that will submit it
#[derive(Debug)]
pub struct SignedTransaction<'a> {
    session: &'a ClientSession,
    inner: transaction::SignedTransaction,
}

impl<'a> SignedTransaction<'a> {
    #[allow(missing_docs)]
    pub fn inner(&self) -> &transaction::SignedTransaction {
        &self.inner
    }

    /// Submit and wait for the outcome. On-chain rejections come back as a
    /// [`TransactionResult`]; see [`TransactionResult::into_sealed`].
    pub async fn send(self) -> Result<TransactionResult> {
        let result = self.session.gateway.submit_signed(&self.inner).await?;
        debug!(id = %result.id, status = ?result.status, "Transaction finished");
        Ok(result)
    }
}

/// Read-only code to run against the ledger
pub struct Query<'a> {
    session: &'a ClientSession,
    code: Vec<u8>,
    arguments: Vec<Value>,
}

impl<'a> Query<'a> {
    #[allow(missing_docs)]
    pub fn argument<V: Into<Value>>(mut self, value: V) -> Self {
        self.arguments.push(value.into());
        self
    }

    #[allow(missing_docs)]
    pub fn arguments(mut self, values: Vec<Value>) -> Self {
        self.arguments = values;
        self
    }

    #[allow(missing_docs)]
    pub async fn execute(self) -> Result<Value> {
        Ok(self
            .session
            .gateway
            .execute_query(&self.code, &self.arguments)
            .await?)
    }
}

/// An account bound to a session
pub struct Actor<'a> {
    session: &'a ClientSession,
    account: Account,
}

impl<'a> Actor<'a> {
    #[allow(missing_docs)]
    pub fn account(&self) -> &Account {
        &self.account
    }

    #[allow(missing_docs)]
    pub fn address(&self) -> Address {
        self.account.address()
    }

    /// Transaction signed by this actor alone
    pub fn new_transaction(&self, code: Vec<u8>) -> Transaction<'a> {
        self.session
            .new_transaction(code)
            .signer(self.account.clone())
    }

    #[allow(missing_docs)]
    pub fn new_transaction_from_str(&self, code: &str) -> Transaction<'a> {
        self.session
            .new_transaction_from_str(code)
            .signer(self.account.clone())
    }

    #[allow(missing_docs)]
    pub async fn new_transaction_from_file(&self, path: &Path) -> Result<Transaction<'a>> {
        Ok(self
            .session
            .new_transaction_from_file(path)
            .await?
            .signer(self.account.clone()))
    }

    /// Deploy a contract to this actor's account
    pub async fn deploy_contract(&self, name: &str, code: &str) -> Result<TransactionResult> {
        self.session.deploy_contract(&self.account, name, code).await
    }

    /// Names of the contracts deployed to this actor's account
    pub async fn contract_names(&self) -> Result<Vec<String>> {
        let value = self
            .session
            .new_query(templates::SC_CONTRACT_NAMES.as_bytes().to_vec())
            .argument(self.address())
            .execute()
            .await?;
        value
            .as_array()
            .and_then(|names| {
                names
                    .iter()
                    .map(|n| n.as_str().map(str::to_string))
                    .collect::<Option<Vec<_>>>()
            })
            .ok_or(Error::UnexpectedValue(value.clone(), "an Array of String"))
    }
}

