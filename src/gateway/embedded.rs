//! Ephemeral in-process ledger.
//!
//! Holds accounts, keys and contracts in memory and enforces the same signing rules as a real
//! access node: every signature must verify against the registered key, the proposer
//! sequence number must match, the payer must sign the envelope and every authorizer must
//! sign something. Programs are not interpreted. Code is dispatched by its hash to a
//! built-in or a registered handler, after its imports have been checked against the
//! deployed contracts.

use super::{
    AccountInfo, AccountKeyInfo, Event, Gateway, GatewayError, GatewayResult,
    TransactionResult, TransactionStatus,
};
use crate::{
    account::addresses_from_accounts,
    address::{sequence_address, Address},
    keys::{verify, HashAlgorithm, PublicKey, TRANSACTION_DOMAIN_TAG},
    transaction::{SignatureScope, SignedTransaction},
    values::Value,
};
use async_trait::async_trait;
use std::{
    collections::BTreeMap,
    iter,
    sync::{Arc, Mutex, MutexGuard},
};
use tracing::{debug, info, warn};

/// Built-in programs and the handler registry
pub mod programs;

pub use programs::{code_hash, Programs, ScriptHandler, TransactionHandler};


/// Chain id reported by [`EmbeddedGateway::ping`]
pub const EMBEDDED_CHAIN_ID: &str = "galley-embedded";

#[derive(Clone, Debug)]
struct StoredKey {
    public_key: PublicKey,
    hash_algorithm: HashAlgorithm,
    sequence_number: u64,
}

#[derive(Clone, Debug, Default)]
struct LedgerAccount {
    keys: Vec<StoredKey>,
    contracts: BTreeMap<String, Vec<u8>>,
    storage: BTreeMap<String, Value>,
}

/// Everything the embedded ledger knows
#[derive(Clone, Debug, Default)]
pub struct LedgerState {
    accounts: BTreeMap<Address, LedgerAccount>,
    next_index: u64,
}

impl LedgerState {
    fn account(&self, address: &Address) -> Result<&LedgerAccount, String> {
        self.accounts
            .get(address)
            .ok_or_else(|| format!("account {address} does not exist"))
    }

    fn account_mut(&mut self, address: &Address) -> Result<&mut LedgerAccount, String> {
        self.accounts
            .get_mut(address)
            .ok_or_else(|| format!("account {address} does not exist"))
    }

    fn key(&self, address: &Address, index: u32) -> Result<&StoredKey, String> {
        self.account(address)?
            .keys
            .get(index as usize)
            .ok_or_else(|| format!("account {address} has no key {index}"))
    }

    fn create_account(&mut self, public_key: PublicKey, hash_algorithm: HashAlgorithm) -> Address {
        let address = sequence_address(self.next_index);
        self.next_index += 1;
        let account = LedgerAccount {
            keys: vec![StoredKey {
                public_key,
                hash_algorithm,
                sequence_number: 0,
            }],
            ..Default::default()
        };
        self.accounts.insert(address, account);
        address
    }

    fn has_contract(&self, address: &Address, name: &str) -> bool {
        self.accounts
            .get(address)
            .map_or(false, |a| a.contracts.contains_key(name))
    }

    /// Every `import X from 0x..` must name a contract deployed at that address
    fn check_imports(&self, code: &[u8]) -> Result<(), String> {
        let text = String::from_utf8_lossy(code);
        for line in text.lines() {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if let ["import", name, "from", location, ..] = tokens.as_slice() {
                let address = Address::from_hex(location)
                    .map_err(|_| format!("cannot resolve import of {name} from {location}"))?;
                if !self.has_contract(&address, name) {
                    return Err(format!("contract {name} is not deployed at {address}"));
                }
            }
        }
        Ok(())
    }
}

/// Mutable view handed to transaction handlers. Changes only reach the ledger if the handler
/// succeeds.
pub struct ExecutionContext<'a> {
    state: &'a mut LedgerState,
    authorizers: Vec<Address>,
    events: Vec<Event>,
}

impl<'a> ExecutionContext<'a> {
    /// Accounts that authorized the transaction, in declared order
    pub fn authorizers(&self) -> &[Address] {
        &self.authorizers
    }

    /// Authorizer at `position`, or an error if the transaction has too few
    pub fn signer(&self, position: usize) -> Result<Address, String> {
        self.authorizers.get(position).copied().ok_or_else(|| {
            format!(
                "transaction needs at least {} authorizer(s), got {}",
                position + 1,
                self.authorizers.len()
            )
        })
    }

    #[allow(missing_docs)]
    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Open a new account with a single key
    pub fn create_account(
        &mut self,
        public_key: PublicKey,
        hash_algorithm: HashAlgorithm,
    ) -> Address {
        self.state.create_account(public_key, hash_algorithm)
    }

    /// Deploy `code` as `name` on `address`. Fails if it is already there or if its imports
    /// do not resolve.
    pub fn add_contract(
        &mut self,
        address: &Address,
        name: &str,
        code: Vec<u8>,
    ) -> Result<(), String> {
        self.state.check_imports(&code)?;
        let account = self.state.account_mut(address)?;
        if account.contracts.contains_key(name) {
            return Err(format!("contract {name} already exists on {address}"));
        }
        account.contracts.insert(name.to_string(), code);
        Ok(())
    }

    /// Replace the code of an existing contract
    pub fn update_contract(
        &mut self,
        address: &Address,
        name: &str,
        code: Vec<u8>,
    ) -> Result<(), String> {
        self.state.check_imports(&code)?;
        let account = self.state.account_mut(address)?;
        match account.contracts.get_mut(name) {
            Some(existing) => {
                *existing = code;
                Ok(())
            }
            None => Err(format!("contract {name} does not exist on {address}")),
        }
    }

    #[allow(missing_docs)]
    pub fn remove_contract(&mut self, address: &Address, name: &str) -> Result<(), String> {
        self.state
            .account_mut(address)?
            .contracts
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| format!("contract {name} does not exist on {address}"))
    }

    /// Value stored under `path` on `address`
    pub fn load(&self, address: &Address, path: &str) -> Option<Value> {
        self.state
            .accounts
            .get(address)
            .and_then(|a| a.storage.get(path).cloned())
    }

    #[allow(missing_docs)]
    pub fn save(&mut self, address: &Address, path: &str, value: Value) -> Result<(), String> {
        self.state
            .account_mut(address)?
            .storage
            .insert(path.to_string(), value);
        Ok(())
    }

    fn into_events(self) -> Vec<Event> {
        self.events
    }
}

/// Read-only view handed to script handlers
pub struct QueryContext<'a> {
    state: &'a LedgerState,
}

impl<'a> QueryContext<'a> {
    #[allow(missing_docs)]
    pub fn account_exists(&self, address: &Address) -> bool {
        self.state.accounts.contains_key(address)
    }

    #[allow(missing_docs)]
    pub fn has_contract(&self, address: &Address, name: &str) -> bool {
        self.state.has_contract(address, name)
    }

    /// Names of the contracts on `address`, sorted
    pub fn contract_names(&self, address: &Address) -> Result<Vec<String>, String> {
        Ok(self.state.account(address)?.contracts.keys().cloned().collect())
    }

    /// Value stored under `path` on `address`
    pub fn load(&self, address: &Address, path: &str) -> Option<Value> {
        self.state
            .accounts
            .get(address)
            .and_then(|a| a.storage.get(path).cloned())
    }
}

/// Handle to an in-process ledger. Clones share the same ledger.
#[derive(Clone)]
pub struct EmbeddedGateway {
    state: Arc<Mutex<LedgerState>>,
    programs: Arc<Mutex<Programs>>,
}

impl EmbeddedGateway {
    /// Fresh ledger whose service account, the first address of the sequence, holds
    /// `service_key`
    pub fn new(service_key: PublicKey, hash_algorithm: HashAlgorithm) -> Self {
        let mut state = LedgerState::default();
        let service = state.create_account(service_key, hash_algorithm);
        info!(%service, "started embedded ledger");
        EmbeddedGateway {
            state: Arc::new(Mutex::new(state)),
            programs: Arc::new(Mutex::new(Programs::with_builtins())),
        }
    }

    /// Address of the service account
    pub fn service_address(&self) -> Address {
        sequence_address(0)
    }

    /// Run `handler` for transactions whose code is exactly `code`
    pub fn register_transaction(
        &self,
        code: &[u8],
        handler: TransactionHandler,
    ) -> GatewayResult<()> {
        self.lock_programs()?.register_transaction(code, handler);
        Ok(())
    }

    /// Run `handler` for queries whose code is exactly `code`
    pub fn register_script(&self, code: &[u8], handler: ScriptHandler) -> GatewayResult<()> {
        self.lock_programs()?.register_script(code, handler);
        Ok(())
    }

    fn lock_state(&self) -> GatewayResult<MutexGuard<'_, LedgerState>> {
        self.state
            .lock()
            .map_err(|e| GatewayError::Mutex(format!("{e:?}")))
    }

    fn lock_programs(&self) -> GatewayResult<MutexGuard<'_, Programs>> {
        self.programs
            .lock()
            .map_err(|e| GatewayError::Mutex(format!("{e:?}")))
    }

    fn process(&self, tx: &SignedTransaction) -> GatewayResult<TransactionResult> {
        let id = tx.id()?;
        let handler = self.lock_programs()?.transaction(tx.transaction().code());
        let mut state = self.lock_state()?;

        if let Err(detail) = validate(&*state, tx) {
            warn!(%id, %detail, "transaction refused");
            return Ok(rejected(id, detail));
        }
        let proposer = tx.transaction().proposer();
        if let Some(key) = state
            .accounts
            .get_mut(&proposer.address())
            .and_then(|a| a.keys.get_mut(proposer.key_index() as usize))
        {
            key.sequence_number += 1;
        }

        match execute(&*state, tx, handler) {
            Ok((next, events)) => {
                *state = next;
                debug!(%id, events = events.len(), "transaction sealed");
                Ok(TransactionResult {
                    id,
                    status: TransactionStatus::Sealed,
                    events,
                    error: None,
                })
            }
            Err(detail) => {
                warn!(%id, %detail, "transaction failed");
                Ok(rejected(id, detail))
            }
        }
    }

    fn query(&self, code: &[u8], arguments: &[Value]) -> GatewayResult<Value> {
        let handler = self.lock_programs()?.script(code);
        let state = self.lock_state()?;
        state.check_imports(code).map_err(GatewayError::Query)?;
        let handler = handler.ok_or_else(|| {
            GatewayError::Query(format!("no script is known for code {}", code_hash(code)))
        })?;
        handler(&QueryContext { state: &*state }, arguments).map_err(GatewayError::Query)
    }

    fn info(&self, address: &Address) -> GatewayResult<AccountInfo> {
        let state = self.lock_state()?;
        let account = state
            .accounts
            .get(address)
            .ok_or(GatewayError::AccountNotFound(*address))?;
        let keys = account
            .keys
            .iter()
            .enumerate()
            .map(|(index, key)| AccountKeyInfo {
                index: index as u32,
                public_key: key.public_key.to_hex(),
                signature_algorithm: key.public_key.algorithm(),
                hash_algorithm: key.hash_algorithm,
                sequence_number: key.sequence_number,
            })
            .collect();
        Ok(AccountInfo {
            address: *address,
            keys,
            contracts: account.contracts.clone(),
        })
    }
}

fn rejected(id: String, detail: String) -> TransactionResult {
    TransactionResult {
        id,
        status: TransactionStatus::Rejected,
        events: Vec::new(),
        error: Some(detail),
    }
}

fn validate(state: &LedgerState, tx: &SignedTransaction) -> Result<(), String> {
    let unsigned = tx.transaction();
    if unsigned.gas_limit() == 0 {
        return Err("gas limit must be positive".to_string());
    }
    if unsigned.authorizers().is_empty() {
        return Err("transaction has no authorizers".to_string());
    }
    let payload = unsigned.payload().map_err(|e| e.to_string())?;
    let envelope = unsigned
        .envelope(tx.sequence_number())
        .map_err(|e| e.to_string())?;

    for sig in tx.signatures() {
        let key = state.key(&sig.address, sig.key_index)?;
        let message = match sig.scope {
            SignatureScope::Payload => &payload,
            SignatureScope::Envelope => &envelope,
        };
        let valid = verify(
            &key.public_key,
            key.hash_algorithm,
            TRANSACTION_DOMAIN_TAG,
            message,
            &sig.signature,
        )
        .map_err(|e| format!("bad signature from {}: {e}", sig.address))?;
        if !valid {
            return Err(format!(
                "invalid {:?} signature from {}",
                sig.scope, sig.address
            ));
        }
    }

    let proposer = unsigned.proposer();
    let expected = state
        .key(&proposer.address(), proposer.key_index())?
        .sequence_number;
    if expected != tx.sequence_number() {
        return Err(format!(
            "sequence number mismatch for {}: expected {expected}, got {}",
            proposer.address(),
            tx.sequence_number()
        ));
    }

    let payer = unsigned.payer().address();
    if !tx.envelope_signatures().any(|s| s.address == payer) {
        return Err(format!("payer {payer} did not sign the envelope"));
    }
    let required = iter::once(proposer.address())
        .chain(unsigned.authorizers().iter().map(|a| a.address()));
    for address in required {
        if !tx.signatures().iter().any(|s| s.address == address) {
            return Err(format!("{address} did not sign the transaction"));
        }
    }
    Ok(())
}

fn execute(
    state: &LedgerState,
    tx: &SignedTransaction,
    handler: Option<TransactionHandler>,
) -> Result<(LedgerState, Vec<Event>), String> {
    let unsigned = tx.transaction();
    state.check_imports(unsigned.code())?;
    let handler = handler.ok_or_else(|| {
        format!(
            "no transaction is known for code {}",
            code_hash(unsigned.code())
        )
    })?;
    let mut working = state.clone();
    let mut context = ExecutionContext {
        state: &mut working,
        authorizers: addresses_from_accounts(unsigned.authorizers()),
        events: Vec::new(),
    };
    handler(&mut context, unsigned.arguments())?;
    let events = context.into_events();
    Ok((working, events))
}

#[async_trait]
impl Gateway for EmbeddedGateway {
    async fn ping(&self) -> GatewayResult<String> {
        self.lock_state()
            .map(|_| EMBEDDED_CHAIN_ID.to_string())
    }

    async fn submit_signed(&self, tx: &SignedTransaction) -> GatewayResult<TransactionResult> {
        self.process(tx)
    }

    async fn execute_query(&self, code: &[u8], arguments: &[Value]) -> GatewayResult<Value> {
        self.query(code, arguments)
    }

    async fn account_info(&self, address: &Address) -> GatewayResult<AccountInfo> {
        self.info(address)
    }
}
