use super::{ExecutionContext, QueryContext};
use crate::{
    address::Address,
    gateway::Event,
    keys::{HashAlgorithm, PublicKey, SignatureAlgorithm},
    templates,
    values::Value,
};
use sha3::{Digest, Sha3_256};
use std::{collections::HashMap, sync::Arc};

/// Event emitted by the built-in account creation, with an `address` field
pub const ACCOUNT_CREATED_EVENT: &str = "galley.AccountCreated";

/// Behaviour of a transaction on the embedded ledger
pub type TransactionHandler =
    Arc<dyn Fn(&mut ExecutionContext<'_>, &[Value]) -> Result<(), String> + Send + Sync>;

/// Behaviour of a script on the embedded ledger
pub type ScriptHandler =
    Arc<dyn Fn(&QueryContext<'_>, &[Value]) -> Result<Value, String> + Send + Sync>;

/// Hex SHA3-256 of a program's code, the key programs are registered under
pub fn code_hash(code: &[u8]) -> String {
    hex::encode(Sha3_256::digest(code))
}

/// Known programs, by code hash
#[derive(Clone, Default)]
pub struct Programs {
    transactions: HashMap<String, TransactionHandler>,
    scripts: HashMap<String, ScriptHandler>,
}

impl Programs {
    /// The programs the client itself relies on: account creation, contract management and
    /// contract lookups
    pub fn with_builtins() -> Self {
        let mut programs = Programs::default();
        programs.register_transaction(
            templates::TX_CREATE_ACCOUNT.as_bytes(),
            Arc::new(create_account),
        );
        programs.register_transaction(
            templates::TX_CONTRACT_DEPLOY.as_bytes(),
            Arc::new(deploy_contract),
        );
        programs.register_transaction(
            templates::TX_CONTRACT_UPDATE.as_bytes(),
            Arc::new(update_contract),
        );
        programs.register_transaction(
            templates::TX_CONTRACT_REMOVE.as_bytes(),
            Arc::new(remove_contract),
        );
        programs.register_script(
            templates::SC_CONTRACT_CHECK.as_bytes(),
            Arc::new(contract_exists),
        );
        programs.register_script(
            templates::SC_CONTRACT_NAMES.as_bytes(),
            Arc::new(contract_names),
        );
        programs
    }

    #[allow(missing_docs)]
    pub fn register_transaction(&mut self, code: &[u8], handler: TransactionHandler) {
        self.transactions.insert(code_hash(code), handler);
    }

    #[allow(missing_docs)]
    pub fn register_script(&mut self, code: &[u8], handler: ScriptHandler) {
        self.scripts.insert(code_hash(code), handler);
    }

    #[allow(missing_docs)]
    pub fn transaction(&self, code: &[u8]) -> Option<TransactionHandler> {
        self.transactions.get(&code_hash(code)).cloned()
    }

    #[allow(missing_docs)]
    pub fn script(&self, code: &[u8]) -> Option<ScriptHandler> {
        self.scripts.get(&code_hash(code)).cloned()
    }
}

/// Fail unless exactly `expected` arguments were passed
pub fn expect_arguments(arguments: &[Value], expected: usize) -> Result<(), String> {
    if arguments.len() != expected {
        return Err(format!(
            "expected {expected} argument(s), got {}",
            arguments.len()
        ));
    }
    Ok(())
}

/// String argument at `index`
pub fn string_argument<'v>(
    arguments: &'v [Value],
    index: usize,
    name: &str,
) -> Result<&'v str, String> {
    arguments
        .get(index)
        .and_then(Value::as_str)
        .ok_or_else(|| format!("argument {index} ({name}) must be a String"))
}

/// Address argument at `index`
pub fn address_argument(arguments: &[Value], index: usize, name: &str) -> Result<Address, String> {
    arguments
        .get(index)
        .and_then(Value::as_address)
        .ok_or_else(|| format!("argument {index} ({name}) must be an Address"))
}

fn create_account(ctx: &mut ExecutionContext<'_>, arguments: &[Value]) -> Result<(), String> {
    expect_arguments(arguments, 3)?;
    ctx.signer(0)?;
    let signature_algorithm: SignatureAlgorithm =
        string_argument(arguments, 1, "signatureAlgorithm")?
            .parse()
            .map_err(|e| format!("{e}"))?;
    let hash_algorithm: HashAlgorithm = string_argument(arguments, 2, "hashAlgorithm")?
        .parse()
        .map_err(|e| format!("{e}"))?;
    let public_key = PublicKey::from_hex(
        signature_algorithm,
        string_argument(arguments, 0, "publicKey")?,
    )
    .map_err(|e| format!("{e}"))?;
    let address = ctx.create_account(public_key, hash_algorithm);
    ctx.emit(Event::new(
        ACCOUNT_CREATED_EVENT,
        vec![("address", Value::Address(address))],
    ));
    Ok(())
}

fn decoded_code(arguments: &[Value]) -> Result<Vec<u8>, String> {
    hex::decode(string_argument(arguments, 1, "code")?)
        .map_err(|e| format!("contract code is not hex: {e}"))
}

fn deploy_contract(ctx: &mut ExecutionContext<'_>, arguments: &[Value]) -> Result<(), String> {
    expect_arguments(arguments, 2)?;
    let signer = ctx.signer(0)?;
    let name = string_argument(arguments, 0, "name")?;
    ctx.add_contract(&signer, name, decoded_code(arguments)?)
}

fn update_contract(ctx: &mut ExecutionContext<'_>, arguments: &[Value]) -> Result<(), String> {
    expect_arguments(arguments, 2)?;
    let signer = ctx.signer(0)?;
    let name = string_argument(arguments, 0, "name")?;
    ctx.update_contract(&signer, name, decoded_code(arguments)?)
}

fn remove_contract(ctx: &mut ExecutionContext<'_>, arguments: &[Value]) -> Result<(), String> {
    expect_arguments(arguments, 1)?;
    let signer = ctx.signer(0)?;
    ctx.remove_contract(&signer, string_argument(arguments, 0, "name")?)
}

fn contract_exists(ctx: &QueryContext<'_>, arguments: &[Value]) -> Result<Value, String> {
    expect_arguments(arguments, 2)?;
    let address = address_argument(arguments, 0, "address")?;
    let name = string_argument(arguments, 1, "name")?;
    Ok(Value::Bool(ctx.has_contract(&address, name)))
}

fn contract_names(ctx: &QueryContext<'_>, arguments: &[Value]) -> Result<Value, String> {
    expect_arguments(arguments, 1)?;
    let address = address_argument(arguments, 0, "address")?;
    let names = ctx
        .contract_names(&address)?
        .into_iter()
        .map(Value::String)
        .collect();
    Ok(Value::Array(names))
}
