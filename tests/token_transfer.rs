use galley::{
    gateway::embedded::{programs::address_argument, ExecutionContext, QueryContext},
    registry::AccountEntry,
    Address, ClientBuilder, ClientSession, Registry, TransactionStatus, Value,
};
use std::sync::Arc;

const BALANCE_PATH: &str = "/storage/tokenVault";

const MINT: &str = "import Token from 0xToken\ntransaction(amount: UInt64) { prepare(minter: AuthAccount) {} }";
const TRANSFER: &str = "import Token from 0xToken\n\
transaction(to: Address, amount: UInt64) { prepare(from: AuthAccount, payer: AuthAccount) {} }";
const BALANCE: &str = "import Token from 0xToken\npub fun main(owner: Address): UInt64";

fn balance_of(load: Option<Value>) -> u64 {
    load.as_ref().and_then(Value::as_u64).unwrap_or(0)
}

fn amount(args: &[Value], index: usize) -> Result<u64, String> {
    args.get(index)
        .and_then(Value::as_u64)
        .ok_or_else(|| format!("argument {index} must be a UInt64"))
}

async fn session() -> ClientSession {
    let key = |n: u8| format!("{n}{n}").repeat(32);
    let registry = Registry::default()
        .with_network("emulator", "http://127.0.0.1:8888")
        .with_account("emulator", "svc", AccountEntry::new(Address::from(1), Some(&key(1))))
        .with_account("emulator", "alice", AccountEntry::new(Address::from(2), Some(&key(2))))
        .with_account("emulator", "bob", AccountEntry::new(Address::from(3), Some(&key(3))))
        .with_account("emulator", "carol", AccountEntry::new(Address::from(4), Some(&key(4))))
        .with_contract(
            "Token",
            "contracts/Token.cdc",
            &[("emulator", "0x0000000000000002")],
        );
    let session = ClientBuilder::new()
        .with_registry(registry)
        .start()
        .await
        .unwrap();

    // Token is only aliased, so bootstrap leaves deploying it to us
    let alice = session.account("alice").unwrap();
    session
        .deploy_contract(&alice, "Token", "pub contract Token {}")
        .await
        .unwrap();

    let mint = |ctx: &mut ExecutionContext<'_>, args: &[Value]| -> Result<(), String> {
        let minter = ctx.signer(0)?;
        let balance = balance_of(ctx.load(&minter, BALANCE_PATH)) + amount(args, 0)?;
        ctx.save(&minter, BALANCE_PATH, Value::UInt64(balance))
    };
    let transfer = |ctx: &mut ExecutionContext<'_>, args: &[Value]| -> Result<(), String> {
        let from = ctx.signer(0)?;
        let to = address_argument(args, 0, "to")?;
        let amount = amount(args, 1)?;
        let from_balance = balance_of(ctx.load(&from, BALANCE_PATH));
        let remaining = from_balance
            .checked_sub(amount)
            .ok_or_else(|| format!("insufficient balance: {from_balance} < {amount}"))?;
        ctx.save(&from, BALANCE_PATH, Value::UInt64(remaining))?;
        let to_balance = balance_of(ctx.load(&to, BALANCE_PATH)) + amount;
        ctx.save(&to, BALANCE_PATH, Value::UInt64(to_balance))
    };
    let balance = |ctx: &QueryContext<'_>, args: &[Value]| -> Result<Value, String> {
        let owner = address_argument(args, 0, "owner")?;
        Ok(Value::UInt64(balance_of(ctx.load(&owner, BALANCE_PATH))))
    };
    session.register_transaction(MINT, Arc::new(mint)).unwrap();
    session
        .register_transaction(TRANSFER, Arc::new(transfer))
        .unwrap();
    session.register_script(BALANCE, Arc::new(balance)).unwrap();
    session
}

async fn balance(session: &ClientSession, owner: &str) -> u64 {
    let owner = session.account(owner).unwrap().address();
    session
        .new_query_from_str(BALANCE)
        .argument(owner)
        .execute()
        .await
        .unwrap()
        .as_u64()
        .unwrap()
}

#[tokio::test]
async fn mint_then_transfer_with_a_separate_payer() {
    let session = session().await;
    let alice = session.actor("alice").unwrap();
    let bob = session.account("bob").unwrap();
    let carol = session.account("carol").unwrap();

    alice
        .new_transaction_from_str(MINT)
        .argument(100u64)
        .sign_and_send()
        .await
        .unwrap()
        .into_sealed()
        .unwrap();
    assert_eq!(balance(&session, "alice").await, 100);

    let result = alice
        .new_transaction_from_str(TRANSFER)
        .payer(bob)
        .argument(carol.address())
        .argument(30u64)
        .sign_and_send()
        .await
        .unwrap();
    assert!(result.is_sealed(), "{:?}", result.error);
    assert_eq!(balance(&session, "alice").await, 70);
    assert_eq!(balance(&session, "carol").await, 30);
}

#[tokio::test]
async fn overdrawn_transfer_is_rejected_and_changes_nothing() {
    let session = session().await;
    let alice = session.actor("alice").unwrap();
    let carol = session.account("carol").unwrap();
    alice
        .new_transaction_from_str(MINT)
        .argument(10u64)
        .sign_and_send()
        .await
        .unwrap();

    let result = alice
        .new_transaction_from_str(TRANSFER)
        .payer(carol.clone())
        .argument(carol.address())
        .argument(11u64)
        .sign_and_send()
        .await
        .unwrap();
    assert_eq!(result.status, TransactionStatus::Rejected);
    assert!(result.error.unwrap().contains("insufficient balance"));
    assert_eq!(balance(&session, "alice").await, 10);
    assert_eq!(balance(&session, "carol").await, 0);
}

#[tokio::test]
async fn code_importing_an_undeployed_contract_is_rejected() {
    let session = session().await;
    let result = session
        .actor("bob")
        .unwrap()
        .new_transaction_from_str("import Missing from 0xMissing\ntransaction {}")
        .sign_and_send()
        .await
        .unwrap();
    assert_eq!(result.status, TransactionStatus::Rejected);
    assert!(result.error.unwrap().contains("Missing"));
}
