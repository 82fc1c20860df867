use super::*;
use crate::{
    bootstrap::{ClientBuilder, EMULATOR_NETWORK},
    gateway::{embedded::ExecutionContext, TransactionStatus},
    registry::AccountEntry,
    transaction::SignatureScope,
};
use std::sync::Arc;

const SVC_KEY: &str = "1111111111111111111111111111111111111111111111111111111111111111";
const ALICE_KEY: &str = "2222222222222222222222222222222222222222222222222222222222222222";
const BOB_KEY: &str = "3333333333333333333333333333333333333333333333333333333333333333";

async fn session() -> ClientSession {
    let registry = Registry::default()
        .with_network(EMULATOR_NETWORK, "http://127.0.0.1:8888")
        .with_account(
            EMULATOR_NETWORK,
            "svc",
            AccountEntry::new(Address::from(1), Some(SVC_KEY)),
        )
        .with_account(
            EMULATOR_NETWORK,
            "alice",
            AccountEntry::new(Address::from(2), Some(ALICE_KEY)),
        )
        .with_account(
            EMULATOR_NETWORK,
            "bob",
            AccountEntry::new(Address::from(3), Some(BOB_KEY)),
        )
        .with_account(
            EMULATOR_NETWORK,
            "watcher",
            AccountEntry::new(Address::from(0x20), None),
        )
        .with_contract("Greeting", "contracts/Greeting.cdc", &[]);
    ClientBuilder::new()
        .with_registry(registry)
        .start()
        .await
        .unwrap()
}

const SET_GREETING: &str = "transaction(greeting: String) { prepare(a: AuthAccount, b: AuthAccount) {} }";
const GET_GREETING: &str = "pub fun main(owner: Address): String";

fn register_greeting(session: &ClientSession) {
    session
        .register_transaction(
            SET_GREETING,
            Arc::new(
                |ctx: &mut ExecutionContext<'_>, args: &[Value]| -> std::result::Result<(), String> {
                    let greeting = args
                        .first()
                        .cloned()
                        .ok_or_else(|| "greeting missing".to_string())?;
                    for position in 0..ctx.authorizers().len() {
                        let signer = ctx.signer(position)?;
                        ctx.save(&signer, "/storage/greeting", greeting.clone())?;
                    }
                    Ok(())
                },
            ),
        )
        .unwrap();
    session
        .register_script(
            GET_GREETING,
            Arc::new(
                |ctx: &crate::gateway::embedded::QueryContext<'_>,
                 args: &[Value]|
                 -> std::result::Result<Value, String> {
                    let owner = args
                        .first()
                        .and_then(Value::as_address)
                        .ok_or_else(|| "owner missing".to_string())?;
                    Ok(ctx.load(&owner, "/storage/greeting").unwrap_or(Value::Void))
                },
            ),
        )
        .unwrap();
}

#[tokio::test]
async fn accounts_are_looked_up_through_the_registry() {
    let session = session().await;
    assert_eq!(session.account("alice").unwrap().address(), Address::from(2));
    assert_eq!(
        session.account("emulator-bob").unwrap().address(),
        Address::from(3)
    );
    assert_eq!(session.account("svc").unwrap().address(), Address::from(1));
    assert_eq!(
        session.account_names().unwrap(),
        vec!["svc", "alice", "bob", "watcher"]
    );
    assert!(matches!(
        session.account("mallory"),
        Err(Error::Registry(RegistryError::AccountNotFound { .. }))
    ));
}

#[tokio::test]
async fn two_party_transaction_is_signed_and_executed() {
    let session = session().await;
    register_greeting(&session);
    let alice = session.account("alice").unwrap();
    let bob = session.account("bob").unwrap();

    let signed = session
        .new_transaction_from_str(SET_GREETING)
        .proposer(alice.clone())
        .payer(bob.clone())
        .argument("hello")
        .sign()
        .await
        .unwrap();
    let scopes: Vec<_> = signed
        .inner()
        .signatures()
        .iter()
        .map(|s| (s.address, s.scope))
        .collect();
    assert_eq!(
        scopes,
        vec![
            (bob.address(), SignatureScope::Envelope),
            (alice.address(), SignatureScope::Payload)
        ]
    );
    assert!(signed.send().await.unwrap().is_sealed());

    for owner in [alice.address(), bob.address()] {
        let greeting = session
            .new_query_from_str(GET_GREETING)
            .argument(owner)
            .execute()
            .await
            .unwrap();
        assert_eq!(greeting, Value::string("hello"));
    }
}

#[tokio::test]
async fn empty_authorizers_are_refused_before_anything_else() {
    let session = session().await;
    let err = session
        .new_transaction(b"transaction {}".to_vec())
        .signer(session.account("alice").unwrap())
        .authorizers(vec![])
        .sign()
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Signing(SigningError::EmptyAuthorizers)));

    let err = session
        .new_transaction(b"transaction {}".to_vec())
        .sign()
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Signing(SigningError::NoProposer)));
}

#[tokio::test]
async fn replaced_authorizers_must_keep_the_proposer() {
    let session = session().await;
    let alice = session.account("alice").unwrap();
    let bob = session.account("bob").unwrap();

    let err = session
        .new_transaction(b"transaction {}".to_vec())
        .proposer(alice.clone())
        .authorizers(vec![bob.clone()])
        .sign()
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Signing(SigningError::ProposerNotAuthorizer(a)) if a == alice.address()
    ));

    let tx = session
        .new_transaction(b"transaction {}".to_vec())
        .signer(alice.clone())
        .authorizers(vec![bob.clone()])
        .build()
        .unwrap();
    assert_eq!(tx.authorizers(), &[bob, alice.clone()]);
    assert_eq!(tx.payer(), &alice);
}

#[tokio::test]
async fn unqualified_accounts_cannot_sign() {
    let session = session().await;
    let err = session
        .actor("watcher")
        .unwrap()
        .new_transaction(b"transaction {}".to_vec())
        .sign()
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Signing(SigningError::Unqualified(address)) if address == Address::from(0x20)
    ));
}

#[tokio::test]
async fn rejection_is_a_result_until_asked_otherwise() {
    let session = session().await;
    let result = session
        .actor("alice")
        .unwrap()
        .new_transaction(b"transaction { execute { panic(\"no\") } }".to_vec())
        .sign_and_send()
        .await
        .unwrap();
    assert_eq!(result.status, TransactionStatus::Rejected);
    assert!(matches!(result.into_sealed(), Err(Error::Rejected { .. })));
}

#[tokio::test]
async fn contract_lifecycle_through_the_session() {
    let session = session().await;
    let alice = session.actor("alice").unwrap();
    alice
        .deploy_contract("Greeting", "pub contract Greeting {}")
        .await
        .unwrap();
    assert!(session
        .contract_exists(&alice.address(), "Greeting")
        .await
        .unwrap());
    assert_eq!(alice.contract_names().await.unwrap(), vec!["Greeting"]);

    session
        .update_contract(alice.account(), "Greeting", "pub contract Greeting { }")
        .await
        .unwrap();
    session
        .remove_contract(alice.account(), "Greeting")
        .await
        .unwrap();
    assert!(!session
        .contract_exists(&alice.address(), "Greeting")
        .await
        .unwrap());
}

#[tokio::test]
async fn created_accounts_can_sign() {
    let session = session().await;
    let account = session.create_disposable_account().await.unwrap();
    assert_eq!(account.address(), Address::from(4));
    let result = session
        .actor_for(account)
        .deploy_contract("Scratch", "pub contract Scratch {}")
        .await
        .unwrap();
    assert!(result.is_sealed());
}

#[tokio::test]
async fn sources_are_read_from_the_root_and_resolved() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = session().await;
    session.root = dir.path().to_path_buf();
    session.resolver = ImportResolver::new(
        EMULATOR_NETWORK,
        BTreeMap::from([("Greeting".to_string(), "0000000000000002".to_string())]),
    );
    tokio::fs::write(
        dir.path().join("tx.cdc"),
        "import Greeting from \"./contracts/Greeting.cdc\"\ntransaction {}",
    )
    .await
    .unwrap();
    let text = session.source_from_file(Path::new("tx.cdc")).await.unwrap();
    assert_eq!(
        text,
        "import Greeting from 0x0000000000000002\ntransaction {}"
    );
    assert_eq!(
        session.contract_address("Greeting"),
        Some("0x0000000000000002")
    );
    assert!(matches!(
        session.new_query_from_file(Path::new("missing.cdc")).await,
        Err(Error::Source(_))
    ));
}
