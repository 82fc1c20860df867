use super::*;
use crate::{
    account::{Account, AccountKey},
    keys::{HashAlgorithm, SignatureAlgorithm},
    signer::{sign_at_sequence, KeyResolver},
    transaction::UnsignedTransaction,
};
use ledger_http_client::models::{AccountKeyResponse, EventResponse};
use serde_json::json;
use std::collections::HashMap;

fn account(n: u64) -> Account {
    Account::new(Address::from(n), AccountKey::new(&format!("{n:02}").repeat(32)))
}

#[test]
fn body_carries_signatures_by_scope() {
    let tx = UnsignedTransaction::new(b"transaction {}".to_vec(), account(1))
        .with_payer(account(2))
        .add_argument("hi")
        .add_argument(7u64);
    let signed = sign_at_sequence(tx, 4, &KeyResolver::default()).unwrap();
    let body = transaction_body(&signed).unwrap();

    assert_eq!(body.script, hex::encode("transaction {}"));
    assert_eq!(body.gas_limit, "9999");
    assert_eq!(body.proposal_key.address, "0x0000000000000001");
    assert_eq!(body.proposal_key.sequence_number, "4");
    assert_eq!(body.payer, "0x0000000000000002");
    assert_eq!(
        body.authorizers,
        vec!["0x0000000000000001", "0x0000000000000002"]
    );
    assert_eq!(body.payload_signatures.len(), 1);
    assert_eq!(body.payload_signatures[0].address, "0x0000000000000001");
    assert_eq!(body.envelope_signatures.len(), 1);
    assert_eq!(body.envelope_signatures[0].address, "0x0000000000000002");
    assert_eq!(body.arguments[0], json!({ "type": "String", "value": "hi" }));
}

#[test]
fn sealed_result_maps_account_created_event() {
    let res = TransactionResultResponse {
        status: ExecutionStatus::Sealed,
        error_message: String::new(),
        events: vec![EventResponse {
            event_type: NODE_ACCOUNT_CREATED_EVENT.to_string(),
            payload: json!({ "address": "0x00000000000000ab" }),
        }],
    };
    let result = transaction_result("abc".to_string(), res);
    assert!(result.is_sealed());
    let address = result
        .events_named(ACCOUNT_CREATED_EVENT)
        .next()
        .and_then(|e| e.field("address"))
        .and_then(Value::as_address);
    assert_eq!(address, Some(Address::from(0xab)));
}

#[test]
fn error_message_or_expiry_rejects() {
    let failed = TransactionResultResponse {
        status: ExecutionStatus::Executed,
        error_message: "panic: nope".to_string(),
        events: vec![],
    };
    let result = transaction_result("a".to_string(), failed);
    assert_eq!(result.status, TransactionStatus::Rejected);
    assert_eq!(result.error.as_deref(), Some("panic: nope"));

    let expired = TransactionResultResponse {
        status: ExecutionStatus::Expired,
        error_message: String::new(),
        events: vec![],
    };
    let result = transaction_result("b".to_string(), expired);
    assert_eq!(result.status, TransactionStatus::Rejected);
    assert!(result.error.unwrap().contains("Expired"));
}

#[test]
fn account_response_becomes_account_info() {
    let key = |index: &str, revoked| AccountKeyResponse {
        index: index.to_string(),
        public_key: "0xabcd".to_string(),
        signing_algorithm: "ECDSA_secp256k1".to_string(),
        hashing_algorithm: "SHA2_256".to_string(),
        sequence_number: "42".to_string(),
        revoked,
    };
    let res = AccountResponse {
        address: "0x0000000000000003".to_string(),
        keys: vec![key("0", true), key("1", false)],
        contracts: HashMap::from([("Foo".to_string(), hex::encode("pub contract Foo {}"))]),
    };
    let info = account_info(res).unwrap();
    assert_eq!(info.address, Address::from(3));
    assert_eq!(info.keys.len(), 1);
    let key = info.key(1).unwrap();
    assert_eq!(key.public_key, "abcd");
    assert_eq!(key.signature_algorithm, SignatureAlgorithm::EcdsaSecp256k1);
    assert_eq!(key.hash_algorithm, HashAlgorithm::Sha2_256);
    assert_eq!(key.sequence_number, 42);
    assert_eq!(info.contracts["Foo"], b"pub contract Foo {}".to_vec());
}

#[test]
fn malformed_account_response_is_invalid() {
    let res = AccountResponse {
        address: "0x01".to_string(),
        keys: vec![AccountKeyResponse {
            index: "zero".to_string(),
            public_key: "ab".to_string(),
            signing_algorithm: "ECDSA_P256".to_string(),
            hashing_algorithm: "SHA3_256".to_string(),
            sequence_number: "0".to_string(),
            revoked: false,
        }],
        contracts: HashMap::new(),
    };
    assert!(matches!(
        account_info(res),
        Err(GatewayError::InvalidResponse(_))
    ));
}

#[ignore]
#[tokio::test]
async fn ping_live_emulator() {
    let gateway = RemoteGateway::new(ledger_http_client::EMULATOR_URL);
    let chain_id = gateway.ping().await.unwrap();
    dbg!(chain_id);
}
