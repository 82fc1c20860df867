use super::*;

const REGISTRY: &str = r#"{
  "networks": { "emulator": "http://127.0.0.1:8888", "testnet": "https://access.testnet.example" },
  "accounts": {
    "emulator-svc": { "address": "0x01", "key": "1111111111111111111111111111111111111111111111111111111111111111" },
    "emulator-carol": { "address": "0x04", "key": "4444444444444444444444444444444444444444444444444444444444444444" },
    "emulator-alice": {
      "address": "0x02",
      "key": {
        "privateKey": "2222222222222222222222222222222222222222222222222222222222222222",
        "index": 1,
        "signatureAlgorithm": "ECDSA_secp256k1",
        "hashAlgorithm": "SHA2_256"
      }
    },
    "emulator-bob": { "address": "0x03", "key": "3333333333333333333333333333333333333333333333333333333333333333" },
    "emulator-watcher": { "address": "0x0a" },
    "testnet-alice": { "address": "0xf8d6e0586b0a20c7" }
  },
  "contracts": {
    "Token": { "source": "./contracts/Token.cdc" },
    "FungibleToken": { "source": "./contracts/FungibleToken.cdc", "aliases": { "testnet": "9a0766d93b6608b7" } }
  },
  "deployments": {
    "emulator": { "emulator-alice": ["FungibleToken", "Token"] }
  }
}"#;

fn registry() -> Registry {
    Registry::from_json(REGISTRY).unwrap()
}

#[test]
fn account_by_short_and_full_name() {
    let registry = registry();
    let short = registry.account_by_name("emulator", "alice").unwrap();
    let full = registry.account_by_name("emulator", "emulator-alice").unwrap();
    assert_eq!(short, full);
    assert_eq!(short.address(), Address::from(2));
    assert_eq!(short.key_index(), 1);
    let key = short.key().unwrap();
    assert_eq!(
        key.signature_algorithm(),
        Some(SignatureAlgorithm::EcdsaSecp256k1)
    );
    assert_eq!(key.hash_algorithm(), Some(HashAlgorithm::Sha2_256));
}

#[test]
fn missing_account_is_an_explicit_error() {
    let err = registry().account_by_name("testnet", "bob").unwrap_err();
    assert!(matches!(
        err,
        RegistryError::AccountNotFound { network, name } if network == "testnet" && name == "bob"
    ));
}

#[test]
fn service_account_and_unqualified_accounts() {
    let registry = registry();
    let svc = registry.service_account("emulator").unwrap();
    assert_eq!(svc.address(), Address::from(1));
    assert!(svc.is_qualified());
    let watcher = registry.account_by_name("emulator", "watcher").unwrap();
    assert!(!watcher.is_qualified());
    assert!(matches!(
        registry.service_account("testnet"),
        Err(RegistryError::AccountNotFound { .. })
    ));
}

#[test]
fn accounts_for_network_only_includes_that_network() {
    let accounts = registry().accounts_for_network("testnet").unwrap();
    let names: Vec<_> = accounts.keys().cloned().collect();
    assert_eq!(names, vec!["alice".to_string()]);
}

#[test]
fn accounts_sorted_follows_address_sequence() {
    let sorted = registry().accounts_sorted("emulator").unwrap();
    let names: Vec<_> = sorted.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, vec!["svc", "alice", "bob", "carol", "watcher"]);
}

#[test]
fn contract_address_prefers_alias_over_deployment() {
    let registry = registry();
    let emulator = registry.contracts_for_network("emulator").unwrap();
    assert_eq!(
        emulator["FungibleToken"].address.as_deref(),
        Some("0x02")
    );
    assert_eq!(emulator["Token"].address.as_deref(), Some("0x02"));
    assert_eq!(emulator["Token"].source, "./contracts/Token.cdc");

    let testnet = registry.contracts_for_network("testnet").unwrap();
    assert_eq!(
        testnet["FungibleToken"].address.as_deref(),
        Some("0x9a0766d93b6608b7")
    );
    assert_eq!(testnet["Token"].address, None);
}

#[test]
fn deployments_keep_declared_order() {
    let registry = registry();
    assert_eq!(
        registry.deployments_for_account("emulator", "alice").unwrap(),
        vec!["FungibleToken".to_string(), "Token".to_string()]
    );
    assert!(registry
        .deployments_for_account("emulator", "bob")
        .unwrap()
        .is_empty());
    assert!(matches!(
        registry.deployments_for_account("emulator", "mallory"),
        Err(RegistryError::AccountNotFound { name, .. }) if name == "mallory"
    ));
}

#[test]
fn deployments_may_name_accounts_by_short_name() {
    let registry = Registry::from_json(
        r#"{
          "accounts": { "emulator-alice": { "address": "0x02" } },
          "contracts": { "Token": { "source": "./contracts/Token.cdc" } },
          "deployments": { "emulator": { "alice": ["Token"] } }
        }"#,
    )
    .unwrap();
    assert_eq!(
        registry.deployments_for_account("emulator", "alice").unwrap(),
        vec!["Token".to_string()]
    );
    assert_eq!(
        registry
            .deployments_for_account("emulator", "emulator-alice")
            .unwrap(),
        vec!["Token".to_string()]
    );
    let contracts = registry.contracts_for_network("emulator").unwrap();
    assert_eq!(contracts["Token"].address.as_deref(), Some("0x02"));
}

#[test]
fn unknown_network() {
    let registry = registry();
    assert_eq!(registry.network("emulator").unwrap(), "http://127.0.0.1:8888");
    assert!(matches!(
        registry.network("mainnet"),
        Err(RegistryError::NetworkNotFound(n)) if n == "mainnet"
    ));
}

#[test]
fn unsupported_algorithm_is_a_key_error() {
    let registry = Registry::from_json(
        r#"{"accounts": {"emulator-x": {"address": "0x05", "key": {"privateKey": "11", "signatureAlgorithm": "RSA"}}}}"#,
    )
    .unwrap();
    let err = registry.account_by_name("emulator", "x").unwrap_err();
    assert!(matches!(
        err,
        RegistryError::InvalidKey {
            source: KeyError::UnsupportedAlgorithm(_),
            ..
        }
    ));
}

#[test]
fn programmatic_registry_matches_parsed_one() {
    let built = Registry::default()
        .with_network("emulator", "http://127.0.0.1:8888")
        .with_account("emulator", "alice", AccountEntry::new(Address::from(2), Some("22")))
        .with_contract("Foo", "./Foo.cdc", &[])
        .with_deployment("emulator", "alice", &["Foo"]);
    let reparsed = Registry::from_json(&built.to_json().unwrap()).unwrap();
    let contracts = reparsed.contracts_for_network("emulator").unwrap();
    assert_eq!(contracts["Foo"].address.as_deref(), Some("0x0000000000000002"));
}

#[tokio::test]
async fn load_reports_the_missing_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(REGISTRY_FILE);
    let err = Registry::load(&path).await.unwrap_err();
    assert!(matches!(err, RegistryError::FileRead { path: p, .. } if p == path));

    tokio::fs::write(&path, REGISTRY).await.unwrap();
    let loaded = Registry::load(&path).await.unwrap();
    assert_eq!(loaded.networks(), vec!["emulator", "testnet"]);
}
