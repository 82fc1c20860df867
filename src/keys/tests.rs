use super::*;

const P256_KEY: &str = "1111111111111111111111111111111111111111111111111111111111111111";

#[test]
fn algorithms_parse_from_canonical_names() {
    assert_eq!(
        "ECDSA_P256".parse::<SignatureAlgorithm>().unwrap(),
        SignatureAlgorithm::EcdsaP256
    );
    assert_eq!(
        "ECDSA_secp256k1".parse::<SignatureAlgorithm>().unwrap(),
        SignatureAlgorithm::EcdsaSecp256k1
    );
    assert_eq!(
        "SHA2_256".parse::<HashAlgorithm>().unwrap(),
        HashAlgorithm::Sha2_256
    );
    let err = "BLS_BLS12_381".parse::<SignatureAlgorithm>().unwrap_err();
    assert!(matches!(err, KeyError::UnsupportedAlgorithm(name) if name == "BLS_BLS12_381"));
}

#[test]
fn private_key_hex_accepts_prefix() {
    let plain = PrivateKey::from_hex(SignatureAlgorithm::EcdsaP256, P256_KEY).unwrap();
    let prefixed =
        PrivateKey::from_hex(SignatureAlgorithm::EcdsaP256, &format!("0x{P256_KEY}")).unwrap();
    assert_eq!(plain.public_key(), prefixed.public_key());
}

#[test]
fn zero_scalar_is_rejected() {
    let zero = "00".repeat(32);
    let err = PrivateKey::from_hex(SignatureAlgorithm::EcdsaP256, &zero).unwrap_err();
    assert!(matches!(err, KeyError::MalformedPrivateKey(_)));
}

#[test]
fn seeded_keys_are_deterministic() {
    for algorithm in [
        SignatureAlgorithm::EcdsaP256,
        SignatureAlgorithm::EcdsaSecp256k1,
    ] {
        let first = PrivateKey::from_seed(algorithm, "elephant ears").unwrap();
        let second = PrivateKey::from_seed(algorithm, "elephant ears").unwrap();
        let other = PrivateKey::from_seed(algorithm, "elephant tusks").unwrap();
        assert_eq!(first.public_key(), second.public_key());
        assert_ne!(first.public_key(), other.public_key());
    }
}

#[test]
fn public_key_hex_round_trips() {
    let key = PrivateKey::generate(SignatureAlgorithm::EcdsaSecp256k1).unwrap();
    let public = key.public_key();
    let hex_key = public.to_hex();
    assert_eq!(hex_key.len(), 128);
    let decoded = PublicKey::from_hex(SignatureAlgorithm::EcdsaSecp256k1, &hex_key).unwrap();
    assert_eq!(decoded, public);
}

#[test]
fn signatures_verify_only_under_the_same_tag_and_hash() {
    for algorithm in [
        SignatureAlgorithm::EcdsaP256,
        SignatureAlgorithm::EcdsaSecp256k1,
    ] {
        let key = PrivateKey::from_seed(algorithm, "signing").unwrap();
        let public = key.public_key();
        let signer = InMemorySigner::new(key, HashAlgorithm::Sha3_256);
        let message = b"test";

        let sig = signer.sign(TRANSACTION_DOMAIN_TAG, message).unwrap();
        assert_eq!(sig.len(), 64);
        assert!(verify(
            &public,
            HashAlgorithm::Sha3_256,
            TRANSACTION_DOMAIN_TAG,
            message,
            &sig
        )
        .unwrap());
        assert!(!verify(&public, HashAlgorithm::Sha3_256, USER_DOMAIN_TAG, message, &sig).unwrap());
        assert!(!verify(
            &public,
            HashAlgorithm::Sha2_256,
            TRANSACTION_DOMAIN_TAG,
            message,
            &sig
        )
        .unwrap());
    }
}

#[test]
fn user_messages_sign_and_verify() {
    let key = PrivateKey::from_hex(SignatureAlgorithm::EcdsaP256, P256_KEY).unwrap();
    let public = key.public_key();
    let signer = InMemorySigner::new(key, HashAlgorithm::Sha2_256);

    let sig = sign_user_message(&signer, b"hello").unwrap();

    assert!(verify_user_signature(&public, HashAlgorithm::Sha2_256, b"hello", &sig).unwrap());
    assert!(!verify_user_signature(&public, HashAlgorithm::Sha2_256, b"goodbye", &sig).unwrap());
}

#[test]
fn domain_tag_is_padded_to_fixed_length() {
    let framed = tagged_message("ABC", b"xy");
    assert_eq!(framed.len(), DOMAIN_TAG_LENGTH + 2);
    assert_eq!(&framed[..3], b"ABC");
    assert!(framed[3..DOMAIN_TAG_LENGTH].iter().all(|b| *b == 0));
    assert_eq!(&framed[DOMAIN_TAG_LENGTH..], b"xy");
}
