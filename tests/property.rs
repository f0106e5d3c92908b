//! Property-based tests for the crypto, derivation, and codec layers

use proptest::prelude::*;

use nbx_core::crypto::hash::digest;
use nbx_core::crypto::sign::{sign_digest, verify_signature, PrivateKey, Signature};
use nbx_core::tx::builder::{build_payment, build_transaction, PaymentOutput, TransactionParams};
use nbx_core::tx::model::{Note, RawTx};
use nbx_core::wallet::address::{
    address_to_public_key, is_valid_address, public_key_to_address, AddressVersion,
};
use nbx_core::wallet::derivation::ExtendedKey;
use nbx_core::wallet::keygen::{master_key_from_mnemonic, validate_mnemonic};

fn test_note(owner: nbx_core::crypto::sign::PublicKey, assets: u64) -> Note {
    Note::new(
        0,
        1,
        None,
        None,
        digest(b"name-first"),
        digest(b"name-last"),
        vec![owner],
        1,
        digest(b"source"),
        false,
        assets,
    )
    .unwrap()
}

proptest! {
    #[test]
    fn v0_address_roundtrips(key_bytes in any::<[u8; 32]>()) {
        let public = PrivateKey::from_bytes(&key_bytes).unwrap().public_key();
        let address = public_key_to_address(&public, AddressVersion::V0);

        prop_assert_eq!(address.len(), 132);
        prop_assert!(is_valid_address(&address));
        let decoded = address_to_public_key(&address).unwrap();
        prop_assert_eq!(decoded.as_bytes(), public.as_bytes());
    }

    #[test]
    fn v1_address_never_decodes(key_bytes in any::<[u8; 32]>()) {
        let public = PrivateKey::from_bytes(&key_bytes).unwrap().public_key();
        let address = public_key_to_address(&public, AddressVersion::V1);

        prop_assert!(is_valid_address(&address));
        prop_assert!(address_to_public_key(&address).is_err());
    }

    #[test]
    fn derivation_is_deterministic(seed in proptest::collection::vec(any::<u8>(), 1..=64), index in 0u32..0x8000_0000) {
        let a = ExtendedKey::from_seed(&seed).unwrap().derive_child(index).unwrap();
        let b = ExtendedKey::from_seed(&seed).unwrap().derive_child(index).unwrap();
        prop_assert_eq!(a.public_key().as_bytes(), b.public_key().as_bytes());
        prop_assert_eq!(a.chain_code(), b.chain_code());
    }

    #[test]
    fn sibling_keys_differ(seed in proptest::collection::vec(any::<u8>(), 1..=64), index in 0u32..0x7fff_ffff) {
        let master = ExtendedKey::from_seed(&seed).unwrap();
        let a = master.derive_child(index).unwrap();
        let b = master.derive_child(index + 1).unwrap();
        prop_assert_ne!(a.public_key().as_bytes(), b.public_key().as_bytes());
    }

    #[test]
    fn signatures_verify_and_break_on_bit_flip(
        key_bytes in any::<[u8; 32]>(),
        message in proptest::collection::vec(any::<u8>(), 0..256),
        flip_bit in 0usize..512,
    ) {
        let key = PrivateKey::from_bytes(&key_bytes).unwrap();
        let public = key.public_key();
        let d = digest(&message);

        let sig = sign_digest(&key, &d).unwrap();
        prop_assert!(verify_signature(&public, &d, &sig).unwrap());

        let mut bytes = sig.to_bytes();
        bytes[flip_bit / 8] ^= 1 << (flip_bit % 8);
        let flipped = Signature::from_bytes(&bytes).unwrap();
        prop_assert!(!verify_signature(&public, &d, &flipped).unwrap());
    }

    #[test]
    fn mnemonic_entropy_roundtrip(entropy in any::<[u8; 32]>()) {
        let mnemonic = bip39::Mnemonic::from_entropy(&entropy).unwrap().to_string();
        prop_assert!(validate_mnemonic(&mnemonic));

        // Same phrase, same master key
        let a = master_key_from_mnemonic(&mnemonic, "").unwrap();
        let b = master_key_from_mnemonic(&mnemonic, "").unwrap();
        prop_assert_eq!(a.public_key().as_bytes(), b.public_key().as_bytes());
    }

    #[test]
    fn payment_conserves_value(
        key_bytes in any::<[u8; 32]>(),
        assets in 2u64..1_000_000,
        amount_frac in 1u64..100,
        fee in 0u64..1000,
    ) {
        let key = PrivateKey::from_bytes(&key_bytes).unwrap();
        let public = key.public_key();
        let recipient = PrivateKey::from_bytes(&[9u8; 32]).unwrap().public_key();

        let amount = 1 + (assets - 1) * amount_frac / 100;
        prop_assume!(amount + fee <= assets);

        let note = test_note(public, assets);
        let tx = build_payment(
            &note,
            &recipient,
            amount,
            &public,
            fee,
            key.as_bytes(),
            public.as_bytes(),
        )
        .unwrap();

        let decoded: RawTx = bincode::deserialize(&tx.serialized).unwrap();
        let input_value: u64 = decoded.inputs().iter().map(|i| i.value()).sum();
        let output_value: u64 = decoded
            .inputs()
            .iter()
            .flat_map(|i| i.spend().seeds())
            .map(|s| s.amount)
            .sum();
        prop_assert_eq!(input_value, output_value + decoded.total_fees());
    }

    #[test]
    fn overspending_always_rejected(
        key_bytes in any::<[u8; 32]>(),
        assets in 1u64..1_000_000,
        excess in 1u64..1000,
    ) {
        let key = PrivateKey::from_bytes(&key_bytes).unwrap();
        let public = key.public_key();

        let note = test_note(public, assets);
        let result = build_transaction(&TransactionParams {
            notes: vec![note],
            outputs: vec![PaymentOutput::new(public, assets + excess)],
            fee: 0,
            private_key: key.as_bytes(),
            public_key: public.as_bytes(),
        });
        prop_assert!(result.is_err());
    }
}
