use std::collections::BTreeMap;

use lea_wallet::{
    resolve, Address, Instruction, KeyHandler, KeysetFile, Manifest, WalletError,
};

fn signers(pairs: Vec<(&str, KeyHandler)>) -> BTreeMap<String, KeyHandler> {
    pairs
        .into_iter()
        .map(|(alias, handler)| (alias.to_string(), handler))
        .collect()
}

fn handler() -> KeyHandler {
    KeyHandler::from_keyset(&KeysetFile::generate().unwrap()).unwrap()
}

#[test]
fn constants_resolve_recursively() {
    let manifest = Manifest::from_json_str(
        r#"{
            "sequence": "$const(seq)", "gasLimit": 5, "gasPrice": 1,
            "constants": {"seq": "$const(inner)", "inner": "9000000000000000000000"},
            "invocations": []
        }"#,
    )
    .unwrap();
    let resolved = resolve(&manifest, BTreeMap::new()).unwrap();
    assert_eq!(resolved.sequence, 9_000_000_000_000_000_000_000u128);
    assert!(resolved.fee_payer.is_none());
    assert!(resolved.addresses.is_empty());
}

#[test]
fn unknown_constant_is_diagnosed() {
    let manifest = Manifest::from_json_str(
        r#"{"sequence": "$const(missing)", "gasLimit": 1, "gasPrice": 1}"#,
    )
    .unwrap();
    match resolve(&manifest, BTreeMap::new()) {
        Err(WalletError::UnknownConstant(name)) => assert_eq!(name, "missing"),
        other => panic!("expected UnknownConstant, got {other:?}"),
    }
}

#[test]
fn constant_cycles_are_detected() {
    let manifest = Manifest::from_json_str(
        r#"{
            "sequence": "$const(a)", "gasLimit": 1, "gasPrice": 1,
            "constants": {"a": "$const(b)", "b": "$const(a)"}
        }"#,
    )
    .unwrap();
    assert!(matches!(
        resolve(&manifest, BTreeMap::new()),
        Err(WalletError::InvalidManifest(_))
    ));
}

#[test]
fn listed_signer_without_keys_is_unknown() {
    let manifest = Manifest::from_json_str(
        r#"{"sequence": 1, "gasLimit": 1, "gasPrice": 1, "signers": ["ghost"]}"#,
    )
    .unwrap();
    match resolve(&manifest, BTreeMap::new()) {
        Err(WalletError::UnknownSigner(name)) => assert_eq!(name, "ghost"),
        other => panic!("expected UnknownSigner, got {other:?}"),
    }
}

#[test]
fn signed_manifest_requires_a_fee_payer() {
    let manifest =
        Manifest::from_json_str(r#"{"sequence": 1, "gasLimit": 1, "gasPrice": 1}"#).unwrap();
    assert!(matches!(
        resolve(&manifest, signers(vec![("sender", handler())])),
        Err(WalletError::MissingFeePayer)
    ));

    let manifest = Manifest::from_json_str(
        r#"{"sequence": 1, "gasLimit": 1, "gasPrice": 1, "feePayer": "other"}"#,
    )
    .unwrap();
    match resolve(&manifest, signers(vec![("sender", handler())])) {
        Err(WalletError::UnknownFeePayer(name)) => assert_eq!(name, "other"),
        other => panic!("expected UnknownFeePayer, got {other:?}"),
    }
}

#[test]
fn unsigned_address_table_is_sorted() {
    let high = Address([0xee; 32]);
    let low = Address([0x01; 32]);
    let manifest = Manifest::from_json_str(&format!(
        r#"{{
            "sequence": 1, "gasLimit": 1, "gasPrice": 1,
            "invocations": [
                {{"targetAddress": "{}", "instructions": []}},
                {{"targetAddress": "{}", "instructions": []}}
            ]
        }}"#,
        high.to_bech32(),
        low.to_hex()
    ))
    .unwrap();
    let resolved = resolve(&manifest, BTreeMap::new()).unwrap();
    assert_eq!(resolved.addresses, vec![low, high]);
    assert_eq!(resolved.invocations[0].target, 1);
    assert_eq!(resolved.invocations[1].target, 0);
}

#[test]
fn signed_table_puts_fee_payer_first_then_sorted_signers() {
    let fee = handler();
    let a = handler();
    let b = handler();
    let mut expected_rest = vec![a.address(), b.address()];
    expected_rest.sort();

    let manifest = Manifest::from_json_str(
        r#"{
            "sequence": 1, "gasLimit": 1, "gasPrice": 1,
            "feePayer": "fee",
            "signers": ["fee", "a", "b"],
            "invocations": [{"targetAddress": "$addr(fee)", "instructions": []}]
        }"#,
    )
    .unwrap();
    let resolved = resolve(&manifest, signers(vec![("fee", fee), ("a", a), ("b", b)]))
        .unwrap();
    assert_eq!(resolved.fee_payer, Some(0));
    assert_eq!(resolved.addresses[1..], expected_rest[..]);
    assert_eq!(resolved.invocations[0].target, 0);
    assert_eq!(resolved.signers.len(), 3);
    for (index, (_, signer)) in resolved.signers.iter().enumerate() {
        assert_eq!(signer.address(), resolved.addresses[index]);
    }
}

#[test]
fn addr_directive_resolves_through_constants() {
    let dest = Address([0x77; 32]);
    let manifest = Manifest::from_json_str(&format!(
        r#"{{
            "sequence": 1, "gasLimit": 1, "gasPrice": 1,
            "constants": {{"dest": "{}"}},
            "invocations": [
                {{"targetAddress": "$addr(dest)", "instructions": [{{"uleb": "$addr(dest)"}}]}}
            ]
        }}"#,
        dest.to_bech32()
    ))
    .unwrap();
    let resolved = resolve(&manifest, BTreeMap::new()).unwrap();
    assert_eq!(resolved.addresses, vec![dest]);
    assert_eq!(resolved.invocations[0].target, 0);
    assert_eq!(resolved.invocations[0].instructions, vec![Instruction::Uleb(0)]);
}

#[test]
fn addr_with_invalid_literal_fails() {
    let manifest = Manifest::from_json_str(
        r#"{
            "sequence": 1, "gasLimit": 1, "gasPrice": 1,
            "invocations": [{"targetAddress": "$addr(not-an-address)", "instructions": []}]
        }"#,
    )
    .unwrap();
    assert!(matches!(
        resolve(&manifest, BTreeMap::new()),
        Err(WalletError::BadAddress(_))
    ));
}

#[test]
fn duplicate_references_collapse_to_one_entry() {
    let dest = Address([0x90; 32]);
    let manifest = Manifest::from_json_str(&format!(
        r#"{{
            "sequence": 1, "gasLimit": 1, "gasPrice": 1,
            "invocations": [
                {{"targetAddress": "{bech}", "instructions": []}},
                {{"targetAddress": "{hex}", "instructions": []}}
            ]
        }}"#,
        bech = dest.to_bech32(),
        hex = dest.to_hex()
    ))
    .unwrap();
    let resolved = resolve(&manifest, BTreeMap::new()).unwrap();
    assert_eq!(resolved.addresses, vec![dest]);
    assert_eq!(resolved.invocations[0].target, 0);
    assert_eq!(resolved.invocations[1].target, 0);
}

#[test]
fn pubset_requires_known_signer() {
    let manifest = Manifest::from_json_str(
        r#"{
            "sequence": 1, "gasLimit": 1, "gasPrice": 1,
            "invocations": [
                {"targetAddress": "$addr(x)", "instructions": [{"INLINE": "$pubset(nobody)"}]}
            ],
            "constants": {"x": "1111111111111111111111111111111111111111111111111111111111111111"}
        }"#,
    )
    .unwrap();
    match resolve(&manifest, BTreeMap::new()) {
        Err(WalletError::UnknownSigner(name)) => assert_eq!(name, "nobody"),
        other => panic!("expected UnknownSigner, got {other:?}"),
    }
}

#[test]
fn pubset_outside_inline_is_rejected() {
    let manifest = Manifest::from_json_str(
        r#"{
            "sequence": 1, "gasLimit": 1, "gasPrice": 1,
            "feePayer": "sender", "signers": ["sender"],
            "invocations": [
                {"targetAddress": "$addr(sender)",
                 "instructions": [{"vector": "$pubset(sender)"}]}
            ]
        }"#,
    )
    .unwrap();
    match resolve(&manifest, signers(vec![("sender", handler())])) {
        Err(WalletError::InvalidManifest(message)) => {
            assert!(message.contains("INLINE"), "unexpected message: {message}")
        }
        other => panic!("expected InvalidManifest, got {other:?}"),
    }
}

#[test]
fn inline_rejects_non_byte_values() {
    let manifest = Manifest::from_json_str(
        r#"{
            "sequence": 1, "gasLimit": 1, "gasPrice": 1,
            "invocations": [
                {"targetAddress": "1111111111111111111111111111111111111111111111111111111111111111",
                 "instructions": [{"INLINE": "plain text"}]}
            ]
        }"#,
    )
    .unwrap();
    assert!(matches!(
        resolve(&manifest, BTreeMap::new()),
        Err(WalletError::InlineTypeMismatch(_))
    ));
}
