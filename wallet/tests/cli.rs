use std::fs;
use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::tempdir;

use lea_tvf::Encoder;
use lea_wallet::{Address, KeyHandler, KeysetFile};

fn write_keyfile(dir: &Path, name: &str) -> (String, KeysetFile) {
    let file = KeysetFile::generate().expect("generate keyset");
    let path = dir.join(name);
    fs::write(&path, serde_json::to_vec(&file).expect("serialize")).expect("write keyfile");
    (path.to_str().expect("utf8 path").to_string(), file)
}

fn write_manifest(dir: &Path, name: &str, contents: &str) -> String {
    let path = dir.join(name);
    fs::write(&path, contents).expect("write manifest");
    path.to_str().expect("utf8 path").to_string()
}

#[test]
fn package_decode_verify_flow() {
    let temp = tempdir().expect("tempdir");
    let (keyfile, _) = write_keyfile(temp.path(), "sender.json");
    let target = Address([0x22; 32]).to_bech32();
    let manifest = write_manifest(
        temp.path(),
        "transfer.json",
        &format!(
            r#"{{
                "sequence": 1, "gasLimit": 100000, "gasPrice": 10,
                "feePayer": "sender", "signers": ["sender"],
                "invocations": [
                    {{"targetAddress": "{target}",
                      "instructions": [{{"uleb": 1}}, {{"INLINE": "$pubset(sender)"}}]}}
                ]
            }}"#
        ),
    );

    cargo_bin_cmd!("lea-tx")
        .args(["package", &manifest, "--signer", "sender", &keyfile, "--no-chain"])
        .assert()
        .success()
        .stdout(predicate::str::contains("txId"));

    let tx_path = temp.path().join("transfer.tx.bin");
    assert!(tx_path.exists(), "default outfile convention");
    let tx = tx_path.to_str().expect("utf8 path");

    cargo_bin_cmd!("lea-tx")
        .args(["decode", tx, "--manifest", &manifest])
        .assert()
        .success()
        .stdout(predicate::str::contains("keyset"))
        .stdout(predicate::str::contains("txId"));

    // The embedded pubset is enough to verify.
    cargo_bin_cmd!("lea-tx")
        .args(["verify", tx, &manifest])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"ok\": true"));

    cargo_bin_cmd!("lea-tx")
        .args(["verify", tx, &manifest, "--keyfile", &keyfile])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"ok\": true"));
}

#[test]
fn chained_packaging_reports_link_id() {
    let temp = tempdir().expect("tempdir");
    let (keyfile, _) = write_keyfile(temp.path(), "sender.json");
    let target = Address([0x22; 32]).to_bech32();
    let manifest = write_manifest(
        temp.path(),
        "chained.json",
        &format!(
            r#"{{
                "sequence": 2, "gasLimit": 1000, "gasPrice": 1,
                "feePayer": "sender", "signers": ["sender"],
                "invocations": [{{"targetAddress": "{target}", "instructions": [{{"uleb": 4}}]}}]
            }}"#
        ),
    );

    cargo_bin_cmd!("lea-tx")
        .args([
            "package",
            &manifest,
            "--signer",
            "sender",
            &keyfile,
            "--prev-hash",
            &"ab".repeat(32),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("linkId"));
}

#[test]
fn tampered_transaction_fails_verification() {
    let temp = tempdir().expect("tempdir");
    let (keyfile, _) = write_keyfile(temp.path(), "sender.json");
    let target = Address([0x22; 32]).to_bech32();
    let manifest = write_manifest(
        temp.path(),
        "victim.json",
        &format!(
            r#"{{
                "sequence": 1, "gasLimit": 10, "gasPrice": 1,
                "feePayer": "sender", "signers": ["sender"],
                "invocations": [
                    {{"targetAddress": "{target}", "instructions": [{{"INLINE": "$pubset(sender)"}}]}}
                ]
            }}"#
        ),
    );

    cargo_bin_cmd!("lea-tx")
        .args(["package", &manifest, "--signer", "sender", &keyfile, "--no-chain"])
        .assert()
        .success();

    let tx_path = temp.path().join("victim.tx.bin");
    let mut bytes = fs::read(&tx_path).expect("read tx");
    // Flip the sequence value inside the signed payload; the stream stays
    // well-formed but the signatures no longer cover it.
    bytes[35] ^= 0x01;
    fs::write(&tx_path, &bytes).expect("rewrite tx");

    cargo_bin_cmd!("lea-tx")
        .args(["verify", tx_path.to_str().expect("utf8"), &manifest])
        .assert()
        .failure();
}

#[test]
fn missing_fee_payer_is_a_nonzero_exit() {
    let temp = tempdir().expect("tempdir");
    let (keyfile, _) = write_keyfile(temp.path(), "sender.json");
    let manifest = write_manifest(
        temp.path(),
        "broken.json",
        r#"{"sequence": 1, "gasLimit": 1, "gasPrice": 1, "invocations": []}"#,
    );

    cargo_bin_cmd!("lea-tx")
        .args(["package", &manifest, "--signer", "sender", &keyfile])
        .assert()
        .failure()
        .stderr(predicate::str::contains("feePayer"));
}

#[test]
fn decode_result_projects_schema_fields() {
    let temp = tempdir().expect("tempdir");
    let program = {
        let file = KeysetFile::generate().expect("generate");
        KeyHandler::from_keyset(&file).expect("handler").address()
    };
    let manifest = write_manifest(
        temp.path(),
        "schema.json",
        &format!(
            r#"{{
                "sequence": 1, "gasLimit": 1, "gasPrice": 1,
                "constants": {{"counter": "{}"}},
                "resultSchema": {{"$const(counter)": {{"total": "uleb(0)"}}}}
            }}"#,
            program.to_bech32()
        ),
    );

    let mut enc = Encoder::new();
    enc.add_vector(program.as_bytes()).expect("program id");
    enc.add_uleb(1);
    enc.add_uleb(0);
    enc.add_uleb(41);
    let result_path = temp.path().join("result.bin");
    fs::write(&result_path, enc.build()).expect("write result");

    cargo_bin_cmd!("lea-tx")
        .args([
            "decode-result",
            result_path.to_str().expect("utf8"),
            &manifest,
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("total"))
        .stdout(predicate::str::contains("41"));
}
