use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::EnvFilter;

use lea_wallet::{
    build_transaction, decode_results, decode_transaction, resolve, results_to_json,
    verify_single_signer, KeyHandler, KeysetFile, Manifest, Value,
};

#[derive(Parser)]
#[command(name = "lea-tx", version, about = "Lea transaction packaging tooling")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a manifest, sign it, and write the binary transaction
    Package {
        manifest: PathBuf,
        /// Signer keyfile, as `--signer <alias> <keyfile>` (repeatable)
        #[arg(long = "signer", num_args = 2, value_names = ["ALIAS", "KEYFILE"], action = ArgAction::Append)]
        signers: Vec<String>,
        /// Bind a file's bytes to a constant, as `--file <var> <path>` (repeatable)
        #[arg(long = "file", num_args = 2, value_names = ["VAR", "PATH"], action = ArgAction::Append)]
        files: Vec<String>,
        /// Output path; defaults to the manifest path with `.json` replaced by `.tx.bin`
        #[arg(long)]
        outfile: Option<PathBuf>,
        /// Previous transaction hash (32-byte hex) for chained signing
        #[arg(long = "prev-hash")]
        prev_hash: Option<String>,
        /// Sign the base hash without chain linkage
        #[arg(long = "no-chain")]
        no_chain: bool,
    },
    /// Decode a transaction and verify its signatures
    Verify {
        tx: PathBuf,
        manifest: Option<PathBuf>,
        /// Public keyset to verify against; defaults to the embedded pubset
        #[arg(long)]
        keyfile: Option<PathBuf>,
    },
    /// Decode a transaction to JSON
    Decode {
        tx: PathBuf,
        #[arg(long)]
        manifest: Option<PathBuf>,
        #[arg(long)]
        outfile: Option<PathBuf>,
        /// Strip and validate the `LEAB` VM wrapper first
        #[arg(long = "strip-vm-header")]
        strip_vm_header: bool,
    },
    /// Decode an execution-result buffer through a manifest's resultSchema
    DecodeResult {
        result: PathBuf,
        manifest: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Package {
            manifest,
            signers,
            files,
            outfile,
            prev_hash,
            no_chain,
        } => cmd_package(&manifest, &signers, &files, outfile, prev_hash, no_chain),
        Commands::Verify {
            tx,
            manifest,
            keyfile,
        } => cmd_verify(&tx, manifest.as_deref(), keyfile.as_deref()),
        Commands::Decode {
            tx,
            manifest,
            outfile,
            strip_vm_header,
        } => cmd_decode(&tx, manifest.as_deref(), outfile, strip_vm_header),
        Commands::DecodeResult { result, manifest } => cmd_decode_result(&result, &manifest),
    }
}

fn cmd_package(
    manifest_path: &Path,
    signer_args: &[String],
    file_args: &[String],
    outfile: Option<PathBuf>,
    prev_hash: Option<String>,
    no_chain: bool,
) -> Result<()> {
    let mut manifest = Manifest::load(manifest_path)
        .with_context(|| format!("loading manifest {}", manifest_path.display()))?;

    let manifest_dir = manifest_path.parent().unwrap_or_else(|| Path::new("."));
    let mut signers: BTreeMap<String, KeyHandler> = BTreeMap::new();
    for (alias, path) in manifest.take_keyset_directives() {
        let handler = load_keyfile(&manifest_dir.join(&path))?;
        signers.insert(alias, handler);
    }
    // Keyfiles given on the command line win over in-manifest directives.
    for (alias, path) in pairs(signer_args, "--signer")? {
        let handler = load_keyfile(Path::new(&path))?;
        signers.insert(alias, handler);
    }
    for (var, path) in pairs(file_args, "--file")? {
        let bytes =
            fs::read(&path).with_context(|| format!("reading --file {var} from {path}"))?;
        manifest.insert_constant(&var, Value::Bytes(bytes));
    }

    let prev = match (no_chain, prev_hash) {
        (true, _) | (false, None) => None,
        (false, Some(text)) => Some(parse_hash32(&text)?),
    };

    let resolved = resolve(&manifest, signers)?;
    let built = build_transaction(&resolved, prev)?;

    let outfile = outfile.unwrap_or_else(|| manifest_path.with_extension("tx.bin"));
    fs::write(&outfile, &built.bytes)
        .with_context(|| format!("writing {}", outfile.display()))?;

    let summary = json!({
        "txId": built.tx_id,
        "linkId": built.link_id,
        "outfile": outfile.display().to_string(),
        "size": built.bytes.len(),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn cmd_verify(
    tx_path: &Path,
    manifest_path: Option<&Path>,
    keyfile: Option<&Path>,
) -> Result<()> {
    let bytes = fs::read(tx_path)?;
    let manifest = manifest_path.map(Manifest::load).transpose()?;
    let decoded = decode_transaction(&bytes, manifest.as_ref(), false)?;

    let handler = match keyfile {
        Some(path) => load_keyfile(path)?,
        None => decoded
            .embedded_keyset()
            .ok_or_else(|| {
                anyhow!("no embedded pubset in the transaction; pass --keyfile")
            })??,
    };

    let report = verify_single_signer(&decoded, &handler)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    if !report.ok {
        bail!("signature verification failed");
    }
    Ok(())
}

fn cmd_decode(
    tx_path: &Path,
    manifest_path: Option<&Path>,
    outfile: Option<PathBuf>,
    strip_vm_header: bool,
) -> Result<()> {
    let bytes = fs::read(tx_path)?;
    let manifest = manifest_path.map(Manifest::load).transpose()?;
    let decoded = decode_transaction(&bytes, manifest.as_ref(), strip_vm_header)?;
    let rendered = serde_json::to_string_pretty(&decoded.to_json())?;
    match outfile {
        Some(path) => fs::write(&path, rendered)?,
        None => println!("{rendered}"),
    }
    Ok(())
}

fn cmd_decode_result(result_path: &Path, manifest_path: &Path) -> Result<()> {
    let bytes = fs::read(result_path)?;
    let manifest = Manifest::load(manifest_path)?;
    let results = decode_results(&bytes, &manifest)?;
    println!(
        "{}",
        serde_json::to_string_pretty(&results_to_json(&results))?
    );
    Ok(())
}

fn load_keyfile(path: &Path) -> Result<KeyHandler> {
    let keyset = KeysetFile::load(path)
        .with_context(|| format!("loading keyfile {}", path.display()))?;
    Ok(KeyHandler::from_keyset(&keyset)?)
}

fn pairs(args: &[String], flag: &str) -> Result<Vec<(String, String)>> {
    if args.len() % 2 != 0 {
        bail!("{flag} expects value pairs");
    }
    Ok(args
        .chunks_exact(2)
        .map(|pair| (pair[0].clone(), pair[1].clone()))
        .collect())
}

fn parse_hash32(text: &str) -> Result<[u8; 32]> {
    let bytes = hex::decode(text.strip_prefix("0x").unwrap_or(text))
        .with_context(|| format!("parsing hash {text:?}"))?;
    let hash: [u8; 32] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| anyhow!("previous transaction hash must be exactly 32 bytes"))?;
    Ok(hash)
}
