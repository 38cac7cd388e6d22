//! Client-side toolkit for the Lea blockchain: resolves an authoring
//! manifest into its canonical form, encodes and dual-signs the binary
//! transaction, and decodes transactions and execution results back into
//! structured data.

pub mod address;
pub mod decoder;
pub mod error;
pub mod keyset;
pub mod manifest;
pub mod resolver;
pub mod results;
pub mod tx_builder;
pub mod value;

pub use address::{Address, ADDRESS_HRP};
pub use decoder::{
    decode_transaction, strip_vm_header, verify_single_signer, wrap_vm_header,
    DecodedInstruction, DecodedInvocation, DecodedTransaction, VmHeader,
};
pub use error::WalletError;
pub use keyset::{DualSignature, KeyHandler, KeysetFile, VerifyReport};
pub use manifest::{InstructionKind, Manifest};
pub use resolver::{resolve, Instruction, ResolvedInvocation, ResolvedManifest, TX_VERSION};
pub use results::{decode_results, results_to_json, ResultValue};
pub use tx_builder::{
    build_transaction, compute_tx_link_hash, pre_signature_payload, BuiltTransaction,
    DOMAIN_TX_LINK_V1, MAX_TRANSACTION_LEN,
};
pub use value::Value;
