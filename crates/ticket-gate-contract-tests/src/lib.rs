#![warn(missing_docs)]
//! # ticket-gate-contract-tests
//!
//! Loads the frozen gate-service schemas under `contracts/` and their
//! fixtures. The tests in this crate check fixtures and serialized wire
//! types against them.

use std::path::{Path, PathBuf};

use jsonschema::JSONSchema;
use serde_json::Value;
use thiserror::Error;

/// Every contract with a schema and a `.valid.json` fixture.
pub const CONTRACTS: [&str; 7] = [
    "issue-ticket.response",
    "callback.response",
    "register.request",
    "status.response",
    "login.request",
    "login.response",
    "failure.response",
];

/// Errors raised while loading contracts.
#[derive(Debug, Error)]
pub enum ContractError {
    /// File could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        /// Offending file.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// File is not JSON.
    #[error("cannot parse {path}: {source}")]
    Json {
        /// Offending file.
        path: PathBuf,
        /// Underlying error.
        source: serde_json::Error,
    },
    /// Schema does not compile.
    #[error("schema {name} does not compile: {reason}")]
    Schema {
        /// Contract name.
        name: String,
        /// Compiler message.
        reason: String,
    },
}

/// Root `contracts/` directory.
pub fn contracts_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../contracts")
}

/// Reads a JSON document.
///
/// # Errors
/// Returns [`ContractError::Io`] or [`ContractError::Json`].
pub fn load_json(path: &Path) -> Result<Value, ContractError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ContractError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ContractError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Loads `contracts/fixtures/<name>.<variant>.json`.
///
/// # Errors
/// Same as [`load_json`].
pub fn load_fixture(name: &str, variant: &str) -> Result<Value, ContractError> {
    load_json(
        &contracts_dir()
            .join("fixtures")
            .join(format!("{name}.{variant}.json")),
    )
}

/// Compiles `contracts/<name>.schema.json`.
///
/// # Errors
/// Returns [`ContractError::Schema`] when the schema is malformed.
pub fn compile_schema(name: &str) -> Result<JSONSchema, ContractError> {
    let schema = load_json(&contracts_dir().join(format!("{name}.schema.json")))?;
    JSONSchema::compile(&schema).map_err(|error| ContractError::Schema {
        name: name.to_string(),
        reason: error.to_string(),
    })
}

/// Validates `instance`, collecting every violation message.
pub fn violations(schema: &JSONSchema, instance: &Value) -> Vec<String> {
    match schema.validate(instance) {
        Ok(()) => Vec::new(),
        Err(errors) => errors.map(|error| error.to_string()).collect(),
    }
}
