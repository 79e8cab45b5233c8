//! JSON snapshot store
//!
//! The whole ledger is saved as one JSON document with PascalCase keys. Files
//! written by older versions load as well: unknown keys are ignored, `null`
//! lists read as empty and loans without an id get one on load.
//!
//! # Durability
//!
//! A save writes the document to a sibling `<name>.tmp` file and renames it
//! over the snapshot, so a crash mid-write leaves the previous snapshot
//! intact.
//!
//! ```no_run
//! use cheesebank::io::json_store::{load_ledger, save_ledger};
//! use std::path::Path;
//!
//! let path = Path::new("data.json");
//! let ledger = load_ledger(path).unwrap();
//! save_ledger(path, &ledger).unwrap();
//! ```

use crate::core::Ledger;
use crate::types::LedgerError;
use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Read and repair a snapshot
///
/// # Errors
///
/// - `FileNotFound` if there is no file at `path`
/// - `Io` for any other read failure
/// - `Serialization` if the document is not a valid ledger
pub fn load_ledger(path: &Path) -> Result<Ledger, LedgerError> {
    let bytes = fs::read(path).map_err(|e| read_error(path, e))?;
    decode_ledger(&bytes)
}

/// Asynchronous [`load_ledger`]
pub async fn load_ledger_async(path: &Path) -> Result<Ledger, LedgerError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| read_error(path, e))?;
    decode_ledger(&bytes)
}

pub fn decode_ledger(bytes: &[u8]) -> Result<Ledger, LedgerError> {
    let mut ledger: Ledger = serde_json::from_slice(bytes)?;
    ledger.normalise();
    Ok(ledger)
}

pub fn encode_ledger(ledger: &Ledger) -> Result<Vec<u8>, LedgerError> {
    Ok(serde_json::to_vec_pretty(ledger)?)
}

/// Write a snapshot through a temporary file
pub fn save_ledger(path: &Path, ledger: &Ledger) -> Result<(), LedgerError> {
    let bytes = encode_ledger(ledger)?;
    let tmp = temp_path(path);
    fs::write(&tmp, &bytes)?;
    fs::rename(&tmp, path)?;
    debug!(path = %path.display(), bytes = bytes.len(), "Snapshot saved");
    Ok(())
}

/// Asynchronous [`save_ledger`]
///
/// Takes the encoded document so the caller can release the ledger before the
/// file is written.
pub async fn save_encoded_async(path: &Path, bytes: &[u8]) -> Result<(), LedgerError> {
    let tmp = temp_path(path);
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    debug!(path = %path.display(), bytes = bytes.len(), "Snapshot saved");
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("ledger"));
    name.push(".tmp");
    path.with_file_name(name)
}

fn read_error(path: &Path, error: std::io::Error) -> LedgerError {
    if error.kind() == ErrorKind::NotFound {
        LedgerError::FileNotFound {
            path: path.display().to_string(),
        }
    } else {
        error.into()
    }
}
