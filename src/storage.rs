// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! File persistence for serialized contexts.
//!
//! A context persists as one JSON document (see `context::ApiContext`).
//! Writes go to a temp file first and rename into place, so a crash
//! mid-write never leaves a half-written context behind. The document
//! contains private key material; callers pick a destination with
//! appropriate permissions.

use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// Conventional context filename, used by the `*_default` helpers.
pub const DEFAULT_CONTEXT_PATH: &str = "corebank.conf";

/// Write `contents` to `path` atomically (temp file + rename).
pub fn save_atomic(path: impl AsRef<Path>, contents: &str) -> Result<()> {
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| Error::Serialization(format!("create {}: {e}", parent.display())))?;
        }
    }

    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, contents)
        .map_err(|e| Error::Serialization(format!("write {}: {e}", temp_path.display())))?;
    fs::rename(&temp_path, path)
        .map_err(|e| Error::Serialization(format!("rename to {}: {e}", path.display())))?;
    Ok(())
}

/// Read a previously saved document.
pub fn load(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    fs::read_to_string(path)
        .map_err(|e| Error::Serialization(format!("read {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corebank.conf");

        save_atomic(&path, "{\"environment\":\"SANDBOX\"}").unwrap();
        assert_eq!(load(&path).unwrap(), "{\"environment\":\"SANDBOX\"}");

        // No temp file left behind.
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn save_creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config/corebank.conf");

        save_atomic(&path, "{}").unwrap();
        assert_eq!(load(&path).unwrap(), "{}");
    }

    #[test]
    fn overwrite_replaces_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corebank.conf");

        save_atomic(&path, "first").unwrap();
        save_atomic(&path, "second").unwrap();
        assert_eq!(load(&path).unwrap(), "second");
    }

    #[test]
    fn load_missing_file_is_a_serialization_error() {
        let result = load("/nonexistent/corebank.conf");
        assert!(matches!(result, Err(Error::Serialization(_))));
    }
}
