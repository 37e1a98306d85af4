// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Error taxonomy for the SDK.
//!
//! Every failure surfaced by this crate is one of these variants. Context
//! construction propagates errors immediately; there is no partial-success
//! context and no automatic retry at this layer (retry policy belongs to the
//! transport or the caller).

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Network failure or non-2xx status from the transport.
    #[error("transport failure: {0}")]
    Transport(String),

    /// Response shape violates the expected envelope.
    #[error("unexpected response shape: {0}")]
    Protocol(String),

    /// Keypair generation or key import failure.
    #[error("crypto failure: {0}")]
    Crypto(String),

    /// No resolvable user-timeout source during session open, or an
    /// unusable client-side setting (e.g. a malformed proxy URL).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Device registration rejected by the server.
    #[error("device registration rejected: {0}")]
    Registration(String),

    /// Persisted context malformed on restore, or a context could not be
    /// serialized.
    #[error("context serialization failed: {0}")]
    Serialization(String),
}

/// Result type for SDK operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_variant_context() {
        let err = Error::Protocol("missing \"Response\" key".to_string());
        assert_eq!(
            err.to_string(),
            "unexpected response shape: missing \"Response\" key"
        );

        let err = Error::Registration("returned 403".to_string());
        assert!(err.to_string().contains("registration rejected"));
    }
}
