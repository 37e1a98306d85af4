// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Corebank Client - Bank API Client SDK
//!
//! This crate establishes and maintains an authenticated channel to the
//! Corebank REST API: it generates a client keypair, exchanges it for an
//! installation token and the server's public key, registers the device,
//! then opens a session bound to a resolved user identity and renews it
//! transparently when it nears expiry.
//!
//! ## Modules
//!
//! - `context` - Authentication context lifecycle (installation, device,
//!   session)
//! - `client` - Endpoint plumbing (URLs, headers, body signing)
//! - `envelope` - `{"Response": [...]}` envelope unwrapping
//! - `crypto` - RSA key material
//! - `transport` - Injected HTTP collaborator (reqwest implementation
//!   included)
//! - `storage` - Context persistence
//!
//! ## Bootstrap
//!
//! ```rust,ignore
//! use corebank_client::{ApiContext, ApiEnvironment, ContextOptions};
//!
//! let options = ContextOptions::new(ApiEnvironment::Sandbox, api_key, "my device");
//! let context = ApiContext::create_default(options).await?;
//! context.save_default()?;
//! ```

pub mod client;
pub mod context;
pub mod crypto;
pub mod envelope;
pub mod error;
pub mod models;
pub mod storage;
pub mod transport;

pub use context::{
    ApiContext, ApiEnvironment, ContextOptions, InstallationContext, SessionContext,
};
pub use envelope::ApiResponse;
pub use error::{Error, Result};
pub use transport::{HttpTransport, Method, RawResponse, Transport};
