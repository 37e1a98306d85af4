// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The authentication context: root aggregate of the SDK.
//!
//! ## Lifecycle
//!
//! [`ApiContext::create`] runs the three-phase trust bootstrap in strict
//! order (generate keypair, install, register device, open session), each
//! phase feeding the next. Any failure aborts the remaining phases; a
//! partially constructed context never exists.
//!
//! After construction the context tracks session liveness. Business call
//! paths invoke [`ApiContext::ensure_session_active`] first, which renews a
//! stale session transparently. Renewal is guarded by a mutex so concurrent
//! callers near expiry produce exactly one session-open request.
//!
//! ## Persistence
//!
//! The whole context (keys included) serializes to a single JSON document;
//! see [`ApiContext::save`] and [`ApiContext::restore`]. File-permission
//! hygiene of the destination is the caller's responsibility.

mod device;
mod environment;
mod installation;
mod session;

pub use environment::ApiEnvironment;
pub use installation::InstallationContext;
pub use session::{SessionContext, MIN_VALIDITY_WINDOW_SECONDS};

use std::fmt;
use std::path::Path;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::client::ApiClient;
use crate::crypto::{KeyPair, ServerPublicKey};
use crate::error::{Error, Result};
use crate::storage;
use crate::transport::{HttpTransport, Method, RawResponse, Transport};

const ENDPOINT_SESSION: &str = "session";

/// Inputs for constructing a fresh context.
#[derive(Debug, Clone)]
pub struct ContextOptions {
    pub environment: ApiEnvironment,
    /// Opaque API key; shared with the server during device registration
    /// and session open.
    pub api_key: String,
    /// Human-readable device description shown in the server's device list.
    pub device_description: String,
    /// Allow-list of origin IPs. Empty means the server's default policy.
    pub permitted_ips: Vec<String>,
    /// Optional outbound proxy, recorded on the context and honored by the
    /// default transport.
    pub proxy_url: Option<String>,
}

impl ContextOptions {
    pub fn new(
        environment: ApiEnvironment,
        api_key: impl Into<String>,
        device_description: impl Into<String>,
    ) -> Self {
        Self {
            environment,
            api_key: api_key.into(),
            device_description: device_description.into(),
            permitted_ips: Vec::new(),
            proxy_url: None,
        }
    }
}

/// The authenticated channel to the API: environment, credentials,
/// installation trust anchor, and the (renewable) session.
pub struct ApiContext {
    environment: ApiEnvironment,
    api_key: String,
    proxy_url: Option<String>,
    installation: InstallationContext,
    session: RwLock<Option<SessionContext>>,
    // Single-flight guard for renewal; held across the reopen await.
    renewal: Mutex<()>,
    api: ApiClient,
}

impl ApiContext {
    /// Run the full trust bootstrap against the given transport.
    pub async fn create(options: ContextOptions, transport: Arc<dyn Transport>) -> Result<Self> {
        let api = ApiClient::new(options.environment, transport);

        let keypair = KeyPair::generate()?;
        let installation = installation::install(&api, keypair).await?;
        device::register_device(
            &api,
            &installation,
            &options.device_description,
            &options.api_key,
            &options.permitted_ips,
        )
        .await?;
        let session = session::open_session(&api, &installation, &options.api_key).await?;

        info!(
            environment = %options.environment,
            user_id = session.user_id(),
            "authentication context established"
        );

        Ok(Self {
            environment: options.environment,
            api_key: options.api_key,
            proxy_url: options.proxy_url,
            installation,
            session: RwLock::new(Some(session)),
            renewal: Mutex::new(()),
            api,
        })
    }

    /// [`ApiContext::create`] over the built-in reqwest transport,
    /// honoring `options.proxy_url`.
    pub async fn create_default(options: ContextOptions) -> Result<Self> {
        let transport = HttpTransport::new(options.proxy_url.as_deref())?;
        Self::create(options, Arc::new(transport)).await
    }

    fn read_session(&self) -> RwLockReadGuard<'_, Option<SessionContext>> {
        self.session.read().expect("session lock poisoned")
    }

    fn write_session(&self) -> RwLockWriteGuard<'_, Option<SessionContext>> {
        self.session.write().expect("session lock poisoned")
    }

    pub fn environment(&self) -> ApiEnvironment {
        self.environment
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn proxy_url(&self) -> Option<&str> {
        self.proxy_url.as_deref()
    }

    pub fn installation(&self) -> &InstallationContext {
        &self.installation
    }

    /// Snapshot of the current session, if one is open.
    pub fn session(&self) -> Option<SessionContext> {
        self.read_session().clone()
    }

    /// The bearer credential for the current phase: the session token when
    /// a session exists, the installation token otherwise. Pre-session
    /// calls (device registration) therefore present a valid bearer through
    /// this single accessor.
    pub fn token(&self) -> String {
        self.read_session()
            .as_ref()
            .map(|session| session.token().to_string())
            .unwrap_or_else(|| self.installation.token().to_string())
    }

    /// Whether the current session is live, with the 30-second staleness
    /// window applied. False when no session is open.
    pub fn is_session_active(&self) -> bool {
        self.read_session()
            .as_ref()
            .map(SessionContext::is_active)
            .unwrap_or(false)
    }

    /// Renew the session if it is stale or absent. Returns `true` iff a
    /// reset was performed; afterwards the session is active either way.
    ///
    /// Concurrent callers race to one renewal: losers block on the guard,
    /// re-check liveness, and return `false`.
    pub async fn ensure_session_active(&self) -> Result<bool> {
        if self.is_session_active() {
            return Ok(false);
        }

        let _guard = self.renewal.lock().await;
        if self.is_session_active() {
            return Ok(false);
        }

        self.reopen_session().await?;
        Ok(true)
    }

    /// Drop the current session and open a new one. The old token is left
    /// to expire server-side; renewal does not call the remote delete.
    pub async fn reset_session(&self) -> Result<()> {
        let _guard = self.renewal.lock().await;
        self.reopen_session().await
    }

    async fn reopen_session(&self) -> Result<()> {
        *self.write_session() = None;
        let session = session::open_session(&self.api, &self.installation, &self.api_key).await?;
        *self.write_session() = Some(session);
        Ok(())
    }

    /// Close the session: best-effort remote delete, then clear local
    /// state. A failed delete is logged and otherwise ignored: the token
    /// expires server-side regardless, and local teardown must not hinge
    /// on it.
    pub async fn close_session(&self) {
        let path = format!("{ENDPOINT_SESSION}/{}", session::SESSION_ID_DUMMY);
        if let Err(err) = self.api.delete(&path, Some(&self.token())).await {
            warn!(error = %err, "session delete failed; clearing local session anyway");
        }
        *self.write_session() = None;
    }

    /// Authenticated business call: renews the session when needed, then
    /// forwards through the client with the current bearer. Mutating
    /// methods sign the body with the client key.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<RawResponse> {
        self.ensure_session_active().await?;
        let token = self.token();
        let signer = self.installation.keypair();
        match method {
            Method::Get => self.api.get(path, Some(&token)).await,
            Method::Delete => self.api.delete(path, Some(&token)).await,
            Method::Post => {
                self.api
                    .post(path, body.unwrap_or_default(), Some(&token), Some(signer))
                    .await
            }
            Method::Put => {
                self.api
                    .put(path, body.unwrap_or_default(), Some(&token), Some(signer))
                    .await
            }
        }
    }

    // ========== Persistence ==========

    /// Serialize the full context, private key material included, to a
    /// JSON document.
    pub fn to_json(&self) -> Result<String> {
        let snapshot = ContextSnapshot {
            environment: self.environment,
            api_key: self.api_key.clone(),
            installation: InstallationSnapshot {
                token: self.installation.token().to_string(),
                client_private_key: self.installation.keypair().private_key_pem()?,
                server_public_key: self.installation.server_public_key().to_pem()?,
            },
            session: self.read_session().as_ref().map(|session| SessionSnapshot {
                token: session.token().to_string(),
                expiry_time: session.expiry_time(),
                user_id: session.user_id(),
            }),
            proxy_url: self.proxy_url.clone(),
        };
        serde_json::to_string_pretty(&snapshot)
            .map_err(|e| Error::Serialization(format!("context serialization: {e}")))
    }

    /// Rebuild a context from a serialized document, attaching the given
    /// transport. Fails with [`Error::Serialization`] on missing fields or
    /// malformed key PEM.
    pub fn from_json(json: &str, transport: Arc<dyn Transport>) -> Result<Self> {
        let snapshot: ContextSnapshot = serde_json::from_str(json)
            .map_err(|e| Error::Serialization(format!("malformed context document: {e}")))?;
        Self::from_snapshot(snapshot, transport)
    }

    fn from_snapshot(snapshot: ContextSnapshot, transport: Arc<dyn Transport>) -> Result<Self> {
        let keypair = KeyPair::from_private_key_pem(&snapshot.installation.client_private_key)
            .map_err(|e| Error::Serialization(format!("installation private key: {e}")))?;
        let server_public_key = ServerPublicKey::from_pem(&snapshot.installation.server_public_key)
            .map_err(|e| Error::Serialization(format!("server public key: {e}")))?;

        let installation = InstallationContext::from_parts(
            snapshot.installation.token,
            keypair,
            server_public_key,
        );
        let session = snapshot.session.map(|session| {
            SessionContext::new(session.token, session.expiry_time, session.user_id)
        });

        Ok(Self {
            environment: snapshot.environment,
            api_key: snapshot.api_key,
            proxy_url: snapshot.proxy_url,
            installation,
            session: RwLock::new(session),
            renewal: Mutex::new(()),
            api: ApiClient::new(snapshot.environment, transport),
        })
    }

    /// Write the serialized context to `path` atomically.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        storage::save_atomic(path, &self.to_json()?)
    }

    /// [`ApiContext::save`] to the conventional path.
    pub fn save_default(&self) -> Result<()> {
        self.save(storage::DEFAULT_CONTEXT_PATH)
    }

    /// Read a serialized context from `path`, attaching the given transport.
    pub fn restore(path: impl AsRef<Path>, transport: Arc<dyn Transport>) -> Result<Self> {
        let json = storage::load(path)?;
        Self::from_json(&json, transport)
    }

    /// Restore from the conventional path over the built-in transport,
    /// honoring the persisted proxy URL.
    pub fn restore_default() -> Result<Self> {
        let json = storage::load(storage::DEFAULT_CONTEXT_PATH)?;
        let snapshot: ContextSnapshot = serde_json::from_str(&json)
            .map_err(|e| Error::Serialization(format!("malformed context document: {e}")))?;
        let transport = HttpTransport::new(snapshot.proxy_url.as_deref())?;
        Self::from_snapshot(snapshot, Arc::new(transport))
    }
}

/// Equality is a credentials snapshot: current bearer token, api key, and
/// environment. Key material and session expiry are deliberately excluded:
/// a renewed session carries a new token and therefore compares unequal.
impl PartialEq for ApiContext {
    fn eq(&self, other: &Self) -> bool {
        self.token() == other.token()
            && self.api_key == other.api_key
            && self.environment == other.environment
    }
}

impl fmt::Debug for ApiContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiContext")
            .field("environment", &self.environment)
            .field("session_active", &self.is_session_active())
            .finish_non_exhaustive()
    }
}

#[derive(Serialize, Deserialize)]
struct ContextSnapshot {
    environment: ApiEnvironment,
    api_key: String,
    installation: InstallationSnapshot,
    #[serde(default)]
    session: Option<SessionSnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    proxy_url: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct InstallationSnapshot {
    token: String,
    client_private_key: String,
    server_public_key: String,
}

#[derive(Serialize, Deserialize)]
struct SessionSnapshot {
    token: String,
    expiry_time: DateTime<Utc>,
    user_id: i64,
}
