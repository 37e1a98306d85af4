// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session open and expiry tracking.
//!
//! A session is a time-bounded bearer token scoped to a resolved user
//! identity. Expiry is always `local now + server-declared timeout` at the
//! moment of creation, never a server-declared absolute clock value, so the
//! only trust placed in the server's clock is the offset itself.

use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use tracing::info;

use crate::client::ApiClient;
use crate::context::installation::InstallationContext;
use crate::envelope;
use crate::error::{Error, Result};
use crate::models::{SessionToken, SessionUser, KEY_TOKEN};

pub(crate) const ENDPOINT_SESSION_SERVER: &str = "session-server";

/// The session-delete endpoint ignores the id, but the route needs one.
pub(crate) const SESSION_ID_DUMMY: i64 = 0;

const FIELD_SECRET: &str = "secret";

/// A session within this many seconds of expiry counts as already stale,
/// so a token that passes the liveness check cannot expire before its
/// first use.
pub const MIN_VALIDITY_WINDOW_SECONDS: i64 = 30;

/// An open session: bearer token, local-clock expiry, resolved user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    token: String,
    expiry_time: DateTime<Utc>,
    user_id: i64,
}

impl SessionContext {
    pub(crate) fn new(token: String, expiry_time: DateTime<Utc>, user_id: i64) -> Self {
        Self {
            token,
            expiry_time,
            user_id,
        }
    }

    /// Bearer credential for authenticated business calls.
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn expiry_time(&self) -> DateTime<Utc> {
        self.expiry_time
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    /// Liveness is a pure function of the current time: active iff more
    /// than [`MIN_VALIDITY_WINDOW_SECONDS`] remain before expiry.
    pub fn is_active(&self) -> bool {
        self.expiry_time - Utc::now() > Duration::seconds(MIN_VALIDITY_WINDOW_SECONDS)
    }
}

/// Open a session under the installation token. The session timeout is read
/// from whichever user branch the server populated; none populated is a
/// hard stop ([`Error::Configuration`]).
pub(crate) async fn open_session(
    api: &ApiClient,
    installation: &InstallationContext,
    api_key: &str,
) -> Result<SessionContext> {
    let body = serde_json::to_vec(&json!({ FIELD_SECRET: api_key }))
        .map_err(|e| Error::Serialization(format!("session request body: {e}")))?;

    let response = api
        .post(
            ENDPOINT_SESSION_SERVER,
            body,
            Some(installation.token()),
            Some(installation.keypair()),
        )
        .await?;

    let items = envelope::response_items(&response)?;
    let token: SessionToken = envelope::find_item(&items, KEY_TOKEN)?;
    let user = SessionUser::from_items(&items)?;

    let timeout_seconds = user.session_timeout();
    let expiry_time = Utc::now() + Duration::seconds(timeout_seconds);

    info!(
        user_id = user.user_id(),
        timeout_seconds, "session opened"
    );

    Ok(SessionContext::new(token.token, expiry_time, user.user_id()))
}
