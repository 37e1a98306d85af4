// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Installation: the one-time trust-anchor exchange.
//!
//! The client submits its public key on an unauthenticated POST and receives
//! an installation token plus the server's public key. The response is the
//! nested-array envelope: three independently-keyed objects (`Id`, `Token`,
//! `ServerPublicKey`) that are located by name and assembled into one
//! result.
//!
//! Installation is not idempotent-safe: a transport failure propagates
//! as-is and is never retried here, since a blind retry could register a
//! duplicate installation server-side.

use serde_json::json;
use tracing::info;

use crate::client::ApiClient;
use crate::crypto::{KeyPair, ServerPublicKey};
use crate::envelope::{self, FIELD_ID};
use crate::error::{Error, Result};
use crate::models::{Id, PublicKeyServer, SessionToken, KEY_SERVER_PUBLIC_KEY, KEY_TOKEN};

const ENDPOINT_INSTALLATION: &str = "installation";
const FIELD_CLIENT_PUBLIC_KEY: &str = "client_public_key";

/// The installed trust anchor: installation token, client keypair, server
/// public key. All three are set together by [`install`] or not at all;
/// no partial installation state ever exists.
#[derive(Debug, Clone)]
pub struct InstallationContext {
    token: String,
    keypair: KeyPair,
    server_public_key: ServerPublicKey,
}

impl InstallationContext {
    pub(crate) fn from_parts(
        token: String,
        keypair: KeyPair,
        server_public_key: ServerPublicKey,
    ) -> Self {
        Self {
            token,
            keypair,
            server_public_key,
        }
    }

    /// Bearer credential for device-registration and session-open calls.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// The client keypair; signs authenticated request bodies.
    pub fn keypair(&self) -> &KeyPair {
        &self.keypair
    }

    /// The server's key, for response signature verification.
    pub fn server_public_key(&self) -> &ServerPublicKey {
        &self.server_public_key
    }
}

/// Perform the installation handshake, consuming the freshly generated
/// keypair into the resulting context.
pub(crate) async fn install(api: &ApiClient, keypair: KeyPair) -> Result<InstallationContext> {
    let public_key_pem = keypair.public_key_pem()?;
    let body = serde_json::to_vec(&json!({ FIELD_CLIENT_PUBLIC_KEY: public_key_pem }))
        .map_err(|e| Error::Serialization(format!("installation request body: {e}")))?;

    // Unauthenticated and unsigned: this call is the trust bootstrap.
    let response = api.post(ENDPOINT_INSTALLATION, body, None, None).await?;

    let items = envelope::response_items(&response)?;
    let id: Id = envelope::find_item(&items, FIELD_ID)?;
    let token: SessionToken = envelope::find_item(&items, KEY_TOKEN)?;
    let server_key: PublicKeyServer = envelope::find_item(&items, KEY_SERVER_PUBLIC_KEY)?;

    let server_public_key = ServerPublicKey::from_pem(&server_key.server_public_key)?;

    info!(installation_id = id.id, "installation registered");

    Ok(InstallationContext {
        token: token.token,
        keypair,
        server_public_key,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ApiEnvironment;
    use crate::transport::mock::MockTransport;
    use crate::transport::Transport;
    use serde_json::{json, Value};
    use std::sync::Arc;

    fn api_with_mock() -> (ApiClient, Arc<MockTransport>) {
        let transport = Arc::new(MockTransport::new());
        let api = ApiClient::new(
            ApiEnvironment::Sandbox,
            Arc::clone(&transport) as Arc<dyn Transport>,
        );
        (api, transport)
    }

    fn server_key_pem() -> String {
        KeyPair::generate_bits(512)
            .unwrap()
            .public_key_pem()
            .unwrap()
    }

    #[tokio::test]
    async fn install_assembles_all_three_parts() {
        let (api, transport) = api_with_mock();
        let pem = server_key_pem();
        transport.push_json(
            200,
            json!({"Response": [
                {"Id": {"id": 11}},
                {"Token": {"token": "install-token"}},
                {"ServerPublicKey": {"server_public_key": pem}}
            ]}),
        );

        let keypair = KeyPair::generate_bits(512).unwrap();
        let expected_public = keypair.public_key_pem().unwrap();
        let installation = install(&api, keypair).await.unwrap();

        assert_eq!(installation.token(), "install-token");
        assert_eq!(installation.server_public_key().to_pem().unwrap(), pem);

        // The request body must carry the client public key, unauthenticated.
        let (_, url, headers, body) = transport.call(0);
        assert!(url.ends_with("/installation"));
        assert!(!headers.contains_key("Authorization"));
        assert!(!headers.contains_key("X-Client-Signature"));
        let body: Value = serde_json::from_slice(&body.unwrap()).unwrap();
        assert_eq!(body["client_public_key"], json!(expected_public));
    }

    #[tokio::test]
    async fn missing_expected_key_is_a_protocol_error() {
        let (api, transport) = api_with_mock();
        transport.push_json(
            200,
            json!({"Response": [
                {"Id": {"id": 11}},
                {"Token": {"token": "install-token"}}
            ]}),
        );

        let keypair = KeyPair::generate_bits(512).unwrap();
        let result = install(&api, keypair).await;
        assert!(matches!(result, Err(Error::Protocol(_))));
    }

    #[tokio::test]
    async fn transport_failure_propagates_unretried() {
        let (api, transport) = api_with_mock();
        transport.push_error(Error::Transport("POST failed: connection refused".to_string()));

        let keypair = KeyPair::generate_bits(512).unwrap();
        let result = install(&api, keypair).await;
        assert!(matches!(result, Err(Error::Transport(_))));
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn malformed_server_key_is_a_crypto_error() {
        let (api, transport) = api_with_mock();
        transport.push_json(
            200,
            json!({"Response": [
                {"Id": {"id": 11}},
                {"Token": {"token": "install-token"}},
                {"ServerPublicKey": {"server_public_key": "not a pem"}}
            ]}),
        );

        let keypair = KeyPair::generate_bits(512).unwrap();
        let result = install(&api, keypair).await;
        assert!(matches!(result, Err(Error::Crypto(_))));
    }
}
