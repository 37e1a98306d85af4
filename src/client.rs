// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Low-level API client: URL and header assembly over the transport.
//!
//! Every call carries `Content-Type`, a `User-Agent` identifying this crate,
//! and a fresh `X-Request-Id` for log correlation. Authenticated calls add a
//! bearer header; mutating calls additionally sign the body with the client
//! private key (base64 PKCS#1 v1.5 over SHA-256 in `X-Client-Signature`).
//!
//! The bearer token is always an explicit argument. Keeping the client
//! ignorant of the context avoids the context-needs-client-needs-context
//! cycle.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use uuid::Uuid;

use crate::context::ApiEnvironment;
use crate::crypto::KeyPair;
use crate::error::Result;
use crate::transport::{Method, RawResponse, Transport};

const HEADER_CONTENT_TYPE: &str = "Content-Type";
const HEADER_USER_AGENT: &str = "User-Agent";
const HEADER_REQUEST_ID: &str = "X-Request-Id";
const HEADER_AUTHORIZATION: &str = "Authorization";
const HEADER_CLIENT_SIGNATURE: &str = "X-Client-Signature";

const CONTENT_TYPE_JSON: &str = "application/json";
const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Thin endpoint client bound to one environment's base URL.
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    transport: Arc<dyn Transport>,
}

impl ApiClient {
    pub fn new(environment: ApiEnvironment, transport: Arc<dyn Transport>) -> Self {
        Self {
            base_url: environment.base_url().to_string(),
            transport,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    fn headers(bearer: Option<&str>) -> HashMap<String, String> {
        let mut headers = HashMap::from([
            (HEADER_CONTENT_TYPE.to_string(), CONTENT_TYPE_JSON.to_string()),
            (HEADER_USER_AGENT.to_string(), USER_AGENT.to_string()),
            (HEADER_REQUEST_ID.to_string(), Uuid::new_v4().to_string()),
        ]);
        if let Some(token) = bearer {
            headers.insert(HEADER_AUTHORIZATION.to_string(), format!("Bearer {token}"));
        }
        headers
    }

    fn sign(headers: &mut HashMap<String, String>, signer: Option<&KeyPair>, body: &[u8]) -> Result<()> {
        if let Some(keypair) = signer {
            let signature = keypair.sign_sha256(body)?;
            headers.insert(HEADER_CLIENT_SIGNATURE.to_string(), BASE64.encode(signature));
        }
        Ok(())
    }

    pub async fn post(
        &self,
        path: &str,
        body: Vec<u8>,
        bearer: Option<&str>,
        signer: Option<&KeyPair>,
    ) -> Result<RawResponse> {
        let mut headers = Self::headers(bearer);
        Self::sign(&mut headers, signer, &body)?;
        self.transport
            .send(Method::Post, &self.url(path), headers, Some(body))
            .await
    }

    pub async fn put(
        &self,
        path: &str,
        body: Vec<u8>,
        bearer: Option<&str>,
        signer: Option<&KeyPair>,
    ) -> Result<RawResponse> {
        let mut headers = Self::headers(bearer);
        Self::sign(&mut headers, signer, &body)?;
        self.transport
            .send(Method::Put, &self.url(path), headers, Some(body))
            .await
    }

    pub async fn get(&self, path: &str, bearer: Option<&str>) -> Result<RawResponse> {
        self.transport
            .send(Method::Get, &self.url(path), Self::headers(bearer), None)
            .await
    }

    pub async fn delete(&self, path: &str, bearer: Option<&str>) -> Result<RawResponse> {
        self.transport
            .send(Method::Delete, &self.url(path), Self::headers(bearer), None)
            .await
    }
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}
