// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Wire Models
//!
//! This module defines the handful of response objects the authentication
//! lifecycle needs. Business-domain resources are deliberately not modelled
//! here; callers decode those themselves through the envelope unwrappers.
//!
//! ## User Kinds
//!
//! A session is bound to exactly one user kind: company, person, or an
//! api-key delegate. [`SessionUser`] models that as a tagged union with one
//! active case, so timeout resolution is a single exhaustive match instead
//! of a chain of nullable-field checks.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

// Well-known envelope element keys.
pub(crate) const KEY_TOKEN: &str = "Token";
pub(crate) const KEY_SERVER_PUBLIC_KEY: &str = "ServerPublicKey";
pub(crate) const KEY_USER_COMPANY: &str = "UserCompany";
pub(crate) const KEY_USER_PERSON: &str = "UserPerson";
pub(crate) const KEY_USER_API_KEY: &str = "UserApiKey";

/// Numeric id payload (`{"Id": {"id": ..}}`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Id {
    pub id: i64,
}

/// Uuid payload (`{"Uuid": {"uuid": ..}}`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Uuid {
    pub uuid: String,
}

/// Bearer token payload, issued by installation and session-open.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionToken {
    pub token: String,
}

/// The server's public key as delivered during installation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PublicKeyServer {
    pub server_public_key: String,
}

/// A natural-person user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserPerson {
    pub id: i64,
    #[serde(default)]
    pub display_name: Option<String>,
    /// Session timeout in seconds, as configured server-side for this user.
    pub session_timeout: i64,
}

/// A company user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserCompany {
    pub id: i64,
    #[serde(default)]
    pub display_name: Option<String>,
    pub session_timeout: i64,
}

/// The user an api-key delegate acts on behalf of, nested one level deeper
/// as a single-key object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ReferencedUser {
    UserPerson(UserPerson),
    UserCompany(UserCompany),
}

impl ReferencedUser {
    pub fn session_timeout(&self) -> i64 {
        match self {
            ReferencedUser::UserPerson(person) => person.session_timeout,
            ReferencedUser::UserCompany(company) => company.session_timeout,
        }
    }
}

/// An api-key delegate user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserApiKey {
    pub id: i64,
    pub requested_by_user: ReferencedUser,
}

/// The one user kind a session is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionUser {
    Company(UserCompany),
    Person(UserPerson),
    ApiKey(UserApiKey),
}

impl SessionUser {
    /// Locate the populated user branch among the session-open response
    /// elements. Exactly one branch is expected; none is a hard stop.
    pub(crate) fn from_items(items: &[(String, Value)]) -> Result<Self> {
        for (key, value) in items {
            let user = match key.as_str() {
                KEY_USER_COMPANY => {
                    SessionUser::Company(decode_user(value.clone(), KEY_USER_COMPANY)?)
                }
                KEY_USER_PERSON => SessionUser::Person(decode_user(value.clone(), KEY_USER_PERSON)?),
                KEY_USER_API_KEY => SessionUser::ApiKey(decode_user(value.clone(), KEY_USER_API_KEY)?),
                _ => continue,
            };
            return Ok(user);
        }
        Err(Error::Configuration(
            "session response contains no user branch (UserCompany, UserPerson, or UserApiKey)"
                .to_string(),
        ))
    }

    /// The identity this session is bound to.
    pub fn user_id(&self) -> i64 {
        match self {
            SessionUser::Company(company) => company.id,
            SessionUser::Person(person) => person.id,
            SessionUser::ApiKey(api_key) => api_key.id,
        }
    }

    /// The server-declared session timeout in seconds. For api-key
    /// delegates this lives one level further down, on the referenced user.
    pub fn session_timeout(&self) -> i64 {
        match self {
            SessionUser::Company(company) => company.session_timeout,
            SessionUser::Person(person) => person.session_timeout,
            SessionUser::ApiKey(api_key) => api_key.requested_by_user.session_timeout(),
        }
    }
}

fn decode_user<T: serde::de::DeserializeOwned>(value: Value, key: &str) -> Result<T> {
    serde_json::from_value(value)
        .map_err(|e| Error::Protocol(format!("malformed {key} object: {e}")))
}
