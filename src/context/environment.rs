// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use serde::{Deserialize, Serialize};

const BASE_URL_PRODUCTION: &str = "https://api.corebank.network/v1";
const BASE_URL_SANDBOX: &str = "https://api.sandbox.corebank.network/v1";

/// Which API deployment a context talks to. Immutable after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApiEnvironment {
    Production,
    Sandbox,
}

impl ApiEnvironment {
    pub fn base_url(&self) -> &'static str {
        match self {
            ApiEnvironment::Production => BASE_URL_PRODUCTION,
            ApiEnvironment::Sandbox => BASE_URL_SANDBOX,
        }
    }
}

impl std::fmt::Display for ApiEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiEnvironment::Production => write!(f, "PRODUCTION"),
            ApiEnvironment::Sandbox => write!(f, "SANDBOX"),
        }
    }
}
