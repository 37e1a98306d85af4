// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Device registration: binds the installation token to a device identity.
//!
//! Bearer is the installation token; the body carries a human-readable
//! description, the API key as the shared secret, and an optional allow-list
//! of origin IPs. An empty list is omitted entirely and the server then
//! applies its default policy (typically "current IP only"). Whether a
//! repeat registration is a no-op or an update is the server's call; this
//! side never deduplicates and never retries.

use serde::Serialize;
use tracing::info;

use crate::client::ApiClient;
use crate::context::installation::InstallationContext;
use crate::envelope;
use crate::error::{Error, Result};

const ENDPOINT_DEVICE_SERVER: &str = "device-server";

#[derive(Serialize)]
struct DeviceServerRequest<'a> {
    description: &'a str,
    secret: &'a str,
    #[serde(skip_serializing_if = "slice_is_empty")]
    permitted_ips: &'a [String],
}

fn slice_is_empty(ips: &&[String]) -> bool {
    ips.is_empty()
}

/// Register this device under the installation. A non-success status maps
/// to [`Error::Registration`]; a 2xx with an unreadable body stays a
/// protocol error, since the server did accept the device.
pub(crate) async fn register_device(
    api: &ApiClient,
    installation: &InstallationContext,
    description: &str,
    api_key: &str,
    permitted_ips: &[String],
) -> Result<()> {
    let request = DeviceServerRequest {
        description,
        secret: api_key,
        permitted_ips,
    };
    let body = serde_json::to_vec(&request)
        .map_err(|e| Error::Serialization(format!("device registration body: {e}")))?;

    let response = api
        .post(
            ENDPOINT_DEVICE_SERVER,
            body,
            Some(installation.token()),
            Some(installation.keypair()),
        )
        .await
        .map_err(|err| match err {
            Error::Transport(message) => Error::Registration(message),
            other => other,
        })?;

    let device_id = envelope::unwrap_id(&response)?;
    info!(device_id = device_id.value, description, "device registered");
    Ok(())
}
