// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Response envelope unwrapping.
//!
//! Every API response body is `{"Response": [ {key1: {..}}, {key2: {..}} ]}`,
//! an ordered array of single-key objects rather than one flat object. The
//! server uses this shape to keep key ordering stable across heterogeneous
//! field sets, and the unwrappers here preserve it exactly: elements are
//! decoded generically as (key, value) pairs and matched by name at the call
//! site.
//!
//! Every unwrap returns the decoded value paired with the response headers,
//! because pagination cursors and rate-limit counters ride on headers and
//! must not be silently dropped.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::transport::RawResponse;

pub(crate) const FIELD_RESPONSE: &str = "Response";
pub(crate) const FIELD_ID: &str = "Id";
pub(crate) const FIELD_UUID: &str = "Uuid";

/// A decoded value together with the verbatim response headers.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse<T> {
    pub value: T,
    pub headers: HashMap<String, String>,
}

fn response_array(response: &RawResponse) -> Result<Vec<Value>> {
    let root: Value = serde_json::from_slice(&response.body)
        .map_err(|e| Error::Protocol(format!("response body is not valid JSON: {e}")))?;
    let items = root
        .get(FIELD_RESPONSE)
        .ok_or_else(|| Error::Protocol(format!("missing {FIELD_RESPONSE:?} key")))?;
    items
        .as_array()
        .cloned()
        .ok_or_else(|| Error::Protocol(format!("{FIELD_RESPONSE:?} is not an array")))
}

fn index_wrapper(element: &Value, wrapper: &str) -> Result<Value> {
    element
        .get(wrapper)
        .cloned()
        .ok_or_else(|| Error::Protocol(format!("missing expected key {wrapper:?} in response element")))
}

fn decode<T: DeserializeOwned>(value: Value, what: &str) -> Result<T> {
    serde_json::from_value(value).map_err(|e| Error::Protocol(format!("malformed {what} object: {e}")))
}

/// Decode the envelope array as ordered (key, value) pairs.
///
/// Used by the installation and session-open flows, which locate several
/// independently-keyed objects within one response.
pub fn response_items(response: &RawResponse) -> Result<Vec<(String, Value)>> {
    response_array(response)?
        .into_iter()
        .map(|element| {
            let object = element
                .as_object()
                .ok_or_else(|| Error::Protocol("response element is not an object".to_string()))?;
            let mut entries = object.iter();
            match (entries.next(), entries.next()) {
                (Some((key, value)), None) => Ok((key.clone(), value.clone())),
                _ => Err(Error::Protocol(
                    "response element is not a single-key object".to_string(),
                )),
            }
        })
        .collect()
}

/// Locate one element by key name among decoded (key, value) pairs.
pub(crate) fn find_item<T: DeserializeOwned>(items: &[(String, Value)], key: &str) -> Result<T> {
    let value = items
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.clone())
        .ok_or_else(|| Error::Protocol(format!("missing expected key {key:?} in response")))?;
    decode(value, key)
}

/// Decode the first envelope element, optionally indexing one level deeper
/// via `wrapper`.
pub fn unwrap_single<T: DeserializeOwned>(
    response: &RawResponse,
    wrapper: Option<&str>,
) -> Result<ApiResponse<T>> {
    let array = response_array(response)?;
    let first = array
        .first()
        .ok_or_else(|| Error::Protocol(format!("{FIELD_RESPONSE:?} array is empty")))?;
    let value = match wrapper {
        Some(wrapper) => index_wrapper(first, wrapper)?,
        None => first.clone(),
    };
    Ok(ApiResponse {
        value: decode(value, "response")?,
        headers: response.headers.clone(),
    })
}

/// Decode every envelope element in original order, applying the same
/// optional wrapper indexing to each.
pub fn unwrap_list<T: DeserializeOwned>(
    response: &RawResponse,
    wrapper: Option<&str>,
) -> Result<ApiResponse<Vec<T>>> {
    let array = response_array(response)?;
    let mut values = Vec::with_capacity(array.len());
    for element in &array {
        let value = match wrapper {
            Some(wrapper) => index_wrapper(element, wrapper)?,
            None => element.clone(),
        };
        values.push(decode(value, "response")?);
    }
    Ok(ApiResponse {
        value: values,
        headers: response.headers.clone(),
    })
}

/// Shortcut for endpoints that answer with a bare `{"Id": {"id": ..}}`.
pub fn unwrap_id(response: &RawResponse) -> Result<ApiResponse<i64>> {
    let id: ApiResponse<crate::models::Id> = unwrap_single(response, Some(FIELD_ID))?;
    Ok(ApiResponse {
        value: id.value.id,
        headers: id.headers,
    })
}

/// Shortcut for endpoints that answer with a bare `{"Uuid": {"uuid": ..}}`.
pub fn unwrap_uuid(response: &RawResponse) -> Result<ApiResponse<String>> {
    let uuid: ApiResponse<crate::models::Uuid> = unwrap_single(response, Some(FIELD_UUID))?;
    Ok(ApiResponse {
        value: uuid.value.uuid,
        headers: uuid.headers,
    })
}
