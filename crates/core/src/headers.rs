// Copyright 2025 querybench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Custom headers attached to every request of a run.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{BenchError, Result};

/// Header carrying the tenant identifier for multi-tenant log backends.
pub const TENANT_HEADER: &str = "X-Scope-OrgID";

/// Header name to value mapping.
///
/// Names are case-insensitive and stored lowercased, so `X-SCOPE-ORGID`
/// replaces `X-Scope-OrgID`. Names and values are only checked for HTTP
/// validity when the transport converts them, so that a bad header fails the
/// run before its first request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<String, String>",
    into = "BTreeMap<String, String>"
)]
pub struct Headers(BTreeMap<String, String>);

impl Headers {
    /// Create an empty header set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Header set carrying only the tenant header.
    pub fn tenant(id: impl Into<String>) -> Self {
        let mut headers = Self::new();
        headers.insert(TENANT_HEADER, id);
        headers
    }

    /// Insert or replace a header.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name: String = name.into();
        self.0.insert(name.to_ascii_lowercase(), value.into());
    }

    /// Builder form of [`Headers::insert`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Look a header up, ignoring case.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Copy every header of `other` into this set, replacing duplicates.
    pub fn extend(&mut self, other: &Headers) {
        for (name, value) in other.iter() {
            self.insert(name, value);
        }
    }

    /// Iterate over `(name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of headers.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse a `Name: value` pair as given on the command line.
    pub fn parse_pair(raw: &str) -> Result<(String, String)> {
        let (name, value) = raw.split_once(':').ok_or_else(|| {
            BenchError::Configuration(format!("header '{}' is not in 'Name: value' form", raw))
        })?;
        let name = name.trim();
        if name.is_empty() {
            return Err(BenchError::Configuration(format!(
                "header '{}' has an empty name",
                raw
            )));
        }
        Ok((name.to_string(), value.trim().to_string()))
    }
}

impl From<BTreeMap<String, String>> for Headers {
    fn from(map: BTreeMap<String, String>) -> Self {
        map.into_iter().collect()
    }
}

impl From<Headers> for BTreeMap<String, String> {
    fn from(headers: Headers) -> Self {
        headers.0
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Self::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}
