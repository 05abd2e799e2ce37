// Copyright 2025 querybench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Fully built request handed from a request builder to the transport.

use url::Url;

/// A GET request whose URL already carries every encoded query parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedRequest {
    /// Absolute URL including the encoded query string.
    pub url: Url,
    /// Short label of the endpoint, used in logs.
    pub endpoint: &'static str,
}

impl PreparedRequest {
    /// Create a prepared request.
    pub fn new(url: Url, endpoint: &'static str) -> Self {
        Self { url, endpoint }
    }

    /// The encoded query string, without the leading `?`.
    pub fn query_string(&self) -> &str {
        self.url.query().unwrap_or_default()
    }
}

impl std::fmt::Display for PreparedRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "GET {}", self.url)
    }
}
