// Copyright 2025 querybench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Request builders for the backends under test.
//!
//! Each backend turns a [`QuerySpec`] into a fully encoded GET URL. Parameter
//! values are `application/x-www-form-urlencoded` encoded and appear in the
//! order they were added.

use querybench_core::{BenchError, PreparedRequest, QuerySpec, Result};
use url::Url;

pub mod clickhouse;
pub mod loki;

pub use clickhouse::ClickHouseBackend;
pub use loki::{LokiBackend, LokiEndpoint};

/// A backend that can express a [`QuerySpec`] as an HTTP request.
pub trait QueryBackend {
    /// Short backend name used in target ids.
    fn name(&self) -> &str;

    /// Build the request for `spec`.
    fn build_request(&self, spec: &QuerySpec) -> Result<PreparedRequest>;
}

/// Parse and check a backend base URL.
pub fn parse_base_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).map_err(|e| {
        BenchError::RequestConstruction(format!("invalid base URL '{}': {}", raw, e))
    })?;
    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(BenchError::RequestConstruction(format!(
            "base URL '{}' must be an http(s) URL",
            raw
        )));
    }
    Ok(url)
}

/// `base` with `path` appended to whatever path prefix it already has.
pub(crate) fn endpoint_url(base: &Url, path: &str) -> Url {
    let mut url = base.clone();
    let prefix = base.path().trim_end_matches('/').to_string();
    url.set_path(&format!("{}{}", prefix, path));
    url.set_query(None);
    url.set_fragment(None);
    url
}
