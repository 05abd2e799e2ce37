// Copyright 2025 querybench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Test transport returning a canned response.

use async_trait::async_trait;
use querybench_benchmarks::{QueryResponse, QueryTransport};
use querybench_core::{PreparedRequest, Result};
use std::sync::Mutex;

/// Answers every request with the same status and body and remembers the URLs.
pub(crate) struct Canned {
    status: u16,
    body: &'static str,
    seen: Mutex<Vec<String>>,
}

impl Canned {
    pub(crate) fn new(status: u16, body: &'static str) -> Self {
        Self {
            status,
            body,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueryTransport for Canned {
    async fn execute(&self, request: &PreparedRequest) -> Result<QueryResponse> {
        self.seen.lock().unwrap().push(request.url.to_string());
        Ok(QueryResponse::new(self.status, self.body.as_bytes()))
    }
}
