// Copyright 2025 querybench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Core types for querybench.
//!
//! A benchmark run is described by a [`QuerySpec`] (what to ask a backend and
//! over which time window) and a set of [`Headers`] attached to every request.
//! Request builders turn those into a [`PreparedRequest`]; everything that can
//! go wrong along the way is a [`BenchError`].

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod error;
pub mod headers;
pub mod query;
pub mod request;

pub use error::{BenchError, Result};
pub use headers::{Headers, TENANT_HEADER};
pub use query::{QuerySpec, TimeRange};
pub use request::PreparedRequest;
