// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the hosted Mnemo memory service.
//!
//! Provides [`CloudClient`], the reqwest-backed implementation of
//! [`CloudApi`](mnemo_core::CloudApi).

pub mod client;

pub use client::{API_KEY_ENV_VAR, CloudClient};
