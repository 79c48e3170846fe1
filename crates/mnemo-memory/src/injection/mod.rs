// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider-shape aware request rewriting.
//!
//! The stateful history and fact injection steps live on
//! [`Invocation`](crate::invocation::Invocation); this module holds the
//! pure pieces they are built from.

pub mod exclude;
pub mod facts;
pub mod family;

pub use exclude::{
    INJECTED_COUNT_KEY, exclude_injected_messages, injected_count, injection_marker,
    mark_injected_count,
};
pub use facts::{FACTS_HEADER, format_fact, format_facts_block};
pub use family::{BLOCK_SEPARATOR, ProviderFamily};
