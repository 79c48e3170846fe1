// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules for the storage driver.

pub mod conversations;
pub mod facts;
pub mod identities;
