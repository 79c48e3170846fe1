// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Content shortening for debug logs.

use std::borrow::Cow;

/// Characters of message content kept in debug logs when truncation is on.
pub const MAX_LOGGED_CHARS: usize = 200;

/// Shortens `text` to [`MAX_LOGGED_CHARS`] characters when `truncate` is set.
pub fn loggable(text: &str, truncate: bool) -> Cow<'_, str> {
    if !truncate {
        return Cow::Borrowed(text);
    }
    match text.char_indices().nth(MAX_LOGGED_CHARS) {
        Some((cut, _)) => Cow::Owned(format!("{}...", &text[..cut])),
        None => Cow::Borrowed(text),
    }
}
