// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rendering of recalled facts into a system-prompt block.

use chrono::{DateTime, NaiveDateTime};
use mnemo_core::Fact;

/// First line of every injected fact block.
pub const FACTS_HEADER: &str = "Relevant context about the user:";

/// Renders facts as a bulleted block under [`FACTS_HEADER`], or `None` when
/// there is nothing to render.
pub fn format_facts_block(facts: &[Fact]) -> Option<String> {
    if facts.is_empty() {
        return None;
    }
    let mut block = String::from(FACTS_HEADER);
    for fact in facts {
        block.push_str("\n- ");
        block.push_str(&format_fact(fact));
    }
    Some(block)
}

/// `<content>. Stated at <YYYY-MM-DD HH:MM>` when the fact carries a
/// creation time, otherwise just the content.
pub fn format_fact(fact: &Fact) -> String {
    match fact.date_created.as_deref() {
        Some(created) if !created.trim().is_empty() => format!(
            "{}. Stated at {}",
            fact.content.trim_end().trim_end_matches('.'),
            format_timestamp(created)
        ),
        _ => fact.content.clone(),
    }
}

/// Minute-precision rendering of a stored timestamp. Unparseable values are
/// returned unchanged.
fn format_timestamp(raw: &str) -> String {
    const OUT: &str = "%Y-%m-%d %H:%M";
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.format(OUT).to_string();
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|dt| dt.format(OUT).to_string())
        .unwrap_or_else(|| raw.to_string())
}
