//! Naming normalization
//!
//! Type names become table names and field names become column names through
//! the same function, so the write path and the read path always agree.

use std::sync::OnceLock;
use regex::Regex;
use crate::{Error, Result};

static IDENTIFIER: OnceLock<Regex> = OnceLock::new();

fn identifier_pattern() -> &'static Regex {
    IDENTIFIER.get_or_init(|| Regex::new(r"^[a-z_][a-z0-9_]*$").expect("identifier pattern is valid"))
}

/// Canonicalize an identifier to lower `snake_case`.
///
/// `BlogPost` → `blog_post`, `authorId` → `author_id`, `HTTPServer` →
/// `http_server`, `first-name` → `first_name`.
pub fn normalize(identifier: &str) -> String {
    let chars: Vec<char> = identifier.chars().collect();
    let mut out = String::with_capacity(identifier.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if matches!(c, '-' | ' ' | '.' | '_') {
            if !out.ends_with('_') {
                out.push('_');
            }
            continue;
        }

        if c.is_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            let boundary = match prev {
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                // End of an acronym: "HTTPServer" splits before the 'S'
                Some(p) if p.is_uppercase() => next.is_some_and(|n| n.is_lowercase()),
                _ => false,
            };
            if boundary && !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }

    out
}

/// Normalize an identifier and reject anything that is not safe to splice into SQL.
pub fn sql_identifier(identifier: &str) -> Result<String> {
    let normalized = normalize(identifier);
    if identifier_pattern().is_match(&normalized) {
        Ok(normalized)
    } else {
        Err(Error::InvalidIdentifier(identifier.to_string()))
    }
}
