//! Embed target rewriting in both directions.
//!
//! Both functions are pure: they take text and a lookup table and return new
//! text. Committing the result is the caller's business.

use crate::embed::{captured_target, format_target, EMBED_REGEX};
use regex::Captures;
use std::collections::{BTreeMap, HashSet};

/// Point every embed whose target is a downloaded URL at its local copy.
///
/// Alt-text is kept verbatim; embeds with unmapped targets are untouched.
pub fn apply_downloads(text: &str, url_to_local: &BTreeMap<String, String>) -> String {
    EMBED_REGEX
        .replace_all(text, |caps: &Captures<'_>| {
            let target = captured_target(caps);
            match url_to_local.get(target) {
                Some(local) => format!("![{}]({})", &caps["alt"], format_target(local)),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Point every embed whose target is a known local path back at its remote URL.
///
/// Targets are compared as literal strings. Returns the new text and the
/// number of distinct local paths that were replaced; `0` means nothing to do.
pub fn revert(text: &str, local_to_url: &BTreeMap<String, String>) -> (String, usize) {
    let mut replaced: HashSet<String> = HashSet::new();
    let updated = EMBED_REGEX
        .replace_all(text, |caps: &Captures<'_>| {
            let target = captured_target(caps);
            match local_to_url.get(target) {
                Some(url) => {
                    replaced.insert(target.to_string());
                    format!("![{}]({})", &caps["alt"], url)
                }
                None => caps[0].to_string(),
            }
        })
        .into_owned();
    (updated, replaced.len())
}
