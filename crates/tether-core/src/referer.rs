//! Referer resolution
//!
//! Some image hosts only serve an image when the request names the page that
//! linked it. The page is usually recorded in the note itself: as a
//! frontmatter property (`source: https://...`) or as a link near the top of
//! the body. Resolution tries, in order:
//!
//! 1. the first string frontmatter value shaped like an absolute HTTP(S) URL
//! 2. the first `https?://` token within the first 200 characters of the body
//!
//! When both fail the referer is unresolved and the caller decides, through
//! [`RefererMode`], whether to prompt or to proceed without a header.

use crate::embed::is_remote;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::debug;

/// How many leading body characters are scanned for a URL
pub const BODY_SCAN_CHARS: usize = 200;

static URL_TOKEN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://[^\s]+").expect("url token regex"));

/// Where a resolved referer came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum RefererSource {
    Frontmatter { key: String },
    Body,
}

/// A referer found in the document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedReferer {
    pub value: String,
    #[serde(flatten)]
    pub source: RefererSource,
}

/// How a download request obtains its referer
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RefererMode {
    /// Use the resolved value, prompt when unresolved
    #[default]
    Interactive,
    /// Use the resolved value, fall back to no header without prompting
    Quick,
    /// Caller-supplied value; empty means no header
    Explicit(String),
}

/// Resolve a referer from document text (frontmatter first, then body)
pub fn resolve_referer(text: &str) -> Option<ResolvedReferer> {
    let (frontmatter, body) = split_frontmatter(text);

    if let Some(resolved) = frontmatter.and_then(referer_from_frontmatter) {
        debug!("Found referer in frontmatter: {}", resolved.value);
        return Some(resolved);
    }

    let head = leading_chars(body, BODY_SCAN_CHARS);
    URL_TOKEN_REGEX.find(head).map(|m| {
        debug!("Found referer in body: {}", m.as_str());
        ResolvedReferer {
            value: m.as_str().to_string(),
            source: RefererSource::Body,
        }
    })
}

/// Split a leading `---` delimited YAML block from the body.
///
/// Returns `(None, text)` when there is no complete frontmatter block.
pub fn split_frontmatter(text: &str) -> (Option<&str>, &str) {
    let rest = match text
        .strip_prefix("---\n")
        .or_else(|| text.strip_prefix("---\r\n"))
    {
        Some(rest) => rest,
        None => return (None, text),
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end_matches(['\r', '\n']) == "---" {
            let yaml = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return (Some(yaml), body);
        }
        offset += line.len();
    }

    (None, text)
}

fn referer_from_frontmatter(yaml: &str) -> Option<ResolvedReferer> {
    let value: serde_yaml::Value = match serde_yaml::from_str(yaml) {
        Ok(value) => value,
        Err(e) => {
            debug!("Ignoring unparseable frontmatter: {}", e);
            return None;
        }
    };

    let mapping = value.as_mapping()?;
    mapping.iter().find_map(|(key, value)| {
        let candidate = value.as_str()?;
        if !is_remote(candidate) {
            return None;
        }
        let key = match key {
            serde_yaml::Value::String(s) => s.clone(),
            other => serde_yaml::to_string(other)
                .map(|s| s.trim().to_string())
                .unwrap_or_default(),
        };
        Some(ResolvedReferer {
            value: candidate.to_string(),
            source: RefererSource::Frontmatter { key },
        })
    })
}

fn leading_chars(text: &str, count: usize) -> &str {
    match text.char_indices().nth(count) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frontmatter_url_wins_over_body() {
        let text = "---\ntitle: Notes\nsource: https://blog.example.com/post/1\n---\n\
                    See https://other.example.com for context.";

        let resolved = resolve_referer(text).unwrap();
        assert_eq!(resolved.value, "https://blog.example.com/post/1");
        assert_eq!(
            resolved.source,
            RefererSource::Frontmatter {
                key: "source".to_string()
            }
        );
    }

    #[test]
    fn first_matching_frontmatter_value_is_used() {
        let text = "---\nauthor: someone\nurl: HTTP://first.example.com/\norigin: https://second.example.com/\n---\nbody";
        assert_eq!(
            resolve_referer(text).unwrap().value,
            "HTTP://first.example.com/"
        );
    }

    #[test]
    fn non_string_frontmatter_values_are_skipped() {
        let text = "---\ncount: 3\nlinks:\n  - https://nested.example.com\n---\nno urls here";
        assert!(resolve_referer(text).is_none());
    }

    #[test]
    fn body_url_within_first_200_chars() {
        let text = "Clipped from https://news.example.com/article?id=7 on Monday\n\n![](https://cdn.example.com/a.png)";
        let resolved = resolve_referer(text).unwrap();
        assert_eq!(resolved.value, "https://news.example.com/article?id=7");
        assert_eq!(resolved.source, RefererSource::Body);
    }

    #[test]
    fn body_url_after_200_chars_is_not_used() {
        let text = format!("{} https://late.example.com", "x".repeat(210));
        assert!(resolve_referer(&text).is_none());
    }

    #[test]
    fn scan_window_counts_characters_not_bytes() {
        let text = format!("{}https://ok.example.com", "é".repeat(150));
        assert_eq!(
            resolve_referer(&text).unwrap().value,
            "https://ok.example.com"
        );
    }

    #[test]
    fn body_scan_starts_after_frontmatter() {
        let text = "---\ntitle: plain\n---\nhttps://body.example.com/page";
        assert_eq!(
            resolve_referer(text).unwrap().value,
            "https://body.example.com/page"
        );
    }

    #[test]
    fn unresolved_when_nothing_matches() {
        assert!(resolve_referer("# Title\n\nNo links at all.").is_none());
        assert!(resolve_referer("").is_none());
    }

    #[test]
    fn split_frontmatter_handles_crlf_and_missing_close() {
        let (fm, body) = split_frontmatter("---\r\na: 1\r\n---\r\nbody");
        assert_eq!(fm, Some("a: 1\r\n"));
        assert_eq!(body, "body");

        let text = "---\na: 1\nno closing fence";
        assert_eq!(split_frontmatter(text), (None, text));
    }

    #[test]
    fn malformed_frontmatter_falls_back_to_body() {
        let text = "---\n: [unbalanced\n---\nhttps://body.example.com";
        assert_eq!(
            resolve_referer(text).unwrap().value,
            "https://body.example.com"
        );
    }
}
