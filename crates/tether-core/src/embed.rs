//! Image embed extraction
//!
//! Finds Markdown image embeds of the form `![alt](target)` and classifies
//! their targets as remote (`http://` / `https://`) or local (anything else).
//! Malformed syntax is simply not matched.
//!
//! Targets may contain spaces. A target wrapped in `<...>` may also contain
//! `)`; the brackets are not part of the target.

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashSet;
use std::ops::Range;
use std::sync::LazyLock;

pub(crate) static EMBED_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"!\[(?P<alt>[^\]\n]*)\]\([ \t]*(?:<(?P<angled>[^<>\n]+)>|(?P<target>[^)\n]*[^)\s]))[ \t]*\)",
    )
    .expect("embed regex")
});

/// Target of an [`EMBED_REGEX`] match, without angle brackets
pub(crate) fn captured_target<'t>(caps: &Captures<'t>) -> &'t str {
    caps.name("angled")
        .or_else(|| caps.name("target"))
        .map(|m| m.as_str())
        .unwrap_or_default()
}

/// Spell `path` so it reads back as the same target
pub fn format_target(path: &str) -> Cow<'_, str> {
    if path.contains(')') && !path.contains(['<', '>']) {
        Cow::Owned(format!("<{}>", path))
    } else {
        Cow::Borrowed(path)
    }
}

/// Where an embed target points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefKind {
    Remote,
    Local,
}

/// An image reference recomputed from document text
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageRef {
    pub url: String,
    pub kind: RefKind,
}

/// A single `![alt](target)` occurrence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageEmbed {
    pub alt: String,
    pub target: String,
    /// Byte range of the whole embed in the source text
    pub range: Range<usize>,
}

impl ImageEmbed {
    pub fn kind(&self) -> RefKind {
        if is_remote(&self.target) {
            RefKind::Remote
        } else {
            RefKind::Local
        }
    }
}

/// Whether a target starts with an HTTP(S) scheme (case-insensitive)
pub fn is_remote(target: &str) -> bool {
    let lower = target.get(..8).unwrap_or(target).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Every image embed in encounter order
pub fn image_embeds(text: &str) -> Vec<ImageEmbed> {
    EMBED_REGEX
        .captures_iter(text)
        .filter_map(|cap| {
            let whole = cap.get(0)?;
            Some(ImageEmbed {
                alt: cap.name("alt").map(|m| m.as_str().to_string()).unwrap_or_default(),
                target: captured_target(&cap).to_string(),
                range: whole.range(),
            })
        })
        .collect()
}

/// Deduplicated references of both kinds, in encounter order
pub fn extract_refs(text: &str) -> Vec<ImageRef> {
    let mut seen = HashSet::new();
    image_embeds(text)
        .into_iter()
        .filter(|embed| seen.insert(embed.target.clone()))
        .map(|embed| ImageRef {
            kind: embed.kind(),
            url: embed.target,
        })
        .collect()
}

/// Remote image URLs, deduplicated, in encounter order
pub fn remote_urls(text: &str) -> Vec<String> {
    targets_of_kind(text, RefKind::Remote)
}

/// Local image targets exactly as written, deduplicated, in encounter order
pub fn local_targets(text: &str) -> Vec<String> {
    targets_of_kind(text, RefKind::Local)
}

fn targets_of_kind(text: &str, kind: RefKind) -> Vec<String> {
    extract_refs(text)
        .into_iter()
        .filter(|r| r.kind == kind)
        .map(|r| r.url)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_urls_in_encounter_order_without_duplicates() {
        let text = "![a](https://x.com/1.png) text ![b](http://y.org/2.jpg)\n\
                    ![](https://x.com/1.png) ![c](https://z.net/3.gif)";

        assert_eq!(
            remote_urls(text),
            vec![
                "https://x.com/1.png",
                "http://y.org/2.jpg",
                "https://z.net/3.gif"
            ]
        );
    }

    #[test]
    fn local_targets_are_not_remote() {
        let text = "![a](assets/1.png) ![b](/root/2.png) ![c](https://x.com/3.png)";

        assert_eq!(remote_urls(text), vec!["https://x.com/3.png"]);
        assert_eq!(local_targets(text), vec!["assets/1.png", "/root/2.png"]);
    }

    #[test]
    fn empty_alt_text_is_matched() {
        let embeds = image_embeds("before ![](https://x.com/a.png) after");
        assert_eq!(embeds.len(), 1);
        assert_eq!(embeds[0].alt, "");
        assert_eq!(embeds[0].target, "https://x.com/a.png");
        assert_eq!(embeds[0].range, 7..31);
    }

    #[test]
    fn plain_links_and_malformed_embeds_are_ignored() {
        let text = "[link](https://x.com/a.png) ![broken(https://x.com/b.png) ![x]()";
        assert!(image_embeds(text).is_empty());
        assert!(remote_urls(text).is_empty());
    }

    #[test]
    fn targets_may_contain_spaces() {
        let text = "![cat](My Notes/imgs/1_abcde.png) ![dog]( https://x.com/d.png )";
        assert_eq!(local_targets(text), vec!["My Notes/imgs/1_abcde.png"]);
        assert_eq!(remote_urls(text), vec!["https://x.com/d.png"]);
    }

    #[test]
    fn angled_targets_may_contain_parentheses() {
        let embeds = image_embeds("![a](<Trips (2024)/imgs/a.png>) after");
        assert_eq!(embeds.len(), 1);
        assert_eq!(embeds[0].target, "Trips (2024)/imgs/a.png");
        assert_eq!(embeds[0].alt, "a");

        assert_eq!(format_target("Trips (2024)/a.png"), "<Trips (2024)/a.png>");
        assert_eq!(format_target("My Notes/a.png"), "My Notes/a.png");
    }

    #[test]
    fn scheme_check_is_case_insensitive_but_strict() {
        assert!(is_remote("HTTPS://X.COM/A.PNG"));
        assert!(is_remote("http://x"));
        assert!(!is_remote("httpfoo/bar.png"));
        assert!(!is_remote("ftp://x.com/a.png"));
        assert!(!is_remote("ht"));
    }

    #[test]
    fn extract_refs_classifies_each_target() {
        let refs = extract_refs("![a](https://x.com/a.png) ![b](img/b.png)");
        assert_eq!(
            refs,
            vec![
                ImageRef {
                    url: "https://x.com/a.png".to_string(),
                    kind: RefKind::Remote
                },
                ImageRef {
                    url: "img/b.png".to_string(),
                    kind: RefKind::Local
                },
            ]
        );
    }

    #[test]
    fn no_embeds_is_an_empty_result() {
        assert!(remote_urls("").is_empty());
        assert!(local_targets("just prose, no images").is_empty());
    }
}
