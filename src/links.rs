use regex::Regex;
use std::sync::OnceLock;

static LINK_RE: OnceLock<Regex> = OnceLock::new();

fn link_re() -> &'static Regex {
    LINK_RE.get_or_init(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").expect("link pattern is valid"))
}

/// Rewrite relative Markdown links to absolute site URLs.
///
/// Generated answers tend to carry site-relative paths copied from the
/// documentation source; those only resolve against the deployed site.
/// Absolute URLs and in-page anchors are left untouched.
pub fn rewrite_links(text: &str, base: &str) -> String {
    link_re()
        .replace_all(text, |caps: &regex::Captures| {
            let label = &caps[1];
            let url = &caps[2];
            if url.starts_with("http://") || url.starts_with("https://") || url.starts_with('#') {
                caps[0].to_string()
            } else if url.starts_with('/') {
                format!("[{label}]({base}{url})")
            } else {
                format!("[{label}]({base}/{url})")
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://example.github.io/notes";

    #[test]
    fn absolute_urls_pass_through() {
        let text = "See [the docs](https://docs.rs/regex) or [http](http://example.com/a).";
        assert_eq!(rewrite_links(text, BASE), text);
    }

    #[test]
    fn anchor_only_urls_pass_through() {
        let text = "Jump to [setup](#setup).";
        assert_eq!(rewrite_links(text, BASE), text);
    }

    #[test]
    fn rooted_urls_get_base_prefix() {
        assert_eq!(
            rewrite_links("[intro](/java/basics/)", BASE),
            format!("[intro]({BASE}/java/basics/)")
        );
    }

    #[test]
    fn relative_urls_get_base_and_slash() {
        assert_eq!(
            rewrite_links("[intro](java/basics/)", BASE),
            format!("[intro]({BASE}/java/basics/)")
        );
    }

    #[test]
    fn rewritten_output_is_stable_under_second_pass() {
        let once = rewrite_links("[a](x/y) and [b](/z)", BASE);
        assert_eq!(rewrite_links(&once, BASE), once);
    }

    #[test]
    fn malformed_links_are_left_alone() {
        let text = "broken [label](no-close and ](stray)";
        assert_eq!(rewrite_links(text, BASE), text);
    }

    #[test]
    fn multiple_links_in_one_message() {
        let out = rewrite_links("[a](/x) then [b](https://e.com) then [c](y)", BASE);
        assert_eq!(out, format!("[a]({BASE}/x) then [b](https://e.com) then [c]({BASE}/y)"));
    }
}
