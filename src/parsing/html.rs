//! Body cleanup for new-style (HTML) chat records and XML stanza text.

use std::sync::LazyLock;

use html_escape::decode_html_entities;
use regex::Regex;

static BREAK_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").expect("valid regex"));

static ANY_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid regex"));

/// Turns the decoded payload of a new-style chat record into plain text.
///
/// Gmail doubles every line ending in these payloads and marks the real line
/// breaks with `<br>`, so doubled endings collapse first, then breaks become
/// newlines, tags are dropped and character references decoded.
///
/// ```
/// use gchatlog::parsing::html::clean_html_body;
///
/// assert_eq!(clean_html_body("<div>one<br>two &amp; three</div>\n\n"), "one\ntwo & three");
/// ```
pub fn clean_html_body(payload: &str) -> String {
    let normalized = payload.replace("\r\n", "\n");
    let deduped = normalized.replace("\n\n", "\n");
    let newlined = BREAK_TAG.replace_all(&deduped, "\n");
    let stripped = ANY_TAG.replace_all(&newlined, "");
    unescape_entities(&stripped).trim().to_string()
}

/// Decodes named, decimal and hexadecimal character references.
///
/// Every HTML named entity is known; unknown names are left as written.
pub fn unescape_entities(text: &str) -> String {
    decode_html_entities(text).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_plain_body() {
        assert_eq!(clean_html_body("hello there"), "hello there");
    }

    #[test]
    fn test_doubled_newlines_collapse() {
        assert_eq!(clean_html_body("line one\n\nline two\n\n"), "line one\nline two");
    }

    #[test]
    fn test_break_variants() {
        assert_eq!(clean_html_body("a<br>b<BR/>c<br />d"), "a\nb\nc\nd");
    }

    #[test]
    fn test_tags_removed() {
        assert_eq!(
            clean_html_body(r#"<span style="color:red">warn</span> <a href="x">link</a>"#),
            "warn link"
        );
    }

    #[test]
    fn test_entities() {
        assert_eq!(unescape_entities("&lt;3 &amp; &quot;hi&quot;"), "<3 & \"hi\"");
        assert_eq!(unescape_entities("&#39;quoted&#x27;"), "'quoted'");
        assert_eq!(unescape_entities("&unknown; stays"), "&unknown; stays");
    }

    #[test]
    fn test_latin1_named_entities() {
        assert_eq!(
            clean_html_body("caf&eacute; &uuml;ber &pound;5 &times;2"),
            "café über £5 ×2"
        );
        assert_eq!(unescape_entities("na&iuml;ve &Aring;ngstr&ouml;m"), "naïve Ångström");
    }

    #[test]
    fn test_escaped_tag_survives() {
        // an escaped tag must not be stripped after decoding
        assert_eq!(clean_html_body("&lt;b&gt;not bold&lt;/b&gt;"), "<b>not bold</b>");
    }
}
