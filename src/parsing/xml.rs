//! XMPP stanza extraction for old-style chat records.
//!
//! Old-style records carry a `text/xml` part holding one or more
//! `<cli:message>` stanzas in the `jabber:client` namespace, decorated with a
//! good deal of Google-specific noise (archive records, XHTML-IM copies,
//! composing events). Only four things matter here: the `from`/`to`
//! attributes, the stanza `type`, the plain `<body>` and the millisecond
//! `<time ms="…">` element. Namespace prefixes vary between exports, so every
//! pattern accepts any prefix.

use std::sync::LazyLock;

use regex::Regex;

use super::html::unescape_entities;

static MESSAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?s)<(?:[\w.-]+:)?message\b([^>]*?)(?:/>|>(.*?)</(?:[\w.-]+:)?message\s*>)",
    )
    .expect("valid regex")
});

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([\w:.-]+)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("valid regex")
});

static XHTML_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<(?:[\w.-]+:)?html\b.*?</(?:[\w.-]+:)?html\s*>").expect("valid regex")
});

static BODY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<(?:[\w.-]+:)?body\b[^>]*>(.*?)</(?:[\w.-]+:)?body\s*>")
        .expect("valid regex")
});

static TIME_MS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<(?:[\w.-]+:)?time\b[^>]*?\bms\s*=\s*["'](\d+)["']"#).expect("valid regex")
});

/// One `<message>` stanza pulled out of an old-style record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stanza {
    /// Raw `from` attribute, resource included.
    pub from: Option<String>,
    /// Raw `to` attribute, resource included.
    pub to: Option<String>,
    /// Stanza `type` attribute (`chat`, `groupchat`, ...).
    pub kind: Option<String>,
    /// Unescaped body text; `None` for bodiless stanzas.
    pub body: Option<String>,
    /// Milliseconds since the Unix epoch from the `<time>` element.
    pub time_ms: Option<i64>,
    /// The stanza exactly as written, used to spot verbatim repeats.
    pub raw: String,
}

impl Stanza {
    /// Returns `true` for multi-user chat stanzas.
    pub fn is_groupchat(&self) -> bool {
        self.kind.as_deref() == Some("groupchat")
    }
}

/// Extracts every `<message>` stanza from an XML payload, in document order.
///
/// A self-closing `<message/>` is a bodiless stanza.
pub fn extract_stanzas(xml: &str) -> Vec<Stanza> {
    MESSAGE
        .captures_iter(xml)
        .map(|caps| {
            let raw = caps.get(0).map_or("", |m| m.as_str()).to_string();
            let attributes = caps.get(1).map_or("", |m| m.as_str());
            let inner = caps.get(2).map_or("", |m| m.as_str());
            parse_stanza(attributes, inner, raw)
        })
        .collect()
}

fn parse_stanza(attributes: &str, inner: &str, raw: String) -> Stanza {
    let mut from = None;
    let mut to = None;
    let mut kind = None;

    for caps in ATTRIBUTE.captures_iter(attributes) {
        let name = caps.get(1).map_or("", |m| m.as_str());
        let local = name.rsplit(':').next().unwrap_or(name);
        let value = caps
            .get(2)
            .or_else(|| caps.get(3))
            .map_or("", |m| m.as_str());
        let value = unescape_entities(value);

        match local {
            "from" => from = Some(value),
            "to" => to = Some(value),
            "type" => kind = Some(value),
            _ => {}
        }
    }

    let without_xhtml = XHTML_BLOCK.replace_all(inner, "");
    let body = BODY
        .captures(&without_xhtml)
        .and_then(|caps| caps.get(1))
        .map(|m| unescape_entities(m.as_str()));

    let time_ms = TIME_MS
        .captures(inner)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<i64>().ok());

    Stanza {
        from,
        to,
        kind,
        body,
        time_ms,
        raw,
    }
}
